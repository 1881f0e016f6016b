use argh::FromArgs;
use glam::{DMat3, DVec3};
use rand::{rngs::StdRng, Rng, SeedableRng};

use pointreg::icp::{
    self,
    estimator::{MotionEstimator, QuaternionEstimator, SvdEstimator},
    spatial::KdTreeIndex,
    IcpConvergenceCriteria,
};
use pointreg::k3d::{
    pointcloud::PointCloud,
    rigid::RigidTransform,
    transforms::{rotation_angle_between, rotation_matrix_to_axis_angle},
};

#[derive(Debug, Clone, Copy)]
enum Scene {
    Cube,
    Random,
}

impl std::str::FromStr for Scene {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cube" => Ok(Scene::Cube),
            "random" => Ok(Scene::Random),
            _ => Err(format!("unknown scene `{s}`, expected `cube` or `random`")),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Estimator {
    Svd,
    Quaternion,
}

impl std::str::FromStr for Estimator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "svd" => Ok(Estimator::Svd),
            "quaternion" => Ok(Estimator::Quaternion),
            _ => Err(format!("unknown estimator `{s}`, expected `svd` or `quaternion`")),
        }
    }
}

#[derive(FromArgs)]
/// Register a synthetic point cloud against a rotated and shifted copy of itself
struct Args {
    /// scene to register: `cube` (8 corners) or `random`
    #[argh(option, default = "Scene::Cube")]
    scene: Scene,

    /// number of points of the random scene
    #[argh(option, default = "1000")]
    num_points: usize,

    /// rotation of the target about the z axis, in degrees
    #[argh(option, default = "30.0")]
    angle_deg: f64,

    /// translation of the target along x
    #[argh(option, default = "1.0")]
    tx: f64,

    /// translation of the target along y
    #[argh(option, default = "0.0")]
    ty: f64,

    /// translation of the target along z
    #[argh(option, default = "0.0")]
    tz: f64,

    /// uniform noise added to the target coordinates
    #[argh(option, default = "0.0")]
    noise: f64,

    /// maximum number of iterations
    #[argh(option, default = "50")]
    max_iterations: usize,

    /// motion estimator: `svd` or `quaternion`
    #[argh(option, default = "Estimator::Svd")]
    estimator: Estimator,

    /// search correspondences in parallel
    #[argh(switch)]
    parallel: bool,

    /// seed of the random generator
    #[argh(option, default = "0")]
    seed: u64,
}

fn create_source(args: &Args, rng: &mut StdRng) -> Vec<[f64; 3]> {
    match args.scene {
        Scene::Cube => (0..8)
            .map(|i| [(i & 1) as f64, ((i >> 1) & 1) as f64, ((i >> 2) & 1) as f64])
            .collect(),
        Scene::Random => (0..args.num_points)
            .map(|_| {
                [
                    rng.random_range(-1.0..1.0),
                    rng.random_range(-1.0..1.0),
                    rng.random_range(-1.0..1.0),
                ]
            })
            .collect(),
    }
}

fn print_cloud(name: &str, cloud: &PointCloud) {
    println!("{} cloud: #{} points", name, cloud.len());
    if let (Some(centroid), Some(min), Some(max)) =
        (cloud.centroid(), cloud.min_bound(), cloud.max_bound())
    {
        println!("  centroid {centroid:.3?}, bounds {min:.3?} .. {max:.3?}");
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();

    let mut rng = StdRng::seed_from_u64(args.seed);

    let ground_truth = RigidTransform::from_parts(
        DMat3::from_rotation_z(args.angle_deg.to_radians()),
        DVec3::new(args.tx, args.ty, args.tz),
    );

    let source_points = create_source(&args, &mut rng);
    let mut target_points = vec![[0.0; 3]; source_points.len()];
    ground_truth.transform_points(&source_points, &mut target_points);
    if args.noise > 0.0 {
        for p in target_points.iter_mut() {
            for x in p.iter_mut() {
                *x += rng.random_range(-args.noise..args.noise);
            }
        }
    }

    let source_cloud = PointCloud::new(source_points, None, None);
    print_cloud("Source", &source_cloud);

    let target_cloud = PointCloud::new(target_points, None, None);
    print_cloud("Target", &target_cloud);

    let criteria = IcpConvergenceCriteria::default()
        .with_max_iterations(args.max_iterations)
        .with_parallel(args.parallel);

    let index = KdTreeIndex::new(target_cloud.points());
    let estimator: &dyn MotionEstimator = match args.estimator {
        Estimator::Svd => &SvdEstimator,
        Estimator::Quaternion => &QuaternionEstimator,
    };

    let result = match icp::icp_with(
        &source_cloud,
        &target_cloud,
        RigidTransform::IDENTITY,
        &criteria,
        &index,
        estimator,
    ) {
        Ok(result) => result,
        Err(err) => {
            if let Some(best) = err.best_transform() {
                log::error!("registration aborted, best transform so far:\n{}", best);
            }
            return Err(err.into());
        }
    };

    println!(
        "ICP {} after {} iterations ({:?}), rmse {:.3e}",
        if result.converged {
            "converged"
        } else {
            "stopped"
        },
        result.num_iterations,
        result.stop_reason,
        result.rmse
    );
    print!("{}", result.transform);

    let (axis, angle) = rotation_matrix_to_axis_angle(&result.rotation());
    println!(
        "Estimated rotation: {:.4} deg about [{:.3}, {:.3}, {:.3}]",
        angle.to_degrees(),
        axis[0],
        axis[1],
        axis[2]
    );

    println!(
        "Error against ground truth: {:.3e} rad, {:.3e} translation",
        rotation_angle_between(&ground_truth.rotation_array(), &result.rotation()),
        (result.transform.translation - ground_truth.translation).length()
    );

    let fitness = icp::fitness(&source_cloud, &result.transform, &index)?;
    println!("Fitness (mse): {:.3e}", fitness);

    println!("Row-major matrix: {:?}", result.to_row_major_array());

    log::debug!("mse history: {:?}", result.mse_history);

    Ok(())
}
