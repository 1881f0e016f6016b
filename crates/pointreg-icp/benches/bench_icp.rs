use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;

use glam::{DMat3, DVec3};
use pointreg_3d::{pointcloud::PointCloud, rigid::RigidTransform};
use pointreg_icp::{
    icp_vanilla,
    ops::find_correspondences,
    spatial::{BruteForceIndex, KdTreeIndex},
    IcpConvergenceCriteria,
};
use rand::{rngs::StdRng, Rng, SeedableRng};

fn create_scene(num_points: usize) -> (PointCloud, PointCloud) {
    let mut rng = StdRng::seed_from_u64(42);
    let points = (0..num_points)
        .map(|_| {
            [
                rng.random_range(-1.0..1.0),
                rng.random_range(-1.0..1.0),
                rng.random_range(-1.0..1.0),
            ]
        })
        .collect::<Vec<_>>();

    let motion =
        RigidTransform::from_parts(DMat3::from_rotation_z(0.05), DVec3::new(0.02, 0.01, 0.0));
    let mut moved = vec![[0.0; 3]; points.len()];
    motion.transform_points(&points, &mut moved);

    (
        PointCloud::new(points, None, None),
        PointCloud::new(moved, None, None),
    )
}

fn bench_find_correspondences(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_correspondences");

    for num_points in [1000, 10000, 100000].iter() {
        group.throughput(criterion::Throughput::Elements(*num_points as u64));
        let parameter_string = format!("{}", num_points);

        let (source, target) = create_scene(*num_points);
        let kdtree = KdTreeIndex::new(target.points());

        group.bench_with_input(
            BenchmarkId::new("kdtree_serial", &parameter_string),
            &(&source, &kdtree),
            |b, i| {
                let (src, index) = (i.0, i.1);
                b.iter(|| black_box(find_correspondences(src.points(), index, false)));
            },
        );

        group.bench_with_input(
            BenchmarkId::new("kdtree_parallel", &parameter_string),
            &(&source, &kdtree),
            |b, i| {
                let (src, index) = (i.0, i.1);
                b.iter(|| black_box(find_correspondences(src.points(), index, true)));
            },
        );

        if *num_points <= 10000 {
            let brute = BruteForceIndex::new(target.points());
            group.bench_with_input(
                BenchmarkId::new("brute_force_parallel", &parameter_string),
                &(&source, &brute),
                |b, i| {
                    let (src, index) = (i.0, i.1);
                    b.iter(|| black_box(find_correspondences(src.points(), index, true)));
                },
            );
        }
    }
}

fn bench_icp_vanilla(c: &mut Criterion) {
    let mut group = c.benchmark_group("icp_vanilla");
    group.sample_size(10);

    for num_points in [1000, 10000].iter() {
        let parameter_string = format!("{}", num_points);
        let (source, target) = create_scene(*num_points);

        for parallel in [false, true] {
            let criteria = IcpConvergenceCriteria::default().with_parallel(parallel);
            let name = if parallel { "parallel" } else { "serial" };
            group.bench_with_input(
                BenchmarkId::new(name, &parameter_string),
                &(&source, &target),
                |b, i| {
                    let (src, dst) = (i.0, i.1);
                    b.iter(|| {
                        black_box(icp_vanilla(src, dst, RigidTransform::IDENTITY, &criteria))
                    });
                },
            );
        }
    }
}

criterion_group!(benches, bench_find_correspondences, bench_icp_vanilla);
criterion_main!(benches);
