//! Physics pipeline benchmarks (criterion - wall-clock time).
//!
//! Run all:    cargo bench --manifest-path benchmarks/Cargo.toml --bench physics
//! Filter:     cargo bench --manifest-path benchmarks/Cargo.toml --bench physics -- broadphase

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use glam::{Mat4, Quat, Vec3};
use rand::Rng;
use rein_bench::*;
use rein_physics::ecs::components::physics::ColliderVolume;
use rein_physics::physics::broadphase::{AllPairs, BroadPhase, BroadPhasePairs};
use rein_physics::physics::collider::{Triangle, TransformedVolume};
use rein_physics::physics::contact::Contact;
use rein_physics::physics::joint::Joints;
use rein_physics::physics::manifold::Manifold;
use rein_physics::physics::narrowphase::NarrowPhase;
use rein_physics::physics::partition::StaticPartition;
use rein_physics::physics::solver::ContactSolver;
use rein_physics::PhysicsConfig;

// ---------------------------------------------------------------------------
// Broadphase
// ---------------------------------------------------------------------------

fn bench_broadphase(c: &mut Criterion) {
    for (name, setup) in [
        ("broadphase/uniform_spheres", setup_sphere_world as fn(usize) -> hecs::World),
        ("broadphase/mixed_shapes", setup_mixed_world),
        ("broadphase/sparse", setup_sparse_world),
    ] {
        let mut group = c.benchmark_group(name);
        for &n in &[100, 500, 1000] {
            let proxies = proxies_for(&setup(n));
            let broadphase = AllPairs::default();
            let mut pairs = BroadPhasePairs::default();
            group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
                b.iter(|| {
                    pairs.clear();
                    broadphase.collect_pairs(proxies.proxies(), &mut pairs);
                });
            });
        }
        group.finish();
    }

    {
        let mut group = c.benchmark_group("broadphase/static_partition");
        let config = PhysicsConfig::default();
        let mut partition = StaticPartition::new(&config);
        let mut world = hecs::World::new();
        for i in 0..16 {
            let entity = world.spawn(());
            let offset = Mat4::from_translation(Vec3::new((i % 4) as f32 * 40.0, 0.0, (i / 4) as f32 * 40.0));
            partition.insert(entity, &grid_mesh(8, 4.0), &offset);
        }
        for &n in &[100, 500] {
            let mut proxies = proxies_for(&setup_sphere_world(n));
            partition.locate(proxies.proxies_mut());
            let mut pairs = BroadPhasePairs::default();
            group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
                b.iter(|| {
                    pairs.clear();
                    partition.collect_pairs(proxies.proxies(), &mut pairs);
                });
            });
        }
        group.finish();
    }
}

// ---------------------------------------------------------------------------
// Narrowphase
// ---------------------------------------------------------------------------

fn bench_narrowphase(c: &mut Criterion) {
    let mut narrowphase = NarrowPhase::default();
    let ta = Mat4::IDENTITY;
    let cases = [
        ("sphere_sphere", ColliderVolume::sphere(1.0), ColliderVolume::sphere(1.0)),
        ("box_box", ColliderVolume::cuboid(Vec3::ONE), ColliderVolume::cuboid(Vec3::ONE)),
        ("box_sphere", ColliderVolume::cuboid(Vec3::ONE), ColliderVolume::sphere(1.0)),
        (
            "capsule_box",
            ColliderVolume::capsule(Vec3::new(0.0, -1.0, 0.0), Vec3::new(0.0, 1.0, 0.0), 0.5),
            ColliderVolume::cuboid(Vec3::ONE),
        ),
    ];

    for (name, a, b) in &cases {
        let mut group = c.benchmark_group(format!("narrowphase/{name}"));
        let shape_a = TransformedVolume::new(a, ta);

        let hit = TransformedVolume::new(b, Mat4::from_translation(Vec3::new(1.5, 0.0, 0.0)));
        group.bench_function("intersecting", |bench| {
            bench.iter(|| narrowphase.contact(&shape_a, &hit));
        });

        let deep = TransformedVolume::new(b, Mat4::from_translation(Vec3::new(0.3, 0.1, 0.0)));
        group.bench_function("deep", |bench| {
            bench.iter(|| narrowphase.contact(&shape_a, &deep));
        });

        let rotated = TransformedVolume::new(
            b,
            Mat4::from_rotation_translation(Quat::from_rotation_y(0.785), Vec3::new(1.5, 0.0, 0.0)),
        );
        group.bench_function("rotated", |bench| {
            bench.iter(|| narrowphase.contact(&shape_a, &rotated));
        });

        let miss = TransformedVolume::new(b, Mat4::from_translation(Vec3::new(5.0, 0.0, 0.0)));
        group.bench_function("separated", |bench| {
            bench.iter(|| narrowphase.contact(&shape_a, &miss));
        });
        group.finish();
    }

    {
        let mut group = c.benchmark_group("narrowphase/mesh");
        let ball = ColliderVolume::sphere(0.5);
        let shape = TransformedVolume::new(&ball, Mat4::from_translation(Vec3::new(0.3, 0.4, 0.2)));
        let mesh = grid_mesh(8, 1.0);
        let triangles: Vec<Triangle> = mesh.triangles.clone();
        group.bench_function("grid_64", |b| {
            b.iter(|| narrowphase.mesh_contact(&shape, &Mat4::IDENTITY, triangles.iter()));
        });
        group.finish();
    }
}

// ---------------------------------------------------------------------------
// Manifolds
// ---------------------------------------------------------------------------

fn bench_manifold(c: &mut Criterion) {
    let mut group = c.benchmark_group("manifold/add_contact");
    let mut world = hecs::World::new();
    let (a, b) = (world.spawn(()), world.spawn(()));
    let mut rng = scene_rng(5);
    let contacts: Vec<Contact> = (0..256)
        .map(|_| {
            let p = Vec3::new(rng.random_range(-1.0..1.0), 0.0, rng.random_range(-1.0..1.0));
            Contact {
                world_point_a: p,
                world_point_b: p,
                local_point_a: p,
                local_point_b: p,
                normal: Vec3::Y,
                depth: rng.random_range(0.0..0.1),
            }
        })
        .collect();

    group.bench_function("stream_256", |bench| {
        bench.iter(|| {
            let mut manifold = Manifold::new(a, b, false);
            for contact in &contacts {
                manifold.add_contact(*contact);
            }
            manifold
        });
    });
    group.finish();
}

// ---------------------------------------------------------------------------
// Solver
// ---------------------------------------------------------------------------

fn bench_solver(c: &mut Criterion) {
    {
        let mut group = c.benchmark_group("solver/contact_count");
        let config = PhysicsConfig::default();
        for &n in &[10, 50, 100, 500] {
            let (mut world, manifolds) = setup_contacts(n);
            let mut solver = ContactSolver::new();
            let mut joints = Joints::new();
            group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
                b.iter_batched(
                    || manifolds_clone(&manifolds),
                    |mut m| solver.solve(&mut world, &mut m, &mut joints, 1.0 / 60.0, &config),
                    criterion::BatchSize::SmallInput,
                );
            });
        }
        group.finish();
    }

    {
        let mut group = c.benchmark_group("solver/iterations");
        let (mut world, manifolds) = setup_contacts(100);
        let mut solver = ContactSolver::new();
        let mut joints = Joints::new();
        for &iters in &[1, 5, 10, 20] {
            let config = PhysicsConfig {
                solver_iterations: iters,
                ..Default::default()
            };
            group.bench_with_input(BenchmarkId::from_parameter(iters), &iters, |b, _| {
                b.iter_batched(
                    || manifolds_clone(&manifolds),
                    |mut m| solver.solve(&mut world, &mut m, &mut joints, 1.0 / 60.0, &config),
                    criterion::BatchSize::SmallInput,
                );
            });
        }
        group.finish();
    }
}

fn manifolds_clone(
    source: &rein_physics::physics::manifold::ManifoldCache,
) -> rein_physics::physics::manifold::ManifoldCache {
    let mut copy = rein_physics::physics::manifold::ManifoldCache::new();
    for manifold in source.iter() {
        for point in manifold.points() {
            copy.add_contact(manifold.entity_a, manifold.entity_b, point.contact, manifold.trigger);
        }
    }
    copy
}

// ---------------------------------------------------------------------------
// Full pipeline
// ---------------------------------------------------------------------------

fn bench_pipeline(c: &mut Criterion) {
    {
        let mut group = c.benchmark_group("pipeline/step");
        group.sample_size(30);
        for &n in &[50, 100, 500] {
            group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
                b.iter_batched(
                    || setup_scene(n),
                    |(mut world, mut physics)| {
                        let _ = physics.step(&mut world, 1.0 / 60.0);
                    },
                    criterion::BatchSize::LargeInput,
                );
            });
        }
        group.finish();
    }

    {
        let mut group = c.benchmark_group("pipeline/sustained_10steps");
        group.sample_size(20);
        for &n in &[100, 500] {
            group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
                b.iter_batched(
                    || setup_scene(n),
                    |(mut world, mut physics)| {
                        for _ in 0..10 {
                            let _ = physics.step(&mut world, 1.0 / 60.0);
                        }
                    },
                    criterion::BatchSize::LargeInput,
                );
            });
        }
        group.finish();
    }

    {
        let mut group = c.benchmark_group("pipeline/stages");
        let n = 500;
        let config = PhysicsConfig::default();

        group.bench_function("integrate_500", |b| {
            b.iter_batched(
                || setup_scene(n).0,
                |mut w| {
                    rein_physics::physics::rigid_body::integrate_forces(
                        &mut w,
                        Vec3::new(0.0, -9.81, 0.0),
                        1.0 / 60.0,
                    );
                    rein_physics::physics::rigid_body::integrate_positions(&mut w, 1.0 / 60.0, &config);
                },
                criterion::BatchSize::LargeInput,
            );
        });

        group.bench_function("sync_transforms_500", |b| {
            b.iter_batched(
                || setup_scene(n).0,
                |mut w| {
                    rein_physics::physics::rigid_body::sync_transforms(&mut w);
                },
                criterion::BatchSize::LargeInput,
            );
        });
        group.finish();
    }
}

// ---------------------------------------------------------------------------
// Mass physics (continuous spawn + step onto a terrain mesh)
// ---------------------------------------------------------------------------

fn bench_mass_physics(c: &mut Criterion) {
    {
        let mut group = c.benchmark_group("mass_physics/spawn_rate");
        group.sample_size(10);
        for &spawn_per_frame in &[1, 3, 10] {
            group.bench_with_input(
                BenchmarkId::from_parameter(spawn_per_frame),
                &spawn_per_frame,
                |b, &spf| {
                    b.iter_batched(
                        || setup_mass_scene(0),
                        |(mut world, mut physics)| {
                            run_mass_physics(&mut world, &mut physics, 60, spf, 0);
                        },
                        criterion::BatchSize::LargeInput,
                    );
                },
            );
        }
        group.finish();
    }

    {
        let mut group = c.benchmark_group("mass_physics/initial_bodies");
        group.sample_size(10);
        for &initial in &[0, 100, 500] {
            group.bench_with_input(
                BenchmarkId::from_parameter(initial),
                &initial,
                |b, &init| {
                    b.iter_batched(
                        || setup_mass_scene(init),
                        |(mut world, mut physics)| {
                            run_mass_physics(&mut world, &mut physics, 60, 3, init as u64);
                        },
                        criterion::BatchSize::LargeInput,
                    );
                },
            );
        }
        group.finish();
    }
}

criterion_group!(
    benches,
    bench_broadphase,
    bench_narrowphase,
    bench_manifold,
    bench_solver,
    bench_pipeline,
    bench_mass_physics,
);
criterion_main!(benches);
