//! Scene builders shared by the physics benchmarks.

use std::sync::Arc;

use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rein_physics::ecs::components::physics::{
    Collider, ColliderVolume, PhysicsBody, TriangleMesh,
};
use rein_physics::ecs::components::transform::{GlobalTransform, Transform};
use rein_physics::physics::contact::Contact;
use rein_physics::physics::manifold::ManifoldCache;
use rein_physics::physics::proxy::ProxyCache;
use rein_physics::{PhysicsConfig, PhysicsWorld};

/// Seeded generator so every run builds the same scene.
pub fn scene_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

fn spawn(world: &mut hecs::World, position: Vec3, body: PhysicsBody, volume: ColliderVolume) {
    let transform = Transform::from_position(position);
    world.spawn((
        transform,
        GlobalTransform::from(transform),
        body,
        Collider::solid(volume),
    ));
}

/// `n` unit spheres scattered in a cube sized for moderate overlap.
pub fn setup_sphere_world(n: usize) -> hecs::World {
    let mut world = hecs::World::new();
    let mut rng = scene_rng(7);
    let extent = (n as f32).cbrt() * 2.0;
    for _ in 0..n {
        let p = Vec3::new(
            rng.random_range(-extent..extent),
            rng.random_range(-extent..extent),
            rng.random_range(-extent..extent),
        );
        spawn(
            &mut world,
            p,
            PhysicsBody::new_dynamic(1.0).with_sphere_inertia(0.5),
            ColliderVolume::sphere(0.5),
        );
    }
    world
}

/// Spheres, boxes and capsules mixed.
pub fn setup_mixed_world(n: usize) -> hecs::World {
    let mut world = hecs::World::new();
    let mut rng = scene_rng(11);
    let extent = (n as f32).cbrt() * 2.0;
    for i in 0..n {
        let p = Vec3::new(
            rng.random_range(-extent..extent),
            rng.random_range(-extent..extent),
            rng.random_range(-extent..extent),
        );
        let volume = match i % 3 {
            0 => ColliderVolume::sphere(0.5),
            1 => ColliderVolume::cuboid(Vec3::splat(0.4)),
            _ => ColliderVolume::capsule(Vec3::new(0.0, -0.3, 0.0), Vec3::new(0.0, 0.3, 0.0), 0.25),
        };
        spawn(&mut world, p, PhysicsBody::new_dynamic(1.0), volume);
    }
    world
}

/// Spheres spread far apart: almost no pairs.
pub fn setup_sparse_world(n: usize) -> hecs::World {
    let mut world = hecs::World::new();
    for i in 0..n {
        let p = Vec3::new((i % 32) as f32 * 4.0, (i / 32) as f32 * 4.0, 0.0);
        spawn(&mut world, p, PhysicsBody::new_dynamic(1.0), ColliderVolume::sphere(0.5));
    }
    world
}

/// Proxies for a world, ready for a broad phase.
pub fn proxies_for(world: &hecs::World) -> ProxyCache {
    let mut proxies = ProxyCache::new();
    proxies.update(world);
    proxies
}

/// A column of `n` resting pairs with one manifold each.
pub fn setup_contacts(n: usize) -> (hecs::World, ManifoldCache) {
    let mut world = hecs::World::new();
    let mut manifolds = ManifoldCache::new();
    for i in 0..n {
        let x = i as f32 * 3.0;
        let ground = Transform::from_position(Vec3::new(x, 0.0, 0.0));
        let a = world.spawn((ground, GlobalTransform::from(ground), PhysicsBody::new_static()));
        let top = Transform::from_position(Vec3::new(x, 0.99, 0.0));
        let b = world.spawn((
            top,
            GlobalTransform::from(top),
            PhysicsBody::new_dynamic(1.0)
                .with_sphere_inertia(0.5)
                .with_velocity(Vec3::new(0.0, -1.0, 0.0)),
        ));
        let point = Vec3::new(x, 0.5, 0.0);
        manifolds.add_contact(
            a,
            b,
            Contact {
                world_point_a: point,
                world_point_b: point - Vec3::Y * 0.01,
                local_point_a: Vec3::new(0.0, 0.5, 0.0),
                local_point_b: Vec3::new(0.0, -0.5, 0.0),
                normal: Vec3::Y,
                depth: 0.01,
            },
            false,
        );
    }
    (world, manifolds)
}

/// `n` bodies falling onto a static ground box.
pub fn setup_scene(n: usize) -> (hecs::World, PhysicsWorld) {
    let mut world = setup_mixed_world(n);
    let ground = Transform::from_position(Vec3::new(0.0, -20.0, 0.0));
    world.spawn((
        ground,
        GlobalTransform::from(ground),
        PhysicsBody::new_static(),
        Collider::solid(ColliderVolume::cuboid(Vec3::new(100.0, 1.0, 100.0))),
    ));
    let physics = PhysicsWorld::new(PhysicsConfig::default()).unwrap_or_else(|e| panic!("{e}"));
    (world, physics)
}

/// Flat grid mesh of `cells * cells * 2` triangles centered at the origin.
pub fn grid_mesh(cells: usize, cell_size: f32) -> Arc<TriangleMesh> {
    let mut vertices = Vec::new();
    let half = cells as f32 * cell_size * 0.5;
    for z in 0..=cells {
        for x in 0..=cells {
            vertices.push(Vec3::new(x as f32 * cell_size - half, 0.0, z as f32 * cell_size - half));
        }
    }
    let stride = (cells + 1) as u32;
    let mut indices = Vec::new();
    for z in 0..cells as u32 {
        for x in 0..cells as u32 {
            let i = z * stride + x;
            indices.extend_from_slice(&[i, i + stride + 1, i + 1, i, i + stride, i + stride + 1]);
        }
    }
    Arc::new(TriangleMesh::from_indexed(&vertices, &indices))
}

/// Empty world with a static terrain mesh, for the spawn benchmarks.
pub fn setup_mass_scene(initial: usize) -> (hecs::World, PhysicsWorld) {
    let mut world = hecs::World::new();
    let mut physics =
        PhysicsWorld::new(PhysicsConfig::default()).unwrap_or_else(|e| panic!("{e}"));
    let terrain = world.spawn((Transform::identity(), GlobalTransform::default()));
    physics
        .attach_mesh_collider(&mut world, terrain, grid_mesh(16, 4.0))
        .unwrap_or_else(|e| panic!("{e}"));

    let mut rng = scene_rng(3);
    for _ in 0..initial {
        spawn_falling(&mut world, &mut rng);
    }
    (world, physics)
}

fn spawn_falling(world: &mut hecs::World, rng: &mut StdRng) {
    let p = Vec3::new(
        rng.random_range(-20.0..20.0),
        rng.random_range(5.0..30.0),
        rng.random_range(-20.0..20.0),
    );
    spawn(
        world,
        p,
        PhysicsBody::new_dynamic(1.0).with_sphere_inertia(0.5),
        ColliderVolume::sphere(0.5),
    );
}

/// Step `frames` times, spawning `spawn_per_frame` new bodies each frame.
pub fn run_mass_physics(
    world: &mut hecs::World,
    physics: &mut PhysicsWorld,
    frames: usize,
    spawn_per_frame: usize,
    seed: u64,
) {
    let mut rng = scene_rng(seed.wrapping_add(17));
    for _ in 0..frames {
        for _ in 0..spawn_per_frame {
            spawn_falling(world, &mut rng);
        }
        let _ = physics.step(world, 1.0 / 60.0);
    }
}
