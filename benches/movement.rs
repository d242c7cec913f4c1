//! Movement and broadcast benchmarks
//!
//! Measures collision-checked moves and per-tick snapshot encoding as the
//! number of live sessions grows.
//!
//! Run with: cargo bench --bench movement

use std::net::{IpAddr, Ipv4Addr};

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::Rng;
use roam_server::config::WorldConfig;
use roam_server::game::movement::{Heading, MoveIntent};
use roam_server::game::sprites::SpritePool;
use roam_server::game::world::{SharedWorld, World};
use roam_server::net::admission::AdmissionControl;
use roam_server::net::broadcast::encode_state;

const SESSION_COUNTS: [usize; 4] = [10, 100, 250, 500];

/// World with `count` joined sessions spread over the full map
fn world_with_sessions(count: usize) -> World {
    let config = WorldConfig {
        spawn_max: roam_server::util::vec2::Vec2::new(1800.0, 1000.0),
        ..WorldConfig::default()
    };
    let catalog = (0..16).map(|i| format!("sprite{}", i)).collect();
    let mut world = World::new(config, SpritePool::with_seed(catalog, 1), AdmissionControl::new(count))
        .with_spawn_seed(7);

    for i in 0..count {
        let address = IpAddr::V4(Ipv4Addr::from(0x0a00_0000 + i as u32));
        if let Err(e) = world.join(&format!("user{}", i), "red", address, i as u64) {
            panic!("seeding join {} failed: {}", i, e);
        }
    }
    world
}

/// One move per session, the way a busy tick would see them
fn bench_moves(c: &mut Criterion) {
    let mut group = c.benchmark_group("moves");
    group.sample_size(50);

    for count in SESSION_COUNTS {
        let mut world = world_with_sessions(count);
        let names: Vec<String> = (0..count).map(|i| format!("user{}", i)).collect();
        let mut rng = rand::thread_rng();
        let intents: Vec<MoveIntent> = (0..count)
            .map(|_| MoveIntent::new(Heading::Degrees(rng.gen_range(0.0..360.0)), None))
            .collect();

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("angle", count), &count, |b, _| {
            b.iter(|| {
                for (name, intent) in names.iter().zip(&intents) {
                    black_box(world.apply_move(name, intent));
                }
            })
        });
    }
    group.finish();
}

/// Snapshot and JSON encoding of one `state` frame
fn bench_encode_state(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_state");
    group.sample_size(50);

    for count in SESSION_COUNTS {
        let world: SharedWorld = world_with_sessions(count).into_shared();

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("json", count), &count, |b, _| {
            b.iter(|| black_box(encode_state(&world)))
        });
    }
    group.finish();
}

/// Join and leave churn against a populated world
fn bench_join_leave(c: &mut Criterion) {
    let mut group = c.benchmark_group("join_leave");
    group.sample_size(50);

    for count in SESSION_COUNTS {
        let mut world = world_with_sessions(count);
        let address = IpAddr::V4(Ipv4Addr::new(192, 168, 0, 1));

        group.bench_with_input(BenchmarkId::new("churn", count), &count, |b, _| {
            b.iter(|| {
                let joined = world.join("churn", "blue", address, u64::MAX);
                black_box(&joined);
                world.leave("churn", u64::MAX);
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_moves, bench_encode_state, bench_join_leave);

criterion_main!(benches);
