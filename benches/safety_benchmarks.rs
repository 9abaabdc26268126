//! Benchmarks for the per-tick path: safety validation and layer composition

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::Rng;
use robot_head_motion::{
    config::{IdleConfig, SafetyConfig},
    layers::LayerStack,
    pose::RobotPose,
    safety::{SafetyManager, SafetyState},
};
use std::time::{Duration, Instant};

fn benchmark_safety(c: &mut Criterion) {
    let mut group = c.benchmark_group("safety");
    let safety = SafetyManager::new(SafetyConfig::default());
    let current = SafetyState::default();

    let cases = [
        ("upright", SafetyState::new(0.0, 10.0, 30.0, 20.0)),
        ("retreat", SafetyState::new(20.0, 0.0, 0.0, 30.0)),
        ("yaw_split", SafetyState::new(0.0, 0.0, 150.0, -60.0)),
        ("zone_fallback", SafetyState::new(20.0, 0.0, 150.0, -30.0)),
    ];

    for (name, target) in cases {
        group.bench_with_input(BenchmarkId::new("validate", name), &target, |b, target| {
            b.iter(|| black_box(safety.validate_movement(black_box(&current), black_box(target))));
        });
    }

    // Random targets across and beyond the joint limits
    let mut rng = rand::thread_rng();
    let targets: Vec<SafetyState> = (0..1000)
        .map(|_| {
            SafetyState::new(
                rng.gen_range(-60.0..60.0),
                rng.gen_range(-60.0..60.0),
                rng.gen_range(-200.0..200.0),
                rng.gen_range(-200.0..200.0),
            )
        })
        .collect();

    group.bench_function("validate_random_1000", |b| {
        b.iter(|| {
            for target in &targets {
                black_box(safety.validate_movement(&current, target));
            }
        });
    });

    group.finish();
}

fn benchmark_layers(c: &mut Criterion) {
    let mut group = c.benchmark_group("layers");
    let t0 = Instant::now();

    let mut stack = LayerStack::new(RobotPose::neutral(), &IdleConfig::default());
    stack.set_target(
        RobotPose::new(10.0, 15.0, 40.0, [30.0, 30.0], 20.0),
        Duration::from_secs(3600),
        t0,
    );
    stack.enable_idle(true, t0);

    // One simulated second of 50 Hz ticks
    let ticks: Vec<Instant> = (0..50).map(|i| t0 + Duration::from_millis(20 * i)).collect();

    group.bench_function("compose_tick", |b| {
        b.iter(|| black_box(stack.compose(black_box(ticks[25]))));
    });

    group.bench_function("compose_50_ticks", |b| {
        b.iter(|| {
            for &now in &ticks {
                black_box(stack.compose(now));
            }
        });
    });

    group.finish();
}

criterion_group!(benches, benchmark_safety, benchmark_layers);
criterion_main!(benches);
