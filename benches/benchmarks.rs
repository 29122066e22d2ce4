//! Performance benchmarks for gnss-agent
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use gnss_agent::control::{ControlAction, ControlCommand};
use gnss_agent::shm::{Publisher, Subscriber, DEFAULT_READ_ATTEMPTS};
use gnss_agent::source::EndpointSpec;
use gnss_agent::{FixMode, GpsState};

fn bench_key() -> i32 {
    0x4200_0000 | (std::process::id() as i32 & 0xffff)
}

fn sample_state() -> GpsState {
    GpsState {
        mode: FixMode::Fix3d,
        status: 1,
        satellites_used: 12,
        satellites_visible: 19,
        latitude: 40.689247,
        longitude: -74.044502,
        altitude_hae: 10.0,
        hdop: 0.9,
        ..GpsState::default()
    }
}

fn bench_publish(c: &mut Criterion) {
    let mut publisher = Publisher::create(bench_key()).expect("segment create");
    let state = sample_state();

    c.bench_function("shm_publish", |b| {
        b.iter(|| {
            publisher.publish(black_box(&state));
        });
    });
}

fn bench_read_snapshot(c: &mut Criterion) {
    let mut publisher = Publisher::create(bench_key()).expect("segment create");
    publisher.publish(&sample_state());
    let subscriber = Subscriber::attach(bench_key()).expect("segment attach");

    c.bench_function("shm_read_snapshot", |b| {
        b.iter(|| {
            let snapshot = subscriber
                .read_snapshot(black_box(DEFAULT_READ_ATTEMPTS))
                .expect("uncontended read");
            black_box(snapshot);
        });
    });
}

fn bench_endpoint_parse(c: &mut Criterion) {
    let specs = [
        "localhost",
        "localhost:2947:/dev/ttyUSB0",
        "[fe80::1]:2947",
        "/dev/ttyUSB0",
        "host::",
    ];

    c.bench_function("endpoint_parse", |b| {
        b.iter(|| {
            for spec in &specs {
                black_box(EndpointSpec::parse(black_box(spec)));
            }
        });
    });
}

fn bench_command_framing(c: &mut Criterion) {
    let command = ControlCommand::new(ControlAction::Add, "/dev/ttyUSB0").unwrap();

    c.bench_function("control_frame_encode", |b| {
        b.iter(|| {
            black_box(black_box(&command).to_wire());
        });
    });
}

criterion_group!(
    benches,
    bench_publish,
    bench_read_snapshot,
    bench_endpoint_parse,
    bench_command_framing
);
criterion_main!(benches);
