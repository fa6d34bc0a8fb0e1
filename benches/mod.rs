use criterion::{criterion_group, criterion_main};


criterion_group!(
    benches,
    scanner::bench_noise_scan,
    scanner::bench_notification_scan
);
criterion_main!(benches);
