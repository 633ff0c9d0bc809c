use std::time::Duration;

use criterion::{Criterion, Throughput};

/// Tuned for generation runs that finish in microseconds.
pub const SAMPLE_SIZE: usize = 40;
pub const WARM_UP: Duration = Duration::from_millis(500);
pub const MEASUREMENT_TIME: Duration = Duration::from_secs(3);
pub const NOISE_THRESHOLD: f64 = 0.03;

pub fn replication_criterion() -> Criterion {
    Criterion::default()
        .configure_from_args()
        .sample_size(SAMPLE_SIZE)
        .warm_up_time(WARM_UP)
        .measurement_time(MEASUREMENT_TIME)
        .noise_threshold(NOISE_THRESHOLD)
}

/// Throughput in records produced (or lattice points touched) per iteration.
pub fn records_throughput(records: usize) -> Throughput {
    Throughput::Elements(records.max(1) as u64)
}
