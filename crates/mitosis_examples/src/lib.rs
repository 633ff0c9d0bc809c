#![forbid(unsafe_code)]

mod preset;
mod summary;

pub use preset::{load_preset, parse_preset, BehaviorDef, PresetRun, ReplicationPreset, RootDef};
pub use summary::{print_lineage, print_timeline};

use tracing_subscriber::EnvFilter;

/// Install a `fmt` subscriber honoring `RUST_LOG`, defaulting to `info`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
