//! Replication engine: configuration, generation runner and run events.
pub mod config;
pub mod engine;
pub mod events;

pub use config::{ReplicatorConfig, RootSeed};
pub use engine::{GenerationReport, Replicator, RunReport, Spawned};
