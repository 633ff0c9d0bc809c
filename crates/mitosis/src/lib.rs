#![forbid(unsafe_code)]
//! mitosis: deterministic replication scheduling for cell-division style animation.
//!
//! Modules:
//! - entity: per-instance records, lineage ids, motion paths and visibility windows
//! - policy: spawn directions, axis gating, strategies and the occupancy lattice
//! - behavior: follow-up animations applied once a record settles
//! - replicate: the generation runner, its configuration and run events
//! - host: collaborator traits for the scene being animated, plus an in-memory scene
pub mod behavior;
pub mod entity;
pub mod error;
pub mod host;
pub mod policy;
pub mod replicate;

/// Convenient re-exports for common types. Import with `use mitosis::prelude::*;`.
pub mod prelude {
    pub use crate::behavior::{
        apply as apply_behavior, AppliedBehavior, BehaviorCatalog, BehaviorDraft, BehaviorKind,
        BehaviorSpec,
    };
    pub use crate::entity::{
        EntityRecord, LineageId, MotionPath, RecordId, SpawnTiming, VisibilityWindow,
    };
    pub use crate::error::{Error, Result};
    pub use crate::host::memory::{Curve, Interpolation, MemoryScene};
    pub use crate::host::{
        Channel, CloneRequest, EntityFactory, EntityRef, Frame, Host, TimelineSink,
    };
    pub use crate::policy::occupancy::OccupancyIndex;
    pub use crate::policy::{Axis, AxisMask, CollisionRule, Direction, SpawnProfile, Strategy};
    pub use crate::replicate::events::{
        EventSink, FnSink, MultiSink, ReplicationEvent, ReplicationEventKind, VecSink,
    };
    pub use crate::replicate::{
        GenerationReport, Replicator, ReplicatorConfig, RootSeed, RunReport, Spawned,
    };
}
