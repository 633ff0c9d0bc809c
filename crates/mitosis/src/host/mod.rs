//! Collaborator contracts between the replication engine and a host application.
//!
//! The engine never touches scene objects or animation curves directly. It talks to
//! two narrow interfaces instead:
//! - [`EntityFactory`]: clones visual entities and reads/writes their live transform.
//! - [`TimelineSink`]: records keyframes on named channels and answers "value at or
//!   before frame" queries.
//!
//! A host usually implements both on the same type; [`Host`] is the combined bound
//! the engine asks for. [`memory::MemoryScene`] is a complete in-memory host.
use std::fmt;

use glam::Vec3;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub mod memory;

/// Animation frame number.
pub type Frame = i32;

/// Opaque handle to an entity owned by the host.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityRef(pub u64);

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity:{}", self.0)
    }
}

/// An animatable property of an entity.
///
/// Vector channels are keyed per axis (`Some(0..=2)`); [`Channel::Visibility`] is a
/// scalar channel keyed with `None`, holding `1.0` for visible and `0.0` for hidden.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Channel {
    Location,
    Scale,
    Visibility,
    Rotation,
    DeltaLocation,
    DeltaScale,
    Named(String),
}

impl Channel {
    /// Host-facing name of the channel.
    pub fn name(&self) -> &str {
        match self {
            Channel::Location => "location",
            Channel::Scale => "scale",
            Channel::Visibility => "visibility",
            Channel::Rotation => "rotation",
            Channel::DeltaLocation => "delta_location",
            Channel::DeltaScale => "delta_scale",
            Channel::Named(name) => name,
        }
    }

    /// Resolve a channel from its name; unknown names become [`Channel::Named`].
    pub fn from_name(name: &str) -> Self {
        match name {
            "location" => Channel::Location,
            "scale" => Channel::Scale,
            "visibility" => Channel::Visibility,
            "rotation" | "rotation_euler" => Channel::Rotation,
            "delta_location" => Channel::DeltaLocation,
            "delta_scale" => Channel::DeltaScale,
            other => Channel::Named(other.to_owned()),
        }
    }

    /// Value an untouched entity reports for this channel.
    pub fn rest_value(&self) -> f32 {
        match self {
            Channel::Scale | Channel::DeltaScale | Channel::Visibility => 1.0,
            _ => 0.0,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parameters for cloning a template entity.
#[derive(Clone, Copy, Debug)]
pub struct CloneRequest<'a> {
    /// Entity to copy.
    pub template: EntityRef,
    /// Initial location of the clone.
    pub location: Vec3,
    /// Share the template's underlying geometry data instead of copying it.
    pub linked: bool,
    /// Display name for the clone.
    pub name: &'a str,
}

/// Creates entities and exposes their live transform.
///
/// Calls are assumed to be non-blocking and non-failing for entities the factory
/// knows about; use [`EntityFactory::contains`] to check a handle up front.
pub trait EntityFactory {
    /// Whether `entity` refers to a live entity.
    fn contains(&self, entity: EntityRef) -> bool;

    /// Produce a new entity from a template.
    fn clone_entity(&mut self, request: CloneRequest<'_>) -> EntityRef;

    fn set_scale(&mut self, entity: EntityRef, scale: Vec3);

    fn scale(&self, entity: EntityRef) -> Vec3;

    fn set_location(&mut self, entity: EntityRef, location: Vec3);

    fn location(&self, entity: EntityRef) -> Vec3;

    /// Display name, if the host tracks one.
    fn name(&self, _entity: EntityRef) -> Option<String> {
        None
    }

    /// Current live value of a channel component, if the host can report it.
    fn property(&self, entity: EntityRef, channel: &Channel, axis: Option<usize>) -> Option<f32> {
        let axis = axis.filter(|i| *i < 3)?;
        match channel {
            Channel::Location => Some(self.location(entity)[axis]),
            Channel::Scale => Some(self.scale(entity)[axis]),
            _ => None,
        }
    }
}

/// Records time-stamped property changes.
pub trait TimelineSink {
    fn record_keyframe(
        &mut self,
        entity: EntityRef,
        channel: &Channel,
        axis: Option<usize>,
        frame: Frame,
        value: f32,
    );

    /// Value of the latest keyframe at or before `frame`, or `None` if there is none.
    fn query_value_at_or_before(
        &self,
        entity: EntityRef,
        channel: &Channel,
        axis: Option<usize>,
        frame: Frame,
    ) -> Option<f32>;

    /// Key all three axes of a vector channel at once.
    fn record_vec3(&mut self, entity: EntityRef, channel: &Channel, frame: Frame, value: Vec3) {
        for axis in 0..3 {
            self.record_keyframe(entity, channel, Some(axis), frame, value[axis]);
        }
    }
}

/// Combined bound for types acting as both collaborators.
pub trait Host: EntityFactory + TimelineSink {}

impl<T: EntityFactory + TimelineSink + ?Sized> Host for T {}
