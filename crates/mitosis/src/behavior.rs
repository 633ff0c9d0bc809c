//! Post-spawn behaviors: named effects applied once a record's spawn animation settles.
//!
//! A [`BehaviorCatalog`] maps effect names (`ROTATE`, `MOVE`, `CHANGE SCALE`, plus any
//! registered extras) to timeline [`Channel`]s. A [`BehaviorSpec`] says how far to
//! drive one component of that channel, over how many frames and after what delay.
//!
//! [`apply`] animates relative to wherever the entity currently is: it reads the
//! channel value at the start frame (timeline first, live property second) and keys
//! that value before keying the target.
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{Error, Result};
use crate::host::{Channel, EntityRef, Frame, Host};
use crate::policy::Axis;

/// Built-in post-spawn effects.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BehaviorKind {
    Rotate,
    Move,
    ChangeScale,
}

impl BehaviorKind {
    pub const ALL: [BehaviorKind; 3] = [
        BehaviorKind::Rotate,
        BehaviorKind::Move,
        BehaviorKind::ChangeScale,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BehaviorKind::Rotate => "ROTATE",
            BehaviorKind::Move => "MOVE",
            BehaviorKind::ChangeScale => "CHANGE SCALE",
        }
    }

    pub fn channel(self) -> Channel {
        match self {
            BehaviorKind::Rotate => Channel::Rotation,
            BehaviorKind::Move => Channel::DeltaLocation,
            BehaviorKind::ChangeScale => Channel::DeltaScale,
        }
    }
}

impl fmt::Display for BehaviorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BehaviorKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = normalize_name(s);
        BehaviorKind::ALL
            .into_iter()
            .find(|kind| kind.name() == normalized)
            .ok_or_else(|| Error::UnknownBehavior { name: s.to_owned() })
    }
}

fn normalize_name(name: &str) -> String {
    name.trim().to_ascii_uppercase().replace('_', " ")
}

/// A validated post-spawn behavior.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct BehaviorSpec {
    channel: Channel,
    axis: usize,
    value: f32,
    duration: u32,
    delay: i32,
}

impl BehaviorSpec {
    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    /// Channel component, 0-2.
    pub fn axis(&self) -> usize {
        self.axis
    }

    /// Target value reached at the end of the behavior.
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Length of the behavior animation in frames, at least 1.
    pub fn duration(&self) -> u32 {
        self.duration
    }

    /// Frames between settling and the start of the behavior; may be negative.
    pub fn delay(&self) -> i32 {
        self.delay
    }

    /// First and last frame of the behavior for an entity settling at `settle_frame`.
    pub fn frames(&self, settle_frame: Frame) -> (Frame, Frame) {
        let start = settle_frame.saturating_add(self.delay);
        (start, start.saturating_add(self.duration as Frame))
    }
}

/// A behavior under construction; every field must be set before [`BehaviorDraft::build`].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BehaviorDraft {
    pub channel: Option<Channel>,
    pub axis: Option<usize>,
    pub value: Option<f32>,
    pub duration: Option<u32>,
    pub delay: Option<i32>,
}

impl BehaviorDraft {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a draft for one of the built-in effects.
    pub fn of(kind: BehaviorKind) -> Self {
        Self::new().with_channel(kind.channel())
    }

    pub fn with_channel(mut self, channel: Channel) -> Self {
        self.channel = Some(channel);
        self
    }

    pub fn with_axis(mut self, axis: Axis) -> Self {
        self.axis = Some(axis.index());
        self
    }

    pub fn with_axis_index(mut self, axis: usize) -> Self {
        self.axis = Some(axis);
        self
    }

    pub fn with_value(mut self, value: f32) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_duration(mut self, duration: u32) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn with_delay(mut self, delay: i32) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Validate the draft, failing with [`Error::InvalidBehaviorSpec`].
    pub fn build(&self) -> Result<BehaviorSpec> {
        let channel = required(self.channel.clone(), "channel")?;
        let axis = required(self.axis, "axis")?;
        let value = required(self.value, "value")?;
        let duration = required(self.duration, "duration")?;
        let delay = required(self.delay, "delay")?;

        if matches!(channel, Channel::Visibility) {
            return Err(Error::InvalidBehaviorSpec(
                "visibility is driven by the spawn strategy, not by behaviors".into(),
            ));
        }
        if axis > 2 {
            return Err(Error::InvalidBehaviorSpec(format!(
                "axis must be 0, 1 or 2, got {axis}"
            )));
        }
        if !value.is_finite() {
            return Err(Error::InvalidBehaviorSpec(format!(
                "value must be finite, got {value}"
            )));
        }
        if duration == 0 {
            return Err(Error::InvalidBehaviorSpec("duration must be >= 1".into()));
        }
        if Frame::try_from(duration).is_err() {
            return Err(Error::InvalidBehaviorSpec(format!(
                "duration must fit the frame range, got {duration}"
            )));
        }

        Ok(BehaviorSpec {
            channel,
            axis,
            value,
            duration,
            delay,
        })
    }
}

impl From<&BehaviorSpec> for BehaviorDraft {
    fn from(spec: &BehaviorSpec) -> Self {
        Self {
            channel: Some(spec.channel.clone()),
            axis: Some(spec.axis),
            value: Some(spec.value),
            duration: Some(spec.duration),
            delay: Some(spec.delay),
        }
    }
}

fn required<T>(field: Option<T>, name: &str) -> Result<T> {
    field.ok_or_else(|| Error::InvalidBehaviorSpec(format!("missing required field '{name}'")))
}

/// Registry of named effects.
#[derive(Clone, Debug)]
pub struct BehaviorCatalog {
    entries: Vec<(String, Channel)>,
}

impl Default for BehaviorCatalog {
    fn default() -> Self {
        Self {
            entries: BehaviorKind::ALL
                .into_iter()
                .map(|kind| (kind.name().to_owned(), kind.channel()))
                .collect(),
        }
    }
}

impl BehaviorCatalog {
    /// Catalog with the built-in effects.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace an effect name.
    pub fn register(&mut self, name: &str, channel: Channel) -> &mut Self {
        let name = normalize_name(name);
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = channel,
            None => self.entries.push((name, channel)),
        }
        self
    }

    pub fn channel_for(&self, name: &str) -> Result<Channel> {
        let name_normalized = normalize_name(name);
        self.entries
            .iter()
            .find(|(n, _)| *n == name_normalized)
            .map(|(_, c)| c.clone())
            .ok_or_else(|| Error::UnknownBehavior {
                name: name.to_owned(),
            })
    }

    /// Start a draft for a named effect.
    pub fn draft(&self, name: &str) -> Result<BehaviorDraft> {
        Ok(BehaviorDraft::new().with_channel(self.channel_for(name)?))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }
}

/// Keys written by [`apply`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AppliedBehavior {
    pub start_frame: Frame,
    pub end_frame: Frame,
    pub start_value: f32,
    pub end_value: f32,
}

/// Animate `spec` on `entity`, starting `spec.delay()` frames after `settle_frame`.
pub fn apply<H: Host + ?Sized>(
    spec: &BehaviorSpec,
    entity: EntityRef,
    settle_frame: Frame,
    host: &mut H,
) -> AppliedBehavior {
    let (start_frame, end_frame) = spec.frames(settle_frame);
    let axis = Some(spec.axis);

    let start_value = host
        .query_value_at_or_before(entity, &spec.channel, axis, start_frame)
        .or_else(|| host.property(entity, &spec.channel, axis))
        .unwrap_or_else(|| spec.channel.rest_value());

    host.record_keyframe(entity, &spec.channel, axis, start_frame, start_value);
    host.record_keyframe(entity, &spec.channel, axis, end_frame, spec.value);

    trace!(
        "{} {}[{}]: {} @{} -> {} @{}.",
        entity,
        spec.channel,
        spec.axis,
        start_value,
        start_frame,
        spec.value,
        end_frame
    );

    AppliedBehavior {
        start_frame,
        end_frame,
        start_value,
        end_value: spec.value,
    }
}
