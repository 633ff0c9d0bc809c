//! Replicator configuration and root seeding.
use glam::Vec3;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::host::{EntityRef, Frame};
use crate::policy::{AxisMask, Strategy};

/// Configuration for a [`crate::replicate::Replicator`].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
pub struct ReplicatorConfig {
    /// Distance between adjacent entities in world units.
    pub spawn_offset: f32,
    /// Frame the first generation starts on.
    pub frame_start: Frame,
    /// Length of each generation's spawn animation in frames.
    pub frames_to_spawn: u32,
    /// Scale of a spawned entity when its animation starts.
    pub scale_start: Vec3,
    /// Scale of a spawned entity once settled.
    pub scale_end: Vec3,
    /// Use the template entity's scale instead of `scale_end`.
    pub use_template_scale: bool,
    /// Axes spawning may use.
    pub axis_mask: AxisMask,
    pub strategy: Strategy,
    /// Clones share geometry data with the template.
    pub linked: bool,
    /// Prefix for clone names; derived from the template name when unset.
    pub name_prefix: Option<String>,
}

impl Default for ReplicatorConfig {
    fn default() -> Self {
        Self {
            spawn_offset: 4.0,
            frame_start: 0,
            frames_to_spawn: 15,
            scale_start: Vec3::ZERO,
            scale_end: Vec3::ONE,
            use_template_scale: false,
            axis_mask: AxisMask::ALL,
            strategy: Strategy::Divide,
            linked: true,
            name_prefix: None,
        }
    }
}

impl ReplicatorConfig {
    /// Creates a new [`ReplicatorConfig`] for the given strategy.
    pub fn new(strategy: Strategy) -> Self {
        Self {
            strategy,
            ..Default::default()
        }
    }

    /// Sets the spawn offset.
    pub fn with_spawn_offset(mut self, spawn_offset: f32) -> Self {
        self.spawn_offset = spawn_offset;
        self
    }

    /// Sets the starting frame.
    pub fn with_frame_start(mut self, frame_start: Frame) -> Self {
        self.frame_start = frame_start;
        self
    }

    /// Sets the length of each spawn animation.
    pub fn with_frames_to_spawn(mut self, frames_to_spawn: u32) -> Self {
        self.frames_to_spawn = frames_to_spawn;
        self
    }

    pub fn with_scale_start(mut self, scale: impl Into<mint::Vector3<f32>>) -> Self {
        self.scale_start = Vec3::from(scale.into());
        self
    }

    pub fn with_scale_end(mut self, scale: impl Into<mint::Vector3<f32>>) -> Self {
        self.scale_end = Vec3::from(scale.into());
        self
    }

    /// Sets the starting scale from loosely typed input.
    pub fn try_with_scale_start(self, values: &[f32]) -> Result<Self> {
        let scale = vec3_from_slice("scale_start", values)?;
        Ok(self.with_scale_start(scale))
    }

    /// Sets the end scale from loosely typed input.
    pub fn try_with_scale_end(self, values: &[f32]) -> Result<Self> {
        let scale = vec3_from_slice("scale_end", values)?;
        Ok(self.with_scale_end(scale))
    }

    pub fn with_template_scale(mut self, use_template_scale: bool) -> Self {
        self.use_template_scale = use_template_scale;
        self
    }

    pub fn with_axis_mask(mut self, axis_mask: AxisMask) -> Self {
        self.axis_mask = axis_mask;
        self
    }

    /// Shorthand for [`ReplicatorConfig::with_axis_mask`].
    pub fn with_axes(self, use_x: bool, use_y: bool, use_z: bool) -> Self {
        self.with_axis_mask(AxisMask::new(use_x, use_y, use_z))
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_linked(mut self, linked: bool) -> Self {
        self.linked = linked;
        self
    }

    pub fn with_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefix = Some(prefix.into());
        self
    }

    /// Validates the configuration, returning an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if !self.spawn_offset.is_finite() || self.spawn_offset <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "spawn_offset must be finite and > 0, got {}",
                self.spawn_offset
            )));
        }
        if Frame::try_from(self.frames_to_spawn).is_err() {
            return Err(Error::InvalidConfig(format!(
                "frames_to_spawn must fit the frame range, got {}",
                self.frames_to_spawn
            )));
        }
        check_scale("scale_start", self.scale_start)?;
        check_scale("scale_end", self.scale_end)?;
        Ok(())
    }
}

pub(crate) fn check_scale(field: &str, scale: Vec3) -> Result<()> {
    if !scale.is_finite() {
        return Err(Error::InvalidConfig(format!(
            "{field} must have finite components, got {scale}"
        )));
    }
    if scale.min_element() < 0.0 {
        return Err(Error::InvalidConfig(format!(
            "{field} must not be negative, got {scale}"
        )));
    }
    Ok(())
}

/// Convert a slice into a 3-component vector, requiring exactly three finite numbers.
pub fn vec3_from_slice(field: &str, values: &[f32]) -> Result<Vec3> {
    match values {
        [x, y, z] if x.is_finite() && y.is_finite() && z.is_finite() => Ok(Vec3::new(*x, *y, *z)),
        [_, _, _] => Err(Error::InvalidConfig(format!(
            "{field} components must be finite numbers, got {values:?}"
        ))),
        _ => Err(Error::InvalidConfig(format!(
            "{field} must have exactly 3 components, got {}",
            values.len()
        ))),
    }
}

/// How the generation-0 record is created.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RootSeed {
    /// Wrap an entity that already exists; it doubles as the clone template.
    Existing(EntityRef),
    /// Clone `template` at `location` and animate it in like a spawned record.
    Fresh { template: EntityRef, location: Vec3 },
}

impl RootSeed {
    pub fn existing(entity: EntityRef) -> Self {
        RootSeed::Existing(entity)
    }

    pub fn fresh(template: EntityRef, location: impl Into<mint::Vector3<f32>>) -> Self {
        RootSeed::Fresh {
            template,
            location: Vec3::from(location.into()),
        }
    }

    /// Entity every spawned record is cloned from.
    pub fn template(&self) -> EntityRef {
        match self {
            RootSeed::Existing(entity) => *entity,
            RootSeed::Fresh { template, .. } => *template,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = ReplicatorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.scale_start, Vec3::ZERO);
        assert_eq!(config.scale_end, Vec3::ONE);
        assert_eq!(config.axis_mask.max_children(), 6);
    }

    #[test]
    fn builders_set_fields() {
        let config = ReplicatorConfig::new(Strategy::Inflate)
            .with_spawn_offset(2.5)
            .with_frame_start(10)
            .with_frames_to_spawn(5)
            .with_scale_start([0.2, 0.2, 0.2])
            .with_scale_end(Vec3::splat(3.0))
            .with_axes(true, false, true)
            .with_linked(false)
            .with_name_prefix("Cell_");

        assert_eq!(config.strategy, Strategy::Inflate);
        assert_eq!(config.spawn_offset, 2.5);
        assert_eq!(config.frame_start, 10);
        assert_eq!(config.frames_to_spawn, 5);
        assert_eq!(config.scale_start, Vec3::splat(0.2));
        assert_eq!(config.scale_end, Vec3::splat(3.0));
        assert!(!config.axis_mask.use_y);
        assert!(!config.linked);
        assert_eq!(config.name_prefix.as_deref(), Some("Cell_"));
    }

    #[test]
    fn non_positive_offset_is_rejected() {
        for offset in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            let err = ReplicatorConfig::default()
                .with_spawn_offset(offset)
                .validate()
                .unwrap_err();
            assert!(matches!(err, Error::InvalidConfig(_)));
        }
    }

    #[test]
    fn frames_to_spawn_must_fit_the_frame_range() {
        let max = ReplicatorConfig::default().with_frames_to_spawn(i32::MAX as u32);
        assert!(max.validate().is_ok());

        let wrapped = ReplicatorConfig::default().with_frames_to_spawn(3_000_000_000);
        assert!(matches!(wrapped.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn malformed_scales_are_rejected() {
        let nan = ReplicatorConfig::default().with_scale_end([1.0, f32::NAN, 1.0]);
        assert!(matches!(nan.validate(), Err(Error::InvalidConfig(_))));

        let negative = ReplicatorConfig::default().with_scale_start([-0.1, 0.0, 0.0]);
        assert!(matches!(negative.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn slice_scales_need_three_finite_components() {
        assert!(ReplicatorConfig::default()
            .try_with_scale_start(&[0.5, 0.5, 0.5])
            .is_ok());
        assert!(matches!(
            ReplicatorConfig::default().try_with_scale_end(&[1.0, 1.0]),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            vec3_from_slice("scale_end", &[1.0, f32::INFINITY, 1.0]),
            Err(Error::InvalidConfig(_))
        ));
        assert!(vec3_from_slice("scale_end", &[1.0; 4]).is_err());
    }

    #[test]
    fn seed_exposes_template() {
        let template = EntityRef(3);
        assert_eq!(RootSeed::existing(template).template(), template);
        let fresh = RootSeed::fresh(template, [1.0, 2.0, 3.0]);
        assert_eq!(fresh.template(), template);
        assert!(matches!(fresh, RootSeed::Fresh { location, .. } if location == Vec3::new(1.0, 2.0, 3.0)));
    }
}
