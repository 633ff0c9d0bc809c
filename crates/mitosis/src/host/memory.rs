//! In-memory host implementing both collaborator traits.
//!
//! [`MemoryScene`] stands in for a content-creation application: it owns entities
//! with a live transform and stores one keyframe [`Curve`] per
//! `(entity, channel, axis)`. Tests, benches and demos drive the engine against it
//! and then sample the resulting timelines frame by frame.
use std::collections::HashMap;

use glam::Vec3;

use crate::host::{Channel, CloneRequest, EntityFactory, EntityRef, Frame, TimelineSink};

/// How a curve is evaluated between keyframes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Interpolation {
    /// Keep the previous key's value until the next key.
    Hold,
    Linear,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Keyframe {
    pub frame: Frame,
    pub value: f32,
}

/// Keyframes of one channel component, sorted by frame.
#[derive(Clone, Debug)]
pub struct Curve {
    keys: Vec<Keyframe>,
    interpolation: Interpolation,
}

impl Curve {
    pub fn new(interpolation: Interpolation) -> Self {
        Self {
            keys: Vec::new(),
            interpolation,
        }
    }

    /// Insert a key, replacing the value of an existing key at the same frame.
    pub fn insert(&mut self, frame: Frame, value: f32) {
        match self.keys.binary_search_by_key(&frame, |k| k.frame) {
            Ok(idx) => self.keys[idx].value = value,
            Err(idx) => self.keys.insert(idx, Keyframe { frame, value }),
        }
    }

    pub fn keys(&self) -> &[Keyframe] {
        &self.keys
    }

    pub fn interpolation(&self) -> Interpolation {
        self.interpolation
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Value of the latest key at or before `frame`.
    pub fn value_at_or_before(&self, frame: Frame) -> Option<f32> {
        let idx = self.keys.partition_point(|k| k.frame <= frame);
        if idx == 0 {
            None
        } else {
            Some(self.keys[idx - 1].value)
        }
    }

    /// Evaluate the curve at `frame`, extending the first and last keys outward.
    pub fn sample(&self, frame: Frame) -> Option<f32> {
        let first = self.keys.first()?;
        let idx = self.keys.partition_point(|k| k.frame <= frame);

        if idx == 0 {
            return Some(first.value);
        }
        if idx >= self.keys.len() {
            return Some(self.keys[self.keys.len() - 1].value);
        }

        let a = &self.keys[idx - 1];
        let b = &self.keys[idx];
        match self.interpolation {
            Interpolation::Hold => Some(a.value),
            Interpolation::Linear => {
                let denom = (b.frame - a.frame) as f32;
                let t = (frame - a.frame) as f32 / denom;
                Some(a.value + (b.value - a.value) * t)
            }
        }
    }
}

/// Live state of one entity.
#[derive(Clone, Debug)]
pub struct MemoryEntity {
    pub name: String,
    pub location: Vec3,
    pub scale: Vec3,
    /// Live values of channels other than location and scale.
    pub properties: HashMap<(Channel, usize), f32>,
    /// Template whose geometry data this entity shares, if linked.
    pub linked_to: Option<EntityRef>,
}

type CurveKey = (EntityRef, Channel, Option<usize>);

/// An in-memory scene: entity table plus keyframe curves.
#[derive(Clone, Debug, Default)]
pub struct MemoryScene {
    entities: Vec<MemoryEntity>,
    curves: HashMap<CurveKey, Curve>,
}

impl MemoryScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a standalone entity, e.g. the template a replicator copies.
    pub fn spawn_template(
        &mut self,
        name: impl Into<String>,
        location: impl Into<mint::Vector3<f32>>,
        scale: impl Into<mint::Vector3<f32>>,
    ) -> EntityRef {
        self.push(MemoryEntity {
            name: name.into(),
            location: Vec3::from(location.into()),
            scale: Vec3::from(scale.into()),
            properties: HashMap::new(),
            linked_to: None,
        })
    }

    fn push(&mut self, entity: MemoryEntity) -> EntityRef {
        let handle = EntityRef(self.entities.len() as u64);
        self.entities.push(entity);
        handle
    }

    pub fn entity(&self, entity: EntityRef) -> Option<&MemoryEntity> {
        self.entities.get(entity.0 as usize)
    }

    fn entity_mut(&mut self, entity: EntityRef) -> Option<&mut MemoryEntity> {
        self.entities.get_mut(entity.0 as usize)
    }

    /// Set the live value of a non-transform channel component.
    pub fn set_property(&mut self, entity: EntityRef, channel: Channel, axis: usize, value: f32) {
        if let Some(e) = self.entity_mut(entity) {
            e.properties.insert((channel, axis), value);
        }
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn curve_count(&self) -> usize {
        self.curves.len()
    }

    pub fn curve(&self, entity: EntityRef, channel: &Channel, axis: Option<usize>) -> Option<&Curve> {
        self.curves.get(&(entity, channel.clone(), axis))
    }

    /// Evaluate a channel component at `frame`, falling back to the live value.
    pub fn sample(
        &self,
        entity: EntityRef,
        channel: &Channel,
        axis: Option<usize>,
        frame: Frame,
    ) -> Option<f32> {
        self.curve(entity, channel, axis)
            .and_then(|c| c.sample(frame))
            .or_else(|| self.property(entity, channel, axis))
    }

    pub fn location_at(&self, entity: EntityRef, frame: Frame) -> Vec3 {
        self.sample_vec3(entity, &Channel::Location, frame)
    }

    pub fn scale_at(&self, entity: EntityRef, frame: Frame) -> Vec3 {
        self.sample_vec3(entity, &Channel::Scale, frame)
    }

    fn sample_vec3(&self, entity: EntityRef, channel: &Channel, frame: Frame) -> Vec3 {
        let mut out = Vec3::ZERO;
        for axis in 0..3 {
            out[axis] = self
                .sample(entity, channel, Some(axis), frame)
                .unwrap_or_else(|| channel.rest_value());
        }
        out
    }

    /// Entities without visibility keys are always visible.
    pub fn is_visible_at(&self, entity: EntityRef, frame: Frame) -> bool {
        self.curve(entity, &Channel::Visibility, None)
            .and_then(|c| c.sample(frame))
            .map_or(true, |v| v >= 0.5)
    }
}

impl EntityFactory for MemoryScene {
    fn contains(&self, entity: EntityRef) -> bool {
        (entity.0 as usize) < self.entities.len()
    }

    fn clone_entity(&mut self, request: CloneRequest<'_>) -> EntityRef {
        let (scale, properties, linked_to) = match self.entity(request.template) {
            Some(t) => (
                t.scale,
                t.properties.clone(),
                request.linked.then(|| t.linked_to.unwrap_or(request.template)),
            ),
            None => (Vec3::ONE, HashMap::new(), None),
        };
        self.push(MemoryEntity {
            name: request.name.to_owned(),
            location: request.location,
            scale,
            properties,
            linked_to,
        })
    }

    fn set_scale(&mut self, entity: EntityRef, scale: Vec3) {
        if let Some(e) = self.entity_mut(entity) {
            e.scale = scale;
        }
    }

    fn scale(&self, entity: EntityRef) -> Vec3 {
        self.entity(entity).map_or(Vec3::ONE, |e| e.scale)
    }

    fn set_location(&mut self, entity: EntityRef, location: Vec3) {
        if let Some(e) = self.entity_mut(entity) {
            e.location = location;
        }
    }

    fn location(&self, entity: EntityRef) -> Vec3 {
        self.entity(entity).map_or(Vec3::ZERO, |e| e.location)
    }

    fn name(&self, entity: EntityRef) -> Option<String> {
        self.entity(entity).map(|e| e.name.clone())
    }

    fn property(&self, entity: EntityRef, channel: &Channel, axis: Option<usize>) -> Option<f32> {
        let e = self.entity(entity)?;
        match (channel, axis) {
            (Channel::Location, Some(i)) if i < 3 => Some(e.location[i]),
            (Channel::Scale, Some(i)) if i < 3 => Some(e.scale[i]),
            (_, Some(i)) => e.properties.get(&(channel.clone(), i)).copied(),
            (_, None) => None,
        }
    }
}

impl TimelineSink for MemoryScene {
    fn record_keyframe(
        &mut self,
        entity: EntityRef,
        channel: &Channel,
        axis: Option<usize>,
        frame: Frame,
        value: f32,
    ) {
        let interpolation = if matches!(channel, Channel::Visibility) {
            Interpolation::Hold
        } else {
            Interpolation::Linear
        };
        self.curves
            .entry((entity, channel.clone(), axis))
            .or_insert_with(|| Curve::new(interpolation))
            .insert(frame, value);
    }

    fn query_value_at_or_before(
        &self,
        entity: EntityRef,
        channel: &Channel,
        axis: Option<usize>,
        frame: Frame,
    ) -> Option<f32> {
        self.curve(entity, channel, axis)
            .and_then(|c| c.value_at_or_before(frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curve_insert_keeps_keys_sorted_and_replaces_duplicates() {
        let mut curve = Curve::new(Interpolation::Linear);
        curve.insert(10, 1.0);
        curve.insert(0, 0.0);
        curve.insert(5, 0.5);
        curve.insert(10, 2.0);

        let frames: Vec<_> = curve.keys().iter().map(|k| k.frame).collect();
        assert_eq!(frames, vec![0, 5, 10]);
        assert_eq!(curve.value_at_or_before(10), Some(2.0));
        assert_eq!(curve.len(), 3);
    }

    #[test]
    fn value_at_or_before_is_none_before_first_key() {
        let mut curve = Curve::new(Interpolation::Linear);
        curve.insert(4, 3.0);
        assert_eq!(curve.value_at_or_before(3), None);
        assert_eq!(curve.value_at_or_before(4), Some(3.0));
        assert_eq!(curve.value_at_or_before(100), Some(3.0));
    }

    #[test]
    fn linear_curve_interpolates_between_keys() {
        let mut curve = Curve::new(Interpolation::Linear);
        curve.insert(0, 0.0);
        curve.insert(10, 10.0);
        assert_eq!(curve.sample(-5), Some(0.0));
        assert_eq!(curve.sample(5), Some(5.0));
        assert_eq!(curve.sample(20), Some(10.0));
    }

    #[test]
    fn hold_curve_steps() {
        let mut curve = Curve::new(Interpolation::Hold);
        curve.insert(0, 0.0);
        curve.insert(10, 1.0);
        assert_eq!(curve.sample(9), Some(0.0));
        assert_eq!(curve.sample(10), Some(1.0));
    }

    #[test]
    fn empty_curve_samples_to_none() {
        let curve = Curve::new(Interpolation::Linear);
        assert!(curve.is_empty());
        assert_eq!(curve.sample(0), None);
    }

    #[test]
    fn clone_copies_template_state_and_links_data() {
        let mut scene = MemoryScene::new();
        let template = scene.spawn_template("Cube", [1.0, 2.0, 3.0], [2.0, 2.0, 2.0]);
        scene.set_property(template, Channel::Rotation, 2, 45.0);

        let linked = scene.clone_entity(CloneRequest {
            template,
            location: Vec3::new(4.0, 0.0, 0.0),
            linked: true,
            name: "Cube_Replicant1",
        });
        let unlinked = scene.clone_entity(CloneRequest {
            template,
            location: Vec3::ZERO,
            linked: false,
            name: "Cube_Replicant2",
        });

        assert_eq!(scene.len(), 3);
        assert_eq!(scene.location(linked), Vec3::new(4.0, 0.0, 0.0));
        assert_eq!(scene.scale(linked), Vec3::splat(2.0));
        assert_eq!(
            scene.property(linked, &Channel::Rotation, Some(2)),
            Some(45.0)
        );
        assert_eq!(scene.entity(linked).unwrap().linked_to, Some(template));
        assert_eq!(scene.entity(unlinked).unwrap().linked_to, None);
        assert_eq!(scene.name(unlinked).as_deref(), Some("Cube_Replicant2"));
    }

    #[test]
    fn visibility_defaults_to_visible_without_keys() {
        let mut scene = MemoryScene::new();
        let e = scene.spawn_template("Cube", [0.0; 3], [1.0; 3]);
        assert!(scene.is_visible_at(e, 0));

        scene.record_keyframe(e, &Channel::Visibility, None, 0, 0.0);
        scene.record_keyframe(e, &Channel::Visibility, None, 8, 1.0);
        assert!(!scene.is_visible_at(e, 7));
        assert!(scene.is_visible_at(e, 8));
    }

    #[test]
    fn sampled_vectors_fall_back_to_live_transform() {
        let mut scene = MemoryScene::new();
        let e = scene.spawn_template("Cube", [1.0, 1.0, 1.0], [1.0; 3]);
        scene.record_vec3(e, &Channel::Location, 0, Vec3::ZERO);
        scene.record_vec3(e, &Channel::Location, 10, Vec3::new(10.0, 0.0, 0.0));

        assert_eq!(scene.location_at(e, 5), Vec3::new(5.0, 0.0, 0.0));
        assert_eq!(scene.scale_at(e, 5), Vec3::ONE);
        assert_eq!(scene.curve_count(), 3);
    }
}
