//! Per-instance replication state and lineage bookkeeping.
//!
//! An [`EntityRecord`] is created once by a [`crate::replicate::Replicator`] and kept
//! for the lifetime of the lineage. Records are only mutated by the engine that owns
//! them: when their spawn animation settles and when one of their sides is closed.
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use glam::Vec3;

use crate::error::{Error, Result};
use crate::host::{EntityRef, Frame};
use crate::policy::{Direction, DirectionSet};

/// Identifier of a record within its lineage; the root is `#0`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(pub u64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identity of the engine owning a set of records.
///
/// Records refer back to their engine through this id, never by ownership.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LineageId(pub u64);

impl LineageId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        LineageId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for LineageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lineage:{}", self.0)
    }
}

/// Half-open frame range `[hidden_from, visible_from)` during which an entity is hidden.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VisibilityWindow {
    pub hidden_from: Frame,
    pub visible_from: Frame,
}

impl VisibilityWindow {
    pub fn new(hidden_from: Frame, visible_from: Frame) -> Self {
        Self {
            hidden_from: hidden_from.min(visible_from),
            visible_from,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.hidden_from == self.visible_from
    }

    pub fn contains(&self, frame: Frame) -> bool {
        (self.hidden_from..self.visible_from).contains(&frame)
    }

    pub fn is_visible_at(&self, frame: Frame) -> bool {
        frame >= self.visible_from
    }
}

/// Start and end of a record's spawn animation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MotionPath {
    pub location_start: Vec3,
    pub location_end: Vec3,
    pub scale_start: Vec3,
    pub scale_end: Vec3,
}

impl MotionPath {
    /// A path that does not move or resize.
    pub fn stationary(location: Vec3, scale: Vec3) -> Self {
        Self {
            location_start: location,
            location_end: location,
            scale_start: scale,
            scale_end: scale,
        }
    }

    pub fn is_stationary(&self) -> bool {
        self.location_start == self.location_end
    }
}

/// Frames bounding a record's spawn animation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpawnTiming {
    pub spawn_frame: Frame,
    pub settle_frame: Frame,
    /// `None` for entities that existed before replication started.
    pub visibility: Option<VisibilityWindow>,
}

/// State held for one replicated instance.
#[derive(Clone, Debug)]
pub struct EntityRecord {
    id: RecordId,
    lineage: LineageId,
    parent: Option<RecordId>,
    entity: EntityRef,
    spawn_generation: u32,
    path: MotionPath,
    timing: SpawnTiming,
    settled: bool,
    open_sides: DirectionSet,
}

impl EntityRecord {
    /// Root wrapping an entity that already exists in the host scene.
    ///
    /// The root never changes size: both scale bounds are the entity's current scale.
    pub(crate) fn existing_root(
        lineage: LineageId,
        entity: EntityRef,
        location: Vec3,
        scale: Vec3,
        frame: Frame,
    ) -> Self {
        Self {
            id: RecordId(0),
            lineage,
            parent: None,
            entity,
            spawn_generation: 0,
            path: MotionPath::stationary(location, scale),
            timing: SpawnTiming {
                spawn_frame: frame,
                settle_frame: frame,
                visibility: None,
            },
            settled: true,
            open_sides: DirectionSet::ALL,
        }
    }

    /// Root created as a fresh clone; it animates in like any spawned record.
    pub(crate) fn fresh_root(
        lineage: LineageId,
        entity: EntityRef,
        path: MotionPath,
        timing: SpawnTiming,
    ) -> Self {
        Self {
            id: RecordId(0),
            lineage,
            parent: None,
            entity,
            spawn_generation: 0,
            path,
            timing,
            settled: false,
            open_sides: DirectionSet::ALL,
        }
    }

    /// Non-root record spawned from `parent`.
    ///
    /// Fails with [`Error::InvalidParent`] when the parent is missing, has no finite
    /// location or is not from an earlier generation.
    pub fn child(
        id: RecordId,
        parent: Option<&EntityRecord>,
        entity: EntityRef,
        spawn_generation: u32,
        path: MotionPath,
        timing: SpawnTiming,
    ) -> Result<Self> {
        let parent = Self::check_parent(id, parent, spawn_generation)?;
        Ok(Self {
            id,
            lineage: parent.lineage,
            parent: Some(parent.id),
            entity,
            spawn_generation,
            path,
            timing,
            settled: false,
            open_sides: DirectionSet::ALL,
        })
    }

    /// Validate that `parent` may have a child `id` in `spawn_generation`.
    pub fn check_parent(
        id: RecordId,
        parent: Option<&EntityRecord>,
        spawn_generation: u32,
    ) -> Result<&EntityRecord> {
        let parent = parent.ok_or_else(|| {
            Error::InvalidParent(format!("record {id} has no parent record"))
        })?;
        if !parent.current_location().is_finite() {
            return Err(Error::InvalidParent(format!(
                "parent {} of record {id} has no finite location",
                parent.id
            )));
        }
        if spawn_generation <= parent.spawn_generation {
            return Err(Error::InvalidParent(format!(
                "record {id} in generation {spawn_generation} cannot descend from {} in generation {}",
                parent.id, parent.spawn_generation
            )));
        }
        Ok(parent)
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn lineage(&self) -> LineageId {
        self.lineage
    }

    pub fn parent(&self) -> Option<RecordId> {
        self.parent
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn entity(&self) -> EntityRef {
        self.entity
    }

    pub fn spawn_generation(&self) -> u32 {
        self.spawn_generation
    }

    pub fn path(&self) -> &MotionPath {
        &self.path
    }

    pub fn location_start(&self) -> Vec3 {
        self.path.location_start
    }

    pub fn location_end(&self) -> Vec3 {
        self.path.location_end
    }

    pub fn scale_start(&self) -> Vec3 {
        self.path.scale_start
    }

    pub fn scale_end(&self) -> Vec3 {
        self.path.scale_end
    }

    pub fn timing(&self) -> &SpawnTiming {
        &self.timing
    }

    pub fn visibility_window(&self) -> Option<VisibilityWindow> {
        self.timing.visibility
    }

    /// Whether the spawn animation has completed.
    pub fn is_settled(&self) -> bool {
        self.settled
    }

    /// Where the entity is now: its end once settled, its start before that.
    pub fn current_location(&self) -> Vec3 {
        if self.settled {
            self.path.location_end
        } else {
            self.path.location_start
        }
    }

    /// Sides not yet claimed or found blocked.
    pub fn open_sides(&self) -> DirectionSet {
        self.open_sides
    }

    /// A record with no open side will never spawn again.
    pub fn is_surrounded(&self) -> bool {
        self.open_sides.is_empty()
    }

    pub(crate) fn close_side(&mut self, direction: Direction) {
        self.open_sides.remove(direction);
    }

    pub(crate) fn close_sides(&mut self, directions: DirectionSet) {
        for direction in directions.iter() {
            self.close_side(direction);
        }
    }

    pub(crate) fn settle(&mut self) {
        self.settled = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> EntityRecord {
        EntityRecord::existing_root(LineageId(9), EntityRef(0), Vec3::ZERO, Vec3::ONE, 0)
    }

    fn path(end: Vec3) -> MotionPath {
        MotionPath {
            location_start: Vec3::ZERO,
            location_end: end,
            scale_start: Vec3::ZERO,
            scale_end: Vec3::ONE,
        }
    }

    fn timing() -> SpawnTiming {
        SpawnTiming {
            spawn_frame: 0,
            settle_frame: 15,
            visibility: Some(VisibilityWindow::new(0, 0)),
        }
    }

    #[test]
    fn existing_root_is_settled_and_keeps_its_scale() {
        let root = root();
        assert!(root.is_root());
        assert!(root.is_settled());
        assert_eq!(root.spawn_generation(), 0);
        assert_eq!(root.scale_start(), root.scale_end());
        assert!(root.path().is_stationary());
        assert_eq!(root.visibility_window(), None);
    }

    #[test]
    fn child_inherits_lineage_and_parent() {
        let root = root();
        let child = EntityRecord::child(
            RecordId(1),
            Some(&root),
            EntityRef(1),
            1,
            path(Vec3::X * 4.0),
            timing(),
        )
        .expect("valid parent");
        assert_eq!(child.lineage(), LineageId(9));
        assert_eq!(child.parent(), Some(RecordId(0)));
        assert_eq!(child.current_location(), Vec3::ZERO);
    }

    #[test]
    fn child_without_parent_is_rejected() {
        let err = EntityRecord::child(
            RecordId(1),
            None,
            EntityRef(1),
            1,
            path(Vec3::X),
            timing(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidParent(_)));
    }

    #[test]
    fn child_of_unlocated_parent_is_rejected() {
        let lost = EntityRecord::existing_root(
            LineageId(1),
            EntityRef(0),
            Vec3::splat(f32::NAN),
            Vec3::ONE,
            0,
        );
        let err = EntityRecord::child(
            RecordId(1),
            Some(&lost),
            EntityRef(1),
            1,
            path(Vec3::X),
            timing(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidParent(_)));
    }

    #[test]
    fn child_must_be_from_a_later_generation() {
        let root = root();
        let err = EntityRecord::child(
            RecordId(1),
            Some(&root),
            EntityRef(1),
            0,
            path(Vec3::X),
            timing(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidParent(_)));
    }

    #[test]
    fn current_location_moves_to_end_once_settled() {
        let root = root();
        let mut child = EntityRecord::child(
            RecordId(1),
            Some(&root),
            EntityRef(1),
            1,
            path(Vec3::Y * 4.0),
            timing(),
        )
        .unwrap();
        child.settle();
        assert_eq!(child.current_location(), Vec3::Y * 4.0);
    }

    #[test]
    fn closing_every_side_surrounds_the_record() {
        let mut record = root();
        for d in Direction::ALL {
            assert!(!record.is_surrounded());
            record.close_side(d);
        }
        assert!(record.is_surrounded());
    }

    #[test]
    fn visibility_window_is_half_open() {
        let window = VisibilityWindow::new(0, 15);
        assert!(window.contains(0));
        assert!(window.contains(14));
        assert!(!window.contains(15));
        assert!(window.is_visible_at(15));
        assert!(!window.is_empty());
        assert!(VisibilityWindow::new(20, 10).is_empty());
    }
}
