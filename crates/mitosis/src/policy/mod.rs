//! Spawn policy: candidate directions, axis gating and strategy dispatch.
//!
//! Candidates around a source location are produced in the fixed order
//! `+X, -X, +Y, -Y, +Z, -Z`. That order is the tie-break for which free side is
//! claimed first. Directions on disabled axes are not candidates at all.
//!
//! Each [`Strategy`] resolves to a [`SpawnProfile`] describing how a spawned record
//! moves, how big it starts, when it becomes visible and which collision rule
//! applies. The occupancy side of the rule lives in [`occupancy`].
use std::fmt;
use std::str::FromStr;

use glam::Vec3;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use tracing::trace;

use crate::error::Error;
use crate::policy::occupancy::OccupancyIndex;

pub mod occupancy;

/// A coordinate axis.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

impl FromStr for Axis {
    type Err = Error;

    /// Accepts `x`/`y`/`z` in any case, or an index `0`-`2`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "x" | "0" => Ok(Axis::X),
            "y" | "1" => Ok(Axis::Y),
            "z" | "2" => Ok(Axis::Z),
            other => Err(Error::Other(format!(
                "axis must be 'x', 'y', 'z' or 0-2, got '{other}'"
            ))),
        }
    }
}

/// One of the six axis-aligned spawn directions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    PosX,
    NegX,
    PosY,
    NegY,
    PosZ,
    NegZ,
}

impl Direction {
    /// All directions in claim order.
    pub const ALL: [Direction; 6] = [
        Direction::PosX,
        Direction::NegX,
        Direction::PosY,
        Direction::NegY,
        Direction::PosZ,
        Direction::NegZ,
    ];

    pub fn axis(self) -> Axis {
        match self {
            Direction::PosX | Direction::NegX => Axis::X,
            Direction::PosY | Direction::NegY => Axis::Y,
            Direction::PosZ | Direction::NegZ => Axis::Z,
        }
    }

    pub fn sign(self) -> f32 {
        match self {
            Direction::PosX | Direction::PosY | Direction::PosZ => 1.0,
            Direction::NegX | Direction::NegY | Direction::NegZ => -1.0,
        }
    }

    pub fn unit(self) -> Vec3 {
        let mut v = Vec3::ZERO;
        v[self.axis().index()] = self.sign();
        v
    }

    /// Offset from a source location to the neighbor in this direction.
    pub fn offset(self, spacing: f32) -> Vec3 {
        self.unit() * spacing
    }

    fn bit(self) -> u8 {
        match self {
            Direction::PosX => 1 << 0,
            Direction::NegX => 1 << 1,
            Direction::PosY => 1 << 2,
            Direction::NegY => 1 << 3,
            Direction::PosZ => 1 << 4,
            Direction::NegZ => 1 << 5,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Direction::PosX => "+x",
            Direction::NegX => "-x",
            Direction::PosY => "+y",
            Direction::NegY => "-y",
            Direction::PosZ => "+z",
            Direction::NegZ => "-z",
        };
        f.write_str(s)
    }
}

/// Compact set of directions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct DirectionSet(u8);

impl DirectionSet {
    pub const EMPTY: DirectionSet = DirectionSet(0);
    pub const ALL: DirectionSet = DirectionSet(0b11_1111);

    pub fn contains(self, direction: Direction) -> bool {
        self.0 & direction.bit() != 0
    }

    pub fn insert(&mut self, direction: Direction) {
        self.0 |= direction.bit();
    }

    pub fn remove(&mut self, direction: Direction) {
        self.0 &= !direction.bit();
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn iter(self) -> impl Iterator<Item = Direction> {
        Direction::ALL.into_iter().filter(move |d| self.contains(*d))
    }
}

/// Which axes are eligible for spawning.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AxisMask {
    pub use_x: bool,
    pub use_y: bool,
    pub use_z: bool,
}

impl Default for AxisMask {
    fn default() -> Self {
        Self::ALL
    }
}

impl AxisMask {
    pub const ALL: AxisMask = AxisMask {
        use_x: true,
        use_y: true,
        use_z: true,
    };

    pub fn new(use_x: bool, use_y: bool, use_z: bool) -> Self {
        Self {
            use_x,
            use_y,
            use_z,
        }
    }

    pub fn allows(&self, axis: Axis) -> bool {
        match axis {
            Axis::X => self.use_x,
            Axis::Y => self.use_y,
            Axis::Z => self.use_z,
        }
    }

    pub fn directions(&self) -> DirectionSet {
        let mut set = DirectionSet::EMPTY;
        for d in Direction::ALL {
            if self.allows(d.axis()) {
                set.insert(d);
            }
        }
        set
    }

    /// Upper bound on children a record can spawn in one generation.
    pub fn max_children(&self) -> usize {
        self.directions().len()
    }

    pub fn is_empty(&self) -> bool {
        !(self.use_x || self.use_y || self.use_z)
    }
}

/// Ordered spawn candidates around `source` on the enabled axes.
pub fn candidate_offsets(
    source: Vec3,
    spacing: f32,
    mask: AxisMask,
) -> impl Iterator<Item = (Direction, Vec3)> {
    Direction::ALL
        .into_iter()
        .filter(move |d| mask.allows(d.axis()))
        .map(move |d| (d, source + d.offset(spacing)))
}

/// Outcome of probing the open sides of a source location.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Probe {
    /// First free neighbor, in claim order.
    pub found: Option<(Direction, Vec3)>,
    /// Sides looked at, including the one found. None of them needs probing again.
    pub examined: DirectionSet,
}

/// Find the first free neighbor of `source` among its `open` sides.
///
/// Sides on disabled axes and sides whose neighbor is occupied under `rule` are
/// skipped. `found == None` means the source is fully surrounded, which is a normal
/// outcome and not an error.
pub fn probe(
    source: Vec3,
    spacing: f32,
    mask: AxisMask,
    open: DirectionSet,
    occupancy: &OccupancyIndex,
    rule: CollisionRule,
) -> Probe {
    let mut examined = DirectionSet::EMPTY;
    for direction in open.iter() {
        examined.insert(direction);
        if !mask.allows(direction.axis()) {
            continue;
        }
        let candidate = source + direction.offset(spacing);
        if occupancy.is_occupied(candidate, rule) {
            trace!("{} of {} is occupied.", direction, source);
            continue;
        }
        return Probe {
            found: Some((direction, candidate)),
            examined,
        };
    }
    Probe {
        found: None,
        examined,
    }
}

/// Named spawn animation variant.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Strategy {
    #[default]
    Divide,
    Appear,
    Inflate,
    DivideAndMerge,
    Separate,
}

impl Strategy {
    pub const ALL: [Strategy; 5] = [
        Strategy::Divide,
        Strategy::Appear,
        Strategy::Inflate,
        Strategy::DivideAndMerge,
        Strategy::Separate,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Strategy::Divide => "DIVIDE",
            Strategy::Appear => "APPEAR",
            Strategy::Inflate => "INFLATE",
            Strategy::DivideAndMerge => "DIVIDE_AND_MERGE",
            Strategy::Separate => "SEPARATE",
        }
    }

    /// Dispatch table entry for this strategy.
    pub fn profile(self) -> SpawnProfile {
        match self {
            Strategy::Divide | Strategy::Separate => SpawnProfile {
                path: PathKind::Travel,
                start_scale: StartScale::Configured,
                reveal: Reveal::OnSpawn,
                collision: CollisionRule::Historical,
            },
            Strategy::DivideAndMerge => SpawnProfile {
                path: PathKind::Travel,
                start_scale: StartScale::Configured,
                reveal: Reveal::OnSpawn,
                collision: CollisionRule::Settled,
            },
            Strategy::Appear => SpawnProfile {
                path: PathKind::InPlace,
                start_scale: StartScale::Zero,
                reveal: Reveal::OnSettle,
                collision: CollisionRule::Historical,
            },
            Strategy::Inflate => SpawnProfile {
                path: PathKind::InPlace,
                start_scale: StartScale::Zero,
                reveal: Reveal::OnSpawn,
                collision: CollisionRule::Historical,
            },
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Strategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace([' ', '-'], "_");
        Strategy::ALL
            .into_iter()
            .find(|strategy| strategy.name() == normalized)
            .ok_or_else(|| Error::UnknownStrategy { name: s.to_owned() })
    }
}

/// Where a spawned record travels during its spawn animation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathKind {
    /// From the parent's location to the claimed neighbor.
    Travel,
    /// Stays on the claimed neighbor.
    InPlace,
}

/// Scale a spawned record starts its animation with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StartScale {
    Configured,
    Zero,
}

/// Frame a spawned record becomes visible.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reveal {
    /// Visible from the frame it spawns.
    OnSpawn,
    /// Hidden until its spawn animation completes.
    OnSettle,
}

/// Which recorded positions block a candidate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CollisionRule {
    /// Every start and end position ever recorded.
    Historical,
    /// Only positions of records whose spawn animation completed.
    Settled,
}

/// Strategy-specific spawn behavior.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpawnProfile {
    pub path: PathKind,
    pub start_scale: StartScale,
    pub reveal: Reveal,
    pub collision: CollisionRule,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidates_follow_fixed_order() {
        let dirs: Vec<_> = candidate_offsets(Vec3::ZERO, 2.0, AxisMask::ALL)
            .map(|(d, _)| d)
            .collect();
        assert_eq!(dirs, Direction::ALL.to_vec());
    }

    #[test]
    fn candidates_are_offset_from_source() {
        let source = Vec3::new(1.0, 1.0, 1.0);
        let points: Vec<_> = candidate_offsets(source, 2.0, AxisMask::ALL)
            .map(|(_, p)| p)
            .collect();
        assert_eq!(points[0], Vec3::new(3.0, 1.0, 1.0));
        assert_eq!(points[1], Vec3::new(-1.0, 1.0, 1.0));
        assert_eq!(points[3], Vec3::new(1.0, -1.0, 1.0));
        assert_eq!(points[5], Vec3::new(1.0, 1.0, -1.0));
    }

    #[test]
    fn disabled_axes_are_not_candidates() {
        let mask = AxisMask::new(true, false, true);
        let dirs: Vec<_> = candidate_offsets(Vec3::ZERO, 1.0, mask)
            .map(|(d, _)| d)
            .collect();
        assert_eq!(
            dirs,
            vec![
                Direction::PosX,
                Direction::NegX,
                Direction::PosZ,
                Direction::NegZ
            ]
        );
    }

    #[test]
    fn disabling_one_axis_leaves_four_children() {
        assert_eq!(AxisMask::ALL.max_children(), 6);
        assert_eq!(AxisMask::new(true, true, false).max_children(), 4);
        assert_eq!(AxisMask::new(false, false, false).max_children(), 0);
        assert!(AxisMask::new(false, false, false).is_empty());
    }

    #[test]
    fn direction_set_tracks_membership() {
        let mut set = DirectionSet::ALL;
        assert_eq!(set.len(), 6);
        set.remove(Direction::NegY);
        assert!(!set.contains(Direction::NegY));
        assert!(set.contains(Direction::PosY));
        set.insert(Direction::NegY);
        assert_eq!(set, DirectionSet::ALL);
        assert!(DirectionSet::EMPTY.is_empty());
        assert_eq!(DirectionSet::EMPTY.iter().count(), 0);
    }

    fn surrounded_index(spacing: f32) -> OccupancyIndex {
        let mut index = OccupancyIndex::new(Vec3::ZERO, spacing);
        index.settle(Vec3::ZERO);
        for (_, p) in candidate_offsets(Vec3::ZERO, spacing, AxisMask::ALL) {
            index.settle(p);
        }
        index
    }

    #[test]
    fn probe_claims_first_free_side() {
        let mut index = OccupancyIndex::new(Vec3::ZERO, 1.0);
        index.claim(Vec3::X);
        let probe = probe(
            Vec3::ZERO,
            1.0,
            AxisMask::ALL,
            DirectionSet::ALL,
            &index,
            CollisionRule::Historical,
        );
        assert_eq!(probe.found, Some((Direction::NegX, Vec3::NEG_X)));
        assert_eq!(
            probe.examined.iter().collect::<Vec<_>>(),
            vec![Direction::PosX, Direction::NegX]
        );
    }

    #[test]
    fn probe_of_surrounded_source_finds_nothing() {
        let index = surrounded_index(2.0);
        for rule in [CollisionRule::Historical, CollisionRule::Settled] {
            let probe = probe(Vec3::ZERO, 2.0, AxisMask::ALL, DirectionSet::ALL, &index, rule);
            assert_eq!(probe.found, None);
            assert_eq!(probe.examined, DirectionSet::ALL);
        }
    }

    #[test]
    fn probe_skips_closed_and_disabled_sides() {
        let index = OccupancyIndex::new(Vec3::ZERO, 1.0);
        let mut open = DirectionSet::ALL;
        open.remove(Direction::PosY);
        let probe = probe(
            Vec3::ZERO,
            1.0,
            AxisMask::new(false, true, true),
            open,
            &index,
            CollisionRule::Historical,
        );
        assert_eq!(probe.found, Some((Direction::NegY, Vec3::NEG_Y)));
    }

    #[test]
    fn strategy_parses_case_insensitively() {
        assert_eq!("divide".parse::<Strategy>().unwrap(), Strategy::Divide);
        assert_eq!(
            "Divide_And_Merge".parse::<Strategy>().unwrap(),
            Strategy::DivideAndMerge
        );
        assert_eq!(
            "divide and merge".parse::<Strategy>().unwrap(),
            Strategy::DivideAndMerge
        );
        assert!(matches!(
            "explode".parse::<Strategy>(),
            Err(Error::UnknownStrategy { .. })
        ));
    }

    #[test]
    fn separate_aliases_divide() {
        assert_eq!(Strategy::Separate.profile(), Strategy::Divide.profile());
    }

    #[test]
    fn in_place_strategies_start_from_nothing() {
        for strategy in [Strategy::Appear, Strategy::Inflate] {
            let profile = strategy.profile();
            assert_eq!(profile.path, PathKind::InPlace);
            assert_eq!(profile.start_scale, StartScale::Zero);
        }
        assert_eq!(Strategy::Appear.profile().reveal, Reveal::OnSettle);
        assert_eq!(Strategy::Inflate.profile().reveal, Reveal::OnSpawn);
    }

    #[test]
    fn only_merge_relaxes_collisions() {
        for strategy in Strategy::ALL {
            let expected = if strategy == Strategy::DivideAndMerge {
                CollisionRule::Settled
            } else {
                CollisionRule::Historical
            };
            assert_eq!(strategy.profile().collision, expected);
        }
    }

    #[test]
    fn axis_parses_letters_and_indices() {
        assert_eq!("X".parse::<Axis>().unwrap(), Axis::X);
        assert_eq!("2".parse::<Axis>().unwrap(), Axis::Z);
        assert!("w".parse::<Axis>().is_err());
        assert_eq!(Axis::from_index(1), Some(Axis::Y));
        assert_eq!(Axis::from_index(3), None);
    }
}
