//! Lattice index of occupied positions.
//!
//! Every position the engine produces is the root location plus an integer multiple
//! of the spawn offset along each axis. Positions are therefore compared by their
//! [`LatticeKey`] instead of by float equality.
use std::collections::HashSet;

use glam::Vec3;

use crate::policy::CollisionRule;

/// Integer lattice coordinates of a position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LatticeKey(
    /// Steps along the X axis.
    pub i32,
    /// Steps along the Y axis.
    pub i32,
    /// Steps along the Z axis.
    pub i32,
);

/// Positions claimed by a lineage, split by whether they are settled.
#[derive(Clone, Debug)]
pub struct OccupancyIndex {
    origin: Vec3,
    spacing: f32,
    claimed: HashSet<LatticeKey>,
    settled: HashSet<LatticeKey>,
}

impl OccupancyIndex {
    pub fn new(origin: Vec3, spacing: f32) -> Self {
        debug_assert!(spacing > 0.0, "spacing must be > 0");
        Self {
            origin,
            spacing,
            claimed: HashSet::new(),
            settled: HashSet::new(),
        }
    }

    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    pub fn spacing(&self) -> f32 {
        self.spacing
    }

    /// Snap a position to its lattice key.
    pub fn key_for(&self, position: Vec3) -> LatticeKey {
        let steps = ((position - self.origin) / self.spacing).round();
        LatticeKey(steps.x as i32, steps.y as i32, steps.z as i32)
    }

    /// World position of a lattice key.
    pub fn position_of(&self, key: LatticeKey) -> Vec3 {
        self.origin + Vec3::new(key.0 as f32, key.1 as f32, key.2 as f32) * self.spacing
    }

    /// Record a start or end position of any record.
    pub fn claim(&mut self, position: Vec3) {
        let key = self.key_for(position);
        self.claimed.insert(key);
    }

    /// Record a position a record has come to rest on.
    pub fn settle(&mut self, position: Vec3) {
        let key = self.key_for(position);
        self.claimed.insert(key);
        self.settled.insert(key);
    }

    pub fn is_occupied(&self, position: Vec3, rule: CollisionRule) -> bool {
        let key = self.key_for(position);
        match rule {
            CollisionRule::Historical => self.claimed.contains(&key),
            CollisionRule::Settled => self.settled.contains(&key),
        }
    }

    pub fn claimed_len(&self) -> usize {
        self.claimed.len()
    }

    pub fn settled_len(&self) -> usize {
        self.settled.len()
    }
}
