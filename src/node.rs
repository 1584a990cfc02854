//! Nodes of the structural model and the supports that restrain them.

use serde::{Deserialize, Serialize};

use crate::geometry::{Force, Point};

/// A pin joint of the structure.
///
/// After every analysis the force fields satisfy
/// `residuals = loads + reactions - resisting_forces`, with reactions on fixed
/// degrees of freedom only and residuals on free degrees of freedom only.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Position of the node in the node list.
    pub idx: usize,
    /// Current position in metres.
    pub coordinates: Point,
    /// Whether each translational degree of freedom (X, Y, Z) is free.
    pub is_free: [bool; 3],
    /// External point load in newtons.
    pub loads: Force,
    /// Support reactions in newtons.
    pub reactions: Force,
    /// Sum of the element forces resisting the node displacement, in newtons.
    pub resisting_forces: Force,
    /// Out of balance force in newtons.
    pub residuals: Force,
}

impl Node {
    /// Create a free, unloaded node.
    #[must_use]
    pub fn new(idx: usize, coordinates: Point) -> Self {
        Self {
            idx,
            coordinates,
            is_free: [true; 3],
            loads: Force::default(),
            reactions: Force::default(),
            resisting_forces: Force::default(),
            residuals: Force::default(),
        }
    }

    /// Number of free degrees of freedom.
    #[must_use]
    pub fn free_dof_count(&self) -> usize {
        self.is_free.iter().filter(|free| **free).count()
    }

    /// Whether at least one degree of freedom is restrained.
    #[must_use]
    pub fn is_supported(&self) -> bool {
        self.is_free.iter().any(|free| !free)
    }

    /// Combine a support with the current restraints; a direction stays free only
    /// when every support leaves it free.
    pub fn restrain(&mut self, is_free: [bool; 3]) {
        for (current, free) in self.is_free.iter_mut().zip(is_free) {
            *current = *current && free;
        }
    }
}

/// A support condition located at a point.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Support {
    /// Location of the supported node.
    pub point: Point,
    /// Whether each direction (X, Y, Z) stays free.
    pub is_free: [bool; 3],
}

impl Support {
    /// Create a support with explicit free directions.
    #[must_use]
    pub const fn new(point: Point, is_free: [bool; 3]) -> Self {
        Self { point, is_free }
    }

    /// A support restraining all three translations.
    #[must_use]
    pub const fn pinned(point: Point) -> Self {
        Self::new(point, [false; 3])
    }
}
