//! Strongly-typed identifiers and the [`Direction`] type.

use std::fmt;

/// Identifies a compute node (and the partition assigned to it).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    /// The node that distributes the problem and gathers results.
    pub const MASTER: NodeId = NodeId(0);

    /// The node id as an index into the partition table.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for NodeId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Stable identity of a particle across nodes and runs.
///
/// Used to match particles when comparing a distributed run against a
/// local one, since particle order is not preserved across migration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticleId(pub u64);

impl fmt::Display for ParticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ParticleId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

// ── Direction ───────────────────────────────────────────────────

/// Offset `(dx, dy)` of a neighboring partition, each component in
/// `{-1, 0, 1}` and never both zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Direction {
    dx: i8,
    dy: i8,
}

impl Direction {
    /// `(-1, -1)`.
    pub const MINUS_X_MINUS_Y: Direction = Direction { dx: -1, dy: -1 };
    /// `(0, -1)`.
    pub const MINUS_Y: Direction = Direction { dx: 0, dy: -1 };
    /// `(1, -1)`.
    pub const PLUS_X_MINUS_Y: Direction = Direction { dx: 1, dy: -1 };
    /// `(-1, 0)`.
    pub const MINUS_X: Direction = Direction { dx: -1, dy: 0 };
    /// `(1, 0)`.
    pub const PLUS_X: Direction = Direction { dx: 1, dy: 0 };
    /// `(-1, 1)`.
    pub const MINUS_X_PLUS_Y: Direction = Direction { dx: -1, dy: 1 };
    /// `(0, 1)`.
    pub const PLUS_Y: Direction = Direction { dx: 0, dy: 1 };
    /// `(1, 1)`.
    pub const PLUS_X_PLUS_Y: Direction = Direction { dx: 1, dy: 1 };

    /// All eight directions, y-major.
    pub const ALL: [Direction; 8] = [
        Self::MINUS_X_MINUS_Y,
        Self::MINUS_Y,
        Self::PLUS_X_MINUS_Y,
        Self::MINUS_X,
        Self::PLUS_X,
        Self::MINUS_X_PLUS_Y,
        Self::PLUS_Y,
        Self::PLUS_X_PLUS_Y,
    ];

    /// Build a direction from its components.
    ///
    /// Returns `None` for `(0, 0)` or components outside `{-1, 0, 1}`.
    pub fn new(dx: i32, dy: i32) -> Option<Self> {
        if (dx, dy) == (0, 0) || !(-1..=1).contains(&dx) || !(-1..=1).contains(&dy) {
            return None;
        }
        Some(Self {
            dx: dx as i8,
            dy: dy as i8,
        })
    }

    /// X component.
    pub fn dx(self) -> i32 {
        i32::from(self.dx)
    }

    /// Y component.
    pub fn dy(self) -> i32 {
        i32::from(self.dy)
    }

    /// The direction pointing the other way.
    pub fn opposite(self) -> Self {
        Self {
            dx: -self.dx,
            dy: -self.dy,
        }
    }

    /// Whether both components are non-zero.
    pub fn is_diagonal(self) -> bool {
        self.dx != 0 && self.dy != 0
    }

    /// Position of this direction in [`Direction::ALL`].
    pub fn index(self) -> usize {
        let raw = ((self.dy + 1) * 3 + (self.dx + 1)) as usize;
        if raw > 4 {
            raw - 1
        } else {
            raw
        }
    }

    /// Inverse of [`Direction::index`].
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.dx, self.dy)
    }
}
