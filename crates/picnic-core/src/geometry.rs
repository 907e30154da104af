//! Axis-aligned boxes in grid-cell ([`IntBox`]) and physical
//! ([`DoubleBox`]) coordinates.
//!
//! Both are half-open: a box covers `[min_x, max_x) x [min_y, max_y)`.
//! Construction rejects boxes with `min >= max` on either axis, so every
//! box in the system has a positive area.

use std::fmt;

use crate::error::ConfigError;

// ── IntBox ──────────────────────────────────────────────────────

/// A rectangle of grid cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct IntBox {
    min_x: i32,
    max_x: i32,
    min_y: i32,
    max_y: i32,
}

impl IntBox {
    /// Create a box covering `[min_x, max_x) x [min_y, max_y)`.
    pub fn new(min_x: i32, max_x: i32, min_y: i32, max_y: i32) -> Result<Self, ConfigError> {
        if min_x >= max_x || min_y >= max_y {
            return Err(ConfigError::MalformedBox {
                min_x: f64::from(min_x),
                max_x: f64::from(max_x),
                min_y: f64::from(min_y),
                max_y: f64::from(max_y),
            });
        }
        Ok(Self {
            min_x,
            max_x,
            min_y,
            max_y,
        })
    }

    /// Lower x bound (inclusive).
    pub fn min_x(&self) -> i32 {
        self.min_x
    }

    /// Upper x bound (exclusive).
    pub fn max_x(&self) -> i32 {
        self.max_x
    }

    /// Lower y bound (inclusive).
    pub fn min_y(&self) -> i32 {
        self.min_y
    }

    /// Upper y bound (exclusive).
    pub fn max_y(&self) -> i32 {
        self.max_y
    }

    /// Number of cells along x.
    pub fn width(&self) -> i32 {
        self.max_x - self.min_x
    }

    /// Number of cells along y.
    pub fn height(&self) -> i32 {
        self.max_y - self.min_y
    }

    /// Number of cells covered.
    pub fn area(&self) -> usize {
        self.width() as usize * self.height() as usize
    }

    /// Whether cell `(x, y)` lies inside the box.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.min_x && x < self.max_x && y >= self.min_y && y < self.max_y
    }

    /// Whether the two boxes share at least one cell.
    pub fn intersects(&self, other: &IntBox) -> bool {
        self.min_x < other.max_x
            && other.min_x < self.max_x
            && self.min_y < other.max_y
            && other.min_y < self.max_y
    }

    /// The smallest box containing both boxes.
    pub fn union(&self, other: &IntBox) -> IntBox {
        IntBox {
            min_x: self.min_x.min(other.min_x),
            max_x: self.max_x.max(other.max_x),
            min_y: self.min_y.min(other.min_y),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// Grow the box by `margin` cells on every side.
    pub fn expand(&self, margin: i32) -> IntBox {
        IntBox {
            min_x: self.min_x - margin,
            max_x: self.max_x + margin,
            min_y: self.min_y - margin,
            max_y: self.max_y + margin,
        }
    }

    /// The physical extent of the box for the given cell size.
    pub fn to_physical(&self, cell_width: f64, cell_height: f64) -> DoubleBox {
        DoubleBox {
            min_x: f64::from(self.min_x) * cell_width,
            max_x: f64::from(self.max_x) * cell_width,
            min_y: f64::from(self.min_y) * cell_height,
            max_y: f64::from(self.max_y) * cell_height,
        }
    }
}

impl fmt::Display for IntBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}) x [{}, {})",
            self.min_x, self.max_x, self.min_y, self.max_y
        )
    }
}

// ── DoubleBox ───────────────────────────────────────────────────

/// A rectangle in physical coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DoubleBox {
    min_x: f64,
    max_x: f64,
    min_y: f64,
    max_y: f64,
}

impl DoubleBox {
    /// Create a box covering `[min_x, max_x) x [min_y, max_y)`.
    ///
    /// Non-finite bounds are rejected along with empty boxes.
    pub fn new(min_x: f64, max_x: f64, min_y: f64, max_y: f64) -> Result<Self, ConfigError> {
        let finite = [min_x, max_x, min_y, max_y].iter().all(|v| v.is_finite());
        if !finite || min_x >= max_x || min_y >= max_y {
            return Err(ConfigError::MalformedBox {
                min_x,
                max_x,
                min_y,
                max_y,
            });
        }
        Ok(Self {
            min_x,
            max_x,
            min_y,
            max_y,
        })
    }

    /// Lower x bound (inclusive).
    pub fn min_x(&self) -> f64 {
        self.min_x
    }

    /// Upper x bound (exclusive).
    pub fn max_x(&self) -> f64 {
        self.max_x
    }

    /// Lower y bound (inclusive).
    pub fn min_y(&self) -> f64 {
        self.min_y
    }

    /// Upper y bound (exclusive).
    pub fn max_y(&self) -> f64 {
        self.max_y
    }

    /// Extent along x.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Extent along y.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Whether the point lies inside the box.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x < self.max_x && y >= self.min_y && y < self.max_y
    }

    /// Shrink the box by `dx` on both x sides and `dy` on both y sides.
    pub fn shrink(&self, dx: f64, dy: f64) -> Result<DoubleBox, ConfigError> {
        DoubleBox::new(
            self.min_x + dx,
            self.max_x - dx,
            self.min_y + dy,
            self.max_y - dy,
        )
    }
}

impl fmt::Display for DoubleBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}) x [{}, {})",
            self.min_x, self.max_x, self.min_y, self.max_y
        )
    }
}
