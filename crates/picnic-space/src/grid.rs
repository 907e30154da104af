//! The cell grid with a one-cell halo.
//!
//! A grid of `cells_x x cells_y` owned cells is stored together with a
//! halo of [`Grid::HALO`] cells on every side, so valid cell coordinates
//! run from `-1` to `cells_x` (inclusive) along x. Cell `(i, j)` is the
//! grid node at physical position `(i * cell_width, j * cell_height)`.
//! Storage is row-major (x fastest).

use picnic_core::{Cell, ConfigError, IntBox};

/// Owned cells plus halo.
#[derive(Clone, Debug, PartialEq)]
pub struct Grid {
    owned: IntBox,
    cells_x: i32,
    cells_y: i32,
    cell_width: f64,
    cell_height: f64,
    cells: Vec<Cell>,
}

impl Grid {
    /// Halo width in cells.
    pub const HALO: i32 = 1;

    /// A grid of default (zero) cells.
    pub fn new(
        cells_x: usize,
        cells_y: usize,
        cell_width: f64,
        cell_height: f64,
    ) -> Result<Self, ConfigError> {
        let stored = Self::stored_len(cells_x, cells_y, cell_width, cell_height)?;
        Self::assemble(cells_x, cells_y, cell_width, cell_height, vec![Cell::default(); stored])
    }

    /// Rebuild a grid from stored cells (halo included, row-major).
    pub fn from_cells(
        cells_x: usize,
        cells_y: usize,
        cell_width: f64,
        cell_height: f64,
        cells: Vec<Cell>,
    ) -> Result<Self, ConfigError> {
        let stored = Self::stored_len(cells_x, cells_y, cell_width, cell_height)?;
        if cells.len() != stored {
            return Err(ConfigError::CellCountMismatch {
                name: "cells",
                expected: stored,
                found: cells.len(),
            });
        }
        Self::assemble(cells_x, cells_y, cell_width, cell_height, cells)
    }

    /// Validate the shape and return the stored cell count, before any
    /// allocation happens.
    fn stored_len(
        cells_x: usize,
        cells_y: usize,
        cell_width: f64,
        cell_height: f64,
    ) -> Result<usize, ConfigError> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(cell_width) || !positive(cell_height) {
            return Err(ConfigError::InvalidCellSize {
                width: cell_width,
                height: cell_height,
            });
        }
        if cells_x == 0 {
            return Err(ConfigError::ZeroCount { name: "cells_x" });
        }
        if cells_y == 0 {
            return Err(ConfigError::ZeroCount { name: "cells_y" });
        }
        let too_large = |name, value| ConfigError::CountTooLarge {
            name,
            value,
            maximum: i32::MAX as usize,
        };
        i32::try_from(cells_x).map_err(|_| too_large("cells_x", cells_x))?;
        i32::try_from(cells_y).map_err(|_| too_large("cells_y", cells_y))?;
        let halo = 2 * Self::HALO as usize;
        (cells_x + halo)
            .checked_mul(cells_y + halo)
            .ok_or_else(|| too_large("cells", cells_x.max(cells_y)))
    }

    fn assemble(
        cells_x: usize,
        cells_y: usize,
        cell_width: f64,
        cell_height: f64,
        cells: Vec<Cell>,
    ) -> Result<Self, ConfigError> {
        let cx = cells_x as i32;
        let cy = cells_y as i32;
        Ok(Self {
            owned: IntBox::new(0, cx, 0, cy)?,
            cells_x: cx,
            cells_y: cy,
            cell_width,
            cell_height,
            cells,
        })
    }

    /// Owned cells along x.
    pub fn cells_x(&self) -> i32 {
        self.cells_x
    }

    /// Owned cells along y.
    pub fn cells_y(&self) -> i32 {
        self.cells_y
    }

    /// Cell width.
    pub fn cell_width(&self) -> f64 {
        self.cell_width
    }

    /// Cell height.
    pub fn cell_height(&self) -> f64 {
        self.cell_height
    }

    /// Stored cells along x, halo included.
    pub fn stride(&self) -> i32 {
        self.cells_x + 2 * Self::HALO
    }

    /// The owned cells as a box.
    pub fn owned_box(&self) -> IntBox {
        self.owned
    }

    /// All stored cells as a box, halo included.
    pub fn storage_box(&self) -> IntBox {
        self.owned_box().expand(Self::HALO)
    }

    /// Storage index of `(x, y)`, or `None` outside the stored area.
    pub fn index(&self, x: i32, y: i32) -> Option<usize> {
        if self.storage_box().contains(x, y) {
            Some(((y + Self::HALO) * self.stride() + (x + Self::HALO)) as usize)
        } else {
            None
        }
    }

    /// Coordinates of the storage index `i`.
    pub fn coords(&self, i: usize) -> (i32, i32) {
        let i = i as i32;
        (i % self.stride() - Self::HALO, i / self.stride() - Self::HALO)
    }

    /// The cell at `(x, y)`.
    pub fn get(&self, x: i32, y: i32) -> Option<&Cell> {
        self.index(x, y).map(|i| &self.cells[i])
    }

    /// Mutable access to the cell at `(x, y)`.
    pub fn get_mut(&mut self, x: i32, y: i32) -> Option<&mut Cell> {
        self.index(x, y).map(move |i| &mut self.cells[i])
    }

    /// Overwrite the cell at `(x, y)`. Returns `false` outside the stored
    /// area.
    pub fn set(&mut self, x: i32, y: i32, cell: Cell) -> bool {
        match self.get_mut(x, y) {
            Some(c) => {
                *c = cell;
                true
            }
            None => false,
        }
    }

    fn clamp_coords(&self, x: i32, y: i32) -> (i32, i32) {
        (
            x.clamp(-Self::HALO, self.cells_x + Self::HALO - 1),
            y.clamp(-Self::HALO, self.cells_y + Self::HALO - 1),
        )
    }

    /// The cell at `(x, y)`, clamped into the stored area.
    pub fn clamped(&self, x: i32, y: i32) -> &Cell {
        let (x, y) = self.clamp_coords(x, y);
        let i = ((y + Self::HALO) * self.stride() + (x + Self::HALO)) as usize;
        &self.cells[i]
    }

    /// Mutable cell at `(x, y)`, clamped into the stored area.
    pub fn clamped_mut(&mut self, x: i32, y: i32) -> &mut Cell {
        let (x, y) = self.clamp_coords(x, y);
        let i = ((y + Self::HALO) * self.stride() + (x + Self::HALO)) as usize;
        &mut self.cells[i]
    }

    /// Every stored cell, row-major, halo included.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Mutable access to every stored cell.
    pub fn cells_mut(&mut self) -> &mut [Cell] {
        &mut self.cells
    }

    /// Physical position of the center of cell `(x, y)`.
    pub fn cell_center(&self, x: i32, y: i32) -> (f64, f64) {
        (
            (f64::from(x) + 0.5) * self.cell_width,
            (f64::from(y) + 0.5) * self.cell_height,
        )
    }

    /// Whether `(x, y)` is an owned cell.
    pub fn is_owned(&self, x: i32, y: i32) -> bool {
        self.owned_box().contains(x, y)
    }

    /// Copy `region` plus its halo out of this grid.
    ///
    /// `region` is given in this grid's coordinates; the result's cell
    /// `(0, 0)` is this grid's `(region.min_x(), region.min_y())`.
    pub fn subgrid(&self, region: &IntBox) -> Result<Grid, ConfigError> {
        let stored = region.expand(Self::HALO);
        let fits = self.storage_box().union(&stored) == self.storage_box();
        if !fits {
            return Err(ConfigError::MalformedBox {
                min_x: f64::from(region.min_x()),
                max_x: f64::from(region.max_x()),
                min_y: f64::from(region.min_y()),
                max_y: f64::from(region.max_y()),
            });
        }
        let mut sub = Grid::new(
            region.width() as usize,
            region.height() as usize,
            self.cell_width,
            self.cell_height,
        )?;
        for y in stored.min_y()..stored.max_y() {
            for x in stored.min_x()..stored.max_x() {
                let cell = *self.clamped(x, y);
                sub.set(x - region.min_x(), y - region.min_y(), cell);
            }
        }
        Ok(sub)
    }

    /// Write the owned cells of `sub` into this grid at `origin`.
    pub fn insert_owned(&mut self, origin: (i32, i32), sub: &Grid) {
        for y in 0..sub.cells_y {
            for x in 0..sub.cells_x {
                self.set(origin.0 + x, origin.1 + y, *sub.clamped(x, y));
            }
        }
    }
}
