//! Cloud-in-cell weighting between particles and grid nodes.
//!
//! Cell `(i, j)` is the grid node at `(i * w, j * h)`. A particle in the
//! cell spanned by nodes `i..=i+1` and `j..=j+1` deposits to, and gathers
//! from, those four nodes with bilinear weights. A particle anywhere in the
//! owned area therefore touches at most one halo node on the max side of
//! each axis, which is the [`CloudInCell::RADIUS`] the exchange layer
//! sizes its border bands by.

use picnic_core::Particle;
use picnic_space::Grid;

/// Bilinear (area weighting) interpolation with a stencil of one cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CloudInCell;

/// Lower node and fractional offsets of a particle within its cell.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Stencil {
    i: i32,
    j: i32,
    fx: f64,
    fy: f64,
}

impl Stencil {
    fn weights(&self) -> [(i32, i32, f64); 4] {
        let (gx, gy) = (1.0 - self.fx, 1.0 - self.fy);
        [
            (self.i, self.j, gx * gy),
            (self.i + 1, self.j, self.fx * gy),
            (self.i, self.j + 1, gx * self.fy),
            (self.i + 1, self.j + 1, self.fx * self.fy),
        ]
    }
}

fn axis(pos: f64, size: f64, cells: i32) -> (i32, f64) {
    let scaled = pos / size;
    let floor = scaled.floor();
    // Out-of-range positions (rounding at an edge, NaN) collapse onto the
    // nearest stencil that stays inside the halo.
    let i = if floor.is_nan() {
        -1
    } else {
        (floor.max(-1.0).min(f64::from(cells - 1))) as i32
    };
    let frac = (scaled - f64::from(i)).clamp(0.0, 1.0);
    let frac = if frac.is_nan() { 0.0 } else { frac };
    (i, frac)
}

impl CloudInCell {
    /// Cells on each side of a particle the stencil may reach.
    pub const RADIUS: i32 = 1;

    fn stencil(grid: &Grid, p: &Particle) -> Stencil {
        let (i, fx) = axis(p.x, grid.cell_width(), grid.cells_x());
        let (j, fy) = axis(p.y, grid.cell_height(), grid.cells_y());
        Stencil { i, j, fx, fy }
    }

    /// Add the particle's charge and current density to the grid.
    pub fn deposit(&self, grid: &mut Grid, p: &Particle) {
        let area = grid.cell_width() * grid.cell_height();
        let q = p.charge / area;
        for (x, y, w) in Self::stencil(grid, p).weights() {
            let cell = grid.clamped_mut(x, y);
            cell.rho += q * w;
            cell.jx += q * p.vx * w;
            cell.jy += q * p.vy * w;
        }
    }

    /// Interpolate `ex`, `ey` and `bz` onto the particle.
    pub fn gather(&self, grid: &Grid, p: &mut Particle) {
        let (mut ex, mut ey, mut bz) = (0.0, 0.0, 0.0);
        for (x, y, w) in Self::stencil(grid, p).weights() {
            let cell = grid.clamped(x, y);
            ex += w * cell.ex;
            ey += w * cell.ey;
            bz += w * cell.bz;
        }
        p.ex = ex;
        p.ey = ey;
        p.bz = bz;
    }

    /// Whether a gather at `(x, y)` reads owned cells only.
    ///
    /// Positions in the last cell of either axis read the max-side halo.
    pub fn reads_owned_only(grid: &Grid, x: f64, y: f64) -> bool {
        let max_x = f64::from(grid.cells_x() - Self::RADIUS) * grid.cell_width();
        let max_y = f64::from(grid.cells_y() - Self::RADIUS) * grid.cell_height();
        x >= 0.0 && y >= 0.0 && x < max_x && y < max_y
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use picnic_core::{Cell, ParticleId};

    fn grid() -> Grid {
        Grid::new(4, 4, 0.5, 0.5).unwrap()
    }

    fn particle(x: f64, y: f64) -> Particle {
        Particle::new(ParticleId(0), x, y, 2.0, -1.0, 1.0, 1.0)
    }

    fn total_charge(g: &Grid) -> f64 {
        g.cells().iter().map(|c| c.rho).sum::<f64>() * g.cell_width() * g.cell_height()
    }

    #[test]
    fn deposit_conserves_charge() {
        let mut g = grid();
        let cic = CloudInCell;
        cic.deposit(&mut g, &particle(0.3, 1.1));
        cic.deposit(&mut g, &particle(1.99, 1.99));
        assert!((total_charge(&g) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn particle_on_node_deposits_to_one_cell() {
        let mut g = grid();
        CloudInCell.deposit(&mut g, &particle(1.0, 0.5));
        let c = g.get(2, 1).unwrap();
        assert!((c.rho - 4.0).abs() < 1e-12);
        assert!((c.jx - 8.0).abs() < 1e-12);
        assert_eq!(g.get(3, 1).unwrap().rho, 0.0);
    }

    #[test]
    fn last_cell_reaches_max_halo() {
        let mut g = grid();
        CloudInCell.deposit(&mut g, &particle(1.9, 1.9));
        assert!(g.get(4, 4).unwrap().rho > 0.0);
        assert!(!CloudInCell::reads_owned_only(&g, 1.9, 0.2));
        assert!(CloudInCell::reads_owned_only(&g, 1.4, 1.4));
    }

    #[test]
    fn gather_of_uniform_field_is_exact() {
        let mut g = grid();
        for c in g.cells_mut() {
            *c = Cell::with_fields(1.5, -2.0, 0.25);
        }
        let mut p = particle(0.7, 1.3);
        CloudInCell.gather(&g, &mut p);
        assert!((p.ex - 1.5).abs() < 1e-12);
        assert!((p.ey + 2.0).abs() < 1e-12);
        assert!((p.bz - 0.25).abs() < 1e-12);
    }

    #[test]
    fn ghost_position_uses_min_halo() {
        let mut g = grid();
        CloudInCell.deposit(&mut g, &particle(-0.25, 0.25));
        assert!(g.get(-1, 0).unwrap().rho > 0.0);
        assert!(g.get(0, 0).unwrap().rho > 0.0);
    }

    #[test]
    fn non_finite_position_is_clamped() {
        let mut g = grid();
        CloudInCell.deposit(&mut g, &particle(f64::NAN, 100.0));
        assert!((total_charge(&g) - 1.0).abs() < 1e-12);
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn deposit_conserves_charge_anywhere(x in -1.0f64..3.0, y in -1.0f64..3.0) {
                let mut g = grid();
                CloudInCell.deposit(&mut g, &particle(x, y));
                prop_assert!((total_charge(&g) - 1.0).abs() < 1e-12);
            }

            #[test]
            fn gather_of_uniform_field_is_exact_anywhere(x in 0.0f64..2.0, y in 0.0f64..2.0) {
                let mut g = grid();
                for c in g.cells_mut() {
                    *c = Cell::with_fields(0.5, 0.25, -1.0);
                }
                let mut p = particle(x, y);
                CloudInCell.gather(&g, &mut p);
                prop_assert!((p.ex - 0.5).abs() < 1e-12);
                prop_assert!((p.bz + 1.0).abs() < 1e-12);
            }
        }
    }
}
