//! The [`Cell`] value type: field and source values at one grid node.

/// Field values and deposited sources at one grid node.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Cell {
    /// Electric field x.
    pub ex: f64,
    /// Electric field y.
    pub ey: f64,
    /// Magnetic field z.
    pub bz: f64,
    /// Current density x.
    pub jx: f64,
    /// Current density y.
    pub jy: f64,
    /// Charge density.
    pub rho: f64,
}

impl Cell {
    /// Number of `f64` components, in wire order.
    pub const COMPONENTS: usize = 6;

    /// A cell with the given fields and no sources.
    pub fn with_fields(ex: f64, ey: f64, bz: f64) -> Self {
        Self {
            ex,
            ey,
            bz,
            ..Self::default()
        }
    }

    /// Zero the deposited sources, keeping the fields.
    pub fn reset_sources(&mut self) {
        self.jx = 0.0;
        self.jy = 0.0;
        self.rho = 0.0;
    }

    /// Accumulate another cell's sources into this one.
    pub fn add_sources(&mut self, other: &Cell) {
        self.jx += other.jx;
        self.jy += other.jy;
        self.rho += other.rho;
    }

    /// Components in wire order: `ex, ey, bz, jx, jy, rho`.
    pub fn components(&self) -> [f64; Self::COMPONENTS] {
        [self.ex, self.ey, self.bz, self.jx, self.jy, self.rho]
    }

    /// Inverse of [`Cell::components`].
    pub fn from_components(c: [f64; Self::COMPONENTS]) -> Self {
        Self {
            ex: c[0],
            ey: c[1],
            bz: c[2],
            jx: c[3],
            jy: c[4],
            rho: c[5],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_sources_keeps_fields() {
        let mut c = Cell {
            ex: 1.0,
            ey: 2.0,
            bz: 3.0,
            jx: 4.0,
            jy: 5.0,
            rho: 6.0,
        };
        c.reset_sources();
        assert_eq!(c, Cell::with_fields(1.0, 2.0, 3.0));
    }

    #[test]
    fn add_sources_ignores_fields() {
        let mut a = Cell::with_fields(1.0, 1.0, 1.0);
        let b = Cell {
            ex: 9.0,
            jx: 0.5,
            rho: 2.0,
            ..Cell::default()
        };
        a.add_sources(&b);
        assert_eq!(a.ex, 1.0);
        assert_eq!(a.jx, 0.5);
        assert_eq!(a.rho, 2.0);
    }
}
