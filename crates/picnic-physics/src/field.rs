//! Cell-local field updates.

use picnic_core::Cell;

/// How fields advance between deposit and gather.
///
/// Both variants only read the cell they update, so a field solve over a
/// partition's cells gives the same owned values as a solve over the
/// global grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FieldSolverKind {
    /// Fields never change.
    Frozen,
    /// Ampere's law without curl terms: `E -= dt * J`.
    #[default]
    Ampere,
}

impl FieldSolverKind {
    /// Advance one cell by `dt`.
    pub fn update(self, cell: &mut Cell, dt: f64) {
        match self {
            FieldSolverKind::Frozen => {}
            FieldSolverKind::Ampere => {
                cell.ex -= dt * cell.jx;
                cell.ey -= dt * cell.jy;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ampere_subtracts_current() {
        let mut c = Cell::with_fields(1.0, 1.0, 3.0);
        c.jx = 2.0;
        c.jy = -4.0;
        FieldSolverKind::Ampere.update(&mut c, 0.5);
        assert_eq!((c.ex, c.ey, c.bz), (0.0, 3.0, 3.0));
    }

    #[test]
    fn frozen_leaves_cell_untouched() {
        let mut c = Cell::with_fields(1.0, 2.0, 3.0);
        c.jx = 5.0;
        let before = c;
        FieldSolverKind::Frozen.update(&mut c, 1.0);
        assert_eq!(c, before);
    }
}
