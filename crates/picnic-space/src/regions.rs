//! Point classification against a partition's boxes.
//!
//! Each axis is bucketed independently and the two bucket ids are summed
//! into a [`RegionId`]. The y ids are spaced by the number of x buckets,
//! so the sum is unique per `(x bucket, y bucket)` pair and can be
//! decomposed again.
//!
//! - [`BoundaryRegions`] uses 3 buckets per axis (below, inside, above the
//!   simulation box): 9 regions, center `4`.
//! - [`BorderRegions`] uses 5 buckets per axis (below, min border band,
//!   center, max border band, above): 25 regions, center `12`.
//!
//! Classification is total. Every point, including NaN coordinates,
//! lands in exactly one region; a NaN falls into the "above" bucket.

use std::fmt;

use picnic_core::{ConfigError, Direction, DoubleBox};

/// Region identifier produced by a classifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionId(pub u8);

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One-axis classification bucket of [`BorderRegions`], in order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Bucket {
    /// Below the simulation box.
    BoundaryMin,
    /// Inside the simulation box, below the inner box.
    BorderMin,
    /// Inside the inner box.
    Center,
    /// Inside the simulation box, at or above the inner box.
    BorderMax,
    /// At or above the simulation box.
    BoundaryMax,
}

impl Bucket {
    /// All buckets in axis order.
    pub const ALL: [Bucket; 5] = [
        Bucket::BoundaryMin,
        Bucket::BorderMin,
        Bucket::Center,
        Bucket::BorderMax,
        Bucket::BoundaryMax,
    ];

    /// Position in [`Bucket::ALL`].
    pub fn index(self) -> u8 {
        match self {
            Bucket::BoundaryMin => 0,
            Bucket::BorderMin => 1,
            Bucket::Center => 2,
            Bucket::BorderMax => 3,
            Bucket::BoundaryMax => 4,
        }
    }

    /// Which side of the partition the bucket lies on: `-1`, `0` or `1`.
    pub fn side(self) -> i32 {
        match self {
            Bucket::BoundaryMin | Bucket::BorderMin => -1,
            Bucket::Center => 0,
            Bucket::BorderMax | Bucket::BoundaryMax => 1,
        }
    }

    /// Whether the bucket lies outside the simulation box.
    pub fn is_outside(self) -> bool {
        matches!(self, Bucket::BoundaryMin | Bucket::BoundaryMax)
    }

    /// Whether the bucket is one of the two border bands.
    pub fn is_border(self) -> bool {
        matches!(self, Bucket::BorderMin | Bucket::BorderMax)
    }
}

// ── BoundaryRegions ─────────────────────────────────────────────

/// Coarse 3x3 classification against the simulation box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundaryRegions {
    sim: DoubleBox,
}

impl BoundaryRegions {
    /// Region of points inside the simulation box.
    pub const CENTER: RegionId = RegionId(4);
    /// Number of distinct regions.
    pub const COUNT: usize = 9;

    /// Classifier for the given simulation box.
    pub fn new(sim: DoubleBox) -> Self {
        Self { sim }
    }

    /// The simulation box.
    pub fn simulation_box(&self) -> &DoubleBox {
        &self.sim
    }

    fn side(v: f64, min: f64, max: f64) -> i32 {
        if v < min {
            -1
        } else if v < max {
            0
        } else {
            1
        }
    }

    /// Region of the point `(x, y)`.
    pub fn region(&self, x: f64, y: f64) -> RegionId {
        let sx = Self::side(x, self.sim.min_x(), self.sim.max_x());
        let sy = Self::side(y, self.sim.min_y(), self.sim.max_y());
        Self::compose(sx, sy)
    }

    /// Region id for the given axis sides, each in `{-1, 0, 1}`.
    pub fn compose(sx: i32, sy: i32) -> RegionId {
        RegionId(((sx + 1) + 3 * (sy + 1)) as u8)
    }

    /// Inverse of [`BoundaryRegions::compose`]; `None` for unknown ids.
    pub fn decompose(region: RegionId) -> Option<(i32, i32)> {
        if usize::from(region.0) >= Self::COUNT {
            return None;
        }
        let x = i32::from(region.0 % 3);
        let y = i32::from(region.0 / 3);
        Some((x - 1, y - 1))
    }

    /// Direction in which a point of this region left the box.
    ///
    /// `None` for the center region and unknown ids.
    pub fn direction(region: RegionId) -> Option<Direction> {
        let (sx, sy) = Self::decompose(region)?;
        Direction::new(sx, sy)
    }
}

// ── BorderRegions ───────────────────────────────────────────────

/// Fine 5x5 classification against a simulation box and an inner box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BorderRegions {
    sim: DoubleBox,
    inner: DoubleBox,
}

impl BorderRegions {
    /// Region of points inside the inner box.
    pub const CENTER: RegionId = RegionId(12);
    /// Number of distinct regions.
    pub const COUNT: usize = 25;

    /// Classifier for the given boxes.
    ///
    /// The inner box must lie within the simulation box. Either may touch
    /// the other's edge, which leaves the corresponding band empty.
    pub fn new(sim: DoubleBox, inner: DoubleBox) -> Result<Self, ConfigError> {
        let nested = inner.min_x() >= sim.min_x()
            && inner.max_x() <= sim.max_x()
            && inner.min_y() >= sim.min_y()
            && inner.max_y() <= sim.max_y();
        if !nested {
            return Err(ConfigError::MalformedBox {
                min_x: inner.min_x(),
                max_x: inner.max_x(),
                min_y: inner.min_y(),
                max_y: inner.max_y(),
            });
        }
        Ok(Self { sim, inner })
    }

    /// The simulation box.
    pub fn simulation_box(&self) -> &DoubleBox {
        &self.sim
    }

    /// The inner box.
    pub fn inner_box(&self) -> &DoubleBox {
        &self.inner
    }

    fn bucket(v: f64, sim_min: f64, inner_min: f64, inner_max: f64, sim_max: f64) -> Bucket {
        if v < sim_min {
            Bucket::BoundaryMin
        } else if v < inner_min {
            Bucket::BorderMin
        } else if v < inner_max {
            Bucket::Center
        } else if v < sim_max {
            Bucket::BorderMax
        } else {
            Bucket::BoundaryMax
        }
    }

    /// X bucket of `x`.
    pub fn bucket_x(&self, x: f64) -> Bucket {
        Self::bucket(
            x,
            self.sim.min_x(),
            self.inner.min_x(),
            self.inner.max_x(),
            self.sim.max_x(),
        )
    }

    /// Y bucket of `y`.
    pub fn bucket_y(&self, y: f64) -> Bucket {
        Self::bucket(
            y,
            self.sim.min_y(),
            self.inner.min_y(),
            self.inner.max_y(),
            self.sim.max_y(),
        )
    }

    /// Region of the point `(x, y)`.
    pub fn region(&self, x: f64, y: f64) -> RegionId {
        Self::compose(self.bucket_x(x), self.bucket_y(y))
    }

    /// Region id for a bucket pair.
    pub fn compose(bx: Bucket, by: Bucket) -> RegionId {
        RegionId(bx.index() + 5 * by.index())
    }

    /// Inverse of [`BorderRegions::compose`]; `None` for unknown ids.
    pub fn decompose(region: RegionId) -> Option<(Bucket, Bucket)> {
        if usize::from(region.0) >= Self::COUNT {
            return None;
        }
        let bx = Bucket::ALL[usize::from(region.0 % 5)];
        let by = Bucket::ALL[usize::from(region.0 / 5)];
        Some((bx, by))
    }

    /// Whether the region lies in a border band on at least one axis and
    /// inside the simulation box on both.
    pub fn is_border(region: RegionId) -> bool {
        match Self::decompose(region) {
            Some((bx, by)) => {
                !bx.is_outside() && !by.is_outside() && (bx.is_border() || by.is_border())
            }
            None => false,
        }
    }

    /// Whether the region is one of the 8 outside corners: outside the
    /// simulation box on one axis and in a border band on the other.
    pub fn is_outside_corner(region: RegionId) -> bool {
        match Self::decompose(region) {
            Some((bx, by)) => {
                (bx.is_outside() && by.is_border()) || (by.is_outside() && bx.is_border())
            }
            None => false,
        }
    }

    /// All 8 outside-corner regions.
    pub fn outside_corners() -> impl Iterator<Item = RegionId> {
        (0..Self::COUNT as u8)
            .map(RegionId)
            .filter(|r| Self::is_outside_corner(*r))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn border_regions() -> BorderRegions {
        let sim = DoubleBox::new(0.0, 10.0, 0.0, 8.0).unwrap();
        let inner = DoubleBox::new(1.0, 9.0, 2.0, 6.0).unwrap();
        BorderRegions::new(sim, inner).unwrap()
    }

    // ── BoundaryRegions tests ───────────────────────────────────

    #[test]
    fn boundary_center_and_edges() {
        let b = BoundaryRegions::new(DoubleBox::new(0.0, 4.0, 0.0, 4.0).unwrap());
        assert_eq!(b.region(2.0, 2.0), BoundaryRegions::CENTER);
        assert_eq!(b.region(0.0, 0.0), BoundaryRegions::CENTER);
        assert_eq!(b.region(-0.1, 2.0), RegionId(3));
        assert_eq!(b.region(4.0, 2.0), RegionId(5));
        assert_eq!(b.region(2.0, -1.0), RegionId(1));
        assert_eq!(b.region(5.0, 5.0), RegionId(8));
        assert_eq!(
            BoundaryRegions::direction(b.region(5.0, 5.0)),
            Some(Direction::PLUS_X_PLUS_Y)
        );
        assert_eq!(BoundaryRegions::direction(BoundaryRegions::CENTER), None);
    }

    #[test]
    fn boundary_ids_are_x_plus_y() {
        for sy in -1..=1 {
            for sx in -1..=1 {
                let id = BoundaryRegions::compose(sx, sy);
                assert_eq!(id.0 as i32, (sx + 1) + 3 * (sy + 1));
                assert_eq!(BoundaryRegions::decompose(id), Some((sx, sy)));
            }
        }
        assert_eq!(BoundaryRegions::decompose(RegionId(9)), None);
    }

    // ── BorderRegions tests ─────────────────────────────────────

    #[test]
    fn border_buckets_along_x() {
        let r = border_regions();
        assert_eq!(r.bucket_x(-0.5), Bucket::BoundaryMin);
        assert_eq!(r.bucket_x(0.0), Bucket::BorderMin);
        assert_eq!(r.bucket_x(1.0), Bucket::Center);
        assert_eq!(r.bucket_x(9.0), Bucket::BorderMax);
        assert_eq!(r.bucket_x(10.0), Bucket::BoundaryMax);
        assert_eq!(r.bucket_x(f64::NAN), Bucket::BoundaryMax);
    }

    #[test]
    fn border_center_is_twelve() {
        let r = border_regions();
        assert_eq!(r.region(5.0, 4.0), BorderRegions::CENTER);
        assert!(!BorderRegions::is_border(BorderRegions::CENTER));
    }

    #[test]
    fn empty_band_when_inner_touches_sim() {
        let sim = DoubleBox::new(0.0, 4.0, 0.0, 4.0).unwrap();
        let inner = DoubleBox::new(0.0, 3.0, 0.0, 3.0).unwrap();
        let r = BorderRegions::new(sim, inner).unwrap();
        assert_eq!(r.bucket_x(0.0), Bucket::Center);
        assert_eq!(r.bucket_x(3.5), Bucket::BorderMax);
    }

    #[test]
    fn inner_must_nest() {
        let sim = DoubleBox::new(0.0, 4.0, 0.0, 4.0).unwrap();
        let inner = DoubleBox::new(-1.0, 3.0, 0.0, 3.0).unwrap();
        assert!(BorderRegions::new(sim, inner).is_err());
    }

    #[test]
    fn border_and_outside_corner_counts() {
        let border = (0..25u8).filter(|r| BorderRegions::is_border(RegionId(*r))).count();
        assert_eq!(border, 8);
        assert_eq!(BorderRegions::outside_corners().count(), 8);
        let corner = BorderRegions::compose(Bucket::BoundaryMax, Bucket::BorderMin);
        assert!(BorderRegions::is_outside_corner(corner));
        let pure = BorderRegions::compose(Bucket::BoundaryMax, Bucket::BoundaryMin);
        assert!(!BorderRegions::is_outside_corner(pure));
    }

    proptest! {
        #[test]
        fn every_point_has_one_region(x in -20.0f64..30.0, y in -20.0f64..30.0) {
            let r = border_regions();
            let id = r.region(x, y);
            prop_assert!((id.0 as usize) < BorderRegions::COUNT);
            let (bx, by) = BorderRegions::decompose(id).unwrap();
            prop_assert_eq!(bx, r.bucket_x(x));
            prop_assert_eq!(by, r.bucket_y(y));
            prop_assert_eq!(BorderRegions::compose(bx, by), id);
        }

        #[test]
        fn decompose_inverts_compose(ix in 0usize..5, iy in 0usize..5) {
            let (bx, by) = (Bucket::ALL[ix], Bucket::ALL[iy]);
            let id = BorderRegions::compose(bx, by);
            prop_assert_eq!(BorderRegions::decompose(id), Some((bx, by)));
        }
    }
}
