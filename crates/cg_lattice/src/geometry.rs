use crate::GeometryError;
use crate::SiteIndex;

/// Fixed box dimensions plus the Chebyshev neighbor limit.
///
/// All coordinate arithmetic in the simulator goes through here: wrapping,
/// signed minimum-image distances and the flat row-major indexing that the
/// site arena uses. The box is periodic in every dimension and its shape
/// never changes after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    nx: usize,
    ny: usize,
    nz: usize,
    limit: usize,
}

impl Geometry {
    /// A valid box must fit one full neighborhood cube in every dimension,
    /// so N >= 2L + 1. Anything smaller would alias neighbors through the
    /// periodic images and double-count them.
    pub fn new(box_size: [usize; 3], limit: usize) -> Result<Self, GeometryError> {
        if limit == 0 {
            return Err(GeometryError::ZeroNeighborLimit);
        }
        let minimum = 2 * limit + 1;
        for (dimension, &size) in box_size.iter().enumerate() {
            if size < minimum {
                return Err(GeometryError::BoxTooSmall { dimension, size, minimum });
            }
        }
        Ok(Self {
            nx: box_size[0],
            ny: box_size[1],
            nz: box_size[2],
            limit,
        })
    }

    pub fn nx(&self) -> usize {
        self.nx
    }

    pub fn ny(&self) -> usize {
        self.ny
    }

    pub fn nz(&self) -> usize {
        self.nz
    }

    /// Box size along one axis (0 = x, 1 = y, 2 = z).
    pub fn dim(&self, axis: usize) -> usize {
        match axis {
            0 => self.nx,
            1 => self.ny,
            2 => self.nz,
            _ => panic!("axis out of range: {}", axis),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Side length of the neighborhood cube, 2L + 1.
    pub fn neighborhood_length(&self) -> usize {
        2 * self.limit + 1
    }

    /// Number of cells in one neighborhood cube, (2L + 1)^3.
    pub fn neighborhood_volume(&self) -> usize {
        let l = self.neighborhood_length();
        l * l * l
    }

    pub fn site_count(&self) -> usize {
        self.nx * self.ny * self.nz
    }

    /// Flat slot of the cube center within a neighborhood table.
    pub fn center_slot(&self) -> usize {
        let l = self.neighborhood_length();
        (self.limit * l + self.limit) * l + self.limit
    }

    /// The geometric center of the box, where the crystal seed goes.
    pub fn center(&self) -> (usize, usize, usize) {
        (self.nx / 2, self.ny / 2, self.nz / 2)
    }

    /// Row-major flat index. Coordinates must already be inside the box.
    pub fn index_of(&self, x: usize, y: usize, z: usize) -> SiteIndex {
        debug_assert!(x < self.nx && y < self.ny && z < self.nz,
            "coordinates out of range: ({}, {}, {})", x, y, z);
        (x * self.ny + y) * self.nz + z
    }

    pub fn coords_of(&self, index: SiteIndex) -> (usize, usize, usize) {
        debug_assert!(index < self.site_count());
        let z = index % self.nz;
        let y = (index / self.nz) % self.ny;
        let x = index / (self.ny * self.nz);
        (x, y, z)
    }

    /// Wrap a signed coordinate into [0, N) along one axis.
    pub fn wrap(&self, axis: usize, c: i64) -> usize {
        let n = self.dim(axis) as i64;
        (((c % n) + n) % n) as usize
    }

    /// Apply a signed displacement and wrap the result.
    pub fn translate(
        &self,
        (x, y, z): (usize, usize, usize),
        (dx, dy, dz): (i64, i64, i64),
    ) -> (usize, usize, usize) {
        (
            self.wrap(0, x as i64 + dx),
            self.wrap(1, y as i64 + dy),
            self.wrap(2, z as i64 + dz),
        )
    }

    /// Signed minimum-image distance from `a` to `b`, componentwise.
    ///
    /// Each component lies in (-N/2, N/2]. When two sites are exactly half
    /// a box apart the positive representative is returned from either
    /// direction, so |d_ab| == |d_ba| still holds at that edge.
    pub fn distance(
        &self,
        a: (usize, usize, usize),
        b: (usize, usize, usize),
    ) -> (i64, i64, i64) {
        (
            axis_distance(self.nx, a.0, b.0),
            axis_distance(self.ny, a.1, b.1),
            axis_distance(self.nz, a.2, b.2),
        )
    }

    /// Chebyshev (shell) distance between two sites under minimum image.
    pub fn chebyshev(
        &self,
        a: (usize, usize, usize),
        b: (usize, usize, usize),
    ) -> usize {
        let (dx, dy, dz) = self.distance(a, b);
        dx.abs().max(dy.abs()).max(dz.abs()) as usize
    }

    /// The flat site indices of the (2L+1)^3 neighborhood cube around a
    /// site, in i-major, j, k order. The center slot holds the site itself.
    /// This ordering is shared with the level matrix and the pair-potential
    /// tensor, so one cube slot addresses all three tables.
    pub fn neighborhood_sites(&self, x: usize, y: usize, z: usize) -> Vec<SiteIndex> {
        let length = self.neighborhood_length();
        let mut sites = Vec::with_capacity(self.neighborhood_volume());
        for i in 0..length {
            let xt = self.wrap(0, x as i64 + i as i64 - self.limit as i64);
            for j in 0..length {
                let yt = self.wrap(1, y as i64 + j as i64 - self.limit as i64);
                for k in 0..length {
                    let zt = self.wrap(2, z as i64 + k as i64 - self.limit as i64);
                    sites.push(self.index_of(xt, yt, zt));
                }
            }
        }
        sites
    }
}

fn axis_distance(n: usize, a: usize, b: usize) -> i64 {
    let n = n as i64;
    let mut d = (b as i64 - a as i64 + n) % n;
    if d > n / 2 {
        d -= n;
    }
    d
}


#[cfg(test)]
mod tests {
    use super::*;

    fn all_coords(g: &Geometry) -> Vec<(usize, usize, usize)> {
        (0..g.site_count()).map(|i| g.coords_of(i)).collect()
    }

    #[test]
    fn test_rejects_bad_boxes() {
        assert_eq!(
            Geometry::new([3, 3, 3], 0).unwrap_err(),
            GeometryError::ZeroNeighborLimit
        );
        assert_eq!(
            Geometry::new([4, 2, 4], 1).unwrap_err(),
            GeometryError::BoxTooSmall { dimension: 1, size: 2, minimum: 3 }
        );
        assert!(Geometry::new([3, 3, 3], 1).is_ok());
        assert!(Geometry::new([6, 6, 6], 2).is_ok());
    }

    #[test]
    fn test_index_roundtrip() {
        let g = Geometry::new([4, 5, 6], 1).unwrap();
        for x in 0..4 {
            for y in 0..5 {
                for z in 0..6 {
                    assert_eq!(g.coords_of(g.index_of(x, y, z)), (x, y, z));
                }
            }
        }
        assert_eq!(g.index_of(0, 0, 0), 0);
        assert_eq!(g.index_of(3, 4, 5), g.site_count() - 1);
    }

    #[test]
    fn test_distance_matches_delta_table() {
        // A precomputed delta table for a 5x5x5 box, checked for all pairs.
        let g = Geometry::new([5, 5, 5], 1).unwrap();
        let delta = |a: usize, b: usize| -> i64 {
            let d = (b + 5 - a) % 5;
            if d > 2 { d as i64 - 5 } else { d as i64 }
        };
        for a in all_coords(&g) {
            for b in all_coords(&g) {
                let (dx, dy, dz) = g.distance(a, b);
                assert_eq!(dx, delta(a.0, b.0));
                assert_eq!(dy, delta(a.1, b.1));
                assert_eq!(dz, delta(a.2, b.2));
            }
        }
    }

    #[test]
    fn test_distance_antisymmetry() {
        // d(a, b) == -d(b, a) componentwise, except exactly half a box
        // apart, where both directions give the positive representative.
        let g = Geometry::new([4, 6, 5], 1).unwrap();
        for a in all_coords(&g) {
            for b in all_coords(&g) {
                let d = g.distance(a, b);
                let r = g.distance(b, a);
                for (axis, (fwd, bwd)) in [(0usize, (d.0, r.0)), (1, (d.1, r.1)), (2, (d.2, r.2))] {
                    let n = g.dim(axis) as i64;
                    if 2 * fwd.abs() == n {
                        assert_eq!(fwd.abs(), bwd.abs());
                        assert!(fwd > 0 && bwd > 0);
                    } else {
                        assert_eq!(fwd, -bwd);
                    }
                }
            }
        }
    }

    #[test]
    fn test_neighborhood_lookup_and_mirror() {
        // Cube slot (i, j, k) must address ((x + i - L) mod N, ...), and the
        // mirrored slot of the neighbor must point back at the origin site.
        let g = Geometry::new([5, 4, 6], 1).unwrap();
        let length = g.neighborhood_length();
        for (x, y, z) in all_coords(&g) {
            let hood = g.neighborhood_sites(x, y, z);
            assert_eq!(hood[g.center_slot()], g.index_of(x, y, z));
            for i in 0..length {
                for j in 0..length {
                    for k in 0..length {
                        let slot = (i * length + j) * length + k;
                        let expected = g.translate(
                            (x, y, z),
                            (
                                i as i64 - g.limit() as i64,
                                j as i64 - g.limit() as i64,
                                k as i64 - g.limit() as i64,
                            ),
                        );
                        let (ex, ey, ez) = expected;
                        assert_eq!(hood[slot], g.index_of(ex, ey, ez));

                        let mirror = g.neighborhood_sites(ex, ey, ez);
                        let mslot = ((length - 1 - i) * length + (length - 1 - j)) * length
                            + (length - 1 - k);
                        assert_eq!(mirror[mslot], g.index_of(x, y, z));
                    }
                }
            }
        }
    }

    #[test]
    fn test_chebyshev_wraps() {
        let g = Geometry::new([6, 6, 6], 2).unwrap();
        assert_eq!(g.chebyshev((0, 0, 0), (5, 0, 0)), 1);
        assert_eq!(g.chebyshev((0, 0, 0), (3, 3, 3)), 3);
        assert_eq!(g.chebyshev((1, 1, 1), (1, 1, 1)), 0);
    }
}
