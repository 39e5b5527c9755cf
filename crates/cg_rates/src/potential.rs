use ndarray::Array3;
use cg_lattice::origin_transform;

/// The pair potential `scale * r^(-rPower)`, tabulated for every offset of
/// one (2L+1)^3 neighborhood cube. The center holds zero so summing over a
/// full cube never needs to special-case the site itself.
///
/// Cube slots use the same i-major ordering as the neighbor tables and the
/// level matrix, so one flat slot addresses all three.
#[derive(Debug, Clone)]
pub struct PairPotential {
    limit: usize,
    r_power: f64,
    scale: f64,
    table: Array3<f64>,
}

impl PairPotential {
    pub fn new(limit: usize, r_power: f64, scale: f64) -> Self {
        let length = 2 * limit + 1;
        let mut table = Array3::<f64>::zeros((length, length, length));
        for i in 0..length {
            let dx = origin_transform(i, limit) as f64;
            for j in 0..length {
                let dy = origin_transform(j, limit) as f64;
                for k in 0..length {
                    if i == limit && j == limit && k == limit {
                        continue;
                    }
                    let dz = origin_transform(k, limit) as f64;
                    let r2 = dx * dx + dy * dy + dz * dz;
                    table[[i, j, k]] = scale * r2.powf(-r_power / 2.0);
                }
            }
        }
        Self { limit, r_power, scale, table }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn r_power(&self) -> f64 {
        self.r_power
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn at(&self, i: usize, j: usize, k: usize) -> f64 {
        self.table[[i, j, k]]
    }

    /// Potential by flat cube slot, matching `Geometry::neighborhood_sites`.
    pub fn at_slot(&self, slot: usize) -> f64 {
        let length = 2 * self.limit + 1;
        let k = slot % length;
        let j = (slot / length) % length;
        let i = slot / (length * length);
        self.table[[i, j, k]]
    }

    /// Contribution of one active site at Euclidean distance `r` from a
    /// saddle point. Saddle distances are continuous, so this cannot go
    /// through the table.
    pub fn point_term(&self, r: f64) -> f64 {
        debug_assert!(r > 0.0, "saddle term at zero distance");
        self.scale / r.powf(self.r_power)
    }

    /// Sum over the whole cube, the energy of a site in a fully occupied
    /// neighborhood.
    pub fn total(&self) -> f64 {
        self.table.sum()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_is_zero() {
        let p = PairPotential::new(2, 5.0, 1.0);
        assert_eq!(p.at(2, 2, 2), 0.0);
        assert_eq!(p.at_slot(2 * 5 * 5 + 2 * 5 + 2), 0.0);
    }

    #[test]
    fn test_known_values() {
        let p = PairPotential::new(1, 2.0, 3.0);
        // r^2 = 1 at a face neighbor, 2 at an edge, 3 at a corner.
        assert!((p.at(0, 1, 1) - 3.0).abs() < 1e-12);
        assert!((p.at(0, 0, 1) - 1.5).abs() < 1e-12);
        assert!((p.at(0, 0, 0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_inversion_symmetry() {
        let p = PairPotential::new(2, 4.0, 0.7);
        let length = 2 * p.limit() + 1;
        for i in 0..length {
            for j in 0..length {
                for k in 0..length {
                    let mirrored = p.at(length - 1 - i, length - 1 - j, length - 1 - k);
                    assert_eq!(p.at(i, j, k), mirrored);
                }
            }
        }
    }

    #[test]
    fn test_flat_slot_matches_indices() {
        let p = PairPotential::new(2, 3.0, 1.0);
        let length = 2 * p.limit() + 1;
        for i in 0..length {
            for j in 0..length {
                for k in 0..length {
                    let slot = (i * length + j) * length + k;
                    assert_eq!(p.at_slot(slot), p.at(i, j, k));
                }
            }
        }
    }

    #[test]
    fn test_total_sums_all_offsets() {
        let p = PairPotential::new(1, 6.0, 2.0);
        let mut expected = 0.0;
        for i in 0..3 {
            for j in 0..3 {
                for k in 0..3 {
                    expected += p.at(i, j, k);
                }
            }
        }
        assert!((p.total() - expected).abs() < 1e-12);
    }
}
