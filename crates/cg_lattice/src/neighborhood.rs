use crate::Geometry;

/// Chebyshev shell index of a cube offset, `max(|di|, |dj|, |dk|) - 1`.
/// Only valid for non-center offsets.
pub fn find_level(di: usize, dj: usize, dk: usize) -> usize {
    di.max(dj).max(dk) - 1
}

/// The per-offset shell table for one neighborhood cube.
///
/// `level(i, j, k)` yields the shell a cube slot belongs to, 0 for the 26
/// nearest cells up to L - 1 for the outermost shell. The center slot holds
/// the sentinel L + 1 so accidental use shows up as an out-of-range level.
#[derive(Debug, Clone)]
pub struct LevelMatrix {
    limit: usize,
    length: usize,
    levels: Vec<usize>,
}

impl LevelMatrix {
    pub fn new(limit: usize) -> Self {
        let length = 2 * limit + 1;
        let mut levels = Vec::with_capacity(length * length * length);
        for i in 0..length {
            for j in 0..length {
                for k in 0..length {
                    if i == limit && j == limit && k == limit {
                        levels.push(limit + 1);
                        continue;
                    }
                    levels.push(find_level(
                        i.abs_diff(limit),
                        j.abs_diff(limit),
                        k.abs_diff(limit),
                    ));
                }
            }
        }
        Self { limit, length, levels }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// Sentinel stored at the center slot.
    pub fn center_sentinel(&self) -> usize {
        self.limit + 1
    }

    pub fn level(&self, i: usize, j: usize, k: usize) -> usize {
        self.levels[(i * self.length + j) * self.length + k]
    }

    /// Shell of a cube slot by its flat index, matching the ordering of
    /// `Geometry::neighborhood_sites`.
    pub fn level_at_slot(&self, slot: usize) -> usize {
        self.levels[slot]
    }
}

/// Signed offset of cube slot `i` from the center, `i - L`.
pub fn origin_transform(i: usize, limit: usize) -> i64 {
    i as i64 - limit as i64
}

/// Iterate the (2L+1)^3 cube slots as (flat, i, j, k), i-major.
pub fn cube_slots(length: usize) -> impl Iterator<Item = (usize, usize, usize, usize)> {
    (0..length).flat_map(move |i| {
        (0..length).flat_map(move |j| {
            (0..length).map(move |k| ((i * length + j) * length + k, i, j, k))
        })
    })
}

/// Flat cube slots of the 27-cell near-neighborhood ({-1, 0, +1}^3), center
/// included, within a cube of the given limit.
pub fn near_slots(geometry: &Geometry) -> Vec<usize> {
    let limit = geometry.limit();
    let length = geometry.neighborhood_length();
    let mut slots = Vec::with_capacity(27);
    for i in (limit - 1)..=(limit + 1) {
        for j in (limit - 1)..=(limit + 1) {
            for k in (limit - 1)..=(limit + 1) {
                slots.push((i * length + j) * length + k);
            }
        }
    }
    slots
}
