use cg_lattice::SiteIndex;
use cg_rates::RateModel;

use crate::SiteLattice;

/// The cumulative-rate table one reaction is drawn from each step.
///
/// Rebuilt from scratch before every selection: sites in row-major order,
/// each site's active reactions in their stored order. The cumulative vector
/// is non-decreasing by construction and its last entry is the total rate.
#[derive(Debug, Default)]
pub struct RateIndex {
    reactions: Vec<(SiteIndex, usize)>,
    cumulative: Vec<f64>,
    k_tot: f64,
}

impl RateIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rebuild<K: RateModel>(&mut self, lattice: &SiteLattice<K>) {
        self.reactions.clear();
        self.cumulative.clear();
        self.k_tot = 0.0;

        for site in lattice.sites() {
            for &position in site.active_reactions() {
                let rate = site.reactions()[position].rate();
                assert!(rate.is_finite() && rate >= 0.0,
                    "unset or invalid rate {} in the index at {}", rate, site);
                self.k_tot += rate;
                self.cumulative.push(self.k_tot);
                self.reactions.push((site.index(), position));
            }
        }
    }

    /// Total rate of all indexed reactions.
    pub fn k_tot(&self) -> f64 {
        self.k_tot
    }

    pub fn len(&self) -> usize {
        self.reactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reactions.is_empty()
    }

    /// The (site, reaction) handle at a chosen index.
    pub fn reaction(&self, choice: usize) -> (SiteIndex, usize) {
        self.reactions[choice]
    }

    pub fn cumulative(&self) -> &[f64] {
        &self.cumulative
    }

    /// Iterative binary search for the first index whose cumulative rate
    /// reaches `target`. Zero-rate reactions produce equal consecutive
    /// entries; the lower index wins, so selection is deterministic.
    pub fn choose(&self, target: f64) -> usize {
        assert!(!self.cumulative.is_empty(), "choosing from an empty rate index");
        let mut low = 0;
        let mut high = self.cumulative.len();
        while low < high {
            let mid = low + (high - low) / 2;
            if self.cumulative[mid] < target {
                low = mid + 1;
            } else {
                high = mid;
            }
        }
        assert!(low < self.cumulative.len(),
            "selection target {} exceeds the total rate {}", target, self.k_tot);
        low
    }

    /// Linear-scan selection, used to cross-check the binary search.
    pub fn choose_linear(&self, target: f64) -> usize {
        self.cumulative
            .iter()
            .position(|&accumulated| accumulated >= target)
            .expect("selection target exceeds the total rate")
    }

    #[cfg(test)]
    pub(crate) fn from_rates(rates: &[f64]) -> Self {
        let mut index = Self::new();
        for (position, &rate) in rates.iter().enumerate() {
            index.k_tot += rate;
            index.cumulative.push(index.k_tot);
            index.reactions.push((0, position));
        }
        index
    }
}
