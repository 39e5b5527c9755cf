use std::fmt;

use nohash_hasher::IntSet;

use cg_lattice::Geometry;
use cg_lattice::LevelMatrix;
use cg_lattice::SiteIndex;
use cg_lattice::near_slots;
use cg_rates::PairPotential;
use cg_rates::RateModel;

use crate::DiffusionReaction;
use crate::ParticleState;
use crate::Reaction;
use crate::Site;

/// The site arena plus everything a state transition touches: geometry,
/// level matrix, pair potential, rate model, running totals and the
/// affected-site set.
///
/// Every public mutation (`activate`, `deactivate`, `execute`) drains the
/// affected set to a fixed point before returning, so the lattice is
/// consistent at every quiescent point: neighbor counts, energies, active
/// reaction lists and cached rates all match a from-scratch recomputation
/// (see `verify_bookkeeping`).
pub struct SiteLattice<K: RateModel> {
    geometry: Geometry,
    levels: LevelMatrix,
    /// Flat cube slots of the 26-cell near-neighborhood, center excluded.
    near: Vec<usize>,
    potential: PairPotential,
    rate_model: K,
    sites: Vec<Site>,
    total_active: usize,
    /// Sum of the energies of the active sites, maintained incrementally.
    total_energy: f64,
    affected: IntSet<SiteIndex>,
}

impl<K: RateModel> SiteLattice<K> {
    pub fn new(geometry: Geometry, potential: PairPotential, rate_model: K) -> Self {
        assert_eq!(geometry.limit(), potential.limit(),
            "potential cube does not match the neighbor limit");

        let levels = LevelMatrix::new(geometry.limit());
        let center = geometry.center_slot();
        let near = near_slots(&geometry)
            .into_iter()
            .filter(|&slot| slot != center)
            .collect();

        let mut sites = Vec::with_capacity(geometry.site_count());
        for index in 0..geometry.site_count() {
            let (x, y, z) = geometry.coords_of(index);
            sites.push(Site::new(
                index,
                x,
                y,
                z,
                geometry.limit(),
                geometry.neighborhood_sites(x, y, z),
            ));
        }

        let mut lattice = Self {
            geometry,
            levels,
            near,
            potential,
            rate_model,
            sites,
            total_active: 0,
            total_energy: 0.0,
            affected: IntSet::default(),
        };
        lattice.build_reactions();
        lattice
    }

    /// One diffusion reaction per near-neighbor offset, in cube order, so
    /// reaction 0 is always the (-1, -1, -1) hop.
    fn build_reactions(&mut self) {
        for index in 0..self.sites.len() {
            let mut reactions = Vec::with_capacity(self.near.len());
            for pos in 0..self.near.len() {
                let slot = self.near[pos];
                let destination = self.sites[index].neighborhood[slot];
                reactions.push(Reaction::Diffusion(DiffusionReaction::new(index, destination)));
            }
            self.sites[index].reactions = reactions;
        }
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn potential(&self) -> &PairPotential {
        &self.potential
    }

    pub fn rate_model(&self) -> &K {
        &self.rate_model
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    pub fn site(&self, index: SiteIndex) -> &Site {
        &self.sites[index]
    }

    pub fn site_at(&self, x: usize, y: usize, z: usize) -> &Site {
        &self.sites[self.geometry.index_of(x, y, z)]
    }

    pub fn total_active_sites(&self) -> usize {
        self.total_active
    }

    /// Sum of the energies of all active sites.
    pub fn total_energy(&self) -> f64 {
        self.total_energy
    }

    /// Occupy a site. A surface site crystallizes on activation, which
    /// promotes its near solution neighbors to surfaces. Neighbor counts
    /// and energies are updated across the whole neighborhood, and every
    /// touched site has its reactions and rates recomputed before this
    /// returns.
    pub fn activate(&mut self, index: SiteIndex) {
        debug_assert!(self.affected.is_empty(), "affected set not drained");
        assert!(!self.sites[index].active,
            "activating an already active site {}", self.sites[index]);
        assert!(!self.sites[index].is_crystal(),
            "activating a crystal, which is always active: {}", self.sites[index]);

        self.sites[index].active = true;
        if self.sites[index].is_surface() {
            self.set_particle_state(index, ParticleState::Crystal);
        }

        self.affected.insert(index);
        self.total_energy += self.sites[index].energy;
        self.inform_neighborhood(index, 1);
        self.queue_affected_occupancy(index);
        self.process_affected();

        self.total_active += 1;
    }

    /// Empty a site. A crystal site falls back to surface, which may demote
    /// surface neighbors that lost their last crystal contact. Bookkeeping
    /// is the exact mirror of `activate`.
    pub fn deactivate(&mut self, index: SiteIndex) {
        debug_assert!(self.affected.is_empty(), "affected set not drained");
        assert!(self.sites[index].active,
            "deactivating an inactive site {}", self.sites[index]);
        assert!(!self.sites[index].is_surface(),
            "deactivating a surface, which is always inactive: {}", self.sites[index]);

        self.sites[index].active = false;
        if self.sites[index].is_crystal() {
            self.set_particle_state(index, ParticleState::Surface);
        }

        self.affected.insert(index);
        self.total_energy -= self.sites[index].energy;
        self.inform_neighborhood(index, -1);
        self.queue_affected_occupancy(index);
        self.process_affected();

        self.total_active -= 1;
    }

    /// Run one diffusion reaction of a site: empty the origin, then occupy
    /// the destination. Both halves drain their own affected sets, so the
    /// lattice is consistent when this returns.
    pub fn execute(&mut self, origin: SiteIndex, reaction: usize) {
        let destination = {
            let r = self.sites[origin].reactions[reaction].as_diffusion();
            debug_assert!(r.is_not_blocked(self), "executing a blocked reaction");
            r.destination()
        };
        self.deactivate(origin);
        self.activate(destination);
    }

    /// The state machine. Invalid transitions are programming errors.
    pub fn set_particle_state(&mut self, index: SiteIndex, target: ParticleState) {
        use ParticleState::*;

        match (self.sites[index].state, target) {
            // A surface propagating onto an occupied solution site
            // crystallizes it immediately, which pushes the surface on.
            (Solution, Surface) => {
                if self.sites[index].active {
                    self.crystallize(index);
                } else {
                    self.sites[index].state = Surface;
                    self.queue_affected(index);
                }
            }
            (Crystal, Surface) => {
                self.sites[index].state = Surface;
                self.propagate_to_neighbors(index, Surface, Solution);
                self.queue_affected(index);
            }
            (Surface, Surface) => {}
            (Surface, Crystal) => {
                self.crystallize(index);
            }
            // Only legal once the last near crystal is gone.
            (Surface, Solution) => {
                if !self.has_neighboring(index, Crystal) {
                    self.sites[index].state = Solution;
                    self.queue_affected(index);
                }
            }
            (from, to) => {
                panic!("invalid state transition {} -> {} at site {}",
                    from, to, self.sites[index]);
            }
        }
    }

    fn crystallize(&mut self, index: SiteIndex) {
        self.sites[index].state = ParticleState::Crystal;
        self.propagate_to_neighbors(index, ParticleState::Solution, ParticleState::Surface);
    }

    /// Request `target` on every near neighbor currently in `required`.
    fn propagate_to_neighbors(
        &mut self,
        index: SiteIndex,
        required: ParticleState,
        target: ParticleState,
    ) {
        for pos in 0..self.near.len() {
            let slot = self.near[pos];
            let neighbor = self.sites[index].neighborhood[slot];
            debug_assert_ne!(neighbor, index);
            debug_assert!(
                !(target == ParticleState::Solution
                    && self.sites[neighbor].state == ParticleState::Solution),
                "demoting towards a site that is already solution"
            );
            if self.sites[neighbor].state == required {
                self.set_particle_state(neighbor, target);
            }
        }
    }

    /// Any near neighbor in the given state?
    pub fn has_neighboring(&self, index: SiteIndex, state: ParticleState) -> bool {
        self.near.iter().any(|&slot| {
            let neighbor = self.sites[index].neighborhood[slot];
            self.sites[neighbor].state == state
        })
    }

    /// Symmetric neighbor bookkeeping for one occupancy change: every
    /// neighbor gains or loses one count on the matching shell and the
    /// pair-potential term of the offset. The active-energy total picks up
    /// the term once per active neighbor.
    fn inform_neighborhood(&mut self, index: SiteIndex, change: i32) {
        let volume = self.geometry.neighborhood_volume();
        let center = self.geometry.center_slot();
        for slot in 0..volume {
            if slot == center {
                continue;
            }
            let neighbor = self.sites[index].neighborhood[slot];
            debug_assert_ne!(neighbor, index);
            let level = self.levels.level_at_slot(slot);
            let de = change as f64 * self.potential.at_slot(slot);
            let site = &mut self.sites[neighbor];
            if change > 0 {
                site.n_neighbors[level] += 1;
            } else {
                site.n_neighbors[level] -= 1;
            }
            site.energy += de;
            if site.active {
                self.total_energy += de;
            }
        }
    }

    /// Mark the whole neighborhood of a site as needing a reaction and rate
    /// refresh. The acting site inserts itself separately. Sufficient for
    /// state changes, whose reach ends at the near-neighborhood.
    fn queue_affected(&mut self, index: SiteIndex) {
        let center = self.geometry.center_slot();
        for slot in 0..self.geometry.neighborhood_volume() {
            if slot == center {
                continue;
            }
            let neighbor = self.sites[index].neighborhood[slot];
            self.affected.insert(neighbor);
        }
    }

    /// Queue for an occupancy change. Hop eligibility reads the near
    /// counts of the destination, one cell past the origin, so a toggle
    /// reaches origins out to Chebyshev distance two even when L = 1.
    fn queue_affected_occupancy(&mut self, index: SiteIndex) {
        if self.geometry.limit() >= 2 {
            self.queue_affected(index);
            return;
        }
        let radius = 2i64;
        let (x, y, z) = self.sites[index].coords();
        for dx in -radius..=radius {
            for dy in -radius..=radius {
                for dz in -radius..=radius {
                    let (tx, ty, tz) = self.geometry.translate((x, y, z), (dx, dy, dz));
                    let neighbor = self.geometry.index_of(tx, ty, tz);
                    if neighbor != index {
                        self.affected.insert(neighbor);
                    }
                }
            }
        }
    }

    /// Drain the affected set to a fixed point: rebuild each queued site's
    /// active reaction list, then recompute the rates of what survived.
    /// Refreshing never queues further sites, so one sweep per round
    /// suffices; the loop form keeps that an implementation detail.
    pub fn process_affected(&mut self) {
        while !self.affected.is_empty() {
            let pending: Vec<SiteIndex> = self.affected.drain().collect();
            for index in pending {
                self.update_reactions(index);
                self.calculate_rates(index);
            }
        }
    }

    /// Rebuild one site's active reaction list from the eligibility rule:
    /// the site must be occupied and the hop not blocked.
    pub fn update_reactions(&mut self, index: SiteIndex) {
        let enabled = if !self.sites[index].active {
            Vec::new()
        } else {
            let site = &self.sites[index];
            site.reactions
                .iter()
                .enumerate()
                .filter(|(_, reaction)| reaction.is_not_blocked(self))
                .map(|(position, _)| position)
                .collect()
        };
        self.sites[index].active_reactions = enabled;
    }

    /// Recompute and cache the rate of every active reaction of one site.
    pub fn calculate_rates(&mut self, index: SiteIndex) {
        let active = self.sites[index].active_reactions.clone();
        for position in active {
            let (origin, destination) = {
                let r = self.sites[index].reactions[position].as_diffusion();
                (r.origin(), r.destination())
            };
            debug_assert_eq!(origin, index);
            let site_energy = self.sites[origin].energy;
            let saddle = self.saddle_energy(origin, destination);
            let rate = self.rate_model.rate(site_energy, saddle);
            self.sites[index].reactions[position]
                .as_diffusion_mut()
                .set_rate(rate, site_energy, saddle);
        }
    }

    /// Rebuild reactions and rates for every site. Used once after seeding;
    /// the affected pump keeps things current from then on.
    pub fn refresh_all_reactions(&mut self) {
        for index in 0..self.sites.len() {
            self.update_reactions(index);
            self.calculate_rates(index);
        }
    }

    /// Transition-state energy of the hop origin -> destination.
    ///
    /// The saddle sits at the componentwise midpoint of the wrapped
    /// coordinate sum. Every active site shared by both neighborhoods
    /// contributes an inverse-power term of its Euclidean distance to the
    /// saddle, with each component folded back by N when it exceeds the
    /// neighbor limit. The shared set is never empty for near neighbors;
    /// finding it empty means the neighbor tables are corrupt.
    pub fn saddle_energy(&self, origin: SiteIndex, destination: SiteIndex) -> f64 {
        let (ox, oy, oz) = self.sites[origin].coords();
        let (dx, dy, dz) = self.sites[destination].coords();
        let nx = self.geometry.nx();
        let ny = self.geometry.ny();
        let nz = self.geometry.nz();

        let sx = ((ox + dx) % nx) as f64 / 2.0;
        let sy = ((oy + dy) % ny) as f64 / 2.0;
        let sz = ((oz + dz) % nz) as f64 / 2.0;

        let limit = self.geometry.limit() as f64;
        let center = self.geometry.center_slot();
        let volume = self.geometry.neighborhood_volume();

        let mut shared = 0usize;
        let mut saddle = 0.0;
        for slot in 0..volume {
            if slot == center {
                continue;
            }
            let target = self.sites[origin].neighborhood[slot];
            if target == destination {
                continue;
            }
            let t = &self.sites[target];
            if self.geometry.chebyshev((t.x, t.y, t.z), (dx, dy, dz))
                > self.geometry.limit()
            {
                continue;
            }
            shared += 1;
            if !t.active {
                continue;
            }

            let mut rx = (sx - t.x as f64).abs();
            if rx > limit {
                rx = nx as f64 - rx;
            }
            let mut ry = (sy - t.y as f64).abs();
            if ry > limit {
                ry = ny as f64 - ry;
            }
            let mut rz = (sz - t.z as f64).abs();
            if rz > limit {
                rz = nz as f64 - rz;
            }

            let r = (rx * rx + ry * ry + rz * rz).sqrt();
            debug_assert!(r >= 0.5, "saddle point on top of an occupied site");
            saddle += self.potential.point_term(r);
        }

        assert!(shared > 0,
            "empty saddle neighborhood between sites {} and {}",
            self.sites[origin], self.sites[destination]);
        saddle
    }

    /// Legal position for random seeding: unoccupied, and every hop leaving
    /// here would be allowed.
    pub fn is_legal_to_spawn(&self, index: SiteIndex) -> bool {
        let site = &self.sites[index];
        if site.active {
            return false;
        }
        site.reactions.iter().all(|reaction| reaction.allowed_at_site(self))
    }

    /// Place the fixed crystal seed: spawn as a surface, then activate,
    /// which crystallizes it and raises surfaces on its near neighbors.
    pub fn spawn_as_fixed_crystal(&mut self, index: SiteIndex) {
        assert!(!self.sites[index].active, "seeding an occupied site");
        self.sites[index].state = ParticleState::Surface;
        self.sites[index].seed = true;
        self.activate(index);
    }

    /// Full from-scratch audit of every maintained quantity. Panics on the
    /// first mismatch. Meant for tests and debugging, not the step loop.
    pub fn verify_bookkeeping(&self) {
        let volume = self.geometry.neighborhood_volume();
        let center = self.geometry.center_slot();

        let mut total_active = 0usize;
        let mut total_energy = 0.0;

        for site in &self.sites {
            let mut counts = vec![0u32; self.geometry.limit()];
            let mut energy = 0.0;
            for slot in 0..volume {
                if slot == center {
                    continue;
                }
                let neighbor = &self.sites[site.neighborhood[slot]];
                if neighbor.active {
                    counts[self.levels.level_at_slot(slot)] += 1;
                    energy += self.potential.at_slot(slot);
                }
            }

            assert_eq!(counts, site.n_neighbors,
                "neighbor counts drifted at {}", site);
            assert!((energy - site.energy).abs() < 1e-9,
                "energy drifted at {}: {} vs {}", site, site.energy, energy);

            let near_crystal = self.has_neighboring(site.index, ParticleState::Crystal);
            match site.state {
                // A surface is always unoccupied. It usually touches a
                // crystal, but the site of a lone crystal that dissolved
                // keeps its surface state with no crystal left nearby.
                ParticleState::Surface => {
                    assert!(!site.active, "occupied surface at {}", site);
                }
                ParticleState::Crystal => {
                    assert!(site.active, "inactive crystal at {}", site);
                }
                ParticleState::Solution => {
                    assert!(site.active || !near_crystal,
                        "unoccupied near-crystal site left in solution at {}", site);
                }
            }

            for (position, reaction) in site.reactions.iter().enumerate() {
                let should = site.active && reaction.is_not_blocked(self);
                assert_eq!(should, site.active_reactions.contains(&position),
                    "stale active reaction list at {}", site);
                if should {
                    let r = reaction.as_diffusion();
                    let saddle = self.saddle_energy(r.origin(), r.destination());
                    let expected = self.rate_model.rate(site.energy, saddle);
                    assert!((r.rate() - expected).abs() <= 1e-9 * expected.abs().max(1.0),
                        "stale rate at {}: {} vs {}", site, r.rate(), expected);
                }
            }

            if site.active {
                total_active += 1;
                total_energy += site.energy;
            }
        }

        assert_eq!(total_active, self.total_active, "active site count drifted");
        assert!((total_energy - self.total_energy).abs()
            <= 1e-9 * total_energy.abs().max(1.0),
            "energy total drifted: {} vs {}", self.total_energy, total_energy);
        assert!(self.affected.is_empty(), "affected set not drained");
    }
}

impl<K: RateModel> fmt::Debug for SiteLattice<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SiteLattice")
            .field("box", &(self.geometry.nx(), self.geometry.ny(), self.geometry.nz()))
            .field("limit", &self.geometry.limit())
            .field("total_active", &self.total_active)
            .field("total_energy", &self.total_energy)
            .finish()
    }
}
