//! # crystalgrow
//!
//! The main entry point for the crystalgrow kinetic Monte Carlo package,
//! with interfaces to the crates of the workspace. At this level you also
//! find the argument parsers for the shipped binaries.
//!
//! This crate re-exports the main functionality from its submodules.


/// Exposing crystalgrow::lattice. Periodic box geometry, neighborhood
/// tables and the boundary capability.
pub mod lattice {
    pub use ::cg_lattice::*;
}

/// Exposing crystalgrow::rates. The pair potential and the Arrhenius rate
/// model.
pub mod rates {
    pub use ::cg_rates::*;
}

/// Exposing crystalgrow::kinetics. Sites, reactions, the rate index, the
/// solver step loop, trajectory dumps and the step trace.
pub mod kinetics {
    pub use ::cg_kinetics::*;
}

/// Clap argument groups mirroring the configuration file sections.
pub mod config_parsers;
