/// The inverse-power pair potential tabulated over one neighborhood cube.
mod potential;

/// The rate model trait and its Arrhenius implementation.
mod model;

pub use potential::*;
pub use model::*;
