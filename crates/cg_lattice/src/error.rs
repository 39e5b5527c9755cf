//! Errors for cg_lattice.
//!
//! NOTE: Dimension checks happen once, at geometry construction. Everything
//! downstream may assume a valid box and wrap coordinates silently.

use std::fmt;

#[derive(Debug, PartialEq)]
pub enum GeometryError {
    /// A box dimension is too small to hold one full neighborhood cube
    /// without aliasing (requires N >= 2L + 1).
    BoxTooSmall { dimension: usize, size: usize, minimum: usize },
    /// The neighbor limit must be at least one shell.
    ZeroNeighborLimit,
    /// Two opposing faces carry boundaries that cannot coexist.
    IncompatibleBoundaries(usize),
}

impl fmt::Display for GeometryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeometryError::BoxTooSmall { dimension, size, minimum } => {
                write!(f, "Box dimension {} has size {}, needs at least {}",
                    dimension, size, minimum)
            }
            GeometryError::ZeroNeighborLimit => {
                write!(f, "The neighbor limit must be at least 1")
            }
            GeometryError::IncompatibleBoundaries(dimension) => {
                write!(f, "Incompatible boundaries on the faces of dimension {}",
                    dimension)
            }
        }
    }
}

impl std::error::Error for GeometryError {}
