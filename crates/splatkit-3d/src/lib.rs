#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Covariance reconstruction from rotation and scale.
pub mod covariance;

/// I/O utilities for reading Gaussian splat scenes.
pub mod io;

/// Operations on splat attributes and point sets.
pub mod ops;

/// Execution strategies for the data-parallel parts of the pipeline.
pub mod parallel;

/// The canonical splat collection.
pub mod splats;

/// 3D transforms algorithms.
pub mod transforms;
