//! Geodetic computation primitives.
//!
//! # Responsibility
//! - Normalize heterogeneous coordinate text into canonical numbers.
//! - Compute azimuths between vertices.
//! - Render numbers and angles in the conventions of the target document.
//!
//! # Invariants
//! - Everything here is pure: no I/O, no shared state.
//! - Coordinates are assumed to be in one UTM zone and one geographic datum.

pub mod azimuth;
pub mod coord;
pub mod locale;
