//! # gbd-math
//!
//! Math primitives for gamut boundary geometry.
//!
//! This crate provides the double precision building blocks used by the
//! gamut boundary descriptor:
//!
//! - [`Vec3`] - 3D vectors for points, directions and plane normals
//! - [`Mat3`] - 3x3 matrices (determinants, Cramer solves)
//! - [`Plane`] - plane equations `n . x + d = 0`
//! - Lab display helpers ([`lab_to_display_rgb`]) for visualization output
//!
//! # Design
//!
//! Gamut surfaces need `f64`: plane tests on nearly coplanar samples and
//! log-scaled radii lose too much in single precision. The types mirror
//! [`glam::DVec3`] / [`glam::DMat3`] and convert to and from them.
//! All matrix operations assume **row-major** storage and **column vectors**:
//!
//! ```text
//! result = matrix * vector
//! ```
//!
//! # Usage
//!
//! ```rust
//! use gbd_math::{Plane, Vec3};
//!
//! let plane = Plane::from_points(
//!     Vec3::new(1.0, 0.0, 0.0),
//!     Vec3::new(0.0, 1.0, 0.0),
//!     Vec3::new(0.0, 0.0, 1.0),
//! ).unwrap();
//! assert!(plane.signed_distance(Vec3::ZERO) < 0.0);
//! ```
//!
//! # Used By
//!
//! - `gbd` - vertex coordinates, mesh planes, BSP and nearest-neighbor queries
//! - `gbd-cli` - query distances

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod lab;
mod mat3;
mod plane;
mod vec3;

pub use lab::*;
pub use mat3::*;
pub use plane::*;
pub use vec3::*;

/// Re-export glam types for direct use
pub mod glam {
    pub use ::glam::{DMat3, DVec3};
}
