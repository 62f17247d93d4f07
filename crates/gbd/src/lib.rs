//! # gbd
//!
//! Gamut Boundary Descriptor: a closed, triangulated surface approximating
//! the boundary of the reachable colors in L*a*b* or CIECAM Jab.
//!
//! Samples are fed in with [`Gamut::expand`]. A directional quadtree keeps
//! the outermost few per patch of directions, and on the first query the
//! survivors are triangulated into a watertight, star-shaped mesh about the
//! gamut center. Query indices are built lazily on top of it:
//!
//! - [`bsp::BspTree`] - which triangle a ray from the center crosses
//!   ([`Gamut::radial`], [`Gamut::nradial`], [`Gamut::vector_isect`])
//! - [`nn::NnIndex`] - the closest surface point ([`Gamut::nearest`])
//!
//! # Usage
//!
//! ```rust
//! use gbd::GamutBuilder;
//!
//! let mut gamut = GamutBuilder::new().resolution(10.0).build();
//! for &(l, a, b) in &[
//!     (95.0, 0.0, 0.0), (5.0, 0.0, 0.0),
//!     (55.0, 70.0, 0.0), (55.0, -70.0, 0.0),
//!     (55.0, 0.0, 70.0), (55.0, 0.0, -70.0),
//! ] {
//!     gamut.expand([l, a, b]);
//! }
//!
//! let (radius, hit) = gamut.radial([50.0, 10.0, 0.0])?;
//! assert!(radius > 0.0 && hit[1] > 0.0);
//! # Ok::<(), gbd::GamutError>(())
//! ```
//!
//! # Persistence
//!
//! - `.gam` - CGATS style surface files ([`Gamut::write_gam`], [`Gamut::read_gam`])
//! - `.wrl` - VRML 2.0 visualization ([`Gamut::write_vrml`])
//!
//! # Dependencies
//!
//! - [`gbd-math`] - vectors, matrices, planes
//! - [`thiserror`] - error handling
//! - [`tracing`] - diagnostics
//!
//! # Used By
//!
//! - `gbd-cli` - command-line tool
//! - `gbd-bench` - benchmarks

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod error;
mod gam;
mod gamut;
mod vrml;
pub mod bsp;
pub mod coords;
pub mod cusp;
pub mod hull;
pub mod lazy;
pub mod mesh;
pub mod nn;
pub mod quadtree;
pub mod vertex;

pub use coords::ColorRep;
pub use cusp::{CuspPoint, SECTOR_NAMES};
pub use error::{GamutError, GamutResult};
pub use gam::parse_gam;
pub use gamut::{
    DEFAULT_CENTER, DEFAULT_RESOLUTION, Expansion, Gamut, GamutBuilder, IndexStates, Intersection,
    MAX_NEIGHBORS, WhiteBlack,
};
pub use lazy::IndexState;
pub use vertex::VertexFlags;
pub use vrml::PointTransform;
