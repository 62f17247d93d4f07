//! Error types for gamut boundary operations.
//!
//! # Categories
//!
//! - **Readiness**: [`NotReady`](GamutError::NotReady) - a query was made before
//!   the samples support a closed surface (fewer than 4 non-coplanar points)
//! - **Invariant violations**: [`NotClosed`](GamutError::NotClosed) - a mesh edge
//!   without exactly two owning triangles, usually from a corrupt `.gam` file
//! - **Missing data**: [`NoCusps`](GamutError::NoCusps),
//!   [`WhiteBlackUnknown`](GamutError::WhiteBlackUnknown)
//! - **Persistence**: [`Parse`](GamutError::Parse), [`Io`](GamutError::Io)
//!
//! Geometric degeneracies met while expanding (duplicate points, points at
//! the center) are not errors: the offending sample is discarded.
//!
//! # Usage
//!
//! ```rust
//! use gbd::{Gamut, GamutError};
//!
//! let gamut = Gamut::new(0.0, false);
//! match gamut.volume() {
//!     Err(GamutError::NotReady(_)) => {}
//!     other => panic!("unexpected {:?}", other),
//! }
//! ```

use thiserror::Error;

/// Result type for gamut operations.
pub type GamutResult<T> = Result<T, GamutError>;

/// Errors that can occur building, querying or persisting a gamut.
#[derive(Debug, Error)]
pub enum GamutError {
    /// The surface cannot be built from the current samples.
    #[error("gamut surface not ready: {0}")]
    NotReady(String),

    /// The mesh violates the closed 2-manifold invariant.
    #[error("gamut surface is not closed: {0}")]
    NotClosed(String),

    /// Cusps were never finished, or a hue sector had no candidate.
    #[error("cusps not available: {0}")]
    NoCusps(String),

    /// The gamut white and black points can't be determined.
    #[error("white/black points unknown")]
    WhiteBlackUnknown,

    /// Malformed or truncated gamut file.
    #[error("parse error at line {line}: {message}")]
    Parse {
        /// 1-based line number, 0 when the file ended early
        line: usize,
        /// What was wrong
        message: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GamutError {
    /// Creates a [`GamutError::NotReady`] error.
    #[inline]
    pub fn not_ready(reason: impl Into<String>) -> Self {
        Self::NotReady(reason.into())
    }

    /// Creates a [`GamutError::Parse`] error.
    #[inline]
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }

    /// Returns `true` if the gamut simply has too few samples yet.
    #[inline]
    pub fn is_not_ready(&self) -> bool {
        matches!(self, Self::NotReady(_))
    }

    /// Returns `true` if this is a file format error.
    #[inline]
    pub fn is_parse_error(&self) -> bool {
        matches!(self, Self::Parse { .. })
    }
}
