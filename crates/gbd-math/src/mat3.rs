//! 3x3 matrix type.
//!
//! [`Mat3`] is used for small linear solves in gamut geometry, mainly
//! expressing a direction in the basis of a triangle's three vertex
//! vectors (cone coordinates).
//!
//! # Convention
//!
//! Matrices are stored in **row-major** order and use **column vectors**:
//!
//! ```text
//! | m00 m01 m02 |   | x |   | m00*x + m01*y + m02*z |
//! | m10 m11 m12 | * | y | = | m10*x + m11*y + m12*z |
//! | m20 m21 m22 |   | z |   | m20*x + m21*y + m22*z |
//! ```

use crate::Vec3;
use std::ops::{Index, Mul};

/// A 3x3 double precision matrix.
///
/// # Example
///
/// ```rust
/// use gbd_math::{Mat3, Vec3};
///
/// let identity = Mat3::IDENTITY;
/// let v = Vec3::new(1.0, 2.0, 3.0);
/// assert_eq!(identity * v, v);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct Mat3 {
    /// Matrix elements in row-major order: [row0, row1, row2]
    pub m: [[f64; 3]; 3],
}

impl Mat3 {
    /// Zero matrix.
    pub const ZERO: Self = Self { m: [[0.0; 3]; 3] };

    /// Identity matrix.
    pub const IDENTITY: Self = Self {
        m: [
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
        ],
    };

    /// Creates a matrix from row arrays.
    #[inline]
    pub const fn from_rows(rows: [[f64; 3]; 3]) -> Self {
        Self { m: rows }
    }

    /// Creates a matrix from Vec3 columns.
    #[inline]
    pub fn from_col_vecs(c0: Vec3, c1: Vec3, c2: Vec3) -> Self {
        Self::from_rows([[c0.x, c1.x, c2.x], [c0.y, c1.y, c2.y], [c0.z, c1.z, c2.z]])
    }

    /// Returns a column as Vec3.
    #[inline]
    pub fn col(&self, i: usize) -> Vec3 {
        Vec3::new(self.m[0][i], self.m[1][i], self.m[2][i])
    }

    /// Computes the determinant.
    #[inline]
    pub fn determinant(&self) -> f64 {
        let m = &self.m;
        m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
            - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
            + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
    }

    /// Solves `self * x = b` with Cramer's rule.
    ///
    /// Returns `None` if the matrix is singular to within `1e-300`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use gbd_math::{Mat3, Vec3};
    ///
    /// let m = Mat3::from_col_vecs(Vec3::X, Vec3::Y * 2.0, Vec3::Z * 4.0);
    /// let x = m.solve(Vec3::new(1.0, 1.0, 1.0)).unwrap();
    /// assert_eq!(x, Vec3::new(1.0, 0.5, 0.25));
    /// ```
    pub fn solve(&self, b: Vec3) -> Option<Vec3> {
        let (c0, c1, c2) = (self.col(0), self.col(1), self.col(2));
        let det = c0.triple(c1, c2);
        if det.abs() < 1e-300 || !det.is_finite() {
            return None;
        }
        Some(Vec3::new(
            b.triple(c1, c2) / det,
            c0.triple(b, c2) / det,
            c0.triple(c1, b) / det,
        ))
    }

    /// Transforms a Vec3 by this matrix.
    #[inline]
    pub fn transform(&self, v: Vec3) -> Vec3 {
        Vec3::new(
            self.m[0][0] * v.x + self.m[0][1] * v.y + self.m[0][2] * v.z,
            self.m[1][0] * v.x + self.m[1][1] * v.y + self.m[1][2] * v.z,
            self.m[2][0] * v.x + self.m[2][1] * v.y + self.m[2][2] * v.z,
        )
    }

    /// Converts to glam DMat3 (column-major).
    #[inline]
    pub fn to_glam(&self) -> glam::DMat3 {
        glam::DMat3::from_cols_array_2d(&[
            [self.m[0][0], self.m[1][0], self.m[2][0]],
            [self.m[0][1], self.m[1][1], self.m[2][1]],
            [self.m[0][2], self.m[1][2], self.m[2][2]],
        ])
    }
}

impl Default for Mat3 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul<Vec3> for Mat3 {
    type Output = Vec3;

    #[inline]
    fn mul(self, rhs: Vec3) -> Vec3 {
        self.transform(rhs)
    }
}

impl Index<usize> for Mat3 {
    type Output = [f64; 3];

    #[inline]
    fn index(&self, i: usize) -> &[f64; 3] {
        &self.m[i]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mat3_identity() {
        let v = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(Mat3::IDENTITY * v, v);
    }

    #[test]
    fn test_mat3_determinant() {
        let m = Mat3::from_col_vecs(Vec3::X * 2.0, Vec3::Y * 3.0, Vec3::Z * 4.0);
        assert_eq!(m.determinant(), 24.0);
        assert_relative_eq!(m.to_glam().determinant(), 24.0);
    }

    #[test]
    fn test_mat3_solve() {
        let m = Mat3::from_rows([[2.0, 1.0, 0.0], [0.0, 1.0, 1.0], [1.0, 0.0, 3.0]]);
        let x = Vec3::new(0.5, -1.0, 2.0);
        let b = m * x;
        let solved = m.solve(b).unwrap();
        assert_relative_eq!(solved.x, x.x, epsilon = 1e-12);
        assert_relative_eq!(solved.y, x.y, epsilon = 1e-12);
        assert_relative_eq!(solved.z, x.z, epsilon = 1e-12);
    }

    #[test]
    fn test_mat3_singular() {
        let m = Mat3::from_col_vecs(Vec3::X, Vec3::X, Vec3::Z);
        assert!(m.solve(Vec3::ONE).is_none());
    }
}
