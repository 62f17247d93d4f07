//! Plane equations.
//!
//! A [`Plane`] is stored as `n . x + d = 0` with a unit normal `n`, so
//! [`Plane::signed_distance`] is a true Euclidean distance. Planes through
//! the origin (`d == 0`) are used as radial half-space tests.

use crate::Vec3;

/// A plane `normal . x + d = 0` with unit `normal`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Plane {
    /// Unit normal. Zero for a degenerate plane.
    pub normal: Vec3,
    /// Offset.
    pub d: f64,
}

impl Plane {
    /// Creates a plane from a normal and offset, normalizing both.
    ///
    /// Returns `None` if the normal has no direction.
    pub fn new(normal: Vec3, d: f64) -> Option<Self> {
        let len = normal.length();
        if len > f64::MIN_POSITIVE && len.is_finite() {
            Some(Self {
                normal: normal / len,
                d: d / len,
            })
        } else {
            None
        }
    }

    /// Plane through three points, normal along `(b - a) x (c - a)`.
    ///
    /// Returns `None` for collinear points.
    pub fn from_points(a: Vec3, b: Vec3, c: Vec3) -> Option<Self> {
        let n = (b - a).cross(c - a);
        Self::new(n, -n.dot(a))
    }

    /// Plane through the origin containing directions `a` and `b`,
    /// normal along `a x b`.
    pub fn through_origin(a: Vec3, b: Vec3) -> Option<Self> {
        Self::new(a.cross(b), 0.0)
    }

    /// Like [`Plane::from_points`], but degenerate input yields the zero
    /// plane, which classifies every point as on-plane.
    pub fn from_points_or_zero(a: Vec3, b: Vec3, c: Vec3) -> Self {
        Self::from_points(a, b, c).unwrap_or_default()
    }

    /// Signed distance of `p` from the plane, positive on the normal side.
    #[inline]
    pub fn signed_distance(&self, p: Vec3) -> f64 {
        self.normal.dot(p) + self.d
    }

    /// Returns true if the plane has a valid normal.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.normal != Vec3::ZERO
    }

    /// The same plane with the normal reversed.
    #[inline]
    pub fn flipped(self) -> Self {
        Self {
            normal: -self.normal,
            d: -self.d,
        }
    }

    /// As a `[a, b, c, d]` plane equation array.
    #[inline]
    pub fn to_array(self) -> [f64; 4] {
        [self.normal.x, self.normal.y, self.normal.z, self.d]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_plane_from_points() {
        let p = Plane::from_points(
            Vec3::new(0.0, 0.0, 2.0),
            Vec3::new(1.0, 0.0, 2.0),
            Vec3::new(0.0, 1.0, 2.0),
        )
        .unwrap();
        assert_eq!(p.normal, Vec3::Z);
        assert_relative_eq!(p.signed_distance(Vec3::new(5.0, 5.0, 3.0)), 1.0);
        assert_relative_eq!(p.signed_distance(Vec3::ZERO), -2.0);
    }

    #[test]
    fn test_plane_degenerate() {
        assert!(Plane::from_points(Vec3::ZERO, Vec3::X, Vec3::X * 2.0).is_none());
        let z = Plane::from_points_or_zero(Vec3::ZERO, Vec3::X, Vec3::X * 2.0);
        assert!(!z.is_valid());
        assert_eq!(z.signed_distance(Vec3::ONE), 0.0);
    }

    #[test]
    fn test_plane_through_origin() {
        let p = Plane::through_origin(Vec3::X, Vec3::Y).unwrap();
        assert_eq!(p.d, 0.0);
        assert!(p.signed_distance(Vec3::Z) > 0.0);
        assert!(p.flipped().signed_distance(Vec3::Z) < 0.0);
    }
}
