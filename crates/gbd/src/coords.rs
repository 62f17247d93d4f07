//! Coordinate conventions.
//!
//! Callers work in `[L, a, b]` (or `[J, a, b]`). Internally the lightness
//! axis is Z and the two chroma axes are X and Y, so that longitude is the
//! hue angle and latitude measures lightness about the gamut center:
//!
//! ```text
//! external [L, a, b]  ->  internal (x = a, y = b, z = L)
//! ```
//!
//! Radii are log-compressed before hull testing. Near the neutral axis
//! chroma spans orders of magnitude, and the soft log keeps small radii
//! linear while squashing large ones.

use std::f64::consts::PI;

use gbd_math::Vec3;

/// Knee of the soft-log radius compression.
pub(crate) const LOG_KNEE: f64 = 10.0;

/// Perceptual space the gamut is expressed in.
///
/// Both use the same axis remapping; only the default conventions (hue
/// sector angles) differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColorRep {
    /// CIE L*a*b*
    #[default]
    Lab,
    /// CIECAM02 Jab
    Jab,
}

impl ColorRep {
    /// Tag used in `.gam` files.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Lab => "LAB",
            Self::Jab => "JAB",
        }
    }

    /// Parses a `.gam` tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim() {
            "LAB" => Some(Self::Lab),
            "JAB" => Some(Self::Jab),
            _ => None,
        }
    }

    /// Field names of the vertex table columns.
    pub(crate) fn fields(self) -> [&'static str; 3] {
        match self {
            Self::Lab => ["LAB_L", "LAB_A", "LAB_B"],
            Self::Jab => ["JAB_J", "JAB_A", "JAB_B"],
        }
    }

    /// Hue angles in degrees of red, yellow, green, cyan, blue, magenta.
    pub fn sector_hues(self) -> [f64; 6] {
        match self {
            Self::Lab => [36.0, 101.0, 149.0, 225.0, 300.0, 337.0],
            Self::Jab => [20.14, 90.0, 164.25, 200.0, 237.53, 320.0],
        }
    }
}

/// External `[L, a, b]` to internal coordinates.
#[inline]
pub fn to_internal(lab: [f64; 3]) -> Vec3 {
    Vec3::new(lab[1], lab[2], lab[0])
}

/// Internal coordinates to external `[L, a, b]`.
#[inline]
pub fn to_external(v: Vec3) -> [f64; 3] {
    [v.z, v.x, v.y]
}

/// Radial coordinates about the gamut center.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Radial {
    /// Distance from the center
    pub radius: f64,
    /// Hue angle in radians, (-PI, PI]
    pub longitude: f64,
    /// Lightness elevation in radians, [-PI/2, PI/2]
    pub latitude: f64,
}

/// Rectangular (internal, absolute) to radial about `center`.
pub fn rect_to_radial(center: Vec3, p: Vec3) -> Radial {
    let rel = p - center;
    let radius = rel.length();
    if radius <= 0.0 {
        return Radial::default();
    }
    let longitude = rel.y.atan2(rel.x);
    let latitude = (rel.z / radius).clamp(-1.0, 1.0).asin();
    Radial {
        radius,
        longitude,
        latitude,
    }
}

/// Radial about `center` to rectangular (internal, absolute).
pub fn radial_to_rect(center: Vec3, r: Radial) -> Vec3 {
    center + direction(r.longitude, r.latitude) * r.radius
}

/// Unit vector for a (longitude, latitude) direction.
#[inline]
pub fn direction(longitude: f64, latitude: f64) -> Vec3 {
    let cl = latitude.cos();
    Vec3::new(cl * longitude.cos(), cl * longitude.sin(), latitude.sin())
}

/// Soft-log compression of a radius.
#[inline]
pub fn log_radius(radius: f64) -> f64 {
    LOG_KNEE * (radius / LOG_KNEE).ln_1p()
}

/// Inverse of [`log_radius`].
#[inline]
pub fn exp_radius(lr: f64) -> f64 {
    LOG_KNEE * (lr / LOG_KNEE).exp_m1()
}

/// Hue angle in degrees [0, 360) of an external `[L, a, b]` point.
pub fn hue_degrees(lab: [f64; 3]) -> f64 {
    let h = lab[2].atan2(lab[1]).to_degrees();
    if h < 0.0 { h + 360.0 } else { h }
}

/// Absolute difference of two angles in degrees, wrapped to [0, 180].
pub fn hue_difference(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(360.0);
    if d > 180.0 { 360.0 - d } else { d }
}

/// Wraps a longitude into (-PI, PI].
pub fn wrap_longitude(lon: f64) -> f64 {
    let w = (lon + PI).rem_euclid(2.0 * PI) - PI;
    if w <= -PI { w + 2.0 * PI } else { w }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_axis_remap() {
        let v = to_internal([50.0, 10.0, -20.0]);
        assert_eq!(v, Vec3::new(10.0, -20.0, 50.0));
        assert_eq!(to_external(v), [50.0, 10.0, -20.0]);
    }

    #[test]
    fn test_radial_roundtrip() {
        let center = Vec3::new(0.0, 0.0, 50.0);
        let p = Vec3::new(30.0, -40.0, 70.0);
        let r = rect_to_radial(center, p);
        assert_relative_eq!(r.radius, (30.0f64 * 30.0 + 40.0 * 40.0 + 20.0 * 20.0).sqrt());
        let back = radial_to_rect(center, r);
        assert_relative_eq!(back.x, p.x, epsilon = 1e-10);
        assert_relative_eq!(back.y, p.y, epsilon = 1e-10);
        assert_relative_eq!(back.z, p.z, epsilon = 1e-10);
    }

    #[test]
    fn test_radial_at_center() {
        let r = rect_to_radial(Vec3::ONE, Vec3::ONE);
        assert_eq!(r, Radial::default());
    }

    #[test]
    fn test_log_radius_monotonic() {
        let mut last = -1.0;
        for i in 0..100 {
            let r = i as f64 * 2.5;
            let lr = log_radius(r);
            assert!(lr > last);
            assert_relative_eq!(exp_radius(lr), r, epsilon = 1e-9);
            last = lr;
        }
        // Linear for small radii
        assert_relative_eq!(log_radius(1e-6), 1e-6, epsilon = 1e-12);
    }

    #[test]
    fn test_hue() {
        assert_relative_eq!(hue_degrees([50.0, 0.0, 10.0]), 90.0);
        assert_relative_eq!(hue_degrees([50.0, 0.0, -10.0]), 270.0);
        assert_relative_eq!(hue_difference(350.0, 10.0), 20.0);
        assert_relative_eq!(hue_difference(10.0, 350.0), 20.0);
    }

    #[test]
    fn test_wrap_longitude() {
        assert_relative_eq!(wrap_longitude(3.0 * PI / 2.0), -PI / 2.0, epsilon = 1e-12);
        assert_relative_eq!(wrap_longitude(-PI), PI, epsilon = 1e-12);
    }

    #[test]
    fn test_rep_tags() {
        assert_eq!(ColorRep::from_tag("JAB"), Some(ColorRep::Jab));
        assert_eq!(ColorRep::from_tag(ColorRep::Lab.tag()), Some(ColorRep::Lab));
        assert_eq!(ColorRep::from_tag("XYZ"), None);
    }
}
