//! Lab display helpers.
//!
//! Gamut surfaces are visualized with each vertex painted in (an
//! approximation of) its own color. These helpers map L*a*b* (D50) to
//! display sRGB, clipping whatever falls outside.
//!
//! # Usage
//!
//! ```rust
//! use gbd_math::lab_to_display_rgb;
//!
//! let white = lab_to_display_rgb([100.0, 0.0, 0.0]);
//! assert!(white.iter().all(|&c| c > 0.99));
//! ```

use crate::{Mat3, Vec3};

/// CIE Standard Illuminant D50 (ICC profile connection space white).
pub const D50: Vec3 = Vec3::new(0.96422, 1.0, 0.82521);

/// XYZ (D50) to linear sRGB, Bradford adapted to D65.
pub const XYZ_D50_TO_SRGB: Mat3 = Mat3::from_rows([
    [3.1338561, -1.6168667, -0.4906146],
    [-0.9787684, 1.9161415, 0.0334540],
    [0.0719453, -0.2289914, 1.4052427],
]);

/// Converts L*a*b* to XYZ relative to `white`.
pub fn lab_to_xyz(lab: [f64; 3], white: Vec3) -> Vec3 {
    const EPSILON: f64 = 216.0 / 24389.0;
    const KAPPA: f64 = 24389.0 / 27.0;

    let fy = (lab[0] + 16.0) / 116.0;
    let fx = fy + lab[1] / 500.0;
    let fz = fy - lab[2] / 200.0;

    let finv = |f: f64| {
        let f3 = f * f * f;
        if f3 > EPSILON {
            f3
        } else {
            (116.0 * f - 16.0) / KAPPA
        }
    };

    let yr = if lab[0] > KAPPA * EPSILON {
        fy * fy * fy
    } else {
        lab[0] / KAPPA
    };

    Vec3::new(finv(fx) * white.x, yr * white.y, finv(fz) * white.z)
}

/// sRGB OETF (linear to encoded).
#[inline]
pub fn srgb_oetf(v: f64) -> f64 {
    if v <= 0.0031308 {
        v * 12.92
    } else {
        1.055 * v.powf(1.0 / 2.4) - 0.055
    }
}

/// Converts L*a*b* (D50) to encoded sRGB clipped to [0, 1].
///
/// Intended for painting visualizations, not for color management.
pub fn lab_to_display_rgb(lab: [f64; 3]) -> [f64; 3] {
    let rgb = XYZ_D50_TO_SRGB * lab_to_xyz(lab, D50);
    [
        srgb_oetf(rgb.x.clamp(0.0, 1.0)),
        srgb_oetf(rgb.y.clamp(0.0, 1.0)),
        srgb_oetf(rgb.z.clamp(0.0, 1.0)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_lab_white_is_d50() {
        let xyz = lab_to_xyz([100.0, 0.0, 0.0], D50);
        assert_relative_eq!(xyz.x, D50.x, epsilon = 1e-12);
        assert_relative_eq!(xyz.y, 1.0, epsilon = 1e-12);
        assert_relative_eq!(xyz.z, D50.z, epsilon = 1e-12);
    }

    #[test]
    fn test_lab_black() {
        let xyz = lab_to_xyz([0.0, 0.0, 0.0], D50);
        assert_relative_eq!(xyz.y, 0.0, epsilon = 1e-12);
        assert_eq!(lab_to_display_rgb([0.0, 0.0, 0.0]), [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_display_rgb_hues() {
        let red = lab_to_display_rgb([54.0, 80.0, 67.0]);
        assert!(red[0] > red[1] && red[0] > red[2]);
        let blue = lab_to_display_rgb([30.0, 68.0, -112.0]);
        assert!(blue[2] > blue[0] && blue[2] > blue[1]);
    }
}
