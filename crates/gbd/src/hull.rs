//! Convex hull of the log-radius point cloud.
//!
//! Boundary candidates are mapped to hull-testing coordinates (unit direction
//! scaled by the log radius) and their convex hull is computed with
//! quickhull. The hull's connectivity is the surface triangulation: because
//! every hull-testing point lies on the ray from the center through its
//! sample, the same triangles form a closed, star-shaped surface around the
//! center in absolute coordinates too.
//!
//! Faces are wound so that `(v1 - v0) x (v2 - v0)` points out of the hull.

use std::collections::HashMap;

use gbd_math::Vec3;
use tracing::debug;

use crate::error::{GamutError, GamutResult};

/// Relative tolerance of the plane tests.
const EPS_REL: f64 = 1e-10;

#[derive(Debug, Clone)]
struct Face {
    v: [usize; 3],
    normal: Vec3,
    offset: f64,
    outside: Vec<usize>,
    alive: bool,
}

impl Face {
    fn new(pts: &[Vec3], v: [usize; 3]) -> Self {
        let (a, b, c) = (pts[v[0]], pts[v[1]], pts[v[2]]);
        let normal = (b - a).cross(c - a).normalize();
        Self {
            v,
            normal,
            offset: normal.dot(a),
            outside: Vec::new(),
            alive: true,
        }
    }

    #[inline]
    fn distance(&self, p: Vec3) -> f64 {
        self.normal.dot(p) - self.offset
    }
}

/// Computes the convex hull of `pts`.
///
/// The first `real` points are samples, the rest are establishment points
/// that may join the hull but never seed it. Returns the hull triangles as
/// indices into `pts`, or [`GamutError::NotReady`] unless the samples hold 4
/// non-coplanar points.
pub fn convex_hull(pts: &[Vec3], real: usize) -> GamutResult<Vec<[usize; 3]>> {
    let real = real.min(pts.len());
    let scale = pts.iter().map(|p| p.abs().max_element()).fold(0.0, f64::max);
    let eps = EPS_REL * scale.max(f64::MIN_POSITIVE);

    let seed = initial_simplex(&pts[..real], eps)
        .ok_or_else(|| GamutError::not_ready("fewer than 4 non-coplanar points"))?;

    let mut faces: Vec<Face> = Vec::new();
    let mut edges: HashMap<(usize, usize), usize> = HashMap::new();

    let [i0, i1, i2, i3] = seed;
    for (tri, opposite) in [
        ([i0, i1, i2], i3),
        ([i0, i1, i3], i2),
        ([i0, i2, i3], i1),
        ([i1, i2, i3], i0),
    ] {
        let mut f = Face::new(pts, tri);
        if f.distance(pts[opposite]) > 0.0 {
            f = Face::new(pts, [tri[0], tri[2], tri[1]]);
        }
        add_face(&mut faces, &mut edges, f);
    }

    for i in (0..pts.len()).filter(|i| !seed.contains(i)) {
        assign(&mut faces, 0..4, pts, i, eps);
    }

    let mut pending: Vec<usize> = (0..4).collect();
    while let Some(fi) = pending.pop() {
        if !faces[fi].alive || faces[fi].outside.is_empty() {
            continue;
        }

        let eye = farthest(&faces[fi], pts);
        let eye_p = pts[eye];

        // Visible region by flood fill across shared edges
        let mut visible = vec![fi];
        let mut is_visible: HashMap<usize, bool> = HashMap::from([(fi, true)]);
        let mut k = 0;
        while k < visible.len() {
            let f = &faces[visible[k]];
            for e in 0..3 {
                let (a, b) = (f.v[e], f.v[(e + 1) % 3]);
                if let Some(&nb) = edges.get(&(b, a)) {
                    if !is_visible.contains_key(&nb) {
                        let vis = faces[nb].distance(eye_p) > eps;
                        is_visible.insert(nb, vis);
                        if vis {
                            visible.push(nb);
                        }
                    }
                }
            }
            k += 1;
        }

        let mut horizon = Vec::new();
        for &vf in &visible {
            let f = &faces[vf];
            for e in 0..3 {
                let (a, b) = (f.v[e], f.v[(e + 1) % 3]);
                let across = edges.get(&(b, a)).copied();
                if !across.is_some_and(|nb| is_visible.get(&nb) == Some(&true)) {
                    horizon.push((a, b));
                }
            }
        }

        let mut orphans = Vec::new();
        for &vf in &visible {
            let f = &mut faces[vf];
            f.alive = false;
            orphans.extend(f.outside.drain(..).filter(|&p| p != eye));
            let v = f.v;
            for e in 0..3 {
                edges.remove(&(v[e], v[(e + 1) % 3]));
            }
        }

        let first_new = faces.len();
        for (a, b) in horizon {
            add_face(&mut faces, &mut edges, Face::new(pts, [a, b, eye]));
        }
        let end = faces.len();
        for p in orphans {
            assign(&mut faces, first_new..end, pts, p, eps);
        }
        pending.extend(first_new..end);
    }

    let hull: Vec<[usize; 3]> = faces.iter().filter(|f| f.alive).map(|f| f.v).collect();
    debug!(points = pts.len(), faces = hull.len(), "log hull");
    Ok(hull)
}

fn add_face(faces: &mut Vec<Face>, edges: &mut HashMap<(usize, usize), usize>, f: Face) {
    let ix = faces.len();
    for e in 0..3 {
        edges.insert((f.v[e], f.v[(e + 1) % 3]), ix);
    }
    faces.push(f);
}

/// Adds point `p` to the outside set of the first candidate face it lies
/// strictly in front of. Points behind every face are interior.
fn assign(
    faces: &mut [Face],
    candidates: std::ops::Range<usize>,
    pts: &[Vec3],
    p: usize,
    eps: f64,
) {
    for fi in candidates {
        let f = &mut faces[fi];
        if f.alive && f.distance(pts[p]) > eps {
            f.outside.push(p);
            return;
        }
    }
}

fn farthest(f: &Face, pts: &[Vec3]) -> usize {
    let mut best = f.outside[0];
    let mut best_d = f.distance(pts[best]);
    for &p in &f.outside[1..] {
        let d = f.distance(pts[p]);
        if d > best_d {
            best = p;
            best_d = d;
        }
    }
    best
}

/// Four points spanning a non-degenerate tetrahedron, if any.
fn initial_simplex(pts: &[Vec3], eps: f64) -> Option<[usize; 4]> {
    if pts.len() < 4 {
        return None;
    }

    let i0 = (0..pts.len()).min_by(|&a, &b| pts[a].x.total_cmp(&pts[b].x))?;
    let i1 = argmax(pts, |p| p.distance(pts[i0]))?;
    if pts[i1].distance(pts[i0]) <= eps {
        return None;
    }

    let axis = (pts[i1] - pts[i0]).normalize();
    let line_dist = |p: Vec3| {
        let r = p - pts[i0];
        (r - axis * r.dot(axis)).length()
    };
    let i2 = argmax(pts, line_dist)?;
    if line_dist(pts[i2]) <= eps {
        return None;
    }

    let normal = (pts[i1] - pts[i0]).cross(pts[i2] - pts[i0]).normalize();
    let plane_dist = |p: Vec3| normal.dot(p - pts[i0]).abs();
    let i3 = argmax(pts, plane_dist)?;
    if plane_dist(pts[i3]) <= eps {
        return None;
    }

    Some([i0, i1, i2, i3])
}

fn argmax<F: Fn(Vec3) -> f64>(pts: &[Vec3], f: F) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &p) in pts.iter().enumerate() {
        let d = f(p);
        if best.is_none_or(|(_, bd)| d > bd) {
            best = Some((i, d));
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn fibonacci_sphere(n: usize, radius: f64) -> Vec<Vec3> {
        let golden = std::f64::consts::PI * (3.0 - 5.0f64.sqrt());
        (0..n)
            .map(|i| {
                let z = 1.0 - 2.0 * (i as f64 + 0.5) / n as f64;
                let r = (1.0 - z * z).sqrt();
                let t = golden * i as f64;
                Vec3::new(r * t.cos(), r * t.sin(), z) * radius
            })
            .collect()
    }

    fn check_closed(faces: &[[usize; 3]]) {
        let mut directed = HashSet::new();
        for f in faces {
            for e in 0..3 {
                assert!(directed.insert((f[e], f[(e + 1) % 3])), "edge used twice");
            }
        }
        for &(a, b) in &directed {
            assert!(directed.contains(&(b, a)), "open edge {a}-{b}");
        }
        let verts: HashSet<usize> = faces.iter().flatten().copied().collect();
        let euler = verts.len() as i64 - directed.len() as i64 / 2 + faces.len() as i64;
        assert_eq!(euler, 2);
    }

    #[test]
    fn test_octahedron() {
        let pts = vec![Vec3::X, -Vec3::X, Vec3::Y, -Vec3::Y, Vec3::Z, -Vec3::Z, Vec3::ZERO];
        let faces = convex_hull(&pts, pts.len()).unwrap();
        assert_eq!(faces.len(), 8);
        check_closed(&faces);
        assert!(faces.iter().flatten().all(|&i| i != 6));
        for f in &faces {
            let (a, b, c) = (pts[f[0]], pts[f[1]], pts[f[2]]);
            assert!(a.triple(b, c) > 0.0, "face {:?} wound inward", f);
        }
    }

    #[test]
    fn test_sphere_cloud() {
        let mut pts = fibonacci_sphere(200, 3.0);
        pts.extend(fibonacci_sphere(50, 1.0));
        let faces = convex_hull(&pts, pts.len()).unwrap();
        check_closed(&faces);
        // Every input point is on or behind every face
        for f in &faces {
            let face = Face::new(&pts, *f);
            for &p in &pts {
                assert!(face.distance(p) < 1e-9);
            }
        }
        let verts: HashSet<usize> = faces.iter().flatten().copied().collect();
        assert_eq!(verts.len(), 200);
    }

    #[test]
    fn test_coplanar_not_ready() {
        let pts = vec![
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::new(0.0, 1.0, 1.0),
            Vec3::new(1.0, 1.0, 1.0),
        ];
        let err = convex_hull(&pts, pts.len()).unwrap_err();
        assert!(err.is_not_ready());
        assert!(convex_hull(&pts[..3], 3).unwrap_err().is_not_ready());
    }

    #[test]
    fn test_establishment_points_never_seed() {
        // Three real samples plus a synthetic point off their plane
        let pts = vec![Vec3::X, Vec3::Y, Vec3::Z, Vec3::splat(-1.0)];
        assert!(convex_hull(&pts, 3).unwrap_err().is_not_ready());
    }

    #[test]
    fn test_establishment_points_join_hull() {
        // Samples on one side of the origin only
        let mut pts = vec![
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::new(2.0, 0.5, 0.5),
        ];
        let real = pts.len();
        for axis in [Vec3::X, Vec3::Y, Vec3::Z] {
            pts.push(axis * 1e-3);
            pts.push(-axis * 1e-3);
        }
        let faces = convex_hull(&pts, real).unwrap();
        check_closed(&faces);
        assert!(faces.iter().flatten().any(|&i| i >= real));
    }
}
