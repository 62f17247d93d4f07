//! Surface mesh.
//!
//! Triangles and edges live in flat arenas addressed by index; both refer to
//! vertices by [`VertexId`]. Each triangle carries its plane equations so
//! queries never recompute them:
//!
//! | field | space | used by |
//! |-------|-------|---------|
//! | `pe`  | absolute | line intersection |
//! | `spe` | unit sphere | facing test of a direction |
//! | `ee`  | radial edge planes through the center | cone containment |
//!
//! Each edge carries its radial plane `re`, the BSP split plane.
//!
//! Triangles are wound so `(v1 - v0) x (v2 - v0)` points away from the
//! center; viewed from the center they run clockwise.

use std::collections::HashMap;

use gbd_math::{Mat3, Plane, Vec3};
use tracing::debug;

use crate::error::{GamutError, GamutResult};
use crate::vertex::{VertexFlags, VertexId, VertexPool};

/// Tolerance of the cone containment test.
pub(crate) const CONE_EPS: f64 = 1e-12;

/// A surface triangle.
#[derive(Debug, Clone, PartialEq)]
pub struct Triangle {
    /// Vertices, clockwise viewed from the center
    pub v: [VertexId; 3],
    /// Edges, `e[i]` joins `v[i]` and `v[i + 1]`
    pub e: [usize; 3],
    /// Slot (0 or 1) of this triangle in each edge's owner list
    pub ei: [u8; 3],
    /// Absolute plane
    pub pe: Plane,
    /// Unit sphere plane
    pub spe: Plane,
    /// Radial edge plane normals, non-negative inside the cone
    pub ee: [Vec3; 3],
}

impl Triangle {
    /// Returns false if the triangle faces away from direction `dir`.
    #[inline]
    pub fn faces(&self, dir: Vec3) -> bool {
        self.spe.normal.dot(dir) >= 0.0
    }

    /// Smallest radial edge plane value of a direction; non-negative when
    /// the direction passes through the triangle.
    #[inline]
    pub fn cone_margin(&self, dir: Vec3) -> f64 {
        if !self.faces(dir) {
            return f64::NEG_INFINITY;
        }
        self.ee[0].dot(dir).min(self.ee[1].dot(dir)).min(self.ee[2].dot(dir))
    }

    /// Returns true if the ray from the center along `dir` passes through the triangle.
    #[inline]
    pub fn contains_direction(&self, dir: Vec3) -> bool {
        self.cone_margin(dir) >= -CONE_EPS
    }

    /// Line parameter where `origin + t * dir` crosses the triangle, for
    /// any `t`. `center` is the gamut center the cones are built about.
    pub fn line_param(&self, center: Vec3, origin: Vec3, dir: Vec3) -> Option<f64> {
        let nd = self.pe.normal.dot(dir);
        if !self.pe.is_valid() || nd.abs() <= f64::EPSILON * dir.length() {
            return None;
        }
        let t = -self.pe.signed_distance(origin) / nd;
        let x = origin + dir * t - center;
        (self.cone_margin(x) >= -CONE_EPS * x.length()).then_some(t)
    }
}

/// An edge shared by exactly two triangles.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    /// End points, in the winding direction of `t[0]`
    pub v: [VertexId; 2],
    /// Owning triangles
    pub t: [usize; 2],
    /// Local edge index inside each owner
    pub ti: [u8; 2],
    /// Radial plane through the center and both end points
    pub re: Plane,
}

/// Closed triangle mesh over vertices of a [`VertexPool`].
#[derive(Debug, Clone)]
pub struct Mesh {
    center: Vec3,
    tris: Vec<Triangle>,
    edges: Vec<Edge>,
    /// Surface vertices in id order; position is the surface vertex number
    verts: Vec<VertexId>,
    vert_index: HashMap<VertexId, usize>,
    /// Candidates that fell inside the surface
    inside: Vec<VertexId>,
}

impl Mesh {
    /// Builds the mesh from wound triangles.
    ///
    /// Fails with [`GamutError::NotClosed`] unless every edge is shared by
    /// exactly two triangles traversing it in opposite directions.
    pub fn from_faces(
        pool: &VertexPool,
        center: Vec3,
        faces: &[[VertexId; 3]],
        inside: Vec<VertexId>,
    ) -> GamutResult<Self> {
        if faces.len() < 4 {
            return Err(GamutError::NotClosed(format!(
                "{} triangles cannot enclose a volume",
                faces.len()
            )));
        }

        let mut tris = Vec::with_capacity(faces.len());
        let mut edges: Vec<Edge> = Vec::with_capacity(faces.len() * 3 / 2);
        let mut lookup: HashMap<(VertexId, VertexId), usize> = HashMap::new();

        for (ti, f) in faces.iter().enumerate() {
            if f[0] == f[1] || f[1] == f[2] || f[0] == f[2] {
                return Err(GamutError::NotClosed(format!("triangle {ti} repeats a vertex")));
            }
            let mut e = [0usize; 3];
            let mut ei = [0u8; 3];
            for k in 0..3 {
                let (a, b) = (f[k], f[(k + 1) % 3]);
                let key = (a.min(b), a.max(b));
                match lookup.get(&key) {
                    None => {
                        let re = Plane::through_origin(pool.get(a).sp, pool.get(b).sp)
                            .unwrap_or_default();
                        lookup.insert(key, edges.len());
                        e[k] = edges.len();
                        edges.push(Edge {
                            v: [a, b],
                            t: [ti, usize::MAX],
                            ti: [k as u8, 0],
                            re,
                        });
                    }
                    Some(&ix) => {
                        let edge = &mut edges[ix];
                        if edge.t[1] != usize::MAX {
                            return Err(GamutError::NotClosed(format!(
                                "edge {}-{} has more than two triangles",
                                a.0, b.0
                            )));
                        }
                        if edge.v[0] != b {
                            return Err(GamutError::NotClosed(format!(
                                "triangle {ti} is wound against its neighbor"
                            )));
                        }
                        edge.t[1] = ti;
                        edge.ti[1] = k as u8;
                        e[k] = ix;
                        ei[k] = 1;
                    }
                }
            }
            tris.push(make_triangle(pool, *f, e, ei));
        }

        if let Some(open) = edges.iter().find(|e| e.t[1] == usize::MAX) {
            return Err(GamutError::NotClosed(format!(
                "edge {}-{} has a single triangle",
                open.v[0].0, open.v[1].0
            )));
        }

        let mut verts: Vec<VertexId> = faces.iter().flatten().copied().collect();
        verts.sort_unstable();
        verts.dedup();
        let vert_index = verts.iter().enumerate().map(|(i, &v)| (v, i)).collect();

        let mesh = Self {
            center,
            tris,
            edges,
            verts,
            vert_index,
            inside,
        };
        debug!(
            triangles = mesh.tris.len(),
            edges = mesh.edges.len(),
            vertices = mesh.verts.len(),
            "mesh built"
        );
        Ok(mesh)
    }

    /// Gamut center the mesh is built about.
    #[inline]
    pub fn center(&self) -> Vec3 {
        self.center
    }

    /// All triangles.
    #[inline]
    pub fn triangles(&self) -> &[Triangle] {
        &self.tris
    }

    /// All edges.
    #[inline]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Surface vertices in id order.
    #[inline]
    pub fn vertices(&self) -> &[VertexId] {
        &self.verts
    }

    /// Surface vertex number of a pool vertex.
    #[inline]
    pub fn vertex_number(&self, id: VertexId) -> Option<usize> {
        self.vert_index.get(&id).copied()
    }

    /// Candidates that ended up inside the surface.
    #[inline]
    pub fn inside(&self) -> &[VertexId] {
        &self.inside
    }

    /// Pool flags of a vertex plus its role in this mesh, `TRIANGULATED`
    /// or `INSIDE`.
    pub fn vertex_flags(&self, pool: &VertexPool, id: VertexId) -> VertexFlags {
        let mut flags = pool.get(id).flags;
        if self.vert_index.contains_key(&id) {
            flags.insert(VertexFlags::TRIANGULATED);
        } else if self.inside.contains(&id) {
            flags.insert(VertexFlags::INSIDE);
        }
        flags
    }

    /// Absolute corner positions of a triangle.
    #[inline]
    pub fn corners(&self, pool: &VertexPool, t: usize) -> [Vec3; 3] {
        self.tris[t].v.map(|v| pool.get(v).p)
    }

    /// Enclosed volume: sum of the center-apex tetrahedra.
    pub fn volume(&self, pool: &VertexPool) -> f64 {
        self.tris
            .iter()
            .map(|t| {
                let [a, b, c] = t.v.map(|v| pool.get(v).p - self.center);
                a.triple(b, c)
            })
            .sum::<f64>()
            / 6.0
    }

    /// Where the ray from the center along `dir` crosses triangle `t`.
    ///
    /// Exact at vertices and along edges: the barycentric weights are
    /// applied relative to the dominant corner.
    pub fn radial_point(&self, pool: &VertexPool, t: usize, dir: Vec3) -> Option<Vec3> {
        let [a, b, c] = self.tris[t].v.map(|v| pool.get(v).p - self.center);
        let w = Mat3::from_col_vecs(a, b, c).solve(dir)?;
        let sum = w.x + w.y + w.z;
        if sum <= 0.0 || !sum.is_finite() {
            return None;
        }
        let weights = [w.x / sum, w.y / sum, w.z / sum];
        let corners = [a, b, c];
        let k = (0..3)
            .max_by(|&i, &j| weights[i].total_cmp(&weights[j]))
            .unwrap_or(0);
        let mut x = corners[k];
        for j in (0..3).filter(|&j| j != k) {
            if weights[j] != 0.0 {
                x += (corners[j] - corners[k]) * weights[j];
            }
        }
        Some(self.center + x)
    }

    /// Closest point of triangle `t` to `p`.
    pub fn closest_point(&self, pool: &VertexPool, t: usize, p: Vec3) -> Vec3 {
        let [a, b, c] = self.corners(pool, t);
        closest_point_on_triangle(p, a, b, c)
    }

    /// Checks the closed 2-manifold invariants.
    pub fn validate(&self) -> GamutResult<()> {
        for (ix, e) in self.edges.iter().enumerate() {
            for s in 0..2 {
                let t = self.tris.get(e.t[s]).ok_or_else(|| {
                    GamutError::NotClosed(format!("edge {ix} owner {} missing", e.t[s]))
                })?;
                let k = e.ti[s] as usize;
                if t.e[k] != ix || t.ei[k] as usize != s {
                    return Err(GamutError::NotClosed(format!(
                        "edge {ix} and triangle {} disagree",
                        e.t[s]
                    )));
                }
            }
        }
        for (ix, t) in self.tris.iter().enumerate() {
            for k in 0..3 {
                let e = &self.edges[t.e[k]];
                if e.t[t.ei[k] as usize] != ix {
                    return Err(GamutError::NotClosed(format!(
                        "triangle {ix} edge {k} back reference broken"
                    )));
                }
            }
        }
        if let Some(v) = self.inside.iter().find(|v| self.vert_index.contains_key(v)) {
            return Err(GamutError::NotClosed(format!(
                "vertex {} is both on and inside the surface",
                v.0
            )));
        }
        let euler = self.verts.len() as i64 - self.edges.len() as i64 + self.tris.len() as i64;
        if euler != 2 {
            return Err(GamutError::NotClosed(format!("Euler characteristic {euler}")));
        }
        Ok(())
    }
}

fn make_triangle(pool: &VertexPool, v: [VertexId; 3], e: [usize; 3], ei: [u8; 3]) -> Triangle {
    let [a, b, c] = v.map(|id| *pool.get(id));
    let ee = [
        a.sp.cross(b.sp).normalize(),
        b.sp.cross(c.sp).normalize(),
        c.sp.cross(a.sp).normalize(),
    ];
    Triangle {
        v,
        e,
        ei,
        pe: Plane::from_points_or_zero(a.p, b.p, c.p),
        spe: Plane::from_points_or_zero(a.sp, b.sp, c.sp),
        ee,
    }
}

/// Closest point on triangle `(a, b, c)` to `p` (Ericson, Real-Time
/// Collision Detection, 5.1.5).
pub fn closest_point_on_triangle(p: Vec3, a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;

    let d1 = ab.dot(ap);
    let d2 = ac.dot(ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return a;
    }

    let bp = p - b;
    let d3 = ab.dot(bp);
    let d4 = ac.dot(bp);
    if d3 >= 0.0 && d4 <= d3 {
        return b;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return a + ab * v;
    }

    let cp = p - c;
    let d5 = ab.dot(cp);
    let d6 = ac.dot(cp);
    if d6 >= 0.0 && d5 <= d6 {
        return c;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return a + ac * w;
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return b + (c - b) * w;
    }

    let denom = 1.0 / (va + vb + vc);
    a + ab * (vb * denom) + ac * (vc * denom)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::vertex::Vertex;
    use approx::assert_relative_eq;

    /// Unit octahedron about the origin, wound outward.
    pub(crate) fn octahedron(pool: &mut VertexPool) -> Mesh {
        let ids: Vec<VertexId> = [Vec3::X, -Vec3::X, Vec3::Y, -Vec3::Y, Vec3::Z, -Vec3::Z]
            .iter()
            .map(|&p| {
                let id = pool.alloc(Vertex::new(Vec3::ZERO, p).unwrap());
                pool.retain(id);
                id
            })
            .collect();
        let (px, nx, py, ny, pz, nz) = (ids[0], ids[1], ids[2], ids[3], ids[4], ids[5]);
        let faces = [
            [px, py, pz],
            [py, nx, pz],
            [nx, ny, pz],
            [ny, px, pz],
            [py, px, nz],
            [nx, py, nz],
            [ny, nx, nz],
            [px, ny, nz],
        ];
        Mesh::from_faces(pool, Vec3::ZERO, &faces, Vec::new()).unwrap()
    }

    #[test]
    fn test_octahedron_topology() {
        let mut pool = VertexPool::new();
        let mesh = octahedron(&mut pool);
        assert_eq!(mesh.triangles().len(), 8);
        assert_eq!(mesh.edges().len(), 12);
        assert_eq!(mesh.vertices().len(), 6);
        mesh.validate().unwrap();
        for t in mesh.triangles() {
            assert!(t.pe.signed_distance(Vec3::ZERO) < 0.0, "inward face");
            assert!(t.spe.signed_distance(Vec3::ZERO) < 0.0);
            assert!(!t.faces(-t.spe.normal));
        }
    }

    #[test]
    fn test_octahedron_volume() {
        let mut pool = VertexPool::new();
        let mesh = octahedron(&mut pool);
        assert_relative_eq!(mesh.volume(&pool), 4.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_radial_point_exact_at_vertex() {
        let mut pool = VertexPool::new();
        let mesh = octahedron(&mut pool);
        let hits: Vec<usize> = (0..8)
            .filter(|&t| mesh.triangles()[t].contains_direction(Vec3::X))
            .collect();
        assert_eq!(hits.len(), 4);
        for t in hits {
            assert_eq!(mesh.radial_point(&pool, t, Vec3::X * 3.0), Some(Vec3::X));
        }
    }

    #[test]
    fn test_radial_point_face_interior() {
        let mut pool = VertexPool::new();
        let mesh = octahedron(&mut pool);
        let dir = Vec3::ONE.normalize();
        let t = (0..8)
            .find(|&t| mesh.triangles()[t].contains_direction(dir))
            .unwrap();
        let x = mesh.radial_point(&pool, t, dir).unwrap();
        assert_relative_eq!(x.x, 1.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(x.y, 1.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(x.z, 1.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_vertex_flags() {
        let mut pool = VertexPool::new();
        let mesh = octahedron(&mut pool);
        let inner = pool.alloc(Vertex::new(Vec3::ZERO, Vec3::splat(0.1)).unwrap());
        let mesh = Mesh::from_faces(
            &pool,
            Vec3::ZERO,
            &mesh.triangles().iter().map(|t| t.v).collect::<Vec<_>>(),
            vec![inner],
        )
        .unwrap();
        mesh.validate().unwrap();

        let on = mesh.vertices()[0];
        let on_flags = mesh.vertex_flags(&pool, on);
        assert!(on_flags.contains(VertexFlags::SET.union(VertexFlags::TRIANGULATED)));
        assert!(!mesh.vertex_flags(&pool, on).contains(VertexFlags::INSIDE));
        assert!(mesh.vertex_flags(&pool, inner).contains(VertexFlags::INSIDE));
        assert_eq!(mesh.inside(), &[inner]);
    }

    #[test]
    fn test_open_mesh_rejected() {
        let mut pool = VertexPool::new();
        let ids: Vec<VertexId> = [Vec3::X, Vec3::Y, Vec3::Z, -Vec3::X, -Vec3::Y]
            .iter()
            .map(|&p| pool.alloc(Vertex::new(Vec3::ZERO, p).unwrap()))
            .collect();
        let faces = [
            [ids[0], ids[1], ids[2]],
            [ids[1], ids[3], ids[2]],
            [ids[3], ids[4], ids[2]],
            [ids[4], ids[0], ids[2]],
        ];
        let err = Mesh::from_faces(&pool, Vec3::ZERO, &faces, Vec::new()).unwrap_err();
        assert!(matches!(err, GamutError::NotClosed(_)));
    }

    #[test]
    fn test_closest_point_regions() {
        let (a, b, c) = (Vec3::ZERO, Vec3::X, Vec3::Y);
        // Vertex, edge and face regions
        assert_eq!(closest_point_on_triangle(Vec3::new(-1.0, -1.0, 0.0), a, b, c), a);
        assert_eq!(
            closest_point_on_triangle(Vec3::new(0.5, -1.0, 2.0), a, b, c),
            Vec3::new(0.5, 0.0, 0.0)
        );
        let inner = closest_point_on_triangle(Vec3::new(0.25, 0.25, 5.0), a, b, c);
        assert_relative_eq!(inner.x, 0.25, epsilon = 1e-12);
        assert_relative_eq!(inner.y, 0.25, epsilon = 1e-12);
        assert_eq!(inner.z, 0.0);
    }

    #[test]
    fn test_line_param() {
        let mut pool = VertexPool::new();
        let mesh = octahedron(&mut pool);
        let tri = |p: Vec3| {
            mesh.triangles()
                .iter()
                .find(|t| t.contains_direction(p))
                .unwrap()
        };

        // Crosses the +x+y+z face at x = 0.8
        let t = tri(Vec3::new(1.0, 0.1, 0.1));
        let origin = Vec3::new(-2.0, 0.1, 0.1);
        let h = t.line_param(Vec3::ZERO, origin, Vec3::X * 4.0).unwrap();
        assert_relative_eq!(h, 0.7, epsilon = 1e-12);
        // Behind the origin still counts
        let h = t.line_param(Vec3::ZERO, Vec3::new(3.0, 0.1, 0.1), Vec3::X).unwrap();
        assert_relative_eq!(h, -2.2, epsilon = 1e-12);
        // Plane is hit outside the triangle
        assert!(t.line_param(Vec3::ZERO, Vec3::new(0.0, -0.5, 0.1), Vec3::X).is_none());
        // Parallel to the plane
        let along = Vec3::new(1.0, -1.0, 0.0);
        assert!(t.line_param(Vec3::ZERO, Vec3::ZERO, along).is_none());
    }
}
