//! BSP lookup tree over surface triangles.
//!
//! Every split plane is the radial plane of a triangle edge, through the
//! gamut center, so each half-space is a union of whole triangle cones and
//! a direction query only descends one path. Triangles whose cone straddles
//! a plane are stored on both sides.

use gbd_math::{Plane, Vec3};
use tracing::debug;

use crate::mesh::{CONE_EPS, Mesh};
use crate::vertex::VertexPool;

/// Leaf size below which nodes are not split further.
const LEAF_TRIS: usize = 4;
/// Maximum tree depth.
const MAX_DEPTH: usize = 100;
/// Candidate split planes evaluated per node.
const CANDIDATES: usize = 16;
/// Plane classification tolerance on the unit sphere.
const SIDE_EPS: f64 = 1e-12;

#[derive(Debug, Clone)]
enum BspNode {
    Split {
        plane: Plane,
        pos: usize,
        neg: usize,
    },
    Leaf(Vec<usize>),
}

/// Binary space partition of the triangle cones about the gamut center.
#[derive(Debug, Clone)]
pub struct BspTree {
    nodes: Vec<BspNode>,
    depth: usize,
}

/// Which side(s) of a plane a triangle cone lies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Pos,
    Neg,
    Both,
}

impl BspTree {
    /// Builds the tree for a mesh.
    pub fn build(mesh: &Mesh, pool: &VertexPool) -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            depth: 0,
        };
        let all: Vec<usize> = (0..mesh.triangles().len()).collect();
        tree.build_node(mesh, pool, all, 0);
        debug!(nodes = tree.nodes.len(), depth = tree.depth, "BSP tree built");
        tree
    }

    fn build_node(
        &mut self,
        mesh: &Mesh,
        pool: &VertexPool,
        tris: Vec<usize>,
        depth: usize,
    ) -> usize {
        self.depth = self.depth.max(depth);
        let ix = self.nodes.len();
        self.nodes.push(BspNode::Leaf(Vec::new()));

        let split = if tris.len() <= LEAF_TRIS || depth >= MAX_DEPTH {
            None
        } else {
            choose_split(mesh, pool, &tris)
        };

        match split {
            None => self.nodes[ix] = BspNode::Leaf(tris),
            Some(plane) => {
                let mut pos = Vec::new();
                let mut neg = Vec::new();
                for &t in &tris {
                    match classify(mesh, pool, t, plane) {
                        Side::Pos => pos.push(t),
                        Side::Neg => neg.push(t),
                        Side::Both => {
                            pos.push(t);
                            neg.push(t);
                        }
                    }
                }
                let p = self.build_node(mesh, pool, pos, depth + 1);
                let n = self.build_node(mesh, pool, neg, depth + 1);
                self.nodes[ix] = BspNode::Split { plane, pos: p, neg: n };
            }
        }
        ix
    }

    /// Triangle crossed by the ray from the center along `dir` (relative).
    ///
    /// Falls back to a scan of all triangles when round-off leaves the
    /// landed leaf without a containing triangle.
    pub fn locate(&self, mesh: &Mesh, dir: Vec3) -> Option<usize> {
        let tris = mesh.triangles();
        if tris.is_empty() {
            return None;
        }
        let mut node = 0;
        loop {
            match &self.nodes[node] {
                BspNode::Split { plane, pos, neg } => {
                    node = if plane.signed_distance(dir) >= 0.0 { *pos } else { *neg };
                }
                BspNode::Leaf(list) => {
                    let best = best_cone(list.iter().copied(), mesh, dir);
                    if let Some((t, margin)) = best {
                        if margin >= -CONE_EPS {
                            return Some(t);
                        }
                    }
                    return best_cone(0..tris.len(), mesh, dir).map(|(t, _)| t);
                }
            }
        }
    }

    /// Parameters `t` where `origin + t * dir` (absolute) crosses the
    /// surface, in ascending order with duplicates from shared edges kept.
    pub fn line_hits(&self, mesh: &Mesh, origin: Vec3, dir: Vec3) -> Vec<f64> {
        let tris = mesh.triangles();
        let mut visited = vec![false; tris.len()];
        let mut hits = Vec::new();
        if tris.is_empty() {
            return hits;
        }

        let rel = origin - mesh.center();
        let tiny = 1e-12 * dir.length();
        let mut stack = vec![0usize];
        while let Some(node) = stack.pop() {
            match &self.nodes[node] {
                BspNode::Split { plane, pos, neg } => {
                    let nd = plane.normal.dot(dir);
                    if nd.abs() > tiny {
                        stack.push(*neg);
                        stack.push(*pos);
                    } else {
                        let side = plane.signed_distance(rel);
                        let slack = 1e-12 * (1.0 + rel.length());
                        if side >= -slack {
                            stack.push(*pos);
                        }
                        if side <= slack {
                            stack.push(*neg);
                        }
                    }
                }
                BspNode::Leaf(list) => {
                    for &t in list {
                        if std::mem::replace(&mut visited[t], true) {
                            continue;
                        }
                        if let Some(h) = tris[t].line_param(mesh.center(), origin, dir) {
                            hits.push(h);
                        }
                    }
                }
            }
        }
        hits.sort_by(f64::total_cmp);
        hits
    }
}

fn best_cone<I: Iterator<Item = usize>>(tris: I, mesh: &Mesh, dir: Vec3) -> Option<(usize, f64)> {
    let all = mesh.triangles();
    let mut best: Option<(usize, f64)> = None;
    for t in tris {
        let m = all[t].cone_margin(dir);
        if best.is_none_or(|(_, bm)| m > bm) {
            best = Some((t, m));
        }
    }
    best
}

fn classify(mesh: &Mesh, pool: &VertexPool, t: usize, plane: Plane) -> Side {
    let mut pos = false;
    let mut neg = false;
    for v in mesh.triangles()[t].v {
        let s = plane.signed_distance(pool.get(v).sp);
        if s > SIDE_EPS {
            pos = true;
        } else if s < -SIDE_EPS {
            neg = true;
        }
    }
    match (pos, neg) {
        (true, false) => Side::Pos,
        (false, true) => Side::Neg,
        _ => Side::Both,
    }
}

/// Picks the sampled edge plane minimizing `max(pos, neg) + straddle`
/// among those that separate something.
fn choose_split(mesh: &Mesh, pool: &VertexPool, tris: &[usize]) -> Option<Plane> {
    let n = tris.len();
    let step = (n / CANDIDATES).max(1);
    let mut best: Option<(usize, Plane)> = None;

    for (j, &t) in tris.iter().enumerate().step_by(step).take(CANDIDATES) {
        let edge = mesh.triangles()[t].e[j % 3];
        let plane = mesh.edges()[edge].re;
        if !plane.is_valid() {
            continue;
        }
        let (mut pos, mut neg, mut both) = (0usize, 0usize, 0usize);
        for &u in tris {
            match classify(mesh, pool, u, plane) {
                Side::Pos => pos += 1,
                Side::Neg => neg += 1,
                Side::Both => both += 1,
            }
        }
        if pos + both >= n || neg + both >= n {
            continue;
        }
        let score = (pos + both).max(neg + both) + both;
        if best.is_none_or(|(s, _)| score < s) {
            best = Some((score, plane));
        }
    }
    best.map(|(_, plane)| plane)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords;
    use crate::mesh::tests::octahedron;
    use approx::assert_relative_eq;

    #[test]
    fn test_locate_matches_brute_force() {
        let mut pool = VertexPool::new();
        let mesh = octahedron(&mut pool);
        let bsp = BspTree::build(&mesh, &pool);
        assert!(bsp.nodes.len() > 1, "octahedron should split");

        for i in 0..40 {
            for j in 0..20 {
                let lon = -3.1 + i as f64 * 0.155;
                let lat = -1.5 + j as f64 * 0.155;
                let d = coords::direction(lon, lat);
                let t = bsp.locate(&mesh, d).unwrap();
                assert!(mesh.triangles()[t].contains_direction(d), "lon {lon} lat {lat}");
            }
        }
    }

    #[test]
    fn test_line_hits_through_center() {
        let mut pool = VertexPool::new();
        let mesh = octahedron(&mut pool);
        let bsp = BspTree::build(&mesh, &pool);

        let origin = Vec3::new(-2.0, 0.1, 0.1);
        let hits = bsp.line_hits(&mesh, origin, Vec3::new(4.0, 0.0, 0.0));
        assert!(hits.len() >= 2);
        let (lo, hi) = (hits[0], hits[hits.len() - 1]);
        // Surface at |x| + 0.2 = 1
        assert_relative_eq!(lo, (2.0 - 0.8) / 4.0, epsilon = 1e-12);
        assert_relative_eq!(hi, (2.0 + 0.8) / 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_line_misses() {
        let mut pool = VertexPool::new();
        let mesh = octahedron(&mut pool);
        let bsp = BspTree::build(&mesh, &pool);
        let hits = bsp.line_hits(&mesh, Vec3::new(5.0, 5.0, 0.0), Vec3::Z);
        assert!(hits.is_empty());
    }
}
