//! Directional quadtree index.
//!
//! Partitions surface directions by (longitude, latitude) and keeps, per
//! leaf, a handful of candidate boundary vertices. Two roots cover the
//! western `[-PI, 0)` and eastern `[0, PI]` hemispheres.
//!
//! # Insertion
//!
//! ```text
//! candidate ──► leaf ── coincident? ──► discard
//!                 │
//!                 ├── free slot ──────► keep
//!                 ├── coarse, full ───► split 4 ways, retry
//!                 └── fine, full ─────► segmented maxima filter
//! ```
//!
//! A leaf is *fine* once its angular extent times the largest radius it
//! holds is within the surface resolution. Filtering then keeps, for each
//! of [`NSLOTS`] slots, the most extreme vertex: slot 0 by log radius,
//! slots 1-5 along directions tilted 45 degrees about the leaf center.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::f64::consts::{FRAC_PI_2, PI};

use gbd_math::Vec3;
use tracing::trace;

use crate::coords;
use crate::vertex::{Vertex, VertexId, VertexPool};

/// Candidate vertices per leaf.
pub const NSLOTS: usize = 6;

/// Deepest subdivision level.
pub const MAX_DEPTH: u32 = 16;

/// Where an offered vertex ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Stored as a boundary candidate.
    Kept,
    /// Lost every slot to more extreme vertices.
    Interior,
    /// Coincides with a stored vertex.
    Duplicate,
}

/// Outcome of [`QuadTree::offer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertReport {
    /// Fate of the offered vertex
    pub placement: Placement,
    /// Pool handle, when kept
    pub id: Option<VertexId>,
    /// Previously stored vertices superseded by this insertion
    pub dropped: usize,
}

impl InsertReport {
    /// Returns true if the stored vertex set changed.
    #[inline]
    pub fn changed(&self) -> bool {
        self.placement == Placement::Kept || self.dropped > 0
    }
}

#[derive(Debug, Clone)]
enum Kind {
    Leaf(Vec<VertexId>),
    /// Index of the first of four consecutive children
    Split(usize),
}

#[derive(Debug, Clone)]
struct Node {
    lon: f64,
    lat: f64,
    w: f64,
    h: f64,
    depth: u32,
    kind: Kind,
}

impl Node {
    fn leaf(lon: f64, lat: f64, w: f64, h: f64, depth: u32) -> Self {
        Self {
            lon,
            lat,
            w,
            h,
            depth,
            kind: Kind::Leaf(Vec::new()),
        }
    }

    /// Child quadrant: 0 lower-left, 1 lower-right, 2 upper-left, 3 upper-right.
    /// Points on a midline go up / right.
    #[inline]
    fn quadrant(&self, lon: f64, lat: f64) -> usize {
        let right = lon >= self.lon + self.w * 0.5;
        let upper = lat >= self.lat + self.h * 0.5;
        (right as usize) | ((upper as usize) << 1)
    }

    /// Angular extent, measuring longitude at the latitude nearest the equator.
    fn extent(&self) -> f64 {
        let top = self.lat + self.h;
        let nearest = if self.lat <= 0.0 && top >= 0.0 {
            0.0
        } else {
            self.lat.abs().min(top.abs())
        };
        (self.w * nearest.cos()).max(self.h)
    }

    /// Lower bound on the angular distance from a direction at latitude `lat`.
    #[inline]
    fn lat_bound(&self, lat: f64) -> f64 {
        if lat < self.lat {
            self.lat - lat
        } else if lat > self.lat + self.h {
            lat - (self.lat + self.h)
        } else {
            0.0
        }
    }

    fn center_direction(&self) -> (f64, f64) {
        (self.lon + self.w * 0.5, self.lat + self.h * 0.5)
    }
}

/// Quadtree over surface directions holding candidate boundary vertices.
///
/// The tree owns one pool reference to every vertex it stores.
#[derive(Debug, Clone)]
pub struct QuadTree {
    nodes: Vec<Node>,
    center: Vec3,
    sres: f64,
    filter: bool,
    count: usize,
}

impl QuadTree {
    /// Creates an empty tree for a gamut center and surface resolution.
    ///
    /// With `filter` off every distinct point is stored.
    pub fn new(center: Vec3, sres: f64, filter: bool) -> Self {
        Self {
            nodes: vec![
                Node::leaf(-PI, -FRAC_PI_2, PI, PI, 0),
                Node::leaf(0.0, -FRAC_PI_2, PI, PI, 0),
            ],
            center,
            sres,
            filter,
            count: 0,
        }
    }

    /// Number of stored vertices.
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    /// Returns true if nothing is stored.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Stores `vertex` in the pool and offers it to the tree.
    ///
    /// If the tree does not keep it, the pool slot is freed again.
    pub fn offer(&mut self, pool: &mut VertexPool, vertex: Vertex) -> InsertReport {
        let id = pool.alloc(vertex);
        // Transfer reference held across the insertion
        pool.retain(id);
        let report = self.adopt(pool, id);
        pool.release(id);
        report
    }

    /// Offers a vertex that is already in the pool.
    ///
    /// The caller must hold a reference to `id` for the duration of the call.
    pub fn adopt(&mut self, pool: &mut VertexPool, id: VertexId) -> InsertReport {
        let (placement, dropped) = self.insert(pool, id);
        trace!(?placement, dropped, "quadtree insert");
        InsertReport {
            placement,
            id: (placement == Placement::Kept).then_some(id),
            dropped,
        }
    }

    fn insert(&mut self, pool: &mut VertexPool, id: VertexId) -> (Placement, usize) {
        let cand = *pool.get(id);
        let (lon, lat) = (cand.r.longitude, cand.r.latitude);
        let mut node = self.leaf_for(0, lon, lat);

        loop {
            let slots = match &self.nodes[node].kind {
                Kind::Leaf(slots) => slots,
                Kind::Split(_) => {
                    node = self.leaf_for(node, lon, lat);
                    continue;
                }
            };

            if slots.iter().any(|&s| coincident(pool.get(s), &cand)) {
                return (Placement::Duplicate, 0);
            }

            if slots.len() < NSLOTS {
                self.push(node, pool, id);
                return (Placement::Kept, 0);
            }

            let r_max = slots
                .iter()
                .map(|&s| pool.get(s).r.radius)
                .fold(cand.r.radius, f64::max);
            let n = &self.nodes[node];
            if n.depth < MAX_DEPTH && n.extent() * r_max > self.sres {
                self.split(node, pool);
                continue;
            }

            if !self.filter {
                self.push(node, pool, id);
                return (Placement::Kept, 0);
            }

            return self.filter_leaf(node, pool, id);
        }
    }

    fn push(&mut self, node: usize, pool: &mut VertexPool, id: VertexId) {
        if let Kind::Leaf(slots) = &mut self.nodes[node].kind {
            pool.retain(id);
            slots.push(id);
            self.count += 1;
        }
    }

    /// Descends from `from` (a root index or any node) to the leaf for a direction.
    fn leaf_for(&self, from: usize, lon: f64, lat: f64) -> usize {
        let mut node = if from < 2 {
            if lon < 0.0 { 0 } else { 1 }
        } else {
            from
        };
        while let Kind::Split(first) = self.nodes[node].kind {
            node = first + self.nodes[node].quadrant(lon, lat);
        }
        node
    }

    fn split(&mut self, node: usize, pool: &VertexPool) {
        let parent = &self.nodes[node];
        let (hw, hh) = (parent.w * 0.5, parent.h * 0.5);
        let (lon, lat, depth) = (parent.lon, parent.lat, parent.depth + 1);
        let first = self.nodes.len();
        for q in 0..4 {
            self.nodes.push(Node::leaf(
                lon + (q & 1) as f64 * hw,
                lat + (q >> 1) as f64 * hh,
                hw,
                hh,
                depth,
            ));
        }

        let slots = match std::mem::replace(&mut self.nodes[node].kind, Kind::Split(first)) {
            Kind::Leaf(slots) => slots,
            Kind::Split(_) => Vec::new(),
        };
        for id in slots {
            let r = pool.get(id).r;
            let q = self.nodes[node].quadrant(r.longitude, r.latitude);
            if let Kind::Leaf(child) = &mut self.nodes[first + q].kind {
                child.push(id);
            }
        }
        trace!(node, depth, "quadtree split");
    }

    /// Segmented maxima filtering of a full leaf plus one candidate.
    fn filter_leaf(
        &mut self,
        node: usize,
        pool: &mut VertexPool,
        cand: VertexId,
    ) -> (Placement, usize) {
        let (clon, clat) = self.nodes[node].center_direction();
        let dirs = slot_directions(clon, clat);

        let old = match &self.nodes[node].kind {
            Kind::Leaf(slots) => slots.clone(),
            Kind::Split(_) => return (Placement::Interior, 0),
        };
        // Age order: stored vertices oldest first, candidate last
        let mut all = old.clone();
        all.push(cand);

        let mut winners: Vec<VertexId> = Vec::with_capacity(NSLOTS);
        for slot in 0..NSLOTS {
            let score = |v: &Vertex| -> f64 {
                if slot == 0 {
                    v.lr0
                } else {
                    (v.p - self.center).dot(dirs[slot - 1])
                }
            };
            let mut best = all[0];
            for &id in &all[1..] {
                let (b, c) = (pool.get(best), pool.get(id));
                let (sb, sc) = (score(b), score(c));
                let tol = 1e-9 * (1.0 + sb.abs().max(sc.abs()));
                let better = if (sc - sb).abs() <= tol {
                    c.lr0 > b.lr0 + 1e-12
                } else {
                    sc > sb
                };
                if better {
                    best = id;
                }
            }
            if !winners.contains(&best) {
                winners.push(best);
            }
        }

        // Keep age order among the survivors
        let kept: Vec<VertexId> = all.iter().copied().filter(|id| winners.contains(id)).collect();
        let mut dropped = 0;
        for &id in &old {
            if !kept.contains(&id) {
                pool.release(id);
                self.count -= 1;
                dropped += 1;
            }
        }
        let placement = if kept.contains(&cand) {
            pool.retain(cand);
            self.count += 1;
            Placement::Kept
        } else {
            Placement::Interior
        };
        self.nodes[node].kind = Kind::Leaf(kept);
        (placement, dropped)
    }

    /// All stored vertices in direction (tree traversal) order.
    pub fn vertices(&self) -> Vec<VertexId> {
        let mut out = Vec::with_capacity(self.count);
        self.visit_leaves(|slots| out.extend_from_slice(slots));
        out
    }

    /// Per leaf, the stored vertex of largest log radius, in direction order.
    pub fn maxima(&self, pool: &VertexPool) -> Vec<VertexId> {
        let mut out = Vec::new();
        self.visit_leaves(|slots| {
            let best = slots.iter().copied().reduce(|a, b| {
                if pool.get(b).lr0 > pool.get(a).lr0 { b } else { a }
            });
            out.extend(best);
        });
        out
    }

    fn visit_leaves<F: FnMut(&[VertexId])>(&self, mut f: F) {
        let mut stack = vec![1usize, 0];
        while let Some(node) = stack.pop() {
            match &self.nodes[node].kind {
                Kind::Leaf(slots) => f(slots),
                Kind::Split(first) => stack.extend((0..4).rev().map(|q| first + q)),
            }
        }
    }

    /// Up to `k` stored vertices closest in angle to `dir`, nearest first.
    pub fn query(&self, pool: &VertexPool, dir: Vec3, k: usize) -> Vec<VertexId> {
        let Some(dir) = dir.try_normalize() else {
            return Vec::new();
        };
        if k == 0 {
            return Vec::new();
        }
        let qlat = dir.z.clamp(-1.0, 1.0).asin();

        let mut frontier = BinaryHeap::new();
        for root in 0..2 {
            frontier.push(Scored::new(self.nodes[root].lat_bound(qlat), root));
        }
        // Max-heap of the best k so far
        let mut best: BinaryHeap<std::cmp::Reverse<Scored>> = BinaryHeap::new();

        while let Some(Scored { d, ix }) = frontier.pop() {
            if best.len() == k {
                if let Some(worst) = best.peek() {
                    if d > worst.0.d {
                        break;
                    }
                }
            }
            match &self.nodes[ix].kind {
                Kind::Leaf(slots) => {
                    for &id in slots {
                        let angle = pool.get(id).sp.dot(dir).clamp(-1.0, 1.0).acos();
                        best.push(std::cmp::Reverse(Scored::new(angle, id.index())));
                        if best.len() > k {
                            best.pop();
                        }
                    }
                }
                Kind::Split(first) => {
                    for q in 0..4 {
                        let c = first + q;
                        frontier.push(Scored::new(self.nodes[c].lat_bound(qlat), c));
                    }
                }
            }
        }

        let mut out: Vec<Scored> = best.into_iter().map(|r| r.0).collect();
        out.sort_by(|a, b| a.d.total_cmp(&b.d).then(a.ix.cmp(&b.ix)));
        out.into_iter().map(|s| VertexId(s.ix as u32)).collect()
    }
}

/// Heap entry ordered so the smallest distance pops first.
#[derive(Debug, Clone, Copy)]
struct Scored {
    d: f64,
    ix: usize,
}

impl Scored {
    fn new(d: f64, ix: usize) -> Self {
        Self { d, ix }
    }
}

impl PartialEq for Scored {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Scored {}

impl PartialOrd for Scored {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scored {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .d
            .total_cmp(&self.d)
            .then_with(|| other.ix.cmp(&self.ix))
    }
}

/// The five tilted filtering directions about a leaf center.
fn slot_directions(lon: f64, lat: f64) -> [Vec3; NSLOTS - 1] {
    let u0 = coords::direction(lon, lat);
    let e_lon = Vec3::new(-lon.sin(), lon.cos(), 0.0);
    let e_lat = Vec3::new(-lat.sin() * lon.cos(), -lat.sin() * lon.sin(), lat.cos());
    std::array::from_fn(|k| {
        let phi = 2.0 * PI * k as f64 / (NSLOTS - 1) as f64;
        (u0 + e_lon * phi.cos() + e_lat * phi.sin()).normalize()
    })
}

fn coincident(a: &Vertex, b: &Vertex) -> bool {
    a.p.distance(b.p) <= 1e-9 * (1.0 + a.r.radius.max(b.r.radius))
}
