//! Nearest surface point index.
//!
//! Triangles are kept in six sorted orders, per axis ascending by bounding
//! box minimum and descending by bounding box maximum. A query grows a cube
//! window around the point; in each order a cursor advances over the
//! triangles whose box reaches into the window. A triangle seen by all six
//! cursors overlaps the window and is measured exactly.
//!
//! Touch counts live in an [`NnScratch`] owned by the caller, so the index
//! itself is never written during a query.

use gbd_math::Vec3;
use tracing::{debug, trace};

use crate::mesh::Mesh;
use crate::vertex::VertexPool;

/// Per-query touch counters.
///
/// Counters of one query occupy `base..base + 6`; the base moves on by 7
/// each query, so stale counts never need clearing until the base wraps.
#[derive(Debug, Clone, Default)]
pub struct NnScratch {
    touch: Vec<u32>,
    base: u32,
}

impl NnScratch {
    /// Starts a query over `n` triangles and returns its base.
    fn begin(&mut self, n: usize) -> u32 {
        if self.touch.len() != n || self.base > u32::MAX - 8 {
            self.touch.clear();
            self.touch.resize(n, 0);
            self.base = 0;
        }
        self.base += 7;
        self.base
    }

    /// Counts one sighting of triangle `t`; true on the sixth.
    #[inline]
    fn touch(&mut self, t: usize, base: u32) -> bool {
        let c = &mut self.touch[t];
        if *c < base {
            *c = base;
        }
        *c += 1;
        *c == base + 6
    }
}

/// Six-order triangle index for nearest point queries.
#[derive(Debug, Clone)]
pub struct NnIndex {
    lo: Vec<Vec3>,
    hi: Vec<Vec3>,
    /// `orders[2k]` ascending by `lo[k]`, `orders[2k + 1]` descending by `hi[k]`
    orders: [Vec<usize>; 6],
    start: f64,
}

impl NnIndex {
    /// Indexes the triangles of `mesh`. `start` is the initial window half-size.
    pub fn build(mesh: &Mesh, pool: &VertexPool, start: f64) -> Self {
        let n = mesh.triangles().len();
        let mut lo = Vec::with_capacity(n);
        let mut hi = Vec::with_capacity(n);
        for t in 0..n {
            let [a, b, c] = mesh.corners(pool, t);
            lo.push(a.min(b).min(c));
            hi.push(a.max(b).max(c));
        }

        let orders = std::array::from_fn(|list| {
            let axis = list / 2;
            let mut order: Vec<usize> = (0..n).collect();
            if list % 2 == 0 {
                order.sort_by(|&i, &j| lo[i][axis].total_cmp(&lo[j][axis]));
            } else {
                order.sort_by(|&i, &j| hi[j][axis].total_cmp(&hi[i][axis]));
            }
            order
        });

        debug!(triangles = n, "nearest-neighbor index built");
        Self {
            lo,
            hi,
            orders,
            start: if start > 0.0 { start } else { 1.0 },
        }
    }

    /// Closest point of the surface to `p`.
    pub fn nearest(
        &self,
        mesh: &Mesh,
        pool: &VertexPool,
        scratch: &mut NnScratch,
        p: Vec3,
    ) -> Option<Vec3> {
        let n = self.lo.len();
        if n == 0 || !p.is_finite() {
            return None;
        }
        let base = scratch.begin(n);
        let mut cursors = [0usize; 6];
        let mut best: Option<(f64, Vec3)> = None;
        let mut w = self.start;
        let mut passes = 0;

        loop {
            passes += 1;
            for (list, cursor) in cursors.iter_mut().enumerate() {
                let axis = list / 2;
                let order = &self.orders[list];
                while *cursor < n {
                    let t = order[*cursor];
                    let inside = if list % 2 == 0 {
                        self.lo[t][axis] <= p[axis] + w
                    } else {
                        self.hi[t][axis] >= p[axis] - w
                    };
                    if !inside {
                        break;
                    }
                    *cursor += 1;
                    if scratch.touch(t, base) {
                        let q = mesh.closest_point(pool, t, p);
                        let d = q.distance_squared(p);
                        if best.is_none_or(|(bd, _)| d < bd) {
                            best = Some((d, q));
                        }
                    }
                }
            }

            let exhausted = cursors.iter().all(|&c| c == n);
            let done = best.is_some_and(|(bd, _)| bd.sqrt() <= w);
            if done || exhausted {
                break;
            }
            w *= 2.0;
        }

        trace!(passes, window = w, "nearest query");
        best.map(|(_, q)| q)
    }
}
