//! The gamut boundary facade.
//!
//! A [`Gamut`] owns the vertex pool, the directional quadtree and the lazily
//! built surface (mesh, BSP tree, nearest-neighbor index). Samples are added
//! with [`Gamut::expand`]; the surface is triangulated on the first query
//! after a change and reused until the next one.
//!
//! All public coordinates are `[L, a, b]` (or `[J, a, b]`).

use std::cell::{Cell, RefCell};
use std::collections::HashSet;

use gbd_math::Vec3;
use tracing::{debug, trace, warn};

use crate::bsp::BspTree;
use crate::coords::{self, ColorRep};
use crate::cusp::{CuspPoint, CuspTracker};
use crate::error::{GamutError, GamutResult};
use crate::hull;
use crate::lazy::{IndexState, LazyIndex};
use crate::mesh::Mesh;
use crate::nn::{NnIndex, NnScratch};
use crate::quadtree::{Placement, QuadTree};
use crate::vertex::{Vertex, VertexFlags, VertexId, VertexPool};

/// Surface resolution used when none (or a non-positive one) is given.
pub const DEFAULT_RESOLUTION: f64 = 10.0;

/// Gamut center used when none is given.
pub const DEFAULT_CENTER: [f64; 3] = [50.0, 0.0, 0.0];

/// Most neighbors [`Gamut::raw_neighbors`] returns.
pub const MAX_NEIGHBORS: usize = 10;

/// Distance of the establishment points from the center, relative to the resolution.
pub(crate) const SYNTHETIC_SCALE: f64 = 1e-4;

/// What [`Gamut::expand`] did with a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expansion {
    /// Kept as a boundary candidate.
    Retained,
    /// Discarded as lying inside the boundary.
    Interior,
    /// Discarded as unusable: non-finite, at the center, or a duplicate.
    Rejected,
}

/// Where a line crosses the surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intersection {
    /// Extreme crossing toward the first point
    pub min: [f64; 3],
    /// Extreme crossing toward the second point
    pub max: [f64; 3],
    /// Line parameter of `min` (0 at the first point, 1 at the second)
    pub mint: f64,
    /// Line parameter of `max`
    pub maxt: f64,
}

/// Colorspace and gamut white and black points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WhiteBlack {
    /// Colorspace white
    pub cs_white: [f64; 3],
    /// Colorspace black
    pub cs_black: [f64; 3],
    /// Whitest point of the gamut
    pub gamut_white: [f64; 3],
    /// Blackest point of the gamut
    pub gamut_black: [f64; 3],
}

/// Build state of the derived structures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexStates {
    /// Triangulated surface
    pub surface: IndexState,
    /// BSP lookup tree
    pub bsp: IndexState,
    /// Nearest-neighbor index
    pub nn: IndexState,
}

/// Triangulated surface with its query indices.
#[derive(Debug)]
pub(crate) struct Surface {
    pub(crate) mesh: Mesh,
    bsp: LazyIndex<BspTree>,
    nn: LazyIndex<NnIndex>,
    scratch: RefCell<NnScratch>,
}

impl Surface {
    pub(crate) fn new(mesh: Mesh) -> Self {
        Self {
            mesh,
            bsp: LazyIndex::new(),
            nn: LazyIndex::new(),
            scratch: RefCell::new(NnScratch::default()),
        }
    }

    fn bsp(&self, pool: &VertexPool) -> &BspTree {
        self.bsp.get_or_build(|| BspTree::build(&self.mesh, pool))
    }

    fn nn(&self, pool: &VertexPool, start: f64) -> &NnIndex {
        self.nn.get_or_build(|| NnIndex::build(&self.mesh, pool, start))
    }
}

/// Builder for [`Gamut`].
///
/// ```rust
/// use gbd::GamutBuilder;
///
/// let gamut = GamutBuilder::new()
///     .resolution(5.0)
///     .center([50.0, 0.0, 0.0])
///     .build();
/// assert_eq!(gamut.resolution(), 5.0);
/// ```
#[derive(Debug, Clone)]
pub struct GamutBuilder {
    resolution: f64,
    rep: ColorRep,
    center: [f64; 3],
    filter: bool,
}

impl Default for GamutBuilder {
    fn default() -> Self {
        Self {
            resolution: DEFAULT_RESOLUTION,
            rep: ColorRep::Lab,
            center: DEFAULT_CENTER,
            filter: true,
        }
    }
}

impl GamutBuilder {
    /// Starts from the defaults: Lab, resolution 10, center `[50, 0, 0]`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Surface resolution; non-positive values select the default.
    pub fn resolution(mut self, resolution: f64) -> Self {
        self.resolution = resolution;
        self
    }

    /// Interprets coordinates as CIECAM Jab instead of Lab.
    pub fn jab(mut self, is_jab: bool) -> Self {
        self.rep = if is_jab { ColorRep::Jab } else { ColorRep::Lab };
        self
    }

    /// Color representation.
    pub fn color_rep(mut self, rep: ColorRep) -> Self {
        self.rep = rep;
        self
    }

    /// Center for radial coordinates.
    pub fn center(mut self, center: [f64; 3]) -> Self {
        self.center = center;
        self
    }

    /// Disables segmented maxima filtering so every distinct point is kept.
    pub fn no_filter(mut self, no_filter: bool) -> Self {
        self.filter = !no_filter;
        self
    }

    /// Creates the empty gamut.
    pub fn build(self) -> Gamut {
        let sres = if self.resolution > 0.0 && self.resolution.is_finite() {
            self.resolution
        } else {
            DEFAULT_RESOLUTION
        };
        let center = coords::to_internal(self.center);

        let mut pool = VertexPool::new();
        let offset = sres * SYNTHETIC_SCALE;
        let synthetic = [Vec3::X, -Vec3::X, Vec3::Y, -Vec3::Y, Vec3::Z, -Vec3::Z].map(|axis| {
            let mut v = Vertex::new(center, center + axis * offset).unwrap_or_default();
            v.flags.insert(VertexFlags::SYNTHETIC);
            let id = pool.alloc(v);
            pool.retain(id);
            id
        });

        debug!(resolution = sres, rep = self.rep.tag(), filter = self.filter, "new gamut");
        Gamut {
            rep: self.rep,
            sres,
            center,
            filter: self.filter,
            tree: QuadTree::new(center, sres, self.filter),
            pool,
            synthetic,
            pinned: Vec::new(),
            raw: LazyIndex::new(),
            raw0: LazyIndex::new(),
            surface: LazyIndex::new(),
            cursor: Cell::new(0),
            cs_white: None,
            cs_black: None,
            ga_white: None,
            ga_black: None,
            cusps: CuspTracker::default(),
        }
    }
}

/// A gamut boundary descriptor.
///
/// Queries take `&self` and build derived indices on demand through
/// interior mutability, so a `Gamut` can't be shared between threads.
///
/// ```rust
/// use gbd::{Expansion, GamutBuilder};
///
/// let mut gamut = GamutBuilder::new().center([0.0, 0.0, 0.0]).build();
/// for p in [[1.0, 0.0, 0.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0],
///           [0.0, -1.0, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0, -1.0]] {
///     assert_eq!(gamut.expand(p), Expansion::Retained);
/// }
/// let volume = gamut.volume().unwrap();
/// assert!((volume - 4.0 / 3.0).abs() < 1e-9);
/// ```
#[derive(Debug)]
pub struct Gamut {
    rep: ColorRep,
    sres: f64,
    center: Vec3,
    filter: bool,
    pub(crate) pool: VertexPool,
    pub(crate) tree: QuadTree,
    synthetic: [VertexId; 6],
    /// Vertices of a surface read from a file, held until the next expand
    pub(crate) pinned: Vec<VertexId>,
    raw: LazyIndex<Vec<VertexId>>,
    raw0: LazyIndex<Vec<VertexId>>,
    pub(crate) surface: LazyIndex<Surface>,
    cursor: Cell<usize>,
    cs_white: Option<Vec3>,
    cs_black: Option<Vec3>,
    ga_white: Option<Vec3>,
    ga_black: Option<Vec3>,
    pub(crate) cusps: CuspTracker,
}

impl Gamut {
    /// Creates an empty gamut. `resolution <= 0` selects the default.
    pub fn new(resolution: f64, is_jab: bool) -> Self {
        GamutBuilder::new().resolution(resolution).jab(is_jab).build()
    }

    /// Surface resolution.
    #[inline]
    pub fn resolution(&self) -> f64 {
        self.sres
    }

    /// Center for radial coordinates.
    #[inline]
    pub fn center(&self) -> [f64; 3] {
        coords::to_external(self.center)
    }

    /// Color representation.
    #[inline]
    pub fn color_rep(&self) -> ColorRep {
        self.rep
    }

    /// Returns true for a CIECAM Jab gamut.
    #[inline]
    pub fn is_jab(&self) -> bool {
        self.rep == ColorRep::Jab
    }

    /// Returns true if segmented maxima filtering is enabled.
    #[inline]
    pub fn is_filtered(&self) -> bool {
        self.filter
    }

    // ------------------------------------------------------------------
    // Building
    // ------------------------------------------------------------------

    /// Adds a sample point.
    pub fn expand(&mut self, lab: [f64; 3]) -> Expansion {
        if !lab.iter().all(|c| c.is_finite()) {
            warn!(?lab, "non-finite point rejected");
            return Expansion::Rejected;
        }
        let Some(v) = Vertex::new(self.center, coords::to_internal(lab)) else {
            trace!(?lab, "point at the center rejected");
            return Expansion::Rejected;
        };

        self.unpin();
        let report = self.tree.offer(&mut self.pool, v);
        if report.changed() {
            self.invalidate();
        }
        match report.placement {
            Placement::Kept => Expansion::Retained,
            Placement::Interior => Expansion::Interior,
            Placement::Duplicate => Expansion::Rejected,
        }
    }

    /// Triangulates now instead of on the next query.
    pub fn triangulate(&self) -> GamutResult<()> {
        self.surface().map(|_| ())
    }

    fn invalidate(&mut self) {
        self.raw.invalidate();
        self.raw0.invalidate();
        self.surface.invalidate();
        self.cursor.set(0);
    }

    /// Releases a surface read from a file; its vertices rejoin the
    /// regular triangulation.
    fn unpin(&mut self) {
        if self.pinned.is_empty() {
            return;
        }
        debug!(vertices = self.pinned.len(), "releasing stored surface");
        for id in std::mem::take(&mut self.pinned) {
            self.pool.release(id);
        }
        self.invalidate();
    }

    pub(crate) fn surface(&self) -> GamutResult<&Surface> {
        self.surface.get_or_try_build(|| self.build_surface())
    }

    fn build_surface(&self) -> GamutResult<Surface> {
        if self.tree.is_empty() {
            return Err(GamutError::not_ready("no samples"));
        }
        let candidates = self.tree.vertices();
        let real = candidates.len();
        let mut ids = candidates;
        ids.extend_from_slice(&self.synthetic);
        debug!(candidates = real, "triangulating");

        let pts: Vec<Vec3> = ids.iter().map(|&id| self.pool.get(id).ch).collect();
        let faces = hull::convex_hull(&pts, real)?;

        let on_hull: HashSet<usize> = faces.iter().flatten().copied().collect();
        let inside: Vec<VertexId> = (0..real)
            .filter(|i| !on_hull.contains(i))
            .map(|i| ids[i])
            .collect();
        let faces: Vec<[VertexId; 3]> = faces.iter().map(|f| f.map(|i| ids[i])).collect();

        let mesh = Mesh::from_faces(&self.pool, self.center, &faces, inside)?;
        Ok(Surface::new(mesh))
    }

    /// Returns true if internal point `p` lies where the establishment
    /// points sit, within their distance of the center.
    pub(crate) fn is_establishment_point(&self, p: Vec3) -> bool {
        p.distance(self.center) <= self.sres * SYNTHETIC_SCALE * (1.0 + 1e-9)
    }

    /// State of the derived indices.
    pub fn index_state(&self) -> IndexStates {
        let surface = self.surface.state();
        let (bsp, nn) = match self.surface.get() {
            Some(s) => (s.bsp.state(), s.nn.state()),
            None => (IndexState::Dirty, IndexState::Dirty),
        };
        IndexStates { surface, bsp, nn }
    }

    /// Checks the closed 2-manifold invariants of the surface.
    pub fn validate_surface(&self) -> GamutResult<()> {
        self.surface()?.mesh.validate()
    }

    // ------------------------------------------------------------------
    // Raw samples
    // ------------------------------------------------------------------

    fn raw_order(&self) -> &[VertexId] {
        self.raw.get_or_build(|| self.tree.vertices())
    }

    fn raw0_order(&self) -> &[VertexId] {
        self.raw0.get_or_build(|| self.tree.maxima(&self.pool))
    }

    fn external(&self, id: VertexId) -> [f64; 3] {
        coords::to_external(self.pool.get(id).p)
    }

    /// Number of retained samples.
    pub fn raw_vertex_count(&self) -> usize {
        self.tree.len()
    }

    /// Retained sample `ix`, in direction order.
    pub fn raw_vertex(&self, ix: usize) -> Option<[f64; 3]> {
        self.raw_order().get(ix).map(|&id| self.external(id))
    }

    /// All retained samples, in direction order.
    pub fn raw_vertices(&self) -> Vec<[f64; 3]> {
        self.raw_order().iter().map(|&id| self.external(id)).collect()
    }

    /// Flags of retained sample `ix` including its surface role:
    /// `TRIANGULATED` when it is a surface vertex, `INSIDE` when it fell
    /// below the surface. Triangulates first if needed.
    pub fn raw_vertex_flags(&self, ix: usize) -> GamutResult<Option<VertexFlags>> {
        let Some(&id) = self.raw_order().get(ix) else {
            return Ok(None);
        };
        let s = self.surface()?;
        Ok(Some(s.mesh.vertex_flags(&self.pool, id)))
    }

    /// Number of radial maxima direction samples (one per quadtree leaf).
    pub fn raw0_vertex_count(&self) -> usize {
        self.raw0_order().len()
    }

    /// Radial maxima direction sample `ix`.
    pub fn raw0_vertex(&self, ix: usize) -> Option<[f64; 3]> {
        self.raw0_order().get(ix).map(|&id| self.external(id))
    }

    /// Up to `k` (at most [`MAX_NEIGHBORS`]) retained samples closest in
    /// direction to `lab`, nearest first.
    pub fn raw_neighbors(&self, lab: [f64; 3], k: usize) -> Vec<[f64; 3]> {
        let dir = coords::to_internal(lab) - self.center;
        self.tree
            .query(&self.pool, dir, k.min(MAX_NEIGHBORS))
            .into_iter()
            .map(|id| self.external(id))
            .collect()
    }

    // ------------------------------------------------------------------
    // Surface access
    // ------------------------------------------------------------------

    /// Number of surface vertices.
    pub fn vertex_count(&self) -> GamutResult<usize> {
        Ok(self.surface()?.mesh.vertices().len())
    }

    /// Surface vertex `ix`: its radius from the center and its position.
    pub fn vertex(&self, ix: usize) -> GamutResult<Option<(f64, [f64; 3])>> {
        let s = self.surface()?;
        Ok(s.mesh.vertices().get(ix).map(|&id| {
            let v = self.pool.get(id);
            (v.r.radius, coords::to_external(v.p))
        }))
    }

    /// Restarts [`Gamut::next_tri`] at the first triangle.
    pub fn start_next_tri(&self) {
        self.cursor.set(0);
    }

    /// Surface vertex numbers of the next triangle, or `None` at the end.
    ///
    /// There is a single cursor per gamut.
    pub fn next_tri(&self) -> GamutResult<Option<[usize; 3]>> {
        let s = self.surface()?;
        let ix = self.cursor.get();
        let Some(t) = s.mesh.triangles().get(ix) else {
            return Ok(None);
        };
        self.cursor.set(ix + 1);
        Ok(Some(self.tri_numbers(&s.mesh, t.v)))
    }

    /// All surface triangles as vertex numbers.
    pub fn triangles(&self) -> GamutResult<impl Iterator<Item = [usize; 3]> + '_> {
        let s = self.surface()?;
        Ok(s.mesh.triangles().iter().map(move |t| self.tri_numbers(&s.mesh, t.v)))
    }

    fn tri_numbers(&self, mesh: &Mesh, v: [VertexId; 3]) -> [usize; 3] {
        v.map(|id| mesh.vertex_number(id).unwrap_or(usize::MAX))
    }

    // ------------------------------------------------------------------
    // Geometric queries
    // ------------------------------------------------------------------

    /// Enclosed volume.
    pub fn volume(&self) -> GamutResult<f64> {
        Ok(self.surface()?.mesh.volume(&self.pool))
    }

    /// Surface crossing along `dir` (relative, any length).
    fn radial_internal(&self, dir: Vec3) -> GamutResult<Vec3> {
        let s = self.surface()?;
        let dir = dir.try_normalize().unwrap_or(Vec3::Z);
        let t = s
            .bsp(&self.pool)
            .locate(&s.mesh, dir)
            .ok_or_else(|| GamutError::not_ready("empty surface"))?;
        s.mesh
            .radial_point(&self.pool, t, dir)
            .ok_or_else(|| GamutError::not_ready("degenerate triangle on the ray"))
    }

    /// Where the ray from the center through `lab` crosses the surface,
    /// and that point's distance from the center.
    pub fn radial(&self, lab: [f64; 3]) -> GamutResult<(f64, [f64; 3])> {
        let x = self.radial_internal(coords::to_internal(lab) - self.center)?;
        Ok((x.distance(self.center), coords::to_external(x)))
    }

    /// Distance of `lab` from the center relative to the surface crossing
    /// on the same ray (at most 1 inside, above 1 outside), and the crossing.
    ///
    /// The center itself maps to 0, with the crossing taken along +L.
    pub fn nradial(&self, lab: [f64; 3]) -> GamutResult<(f64, [f64; 3])> {
        let rel = coords::to_internal(lab) - self.center;
        let x = self.radial_internal(rel)?;
        let r = x.distance(self.center);
        let ratio = if r > 0.0 { rel.length() / r } else { 0.0 };
        Ok((ratio, coords::to_external(x)))
    }

    /// Closest surface point to `lab`.
    pub fn nearest(&self, lab: [f64; 3]) -> GamutResult<[f64; 3]> {
        let s = self.surface()?;
        let nn = s.nn(&self.pool, self.sres);
        let mut scratch = s.scratch.borrow_mut();
        nn.nearest(&s.mesh, &self.pool, &mut scratch, coords::to_internal(lab))
            .map(coords::to_external)
            .ok_or_else(|| GamutError::not_ready("no nearest surface point"))
    }

    /// Crossings of the line through `p1` and `p2` with the surface.
    ///
    /// Returns the extreme crossings toward each end, with line parameters
    /// 0 at `p1` and 1 at `p2`; `None` if the line misses the surface.
    pub fn vector_isect(&self, p1: [f64; 3], p2: [f64; 3]) -> GamutResult<Option<Intersection>> {
        let s = self.surface()?;
        let origin = coords::to_internal(p1);
        let dir = coords::to_internal(p2) - origin;
        if dir.length_squared() == 0.0 {
            return Ok(None);
        }
        let hits = s.bsp(&self.pool).line_hits(&s.mesh, origin, dir);
        let (Some(&mint), Some(&maxt)) = (hits.first(), hits.last()) else {
            return Ok(None);
        };
        Ok(Some(Intersection {
            min: coords::to_external(origin + dir * mint),
            max: coords::to_external(origin + dir * maxt),
            mint,
            maxt,
        }))
    }

    // ------------------------------------------------------------------
    // White and black points
    // ------------------------------------------------------------------

    /// Sets (or with `None` forgets) the colorspace white and black points.
    pub fn set_colorspace_wb(&mut self, white: Option<[f64; 3]>, black: Option<[f64; 3]>) {
        self.cs_white = white.map(coords::to_internal);
        self.cs_black = black.map(coords::to_internal);
    }

    /// Sets (or with `None` forgets) the gamut white and black points.
    pub fn set_gamut_wb(&mut self, white: Option<[f64; 3]>, black: Option<[f64; 3]>) {
        self.ga_white = white.map(coords::to_internal);
        self.ga_black = black.map(coords::to_internal);
    }

    /// Returns true if the colorspace white was set.
    pub fn has_colorspace_white(&self) -> bool {
        self.cs_white.is_some()
    }

    /// Returns true if the colorspace black was set.
    pub fn has_colorspace_black(&self) -> bool {
        self.cs_black.is_some()
    }

    /// Returns true if the gamut white was set.
    pub fn has_gamut_white(&self) -> bool {
        self.ga_white.is_some()
    }

    /// Returns true if the gamut black was set.
    pub fn has_gamut_black(&self) -> bool {
        self.ga_black.is_some()
    }

    pub(crate) fn stored_wb(&self) -> [Option<[f64; 3]>; 4] {
        [self.cs_white, self.cs_black, self.ga_white, self.ga_black]
            .map(|p| p.map(coords::to_external))
    }

    /// White and black points.
    ///
    /// Colorspace points default to L = 100 and L = 0 on the neutral axis.
    /// Unset gamut points are found where the neutral axis (colorspace
    /// black to white when both are set, otherwise the L axis through the
    /// center) crosses the surface.
    pub fn white_black(&self) -> GamutResult<WhiteBlack> {
        let c = self.center;
        let cs_white = self.cs_white.unwrap_or(Vec3::new(0.0, 0.0, 100.0));
        let cs_black = self.cs_black.unwrap_or(Vec3::ZERO);

        let (ga_white, ga_black) = match (self.ga_white, self.ga_black) {
            (Some(w), Some(b)) => (w, b),
            (w, b) => {
                let (p1, p2) = match (self.cs_black, self.cs_white) {
                    (Some(b), Some(w)) => (b, w),
                    _ => (Vec3::new(c.x, c.y, 0.0), Vec3::new(c.x, c.y, 100.0)),
                };
                let hit = self
                    .vector_isect(coords::to_external(p1), coords::to_external(p2))?
                    .ok_or(GamutError::WhiteBlackUnknown)?;
                (
                    w.unwrap_or(coords::to_internal(hit.max)),
                    b.unwrap_or(coords::to_internal(hit.min)),
                )
            }
        };

        Ok(WhiteBlack {
            cs_white: coords::to_external(cs_white),
            cs_black: coords::to_external(cs_black),
            gamut_white: coords::to_external(ga_white),
            gamut_black: coords::to_external(ga_black),
        })
    }

    // ------------------------------------------------------------------
    // Cusps
    // ------------------------------------------------------------------

    /// Starts a new cusp search.
    pub fn reset_cusps(&mut self) {
        self.cusps.reset();
    }

    /// Adds a cusp candidate.
    pub fn add_cusp_point(&mut self, lab: [f64; 3], kind: CuspPoint) {
        self.cusps.add(self.rep, lab, kind);
    }

    /// Fixes the cusps from the candidates added since the last reset.
    pub fn finish_cusps(&mut self) -> GamutResult<()> {
        self.cusps.finish()
    }

    /// The six cusps, red, yellow, green, cyan, blue, magenta.
    pub fn cusps(&self) -> GamutResult<[[f64; 3]; 6]> {
        self.cusps
            .cusps()
            .ok_or_else(|| GamutError::NoCusps("cusps have not been set".into()))
    }

    /// Finds the cusps among the surface vertices.
    pub fn compute_cusps(&mut self) -> GamutResult<()> {
        let verts: Vec<[f64; 3]> = {
            let s = self.surface()?;
            s.mesh.vertices().iter().map(|&id| self.external(id)).collect()
        };
        self.cusps.reset();
        for lab in verts {
            self.cusps.add(self.rep, lab, CuspPoint::General);
        }
        self.cusps.finish()
    }

    // ------------------------------------------------------------------
    // Comparison
    // ------------------------------------------------------------------

    /// Returns true if both gamuts share center, color representation and
    /// resolution class, so their geometry can be combined.
    pub fn compatible(&self, other: &Gamut) -> bool {
        let same_center = (0..3).all(|i| (self.center[i] - other.center[i]).abs() <= 1e-9);
        same_center
            && self.rep == other.rep
            && resolution_class(self.sres) == resolution_class(other.sres)
    }
}

fn resolution_class(sres: f64) -> i64 {
    sres.log2().round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn octahedron() -> Gamut {
        let mut g = GamutBuilder::new().center([0.0, 0.0, 0.0]).build();
        for p in [
            [1.0, 0.0, 0.0],
            [-1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, -1.0, 0.0],
            [0.0, 0.0, 1.0],
            [0.0, 0.0, -1.0],
        ] {
            assert_eq!(g.expand(p), Expansion::Retained);
        }
        g
    }

    #[test]
    fn test_defaults() {
        let g = Gamut::new(0.0, false);
        assert_eq!(g.resolution(), DEFAULT_RESOLUTION);
        assert_eq!(g.center(), DEFAULT_CENTER);
        assert!(!g.is_jab());
        assert!(Gamut::new(-3.0, true).is_jab());
    }

    #[test]
    fn test_not_ready_until_four_points() {
        let mut g = Gamut::new(0.0, false);
        assert!(g.volume().unwrap_err().is_not_ready());
        g.expand([60.0, 10.0, 0.0]);
        g.expand([60.0, 0.0, 10.0]);
        g.expand([40.0, -10.0, 0.0]);
        assert!(g.nearest([50.0, 0.0, 0.0]).unwrap_err().is_not_ready());
        g.expand([70.0, 0.0, -10.0]);
        assert!(g.volume().unwrap() > 0.0);
    }

    #[test]
    fn test_rejections() {
        let mut g = Gamut::new(0.0, false);
        assert_eq!(g.expand([f64::NAN, 0.0, 0.0]), Expansion::Rejected);
        assert_eq!(g.expand(DEFAULT_CENTER), Expansion::Rejected);
        assert_eq!(g.expand([60.0, 5.0, 5.0]), Expansion::Retained);
        assert_eq!(g.expand([60.0, 5.0, 5.0]), Expansion::Rejected);
        assert_eq!(g.raw_vertex_count(), 1);
    }

    #[test]
    fn test_octahedron_queries() {
        let g = octahedron();
        assert_eq!(g.vertex_count().unwrap(), 6);
        assert_relative_eq!(g.volume().unwrap(), 4.0 / 3.0, epsilon = 1e-12);

        let (r, p) = g.radial([0.5, 0.0, 0.0]).unwrap();
        assert_eq!(p, [1.0, 0.0, 0.0]);
        assert_eq!(r, 1.0);

        let (ratio, _) = g.nradial([0.0, 2.0, 0.0]).unwrap();
        assert_relative_eq!(ratio, 2.0, epsilon = 1e-12);
        let (ratio, p) = g.nradial([0.0, 0.0, 0.0]).unwrap();
        assert_eq!(ratio, 0.0);
        assert_eq!(p, [1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_triangle_cursor() {
        let g = octahedron();
        g.start_next_tri();
        let mut n = 0;
        while let Some(t) = g.next_tri().unwrap() {
            assert!(t.iter().all(|&v| v < 6));
            n += 1;
        }
        assert_eq!(n, 8);
        assert!(g.next_tri().unwrap().is_none());
        g.start_next_tri();
        assert_eq!(g.next_tri().unwrap(), g.triangles().unwrap().next());
    }

    #[test]
    fn test_index_states() {
        let mut g = octahedron();
        let dirty = IndexStates {
            surface: IndexState::Dirty,
            bsp: IndexState::Dirty,
            nn: IndexState::Dirty,
        };
        assert_eq!(g.index_state(), dirty);
        g.volume().unwrap();
        assert_eq!(g.index_state().surface, IndexState::Ready);
        assert_eq!(g.index_state().bsp, IndexState::Dirty);
        g.radial([1.0, 1.0, 1.0]).unwrap();
        g.nearest([1.0, 1.0, 1.0]).unwrap();
        assert_eq!(g.index_state().bsp, IndexState::Ready);
        assert_eq!(g.index_state().nn, IndexState::Ready);

        g.expand([0.0, 3.0, 3.0]);
        assert_eq!(g.index_state(), dirty);
    }

    #[test]
    fn test_vector_isect_along_axis() {
        let g = octahedron();
        let hit = g.vector_isect([-3.0, 0.1, 0.1], [3.0, 0.1, 0.1]).unwrap().unwrap();
        assert_relative_eq!(hit.min[0], -0.8, epsilon = 1e-12);
        assert_relative_eq!(hit.max[0], 0.8, epsilon = 1e-12);
        assert!(hit.mint < hit.maxt);
        assert!(g.vector_isect([5.0, 5.0, 0.0], [5.0, 5.0, 1.0]).unwrap().is_none());
    }

    #[test]
    fn test_white_black_derived() {
        let mut g = octahedron();
        let wb = g.white_black().unwrap();
        assert_eq!(wb.cs_white, [100.0, 0.0, 0.0]);
        assert_eq!(wb.cs_black, [0.0, 0.0, 0.0]);
        assert_relative_eq!(wb.gamut_white[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(wb.gamut_black[0], -1.0, epsilon = 1e-12);
        assert!(!g.has_gamut_white());

        g.set_gamut_wb(Some([0.9, 0.0, 0.0]), Some([-0.9, 0.0, 0.0]));
        assert!(g.has_gamut_white() && g.has_gamut_black());
        assert_eq!(g.white_black().unwrap().gamut_white, [0.9, 0.0, 0.0]);
    }

    #[test]
    fn test_compatible() {
        let a = Gamut::new(10.0, false);
        let b = Gamut::new(11.0, false);
        assert!(a.compatible(&b));
        assert!(!a.compatible(&Gamut::new(10.0, true)));
        assert!(!a.compatible(&Gamut::new(40.0, false)));
        let c = GamutBuilder::new().center([60.0, 0.0, 0.0]).build();
        assert!(!a.compatible(&c));
    }
    #[test]
    fn test_raw_vertices() {
        let g = octahedron();
        let all = g.raw_vertices();
        assert_eq!(all.len(), 6);
        assert_eq!(g.raw_vertex_count(), 6);
        for (i, p) in all.iter().enumerate() {
            assert_eq!(g.raw_vertex(i), Some(*p));
            assert_eq!(p.iter().map(|c| c.abs()).sum::<f64>(), 1.0);
        }
        assert_eq!(g.raw_vertex(6), None);
    }

    #[test]
    fn test_raw0_vertices() {
        let g = octahedron();
        // One maximum per quadtree leaf; only -b points into the western root
        assert_eq!(g.raw0_vertex_count(), 2);
        assert_eq!(g.raw0_vertex(0), Some([0.0, 0.0, -1.0]));
        assert!(g.raw0_vertex(1).is_some());
        assert_eq!(g.raw0_vertex(2), None);
    }

    #[test]
    fn test_raw_neighbors() {
        let mut g = GamutBuilder::new().no_filter(true).build();
        let mut samples = Vec::new();
        for i in 0..30 {
            let hue = i as f64 * 12.0_f64.to_radians();
            let l = 20.0 + (i % 7) as f64 * 10.0;
            let p = [l, 40.0 * hue.cos(), 40.0 * hue.sin()];
            assert_eq!(g.expand(p), Expansion::Retained);
            samples.push(p);
        }

        assert_eq!(g.raw_neighbors(samples[5], 50).len(), MAX_NEIGHBORS);
        assert_eq!(g.raw_neighbors(samples[5], 3).len(), 3);
        assert!(g.raw_neighbors(samples[5], 0).is_empty());
        assert_eq!(g.raw_neighbors(samples[5], 1), vec![samples[5]]);
        // The center has no direction
        assert!(g.raw_neighbors(DEFAULT_CENTER, 4).is_empty());
    }

    #[test]
    fn test_raw_vertex_flags() {
        let mut g = octahedron();
        assert_eq!(g.expand([0.1, 0.1, 0.1]), Expansion::Retained);
        assert_eq!(g.vertex_count().unwrap(), 6);

        let mut inside = 0;
        for i in 0..g.raw_vertex_count() {
            let flags = g.raw_vertex_flags(i).unwrap().unwrap();
            assert!(flags.contains(VertexFlags::SET));
            assert!(!flags.contains(VertexFlags::SYNTHETIC));
            if g.raw_vertex(i) == Some([0.1, 0.1, 0.1]) {
                assert!(flags.contains(VertexFlags::INSIDE));
                assert!(!flags.contains(VertexFlags::TRIANGULATED));
                inside += 1;
            } else {
                assert!(flags.contains(VertexFlags::TRIANGULATED));
            }
        }
        assert_eq!(inside, 1);
        assert_eq!(g.raw_vertex_flags(7).unwrap(), None);

        let mut sparse = Gamut::new(0.0, false);
        sparse.expand([60.0, 10.0, 0.0]);
        assert!(sparse.raw_vertex_flags(0).unwrap_err().is_not_ready());
    }

    #[test]
    fn test_compute_cusps() {
        let mut g = Gamut::new(0.0, false);
        assert!(g.cusps().is_err());
        g.expand([100.0, 0.0, 0.0]);
        g.expand([0.0, 0.0, 0.0]);
        let hues = ColorRep::Lab.sector_hues();
        let ring: Vec<[f64; 3]> = hues
            .iter()
            .map(|h| {
                let h = h.to_radians();
                [55.0, 70.0 * h.cos(), 70.0 * h.sin()]
            })
            .collect();
        for &p in &ring {
            assert_eq!(g.expand(p), Expansion::Retained);
        }
        assert_eq!(g.vertex_count().unwrap(), 8);

        g.compute_cusps().unwrap();
        let cusps = g.cusps().unwrap();
        for (i, c) in cusps.iter().enumerate() {
            assert_eq!(*c, ring[i]);
            let hue = coords::hue_degrees(*c);
            assert!(coords::hue_difference(hue, hues[i]) < 1e-9);
        }
    }
}
