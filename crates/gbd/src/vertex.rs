//! Vertex pool.
//!
//! Every sample that survives filtering lives in a [`VertexPool`] arena and
//! is addressed by a [`VertexId`]. Triangles, edges and quadtree leaves hold
//! ids, never copies, so a vertex never moves while referenced. Superseded
//! vertices go to a free-list and their slots are reused by later samples.

use gbd_math::Vec3;

use crate::coords::{self, Radial};

/// Stable handle of a vertex in the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexId(pub u32);

impl VertexId {
    /// Index into the pool arena.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Vertex lifecycle flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct VertexFlags(u8);

impl VertexFlags {
    /// Slot is free.
    pub const UNSET: Self = Self(0);
    /// Value has been set.
    pub const SET: Self = Self(0x01);
    /// Vertex is part of the triangulation (exclusive with `INSIDE`).
    pub const TRIANGULATED: Self = Self(0x02);
    /// Vertex fell inside the log hull (exclusive with `TRIANGULATED`).
    pub const INSIDE: Self = Self(0x04);
    /// Synthetic establishment vertex near the center.
    pub const SYNTHETIC: Self = Self(0x08);

    /// Returns true if all bits of `other` are set.
    #[inline]
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Sets the bits of `other`.
    #[inline]
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    /// Union of two flag sets.
    #[inline]
    pub fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

/// A boundary sample in its several coordinate representations.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vertex {
    /// Absolute position, internal axes
    pub p: Vec3,
    /// Radial coordinates about the center
    pub r: Radial,
    /// Log-scaled radius
    pub lr0: f64,
    /// Position on the unit sphere about the center
    pub sp: Vec3,
    /// Convex hull testing position, `sp * lr0`
    pub ch: Vec3,
    /// Lifecycle flags
    pub flags: VertexFlags,
    /// Reference count
    pub rc: u32,
}

impl Vertex {
    /// Builds a vertex for an internal absolute position.
    ///
    /// Returns `None` for points at the center, which have no direction.
    pub fn new(center: Vec3, p: Vec3) -> Option<Self> {
        let rel = p - center;
        let sp = rel.try_normalize()?;
        let r = coords::rect_to_radial(center, p);
        let lr0 = coords::log_radius(r.radius);
        Some(Self {
            p,
            r,
            lr0,
            sp,
            ch: sp * lr0,
            flags: VertexFlags::UNSET,
            rc: 0,
        })
    }
}

/// Arena of vertices with reference counting and a free-list.
#[derive(Debug, Clone, Default)]
pub struct VertexPool {
    verts: Vec<Vertex>,
    free: Vec<VertexId>,
    live: usize,
}

impl VertexPool {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a vertex, reusing a freed slot when one is available.
    ///
    /// The vertex starts with the `SET` flag and no references.
    ///
    /// # Panics
    ///
    /// Panics if the `u32` handle space is exhausted; like an out of memory
    /// condition this is not recoverable.
    pub fn alloc(&mut self, mut v: Vertex) -> VertexId {
        v.flags.insert(VertexFlags::SET);
        v.rc = 0;
        self.live += 1;
        if let Some(id) = self.free.pop() {
            self.verts[id.index()] = v;
            return id;
        }
        assert!(
            self.verts.len() < u32::MAX as usize,
            "vertex pool exhausted ({} vertices)",
            self.verts.len()
        );
        let id = VertexId(self.verts.len() as u32);
        self.verts.push(v);
        id
    }

    /// Adds a reference.
    #[inline]
    pub fn retain(&mut self, id: VertexId) {
        self.verts[id.index()].rc += 1;
    }

    /// Drops a reference. At zero the vertex returns to the free-list and
    /// `true` is returned.
    pub fn release(&mut self, id: VertexId) -> bool {
        let v = &mut self.verts[id.index()];
        debug_assert!(v.rc > 0, "release of unreferenced vertex {:?}", id);
        v.rc = v.rc.saturating_sub(1);
        if v.rc == 0 {
            v.flags = VertexFlags::UNSET;
            self.free.push(id);
            self.live -= 1;
            true
        } else {
            false
        }
    }

    /// Borrows a vertex.
    #[inline]
    pub fn get(&self, id: VertexId) -> &Vertex {
        &self.verts[id.index()]
    }

    /// Returns true if the id refers to a live vertex.
    #[inline]
    pub fn is_live(&self, id: VertexId) -> bool {
        self.verts
            .get(id.index())
            .is_some_and(|v| v.flags.contains(VertexFlags::SET))
    }

    /// Number of live vertices.
    #[inline]
    pub fn len(&self) -> usize {
        self.live
    }

    /// Returns true if no vertex is live.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }
}
