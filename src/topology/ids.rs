//! `ElementId` and `VertexId`: strong, zero-cost handles for space-time mesh entities
//!
//! Both wrap a plain `u64` and 0 is a valid id:
//! element and vertex ids are dense indices starting at zero.
//!
//! - `ElementId` indexes a simplex of a fixed dimension; the timestep is encoded
//!   as a per-timestep offset by the mesh.
//! - `VertexId` indexes a space-time vertex (`base + t * n(0)` for extruded meshes).

use std::fmt;

use crate::algs::wire::WirePoint;

/// Handle for a simplex of a known dimension.
#[derive(
    Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, serde::Serialize, serde::Deserialize,
)]
#[repr(transparent)]
pub struct ElementId(pub u64);

/// Handle for a space-time mesh vertex.
#[derive(
    Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, serde::Serialize, serde::Deserialize,
)]
#[repr(transparent)]
pub struct VertexId(pub u64);

impl ElementId {
    #[inline]
    pub const fn new(raw: u64) -> Self {
        ElementId(raw)
    }

    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl VertexId {
    #[inline]
    pub const fn new(raw: u64) -> Self {
        VertexId(raw)
    }

    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

// -----------------------------------------------------------------------------
// Formatting traits
// -----------------------------------------------------------------------------

impl fmt::Debug for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ElementId").field(&self.0).finish()
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("VertexId").field(&self.0).finish()
    }
}

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// -----------------------------------------------------------------------------
// Wire encoding
// -----------------------------------------------------------------------------

impl WirePoint for ElementId {
    #[inline]
    fn to_wire(self) -> u64 {
        self.0
    }
    #[inline]
    fn from_wire(w: u64) -> Self {
        ElementId(w)
    }
}

impl WirePoint for VertexId {
    #[inline]
    fn to_wire(self) -> u64 {
        self.0
    }
    #[inline]
    fn from_wire(w: u64) -> Self {
        VertexId(w)
    }
}

#[cfg(test)]
mod layout_tests {
    //! Compile-time assertion that the handles have the layout of `u64`.
    use super::*;
    use static_assertions::{assert_eq_align, assert_eq_size};

    assert_eq_size!(ElementId, u64);
    assert_eq_size!(VertexId, u64);
    assert_eq_align!(ElementId, u64);
}
