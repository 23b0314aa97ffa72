//! Space-time mesh topology and the disjoint-set forests built over it.
//!
//! - [`ids`]: `ElementId` / `VertexId` handles
//! - [`mesh`]: the [`SpaceTimeMesh`] contract
//! - [`simplicial`] and [`extruded`]: a base simplicial complex and its
//!   staircase extrusion through time
//! - [`enumerator`]: parallel traversal of one timestep or slab
//! - [`union_find`] and [`distributed_union_find`]: sparse disjoint sets

pub mod distributed_union_find;
pub mod enumerator;
pub mod extruded;
pub mod ids;
pub mod mesh;
pub mod simplicial;
pub mod union_find;

pub use ids::{ElementId, VertexId};
pub use mesh::SpaceTimeMesh;
