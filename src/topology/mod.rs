//! Mesh topology: the global polyhedral mesh and the data derived from it.
//!
//! This module provides:
//! - [`PolyMesh`], the face-addressed finite-volume mesh (points, faces,
//!   owner/neighbour cells, contiguous boundary patches),
//! - [`MeshConnectivity`] and [`MeshGeometry`], explicitly constructed
//!   derived data (cell→face lists, face/cell centres),
//! - [`CellOwnership`], the validated cell→processor assignment,
//! - [`hex_lattice`], a structured hex block used for demos and tests.

pub mod connectivity;
pub mod lattice;
pub mod ownership;
pub mod poly_mesh;

pub use connectivity::{MeshConnectivity, MeshGeometry};
pub use lattice::hex_lattice;
pub use ownership::CellOwnership;
pub use poly_mesh::{BoundaryPatch, Face, PatchKind, Point, PolyMesh};
