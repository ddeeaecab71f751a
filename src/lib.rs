#![cfg_attr(docsrs, feature(doc_cfg))]
//! # mesh-decompose
//!
//! mesh-decompose splits a face-addressed finite-volume case (polyhedral
//! mesh, cell/face/point fields and Lagrangian particle clouds) into
//! per-processor subdomains for parallel solvers, and reassembles the
//! processor results into the global case.
//!
//! ## Features
//! - Mesh decomposition with synthesized `procBoundary<p>to<q>` patches and
//!   the four local→global addressing tables (points, sign-encoded faces,
//!   cells, boundary patches)
//! - Field decomposition and reconstruction for volume, surface and point
//!   fields of scalar, vector, symmetric tensor, tensor and label values
//! - Particle cloud decomposition and stable-order reconstruction
//! - Mesh reconstruction from processor pieces
//! - Simple (geometric) and manual cell→processor assignment, with
//!   decomposition quality statistics
//! - Per-processor work on the rayon pool (feature `rayon`, on by default)
//!
//! ## Determinism
//!
//! Local numbering depends only on the global mesh and the cell→processor
//! map: points, faces and cells are numbered in ascending global order, and
//! processor patches follow ascending neighbour rank. Parallel and serial
//! runs produce identical pieces.
//!
//! ## Usage
//! ```rust
//! use mesh_decompose::prelude::*;
//!
//! # fn main() -> Result<(), MeshError> {
//! let mesh = hex_lattice(2, 2, 2)?;
//! let ownership = CellOwnership::new((0..8).map(|c| c % 2).collect(), 2)?;
//! let procs = decompose_mesh(&mesh, &ownership)?;
//!
//! let temperature = VolField::from_cell_values("T", &mesh, (0..8u8).map(f64::from).collect())?;
//! let pieces = procs
//!     .iter()
//!     .map(|piece| {
//!         FieldDecomposer::new(&mesh, piece, ProcessorPatchValues::OwnerCell)?
//!             .decompose_vol(&temperature)
//!             .map(Some)
//!     })
//!     .collect::<Result<Vec<_>, _>>()?;
//!
//! let gathered = FieldReconstructor::new(&mesh, &procs, PointArbitration::LowestRank)?
//!     .reconstruct_vol("T", &pieces)?;
//! assert_eq!(gathered, temperature);
//! assert_eq!(reconstruct_mesh(&procs)?, mesh);
//! # Ok(())
//! # }
//! ```

pub mod addressing;
pub mod algs;
pub mod config;
pub mod debug_invariants;
pub mod field;
pub mod io;
pub mod lagrangian;
pub mod mesh_error;
pub mod partitioning;
pub mod pipeline;
pub mod topology;

pub use debug_invariants::DebugInvariants;
pub use mesh_error::MeshError;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::addressing::{PatchAddress, ProcAddressing, SignedFace};
    pub use crate::algs::{
        FieldDecomposer, FieldReconstructor, PointArbitration, ProcMesh, ProcessorPatchValues,
        decompose_mesh, decompose_mesh_with, reconstruct_mesh,
    };
    pub use crate::config::{DecomposeConfig, DecompositionMethod};
    pub use crate::debug_invariants::DebugInvariants;
    pub use crate::field::{
        FaceOrientation, FieldValue, Label, MeshField, PointField, Scalar, SurfaceField,
        SymmTensor, Tensor, ValueType, Vector, VolField,
    };
    pub use crate::lagrangian::{
        CellParticles, Cloud, CompactField, ParticleField, ProcCloud, decompose_cloud,
        reconstruct_cloud,
    };
    pub use crate::mesh_error::{FieldCategory, MeshError};
    pub use crate::partitioning::{DecompositionStats, assign_cells, simple_decomposition};
    pub use crate::pipeline::{decompose_case, reconstruct_case, write_lattice_case};
    pub use crate::topology::{
        BoundaryPatch, CellOwnership, MeshConnectivity, MeshGeometry, PatchKind, PolyMesh,
        hex_lattice,
    };
}
