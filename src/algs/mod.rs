//! Decomposition and reconstruction algorithms.

pub mod decompose_mesh;
pub mod field_decompose;
pub mod field_reconstruct;
pub mod reconstruct_mesh;

pub use decompose_mesh::{ProcMesh, decompose_mesh, decompose_mesh_with};
pub use field_decompose::{FieldDecomposer, ProcessorPatchValues};
pub use field_reconstruct::{FieldReconstructor, PointArbitration};
pub use reconstruct_mesh::reconstruct_mesh;

use crate::mesh_error::MeshError;

/// Run `f` for every processor rank and collect the results in rank order.
///
/// With the `rayon` feature and `parallel` set, ranks are processed on the
/// rayon pool. Any error aborts the whole batch.
pub(crate) fn map_procs<T, F>(n_procs: usize, parallel: bool, f: F) -> Result<Vec<T>, MeshError>
where
    T: Send,
    F: Fn(usize) -> Result<T, MeshError> + Sync + Send,
{
    #[cfg(feature = "rayon")]
    if parallel {
        use rayon::prelude::*;
        return (0..n_procs).into_par_iter().map(&f).collect();
    }
    #[cfg(not(feature = "rayon"))]
    let _ = parallel;
    (0..n_procs).map(f).collect()
}
