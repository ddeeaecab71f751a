//! Cell→processor assignment and decomposition quality metrics.

pub mod manual;
pub mod metrics;
pub mod simple;

pub use metrics::{DecompositionStats, ProcStats};
pub use simple::simple_decomposition;

use crate::config::{DecomposeConfig, DecompositionMethod};
use crate::mesh_error::MeshError;
use crate::topology::{CellOwnership, MeshConnectivity, MeshGeometry, PolyMesh};
use log::info;
use std::path::Path;

/// Assign every cell of `mesh` to a processor as configured.
///
/// Manual maps are resolved relative to `case`.
pub fn assign_cells(
    config: &DecomposeConfig,
    mesh: &PolyMesh,
    case: impl AsRef<Path>,
) -> Result<CellOwnership, MeshError> {
    config.validate()?;
    let cell_to_proc = match &config.method {
        DecompositionMethod::Simple { n } => {
            let connectivity = MeshConnectivity::build(mesh);
            let geometry = MeshGeometry::build(mesh, &connectivity);
            info!("simple decomposition into {}x{}x{} blocks", n[0], n[1], n[2]);
            simple_decomposition(geometry.cell_centres(), *n)
        }
        DecompositionMethod::Manual { data_file } => {
            let path = case.as_ref().join(data_file);
            info!("manual decomposition from {}", path.display());
            manual::read_cell_map(path)?
        }
    };
    CellOwnership::for_cells(cell_to_proc, config.number_of_subdomains, mesh.n_cells())
}
