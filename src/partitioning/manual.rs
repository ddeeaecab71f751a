//! Externally produced cell→processor lists.

use crate::io::read_json;
use crate::mesh_error::MeshError;
use std::path::Path;

/// Read a JSON array of processor ranks, one per cell.
///
/// Range and length are checked when the list is turned into a
/// [`CellOwnership`](crate::topology::CellOwnership).
pub fn read_cell_map(path: impl AsRef<Path>) -> Result<Vec<usize>, MeshError> {
    read_json(path)
}
