//! Processor directories of a decomposed case.

use crate::algs::ProcMesh;
use crate::io::mesh_io::{push_addressing, push_poly_mesh, read_addressing, read_poly_mesh};
use crate::io::{WriteBatch, processor_dir, read_json};
use crate::mesh_error::MeshError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const PARTITIONED_METADATA_VERSION: u32 = 1;

/// Metadata describing one processor piece, stored as
/// `processor<N>/decomposition.json`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionedCaseMetadata {
    /// Metadata format version.
    pub version: u32,
    /// Processor that owns this piece.
    pub rank: usize,
    /// Total number of processors in the decomposition.
    pub size: usize,
    pub n_cells: usize,
    pub n_faces: usize,
    pub n_points: usize,
    /// Ranks sharing a processor patch with this one, ascending.
    pub neighbours: Vec<usize>,
}

impl PartitionedCaseMetadata {
    pub fn new(piece: &ProcMesh, size: usize) -> Self {
        let mesh = &piece.mesh;
        let neighbours = mesh
            .processor_patches()
            .filter_map(|i| mesh.patches()[i].neighb_proc())
            .collect();
        Self {
            version: PARTITIONED_METADATA_VERSION,
            rank: piece.proc_id(),
            size,
            n_cells: mesh.n_cells(),
            n_faces: mesh.n_faces(),
            n_points: mesh.n_points(),
            neighbours,
        }
    }
}

fn metadata_path(dir: &Path) -> PathBuf {
    dir.join("decomposition.json")
}

/// Queue mesh, addressing and metadata of one processor piece.
pub fn push_processor_mesh(
    batch: &mut WriteBatch,
    case: impl AsRef<Path>,
    piece: &ProcMesh,
    size: usize,
) -> Result<(), MeshError> {
    let dir = processor_dir(case, piece.proc_id());
    push_poly_mesh(batch, &dir, &piece.mesh)?;
    push_addressing(batch, &dir, &piece.addressing)?;
    batch.push_json(metadata_path(&dir), &PartitionedCaseMetadata::new(piece, size))
}

/// Read processor `proc_id` of a decomposition into `size` pieces.
///
/// The metadata must agree with the requested rank and size, and the
/// addressing tables with the local mesh.
pub fn read_processor_mesh(
    case: impl AsRef<Path>,
    proc_id: usize,
    size: usize,
) -> Result<ProcMesh, MeshError> {
    let dir = processor_dir(case, proc_id);
    let meta_path = metadata_path(&dir);
    let meta: PartitionedCaseMetadata = read_json(&meta_path)?;
    if meta.version != PARTITIONED_METADATA_VERSION {
        return Err(MeshError::parse(
            &meta_path,
            format!("unsupported metadata version {}", meta.version),
        ));
    }
    if meta.rank != proc_id {
        return Err(MeshError::parse(
            &meta_path,
            format!("directory of processor {proc_id} holds rank {}", meta.rank),
        ));
    }
    if meta.size != size {
        return Err(MeshError::ProcessorCountMismatch {
            expected: size,
            found: meta.size,
        });
    }
    let mesh = read_poly_mesh(&dir)?;
    let addressing = read_addressing(&dir, proc_id)?;
    ProcMesh::new(mesh, addressing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::decompose_mesh_with;
    use crate::io::test_dir::ScratchDir;
    use crate::topology::{CellOwnership, hex_lattice};

    fn write_pieces(case: &Path) -> Vec<ProcMesh> {
        let mesh = hex_lattice(3, 2, 1).unwrap();
        let own = CellOwnership::new(vec![0, 1, 2, 0, 1, 2], 3).unwrap();
        let procs = decompose_mesh_with(&mesh, &own, false).unwrap();
        let mut batch = WriteBatch::new();
        for piece in &procs {
            push_processor_mesh(&mut batch, case, piece, procs.len()).unwrap();
        }
        batch.commit().unwrap();
        procs
    }

    #[test]
    fn pieces_read_back_identically() {
        let dir = ScratchDir::new("partitioned");
        let procs = write_pieces(&dir.0);
        for piece in &procs {
            assert_eq!(&read_processor_mesh(&dir.0, piece.proc_id(), 3).unwrap(), piece);
        }
        let meta: PartitionedCaseMetadata =
            read_json(metadata_path(&processor_dir(&dir.0, 1))).unwrap();
        assert_eq!(meta.neighbours, vec![0, 2]);
        assert_eq!(meta.n_cells, 2);
    }

    #[test]
    fn size_disagreement_is_reported() {
        let dir = ScratchDir::new("partitioned-size");
        write_pieces(&dir.0);
        assert_eq!(
            read_processor_mesh(&dir.0, 0, 4),
            Err(MeshError::ProcessorCountMismatch {
                expected: 4,
                found: 3
            })
        );
    }
}
