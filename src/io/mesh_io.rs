//! `constant/polyMesh` files and the processor addressing tables.

use crate::addressing::{PatchAddress, ProcAddressing, SignedFace};
use crate::io::{WriteBatch, read_json};
use crate::mesh_error::MeshError;
use crate::topology::{BoundaryPatch, Face, Point, PolyMesh};
use std::path::{Path, PathBuf};

pub const POLY_MESH_DIR: &str = "constant/polyMesh";

/// `<root>/constant/polyMesh`.
pub fn poly_mesh_dir(root: impl AsRef<Path>) -> PathBuf {
    root.as_ref().join(POLY_MESH_DIR)
}

/// Whether `root` holds a mesh (its `faces.json` exists).
pub fn has_poly_mesh(root: impl AsRef<Path>) -> bool {
    poly_mesh_dir(root).join("faces.json").is_file()
}

/// Read and validate the mesh under `root`.
///
/// The cell count is derived from the owner and neighbour lists.
pub fn read_poly_mesh(root: impl AsRef<Path>) -> Result<PolyMesh, MeshError> {
    let dir = poly_mesh_dir(root);
    let points: Vec<Point> = read_json(dir.join("points.json"))?;
    let faces: Vec<Face> = read_json(dir.join("faces.json"))?;
    let owner: Vec<usize> = read_json(dir.join("owner.json"))?;
    let neighbour: Vec<usize> = read_json(dir.join("neighbour.json"))?;
    let patches: Vec<BoundaryPatch> = read_json(dir.join("boundary.json"))?;
    PolyMesh::from_owner_neighbour(points, faces, owner, neighbour, patches)
}

/// Queue the five mesh files of `mesh` under `root`.
pub fn push_poly_mesh(
    batch: &mut WriteBatch,
    root: impl AsRef<Path>,
    mesh: &PolyMesh,
) -> Result<(), MeshError> {
    let dir = poly_mesh_dir(root);
    batch.push_json(dir.join("points.json"), mesh.points())?;
    batch.push_json(dir.join("faces.json"), mesh.faces())?;
    batch.push_json(dir.join("owner.json"), mesh.owner())?;
    batch.push_json(dir.join("neighbour.json"), mesh.neighbour())?;
    batch.push_json(dir.join("boundary.json"), mesh.patches())
}

/// Read the four addressing tables of processor `proc_id` stored under `root`.
pub fn read_addressing(root: impl AsRef<Path>, proc_id: usize) -> Result<ProcAddressing, MeshError> {
    let dir = poly_mesh_dir(root);
    let point: Vec<usize> = read_json(dir.join("pointProcAddressing.json"))?;
    let face: Vec<SignedFace> = read_json(dir.join("faceProcAddressing.json"))?;
    let cell: Vec<usize> = read_json(dir.join("cellProcAddressing.json"))?;
    let boundary: Vec<PatchAddress> = read_json(dir.join("boundaryProcAddressing.json"))?;
    ProcAddressing::new(proc_id, point, face, cell, boundary)
}

/// Queue the addressing tables next to the processor's mesh files.
pub fn push_addressing(
    batch: &mut WriteBatch,
    root: impl AsRef<Path>,
    addressing: &ProcAddressing,
) -> Result<(), MeshError> {
    let dir = poly_mesh_dir(root);
    batch.push_json(dir.join("pointProcAddressing.json"), addressing.point())?;
    batch.push_json(dir.join("faceProcAddressing.json"), addressing.face())?;
    batch.push_json(dir.join("cellProcAddressing.json"), addressing.cell())?;
    batch.push_json(dir.join("boundaryProcAddressing.json"), addressing.boundary())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::decompose_mesh_with;
    use crate::io::test_dir::ScratchDir;
    use crate::topology::{CellOwnership, hex_lattice};

    #[test]
    fn mesh_files_round_trip() {
        let dir = ScratchDir::new("mesh-io");
        let mesh = hex_lattice(2, 1, 3).unwrap();
        let mut batch = WriteBatch::new();
        push_poly_mesh(&mut batch, &dir.0, &mesh).unwrap();
        assert!(!has_poly_mesh(&dir.0));
        batch.commit().unwrap();
        assert!(has_poly_mesh(&dir.0));
        assert_eq!(read_poly_mesh(&dir.0).unwrap(), mesh);
    }

    #[test]
    fn face_addressing_is_written_signed_one_based() {
        let dir = ScratchDir::new("addr-io");
        let mesh = hex_lattice(2, 1, 1).unwrap();
        let own = CellOwnership::new(vec![1, 0], 2).unwrap();
        let procs = decompose_mesh_with(&mesh, &own, false).unwrap();
        let mut batch = WriteBatch::new();
        push_addressing(&mut batch, &dir.0, &procs[0].addressing).unwrap();
        batch.commit().unwrap();

        let raw: Vec<i64> = read_json(poly_mesh_dir(&dir.0).join("faceProcAddressing.json")).unwrap();
        assert!(raw.iter().all(|&r| r != 0));
        // the cut face is global face 0, seen from its neighbour side on processor 0
        assert!(raw.contains(&-1));
        let boundary: Vec<i64> =
            read_json(poly_mesh_dir(&dir.0).join("boundaryProcAddressing.json")).unwrap();
        assert_eq!(boundary.last(), Some(&PatchAddress::PROCESSOR_SENTINEL));

        assert_eq!(read_addressing(&dir.0, 0).unwrap(), procs[0].addressing);
    }
}
