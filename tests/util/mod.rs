#![allow(dead_code)]

use mesh_decompose::prelude::*;
use proptest::prelude::*;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Decompose `mesh` sequentially with the given map.
pub fn split(mesh: &PolyMesh, map: Vec<usize>, n_procs: usize) -> (CellOwnership, Vec<ProcMesh>) {
    let own = CellOwnership::new(map, n_procs).unwrap();
    let procs = decompose_mesh_with(mesh, &own, false).unwrap();
    (own, procs)
}

/// Run `decompose` on every processor and wrap each piece in `Some`.
pub fn decompose_each<F, D>(mesh: &PolyMesh, procs: &[ProcMesh], decompose: D) -> Vec<Option<F>>
where
    D: Fn(&FieldDecomposer<'_>) -> Result<F, MeshError>,
{
    procs
        .iter()
        .map(|piece| {
            let d = FieldDecomposer::new(mesh, piece, ProcessorPatchValues::OwnerCell).unwrap();
            Some(decompose(&d).unwrap())
        })
        .collect()
}

/// A lattice size and a random cell→processor map for it.
pub fn lattice_and_map() -> impl Strategy<Value = ([usize; 3], usize, Vec<usize>)> {
    (1usize..=4, 1usize..=3, 1usize..=3, 1usize..=5).prop_flat_map(|(nx, ny, nz, np)| {
        (
            Just([nx, ny, nz]),
            Just(np),
            proptest::collection::vec(0..np, nx * ny * nz),
        )
    })
}

static NEXT: AtomicUsize = AtomicUsize::new(0);

/// Fresh case directory under the system temp dir, removed on drop.
pub struct ScratchCase(pub PathBuf);

impl ScratchCase {
    pub fn new(tag: &str) -> Self {
        let n = NEXT.fetch_add(1, Ordering::Relaxed);
        let dir = std::env::temp_dir().join(format!(
            "mesh-decompose-it-{tag}-{}-{n}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        Self(dir)
    }
}

impl Drop for ScratchCase {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}
