//! Split a global mesh into per-processor meshes and addressing tables.
//!
//! For processor `p` the local mesh is built from the faces touching `p`'s
//! cells, classified as
//! 1. internal: owner and neighbour both on `p`;
//! 2. physical boundary: the face already sits on a global patch;
//! 3. processor boundary: the other cell lives on processor `q != p`.
//!
//! Local faces are ordered internal first (ascending global face), then
//! every global patch in global order (kept even when empty), then one
//! `procBoundary<p>to<q>` patch per neighbour `q` in ascending rank, each
//! listing its faces in ascending global order. Cells keep their global
//! order, points are numbered by ascending global index.
//!
//! A face seen from its global neighbour's side is *flipped*: its local
//! owner is the global neighbour, its point list is reversed keeping the
//! first point in place, and its face address carries a negative sign.

use crate::addressing::{PatchAddress, ProcAddressing, SignedFace};
use crate::algs::map_procs;
use crate::mesh_error::MeshError;
use crate::topology::{BoundaryPatch, CellOwnership, Face, MeshConnectivity, PolyMesh};
use hashbrown::HashMap;
use itertools::Itertools;
use log::{debug, warn};
use std::collections::BTreeMap;

/// One processor's piece: its local mesh and how it maps onto the global one.
#[derive(Clone, Debug, PartialEq)]
pub struct ProcMesh {
    pub mesh: PolyMesh,
    pub addressing: ProcAddressing,
}

impl ProcMesh {
    /// Pair a local mesh with its addressing, checking table lengths.
    pub fn new(mesh: PolyMesh, addressing: ProcAddressing) -> Result<Self, MeshError> {
        addressing.check_local(&mesh)?;
        Ok(Self { mesh, addressing })
    }

    pub fn proc_id(&self) -> usize {
        self.addressing.proc_id()
    }
}

/// Decompose `mesh` according to `ownership`, one processor after another
/// or in parallel when the `rayon` feature is enabled.
pub fn decompose_mesh(
    mesh: &PolyMesh,
    ownership: &CellOwnership,
) -> Result<Vec<ProcMesh>, MeshError> {
    decompose_mesh_with(mesh, ownership, true)
}

/// [`decompose_mesh`] with explicit control over processor-level parallelism.
///
/// The result is identical either way: every processor's piece depends only
/// on the global mesh and the ownership map.
pub fn decompose_mesh_with(
    mesh: &PolyMesh,
    ownership: &CellOwnership,
    parallel: bool,
) -> Result<Vec<ProcMesh>, MeshError> {
    if ownership.n_cells() != mesh.n_cells() {
        return Err(MeshError::CellMapLengthMismatch {
            expected: mesh.n_cells(),
            found: ownership.n_cells(),
        });
    }
    for p in ownership.empty_procs() {
        warn!("processor {p} has no cells; its mesh will be empty");
    }
    let connectivity = MeshConnectivity::build(mesh);
    let procs = map_procs(ownership.n_procs(), parallel, |p| {
        decompose_processor(mesh, &connectivity, ownership, p)
    })?;
    for piece in &procs {
        crate::debug_invariants!(
            piece.addressing.check_global(mesh),
            "addressing of processor {}",
            piece.proc_id()
        );
    }
    Ok(procs)
}

/// Faces of one processor, grouped by where they land locally.
struct FaceClasses {
    internal: Vec<usize>,
    physical: Vec<Vec<usize>>,
    processor: BTreeMap<usize, Vec<usize>>,
}

fn classify_faces(
    mesh: &PolyMesh,
    connectivity: &MeshConnectivity,
    ownership: &CellOwnership,
    p: usize,
) -> FaceClasses {
    let touched: Vec<usize> = ownership
        .proc_cells(p)
        .iter()
        .flat_map(|&c| connectivity.cell_faces(c).iter().copied())
        .sorted_unstable()
        .dedup()
        .collect();

    let n_internal = mesh.n_internal_faces();
    let split = touched.partition_point(|&f| f < n_internal);
    let (internal_candidates, boundary) = touched.split_at(split);

    let mut internal = Vec::new();
    let mut processor: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for &f in internal_candidates {
        let own_proc = ownership.proc_of(mesh.owner()[f]);
        let nbr_proc = ownership.proc_of(mesh.neighbour()[f]);
        match (own_proc == p, nbr_proc == p) {
            (true, true) => internal.push(f),
            (true, false) => processor.entry(nbr_proc).or_default().push(f),
            (false, _) => processor.entry(own_proc).or_default().push(f),
        }
    }

    let physical = mesh
        .patches()
        .iter()
        .map(|patch| {
            let lo = boundary.partition_point(|&f| f < patch.start);
            let hi = boundary.partition_point(|&f| f < patch.start + patch.size);
            boundary[lo..hi].to_vec()
        })
        .collect();

    FaceClasses {
        internal,
        physical,
        processor,
    }
}

fn decompose_processor(
    mesh: &PolyMesh,
    connectivity: &MeshConnectivity,
    ownership: &CellOwnership,
    p: usize,
) -> Result<ProcMesh, MeshError> {
    let classes = classify_faces(mesh, connectivity, ownership, p);
    let n_faces = classes.internal.len()
        + classes.physical.iter().map(Vec::len).sum::<usize>()
        + classes.processor.values().map(Vec::len).sum::<usize>();

    let mut face_addr = Vec::with_capacity(n_faces);
    let mut global_faces: Vec<Face> = Vec::with_capacity(n_faces);
    let mut owner = Vec::with_capacity(n_faces);
    let mut neighbour = Vec::with_capacity(classes.internal.len());

    for &f in &classes.internal {
        face_addr.push(SignedFace::new(f, false));
        global_faces.push(mesh.faces()[f].clone());
        owner.push(ownership.local_index(mesh.owner()[f]));
        neighbour.push(ownership.local_index(mesh.neighbour()[f]));
    }

    let mut patches = Vec::with_capacity(mesh.patches().len() + classes.processor.len());
    let mut boundary_addr = Vec::with_capacity(patches.capacity());
    for (g, (patch, faces)) in mesh.patches().iter().zip(&classes.physical).enumerate() {
        patches.push(BoundaryPatch::new(
            patch.name.clone(),
            patch.kind.clone(),
            face_addr.len(),
            faces.len(),
        ));
        boundary_addr.push(PatchAddress::Global(g));
        for &f in faces {
            face_addr.push(SignedFace::new(f, false));
            global_faces.push(mesh.faces()[f].clone());
            owner.push(ownership.local_index(mesh.owner()[f]));
        }
    }

    for (&q, faces) in &classes.processor {
        patches.push(BoundaryPatch::processor(p, q, face_addr.len(), faces.len()));
        boundary_addr.push(PatchAddress::Processor);
        for &f in faces {
            let flipped = !ownership.is_owned_by(mesh.owner()[f], p);
            let mut pts = mesh.faces()[f].clone();
            let local_owner = if flipped {
                pts[1..].reverse();
                mesh.neighbour()[f]
            } else {
                mesh.owner()[f]
            };
            face_addr.push(SignedFace::new(f, flipped));
            global_faces.push(pts);
            owner.push(ownership.local_index(local_owner));
        }
    }

    let point_addr: Vec<usize> = global_faces
        .iter()
        .flatten()
        .copied()
        .sorted_unstable()
        .dedup()
        .collect();
    let local_point: HashMap<usize, usize> = point_addr
        .iter()
        .enumerate()
        .map(|(local, &global)| (global, local))
        .collect();

    let mut faces = Vec::with_capacity(global_faces.len());
    for (local_face, pts) in global_faces.into_iter().enumerate() {
        let renumbered = pts
            .into_iter()
            .map(|point| {
                local_point
                    .get(&point)
                    .copied()
                    .ok_or(MeshError::MissingLocalPoint {
                        proc: p,
                        face: face_addr[local_face].index(),
                        point,
                    })
            })
            .collect::<Result<Face, _>>()?;
        faces.push(renumbered);
    }
    let points = point_addr.iter().map(|&g| mesh.points()[g]).collect();

    let cells = ownership.proc_cells(p).to_vec();
    let local = PolyMesh::new(points, faces, owner, neighbour, patches, cells.len())?;
    let addressing = ProcAddressing::new(p, point_addr, face_addr, cells, boundary_addr)?;
    debug!(
        "processor {p}: {} cells, {} faces ({} internal), {} points, {} processor patches",
        local.n_cells(),
        local.n_faces(),
        local.n_internal_faces(),
        local.n_points(),
        classes.processor.len()
    );
    ProcMesh::new(local, addressing)
}
