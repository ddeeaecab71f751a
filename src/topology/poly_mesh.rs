//! Face-addressed polyhedral mesh.
//!
//! Faces are stored as ordered point lists. The first `neighbour.len()`
//! faces are internal (owner and neighbour cell); the remaining faces are
//! boundary faces grouped into contiguous patches, in patch order, starting
//! right after the last internal face.

use crate::debug_invariants::DebugInvariants;
use crate::mesh_error::MeshError;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Point coordinates.
pub type Point = [f64; 3];

/// Ordered point indices of one face.
pub type Face = Vec<usize>;

/// Kind of a boundary patch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PatchKind {
    /// Generic physical boundary.
    Patch,
    Wall,
    Symmetry,
    Empty,
    /// Synthesized cut between two processor subdomains.
    Processor { my_proc: usize, neighb_proc: usize },
}

/// A named, contiguous range of boundary faces.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundaryPatch {
    pub name: String,
    pub kind: PatchKind,
    pub start: usize,
    pub size: usize,
}

impl BoundaryPatch {
    pub fn new(name: impl Into<String>, kind: PatchKind, start: usize, size: usize) -> Self {
        Self {
            name: name.into(),
            kind,
            start,
            size,
        }
    }

    /// Processor patch between `my_proc` and `neighb_proc`, named `procBoundary<my>to<nb>`.
    pub fn processor(my_proc: usize, neighb_proc: usize, start: usize, size: usize) -> Self {
        Self::new(
            format!("procBoundary{my_proc}to{neighb_proc}"),
            PatchKind::Processor {
                my_proc,
                neighb_proc,
            },
            start,
            size,
        )
    }

    /// Global face range covered by this patch.
    pub fn range(&self) -> Range<usize> {
        self.start..self.start + self.size
    }

    pub fn is_processor(&self) -> bool {
        matches!(self.kind, PatchKind::Processor { .. })
    }

    /// Neighbouring processor rank for processor patches.
    pub fn neighb_proc(&self) -> Option<usize> {
        match self.kind {
            PatchKind::Processor { neighb_proc, .. } => Some(neighb_proc),
            _ => None,
        }
    }
}

/// Immutable polyhedral mesh.
///
/// # Invariants
/// - `owner.len() == faces.len()` and `neighbour.len() <= faces.len()`.
/// - Every face has at least three points, all `< points.len()`.
/// - Every owner/neighbour entry is `< n_cells`.
/// - Patches are contiguous, in order, starting at `n_internal_faces()` and
///   ending at `faces.len()`.
#[derive(Clone, Debug, PartialEq)]
pub struct PolyMesh {
    points: Vec<Point>,
    faces: Vec<Face>,
    owner: Vec<usize>,
    neighbour: Vec<usize>,
    patches: Vec<BoundaryPatch>,
    n_cells: usize,
}

impl PolyMesh {
    /// Build and validate a mesh.
    pub fn new(
        points: Vec<Point>,
        faces: Vec<Face>,
        owner: Vec<usize>,
        neighbour: Vec<usize>,
        patches: Vec<BoundaryPatch>,
        n_cells: usize,
    ) -> Result<Self, MeshError> {
        let mesh = Self {
            points,
            faces,
            owner,
            neighbour,
            patches,
            n_cells,
        };
        mesh.validate_invariants()?;
        Ok(mesh)
    }

    /// Build a mesh deriving the cell count from the owner/neighbour lists.
    pub fn from_owner_neighbour(
        points: Vec<Point>,
        faces: Vec<Face>,
        owner: Vec<usize>,
        neighbour: Vec<usize>,
        patches: Vec<BoundaryPatch>,
    ) -> Result<Self, MeshError> {
        let n_cells = owner
            .iter()
            .chain(neighbour.iter())
            .max()
            .map_or(0, |&c| c + 1);
        Self::new(points, faces, owner, neighbour, patches, n_cells)
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    pub fn owner(&self) -> &[usize] {
        &self.owner
    }

    /// Neighbour cells of the internal faces.
    pub fn neighbour(&self) -> &[usize] {
        &self.neighbour
    }

    pub fn patches(&self) -> &[BoundaryPatch] {
        &self.patches
    }

    pub fn n_points(&self) -> usize {
        self.points.len()
    }

    pub fn n_faces(&self) -> usize {
        self.faces.len()
    }

    pub fn n_internal_faces(&self) -> usize {
        self.neighbour.len()
    }

    pub fn n_boundary_faces(&self) -> usize {
        self.faces.len() - self.neighbour.len()
    }

    pub fn n_cells(&self) -> usize {
        self.n_cells
    }

    pub fn is_internal_face(&self, face: usize) -> bool {
        face < self.neighbour.len()
    }

    /// Neighbour cell of `face`, or `None` for boundary faces.
    pub fn face_neighbour(&self, face: usize) -> Option<usize> {
        self.neighbour.get(face).copied()
    }

    /// Index of the patch with the given name.
    pub fn find_patch(&self, name: &str) -> Option<usize> {
        self.patches.iter().position(|p| p.name == name)
    }

    /// Patch containing boundary face `face`, or `None` for internal faces.
    pub fn which_patch(&self, face: usize) -> Option<usize> {
        if face < self.n_internal_faces() || face >= self.n_faces() {
            return None;
        }
        let idx = self.patches.partition_point(|p| p.start + p.size <= face);
        (idx < self.patches.len()).then_some(idx)
    }

    /// Indices of the synthesized processor patches.
    pub fn processor_patches(&self) -> impl Iterator<Item = usize> + '_ {
        self.patches
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_processor())
            .map(|(i, _)| i)
    }
}

impl DebugInvariants for PolyMesh {
    fn validate_invariants(&self) -> Result<(), MeshError> {
        let n_faces = self.faces.len();
        if self.owner.len() != n_faces {
            return Err(MeshError::AddressingLengthMismatch {
                table: "owner",
                expected: n_faces,
                found: self.owner.len(),
            });
        }
        if self.neighbour.len() > n_faces {
            return Err(MeshError::AddressingLengthMismatch {
                table: "neighbour",
                expected: n_faces,
                found: self.neighbour.len(),
            });
        }

        let n_points = self.points.len();
        for (face, pts) in self.faces.iter().enumerate() {
            if pts.len() < 3 {
                return Err(MeshError::DegenerateFace {
                    face,
                    n_points: pts.len(),
                });
            }
            if let Some(&point) = pts.iter().find(|&&p| p >= n_points) {
                return Err(MeshError::FacePointOutOfRange {
                    face,
                    point,
                    n_points,
                });
            }
        }

        let cells = self.owner.iter().enumerate().chain(self.neighbour.iter().enumerate());
        for (face, &cell) in cells {
            if cell >= self.n_cells {
                return Err(MeshError::FaceCellOutOfRange {
                    face,
                    cell,
                    n_cells: self.n_cells,
                });
            }
        }

        let mut cursor = self.n_internal_faces();
        for patch in &self.patches {
            if patch.start != cursor {
                return Err(MeshError::PatchLayout {
                    patch: patch.name.clone(),
                    expected: cursor,
                    found: patch.start,
                });
            }
            cursor += patch.size;
        }
        if cursor != n_faces {
            return Err(MeshError::PatchLayout {
                patch: "<end of boundary>".into(),
                expected: n_faces,
                found: cursor,
            });
        }
        Ok(())
    }
}
