//! Split global fields onto one processor through its addressing tables.
//!
//! Cell and point values are plain gathers. Face values are gathered through
//! the signed face addressing and negated on flipped faces when the field is
//! oriented. Boundary values of physical patches come from the matching
//! slice of the global patch; processor patches have no global boundary
//! values and are filled with a placeholder taken from the adjacent cells.

use crate::addressing::{PatchAddress, SignedFace};
use crate::algs::ProcMesh;
use crate::field::{FieldValue, MeshField, PointField, SurfaceField, VolField};
use crate::mesh_error::MeshError;
use crate::topology::PolyMesh;
use serde::{Deserialize, Serialize};

/// Placeholder policy for vol-field values on processor patches.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessorPatchValues {
    /// Value of the cell on this processor's side of the cut (zero gradient).
    #[default]
    OwnerCell,
    /// Midpoint of the two cells adjacent to the cut face.
    Interpolated,
}

/// How the faces of one local patch map onto the global mesh.
#[derive(Clone, Debug)]
enum PatchMap {
    Physical {
        global_patch: usize,
        /// Offset of each local face inside the global patch.
        offsets: Vec<usize>,
    },
    Processor {
        faces: Vec<SignedFace>,
        /// Global cell on this processor's side.
        near_cells: Vec<usize>,
        /// Global cell across the cut.
        far_cells: Vec<usize>,
    },
}

/// Field decomposer for one processor.
///
/// Built once per processor and reused for every field of every time.
#[derive(Clone, Debug)]
pub struct FieldDecomposer<'a> {
    global: &'a PolyMesh,
    piece: &'a ProcMesh,
    patch_values: ProcessorPatchValues,
    patch_maps: Vec<PatchMap>,
}

impl<'a> FieldDecomposer<'a> {
    pub fn new(
        global: &'a PolyMesh,
        piece: &'a ProcMesh,
        patch_values: ProcessorPatchValues,
    ) -> Result<Self, MeshError> {
        let addressing = &piece.addressing;
        addressing.check_local(&piece.mesh)?;
        addressing.check_global(global)?;

        let mut patch_maps = Vec::with_capacity(piece.mesh.patches().len());
        for (local_patch, address) in piece.mesh.patches().iter().zip(addressing.boundary()) {
            let faces = &addressing.face()[local_patch.range()];
            let map = match *address {
                PatchAddress::Global(g) => {
                    let global_patch = &global.patches()[g];
                    let offsets = faces
                        .iter()
                        .enumerate()
                        .map(|(i, sf)| {
                            let f = sf.index();
                            if global_patch.range().contains(&f) {
                                Ok(f - global_patch.start)
                            } else {
                                Err(MeshError::AddressingOutOfRange {
                                    table: "faceProcAddressing",
                                    local: local_patch.start + i,
                                    global: f,
                                    size: global_patch.start + global_patch.size,
                                })
                            }
                        })
                        .collect::<Result<Vec<_>, _>>()?;
                    PatchMap::Physical {
                        global_patch: g,
                        offsets,
                    }
                }
                PatchAddress::Processor => {
                    let mut near_cells = Vec::with_capacity(faces.len());
                    let mut far_cells = Vec::with_capacity(faces.len());
                    for (i, sf) in faces.iter().enumerate() {
                        let f = sf.index();
                        let neighbour = global.face_neighbour(f).ok_or(
                            MeshError::AddressingOutOfRange {
                                table: "faceProcAddressing",
                                local: local_patch.start + i,
                                global: f,
                                size: global.n_internal_faces(),
                            },
                        )?;
                        let owner = global.owner()[f];
                        let (near, far) = if sf.is_flipped() {
                            (neighbour, owner)
                        } else {
                            (owner, neighbour)
                        };
                        near_cells.push(near);
                        far_cells.push(far);
                    }
                    PatchMap::Processor {
                        faces: faces.to_vec(),
                        near_cells,
                        far_cells,
                    }
                }
            };
            patch_maps.push(map);
        }

        Ok(Self {
            global,
            piece,
            patch_values,
            patch_maps,
        })
    }

    pub fn proc_id(&self) -> usize {
        self.piece.proc_id()
    }

    pub fn local_mesh(&self) -> &PolyMesh {
        &self.piece.mesh
    }

    /// Cell values by `cellProcAddressing`; processor-patch boundary values
    /// per [`ProcessorPatchValues`].
    pub fn decompose_vol<T: FieldValue>(&self, field: &VolField<T>) -> Result<VolField<T>, MeshError> {
        field.check_mesh(self.global)?;
        let internal = self
            .piece
            .addressing
            .cell()
            .iter()
            .map(|&c| field.internal[c].clone())
            .collect();
        let boundary = self
            .patch_maps
            .iter()
            .map(|map| match map {
                PatchMap::Physical {
                    global_patch,
                    offsets,
                } => offsets
                    .iter()
                    .map(|&o| field.boundary[*global_patch][o].clone())
                    .collect(),
                PatchMap::Processor {
                    near_cells,
                    far_cells,
                    ..
                } => near_cells
                    .iter()
                    .zip(far_cells)
                    .map(|(&near, &far)| match self.patch_values {
                        ProcessorPatchValues::OwnerCell => field.internal[near].clone(),
                        ProcessorPatchValues::Interpolated => {
                            field.internal[near].blend(&field.internal[far], 0.5)
                        }
                    })
                    .collect(),
            })
            .collect();
        Ok(VolField::new(field.name.clone(), internal, boundary))
    }

    /// Face values by signed `faceProcAddressing`.
    ///
    /// Oriented fields are negated on flipped faces; processor-patch values
    /// are the global internal-face values seen from this side.
    pub fn decompose_surface<T: FieldValue>(
        &self,
        field: &SurfaceField<T>,
    ) -> Result<SurfaceField<T>, MeshError> {
        field.check_mesh(self.global)?;
        let n_internal = self.piece.mesh.n_internal_faces();
        let internal = self.piece.addressing.face()[..n_internal]
            .iter()
            .map(|&sf| self.internal_face_value(field, sf))
            .collect();
        let boundary = self
            .patch_maps
            .iter()
            .map(|map| match map {
                PatchMap::Physical {
                    global_patch,
                    offsets,
                } => offsets
                    .iter()
                    .map(|&o| field.boundary[*global_patch][o].clone())
                    .collect(),
                PatchMap::Processor { faces, .. } => faces
                    .iter()
                    .map(|&sf| self.internal_face_value(field, sf))
                    .collect(),
            })
            .collect();
        Ok(SurfaceField::new(
            field.name.clone(),
            field.orientation,
            internal,
            boundary,
        ))
    }

    /// Point values by `pointProcAddressing`.
    pub fn decompose_point<T: FieldValue>(
        &self,
        field: &PointField<T>,
    ) -> Result<PointField<T>, MeshError> {
        field.check_mesh(self.global)?;
        let values = self
            .piece
            .addressing
            .point()
            .iter()
            .map(|&p| field.values[p].clone())
            .collect();
        Ok(PointField::new(field.name.clone(), values))
    }

    fn internal_face_value<T: FieldValue>(&self, field: &SurfaceField<T>, sf: SignedFace) -> T {
        let value = &field.internal[sf.index()];
        if sf.is_flipped() && field.is_oriented() {
            value.flipped()
        } else {
            value.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::decompose_mesh_with;
    use crate::field::FaceOrientation;
    use crate::topology::{CellOwnership, hex_lattice};

    fn two_slab_pieces() -> (PolyMesh, Vec<ProcMesh>) {
        let mesh = hex_lattice(2, 1, 1).unwrap();
        let own = CellOwnership::new(vec![0, 1], 2).unwrap();
        let procs = decompose_mesh_with(&mesh, &own, false).unwrap();
        (mesh, procs)
    }

    #[test]
    fn processor_patch_takes_near_cell_value() {
        let (mesh, procs) = two_slab_pieces();
        let field = VolField::from_cell_values("T", &mesh, vec![1.0, 3.0]).unwrap();
        for (piece, expected) in procs.iter().zip([1.0, 3.0]) {
            let dec = FieldDecomposer::new(&mesh, piece, ProcessorPatchValues::OwnerCell).unwrap();
            let local = dec.decompose_vol(&field).unwrap();
            local.check_mesh(&piece.mesh).unwrap();
            assert_eq!(local.boundary.last().unwrap(), &vec![expected]);
        }
    }

    #[test]
    fn interpolated_processor_values_meet_in_the_middle() {
        let (mesh, procs) = two_slab_pieces();
        let field = VolField::from_cell_values("T", &mesh, vec![1.0, 3.0]).unwrap();
        for piece in &procs {
            let dec =
                FieldDecomposer::new(&mesh, piece, ProcessorPatchValues::Interpolated).unwrap();
            let local = dec.decompose_vol(&field).unwrap();
            assert_eq!(local.boundary.last().unwrap(), &vec![2.0]);
        }
    }

    #[test]
    fn oriented_flux_is_negated_on_flipped_side() {
        let (mesh, procs) = two_slab_pieces();
        let values = vec![5.0; mesh.n_faces()];
        let oriented =
            SurfaceField::from_face_values("phi", FaceOrientation::Oriented, &mesh, values.clone())
                .unwrap();
        let unoriented =
            SurfaceField::from_face_values("w", FaceOrientation::Unoriented, &mesh, values).unwrap();
        let dec0 = FieldDecomposer::new(&mesh, &procs[0], ProcessorPatchValues::OwnerCell).unwrap();
        let dec1 = FieldDecomposer::new(&mesh, &procs[1], ProcessorPatchValues::OwnerCell).unwrap();
        assert_eq!(dec0.decompose_surface(&oriented).unwrap().boundary.last().unwrap(), &vec![5.0]);
        assert_eq!(dec1.decompose_surface(&oriented).unwrap().boundary.last().unwrap(), &vec![-5.0]);
        assert_eq!(dec1.decompose_surface(&unoriented).unwrap().boundary.last().unwrap(), &vec![5.0]);
    }

    #[test]
    fn point_field_is_gathered() {
        let (mesh, procs) = two_slab_pieces();
        let field = PointField::new("x", mesh.points().iter().map(|p| p[0]).collect::<Vec<_>>());
        let dec = FieldDecomposer::new(&mesh, &procs[1], ProcessorPatchValues::OwnerCell).unwrap();
        let local = dec.decompose_point(&field).unwrap();
        let xs: Vec<f64> = procs[1].mesh.points().iter().map(|p| p[0]).collect();
        assert_eq!(local.values, xs);
    }

    #[test]
    fn wrong_field_length_is_fatal() {
        let (mesh, procs) = two_slab_pieces();
        let dec = FieldDecomposer::new(&mesh, &procs[0], ProcessorPatchValues::OwnerCell).unwrap();
        let bad = VolField::new("T", vec![0.0; 3], vec![]);
        assert!(matches!(
            dec.decompose_vol(&bad),
            Err(MeshError::FieldLengthMismatch { expected: 2, found: 3, .. })
        ));
    }
}
