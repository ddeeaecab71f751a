//! Gather per-processor fields back into global fields.
//!
//! Pieces are passed in rank order, `None` for a processor that has no data
//! for the field. Cells are owned by exactly one processor. Cut faces are
//! taken from the side whose address carries a positive sign; the other
//! side's processor-patch value is a placeholder and is discarded. Points
//! shared by several processors are resolved by [`PointArbitration`].

use crate::addressing::PatchAddress;
use crate::algs::ProcMesh;
use crate::field::{FaceOrientation, FieldValue, MeshField, PointField, SurfaceField, VolField};
use crate::mesh_error::{FieldCategory, MeshError};
use crate::topology::PolyMesh;
use log::warn;
use serde::{Deserialize, Serialize};

/// Tie-break for points present on more than one processor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointArbitration {
    /// The lowest-ranked processor holding the point provides its value.
    #[default]
    LowestRank,
    /// All processors holding the point must agree exactly.
    RequireAgreement,
}

/// Where the faces of one local physical patch sit inside the global patch.
#[derive(Clone, Debug)]
struct PhysicalSlice {
    global_patch: usize,
    offsets: Vec<usize>,
}

/// Reconstructs fields of one global mesh from its processor pieces.
#[derive(Clone, Debug)]
pub struct FieldReconstructor<'a> {
    global: &'a PolyMesh,
    procs: &'a [ProcMesh],
    arbitration: PointArbitration,
    /// Per processor, per local patch; `None` for processor patches.
    physical: Vec<Vec<Option<PhysicalSlice>>>,
}

impl<'a> FieldReconstructor<'a> {
    pub fn new(
        global: &'a PolyMesh,
        procs: &'a [ProcMesh],
        arbitration: PointArbitration,
    ) -> Result<Self, MeshError> {
        let physical = procs
            .iter()
            .map(|piece| {
                piece.addressing.check_local(&piece.mesh)?;
                piece.addressing.check_global(global)?;
                physical_slices(global, piece)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            global,
            procs,
            arbitration,
            physical,
        })
    }

    pub fn n_procs(&self) -> usize {
        self.procs.len()
    }

    pub fn reconstruct_vol<T: FieldValue>(
        &self,
        name: &str,
        pieces: &[Option<VolField<T>>],
    ) -> Result<VolField<T>, MeshError> {
        self.check_count(pieces.len())?;
        let mut internal: Vec<Option<T>> = vec![None; self.global.n_cells()];
        let mut boundary = self.empty_boundary::<T>();

        for (p, (piece, field)) in self.procs.iter().zip(pieces).enumerate() {
            let Some(field) = self.present(piece, field, piece.mesh.n_cells(), name)? else {
                continue;
            };
            for (local, &global) in piece.addressing.cell().iter().enumerate() {
                internal[global] = Some(field.internal[local].clone());
            }
            self.scatter_physical(p, &field.boundary, &mut boundary);
        }

        Ok(VolField::new(
            name,
            complete(name, FieldCategory::Vol, internal, 0)?,
            self.complete_boundary(name, FieldCategory::Vol, boundary)?,
        ))
    }

    pub fn reconstruct_surface<T: FieldValue>(
        &self,
        name: &str,
        pieces: &[Option<SurfaceField<T>>],
    ) -> Result<SurfaceField<T>, MeshError> {
        self.check_count(pieces.len())?;
        let orientation = common_orientation(name, self.procs, pieces)?;
        let unflip = |value: &T, flipped: bool| {
            if flipped && orientation == FaceOrientation::Oriented {
                value.flipped()
            } else {
                value.clone()
            }
        };

        let mut internal: Vec<Option<T>> = vec![None; self.global.n_internal_faces()];
        let mut boundary = self.empty_boundary::<T>();

        for (p, (piece, field)) in self.procs.iter().zip(pieces).enumerate() {
            let n_faces = piece.mesh.n_faces();
            let Some(field) = self.present(piece, field, n_faces, name)? else {
                continue;
            };
            let faces = piece.addressing.face();
            for (local, value) in field.internal.iter().enumerate() {
                let sf = faces[local];
                internal[sf.index()] = Some(unflip(value, sf.is_flipped()));
            }
            self.scatter_physical(p, &field.boundary, &mut boundary);
            let patches = piece.mesh.patches().iter().zip(piece.addressing.boundary());
            for ((patch, address), values) in patches.zip(&field.boundary) {
                if !address.is_processor() {
                    continue;
                }
                for (sf, value) in faces[patch.range()].iter().zip(values) {
                    if !sf.is_flipped() {
                        internal[sf.index()] = Some(value.clone());
                    }
                }
            }
        }

        Ok(SurfaceField::new(
            name,
            orientation,
            complete(name, FieldCategory::Surface, internal, 0)?,
            self.complete_boundary(name, FieldCategory::Surface, boundary)?,
        ))
    }

    pub fn reconstruct_point<T: FieldValue>(
        &self,
        name: &str,
        pieces: &[Option<PointField<T>>],
    ) -> Result<PointField<T>, MeshError> {
        self.check_count(pieces.len())?;
        let mut values: Vec<Option<(T, usize)>> = vec![None; self.global.n_points()];

        for (piece, field) in self.procs.iter().zip(pieces) {
            let rank = piece.proc_id();
            let Some(field) = self.present(piece, field, piece.mesh.n_points(), name)? else {
                continue;
            };
            for (local, &global) in piece.addressing.point().iter().enumerate() {
                let value = &field.values[local];
                match &values[global] {
                    None => values[global] = Some((value.clone(), rank)),
                    Some((held, holder)) => {
                        if self.arbitration == PointArbitration::RequireAgreement && held != value {
                            return Err(MeshError::PointValueConflict {
                                field: name.to_string(),
                                point: global,
                                first: *holder,
                                second: rank,
                            });
                        }
                    }
                }
            }
        }

        let values = values.into_iter().map(|v| v.map(|(value, _)| value)).collect();
        Ok(PointField::new(
            name,
            complete(name, FieldCategory::Point, values, 0)?,
        ))
    }

    fn check_count(&self, found: usize) -> Result<(), MeshError> {
        if found != self.procs.len() {
            return Err(MeshError::ProcessorCountMismatch {
                expected: self.procs.len(),
                found,
            });
        }
        Ok(())
    }

    /// Validate a present piece; log a missing one that should have had data.
    fn present<'f, F: MeshField>(
        &self,
        piece: &ProcMesh,
        field: &'f Option<F>,
        n_entities: usize,
        name: &str,
    ) -> Result<Option<&'f F>, MeshError> {
        match field {
            Some(field) => {
                field.check_mesh(&piece.mesh)?;
                Ok(Some(field))
            }
            None => {
                if n_entities > 0 {
                    warn!(
                        "processor {}: {} field `{name}` missing, treating it as empty",
                        piece.proc_id(),
                        F::CATEGORY
                    );
                }
                Ok(None)
            }
        }
    }

    fn empty_boundary<T: Clone>(&self) -> Vec<Vec<Option<T>>> {
        self.global
            .patches()
            .iter()
            .map(|p| vec![None; p.size])
            .collect()
    }

    fn scatter_physical<T: Clone>(
        &self,
        proc: usize,
        local_boundary: &[Vec<T>],
        boundary: &mut [Vec<Option<T>>],
    ) {
        for (slice, values) in self.physical[proc].iter().zip(local_boundary) {
            let Some(slice) = slice else {
                continue;
            };
            let target = &mut boundary[slice.global_patch];
            for (&offset, value) in slice.offsets.iter().zip(values) {
                target[offset] = Some(value.clone());
            }
        }
    }

    fn complete_boundary<T>(
        &self,
        name: &str,
        category: FieldCategory,
        boundary: Vec<Vec<Option<T>>>,
    ) -> Result<Vec<Vec<T>>, MeshError> {
        self.global
            .patches()
            .iter()
            .zip(boundary)
            .map(|(patch, values)| complete(name, category, values, patch.start))
            .collect()
    }
}

/// Check that every face of `piece` lands where a field value can go back:
/// internal and processor-patch faces on global internal faces, physical
/// patch faces inside their global patch.
fn physical_slices(
    global: &PolyMesh,
    piece: &ProcMesh,
) -> Result<Vec<Option<PhysicalSlice>>, MeshError> {
    let faces = piece.addressing.face();
    let n_internal = global.n_internal_faces();
    let out_of_range = |local: usize, face: usize, size: usize| MeshError::AddressingOutOfRange {
        table: "faceProcAddressing",
        local,
        global: face,
        size,
    };
    for (local, sf) in faces[..piece.mesh.n_internal_faces()].iter().enumerate() {
        if sf.index() >= n_internal {
            return Err(out_of_range(local, sf.index(), n_internal));
        }
    }

    piece
        .mesh
        .patches()
        .iter()
        .zip(piece.addressing.boundary())
        .map(|(patch, address)| -> Result<Option<PhysicalSlice>, MeshError> {
            let patch_faces = faces[patch.range()].iter().enumerate();
            match *address {
                PatchAddress::Global(g) => {
                    let target = &global.patches()[g];
                    let offsets = patch_faces
                        .map(|(i, sf)| {
                            let f = sf.index();
                            if target.range().contains(&f) {
                                Ok(f - target.start)
                            } else {
                                Err(out_of_range(patch.start + i, f, target.start + target.size))
                            }
                        })
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(Some(PhysicalSlice {
                        global_patch: g,
                        offsets,
                    }))
                }
                PatchAddress::Processor => {
                    for (i, sf) in patch_faces {
                        if sf.index() >= n_internal {
                            return Err(out_of_range(patch.start + i, sf.index(), n_internal));
                        }
                    }
                    Ok(None)
                }
            }
        })
        .collect()
}

/// Orientation shared by every present piece; oriented when none is present.
fn common_orientation<T>(
    name: &str,
    procs: &[ProcMesh],
    pieces: &[Option<SurfaceField<T>>],
) -> Result<FaceOrientation, MeshError> {
    let mut present = procs
        .iter()
        .zip(pieces)
        .filter_map(|(piece, field)| field.as_ref().map(|f| (piece.proc_id(), f.orientation)));
    let Some((_, expected)) = present.next() else {
        return Ok(FaceOrientation::Oriented);
    };
    for (proc, found) in present {
        if found != expected {
            return Err(MeshError::OrientationMismatch {
                field: name.to_string(),
                proc,
                expected,
                found,
            });
        }
    }
    Ok(expected)
}

/// Turn gathered slots into values, reporting uncovered entries.
///
/// `base` is added to the reported index, so boundary slots are reported
/// by global face index.
fn complete<T>(
    name: &str,
    category: FieldCategory,
    slots: Vec<Option<T>>,
    base: usize,
) -> Result<Vec<T>, MeshError> {
    let missing = slots.iter().filter(|s| s.is_none()).count();
    if missing > 0 {
        let first = slots.iter().position(Option::is_none).unwrap_or(0) + base;
        return Err(MeshError::IncompleteReconstruction {
            field: name.to_string(),
            category,
            missing,
            first,
        });
    }
    Ok(slots.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::{FieldDecomposer, ProcessorPatchValues, decompose_mesh_with};
    use crate::topology::{CellOwnership, hex_lattice};

    fn pieces() -> (PolyMesh, Vec<ProcMesh>) {
        let mesh = hex_lattice(3, 1, 1).unwrap();
        let own = CellOwnership::new(vec![0, 1, 2], 3).unwrap();
        let procs = decompose_mesh_with(&mesh, &own, false).unwrap();
        (mesh, procs)
    }

    fn point_pieces(procs: &[ProcMesh], rank_bias: bool) -> Vec<Option<PointField<f64>>> {
        procs
            .iter()
            .map(|p| {
                let values = p
                    .addressing
                    .point()
                    .iter()
                    .map(|&g| g as f64 + if rank_bias { p.proc_id() as f64 * 0.5 } else { 0.0 })
                    .collect();
                Some(PointField::new("d", values))
            })
            .collect()
    }

    #[test]
    fn shared_points_take_lowest_rank() {
        let (mesh, procs) = pieces();
        let rec = FieldReconstructor::new(&mesh, &procs, PointArbitration::LowestRank).unwrap();
        let field = rec.reconstruct_point("d", &point_pieces(&procs, true)).unwrap();
        // x = 1 plane is shared by processors 0 and 1; processor 0 wins
        let shared = mesh.points().iter().position(|p| p == &[1.0, 0.0, 0.0]).unwrap();
        assert_eq!(field.values[shared], shared as f64);
        // x = 2 plane is shared by processors 1 and 2; processor 1 wins
        let shared = mesh.points().iter().position(|p| p == &[2.0, 1.0, 1.0]).unwrap();
        assert_eq!(field.values[shared], shared as f64 + 0.5);
    }

    #[test]
    fn disagreeing_points_rejected_when_agreement_required() {
        let (mesh, procs) = pieces();
        let rec =
            FieldReconstructor::new(&mesh, &procs, PointArbitration::RequireAgreement).unwrap();
        assert!(rec.reconstruct_point("d", &point_pieces(&procs, false)).is_ok());
        let err = rec.reconstruct_point("d", &point_pieces(&procs, true)).unwrap_err();
        assert!(matches!(
            err,
            MeshError::PointValueConflict { first: 0, second: 1, .. }
        ));
    }

    #[test]
    fn missing_piece_with_cells_leaves_field_incomplete() {
        let (mesh, procs) = pieces();
        let global = VolField::from_cell_values("T", &mesh, vec![1.0, 2.0, 3.0]).unwrap();
        let mut local: Vec<Option<VolField<f64>>> = procs
            .iter()
            .map(|p| {
                let dec = FieldDecomposer::new(&mesh, p, ProcessorPatchValues::OwnerCell).unwrap();
                Some(dec.decompose_vol(&global).unwrap())
            })
            .collect();
        let rec = FieldReconstructor::new(&mesh, &procs, PointArbitration::LowestRank).unwrap();
        assert_eq!(rec.reconstruct_vol("T", &local).unwrap(), global);

        local[1] = None;
        assert_eq!(
            rec.reconstruct_vol("T", &local),
            Err(MeshError::IncompleteReconstruction {
                field: "T".into(),
                category: FieldCategory::Vol,
                missing: 1,
                first: 1,
            })
        );
        assert_eq!(
            rec.reconstruct_vol("T", &local[..2]),
            Err(MeshError::ProcessorCountMismatch {
                expected: 3,
                found: 2
            })
        );
    }

    #[test]
    fn pieces_of_another_mesh_are_rejected_up_front() {
        let small = hex_lattice(2, 1, 1).unwrap();
        let own = CellOwnership::new(vec![0, 1], 2).unwrap();
        let procs = decompose_mesh_with(&small, &own, false).unwrap();
        let larger = hex_lattice(3, 1, 1).unwrap();
        let err = FieldReconstructor::new(&larger, &procs, PointArbitration::LowestRank).unwrap_err();
        assert!(matches!(
            err,
            MeshError::AddressingOutOfRange {
                table: "faceProcAddressing",
                ..
            }
        ));
    }

    #[test]
    fn surface_pieces_must_share_one_orientation() {
        let (mesh, procs) = pieces();
        let phi = SurfaceField::from_face_values(
            "phi",
            FaceOrientation::Oriented,
            &mesh,
            (0..mesh.n_faces()).map(|f| f as f64 + 1.0).collect(),
        )
        .unwrap();
        let mut local: Vec<Option<SurfaceField<f64>>> = procs
            .iter()
            .map(|p| {
                let dec = FieldDecomposer::new(&mesh, p, ProcessorPatchValues::OwnerCell).unwrap();
                Some(dec.decompose_surface(&phi).unwrap())
            })
            .collect();
        let rec = FieldReconstructor::new(&mesh, &procs, PointArbitration::LowestRank).unwrap();
        assert_eq!(rec.reconstruct_surface("phi", &local).unwrap(), phi);

        if let Some(field) = local[2].as_mut() {
            field.orientation = FaceOrientation::Unoriented;
        }
        assert_eq!(
            rec.reconstruct_surface("phi", &local),
            Err(MeshError::OrientationMismatch {
                field: "phi".into(),
                proc: 2,
                expected: FaceOrientation::Oriented,
                found: FaceOrientation::Unoriented,
            })
        );
    }
}
