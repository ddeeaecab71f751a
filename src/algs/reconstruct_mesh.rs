//! Rebuild the global mesh from processor pieces.
//!
//! The inverse of [`decompose_mesh`](crate::algs::decompose_mesh): processor
//! patches are dropped and every cut face is restored as an internal face.
//! The side holding the face with a positive sign provides its point order
//! and owner; the negative side provides the neighbour.

use crate::addressing::PatchAddress;
use crate::algs::ProcMesh;
use crate::debug_invariants::DebugInvariants;
use crate::mesh_error::MeshError;
use crate::topology::{BoundaryPatch, Face, PatchKind, Point, PolyMesh};

/// Global face slots gathered from all pieces.
struct FaceSlots {
    points: Vec<Option<Face>>,
    owner: Vec<Option<usize>>,
    neighbour: Vec<Option<usize>>,
    patch: Vec<Option<usize>>,
}

impl FaceSlots {
    fn with_len(n: usize) -> Self {
        Self {
            points: vec![None; n],
            owner: vec![None; n],
            neighbour: vec![None; n],
            patch: vec![None; n],
        }
    }
}

pub fn reconstruct_mesh(procs: &[ProcMesh]) -> Result<PolyMesh, MeshError> {
    let template = procs.first().ok_or(MeshError::NoProcessors)?;
    let global_patches = patch_template(template)?;

    let n_points = global_size(procs.iter().flat_map(|p| p.addressing.point().iter().copied()));
    let n_faces = global_size(procs.iter().flat_map(|p| p.addressing.face().iter().map(|f| f.index())));
    let n_cells = global_size(procs.iter().flat_map(|p| p.addressing.cell().iter().copied()));

    let mut points: Vec<Option<Point>> = vec![None; n_points];
    let mut cells = vec![false; n_cells];
    let mut slots = FaceSlots::with_len(n_faces);

    for piece in procs {
        let local = &piece.mesh;
        let addr = &piece.addressing;
        addr.check_local(local)?;

        for (lp, &g) in addr.point().iter().enumerate() {
            points[g].get_or_insert(local.points()[lp]);
        }
        for &c in addr.cell() {
            cells[c] = true;
        }

        let globalize = |lf: usize| -> Face {
            let mut pts: Face = local.faces()[lf].iter().map(|&p| addr.point()[p]).collect();
            if addr.face()[lf].is_flipped() {
                pts[1..].reverse();
            }
            pts
        };
        let cell_of = |lc: usize| addr.cell()[lc];

        for lf in 0..local.n_internal_faces() {
            let sf = addr.face()[lf];
            let (own, nbr) = (cell_of(local.owner()[lf]), cell_of(local.neighbour()[lf]));
            let g = sf.index();
            slots.points[g] = Some(globalize(lf));
            if sf.is_flipped() {
                slots.owner[g] = Some(nbr);
                slots.neighbour[g] = Some(own);
            } else {
                slots.owner[g] = Some(own);
                slots.neighbour[g] = Some(nbr);
            }
        }

        for (patch, address) in local.patches().iter().zip(addr.boundary()) {
            match *address {
                PatchAddress::Global(gp) => {
                    let expected = global_patches.get(gp).map(|(name, _)| name.as_str());
                    if expected != Some(patch.name.as_str()) {
                        return Err(MeshError::PatchLayout {
                            patch: patch.name.clone(),
                            expected: gp,
                            found: global_patches.len(),
                        });
                    }
                    for lf in patch.range() {
                        let g = addr.face()[lf].index();
                        slots.points[g] = Some(globalize(lf));
                        slots.owner[g] = Some(cell_of(local.owner()[lf]));
                        slots.patch[g] = Some(gp);
                    }
                }
                PatchAddress::Processor => {
                    for lf in patch.range() {
                        let sf = addr.face()[lf];
                        let cell = cell_of(local.owner()[lf]);
                        if sf.is_flipped() {
                            slots.neighbour[sf.index()] = Some(cell);
                        } else {
                            slots.points[sf.index()] = Some(globalize(lf));
                            slots.owner[sf.index()] = Some(cell);
                        }
                    }
                }
            }
        }
    }

    let points = complete("points", points)?;
    if let Some(first) = cells.iter().position(|&seen| !seen) {
        return Err(MeshError::IncompleteMesh {
            entity: "cells",
            missing: cells.iter().filter(|&&seen| !seen).count(),
            first,
        });
    }
    let faces = complete("faces", slots.points)?;
    let owner = complete("face owners", slots.owner)?;

    let n_internal = slots.neighbour.iter().filter(|n| n.is_some()).count();
    if let Some(stray) = slots.neighbour[n_internal..].iter().position(Option::is_some) {
        return Err(MeshError::PatchLayout {
            patch: "<internal faces>".into(),
            expected: n_internal,
            found: n_internal + stray,
        });
    }
    let neighbour: Vec<usize> = slots.neighbour.into_iter().flatten().collect();
    let face_patch = complete("boundary faces", slots.patch.split_off(n_internal))?;

    let mut patches = Vec::with_capacity(global_patches.len());
    let mut cursor = n_internal;
    for (gp, (name, kind)) in global_patches.into_iter().enumerate() {
        let size = face_patch.iter().filter(|&&p| p == gp).count();
        if let Some(offset) = face_patch[cursor - n_internal..cursor - n_internal + size]
            .iter()
            .position(|&p| p != gp)
        {
            return Err(MeshError::PatchLayout {
                patch: name,
                expected: cursor,
                found: cursor + offset,
            });
        }
        patches.push(BoundaryPatch::new(name, kind, cursor, size));
        cursor += size;
    }

    let mesh = PolyMesh::new(points, faces, owner, neighbour, patches, n_cells)?;
    mesh.debug_assert_invariants();
    Ok(mesh)
}

/// Physical patches of the first piece, in global patch order.
fn patch_template(piece: &ProcMesh) -> Result<Vec<(String, PatchKind)>, MeshError> {
    let mut out = Vec::new();
    for (patch, address) in piece.mesh.patches().iter().zip(piece.addressing.boundary()) {
        if let PatchAddress::Global(gp) = *address {
            if gp != out.len() {
                return Err(MeshError::PatchLayout {
                    patch: patch.name.clone(),
                    expected: out.len(),
                    found: gp,
                });
            }
            out.push((patch.name.clone(), patch.kind.clone()));
        }
    }
    Ok(out)
}

fn global_size(entries: impl Iterator<Item = usize>) -> usize {
    entries.max().map_or(0, |g| g + 1)
}

fn complete<T>(entity: &'static str, slots: Vec<Option<T>>) -> Result<Vec<T>, MeshError> {
    if let Some(first) = slots.iter().position(Option::is_none) {
        return Err(MeshError::IncompleteMesh {
            entity,
            missing: slots.iter().filter(|s| s.is_none()).count(),
            first,
        });
    }
    Ok(slots.into_iter().flatten().collect())
}
