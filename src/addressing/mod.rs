//! Per-processor addressing tables.
//!
//! Every decomposed processor piece carries four local→global maps:
//! points, sign-encoded faces, cells, and boundary patches. They are
//! produced once by mesh decomposition and then only read, both to split
//! fields onto processors and to gather them back.

pub mod signed_face;

pub use signed_face::SignedFace;

use crate::debug_invariants::DebugInvariants;
use crate::mesh_error::MeshError;
use crate::topology::PolyMesh;
use hashbrown::HashSet;
use std::fmt;

/// Global counterpart of a local boundary patch.
///
/// Synthesized processor patches have no global patch; on disk they are
/// written with the sentinel `-1`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum PatchAddress {
    Global(usize),
    Processor,
}

impl PatchAddress {
    pub const PROCESSOR_SENTINEL: i64 = -1;

    pub fn global(self) -> Option<usize> {
        match self {
            PatchAddress::Global(patch) => Some(patch),
            PatchAddress::Processor => None,
        }
    }

    pub fn is_processor(self) -> bool {
        matches!(self, PatchAddress::Processor)
    }
}

impl TryFrom<i64> for PatchAddress {
    type Error = MeshError;

    fn try_from(raw: i64) -> Result<Self, Self::Error> {
        match raw {
            Self::PROCESSOR_SENTINEL => Ok(PatchAddress::Processor),
            r if r >= 0 => Ok(PatchAddress::Global(r as usize)),
            r => Err(MeshError::InvalidPatchAddress(r)),
        }
    }
}

impl From<PatchAddress> for i64 {
    fn from(addr: PatchAddress) -> i64 {
        match addr {
            PatchAddress::Global(patch) => patch as i64,
            PatchAddress::Processor => PatchAddress::PROCESSOR_SENTINEL,
        }
    }
}

impl fmt::Display for PatchAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", i64::from(*self))
    }
}

/// Local→global maps of one processor piece.
///
/// # Invariants
/// - Each table is injective: no two local entries name the same global entity.
/// - A flipped `face` entry means the local owner is the global neighbour.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcAddressing {
    proc_id: usize,
    point: Vec<usize>,
    face: Vec<SignedFace>,
    cell: Vec<usize>,
    boundary: Vec<PatchAddress>,
}

impl ProcAddressing {
    /// Assemble and validate the tables of processor `proc_id`.
    pub fn new(
        proc_id: usize,
        point: Vec<usize>,
        face: Vec<SignedFace>,
        cell: Vec<usize>,
        boundary: Vec<PatchAddress>,
    ) -> Result<Self, MeshError> {
        let addr = Self {
            proc_id,
            point,
            face,
            cell,
            boundary,
        };
        addr.validate_invariants()?;
        Ok(addr)
    }

    pub fn proc_id(&self) -> usize {
        self.proc_id
    }

    /// `pointProcAddressing`: local point → global point.
    pub fn point(&self) -> &[usize] {
        &self.point
    }

    /// `faceProcAddressing`: local face → signed global face.
    pub fn face(&self) -> &[SignedFace] {
        &self.face
    }

    /// `cellProcAddressing`: local cell → global cell.
    pub fn cell(&self) -> &[usize] {
        &self.cell
    }

    /// `boundaryProcAddressing`: local patch → global patch or processor sentinel.
    pub fn boundary(&self) -> &[PatchAddress] {
        &self.boundary
    }

    /// Check table lengths against the local mesh they describe.
    pub fn check_local(&self, local: &PolyMesh) -> Result<(), MeshError> {
        check_len("pointProcAddressing", local.n_points(), self.point.len())?;
        check_len("faceProcAddressing", local.n_faces(), self.face.len())?;
        check_len("cellProcAddressing", local.n_cells(), self.cell.len())?;
        check_len("boundaryProcAddressing", local.patches().len(), self.boundary.len())
    }

    /// Check every entry falls inside the global mesh's index spaces.
    pub fn check_global(&self, global: &PolyMesh) -> Result<(), MeshError> {
        check_range("pointProcAddressing", self.point.iter().copied(), global.n_points())?;
        check_range(
            "faceProcAddressing",
            self.face.iter().map(|f| f.index()),
            global.n_faces(),
        )?;
        check_range("cellProcAddressing", self.cell.iter().copied(), global.n_cells())?;
        check_range(
            "boundaryProcAddressing",
            self.boundary.iter().filter_map(|b| b.global()),
            global.patches().len(),
        )
    }
}

impl DebugInvariants for ProcAddressing {
    fn validate_invariants(&self) -> Result<(), MeshError> {
        check_injective("pointProcAddressing", self.point.iter().copied())?;
        check_injective("faceProcAddressing", self.face.iter().map(|f| f.index()))?;
        check_injective("cellProcAddressing", self.cell.iter().copied())?;
        check_injective(
            "boundaryProcAddressing",
            self.boundary.iter().filter_map(|b| b.global()),
        )
    }
}

fn check_len(table: &'static str, expected: usize, found: usize) -> Result<(), MeshError> {
    if expected != found {
        return Err(MeshError::AddressingLengthMismatch {
            table,
            expected,
            found,
        });
    }
    Ok(())
}

fn check_range(
    table: &'static str,
    entries: impl Iterator<Item = usize>,
    size: usize,
) -> Result<(), MeshError> {
    for (local, global) in entries.enumerate() {
        if global >= size {
            return Err(MeshError::AddressingOutOfRange {
                table,
                local,
                global,
                size,
            });
        }
    }
    Ok(())
}

fn check_injective(
    table: &'static str,
    entries: impl Iterator<Item = usize>,
) -> Result<(), MeshError> {
    let mut seen = HashSet::new();
    for global in entries {
        if !seen.insert(global) {
            return Err(MeshError::DuplicateAddress { table, global });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_sentinel_round_trips() {
        let json = serde_json::to_string(&vec![
            PatchAddress::Global(0),
            PatchAddress::Global(3),
            PatchAddress::Processor,
        ])
        .unwrap();
        assert_eq!(json, "[0,3,-1]");
        let back: Vec<PatchAddress> = serde_json::from_str(&json).unwrap();
        assert!(back[2].is_processor());
        assert_eq!(
            PatchAddress::try_from(-2),
            Err(MeshError::InvalidPatchAddress(-2))
        );
    }

    #[test]
    fn duplicate_face_is_rejected_regardless_of_sign() {
        let err = ProcAddressing::new(
            0,
            vec![0, 1, 2],
            vec![SignedFace::new(4, false), SignedFace::new(4, true)],
            vec![0],
            vec![],
        )
        .unwrap_err();
        assert_eq!(
            err,
            MeshError::DuplicateAddress {
                table: "faceProcAddressing",
                global: 4
            }
        );
    }

    #[test]
    fn processor_sentinels_may_repeat() {
        let addr = ProcAddressing::new(
            1,
            vec![],
            vec![],
            vec![],
            vec![PatchAddress::Global(0), PatchAddress::Processor, PatchAddress::Processor],
        )
        .unwrap();
        assert_eq!(addr.proc_id(), 1);
        assert_eq!(addr.boundary().len(), 3);
    }
}
