//! MeshError: unified error type for mesh-decompose public APIs
//!
//! Every decomposition and reconstruction entry point returns this error
//! instead of panicking. Any variant aborts the whole run: a partially
//! decomposed case is never written.

use crate::field::FaceOrientation;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Topological category of a mesh-attached field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldCategory {
    /// One value per cell plus boundary values per patch face.
    Vol,
    /// One value per internal face plus boundary values per patch face.
    Surface,
    /// One value per mesh point.
    Point,
}

impl fmt::Display for FieldCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldCategory::Vol => "vol",
            FieldCategory::Surface => "surface",
            FieldCategory::Point => "point",
        };
        f.write_str(name)
    }
}

/// Unified error type for mesh-decompose operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MeshError {
    // --- configuration -----------------------------------------------------
    /// Decomposition requested onto zero processors.
    #[error("number of subdomains must be at least 1")]
    NoProcessors,
    /// A cell→processor entry is outside `[0, n_procs)`.
    #[error("cell {cell} assigned to processor {proc}, but only {n_procs} processors exist")]
    ProcessorOutOfRange {
        cell: usize,
        proc: usize,
        n_procs: usize,
    },
    /// The cell→processor map does not cover the mesh exactly.
    #[error("cell→processor map has {found} entries, mesh has {expected} cells")]
    CellMapLengthMismatch { expected: usize, found: usize },
    /// Number of processor pieces differs from what was requested.
    #[error("expected {expected} processor subdomains, found {found}")]
    ProcessorCountMismatch { expected: usize, found: usize },
    /// Any other rejected configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // --- structural ----------------------------------------------------------
    /// A face references a cell that does not exist.
    #[error("face {face} references cell {cell}, mesh has {n_cells} cells")]
    FaceCellOutOfRange {
        face: usize,
        cell: usize,
        n_cells: usize,
    },
    /// A face references a point that does not exist.
    #[error("face {face} references point {point}, mesh has {n_points} points")]
    FacePointOutOfRange {
        face: usize,
        point: usize,
        n_points: usize,
    },
    /// A face has fewer than three points.
    #[error("face {face} has {n_points} points (at least 3 required)")]
    DegenerateFace { face: usize, n_points: usize },
    /// Patches are not contiguous, ordered, and closing the face list.
    #[error("patch `{patch}` starts at face {found}, expected {expected}")]
    PatchLayout {
        patch: String,
        expected: usize,
        found: usize,
    },
    /// A face point is missing from the processor's point set after renumbering.
    #[error("processor {proc}: face {face} uses global point {point} absent from the local point set")]
    MissingLocalPoint {
        proc: usize,
        face: usize,
        point: usize,
    },
    /// An addressing table has the wrong length for its mesh or field.
    #[error("{table}: expected {expected} entries, found {found}")]
    AddressingLengthMismatch {
        table: &'static str,
        expected: usize,
        found: usize,
    },
    /// An addressing entry points outside the global index space.
    #[error("{table}[{local}] = {global} exceeds global size {size}")]
    AddressingOutOfRange {
        table: &'static str,
        local: usize,
        global: usize,
        size: usize,
    },
    /// Two local entries of one table map to the same global entity.
    #[error("{table}: global index {global} appears more than once")]
    DuplicateAddress { table: &'static str, global: usize },
    /// A sign-encoded face index of zero was read.
    #[error("signed face index {0} is invalid (0 is reserved)")]
    InvalidSignedFace(i64),
    /// A boundary addressing entry is neither a patch index nor the processor sentinel.
    #[error("boundary addressing entry {0} is invalid (expected >= 0 or -1)")]
    InvalidPatchAddress(i64),
    /// A field's data length does not match the mesh it is defined on.
    #[error("field `{field}`: expected {expected} values, found {found}")]
    FieldLengthMismatch {
        field: String,
        expected: usize,
        found: usize,
    },
    /// A particle sits in a cell that does not exist in the mesh.
    #[error("particle {particle} references cell {cell}, mesh has {n_cells} cells")]
    StaleParticleCell {
        particle: usize,
        cell: usize,
        n_cells: usize,
    },
    /// Particle indices of the processor clouds do not form a permutation.
    #[error("particle index {index} is duplicated or out of range ({total} particles)")]
    ParticleIndexConflict { index: usize, total: usize },
    /// Reconstruction left global entries without a contributing processor.
    #[error("{category} field `{field}`: {missing} global entries uncovered (first: {first})")]
    IncompleteReconstruction {
        field: String,
        category: FieldCategory,
        missing: usize,
        first: usize,
    },
    /// Mesh reconstruction left global points, faces or cells without a source.
    #[error("reconstructed mesh: {missing} {entity} uncovered (first: {first})")]
    IncompleteMesh {
        entity: &'static str,
        missing: usize,
        first: usize,
    },
    /// Two processors disagree on the value of a shared point.
    #[error("field `{field}`: point {point} differs between processors {first} and {second}")]
    PointValueConflict {
        field: String,
        point: usize,
        first: usize,
        second: usize,
    },

    // --- contract ------------------------------------------------------------
    /// A field of one category was handed to a path expecting another.
    #[error("field `{field}` is a {found} field, expected a {expected} field")]
    CategoryMismatch {
        field: String,
        expected: FieldCategory,
        found: FieldCategory,
    },
    /// A field's stored value type differs from the requested one.
    #[error("field `{field}` holds {found} values, expected {expected}")]
    ValueTypeMismatch {
        field: String,
        expected: String,
        found: String,
    },

    /// Processor pieces of one surface field disagree on its orientation.
    #[error("surface field `{field}` is {found:?} on processor {proc}, but {expected:?} on earlier processors")]
    OrientationMismatch {
        field: String,
        proc: usize,
        expected: FaceOrientation,
        found: FaceOrientation,
    },

    // --- i/o -----------------------------------------------------------------
    /// Filesystem failure.
    #[error("I/O error at {}: {message}", path.display())]
    Io { path: PathBuf, message: String },
    /// Malformed file content.
    #[error("parse error in {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },
}

impl MeshError {
    /// Wrap an [`std::io::Error`] with the path it occurred on.
    pub fn io(path: impl AsRef<Path>, err: std::io::Error) -> Self {
        MeshError::Io {
            path: path.as_ref().to_path_buf(),
            message: err.to_string(),
        }
    }

    /// Wrap a deserialization failure with the path it occurred on.
    pub fn parse(path: impl AsRef<Path>, err: impl fmt::Display) -> Self {
        MeshError::Parse {
            path: path.as_ref().to_path_buf(),
            message: err.to_string(),
        }
    }
}
