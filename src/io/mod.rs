//! Case I/O: the JSON case layout read and written by the pipeline.
//!
//! A case is a directory tree:
//! - `constant/polyMesh/{points,faces,owner,neighbour,boundary}.json`,
//! - `<time>/<field>.json` and `<time>/lagrangian/<cloud>/*.json`,
//! - `processor<N>/` holding the same layout for one subdomain plus the
//!   addressing tables and a `decomposition.json` metadata file.
//!
//! Writers never touch the disk directly: they queue serialized files in a
//! [`WriteBatch`], which the pipeline commits only after every processor
//! piece has been computed.

pub mod field_store;
pub mod mesh_io;
pub mod partitioned;

pub use field_store::{FieldHeader, FieldStore};
pub use mesh_io::{push_addressing, push_poly_mesh, read_addressing, read_poly_mesh};
pub use partitioned::{PartitionedCaseMetadata, push_processor_mesh, read_processor_mesh};

use crate::mesh_error::MeshError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

/// Deserialize one JSON file.
pub fn read_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, MeshError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|e| MeshError::io(path, e))?;
    serde_json::from_slice(&bytes).map_err(|e| MeshError::parse(path, e))
}

/// Serialized files waiting to be written.
#[derive(Debug, Default)]
pub struct WriteBatch {
    pending: Vec<(PathBuf, Vec<u8>)>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialize `value` now; write it to `path` on [`commit`](Self::commit).
    pub fn push_json<T: Serialize + ?Sized>(
        &mut self,
        path: impl Into<PathBuf>,
        value: &T,
    ) -> Result<(), MeshError> {
        let path = path.into();
        let bytes = serde_json::to_vec_pretty(value).map_err(|e| MeshError::parse(&path, e))?;
        self.pending.push((path, bytes));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.pending.iter().map(|(p, _)| p.as_path())
    }

    /// Create parent directories and write every queued file in order.
    ///
    /// Returns the number of files written.
    pub fn commit(self) -> Result<usize, MeshError> {
        let n = self.pending.len();
        for (path, bytes) in self.pending {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|e| MeshError::io(parent, e))?;
            }
            fs::write(&path, bytes).map_err(|e| MeshError::io(&path, e))?;
        }
        Ok(n)
    }
}

/// `<case>/processor<p>`.
pub fn processor_dir(case: impl AsRef<Path>, proc_id: usize) -> PathBuf {
    case.as_ref().join(format!("processor{proc_id}"))
}

/// Number of `processor<N>` directories directly under `case`.
pub fn count_processor_dirs(case: impl AsRef<Path>) -> Result<usize, MeshError> {
    let case = case.as_ref();
    let entries = fs::read_dir(case).map_err(|e| MeshError::io(case, e))?;
    let mut count = 0;
    for entry in entries {
        let entry = entry.map_err(|e| MeshError::io(case, e))?;
        let is_dir = entry.file_type().map_err(|e| MeshError::io(entry.path(), e))?.is_dir();
        let name = entry.file_name();
        let is_processor = name
            .to_str()
            .and_then(|n| n.strip_prefix("processor"))
            .is_some_and(|rank| !rank.is_empty() && rank.bytes().all(|b| b.is_ascii_digit()));
        if is_dir && is_processor {
            count += 1;
        }
    }
    Ok(count)
}

/// Sorted names of the entries of `dir` that satisfy `keep`.
pub(crate) fn list_dir(
    dir: &Path,
    keep: impl Fn(&fs::FileType, &str) -> bool,
) -> Result<Vec<String>, MeshError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| MeshError::io(dir, e))? {
        let entry = entry.map_err(|e| MeshError::io(dir, e))?;
        let file_type = entry.file_type().map_err(|e| MeshError::io(entry.path(), e))?;
        if let Some(name) = entry.file_name().to_str() {
            if keep(&file_type, name) {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}
