//! Decomposition settings, read from `<case>/system/decomposeParDict.json`.

use crate::algs::{PointArbitration, ProcessorPatchValues};
use crate::io::read_json;
use crate::mesh_error::MeshError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Location of the settings file inside a case.
pub const DICT_PATH: &str = "system/decomposeParDict.json";

/// How cells are assigned to processors.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DecompositionMethod {
    /// Equal-count geometric split into `n[0] × n[1] × n[2]` blocks.
    Simple { n: [usize; 3] },
    /// Explicit cell→processor list, relative to the case directory.
    Manual { data_file: PathBuf },
}

impl Default for DecompositionMethod {
    fn default() -> Self {
        DecompositionMethod::Simple { n: [1, 1, 1] }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecomposeConfig {
    pub number_of_subdomains: usize,
    pub method: DecompositionMethod,
    pub processor_patch_values: ProcessorPatchValues,
    pub point_arbitration: PointArbitration,
    /// Decompose processors on the rayon pool (when built with `rayon`).
    pub parallel: bool,
    /// Also write the cell→processor map as a `cellDist` label field.
    pub write_cell_dist: bool,
}

impl Default for DecomposeConfig {
    fn default() -> Self {
        Self {
            number_of_subdomains: 1,
            method: DecompositionMethod::default(),
            processor_patch_values: ProcessorPatchValues::default(),
            point_arbitration: PointArbitration::default(),
            parallel: true,
            write_cell_dist: false,
        }
    }
}

impl DecomposeConfig {
    /// Simple decomposition into `n_procs` slabs along x.
    pub fn simple_x(n_procs: usize) -> Self {
        Self {
            number_of_subdomains: n_procs,
            method: DecompositionMethod::Simple { n: [n_procs, 1, 1] },
            ..Self::default()
        }
    }

    /// Read and validate a settings file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, MeshError> {
        let config: Self = read_json(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Read `<case>/system/decomposeParDict.json`.
    pub fn from_case(case: impl AsRef<Path>) -> Result<Self, MeshError> {
        Self::from_path(case.as_ref().join(DICT_PATH))
    }

    pub fn validate(&self) -> Result<(), MeshError> {
        if self.number_of_subdomains == 0 {
            return Err(MeshError::NoProcessors);
        }
        if let DecompositionMethod::Simple { n } = &self.method {
            let blocks: usize = n.iter().product();
            if blocks != self.number_of_subdomains {
                return Err(MeshError::InvalidConfig(format!(
                    "simple method splits into {}x{}x{} = {blocks} blocks, \
                     but number_of_subdomains is {}",
                    n[0], n[1], n[2], self.number_of_subdomains
                )));
            }
        }
        Ok(())
    }

    /// Override the processor count, reshaping a simple split when needed.
    pub fn with_subdomains(mut self, n_procs: usize) -> Self {
        self.number_of_subdomains = n_procs;
        if let DecompositionMethod::Simple { n } = &mut self.method {
            if n.iter().product::<usize>() != n_procs {
                *n = [n_procs, 1, 1];
            }
        }
        self
    }
}
