use crate::domain::{BrickError, BrickResult};
use crate::solver::DEFAULT_SOLVER_COMMAND;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Solver-facing settings shared by every evaluation of an [`super::Azr`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct AzrOptions {
    pub command: String,
    pub use_brune: bool,
    pub use_gsl: bool,
    pub ext_par_file: Option<PathBuf>,
    pub ext_capture_file: Option<PathBuf>,
    pub ext_capture_file_extrap: Option<PathBuf>,
    /// Parent of every workspace. Defaults to the input file's directory.
    pub root_directory: Option<PathBuf>,
}

impl Default for AzrOptions {
    fn default() -> Self {
        Self {
            command: DEFAULT_SOLVER_COMMAND.to_string(),
            use_brune: true,
            use_gsl: true,
            ext_par_file: None,
            ext_capture_file: None,
            ext_capture_file_extrap: None,
            root_directory: None,
        }
    }
}

impl AzrOptions {
    pub fn from_json_file(path: impl AsRef<Path>) -> BrickResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|source| BrickError::io("failed to read options file", path, source))?;
        serde_json::from_str(&content).map_err(|source| {
            BrickError::invalid_options(format!("'{}': {source}", path.display()))
        })
    }

    pub fn from_json_str(content: &str) -> BrickResult<Self> {
        serde_json::from_str(content)
            .map_err(|source| BrickError::invalid_options(format!("<inline-options>: {source}")))
    }
}

/// Per-call settings of [`super::Azr::extrapolate`]. Unset fields fall back
/// to the [`AzrOptions`] of the facade.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtrapolateOptions {
    /// Test segments to include; all others are excluded.
    pub segment_indices: Option<Vec<usize>>,
    pub use_brune: Option<bool>,
    pub use_gsl: Option<bool>,
    pub ext_capture_file: Option<PathBuf>,
}
