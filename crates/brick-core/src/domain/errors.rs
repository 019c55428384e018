use std::path::PathBuf;

pub type BrickResult<T> = Result<T, BrickError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BrickErrorCategory {
    InputValidationError,
    IoSystemError,
    ComputationError,
    InternalError,
}

impl BrickErrorCategory {
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::InputValidationError => 2,
            Self::IoSystemError => 3,
            Self::ComputationError => 4,
            Self::InternalError => 5,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InputValidationError => "InputValidationError",
            Self::IoSystemError => "IoSystemError",
            Self::ComputationError => "ComputationError",
            Self::InternalError => "InternalError",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BrickError {
    #[error("malformed <{section}> section: {reason}")]
    MalformedDocument {
        section: &'static str,
        reason: String,
    },
    #[error("expected {expected} level rows in the template but {actual} levels were supplied")]
    LevelCountMismatch { expected: usize, actual: usize },
    #[error("{context} expects {expected} parameter values, got {actual}")]
    ParameterArity {
        context: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("no level group with J^pi = {jpi} for rank {rank}")]
    UnresolvedJPi { jpi: String, rank: usize },
    #[error("solver '{command}' failed ({status}): {stderr}")]
    ExternalSolver {
        command: String,
        status: String,
        stderr: String,
    },
    #[error("failed to read solver output '{}': {reason}", path.display())]
    OutputRead { path: PathBuf, reason: String },
    #[error("failed to read data table '{}': {reason}", path.display())]
    DataRead { path: PathBuf, reason: String },
    #[error("invalid options: {reason}")]
    InvalidOptions { reason: String },
    #[error("{context} '{}': {source}", path.display())]
    Io {
        context: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("workspace teardown left {} failure(s): {}", failures.len(), failures.join("; "))]
    Teardown { failures: Vec<String> },
}

impl BrickError {
    pub fn malformed(section: &'static str, reason: impl Into<String>) -> Self {
        Self::MalformedDocument {
            section,
            reason: reason.into(),
        }
    }

    pub fn output_read(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::OutputRead {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn io(context: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            context,
            path: path.into(),
            source,
        }
    }

    pub fn invalid_options(reason: impl Into<String>) -> Self {
        Self::InvalidOptions {
            reason: reason.into(),
        }
    }

    pub const fn category(&self) -> BrickErrorCategory {
        match self {
            Self::MalformedDocument { .. }
            | Self::LevelCountMismatch { .. }
            | Self::ParameterArity { .. }
            | Self::UnresolvedJPi { .. }
            | Self::DataRead { .. }
            | Self::InvalidOptions { .. } => BrickErrorCategory::InputValidationError,
            Self::Io { .. } | Self::Teardown { .. } => BrickErrorCategory::IoSystemError,
            Self::ExternalSolver { .. } | Self::OutputRead { .. } => {
                BrickErrorCategory::ComputationError
            }
        }
    }

    /// Stable dotted code used in diagnostics.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MalformedDocument { .. } => "INPUT.MALFORMED_DOCUMENT",
            Self::LevelCountMismatch { .. } => "INPUT.LEVEL_COUNT",
            Self::ParameterArity { .. } => "INPUT.PARAMETER_ARITY",
            Self::UnresolvedJPi { .. } => "INPUT.UNRESOLVED_JPI",
            Self::DataRead { .. } => "INPUT.DATA_TABLE",
            Self::InvalidOptions { .. } => "INPUT.OPTIONS",
            Self::Io { .. } => "IO.FILESYSTEM",
            Self::Teardown { .. } => "IO.WORKSPACE_TEARDOWN",
            Self::ExternalSolver { .. } => "RUN.EXTERNAL_SOLVER",
            Self::OutputRead { .. } => "RUN.OUTPUT_READ",
        }
    }

    pub const fn exit_code(&self) -> i32 {
        self.category().exit_code()
    }

    pub fn diagnostic_line(&self) -> String {
        format!("ERROR: [{}] {}", self.code(), self)
    }
}
