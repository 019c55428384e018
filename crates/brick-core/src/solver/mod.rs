//! Boundary to the external AZURE2 process.
//!
//! The solver is driven through its text menu: the command line names the
//! input document, and standard input answers the menu choice, the external
//! parameter file prompt and the external capture file prompt, one per line.

use crate::domain::{BrickError, BrickResult};
use std::ffi::OsString;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

pub const DEFAULT_SOLVER_COMMAND: &str = "AZURE2";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolverChoice {
    Calculate,
    Extrapolate,
}

impl SolverChoice {
    pub const fn menu_entry(self) -> u8 {
        match self {
            Self::Calculate => 1,
            Self::Extrapolate => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolverRequest {
    pub input_path: PathBuf,
    pub working_dir: PathBuf,
    pub choice: SolverChoice,
    pub use_brune: bool,
    pub use_gsl: bool,
    pub ext_par_file: Option<PathBuf>,
    pub ext_capture_file: Option<PathBuf>,
}

impl SolverRequest {
    pub fn new(input_path: impl Into<PathBuf>, working_dir: impl Into<PathBuf>, choice: SolverChoice) -> Self {
        Self {
            input_path: input_path.into(),
            working_dir: working_dir.into(),
            choice,
            use_brune: false,
            use_gsl: false,
            ext_par_file: None,
            ext_capture_file: None,
        }
    }

    pub fn arguments(&self) -> Vec<OsString> {
        let mut arguments = vec![
            self.input_path.clone().into_os_string(),
            OsString::from("--no-gui"),
            OsString::from("--no-readline"),
        ];
        if self.use_brune {
            arguments.push(OsString::from("--use-brune"));
        }
        if self.use_gsl {
            arguments.push(OsString::from("--gsl-coul"));
        }
        arguments
    }

    /// Absent files answer their prompt with an empty line.
    pub fn stdin_payload(&self) -> String {
        format!(
            "{}\n{}\n{}\n",
            self.choice.menu_entry(),
            display_or_empty(self.ext_par_file.as_deref()),
            display_or_empty(self.ext_capture_file.as_deref())
        )
    }
}

fn display_or_empty(path: Option<&Path>) -> String {
    path.map(|path| path.display().to_string()).unwrap_or_default()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SolverResponse {
    pub stdout: String,
    pub stderr: String,
}

/// Runs one solver request to completion. Blocking.
pub trait SolverBackend: Send + Sync {
    fn invoke(&self, request: &SolverRequest) -> BrickResult<SolverResponse>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Azure2Process {
    command: PathBuf,
}

impl Azure2Process {
    pub fn new(command: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
        }
    }

    pub fn command(&self) -> &Path {
        &self.command
    }
}

impl Default for Azure2Process {
    fn default() -> Self {
        Self::new(DEFAULT_SOLVER_COMMAND)
    }
}

impl SolverBackend for Azure2Process {
    fn invoke(&self, request: &SolverRequest) -> BrickResult<SolverResponse> {
        tracing::debug!(
            target: "brick.solver",
            op = "invoke",
            command = %self.command.display(),
            input = %request.input_path.display(),
            choice = request.choice.menu_entry(),
            "starting solver"
        );

        let mut child = Command::new(&self.command)
            .args(request.arguments())
            .current_dir(&request.working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| BrickError::io("failed to start solver", &self.command, source))?;

        if let Some(mut stdin) = child.stdin.take() {
            // The solver may exit before reading every prompt.
            match stdin.write_all(request.stdin_payload().as_bytes()) {
                Err(error) if error.kind() != ErrorKind::BrokenPipe => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(BrickError::io("failed to write solver input", &self.command, error));
                }
                _ => {}
            }
        }

        let output = child
            .wait_with_output()
            .map_err(|source| BrickError::io("failed to wait for solver", &self.command, source))?;
        let response = SolverResponse {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if output.status.success() {
            return Ok(response);
        }

        let status = output.status.code().map_or_else(
            || "terminated by signal".to_string(),
            |code| format!("exit code {code}"),
        );
        tracing::error!(
            target: "brick.solver",
            op = "invoke",
            command = %self.command.display(),
            status = %status,
            "solver exited abnormally"
        );
        Err(BrickError::ExternalSolver {
            command: self.command.display().to_string(),
            status,
            stderr: response.stderr.trim_end().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{Azure2Process, SolverBackend, SolverChoice, SolverRequest};
    use crate::domain::BrickError;
    use std::ffi::OsString;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn arguments_carry_optional_flags_in_order() {
        let mut request = SolverRequest::new("/ws/run.azr", "/data", SolverChoice::Calculate);
        assert_eq!(
            request.arguments(),
            vec![
                OsString::from("/ws/run.azr"),
                OsString::from("--no-gui"),
                OsString::from("--no-readline"),
            ]
        );

        request.use_brune = true;
        request.use_gsl = true;
        let arguments = request.arguments();
        assert_eq!(arguments[3], OsString::from("--use-brune"));
        assert_eq!(arguments[4], OsString::from("--gsl-coul"));
    }

    #[test]
    fn stdin_answers_every_prompt() {
        let mut request = SolverRequest::new("run.azr", ".", SolverChoice::Extrapolate);
        assert_eq!(request.stdin_payload(), "3\n\n\n");

        request.choice = SolverChoice::Calculate;
        request.ext_capture_file = Some(PathBuf::from("intEC.dat"));
        assert_eq!(request.stdin_payload(), "1\n\nintEC.dat\n");
    }

    #[test]
    fn missing_executable_is_an_io_error() {
        let temp = TempDir::new().expect("tempdir");
        let solver = Azure2Process::new(temp.path().join("no-such-solver"));
        let request = SolverRequest::new("run.azr", temp.path(), SolverChoice::Calculate);
        let error = solver.invoke(&request).expect_err("executable is missing");
        assert!(matches!(error, BrickError::Io { .. }));
    }
}
