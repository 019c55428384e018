//! Per-evaluation scratch directories.
//!
//! Every evaluation gets its own directory under the allocator root:
//!
//! ```text
//! <root>/mcazure_<random>/
//!     mcazure_<random>.azr
//!     output/
//!     data/            (only when data tables are overridden)
//! ```
//!
//! Directory names come from `tempfile`, which creates them with create-new
//! semantics and retries on collision, so concurrent allocations under one
//! root never share a directory.

use crate::domain::{BrickError, BrickResult};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const WORKSPACE_PREFIX: &str = "mcazure_";
const RANDOM_BYTES: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceAllocator {
    root: PathBuf,
    prefix: String,
}

impl WorkspaceAllocator {
    pub fn new(root: impl AsRef<Path>) -> BrickResult<Self> {
        let root = root.as_ref();
        let root = std::path::absolute(root)
            .map_err(|source| BrickError::io("failed to resolve workspace root", root, source))?;
        Ok(Self {
            root,
            prefix: WORKSPACE_PREFIX.to_string(),
        })
    }

    /// Prepends `prefix` to the default workspace prefix.
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = format!("{prefix}{WORKSPACE_PREFIX}");
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the workspace directory and its output (and data) directories.
    pub fn allocate(&self, with_data_dir: bool) -> BrickResult<Workspace> {
        let dir = tempfile::Builder::new()
            .prefix(&self.prefix)
            .rand_bytes(RANDOM_BYTES)
            .tempdir_in(&self.root)
            .map_err(|source| {
                BrickError::io("failed to allocate workspace", &self.root, source)
            })?;

        let id = dir
            .path()
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let input_path = dir.path().join(format!("{id}.azr"));
        let output_dir = dir.path().join("output");
        create_dir(&output_dir)?;
        let data_dir = if with_data_dir {
            let data_dir = dir.path().join("data");
            create_dir(&data_dir)?;
            Some(data_dir)
        } else {
            None
        };

        tracing::debug!(
            target: "brick.workspace",
            op = "allocate",
            workspace = %id,
            path = %dir.path().display(),
            with_data_dir,
            "workspace allocated"
        );

        Ok(Workspace {
            id,
            input_path,
            output_dir,
            data_dir,
            dir,
        })
    }

    /// Runs `work` in a fresh workspace and releases it on every exit path.
    /// A teardown failure after successful work is returned as
    /// [`BrickError::Teardown`]; after failed work it is logged and the work
    /// error is returned.
    pub fn scope<T>(
        &self,
        with_data_dir: bool,
        work: impl FnOnce(&Workspace) -> BrickResult<T>,
    ) -> BrickResult<T> {
        let workspace = self.allocate(with_data_dir)?;
        let result = work(&workspace);
        workspace.finish(result)
    }
}

fn create_dir(path: &Path) -> BrickResult<()> {
    fs::create_dir(path)
        .map_err(|source| BrickError::io("failed to create workspace directory", path, source))
}

/// One evaluation's directory set. Dropping it removes the directory; use
/// [`Workspace::release`] to observe removal failures.
#[derive(Debug)]
pub struct Workspace {
    id: String,
    input_path: PathBuf,
    output_dir: PathBuf,
    data_dir: Option<PathBuf>,
    dir: TempDir,
}

impl Workspace {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn input_path(&self) -> &Path {
        &self.input_path
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }

    /// Removes every owned path. All removals are attempted; failures are
    /// collected into one [`BrickError::Teardown`].
    pub fn release(self) -> BrickResult<()> {
        let Self {
            id,
            input_path,
            output_dir,
            data_dir,
            dir,
        } = self;

        let mut failures = Vec::new();
        record_failure(&mut failures, &input_path, fs::remove_file(&input_path));
        for owned in std::iter::once(&output_dir).chain(data_dir.as_ref()) {
            record_failure(&mut failures, owned, fs::remove_dir_all(owned));
        }
        let root = dir.path().to_path_buf();
        record_failure(&mut failures, &root, dir.close());

        if failures.is_empty() {
            tracing::debug!(
                target: "brick.workspace",
                op = "release",
                workspace = %id,
                "workspace released"
            );
            Ok(())
        } else {
            Err(BrickError::Teardown { failures })
        }
    }

    /// Releases the workspace after a failure and hands back `error`.
    pub fn abandon(self, error: BrickError) -> BrickError {
        let id = self.id.clone();
        if let Err(teardown) = self.release() {
            tracing::warn!(
                target: "brick.workspace",
                op = "release",
                workspace = %id,
                error = %teardown,
                "workspace teardown failed after an evaluation error"
            );
        }
        error
    }

    /// Releases the workspace and passes `result` through.
    pub fn finish<T>(self, result: BrickResult<T>) -> BrickResult<T> {
        match result {
            Ok(value) => {
                self.release()?;
                Ok(value)
            }
            Err(error) => Err(self.abandon(error)),
        }
    }
}

fn record_failure(failures: &mut Vec<String>, path: &Path, result: std::io::Result<()>) {
    match result {
        Err(error) if error.kind() != ErrorKind::NotFound => {
            failures.push(format!("{}: {error}", path.display()));
        }
        _ => {}
    }
}
