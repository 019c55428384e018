//! The evaluation facade.
//!
//! [`Azr`] ties a loaded [`Config`] to a solver backend and a workspace
//! allocator. Every operation materializes a workspace, runs the solver once,
//! reads what it needs from the output directory and releases the workspace,
//! whether or not any of those steps failed. An `Azr` holds no mutable state,
//! so one instance can serve evaluations from many threads at once.

mod options;

pub use options::{AzrOptions, ExtrapolateOptions};

use crate::config::{Config, DataOverride, Evaluation, MaterializeOptions};
use crate::domain::{BrickError, BrickResult};
use crate::output::{
    EXTERNAL_CAPTURE_FILE, ObservableTable, ReducedWidthAmplitude, load_observable_tables,
    load_observables, load_reduced_width_amplitudes, read_external_capture_table,
};
use crate::parameters::Parameter;
use crate::solver::{Azure2Process, SolverBackend, SolverChoice, SolverRequest};
use crate::table::NumericTable;
use crate::workspace::{Workspace, WorkspaceAllocator};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PredictOptions {
    pub data_overrides: Vec<DataOverride>,
    /// Also read reduced width amplitudes from the parameter echo.
    pub with_amplitudes: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub tables: Vec<NumericTable>,
    pub amplitudes: Option<Vec<ReducedWidthAmplitude>>,
}

pub struct AzrBuilder {
    input_path: PathBuf,
    parameters: Option<Vec<Parameter>>,
    options: AzrOptions,
    backend: Option<Arc<dyn SolverBackend>>,
    output_files: Option<Vec<String>>,
    extrapolation_files: Option<Vec<String>>,
}

impl AzrBuilder {
    /// Replaces the discovered free parameters.
    pub fn parameters(mut self, parameters: Vec<Parameter>) -> Self {
        self.parameters = Some(parameters);
        self
    }

    pub fn options(mut self, options: AzrOptions) -> Self {
        self.options = options;
        self
    }

    /// Runs evaluations through `backend` instead of spawning `options.command`.
    pub fn backend(mut self, backend: Arc<dyn SolverBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn output_files(mut self, output_files: Vec<String>) -> Self {
        self.output_files = Some(output_files);
        self
    }

    pub fn extrapolation_files(mut self, extrapolation_files: Vec<String>) -> Self {
        self.extrapolation_files = Some(extrapolation_files);
        self
    }

    pub fn build(self) -> BrickResult<Azr> {
        let config = match self.parameters {
            Some(parameters) => Config::with_parameters(&self.input_path, parameters)?,
            None => Config::load(&self.input_path)?,
        };
        let root = self
            .options
            .root_directory
            .clone()
            .unwrap_or_else(|| config.base_dir().to_path_buf());
        let allocator = WorkspaceAllocator::new(root)?;
        let backend = self
            .backend
            .unwrap_or_else(|| -> Arc<dyn SolverBackend> {
                Arc::new(Azure2Process::new(&self.options.command))
            });
        let output_files = self
            .output_files
            .unwrap_or_else(|| config.data().output_files());
        let extrapolation_files = self
            .extrapolation_files
            .unwrap_or_else(|| config.test().output_files());

        Ok(Azr {
            config,
            options: self.options,
            backend,
            allocator,
            output_files,
            extrapolation_files,
        })
    }
}

pub struct Azr {
    config: Config,
    options: AzrOptions,
    backend: Arc<dyn SolverBackend>,
    allocator: WorkspaceAllocator,
    output_files: Vec<String>,
    extrapolation_files: Vec<String>,
}

impl std::fmt::Debug for Azr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Azr")
            .field("input_path", &self.config.input_path())
            .field("options", &self.options)
            .field("workspace_root", &self.allocator.root())
            .field("output_files", &self.output_files)
            .field("extrapolation_files", &self.extrapolation_files)
            .finish_non_exhaustive()
    }
}

impl Azr {
    pub fn builder(input_path: impl Into<PathBuf>) -> AzrBuilder {
        AzrBuilder {
            input_path: input_path.into(),
            parameters: None,
            options: AzrOptions::default(),
            backend: None,
            output_files: None,
            extrapolation_files: None,
        }
    }

    pub fn load(input_path: impl Into<PathBuf>) -> BrickResult<Self> {
        Self::builder(input_path).build()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn options(&self) -> &AzrOptions {
        &self.options
    }

    pub fn workspace_root(&self) -> &Path {
        self.allocator.root()
    }

    pub fn output_files(&self) -> &[String] {
        &self.output_files
    }

    pub fn extrapolation_files(&self) -> &[String] {
        &self.extrapolation_files
    }

    /// Raw output tables for the full parameter vector `theta`.
    pub fn predict(&self, theta: &[f64]) -> BrickResult<Vec<NumericTable>> {
        self.predict_with(theta, &PredictOptions::default())
            .map(|prediction| prediction.tables)
    }

    pub fn predict_with(&self, theta: &[f64], options: &PredictOptions) -> BrickResult<Prediction> {
        let materialize = MaterializeOptions {
            data_overrides: options.data_overrides.clone(),
            test_selection: None,
        };
        let request = self.request(SolverChoice::Calculate, self.options.ext_capture_file.clone());
        self.evaluate(Evaluation::Full(theta), &materialize, request, |workspace, _| {
            let tables = load_observable_tables(workspace.output_dir(), &self.output_files)?;
            let amplitudes = if options.with_amplitudes {
                Some(load_reduced_width_amplitudes(workspace.output_dir())?)
            } else {
                None
            };
            Ok(Prediction { tables, amplitudes })
        })
    }

    /// Like [`Azr::predict`], with named column access.
    pub fn predict_observables(&self, theta: &[f64]) -> BrickResult<Vec<ObservableTable>> {
        let request = self.request(SolverChoice::Calculate, self.options.ext_capture_file.clone());
        self.evaluate(
            Evaluation::Full(theta),
            &MaterializeOptions::default(),
            request,
            |workspace, _| load_observables(workspace.output_dir(), &self.output_files),
        )
    }

    /// Evaluates the test segments. `theta` holds the level parameters; a
    /// full vector is accepted and its normalization factors ignored.
    pub fn extrapolate(&self, theta: &[f64], options: &ExtrapolateOptions) -> BrickResult<Vec<NumericTable>> {
        let materialize = MaterializeOptions {
            data_overrides: Vec::new(),
            test_selection: options.segment_indices.clone(),
        };
        let mut request = self.request(
            SolverChoice::Extrapolate,
            options
                .ext_capture_file
                .clone()
                .or_else(|| self.options.ext_capture_file_extrap.clone()),
        );
        request.use_brune = options.use_brune.unwrap_or(self.options.use_brune);
        request.use_gsl = options.use_gsl.unwrap_or(self.options.use_gsl);

        let selected = options.segment_indices.is_some();
        self.evaluate(Evaluation::LevelsOnly(theta), &materialize, request, |workspace, files| {
            let files = if selected {
                files
            } else {
                self.extrapolation_files.as_slice()
            };
            load_observable_tables(workspace.output_dir(), files)
        })
    }

    pub fn reduced_width_amplitudes(&self, theta: &[f64]) -> BrickResult<Vec<ReducedWidthAmplitude>> {
        let request = self.request(SolverChoice::Calculate, self.options.ext_capture_file.clone());
        self.evaluate(
            Evaluation::LevelsOnly(theta),
            &MaterializeOptions::default(),
            request,
            |workspace, _| load_reduced_width_amplitudes(workspace.output_dir()),
        )
    }

    /// Has the solver compute the external capture integrals of the
    /// document as written and returns the `(energy, integral)` table.
    pub fn external_capture_integrals(
        &self,
        use_gsl: bool,
        data_overrides: Vec<DataOverride>,
    ) -> BrickResult<NumericTable> {
        let materialize = MaterializeOptions {
            data_overrides,
            test_selection: None,
        };
        let mut request = self.request(SolverChoice::Calculate, None);
        request.use_gsl = use_gsl;
        self.evaluate(Evaluation::Template, &materialize, request, |workspace, _| {
            read_external_capture_table(&workspace.output_dir().join(EXTERNAL_CAPTURE_FILE))
        })
    }

    /// Shifts the energies of the listed included segments (MeV, lab) and
    /// recomputes the external capture integrals on the shifted data.
    pub fn shift_and_recompute_capture_integrals(
        &self,
        segment_indices: &[usize],
        shifts: &[f64],
        use_gsl: bool,
    ) -> BrickResult<NumericTable> {
        if segment_indices.len() != shifts.len() {
            return Err(BrickError::ParameterArity {
                context: "energy shifts",
                expected: segment_indices.len(),
                actual: shifts.len(),
            });
        }

        let data = self.config.data();
        let mut overrides = Vec::with_capacity(shifts.len());
        for (position, shift) in segment_indices.iter().zip(shifts) {
            let segment = data
                .included_index(*position)
                .and_then(|index| data.get(index))
                .ok_or_else(|| {
                    BrickError::invalid_options(format!(
                        "included segment {position} does not exist"
                    ))
                })?;
            overrides.push(DataOverride::new(*position, segment.shifted_values(*shift)));
        }

        self.external_capture_integrals(use_gsl, overrides)
    }

    fn request(&self, choice: SolverChoice, ext_capture_file: Option<PathBuf>) -> SolverRequest {
        SolverRequest {
            input_path: PathBuf::new(),
            working_dir: self.config.base_dir().to_path_buf(),
            choice,
            use_brune: self.options.use_brune,
            use_gsl: self.options.use_gsl,
            ext_par_file: self.options.ext_par_file.clone(),
            ext_capture_file,
        }
    }

    fn evaluate<T>(
        &self,
        evaluation: Evaluation<'_>,
        materialize: &MaterializeOptions,
        mut request: SolverRequest,
        read: impl FnOnce(&Workspace, &[String]) -> BrickResult<T>,
    ) -> BrickResult<T> {
        let materialized = self.config.materialize(evaluation, materialize, &self.allocator)?;
        let workspace = materialized.workspace;
        request.input_path = workspace.input_path().to_path_buf();

        let result = self.backend.invoke(&request).and_then(|response| {
            read(&workspace, &materialized.extrapolation_files).inspect_err(|error| {
                tracing::debug!(
                    target: "brick.azr",
                    op = "read_output",
                    workspace = %workspace.id(),
                    error = %error,
                    stdout = %response.stdout,
                    "solver output could not be read"
                );
            })
        });
        workspace.finish(result)
    }
}

#[cfg(test)]
mod tests {
    use super::{Azr, AzrOptions};
    use crate::domain::BrickError;

    #[test]
    fn missing_input_file_is_an_io_error() {
        let error = Azr::builder("/nonexistent/brick/input.azr")
            .options(AzrOptions::default())
            .build()
            .expect_err("no such file");
        assert!(matches!(error, BrickError::Io { .. }));
    }
}
