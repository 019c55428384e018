//! Maps parameter vectors onto the input document.
//!
//! A [`Config`] is loaded once and never mutated afterwards. Each
//! evaluation works on copies of the level groups and segments, renders the
//! edited sections back into the document and writes the result into a
//! freshly allocated [`Workspace`].

use crate::document::{Document, Section};
use crate::domain::{BrickError, BrickResult};
use crate::levels::{Level, LevelGroup, LevelSchema, flatten_levels, load_level_groups, render_levels};
use crate::parameters::{Parameter, ParameterRegistry};
use crate::segments::{DataSegments, SegmentSchema, TestSegments};
use crate::table::NumericTable;
use crate::workspace::{Workspace, WorkspaceAllocator};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// How a parameter vector is interpreted by [`Config::materialize`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Evaluation<'a> {
    /// Level parameters followed by normalization factors.
    Full(&'a [f64]),
    /// Level parameters only. A full-length vector is accepted and its
    /// normalization suffix ignored.
    LevelsOnly(&'a [f64]),
    /// The document's own values.
    Template,
}

/// Replacement table for one included data segment.
#[derive(Debug, Clone, PartialEq)]
pub struct DataOverride {
    /// Position among the included segments.
    pub segment: usize,
    pub table: NumericTable,
}

impl DataOverride {
    pub fn new(segment: usize, table: NumericTable) -> Self {
        Self { segment, table }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaterializeOptions {
    pub data_overrides: Vec<DataOverride>,
    /// Test segments to include; all others are excluded.
    pub test_selection: Option<Vec<usize>>,
}

/// A written workspace ready for the solver.
#[derive(Debug)]
pub struct Materialized {
    pub workspace: Workspace,
    /// Extrapolation files the written document will produce.
    pub extrapolation_files: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    input_path: PathBuf,
    base_dir: PathBuf,
    document: Document,
    level_schema: LevelSchema,
    groups: Vec<LevelGroup>,
    data: DataSegments,
    test: TestSegments,
    registry: ParameterRegistry,
}

impl Config {
    /// Loads `path` and discovers the default free parameters.
    pub fn load(path: impl AsRef<Path>) -> BrickResult<Self> {
        Self::open(path.as_ref(), None)
    }

    /// Loads `path` with an explicit parameter list.
    pub fn with_parameters(path: impl AsRef<Path>, parameters: Vec<Parameter>) -> BrickResult<Self> {
        Self::open(path.as_ref(), Some(parameters))
    }

    fn open(path: &Path, parameters: Option<Vec<Parameter>>) -> BrickResult<Self> {
        let input_path = std::path::absolute(path)
            .map_err(|source| BrickError::io("failed to resolve input path", path, source))?;
        let document = Document::read(&input_path)?;
        let base_dir = input_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let mut config = Self::from_document(
            document,
            &base_dir,
            parameters,
            LevelSchema::AZURE2,
            SegmentSchema::AZURE2,
        )?;
        config.input_path = input_path;
        Ok(config)
    }

    /// Builds a configuration from an in-memory document. Relative data
    /// paths are resolved against `base_dir`.
    pub fn from_document(
        document: Document,
        base_dir: &Path,
        parameters: Option<Vec<Parameter>>,
        level_schema: LevelSchema,
        segment_schema: SegmentSchema,
    ) -> BrickResult<Self> {
        let groups = load_level_groups(&document, &level_schema)?;
        let data = DataSegments::load(&document, &segment_schema, base_dir)?;
        let test = TestSegments::load(&document, &segment_schema)?;
        let norm_segments = data.norm_segment_indices();
        let registry = match parameters {
            Some(parameters) => ParameterRegistry::new(parameters, &groups, &norm_segments)?,
            None => ParameterRegistry::discover(&groups, &norm_segments)?,
        };

        tracing::info!(
            target: "brick.config",
            op = "load",
            level_groups = groups.len(),
            parameters = registry.level_count(),
            normalization_factors = registry.norm_count(),
            data_segments = data.len(),
            test_segments = test.len(),
            "configuration loaded"
        );

        Ok(Self {
            input_path: PathBuf::new(),
            base_dir: base_dir.to_path_buf(),
            document,
            level_schema,
            groups,
            data,
            test,
            registry,
        })
    }

    pub fn input_path(&self) -> &Path {
        &self.input_path
    }

    /// Directory relative data paths resolve against.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn level_groups(&self) -> &[LevelGroup] {
        &self.groups
    }

    pub fn data(&self) -> &DataSegments {
        &self.data
    }

    pub fn test(&self) -> &TestSegments {
        &self.test
    }

    pub fn registry(&self) -> &ParameterRegistry {
        &self.registry
    }

    pub fn parameters(&self) -> &[Parameter] {
        self.registry.parameters()
    }

    pub fn total_free_count(&self) -> usize {
        self.registry.total_free_count()
    }

    pub fn labels(&self) -> Vec<String> {
        self.registry.labels()
    }

    /// Values of every free parameter as written in the document.
    pub fn input_values(&self) -> Vec<f64> {
        let mut values = self.registry.level_values(&self.groups);
        values.extend(
            self.registry
                .norm_factors()
                .iter()
                .filter_map(|factor| self.data.get(factor.segment))
                .map(|segment| segment.norm_factor()),
        );
        values
    }

    /// Flattened levels with `level_values` written in.
    pub fn generate_levels(&self, level_values: &[f64]) -> BrickResult<Vec<Level>> {
        let groups = self.registry.apply_level_values(&self.groups, level_values)?;
        Ok(flatten_levels(&groups))
    }

    /// Writes the document for one evaluation into a new workspace.
    ///
    /// Everything that can be checked without touching the filesystem is
    /// checked before the workspace is allocated. Once it exists, any
    /// failure releases it before the error is returned.
    pub fn materialize(
        &self,
        evaluation: Evaluation<'_>,
        options: &MaterializeOptions,
        allocator: &WorkspaceAllocator,
    ) -> BrickResult<Materialized> {
        let (groups, norm_values) = self.evaluate_levels(evaluation)?;
        let mut data = match norm_values {
            Some(values) => self.data.with_norm_factors(values)?,
            None => self.data.clone(),
        };
        let overrides = self.resolve_overrides(&options.data_overrides)?;
        let test = match &options.test_selection {
            Some(indices) => self.test.with_selection(indices)?,
            None => self.test.clone(),
        };
        let levels = flatten_levels(&groups);

        let workspace = allocator.allocate(!overrides.is_empty())?;
        self.fill_workspace(workspace, &levels, &mut data, &test, &overrides)
    }

    // Takes ownership so every failure after allocation releases the workspace.
    fn fill_workspace(
        &self,
        workspace: Workspace,
        levels: &[Level],
        data: &mut DataSegments,
        test: &TestSegments,
        overrides: &[(usize, &NumericTable)],
    ) -> BrickResult<Materialized> {
        match self.write_workspace(&workspace, levels, data, test, overrides) {
            Ok(()) => {
                tracing::debug!(
                    target: "brick.config",
                    op = "materialize",
                    workspace = %workspace.id(),
                    overrides = overrides.len(),
                    "document materialized"
                );
                Ok(Materialized {
                    workspace,
                    extrapolation_files: test.output_files(),
                })
            }
            Err(error) => Err(workspace.abandon(error)),
        }
    }

    fn evaluate_levels<'a>(
        &self,
        evaluation: Evaluation<'a>,
    ) -> BrickResult<(Vec<LevelGroup>, Option<&'a [f64]>)> {
        match evaluation {
            Evaluation::Full(theta) => {
                let (levels, norms) = self.registry.split(theta)?;
                Ok((self.registry.apply_level_values(&self.groups, levels)?, Some(norms)))
            }
            Evaluation::LevelsOnly(theta) => {
                let levels = if theta.len() == self.registry.total_free_count() {
                    &theta[..self.registry.level_count()]
                } else if theta.len() == self.registry.level_count() {
                    theta
                } else {
                    return Err(BrickError::ParameterArity {
                        context: "level parameter vector",
                        expected: self.registry.level_count(),
                        actual: theta.len(),
                    });
                };
                Ok((self.registry.apply_level_values(&self.groups, levels)?, None))
            }
            Evaluation::Template => Ok((self.groups.clone(), None)),
        }
    }

    // Maps included-segment positions to all-segment indices.
    fn resolve_overrides<'o>(
        &self,
        overrides: &'o [DataOverride],
    ) -> BrickResult<Vec<(usize, &'o NumericTable)>> {
        let mut filenames = BTreeSet::new();
        let mut resolved = Vec::with_capacity(overrides.len());
        for data_override in overrides {
            let index = self.data.included_index(data_override.segment).ok_or_else(|| {
                BrickError::invalid_options(format!(
                    "data override targets included segment {} but only {} segment(s) are included",
                    data_override.segment,
                    self.data.included().count()
                ))
            })?;
            let filename = self.data.get(index).map(|segment| segment.filename().to_string());
            if !filenames.insert(filename.clone()) {
                return Err(BrickError::invalid_options(format!(
                    "data overrides collide on file name '{}'",
                    filename.unwrap_or_default()
                )));
            }
            resolved.push((index, &data_override.table));
        }
        Ok(resolved)
    }

    fn write_workspace(
        &self,
        workspace: &Workspace,
        levels: &[Level],
        data: &mut DataSegments,
        test: &TestSegments,
        overrides: &[(usize, &NumericTable)],
    ) -> BrickResult<()> {
        if let Some(data_dir) = workspace.data_dir() {
            for (index, table) in overrides {
                let Some(segment) = data.segment_mut(*index) else {
                    continue;
                };
                let path = data_dir.join(segment.filename());
                table
                    .write(&path)
                    .map_err(|source| BrickError::io("failed to write data override", &path, source))?;
                segment.set_filepath(path.display().to_string());
            }
        }

        let level_rows = render_levels(
            self.document.section_rows(Section::Levels)?,
            levels,
            &self.level_schema,
        )?;
        let data_rows = data.render_rows(self.document.section_rows(Section::SegmentsData)?)?;
        let test_rows = test.render_rows(self.document.section_rows(Section::SegmentsTest)?)?;

        self.document
            .replace_section(Section::Levels, level_rows)?
            .replace_section(Section::SegmentsData, data_rows)?
            .replace_section(Section::SegmentsTest, test_rows)?
            .with_output_dir(workspace.output_dir())?
            .write(workspace.input_path())
    }
}
