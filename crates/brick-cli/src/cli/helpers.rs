use super::CliError;
use anyhow::Context;
use brick_core::{Azr, AzrOptions, BrickError, BrickResult, NumericTable};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(clap::Args)]
pub(super) struct EvaluationArgs {
    /// AZURE2 input file
    #[arg(value_name = "file.azr")]
    pub(super) input: PathBuf,

    /// JSON array with the parameter vector; defaults to the input values
    #[arg(long, value_name = "path")]
    pub(super) theta: Option<PathBuf>,

    /// JSON file with solver options
    #[arg(long, value_name = "path")]
    pub(super) options: Option<PathBuf>,

    /// Print JSON instead of a summary
    #[arg(long)]
    pub(super) json: bool,
}

impl EvaluationArgs {
    pub(super) fn load_facade(&self) -> BrickResult<Azr> {
        let options = match &self.options {
            Some(path) => AzrOptions::from_json_file(path)?,
            None => AzrOptions::default(),
        };
        Azr::builder(&self.input).options(options).build()
    }

    /// The `--theta` vector, or `fallback` when none was given.
    pub(super) fn theta_or(&self, fallback: Vec<f64>) -> BrickResult<Vec<f64>> {
        match &self.theta {
            Some(path) => read_theta(path),
            None => Ok(fallback),
        }
    }
}

pub(super) fn read_theta(path: &Path) -> BrickResult<Vec<f64>> {
    let content = fs::read_to_string(path)
        .map_err(|source| BrickError::io("failed to read parameter vector", path, source))?;
    serde_json::from_str(&content).map_err(|source| {
        BrickError::invalid_options(format!(
            "'{}' must hold a JSON array of numbers: {source}",
            path.display()
        ))
    })
}

#[derive(Serialize)]
pub(super) struct NamedTable<'a> {
    pub(super) file: &'a str,
    pub(super) rows: Vec<Vec<f64>>,
}

impl<'a> NamedTable<'a> {
    pub(super) fn new(file: &'a str, table: &NumericTable) -> Self {
        Self {
            file,
            rows: table.rows().map(<[f64]>::to_vec).collect(),
        }
    }
}

pub(super) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value).context("failed to render JSON output")?;
    println!("{rendered}");
    Ok(())
}

pub(super) fn print_row_counts(files: &[String], tables: &[NumericTable]) {
    for (file, table) in files.iter().zip(tables) {
        println!("{file}: {} rows", table.row_count());
    }
}
