//! Readers for the files the solver leaves in its output directory.

use crate::domain::{BrickError, BrickResult};
use crate::serialization::{format_scientific_f64, write_table_text};
use crate::table::NumericTable;
use serde::Serialize;
use std::fs;
use std::path::Path;

pub const OBSERVABLE_COLUMNS: usize = 9;
pub const PARAMETER_ECHO_FILE: &str = "parameters.out";
pub const EXTERNAL_CAPTURE_FILE: &str = "intEC.dat";
const EXTERNAL_CAPTURE_PRECISION: usize = 5;

/// Nine-column solver output table with named column access.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ObservableTable {
    table: NumericTable,
}

impl ObservableTable {
    /// `None` when a non-empty table has fewer than nine columns.
    pub fn new(table: NumericTable) -> Option<Self> {
        (table.is_empty() || table.column_count() >= OBSERVABLE_COLUMNS).then_some(Self { table })
    }

    pub fn table(&self) -> &NumericTable {
        &self.table
    }

    pub fn into_table(self) -> NumericTable {
        self.table
    }

    pub fn len(&self) -> usize {
        self.table.row_count()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    fn column(&self, index: usize) -> Vec<f64> {
        self.table.column(index).unwrap_or_default()
    }

    /// Center-of-mass energy.
    pub fn e_com(&self) -> Vec<f64> {
        self.column(0)
    }

    /// Excitation energy.
    pub fn e_x(&self) -> Vec<f64> {
        self.column(1)
    }

    pub fn angle_com(&self) -> Vec<f64> {
        self.column(2)
    }

    pub fn xs_com_fit(&self) -> Vec<f64> {
        self.column(3)
    }

    pub fn sf_com_fit(&self) -> Vec<f64> {
        self.column(4)
    }

    pub fn xs_com_data(&self) -> Vec<f64> {
        self.column(5)
    }

    pub fn xs_err_com_data(&self) -> Vec<f64> {
        self.column(6)
    }

    pub fn sf_com_data(&self) -> Vec<f64> {
        self.column(7)
    }

    pub fn sf_err_com_data(&self) -> Vec<f64> {
        self.column(8)
    }
}

pub fn load_table(path: &Path) -> BrickResult<NumericTable> {
    if !path.is_file() {
        return Err(BrickError::output_read(path, "file was not produced"));
    }
    NumericTable::read(path).map_err(|error| BrickError::output_read(path, error.to_string()))
}

/// One table per file, in the order requested.
pub fn load_observable_tables(output_dir: &Path, filenames: &[String]) -> BrickResult<Vec<NumericTable>> {
    filenames
        .iter()
        .map(|filename| load_table(&output_dir.join(filename)))
        .collect()
}

pub fn load_observables(output_dir: &Path, filenames: &[String]) -> BrickResult<Vec<ObservableTable>> {
    filenames
        .iter()
        .map(|filename| {
            let path = output_dir.join(filename);
            let table = load_table(&path)?;
            let columns = table.column_count();
            ObservableTable::new(table).ok_or_else(|| {
                BrickError::output_read(
                    &path,
                    format!("expected {OBSERVABLE_COLUMNS} columns, found {columns}"),
                )
            })
        })
        .collect()
}

/// Output file holding several tables separated by blank lines.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputSections {
    pub sections: Vec<ObservableTable>,
    pub row_counts: Vec<usize>,
    pub total_rows: usize,
}

pub fn load_output_sections(path: &Path) -> BrickResult<OutputSections> {
    let source = fs::read_to_string(path).map_err(|error| BrickError::output_read(path, error.to_string()))?;
    parse_output_sections(&source, path)
}

fn parse_output_sections(source: &str, path: &Path) -> BrickResult<OutputSections> {
    let mut blocks: Vec<Vec<&str>> = vec![Vec::new()];
    for line in source.lines() {
        if line.trim().is_empty() {
            if blocks.last().is_some_and(|block| !block.is_empty()) {
                blocks.push(Vec::new());
            }
        } else if let Some(block) = blocks.last_mut() {
            block.push(line);
        }
    }
    blocks.retain(|block| !block.is_empty());

    let mut sections = Vec::with_capacity(blocks.len());
    for block in blocks {
        let table = NumericTable::parse(&block.join("\n"))
            .map_err(|error| BrickError::output_read(path, error.to_string()))?;
        let columns = table.column_count();
        let section = ObservableTable::new(table).ok_or_else(|| {
            BrickError::output_read(
                path,
                format!("section has {columns} columns, expected {OBSERVABLE_COLUMNS}"),
            )
        })?;
        sections.push(section);
    }

    let row_counts: Vec<usize> = sections.iter().map(ObservableTable::len).collect();
    let total_rows = row_counts.iter().sum();
    Ok(OutputSections {
        sections,
        row_counts,
        total_rows,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReducedWidthAmplitude {
    /// J^pi as echoed by the solver, e.g. `1.5-`.
    pub jpi: String,
    pub channel: i64,
    pub amplitude: f64,
}

pub fn load_reduced_width_amplitudes(output_dir: &Path) -> BrickResult<Vec<ReducedWidthAmplitude>> {
    let path = output_dir.join(PARAMETER_ECHO_FILE);
    let source = fs::read_to_string(&path).map_err(|error| BrickError::output_read(&path, error.to_string()))?;
    parse_reduced_width_amplitudes(&source, &path)
}

/// Each `g_int` line belongs to the most recent `J =` header.
pub fn parse_reduced_width_amplitudes(source: &str, path: &Path) -> BrickResult<Vec<ReducedWidthAmplitude>> {
    let mut jpi: Option<String> = None;
    let mut amplitudes = Vec::new();

    for (index, line) in source.lines().enumerate() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if line.starts_with("J =") {
            let label = tokens.get(2).ok_or_else(|| {
                BrickError::output_read(path, format!("line {}: 'J =' header without a value", index + 1))
            })?;
            jpi = Some((*label).to_string());
        }

        let Some(position) = tokens.iter().position(|token| *token == "g_int") else {
            continue;
        };
        let context = jpi.clone().ok_or_else(|| {
            BrickError::output_read(path, format!("line {}: amplitude before any 'J =' header", index + 1))
        })?;
        let channel = tokens
            .get(2)
            .and_then(|token| token.parse::<i64>().ok())
            .ok_or_else(|| BrickError::output_read(path, format!("line {}: missing channel", index + 1)))?;
        let amplitude = tokens
            .get(position + 2)
            .and_then(|token| token.parse::<f64>().ok())
            .ok_or_else(|| BrickError::output_read(path, format!("line {}: missing amplitude", index + 1)))?;

        amplitudes.push(ReducedWidthAmplitude {
            jpi: context,
            channel,
            amplitude,
        });
    }

    Ok(amplitudes)
}

pub fn read_external_capture_table(path: &Path) -> BrickResult<NumericTable> {
    let source = fs::read_to_string(path).map_err(|error| BrickError::output_read(path, error.to_string()))?;
    parse_external_capture_table(&source, path)
}

/// Parses `(x,y)` lines into a two-column table.
pub fn parse_external_capture_table(source: &str, path: &Path) -> BrickResult<NumericTable> {
    let mut rows = Vec::new();
    for (index, line) in source.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let pair = parse_pair(line).ok_or_else(|| {
            BrickError::output_read(path, format!("line {}: '{}' is not an (x,y) pair", index + 1, line.trim()))
        })?;
        rows.push(vec![pair.0, pair.1]);
    }
    NumericTable::from_rows(rows).map_err(|error| BrickError::output_read(path, error.to_string()))
}

fn parse_pair(line: &str) -> Option<(f64, f64)> {
    let open = line.find('(')?;
    let close = open + line[open..].find(')')?;
    let (x, y) = line[open + 1..close].split_once(',')?;
    Some((x.trim().parse().ok()?, y.trim().parse().ok()?))
}

pub fn write_external_capture_table(path: &Path, table: &NumericTable) -> BrickResult<()> {
    if table.column_count() != 2 && !table.is_empty() {
        return Err(BrickError::invalid_options(format!(
            "external capture table needs 2 columns, found {}",
            table.column_count()
        )));
    }
    let content: String = table
        .rows()
        .map(|row| {
            format!(
                "({},{})\n",
                format_scientific_f64(row[0], EXTERNAL_CAPTURE_PRECISION),
                format_scientific_f64(row[1], EXTERNAL_CAPTURE_PRECISION)
            )
        })
        .collect();
    write_table_text(path, &content)
        .map_err(|source| BrickError::io("failed to write external capture table", path, source))
}
