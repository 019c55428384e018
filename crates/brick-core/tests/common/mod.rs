#![allow(dead_code)]

use brick_core::document::{Document, OUTPUT_DIR_LINE, Section};
use brick_core::levels::{LevelSchema, parse_level_groups};
use brick_core::output::{EXTERNAL_CAPTURE_FILE, PARAMETER_ECHO_FILE, write_external_capture_table};
use brick_core::segments::{DataSegments, SegmentSchema, TestSegments};
use brick_core::solver::{SolverBackend, SolverChoice, SolverRequest, SolverResponse};
use brick_core::{Azr, AzrOptions, BrickError, BrickResult, NumericTable};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub const SOURCE_TABLE: &[[f64; 3]] = &[
    [0.50, 1.2e-6, 1.0e-7],
    [0.75, 3.4e-6, 2.0e-7],
    [1.00, 5.6e-6, 3.0e-7],
    [1.25, 7.8e-6, 4.0e-7],
];

/// Builds a 30-column level row.
pub fn level_row(
    spin: f64,
    parity: i32,
    energy: f64,
    energy_fixed: i32,
    channel: usize,
    width_fixed: i32,
    width: f64,
) -> String {
    let mut columns = vec!["0".to_string(); 30];
    columns[0] = spin.to_string();
    columns[1] = parity.to_string();
    columns[2] = energy.to_string();
    columns[3] = energy_fixed.to_string();
    columns[4] = "1".to_string();
    columns[5] = channel.to_string();
    columns[9] = "1".to_string();
    columns[10] = width_fixed.to_string();
    columns[11] = width.to_string();
    columns[21] = "1.9435".to_string();
    columns[27] = "4.5".to_string();
    columns.join("  ")
}

pub fn source_table() -> NumericTable {
    NumericTable::from_rows(SOURCE_TABLE.iter().map(|row| row.to_vec()).collect())
        .expect("source table")
}

/// A temporary project: one `.azr` document, its data tables and a
/// `runs/` directory that every workspace is allocated under.
pub struct Fixture {
    pub temp: TempDir,
    pub input: PathBuf,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_tables(&source_table())
    }

    /// Every data table of the fixture holds `table`.
    pub fn with_tables(table: &NumericTable) -> Self {
        let temp = TempDir::new().expect("tempdir");
        fs::create_dir_all(temp.path().join("data")).expect("data dir");
        fs::create_dir_all(temp.path().join("runs")).expect("runs dir");
        for name in ["elastic.dat", "inelastic.dat", "capture.dat", "excluded.dat"] {
            table.write(&temp.path().join("data").join(name)).expect("table");
        }

        let lines = [
            "<config>".to_string(),
            "1".to_string(),
            "output/".to_string(),
            "checks/".to_string(),
            "</config>".to_string(),
            "<levels>".to_string(),
            level_row(0.5, 1, 2.365, 0, 1, 0, 3.15e4),
            level_row(0.5, 1, 2.365, 0, 2, 0, 0.45),
            String::new(),
            level_row(1.5, -1, 3.502, 0, 1, 0, 5.2e4),
            level_row(1.5, -1, 3.502, 0, 2, 1, 0.0),
            String::new(),
            level_row(1.5, -1, 6.4, 1, 1, 0, 1.1e5),
            level_row(1.5, -1, 6.4, 1, 2, 0, 2.0),
            String::new(),
            level_row(0.5, -1, 1.2, 1, 1, 0, 1.6),
            String::new(),
            "</levels>".to_string(),
            "<segmentsData>".to_string(),
            "1  1  1  0.3  2.0  0  180  0  1.0  1  0.05  data/elastic.dat".to_string(),
            "0  1  2  0.3  2.0  0  180  0  1.0  1  0.05  data/excluded.dat".to_string(),
            String::new(),
            "1  1  2  0.3  2.0  0  180  0  1.0  0  0.05  data/inelastic.dat".to_string(),
            "1  1  -1  0.3  2.0  0  180  0  1.0  1  0.08  data/capture.dat".to_string(),
            "</segmentsData>".to_string(),
            "<segmentsTest>".to_string(),
            "1  1  1  0.1  3.0  0.01  0  0  0  0  0".to_string(),
            "0  1  -1  0.1  3.0  0.01  0  0  0  0  0".to_string(),
            "</segmentsTest>".to_string(),
            String::new(),
        ];
        let input = temp.path().join("12c_pg.azr");
        fs::write(&input, lines.join("\n")).expect("azr");
        Self { temp, input }
    }

    pub fn runs_dir(&self) -> PathBuf {
        self.temp.path().join("runs")
    }

    pub fn options(&self) -> AzrOptions {
        AzrOptions {
            root_directory: Some(self.runs_dir()),
            ..AzrOptions::default()
        }
    }

    pub fn azr(&self, backend: Arc<dyn SolverBackend>) -> Azr {
        Azr::builder(&self.input)
            .options(self.options())
            .backend(backend)
            .build()
            .expect("facade")
    }

    pub fn residue(&self) -> Vec<PathBuf> {
        fs::read_dir(self.runs_dir())
            .expect("runs dir")
            .map(|entry| entry.expect("entry").path())
            .collect()
    }
}

/// In-process stand-in for AZURE2.
///
/// Fit columns are `energy_sum * e` where `energy_sum` is the sum of every
/// level energy in the document; data columns are the segment values scaled
/// by the segment's normalization factor.
#[derive(Debug, Default)]
pub struct FakeSolver {
    pub invocations: AtomicUsize,
    pub requests: Mutex<Vec<SolverRequest>>,
}

impl FakeSolver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn invocation_count(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }
}

impl SolverBackend for FakeSolver {
    fn invoke(&self, request: &SolverRequest) -> BrickResult<SolverResponse> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .expect("request log")
            .push(request.clone());

        let document = Document::read(&request.input_path)?;
        let output_dir = PathBuf::from(
            document
                .lines()
                .get(OUTPUT_DIR_LINE)
                .map(|line| line.trim_end_matches('/'))
                .unwrap_or_default(),
        );

        let groups = parse_level_groups(document.section_rows(Section::Levels)?, &LevelSchema::AZURE2)?;
        let energy_sum: f64 = groups
            .iter()
            .flat_map(|group| group.levels().iter().map(|level| level.energy))
            .sum();

        match request.choice {
            SolverChoice::Calculate => {
                let data = DataSegments::load(&document, &SegmentSchema::AZURE2, &request.working_dir)?;
                write_observables(&output_dir, &data, energy_sum)?;
                write_parameter_echo(&output_dir, &groups)?;
                write_capture_integrals(&output_dir, &data, energy_sum)?;
            }
            SolverChoice::Extrapolate => {
                let test = TestSegments::load(&document, &SegmentSchema::AZURE2)?;
                for segment in test.all().iter().filter(|segment| segment.include()) {
                    let row = vec![1.0, 2.0, 0.0, energy_sum, energy_sum * 2.0, 0.0, 0.0, 0.0, 0.0];
                    let table = NumericTable::from_rows(vec![row]).expect("row");
                    write_table(&output_dir.join(segment.output_filename()), &table)?;
                }
            }
        }

        Ok(SolverResponse {
            stdout: "fake solver finished".to_string(),
            stderr: String::new(),
        })
    }
}

fn write_table(path: &Path, table: &NumericTable) -> BrickResult<()> {
    table
        .write(path)
        .map_err(|source| BrickError::io("fake solver failed to write", path, source))
}

fn write_observables(output_dir: &Path, data: &DataSegments, energy_sum: f64) -> BrickResult<()> {
    let mut files: BTreeMap<String, Vec<Vec<f64>>> = BTreeMap::new();
    for segment in data.included() {
        let norm = segment.norm_factor();
        let rows = files.entry(segment.output_filename()).or_default();
        for row in segment.values().rows() {
            let (e, xs, err) = (row[0], row[1], row[2]);
            rows.push(vec![
                e,
                e + 1.0,
                0.0,
                energy_sum * e,
                energy_sum * e * 2.0,
                xs * norm,
                err * norm,
                xs * norm * 2.0,
                err * norm * 2.0,
            ]);
        }
    }
    for (name, rows) in files {
        let table = NumericTable::from_rows(rows).expect("rows");
        write_table(&output_dir.join(name), &table)?;
    }
    Ok(())
}

fn write_parameter_echo(output_dir: &Path, groups: &[brick_core::levels::LevelGroup]) -> BrickResult<()> {
    let mut echo = String::new();
    for (index, group) in groups.iter().enumerate() {
        echo.push_str(&format!("J = {}\n", group.jpi()));
        for (position, level) in group.levels().iter().enumerate() {
            echo.push_str(&format!(
                "  {}  {}  {}  g_int = {:e} MeV^(1/2)\n",
                index + 1,
                position + 1,
                level.channel,
                level.width * 1.0e-3
            ));
        }
        echo.push('\n');
    }
    let path = output_dir.join(PARAMETER_ECHO_FILE);
    fs::write(&path, echo).map_err(|source| BrickError::io("fake solver failed to write", &path, source))
}

fn write_capture_integrals(output_dir: &Path, data: &DataSegments, energy_sum: f64) -> BrickResult<()> {
    let rows = data
        .included()
        .flat_map(|segment| segment.values().rows().map(|row| vec![row[0], row[0] * energy_sum]).collect::<Vec<_>>())
        .collect();
    let table = NumericTable::from_rows(rows).expect("rows");
    write_external_capture_table(&output_dir.join(EXTERNAL_CAPTURE_FILE), &table)
}

/// Fails every invocation the way a crashing solver would.
#[derive(Debug, Default)]
pub struct CrashingSolver;

impl SolverBackend for CrashingSolver {
    fn invoke(&self, request: &SolverRequest) -> BrickResult<SolverResponse> {
        assert!(request.input_path.is_file(), "document is written before the solver runs");
        Err(BrickError::ExternalSolver {
            command: "AZURE2".to_string(),
            status: "exit code 1".to_string(),
            stderr: "segmentation fault".to_string(),
        })
    }
}

/// Exits cleanly without producing any output files.
#[derive(Debug, Default)]
pub struct SilentSolver;

impl SolverBackend for SilentSolver {
    fn invoke(&self, _request: &SolverRequest) -> BrickResult<SolverResponse> {
        Ok(SolverResponse::default())
    }
}

pub fn relative_error(actual: f64, expected: f64) -> f64 {
    if expected == 0.0 {
        actual.abs()
    } else {
        ((actual - expected) / expected).abs()
    }
}
