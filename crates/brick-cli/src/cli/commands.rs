use super::CliError;
use super::helpers::{EvaluationArgs, NamedTable, print_json, print_row_counts};
use brick_core::{Config, ExtrapolateOptions, PredictOptions};
use serde::Serialize;
use std::path::PathBuf;

#[derive(clap::Args)]
pub(super) struct ParamsArgs {
    /// AZURE2 input file
    #[arg(value_name = "file.azr")]
    input: PathBuf,

    /// Print JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[derive(clap::Args)]
pub(super) struct SegmentsArgs {
    /// AZURE2 input file
    #[arg(value_name = "file.azr")]
    input: PathBuf,
}

#[derive(clap::Args)]
pub(super) struct PredictArgs {
    #[command(flatten)]
    evaluation: EvaluationArgs,

    /// Also read reduced width amplitudes
    #[arg(long)]
    amplitudes: bool,
}

#[derive(clap::Args)]
pub(super) struct RwasArgs {
    #[command(flatten)]
    evaluation: EvaluationArgs,
}

#[derive(clap::Args)]
pub(super) struct ExtrapolateArgs {
    #[command(flatten)]
    evaluation: EvaluationArgs,

    /// Test segment to include; repeat to select several
    #[arg(long = "segment", value_name = "index")]
    segments: Vec<usize>,

    /// Disable the Brune parameterization
    #[arg(long)]
    no_brune: bool,
}

#[derive(Serialize)]
struct ParameterRow {
    index: usize,
    label: String,
    description: String,
    value: f64,
}

pub(super) fn run_params_command(args: ParamsArgs) -> Result<i32, CliError> {
    let config = Config::load(&args.input)?;
    let values = config.input_values();

    let descriptions = config
        .parameters()
        .iter()
        .map(|parameter| parameter.description())
        .chain(config.registry().norm_factors().iter().map(|norm| {
            format!("normalization factor of data segment {}", norm.segment)
        }));
    let rows: Vec<ParameterRow> = config
        .labels()
        .into_iter()
        .zip(descriptions)
        .zip(values)
        .enumerate()
        .map(|(index, ((label, description), value))| ParameterRow {
            index,
            label,
            description,
            value,
        })
        .collect();

    if args.json {
        print_json(&rows)?;
    } else {
        for row in &rows {
            println!("{:>3}  {:<24} {:>14e}  {}", row.index, row.label, row.value, row.description);
        }
    }
    Ok(0)
}

pub(super) fn run_segments_command(args: SegmentsArgs) -> Result<i32, CliError> {
    let config = Config::load(&args.input)?;
    for line in config.test().describe() {
        println!("{line}");
    }
    Ok(0)
}

pub(super) fn run_predict_command(args: PredictArgs) -> Result<i32, CliError> {
    let azr = args.evaluation.load_facade()?;
    let theta = args.evaluation.theta_or(azr.config().input_values())?;
    let prediction = azr.predict_with(
        &theta,
        &PredictOptions {
            data_overrides: Vec::new(),
            with_amplitudes: args.amplitudes,
        },
    )?;

    if args.evaluation.json {
        #[derive(Serialize)]
        struct Report<'a> {
            tables: Vec<NamedTable<'a>>,
            amplitudes: Option<&'a [brick_core::output::ReducedWidthAmplitude]>,
        }
        let tables = azr
            .output_files()
            .iter()
            .zip(&prediction.tables)
            .map(|(file, table)| NamedTable::new(file, table))
            .collect();
        print_json(&Report {
            tables,
            amplitudes: prediction.amplitudes.as_deref(),
        })?;
    } else {
        print_row_counts(azr.output_files(), &prediction.tables);
        if let Some(amplitudes) = &prediction.amplitudes {
            println!("{} reduced width amplitudes", amplitudes.len());
        }
    }
    Ok(0)
}

pub(super) fn run_rwas_command(args: RwasArgs) -> Result<i32, CliError> {
    let azr = args.evaluation.load_facade()?;
    let theta = args.evaluation.theta_or(azr.config().input_values())?;
    let amplitudes = azr.reduced_width_amplitudes(&theta)?;

    if args.evaluation.json {
        print_json(&amplitudes)?;
    } else {
        for amplitude in &amplitudes {
            println!("{:<6} {:>3}  {:e}", amplitude.jpi, amplitude.channel, amplitude.amplitude);
        }
    }
    Ok(0)
}

pub(super) fn run_extrapolate_command(args: ExtrapolateArgs) -> Result<i32, CliError> {
    let azr = args.evaluation.load_facade()?;
    let theta = args.evaluation.theta_or(azr.config().input_values())?;

    let (files, segment_indices) = if args.segments.is_empty() {
        (azr.extrapolation_files().to_vec(), None)
    } else {
        let selected = azr.config().test().with_selection(&args.segments)?;
        (selected.output_files(), Some(args.segments))
    };
    let tables = azr.extrapolate(
        &theta,
        &ExtrapolateOptions {
            segment_indices,
            use_brune: args.no_brune.then_some(false),
            ..ExtrapolateOptions::default()
        },
    )?;

    if args.evaluation.json {
        let named: Vec<_> = files
            .iter()
            .zip(&tables)
            .map(|(file, table)| NamedTable::new(file, table))
            .collect();
        print_json(&named)?;
    } else {
        print_row_counts(&files, &tables);
    }
    Ok(0)
}
