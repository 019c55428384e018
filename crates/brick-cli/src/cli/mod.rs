mod commands;
mod helpers;

use brick_core::BrickError;
use clap::Parser;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_LEVEL: &str = "warn";

pub fn run_from_env() -> i32 {
    let args: Vec<String> = std::env::args().skip(1).collect();

    match run(args) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("{}", error.diagnostic_line());
            error.exit_code()
        }
    }
}

pub fn run<I, S>(args: I) -> Result<i32, CliError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let full_args = std::iter::once("brick".to_string())
        .chain(args.into_iter().map(Into::into))
        .collect::<Vec<_>>();
    parse_and_dispatch(full_args)
}

fn parse_and_dispatch(args: Vec<String>) -> Result<i32, CliError> {
    match Cli::try_parse_from(&args) {
        Ok(cli) => {
            init_tracing(cli.log_level.as_deref());
            dispatch_parsed(cli.command)
        }
        Err(err) => match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                print!("{}", err);
                Ok(0)
            }
            _ => Err(CliError::Usage(err.to_string())),
        },
    }
}

/// `RUST_LOG` wins over `--log-level`.
fn init_tracing(log_level: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level.unwrap_or(DEFAULT_LOG_LEVEL)))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));

    // A subscriber may already be installed when `run` is called twice.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .without_time()
        .try_init();
}

#[derive(Parser)]
#[command(name = "brick", about = "Evaluate AZURE2 R-matrix inputs in isolated workspaces")]
struct Cli {
    /// Log filter directive, e.g. `debug` or `brick.workspace=debug`
    #[arg(long, global = true, value_name = "filter")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// List the free parameters of an input file
    Params(commands::ParamsArgs),
    /// List the test segments used for extrapolation
    Segments(commands::SegmentsArgs),
    /// Evaluate the data segments once
    Predict(commands::PredictArgs),
    /// Print reduced width amplitudes
    Rwas(commands::RwasArgs),
    /// Evaluate the test segments once
    Extrapolate(commands::ExtrapolateArgs),
}

impl CliCommand {
    const fn name(&self) -> &'static str {
        match self {
            Self::Params(_) => "params",
            Self::Segments(_) => "segments",
            Self::Predict(_) => "predict",
            Self::Rwas(_) => "rwas",
            Self::Extrapolate(_) => "extrapolate",
        }
    }
}

fn dispatch_parsed(command: CliCommand) -> Result<i32, CliError> {
    tracing::debug!(target: "brick.cli", command = command.name(), "dispatching");
    match command {
        CliCommand::Params(args) => commands::run_params_command(args),
        CliCommand::Segments(args) => commands::run_segments_command(args),
        CliCommand::Predict(args) => commands::run_predict_command(args),
        CliCommand::Rwas(args) => commands::run_rwas_command(args),
        CliCommand::Extrapolate(args) => commands::run_extrapolate_command(args),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error(transparent)]
    Compute(#[from] BrickError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Usage(_) => 2,
            Self::Compute(error) => error.exit_code(),
            Self::Internal(_) => 5,
        }
    }

    pub fn diagnostic_line(&self) -> String {
        match self {
            Self::Usage(message) => format!("ERROR: [INPUT.CLI_USAGE] {}", message.trim_end()),
            Self::Compute(error) => error.diagnostic_line(),
            Self::Internal(error) => format!("ERROR: [INTERNAL.CLI] {error:#}"),
        }
    }
}
