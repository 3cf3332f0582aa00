//! The `gridplan` command line.
use crate::input::load_model;
use crate::log;
use crate::output::{create_output_directory, get_output_dir};
use crate::settings::{Settings, SolverOverrides};
use ::log::{info, warn};
use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Options for the `run` command
#[derive(Args, Default)]
pub struct RunOpts {
    /// Directory for output files [default: <results_root>/<scenario name>]
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
    /// Replace the contents of a non-empty output directory
    #[arg(long)]
    pub overwrite: bool,
    /// Solver options, taking precedence over `settings.toml` and `model.toml`
    #[command(flatten)]
    pub solver: SolverOverrides,
}

#[derive(Subcommand)]
enum Commands {
    /// Assemble and solve a scenario.
    Run {
        /// Path to the scenario directory.
        model_dir: PathBuf,
        #[command(flatten)]
        opts: RunOpts,
    },
    /// Load and check a scenario without solving it.
    Validate {
        /// Path to the scenario directory.
        model_dir: PathBuf,
    },
}

/// Parse CLI arguments and start the program
pub fn run_cli() -> Result<()> {
    match Cli::parse().command {
        Some(Commands::Run { model_dir, opts }) => handle_run_command(&model_dir, &opts, None),
        Some(Commands::Validate { model_dir }) => handle_validate_command(&model_dir, None),
        None => {
            Cli::command().print_long_help()?;
            Ok(())
        }
    }
}

fn settings_or_load(settings: Option<Settings>) -> Result<Settings> {
    match settings {
        Some(settings) => Ok(settings),
        None => Settings::load().context("Failed to load settings."),
    }
}

/// Handle the `run` command.
///
/// `settings` is read from `settings.toml` if not given.
pub fn handle_run_command(
    model_path: &Path,
    opts: &RunOpts,
    settings: Option<Settings>,
) -> Result<()> {
    let settings = settings_or_load(settings)?;
    let output_path = match &opts.output_dir {
        Some(output_dir) => output_dir.clone(),
        None => get_output_dir(model_path, settings.results_root)?,
    };
    let overwritten = create_output_directory(&output_path, opts.overwrite || settings.overwrite)
        .with_context(|| {
            format!(
                "Failed to create output directory: {}",
                output_path.display()
            )
        })?;

    log::init(&settings.log_level, Some(output_path.as_path()))
        .context("Failed to initialise logging.")?;
    info!("Starting gridplan v{}", env!("CARGO_PKG_VERSION"));
    if overwritten {
        warn!(
            "Existing results in {} were deleted",
            output_path.display()
        );
    }

    let mut model = load_model(model_path).context("Failed to load model.")?;
    opts.solver
        .or(settings.solver)
        .apply(&mut model.parameters)
        .context("Invalid solver options.")?;
    info!("Loaded model from {}", model_path.display());
    info!("Output folder: {}", output_path.display());

    crate::simulation::run(&model, &output_path)?;
    info!("Run complete!");

    Ok(())
}

/// Handle the `validate` command. No log file is written.
pub fn handle_validate_command(model_path: &Path, settings: Option<Settings>) -> Result<()> {
    let settings = settings_or_load(settings)?;
    log::init(&settings.log_level, None).context("Failed to initialise logging.")?;

    let mut model = load_model(model_path).context("Failed to validate model.")?;
    settings
        .solver
        .apply(&mut model.parameters)
        .context("Invalid solver options in settings.")?;
    info!("Model validation successful!");

    Ok(())
}
