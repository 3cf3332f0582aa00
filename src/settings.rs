//! Program settings from `settings.toml` in the working directory.
//!
//! Settings apply to every scenario run from that directory. Solver options given here take
//! precedence over those in a scenario's `model.toml`, and are in turn overridden by the command
//! line.
use crate::input::read_toml;
use crate::log::DEFAULT_LOG_LEVEL;
use crate::model::ModelParameters;
use anyhow::Result;
use clap::Args;
use serde::Deserialize;
use std::path::{Path, PathBuf};

const SETTINGS_FILE_NAME: &str = "settings.toml";

/// Solver options which override a scenario's `model.toml`
#[derive(Args, Debug, Clone, Copy, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SolverOverrides {
    /// Relative optimality gap for problems with binary builds
    #[arg(long)]
    pub mip_rel_gap: Option<f64>,
    /// Absolute tolerance when checking the solution against the constraints
    #[arg(long)]
    pub feasibility_tolerance: Option<f64>,
}

impl SolverOverrides {
    /// Fill in any option not set here from `fallback`
    pub fn or(self, fallback: Self) -> Self {
        Self {
            mip_rel_gap: self.mip_rel_gap.or(fallback.mip_rel_gap),
            feasibility_tolerance: self.feasibility_tolerance.or(fallback.feasibility_tolerance),
        }
    }

    /// Replace the scenario's solver options with those set here
    pub fn apply(&self, parameters: &mut ModelParameters) -> Result<()> {
        if let Some(mip_rel_gap) = self.mip_rel_gap {
            parameters.mip_rel_gap = mip_rel_gap;
        }
        if let Some(feasibility_tolerance) = self.feasibility_tolerance {
            parameters.feasibility_tolerance = feasibility_tolerance;
        }

        parameters.validate()
    }
}

/// Program settings
#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Log level used unless `GRIDPLAN_LOG_LEVEL` is set
    pub log_level: String,
    /// Replace existing results without `--overwrite`
    pub overwrite: bool,
    /// Folder under which each scenario's results go, unless `--output-dir` is given
    pub results_root: PathBuf,
    /// The `[solver]` table
    pub solver: SolverOverrides,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            overwrite: false,
            results_root: PathBuf::from("gridplan_results"),
            solver: SolverOverrides::default(),
        }
    }
}

impl Settings {
    /// Load `settings.toml` from the working directory, or the defaults if there is none
    pub fn load() -> Result<Settings> {
        Self::load_from_path(Path::new(SETTINGS_FILE_NAME))
    }

    fn load_from_path(file_path: &Path) -> Result<Settings> {
        if !file_path.is_file() {
            return Ok(Settings::default());
        }

        read_toml(file_path)
    }
}
