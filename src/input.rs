//! Common routines for handling input data.
use crate::assembly::{determine_modules, validate_modules};
use crate::error::ConfigurationError;
use crate::model::{Model, ModelParameters};
use anyhow::{Context, Result, bail};
use itertools::Itertools;
use log::info;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

mod balance;
use balance::{read_load, read_reserves};
mod capacity;
use capacity::read_capacity_tables;
mod project;
use project::read_projects;
mod temporal;
use temporal::read_temporal_topology;

/// Read a series of type `T`s from a CSV file.
///
/// Will raise an error if the file is empty.
///
/// # Arguments
///
/// * `file_path` - Path to the CSV file
pub fn read_csv<'a, T: DeserializeOwned + 'a>(
    file_path: &'a Path,
) -> Result<impl Iterator<Item = T> + 'a> {
    let vec = read_csv_internal(file_path)?;
    if vec.is_empty() {
        bail!("CSV file {} cannot be empty", file_path.display());
    }
    Ok(vec.into_iter())
}

/// Read a series of type `T`s from a CSV file.
///
/// A missing file is treated as an empty table.
///
/// # Arguments
///
/// * `file_path` - Path to the CSV file
pub fn read_csv_optional<'a, T: DeserializeOwned + 'a>(
    file_path: &'a Path,
) -> Result<impl Iterator<Item = T> + 'a> {
    if !file_path.exists() {
        return Ok(Vec::new().into_iter());
    }

    let vec = read_csv_internal(file_path)?;
    Ok(vec.into_iter())
}

fn read_csv_internal<T: DeserializeOwned>(file_path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(file_path)
        .with_context(|| input_err_msg(file_path))?;

    // Columns are looked up by name, so a repeated name would make one of them unreachable
    let headers = reader
        .headers()
        .with_context(|| input_err_msg(file_path))?
        .clone();
    if let Some(column) = headers.iter().duplicates().next() {
        return Err(ConfigurationError::DuplicateColumn {
            table: file_name(file_path),
            column: column.to_string(),
        }
        .into());
    }

    let vec = reader
        .deserialize()
        .process_results(|iter| iter.collect_vec())
        .with_context(|| input_err_msg(file_path))?;

    Ok(vec)
}

/// The final component of a path, for error messages
fn file_name(file_path: &Path) -> String {
    file_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_path.display().to_string())
}

/// Parse a TOML file at the specified path.
///
/// # Arguments
///
/// * `file_path` - Path to the TOML file
///
/// # Returns
///
/// * The deserialised TOML data or an error if the file could not be read or parsed.
pub fn read_toml<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let toml_str = fs::read_to_string(file_path).with_context(|| input_err_msg(file_path))?;
    let toml_data = toml::from_str(&toml_str).with_context(|| input_err_msg(file_path))?;
    Ok(toml_data)
}

/// Format an error message to include the file path. To be used with `anyhow::Context`.
pub fn input_err_msg<P: AsRef<Path>>(file_path: P) -> String {
    format!("Error reading {}", file_path.as_ref().display())
}

/// Read a scenario from the specified directory.
///
/// Besides parsing every input file, this checks the inputs of every module the scenario needs,
/// so a scenario which loads successfully can be assembled.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
///
/// # Returns
///
/// The static model data or an error.
pub fn load_model<P: AsRef<Path>>(model_dir: P) -> Result<Model> {
    let model_dir = model_dir.as_ref();
    let parameters = ModelParameters::from_path(model_dir)?;
    let topology = read_temporal_topology(model_dir)?;
    let load = read_load(model_dir, &topology)?;
    let zone_ids = load.zones.keys().cloned().collect();
    let projects = read_projects(model_dir, &zone_ids)?;
    let project_ids = projects.keys().cloned().collect();
    let capacity_tables = read_capacity_tables(model_dir, &project_ids, &topology)?;
    let reserves = read_reserves(model_dir, &parameters.features, &topology)?;

    let model = Model {
        model_path: model_dir.to_path_buf(),
        parameters,
        topology,
        projects,
        capacity_tables,
        load,
        reserves,
    };
    validate_modules(&model, &determine_modules(&model))?;
    info!(
        "Loaded {} projects in {} load zones",
        model.projects.len(),
        model.load.zones.len()
    );

    Ok(model)
}
