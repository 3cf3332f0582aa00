//! The `metadata.toml` file written next to the results of a run.
use crate::assembly::Module;
use crate::model::Model;
use anyhow::{Context, Result};
use chrono::Local;
use serde::Serialize;
use std::fs;
use std::path::Path;

const METADATA_FILE_NAME: &str = "metadata.toml";

#[derive(Serialize)]
struct Metadata<'a> {
    run: RunMetadata<'a>,
    scenario: ScenarioMetadata,
    program: ProgramMetadata,
}

#[derive(Serialize)]
struct RunMetadata<'a> {
    model_path: &'a Path,
    /// Start of the run, in RFC 3339 format
    started: String,
}

/// What the problem was assembled from and how it was solved
#[derive(Serialize)]
struct ScenarioMetadata {
    /// Modules in the order they were run
    modules: Vec<String>,
    /// Enabled reserve products
    features: Vec<String>,
    num_projects: usize,
    num_timepoints: usize,
    mip_rel_gap: f64,
    feasibility_tolerance: f64,
}

impl ScenarioMetadata {
    fn new(model: &Model, modules: &[Module]) -> Self {
        Self {
            modules: modules.iter().map(ToString::to_string).collect(),
            features: model.iter_features().map(|f| f.to_string()).collect(),
            num_projects: model.projects.len(),
            num_timepoints: model.topology.iter_timepoints().count(),
            mip_rel_gap: model.parameters.mip_rel_gap,
            feasibility_tolerance: model.parameters.feasibility_tolerance,
        }
    }
}

#[derive(Serialize)]
struct ProgramMetadata {
    name: &'static str,
    version: &'static str,
    debug_build: bool,
}

const PROGRAM: ProgramMetadata = ProgramMetadata {
    name: env!("CARGO_PKG_NAME"),
    version: env!("CARGO_PKG_VERSION"),
    debug_build: cfg!(debug_assertions),
};

/// Record the scenario, the modules assembled for it and the program version in `output_path`
pub fn write_metadata(output_path: &Path, model: &Model, modules: &[Module]) -> Result<()> {
    let metadata = Metadata {
        run: RunMetadata {
            model_path: &model.model_path,
            started: Local::now().to_rfc3339(),
        },
        scenario: ScenarioMetadata::new(model, modules),
        program: PROGRAM,
    };
    let file_path = output_path.join(METADATA_FILE_NAME);
    fs::write(&file_path, toml::to_string(&metadata)?)
        .with_context(|| format!("Could not write {}", file_path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::determine_modules;
    use crate::balance::ReserveProduct;
    use crate::fixture::model;
    use rstest::rstest;
    use tempfile::tempdir;

    #[rstest]
    fn test_write_metadata(mut model: Model) {
        model.parameters.features = vec![ReserveProduct::RegulationUp];
        model.parameters.mip_rel_gap = 0.01;
        let modules = determine_modules(&model);

        let dir = tempdir().unwrap();
        write_metadata(dir.path(), &model, &modules).unwrap();

        let contents = fs::read_to_string(dir.path().join(METADATA_FILE_NAME)).unwrap();
        let value: toml::Value = toml::from_str(&contents).unwrap();
        assert_eq!(value["run"]["model_path"].as_str(), Some("model"));
        assert_eq!(value["program"]["name"].as_str(), Some("gridplan"));

        let scenario = &value["scenario"];
        let modules: Vec<_> = scenario["modules"]
            .as_array()
            .unwrap()
            .iter()
            .map(|module| module.as_str().unwrap())
            .collect();
        assert_eq!(
            modules,
            [
                "capacity_type:existing_gen_no_economic_retirement",
                "operational_type:dispatchable_no_commit",
                "reserve:regulation_up",
                "load_balance"
            ]
        );
        assert_eq!(scenario["features"][0].as_str(), Some("regulation_up"));
        assert_eq!(scenario["num_timepoints"].as_integer(), Some(6));
        assert_eq!(scenario["mip_rel_gap"].as_float(), Some(0.01));
    }
}
