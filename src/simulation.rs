//! Functionality for running a scenario: assemble, solve and write results.
use crate::assembly::{assemble, determine_modules};
use crate::model::Model;
use crate::output::DataWriter;
use crate::output::metadata::write_metadata;
use crate::solver::HighsSolver;
use anyhow::{Context, Result};
use log::info;
use std::path::Path;

/// Run the scenario.
///
/// # Arguments:
///
/// * `model` - The model to run
/// * `output_path` - The folder to which output files will be written
pub fn run(model: &Model, output_path: &Path) -> Result<()> {
    let modules = determine_modules(model);
    write_metadata(output_path, model, &modules).context("Failed to save metadata.")?;
    let mut writer = DataWriter::create(output_path)?;
    let assembled = assemble(model, &modules).context("Failed to assemble problem.")?;

    let solver = HighsSolver {
        mip_rel_gap: model.parameters.mip_rel_gap,
    };
    let solved = assembled
        .solve(&solver)
        .context("Failed to solve problem.")?;

    info!("Writing results to {}", output_path.display());
    solved.export_results(&mut writer)?;
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::model;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;
    use std::fs;
    use tempfile::tempdir;

    #[rstest]
    fn test_run_writes_results(model: Model) {
        let dir = tempdir().unwrap();
        run(&model, dir.path()).unwrap();

        for file_name in [
            "capacity.csv",
            "dispatch.csv",
            "reserve_provision.csv",
            "balance_violations.csv",
            "objective.toml",
            "metadata.toml",
        ] {
            assert!(dir.path().join(file_name).is_file(), "{file_name} missing");
        }

        // Load is met by the gas project, so there is no unserved energy
        let violations_path = dir.path().join("balance_violations.csv");
        let mut reader = csv::Reader::from_path(violations_path).unwrap();
        for record in reader.records() {
            let violation: f64 = record.unwrap()[4].parse().unwrap();
            assert_approx_eq!(f64, violation, 0.0, epsilon = 1e-6);
        }

        let objective: toml::Value =
            toml::from_str(&fs::read_to_string(dir.path().join("objective.toml")).unwrap())
                .unwrap();
        assert!(objective["total_cost"].as_float().unwrap() > 0.0);
    }
}
