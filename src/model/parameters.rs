//! Read and validate model parameters from `model.toml`.
use crate::balance::ReserveProduct;
use crate::input::{input_err_msg, read_toml};
use anyhow::{Context, Result, ensure};
use itertools::Itertools;
use log::warn;
use serde::Deserialize;
use std::path::Path;

const MODEL_PARAMETERS_FILE_NAME: &str = "model.toml";

macro_rules! define_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            $value
        }
    };
}

define_param_default!(default_mip_rel_gap, f64, 1e-4);
define_param_default!(default_feasibility_tolerance, f64, 1e-6);

/// Model parameters as defined in the `model.toml` file.
#[derive(Debug, Deserialize, PartialEq)]
pub struct ModelParameters {
    /// Reserve products to model.
    ///
    /// Each enabled product needs its own requirement and zone files.
    #[serde(default)]
    pub features: Vec<ReserveProduct>,
    /// Relative optimality gap at which the solver may stop for problems with binary variables
    #[serde(default = "default_mip_rel_gap")]
    pub mip_rel_gap: f64,
    /// Absolute tolerance used when checking the solution against the problem's constraints
    #[serde(default = "default_feasibility_tolerance")]
    pub feasibility_tolerance: f64,
}

impl Default for ModelParameters {
    fn default() -> Self {
        Self {
            features: Vec::new(),
            mip_rel_gap: default_mip_rel_gap(),
            feasibility_tolerance: default_feasibility_tolerance(),
        }
    }
}

/// Check that no feature is listed more than once
fn check_features(features: &[ReserveProduct]) -> Result<()> {
    let duplicates = features.iter().duplicates().join(", ");
    ensure!(
        duplicates.is_empty(),
        "`features` contains duplicate entries: {duplicates}"
    );

    Ok(())
}

/// Check that the `mip_rel_gap` parameter is valid
fn check_mip_rel_gap(value: f64) -> Result<()> {
    ensure!(
        (0.0..1.0).contains(&value),
        "mip_rel_gap must be a number in the range [0, 1)"
    );

    Ok(())
}

/// Check that the `feasibility_tolerance` parameter is valid
fn check_feasibility_tolerance(value: f64) -> Result<()> {
    ensure!(
        value.is_finite() && value > 0.0,
        "feasibility_tolerance must be a finite number greater than zero"
    );

    Ok(())
}

impl ModelParameters {
    /// Read a model file from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `model_dir` - Folder containing model configuration files
    ///
    /// # Returns
    ///
    /// The model file contents as a [`ModelParameters`] struct or an error if the file is invalid
    pub fn from_path<P: AsRef<Path>>(model_dir: P) -> Result<ModelParameters> {
        let file_path = model_dir.as_ref().join(MODEL_PARAMETERS_FILE_NAME);
        let model_params: ModelParameters = read_toml(&file_path)?;
        model_params
            .validate()
            .with_context(|| input_err_msg(file_path))?;

        Ok(model_params)
    }

    /// Check every parameter, warning about valid but doubtful values
    pub fn validate(&self) -> Result<()> {
        check_features(&self.features)?;
        check_mip_rel_gap(self.mip_rel_gap)?;
        check_feasibility_tolerance(self.feasibility_tolerance)?;

        if self.mip_rel_gap > 0.01 {
            warn!(
                "mip_rel_gap is set to {}. Solutions with binary builds may be far from optimal.",
                self.mip_rel_gap
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn model_params_from_path() {
        let dir = tempdir().unwrap();
        {
            let mut file = File::create(dir.path().join(MODEL_PARAMETERS_FILE_NAME)).unwrap();
            writeln!(file, "features = [\"regulation_up\", \"lf_reserves_down\"]").unwrap();
        }

        let model_params = ModelParameters::from_path(dir.path()).unwrap();
        assert_eq!(
            model_params.features,
            [ReserveProduct::RegulationUp, ReserveProduct::LfReservesDown]
        );
        assert_eq!(model_params.mip_rel_gap, 1e-4);
    }

    #[test]
    fn model_params_empty_file() {
        let dir = tempdir().unwrap();
        File::create(dir.path().join(MODEL_PARAMETERS_FILE_NAME)).unwrap();
        assert_eq!(
            ModelParameters::from_path(dir.path()).unwrap(),
            ModelParameters::default()
        );
    }

    #[test]
    fn check_features_works() {
        check_features(&[]).unwrap();
        check_features(&[ReserveProduct::RegulationUp]).unwrap();
        assert!(
            check_features(&[ReserveProduct::RegulationUp, ReserveProduct::RegulationUp])
                .is_err()
        );
    }

    #[rstest]
    #[case(0.0, true)]
    #[case(1e-4, true)]
    #[case(0.5, true)]
    #[case(1.0, false)]
    #[case(-1e-6, false)]
    #[case(f64::NAN, false)]
    fn check_mip_rel_gap_works(#[case] value: f64, #[case] expected_valid: bool) {
        assert_eq!(check_mip_rel_gap(value).is_ok(), expected_valid);
    }

    #[rstest]
    #[case(1e-6, true)]
    #[case(0.0, false)]
    #[case(f64::INFINITY, false)]
    fn check_feasibility_tolerance_works(#[case] value: f64, #[case] expected_valid: bool) {
        assert_eq!(check_feasibility_tolerance(value).is_ok(), expected_valid);
    }
}
