//! Code for reading the temporal structure of a scenario from CSV files.
use super::{input_err_msg, read_csv};
use crate::temporal::{HorizonData, PeriodData, TemporalTopology, TimepointData};
use anyhow::{Context, Result, ensure};
use std::path::Path;

const PERIODS_FILE_NAME: &str = "periods.csv";
const HORIZONS_FILE_NAME: &str = "horizons.csv";
const TIMEPOINTS_FILE_NAME: &str = "timepoints.csv";

/// Check the values in a period row which the topology itself does not constrain
fn validate_period(period: &PeriodData) -> Result<()> {
    ensure!(
        period.discount_factor.is_finite() && period.discount_factor >= 0.0,
        "Invalid discount factor {} for period {}",
        period.discount_factor,
        period.period
    );
    ensure!(
        period.number_years_represented.is_finite() && period.number_years_represented > 0.0,
        "Invalid number of years {} for period {}",
        period.number_years_represented,
        period.period
    );

    Ok(())
}

fn validate_horizon(horizon: &HorizonData) -> Result<()> {
    ensure!(
        horizon.horizon_weight.is_finite() && horizon.horizon_weight > 0.0,
        "Invalid weight {} for horizon {}",
        horizon.horizon_weight,
        horizon.horizon
    );

    Ok(())
}

/// Read periods, horizons and timepoints from the model directory and build the topology.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
pub fn read_temporal_topology(model_dir: &Path) -> Result<TemporalTopology> {
    let periods_path = model_dir.join(PERIODS_FILE_NAME);
    let periods: Vec<PeriodData> = read_csv(&periods_path)?.collect();
    periods
        .iter()
        .try_for_each(validate_period)
        .with_context(|| input_err_msg(&periods_path))?;

    let horizons_path = model_dir.join(HORIZONS_FILE_NAME);
    let horizons: Vec<HorizonData> = read_csv(&horizons_path)?.collect();
    horizons
        .iter()
        .try_for_each(validate_horizon)
        .with_context(|| input_err_msg(&horizons_path))?;

    let timepoints_path = model_dir.join(TIMEPOINTS_FILE_NAME);
    let timepoints: Vec<TimepointData> = read_csv(&timepoints_path)?.collect();

    TemporalTopology::new(&timepoints, &horizons, &periods)
        .with_context(|| format!("Invalid temporal structure in {}", model_dir.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write_files(dir: &Path, boundary: &str) {
        fs::write(
            dir.join(PERIODS_FILE_NAME),
            "period,discount_factor,number_years_represented\n2020,1.0,10\n",
        )
        .unwrap();
        fs::write(
            dir.join(HORIZONS_FILE_NAME),
            format!("horizon,boundary,horizon_weight\n1,{boundary},365\n"),
        )
        .unwrap();
        fs::write(
            dir.join(TIMEPOINTS_FILE_NAME),
            "timepoint,horizon,period,number_of_hours_in_timepoint\n\
             1,1,2020,12\n\
             2,1,2020,12\n",
        )
        .unwrap();
    }

    #[test]
    fn test_read_temporal_topology() {
        let dir = tempdir().unwrap();
        write_files(dir.path(), "circular");
        let topology = read_temporal_topology(dir.path()).unwrap();
        assert_eq!(topology.prev_timepoint(1), Some(2));
        assert_eq!(topology.timepoint_weight(1), 12.0 * 365.0);
    }

    #[test]
    fn test_read_temporal_topology_bad_boundary() {
        let dir = tempdir().unwrap();
        write_files(dir.path(), "wrap");
        let err = read_temporal_topology(dir.path()).unwrap_err();
        assert_eq!(
            err.chain().nth(1).unwrap().to_string(),
            "Invalid boundary value 'wrap' for horizon '1'. \
             Horizon boundary must be either 'circular' or 'linear'"
        );
    }

    #[test]
    fn test_validate_horizon() {
        let horizon = HorizonData {
            horizon: 1,
            boundary: "linear".into(),
            horizon_weight: 0.0,
        };
        assert!(validate_horizon(&horizon).is_err());
    }
}
