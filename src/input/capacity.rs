//! Code for reading the per-project capacity tables.
//!
//! Rows for all capacity types share the same tables. Each capacity module later keeps only the
//! rows for its own projects, so here we only check that rows refer to known projects and periods.
use super::{input_err_msg, read_csv_optional};
use crate::capacity::{
    CapacityTables, ExistingProjectPeriodParams, NewBuildCost, NewBuildPotential, NewBuildSize,
};
use crate::id::IDCollection;
use crate::project::ProjectID;
use crate::temporal::{PeriodID, TemporalTopology};
use crate::units::UnitType;
use anyhow::{Context, Result, ensure};
use indexmap::IndexSet;
use itertools::Itertools;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::hash::Hash;
use std::path::Path;

const EXISTING_FILE_NAME: &str = "existing_project_period_params.csv";
const NEW_BUILD_COSTS_FILE_NAME: &str = "new_build_costs.csv";
const NEW_BUILD_SIZES_FILE_NAME: &str = "new_build_sizes.csv";
const NEW_BUILD_POTENTIALS_FILE_NAME: &str = "new_build_potentials.csv";

/// A row of one of the capacity tables
trait CapacityRow: DeserializeOwned {
    /// The columns which must be unique within the table
    type Key: Eq + Hash + std::fmt::Debug;

    fn project(&self) -> &ProjectID;

    fn key(&self) -> Self::Key;

    /// The period the row refers to, if any
    fn period(&self) -> Option<PeriodID> {
        None
    }

    /// Check the row's values
    fn validate(&self) -> Result<()>;
}

/// Check that a value is a finite, non-negative number
fn check_non_negative<T: UnitType + std::fmt::Display>(value: T, what: &str) -> Result<()> {
    ensure!(
        value.is_finite() && value.value() >= 0.0,
        "Invalid value for {what} ({value}). Must be >=0."
    );

    Ok(())
}

impl CapacityRow for ExistingProjectPeriodParams {
    type Key = (ProjectID, PeriodID);

    fn project(&self) -> &ProjectID {
        &self.project
    }

    fn key(&self) -> Self::Key {
        (self.project.clone(), self.period)
    }

    fn period(&self) -> Option<PeriodID> {
        Some(self.period)
    }

    fn validate(&self) -> Result<()> {
        check_non_negative(self.existing_capacity_mw, "existing_capacity_mw")?;
        if let Some(fixed_cost) = self.fixed_cost_per_mw_yr {
            check_non_negative(fixed_cost, "fixed_cost_per_mw_yr")?;
        }

        Ok(())
    }
}

impl CapacityRow for NewBuildCost {
    type Key = (ProjectID, PeriodID);

    fn project(&self) -> &ProjectID {
        &self.project
    }

    fn key(&self) -> Self::Key {
        (self.project.clone(), self.vintage)
    }

    fn period(&self) -> Option<PeriodID> {
        Some(self.vintage)
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            self.lifetime_yrs > 0,
            "lifetime_yrs must be greater than zero"
        );
        check_non_negative(
            self.annualized_real_cost_per_mw_yr,
            "annualized_real_cost_per_mw_yr",
        )
    }
}

impl CapacityRow for NewBuildSize {
    type Key = ProjectID;

    fn project(&self) -> &ProjectID {
        &self.project
    }

    fn key(&self) -> Self::Key {
        self.project.clone()
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            self.build_size_mw.is_finite() && self.build_size_mw.value() > 0.0,
            "build_size_mw must be a finite number greater than zero"
        );

        Ok(())
    }
}

impl CapacityRow for NewBuildPotential {
    type Key = (ProjectID, PeriodID);

    fn project(&self) -> &ProjectID {
        &self.project
    }

    fn key(&self) -> Self::Key {
        (self.project.clone(), self.period)
    }

    fn period(&self) -> Option<PeriodID> {
        Some(self.period)
    }

    fn validate(&self) -> Result<()> {
        check_non_negative(
            self.max_cumulative_new_build_mw,
            "max_cumulative_new_build_mw",
        )
    }
}

/// Check every row of a table, returning them in file order
fn read_rows_from_iter<T, I>(
    iter: I,
    project_ids: &IndexSet<ProjectID>,
    topology: &TemporalTopology,
) -> Result<Vec<T>>
where
    T: CapacityRow,
    I: Iterator<Item = T>,
{
    let mut keys = HashSet::new();
    iter.map(|row| -> Result<_> {
        project_ids.get_id(&row.project().0)?;
        if let Some(period) = row.period() {
            ensure!(
                topology.contains_period(period),
                "Project {} has a row for undeclared period {period}",
                row.project()
            );
        }
        row.validate()
            .with_context(|| format!("Invalid row for project {}", row.project()))?;
        ensure!(
            keys.insert(row.key()),
            "Duplicate row for {:?}",
            row.key()
        );

        Ok(row)
    })
    .try_collect()
}

fn read_table<T: CapacityRow>(
    file_path: &Path,
    project_ids: &IndexSet<ProjectID>,
    topology: &TemporalTopology,
) -> Result<Vec<T>> {
    let iter = read_csv_optional(file_path)?;
    read_rows_from_iter(iter, project_ids, topology).with_context(|| input_err_msg(file_path))
}

/// Read all capacity tables from the model directory.
///
/// Every table is optional: a scenario with only new-build projects needs no existing-capacity
/// table and vice versa. Missing rows are reported when the capacity modules validate their inputs.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
/// * `project_ids` - All project IDs
/// * `topology` - The model's temporal structure
pub fn read_capacity_tables(
    model_dir: &Path,
    project_ids: &IndexSet<ProjectID>,
    topology: &TemporalTopology,
) -> Result<CapacityTables> {
    Ok(CapacityTables {
        existing: read_table(&model_dir.join(EXISTING_FILE_NAME), project_ids, topology)?,
        new_build_costs: read_table(
            &model_dir.join(NEW_BUILD_COSTS_FILE_NAME),
            project_ids,
            topology,
        )?,
        new_build_sizes: read_table(
            &model_dir.join(NEW_BUILD_SIZES_FILE_NAME),
            project_ids,
            topology,
        )?,
        new_build_potentials: read_table(
            &model_dir.join(NEW_BUILD_POTENTIALS_FILE_NAME),
            project_ids,
            topology,
        )?,
    })
}
