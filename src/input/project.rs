//! Code for reading [`Project`]s from a CSV file.
use super::{input_err_msg, read_csv};
use crate::balance::{ReserveProduct, ZoneID};
use crate::error::ConfigurationError;
use crate::id::IDCollection;
use crate::project::{CapacityType, OperationalType, Project, ProjectMap};
use crate::units::{Dimensionless, MoneyPerCapacity, MoneyPerEnergy, UnitType};
use anyhow::{Context, Result, ensure};
use indexmap::IndexSet;
use serde::Deserialize;
use std::path::Path;
use std::rc::Rc;

const PROJECTS_FILE_NAME: &str = "projects.csv";

#[derive(Debug, PartialEq, Deserialize)]
struct ProjectRaw {
    project: String,
    capacity_type: CapacityType,
    operational_type: OperationalType,
    technology: String,
    load_zone: String,
    variable_cost_per_mwh: MoneyPerEnergy,
    #[serde(default)]
    min_stable_level: Option<Dimensionless>,
    #[serde(default)]
    startup_cost_per_mw: Option<MoneyPerCapacity>,
    #[serde(default)]
    shutdown_cost_per_mw: Option<MoneyPerCapacity>,
    #[serde(default)]
    lf_reserves_up: Option<bool>,
    #[serde(default)]
    lf_reserves_down: Option<bool>,
    #[serde(default)]
    regulation_up: Option<bool>,
    #[serde(default)]
    regulation_down: Option<bool>,
    #[serde(default)]
    frequency_response: Option<bool>,
}

impl ProjectRaw {
    fn validate(&self) -> Result<()> {
        ensure!(
            self.variable_cost_per_mwh.is_finite(),
            "Invalid variable cost ({}) for project {}",
            self.variable_cost_per_mwh,
            self.project
        );
        if let Some(level) = self.min_stable_level {
            ensure!(
                (0.0..=1.0).contains(&level.value()),
                "min_stable_level for project {} must be between 0 and 1",
                self.project
            );
        }
        for cost in [self.startup_cost_per_mw, self.shutdown_cost_per_mw]
            .into_iter()
            .flatten()
        {
            ensure!(
                cost.is_finite() && cost.value() >= 0.0,
                "Invalid startup or shutdown cost ({cost}) for project {}. Must be >=0.",
                self.project
            );
        }

        Ok(())
    }

    /// The reserve products flagged in the row's capability columns
    fn reserve_capabilities(&self) -> IndexSet<ReserveProduct> {
        [
            (ReserveProduct::LfReservesUp, self.lf_reserves_up),
            (ReserveProduct::LfReservesDown, self.lf_reserves_down),
            (ReserveProduct::RegulationUp, self.regulation_up),
            (ReserveProduct::RegulationDown, self.regulation_down),
            (ReserveProduct::FrequencyResponse, self.frequency_response),
        ]
        .into_iter()
        .filter(|(_, flag)| flag.unwrap_or(false))
        .map(|(product, _)| product)
        .collect()
    }
}

/// Read projects from the model directory.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
/// * `zone_ids` - All load zones
///
/// # Returns
///
/// A map of projects, keyed by ID, in the order they appear in the file.
pub fn read_projects(model_dir: &Path, zone_ids: &IndexSet<ZoneID>) -> Result<ProjectMap> {
    let file_path = model_dir.join(PROJECTS_FILE_NAME);
    let projects_csv = read_csv(&file_path)?;
    read_projects_from_iter(projects_csv, zone_ids).with_context(|| input_err_msg(&file_path))
}

fn read_projects_from_iter<I>(iter: I, zone_ids: &IndexSet<ZoneID>) -> Result<ProjectMap>
where
    I: Iterator<Item = ProjectRaw>,
{
    let mut projects = ProjectMap::new();
    for raw in iter {
        raw.validate()?;
        let load_zone = zone_ids
            .get_id(&raw.load_zone)
            .with_context(|| {
                format!(
                    "Project {} has unknown load zone {}",
                    raw.project, raw.load_zone
                )
            })?
            .clone();

        let project = Project {
            id: raw.project.as_str().into(),
            capacity_type: raw.capacity_type,
            operational_type: raw.operational_type,
            technology: raw.technology.clone(),
            load_zone,
            variable_cost_per_mwh: raw.variable_cost_per_mwh,
            min_stable_level: raw.min_stable_level.unwrap_or_default(),
            startup_cost_per_mw: raw.startup_cost_per_mw.unwrap_or_default(),
            shutdown_cost_per_mw: raw.shutdown_cost_per_mw.unwrap_or_default(),
            reserve_capabilities: raw.reserve_capabilities(),
        };

        if projects
            .insert(project.id.clone(), Rc::new(project))
            .is_some()
        {
            Err(ConfigurationError::DuplicateID {
                kind: "project",
                id: raw.project,
            })?;
        }
    }

    Ok(projects)
}
