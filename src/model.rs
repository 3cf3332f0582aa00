//! The model represents the static input data for a scenario.
use crate::balance::{BalanceInputs, ReserveProduct};
use crate::capacity::CapacityTables;
use crate::project::{CapacityType, OperationalType, Project, ProjectMap};
use crate::temporal::TemporalTopology;
use indexmap::IndexMap;
use std::path::PathBuf;
use std::rc::Rc;

pub mod parameters;
pub use parameters::ModelParameters;

/// Model definition
pub struct Model {
    /// Path to the scenario folder
    pub model_path: PathBuf,
    /// Parameters from the model TOML file
    pub parameters: ModelParameters,
    /// Timepoints, horizons and periods
    pub topology: TemporalTopology,
    /// Projects, keyed by ID
    pub projects: ProjectMap,
    /// Per-project and per-period capacity inputs, for all capacity types
    pub capacity_tables: CapacityTables,
    /// Zones and load for the energy balance
    pub load: BalanceInputs,
    /// Zones and requirements for each enabled reserve product
    pub reserves: IndexMap<ReserveProduct, BalanceInputs>,
}

impl Model {
    /// Iterate over the projects with the given capacity type
    pub fn iter_projects_with_capacity_type(
        &self,
        capacity_type: CapacityType,
    ) -> impl Iterator<Item = &Rc<Project>> {
        self.projects
            .values()
            .filter(move |project| project.capacity_type == capacity_type)
    }

    /// Iterate over the projects with the given operational type
    pub fn iter_projects_with_operational_type(
        &self,
        operational_type: OperationalType,
    ) -> impl Iterator<Item = &Rc<Project>> {
        self.projects
            .values()
            .filter(move |project| project.operational_type == operational_type)
    }

    /// Iterate over the enabled reserve products
    pub fn iter_features(&self) -> impl Iterator<Item = ReserveProduct> + '_ {
        self.parameters.features.iter().copied()
    }
}
