//! Capacity lifecycles.
//!
//! Each [`CapacityType`] determines how a project's operational capacity evolves across periods
//! and what it costs. The variants share the [`CapacityLifecycle`] capability and are dispatched
//! through the closed [`CapacityModule`] enum.
//!
//! Every variant selects, from the full input tables, only the rows for projects of its own
//! capacity type. A project with no rows simply has no capacity in any period.
use crate::balance::ZoneID;
use crate::model::Model;
use crate::output::DataWriter;
use crate::problem::Problem;
use crate::project::{CapacityType, ProjectID};
use crate::registry::{ComponentKey, DynamicComponents};
use crate::solver::Solution;
use crate::temporal::{PeriodID, TemporalTopology};
use crate::units::{Capacity, MoneyPerCapacityPerYear};
use anyhow::Result;
use good_lp::Expression;
use indexmap::IndexSet;
use log::debug;
use serde::{Deserialize, Serialize};

mod existing;
mod new_build;
mod retirement;
pub use existing::NoEconomicRetirement;
pub use new_build::{BuildKind, NewBuild};
pub use retirement::LinearEconomicRetirement;

/// A row of `existing_project_period_params.csv`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExistingProjectPeriodParams {
    /// The project
    pub project: ProjectID,
    /// The period
    pub period: PeriodID,
    /// Capacity installed before the start of the model
    pub existing_capacity_mw: Capacity,
    /// Fixed cost of keeping the capacity available.
    ///
    /// Optional for projects which cannot retire.
    pub fixed_cost_per_mw_yr: Option<MoneyPerCapacityPerYear>,
}

/// A row of `new_build_costs.csv`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewBuildCost {
    /// The project
    pub project: ProjectID,
    /// The period in which capacity is built
    pub vintage: PeriodID,
    /// How long capacity of this vintage remains operational
    pub lifetime_yrs: u32,
    /// Annualised investment cost
    pub annualized_real_cost_per_mw_yr: MoneyPerCapacityPerYear,
}

/// A row of `new_build_sizes.csv`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewBuildSize {
    /// The project
    pub project: ProjectID,
    /// The size of a single build
    pub build_size_mw: Capacity,
}

/// A row of `new_build_potentials.csv`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewBuildPotential {
    /// The project
    pub project: ProjectID,
    /// The period
    pub period: PeriodID,
    /// Upper limit on new capacity operational in the period, over all vintages
    pub max_cumulative_new_build_mw: Capacity,
}

/// The capacity input tables for all projects
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CapacityTables {
    /// Existing capacity and fixed costs
    pub existing: Vec<ExistingProjectPeriodParams>,
    /// New-build costs and lifetimes by vintage
    pub new_build_costs: Vec<NewBuildCost>,
    /// Unit sizes for binary new builds
    pub new_build_sizes: Vec<NewBuildSize>,
    /// Potentials for continuous new builds
    pub new_build_potentials: Vec<NewBuildPotential>,
}

/// A row of `capacity.csv`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapacityResult {
    /// The project
    pub project: ProjectID,
    /// The period
    pub period: PeriodID,
    /// The project's technology
    pub technology: String,
    /// The project's load zone
    pub load_zone: ZoneID,
    /// The project's capacity type
    pub capacity_type: CapacityType,
    /// Operational capacity in the period
    pub capacity_mw: f64,
    /// Capacity built in this period (new-build variants only)
    pub new_build_mw: Option<f64>,
    /// Capacity retired by this period (retirement variant only)
    pub retired_mw: Option<f64>,
}

/// The capability shared by every capacity lifecycle
pub trait CapacityLifecycle {
    /// The (project, period) pairs for which the project has operational capacity.
    ///
    /// This depends only on input data, so is available before any variables are added.
    fn operational_periods(&self) -> Vec<(ProjectID, PeriodID)>;

    /// Check the module's input data, returning a message for every problem found
    fn validate(&self) -> Vec<String> {
        Vec::new()
    }

    /// Add the module's decision variables to the problem
    fn add_variables(&mut self, problem: &mut Problem);

    /// The operational capacity of a project in a period, if it has any
    fn operational_capacity(&self, project: &ProjectID, period: PeriodID) -> Option<Expression>;

    /// The annualised cost of a project's capacity in a period, if any
    fn period_cost(&self, project: &ProjectID, period: PeriodID) -> Option<Expression>;

    /// Add the module's own constraints to the problem
    fn add_constraints(&self, problem: &mut Problem, topology: &TemporalTopology);

    /// Capacity built in `period`, for variants which build
    fn new_build(&self, _project: &ProjectID, _period: PeriodID) -> Option<Expression> {
        None
    }

    /// Capacity retired by `period`, for variants which retire
    fn retirement(&self, _project: &ProjectID, _period: PeriodID) -> Option<Expression> {
        None
    }
}

/// A capacity lifecycle for one [`CapacityType`]
#[derive(Debug, Clone)]
pub enum CapacityModule {
    /// See [`NoEconomicRetirement`]
    ExistingGenNoEconomicRetirement(NoEconomicRetirement),
    /// See [`LinearEconomicRetirement`]
    ExistingGenLinearEconomicRetirement(LinearEconomicRetirement),
    /// See [`NewBuild`]
    GenNewBin(NewBuild),
    /// See [`NewBuild`]
    GenNewLin(NewBuild),
}

impl CapacityModule {
    /// Create the module for `capacity_type`, selecting its rows from the model's input tables
    pub fn new(capacity_type: CapacityType, model: &Model) -> Self {
        let projects: IndexSet<ProjectID> = model
            .iter_projects_with_capacity_type(capacity_type)
            .map(|project| project.id.clone())
            .collect();
        let tables = &model.capacity_tables;
        let periods: Vec<_> = model.topology.iter_period_ids().collect();

        match capacity_type {
            CapacityType::ExistingGenNoEconomicRetirement => Self::ExistingGenNoEconomicRetirement(
                NoEconomicRetirement::new(&projects, &tables.existing),
            ),
            CapacityType::ExistingGenLinearEconomicRetirement => {
                Self::ExistingGenLinearEconomicRetirement(LinearEconomicRetirement::new(
                    &projects,
                    &tables.existing,
                ))
            }
            CapacityType::GenNewBin => Self::GenNewBin(NewBuild::new(
                BuildKind::Binary,
                projects,
                &periods,
                tables,
            )),
            CapacityType::GenNewLin => Self::GenNewLin(NewBuild::new(
                BuildKind::Linear,
                projects,
                &periods,
                tables,
            )),
        }
    }

    /// The capacity type this module implements
    pub fn capacity_type(&self) -> CapacityType {
        match self {
            Self::ExistingGenNoEconomicRetirement(_) => {
                CapacityType::ExistingGenNoEconomicRetirement
            }
            Self::ExistingGenLinearEconomicRetirement(_) => {
                CapacityType::ExistingGenLinearEconomicRetirement
            }
            Self::GenNewBin(_) => CapacityType::GenNewBin,
            Self::GenNewLin(_) => CapacityType::GenNewLin,
        }
    }

    fn lifecycle(&self) -> &dyn CapacityLifecycle {
        match self {
            Self::ExistingGenNoEconomicRetirement(inner) => inner,
            Self::ExistingGenLinearEconomicRetirement(inner) => inner,
            Self::GenNewBin(inner) | Self::GenNewLin(inner) => inner,
        }
    }

    fn lifecycle_mut(&mut self) -> &mut dyn CapacityLifecycle {
        match self {
            Self::ExistingGenNoEconomicRetirement(inner) => inner,
            Self::ExistingGenLinearEconomicRetirement(inner) => inner,
            Self::GenNewBin(inner) | Self::GenNewLin(inner) => inner,
        }
    }

    /// Registration phase: add variables and publish capacity and cost for every operational
    /// (project, period)
    pub fn add_model_components(
        &mut self,
        problem: &mut Problem,
        registry: &mut DynamicComponents,
    ) -> Result<()> {
        let source = self.capacity_type().to_string();
        self.lifecycle_mut().add_variables(problem);

        let lifecycle = self.lifecycle();
        for (project, period) in lifecycle.operational_periods() {
            if let Some(capacity) = lifecycle.operational_capacity(&project, period) {
                registry.register(
                    ComponentKey::Capacity {
                        project: project.clone(),
                        period,
                    },
                    &source,
                    capacity,
                )?;
            }
            if let Some(cost) = lifecycle.period_cost(&project, period) {
                registry.register(ComponentKey::Cost { period }, &source, cost)?;
            }
        }

        Ok(())
    }

    /// Write the capacity of every operational (project, period) in the solution
    pub fn export_results(
        &self,
        model: &Model,
        solution: &Solution,
        writer: &mut DataWriter,
    ) -> Result<()> {
        let lifecycle = self.lifecycle();
        for (project_id, period) in lifecycle.operational_periods() {
            let project = &model.projects[&project_id];
            let Some(capacity) = lifecycle.operational_capacity(&project_id, period) else {
                continue;
            };
            let result = CapacityResult {
                project: project_id.clone(),
                period,
                technology: project.technology.clone(),
                load_zone: project.load_zone.clone(),
                capacity_type: self.capacity_type(),
                capacity_mw: solution.eval(&capacity),
                new_build_mw: lifecycle
                    .new_build(&project_id, period)
                    .map(|expr| solution.eval(&expr)),
                retired_mw: lifecycle
                    .retirement(&project_id, period)
                    .map(|expr| solution.eval(&expr)),
            };
            debug!(
                "{project_id} has {} MW of capacity in {period}",
                result.capacity_mw
            );
            writer.write_capacity(&result)?;
        }

        Ok(())
    }
}

impl CapacityLifecycle for CapacityModule {
    fn operational_periods(&self) -> Vec<(ProjectID, PeriodID)> {
        self.lifecycle().operational_periods()
    }

    fn validate(&self) -> Vec<String> {
        self.lifecycle().validate()
    }

    fn add_variables(&mut self, problem: &mut Problem) {
        self.lifecycle_mut().add_variables(problem);
    }

    fn operational_capacity(&self, project: &ProjectID, period: PeriodID) -> Option<Expression> {
        self.lifecycle().operational_capacity(project, period)
    }

    fn period_cost(&self, project: &ProjectID, period: PeriodID) -> Option<Expression> {
        self.lifecycle().period_cost(project, period)
    }

    fn add_constraints(&self, problem: &mut Problem, topology: &TemporalTopology) {
        self.lifecycle().add_constraints(problem, topology);
    }

    fn new_build(&self, project: &ProjectID, period: PeriodID) -> Option<Expression> {
        self.lifecycle().new_build(project, period)
    }

    fn retirement(&self, project: &ProjectID, period: PeriodID) -> Option<Expression> {
        self.lifecycle().retirement(project, period)
    }
}
