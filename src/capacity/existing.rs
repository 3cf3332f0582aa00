//! Existing capacity which stays available for as long as it is specified.
use super::{CapacityLifecycle, ExistingProjectPeriodParams};
use crate::problem::Problem;
use crate::project::ProjectID;
use crate::temporal::{PeriodID, TemporalTopology};
use crate::units::{Capacity, MoneyPerCapacityPerYear};
use good_lp::Expression;
use indexmap::{IndexMap, IndexSet};

/// Exogenous capacity and fixed cost for one (project, period)
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct ExistingParams {
    pub capacity: Capacity,
    pub fixed_cost: Option<MoneyPerCapacityPerYear>,
}

/// Select the rows for `projects`, keyed by (project, period)
pub(super) fn select_existing_params(
    projects: &IndexSet<ProjectID>,
    rows: &[ExistingProjectPeriodParams],
) -> IndexMap<(ProjectID, PeriodID), ExistingParams> {
    rows.iter()
        .filter(|row| projects.contains(&row.project))
        .map(|row| {
            (
                (row.project.clone(), row.period),
                ExistingParams {
                    capacity: row.existing_capacity_mw,
                    fixed_cost: row.fixed_cost_per_mw_yr,
                },
            )
        })
        .collect()
}

/// Capacity fixed at its exogenous value in every period in which it is specified.
///
/// There are no decision variables. Existing capacity is a sunk cost, so the period cost is zero
/// unless a fixed cost is given for the (project, period).
#[derive(Debug, Clone)]
pub struct NoEconomicRetirement {
    params: IndexMap<(ProjectID, PeriodID), ExistingParams>,
}

impl NoEconomicRetirement {
    /// Create from the rows of the existing-capacity table belonging to `projects`
    pub fn new(projects: &IndexSet<ProjectID>, rows: &[ExistingProjectPeriodParams]) -> Self {
        Self {
            params: select_existing_params(projects, rows),
        }
    }
}

impl CapacityLifecycle for NoEconomicRetirement {
    fn operational_periods(&self) -> Vec<(ProjectID, PeriodID)> {
        self.params.keys().cloned().collect()
    }

    fn add_variables(&mut self, _problem: &mut Problem) {}

    fn operational_capacity(&self, project: &ProjectID, period: PeriodID) -> Option<Expression> {
        let params = self.params.get(&(project.clone(), period))?;
        Some(Expression::from(params.capacity.0))
    }

    fn period_cost(&self, project: &ProjectID, period: PeriodID) -> Option<Expression> {
        let params = self.params.get(&(project.clone(), period))?;
        let fixed_cost = params.fixed_cost?;
        Some(Expression::from((params.capacity * fixed_cost).0))
    }

    fn add_constraints(&self, _problem: &mut Problem, _topology: &TemporalTopology) {}
}
