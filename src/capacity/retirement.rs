//! Existing capacity which may be retired early to avoid its fixed costs.
use super::existing::{ExistingParams, select_existing_params};
use super::{CapacityLifecycle, ExistingProjectPeriodParams};
use crate::problem::{Constraint, Problem, VariableKind};
use crate::project::ProjectID;
use crate::temporal::{PeriodID, TemporalTopology};
use good_lp::{Expression, Variable};
use indexmap::{IndexMap, IndexSet};
use log::debug;
use std::iter;

/// Existing capacity with a continuous retirement decision in each period.
///
/// Operational capacity is the exogenous capacity less the amount retired. Once retired, capacity
/// cannot come back: operational capacity may never exceed that of the most recent earlier period
/// in which the project has capacity.
#[derive(Debug, Clone)]
pub struct LinearEconomicRetirement {
    params: IndexMap<(ProjectID, PeriodID), ExistingParams>,
    retire_vars: IndexMap<(ProjectID, PeriodID), Variable>,
}

impl LinearEconomicRetirement {
    /// Create from the rows of the existing-capacity table belonging to `projects`
    pub fn new(projects: &IndexSet<ProjectID>, rows: &[ExistingProjectPeriodParams]) -> Self {
        Self {
            params: select_existing_params(projects, rows),
            retire_vars: IndexMap::new(),
        }
    }

    /// The constraint preventing retired capacity from returning in `period`.
    ///
    /// Capacity is compared with the latest earlier period which has a row for the project, so gaps
    /// in the input do not break the chain. There is no constraint if there is no such period.
    fn retire_forever_constraint(
        &self,
        project: &ProjectID,
        period: PeriodID,
        topology: &TemporalTopology,
    ) -> Option<Constraint> {
        let capacity = self.operational_capacity(project, period)?;
        let previous_capacity = iter::successors(topology.previous_period(period), |previous| {
            topology.previous_period(*previous)
        })
        .find_map(|previous| self.operational_capacity(project, previous))?;

        Some(Constraint::at_most(
            format!("retire_forever[{project},{period}]"),
            capacity,
            previous_capacity,
        ))
    }
}

impl CapacityLifecycle for LinearEconomicRetirement {
    fn operational_periods(&self) -> Vec<(ProjectID, PeriodID)> {
        self.params.keys().cloned().collect()
    }

    fn validate(&self) -> Vec<String> {
        self.params
            .iter()
            .filter(|(_, params)| params.fixed_cost.is_none())
            .map(|((project, period), _)| {
                format!("Missing fixed cost inputs for project '{project}', period '{period}'")
            })
            .collect()
    }

    fn add_variables(&mut self, problem: &mut Problem) {
        for ((project, period), params) in &self.params {
            let var = problem.add_variable(
                format!("retire[{project},{period}]"),
                VariableKind::Continuous,
                0.0..=params.capacity.0,
            );
            self.retire_vars.insert((project.clone(), *period), var);
        }
        debug!("Added {} retirement variables", self.retire_vars.len());
    }

    fn operational_capacity(&self, project: &ProjectID, period: PeriodID) -> Option<Expression> {
        let key = (project.clone(), period);
        let params = self.params.get(&key)?;
        let retire = self.retire_vars[&key];

        Some(params.capacity.0 - retire)
    }

    fn period_cost(&self, project: &ProjectID, period: PeriodID) -> Option<Expression> {
        let fixed_cost = self.params.get(&(project.clone(), period))?.fixed_cost?;
        let capacity = self.operational_capacity(project, period)?;

        Some(fixed_cost.0 * capacity)
    }

    fn add_constraints(&self, problem: &mut Problem, topology: &TemporalTopology) {
        for (project, period) in self.params.keys() {
            problem.add_optional_constraint(self.retire_forever_constraint(
                project, *period, topology,
            ));
        }
    }

    fn retirement(&self, project: &ProjectID, period: PeriodID) -> Option<Expression> {
        self.retire_vars
            .get(&(project.clone(), period))
            .map(|var| Expression::from(*var))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{coefficient, periods, timepoints, topology};
    use crate::solver::Solution;
    use crate::temporal::{HorizonData, PeriodData, TimepointData};
    use crate::units::{Capacity, MoneyPerCapacityPerYear};
    use good_lp::IntoAffineExpression;
    use rstest::{fixture, rstest};

    fn row(period: PeriodID) -> ExistingProjectPeriodParams {
        ExistingProjectPeriodParams {
            project: "coal".into(),
            period,
            existing_capacity_mw: Capacity(100.0),
            fixed_cost_per_mw_yr: Some(MoneyPerCapacityPerYear(50.0)),
        }
    }

    fn build(
        rows: &[ExistingProjectPeriodParams],
        topology: &TemporalTopology,
    ) -> (LinearEconomicRetirement, Problem) {
        let projects = [ProjectID::new("coal")].into_iter().collect();
        let mut module = LinearEconomicRetirement::new(&projects, rows);
        let mut problem = Problem::new();
        module.add_variables(&mut problem);
        module.add_constraints(&mut problem, topology);
        (module, problem)
    }

    /// The fixture topology with a third period, 2040, on one more horizon
    #[fixture]
    fn three_periods(
        mut timepoints: Vec<TimepointData>,
        mut periods: Vec<PeriodData>,
    ) -> TemporalTopology {
        timepoints.push(TimepointData {
            timepoint: 7,
            horizon: 4,
            period: 2040,
            number_of_hours_in_timepoint: 12.0,
        });
        periods.push(PeriodData {
            period: 2040,
            discount_factor: 0.25,
            number_years_represented: 10.0,
        });
        let horizons: Vec<_> = (1..=4)
            .map(|horizon| HorizonData {
                horizon,
                boundary: "circular".into(),
                horizon_weight: 1.0,
            })
            .collect();
        TemporalTopology::new(&timepoints, &horizons, &periods).unwrap()
    }

    #[rstest]
    fn test_capacity_with_and_without_retirement(topology: TemporalTopology) {
        let (module, problem) = build(&[row(2020), row(2030)], &topology);
        let coal = ProjectID::new("coal");
        let cap_2020 = module.operational_capacity(&coal, 2020).unwrap();
        let cap_2030 = module.operational_capacity(&coal, 2030).unwrap();

        // No retirement
        let solution = Solution::default();
        assert_eq!(solution.eval(&cap_2020), 100.0);
        assert_eq!(solution.eval(&cap_2030), 100.0);

        // Retire 20 MW in 2030
        let retire = problem.find_variable("retire[coal,2030]").unwrap();
        let solution = Solution::from_values([(retire, 20.0)]);
        assert_eq!(solution.eval(&cap_2030), 80.0);
        assert!(solution.eval(&cap_2030) <= solution.eval(&cap_2020));
    }

    #[rstest]
    fn test_retire_forever(topology: TemporalTopology) {
        let (_, problem) = build(&[row(2020), row(2030)], &topology);

        // Only 2030 has a previous period
        assert_eq!(problem.num_constraints(), 1);
        let constraint = problem.find_constraint("retire_forever[coal,2030]").unwrap();

        // Un-retiring capacity in 2030 that was retired in 2020 is not allowed
        let retire_2020 = problem.find_variable("retire[coal,2020]").unwrap();
        let retire_2030 = problem.find_variable("retire[coal,2030]").unwrap();
        let solution = Solution::from_values([(retire_2020, 30.0)]);
        assert!(!constraint.is_satisfied(&solution, 1e-9));
        let solution = Solution::from_values([(retire_2020, 30.0), (retire_2030, 30.0)]);
        assert!(constraint.is_satisfied(&solution, 1e-9));
    }

    #[rstest]
    fn test_retire_forever_across_missing_period(three_periods: TemporalTopology) {
        // No row for 2030, so 2040 is linked back to 2020
        let (_, problem) = build(&[row(2020), row(2040)], &three_periods);
        assert_eq!(problem.num_constraints(), 1);
        let constraint = problem.find_constraint("retire_forever[coal,2040]").unwrap();

        let retire_2020 = problem.find_variable("retire[coal,2020]").unwrap();
        let retire_2040 = problem.find_variable("retire[coal,2040]").unwrap();
        let solution = Solution::from_values([(retire_2020, 100.0)]);
        assert!(!constraint.is_satisfied(&solution, 1e-9));
        let solution = Solution::from_values([(retire_2020, 100.0), (retire_2040, 100.0)]);
        assert!(constraint.is_satisfied(&solution, 1e-9));
    }

    #[rstest]
    fn test_no_constraint_without_earlier_row(topology: TemporalTopology) {
        let (_, problem) = build(&[row(2030)], &topology);
        assert_eq!(problem.num_constraints(), 0);
    }

    #[rstest]
    fn test_period_cost(topology: TemporalTopology) {
        let (module, problem) = build(&[row(2020), row(2030)], &topology);
        let coal = ProjectID::new("coal");
        let cost = module.period_cost(&coal, 2020).unwrap();
        let retire = problem.find_variable("retire[coal,2020]").unwrap();
        assert_eq!(cost.constant(), 5000.0);
        assert_eq!(coefficient(&cost, retire), -50.0);
    }

    #[test]
    fn test_missing_fixed_cost() {
        let mut row = row(2020);
        row.fixed_cost_per_mw_yr = None;
        let projects = [ProjectID::new("coal")].into_iter().collect();
        let module = LinearEconomicRetirement::new(&projects, &[row]);
        assert_eq!(
            module.validate(),
            ["Missing fixed cost inputs for project 'coal', period '2020'"]
        );
    }
}
