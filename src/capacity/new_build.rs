//! New capacity, built in vintages.
//!
//! A build made in a vintage contributes capacity to every period in the window
//! `[vintage, vintage + lifetime)`. Builds are either binary (a single unit of fixed size) or
//! continuous.
use super::{CapacityLifecycle, CapacityTables};
use crate::problem::{Constraint, Problem, VariableKind};
use crate::project::ProjectID;
use crate::temporal::{PeriodID, TemporalTopology};
use crate::units::{Capacity, MoneyPerCapacityPerYear};
use good_lp::{Expression, Variable};
use indexmap::{IndexMap, IndexSet};
use itertools::Itertools;
use log::debug;

/// How much can be built in a vintage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildKind {
    /// Either nothing or exactly one unit of the project's build size
    Binary,
    /// Any non-negative amount
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct VintageParams {
    lifetime_yrs: u32,
    cost: MoneyPerCapacityPerYear,
}

impl VintageParams {
    /// Whether a build made in `vintage` is operational in `period`
    fn is_operational(&self, vintage: PeriodID, period: PeriodID) -> bool {
        vintage <= period && period - vintage < self.lifetime_yrs
    }
}

/// New-build capacity with one build decision per (project, vintage)
#[derive(Debug, Clone)]
pub struct NewBuild {
    kind: BuildKind,
    projects: IndexSet<ProjectID>,
    periods: Vec<PeriodID>,
    vintages: IndexMap<ProjectID, IndexMap<PeriodID, VintageParams>>,
    build_sizes: IndexMap<ProjectID, Capacity>,
    potentials: IndexMap<(ProjectID, PeriodID), Capacity>,
    build_vars: IndexMap<(ProjectID, PeriodID), Variable>,
}

impl NewBuild {
    /// Create from the rows of the new-build tables belonging to `projects`.
    ///
    /// Every model period is a potential vintage.
    pub fn new(
        kind: BuildKind,
        projects: IndexSet<ProjectID>,
        periods: &[PeriodID],
        tables: &CapacityTables,
    ) -> Self {
        let mut vintages: IndexMap<_, IndexMap<_, _>> = IndexMap::new();
        for row in tables
            .new_build_costs
            .iter()
            .filter(|row| projects.contains(&row.project) && periods.contains(&row.vintage))
        {
            vintages.entry(row.project.clone()).or_default().insert(
                row.vintage,
                VintageParams {
                    lifetime_yrs: row.lifetime_yrs,
                    cost: row.annualized_real_cost_per_mw_yr,
                },
            );
        }
        let build_sizes = match kind {
            BuildKind::Binary => tables
                .new_build_sizes
                .iter()
                .filter(|row| projects.contains(&row.project))
                .map(|row| (row.project.clone(), row.build_size_mw))
                .collect(),
            BuildKind::Linear => IndexMap::new(),
        };
        let potentials = match kind {
            BuildKind::Binary => IndexMap::new(),
            BuildKind::Linear => tables
                .new_build_potentials
                .iter()
                .filter(|row| projects.contains(&row.project))
                .map(|row| {
                    (
                        (row.project.clone(), row.period),
                        row.max_cumulative_new_build_mw,
                    )
                })
                .collect(),
        };

        Self {
            kind,
            projects,
            periods: periods.to_vec(),
            vintages,
            build_sizes,
            potentials,
            build_vars: IndexMap::new(),
        }
    }

    /// The vintages of a project which are operational in `period`
    fn operational_vintages(
        &self,
        project: &ProjectID,
        period: PeriodID,
    ) -> impl Iterator<Item = PeriodID> + '_ {
        self.vintages
            .get(project)
            .into_iter()
            .flatten()
            .filter(move |(vintage, params)| params.is_operational(**vintage, period))
            .map(|(vintage, _)| *vintage)
    }

    /// The capacity built in a vintage
    fn vintage_capacity(&self, project: &ProjectID, vintage: PeriodID) -> Expression {
        let var = self.build_vars[&(project.clone(), vintage)];
        match self.kind {
            BuildKind::Binary => {
                let size = self.build_sizes.get(project).copied().unwrap_or_default();
                size.0 * var
            }
            BuildKind::Linear => var.into(),
        }
    }
}

impl CapacityLifecycle for NewBuild {
    fn operational_periods(&self) -> Vec<(ProjectID, PeriodID)> {
        self.projects
            .iter()
            .flat_map(|project| {
                self.periods
                    .iter()
                    .copied()
                    .filter(move |period| {
                        self.operational_vintages(project, *period).next().is_some()
                    })
                    .map(move |period| (project.clone(), period))
            })
            .collect()
    }

    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        for project in &self.projects {
            if self.kind == BuildKind::Binary && !self.build_sizes.contains_key(project) {
                errors.push(format!("Missing build size inputs for project '{project}'"));
            }
            for period in &self.periods {
                let has_cost = self
                    .vintages
                    .get(project)
                    .is_some_and(|vintages| vintages.contains_key(period));
                if !has_cost {
                    errors.push(format!(
                        "Missing cost inputs for project '{project}', period '{period}'"
                    ));
                }
            }
        }

        errors
    }

    fn add_variables(&mut self, problem: &mut Problem) {
        let (kind, bounds) = match self.kind {
            BuildKind::Binary => (VariableKind::Binary, 0.0..=1.0),
            BuildKind::Linear => (VariableKind::Continuous, 0.0..=f64::INFINITY),
        };
        for (project, vintage) in self
            .vintages
            .iter()
            .flat_map(|(project, vintages)| vintages.keys().map(move |vintage| (project, vintage)))
        {
            let var = problem.add_variable(
                format!("build[{project},{vintage}]"),
                kind,
                bounds.clone(),
            );
            self.build_vars.insert((project.clone(), *vintage), var);
        }
        debug!("Added {} {kind} build variables", self.build_vars.len());
    }

    fn operational_capacity(&self, project: &ProjectID, period: PeriodID) -> Option<Expression> {
        let vintages = self.operational_vintages(project, period).collect_vec();
        if vintages.is_empty() {
            return None;
        }

        Some(
            vintages
                .into_iter()
                .map(|vintage| self.vintage_capacity(project, vintage))
                .sum(),
        )
    }

    fn period_cost(&self, project: &ProjectID, period: PeriodID) -> Option<Expression> {
        let vintages = self.operational_vintages(project, period).collect_vec();
        if vintages.is_empty() {
            return None;
        }

        Some(
            vintages
                .into_iter()
                .map(|vintage| {
                    let cost = self.vintages[project][&vintage].cost;
                    cost.0 * self.vintage_capacity(project, vintage)
                })
                .sum(),
        )
    }

    fn add_constraints(&self, problem: &mut Problem, _topology: &TemporalTopology) {
        for (project, period) in self.operational_periods() {
            match self.kind {
                BuildKind::Binary => {
                    let builds: Expression = self
                        .operational_vintages(&project, period)
                        .map(|vintage| self.build_vars[&(project.clone(), vintage)])
                        .sum();
                    problem.add_constraint(Constraint::at_most(
                        format!("max_one_build[{project},{period}]"),
                        builds,
                        1.0,
                    ));
                }
                BuildKind::Linear => {
                    let Some(potential) = self.potentials.get(&(project.clone(), period)) else {
                        continue;
                    };
                    let Some(capacity) = self.operational_capacity(&project, period) else {
                        continue;
                    };
                    problem.add_constraint(Constraint::at_most(
                        format!("max_cumulative_new_build[{project},{period}]"),
                        capacity,
                        potential.0,
                    ));
                }
            }
        }
    }

    fn new_build(&self, project: &ProjectID, period: PeriodID) -> Option<Expression> {
        self.build_vars
            .contains_key(&(project.clone(), period))
            .then(|| self.vintage_capacity(project, period))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capacity::{NewBuildCost, NewBuildPotential, NewBuildSize};
    use crate::fixture::{coefficients, topology};
    use crate::solver::Solution;
    use rstest::{fixture, rstest};
    use std::collections::HashMap;

    fn cost(project: &str, vintage: PeriodID) -> NewBuildCost {
        NewBuildCost {
            project: project.into(),
            vintage,
            lifetime_yrs: 30,
            annualized_real_cost_per_mw_yr: MoneyPerCapacityPerYear(200.0),
        }
    }

    #[fixture]
    fn tables() -> CapacityTables {
        CapacityTables {
            new_build_costs: vec![cost("gas_ct", 2020), cost("gas_ct", 2030)],
            new_build_sizes: vec![NewBuildSize {
                project: "gas_ct".into(),
                build_size_mw: Capacity(50.0),
            }],
            new_build_potentials: vec![NewBuildPotential {
                project: "gas_ct".into(),
                period: 2030,
                max_cumulative_new_build_mw: Capacity(75.0),
            }],
            ..Default::default()
        }
    }

    fn gas_ct() -> IndexSet<ProjectID> {
        [ProjectID::new("gas_ct")].into_iter().collect()
    }

    #[rstest]
    #[case(BuildKind::Binary)]
    #[case(BuildKind::Linear)]
    fn test_vintage_windows(tables: CapacityTables, #[case] kind: BuildKind) {
        let module = NewBuild::new(kind, gas_ct(), &[2020, 2030], &tables);
        let project = ProjectID::new("gas_ct");
        assert_eq!(
            module.operational_vintages(&project, 2020).collect_vec(),
            [2020]
        );
        assert_eq!(
            module.operational_vintages(&project, 2030).collect_vec(),
            [2020, 2030]
        );
    }

    #[rstest]
    fn test_lifetime_ends_window(mut tables: CapacityTables) {
        tables.new_build_costs[0].lifetime_yrs = 10;
        let module = NewBuild::new(BuildKind::Linear, gas_ct(), &[2020, 2030], &tables);
        let project = ProjectID::new("gas_ct");

        // A 2020 build with a 10-year lifetime is gone by 2030
        assert_eq!(
            module.operational_vintages(&project, 2030).collect_vec(),
            [2030]
        );
    }

    #[rstest]
    fn test_unbounded_lifetime(mut tables: CapacityTables) {
        tables.new_build_costs[0].lifetime_yrs = u32::MAX;
        let module = NewBuild::new(BuildKind::Linear, gas_ct(), &[2020, 2030], &tables);
        let project = ProjectID::new("gas_ct");

        // The window end lies beyond u32, so the build never expires
        assert_eq!(
            module.operational_vintages(&project, 2030).collect_vec(),
            [2020, 2030]
        );
        assert_eq!(
            module.operational_vintages(&project, u32::MAX).collect_vec(),
            [2020, 2030]
        );
    }

    #[rstest]
    fn test_binary_capacity(tables: CapacityTables) {
        let mut module = NewBuild::new(BuildKind::Binary, gas_ct(), &[2020, 2030], &tables);
        let mut problem = Problem::new();
        module.add_variables(&mut problem);
        let project = ProjectID::new("gas_ct");

        let build_2020 = problem.find_variable("build[gas_ct,2020]").unwrap();
        let build_2030 = problem.find_variable("build[gas_ct,2030]").unwrap();
        assert_eq!(problem.variable(build_2020).kind, VariableKind::Binary);

        let capacity = module.operational_capacity(&project, 2030).unwrap();
        assert_eq!(
            coefficients(&capacity),
            HashMap::from([(build_2020, 50.0), (build_2030, 50.0)])
        );

        let cost = module.period_cost(&project, 2020).unwrap();
        assert_eq!(coefficients(&cost), HashMap::from([(build_2020, 10000.0)]));
    }

    #[rstest]
    fn test_at_most_one_binary_build(topology: TemporalTopology, tables: CapacityTables) {
        let mut module = NewBuild::new(BuildKind::Binary, gas_ct(), &[2020, 2030], &tables);
        let mut problem = Problem::new();
        module.add_variables(&mut problem);
        module.add_constraints(&mut problem, &topology);

        let build_2020 = problem.find_variable("build[gas_ct,2020]").unwrap();
        let build_2030 = problem.find_variable("build[gas_ct,2030]").unwrap();
        let constraint = problem.find_constraint("max_one_build[gas_ct,2030]").unwrap();
        let both = Solution::from_values([(build_2020, 1.0), (build_2030, 1.0)]);
        assert!(!constraint.is_satisfied(&both, 1e-9));
        let one = Solution::from_values([(build_2030, 1.0)]);
        assert!(constraint.is_satisfied(&one, 1e-9));
    }

    #[rstest]
    fn test_linear_potential(topology: TemporalTopology, tables: CapacityTables) {
        let mut module = NewBuild::new(BuildKind::Linear, gas_ct(), &[2020, 2030], &tables);
        let mut problem = Problem::new();
        module.add_variables(&mut problem);
        module.add_constraints(&mut problem, &topology);

        // Potential only given for 2030
        assert_eq!(problem.num_constraints(), 1);
        let constraint = problem
            .find_constraint("max_cumulative_new_build[gas_ct,2030]")
            .unwrap();
        let build_2020 = problem.find_variable("build[gas_ct,2020]").unwrap();
        let build_2030 = problem.find_variable("build[gas_ct,2030]").unwrap();
        let within = Solution::from_values([(build_2020, 40.0), (build_2030, 35.0)]);
        assert!(constraint.is_satisfied(&within, 1e-9));
        let beyond = Solution::from_values([(build_2020, 40.0), (build_2030, 36.0)]);
        assert!(!constraint.is_satisfied(&beyond, 1e-9));
    }

    #[test]
    fn test_missing_inputs_reported_together() {
        let tables = CapacityTables {
            new_build_costs: vec![cost("gas_ct", 2020)],
            ..Default::default()
        };
        let module = NewBuild::new(BuildKind::Binary, gas_ct(), &[2020, 2030], &tables);
        assert_eq!(
            module.validate(),
            [
                "Missing build size inputs for project 'gas_ct'",
                "Missing cost inputs for project 'gas_ct', period '2030'",
            ]
        );
    }

    #[test]
    fn test_project_without_rows() {
        let module = NewBuild::new(
            BuildKind::Linear,
            gas_ct(),
            &[2020],
            &CapacityTables::default(),
        );
        assert!(module.operational_periods().is_empty());
    }
}
