//! Dispatch of projects within their operational capacity.
//!
//! Every project gets a power variable in each timepoint of the periods in which it has capacity.
//! Power is registered as energy provision in the project's load zone. How power relates to
//! capacity depends on the project's [`OperationalType`].
use crate::balance::Product;
use crate::model::Model;
use crate::problem::{Constraint, Problem, VariableKind};
use crate::project::{OperationalType, Project, ProjectID};
use crate::registry::{ComponentKey, DynamicComponents};
use crate::solver::Solution;
use crate::temporal::{PeriodID, TemporalTopology, TimepointID};
use anyhow::Result;
use good_lp::{Expression, Variable};
use indexmap::{IndexMap, IndexSet};
use log::debug;
use serde::Serialize;
use std::rc::Rc;

/// A row of `dispatch.csv`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchResult {
    /// The project
    pub project: ProjectID,
    /// The period of the timepoint
    pub period: PeriodID,
    /// The timepoint
    pub timepoint: TimepointID,
    /// Power output in MW
    pub power_mw: f64,
    /// Committed capacity, for projects with commitment
    pub committed_mw: Option<f64>,
}

/// Variables for projects with continuous commitment
#[derive(Debug, Clone, Copy)]
struct CommitVariables {
    committed: Variable,
    startup: Variable,
    shutdown: Variable,
}

/// Dispatch for every project of one [`OperationalType`]
#[derive(Debug, Clone)]
pub struct Operations {
    operational_type: OperationalType,
    projects: Vec<Rc<Project>>,
    power_vars: IndexMap<ProjectID, IndexMap<TimepointID, Variable>>,
    commit_vars: IndexMap<(ProjectID, TimepointID), CommitVariables>,
}

impl Operations {
    /// Create the module for `operational_type`
    pub fn new(operational_type: OperationalType, model: &Model) -> Self {
        Self {
            operational_type,
            projects: model
                .iter_projects_with_operational_type(operational_type)
                .cloned()
                .collect(),
            power_vars: IndexMap::new(),
            commit_vars: IndexMap::new(),
        }
    }

    /// Registration phase: add dispatch variables and register energy provision and costs.
    ///
    /// # Arguments
    ///
    /// * `problem` - The problem to add variables to
    /// * `registry` - Registry to add contributions to
    /// * `topology` - The temporal topology
    /// * `operational_periods` - The (project, period) pairs with operational capacity
    pub fn add_model_components(
        &mut self,
        problem: &mut Problem,
        registry: &mut DynamicComponents,
        topology: &TemporalTopology,
        operational_periods: &IndexSet<(ProjectID, PeriodID)>,
    ) -> Result<()> {
        let source = self.operational_type.to_string();
        for project in &self.projects {
            for tmp in topology.iter_timepoints() {
                if !operational_periods.contains(&(project.id.clone(), tmp.period)) {
                    continue;
                }

                let power = problem.add_variable(
                    format!("power[{},{}]", project.id, tmp.id),
                    VariableKind::Continuous,
                    0.0..=f64::INFINITY,
                );
                self.power_vars
                    .entry(project.id.clone())
                    .or_default()
                    .insert(tmp.id, power);
                registry.register(
                    ComponentKey::Provision {
                        product: Product::Energy,
                        zone: project.load_zone.clone(),
                        timepoint: tmp.id,
                    },
                    &source,
                    power,
                )?;

                let cost_key = ComponentKey::Cost { period: tmp.period };
                let variable_cost = project.variable_cost_per_mwh.0;
                if variable_cost != 0.0 {
                    let weight = topology.timepoint_weight(tmp.id);
                    let cost = (variable_cost * weight) * power;
                    registry.register(cost_key.clone(), &source, cost)?;
                }

                if self.operational_type == OperationalType::DispatchableContinuousCommit {
                    let vars = add_commit_variables(problem, &project.id, tmp.id);
                    self.commit_vars.insert((project.id.clone(), tmp.id), vars);

                    // Startups and shutdowns are events, so only repeat with the horizon
                    let horizon_weight = topology.horizon(tmp.horizon).weight;
                    let startup_cost = project.startup_cost_per_mw.0 * horizon_weight;
                    let shutdown_cost = project.shutdown_cost_per_mw.0 * horizon_weight;
                    if startup_cost != 0.0 {
                        let cost = startup_cost * vars.startup;
                        registry.register(cost_key.clone(), &source, cost)?;
                    }
                    if shutdown_cost != 0.0 {
                        registry.register(cost_key, &source, shutdown_cost * vars.shutdown)?;
                    }
                }
            }
        }
        debug!(
            "Added {} power variables for {source} projects",
            self.power_vars.values().map(IndexMap::len).sum::<usize>()
        );

        Ok(())
    }

    /// Constraint phase: limit dispatch by capacity and by the reserves each project provides
    pub fn add_constraints(
        &self,
        problem: &mut Problem,
        registry: &mut DynamicComponents,
        topology: &TemporalTopology,
    ) {
        for project in &self.projects {
            let Some(power_vars) = self.power_vars.get(&project.id) else {
                continue;
            };
            let mut capacities: IndexMap<PeriodID, Expression> = IndexMap::new();
            for (timepoint, power) in power_vars {
                let timepoint = *timepoint;
                let power = *power;
                let period = topology.period_of(timepoint);
                let capacity = capacities
                    .entry(period)
                    .or_insert_with(|| {
                        registry.resolve_sum(&ComponentKey::Capacity {
                            project: project.id.clone(),
                            period,
                        })
                    })
                    .clone();
                let headroom = registry.resolve_sum(&ComponentKey::Headroom {
                    project: project.id.clone(),
                    timepoint,
                });
                let footroom = registry.resolve_sum(&ComponentKey::Footroom {
                    project: project.id.clone(),
                    timepoint,
                });
                let index = format!("{},{timepoint}", project.id);

                match self.operational_type {
                    OperationalType::MustRun => {
                        problem.add_constraint(Constraint::equal(
                            format!("must_run_power[{index}]"),
                            power,
                            capacity,
                        ));
                    }
                    OperationalType::DispatchableNoCommit => {
                        problem.add_constraint(Constraint::at_most(
                            format!("max_power[{index}]"),
                            power + headroom,
                            capacity,
                        ));
                        problem.add_constraint(Constraint::at_least(
                            format!("min_power[{index}]"),
                            power - footroom,
                            0.0,
                        ));
                    }
                    OperationalType::DispatchableContinuousCommit => {
                        let vars = self.commit_vars[&(project.id.clone(), timepoint)];
                        problem.add_constraint(Constraint::at_most(
                            format!("max_commit[{index}]"),
                            vars.committed,
                            capacity,
                        ));
                        problem.add_constraint(Constraint::at_most(
                            format!("max_power[{index}]"),
                            power + headroom,
                            vars.committed,
                        ));
                        problem.add_constraint(Constraint::at_least(
                            format!("min_power[{index}]"),
                            power - footroom,
                            project.min_stable_level.0 * vars.committed,
                        ));
                        self.add_commitment_tracking(problem, project, timepoint, vars, topology);
                    }
                }
            }
        }
    }

    /// Startups and shutdowns follow changes in committed capacity from the previous timepoint.
    ///
    /// There are no constraints for a timepoint without a previous timepoint. If the project has
    /// no capacity in the previous timepoint, nothing was committed then.
    fn add_commitment_tracking(
        &self,
        problem: &mut Problem,
        project: &Project,
        timepoint: TimepointID,
        vars: CommitVariables,
        topology: &TemporalTopology,
    ) {
        let Some(previous) = topology.prev_timepoint(timepoint) else {
            return;
        };
        let previous_committed = self
            .commit_vars
            .get(&(project.id.clone(), previous))
            .map_or_else(|| Expression::from(0.0), |prev| prev.committed.into());

        let index = format!("{},{timepoint}", project.id);
        problem.add_constraint(Constraint::at_least(
            format!("startup[{index}]"),
            vars.startup,
            vars.committed - previous_committed.clone(),
        ));
        problem.add_constraint(Constraint::at_least(
            format!("shutdown[{index}]"),
            vars.shutdown,
            previous_committed - vars.committed,
        ));
    }

    /// Power output per project and timepoint in the solution
    pub fn dispatch_results<'a>(
        &'a self,
        solution: &'a Solution,
        topology: &'a TemporalTopology,
    ) -> impl Iterator<Item = DispatchResult> + 'a {
        self.power_vars
            .iter()
            .flat_map(|(project, power_vars)| {
                power_vars
                    .iter()
                    .map(move |(timepoint, power)| (project, timepoint, power))
            })
            .map(move |(project, timepoint, power)| DispatchResult {
                project: project.clone(),
                period: topology.period_of(*timepoint),
                timepoint: *timepoint,
                power_mw: solution.value(*power),
                committed_mw: self
                    .commit_vars
                    .get(&(project.clone(), *timepoint))
                    .map(|vars| solution.value(vars.committed)),
            })
    }
}

fn add_commit_variables(
    problem: &mut Problem,
    project: &ProjectID,
    timepoint: TimepointID,
) -> CommitVariables {
    let mut add = |name: &str| {
        problem.add_variable(
            format!("{name}[{project},{timepoint}]"),
            VariableKind::Continuous,
            0.0..=f64::INFINITY,
        )
    };

    CommitVariables {
        committed: add("committed"),
        startup: add("startup"),
        shutdown: add("shutdown"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{coefficient, coefficients, model, project};
    use crate::problem::Sense;
    use good_lp::IntoAffineExpression;
    use rstest::rstest;
    use std::collections::HashMap;

    fn all_operational(model: &Model) -> IndexSet<(ProjectID, PeriodID)> {
        model
            .projects
            .keys()
            .flat_map(|id| {
                model
                    .topology
                    .iter_period_ids()
                    .map(move |period| (id.clone(), period))
            })
            .collect()
    }

    /// Build the module for a single project with the given operational type
    fn build(
        model: &mut Model,
        operational_type: OperationalType,
    ) -> (Operations, Problem, DynamicComponents) {
        let mut project = project();
        project.operational_type = operational_type;
        project.min_stable_level.0 = 0.4;
        project.startup_cost_per_mw.0 = 10.0;
        model.projects = [(project.id.clone(), Rc::new(project))].into_iter().collect();

        let mut problem = Problem::new();
        let mut registry = DynamicComponents::new();
        let mut operations = Operations::new(operational_type, model);
        let operational_periods = all_operational(model);
        operations
            .add_model_components(
                &mut problem,
                &mut registry,
                &model.topology,
                &operational_periods,
            )
            .unwrap();
        (operations, problem, registry)
    }

    #[rstest]
    fn test_power_registered_as_energy(mut model: Model) {
        let (_, problem, mut registry) = build(&mut model, OperationalType::DispatchableNoCommit);
        let power = problem.find_variable("power[gas,1]").unwrap();
        let provision = registry.resolve_sum(&ComponentKey::Provision {
            product: Product::Energy,
            zone: "north".into(),
            timepoint: 1,
        });
        assert_eq!(coefficients(&provision), HashMap::from([(power, 1.0)]));

        // Variable cost is weighted by the timepoint
        let cost = registry.resolve_sum(&ComponentKey::Cost { period: 2020 });
        let variable_cost = model.projects[0].variable_cost_per_mwh.0;
        assert_eq!(
            coefficient(&cost, power),
            variable_cost * model.topology.timepoint_weight(1)
        );
    }

    #[rstest]
    fn test_not_operational_no_power(mut model: Model) {
        let mut project = project();
        project.operational_type = OperationalType::MustRun;
        model.projects = [(project.id.clone(), Rc::new(project))].into_iter().collect();

        let mut problem = Problem::new();
        let mut registry = DynamicComponents::new();
        let mut operations = Operations::new(OperationalType::MustRun, &model);
        let operational_periods = [(ProjectID::new("gas"), 2030)].into_iter().collect();
        operations
            .add_model_components(
                &mut problem,
                &mut registry,
                &model.topology,
                &operational_periods,
            )
            .unwrap();

        assert!(
            operations.power_vars["gas"]
                .keys()
                .all(|tmp| model.topology.period_of(*tmp) == 2030)
        );
    }

    #[rstest]
    fn test_reserves_limit_dispatch(mut model: Model) {
        let (operations, mut problem, mut registry) =
            build(&mut model, OperationalType::DispatchableNoCommit);
        let up = problem.add_variable("up", VariableKind::Continuous, 0.0..=f64::INFINITY);
        registry
            .register(
                ComponentKey::Headroom {
                    project: "gas".into(),
                    timepoint: 1,
                },
                "reserves",
                up,
            )
            .unwrap();
        registry
            .register(
                ComponentKey::Capacity {
                    project: "gas".into(),
                    period: 2020,
                },
                "capacity",
                100.0,
            )
            .unwrap();
        operations.add_constraints(&mut problem, &mut registry, &model.topology);

        let constraint = problem.find_constraint("max_power[gas,1]").unwrap();
        let power = problem.find_variable("power[gas,1]").unwrap();
        let solution = Solution::from_values([(power, 80.0), (up, 20.0)]);
        assert!(constraint.is_satisfied(&solution, 1e-9));
        let solution = Solution::from_values([(power, 80.0), (up, 21.0)]);
        assert!(!constraint.is_satisfied(&solution, 1e-9));
    }

    #[rstest]
    fn test_commitment_follows_boundary(mut model: Model) {
        let (operations, mut problem, mut registry) =
            build(&mut model, OperationalType::DispatchableContinuousCommit);
        operations.add_constraints(&mut problem, &mut registry, &model.topology);

        for horizon in model.topology.iter_horizons() {
            let first = horizon.first();
            let name = format!("startup[gas,{first}]");
            let has_startup = problem.find_constraint(&name).is_some();
            assert_eq!(has_startup, model.topology.prev_timepoint(first).is_some());
        }

        // Startup cost is registered per startup
        let startup = problem.find_variable("startup[gas,1]").unwrap();
        let cost = registry.resolve_sum(&ComponentKey::Cost { period: 2020 });
        assert!(coefficient(&cost, startup) > 0.0);
    }

    #[rstest]
    fn test_dispatch_results(mut model: Model) {
        let (operations, problem, _) =
            build(&mut model, OperationalType::DispatchableContinuousCommit);
        let power = problem.find_variable("power[gas,5]").unwrap();
        let committed = problem.find_variable("committed[gas,5]").unwrap();
        let solution = Solution::from_values([(power, 30.0), (committed, 50.0)]);

        let results: Vec<_> = operations
            .dispatch_results(&solution, &model.topology)
            .collect();
        assert_eq!(results.len(), model.topology.iter_timepoints().count());
        let result = results.iter().find(|r| r.timepoint == 5).unwrap();
        assert_eq!(result.period, 2030);
        assert_eq!(result.power_mw, 30.0);
        assert_eq!(result.committed_mw, Some(50.0));
    }

    #[rstest]
    fn test_must_run_power_equals_capacity(mut model: Model) {
        let (operations, mut problem, mut registry) = build(&mut model, OperationalType::MustRun);
        operations.add_constraints(&mut problem, &mut registry, &model.topology);
        let constraint = problem.find_constraint("must_run_power[gas,1]").unwrap();
        assert_eq!(constraint.sense, Sense::Equal);

        // Power is tied to capacity, which is zero as nothing registered any
        let power = problem.find_variable("power[gas,1]").unwrap();
        assert_eq!(coefficients(&constraint.expr), HashMap::from([(power, 1.0)]));
        assert_eq!(constraint.expr.constant(), 0.0);
    }
}
