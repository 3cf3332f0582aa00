//! Assembly of the optimisation problem from independent modules.
//!
//! The build has two phases. In the registration phase every module adds its variables and
//! registers its contributions to shared aggregates (costs, capacity, reserve provision). In the
//! constraint phase modules resolve the aggregates they consume. Finally the resolver builds the
//! objective from the per-period cost aggregates, emits the balance constraints and freezes the
//! registry.
//!
//! Modules never see each other directly, so the order in which they are run does not affect the
//! resulting problem, other than in the order of its variables and constraints.
use crate::balance::{BalanceBuilder, Product, ReserveProduct};
use crate::capacity::{CapacityLifecycle, CapacityModule};
use crate::model::Model;
use crate::operations::Operations;
use crate::output::DataWriter;
use crate::problem::Problem;
use crate::project::{CapacityType, OperationalType, ProjectID};
use crate::registry::{ComponentKey, DynamicComponents};
use crate::reserves::{ReserveProvision, validate_reserve_capabilities};
use crate::solver::{SolveError, Solution, Solver};
use crate::temporal::PeriodID;
use anyhow::{Result, bail};
use good_lp::Expression;
use indexmap::IndexSet;
use itertools::Itertools;
use log::{debug, info, warn};
use std::fmt;

mod objective;
pub use objective::{ObjectiveSummary, PeriodCost};

/// A unit of functionality contributing to the problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Module {
    /// The lifecycle of projects with a capacity type
    Capacity(CapacityType),
    /// Dispatch of projects with an operational type
    Operations(OperationalType),
    /// Provision and balance of a reserve product
    Reserve(ReserveProduct),
    /// The energy balance
    LoadBalance,
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Capacity(capacity_type) => write!(f, "capacity_type:{capacity_type}"),
            Self::Operations(operational_type) => {
                write!(f, "operational_type:{operational_type}")
            }
            Self::Reserve(product) => write!(f, "reserve:{product}"),
            Self::LoadBalance => write!(f, "load_balance"),
        }
    }
}

/// Determine which modules are needed for a model.
///
/// These are one module per distinct capacity type and operational type in the project table, one
/// per enabled reserve product and the load balance.
pub fn determine_modules(model: &Model) -> Vec<Module> {
    let capacity_types = model
        .projects
        .values()
        .map(|project| project.capacity_type)
        .unique()
        .map(Module::Capacity);
    let operational_types = model
        .projects
        .values()
        .map(|project| project.operational_type)
        .unique()
        .map(Module::Operations);
    let reserves = model.iter_features().map(Module::Reserve);

    capacity_types
        .chain(operational_types)
        .chain(reserves)
        .chain(std::iter::once(Module::LoadBalance))
        .collect()
}

/// Check the inputs of every module, reporting all problems together
pub fn validate_modules(model: &Model, modules: &[Module]) -> Result<()> {
    let mut errors = Vec::new();
    for module in modules {
        if let Module::Capacity(capacity_type) = module {
            errors.extend(CapacityModule::new(*capacity_type, model).validate());
        }
    }
    errors.extend(validate_reserve_capabilities(model));

    if !errors.is_empty() {
        bail!(
            "Found {} input validation error(s):\n  {}",
            errors.len(),
            errors.join("\n  ")
        );
    }

    Ok(())
}

/// A module with its state for one build
#[derive(Debug)]
enum ModuleInstance {
    Capacity(CapacityModule),
    Operations(Operations),
    Reserve(ReserveProvision, BalanceBuilder),
    LoadBalance(BalanceBuilder),
}

impl ModuleInstance {
    fn new(module: Module, model: &Model) -> Self {
        match module {
            Module::Capacity(capacity_type) => {
                Self::Capacity(CapacityModule::new(capacity_type, model))
            }
            Module::Operations(operational_type) => {
                Self::Operations(Operations::new(operational_type, model))
            }
            Module::Reserve(product) => {
                let inputs = model.reserves.get(&product).cloned().unwrap_or_default();
                Self::Reserve(
                    ReserveProvision::new(product, model),
                    BalanceBuilder::new(Product::Reserve(product), inputs),
                )
            }
            Module::LoadBalance => {
                Self::LoadBalance(BalanceBuilder::new(Product::Energy, model.load.clone()))
            }
        }
    }

    fn balance(&self) -> Option<&BalanceBuilder> {
        match self {
            Self::Reserve(_, balance) | Self::LoadBalance(balance) => Some(balance),
            _ => None,
        }
    }
}

/// The mutable state of a build shared by every module
struct BuildContext<'a> {
    model: &'a Model,
    problem: Problem,
    registry: DynamicComponents,
    operational_periods: IndexSet<(ProjectID, PeriodID)>,
}

impl BuildContext<'_> {
    fn register_module(&mut self, module: &mut ModuleInstance) -> Result<()> {
        let topology = &self.model.topology;
        match module {
            ModuleInstance::Capacity(capacity) => {
                capacity.add_model_components(&mut self.problem, &mut self.registry)
            }
            ModuleInstance::Operations(operations) => operations.add_model_components(
                &mut self.problem,
                &mut self.registry,
                topology,
                &self.operational_periods,
            ),
            ModuleInstance::Reserve(provision, balance) => {
                provision.add_model_components(
                    &mut self.problem,
                    &mut self.registry,
                    topology,
                    &self.operational_periods,
                )?;
                balance.add_model_components(&mut self.problem, &mut self.registry, topology)
            }
            ModuleInstance::LoadBalance(balance) => {
                balance.add_model_components(&mut self.problem, &mut self.registry, topology)
            }
        }
    }

    fn add_module_constraints(&mut self, module: &ModuleInstance) {
        let topology = &self.model.topology;
        match module {
            ModuleInstance::Capacity(capacity) => {
                capacity.add_constraints(&mut self.problem, topology);
            }
            ModuleInstance::Operations(operations) => {
                operations.add_constraints(&mut self.problem, &mut self.registry, topology);
            }
            ModuleInstance::Reserve(..) | ModuleInstance::LoadBalance(_) => {}
        }
    }

    /// Build the objective from every period's cost aggregate
    fn resolve_objective(&mut self) -> Vec<(PeriodID, Expression)> {
        let mut period_costs = Vec::new();
        let mut objective = Expression::from(0.0);
        for period in self.model.topology.iter_periods() {
            let cost = self
                .registry
                .resolve_sum(&ComponentKey::Cost { period: period.id });
            objective += period.objective_weight() * cost.clone();
            period_costs.push((period.id, cost));
        }
        self.problem.set_objective(objective);

        period_costs
    }
}

/// A fully assembled problem, ready to be solved
pub struct AssembledModel<'a> {
    model: &'a Model,
    problem: Problem,
    modules: Vec<ModuleInstance>,
    period_costs: Vec<(PeriodID, Expression)>,
}

/// A solved problem together with the modules which built it
pub struct SolvedModel<'a> {
    model: &'a Model,
    modules: Vec<ModuleInstance>,
    period_costs: Vec<(PeriodID, Expression)>,
    solution: Solution,
}

/// Assemble the problem for `model` from `modules`, run in the order given.
///
/// # Arguments
///
/// * `model` - The model
/// * `modules` - The modules to include (see [`determine_modules`])
///
/// # Returns
///
/// The assembled problem or an error if a module broke the registry protocol.
pub fn assemble<'a>(model: &'a Model, modules: &[Module]) -> Result<AssembledModel<'a>> {
    info!(
        "Assembling problem from modules: {}",
        modules.iter().join(", ")
    );
    let mut instances = modules
        .iter()
        .map(|module| ModuleInstance::new(*module, model))
        .collect_vec();

    // Known from input data alone, so every module sees the same set regardless of order
    let operational_periods = instances
        .iter()
        .filter_map(|instance| match instance {
            ModuleInstance::Capacity(capacity) => Some(capacity.operational_periods()),
            _ => None,
        })
        .flatten()
        .sorted()
        .collect();

    let mut ctx = BuildContext {
        model,
        problem: Problem::new(),
        registry: DynamicComponents::new(),
        operational_periods,
    };

    for instance in &mut instances {
        ctx.register_module(instance)?;
    }
    debug!(
        "Registration phase added {} variables",
        ctx.problem.num_variables()
    );

    for instance in &instances {
        ctx.add_module_constraints(instance);
    }

    let period_costs = ctx.resolve_objective();
    for balance in instances.iter().filter_map(ModuleInstance::balance) {
        balance.add_balance_constraints(&mut ctx.problem, &mut ctx.registry);
    }
    for key in ctx.registry.freeze_all() {
        warn!("{key} has contributions but is not used by any constraint");
    }

    info!(
        "Assembled problem with {} variables and {} constraints",
        ctx.problem.num_variables(),
        ctx.problem.num_constraints()
    );

    Ok(AssembledModel {
        model,
        problem: ctx.problem,
        modules: instances,
        period_costs,
    })
}

impl<'a> AssembledModel<'a> {
    /// The assembled problem
    pub fn problem(&self) -> &Problem {
        &self.problem
    }

    /// Solve the problem with `solver`.
    ///
    /// Infeasible and unbounded problems are reported as errors without any attempt at relaxation.
    /// Constraints which the solution violates by more than the model's feasibility tolerance are
    /// logged as warnings.
    pub fn solve(self, solver: &dyn Solver) -> Result<SolvedModel<'a>, SolveError> {
        let (formulation, solution) = self.problem.solve(solver)?;
        info!(
            "Solved problem with objective value {}",
            solution.objective_value()
        );

        let tolerance = self.model.parameters.feasibility_tolerance;
        for constraint in formulation.iter_constraints() {
            if !constraint.is_satisfied(&solution, tolerance) {
                warn!(
                    "Constraint {} is violated by the solution (value {})",
                    constraint.name,
                    solution.eval(&constraint.expr)
                );
            }
        }

        Ok(SolvedModel {
            model: self.model,
            modules: self.modules,
            period_costs: self.period_costs,
            solution,
        })
    }
}

impl SolvedModel<'_> {
    /// The solution
    pub fn solution(&self) -> &Solution {
        &self.solution
    }

    /// Write the results of every module
    pub fn export_results(&self, writer: &mut DataWriter) -> Result<()> {
        let topology = &self.model.topology;
        let solution = &self.solution;
        for module in &self.modules {
            match module {
                ModuleInstance::Capacity(capacity) => {
                    capacity.export_results(self.model, solution, writer)?;
                }
                ModuleInstance::Operations(operations) => {
                    for result in operations.dispatch_results(solution, topology) {
                        writer.write_dispatch(&result)?;
                    }
                }
                ModuleInstance::Reserve(provision, balance) => {
                    for result in provision.provision_results(solution, topology) {
                        writer.write_provision(&result)?;
                    }
                    for result in balance.violation_results(solution) {
                        writer.write_violation(&result)?;
                    }
                }
                ModuleInstance::LoadBalance(balance) => {
                    for result in balance.violation_results(solution) {
                        writer.write_violation(&result)?;
                    }
                }
            }
        }

        let summary = ObjectiveSummary {
            total_cost: solution.objective_value(),
            periods: self
                .period_costs
                .iter()
                .map(|(period, cost)| {
                    PeriodCost::new(topology.period(*period), solution.eval(cost))
                })
                .collect(),
        };
        writer.write_objective(&summary)
    }
}
