//! Provision of reserve products by projects.
use crate::balance::{Direction, Product, ReserveProduct};
use crate::model::Model;
use crate::problem::{Problem, VariableKind};
use crate::project::{OperationalType, Project, ProjectID};
use crate::registry::{ComponentKey, DynamicComponents};
use crate::solver::Solution;
use crate::temporal::{PeriodID, TemporalTopology, TimepointID};
use anyhow::Result;
use good_lp::Variable;
use indexmap::{IndexMap, IndexSet};
use log::debug;
use serde::Serialize;
use std::rc::Rc;

/// A row of `reserve_provision.csv`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProvisionResult {
    /// The reserve product
    pub product: String,
    /// The project
    pub project: ProjectID,
    /// The period of the timepoint
    pub period: PeriodID,
    /// The timepoint
    pub timepoint: TimepointID,
    /// Reserve provided in MW
    pub provision_mw: f64,
}

/// Projects providing a single reserve product.
///
/// Each capable project gets a provision variable in every timepoint in which it is operational.
/// Provision counts towards the product's requirement in the project's load zone and is held back
/// from dispatch as headroom (upward products) or footroom (downward products).
#[derive(Debug, Clone)]
pub struct ReserveProvision {
    product: ReserveProduct,
    projects: Vec<Rc<Project>>,
    provide_vars: IndexMap<(ProjectID, TimepointID), Variable>,
}

/// Check that no must-run project is flagged as providing an enabled reserve product
pub fn validate_reserve_capabilities(model: &Model) -> Vec<String> {
    model
        .iter_projects_with_operational_type(OperationalType::MustRun)
        .flat_map(|project| {
            model
                .iter_features()
                .filter(move |product| project.provides(*product))
                .map(move |product| {
                    format!(
                        "Project '{}' has operational type 'must_run' and cannot provide \
                         '{product}'",
                        project.id
                    )
                })
        })
        .collect()
}

impl ReserveProvision {
    /// Create the module for `product`, selecting capable projects from the model
    pub fn new(product: ReserveProduct, model: &Model) -> Self {
        Self {
            product,
            projects: model
                .projects
                .values()
                .filter(|project| {
                    project.provides(product)
                        && project.operational_type != OperationalType::MustRun
                })
                .cloned()
                .collect(),
            provide_vars: IndexMap::new(),
        }
    }

    /// Registration phase: add provision variables and register them as provision and as
    /// headroom or footroom
    pub fn add_model_components(
        &mut self,
        problem: &mut Problem,
        registry: &mut DynamicComponents,
        topology: &TemporalTopology,
        operational_periods: &IndexSet<(ProjectID, PeriodID)>,
    ) -> Result<()> {
        let source = format!("{}_provision", self.product);
        for project in &self.projects {
            for tmp in topology.iter_timepoints() {
                if !operational_periods.contains(&(project.id.clone(), tmp.period)) {
                    continue;
                }

                let var = problem.add_variable(
                    format!("provide_{}[{},{}]", self.product, project.id, tmp.id),
                    VariableKind::Continuous,
                    0.0..=f64::INFINITY,
                );
                self.provide_vars.insert((project.id.clone(), tmp.id), var);

                registry.register(
                    ComponentKey::Provision {
                        product: Product::Reserve(self.product),
                        zone: project.load_zone.clone(),
                        timepoint: tmp.id,
                    },
                    &source,
                    var,
                )?;
                let room_key = match self.product.direction() {
                    Direction::Up => ComponentKey::Headroom {
                        project: project.id.clone(),
                        timepoint: tmp.id,
                    },
                    Direction::Down => ComponentKey::Footroom {
                        project: project.id.clone(),
                        timepoint: tmp.id,
                    },
                };
                registry.register(room_key, &source, var)?;
            }
        }
        debug!(
            "Added {} {} provision variables",
            self.provide_vars.len(),
            self.product
        );

        Ok(())
    }

    /// Reserve provided per project and timepoint in the solution
    pub fn provision_results<'a>(
        &'a self,
        solution: &'a Solution,
        topology: &'a TemporalTopology,
    ) -> impl Iterator<Item = ProvisionResult> + 'a {
        self.provide_vars
            .iter()
            .map(move |((project, timepoint), var)| ProvisionResult {
                product: self.product.to_string(),
                project: project.clone(),
                period: topology.period_of(*timepoint),
                timepoint: *timepoint,
                provision_mw: solution.value(*var),
            })
    }
}
