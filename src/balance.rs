//! Balance constraints for energy and reserve products.
//!
//! The same builder is used for every product: for each zone and timepoint, the total provision
//! registered by other modules plus a violation variable must meet the requirement. Violation
//! variables are always created, but are fixed at zero when violation is not allowed for a zone.
use crate::id::define_id_type;
use crate::problem::{Constraint, Problem, VariableKind};
use crate::registry::{ComponentKey, DynamicComponents};
use crate::solver::Solution;
use crate::temporal::{TemporalTopology, TimepointID};
use anyhow::Result;
use good_lp::Variable;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_string_enum::DeserializeLabeledStringEnum;
use std::collections::HashMap;
use std::fmt;

define_id_type! {ZoneID}

/// A reserve product which can be enabled as a feature
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    DeserializeLabeledStringEnum,
    strum::Display,
    strum::EnumIter,
)]
#[strum(serialize_all = "snake_case")]
pub enum ReserveProduct {
    /// Load-following reserves, upward
    #[string = "lf_reserves_up"]
    LfReservesUp,
    /// Load-following reserves, downward
    #[string = "lf_reserves_down"]
    LfReservesDown,
    /// Regulation, upward
    #[string = "regulation_up"]
    RegulationUp,
    /// Regulation, downward
    #[string = "regulation_down"]
    RegulationDown,
    /// Primary frequency response
    #[string = "frequency_response"]
    FrequencyResponse,
}

/// Which way a reserve product moves a project's output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Provision must be held back from dispatch (headroom)
    Up,
    /// Provision requires dispatch above the minimum (footroom)
    Down,
}

impl ReserveProduct {
    /// The direction of the product
    pub fn direction(&self) -> Direction {
        match self {
            Self::LfReservesUp | Self::RegulationUp | Self::FrequencyResponse => Direction::Up,
            Self::LfReservesDown | Self::RegulationDown => Direction::Down,
        }
    }
}

/// Something whose provision is balanced against a requirement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Product {
    /// Energy; the requirement is load
    Energy,
    /// A reserve product
    Reserve(ReserveProduct),
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Energy => write!(f, "energy"),
            Self::Reserve(product) => write!(f, "{product}"),
        }
    }
}

/// Whether and at what price a zone may fall short of its requirement
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ViolationSettings {
    /// Whether violation is permitted
    pub allowed: bool,
    /// Cost per unit of violation (per MWh for energy)
    pub penalty: f64,
}

/// The zones and requirements for a single product
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BalanceInputs {
    /// Violation settings for each zone in which the product is balanced
    pub zones: IndexMap<ZoneID, ViolationSettings>,
    /// Requirement per zone and timepoint; absent entries are zero
    pub requirements: HashMap<(ZoneID, TimepointID), f64>,
}

impl BalanceInputs {
    /// The requirement in a zone and timepoint
    pub fn requirement(&self, zone: &ZoneID, timepoint: TimepointID) -> f64 {
        self.requirements
            .get(&(zone.clone(), timepoint))
            .copied()
            .unwrap_or(0.0)
    }
}

/// A row of `balance_violations.csv`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViolationResult {
    /// The product
    pub product: String,
    /// The zone
    pub zone: ZoneID,
    /// The timepoint
    pub timepoint: TimepointID,
    /// The requirement
    pub requirement: f64,
    /// The amount by which provision fell short
    pub violation: f64,
}

/// Builds the balance constraints for one product
#[derive(Debug, Clone)]
pub struct BalanceBuilder {
    product: Product,
    inputs: BalanceInputs,
    violations: IndexMap<(ZoneID, TimepointID), Variable>,
}

impl BalanceBuilder {
    /// Create a builder for `product`
    pub fn new(product: Product, inputs: BalanceInputs) -> Self {
        Self {
            product,
            inputs,
            violations: IndexMap::new(),
        }
    }

    /// The label used for diagnostics and registry sources
    fn source(&self) -> String {
        format!("{}_balance", self.product)
    }

    /// Registration phase: add violation variables and register their cost
    pub fn add_model_components(
        &mut self,
        problem: &mut Problem,
        registry: &mut DynamicComponents,
        topology: &TemporalTopology,
    ) -> Result<()> {
        let source = self.source();
        for (zone, settings) in &self.inputs.zones {
            let bounds = if settings.allowed {
                0.0..=f64::INFINITY
            } else {
                0.0..=0.0
            };
            for tmp in topology.iter_timepoints() {
                let var = problem.add_variable(
                    format!("{}_violation[{zone},{}]", self.product, tmp.id),
                    VariableKind::Continuous,
                    bounds.clone(),
                );
                self.violations.insert((zone.clone(), tmp.id), var);

                if settings.penalty != 0.0 {
                    let weight = topology.timepoint_weight(tmp.id);
                    registry.register(
                        ComponentKey::Cost { period: tmp.period },
                        &source,
                        (settings.penalty * weight) * var,
                    )?;
                }
            }
        }

        Ok(())
    }

    /// Constraint phase: emit `provision + violation >= requirement` for each zone and timepoint
    pub fn add_balance_constraints(&self, problem: &mut Problem, registry: &mut DynamicComponents) {
        for ((zone, timepoint), var) in &self.violations {
            let provision = registry.resolve_sum(&ComponentKey::Provision {
                product: self.product,
                zone: zone.clone(),
                timepoint: *timepoint,
            });
            let requirement = self.inputs.requirement(zone, *timepoint);
            problem.add_constraint(Constraint::at_least(
                format!("meet_{}[{zone},{timepoint}]", self.product),
                provision + *var,
                requirement,
            ));
        }
    }

    /// Violation per zone and timepoint in the solution
    pub fn violation_results<'a>(
        &'a self,
        solution: &'a Solution,
    ) -> impl Iterator<Item = ViolationResult> + 'a {
        self.violations
            .iter()
            .map(move |((zone, timepoint), var)| ViolationResult {
                product: self.product.to_string(),
                zone: zone.clone(),
                timepoint: *timepoint,
                requirement: self.inputs.requirement(zone, *timepoint),
                violation: solution.value(*var),
            })
    }
}
