//! Projects: generators whose capacity and dispatch are decided by the model.
use crate::balance::{ReserveProduct, ZoneID};
use crate::id::define_id_type;
use crate::units::{Dimensionless, MoneyPerCapacity, MoneyPerEnergy};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::rc::Rc;

define_id_type! {ProjectID}

/// A map of [`Project`]s, keyed by project ID
pub type ProjectMap = IndexMap<ProjectID, Rc<Project>>;

/// How a project's available capacity evolves over periods
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Deserialize,
    Serialize,
    strum::Display,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CapacityType {
    /// Exogenous capacity which cannot be retired early
    ExistingGenNoEconomicRetirement,
    /// Exogenous capacity which may be retired, permanently, to save fixed costs
    ExistingGenLinearEconomicRetirement,
    /// New capacity built in discrete units of a fixed size
    GenNewBin,
    /// New capacity of any size
    GenNewLin,
}

/// How a project may be dispatched in each timepoint
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Deserialize,
    Serialize,
    strum::Display,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OperationalType {
    /// Always runs at full capacity
    MustRun,
    /// Dispatches anywhere between zero and its capacity
    DispatchableNoCommit,
    /// Commits a continuous amount of capacity, with a minimum stable level and startup costs
    DispatchableContinuousCommit,
}

/// A generator project
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    /// Unique identifier
    pub id: ProjectID,
    /// Capacity lifecycle
    pub capacity_type: CapacityType,
    /// Dispatch behaviour
    pub operational_type: OperationalType,
    /// Technology label, used only for reporting
    pub technology: String,
    /// The zone whose load the project serves
    pub load_zone: ZoneID,
    /// Cost of generating energy
    pub variable_cost_per_mwh: MoneyPerEnergy,
    /// Minimum output as a fraction of committed capacity
    pub min_stable_level: Dimensionless,
    /// Cost per MW of capacity started up
    pub startup_cost_per_mw: MoneyPerCapacity,
    /// Cost per MW of capacity shut down
    pub shutdown_cost_per_mw: MoneyPerCapacity,
    /// Reserve products the project can provide
    pub reserve_capabilities: IndexSet<ReserveProduct>,
}

impl Project {
    /// Whether the project can provide the given reserve product
    pub fn provides(&self, product: ReserveProduct) -> bool {
        self.reserve_capabilities.contains(&product)
    }
}
