//! Fixtures for tests

use crate::balance::{BalanceInputs, ViolationSettings, ZoneID};
use crate::capacity::{CapacityTables, ExistingProjectPeriodParams};
use crate::model::{Model, ModelParameters};
use crate::project::{CapacityType, OperationalType, Project, ProjectID};
use crate::temporal::{HorizonData, PeriodData, TemporalTopology, TimepointData};
use crate::units::{Capacity, Dimensionless, MoneyPerCapacity, MoneyPerEnergy};
use good_lp::{Expression, IntoAffineExpression, Variable};
use indexmap::{IndexMap, IndexSet};
use rstest::fixture;
use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

/// The non-zero coefficients of an expression
pub fn coefficients(expr: &Expression) -> HashMap<Variable, f64> {
    expr.linear_coefficients()
        .filter(|(_, coeff)| *coeff != 0.0)
        .collect()
}

/// The coefficient of a single variable in an expression
pub fn coefficient(expr: &Expression, var: Variable) -> f64 {
    coefficients(expr).get(&var).copied().unwrap_or(0.0)
}

/// Two periods of 12-hour timepoints.
///
/// 2020 has a circular horizon (1, 2) and a linear horizon (3, 4); 2030 has a single circular
/// horizon (5, 6).
#[fixture]
pub fn timepoints() -> Vec<TimepointData> {
    [(1, 1, 2020), (2, 1, 2020), (3, 2, 2020), (4, 2, 2020), (5, 3, 2030), (6, 3, 2030)]
        .into_iter()
        .map(|(timepoint, horizon, period)| TimepointData {
            timepoint,
            horizon,
            period,
            number_of_hours_in_timepoint: 12.0,
        })
        .collect()
}

#[fixture]
pub fn horizons() -> Vec<HorizonData> {
    [(1, "circular", 2.0), (2, "linear", 1.0), (3, "circular", 2.0)]
        .into_iter()
        .map(|(horizon, boundary, horizon_weight)| HorizonData {
            horizon,
            boundary: boundary.into(),
            horizon_weight,
        })
        .collect()
}

#[fixture]
pub fn periods() -> Vec<PeriodData> {
    vec![
        PeriodData {
            period: 2020,
            discount_factor: 1.0,
            number_years_represented: 10.0,
        },
        PeriodData {
            period: 2030,
            discount_factor: 0.5,
            number_years_represented: 10.0,
        },
    ]
}

#[fixture]
pub fn topology(
    timepoints: Vec<TimepointData>,
    horizons: Vec<HorizonData>,
    periods: Vec<PeriodData>,
) -> TemporalTopology {
    TemporalTopology::new(&timepoints, &horizons, &periods).unwrap()
}

#[fixture]
pub fn zone_id() -> ZoneID {
    "north".into()
}

/// An existing gas project which cannot retire and dispatches without commitment
#[fixture]
pub fn project() -> Project {
    Project {
        id: "gas".into(),
        capacity_type: CapacityType::ExistingGenNoEconomicRetirement,
        operational_type: OperationalType::DispatchableNoCommit,
        technology: "gas".into(),
        load_zone: zone_id(),
        variable_cost_per_mwh: MoneyPerEnergy(30.0),
        min_stable_level: Dimensionless(0.0),
        startup_cost_per_mw: MoneyPerCapacity(0.0),
        shutdown_cost_per_mw: MoneyPerCapacity(0.0),
        reserve_capabilities: IndexSet::new(),
    }
}

/// 100 MW of existing capacity in both periods, with no fixed cost
#[fixture]
pub fn capacity_tables() -> CapacityTables {
    CapacityTables {
        existing: [2020, 2030]
            .into_iter()
            .map(|period| ExistingProjectPeriodParams {
                project: ProjectID::new("gas"),
                period,
                existing_capacity_mw: Capacity(100.0),
                fixed_cost_per_mw_yr: None,
            })
            .collect(),
        ..CapacityTables::default()
    }
}

/// Load of 60 MW in every timepoint, which may be left unserved at a high price
#[fixture]
pub fn load(topology: TemporalTopology) -> BalanceInputs {
    let zone = zone_id();
    BalanceInputs {
        zones: [(
            zone.clone(),
            ViolationSettings {
                allowed: true,
                penalty: 10_000.0,
            },
        )]
        .into_iter()
        .collect(),
        requirements: topology
            .iter_timepoints()
            .map(|tmp| ((zone.clone(), tmp.id), 60.0))
            .collect(),
    }
}

#[fixture]
pub fn model(
    topology: TemporalTopology,
    project: Project,
    capacity_tables: CapacityTables,
    load: BalanceInputs,
) -> Model {
    Model {
        model_path: PathBuf::from("model"),
        parameters: ModelParameters::default(),
        topology,
        projects: [(project.id.clone(), Rc::new(project))].into_iter().collect(),
        capacity_tables,
        load,
        reserves: IndexMap::new(),
    }
}
