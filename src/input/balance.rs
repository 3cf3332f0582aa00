//! Code for reading load and reserve requirements.
use super::{input_err_msg, read_csv, read_csv_optional};
use crate::balance::{BalanceInputs, ReserveProduct, ViolationSettings, ZoneID};
use crate::error::ConfigurationError;
use crate::temporal::{TemporalTopology, TimepointID};
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use log::warn;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

const LOAD_ZONES_FILE_NAME: &str = "load_zones.csv";
const LOAD_FILE_NAME: &str = "load.csv";

#[derive(Debug, PartialEq, Deserialize)]
struct ZoneRaw {
    zone: String,
    allow_violation: bool,
    violation_penalty: f64,
}

#[derive(Debug, PartialEq, Deserialize)]
struct RequirementRaw {
    zone: String,
    timepoint: TimepointID,
    #[serde(alias = "load_mw")]
    requirement_mw: f64,
}

fn read_zones_from_iter<I>(iter: I) -> Result<IndexMap<ZoneID, ViolationSettings>>
where
    I: Iterator<Item = ZoneRaw>,
{
    let mut zones = IndexMap::new();
    for raw in iter {
        ensure!(
            raw.violation_penalty.is_finite() && raw.violation_penalty >= 0.0,
            "Invalid violation penalty ({}) for zone {}. Must be >=0.",
            raw.violation_penalty,
            raw.zone
        );
        let settings = ViolationSettings {
            allowed: raw.allow_violation,
            penalty: raw.violation_penalty,
        };
        if zones.insert(ZoneID::from(raw.zone.as_str()), settings).is_some() {
            Err(ConfigurationError::DuplicateID {
                kind: "zone",
                id: raw.zone,
            })?;
        }
    }

    Ok(zones)
}

fn read_requirements_from_iter<I>(
    iter: I,
    zones: &IndexMap<ZoneID, ViolationSettings>,
    topology: &TemporalTopology,
) -> Result<HashMap<(ZoneID, TimepointID), f64>>
where
    I: Iterator<Item = RequirementRaw>,
{
    let mut requirements = HashMap::new();
    for raw in iter {
        let (zone, _) = zones
            .get_key_value(raw.zone.as_str())
            .with_context(|| format!("Requirement given for undeclared zone {}", raw.zone))?;
        ensure!(
            topology.contains_timepoint(raw.timepoint),
            "Requirement given for undeclared timepoint {}",
            raw.timepoint
        );
        ensure!(
            raw.requirement_mw.is_finite() && raw.requirement_mw >= 0.0,
            "Invalid requirement ({}) for zone {}, timepoint {}",
            raw.requirement_mw,
            raw.zone,
            raw.timepoint
        );
        ensure!(
            requirements
                .insert((zone.clone(), raw.timepoint), raw.requirement_mw)
                .is_none(),
            "Duplicate requirement for zone {}, timepoint {}",
            raw.zone,
            raw.timepoint
        );
    }

    Ok(requirements)
}

/// Read the zones and requirements for one product
fn read_balance_inputs(
    zones_path: &Path,
    requirements_path: &Path,
    topology: &TemporalTopology,
) -> Result<BalanceInputs> {
    let zones = read_zones_from_iter(read_csv(zones_path)?)
        .with_context(|| input_err_msg(zones_path))?;
    let requirements =
        read_requirements_from_iter(read_csv_optional(requirements_path)?, &zones, topology)
            .with_context(|| input_err_msg(requirements_path))?;

    Ok(BalanceInputs {
        zones,
        requirements,
    })
}

/// Read load zones and load from the model directory
pub fn read_load(model_dir: &Path, topology: &TemporalTopology) -> Result<BalanceInputs> {
    let load = read_balance_inputs(
        &model_dir.join(LOAD_ZONES_FILE_NAME),
        &model_dir.join(LOAD_FILE_NAME),
        topology,
    )?;
    if load.requirements.is_empty() {
        warn!("No load specified; the energy balance is trivially satisfied");
    }

    Ok(load)
}

/// Read the zones and requirements for every enabled reserve product.
///
/// Each product has its own `<product>_zones.csv` and `<product>_requirement.csv`.
pub fn read_reserves(
    model_dir: &Path,
    features: &[ReserveProduct],
    topology: &TemporalTopology,
) -> Result<IndexMap<ReserveProduct, BalanceInputs>> {
    features
        .iter()
        .map(|product| {
            let inputs = read_balance_inputs(
                &model_dir.join(format!("{product}_zones.csv")),
                &model_dir.join(format!("{product}_requirement.csv")),
                topology,
            )?;
            Ok((*product, inputs))
        })
        .collect()
}
