//! The temporal structure of a scenario: timepoints, horizons and periods.
//!
//! Timepoints are the atomic decision instants. Each belongs to exactly one horizon, which groups
//! consecutive timepoints and determines what happens at its boundary, and to exactly one period,
//! the investment interval over which capacity decisions are made.
//!
//! The key derived quantity is the previous-timepoint relation, which every time-coupled
//! constraint (e.g. unit commitment) depends on. For the first timepoint of a horizon, the previous
//! timepoint is the last timepoint of the same horizon if the boundary is circular and is undefined
//! if it is linear.
use crate::error::ConfigurationError;
use anyhow::{Result, ensure};
use indexmap::{IndexMap, IndexSet};
use serde::Deserialize;
use std::str::FromStr;

/// Identifies a timepoint. Timepoints are ordered by ID.
pub type TimepointID = u32;

/// Identifies a horizon
pub type HorizonID = u32;

/// Identifies a period (typically the first year it represents)
pub type PeriodID = u32;

/// What happens at the edge of a horizon
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Boundary {
    /// The first timepoint's predecessor is the last timepoint of the same horizon
    Circular,
    /// The first timepoint has no predecessor
    Linear,
}

impl FromStr for Boundary {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "circular" => Ok(Self::Circular),
            "linear" => Ok(Self::Linear),
            _ => Err(()),
        }
    }
}

/// A row of the timepoints table
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TimepointData {
    /// The timepoint's ID
    pub timepoint: TimepointID,
    /// The horizon the timepoint belongs to
    pub horizon: HorizonID,
    /// The period the timepoint belongs to
    pub period: PeriodID,
    /// Duration of the timepoint in hours
    pub number_of_hours_in_timepoint: f64,
}

/// A row of the horizons table
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HorizonData {
    /// The horizon's ID
    pub horizon: HorizonID,
    /// Either `circular` or `linear`; validated when the topology is built
    pub boundary: String,
    /// How many times the horizon is repeated within its period
    pub horizon_weight: f64,
}

/// A row of the periods table
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PeriodData {
    /// The period's ID
    pub period: PeriodID,
    /// Discount factor applied to all costs incurred in the period
    pub discount_factor: f64,
    /// The number of years the period represents
    pub number_years_represented: f64,
}

/// An atomic decision instant
#[derive(Debug, Clone, PartialEq)]
pub struct Timepoint {
    /// The timepoint's ID
    pub id: TimepointID,
    /// The horizon the timepoint belongs to
    pub horizon: HorizonID,
    /// The period the timepoint belongs to
    pub period: PeriodID,
    /// Duration in hours
    pub number_of_hours: f64,
}

/// An ordered group of timepoints sharing a boundary policy
#[derive(Debug, Clone, PartialEq)]
pub struct Horizon {
    /// The horizon's ID
    pub id: HorizonID,
    /// Boundary policy
    pub boundary: Boundary,
    /// How many times the horizon is repeated within its period
    pub weight: f64,
    /// The timepoints on this horizon (non-empty, in ascending order)
    timepoints: IndexSet<TimepointID>,
}

impl Horizon {
    /// The first timepoint on the horizon
    pub fn first(&self) -> TimepointID {
        *self.timepoints.first().unwrap() // safe: horizons are never empty
    }

    /// The last timepoint on the horizon
    pub fn last(&self) -> TimepointID {
        *self.timepoints.last().unwrap() // safe: horizons are never empty
    }

    /// Iterate over the timepoints on this horizon
    pub fn iter_timepoints(&self) -> impl Iterator<Item = TimepointID> + '_ {
        self.timepoints.iter().copied()
    }
}

/// An investment/operational period
#[derive(Debug, Clone, PartialEq)]
pub struct Period {
    /// The period's ID
    pub id: PeriodID,
    /// Discount factor for costs in this period
    pub discount_factor: f64,
    /// Number of years represented by this period
    pub number_years_represented: f64,
}

impl Period {
    /// The factor applied to a period's annualised costs in the objective
    pub fn objective_weight(&self) -> f64 {
        self.discount_factor * self.number_years_represented
    }
}

/// The timepoint/horizon/period graph for a scenario.
///
/// Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct TemporalTopology {
    timepoints: IndexMap<TimepointID, Timepoint>,
    horizons: IndexMap<HorizonID, Horizon>,
    periods: IndexMap<PeriodID, Period>,
    previous_timepoints: IndexMap<TimepointID, Option<TimepointID>>,
}

impl TemporalTopology {
    /// Build the topology from the raw input tables.
    ///
    /// # Arguments
    ///
    /// * `timepoints` - Timepoint rows, in any order
    /// * `horizons` - Horizon rows, in any order
    /// * `periods` - Period rows, in any order
    ///
    /// # Returns
    ///
    /// The topology or a [`ConfigurationError`] naming the offending entity.
    pub fn new(
        timepoints: &[TimepointData],
        horizons: &[HorizonData],
        periods: &[PeriodData],
    ) -> Result<Self> {
        ensure!(!periods.is_empty(), "No periods defined");
        ensure!(!timepoints.is_empty(), "No timepoints defined");

        let mut period_map = IndexMap::new();
        for data in periods {
            for (parameter, value) in [
                ("discount_factor", data.discount_factor),
                ("number_years_represented", data.number_years_represented),
            ] {
                if !(value.is_finite() && value >= 0.0) {
                    Err(ConfigurationError::InvalidPeriodParameter {
                        period: data.period,
                        parameter,
                        value,
                    })?;
                }
            }
            let period = Period {
                id: data.period,
                discount_factor: data.discount_factor,
                number_years_represented: data.number_years_represented,
            };
            if period_map.insert(data.period, period).is_some() {
                Err(ConfigurationError::DuplicateID {
                    kind: "period",
                    id: data.period.to_string(),
                })?;
            }
        }
        period_map.sort_keys();

        let mut horizon_map = IndexMap::new();
        for data in horizons {
            let boundary = data.boundary.trim().parse::<Boundary>().map_err(|()| {
                ConfigurationError::InvalidBoundary {
                    horizon: data.horizon,
                    value: data.boundary.clone(),
                }
            })?;
            if !(data.horizon_weight.is_finite() && data.horizon_weight >= 0.0) {
                Err(ConfigurationError::InvalidHorizonWeight {
                    horizon: data.horizon,
                    weight: data.horizon_weight,
                })?;
            }
            let horizon = Horizon {
                id: data.horizon,
                boundary,
                weight: data.horizon_weight,
                timepoints: IndexSet::new(),
            };
            if horizon_map.insert(data.horizon, horizon).is_some() {
                Err(ConfigurationError::DuplicateID {
                    kind: "horizon",
                    id: data.horizon.to_string(),
                })?;
            }
        }
        horizon_map.sort_keys();

        let mut timepoint_map = IndexMap::new();
        for data in timepoints {
            let Some(horizon) = horizon_map.get_mut(&data.horizon) else {
                return Err(ConfigurationError::UnknownHorizon {
                    timepoint: data.timepoint,
                    horizon: data.horizon,
                }
                .into());
            };
            if !period_map.contains_key(&data.period) {
                Err(ConfigurationError::UnknownPeriod {
                    timepoint: data.timepoint,
                    period: data.period,
                })?;
            }
            if !(data.number_of_hours_in_timepoint.is_finite()
                && data.number_of_hours_in_timepoint > 0.0)
            {
                Err(ConfigurationError::InvalidTimepointDuration {
                    timepoint: data.timepoint,
                    hours: data.number_of_hours_in_timepoint,
                })?;
            }

            let timepoint = Timepoint {
                id: data.timepoint,
                horizon: data.horizon,
                period: data.period,
                number_of_hours: data.number_of_hours_in_timepoint,
            };
            if timepoint_map.insert(data.timepoint, timepoint).is_some() {
                Err(ConfigurationError::DuplicateID {
                    kind: "timepoint",
                    id: data.timepoint.to_string(),
                })?;
            }
            horizon.timepoints.insert(data.timepoint);
        }
        timepoint_map.sort_keys();

        for horizon in horizon_map.values_mut() {
            if horizon.timepoints.is_empty() {
                Err(ConfigurationError::EmptyHorizon {
                    horizon: horizon.id,
                })?;
            }
            horizon.timepoints.sort();
        }

        let previous_timepoints = previous_timepoint_map(&timepoint_map, &horizon_map);

        Ok(Self {
            timepoints: timepoint_map,
            horizons: horizon_map,
            periods: period_map,
            previous_timepoints,
        })
    }

    /// Get a timepoint by ID.
    ///
    /// # Panics
    ///
    /// If the timepoint does not exist.
    pub fn timepoint(&self, id: TimepointID) -> &Timepoint {
        self.timepoints
            .get(&id)
            .unwrap_or_else(|| panic!("Unknown timepoint {id}"))
    }

    /// Get a horizon by ID.
    ///
    /// # Panics
    ///
    /// If the horizon does not exist.
    pub fn horizon(&self, id: HorizonID) -> &Horizon {
        self.horizons
            .get(&id)
            .unwrap_or_else(|| panic!("Unknown horizon {id}"))
    }

    /// Get a period by ID.
    ///
    /// # Panics
    ///
    /// If the period does not exist.
    pub fn period(&self, id: PeriodID) -> &Period {
        self.periods
            .get(&id)
            .unwrap_or_else(|| panic!("Unknown period {id}"))
    }

    /// Whether a timepoint with this ID exists
    pub fn contains_timepoint(&self, id: TimepointID) -> bool {
        self.timepoints.contains_key(&id)
    }

    /// Whether a period with this ID exists
    pub fn contains_period(&self, id: PeriodID) -> bool {
        self.periods.contains_key(&id)
    }

    /// Iterate over all timepoints in ascending order
    pub fn iter_timepoints(&self) -> impl Iterator<Item = &Timepoint> {
        self.timepoints.values()
    }

    /// Iterate over all horizons in ascending order
    pub fn iter_horizons(&self) -> impl Iterator<Item = &Horizon> {
        self.horizons.values()
    }

    /// Iterate over all periods in ascending order
    pub fn iter_periods(&self) -> impl Iterator<Item = &Period> {
        self.periods.values()
    }

    /// Iterate over period IDs in ascending order
    pub fn iter_period_ids(&self) -> impl Iterator<Item = PeriodID> + '_ {
        self.periods.keys().copied()
    }

    /// Iterate over the timepoints which fall within the given period
    pub fn timepoints_in_period(&self, period: PeriodID) -> impl Iterator<Item = &Timepoint> {
        self.timepoints
            .values()
            .filter(move |tmp| tmp.period == period)
    }

    /// The period to which a timepoint belongs
    pub fn period_of(&self, timepoint: TimepointID) -> PeriodID {
        self.timepoint(timepoint).period
    }

    /// The first timepoint on a horizon
    pub fn first_timepoint(&self, horizon: HorizonID) -> TimepointID {
        self.horizon(horizon).first()
    }

    /// The last timepoint on a horizon
    pub fn last_timepoint(&self, horizon: HorizonID) -> TimepointID {
        self.horizon(horizon).last()
    }

    /// The timepoints on a horizon, in ascending order
    pub fn timepoints_on_horizon(&self, horizon: HorizonID) -> impl Iterator<Item = TimepointID> {
        self.horizon(horizon).iter_timepoints()
    }

    /// The timepoint preceding `timepoint`, if any.
    ///
    /// This is `None` only for the first timepoint of a horizon with a linear boundary.
    pub fn prev_timepoint(&self, timepoint: TimepointID) -> Option<TimepointID> {
        *self
            .previous_timepoints
            .get(&timepoint)
            .unwrap_or_else(|| panic!("Unknown timepoint {timepoint}"))
    }

    /// The first period
    pub fn first_period(&self) -> PeriodID {
        *self.periods.first().unwrap().0 // safe: there is at least one period
    }

    /// The period preceding `period`, or `None` for the first period
    pub fn previous_period(&self, period: PeriodID) -> Option<PeriodID> {
        let idx = self
            .periods
            .get_index_of(&period)
            .unwrap_or_else(|| panic!("Unknown period {period}"));
        idx.checked_sub(1)
            .map(|prev| *self.periods.get_index(prev).unwrap().0)
    }

    /// The weight of one unit of power in a timepoint when converting to annual energy.
    ///
    /// This is the timepoint's duration multiplied by the weight of its horizon.
    pub fn timepoint_weight(&self, timepoint: TimepointID) -> f64 {
        let tmp = self.timepoint(timepoint);
        tmp.number_of_hours * self.horizon(tmp.horizon).weight
    }
}

/// Derive the previous-timepoint relation.
///
/// Timepoints, including those on each horizon, are assumed to be sorted and every horizon to be
/// non-empty.
fn previous_timepoint_map(
    timepoints: &IndexMap<TimepointID, Timepoint>,
    horizons: &IndexMap<HorizonID, Horizon>,
) -> IndexMap<TimepointID, Option<TimepointID>> {
    let mut previous = IndexMap::with_capacity(timepoints.len());
    let mut last_seen = None;
    for (&id, tmp) in timepoints {
        let horizon = &horizons[&tmp.horizon];
        let prev = if id == horizon.first() {
            match horizon.boundary {
                Boundary::Circular => Some(horizon.last()),
                Boundary::Linear => None,
            }
        } else {
            last_seen
        };
        previous.insert(id, prev);
        last_seen = Some(id);
    }

    previous
}
