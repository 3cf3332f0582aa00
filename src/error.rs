//! Fatal configuration errors raised while building a scenario.
use std::error::Error;
use std::fmt;

/// An error in the scenario configuration which aborts the build
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    /// A horizon's boundary is neither `circular` nor `linear`
    InvalidBoundary {
        /// The offending horizon
        horizon: u32,
        /// The boundary value supplied
        value: String,
    },
    /// A declared horizon has no timepoints
    EmptyHorizon {
        /// The offending horizon
        horizon: u32,
    },
    /// A timepoint refers to a horizon which was not declared
    UnknownHorizon {
        /// The offending timepoint
        timepoint: u32,
        /// The horizon it refers to
        horizon: u32,
    },
    /// A timepoint refers to a period which was not declared
    UnknownPeriod {
        /// The offending timepoint
        timepoint: u32,
        /// The period it refers to
        period: u32,
    },
    /// A timepoint has a non-positive or non-finite duration
    InvalidTimepointDuration {
        /// The offending timepoint
        timepoint: u32,
        /// The duration supplied
        hours: f64,
    },
    /// A period's discount factor or number of years is negative or not finite
    InvalidPeriodParameter {
        /// The offending period
        period: u32,
        /// The column name
        parameter: &'static str,
        /// The value supplied
        value: f64,
    },
    /// A horizon's weight is negative or not finite
    InvalidHorizonWeight {
        /// The offending horizon
        horizon: u32,
        /// The weight supplied
        weight: f64,
    },
    /// The same ID appears more than once in a table
    DuplicateID {
        /// What kind of entity (e.g. "horizon")
        kind: &'static str,
        /// The duplicated ID
        id: String,
    },
    /// A column name appears more than once in a table header
    DuplicateColumn {
        /// The table file name
        table: String,
        /// The repeated column name
        column: String,
    },
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidBoundary { horizon, value } => write!(
                f,
                "Invalid boundary value '{value}' for horizon '{horizon}'. \
                 Horizon boundary must be either 'circular' or 'linear'"
            ),
            Self::EmptyHorizon { horizon } => {
                write!(f, "Horizon '{horizon}' has no timepoints")
            }
            Self::UnknownHorizon { timepoint, horizon } => write!(
                f,
                "Timepoint '{timepoint}' refers to undeclared horizon '{horizon}'"
            ),
            Self::UnknownPeriod { timepoint, period } => write!(
                f,
                "Timepoint '{timepoint}' refers to undeclared period '{period}'"
            ),
            Self::InvalidTimepointDuration { timepoint, hours } => write!(
                f,
                "Timepoint '{timepoint}' has invalid duration {hours}. Must be a finite number \
                 greater than zero"
            ),
            Self::InvalidPeriodParameter {
                period,
                parameter,
                value,
            } => write!(
                f,
                "Period '{period}' has invalid {parameter} {value}. Must be a finite number which \
                 is not negative"
            ),
            Self::InvalidHorizonWeight { horizon, weight } => write!(
                f,
                "Horizon '{horizon}' has invalid weight {weight}. Must be a finite number which \
                 is not negative"
            ),
            Self::DuplicateID { kind, id } => write!(f, "Duplicate {kind} ID '{id}'"),
            Self::DuplicateColumn { table, column } => write!(
                f,
                "Column '{column}' is specified more than once in {table}"
            ),
        }
    }
}

impl Error for ConfigurationError {}
