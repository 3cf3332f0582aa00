//! A summary of the objective, broken down by period.
use crate::temporal::{Period, PeriodID};
use serde::Serialize;

/// The cost of a single period
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodCost {
    /// The period
    pub period: PeriodID,
    /// Discount factor applied to the period's costs
    pub discount_factor: f64,
    /// Number of years the period represents
    pub number_years_represented: f64,
    /// Annual cost before discounting
    pub annual_cost: f64,
    /// Contribution to the objective
    pub discounted_cost: f64,
}

impl PeriodCost {
    /// Create from a period and its annual cost
    pub fn new(period: &Period, annual_cost: f64) -> Self {
        Self {
            period: period.id,
            discount_factor: period.discount_factor,
            number_years_represented: period.number_years_represented,
            annual_cost,
            discounted_cost: annual_cost * period.objective_weight(),
        }
    }
}

/// The contents of `objective.toml`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectiveSummary {
    /// The value of the objective
    pub total_cost: f64,
    /// Breakdown by period
    pub periods: Vec<PeriodCost>,
}
