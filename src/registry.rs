//! The dynamic component registry.
//!
//! Aggregates such as a period's total cost or the reserve provision in a zone are contributed to
//! by many independent modules. Each module registers its contributions under a typed key during
//! the registration phase; consumers resolve the key once every module has registered.
//!
//! Resolving a key freezes it. A later attempt to register into a frozen key is an error, as it
//! would silently change a sum which has already been used to build the problem.
use crate::balance::{Product, ZoneID};
use crate::project::ProjectID;
use crate::temporal::{PeriodID, TimepointID};
use anyhow::{Result, ensure};
use good_lp::Expression;
use indexmap::IndexMap;
use log::debug;
use std::fmt;

/// Identifies an aggregate in the registry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ComponentKey {
    /// All costs incurred in a period, before discounting
    Cost {
        /// The period
        period: PeriodID,
    },
    /// A project's operational capacity in a period
    Capacity {
        /// The project
        project: ProjectID,
        /// The period
        period: PeriodID,
    },
    /// Upward reserve provided by a project, which must be held back from dispatch
    Headroom {
        /// The project
        project: ProjectID,
        /// The timepoint
        timepoint: TimepointID,
    },
    /// Downward reserve provided by a project, which requires dispatch above its minimum
    Footroom {
        /// The project
        project: ProjectID,
        /// The timepoint
        timepoint: TimepointID,
    },
    /// Total provision of a product in a zone
    Provision {
        /// The product being balanced
        product: Product,
        /// The zone
        zone: ZoneID,
        /// The timepoint
        timepoint: TimepointID,
    },
}

impl fmt::Display for ComponentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cost { period } => write!(f, "cost_components[{period}]"),
            Self::Capacity { project, period } => write!(f, "capacity[{project},{period}]"),
            Self::Headroom { project, timepoint } => {
                write!(f, "headroom_variables[{project},{timepoint}]")
            }
            Self::Footroom { project, timepoint } => {
                write!(f, "footroom_variables[{project},{timepoint}]")
            }
            Self::Provision {
                product,
                zone,
                timepoint,
            } => write!(f, "{product}_provision[{zone},{timepoint}]"),
        }
    }
}

/// A single contribution to an aggregate
#[derive(Debug, Clone)]
pub struct Contributor {
    /// The module which registered the contribution (for diagnostics)
    pub source: String,
    /// The contribution itself
    pub expr: Expression,
}

#[derive(Debug, Default)]
struct Entry {
    contributors: Vec<Contributor>,
    frozen: bool,
}

/// An ordered mapping from [`ComponentKey`]s to contributors, with a frozen flag per key
#[derive(Debug, Default)]
pub struct DynamicComponents {
    entries: IndexMap<ComponentKey, Entry>,
}

impl DynamicComponents {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a contribution to the aggregate at `key`.
    ///
    /// # Arguments
    ///
    /// * `key` - The aggregate to contribute to
    /// * `source` - The module making the contribution
    /// * `expr` - The contribution
    ///
    /// # Returns
    ///
    /// An error if `key` has already been resolved.
    pub fn register(
        &mut self,
        key: ComponentKey,
        source: &str,
        expr: impl Into<Expression>,
    ) -> Result<()> {
        ensure!(
            !self.is_frozen(&key),
            "Module '{source}' tried to register into {key} after it was resolved"
        );
        self.entries
            .entry(key)
            .or_default()
            .contributors
            .push(Contributor {
                source: source.to_string(),
                expr: expr.into(),
            });

        Ok(())
    }

    /// Get every contribution registered at `key`, in registration order, and freeze the key.
    ///
    /// A key nothing was registered into resolves to an empty list.
    pub fn resolve(&mut self, key: &ComponentKey) -> &[Contributor] {
        let entry = self.entries.entry(key.clone()).or_default();
        entry.frozen = true;
        &entry.contributors
    }

    /// Resolve `key` and sum its contributions
    pub fn resolve_sum(&mut self, key: &ComponentKey) -> Expression {
        let mut total = Expression::from(0.0);
        for contributor in self.resolve(key) {
            total += &contributor.expr;
        }
        total
    }

    /// Whether `key` has been resolved
    pub fn is_frozen(&self, key: &ComponentKey) -> bool {
        self.entries.get(key).is_some_and(|entry| entry.frozen)
    }

    /// Iterate over keys in the order they were first used
    pub fn iter_keys(&self) -> impl Iterator<Item = &ComponentKey> {
        self.entries.keys()
    }

    /// Freeze every key in the registry.
    ///
    /// # Returns
    ///
    /// The keys which had contributions but were never resolved by any consumer.
    pub fn freeze_all(&mut self) -> Vec<ComponentKey> {
        let mut unconsumed = Vec::new();
        for (key, entry) in &mut self.entries {
            if !entry.frozen && !entry.contributors.is_empty() {
                unconsumed.push(key.clone());
            }
            entry.frozen = true;
        }
        debug!("Froze {} registry keys", self.entries.len());

        unconsumed
    }
}
