//! Newtypes for the physical and monetary quantities used in input data.
//!
//! Decision expressions are unitless `f64` coefficients; these types exist so that input tables
//! cannot mix up, say, a capacity with a per-megawatt cost.
use serde::{Deserialize, Serialize};

/// Common behaviour for unit types
pub trait UnitType: Copy + PartialOrd + std::fmt::Debug {
    /// Get the underlying value
    fn value(&self) -> f64;

    /// Whether the value is finite
    fn is_finite(&self) -> bool {
        self.value().is_finite()
    }
}

macro_rules! define_unit_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            PartialOrd,
            Default,
            Serialize,
            Deserialize,
            derive_more::Add,
            derive_more::Sub,
            derive_more::AddAssign,
            derive_more::SubAssign,
            derive_more::Display,
        )]
        pub struct $name(pub f64);

        impl UnitType for $name {
            fn value(&self) -> f64 {
                self.0
            }
        }
    };
}

define_unit_type!(
    /// A dimensionless quantity (e.g. a fraction of capacity)
    Dimensionless
);
define_unit_type!(
    /// Installed or operational capacity in MW
    Capacity
);
define_unit_type!(
    /// Annualised cost per MW of capacity
    MoneyPerCapacityPerYear
);
define_unit_type!(
    /// Cost per MW (e.g. of capacity started up)
    MoneyPerCapacity
);
define_unit_type!(
    /// Cost per MWh of energy
    MoneyPerEnergy
);
