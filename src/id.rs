//! Code for handling IDs
use anyhow::{Context, Result};
use indexmap::IndexSet;

/// Define a new ID type.
///
/// IDs are reference-counted strings, so cloning them (which happens a lot when they are used as
/// map keys) is cheap.
macro_rules! define_id_type {
    ($name:ident) => {
        #[derive(
            Clone,
            std::hash::Hash,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Debug,
            serde::Deserialize,
            serde::Serialize,
        )]
        /// An ID type (e.g. `ProjectID`, `ZoneID`, etc.)
        pub struct $name(pub std::rc::Rc<str>);

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                $name(std::rc::Rc::from(s))
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                $name(std::rc::Rc::from(s))
            }
        }

        impl $name {
            /// Create a new ID from a string slice
            pub fn new(id: &str) -> Self {
                $name(std::rc::Rc::from(id))
            }
        }
    };
}
pub(crate) use define_id_type;

/// A collection of IDs which can be used to validate strings read from input files
pub trait IDCollection<ID> {
    /// Get the ID from the collection matching the supplied string, or an error if not found
    fn get_id(&self, id: &str) -> Result<&ID>;
}

impl<ID> IDCollection<ID> for IndexSet<ID>
where
    ID: std::borrow::Borrow<str> + std::hash::Hash + Eq,
{
    fn get_id(&self, id: &str) -> Result<&ID> {
        self.get(id)
            .with_context(|| format!("Unknown ID {id} found"))
    }
}
