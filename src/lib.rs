//! Assembles capacity-expansion and dispatch optimisation problems for energy systems from
//! independent modules, solves them with HiGHS and writes the results.
#![warn(missing_docs)]

pub mod assembly;
pub mod balance;
pub mod capacity;
pub mod cli;
pub mod error;
pub mod id;
pub mod input;
pub mod log;
pub mod model;
pub mod operations;
pub mod output;
pub mod problem;
pub mod project;
pub mod registry;
pub mod reserves;
pub mod settings;
pub mod simulation;
pub mod solver;
pub mod temporal;
pub mod units;

#[cfg(test)]
mod fixture;
