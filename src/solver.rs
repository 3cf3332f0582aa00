//! The contract between an assembled problem and an external solver.
use crate::problem::Formulation;
use good_lp::solvers::highs::highs;
use good_lp::{
    Expression, IntoAffineExpression, ProblemVariables, ResolutionError, SolverModel, Variable,
};
use log::debug;
use std::collections::HashMap;
use std::error::Error;
use std::fmt;

/// Values for the variables of a problem, as returned by a solver
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Solution {
    values: HashMap<Variable, f64>,
    objective_value: f64,
}

impl Solution {
    /// Create a [`Solution`] from variable values, with the objective value left at zero.
    ///
    /// Variables without a value are taken to be zero.
    pub fn from_values(values: impl IntoIterator<Item = (Variable, f64)>) -> Self {
        Self {
            values: values.into_iter().collect(),
            objective_value: 0.0,
        }
    }

    /// The value of a single variable
    pub fn value(&self, var: Variable) -> f64 {
        self.values.get(&var).copied().unwrap_or(0.0)
    }

    /// Evaluate an expression using the solution's values
    pub fn eval(&self, expr: &Expression) -> f64 {
        expr.constant()
            + expr
                .linear_coefficients()
                .map(|(var, coeff)| coeff * self.value(var))
                .sum::<f64>()
    }

    /// The value of the objective, including any constant terms
    pub fn objective_value(&self) -> f64 {
        self.objective_value
    }
}

/// A problem could not be solved to optimality
#[derive(Debug, Clone)]
pub enum SolveError {
    /// No assignment satisfies every constraint
    Infeasible,
    /// The objective can be decreased without bound
    Unbounded,
    /// The solver failed for another reason.
    ///
    /// Users should not be able to trigger this error.
    Failed(String),
}

impl From<ResolutionError> for SolveError {
    fn from(err: ResolutionError) -> Self {
        match err {
            ResolutionError::Infeasible => Self::Infeasible,
            ResolutionError::Unbounded => Self::Unbounded,
            err => Self::Failed(format!("{err:?}")),
        }
    }
}

impl fmt::Display for SolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveError::Infeasible => write!(f, "The problem is infeasible"),
            SolveError::Unbounded => write!(f, "The problem is unbounded"),
            SolveError::Failed(msg) => write!(f, "Solver failed: {msg}"),
        }
    }
}

impl Error for SolveError {}

/// Something which can minimise an assembled problem.
///
/// Solving is a single blocking call. Infeasible or unbounded results are returned as errors
/// without any attempt at relaxation.
pub trait Solver {
    /// Minimise the formulation's objective over `variables`
    fn solve(
        &self,
        variables: ProblemVariables,
        formulation: &Formulation,
    ) -> Result<Solution, SolveError>;
}

/// Solves problems with the HiGHS solver
#[derive(Debug, Clone, PartialEq)]
pub struct HighsSolver {
    /// Relative optimality gap at which MIP solves stop
    pub mip_rel_gap: f64,
}

impl Default for HighsSolver {
    fn default() -> Self {
        Self { mip_rel_gap: 1e-4 }
    }
}

impl Solver for HighsSolver {
    fn solve(
        &self,
        variables: ProblemVariables,
        formulation: &Formulation,
    ) -> Result<Solution, SolveError> {
        let objective = formulation.objective();

        // An empty problem is trivially optimal
        if formulation.num_variables() == 0 {
            return Ok(Solution {
                values: HashMap::new(),
                objective_value: objective.constant(),
            });
        }

        debug!(
            "Solving problem with {} variables and {} constraints",
            formulation.num_variables(),
            formulation.num_constraints()
        );
        let model = variables
            .minimise(objective.clone())
            .using(highs)
            .set_option("mip_rel_gap", self.mip_rel_gap);
        let solved = formulation
            .iter_constraints()
            .fold(model, |model, constraint| model.with(constraint.to_lp()))
            .solve()?;

        let mut solution = Solution::from_values(
            formulation
                .iter_variables()
                .map(|(var, _)| (var, good_lp::Solution::value(&solved, var))),
        );
        solution.objective_value = solution.eval(objective);

        Ok(solution)
    }
}
