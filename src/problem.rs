//! The optimisation problem as built up by modules.
//!
//! Variables and expressions are [`good_lp`] types. A [`Problem`] adds what the build needs on top
//! of them: a unique name for every variable and constraint, and the constraints kept in a form
//! which can be checked against a solution once the solver is done.
use crate::solver::{SolveError, Solution, Solver};
use good_lp::{
    Expression, IntoAffineExpression, ProblemVariables, Variable, constraint, variable,
};
use indexmap::IndexMap;
use std::ops::RangeInclusive;

/// The domain of a decision variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum VariableKind {
    /// A real-valued variable
    Continuous,
    /// A variable taking the value 0 or 1
    Binary,
}

/// Metadata for a variable
#[derive(Debug, Clone, PartialEq)]
pub struct VariableInfo {
    /// Unique name (e.g. `build[gas_ct,2020]`)
    pub name: String,
    /// The variable's domain
    pub kind: VariableKind,
    /// Lower bound
    pub lower: f64,
    /// Upper bound (may be infinite)
    pub upper: f64,
}

impl VariableInfo {
    /// Whether the variable is fixed at zero.
    ///
    /// Disabled variables are kept in the problem so that every index has the same structure.
    pub fn is_disabled(&self) -> bool {
        self.lower == 0.0 && self.upper == 0.0
    }
}

/// How a constraint's expression relates to zero
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    /// `expr >= 0`
    AtLeast,
    /// `expr <= 0`
    AtMost,
    /// `expr == 0`
    Equal,
}

/// A named linear constraint, stored as `lhs - rhs` compared with zero
#[derive(Debug, Clone)]
pub struct Constraint {
    /// Unique name (e.g. `retire_forever[coal,2030]`)
    pub name: String,
    /// The left-hand side less the right-hand side
    pub expr: Expression,
    /// How `expr` compares with zero
    pub sense: Sense,
}

impl Constraint {
    fn new(
        name: impl Into<String>,
        lhs: impl IntoAffineExpression,
        rhs: impl IntoAffineExpression,
        sense: Sense,
    ) -> Self {
        Self {
            name: name.into(),
            expr: lhs.into_expression() - rhs.into_expression(),
            sense,
        }
    }

    /// `lhs >= rhs`
    pub fn at_least(
        name: impl Into<String>,
        lhs: impl IntoAffineExpression,
        rhs: impl IntoAffineExpression,
    ) -> Self {
        Self::new(name, lhs, rhs, Sense::AtLeast)
    }

    /// `lhs <= rhs`
    pub fn at_most(
        name: impl Into<String>,
        lhs: impl IntoAffineExpression,
        rhs: impl IntoAffineExpression,
    ) -> Self {
        Self::new(name, lhs, rhs, Sense::AtMost)
    }

    /// `lhs == rhs`
    pub fn equal(
        name: impl Into<String>,
        lhs: impl IntoAffineExpression,
        rhs: impl IntoAffineExpression,
    ) -> Self {
        Self::new(name, lhs, rhs, Sense::Equal)
    }

    /// The constraint in the form the solver takes
    pub fn to_lp(&self) -> good_lp::Constraint {
        let expr = self.expr.clone();
        match self.sense {
            Sense::AtLeast => constraint!(expr >= 0.0),
            Sense::AtMost => constraint!(expr <= 0.0),
            Sense::Equal => constraint!(expr == 0.0),
        }
    }

    /// By how much the solution violates the constraint (zero if it holds)
    pub fn violation(&self, solution: &Solution) -> f64 {
        let value = solution.eval(&self.expr);
        match self.sense {
            Sense::AtLeast => (-value).max(0.0),
            Sense::AtMost => value.max(0.0),
            Sense::Equal => value.abs(),
        }
    }

    /// Whether the constraint holds for the solution, within an absolute tolerance
    pub fn is_satisfied(&self, solution: &Solution, tolerance: f64) -> bool {
        self.violation(solution) <= tolerance
    }
}

/// Everything about a problem except the solver's variable store: variable metadata, the
/// constraints and the objective
#[derive(Debug, Clone)]
pub struct Formulation {
    variables: IndexMap<Variable, VariableInfo>,
    constraints: Vec<Constraint>,
    objective: Expression,
}

impl Formulation {
    /// The expression to be minimised
    pub fn objective(&self) -> &Expression {
        &self.objective
    }

    /// Metadata for a variable.
    ///
    /// # Panics
    ///
    /// If the variable does not belong to this problem.
    pub fn variable(&self, var: Variable) -> &VariableInfo {
        &self.variables[&var]
    }

    /// Iterate over all variables in the order they were added
    pub fn iter_variables(&self) -> impl Iterator<Item = (Variable, &VariableInfo)> {
        self.variables.iter().map(|(var, info)| (*var, info))
    }

    /// Iterate over all constraints in the order they were added
    pub fn iter_constraints(&self) -> impl Iterator<Item = &Constraint> {
        self.constraints.iter()
    }

    /// Look up a variable by its name
    pub fn find_variable(&self, name: &str) -> Option<Variable> {
        self.variables
            .iter()
            .find(|(_, info)| info.name == name)
            .map(|(var, _)| *var)
    }

    /// Look up a constraint by its name
    pub fn find_constraint(&self, name: &str) -> Option<&Constraint> {
        self.constraints.iter().find(|c| c.name == name)
    }

    /// The number of variables
    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    /// The number of constraints
    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }
}

/// The optimisation problem under construction, always a minimisation
pub struct Problem {
    variables: ProblemVariables,
    formulation: Formulation,
}

impl Default for Problem {
    fn default() -> Self {
        Self {
            variables: ProblemVariables::new(),
            formulation: Formulation {
                variables: IndexMap::new(),
                constraints: Vec::new(),
                objective: Expression::from(0.0),
            },
        }
    }
}

impl Problem {
    /// Create an empty problem
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a decision variable.
    ///
    /// # Panics
    ///
    /// If the bounds are empty or a binary variable is given bounds outside `[0, 1]`.
    pub fn add_variable(
        &mut self,
        name: impl Into<String>,
        kind: VariableKind,
        bounds: RangeInclusive<f64>,
    ) -> Variable {
        let name = name.into();
        let (lower, upper) = bounds.into_inner();
        assert!(lower <= upper, "Invalid bounds for variable {name}");

        let mut definition = variable().name(name.clone()).min(lower).max(upper);
        if kind == VariableKind::Binary {
            assert!(
                lower >= 0.0 && upper <= 1.0,
                "Binary variable bounds must lie in [0, 1]"
            );
            definition = definition.integer();
        }

        let var = self.variables.add(definition);
        self.formulation.variables.insert(
            var,
            VariableInfo {
                name,
                kind,
                lower,
                upper,
            },
        );
        var
    }

    /// Add a constraint to the problem
    pub fn add_constraint(&mut self, constraint: Constraint) {
        self.formulation.constraints.push(constraint);
    }

    /// Add an optional constraint; `None` means no constraint for this index
    pub fn add_optional_constraint(&mut self, constraint: Option<Constraint>) {
        if let Some(constraint) = constraint {
            self.add_constraint(constraint);
        }
    }

    /// Set the expression to be minimised
    pub fn set_objective(&mut self, objective: Expression) {
        self.formulation.objective = objective;
    }

    /// The problem without its variable store
    pub fn formulation(&self) -> &Formulation {
        &self.formulation
    }

    /// The expression to be minimised
    pub fn objective(&self) -> &Expression {
        self.formulation.objective()
    }

    /// Metadata for a variable
    pub fn variable(&self, var: Variable) -> &VariableInfo {
        self.formulation.variable(var)
    }

    /// Look up a variable by its name
    pub fn find_variable(&self, name: &str) -> Option<Variable> {
        self.formulation.find_variable(name)
    }

    /// Look up a constraint by its name
    pub fn find_constraint(&self, name: &str) -> Option<&Constraint> {
        self.formulation.find_constraint(name)
    }

    /// The number of variables
    pub fn num_variables(&self) -> usize {
        self.formulation.num_variables()
    }

    /// The number of constraints
    pub fn num_constraints(&self) -> usize {
        self.formulation.num_constraints()
    }

    /// Hand the problem to `solver`.
    ///
    /// # Returns
    ///
    /// The formulation, for inspecting the solution against, and the solution.
    pub fn solve(self, solver: &dyn Solver) -> Result<(Formulation, Solution), SolveError> {
        let Self {
            variables,
            formulation,
        } = self;
        let solution = solver.solve(variables, &formulation)?;

        Ok((formulation, solution))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::coefficients;
    use rstest::{fixture, rstest};
    use std::collections::HashMap;

    #[fixture]
    fn problem() -> Problem {
        let mut problem = Problem::new();
        problem.add_variable("x", VariableKind::Continuous, 0.0..=f64::INFINITY);
        problem.add_variable("y", VariableKind::Binary, 0.0..=1.0);
        problem
    }

    #[rstest]
    fn test_constraint_moves_rhs_across(problem: Problem) {
        let x = problem.find_variable("x").unwrap();
        let y = problem.find_variable("y").unwrap();

        // 2x + y >= x + 3  <=>  x + y - 3 >= 0
        let constraint = Constraint::at_least("c", 2.0 * x + y, x + 3.0);
        assert_eq!(
            coefficients(&constraint.expr),
            HashMap::from([(x, 1.0), (y, 1.0)])
        );
        assert_eq!(constraint.expr.constant(), -3.0);
    }

    #[rstest]
    #[case(Sense::AtLeast, 3.0, true)]
    #[case(Sense::AtLeast, 2.0, false)]
    #[case(Sense::AtMost, 2.0, true)]
    #[case(Sense::AtMost, 4.0, false)]
    #[case(Sense::Equal, 3.0, true)]
    #[case(Sense::Equal, 3.1, false)]
    fn test_is_satisfied(
        problem: Problem,
        #[case] sense: Sense,
        #[case] value: f64,
        #[case] expected: bool,
    ) {
        // x compared with 3
        let x = problem.find_variable("x").unwrap();
        let constraint = Constraint::new("c", x, 3.0, sense);
        let solution = Solution::from_values([(x, value)]);
        assert_eq!(constraint.is_satisfied(&solution, 1e-9), expected);
    }

    #[rstest]
    fn test_find_by_name(mut problem: Problem) {
        let x = problem.find_variable("x").unwrap();
        assert_eq!(problem.variable(x).kind, VariableKind::Continuous);
        assert!(problem.find_variable("z").is_none());

        problem.add_optional_constraint(None);
        problem.add_optional_constraint(Some(Constraint::at_most("cap", x, 10.0)));
        assert_eq!(problem.num_constraints(), 1);
        assert_eq!(problem.find_constraint("cap").unwrap().sense, Sense::AtMost);
    }

    #[rstest]
    fn test_disabled_variable() {
        let mut problem = Problem::new();
        let var = problem.add_variable("v", VariableKind::Continuous, 0.0..=0.0);
        assert!(problem.variable(var).is_disabled());
    }

    #[test]
    #[should_panic]
    fn test_binary_bounds_checked() {
        Problem::new().add_variable("b", VariableKind::Binary, 0.0..=2.0);
    }
}
