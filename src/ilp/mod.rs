//! Integer linear programming
//!
//! A small modelling layer (variables with optional bounds, linear
//! constraints, a linear objective) and a solver seam. Automatic shifting
//! builds an [`IlpProblem`] and hands it to any [`IlpSolver`]; the default
//! solver is [`BranchAndBound`], an exact branch-and-bound search over a
//! rational simplex relaxation.
//!
//! # Example
//!
//! ```
//! use loopchain::ilp::{BranchAndBound, Direction, IlpProblem, IlpSolver, LinearExpr, Relation, SolveStatus};
//!
//! let mut problem = IlpProblem::new(Direction::Minimize);
//! let x = problem.add_variable("x", Some(0), None);
//! let y = problem.add_variable("y", Some(0), None);
//! problem.add_constraint(LinearExpr::new().with_term(y, 1).with_term(x, -1), Relation::Eq, 2);
//! problem.set_objective(LinearExpr::new().with_term(x, 1).with_term(y, 1));
//!
//! let solution = BranchAndBound::default().solve(&problem);
//! assert_eq!(solution.status(), SolveStatus::Optimal);
//! assert_eq!(solution.int_value(y), Some(2));
//! ```

mod branch;
mod simplex;

pub use branch::BranchAndBound;

use num_rational::Rational64;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Handle to a variable of one [`IlpProblem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarId(usize);

impl VarId {
    /// Position of the variable in its problem.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Optimization direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Minimize,
    Maximize,
}

/// Constraint relation between an expression and its right-hand side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Relation {
    LessEq,
    Eq,
    GreaterEq,
}

impl Relation {
    /// The relation obtained by multiplying both sides by -1.
    pub fn flipped(self) -> Self {
        match self {
            Relation::LessEq => Relation::GreaterEq,
            Relation::Eq => Relation::Eq,
            Relation::GreaterEq => Relation::LessEq,
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Relation::LessEq => write!(f, "<="),
            Relation::Eq => write!(f, "="),
            Relation::GreaterEq => write!(f, ">="),
        }
    }
}

/// Outcome of a solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolveStatus {
    /// Proven optimal
    Optimal,
    /// Integral solution found, optimality not proven
    Feasible,
    /// No integral point satisfies the constraints
    Infeasible,
    /// Objective is unbounded in the optimization direction
    Unbounded,
    /// Numerical failure inside the solver
    Abnormal,
    /// The problem itself is malformed
    ModelInvalid,
    /// The solver stopped before finding any solution
    NotSolved,
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SolveStatus::Optimal => "optimal",
            SolveStatus::Feasible => "feasible",
            SolveStatus::Infeasible => "infeasible",
            SolveStatus::Unbounded => "unbounded",
            SolveStatus::Abnormal => "abnormal",
            SolveStatus::ModelInvalid => "model invalid",
            SolveStatus::NotSolved => "not solved",
        };
        write!(f, "{}", s)
    }
}

/// A linear combination of variables with integer coefficients plus a constant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinearExpr {
    terms: BTreeMap<VarId, i64>,
    constant: i64,
}

impl LinearExpr {
    /// The zero expression.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(variable, coefficient)` pairs; repeated variables accumulate.
    pub fn from_terms(terms: impl IntoIterator<Item = (VarId, i64)>) -> Self {
        terms
            .into_iter()
            .fold(Self::new(), |expr, (var, coef)| expr.with_term(var, coef))
    }

    /// Add `coef * var`.
    pub fn with_term(mut self, var: VarId, coef: i64) -> Self {
        self.add_term(var, coef);
        self
    }

    /// Add a constant offset.
    pub fn with_constant(mut self, constant: i64) -> Self {
        self.constant += constant;
        self
    }

    /// Add `coef * var` in place.
    pub fn add_term(&mut self, var: VarId, coef: i64) {
        let entry = self.terms.entry(var).or_insert(0);
        *entry += coef;
        if *entry == 0 {
            self.terms.remove(&var);
        }
    }

    /// Non-zero terms in variable order.
    pub fn terms(&self) -> impl Iterator<Item = (VarId, i64)> + '_ {
        self.terms.iter().map(|(&v, &c)| (v, c))
    }

    /// Constant offset.
    pub fn constant(&self) -> i64 {
        self.constant
    }

    /// Coefficient of `var`, zero when absent.
    pub fn coefficient(&self, var: VarId) -> i64 {
        self.terms.get(&var).copied().unwrap_or(0)
    }
}

/// A decision variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    pub lower: Option<i64>,
    pub upper: Option<i64>,
    pub integer: bool,
}

/// `expr relation rhs`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    pub expr: LinearExpr,
    pub relation: Relation,
    pub rhs: i64,
}

/// A mixed-integer linear program.
#[derive(Debug, Clone)]
pub struct IlpProblem {
    direction: Direction,
    variables: Vec<Variable>,
    constraints: Vec<Constraint>,
    objective: LinearExpr,
}

impl IlpProblem {
    /// Create an empty problem.
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            variables: Vec::new(),
            constraints: Vec::new(),
            objective: LinearExpr::new(),
        }
    }

    /// Add an integer variable with optional bounds.
    pub fn add_variable(
        &mut self,
        name: impl Into<String>,
        lower: Option<i64>,
        upper: Option<i64>,
    ) -> VarId {
        self.push_variable(name.into(), lower, upper, true)
    }

    /// Add a continuous variable with optional bounds.
    pub fn add_continuous_variable(
        &mut self,
        name: impl Into<String>,
        lower: Option<i64>,
        upper: Option<i64>,
    ) -> VarId {
        self.push_variable(name.into(), lower, upper, false)
    }

    fn push_variable(
        &mut self,
        name: String,
        lower: Option<i64>,
        upper: Option<i64>,
        integer: bool,
    ) -> VarId {
        self.variables.push(Variable {
            name,
            lower,
            upper,
            integer,
        });
        VarId(self.variables.len() - 1)
    }

    /// Add `expr relation rhs`.
    pub fn add_constraint(&mut self, expr: LinearExpr, relation: Relation, rhs: i64) {
        self.constraints.push(Constraint { expr, relation, rhs });
    }

    /// Replace the objective.
    pub fn set_objective(&mut self, objective: LinearExpr) {
        self.objective = objective;
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn objective(&self) -> &LinearExpr {
        &self.objective
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn variable(&self, id: VarId) -> Option<&Variable> {
        self.variables.get(id.0)
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Check that bounds do not cross and every referenced variable exists.
    pub fn validate(&self) -> Result<(), String> {
        for var in &self.variables {
            if let (Some(lo), Some(up)) = (var.lower, var.upper) {
                if lo > up {
                    return Err(format!(
                        "variable {} has lower bound {} above upper bound {}",
                        var.name, lo, up
                    ));
                }
            }
        }
        let known = |expr: &LinearExpr| expr.terms().all(|(v, _)| v.0 < self.variables.len());
        if !known(&self.objective) {
            return Err("objective references an unknown variable".to_string());
        }
        for (i, c) in self.constraints.iter().enumerate() {
            if !known(&c.expr) {
                return Err(format!("constraint {} references an unknown variable", i));
            }
        }
        Ok(())
    }
}

impl fmt::Display for IlpProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let render = |expr: &LinearExpr| {
            let mut parts: Vec<String> = expr
                .terms()
                .map(|(v, c)| format!("{}*{}", c, self.variables[v.0].name))
                .collect();
            if expr.constant() != 0 || parts.is_empty() {
                parts.push(expr.constant().to_string());
            }
            parts.join(" + ")
        };
        let dir = match self.direction {
            Direction::Minimize => "minimize",
            Direction::Maximize => "maximize",
        };
        writeln!(f, "{} {}", dir, render(&self.objective))?;
        for c in &self.constraints {
            writeln!(f, "  {} {} {}", render(&c.expr), c.relation, c.rhs)?;
        }
        for v in &self.variables {
            let lo = v.lower.map_or("-inf".to_string(), |l| l.to_string());
            let up = v.upper.map_or("+inf".to_string(), |u| u.to_string());
            writeln!(f, "  {} <= {} <= {}", lo, v.name, up)?;
        }
        Ok(())
    }
}

/// Result of a solve: a status and, for `Optimal`/`Feasible`, an assignment.
#[derive(Debug, Clone)]
pub struct Solution {
    status: SolveStatus,
    objective: Option<Rational64>,
    values: Vec<Rational64>,
}

impl Solution {
    pub(crate) fn with_status(status: SolveStatus) -> Self {
        Self {
            status,
            objective: None,
            values: Vec::new(),
        }
    }

    pub(crate) fn with_values(
        status: SolveStatus,
        objective: Rational64,
        values: Vec<Rational64>,
    ) -> Self {
        Self {
            status,
            objective: Some(objective),
            values,
        }
    }

    pub fn status(&self) -> SolveStatus {
        self.status
    }

    /// True when the status is `Optimal`.
    pub fn is_optimal(&self) -> bool {
        self.status == SolveStatus::Optimal
    }

    /// Objective value of the returned assignment.
    pub fn objective(&self) -> Option<Rational64> {
        self.objective
    }

    /// Value of `var` in the returned assignment.
    pub fn value(&self, var: VarId) -> Option<Rational64> {
        self.values.get(var.0).copied()
    }

    /// Value of `var` when it is integral.
    pub fn int_value(&self, var: VarId) -> Option<i64> {
        self.value(var).filter(|v| v.is_integer()).map(|v| v.to_integer())
    }
}

/// A solver for [`IlpProblem`].
pub trait IlpSolver {
    /// Solve the problem. Solver failures are reported through the status.
    fn solve(&self, problem: &IlpProblem) -> Solution;

    /// Name used in log output.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_expr_accumulates() {
        let mut p = IlpProblem::new(Direction::Minimize);
        let x = p.add_variable("x", Some(0), None);
        let e = LinearExpr::from_terms([(x, 2), (x, 3)]);
        assert_eq!(e.coefficient(x), 5);
        let cancelled = e.with_term(x, -5);
        assert_eq!(cancelled.terms().count(), 0);
    }

    #[test]
    fn test_validate_crossing_bounds() {
        let mut p = IlpProblem::new(Direction::Minimize);
        p.add_variable("x", Some(3), Some(1));
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_validate_unknown_variable() {
        let mut p = IlpProblem::new(Direction::Minimize);
        p.add_variable("x", Some(0), None);
        p.add_constraint(LinearExpr::new().with_term(VarId(4), 1), Relation::LessEq, 1);
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(SolveStatus::Infeasible.to_string(), "infeasible");
        assert_eq!(SolveStatus::NotSolved.to_string(), "not solved");
    }

    #[test]
    fn test_problem_display() {
        let mut p = IlpProblem::new(Direction::Minimize);
        let x = p.add_variable("x", Some(0), None);
        p.add_constraint(LinearExpr::new().with_term(x, 1), Relation::GreaterEq, 2);
        p.set_objective(LinearExpr::new().with_term(x, 1));
        let s = p.to_string();
        assert!(s.starts_with("minimize 1*x"));
        assert!(s.contains("1*x >= 2"));
        assert!(s.contains("0 <= x <= +inf"));
    }
}
