//! Depth-first branch and bound over the simplex relaxation.

use super::simplex::{self, LpOutcome, Overflow, Row};
use super::{Direction, IlpProblem, IlpSolver, Relation, Solution, SolveStatus};
use log::{debug, trace};
use num_integer::Integer;
use num_rational::Rational64;
use num_traits::Zero;

/// Exact branch-and-bound solver.
#[derive(Debug, Clone)]
pub struct BranchAndBound {
    /// Maximum number of relaxations solved before giving up
    pub node_limit: usize,
}

impl Default for BranchAndBound {
    fn default() -> Self {
        Self { node_limit: 10_000 }
    }
}

impl BranchAndBound {
    pub fn new(node_limit: usize) -> Self {
        Self { node_limit }
    }
}

#[derive(Debug, Clone, Copy)]
struct Bounds {
    lower: Option<i64>,
    upper: Option<i64>,
}

/// How one model variable maps onto non-negative LP columns.
#[derive(Debug, Clone, Copy)]
enum Column {
    /// x = lower + y
    Shifted { col: usize, lower: i64 },
    /// x = upper - y
    Mirrored { col: usize, upper: i64 },
    /// x = y+ - y-
    Split { pos: usize, neg: usize },
}

enum Relaxation {
    Optimal {
        objective: Rational64,
        values: Vec<Rational64>,
    },
    Infeasible,
    Unbounded,
}

fn r(n: i64) -> Rational64 {
    Rational64::from_integer(n)
}

/// Solve the LP relaxation of `problem` under `bounds`, in minimization form.
fn relax(problem: &IlpProblem, bounds: &[Bounds]) -> Result<Relaxation, Overflow> {
    if bounds
        .iter()
        .any(|b| matches!((b.lower, b.upper), (Some(l), Some(u)) if l > u))
    {
        return Ok(Relaxation::Infeasible);
    }

    let mut columns = Vec::with_capacity(bounds.len());
    let mut width = 0;
    for b in bounds {
        let column = match (b.lower, b.upper) {
            (Some(lower), _) => {
                width += 1;
                Column::Shifted { col: width - 1, lower }
            }
            (None, Some(upper)) => {
                width += 1;
                Column::Mirrored { col: width - 1, upper }
            }
            (None, None) => {
                width += 2;
                Column::Split {
                    pos: width - 2,
                    neg: width - 1,
                }
            }
        };
        columns.push(column);
    }

    // Substitute x = f(y) into `coef * x`, accumulating into `coeffs` and
    // returning the constant part.
    let substitute =
        |coeffs: &mut [Rational64], var: usize, coef: i64| -> Result<Rational64, Overflow> {
            let c = r(coef);
            Ok(match columns[var] {
                Column::Shifted { col, lower } => {
                    coeffs[col] = simplex::add(&coeffs[col], &c)?;
                    simplex::mul(&c, &r(lower))?
                }
                Column::Mirrored { col, upper } => {
                    coeffs[col] = simplex::sub(&coeffs[col], &c)?;
                    simplex::mul(&c, &r(upper))?
                }
                Column::Split { pos, neg } => {
                    coeffs[pos] = simplex::add(&coeffs[pos], &c)?;
                    coeffs[neg] = simplex::sub(&coeffs[neg], &c)?;
                    Rational64::zero()
                }
            })
        };

    let sign = match problem.direction() {
        Direction::Minimize => 1,
        Direction::Maximize => -1,
    };
    let mut cost = vec![Rational64::zero(); width];
    let signed = |v: i64| v.checked_mul(sign).ok_or(Overflow);
    let mut cost_offset = r(signed(problem.objective().constant())?);
    for (var, coef) in problem.objective().terms() {
        let k = substitute(&mut cost, var.index(), signed(coef)?)?;
        cost_offset = simplex::add(&cost_offset, &k)?;
    }

    let mut rows = Vec::with_capacity(problem.num_constraints() + bounds.len());
    for c in problem.constraints() {
        let mut coeffs = vec![Rational64::zero(); width];
        let mut rhs = simplex::sub(&r(c.rhs), &r(c.expr.constant()))?;
        for (var, coef) in c.expr.terms() {
            let k = substitute(&mut coeffs, var.index(), coef)?;
            rhs = simplex::sub(&rhs, &k)?;
        }
        rows.push(Row {
            coeffs,
            relation: c.relation,
            rhs,
        });
    }
    for (b, column) in bounds.iter().zip(&columns) {
        if let (Column::Shifted { col, lower }, Some(upper)) = (column, b.upper) {
            let mut coeffs = vec![Rational64::zero(); width];
            coeffs[*col] = r(1);
            rows.push(Row {
                coeffs,
                relation: Relation::LessEq,
                rhs: simplex::sub(&r(upper), &r(*lower))?,
            });
        }
    }

    Ok(match simplex::minimize(&cost, &rows)? {
        LpOutcome::Infeasible => Relaxation::Infeasible,
        LpOutcome::Unbounded => Relaxation::Unbounded,
        LpOutcome::Optimal { objective, values: y } => {
            let mut values = Vec::with_capacity(columns.len());
            for column in &columns {
                values.push(match *column {
                    Column::Shifted { col, lower } => simplex::add(&r(lower), &y[col])?,
                    Column::Mirrored { col, upper } => simplex::sub(&r(upper), &y[col])?,
                    Column::Split { pos, neg } => simplex::sub(&y[pos], &y[neg])?,
                });
            }
            Relaxation::Optimal {
                objective: simplex::add(&objective, &cost_offset)?,
                values,
            }
        }
    })
}

impl BranchAndBound {
    fn search(&self, problem: &IlpProblem) -> Result<Solution, Overflow> {
        let root: Vec<Bounds> = problem
            .variables()
            .iter()
            .map(|v| Bounds {
                lower: v.lower,
                upper: v.upper,
            })
            .collect();

        let mut stack = vec![root];
        let mut incumbent: Option<(Rational64, Vec<Rational64>)> = None;
        let mut explored = 0usize;
        let mut exhausted = false;

        while let Some(bounds) = stack.pop() {
            if explored >= self.node_limit {
                exhausted = true;
                break;
            }
            explored += 1;

            let (objective, values) = match relax(problem, &bounds)? {
                Relaxation::Infeasible => continue,
                Relaxation::Unbounded => return Ok(Solution::with_status(SolveStatus::Unbounded)),
                Relaxation::Optimal { objective, values } => (objective, values),
            };
            if let Some((best, _)) = &incumbent {
                if objective >= *best {
                    continue;
                }
            }

            let fractional = problem
                .variables()
                .iter()
                .zip(&values)
                .position(|(var, value)| var.integer && !value.is_integer());
            match fractional {
                Some(i) => {
                    let value = values[i];
                    trace!("branching on {} = {}", problem.variables()[i].name, value);
                    let below = value.numer().div_floor(value.denom());
                    let mut up = bounds.clone();
                    up[i].lower = Some(below + 1);
                    let mut down = bounds;
                    down[i].upper = Some(below);
                    stack.push(up);
                    stack.push(down);
                }
                None => incumbent = Some((objective, values)),
            }
        }

        debug!("branch and bound explored {} nodes", explored);
        let sign = match problem.direction() {
            Direction::Minimize => r(1),
            Direction::Maximize => r(-1),
        };
        Ok(match incumbent {
            Some((objective, values)) => {
                let status = if exhausted {
                    SolveStatus::Feasible
                } else {
                    SolveStatus::Optimal
                };
                Solution::with_values(status, simplex::mul(&objective, &sign)?, values)
            }
            None if exhausted => Solution::with_status(SolveStatus::NotSolved),
            None => Solution::with_status(SolveStatus::Infeasible),
        })
    }
}

impl IlpSolver for BranchAndBound {
    fn solve(&self, problem: &IlpProblem) -> Solution {
        if let Err(reason) = problem.validate() {
            debug!("rejecting ILP model: {}", reason);
            return Solution::with_status(SolveStatus::ModelInvalid);
        }
        match self.search(problem) {
            Ok(solution) => solution,
            Err(Overflow) => Solution::with_status(SolveStatus::Abnormal),
        }
    }

    fn name(&self) -> &str {
        "branch-and-bound"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ilp::LinearExpr;

    #[test]
    fn test_integer_rounding() {
        // max x + y s.t. 2x + 2y <= 3
        let mut p = IlpProblem::new(Direction::Maximize);
        let x = p.add_variable("x", Some(0), None);
        let y = p.add_variable("y", Some(0), None);
        p.add_constraint(LinearExpr::from_terms([(x, 2), (y, 2)]), Relation::LessEq, 3);
        p.set_objective(LinearExpr::from_terms([(x, 1), (y, 1)]));

        let s = BranchAndBound::default().solve(&p);
        assert_eq!(s.status(), SolveStatus::Optimal);
        assert_eq!(s.objective(), Some(r(1)));
    }

    #[test]
    fn test_knapsack() {
        // max 5x + 4y s.t. 6x + 4y <= 24, x + 2y <= 6
        let mut p = IlpProblem::new(Direction::Maximize);
        let x = p.add_variable("x", Some(0), None);
        let y = p.add_variable("y", Some(0), None);
        p.add_constraint(LinearExpr::from_terms([(x, 6), (y, 4)]), Relation::LessEq, 24);
        p.add_constraint(LinearExpr::from_terms([(x, 1), (y, 2)]), Relation::LessEq, 6);
        p.set_objective(LinearExpr::from_terms([(x, 5), (y, 4)]));

        let s = BranchAndBound::default().solve(&p);
        assert!(s.is_optimal());
        assert_eq!(s.objective(), Some(r(20)));
        assert_eq!(s.int_value(x), Some(4));
        assert_eq!(s.int_value(y), Some(0));
    }

    #[test]
    fn test_free_and_upper_bounded_variables() {
        // min x s.t. x >= -3 with x free; max z with z <= 7 and no lower bound
        let mut p = IlpProblem::new(Direction::Minimize);
        let x = p.add_variable("x", None, None);
        p.add_constraint(LinearExpr::new().with_term(x, 1), Relation::GreaterEq, -3);
        p.set_objective(LinearExpr::new().with_term(x, 1));
        let s = BranchAndBound::default().solve(&p);
        assert_eq!(s.int_value(x), Some(-3));

        let mut q = IlpProblem::new(Direction::Maximize);
        let z = q.add_variable("z", None, Some(7));
        q.set_objective(LinearExpr::new().with_term(z, 1).with_constant(1));
        let s = BranchAndBound::default().solve(&q);
        assert_eq!(s.int_value(z), Some(7));
        assert_eq!(s.objective(), Some(r(8)));
    }

    #[test]
    fn test_bounded_range() {
        let mut p = IlpProblem::new(Direction::Maximize);
        let x = p.add_variable("x", Some(2), Some(5));
        p.set_objective(LinearExpr::new().with_term(x, 1));
        assert_eq!(BranchAndBound::default().solve(&p).int_value(x), Some(5));
    }

    #[test]
    fn test_infeasible_and_unbounded() {
        let mut p = IlpProblem::new(Direction::Minimize);
        let x = p.add_variable("x", Some(0), None);
        p.add_constraint(LinearExpr::new().with_term(x, 1), Relation::LessEq, -1);
        assert_eq!(BranchAndBound::default().solve(&p).status(), SolveStatus::Infeasible);

        let mut q = IlpProblem::new(Direction::Maximize);
        let y = q.add_variable("y", Some(0), None);
        q.set_objective(LinearExpr::new().with_term(y, 1));
        assert_eq!(BranchAndBound::default().solve(&q).status(), SolveStatus::Unbounded);
    }

    #[test]
    fn test_integer_infeasible() {
        // 2x = 1 has no integer solution
        let mut p = IlpProblem::new(Direction::Minimize);
        let x = p.add_variable("x", Some(0), None);
        p.add_constraint(LinearExpr::new().with_term(x, 2), Relation::Eq, 1);
        assert_eq!(BranchAndBound::default().solve(&p).status(), SolveStatus::Infeasible);
    }

    #[test]
    fn test_model_invalid() {
        let mut p = IlpProblem::new(Direction::Minimize);
        p.add_variable("x", Some(1), Some(0));
        assert_eq!(BranchAndBound::default().solve(&p).status(), SolveStatus::ModelInvalid);
    }

    #[test]
    fn test_node_limit() {
        let mut p = IlpProblem::new(Direction::Maximize);
        let x = p.add_variable("x", Some(0), None);
        let y = p.add_variable("y", Some(0), None);
        p.add_constraint(LinearExpr::from_terms([(x, 2), (y, 2)]), Relation::LessEq, 3);
        p.set_objective(LinearExpr::from_terms([(x, 1), (y, 1)]));
        assert_eq!(BranchAndBound::new(1).solve(&p).status(), SolveStatus::NotSolved);
        assert_eq!(BranchAndBound::new(0).solve(&p).status(), SolveStatus::NotSolved);
    }

    #[test]
    fn test_overflow_is_abnormal() {
        let mut p = IlpProblem::new(Direction::Maximize);
        let x = p.add_variable("x", Some(0), Some(i64::MAX));
        p.add_constraint(LinearExpr::new().with_term(x, 1), Relation::GreaterEq, i64::MIN + 1);
        p.set_objective(LinearExpr::new().with_term(x, i64::MAX));
        assert_eq!(BranchAndBound::default().solve(&p).status(), SolveStatus::Abnormal);
    }

    #[test]
    fn test_negating_extreme_objective_is_abnormal() {
        let mut p = IlpProblem::new(Direction::Maximize);
        let x = p.add_variable("x", Some(0), Some(1));
        p.set_objective(LinearExpr::new().with_term(x, i64::MIN));
        assert_eq!(BranchAndBound::default().solve(&p).status(), SolveStatus::Abnormal);

        let mut p = IlpProblem::new(Direction::Maximize);
        let x = p.add_variable("x", Some(0), Some(1));
        p.set_objective(LinearExpr::new().with_term(x, 1).with_constant(i64::MIN));
        assert_eq!(BranchAndBound::default().solve(&p).status(), SolveStatus::Abnormal);
    }
}
