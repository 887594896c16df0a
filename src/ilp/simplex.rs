//! Exact two-phase primal simplex over `Rational64`.
//!
//! Solves `minimize c·y subject to A y (<=|=|>=) b, y >= 0` on a dense
//! tableau. Pivots follow Bland's rule, so the method terminates on
//! degenerate problems. Every arithmetic step is checked; an overflow aborts
//! the solve with [`Overflow`].

use super::Relation;
use log::trace;
use num_rational::Rational64;
use num_traits::{CheckedAdd, CheckedDiv, CheckedMul, CheckedSub, One, Zero};

/// Rational arithmetic left the range of `i64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Overflow;

pub(crate) fn add(a: &Rational64, b: &Rational64) -> Result<Rational64, Overflow> {
    a.checked_add(b).ok_or(Overflow)
}

pub(crate) fn sub(a: &Rational64, b: &Rational64) -> Result<Rational64, Overflow> {
    a.checked_sub(b).ok_or(Overflow)
}

pub(crate) fn mul(a: &Rational64, b: &Rational64) -> Result<Rational64, Overflow> {
    a.checked_mul(b).ok_or(Overflow)
}

pub(crate) fn div(a: &Rational64, b: &Rational64) -> Result<Rational64, Overflow> {
    a.checked_div(b).ok_or(Overflow)
}

/// One row `coeffs · y relation rhs`.
#[derive(Debug, Clone)]
pub(crate) struct Row {
    pub coeffs: Vec<Rational64>,
    pub relation: Relation,
    pub rhs: Rational64,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum LpOutcome {
    Optimal {
        objective: Rational64,
        values: Vec<Rational64>,
    },
    Infeasible,
    Unbounded,
}

struct Tableau {
    rows: Vec<Vec<Rational64>>,
    basis: Vec<usize>,
    width: usize,
}

impl Tableau {
    fn rhs(&self, row: usize) -> Rational64 {
        self.rows[row][self.width]
    }

    fn pivot(&mut self, row: usize, col: usize) -> Result<(), Overflow> {
        let p = self.rows[row][col];
        for v in self.rows[row].iter_mut() {
            *v = div(v, &p)?;
        }
        let pivot_row = self.rows[row].clone();
        for (i, r) in self.rows.iter_mut().enumerate() {
            if i == row {
                continue;
            }
            let factor = r[col];
            if factor.is_zero() {
                continue;
            }
            for (v, pv) in r.iter_mut().zip(pivot_row.iter()) {
                if !pv.is_zero() {
                    *v = sub(v, &mul(&factor, pv)?)?;
                }
            }
        }
        self.basis[row] = col;
        Ok(())
    }

    fn objective(&self, cost: &[Rational64]) -> Result<Rational64, Overflow> {
        let mut total = Rational64::zero();
        for (i, &b) in self.basis.iter().enumerate() {
            total = add(&total, &mul(&cost[b], &self.rhs(i))?)?;
        }
        Ok(total)
    }

    /// Run primal simplex on `cost` restricted to columns below `allowed`.
    /// Returns false when the objective is unbounded.
    fn optimize(&mut self, cost: &[Rational64], allowed: usize) -> Result<bool, Overflow> {
        let zero = Rational64::zero();
        loop {
            let mut entering = None;
            for j in 0..allowed {
                if self.basis.contains(&j) {
                    continue;
                }
                let mut reduced = cost[j];
                for (i, &b) in self.basis.iter().enumerate() {
                    let a = self.rows[i][j];
                    if !a.is_zero() && !cost[b].is_zero() {
                        reduced = sub(&reduced, &mul(&cost[b], &a)?)?;
                    }
                }
                if reduced < zero {
                    entering = Some(j);
                    break;
                }
            }
            let col = match entering {
                Some(col) => col,
                None => return Ok(true),
            };

            let mut leaving: Option<(usize, Rational64)> = None;
            for i in 0..self.rows.len() {
                let a = self.rows[i][col];
                if a <= zero {
                    continue;
                }
                let ratio = div(&self.rhs(i), &a)?;
                let better = match leaving {
                    None => true,
                    Some((li, best)) => {
                        ratio < best || (ratio == best && self.basis[i] < self.basis[li])
                    }
                };
                if better {
                    leaving = Some((i, ratio));
                }
            }
            let row = match leaving {
                Some((row, _)) => row,
                None => return Ok(false),
            };
            trace!("simplex pivot: column {} enters, column {} leaves", col, self.basis[row]);
            self.pivot(row, col)?;
        }
    }
}

/// Minimize `cost · y` over `rows` with `y >= 0`.
pub(crate) fn minimize(cost: &[Rational64], rows: &[Row]) -> Result<LpOutcome, Overflow> {
    let n = cost.len();
    let zero = Rational64::zero();
    let one = Rational64::one();

    // Normalize to non-negative right-hand sides.
    let rows: Vec<Row> = rows
        .iter()
        .map(|r| {
            if r.rhs < zero {
                Row {
                    coeffs: r.coeffs.iter().map(|c| -c).collect(),
                    relation: r.relation.flipped(),
                    rhs: -r.rhs,
                }
            } else {
                r.clone()
            }
        })
        .collect();

    let slacks = rows.iter().filter(|r| r.relation != Relation::Eq).count();
    let artificials = rows.iter().filter(|r| r.relation != Relation::LessEq).count();
    let art_start = n + slacks;
    let width = art_start + artificials;

    let mut tableau = Tableau {
        rows: Vec::with_capacity(rows.len()),
        basis: Vec::with_capacity(rows.len()),
        width,
    };
    let mut next_slack = n;
    let mut next_art = art_start;
    for r in &rows {
        let mut line = vec![zero; width + 1];
        line[..n].copy_from_slice(&r.coeffs[..n]);
        line[width] = r.rhs;
        match r.relation {
            Relation::LessEq => {
                line[next_slack] = one;
                tableau.basis.push(next_slack);
                next_slack += 1;
            }
            Relation::GreaterEq => {
                line[next_slack] = -one;
                next_slack += 1;
                line[next_art] = one;
                tableau.basis.push(next_art);
                next_art += 1;
            }
            Relation::Eq => {
                line[next_art] = one;
                tableau.basis.push(next_art);
                next_art += 1;
            }
        }
        tableau.rows.push(line);
    }

    if artificials > 0 {
        let mut phase_one = vec![zero; width];
        for c in phase_one.iter_mut().skip(art_start) {
            *c = one;
        }
        tableau.optimize(&phase_one, width)?;
        if tableau.objective(&phase_one)? > zero {
            return Ok(LpOutcome::Infeasible);
        }
        // Drive zero-valued artificials out of the basis where possible.
        for i in 0..tableau.rows.len() {
            if tableau.basis[i] < art_start {
                continue;
            }
            if let Some(j) = (0..art_start).find(|&j| !tableau.rows[i][j].is_zero()) {
                tableau.pivot(i, j)?;
            }
        }
    }

    let mut phase_two = vec![zero; width];
    phase_two[..n].copy_from_slice(cost);
    if !tableau.optimize(&phase_two, art_start)? {
        return Ok(LpOutcome::Unbounded);
    }

    let mut values = vec![zero; n];
    for (i, &b) in tableau.basis.iter().enumerate() {
        if b < n {
            values[b] = tableau.rhs(i);
        }
    }
    Ok(LpOutcome::Optimal {
        objective: tableau.objective(&phase_two)?,
        values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(n: i64) -> Rational64 {
        Rational64::from_integer(n)
    }

    fn row(coeffs: &[i64], relation: Relation, rhs: i64) -> Row {
        Row {
            coeffs: coeffs.iter().map(|&c| r(c)).collect(),
            relation,
            rhs: r(rhs),
        }
    }

    #[test]
    fn test_simple_minimum() {
        // min x + y s.t. x + 2y >= 4, 3x + y >= 6
        let out = minimize(
            &[r(1), r(1)],
            &[row(&[1, 2], Relation::GreaterEq, 4), row(&[3, 1], Relation::GreaterEq, 6)],
        )
        .unwrap();
        match out {
            LpOutcome::Optimal { objective, values } => {
                assert_eq!(objective, Rational64::new(14, 5));
                assert_eq!(values, vec![Rational64::new(8, 5), Rational64::new(6, 5)]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_equality_rows() {
        // min y s.t. y - x = 3
        let out = minimize(&[r(0), r(1)], &[row(&[-1, 1], Relation::Eq, 3)]).unwrap();
        match out {
            LpOutcome::Optimal { objective, values } => {
                assert_eq!(objective, r(3));
                assert_eq!(values[1], r(3));
                assert_eq!(values[0], r(0));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_negative_rhs_is_normalized() {
        // min x s.t. -x <= -2
        let out = minimize(&[r(1)], &[row(&[-1], Relation::LessEq, -2)]).unwrap();
        assert!(matches!(out, LpOutcome::Optimal { objective, .. } if objective == r(2)));
    }

    #[test]
    fn test_infeasible() {
        let out = minimize(
            &[r(1)],
            &[row(&[1], Relation::LessEq, 1), row(&[1], Relation::GreaterEq, 2)],
        )
        .unwrap();
        assert_eq!(out, LpOutcome::Infeasible);
    }

    #[test]
    fn test_unbounded() {
        let out = minimize(&[r(-1)], &[row(&[1], Relation::GreaterEq, 0)]).unwrap();
        assert_eq!(out, LpOutcome::Unbounded);
    }

    #[test]
    fn test_redundant_equalities() {
        let out = minimize(
            &[r(1), r(1)],
            &[row(&[1, 1], Relation::Eq, 2), row(&[2, 2], Relation::Eq, 4)],
        )
        .unwrap();
        assert!(matches!(out, LpOutcome::Optimal { objective, .. } if objective == r(2)));
    }
}
