//! Dependence-driven shifting that makes a fusion of the whole chain legal.
//!
//! For every pair of nests `p < n` touching the same array, the write-write,
//! write-read and read-write offset differences `a_n - a_p` bound how far
//! nest `n` must run behind nest `p`. The largest difference per dimension
//! becomes `shift_n[d] - shift_p[d] = max`, and the ILP picks the smallest
//! non-negative shifts satisfying all of them.

use super::{Shift, Transform};
use crate::ilp::{BranchAndBound, Direction, IlpProblem, IlpSolver, LinearExpr, Relation, VarId};
use crate::ir::{Dataspace, LoopChain, Tuple, TupleCollection};
use crate::schedule::Schedule;
use crate::subspace::SubspaceId;
use crate::utils::errors::{DimensionError, DimensionErrorKind, ScheduleResult, SolverError};
use log::{debug, info, trace};
use std::collections::BTreeMap;

/// Largest `later - earlier` per dimension over every pair of offsets.
fn max_difference(
    later: &TupleCollection,
    earlier: &TupleCollection,
) -> Result<Option<Tuple>, DimensionError> {
    match (later.max_on_dims(), earlier.min_on_dims()) {
        (Some(hi), Some(lo)) => hi.checked_sub(&lo).map(Some),
        _ => Ok(None),
    }
}

#[track_caller]
fn check_width(dataspace: &Dataspace, loop_id: usize, dims: usize) -> Result<(), DimensionError> {
    if dataspace.dimensions() != dims {
        return Err(DimensionError::new(
            DimensionErrorKind::DataspaceMismatch,
            format!(
                "Dataspace {} of loop {} has {} dimensions, the loop has {}",
                dataspace.name(),
                loop_id,
                dataspace.dimensions(),
                dims
            ),
        ));
    }
    Ok(())
}

/// Tightest difference per `(earlier, later, dimension)`.
fn dependence_distances(
    chain: &LoopChain,
) -> Result<BTreeMap<(usize, usize, usize), i64>, DimensionError> {
    let mut distances: BTreeMap<(usize, usize, usize), i64> = BTreeMap::new();
    for (p, earlier) in chain.iter().enumerate() {
        for (n, later) in chain.iter().enumerate().skip(p + 1) {
            for dp in earlier.dataspaces() {
                let dn = match later.dataspace(dp.name()) {
                    Some(d) => d,
                    None => continue,
                };
                check_width(dp, p, earlier.dimensions())?;
                check_width(dn, n, later.dimensions())?;

                let pairs = [
                    (dn.writes(), dp.writes()),
                    (dn.reads(), dp.writes()),
                    (dn.writes(), dp.reads()),
                ];
                for (a_n, a_p) in pairs {
                    let diff = match max_difference(a_n, a_p)? {
                        Some(d) => d,
                        None => continue,
                    };
                    trace!("{} between loops {} and {}: {}", dp.name(), p, n, diff);
                    for (dim, &d) in diff.iter().enumerate() {
                        distances
                            .entry((p, n, dim))
                            .and_modify(|m| *m = (*m).max(d))
                            .or_insert(d);
                    }
                }
            }
        }
    }
    Ok(distances)
}

/// Minimal shift per nest making a fusion of the whole chain legal.
///
/// Zero tuples are left out unless `include_zero` is set.
pub fn compute_shift_tuples_for_fusion(
    chain: &LoopChain,
    include_zero: bool,
    solver: &dyn IlpSolver,
) -> ScheduleResult<BTreeMap<usize, Tuple>> {
    let distances = dependence_distances(chain)?;

    let mut problem = IlpProblem::new(Direction::Minimize);
    let variables: Vec<Vec<VarId>> = chain
        .iter()
        .enumerate()
        .map(|(k, nest)| {
            (0..nest.dimensions())
                .map(|d| problem.add_variable(format!("shift_{}_{}", k, d), Some(0), None))
                .collect()
        })
        .collect();
    problem.set_objective(LinearExpr::from_terms(
        variables.iter().flatten().map(|&v| (v, 1)),
    ));
    for (&(p, n, dim), &distance) in &distances {
        let expr = LinearExpr::new()
            .with_term(variables[n][dim], 1)
            .with_term(variables[p][dim], -1);
        problem.add_constraint(expr, Relation::Eq, distance);
    }

    let mut shifts = BTreeMap::new();
    if problem.num_constraints() == 0 {
        debug!("no dependences between loops, nothing to shift");
        if include_zero {
            for (k, nest) in chain.iter().enumerate() {
                shifts.insert(k, Tuple::zeros(nest.dimensions()));
            }
        }
        return Ok(shifts);
    }

    debug!("automatic shift model:\n{}", problem);
    let solution = solver.solve(&problem);
    if !solution.is_optimal() {
        return Err(SolverError::new(
            solution.status(),
            format!("{} could not find the shifts for fusion", solver.name()),
        )
        .into());
    }

    for (k, vars) in variables.iter().enumerate() {
        let values = vars
            .iter()
            .map(|&v| {
                solution.int_value(v).ok_or_else(|| {
                    SolverError::new(
                        solution.status(),
                        format!("shift of loop {} is not integral", k),
                    )
                })
            })
            .collect::<Result<Vec<i64>, _>>()?;
        let tuple = Tuple::new(values);
        if include_zero || !tuple.is_zero() {
            shifts.insert(k, tuple);
        }
    }
    info!(
        "automatic shift: {}",
        shifts
            .iter()
            .map(|(k, t)| format!("loop {} by {}", k, t))
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(shifts)
}

/// One [`Shift`] per nest with a shift tuple, in nest order.
pub fn compute_shifts_for_fusion(
    chain: &LoopChain,
    include_zero: bool,
    solver: &dyn IlpSolver,
) -> ScheduleResult<Vec<Shift>> {
    Ok(compute_shift_tuples_for_fusion(chain, include_zero, solver)?
        .iter()
        .map(|(&k, t)| Shift::from_tuple(k, t))
        .collect())
}

/// Shifts every nest by its minimal legal fusion shift.
#[derive(Debug, Clone, Default)]
pub struct AutomaticShift {
    include_zero: bool,
    solver: BranchAndBound,
}

impl AutomaticShift {
    pub fn new(include_zero: bool) -> Self {
        Self {
            include_zero,
            solver: BranchAndBound::default(),
        }
    }

    pub fn with_solver(mut self, solver: BranchAndBound) -> Self {
        self.solver = solver;
        self
    }

    pub fn include_zero(&self) -> bool {
        self.include_zero
    }

    pub fn solver(&self) -> &BranchAndBound {
        &self.solver
    }
}

impl Transform for AutomaticShift {
    fn apply_to(
        &self,
        schedule: &mut Schedule,
        subspace: SubspaceId,
    ) -> ScheduleResult<Vec<String>> {
        let shifts = compute_shifts_for_fusion(schedule.chain(), self.include_zero, &self.solver)?;
        let mut fragments = Vec::with_capacity(shifts.len());
        for shift in &shifts {
            fragments.extend(shift.apply_to(schedule, subspace)?);
        }
        Ok(fragments)
    }

    fn name(&self) -> &str {
        "automatic_shift"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ilp::SolveStatus;
    use crate::ir::{LoopNest, RectangularDomain};
    use crate::utils::errors::ScheduleError;

    fn offsets(values: &[i64]) -> TupleCollection {
        TupleCollection::new(values.iter().map(|&v| Tuple::new(vec![v]))).unwrap()
    }

    fn nest(dataspaces: Vec<Dataspace>) -> LoopNest {
        LoopNest::with_dataspaces(RectangularDomain::single("1", "N").unwrap(), dataspaces)
    }

    fn jacobi() -> LoopChain {
        vec![
            nest(vec![
                Dataspace::new("A", offsets(&[-1, 0, 1]), TupleCollection::empty(1).unwrap()).unwrap(),
                Dataspace::new("B", TupleCollection::empty(1).unwrap(), offsets(&[0])).unwrap(),
            ]),
            nest(vec![
                Dataspace::new("B", offsets(&[-1, 0, 1]), TupleCollection::empty(1).unwrap()).unwrap(),
                Dataspace::new("A", TupleCollection::empty(1).unwrap(), offsets(&[0])).unwrap(),
            ]),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_jacobi_shifts() {
        let shifts = compute_shift_tuples_for_fusion(&jacobi(), true, &BranchAndBound::default())
            .unwrap();
        assert_eq!(shifts.len(), 2);
        assert_eq!(shifts[&0], Tuple::new(vec![0]));
        assert_eq!(shifts[&1], Tuple::new(vec![1]));
    }

    #[test]
    fn test_extreme_offsets_overflow_to_error() {
        let none = || TupleCollection::empty(1).unwrap();
        let chain: LoopChain = vec![
            nest(vec![Dataspace::new("A", none(), offsets(&[i64::MIN])).unwrap()]),
            nest(vec![Dataspace::new("A", offsets(&[i64::MAX]), none()).unwrap()]),
        ]
        .into_iter()
        .collect();
        let err = compute_shift_tuples_for_fusion(&chain, true, &BranchAndBound::default())
            .unwrap_err();
        assert!(matches!(err, ScheduleError::Dimension(ref e) if e.kind == DimensionErrorKind::Overflow));
    }

    #[test]
    fn test_zero_shifts_are_omitted() {
        let shifts = compute_shift_tuples_for_fusion(&jacobi(), false, &BranchAndBound::default())
            .unwrap();
        assert_eq!(shifts.keys().copied().collect::<Vec<_>>(), vec![1]);
        let transforms = compute_shifts_for_fusion(&jacobi(), false, &BranchAndBound::default())
            .unwrap();
        assert_eq!(transforms.len(), 1);
        assert_eq!(transforms[0].loop_id(), 1);
        assert_eq!(transforms[0].extents(), &["1".to_string()]);
    }

    #[test]
    fn test_independent_nests_skip_the_solver() {
        let chain: LoopChain = vec![
            nest(vec![Dataspace::new("A", offsets(&[0]), offsets(&[0])).unwrap()]),
            nest(vec![Dataspace::new("B", offsets(&[1]), offsets(&[0])).unwrap()]),
        ]
        .into_iter()
        .collect();
        // a zero node limit would fail any solve
        let shifts = compute_shift_tuples_for_fusion(&chain, true, &BranchAndBound::new(0))
            .unwrap();
        assert_eq!(shifts[&0], Tuple::zeros(1));
        assert_eq!(shifts[&1], Tuple::zeros(1));
        assert!(compute_shift_tuples_for_fusion(&chain, false, &BranchAndBound::new(0))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_read_read_carries_no_dependence() {
        let chain: LoopChain = vec![
            nest(vec![Dataspace::new("A", offsets(&[-5]), TupleCollection::empty(1).unwrap()).unwrap()]),
            nest(vec![Dataspace::new("A", offsets(&[5]), TupleCollection::empty(1).unwrap()).unwrap()]),
        ]
        .into_iter()
        .collect();
        assert!(dependence_distances(&chain).unwrap().is_empty());
    }

    #[test]
    fn test_backward_dependence_shifts_earlier_loop() {
        // loop 1 overwrites what loop 0 read two iterations ahead of it
        let chain: LoopChain = vec![
            nest(vec![Dataspace::new("A", offsets(&[0]), TupleCollection::empty(1).unwrap()).unwrap()]),
            nest(vec![Dataspace::new("A", TupleCollection::empty(1).unwrap(), offsets(&[-2])).unwrap()]),
        ]
        .into_iter()
        .collect();
        let shifts = compute_shift_tuples_for_fusion(&chain, true, &BranchAndBound::default())
            .unwrap();
        assert_eq!(shifts[&0], Tuple::new(vec![2]));
        assert_eq!(shifts[&1], Tuple::new(vec![0]));
    }

    #[test]
    fn test_solver_failure_carries_status() {
        let err = compute_shift_tuples_for_fusion(&jacobi(), true, &BranchAndBound::new(0))
            .unwrap_err();
        match err {
            ScheduleError::Solver(e) => assert_eq!(e.status, SolveStatus::NotSolved),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_dataspace_width_must_match_loop() {
        let wide = TupleCollection::new(vec![Tuple::new(vec![0, 0])]).unwrap();
        let chain: LoopChain = vec![
            nest(vec![Dataspace::new("A", wide.clone(), wide.clone()).unwrap()]),
            nest(vec![Dataspace::new("A", wide.clone(), wide).unwrap()]),
        ]
        .into_iter()
        .collect();
        let err = compute_shift_tuples_for_fusion(&chain, true, &BranchAndBound::default())
            .unwrap_err();
        assert!(matches!(err, ScheduleError::Dimension(ref e) if e.kind == DimensionErrorKind::DataspaceMismatch));
    }

    #[test]
    fn test_apply_emits_one_shift_per_loop() {
        let mut s = Schedule::new(jacobi());
        s.apply(&AutomaticShift::default().into()).unwrap();
        assert_eq!(s.transformations().len(), 2);
        assert!(s.transformations()[1].contains("loops_c = 1 and alias_i_0 = i_0+(1)"));

        let mut s = Schedule::new(jacobi());
        s.apply(&AutomaticShift::new(true).into()).unwrap();
        assert_eq!(s.transformations().len(), 3);
    }
}
