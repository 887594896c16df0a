//! Loop shifting.
//!
//! Moves every iteration of one nest by a constant (possibly symbolic)
//! extent: `x_d -> x_d + e_d`. All other nests pass through unchanged.

use super::{loops_const, nest_dimensions, set_alias, Transform};
use crate::ir::Tuple;
use crate::schedule::{iscc, Schedule};
use crate::subspace::SubspaceId;
use crate::utils::errors::{DimensionError, DimensionErrorKind, ScheduleResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shift {
    loop_id: usize,
    extents: Vec<String>,
    symbols: Vec<String>,
}

impl Shift {
    /// Shift `loop_id` by one expression per dimension.
    pub fn new(loop_id: usize, extents: Vec<String>) -> Self {
        Self::with_symbols(loop_id, extents, Vec::new())
    }

    /// Like [`Shift::new`], declaring the symbols used in the extents.
    pub fn with_symbols(loop_id: usize, extents: Vec<String>, symbols: Vec<String>) -> Self {
        Self {
            loop_id,
            extents,
            symbols,
        }
    }

    /// Shift a one-dimensional loop.
    pub fn single(loop_id: usize, extent: impl Into<String>) -> Self {
        Self::new(loop_id, vec![extent.into()])
    }

    /// Shift by an integer tuple.
    pub fn from_tuple(loop_id: usize, extent: &Tuple) -> Self {
        Self::new(loop_id, extent.to_extents())
    }

    pub fn loop_id(&self) -> usize {
        self.loop_id
    }

    pub fn extents(&self) -> &[String] {
        &self.extents
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }
}

impl Transform for Shift {
    fn apply_to(
        &self,
        schedule: &mut Schedule,
        subspace: SubspaceId,
    ) -> ScheduleResult<Vec<String>> {
        let nest_dims = nest_dimensions(schedule, self.loop_id, self.name())?;
        let manager = schedule.subspace_manager();
        let target = manager.checked(subspace).map_err(|e| e.in_transform(self.name()))?;

        let expected = if subspace == manager.nest() {
            nest_dims
        } else {
            target.size()
        };
        if self.extents.len() != expected || self.extents.len() > target.size() {
            return Err(DimensionError::new(
                DimensionErrorKind::ExtentMismatch,
                format!(
                    "Dimensionality of extent of shift on loop {} is not equal ({}) \
                     to the dimensionality of the loop ({})",
                    self.loop_id,
                    self.extents.len(),
                    expected
                ),
            )
            .into());
        }

        let loops_c = loops_const(schedule);
        set_alias(schedule, subspace, true)?;
        let manager = schedule.subspace_manager();
        let target = manager.checked(subspace)?;

        let mut shifted = vec![format!("{} = {}", loops_c, self.loop_id)];
        for (i, (out, base)) in target
            .names(true)
            .into_iter()
            .zip(target.names(false))
            .enumerate()
        {
            match self.extents.get(i) {
                Some(e) => shifted.push(format!("{} = {}+({})", out, base, e)),
                None => shifted.push(format!("{} = {}", out, base)),
            }
        }
        let shifted = iscc::map_clause(
            &manager.input_iterators(),
            &manager.output_iterators(),
            &shifted,
        );

        set_alias(schedule, subspace, false)?;
        let manager = schedule.subspace_manager();
        let untouched = iscc::map_clause(
            &manager.input_iterators(),
            &manager.output_iterators(),
            &[format!("{} != {}", loops_c, self.loop_id)],
        );

        Ok(vec![iscc::union_map(&self.symbols, &[shifted, untouched])])
    }

    fn name(&self) -> &str {
        "shift"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::test_support::schedule;
    use crate::utils::errors::ScheduleError;

    #[test]
    fn test_shift_fragment() {
        let mut s = schedule(2, 1);
        s.apply(&Shift::single(1, "2").into()).unwrap();
        assert_eq!(s.transformations().len(), 2);
        assert_eq!(
            s.transformations()[1],
            "{ [loops_c,i_0,i_c] -> [loops_c,alias_i_0,alias_i_c] : loops_c = 1 and alias_i_0 = i_0+(2) and alias_i_c = i_c; \
             [loops_c,i_0,i_c] -> [loops_c,i_0,i_c] : loops_c != 1 }"
        );
    }

    #[test]
    fn test_symbolic_shift() {
        let mut s = schedule(1, 2);
        let shift = Shift::with_symbols(0, vec!["N".to_string(), "-1".to_string()], vec!["N".to_string()]);
        s.apply(&shift.into()).unwrap();
        let m = &s.transformations()[1];
        assert!(m.starts_with("[N] -> { "));
        assert!(m.contains("alias_i_0 = i_0+(N)"));
        assert!(m.contains("alias_i_1 = i_1+(-1)"));
    }

    #[test]
    fn test_narrow_nest_passes_extra_dims_through() {
        let chain = vec![
            crate::ir::LoopNest::new(crate::ir::RectangularDomain::single("0", "9").unwrap()),
            crate::ir::LoopNest::new(
                crate::ir::RectangularDomain::new([("0", "9"), ("0", "9")], Vec::<String>::new()).unwrap(),
            ),
        ]
        .into_iter()
        .collect();
        let mut s = Schedule::new(chain);
        s.apply(&Shift::from_tuple(0, &Tuple::new(vec![3])).into()).unwrap();
        let m = &s.transformations()[1];
        assert!(m.contains("alias_i_0 = i_0+(3) and alias_i_1 = i_1 and alias_i_c = i_c"));
    }

    #[test]
    fn test_extent_mismatch() {
        let mut s = schedule(1, 2);
        let err = s.apply(&Shift::single(0, "1").into()).unwrap_err();
        assert!(matches!(err, ScheduleError::Dimension(ref e) if e.kind == DimensionErrorKind::ExtentMismatch));
        assert_eq!(s.transformations().len(), 1);
    }

    #[test]
    fn test_unknown_loop() {
        let mut s = schedule(1, 1);
        let err = s.apply(&Shift::single(3, "1").into()).unwrap_err();
        assert!(matches!(err, ScheduleError::Config(_)));
        assert!(err.to_string().contains("in shift"));
    }
}
