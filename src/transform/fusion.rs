//! Loop fusion.
//!
//! Listed loops are mapped onto one loop index (the first listed), and their
//! original index becomes the statement-ordering coordinate of the next
//! subspace. Bodies therefore run in list order within each fused iteration.

use super::{set_alias, Transform};
use crate::schedule::{iscc, Schedule};
use crate::subspace::SubspaceId;
use crate::utils::errors::{ConfigError, ConfigErrorKind, ScheduleResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fusion {
    loops: Vec<usize>,
}

impl Fusion {
    pub fn new(loops: Vec<usize>) -> Self {
        Self { loops }
    }

    /// Loop ids in fusion order.
    pub fn loops(&self) -> &[usize] {
        &self.loops
    }
}

impl Transform for Fusion {
    fn apply_to(
        &self,
        schedule: &mut Schedule,
        subspace: SubspaceId,
    ) -> ScheduleResult<Vec<String>> {
        let target_index = match self.loops.first() {
            Some(&t) => t,
            None => {
                return Err(ConfigError::new(
                    ConfigErrorKind::EmptyFusion,
                    "Must fuse one or more loops",
                )
                .in_transform(self.name())
                .into())
            }
        };
        for &id in &self.loops {
            schedule
                .chain()
                .nest_checked(id)
                .map_err(|e| e.in_transform(self.name()))?;
        }

        let manager = schedule.subspace_manager();
        manager.checked(subspace).map_err(|e| e.in_transform(self.name()))?;
        let next = manager.next_after(subspace).ok_or_else(|| {
            ConfigError::new(
                ConfigErrorKind::InvalidSubspace,
                "Given subspace is the last subspace. Cannot form fusion.",
            )
            .in_transform(self.name())
        })?;

        set_alias(schedule, subspace, true)?;
        set_alias(schedule, next, true)?;
        let manager = schedule.subspace_manager();
        let outer = manager.checked(subspace)?;
        let inner = manager.checked(next)?;
        let outer_c = outer.const_base_name();

        let identity = |names_out: Vec<String>, names_in: &[String]| -> Vec<String> {
            names_out
                .into_iter()
                .zip(names_in)
                .map(|(o, i)| format!("{} = {}", o, i))
                .collect()
        };

        let selected: Vec<String> = self
            .loops
            .iter()
            .map(|id| format!("{} = {}", outer_c, id))
            .collect();
        let mut fused = vec![
            format!("{} = {}", outer.const_name(), target_index),
            format!("{} = {}", inner.const_name(), outer_c),
            format!("({})", selected.join(" or ")),
        ];
        fused.extend(identity(outer.variable_names(), outer.variable_base_names()));
        fused.extend(identity(inner.variable_names(), inner.variable_base_names()));

        let mut rest: Vec<String> = self
            .loops
            .iter()
            .map(|id| format!("{} != {}", outer_c, id))
            .collect();
        rest.extend(identity(outer.names(true), &outer.names(false)));
        rest.extend(identity(inner.names(true), &inner.names(false)));

        let input = manager.input_iterators();
        let output = manager.output_iterators();
        let fragment = iscc::union_map::<&str>(
            &[],
            &[
                iscc::map_clause(&input, &output, &fused),
                iscc::map_clause(&input, &output, &rest),
            ],
        );
        Ok(vec![fragment])
    }

    fn default_subspace(&self, schedule: &Schedule) -> ScheduleResult<SubspaceId> {
        Ok(schedule.subspace_manager().loops())
    }

    fn name(&self) -> &str {
        "fusion"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::test_support::schedule;
    use crate::utils::errors::ScheduleError;

    #[test]
    fn test_fusion_fragment() {
        let mut s = schedule(3, 1);
        s.apply(&Fusion::new(vec![0, 2]).into()).unwrap();
        let m = &s.transformations()[1];
        assert_eq!(
            m,
            "{ [loops_c,i_0,i_c] -> [alias_loops_c,alias_i_0,alias_i_c] : alias_loops_c = 0 and alias_i_c = loops_c \
             and (loops_c = 0 or loops_c = 2) and alias_i_0 = i_0; \
             [loops_c,i_0,i_c] -> [alias_loops_c,alias_i_0,alias_i_c] : loops_c != 0 and loops_c != 2 \
             and alias_loops_c = loops_c and alias_i_0 = i_0 and alias_i_c = i_c }"
        );
    }

    #[test]
    fn test_fusion_target_is_first_listed() {
        let mut s = schedule(3, 1);
        s.apply(&Fusion::new(vec![2, 1]).into()).unwrap();
        assert!(s.transformations()[1].contains("alias_loops_c = 2 and"));
    }

    #[test]
    fn test_empty_fusion() {
        let mut s = schedule(2, 1);
        let err = s.apply(&Fusion::new(vec![]).into()).unwrap_err();
        assert!(matches!(err, ScheduleError::Config(ref e) if e.kind == ConfigErrorKind::EmptyFusion));
    }

    #[test]
    fn test_fusion_on_last_subspace() {
        let mut s = schedule(2, 1);
        let nest = s.subspace_manager().nest();
        let err = s.apply_to(&Fusion::new(vec![0, 1]).into(), nest).unwrap_err();
        assert!(matches!(err, ScheduleError::Config(ref e) if e.kind == ConfigErrorKind::InvalidSubspace));
    }

    #[test]
    fn test_fusion_unknown_loop() {
        let mut s = schedule(2, 1);
        assert!(s.apply(&Fusion::new(vec![0, 5]).into()).is_err());
    }
}
