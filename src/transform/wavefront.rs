//! Wavefront skewing: the outermost iterator of the target becomes the sum of
//! all its variable iterators, so every inner loop is free of carried
//! dependences within one wave.

use super::{set_alias, Transform};
use crate::schedule::{iscc, Schedule};
use crate::subspace::SubspaceId;
use crate::utils::errors::{ConfigError, ConfigErrorKind, ScheduleResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wavefront;

impl Transform for Wavefront {
    fn apply_to(
        &self,
        schedule: &mut Schedule,
        subspace: SubspaceId,
    ) -> ScheduleResult<Vec<String>> {
        let size = schedule
            .subspace_manager()
            .checked(subspace)
            .map_err(|e| e.in_transform(self.name()))?
            .size();
        if size == 0 {
            return Err(ConfigError::new(
                ConfigErrorKind::InvalidSubspace,
                "Cannot skew a subspace without variables",
            )
            .in_transform(self.name())
            .into());
        }

        set_alias(schedule, subspace, true)?;
        let manager = schedule.subspace_manager();
        let target = manager.checked(subspace)?;
        let outputs = target.names(true);
        let inputs = target.names(false);

        let skewed = target.variable_base_names().join(" + ");
        let mut conditions = vec![format!("{} = {}", outputs[0], skewed)];
        conditions.extend(
            outputs
                .iter()
                .zip(&inputs)
                .skip(1)
                .map(|(o, i)| format!("{} = {}", o, i)),
        );
        let clause = iscc::map_clause(
            &manager.input_iterators(),
            &manager.output_iterators(),
            &conditions,
        );
        set_alias(schedule, subspace, false)?;

        Ok(vec![iscc::union_map::<&str>(&[], &[clause])])
    }

    fn name(&self) -> &str {
        "wavefront"
    }
}
