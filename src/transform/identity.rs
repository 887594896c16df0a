//! The do-nothing transformation.

use super::Transform;
use crate::schedule::Schedule;
use crate::subspace::SubspaceId;
use crate::utils::errors::ScheduleResult;
use serde::{Deserialize, Serialize};

/// Leaves the schedule in its current order; a fresh schedule is already
/// sequential.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity;

impl Transform for Identity {
    fn apply_to(
        &self,
        _schedule: &mut Schedule,
        _subspace: SubspaceId,
    ) -> ScheduleResult<Vec<String>> {
        Ok(Vec::new())
    }

    fn name(&self) -> &str {
        "identity"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::test_support::schedule;

    #[test]
    fn test_identity_adds_nothing() {
        let mut s = schedule(2, 1);
        let stage = s.subspace_manager().current_stage();
        s.apply(&Identity.into()).unwrap();
        assert_eq!(s.transformations().len(), 1);
        assert_eq!(s.subspace_manager().current_stage(), stage + 1);
    }
}
