//! Parallel loop annotation.

use super::Transform;
use crate::schedule::Schedule;
use crate::subspace::SubspaceId;
use crate::utils::errors::ScheduleResult;
use log::debug;
use serde::{Deserialize, Serialize};

/// Marks the loop over iterator `additional_depth` of the target subspace as
/// parallel in the generated code. Adds no map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParallelAnnotation {
    additional_depth: usize,
}

impl ParallelAnnotation {
    pub fn new(additional_depth: usize) -> Self {
        Self { additional_depth }
    }

    pub fn additional_depth(&self) -> usize {
        self.additional_depth
    }
}

impl Transform for ParallelAnnotation {
    fn apply_to(
        &self,
        schedule: &mut Schedule,
        subspace: SubspaceId,
    ) -> ScheduleResult<Vec<String>> {
        schedule
            .subspace_manager()
            .checked(subspace)
            .map_err(|e| e.in_transform(self.name()))?;
        debug!("parallel loop {} levels into {:?}", self.additional_depth, subspace);
        schedule.add_parallel_subspace(subspace, self.additional_depth);
        Ok(Vec::new())
    }

    fn name(&self) -> &str {
        "parallel"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::test_support::schedule;

    #[test]
    fn test_annotation_resolves_to_coordinate() {
        let mut s = schedule(1, 2);
        s.apply(&ParallelAnnotation::new(1).into()).unwrap();
        assert_eq!(s.transformations().len(), 1);
        assert_eq!(s.parallel_dimensions().into_iter().collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn test_annotation_follows_inserted_subspaces() {
        let mut s = schedule(1, 1);
        s.apply(&ParallelAnnotation::new(0).into()).unwrap();
        s.apply(&crate::transform::Tile::uniform(0, "4").into()).unwrap();
        // the nest moved right by the tile subspace
        assert_eq!(s.parallel_dimensions().into_iter().collect::<Vec<_>>(), vec![3]);
    }
}
