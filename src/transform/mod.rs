//! Schedule transformations.
//!
//! Each transformation reads the schedule's current coordinate system and
//! returns iscc map fragments from the input iterators to the output
//! iterators. Fragments are appended by [`Schedule::apply`]; a transformation
//! never touches the domains.
//!
//! | Transformation | Default subspace |
//! |---|---|
//! | [`Identity`] | first subspace after `loops` |
//! | [`Shift`] | first subspace after `loops` |
//! | [`Fusion`] | `loops` |
//! | [`Tile`] | `nest` |
//! | [`Wavefront`] | first subspace after `loops` |
//! | [`ParallelAnnotation`] | first subspace after `loops` |
//! | [`AutomaticShift`] | first subspace after `loops` |

pub mod auto_shift;
pub mod fusion;
pub mod identity;
pub mod parallel;
pub mod shift;
pub mod tiling;
pub mod wavefront;

pub use auto_shift::{compute_shift_tuples_for_fusion, compute_shifts_for_fusion, AutomaticShift};
pub use fusion::Fusion;
pub use identity::Identity;
pub use parallel::ParallelAnnotation;
pub use shift::Shift;
pub use tiling::{Tile, TileSizes};
pub use wavefront::Wavefront;

use crate::schedule::Schedule;
use crate::subspace::SubspaceId;
use crate::utils::errors::{ConfigError, ConfigErrorKind, ScheduleResult};

/// Transformation pass trait.
pub trait Transform {
    /// Synthesize the fragments for `subspace`.
    fn apply_to(
        &self,
        schedule: &mut Schedule,
        subspace: SubspaceId,
    ) -> ScheduleResult<Vec<String>>;

    /// Subspace targeted by [`Schedule::apply`].
    fn default_subspace(&self, schedule: &Schedule) -> ScheduleResult<SubspaceId> {
        after_loops(schedule, self.name())
    }

    /// Get transformation name.
    fn name(&self) -> &str;
}

/// Every transformation the scheduler knows.
#[derive(Debug, Clone)]
pub enum Transformation {
    Identity(Identity),
    Shift(Shift),
    Fusion(Fusion),
    Tile(Tile),
    Wavefront(Wavefront),
    Parallel(ParallelAnnotation),
    AutomaticShift(AutomaticShift),
}

impl Transformation {
    fn inner(&self) -> &dyn Transform {
        match self {
            Transformation::Identity(t) => t,
            Transformation::Shift(t) => t,
            Transformation::Fusion(t) => t,
            Transformation::Tile(t) => t,
            Transformation::Wavefront(t) => t,
            Transformation::Parallel(t) => t,
            Transformation::AutomaticShift(t) => t,
        }
    }
}

impl Transform for Transformation {
    fn apply_to(
        &self,
        schedule: &mut Schedule,
        subspace: SubspaceId,
    ) -> ScheduleResult<Vec<String>> {
        self.inner().apply_to(schedule, subspace)
    }

    fn default_subspace(&self, schedule: &Schedule) -> ScheduleResult<SubspaceId> {
        self.inner().default_subspace(schedule)
    }

    fn name(&self) -> &str {
        self.inner().name()
    }
}

macro_rules! impl_from_transform {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for Transformation {
                fn from(t: $ty) -> Self {
                    Transformation::$variant(t)
                }
            }
        )*
    };
}

impl_from_transform!(
    Identity(Identity),
    Shift(Shift),
    Fusion(Fusion),
    Tile(Tile),
    Wavefront(Wavefront),
    Parallel(ParallelAnnotation),
    AutomaticShift(AutomaticShift),
);

/// The subspace right of `loops`.
#[track_caller]
pub(crate) fn after_loops(schedule: &Schedule, transform: &str) -> ScheduleResult<SubspaceId> {
    let manager = schedule.subspace_manager();
    manager.next_after(manager.loops()).ok_or_else(|| {
        ConfigError::new(ConfigErrorKind::InvalidSubspace, "No subspace follows the loops subspace")
            .in_transform(transform)
            .into()
    })
}

/// Set or clear the aliased flag of `id`.
pub(crate) fn set_alias(
    schedule: &mut Schedule,
    id: SubspaceId,
    aliased: bool,
) -> Result<(), ConfigError> {
    let subspace = schedule.subspace_manager_mut().checked_mut(id)?;
    if aliased {
        subspace.set_aliased();
    } else {
        subspace.unset_aliased();
    }
    Ok(())
}

/// Name of the loops subspace's constant iterator.
pub(crate) fn loops_const(schedule: &Schedule) -> String {
    let manager = schedule.subspace_manager();
    manager
        .get(manager.loops())
        .map(|s| s.const_base_name().to_string())
        .unwrap_or_default()
}

/// Fail unless `loop_id` names a nest of the chain; returns its dimensionality.
#[track_caller]
pub(crate) fn nest_dimensions(
    schedule: &Schedule,
    loop_id: usize,
    transform: &str,
) -> Result<usize, ConfigError> {
    schedule
        .chain()
        .nest_checked(loop_id)
        .map(|nest| nest.dimensions())
        .map_err(|e| e.in_transform(transform))
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::ir::{LoopChain, LoopNest, RectangularDomain};
    use crate::schedule::Schedule;

    /// A schedule over `nests` nests of `dims` dimensions each, `0 <= x <= N`.
    pub fn schedule(nests: usize, dims: usize) -> Schedule {
        let chain: LoopChain = (0..nests)
            .map(|_| {
                let bounds: Vec<(String, String)> =
                    (0..dims).map(|_| ("0".to_string(), "N".to_string())).collect();
                LoopNest::new(RectangularDomain::new(bounds, ["N"]).unwrap())
            })
            .collect();
        Schedule::new(chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::test_support::schedule;

    #[test]
    fn test_enum_dispatch_names() {
        let all: Vec<Transformation> = vec![
            Identity.into(),
            Shift::new(0, vec!["1".to_string()]).into(),
            Fusion::new(vec![0, 1]).into(),
            Tile::uniform(0, "4").into(),
            Wavefront.into(),
            ParallelAnnotation::new(0).into(),
            AutomaticShift::default().into(),
        ];
        let names: Vec<&str> = all.iter().map(|t| t.name()).collect();
        assert_eq!(
            names,
            vec!["identity", "shift", "fusion", "tile", "wavefront", "parallel", "automatic_shift"]
        );
    }

    #[test]
    fn test_default_subspaces() {
        let s = schedule(2, 1);
        let m = s.subspace_manager();
        let fusion: Transformation = Fusion::new(vec![0, 1]).into();
        let tile: Transformation = Tile::uniform(0, "4").into();
        let shift: Transformation = Shift::new(0, vec!["1".to_string()]).into();
        assert_eq!(fusion.default_subspace(&s).unwrap(), m.loops());
        assert_eq!(tile.default_subspace(&s).unwrap(), m.nest());
        assert_eq!(shift.default_subspace(&s).unwrap(), m.nest());
    }

    #[test]
    fn test_apply_all_stops_at_first_error() {
        let mut s = schedule(2, 1);
        let pipeline: Vec<Transformation> = vec![
            Shift::new(1, vec!["1".to_string()]).into(),
            Shift::new(7, vec!["1".to_string()]).into(),
            Wavefront.into(),
        ];
        assert!(s.apply_all(&pipeline).is_err());
        assert_eq!(s.transformations().len(), 2);
    }
}
