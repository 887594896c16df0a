//! Loop tiling.
//!
//! Tiling one nest inserts a tile subspace left of the tiled one:
//!
//! ```text
//! [.., i_0, i_1, i_c]  ->  [.., t_i_0, t_i_1, t_i_c, i_0, i_1, i_c]
//!                          with i_d = t_i_d * s_d + r_d, 0 <= r_d < s_d
//! ```
//!
//! Other nests get zero tile coordinates. Tiling a second nest at the same
//! depth reuses the existing tile subspace, so tiles of different nests can
//! later be fused. Sub-pipelines run over the tile coordinates (`over`) and
//! within a tile (`within`).

use super::{loops_const, nest_dimensions, set_alias, Transform, Transformation};
use crate::schedule::{iscc, Schedule};
use crate::subspace::{Subspace, SubspaceId};
use crate::utils::errors::{ConfigError, ConfigErrorKind, ScheduleResult};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// Tile extents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TileSizes {
    /// The same size for every dimension of the tiled subspace
    Uniform(String),
    /// One size per dimension, outermost first
    PerDimension(Vec<String>),
}

impl TileSizes {
    fn get(&self, dimension: usize) -> Option<&str> {
        match self {
            TileSizes::Uniform(s) => Some(s.as_str()),
            TileSizes::PerDimension(v) => v.get(dimension).map(String::as_str),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Tile {
    loop_id: usize,
    sizes: TileSizes,
    over: Vec<Transformation>,
    within: Vec<Transformation>,
}

impl Tile {
    pub fn new(loop_id: usize, sizes: TileSizes) -> Self {
        Self {
            loop_id,
            sizes,
            over: Vec::new(),
            within: Vec::new(),
        }
    }

    /// Square tiles of `size` on every dimension.
    pub fn uniform(loop_id: usize, size: impl Into<String>) -> Self {
        Self::new(loop_id, TileSizes::Uniform(size.into()))
    }

    pub fn per_dimension(loop_id: usize, sizes: Vec<String>) -> Self {
        Self::new(loop_id, TileSizes::PerDimension(sizes))
    }

    /// Transformations applied to the tile coordinates.
    pub fn with_over(mut self, over: Vec<Transformation>) -> Self {
        self.over = over;
        self
    }

    /// Transformations applied to the intra-tile coordinates.
    pub fn with_within(mut self, within: Vec<Transformation>) -> Self {
        self.within = within;
        self
    }

    pub fn loop_id(&self) -> usize {
        self.loop_id
    }

    pub fn sizes(&self) -> &TileSizes {
        &self.sizes
    }

    pub fn over(&self) -> &[Transformation] {
        &self.over
    }

    pub fn within(&self) -> &[Transformation] {
        &self.within
    }

    /// Number of tiled dimensions for a target of `subspace_size` iterators.
    #[track_caller]
    fn tile_count(
        &self,
        subspace_size: usize,
        nest_dims: Option<usize>,
    ) -> Result<usize, ConfigError> {
        let invalid = |msg: String| {
            ConfigError::new(ConfigErrorKind::InvalidTileSize, msg).in_transform("tile")
        };
        let count = match &self.sizes {
            TileSizes::Uniform(_) => subspace_size,
            TileSizes::PerDimension(v) => {
                if let Some(dims) = nest_dims {
                    if v.len() != dims {
                        return Err(invalid(format!(
                            "{} tile sizes given for loop {} of {} dimensions",
                            v.len(),
                            self.loop_id,
                            dims
                        )));
                    }
                }
                if v.len() > subspace_size {
                    return Err(invalid(
                        "Tiling more dimensions than exist in the subspace.".to_string(),
                    ));
                }
                v.len()
            }
        };
        if count == 0 {
            return Err(invalid("Nothing to tile".to_string()));
        }
        for d in 0..count {
            let size = self.sizes.get(d).unwrap_or_default().trim();
            match size.parse::<i64>() {
                Ok(n) if n <= 0 => {
                    return Err(invalid(format!("Tile size {} is not positive", n)));
                }
                Ok(_) => {}
                Err(_) if size.is_empty() => {
                    return Err(invalid(format!("Tile size of dimension {} is empty", d)));
                }
                Err(_) => warn!("symbolic tile size '{}' yields a non-affine map", size),
            }
        }
        Ok(count)
    }
}

impl Tile {
    fn apply_nested(
        &self,
        schedule: &mut Schedule,
        tile: SubspaceId,
        tiled: SubspaceId,
    ) -> ScheduleResult<Vec<String>> {
        let mut fragments = Vec::new();
        let targets = self.over.iter().map(|t| (t, tile));
        for (t, target) in targets.chain(self.within.iter().map(|t| (t, tiled))) {
            schedule.subspace_manager_mut().next_stage();
            fragments.extend(t.apply_to(schedule, target)?);
        }
        Ok(fragments)
    }
}

impl Transform for Tile {
    fn apply_to(
        &self,
        schedule: &mut Schedule,
        subspace: SubspaceId,
    ) -> ScheduleResult<Vec<String>> {
        let nest_dims = nest_dimensions(schedule, self.loop_id, self.name())?;
        let loops_c = loops_const(schedule);
        let depth = schedule.depth();

        let manager = schedule.subspace_manager();
        let target = manager.checked(subspace).map_err(|e| e.in_transform(self.name()))?.clone();
        let is_nest = subspace == manager.nest();
        let count = self.tile_count(target.size(), is_nest.then_some(nest_dims))?;

        let candidate = Subspace::derived(&"t".repeat(depth + 1), count, &target)?;
        let existing = manager
            .left_of(subspace)
            .into_iter()
            .find(|&id| manager.get(id).map_or(false, |s| *s == candidate));

        let tile = match existing {
            Some(id) => {
                debug!("reusing tile subspace {}", candidate);
                set_alias(schedule, id, true)?;
                id
            }
            None => {
                let manager = schedule.subspace_manager_mut();
                let prefix = manager.safe_prefix("t");
                let fresh = Subspace::derived(&prefix, count, &target)?;
                debug!("inserting tile subspace {}", fresh);
                manager.insert_left(fresh, subspace)?
            }
        };
        set_alias(schedule, subspace, true)?;

        let manager = schedule.subspace_manager();
        let tiled = manager.checked(subspace)?;
        let tiles = manager.checked(tile)?;

        let mut mapped = vec![
            format!("{} = {}", loops_c, self.loop_id),
            format!("{} = {}", tiled.const_name(), tiled.const_base_name()),
            format!("{} = 0", tiles.const_name()),
        ];
        let tile_names = tiles.variable_names();
        let remainders: Vec<String> = (0..count).map(|d| format!("r_{}", d)).collect();
        let mut bounds = Vec::with_capacity(count);
        for d in 0..count {
            let size = self.sizes.get(d).unwrap_or_default();
            bounds.push(format!(
                "0 <= {r} < {s} and {x} = {t} * {s} + {r}",
                r = remainders[d],
                s = size,
                x = tiled.variable_base_names()[d],
                t = tile_names[d]
            ));
        }
        mapped.push(format!("exists ({} : {})", remainders.join(", "), bounds.join(" and ")));
        for (out, base) in tiled.variable_names().iter().zip(tiled.variable_base_names()) {
            mapped.push(format!("{} = {}", out, base));
        }
        let mapped = iscc::map_clause(
            &manager.input_iterators(),
            &manager.output_iterators(),
            &mapped,
        );

        set_alias(schedule, subspace, false)?;
        set_alias(schedule, tile, false)?;
        let manager = schedule.subspace_manager();
        let mut untouched = vec![format!("{} != {}", loops_c, self.loop_id)];
        if existing.is_none() {
            let tiles = manager.checked(tile)?;
            untouched.extend(tiles.names(true).into_iter().map(|n| format!("{} = 0", n)));
        }
        let untouched = iscc::map_clause(
            &manager.input_iterators(),
            &manager.output_iterators(),
            &untouched,
        );

        let mut fragments = vec![iscc::union_map::<&str>(&[], &[mapped, untouched])];

        schedule.increment_depth();
        let nested = self.apply_nested(schedule, tile, subspace);
        schedule.decrement_depth();
        fragments.extend(nested?);
        Ok(fragments)
    }

    fn default_subspace(&self, schedule: &Schedule) -> ScheduleResult<SubspaceId> {
        Ok(schedule.subspace_manager().nest())
    }

    fn name(&self) -> &str {
        "tile"
    }
}
