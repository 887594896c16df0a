//! Ordered collection of subspaces forming the global coordinate system.

use super::space::{Stage, Subspace, BASE_STAGE};
use crate::utils::errors::{ConfigError, ConfigErrorKind};
use std::collections::HashMap;

/// Handle to a subspace owned by a [`SubspaceManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubspaceId(usize);

/// Owns every subspace of a schedule and their left-to-right order.
///
/// Subspaces live in an arena and are never removed, so a [`SubspaceId`]
/// stays valid for the manager's lifetime. The first two are always the
/// `loops` subspace (which nest a statement came from) and the `nest`
/// subspace (the statement's own iterators).
#[derive(Debug, Clone)]
pub struct SubspaceManager {
    arena: Vec<Subspace>,
    order: Vec<SubspaceId>,
    loops: SubspaceId,
    nest: SubspaceId,
    stage: Stage,
    safe_prefixes: HashMap<String, usize>,
}

impl SubspaceManager {
    /// Create a manager holding `loops` then `nest`, both at the base stage.
    pub fn new(mut loops: Subspace, mut nest: Subspace) -> Self {
        loops.set_stage(BASE_STAGE);
        nest.set_stage(BASE_STAGE);
        Self {
            arena: vec![loops, nest],
            order: vec![SubspaceId(0), SubspaceId(1)],
            loops: SubspaceId(0),
            nest: SubspaceId(1),
            stage: BASE_STAGE,
            safe_prefixes: HashMap::new(),
        }
    }

    pub fn loops(&self) -> SubspaceId {
        self.loops
    }

    pub fn nest(&self) -> SubspaceId {
        self.nest
    }

    pub fn get(&self, id: SubspaceId) -> Option<&Subspace> {
        self.arena.get(id.0)
    }

    pub fn get_mut(&mut self, id: SubspaceId) -> Option<&mut Subspace> {
        self.arena.get_mut(id.0)
    }

    /// Like [`SubspaceManager::get`], failing when `id` is not placed here.
    #[track_caller]
    pub fn checked(&self, id: SubspaceId) -> Result<&Subspace, ConfigError> {
        match self.position_of(id) {
            Some(_) => Ok(&self.arena[id.0]),
            None => Err(self.unknown(id)),
        }
    }

    /// Mutable variant of [`SubspaceManager::checked`].
    #[track_caller]
    pub fn checked_mut(&mut self, id: SubspaceId) -> Result<&mut Subspace, ConfigError> {
        match self.position_of(id) {
            Some(_) => Ok(&mut self.arena[id.0]),
            None => Err(self.unknown(id)),
        }
    }

    #[track_caller]
    fn unknown(&self, id: SubspaceId) -> ConfigError {
        ConfigError::new(
            ConfigErrorKind::InvalidSubspace,
            format!("Subspace #{} is not managed by this schedule", id.0),
        )
    }

    /// Subspace ids in left-to-right order.
    pub fn ids(&self) -> &[SubspaceId] {
        &self.order
    }

    /// Subspaces in left-to-right order.
    pub fn iter(&self) -> impl Iterator<Item = (SubspaceId, &Subspace)> {
        self.order.iter().map(move |&id| (id, &self.arena[id.0]))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn position_of(&self, id: SubspaceId) -> Option<usize> {
        self.order.iter().position(|&o| o == id)
    }

    /// Subspace immediately right of `id`.
    pub fn next_after(&self, id: SubspaceId) -> Option<SubspaceId> {
        let pos = self.position_of(id)?;
        self.order.get(pos + 1).copied()
    }

    /// Subspaces left of `id`, nearest first.
    pub fn left_of(&self, id: SubspaceId) -> Vec<SubspaceId> {
        match self.position_of(id) {
            Some(pos) => self.order[..pos].iter().rev().copied().collect(),
            None => Vec::new(),
        }
    }

    /// Place `subspace` immediately left of `cursor`, stamped with the
    /// output stage.
    #[track_caller]
    pub fn insert_left(
        &mut self,
        subspace: Subspace,
        cursor: SubspaceId,
    ) -> Result<SubspaceId, ConfigError> {
        let pos = self.position_of(cursor).ok_or_else(|| self.unknown(cursor))?;
        Ok(self.insert_at(subspace, pos))
    }

    /// Place `subspace` immediately right of `cursor`, stamped with the
    /// output stage.
    #[track_caller]
    pub fn insert_right(
        &mut self,
        subspace: Subspace,
        cursor: SubspaceId,
    ) -> Result<SubspaceId, ConfigError> {
        let pos = self.position_of(cursor).ok_or_else(|| self.unknown(cursor))?;
        Ok(self.insert_at(subspace, pos + 1))
    }

    fn insert_at(&mut self, mut subspace: Subspace, pos: usize) -> SubspaceId {
        subspace.set_stage(self.output_stage());
        let id = SubspaceId(self.arena.len());
        self.arena.push(subspace);
        self.order.insert(pos, id);
        id
    }

    /// Total number of coordinates, constant iterators included.
    pub fn size(&self) -> usize {
        self.iter().map(|(_, s)| s.complete_size()).sum()
    }

    /// Coordinate position of the first iterator of `id`.
    pub fn offset_of(&self, id: SubspaceId) -> Option<usize> {
        let pos = self.position_of(id)?;
        Some(
            self.order[..pos]
                .iter()
                .map(|o| self.arena[o.0].complete_size())
                .sum(),
        )
    }

    /// `base` repeated once more on every call for the same base.
    pub fn safe_prefix(&mut self, base: &str) -> String {
        let count = self.safe_prefixes.entry(base.to_string()).or_insert(1);
        let prefix = base.repeat(*count);
        *count += 1;
        prefix
    }

    pub fn current_stage(&self) -> Stage {
        self.stage
    }

    pub fn input_stage(&self) -> Stage {
        self.current_stage()
    }

    pub fn output_stage(&self) -> Stage {
        self.input_stage() + 1
    }

    pub fn advance_stage(&mut self) -> Stage {
        self.stage += 1;
        self.stage
    }

    /// Clear every alias, then advance.
    pub fn next_stage(&mut self) -> Stage {
        for s in self.arena.iter_mut() {
            s.unset_aliased();
        }
        self.advance_stage()
    }

    /// Comma-joined iterators of every subspace present at `stage`.
    pub fn iterators(&self, stage: Stage, use_aliases: bool) -> String {
        self.iter()
            .map(|(_, s)| s.iterators(stage, use_aliases))
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Iterators at the current stage, alias-respecting.
    pub fn current_iterators(&self) -> String {
        self.iterators(self.current_stage(), true)
    }

    /// Domain tuple of the next fragment.
    pub fn input_iterators(&self) -> String {
        self.iterators(self.input_stage(), false)
    }

    /// Range tuple of the next fragment.
    pub fn output_iterators(&self) -> String {
        self.iterators(self.output_stage(), true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> SubspaceManager {
        SubspaceManager::new(Subspace::new("loops", 0), Subspace::new("i", 2))
    }

    #[test]
    fn test_fresh_manager_iterators() {
        let m = manager();
        assert_eq!(m.iterators(m.current_stage(), true), "loops_c,i_0,i_1,i_c");
        assert_eq!(m.size(), 4);
        assert_eq!(m.current_stage(), BASE_STAGE);
        assert_eq!(m.output_stage(), BASE_STAGE + 1);
    }

    #[test]
    fn test_aliasing_output_iterators() {
        let mut m = manager();
        m.next_stage();
        let loops = m.loops();
        m.get_mut(loops).unwrap().set_aliased();
        assert_eq!(m.output_iterators(), "alias_loops_c,i_0,i_1,i_c");
        assert_eq!(m.input_iterators(), "loops_c,i_0,i_1,i_c");
        m.next_stage();
        assert_eq!(m.output_iterators(), "loops_c,i_0,i_1,i_c");
    }

    #[test]
    fn test_insert_left_is_output_only() {
        let mut m = manager();
        let nest = m.nest();
        let t = m.insert_left(Subspace::new("t", 1), nest).unwrap();
        assert_eq!(m.position_of(t), Some(1));
        assert_eq!(m.input_iterators(), "loops_c,i_0,i_1,i_c");
        assert_eq!(m.output_iterators(), "loops_c,t_0,t_c,i_0,i_1,i_c");
        m.next_stage();
        assert_eq!(m.input_iterators(), "loops_c,t_0,t_c,i_0,i_1,i_c");
        assert_eq!(m.size(), 6);
    }

    #[test]
    fn test_insert_right_and_navigation() {
        let mut m = manager();
        let loops = m.loops();
        let nest = m.nest();
        let r = m.insert_right(Subspace::new("r", 0), nest).unwrap();
        assert_eq!(m.next_after(loops), Some(nest));
        assert_eq!(m.next_after(nest), Some(r));
        assert_eq!(m.next_after(r), None);
        assert_eq!(m.left_of(r), vec![nest, loops]);
        assert_eq!(m.offset_of(loops), Some(0));
        assert_eq!(m.offset_of(nest), Some(1));
        assert_eq!(m.offset_of(r), Some(4));
    }

    #[test]
    fn test_safe_prefix() {
        let mut m = manager();
        assert_eq!(m.safe_prefix("t"), "t");
        assert_eq!(m.safe_prefix("t"), "tt");
        assert_eq!(m.safe_prefix("t"), "ttt");
        assert_eq!(m.safe_prefix("x"), "x");
    }

    #[test]
    fn test_foreign_id_is_rejected() {
        let m = manager();
        let err = m.checked(SubspaceId(9)).unwrap_err();
        assert_eq!(err.kind, ConfigErrorKind::InvalidSubspace);
        let mut m2 = manager();
        assert!(m2.insert_left(Subspace::new("t", 0), SubspaceId(9)).is_err());
    }
}
