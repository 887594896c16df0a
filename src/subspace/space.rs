//! A named group of iterator symbols.

use crate::utils::errors::{DimensionError, DimensionErrorKind};
use std::fmt;

/// Version marker of a subspace. Later stages exist only in later fragments.
pub type Stage = i32;

/// Stage of a subspace not yet placed in a manager.
pub const UNSTAGED: Stage = -1;
/// Stage of the subspaces a schedule starts with.
pub const BASE_STAGE: Stage = 0;
/// Requesting this stage renders every subspace.
pub const ALL_STAGES: Stage = Stage::MAX;

/// Prefix marking the post-transformation copy of an iterator.
pub const ALIAS_PREFIX: &str = "alias_";
/// Suffix of the constant iterator.
pub const CONST_SUFFIX: &str = "_c";

/// `prefix_0 .. prefix_{n-1}` variable iterators plus one constant iterator
/// `prefix_c` that orders statements sharing the same variable coordinates.
#[derive(Debug, Clone)]
pub struct Subspace {
    variables: Vec<String>,
    constant: String,
    stage: Stage,
    aliased: bool,
}

impl Subspace {
    /// A fresh subspace with `count` variable iterators.
    pub fn new(prefix: &str, count: usize) -> Self {
        Self {
            variables: (0..count).map(|i| format!("{}_{}", prefix, i)).collect(),
            constant: format!("{}{}", prefix, CONST_SUFFIX),
            stage: UNSTAGED,
            aliased: false,
        }
    }

    /// A subspace whose iterators are `prefix_<name>` for the first `count`
    /// iterators of `source`.
    #[track_caller]
    pub fn derived(prefix: &str, count: usize, source: &Subspace) -> Result<Self, DimensionError> {
        if count > source.size() {
            return Err(DimensionError::new(
                DimensionErrorKind::SubspaceMismatch,
                format!(
                    "There are fewer iterators in that subspace ({}) than needed by count ({}).",
                    source.size(),
                    count
                ),
            ));
        }
        Ok(Self {
            variables: source.variables[..count]
                .iter()
                .map(|v| format!("{}_{}", prefix, v))
                .collect(),
            constant: format!("{}_{}", prefix, source.constant),
            stage: UNSTAGED,
            aliased: false,
        })
    }

    pub fn set_aliased(&mut self) {
        self.aliased = true;
    }

    pub fn unset_aliased(&mut self) {
        self.aliased = false;
    }

    pub fn is_aliased(&self) -> bool {
        self.aliased
    }

    /// Number of variable iterators.
    pub fn size(&self) -> usize {
        self.variables.len()
    }

    /// Number of iterators including the constant one.
    pub fn complete_size(&self) -> usize {
        self.variables.len() + 1
    }

    /// Index of the constant iterator.
    pub fn const_index(&self) -> usize {
        self.variables.len()
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn set_stage(&mut self, stage: Stage) {
        self.stage = stage;
    }

    fn decorate(&self, raw: &str, use_aliases: bool) -> String {
        if use_aliases && self.aliased {
            format!("{}{}", ALIAS_PREFIX, raw)
        } else {
            raw.to_string()
        }
    }

    /// Iterator `index` (the constant one at [`Subspace::const_index`]),
    /// alias-prefixed when `use_aliases` is set and the subspace is aliased.
    pub fn get(&self, index: usize, use_aliases: bool) -> Option<String> {
        let raw = if index < self.variables.len() {
            &self.variables[index]
        } else if index == self.variables.len() {
            &self.constant
        } else {
            return None;
        };
        Some(self.decorate(raw, use_aliases))
    }

    /// Iterator `index` as currently named, respecting the aliased flag.
    pub fn name(&self, index: usize) -> Option<String> {
        self.get(index, true)
    }

    /// Constant iterator as currently named.
    pub fn const_name(&self) -> String {
        self.decorate(&self.constant, true)
    }

    /// Constant iterator without alias.
    pub fn const_base_name(&self) -> &str {
        &self.constant
    }

    /// Variable iterators as currently named.
    pub fn variable_names(&self) -> Vec<String> {
        self.variables.iter().map(|v| self.decorate(v, true)).collect()
    }

    /// Variable iterators without alias.
    pub fn variable_base_names(&self) -> &[String] {
        &self.variables
    }

    /// All iterators, variable ones first.
    pub fn names(&self, use_aliases: bool) -> Vec<String> {
        self.variables
            .iter()
            .chain(std::iter::once(&self.constant))
            .map(|v| self.decorate(v, use_aliases))
            .collect()
    }

    /// Comma-joined iterators, or an empty string when this subspace only
    /// exists after `stage`.
    pub fn iterators(&self, stage: Stage, use_aliases: bool) -> String {
        if self.stage > stage {
            return String::new();
        }
        self.names(use_aliases).join(",")
    }
}

impl PartialEq for Subspace {
    fn eq(&self, other: &Self) -> bool {
        self.variables == other.variables && self.constant == other.constant
    }
}

impl Eq for Subspace {}

impl fmt::Display for Subspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.names(true).join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names() {
        let s = Subspace::new("i", 2);
        assert_eq!(s.size(), 2);
        assert_eq!(s.complete_size(), 3);
        assert_eq!(s.const_index(), 2);
        assert_eq!(s.iterators(ALL_STAGES, true), "i_0,i_1,i_c");
        assert_eq!(s.get(2, false).as_deref(), Some("i_c"));
        assert_eq!(s.get(3, false), None);
    }

    #[test]
    fn test_aliasing() {
        let mut s = Subspace::new("i", 1);
        s.set_aliased();
        assert_eq!(s.iterators(ALL_STAGES, true), "alias_i_0,alias_i_c");
        assert_eq!(s.iterators(ALL_STAGES, false), "i_0,i_c");
        assert_eq!(s.name(0).as_deref(), Some("alias_i_0"));
        assert_eq!(s.const_base_name(), "i_c");
        s.unset_aliased();
        assert_eq!(s.const_name(), "i_c");
    }

    #[test]
    fn test_zero_width() {
        let s = Subspace::new("loops", 0);
        assert_eq!(s.iterators(ALL_STAGES, true), "loops_c");
        assert!(s.variable_names().is_empty());
    }

    #[test]
    fn test_derived() {
        let source = Subspace::new("i", 3);
        let t = Subspace::derived("tt", 2, &source).unwrap();
        assert_eq!(t.names(false), vec!["tt_i_0", "tt_i_1", "tt_i_c"]);
        let err = Subspace::derived("t", 4, &source).unwrap_err();
        assert_eq!(err.kind, DimensionErrorKind::SubspaceMismatch);
    }

    #[test]
    fn test_stage_filter() {
        let mut s = Subspace::new("t", 1);
        s.set_stage(3);
        assert_eq!(s.iterators(2, false), "");
        assert_eq!(s.iterators(3, false), "t_0,t_c");
        // unstaged subspaces render at every stage
        assert_eq!(Subspace::new("u", 0).iterators(BASE_STAGE, false), "u_c");
    }

    #[test]
    fn test_equality_ignores_alias_and_stage() {
        let a = Subspace::new("i", 2);
        let mut b = Subspace::new("i", 2);
        b.set_aliased();
        b.set_stage(7);
        assert_eq!(a, b);
        assert_ne!(a, Subspace::new("i", 1));
        assert_ne!(a, Subspace::new("j", 2));
    }
}
