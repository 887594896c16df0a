//! Global iteration schedules of a loop chain.
//!
//! A [`Schedule`] is built once from a [`LoopChain`]: one iteration domain
//! per nest, and an embedding map placing every statement instance in the
//! global coordinate system `[loops_c, i_0 .. i_{m-1}, i_c]`. Transformations
//! only ever append maps; code generation composes them left to right,
//! restricts the result to the domains, and hands it to iscc.

pub mod iscc;

use crate::codegen::{print_c, CodegenOptions};
use crate::ir::LoopChain;
use crate::isl::{self, AstNode};
use crate::subspace::{Subspace, SubspaceId, SubspaceManager};
use crate::transform::{Transform, Transformation};
use crate::utils::errors::{ConfigError, ConfigErrorKind, ScheduleResult};
use log::{debug, info};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

/// Default statement prefix.
pub const DEFAULT_STATEMENT_PREFIX: &str = "";
/// Default prefix of the iterators in generated code.
pub const DEFAULT_ITERATOR_PREFIX: &str = "c";

/// Prefix of the loops subspace.
pub const LOOPS_PREFIX: &str = "loops";
/// Prefix of the nest subspace.
pub const NEST_PREFIX: &str = "i";

/// A loop chain together with the transformations applied to it.
#[derive(Debug, Clone)]
pub struct Schedule {
    chain: LoopChain,
    statement_prefix: String,
    root_statement_symbol: String,
    iterator_prefix: String,
    domains: Vec<String>,
    transformations: Vec<String>,
    length_adjustment: i64,
    manager: SubspaceManager,
    depth: usize,
    parallel_subspaces: BTreeMap<SubspaceId, usize>,
}

/// Mutable coordinate state, saved around a transformation.
#[derive(Debug)]
struct Checkpoint {
    manager: SubspaceManager,
    depth: usize,
    length_adjustment: i64,
    parallel_subspaces: BTreeMap<SubspaceId, usize>,
}

impl Schedule {
    /// Schedule `chain` in its original sequential order.
    pub fn new(chain: LoopChain) -> Self {
        Self::with_prefixes(chain, DEFAULT_STATEMENT_PREFIX, DEFAULT_ITERATOR_PREFIX)
    }

    /// Like [`Schedule::new`], naming statements `<statement_prefix>statement_<k>`
    /// and generated iterators `<iterator_prefix><d>`.
    pub fn with_prefixes(chain: LoopChain, statement_prefix: &str, iterator_prefix: &str) -> Self {
        let loops = Subspace::new(LOOPS_PREFIX, 0);
        let mut nest = Subspace::new(NEST_PREFIX, chain.max_dimension());
        let loops_c = loops.const_base_name().to_string();
        // Statement iterators share the nest subspace names, so the nest side
        // of the embedding is written aliased.
        nest.set_aliased();
        let nest_names = nest.names(true);
        let nest_size = nest.size();

        let mut manager = SubspaceManager::new(loops, nest);
        manager.safe_prefix(LOOPS_PREFIX);
        manager.safe_prefix(NEST_PREFIX);
        let output = manager.output_iterators();
        let nest_id = manager.nest();
        if let Some(nest) = manager.get_mut(nest_id) {
            nest.unset_aliased();
        }

        let root_statement_symbol = format!("{}statement_", statement_prefix);

        let mut domains = Vec::with_capacity(chain.len());
        let mut clauses = Vec::with_capacity(chain.len());
        for (k, nest) in chain.iter().enumerate() {
            let domain = nest.domain();
            let iterators: Vec<String> = (0..domain.dimensions())
                .map(|d| format!("{}_{}", NEST_PREFIX, d))
                .collect();
            let statement = format!("{}{}[{}]", root_statement_symbol, k, iterators.join(","));

            let bounds: Vec<String> = domain
                .bounds()
                .zip(&iterators)
                .map(|((lo, up), x)| iscc::bound_conditions(x, lo, up))
                .collect();
            let symbols: Vec<&String> = domain.symbols().iter().collect();
            domains.push(format!(
                "{}{{ {} : {} }}",
                iscc::params_prefix(&symbols),
                statement,
                bounds.join(" and ")
            ));

            let mut conditions = vec![
                format!("{} = {}", loops_c, k),
                format!("{} = 0", nest_names[nest_size]),
            ];
            for (d, x) in iterators.iter().enumerate() {
                conditions.push(format!("{} = {}", nest_names[d], x));
            }
            for name in &nest_names[domain.dimensions()..nest_size] {
                conditions.push(format!("{} = 0", name));
            }
            clauses.push(format!("{} -> [{}] : {}", statement, output, conditions.join(" and ")));
        }

        let embedding = format!("{{ {} }}", clauses.join("; "));
        debug!("embedding map: {}", embedding);
        info!(
            "scheduled chain of {} nests, {} global coordinates",
            chain.len(),
            manager.size()
        );

        Self {
            chain,
            statement_prefix: statement_prefix.to_string(),
            root_statement_symbol,
            iterator_prefix: iterator_prefix.to_string(),
            domains,
            transformations: vec![embedding],
            length_adjustment: 0,
            manager,
            depth: 0,
            parallel_subspaces: BTreeMap::new(),
        }
    }

    /// Apply a transformation to its default subspace.
    pub fn apply(&mut self, transformation: &Transformation) -> ScheduleResult<()> {
        let target = transformation.default_subspace(self)?;
        self.apply_to(transformation, target)
    }

    /// Apply a transformation to an explicit subspace.
    ///
    /// On failure the schedule is left as it was before the call.
    pub fn apply_to(
        &mut self,
        transformation: &Transformation,
        subspace: SubspaceId,
    ) -> ScheduleResult<()> {
        let checkpoint = self.checkpoint();
        let fragments = match transformation.apply_to(self, subspace) {
            Ok(fragments) => fragments,
            Err(e) => {
                debug!("{} failed, rolling back: {}", transformation.name(), e);
                self.restore(checkpoint);
                return Err(e);
            }
        };
        debug!("{} produced {} fragment(s)", transformation.name(), fragments.len());
        for fragment in fragments {
            self.append(fragment);
        }
        self.manager.next_stage();
        Ok(())
    }

    /// Apply transformations in order, stopping at the first failure.
    pub fn apply_all(&mut self, transformations: &[Transformation]) -> ScheduleResult<()> {
        transformations.iter().try_for_each(|t| self.apply(t))
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            manager: self.manager.clone(),
            depth: self.depth,
            length_adjustment: self.length_adjustment,
            parallel_subspaces: self.parallel_subspaces.clone(),
        }
    }

    fn restore(&mut self, checkpoint: Checkpoint) {
        self.manager = checkpoint.manager;
        self.depth = checkpoint.depth;
        self.length_adjustment = checkpoint.length_adjustment;
        self.parallel_subspaces = checkpoint.parallel_subspaces;
    }

    fn append(&mut self, fragment: String) {
        if !fragment.is_empty() {
            debug!("fragment M{}: {}", self.transformations.len() + 1, fragment);
            self.transformations.push(fragment);
        }
    }

    /// One iscc set per nest, in chain order.
    pub fn domains(&self) -> &[String] {
        &self.domains
    }

    /// Maps in application order; the first one is the embedding.
    pub fn transformations(&self) -> &[String] {
        &self.transformations
    }

    pub fn chain(&self) -> &LoopChain {
        &self.chain
    }

    pub fn statement_prefix(&self) -> &str {
        &self.statement_prefix
    }

    pub fn root_statement_symbol(&self) -> &str {
        &self.root_statement_symbol
    }

    pub fn iterator_prefix(&self) -> &str {
        &self.iterator_prefix
    }

    pub fn subspace_manager(&self) -> &SubspaceManager {
        &self.manager
    }

    pub fn subspace_manager_mut(&mut self) -> &mut SubspaceManager {
        &mut self.manager
    }

    /// Width of the global iteration vector.
    pub fn iterators_length(&self) -> usize {
        (self.manager.size() as i64 + self.length_adjustment).max(0) as usize
    }

    /// Adjust the global width by `delta`, returning the new width.
    #[track_caller]
    pub fn modify_iterators_length(&mut self, delta: i64) -> Result<usize, ConfigError> {
        let length = self.manager.size() as i64 + self.length_adjustment + delta;
        if length < 0 {
            return Err(ConfigError::new(
                ConfigErrorKind::NegativeIteratorLength,
                format!(
                    "Cannot change iterator length {} by {}",
                    self.iterators_length(),
                    delta
                ),
            ));
        }
        self.length_adjustment += delta;
        Ok(self.iterators_length())
    }

    /// Tile nesting depth of the transformation being applied.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn increment_depth(&mut self) -> usize {
        self.depth += 1;
        self.depth
    }

    pub fn decrement_depth(&mut self) -> usize {
        self.depth = self.depth.saturating_sub(1);
        self.depth
    }

    /// Mark the loop over the iterator `additional_depth` places into
    /// `subspace` as parallel.
    pub fn add_parallel_subspace(&mut self, subspace: SubspaceId, additional_depth: usize) {
        self.parallel_subspaces.insert(subspace, additional_depth);
    }

    /// Global coordinate positions of the parallel loops.
    pub fn parallel_dimensions(&self) -> BTreeSet<usize> {
        self.parallel_subspaces
            .iter()
            .filter_map(|(&id, &extra)| self.manager.offset_of(id).map(|offset| offset + extra))
            .collect()
    }

    /// The iscc program generating this schedule's code.
    pub fn codegen_to_iscc(&self) -> String {
        let separate = self
            .manager
            .get(self.manager.nest())
            .map(|nest| nest.const_base_name().to_string())
            .unwrap_or_default();
        iscc::codegen_script(
            &self.domains,
            &self.transformations,
            &self.manager.input_iterators(),
            &separate,
        )
    }

    /// Generate the loop AST through iscc, with parallel loops marked.
    ///
    /// Iterators keep iscc's `c<d>` names, `d` being the schedule coordinate
    /// the loop scans.
    pub fn codegen_ast(&self) -> ScheduleResult<AstNode> {
        if self.domains.is_empty() {
            return Ok(AstNode::Block(Vec::new()));
        }
        let output = isl::run_isl(&self.codegen_to_iscc())?;
        self.ast_from_output(&output)
    }

    /// Read the code iscc printed for [`Schedule::codegen_to_iscc`] back as
    /// a loop AST, with parallel loops marked.
    pub fn ast_from_output(&self, output: &str) -> ScheduleResult<AstNode> {
        let mut ast = isl::parse_iscc_output(output)?;
        ast.mark_parallel(&self.parallel_dimensions());
        Ok(ast)
    }

    /// Generate C-like code with default options.
    pub fn codegen(&self) -> ScheduleResult<String> {
        self.codegen_with(&CodegenOptions::default())
    }

    /// Generate C-like code.
    pub fn codegen_with(&self, options: &CodegenOptions) -> ScheduleResult<String> {
        let ast = self.codegen_ast()?;
        Ok(self.print(ast, options))
    }

    /// Like [`Schedule::codegen_with`], starting from output iscc already
    /// printed for this schedule's script.
    pub fn codegen_from_output(
        &self,
        output: &str,
        options: &CodegenOptions,
    ) -> ScheduleResult<String> {
        let ast = self.ast_from_output(output)?;
        Ok(self.print(ast, options))
    }

    fn print(&self, mut ast: AstNode, options: &CodegenOptions) -> String {
        ast.rename_iterators(&self.iterator_prefix);
        print_c(&ast, options)
    }

    /// Generate code and write it to `path`.
    pub fn codegen_to_file(&self, path: impl AsRef<Path>) -> ScheduleResult<()> {
        let code = self.codegen()?;
        std::fs::write(path.as_ref(), code)?;
        info!("wrote generated code to {}", path.as_ref().display());
        Ok(())
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.codegen_to_iscc())
    }
}
