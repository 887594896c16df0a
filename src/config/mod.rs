//! JSON pipeline descriptions.
//!
//! ```json
//! {
//!   "nests": [
//!     { "bounds": [["1", "N"]], "symbols": ["N"],
//!       "dataspaces": [{ "name": "A", "reads": [[-1], [0], [1]], "writes": [] },
//!                      { "name": "B", "reads": [], "writes": [[0]] }] },
//!     { "bounds": [["1", "N"]], "symbols": ["N"],
//!       "dataspaces": [{ "name": "B", "reads": [[-1], [0], [1]], "writes": [] },
//!                      { "name": "A", "reads": [], "writes": [[0]] }] }
//!   ],
//!   "transformations": [
//!     { "kind": "automatic_shift" },
//!     { "kind": "fusion", "loops": [0, 1] }
//!   ]
//! }
//! ```

use crate::codegen::CodegenOptions;
use crate::ilp::BranchAndBound;
use crate::ir::{Dataspace, LoopChain, LoopNest, RectangularDomain, Tuple, TupleCollection};
use crate::schedule::{Schedule, DEFAULT_ITERATOR_PREFIX, DEFAULT_STATEMENT_PREFIX};
use crate::transform::{
    AutomaticShift, Fusion, Identity, ParallelAnnotation, Shift, Tile, TileSizes, Transformation,
    Wavefront,
};
use crate::utils::errors::{ConfigError, ConfigErrorKind, ScheduleResult};
use log::info;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// A bound, extent or tile size: an integer or an affine expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Expr {
    Int(i64),
    Text(String),
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Int(n) => write!(f, "{}", n),
            Expr::Text(s) => write!(f, "{}", s),
        }
    }
}

fn texts(exprs: &[Expr]) -> Vec<String> {
    exprs.iter().map(Expr::to_string).collect()
}

fn default_iterator_prefix() -> String {
    DEFAULT_ITERATOR_PREFIX.to_string()
}

/// A whole scheduling run: the chain, the pipeline and output options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub statement_prefix: String,
    #[serde(default = "default_iterator_prefix")]
    pub iterator_prefix: String,
    pub nests: Vec<NestConfig>,
    #[serde(default)]
    pub transformations: Vec<TransformConfig>,
    #[serde(default)]
    pub codegen: CodegenOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NestConfig {
    /// `[lower, upper]` per dimension, outermost first
    pub bounds: Vec<(Expr, Expr)>,
    #[serde(default)]
    pub symbols: Vec<String>,
    #[serde(default)]
    pub dataspaces: Vec<DataspaceConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataspaceConfig {
    pub name: String,
    #[serde(default)]
    pub reads: Vec<Vec<i64>>,
    #[serde(default)]
    pub writes: Vec<Vec<i64>>,
    /// Access width; required when there are neither reads nor writes
    #[serde(default)]
    pub dimensions: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransformConfig {
    Identity,
    Shift {
        loop_id: usize,
        extents: Vec<Expr>,
        #[serde(default)]
        symbols: Vec<String>,
    },
    Fusion {
        loops: Vec<usize>,
    },
    Tile {
        loop_id: usize,
        #[serde(default)]
        size: Option<Expr>,
        #[serde(default)]
        sizes: Option<Vec<Expr>>,
        #[serde(default)]
        over: Vec<TransformConfig>,
        #[serde(default)]
        within: Vec<TransformConfig>,
    },
    Wavefront,
    Parallel {
        #[serde(default)]
        additional_depth: usize,
    },
    AutomaticShift {
        #[serde(default)]
        include_zero: bool,
        #[serde(default)]
        node_limit: Option<usize>,
    },
}

impl DataspaceConfig {
    fn build(&self) -> ScheduleResult<Dataspace> {
        let width = self
            .dimensions
            .or_else(|| self.reads.iter().chain(&self.writes).next().map(Vec::len))
            .ok_or_else(|| {
                ConfigError::new(
                    ConfigErrorKind::InvalidPipeline,
                    format!("Dataspace {} has no accesses and no dimensions", self.name),
                )
            })?;
        let collect = |offsets: &[Vec<i64>]| {
            TupleCollection::with_dimensions(offsets.iter().map(|o| Tuple::new(o.clone())), width)
        };
        Ok(Dataspace::new(&self.name, collect(&self.reads)?, collect(&self.writes)?)?)
    }
}

impl NestConfig {
    fn build(&self) -> ScheduleResult<LoopNest> {
        let bounds = self.bounds.iter().map(|(lo, up)| (lo.to_string(), up.to_string()));
        let domain = RectangularDomain::new(bounds, self.symbols.iter().cloned())?;
        let dataspaces = self
            .dataspaces
            .iter()
            .map(DataspaceConfig::build)
            .collect::<ScheduleResult<Vec<_>>>()?;
        Ok(LoopNest::with_dataspaces(domain, dataspaces))
    }
}

impl TransformConfig {
    pub fn build(&self) -> ScheduleResult<Transformation> {
        Ok(match self {
            TransformConfig::Identity => Identity.into(),
            TransformConfig::Shift {
                loop_id,
                extents,
                symbols,
            } => Shift::with_symbols(*loop_id, texts(extents), symbols.clone()).into(),
            TransformConfig::Fusion { loops } => Fusion::new(loops.clone()).into(),
            TransformConfig::Tile {
                loop_id,
                size,
                sizes,
                over,
                within,
            } => {
                let sizes = match (size, sizes) {
                    (Some(s), None) => TileSizes::Uniform(s.to_string()),
                    (None, Some(v)) => TileSizes::PerDimension(texts(v)),
                    _ => {
                        return Err(ConfigError::new(
                            ConfigErrorKind::InvalidPipeline,
                            "A tile takes exactly one of size or sizes",
                        )
                        .in_transform("tile")
                        .into())
                    }
                };
                Tile::new(*loop_id, sizes)
                    .with_over(build_all(over)?)
                    .with_within(build_all(within)?)
                    .into()
            }
            TransformConfig::Wavefront => Wavefront.into(),
            TransformConfig::Parallel { additional_depth } => {
                ParallelAnnotation::new(*additional_depth).into()
            }
            TransformConfig::AutomaticShift {
                include_zero,
                node_limit,
            } => {
                let solver = node_limit.map(BranchAndBound::new).unwrap_or_default();
                AutomaticShift::new(*include_zero).with_solver(solver).into()
            }
        })
    }
}

fn build_all(configs: &[TransformConfig]) -> ScheduleResult<Vec<Transformation>> {
    configs.iter().map(TransformConfig::build).collect()
}

impl PipelineConfig {
    pub fn from_json(text: &str) -> ScheduleResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> ScheduleResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        info!("loaded pipeline {}", path.as_ref().display());
        Self::from_json(&text)
    }

    pub fn build_chain(&self) -> ScheduleResult<LoopChain> {
        self.nests.iter().map(NestConfig::build).collect()
    }

    pub fn build_transformations(&self) -> ScheduleResult<Vec<Transformation>> {
        build_all(&self.transformations)
    }

    /// The schedule with every configured transformation applied.
    pub fn build_schedule(&self) -> ScheduleResult<Schedule> {
        let transformations = self.build_transformations()?;
        let mut schedule = Schedule::with_prefixes(
            self.build_chain()?,
            &self.statement_prefix,
            &self.iterator_prefix,
        );
        schedule.apply_all(&transformations)?;
        info!("applied {} transformation(s)", transformations.len());
        Ok(schedule)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            statement_prefix: DEFAULT_STATEMENT_PREFIX.to_string(),
            iterator_prefix: default_iterator_prefix(),
            nests: Vec::new(),
            transformations: Vec::new(),
            codegen: CodegenOptions::default(),
        }
    }
}
