//! Facet engine.
//!
//! A facet is an immutable configuration (expression, target column,
//! selection) resolved against a column model into an evaluator. The engine
//! combines every facet's predicate with AND to filter the grid, and
//! recomputes each facet's own choice statistics against all *other* facets'
//! predicates, so the UI can show what picking a choice would do.
//!
//! Key invariants:
//! - Facet state is rebuilt on every query; nothing is cached across grids
//! - Partial per-partition statistics merge associatively and commutatively
//! - A configuration error is scoped to its facet; the query still completes

pub mod engine;
pub mod expr;
pub mod filter;
pub mod grouper;
pub mod list;
pub mod numeric;
pub mod range;

pub use engine::{Engine, EngineConfig, EngineMode, EngineResult, FacetResult};
pub use expr::{EvalValue, Expression, ParseError};
pub use filter::{ConjunctiveRecordFilter, ConjunctiveRowFilter, RecordFilter, RowFilter};
pub use list::{FacetChoice, ListFacet, ListFacetConfig, ListFacetResult, OtherChoice};
pub use range::{RangeFacet, RangeFacetConfig, RangeFacetResult};

use serde::{Deserialize, Serialize};

/// Tagged facet configuration, the closed registry of facet types.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FacetConfig {
    List(ListFacetConfig),
    Range(RangeFacetConfig),
}

impl FacetConfig {
    pub fn from_json(json: &str) -> Result<FacetConfig, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn name(&self) -> &str {
        match self {
            FacetConfig::List(c) => &c.name,
            FacetConfig::Range(c) => &c.name,
        }
    }
}
