//! Nominal value grouping.
//!
//! Counters are plain sums over maps keyed by the value's string form, so
//! merging two partial groupers is associative and commutative: partition
//! order can never change the final counts.

use rustc_hash::FxHashMap;

use crate::expr::EvalValue;

/// Per-choice counts plus blank/error buckets for one facet's expression
/// over a set of rows.
#[derive(Debug, Clone, Default)]
pub struct NominalGrouper {
    pub choices: FxHashMap<String, u64>,
    pub blank_count: u64,
    pub error_count: u64,
}

impl NominalGrouper {
    pub fn new() -> Self {
        NominalGrouper::default()
    }

    pub fn feed(&mut self, value: &EvalValue) {
        match value {
            EvalValue::Blank => self.blank_count += 1,
            EvalValue::Error(_) => self.error_count += 1,
            EvalValue::Value(v) => {
                *self.choices.entry(v.display()).or_insert(0) += 1;
            }
        }
    }

    pub fn merge(mut self, other: NominalGrouper) -> NominalGrouper {
        for (key, count) in other.choices {
            *self.choices.entry(key).or_insert(0) += count;
        }
        self.blank_count += other.blank_count;
        self.error_count += other.error_count;
        self
    }

    pub fn distinct_count(&self) -> usize {
        self.choices.len()
    }
}
