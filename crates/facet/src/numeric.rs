//! Numeric bin index for range facets.
//!
//! Accumulation is two-stage: `feed`/`merge` collect raw observations
//! (associative and commutative), `finalize` derives min, max, a power-of-ten
//! bin step sized for a range-selection UI, and per-bin counts.

use crate::expr::EvalValue;
use gridworks_model::CellValue;

/// Partial accumulation of one facet's numeric classification.
#[derive(Debug, Clone, Default)]
pub struct NumericBinIndex {
    values: Vec<f64>,
    pub non_numeric_count: u64,
    pub blank_count: u64,
    pub error_count: u64,
}

/// Finalized histogram statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericBinStats {
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub bins: Vec<u64>,
}

impl NumericBinIndex {
    pub fn new() -> Self {
        NumericBinIndex::default()
    }

    pub fn feed(&mut self, value: &EvalValue) {
        match value {
            EvalValue::Blank => self.blank_count += 1,
            EvalValue::Error(_) => self.error_count += 1,
            EvalValue::Value(CellValue::Number(n)) if n.is_finite() => self.values.push(*n),
            EvalValue::Value(_) => self.non_numeric_count += 1,
        }
    }

    pub fn merge(mut self, other: NumericBinIndex) -> NumericBinIndex {
        self.values.extend(other.values);
        self.non_numeric_count += other.non_numeric_count;
        self.blank_count += other.blank_count;
        self.error_count += other.error_count;
        self
    }

    pub fn numeric_count(&self) -> u64 {
        self.values.len() as u64
    }

    pub fn is_numeric(&self) -> bool {
        !self.values.is_empty()
    }

    /// Compute histogram statistics; None when no numeric values were seen.
    pub fn finalize(&self) -> Option<NumericBinStats> {
        if self.values.is_empty() {
            return None;
        }
        let mut min = f64::MAX;
        let mut max = f64::MIN;
        for &v in &self.values {
            min = min.min(v);
            max = max.max(v);
        }

        let step = bin_step(max - min);
        let from = (min / step).floor();
        let to = (max / step).ceil();
        let bin_count = ((to - from) as usize).max(1);
        let mut bins = vec![0u64; bin_count];
        for &v in &self.values {
            let mut bin = ((v / step).floor() - from) as usize;
            if bin >= bin_count {
                bin = bin_count - 1; // v == max lands on the upper edge
            }
            bins[bin] += 1;
        }

        Some(NumericBinStats {
            min: from * step,
            max: to * step,
            step,
            bins,
        })
    }
}

/// Power of ten keeping the histogram between roughly 10 and 100 bins.
fn bin_step(diff: f64) -> f64 {
    if diff <= 0.0 {
        return 1.0;
    }
    let mut step = 1.0;
    if diff > 10.0 {
        while step * 100.0 < diff {
            step *= 10.0;
        }
    } else {
        while step * 100.0 > diff && step > f64::MIN_POSITIVE {
            step /= 10.0;
        }
        step *= 10.0;
    }
    step
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: f64) -> EvalValue {
        EvalValue::Value(CellValue::Number(n))
    }

    #[test]
    fn classification_counts() {
        let mut idx = NumericBinIndex::new();
        idx.feed(&num(1.0));
        idx.feed(&EvalValue::Value(CellValue::Text("abc".into())));
        idx.feed(&EvalValue::Blank);
        idx.feed(&EvalValue::Error("e".into()));
        assert_eq!(idx.numeric_count(), 1);
        assert_eq!(idx.non_numeric_count, 1);
        assert_eq!(idx.blank_count, 1);
        assert_eq!(idx.error_count, 1);
    }

    #[test]
    fn no_numeric_values_yields_none() {
        let mut idx = NumericBinIndex::new();
        idx.feed(&EvalValue::Blank);
        assert!(idx.finalize().is_none());
        assert!(!idx.is_numeric());
    }

    #[test]
    fn bins_cover_the_range() {
        let mut idx = NumericBinIndex::new();
        for v in [0.0, 5.0, 10.0, 55.0, 99.0] {
            idx.feed(&num(v));
        }
        let stats = idx.finalize().unwrap();
        assert_eq!(stats.step, 1.0);
        assert!(stats.min <= 0.0);
        assert!(stats.max >= 99.0);
        assert_eq!(stats.bins.iter().sum::<u64>(), 5);
    }

    #[test]
    fn wide_range_scales_step_up() {
        let mut idx = NumericBinIndex::new();
        idx.feed(&num(0.0));
        idx.feed(&num(25_000.0));
        let stats = idx.finalize().unwrap();
        assert_eq!(stats.step, 1000.0);
    }

    #[test]
    fn single_value_is_one_bin() {
        let mut idx = NumericBinIndex::new();
        idx.feed(&num(7.0));
        let stats = idx.finalize().unwrap();
        assert_eq!(stats.bins.iter().sum::<u64>(), 1);
    }

    #[test]
    fn merge_matches_sequential() {
        let values = [3.0, 9.0, 14.0, 2.0, 80.0, 41.0];
        let mut whole = NumericBinIndex::new();
        for v in values {
            whole.feed(&num(v));
        }
        let mut left = NumericBinIndex::new();
        let mut right = NumericBinIndex::new();
        for v in &values[..3] {
            left.feed(&num(*v));
        }
        for v in &values[3..] {
            right.feed(&num(*v));
        }
        // merge order must not matter
        assert_eq!(
            right.clone().merge(left.clone()).finalize(),
            whole.finalize()
        );
        assert_eq!(left.merge(right).finalize(), whole.finalize());
    }
}
