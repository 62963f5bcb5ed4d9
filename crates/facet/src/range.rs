//! Numeric range facet.

use serde::{Deserialize, Serialize};

use gridworks_model::{CellValue, ColumnModel, Row};

use crate::expr::{EvalValue, Expression};
use crate::filter::{AllRowsRecordFilter, AnyRowRecordFilter, RecordFilter, RowFilter};
use crate::numeric::NumericBinIndex;

fn default_expression() -> String {
    "value".into()
}

fn default_true() -> bool {
    true
}

/// Immutable range facet configuration. With no `from`/`to` bound and all
/// four classification buckets selected, the facet does not constrain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RangeFacetConfig {
    pub name: String,
    #[serde(default = "default_expression")]
    pub expression: String,
    pub column_name: String,
    #[serde(default)]
    pub invert: bool,
    /// Selected numeric range, inclusive start, exclusive end.
    #[serde(default)]
    pub from: Option<f64>,
    #[serde(default)]
    pub to: Option<f64>,
    #[serde(default = "default_true")]
    pub select_numeric: bool,
    #[serde(default = "default_true")]
    pub select_non_numeric: bool,
    #[serde(default = "default_true")]
    pub select_blank: bool,
    #[serde(default = "default_true")]
    pub select_error: bool,
}

/// Recomputed state for one range facet. `min`/`max`/`step`/`bins` are only
/// present when the column actually held numeric values and the facet has no
/// configuration error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RangeFacetResult {
    pub name: String,
    pub column_name: String,
    pub expression: String,
    pub invert: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bins: Option<Vec<u64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numeric_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub non_numeric_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blank_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_count: Option<u64>,
}

/// A range facet resolved against a concrete column model.
pub struct RangeFacet {
    pub config: RangeFacetConfig,
    cell_index: usize,
    expr: Option<Expression>,
    error: Option<String>,
}

impl RangeFacet {
    pub fn resolve(config: RangeFacetConfig, columns: &ColumnModel) -> RangeFacet {
        let mut error = None;

        let cell_index = match columns.column_index(&config.column_name) {
            Some(i) => i,
            None => {
                error = Some(format!("No column named {}", config.column_name));
                0
            }
        };

        let expr = match Expression::parse(&config.expression) {
            Ok(e) => Some(e),
            Err(e) => {
                error.get_or_insert(e.to_string());
                None
            }
        };

        RangeFacet {
            config,
            cell_index,
            expr,
            error,
        }
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn evaluate(&self, row: &Row) -> EvalValue {
        match &self.expr {
            Some(expr) => expr.evaluate(row.value(self.cell_index)),
            None => EvalValue::Blank,
        }
    }

    fn is_constraining(&self) -> bool {
        let c = &self.config;
        c.from.is_some()
            || c.to.is_some()
            || !c.select_numeric
            || !c.select_non_numeric
            || !c.select_blank
            || !c.select_error
    }

    pub fn row_filter(&self) -> Option<Box<dyn RowFilter>> {
        if self.error.is_some() || !self.is_constraining() {
            return None;
        }
        let expr = self.expr.clone()?;
        let c = &self.config;
        Some(Box::new(ExpressionNumericRowFilter {
            expr,
            cell_index: self.cell_index,
            from: c.from,
            to: c.to,
            select_numeric: c.select_numeric,
            select_non_numeric: c.select_non_numeric,
            select_blank: c.select_blank,
            select_error: c.select_error,
            invert: c.invert,
        }))
    }

    pub fn record_filter(&self) -> Option<Box<dyn RecordFilter>> {
        let row_filter = self.row_filter()?;
        Some(if self.config.invert {
            Box::new(AllRowsRecordFilter { row_filter })
        } else {
            Box::new(AnyRowRecordFilter { row_filter })
        })
    }

    pub fn compute_result(&self, index: &NumericBinIndex) -> RangeFacetResult {
        let mut result = RangeFacetResult {
            name: self.config.name.clone(),
            column_name: self.config.column_name.clone(),
            expression: self.config.expression.clone(),
            invert: self.config.invert,
            error: self.error.clone(),
            min: None,
            max: None,
            step: None,
            bins: None,
            numeric_count: None,
            non_numeric_count: None,
            blank_count: None,
            error_count: None,
        };
        if result.error.is_some() {
            return result;
        }

        result.numeric_count = Some(index.numeric_count());
        result.non_numeric_count = Some(index.non_numeric_count);
        result.blank_count = Some(index.blank_count);
        result.error_count = Some(index.error_count);
        if let Some(stats) = index.finalize() {
            result.min = Some(stats.min);
            result.max = Some(stats.max);
            result.step = Some(stats.step);
            result.bins = Some(stats.bins);
        }
        result
    }
}

struct ExpressionNumericRowFilter {
    expr: Expression,
    cell_index: usize,
    from: Option<f64>,
    to: Option<f64>,
    select_numeric: bool,
    select_non_numeric: bool,
    select_blank: bool,
    select_error: bool,
    invert: bool,
}

impl RowFilter for ExpressionNumericRowFilter {
    fn matches(&self, _row_index: u64, row: &Row) -> bool {
        let hit = match self.expr.evaluate(row.value(self.cell_index)) {
            EvalValue::Blank => self.select_blank,
            EvalValue::Error(_) => self.select_error,
            EvalValue::Value(CellValue::Number(n)) => {
                self.select_numeric
                    && self.from.map_or(true, |f| n >= f)
                    && self.to.map_or(true, |t| n < t)
            }
            EvalValue::Value(_) => self.select_non_numeric,
        };
        hit != self.invert
    }
}
