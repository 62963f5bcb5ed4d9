//! Nominal list facet.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use gridworks_model::{ColumnModel, Row};

use crate::expr::{EvalValue, Expression};
use crate::filter::{AllRowsRecordFilter, AnyRowRecordFilter, RecordFilter, RowFilter};
use crate::grouper::NominalGrouper;

pub const ERR_TOO_MANY_CHOICES: &str = "Too many choices";

fn default_expression() -> String {
    "value".into()
}

/// Immutable list facet configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListFacetConfig {
    pub name: String,
    #[serde(default = "default_expression")]
    pub expression: String,
    pub column_name: String,
    #[serde(default)]
    pub invert: bool,
    /// Hide the blank / error buckets from the output entirely.
    #[serde(default)]
    pub omit_blank: bool,
    #[serde(default)]
    pub omit_error: bool,
    /// Selected choices, by the string form of the evaluated value.
    #[serde(default)]
    pub selection: Vec<String>,
    #[serde(default)]
    pub select_blank: bool,
    #[serde(default)]
    pub select_error: bool,
}

/// A choice with its recomputed count and selection status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetChoice {
    pub value: String,
    pub count: u64,
    pub selected: bool,
}

/// Count and selection status for the blank / error buckets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OtherChoice {
    pub selected: bool,
    pub count: u64,
}

/// Recomputed state for one list facet. Field presence rules: when `error`
/// is set, `choices` and the blank/error choices are all suppressed;
/// `choice_count` is only reported when the distinct count exceeds the limit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListFacetResult {
    pub name: String,
    pub column_name: String,
    pub expression: String,
    pub invert: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub choice_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<FacetChoice>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blank_choice: Option<OtherChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_choice: Option<OtherChoice>,
}

/// A list facet resolved against a concrete column model.
pub struct ListFacet {
    pub config: ListFacetConfig,
    cell_index: usize,
    expr: Option<Expression>,
    error: Option<String>,
}

impl ListFacet {
    pub fn resolve(config: ListFacetConfig, columns: &ColumnModel) -> ListFacet {
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

        ListFacet {
            config,
            cell_index,
            expr,
            error,
        }
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Evaluate this facet's expression over one row. Only meaningful when
    /// `error()` is None.
    pub fn evaluate(&self, row: &Row) -> EvalValue {
        match &self.expr {
            Some(expr) => expr.evaluate(row.value(self.cell_index)),
            None => EvalValue::Blank,
        }
    }

    /// The row predicate, or None when this facet does not constrain
    /// (configuration error, or nothing selected).
    pub fn row_filter(&self) -> Option<Box<dyn RowFilter>> {
        if self.error.is_some() {
            return None;
        }
        let expr = self.expr.clone()?;
        let config = &self.config;
        if config.selection.is_empty() && !config.select_blank && !config.select_error {
            return None;
        }
        Some(Box::new(ExpressionEqualRowFilter {
            expr,
            cell_index: self.cell_index,
            matches: config.selection.iter().cloned().collect(),
            select_blank: config.select_blank,
            select_error: config.select_error,
            invert: config.invert,
        }))
    }

    /// The record predicate derived from the row predicate: any-row for a
    /// plain facet, all-rows for an inverted one.
    pub fn record_filter(&self) -> Option<Box<dyn RecordFilter>> {
        let row_filter = self.row_filter()?;
        Some(if self.config.invert {
            Box::new(AllRowsRecordFilter { row_filter })
        } else {
            Box::new(AnyRowRecordFilter { row_filter })
        })
    }

    /// Turn a freshly computed grouping into the facet's visible state.
    pub fn compute_result(&self, grouper: &NominalGrouper, choice_limit: usize) -> ListFacetResult {
        let base = |error: Option<String>| ListFacetResult {
            name: self.config.name.clone(),
            column_name: self.config.column_name.clone(),
            expression: self.config.expression.clone(),
            invert: self.config.invert,
            error,
            choice_count: None,
            choices: None,
            blank_choice: None,
            error_choice: None,
        };

        if let Some(error) = &self.error {
            return base(Some(error.clone()));
        }
        if grouper.distinct_count() > choice_limit {
            let mut result = base(Some(ERR_TOO_MANY_CHOICES.to_string()));
            result.choice_count = Some(grouper.distinct_count());
            return result;
        }

        let selected: FxHashSet<&str> =
            self.config.selection.iter().map(String::as_str).collect();

        let mut choices: Vec<FacetChoice> = grouper
            .choices
            .iter()
            .map(|(value, &count)| FacetChoice {
                value: value.clone(),
                count,
                selected: selected.contains(value.as_str()),
            })
            .collect();
        // Deterministic order regardless of map iteration
        choices.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));

        // A selected choice can legitimately have zero count: other facets'
        // constraints may eliminate every row projecting to it. The grouper
        // cannot see such a choice, so it is injected here; a selection must
        // never vanish from the output.
        for value in &self.config.selection {
            if !grouper.choices.contains_key(value) {
                choices.push(FacetChoice {
                    value: value.clone(),
                    count: 0,
                    selected: true,
                });
            }
        }

        let mut result = base(None);
        result.choices = Some(choices);
        if !self.config.omit_blank && (self.config.select_blank || grouper.blank_count > 0) {
            result.blank_choice = Some(OtherChoice {
                selected: self.config.select_blank,
                count: grouper.blank_count,
            });
        }
        if !self.config.omit_error && (self.config.select_error || grouper.error_count > 0) {
            result.error_choice = Some(OtherChoice {
                selected: self.config.select_error,
                count: grouper.error_count,
            });
        }
        result
    }
}

/// Matches rows whose evaluated value equals one of the selected values, or
/// is blank / an error when those buckets are selected; the whole predicate
/// is then optionally negated.
struct ExpressionEqualRowFilter {
    expr: Expression,
    cell_index: usize,
    matches: FxHashSet<String>,
    select_blank: bool,
    select_error: bool,
    invert: bool,
}

impl RowFilter for ExpressionEqualRowFilter {
    fn matches(&self, _row_index: u64, row: &Row) -> bool {
        let hit = match self.expr.evaluate(row.value(self.cell_index)) {
            EvalValue::Blank => self.select_blank,
            EvalValue::Error(_) => self.select_error,
            EvalValue::Value(v) => self.matches.contains(&v.display()),
        };
        hit != self.invert
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridworks_model::Cell;

    fn config(selection: &[&str]) -> ListFacetConfig {
        ListFacetConfig {
            name: "type".into(),
            expression: "value".into(),
            column_name: "type".into(),
            invert: false,
            omit_blank: false,
            omit_error: false,
            selection: selection.iter().map(|s| s.to_string()).collect(),
            select_blank: false,
            select_error: false,
        }
    }

    fn columns() -> ColumnModel {
        ColumnModel::from_names(&["type"])
    }

    fn row(value: &str) -> Row {
        let cell = if value.is_empty() {
            Cell::blank()
        } else {
            Cell::text(value)
        };
        Row::new(vec![cell])
    }

    #[test]
    fn unknown_column_is_per_facet_error() {
        let mut cfg = config(&[]);
        cfg.column_name = "missing".into();
        let facet = ListFacet::resolve(cfg, &columns());
        assert_eq!(facet.error(), Some("No column named missing"));
        assert!(facet.row_filter().is_none());
        let result = facet.compute_result(&NominalGrouper::new(), 2000);
        assert!(result.error.is_some());
        assert!(result.choices.is_none());
        assert!(result.blank_choice.is_none());
        assert!(result.error_choice.is_none());
    }

    #[test]
    fn bad_expression_is_per_facet_error() {
        let mut cfg = config(&[]);
        cfg.expression = "value.nope()".into();
        let facet = ListFacet::resolve(cfg, &columns());
        assert!(facet.error().is_some());
        assert!(facet.row_filter().is_none());
    }

    #[test]
    fn empty_selection_does_not_constrain() {
        let facet = ListFacet::resolve(config(&[]), &columns());
        assert!(facet.error().is_none());
        assert!(facet.row_filter().is_none());
        assert!(facet.record_filter().is_none());
    }

    #[test]
    fn filter_matches_selection() {
        let facet = ListFacet::resolve(config(&["car"]), &columns());
        let filter = facet.row_filter().unwrap();
        assert!(filter.matches(0, &row("car")));
        assert!(!filter.matches(1, &row("bicycle")));
        assert!(!filter.matches(2, &row("")));
    }

    #[test]
    fn invert_flips_the_whole_predicate() {
        let mut cfg = config(&["car"]);
        cfg.invert = true;
        let facet = ListFacet::resolve(cfg, &columns());
        let filter = facet.row_filter().unwrap();
        assert!(!filter.matches(0, &row("car")));
        assert!(filter.matches(1, &row("bicycle")));
        assert!(filter.matches(2, &row("")));
    }

    #[test]
    fn blank_selection_constrains() {
        let mut cfg = config(&[]);
        cfg.select_blank = true;
        let facet = ListFacet::resolve(cfg, &columns());
        let filter = facet.row_filter().unwrap();
        assert!(filter.matches(0, &row("")));
        assert!(!filter.matches(1, &row("car")));
    }

    #[test]
    fn selection_survives_with_zero_count() {
        let facet = ListFacet::resolve(config(&["bicycle"]), &columns());
        let mut grouper = NominalGrouper::new();
        grouper.feed(&EvalValue::Value(gridworks_model::CellValue::Text(
            "car".into(),
        )));
        let result = facet.compute_result(&grouper, 2000);
        let choices = result.choices.unwrap();
        let bicycle = choices.iter().find(|c| c.value == "bicycle").unwrap();
        assert_eq!(bicycle.count, 0);
        assert!(bicycle.selected);
        let car = choices.iter().find(|c| c.value == "car").unwrap();
        assert_eq!(car.count, 1);
        assert!(!car.selected);
    }

    #[test]
    fn choice_limit_reports_count_only() {
        let facet = ListFacet::resolve(config(&[]), &columns());
        let mut grouper = NominalGrouper::new();
        for i in 0..5 {
            grouper.feed(&EvalValue::Value(gridworks_model::CellValue::Text(
                format!("v{i}"),
            )));
        }
        let result = facet.compute_result(&grouper, 4);
        assert_eq!(result.error.as_deref(), Some(ERR_TOO_MANY_CHOICES));
        assert_eq!(result.choice_count, Some(5));
        assert!(result.choices.is_none());
        assert!(result.blank_choice.is_none());

        let result = facet.compute_result(&grouper, 5);
        assert!(result.error.is_none());
        assert!(result.choice_count.is_none());
        assert_eq!(result.choices.unwrap().len(), 5);
    }

    #[test]
    fn blank_and_error_choices_follow_omit_flags() {
        let mut grouper = NominalGrouper::new();
        grouper.feed(&EvalValue::Blank);
        grouper.feed(&EvalValue::Error("e".into()));

        let facet = ListFacet::resolve(config(&[]), &columns());
        let result = facet.compute_result(&grouper, 2000);
        assert_eq!(
            result.blank_choice,
            Some(OtherChoice { selected: false, count: 1 })
        );
        assert_eq!(
            result.error_choice,
            Some(OtherChoice { selected: false, count: 1 })
        );

        let mut cfg = config(&[]);
        cfg.omit_blank = true;
        cfg.omit_error = true;
        let facet = ListFacet::resolve(cfg, &columns());
        let result = facet.compute_result(&grouper, 2000);
        assert!(result.blank_choice.is_none());
        assert!(result.error_choice.is_none());
    }

    #[test]
    fn choices_sorted_by_count_then_value() {
        let facet = ListFacet::resolve(config(&[]), &columns());
        let mut grouper = NominalGrouper::new();
        for v in ["b", "a", "a", "c"] {
            grouper.feed(&EvalValue::Value(gridworks_model::CellValue::Text(
                v.into(),
            )));
        }
        let choices = facet.compute_result(&grouper, 2000).choices.unwrap();
        let values: Vec<&str> = choices.iter().map(|c| c.value.as_str()).collect();
        assert_eq!(values, vec!["a", "b", "c"]);
    }
}
