//! Engine entry point: applies a set of facet configurations to a grid.
//!
//! Each facet's statistics are computed against the conjunction of every
//! *other* facet's predicate, never its own, so the returned counts answer
//! "what would happen if I picked this choice". Per-partition partials are
//! merged with associative, commutative sums; partition order cannot change
//! the result.

use std::fmt;

use serde::{Deserialize, Serialize};

use gridworks_model::{Grid, Record};

use crate::filter::{RecordFilter, RowFilter};
use crate::grouper::NominalGrouper;
use crate::list::{ListFacet, ListFacetResult};
use crate::numeric::NumericBinIndex;
use crate::range::{RangeFacet, RangeFacetResult};
use crate::FacetConfig;

pub const DEFAULT_CHOICE_LIMIT: usize = 2000;

/// Rows per partition when accumulating facet statistics.
const PARTITION_SIZE: usize = 8192;

/// Whether predicates and statistics work on individual rows or on records
/// grouped by a key column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum EngineMode {
    Rows,
    Records { key_column: String },
}

impl Default for EngineMode {
    fn default() -> Self {
        EngineMode::Rows
    }
}

/// Explicit engine configuration, threaded into every query. There is no
/// ambient global limit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(flatten, default)]
    pub mode: EngineMode,
    #[serde(default = "default_choice_limit")]
    pub choice_limit: usize,
}

fn default_choice_limit() -> usize {
    DEFAULT_CHOICE_LIMIT
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            mode: EngineMode::Rows,
            choice_limit: DEFAULT_CHOICE_LIMIT,
        }
    }
}

#[derive(Debug)]
pub enum EngineError {
    /// The record-mode key column does not exist in the grid.
    UnknownKeyColumn(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownKeyColumn(name) => write!(f, "no column named {name} to group records by"),
        }
    }
}

impl std::error::Error for EngineError {}

/// Recomputed state for one facet.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FacetResult {
    List(ListFacetResult),
    Range(RangeFacetResult),
}

/// The answer to one query: per-facet statistics plus the filtered view size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineResult {
    pub total_rows: u64,
    pub matching_rows: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_records: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matching_records: Option<u64>,
    pub facets: Vec<FacetResult>,
}

enum Facet {
    List(ListFacet),
    Range(RangeFacet),
}

impl Facet {
    fn resolve(config: FacetConfig, grid: &Grid) -> Facet {
        match config {
            FacetConfig::List(c) => Facet::List(ListFacet::resolve(c, grid.columns())),
            FacetConfig::Range(c) => Facet::Range(RangeFacet::resolve(c, grid.columns())),
        }
    }

    fn error(&self) -> Option<&str> {
        match self {
            Facet::List(f) => f.error(),
            Facet::Range(f) => f.error(),
        }
    }

    fn row_filter(&self) -> Option<Box<dyn RowFilter>> {
        match self {
            Facet::List(f) => f.row_filter(),
            Facet::Range(f) => f.row_filter(),
        }
    }

    fn record_filter(&self) -> Option<Box<dyn RecordFilter>> {
        match self {
            Facet::List(f) => f.record_filter(),
            Facet::Range(f) => f.record_filter(),
        }
    }
}

/// One query over one grid. Facet state lives only for the duration of the
/// query; a new query rebuilds everything.
pub struct Engine<'a> {
    grid: &'a Grid,
    facets: Vec<Facet>,
    config: EngineConfig,
    key_column: Option<usize>,
}

impl<'a> Engine<'a> {
    pub fn new(
        grid: &'a Grid,
        facet_configs: Vec<FacetConfig>,
        config: EngineConfig,
    ) -> Result<Engine<'a>, EngineError> {
        let key_column = match &config.mode {
            EngineMode::Rows => None,
            EngineMode::Records { key_column } => Some(
                grid.columns()
                    .column_index(key_column)
                    .ok_or_else(|| EngineError::UnknownKeyColumn(key_column.clone()))?,
            ),
        };
        let facets = facet_configs
            .into_iter()
            .map(|c| Facet::resolve(c, grid))
            .collect();
        Ok(Engine {
            grid,
            facets,
            config,
            key_column,
        })
    }

    /// Recompute every facet's statistics and the filtered view size.
    pub fn run(&self) -> EngineResult {
        let facet_results = self
            .facets
            .iter()
            .enumerate()
            .map(|(i, facet)| self.compute_facet(i, facet))
            .collect();

        let matching = self.matching_row_indices();
        let (total_records, matching_records) = match self.key_column {
            None => (None, None),
            Some(key) => {
                let records = self.grid.records(key);
                let filters: Vec<Box<dyn RecordFilter>> =
                    self.facets.iter().filter_map(|f| f.record_filter()).collect();
                let matching_records = records
                    .iter()
                    .filter(|r| filters.iter().all(|f| f.matches(**r, self.grid)))
                    .count() as u64;
                (Some(records.len() as u64), Some(matching_records))
            }
        };

        EngineResult {
            total_rows: self.grid.row_count() as u64,
            matching_rows: matching.len() as u64,
            total_records,
            matching_records,
            facets: facet_results,
        }
    }

    /// Indices of rows in the filtered view, in stable order. In record mode
    /// these are all rows of the matching records.
    pub fn matching_row_indices(&self) -> Vec<u64> {
        match self.key_column {
            None => {
                let filters: Vec<Box<dyn RowFilter>> =
                    self.facets.iter().filter_map(|f| f.row_filter()).collect();
                self.grid
                    .iter_indexed()
                    .filter(|ir| filters.iter().all(|f| f.matches(ir.index, ir.row)))
                    .map(|ir| ir.index)
                    .collect()
            }
            Some(key) => {
                let filters: Vec<Box<dyn RecordFilter>> =
                    self.facets.iter().filter_map(|f| f.record_filter()).collect();
                self.grid
                    .records(key)
                    .into_iter()
                    .filter(|r| filters.iter().all(|f| f.matches(*r, self.grid)))
                    .flat_map(|r| r.row_indices())
                    .collect()
            }
        }
    }

    /// Statistics for facet `index`, computed over rows passing every other
    /// facet's predicate.
    fn compute_facet(&self, index: usize, facet: &Facet) -> FacetResult {
        // A broken facet computes nothing; the query itself is unaffected.
        if facet.error().is_some() {
            return match facet {
                Facet::List(f) => {
                    FacetResult::List(f.compute_result(&NominalGrouper::new(), self.config.choice_limit))
                }
                Facet::Range(f) => FacetResult::Range(f.compute_result(&NumericBinIndex::new())),
            };
        }

        match self.key_column {
            None => {
                let others: Vec<Box<dyn RowFilter>> = self
                    .facets
                    .iter()
                    .enumerate()
                    .filter(|(j, _)| *j != index)
                    .filter_map(|(_, f)| f.row_filter())
                    .collect();
                self.accumulate_rows(facet, &others)
            }
            Some(key) => {
                let others: Vec<Box<dyn RecordFilter>> = self
                    .facets
                    .iter()
                    .enumerate()
                    .filter(|(j, _)| *j != index)
                    .filter_map(|(_, f)| f.record_filter())
                    .collect();
                self.accumulate_records(facet, key, &others)
            }
        }
    }

    fn accumulate_rows(&self, facet: &Facet, others: &[Box<dyn RowFilter>]) -> FacetResult {
        let partition_count = 1 + self.grid.row_count() / PARTITION_SIZE;
        match facet {
            Facet::List(f) => {
                let grouper = self
                    .grid
                    .partitions(partition_count)
                    .into_iter()
                    .map(|p| {
                        let mut partial = NominalGrouper::new();
                        for ir in p.iter_indexed() {
                            if others.iter().all(|o| o.matches(ir.index, ir.row)) {
                                partial.feed(&f.evaluate(ir.row));
                            }
                        }
                        partial
                    })
                    .fold(NominalGrouper::new(), NominalGrouper::merge);
                FacetResult::List(f.compute_result(&grouper, self.config.choice_limit))
            }
            Facet::Range(f) => {
                let bins = self
                    .grid
                    .partitions(partition_count)
                    .into_iter()
                    .map(|p| {
                        let mut partial = NumericBinIndex::new();
                        for ir in p.iter_indexed() {
                            if others.iter().all(|o| o.matches(ir.index, ir.row)) {
                                partial.feed(&f.evaluate(ir.row));
                            }
                        }
                        partial
                    })
                    .fold(NumericBinIndex::new(), NumericBinIndex::merge);
                FacetResult::Range(f.compute_result(&bins))
            }
        }
    }

    fn accumulate_records(
        &self,
        facet: &Facet,
        key: usize,
        others: &[Box<dyn RecordFilter>],
    ) -> FacetResult {
        let records: Vec<Record> = self
            .grid
            .records(key)
            .into_iter()
            .filter(|r| others.iter().all(|f| f.matches(*r, self.grid)))
            .collect();

        match facet {
            Facet::List(f) => {
                let mut grouper = NominalGrouper::new();
                for record in records {
                    for row in self.grid.record_rows(record) {
                        grouper.feed(&f.evaluate(row));
                    }
                }
                FacetResult::List(f.compute_result(&grouper, self.config.choice_limit))
            }
            Facet::Range(f) => {
                let mut bins = NumericBinIndex::new();
                for record in records {
                    for row in self.grid.record_rows(record) {
                        bins.feed(&f.evaluate(row));
                    }
                }
                FacetResult::Range(f.compute_result(&bins))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::list::ListFacetConfig;
    use crate::range::RangeFacetConfig;
    use gridworks_model::{Cell, ColumnModel, Row};

    fn vehicle_grid() -> Grid {
        let columns = ColumnModel::from_names(&["type", "wheels"]);
        let rows = vec![
            ("car", 4.0),
            ("car", 4.0),
            ("bicycle", 2.0),
            ("truck", 6.0),
            ("bicycle", 2.0),
        ]
        .into_iter()
        .map(|(t, w)| Row::new(vec![Cell::text(t), Cell::number(w)]))
        .collect();
        Grid::new(columns, rows)
    }

    fn list_config(selection: &[&str]) -> FacetConfig {
        FacetConfig::List(ListFacetConfig {
            name: "type".into(),
            expression: "value".into(),
            column_name: "type".into(),
            invert: false,
            omit_blank: false,
            omit_error: false,
            selection: selection.iter().map(|s| s.to_string()).collect(),
            select_blank: false,
            select_error: false,
        })
    }

    fn wheels_config(from: Option<f64>, to: Option<f64>) -> FacetConfig {
        FacetConfig::Range(RangeFacetConfig {
            name: "wheels".into(),
            expression: "value".into(),
            column_name: "wheels".into(),
            invert: false,
            from,
            to,
            select_numeric: true,
            select_non_numeric: true,
            select_blank: true,
            select_error: true,
        })
    }

    fn list_result(result: &FacetResult) -> &ListFacetResult {
        match result {
            FacetResult::List(r) => r,
            _ => panic!("expected list facet"),
        }
    }

    #[test]
    fn facet_counts_ignore_own_constraint() {
        let grid = vehicle_grid();
        let engine = Engine::new(
            &grid,
            vec![list_config(&["car"])],
            EngineConfig::default(),
        )
        .unwrap();
        let result = engine.run();
        assert_eq!(result.matching_rows, 2);
        // The facet's own selection does not reduce its own choice counts.
        let choices = list_result(&result.facets[0]).choices.clone().unwrap();
        let bicycle = choices.iter().find(|c| c.value == "bicycle").unwrap();
        assert_eq!(bicycle.count, 2);
    }

    #[test]
    fn other_facets_constrain_and_selection_survives() {
        // Select both car and bicycle, then constrain wheels > 2: the
        // bicycle choice drops to zero count but stays selected.
        let grid = vehicle_grid();
        let engine = Engine::new(
            &grid,
            vec![
                list_config(&["car", "bicycle"]),
                wheels_config(Some(3.0), None),
            ],
            EngineConfig::default(),
        )
        .unwrap();
        let result = engine.run();
        let choices = list_result(&result.facets[0]).choices.clone().unwrap();
        let bicycle = choices.iter().find(|c| c.value == "bicycle").unwrap();
        assert_eq!(bicycle.count, 0);
        assert!(bicycle.selected);
        let car = choices.iter().find(|c| c.value == "car").unwrap();
        assert_eq!(car.count, 2);
        // combined view: car rows only
        assert_eq!(result.matching_rows, 2);
    }

    #[test]
    fn broken_facet_leaves_others_working() {
        let grid = vehicle_grid();
        let mut bad = list_config(&[]);
        if let FacetConfig::List(c) = &mut bad {
            c.column_name = "missing".into();
        }
        let engine = Engine::new(
            &grid,
            vec![bad, list_config(&[])],
            EngineConfig::default(),
        )
        .unwrap();
        let result = engine.run();
        assert!(list_result(&result.facets[0]).error.is_some());
        assert!(list_result(&result.facets[1]).error.is_none());
        assert_eq!(result.matching_rows, 5);
    }

    #[test]
    fn zero_matching_rows_is_legitimate() {
        let grid = vehicle_grid();
        let engine = Engine::new(
            &grid,
            vec![list_config(&["hovercraft"])],
            EngineConfig::default(),
        )
        .unwrap();
        let result = engine.run();
        assert_eq!(result.matching_rows, 0);
        let choices = list_result(&result.facets[0]).choices.clone().unwrap();
        let hover = choices.iter().find(|c| c.value == "hovercraft").unwrap();
        assert_eq!(hover.count, 0);
        assert!(hover.selected);
    }

    fn statement_grid() -> Grid {
        // entity A: two statements, entity B: one
        let columns = ColumnModel::from_names(&["entity", "lang"]);
        Grid::new(
            columns,
            vec![
                Row::new(vec![Cell::text("A"), Cell::text("en")]),
                Row::new(vec![Cell::blank(), Cell::text("fr")]),
                Row::new(vec![Cell::text("B"), Cell::text("en")]),
            ],
        )
    }

    fn records_config() -> EngineConfig {
        EngineConfig {
            mode: EngineMode::Records {
                key_column: "entity".into(),
            },
            choice_limit: DEFAULT_CHOICE_LIMIT,
        }
    }

    #[test]
    fn record_mode_any_row_match() {
        let grid = statement_grid();
        let config = FacetConfig::List(ListFacetConfig {
            name: "lang".into(),
            expression: "value".into(),
            column_name: "lang".into(),
            invert: false,
            omit_blank: false,
            omit_error: false,
            selection: vec!["fr".into()],
            select_blank: false,
            select_error: false,
        });
        let engine = Engine::new(&grid, vec![config], records_config()).unwrap();
        let result = engine.run();
        assert_eq!(result.total_records, Some(2));
        assert_eq!(result.matching_records, Some(1));
        // the whole record's rows are in the filtered view
        assert_eq!(engine.matching_row_indices(), vec![0, 1]);
    }

    #[test]
    fn record_mode_inverted_requires_all_rows() {
        let grid = statement_grid();
        let config = FacetConfig::List(ListFacetConfig {
            name: "lang".into(),
            expression: "value".into(),
            column_name: "lang".into(),
            invert: true,
            omit_blank: false,
            omit_error: false,
            selection: vec!["fr".into()],
            select_blank: false,
            select_error: false,
        });
        let engine = Engine::new(&grid, vec![config], records_config()).unwrap();
        let result = engine.run();
        // record A contains an "fr" row, so it is excluded entirely
        assert_eq!(result.matching_records, Some(1));
        assert_eq!(engine.matching_row_indices(), vec![2]);
    }

    #[test]
    fn unknown_key_column_is_an_engine_error() {
        let grid = statement_grid();
        let config = EngineConfig {
            mode: EngineMode::Records {
                key_column: "nope".into(),
            },
            choice_limit: DEFAULT_CHOICE_LIMIT,
        };
        assert!(Engine::new(&grid, vec![], config).is_err());
    }

    #[test]
    fn empty_grid_runs() {
        let grid = Grid::new(ColumnModel::from_names(&["type", "wheels"]), vec![]);
        let engine = Engine::new(
            &grid,
            vec![list_config(&[]), wheels_config(None, None)],
            EngineConfig::default(),
        )
        .unwrap();
        let result = engine.run();
        assert_eq!(result.total_rows, 0);
        assert_eq!(result.matching_rows, 0);
        assert_eq!(list_result(&result.facets[0]).choices.as_ref().unwrap().len(), 0);
    }

    #[test]
    fn engine_result_serialization_presence() {
        let grid = vehicle_grid();
        let mut bad = list_config(&[]);
        if let FacetConfig::List(c) = &mut bad {
            c.column_name = "missing".into();
        }
        let engine = Engine::new(&grid, vec![bad], EngineConfig::default()).unwrap();
        let json = serde_json::to_value(engine.run()).unwrap();
        let facet = &json["facets"][0];
        assert!(facet.get("error").is_some());
        assert!(facet.get("choices").is_none());
        assert!(facet.get("blank_choice").is_none());
        assert!(json.get("total_records").is_none());
    }
}
