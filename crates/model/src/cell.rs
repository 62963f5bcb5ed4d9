use std::hash::{Hash, Hasher};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::recon::Recon;

/// A typed cell value. `Blank` stands in for both "no cell" and "empty cell";
/// the two are indistinguishable everywhere in the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellValue {
    Blank,
    Text(String),
    Number(f64),
    Boolean(bool),
    Date(NaiveDate),
}

impl Default for CellValue {
    fn default() -> Self {
        CellValue::Blank
    }
}

impl CellValue {
    /// Parse a raw imported field into the narrowest matching type.
    pub fn from_field(input: &str) -> Self {
        let trimmed = input.trim();

        if trimmed.is_empty() {
            return CellValue::Blank;
        }
        if trimmed.eq_ignore_ascii_case("true") {
            return CellValue::Boolean(true);
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return CellValue::Boolean(false);
        }
        if let Ok(num) = trimmed.parse::<f64>() {
            if num.is_finite() {
                return CellValue::Number(num);
            }
        }
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
            return CellValue::Date(date);
        }

        CellValue::Text(input.to_string())
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, CellValue::Blank)
    }

    /// String form used for grouping keys and display.
    pub fn display(&self) -> String {
        match self {
            CellValue::Blank => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{n}")
                }
            }
            CellValue::Boolean(b) => b.to_string(),
            CellValue::Date(d) => d.format("%Y-%m-%d").to_string(),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

// Grids are fingerprinted by hashing cell content; f64 hashes by bit pattern.
impl Hash for CellValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            CellValue::Blank => 0u8.hash(state),
            CellValue::Text(s) => {
                1u8.hash(state);
                s.hash(state);
            }
            CellValue::Number(n) => {
                2u8.hash(state);
                n.to_bits().hash(state);
            }
            CellValue::Boolean(b) => {
                3u8.hash(state);
                b.hash(state);
            }
            CellValue::Date(d) => {
                4u8.hash(state);
                d.hash(state);
            }
        }
    }
}

/// A cell: a value plus an optional reconciliation judgement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    #[serde(rename = "v")]
    pub value: CellValue,
    #[serde(rename = "r", skip_serializing_if = "Option::is_none", default)]
    pub recon: Option<Recon>,
}

impl Cell {
    pub fn new(value: CellValue) -> Self {
        Cell { value, recon: None }
    }

    pub fn text(value: impl Into<String>) -> Self {
        Cell::new(CellValue::Text(value.into()))
    }

    pub fn number(value: f64) -> Self {
        Cell::new(CellValue::Number(value))
    }

    pub fn blank() -> Self {
        Cell::new(CellValue::Blank)
    }

    pub fn with_recon(value: CellValue, recon: Recon) -> Self {
        Cell { value, recon: Some(recon) }
    }

    pub fn is_blank(&self) -> bool {
        self.value.is_blank()
    }
}

impl Hash for Cell {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
        self.recon.hash(state);
    }
}
