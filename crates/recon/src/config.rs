//! Reconciliation configuration and query formulation.

use serde::{Deserialize, Serialize};

use gridworks_model::{ColumnModel, Row};

/// A (column, property) pair: the column's value is sent to the service as
/// an expected property value to sharpen matching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDetail {
    pub column: String,
    pub property_id: String,
    #[serde(default)]
    pub property_name: String,
}

/// One property constraint inside a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyConstraint {
    pub pid: String,
    pub v: String,
}

/// The structured query sent to a matching service for one row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconQuery {
    pub query: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub properties: Vec<PropertyConstraint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_strict: Option<String>,
}

/// Configuration for reconciling one column against a matching service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardReconConfig {
    /// Label of the service this configuration targets.
    pub service: String,
    /// The column whose values are reconciled.
    pub column_name: String,
    #[serde(default)]
    pub type_id: Option<String>,
    #[serde(default)]
    pub type_name: Option<String>,
    /// Automatically mark a judgement as matched when the service reports
    /// an exact match for the top candidate.
    #[serde(default)]
    pub auto_match: bool,
    #[serde(default)]
    pub column_details: Vec<ColumnDetail>,
    /// Maximum candidates to request; 0 lets the service decide.
    #[serde(default)]
    pub limit: usize,
}

impl StandardReconConfig {
    /// Build the query for one row: the reconciled column's text, the
    /// optional type constraint, and property constraints drawn from the
    /// configured detail columns. Blank detail cells contribute nothing.
    pub fn formulate_query(&self, row: &Row, columns: &ColumnModel, cell_index: usize) -> ReconQuery {
        let properties = self
            .column_details
            .iter()
            .filter_map(|detail| {
                let index = columns.column_index(&detail.column)?;
                let value = row.value(index);
                if value.is_blank() {
                    return None;
                }
                Some(PropertyConstraint {
                    pid: detail.property_id.clone(),
                    v: value.display(),
                })
            })
            .collect();

        ReconQuery {
            query: row.value(cell_index).display(),
            type_id: self.type_id.clone(),
            properties,
            type_strict: self.type_id.as_ref().map(|_| "should".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridworks_model::Cell;

    fn config() -> StandardReconConfig {
        StandardReconConfig {
            service: "viaf".into(),
            column_name: "title".into(),
            type_id: Some("Q1234".into()),
            type_name: Some("movie".into()),
            auto_match: true,
            column_details: vec![ColumnDetail {
                column: "director".into(),
                property_id: "P123".into(),
                property_name: "Director".into(),
            }],
            limit: 0,
        }
    }

    #[test]
    fn formulate_query_with_properties() {
        let columns = ColumnModel::from_names(&["title", "director"]);
        let row = Row::new(vec![Cell::text("mulholland drive"), Cell::text("david lynch")]);
        let query = config().formulate_query(&row, &columns, 0);

        let json = serde_json::to_value(&query).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "query": "mulholland drive",
                "type": "Q1234",
                "properties": [{"pid": "P123", "v": "david lynch"}],
                "type_strict": "should"
            })
        );
    }

    #[test]
    fn blank_detail_cell_contributes_no_property() {
        let columns = ColumnModel::from_names(&["title", "director"]);
        let row = Row::new(vec![Cell::text("untitled")]);
        let query = config().formulate_query(&row, &columns, 0);
        assert!(query.properties.is_empty());
    }

    #[test]
    fn no_type_means_no_strictness() {
        let columns = ColumnModel::from_names(&["title"]);
        let row = Row::new(vec![Cell::text("x")]);
        let mut cfg = config();
        cfg.type_id = None;
        cfg.column_details.clear();
        let query = cfg.formulate_query(&row, &columns, 0);
        assert!(query.type_id.is_none());
        assert!(query.type_strict.is_none());
        let json = serde_json::to_string(&query).unwrap();
        assert!(!json.contains("type"));
    }

    #[test]
    fn config_json_round_trip() {
        let cfg = config();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: StandardReconConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.column_name, "title");
        assert_eq!(back.type_id.as_deref(), Some("Q1234"));
        assert!(back.auto_match);
    }
}
