//! A matching service backed by a local candidate table.
//!
//! Useful for offline reconciliation and for tests: candidates come from a
//! CSV of `id,name,type` records and are scored by word distance against
//! the query text.

use std::io::Read;
use std::path::Path;

use crate::config::ReconQuery;
use crate::error::ReconError;
use crate::scorer::word_distance;
use crate::service::{CandidateType, ReconService, ServiceCandidate, ServiceError};

const DEFAULT_LIMIT: usize = 5;

#[derive(Debug, Clone)]
struct Entity {
    id: String,
    name: String,
    type_id: String,
    type_name: String,
}

/// An in-memory candidate table.
#[derive(Debug)]
pub struct LocalCandidateService {
    entities: Vec<Entity>,
    limit: usize,
}

impl LocalCandidateService {
    /// Load a candidate table from a CSV with header `id,name,type` and an
    /// optional fourth `type_name` column.
    pub fn from_csv_path(path: &Path) -> Result<Self, ReconError> {
        let file = std::fs::File::open(path).map_err(|e| ReconError::Io(e.to_string()))?;
        Self::from_csv_reader(file)
    }

    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, ReconError> {
        let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        let mut entities = Vec::new();
        for record in csv_reader.records() {
            let record = record.map_err(|e| ReconError::Csv(e.to_string()))?;
            if record.len() < 2 {
                return Err(ReconError::Csv(format!(
                    "expected at least id,name fields, got {}",
                    record.len()
                )));
            }
            entities.push(Entity {
                id: record[0].to_string(),
                name: record[1].to_string(),
                type_id: record.get(2).unwrap_or("").to_string(),
                type_name: record.get(3).unwrap_or("").to_string(),
            });
        }
        Ok(LocalCandidateService {
            entities,
            limit: DEFAULT_LIMIT,
        })
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.max(1);
        self
    }

    fn answer(&self, query: &ReconQuery) -> Vec<ServiceCandidate> {
        let mut scored: Vec<ServiceCandidate> = self
            .entities
            .iter()
            .filter(|e| match &query.type_id {
                Some(type_id) => e.type_id.is_empty() || e.type_id == *type_id,
                None => true,
            })
            .map(|e| {
                let score = 1.0 - word_distance(&query.query, &e.name);
                let types = if e.type_id.is_empty() {
                    Vec::new()
                } else {
                    vec![CandidateType {
                        id: e.type_id.clone(),
                        name: e.type_name.clone(),
                    }]
                };
                ServiceCandidate {
                    id: e.id.clone(),
                    name: e.name.clone(),
                    types,
                    score,
                    exact_match: e.name.eq_ignore_ascii_case(&query.query),
                }
            })
            .filter(|c| c.score > 0.0)
            .collect();
        // Stable: equally-scored candidates keep table order.
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(self.limit);
        scored
    }
}

impl ReconService for LocalCandidateService {
    fn reconcile(&self, queries: &[ReconQuery]) -> Result<Vec<Vec<ServiceCandidate>>, ServiceError> {
        Ok(queries.iter().map(|q| self.answer(q)).collect())
    }
}
