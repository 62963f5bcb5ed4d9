//! Change-data producer driving reconciliation.

use gridworks_changes::{ProducerError, RowChangeDataProducer};
use gridworks_model::{ColumnModel, IndexedRow, Judgment, Recon, ReconCandidate, Row};

use crate::config::StandardReconConfig;
use crate::scorer::{compute_features, rank_candidates};
use crate::service::{ReconService, ServiceCandidate};

const BATCH_SIZE: usize = 10;
const MAX_CONCURRENCY: usize = 2;

/// Reconciles one column against a matching service, one query per row.
///
/// Batches of rows become batches of queries; candidate lists coming back
/// are ranked, scored into features, and optionally auto-matched. Blank
/// cells get an empty judgement without hitting the service.
#[derive(Debug)]
pub struct ReconProducer<S: ReconService> {
    config: StandardReconConfig,
    service: S,
    cell_index: usize,
    dependencies: Vec<usize>,
}

impl<S: ReconService> ReconProducer<S> {
    /// Fails when the reconciled column or any detail column is missing
    /// from the grid.
    pub fn new(
        config: StandardReconConfig,
        service: S,
        columns: &ColumnModel,
    ) -> Result<Self, crate::error::ReconError> {
        let cell_index = columns
            .column_index(&config.column_name)
            .ok_or_else(|| crate::error::ReconError::UnknownColumn(config.column_name.clone()))?;
        let mut dependencies = vec![cell_index];
        for detail in &config.column_details {
            let index = columns
                .column_index(&detail.column)
                .ok_or_else(|| crate::error::ReconError::UnknownColumn(detail.column.clone()))?;
            dependencies.push(index);
        }
        Ok(ReconProducer {
            config,
            service,
            cell_index,
            dependencies,
        })
    }

    fn build_recon(&self, query_text: &str, candidates: Vec<ServiceCandidate>) -> Recon {
        let mut recon = Recon::new(query_text);
        recon.candidates = candidates
            .into_iter()
            .map(|c| ReconCandidate {
                id: c.id,
                name: c.name,
                types: c.types.into_iter().map(|t| t.id).collect(),
                score: c.score,
            })
            .collect();
        rank_candidates(&mut recon.candidates);
        compute_features(&mut recon, Some(query_text), self.config.type_id.as_deref());
        recon
    }
}

impl<S: ReconService> RowChangeDataProducer<Recon> for ReconProducer<S> {
    fn call_one(&self, row_id: u64, row: &Row, columns: &ColumnModel) -> Result<Recon, ProducerError> {
        let indexed = [IndexedRow { index: row_id, row }];
        let mut batch = self.call_batch(&indexed, columns)?;
        Ok(batch.remove(0))
    }

    fn call_batch(
        &self,
        rows: &[IndexedRow<'_>],
        columns: &ColumnModel,
    ) -> Result<Vec<Recon>, ProducerError> {
        // Only non-blank cells generate a service query.
        let queried: Vec<usize> = rows
            .iter()
            .enumerate()
            .filter(|(_, ir)| !ir.row.is_cell_blank(self.cell_index))
            .map(|(i, _)| i)
            .collect();
        let queries: Vec<_> = queried
            .iter()
            .map(|&i| self.config.formulate_query(rows[i].row, columns, self.cell_index))
            .collect();

        let mut replies = if queries.is_empty() {
            Vec::new()
        } else {
            let replies = self.service.reconcile(&queries)?;
            if replies.len() != queries.len() {
                return Err(ProducerError::Permanent(format!(
                    "service answered {} of {} queries",
                    replies.len(),
                    queries.len()
                )));
            }
            replies
        };

        let mut out: Vec<Recon> = rows
            .iter()
            .map(|ir| Recon::new(ir.row.value(self.cell_index).display()))
            .collect();
        for (slot, candidates) in queried.into_iter().zip(replies.drain(..)) {
            let auto = self.config.auto_match
                && candidates.first().map(|c| c.exact_match).unwrap_or(false);
            let query_text = out[slot].query.clone();
            let mut recon = self.build_recon(&query_text, candidates);
            if auto {
                recon.judgment = Judgment::Matched;
                recon.matched = recon.candidates.first().cloned();
            }
            out[slot] = recon;
        }
        Ok(out)
    }

    fn batch_size(&self) -> usize {
        BATCH_SIZE
    }

    fn max_concurrency(&self) -> usize {
        MAX_CONCURRENCY
    }

    fn column_dependencies(&self) -> Option<Vec<usize>> {
        Some(self.dependencies.clone())
    }
}
