use gridworks_model::{ColumnModel, IndexedRow, Row};

use crate::error::ProducerError;

/// A function computing change data for rows, to be persisted and later
/// joined back into a new grid version.
///
/// `call_one` is the semantic definition. Producers backed by batchable
/// services override `call_batch` and `batch_size`; producers talking to
/// rate-limited services bound `max_concurrency`.
pub trait RowChangeDataProducer<T>: Send + Sync {
    /// Compute the change data for a single row.
    fn call_one(&self, row_id: u64, row: &Row, columns: &ColumnModel) -> Result<T, ProducerError>;

    /// Compute the change data for a batch of consecutive rows. Must return
    /// exactly one value per input row, in input order. Defaults to
    /// individual `call_one` calls.
    fn call_batch(
        &self,
        rows: &[IndexedRow<'_>],
        columns: &ColumnModel,
    ) -> Result<Vec<T>, ProducerError> {
        rows.iter()
            .map(|ir| self.call_one(ir.index, ir.row, columns))
            .collect()
    }

    /// The batch size this producer would like to be called with. Smaller
    /// batches may be submitted at the end of the grid.
    fn batch_size(&self) -> usize {
        1
    }

    /// Maximum number of concurrent batches; 0 means unbounded.
    fn max_concurrency(&self) -> usize {
        0
    }

    /// Column indices this producer reads, or None for unrestricted access.
    /// A scheduler may run a restricted producer concurrently with changes
    /// touching other columns.
    fn column_dependencies(&self) -> Option<Vec<usize>> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridworks_model::Cell;

    struct FirstCellUpper;

    impl RowChangeDataProducer<String> for FirstCellUpper {
        fn call_one(
            &self,
            row_id: u64,
            row: &Row,
            _columns: &ColumnModel,
        ) -> Result<String, ProducerError> {
            Ok(format!("{row_id}:{}", row.value(0).display().to_uppercase()))
        }
    }

    #[test]
    fn default_batch_is_call_one_in_order() {
        let columns = ColumnModel::from_names(&["a"]);
        let rows: Vec<Row> = ["x", "y", "z"]
            .iter()
            .map(|s| Row::new(vec![Cell::text(*s)]))
            .collect();
        let indexed: Vec<IndexedRow> = rows
            .iter()
            .enumerate()
            .map(|(i, row)| IndexedRow {
                index: i as u64,
                row,
            })
            .collect();

        let producer = FirstCellUpper;
        let batch = producer.call_batch(&indexed, &columns).unwrap();
        let singles: Vec<String> = indexed
            .iter()
            .map(|ir| producer.call_one(ir.index, ir.row, &columns).unwrap())
            .collect();
        assert_eq!(batch, singles);
        assert_eq!(batch, vec!["0:X", "1:Y", "2:Z"]);
    }

    #[test]
    fn defaults() {
        let producer = FirstCellUpper;
        assert_eq!(producer.batch_size(), 1);
        assert_eq!(producer.max_concurrency(), 0);
        assert!(producer.column_dependencies().is_none());
    }
}
