//! Batch scheduler for change-data production.
//!
//! Rows are partitioned into consecutive batches no larger than the
//! producer's preferred size and dispatched to a worker pool bounded by the
//! producer's concurrency limit. Results are validated for length before
//! anything is persisted; persistence goes through a single writer, one
//! whole line per row.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;

use gridworks_model::{Grid, IndexedRow};

use crate::error::{ChangeError, ProducerError};
use crate::producer::RowChangeDataProducer;
use crate::serializer::ChangeDataSerializer;
use crate::store::ChangeDataWriter;

/// A batch that failed without aborting the run. Already-persisted rows
/// remain valid; the run reports partial coverage.
#[derive(Debug)]
pub struct BatchFailure {
    pub start_row: u64,
    pub row_count: usize,
    pub error: String,
    /// Transient failures are worth resubmitting; permanent ones are not.
    pub retryable: bool,
}

/// Outcome of one production run.
#[derive(Debug)]
pub struct ProductionReport {
    pub rows_total: u64,
    pub rows_covered: u64,
    pub cancelled: bool,
    pub failures: Vec<BatchFailure>,
}

impl ProductionReport {
    /// True when every row of the grid was computed and persisted. Callers
    /// that refuse to join partial data check this.
    pub fn is_complete(&self) -> bool {
        !self.cancelled && self.failures.is_empty() && self.rows_covered == self.rows_total
    }
}

/// Run a producer over a whole grid, persisting accepted batches through
/// `writer` as they complete.
///
/// Cancellation (setting `cancel`) stops issuance of new batches; in-flight
/// batches finish and persist normally.
pub fn run_production<T, P, S>(
    grid: &Grid,
    producer: &P,
    serializer: &S,
    writer: &mut ChangeDataWriter,
    cancel: &AtomicBool,
) -> Result<ProductionReport, ChangeError>
where
    T: Send,
    P: RowChangeDataProducer<T>,
    S: ChangeDataSerializer<T>,
{
    let batch_size = producer.batch_size().max(1);
    let rows = grid.rows();
    let batches: Vec<(u64, &[gridworks_model::Row])> = rows
        .chunks(batch_size)
        .enumerate()
        .map(|(i, chunk)| ((i * batch_size) as u64, chunk))
        .collect();

    let workers = match producer.max_concurrency() {
        0 => thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
        n => n,
    }
    .min(batches.len().max(1));

    let next_batch = AtomicUsize::new(0);
    let (tx, rx) = mpsc::channel::<(u64, usize, Result<Vec<T>, ProducerError>)>();

    let mut rows_covered = 0u64;
    let mut failures = Vec::new();
    let mut fatal: Option<ChangeError> = None;

    thread::scope(|scope| {
        for _ in 0..workers {
            let tx = tx.clone();
            let next_batch = &next_batch;
            let batches = &batches;
            scope.spawn(move || loop {
                if cancel.load(Ordering::SeqCst) {
                    break;
                }
                let i = next_batch.fetch_add(1, Ordering::SeqCst);
                let Some((start, chunk)) = batches.get(i).copied() else {
                    break;
                };
                let indexed: Vec<IndexedRow> = chunk
                    .iter()
                    .enumerate()
                    .map(|(j, row)| IndexedRow {
                        index: start + j as u64,
                        row,
                    })
                    .collect();
                let result = producer.call_batch(&indexed, grid.columns());
                if tx.send((start, chunk.len(), result)).is_err() {
                    break;
                }
            });
        }
        drop(tx);

        for (start, row_count, result) in rx {
            if fatal.is_some() {
                continue; // draining after a contract violation
            }
            match result {
                Err(e) => failures.push(BatchFailure {
                    start_row: start,
                    row_count,
                    error: e.message().to_string(),
                    retryable: e.is_retryable(),
                }),
                Ok(values) if values.len() != row_count => {
                    // Mis-sized batches would attach values to the wrong
                    // rows; reject the run before anything of it persists.
                    cancel.store(true, Ordering::SeqCst);
                    fatal = Some(ChangeError::BatchContract {
                        start_row: start,
                        expected: row_count,
                        got: values.len(),
                    });
                }
                Ok(values) => {
                    match persist_batch(writer, serializer, start, &values) {
                        Ok(()) => rows_covered += row_count as u64,
                        Err(e) => failures.push(BatchFailure {
                            start_row: start,
                            row_count,
                            error: e.to_string(),
                            retryable: false,
                        }),
                    }
                }
            }
        }
    });

    if let Some(e) = fatal {
        return Err(e);
    }
    Ok(ProductionReport {
        rows_total: grid.row_count() as u64,
        rows_covered,
        cancelled: cancel.load(Ordering::SeqCst),
        failures,
    })
}

/// Serialize the whole batch first, then write; a batch that fails to
/// serialize leaves no trace in the store.
fn persist_batch<T, S: ChangeDataSerializer<T>>(
    writer: &mut ChangeDataWriter,
    serializer: &S,
    start: u64,
    values: &[T],
) -> Result<(), ChangeError> {
    let mut payloads = Vec::with_capacity(values.len());
    for value in values {
        payloads.push(serializer.serialize(value)?);
    }
    for (i, payload) in payloads.iter().enumerate() {
        writer.append(start + i as u64, payload)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serializer::JsonChangeDataSerializer;
    use crate::store::ChangeData;
    use gridworks_model::{Cell, ColumnModel, Row};
    use std::sync::Mutex;
    use std::time::Duration;

    fn grid(n: usize) -> Grid {
        let columns = ColumnModel::from_names(&["v"]);
        let rows = (0..n)
            .map(|i| Row::new(vec![Cell::text(format!("r{i}"))]))
            .collect();
        Grid::new(columns, rows)
    }

    struct Echo {
        batch: usize,
        concurrency: usize,
        in_flight: AtomicUsize,
        high_water: AtomicUsize,
    }

    impl Echo {
        fn new(batch: usize, concurrency: usize) -> Self {
            Echo {
                batch,
                concurrency,
                in_flight: AtomicUsize::new(0),
                high_water: AtomicUsize::new(0),
            }
        }
    }

    impl RowChangeDataProducer<String> for Echo {
        fn call_one(
            &self,
            _row_id: u64,
            row: &Row,
            _columns: &ColumnModel,
        ) -> Result<String, ProducerError> {
            Ok(row.value(0).display())
        }

        fn call_batch(
            &self,
            rows: &[IndexedRow<'_>],
            columns: &ColumnModel,
        ) -> Result<Vec<String>, ProducerError> {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.high_water.fetch_max(current, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(5));
            let out = rows
                .iter()
                .map(|ir| self.call_one(ir.index, ir.row, columns))
                .collect();
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            out
        }

        fn batch_size(&self) -> usize {
            self.batch
        }

        fn max_concurrency(&self) -> usize {
            self.concurrency
        }
    }

    fn run<T, P>(grid: &Grid, producer: &P, cancel: &AtomicBool) -> (ProductionReport, ChangeData<T>)
    where
        T: Send + serde::Serialize + serde::de::DeserializeOwned,
        P: RowChangeDataProducer<T>,
    {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.changes");
        let serializer = JsonChangeDataSerializer::<T>::new();
        let mut writer = ChangeDataWriter::create(&path, grid.version()).unwrap();
        let report = run_production(grid, producer, &serializer, &mut writer, cancel).unwrap();
        drop(writer);
        let data = ChangeData::load(&path, &serializer).unwrap();
        (report, data)
    }

    #[test]
    fn full_run_covers_every_row() {
        let grid = grid(23);
        let producer = Echo::new(5, 3);
        let (report, data) = run::<String, _>(&grid, &producer, &AtomicBool::new(false));
        assert!(report.is_complete());
        assert_eq!(report.rows_covered, 23);
        assert_eq!(data.len(), 23);
        assert_eq!(data.get(17), Some(&"r17".to_string()));
        assert!(producer.high_water.load(Ordering::SeqCst) <= 3);
    }

    #[test]
    fn concurrency_never_exceeds_limit() {
        let grid = grid(40);
        let producer = Echo::new(2, 2);
        let (report, _) = run::<String, _>(&grid, &producer, &AtomicBool::new(false));
        assert!(report.is_complete());
        assert!(producer.high_water.load(Ordering::SeqCst) <= 2);
    }

    struct WrongLength;

    impl RowChangeDataProducer<String> for WrongLength {
        fn call_one(
            &self,
            _row_id: u64,
            _row: &Row,
            _columns: &ColumnModel,
        ) -> Result<String, ProducerError> {
            Ok("x".into())
        }

        fn call_batch(
            &self,
            _rows: &[IndexedRow<'_>],
            _columns: &ColumnModel,
        ) -> Result<Vec<String>, ProducerError> {
            Ok(vec!["only one".into()])
        }

        fn batch_size(&self) -> usize {
            4
        }
    }

    #[test]
    fn wrong_length_batch_is_fatal() {
        let grid = grid(8);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.changes");
        let serializer = JsonChangeDataSerializer::<String>::new();
        let mut writer = ChangeDataWriter::create(&path, grid.version()).unwrap();
        let result = run_production(
            &grid,
            &WrongLength,
            &serializer,
            &mut writer,
            &AtomicBool::new(false),
        );
        assert!(matches!(
            result,
            Err(ChangeError::BatchContract { expected: 4, got: 1, .. })
        ));
    }

    struct FailSecondBatch;

    impl RowChangeDataProducer<String> for FailSecondBatch {
        fn call_one(
            &self,
            row_id: u64,
            _row: &Row,
            _columns: &ColumnModel,
        ) -> Result<String, ProducerError> {
            Ok(format!("v{row_id}"))
        }

        fn call_batch(
            &self,
            rows: &[IndexedRow<'_>],
            columns: &ColumnModel,
        ) -> Result<Vec<String>, ProducerError> {
            if rows[0].index == 3 {
                return Err(ProducerError::Transient("rate limited".into()));
            }
            rows.iter()
                .map(|ir| self.call_one(ir.index, ir.row, columns))
                .collect()
        }

        fn batch_size(&self) -> usize {
            3
        }

        fn max_concurrency(&self) -> usize {
            1
        }
    }

    #[test]
    fn failed_batch_reports_partial_coverage() {
        let grid = grid(9);
        let producer = FailSecondBatch;
        let (report, data) = run::<String, _>(&grid, &producer, &AtomicBool::new(false));
        assert!(!report.is_complete());
        assert_eq!(report.rows_covered, 6);
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].retryable);
        assert_eq!(report.failures[0].start_row, 3);
        // persisted rows are untouched by the failure
        assert_eq!(data.get(0), Some(&"v0".to_string()));
        assert_eq!(data.get(3), None);
        assert_eq!(data.get(6), Some(&"v6".to_string()));
    }

    struct CancelAfterFirst<'a> {
        cancel: &'a AtomicBool,
        calls: Mutex<usize>,
    }

    impl RowChangeDataProducer<String> for CancelAfterFirst<'_> {
        fn call_one(
            &self,
            row_id: u64,
            _row: &Row,
            _columns: &ColumnModel,
        ) -> Result<String, ProducerError> {
            Ok(format!("v{row_id}"))
        }

        fn call_batch(
            &self,
            rows: &[IndexedRow<'_>],
            columns: &ColumnModel,
        ) -> Result<Vec<String>, ProducerError> {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            if *calls == 1 {
                self.cancel.store(true, Ordering::SeqCst);
            }
            rows.iter()
                .map(|ir| self.call_one(ir.index, ir.row, columns))
                .collect()
        }

        fn batch_size(&self) -> usize {
            2
        }

        fn max_concurrency(&self) -> usize {
            1
        }
    }

    #[test]
    fn cancellation_keeps_in_flight_batch() {
        let grid = grid(10);
        let cancel = AtomicBool::new(false);
        let producer = CancelAfterFirst {
            cancel: &cancel,
            calls: Mutex::new(0),
        };
        let (report, data) = run::<String, _>(&grid, &producer, &cancel);
        assert!(report.cancelled);
        assert!(!report.is_complete());
        // the in-flight batch completed and persisted; no new ones started
        assert_eq!(report.rows_covered, 2);
        assert_eq!(data.len(), 2);
        assert_eq!(report.rows_total, 10);
    }
}
