//! Change-data production framework.
//!
//! A producer computes a derived value per row, possibly by calling a slow,
//! rate-limited external service. Results are persisted keyed by row index as
//! they arrive, then joined back into a new grid version. The grid the
//! computation ran against is never mutated.
//!
//! Key invariants:
//! - A batch result must have exactly the input's length and order; anything
//!   else is rejected before persistence
//! - At most `max_concurrency()` batches are in flight per producer
//! - Persisted rows survive a crash or cancellation mid-run
//! - Change data joins only against the grid version it was computed from

pub mod error;
pub mod join;
pub mod producer;
pub mod scheduler;
pub mod serializer;
pub mod store;

pub use error::{ChangeError, ProducerError};
pub use join::join_rows;
pub use producer::RowChangeDataProducer;
pub use scheduler::{run_production, BatchFailure, ProductionReport};
pub use serializer::{ChangeDataSerializer, JsonChangeDataSerializer};
pub use store::{ChangeData, ChangeDataWriter};
