//! Entity reconciliation.
//!
//! Builds structured queries from configured columns, sends them to a
//! matching service, and turns the candidate lists that come back into
//! per-cell judgements: ranked candidates, a fixed-shape feature vector,
//! and an optional automatic match. The producer plugs into the
//! change-data framework, so service calls are batched and
//! concurrency-bounded.

pub mod config;
pub mod error;
pub mod local;
pub mod producer;
pub mod scorer;
pub mod service;

pub use config::{ColumnDetail, PropertyConstraint, ReconQuery, StandardReconConfig};
pub use error::ReconError;
pub use local::LocalCandidateService;
pub use producer::ReconProducer;
pub use scorer::{compute_features, rank_candidates, word_distance};
pub use service::{CandidateType, ReconService, ServiceCandidate, ServiceError};
