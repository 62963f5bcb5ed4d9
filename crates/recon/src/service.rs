//! The matching-service abstraction.

use std::fmt;

use serde::{Deserialize, Serialize};

use gridworks_changes::ProducerError;

use crate::config::ReconQuery;

/// A type tag attached to a candidate by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateType {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// One candidate as the service reports it, before ranking and feature
/// computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceCandidate {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub types: Vec<CandidateType>,
    pub score: f64,
    #[serde(rename = "match", default)]
    pub exact_match: bool,
}

/// Failure while talking to a matching service.
#[derive(Debug, Clone)]
pub enum ServiceError {
    /// The service is temporarily unavailable; retrying may succeed.
    Transient(String),
    /// The service rejected the request; retrying will not help.
    Permanent(String),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transient(m) => write!(f, "service unavailable: {m}"),
            Self::Permanent(m) => write!(f, "service rejected request: {m}"),
        }
    }
}

impl std::error::Error for ServiceError {}

impl From<ServiceError> for ProducerError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::Transient(m) => ProducerError::Transient(m),
            ServiceError::Permanent(m) => ProducerError::Permanent(m),
        }
    }
}

/// A source of reconciliation candidates. One call answers a whole batch of
/// queries; the reply must hold one candidate list per query, in query
/// order.
pub trait ReconService: Send + Sync {
    fn reconcile(&self, queries: &[ReconQuery]) -> Result<Vec<Vec<ServiceCandidate>>, ServiceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_json_uses_service_field_names() {
        let json = r#"{
            "id": "Q551479",
            "name": "La Monnaie",
            "type": [{"id": "Q153562", "name": "opera house"}],
            "score": 100.0,
            "match": true
        }"#;
        let candidate: ServiceCandidate = serde_json::from_str(json).unwrap();
        assert_eq!(candidate.id, "Q551479");
        assert_eq!(candidate.types[0].id, "Q153562");
        assert!(candidate.exact_match);
    }

    #[test]
    fn missing_optional_fields_default() {
        let json = r#"{"id": "1", "name": "x", "score": 0.5}"#;
        let candidate: ServiceCandidate = serde_json::from_str(json).unwrap();
        assert!(candidate.types.is_empty());
        assert!(!candidate.exact_match);
    }

    #[test]
    fn service_error_maps_onto_producer_error() {
        let transient: ProducerError = ServiceError::Transient("503".into()).into();
        assert!(transient.is_retryable());
        let permanent: ProducerError = ServiceError::Permanent("bad query".into()).into();
        assert!(!permanent.is_retryable());
    }
}
