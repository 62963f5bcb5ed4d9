use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// A reconciliation candidate returned by a matching service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconCandidate {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub types: Vec<String>,
    pub score: f64,
}

impl Hash for ReconCandidate {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.name.hash(state);
        self.types.hash(state);
        self.score.to_bits().hash(state);
    }
}

/// Judgment kind attached to a reconciled cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Judgment {
    /// No decision yet; candidates may be present.
    #[default]
    None,
    /// An existing entity was chosen.
    Matched,
    /// The value denotes a new entity not in the target data set.
    New,
    /// A previous judgement was explicitly discarded. Distinct from `None`:
    /// the cell has been judged and then reset.
    Cleared,
}

/// Reconciliation setup recorded on a column once a run has judged its
/// cells: the service that produced the candidates and the target type the
/// queries were constrained to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnReconConfig {
    pub service: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub type_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub type_name: Option<String>,
}

/// Feature vector used for scoring and match training.
///
/// Always fixed shape: missing inputs map to the neutral defaults rather
/// than leaving fields unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconFeatures {
    pub type_match: bool,
    pub name_match: bool,
    pub name_levenshtein: u32,
    pub name_word_distance: f64,
}

impl Default for ReconFeatures {
    fn default() -> Self {
        ReconFeatures {
            type_match: false,
            name_match: false,
            name_levenshtein: 0,
            name_word_distance: 0.0,
        }
    }
}

impl Hash for ReconFeatures {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_match.hash(state);
        self.name_match.hash(state);
        self.name_levenshtein.hash(state);
        self.name_word_distance.to_bits().hash(state);
    }
}

/// A per-cell reconciliation judgement: the query that was asked, the ranked
/// candidates that came back, the chosen match if any, and the features
/// computed for the top candidate.
#[derive(Debug, Clone, Default, PartialEq, Hash, Serialize, Deserialize)]
pub struct Recon {
    #[serde(rename = "q")]
    pub query: String,
    #[serde(rename = "j", default)]
    pub judgment: Judgment,
    #[serde(rename = "c", default)]
    pub candidates: Vec<ReconCandidate>,
    #[serde(rename = "m", skip_serializing_if = "Option::is_none", default)]
    pub matched: Option<ReconCandidate>,
    #[serde(rename = "f", default)]
    pub features: ReconFeatures,
}

impl Recon {
    pub fn new(query: impl Into<String>) -> Self {
        Recon {
            query: query.into(),
            ..Recon::default()
        }
    }

    /// The candidate currently considered the best match: the explicit match
    /// if judged, otherwise the top-ranked candidate.
    pub fn best_candidate(&self) -> Option<&ReconCandidate> {
        self.matched.as_ref().or_else(|| self.candidates.first())
    }

    /// Discard the current judgement, keeping the candidate list so the
    /// cell can be re-judged without another service round trip.
    pub fn clear_judgment(&mut self) {
        self.judgment = Judgment::Cleared;
        self.matched = None;
    }
}
