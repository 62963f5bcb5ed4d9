//! Fuzzy scoring for reconciliation candidates.

use std::collections::HashSet;

use gridworks_model::{Recon, ReconCandidate, ReconFeatures};

/// Words carrying no matching signal, dropped before comparing.
const STOP_WORDS: [&str; 6] = ["a", "an", "and", "of", "on", "the"];

fn break_words(s: &str) -> HashSet<String> {
    s.split_whitespace()
        .map(|w| w.to_lowercase())
        .filter(|w| !STOP_WORDS.contains(&w.as_str()))
        .collect()
}

/// Normalized token-overlap distance: 0.0 means identical meaningful
/// content, 1.0 means nothing in common. Empty or all-stop-word input
/// yields 0.0, never NaN or infinity.
pub fn word_distance(s1: &str, s2: &str) -> f64 {
    let words1 = break_words(s1);
    let words2 = break_words(s2);
    let (long, short) = if words1.len() >= words2.len() {
        (&words1, &words2)
    } else {
        (&words2, &words1)
    };
    if long.is_empty() {
        return 0.0;
    }
    let common = short.iter().filter(|w| long.contains(*w)).count();
    (long.len() - common) as f64 / long.len() as f64
}

/// Edit distance between lowercased strings, for the feature vector.
pub fn levenshtein(a: &str, b: &str) -> u32 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len() as u32;
    }
    let mut prev: Vec<u32> = (0..=b.len() as u32).collect();
    let mut current = vec![0u32; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        current[0] = i as u32 + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            current[j + 1] = (prev[j] + cost)
                .min(prev[j + 1] + 1)
                .min(current[j] + 1);
        }
        std::mem::swap(&mut prev, &mut current);
    }
    prev[b.len()]
}

/// Sort candidates by service score, best first. The sort is stable:
/// equally-scored candidates keep their service-provided order, so the
/// "best match" downstream automation picks is reproducible.
pub fn rank_candidates(candidates: &mut [ReconCandidate]) {
    candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
}

/// Populate the feature vector from the top candidate. The shape is always
/// complete; missing text or an empty candidate list leaves the neutral
/// defaults in place.
pub fn compute_features(recon: &mut Recon, text: Option<&str>, type_id: Option<&str>) {
    let mut features = ReconFeatures::default();
    if let (Some(text), Some(best)) = (text, recon.candidates.first()) {
        features.name_match = text.eq_ignore_ascii_case(&best.name);
        features.name_levenshtein = levenshtein(&text.to_lowercase(), &best.name.to_lowercase());
        features.name_word_distance = word_distance(text, &best.name);
        if let Some(type_id) = type_id {
            features.type_match = best.types.iter().any(|t| t == type_id);
        }
    }
    recon.features = features;
}
