use std::collections::HashMap;

use crate::furniture::{ConfidenceLevel, FurnitureClassification};

/// Combine repeated classifications of the same region into one.
///
/// The most frequent label wins, ties going to the label voted first. Failed
/// votes are ignored unless every vote failed. Confidence is capped by how
/// decisive the vote was: a split majority is at most medium, a plurality low.
pub fn majority_vote(votes: &[FurnitureClassification]) -> Option<FurnitureClassification> {
    let valid: Vec<&FurnitureClassification> = votes.iter().filter(|v| !v.is_error()).collect();
    if valid.is_empty() {
        return votes.first().cloned();
    }

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for vote in &valid {
        *counts.entry(vote.furniture_id.as_str()).or_insert(0) += 1;
    }

    // First-seen order breaks ties
    let mut winner = valid[0].furniture_id.as_str();
    for vote in &valid {
        if counts[vote.furniture_id.as_str()] > counts[winner] {
            winner = vote.furniture_id.as_str();
        }
    }
    let winner_count = counts[winner];

    let best = valid
        .iter()
        .filter(|v| v.furniture_id == winner)
        .max_by_key(|v| v.confidence.rank())
        .copied()?;

    let cap = if winner_count == valid.len() {
        ConfidenceLevel::High
    } else if winner_count * 2 > valid.len() {
        ConfidenceLevel::Medium
    } else {
        ConfidenceLevel::Low
    };

    let mut result = best.clone();
    if result.confidence.rank() > cap.rank() {
        result.confidence = cap;
    }
    if valid.len() > 1 {
        result.reasoning = format!(
            "{} ({} of {} votes)",
            result.reasoning, winner_count, valid.len()
        );
    }
    Some(result)
}
