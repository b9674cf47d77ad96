mod config;
mod store;

pub mod builder;
pub mod manual;
pub mod training;

use log::{debug, info};

use std::collections::HashMap;

pub use crate::config::*;
pub use crate::store::*;

// **** Column matching ****

/// Header aliases accepted for the voter document number, in priority order.
pub const VOTER_ID_COLUMNS: [&str; 3] = ["dni", "documento", "votante_dni"];
/// Header aliases accepted for the category label.
pub const CATEGORY_COLUMNS: [&str; 3] = ["categoria", "category", "tipo_voto"];
/// Header aliases accepted for the candidate name.
pub const CANDIDATE_COLUMNS: [&str; 3] = ["candidato", "nombre_candidato", "candidate"];

const PROGRESS_EVERY: usize = 250;

/// First non-empty cell whose header matches one of the names,
/// case-insensitively. The alias list ranks first, the column order within
/// the row second.
fn field_value(row: &DatasetRow, names: &[&str]) -> Option<String> {
    for name in names {
        for (key, value) in row {
            if key.trim().eq_ignore_ascii_case(name) {
                let trimmed = value.trim();
                if !trimmed.is_empty() {
                    return Some(trimmed.to_string());
                }
            }
        }
    }
    None
}

/// Maps a free-form category label onto one of the canonical race ids by
/// substring. Labels outside the three known races are not resolvable.
fn classify_category(raw: &str) -> Option<&'static str> {
    let lowered = raw.to_lowercase();
    if lowered.contains("presid") {
        Some(PRESIDENTIAL)
    } else if lowered.contains("congres") {
        Some(CONGRESS)
    } else if lowered.contains("distrit") {
        Some(DISTRICT)
    } else {
        None
    }
}

// **** Row normalizer ****

/// Extracts the canonical (voter id, category, candidate name) triple from
/// one dataset row.
///
/// Completeness is checked on the raw columns first, so a row missing a
/// field reports [`RowFailure::IncompleteRow`] even when its category label
/// would also have been unclassifiable.
pub fn normalize_row(row: &DatasetRow) -> Result<NormalizedVote, RowFailure> {
    let voter_id = field_value(row, &VOTER_ID_COLUMNS);
    let raw_category = field_value(row, &CATEGORY_COLUMNS);
    let candidate_name = field_value(row, &CANDIDATE_COLUMNS);

    let mut missing: Vec<&'static str> = Vec::new();
    if voter_id.is_none() {
        missing.push("voter id");
    }
    if raw_category.is_none() {
        missing.push("category");
    }
    if candidate_name.is_none() {
        missing.push("candidate name");
    }

    match (voter_id, raw_category, candidate_name) {
        (Some(voter_id), Some(raw), Some(candidate_name)) => match classify_category(&raw) {
            Some(category) => Ok(NormalizedVote {
                voter_id,
                category: category.to_string(),
                candidate_name,
            }),
            None => Err(RowFailure::UnknownCategory { raw }),
        },
        _ => Err(RowFailure::IncompleteRow { missing }),
    }
}

// **** Vote validator ****

/// Decides whether a normalized row may be committed.
///
/// The duplicate check always runs first and reads the store fresh, so
/// commits from earlier rows of the same batch are visible here. Candidate
/// resolution runs against `candidates`, the list fetched once when the
/// batch started: an exact name match after trimming, case-insensitive,
/// within the target category, enabled candidates only.
pub fn validate_vote(
    vote: &NormalizedVote,
    candidates: &[Candidate],
    store: &TallyStore,
) -> VoteCheck {
    if store.has_voted(&vote.voter_id, &vote.category) {
        return VoteCheck::AlreadyVoted;
    }
    let wanted = vote.candidate_name.trim().to_lowercase();
    let found = candidates
        .iter()
        .find(|c| c.enabled && c.category == vote.category && c.name.trim().to_lowercase() == wanted);
    match found {
        Some(c) => VoteCheck::Eligible {
            candidate_id: c.id.clone(),
        },
        None => VoteCheck::Rejected(RowFailure::CandidateNotFound {
            name: vote.candidate_name.clone(),
            category: vote.category.clone(),
        }),
    }
}

// **** Batch reconciler ****

/// Runs a full dataset through normalize, validate and commit, strictly in
/// input order, and accumulates the outcome counters.
///
/// Row-level rejections never abort the batch. An `Err` from this function
/// means the store itself failed to commit a vote; everything reconciled
/// before that row stays committed.
pub fn run_reconciliation(
    rows: &[DatasetRow],
    store: &mut TallyStore,
) -> Result<BatchSummary, StoreError> {
    info!("run_reconciliation: starting batch of {} row(s)", rows.len());
    // Candidate eligibility is frozen at batch start. Voter uniqueness is
    // re-read per row, so earlier rows mark later ones as duplicates.
    let candidates: Vec<Candidate> = store.candidates().to_vec();

    let mut processed_votes: u64 = 0;
    let mut duplicates: u64 = 0;
    let mut error_details: Vec<String> = Vec::new();
    let mut by_category: HashMap<String, u64> = HashMap::new();

    for (idx, row) in rows.iter().enumerate() {
        let rowno = idx + 1;
        if rowno % PROGRESS_EVERY == 0 {
            info!("run_reconciliation: {} / {} rows", rowno, rows.len());
        }
        let normalized = match normalize_row(row) {
            Ok(normalized) => normalized,
            Err(failure) => {
                debug!("run_reconciliation: row {} rejected: {:?}", rowno, failure);
                error_details.push(failure.message(rowno));
                continue;
            }
        };
        match validate_vote(&normalized, &candidates, store) {
            VoteCheck::AlreadyVoted => {
                debug!(
                    "run_reconciliation: row {}: voter {} already voted in {}",
                    rowno, normalized.voter_id, normalized.category
                );
                duplicates += 1;
            }
            VoteCheck::Rejected(failure) => {
                debug!("run_reconciliation: row {} rejected: {:?}", rowno, failure);
                error_details.push(failure.message(rowno));
            }
            VoteCheck::Eligible { candidate_id } => {
                store.register_vote(&normalized.voter_id, &normalized.category, &candidate_id)?;
                processed_votes += 1;
                *by_category.entry(normalized.category).or_insert(0) += 1;
            }
        }
    }

    let votes_by_category: Vec<(String, u64)> = DEFAULT_CATEGORY_IDS
        .iter()
        .map(|cat| (cat.to_string(), by_category.get(*cat).copied().unwrap_or(0)))
        .collect();
    let total: u64 = votes_by_category.iter().map(|(_, n)| *n).sum();
    assert!(
        total == processed_votes,
        "run_reconciliation: category counters add up to {} but {} votes were processed",
        total,
        processed_votes
    );
    let errors = error_details.len() as u64;
    info!(
        "run_reconciliation: done, {} processed, {} duplicates, {} errors",
        processed_votes, duplicates, errors
    );
    Ok(BatchSummary {
        processed_votes,
        duplicates,
        errors,
        error_details,
        votes_by_category,
    })
}
