//! The on-disk form of the tally store: one JSON document with the four
//! entity collections and the voting-closed flag, written atomically through
//! a sibling temporary file. A `<data>.lock` file is held for the lifetime
//! of the store handle; a second process hitting the same data file is
//! turned away instead of interleaving writes.

use log::{debug, info, warn};

use vote_tally::*;

use snafu::prelude::*;

use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::recon::*;

fn default_true() -> bool {
    true
}

fn is_false(b: &bool) -> bool {
    !b
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
struct CandidateDoc {
    id: String,
    name: String,
    party: String,
    category: String,
    #[serde(default)]
    votes: u64,
    #[serde(default = "default_true")]
    enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    image: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
struct CategoryDoc {
    id: String,
    name: String,
    #[serde(rename = "displayName")]
    display_name: String,
    #[serde(default = "default_true")]
    enabled: bool,
    #[serde(default)]
    order: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    image: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
struct VoteDoc {
    dni: String,
    category: String,
    #[serde(rename = "candidateId")]
    candidate_id: String,
    timestamp: DateTime<Utc>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
struct VoterDoc {
    dni: String,
    #[serde(rename = "votedCategories", default)]
    voted_categories: Vec<String>,
    timestamp: DateTime<Utc>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
struct StoreDoc {
    #[serde(default)]
    candidates: Vec<CandidateDoc>,
    #[serde(default)]
    votes: Vec<VoteDoc>,
    #[serde(default)]
    voters: Vec<VoterDoc>,
    #[serde(default)]
    categories: Vec<CategoryDoc>,
    #[serde(rename = "votingClosed", default, skip_serializing_if = "is_false")]
    voting_closed: bool,
    #[serde(
        rename = "votingClosedDate",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    voting_closed_date: Option<DateTime<Utc>>,
}

fn none_if_empty(value: Option<String>) -> Option<String> {
    match value {
        Some(x) if x.is_empty() => None,
        x => x,
    }
}

impl StoreDoc {
    fn from_snapshot(snapshot: &StoreSnapshot<'_>) -> StoreDoc {
        StoreDoc {
            candidates: snapshot
                .candidates
                .iter()
                .map(|c| CandidateDoc {
                    id: c.id.clone(),
                    name: c.name.clone(),
                    party: c.party.clone(),
                    category: c.category.clone(),
                    votes: c.vote_count,
                    enabled: c.enabled,
                    description: c.description.clone(),
                    image: c.image.clone(),
                })
                .collect(),
            votes: snapshot
                .votes
                .iter()
                .map(|v| VoteDoc {
                    dni: v.voter_id.clone(),
                    category: v.category.clone(),
                    candidate_id: v.candidate_id.clone(),
                    timestamp: v.cast_at,
                })
                .collect(),
            voters: snapshot
                .voters
                .iter()
                .map(|v| VoterDoc {
                    dni: v.voter_id.clone(),
                    voted_categories: v.voted_categories.clone(),
                    timestamp: v.first_vote_at,
                })
                .collect(),
            categories: snapshot
                .categories
                .iter()
                .map(|c| CategoryDoc {
                    id: c.id.clone(),
                    name: c.name.clone(),
                    display_name: c.display_name.clone(),
                    enabled: c.enabled,
                    order: c.order,
                    description: c.description.clone(),
                    image: c.image.clone(),
                })
                .collect(),
            voting_closed: snapshot.voting_closed_at.is_some(),
            voting_closed_date: snapshot.voting_closed_at,
        }
    }
}

/// Rebuilds the in-memory contents from a parsed document.
///
/// A duplicated (voter, category) pair across the vote records or a
/// duplicated voter record breaks the integrity the engine relies on, so
/// both are hard errors. Softer oddities are logged and repaired.
fn doc_to_contents(doc: StoreDoc) -> Result<StoreContents, String> {
    let candidates: Vec<Candidate> = doc
        .candidates
        .into_iter()
        .map(|c| Candidate {
            id: c.id,
            name: c.name,
            party: c.party,
            category: c.category,
            vote_count: c.votes,
            enabled: c.enabled,
            description: none_if_empty(c.description),
            image: none_if_empty(c.image),
        })
        .collect();
    let categories: Vec<Category> = doc
        .categories
        .into_iter()
        .map(|c| Category {
            id: c.id,
            name: c.name,
            display_name: c.display_name,
            enabled: c.enabled,
            order: c.order,
            description: none_if_empty(c.description),
            image: none_if_empty(c.image),
        })
        .collect();

    let mut seen_pairs: HashSet<(String, String)> = HashSet::new();
    let mut votes: Vec<VoteRecord> = Vec::new();
    for vote in doc.votes {
        if !seen_pairs.insert((vote.dni.clone(), vote.category.clone())) {
            return Err(format!(
                "more than one vote by voter {} in category {}",
                vote.dni, vote.category
            ));
        }
        if !candidates.iter().any(|c| c.id == vote.candidate_id) {
            warn!(
                "doc_to_contents: vote by {} references unknown candidate {}",
                vote.dni, vote.candidate_id
            );
        }
        if !categories.iter().any(|c| c.id == vote.category) {
            warn!(
                "doc_to_contents: vote by {} references unknown category {}",
                vote.dni, vote.category
            );
        }
        votes.push(VoteRecord {
            voter_id: vote.dni,
            category: vote.category,
            candidate_id: vote.candidate_id,
            cast_at: vote.timestamp,
        });
    }

    let mut seen_voters: HashSet<String> = HashSet::new();
    let mut voters: Vec<VoterRecord> = Vec::new();
    for voter in doc.voters {
        if !seen_voters.insert(voter.dni.clone()) {
            return Err(format!("more than one voter record for {}", voter.dni));
        }
        let mut voted_categories: Vec<String> = Vec::new();
        for category in voter.voted_categories {
            if voted_categories.contains(&category) {
                warn!(
                    "doc_to_contents: voter {} lists category {} twice, dropping the repeat",
                    voter.dni, category
                );
            } else {
                voted_categories.push(category);
            }
        }
        voters.push(VoterRecord {
            voter_id: voter.dni,
            voted_categories,
            first_vote_at: voter.timestamp,
        });
    }

    for candidate in &candidates {
        let committed = votes.iter().filter(|v| v.candidate_id == candidate.id).count() as u64;
        if candidate.vote_count != committed {
            warn!(
                "doc_to_contents: candidate {} carries a count of {} but {} vote record(s)",
                candidate.id, candidate.vote_count, committed
            );
        }
    }

    let voting_closed_at = if doc.voting_closed {
        match doc.voting_closed_date {
            Some(at) => Some(at),
            None => {
                warn!("doc_to_contents: voting is closed but the closing date is missing");
                Some(Utc::now())
            }
        }
    } else {
        None
    };

    Ok(StoreContents {
        candidates,
        categories,
        voters,
        votes,
        voting_closed_at,
    })
}

// ********* Locking ***********

/// Exclusive marker for one data file, held through a `<data>.lock` sibling.
/// Creation is atomic, so two processes cannot both hold it.
pub struct StoreLock {
    lock_path: String,
}

impl StoreLock {
    pub fn acquire(data_path: &str) -> ReconResult<StoreLock> {
        let lock_path = format!("{}.lock", data_path);
        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
        {
            Ok(mut file) => {
                let _ = write!(file, "{}", std::process::id());
                debug!("acquire: holding {}", lock_path);
                Ok(StoreLock { lock_path })
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                StoreLockedSnafu { path: data_path }.fail()
            }
            Err(e) => Err(e).context(WritingFileSnafu { path: lock_path }),
        }
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
    }
}

// ********* The backend ***********

/// Stores the full document under `path`, staging through `<path>.tmp` and
/// renaming so the data file is always a complete document.
pub struct FileBackend {
    path: String,
    _lock: StoreLock,
}

impl StorageBackend for FileBackend {
    fn persist(&mut self, snapshot: &StoreSnapshot<'_>) -> Result<(), StoreError> {
        let doc = StoreDoc::from_snapshot(snapshot);
        let rendered = serde_json::to_string_pretty(&doc).map_err(|e| StoreError::Persistence {
            message: format!("cannot render {}: {}", self.path, e),
        })?;
        let tmp_path = format!("{}.tmp", self.path);
        fs::write(&tmp_path, rendered.as_bytes()).map_err(|e| StoreError::Persistence {
            message: format!("cannot write {}: {}", tmp_path, e),
        })?;
        fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Persistence {
            message: format!("cannot move {} over {}: {}", tmp_path, self.path, e),
        })?;
        debug!("persist: wrote {}", self.path);
        Ok(())
    }
}

fn load_contents(data_path: &str) -> ReconResult<StoreContents> {
    let text = fs::read_to_string(data_path).context(OpeningJsonSnafu { path: data_path })?;
    let doc: StoreDoc =
        serde_json::from_str(&text).context(ParsingJsonSnafu { path: data_path })?;
    match doc_to_contents(doc) {
        Ok(contents) => Ok(contents),
        Err(detail) => CorruptStoreSnafu {
            path: data_path,
            detail,
        }
        .fail(),
    }
}

/// Opens the data file behind a lock, seeding the default election when the
/// file does not exist yet. The state is written back once on open, which
/// also surfaces permission problems before any command work starts.
pub fn open_store(data_path: &str) -> ReconResult<TallyStore> {
    let lock = StoreLock::acquire(data_path)?;
    let contents = if Path::new(data_path).exists() {
        load_contents(data_path)?
    } else {
        info!(
            "open_store: {} not found, seeding the default election",
            data_path
        );
        StoreContents::seeded()
    };
    let backend = FileBackend {
        path: data_path.to_string(),
        _lock: lock,
    };
    let mut store = TallyStore::with_backend(contents, Box::new(backend));
    store.flush().context(StoreSnafu)?;
    Ok(store)
}

/// Writes a fresh data file with the given contents, replacing any file
/// already there.
pub fn create_store(data_path: &str, contents: StoreContents) -> ReconResult<()> {
    let lock = StoreLock::acquire(data_path)?;
    let backend = FileBackend {
        path: data_path.to_string(),
        _lock: lock,
    };
    let mut store = TallyStore::with_backend(contents, Box::new(backend));
    store.flush().context(StoreSnafu)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data_path(dir: &tempfile::TempDir) -> String {
        dir.path().join("tally.json").display().to_string()
    }

    #[test]
    fn state_survives_a_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = data_path(&dir);
        {
            let mut store = open_store(&path).unwrap();
            store.register_vote("11111111", "presidential", "pres-1").unwrap();
        }
        let store = open_store(&path).unwrap();
        assert_eq!(store.candidate("pres-1").unwrap().vote_count, 1);
        assert_eq!(store.votes().len(), 1);
        assert!(store.has_voted("11111111", "presidential"));
    }

    #[test]
    fn second_opener_is_turned_away() {
        let dir = tempfile::tempdir().unwrap();
        let path = data_path(&dir);
        let _store = open_store(&path).unwrap();
        let res = open_store(&path);
        assert!(matches!(res, Err(ReconError::StoreLocked { .. })));
    }

    #[test]
    fn lock_is_released_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = data_path(&dir);
        {
            let _store = open_store(&path).unwrap();
        }
        let _store = open_store(&path).unwrap();
    }

    #[test]
    fn duplicate_vote_pairs_are_rejected_as_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let path = data_path(&dir);
        let doc = r#"{
            "candidates": [],
            "categories": [],
            "voters": [],
            "votes": [
                {"dni": "1", "category": "presidential", "candidateId": "pres-1",
                 "timestamp": "2026-04-12T10:00:00Z"},
                {"dni": "1", "category": "presidential", "candidateId": "pres-2",
                 "timestamp": "2026-04-12T10:05:00Z"}
            ]
        }"#;
        fs::write(&path, doc).unwrap();
        let res = open_store(&path);
        assert!(matches!(res, Err(ReconError::CorruptStore { .. })));
    }

    #[test]
    fn omitted_fields_take_their_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = data_path(&dir);
        let doc = r#"{
            "candidates": [
                {"id": "x-1", "name": "X", "party": "P", "category": "x", "image": ""}
            ],
            "categories": [
                {"id": "x", "name": "x", "displayName": "X"}
            ]
        }"#;
        fs::write(&path, doc).unwrap();
        let store = open_store(&path).unwrap();
        let candidate = store.candidate("x-1").unwrap();
        assert!(candidate.enabled);
        assert_eq!(candidate.vote_count, 0);
        assert_eq!(candidate.image, None);
        let category = store.category("x").unwrap();
        assert!(category.enabled);
        assert_eq!(category.order, 0);
        assert!(store.voting_closed_at().is_none());
    }

    #[test]
    fn closing_date_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = data_path(&dir);
        let closed_at = {
            let mut store = open_store(&path).unwrap();
            store.close_voting().unwrap()
        };
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("votingClosed"));
        let store = open_store(&path).unwrap();
        assert_eq!(store.voting_closed_at(), Some(closed_at));
    }
}
