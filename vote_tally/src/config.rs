// ********* Stored entities ***********

use std::error::Error;
use std::fmt::Display;

use chrono::{DateTime, Utc};

/// The three races every fresh store starts with. They cannot be deleted.
pub const DEFAULT_CATEGORY_IDS: [&str; 3] = [PRESIDENTIAL, CONGRESS, DISTRICT];

pub const PRESIDENTIAL: &str = "presidential";
pub const CONGRESS: &str = "congress";
pub const DISTRICT: &str = "district";

/// A named, party-affiliated option within one category.
///
/// The vote count is only ever increased by vote commits. It goes back to
/// zero on a full reset, or disappears with the candidate on deletion.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Candidate {
    pub id: String,
    pub name: String,
    pub party: String,
    /// Id of the category this candidate runs in.
    pub category: String,
    pub vote_count: u64,
    /// Disabled candidates stay listed but cannot receive votes.
    pub enabled: bool,
    pub description: Option<String>,
    /// Opaque reference to a picture. Carried along, never interpreted.
    pub image: Option<String>,
}

/// An election race. Voters cast at most one ballot per category.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Category {
    /// Stable identifier. Immutable once created.
    pub id: String,
    /// Machine name. Usually equal to the id.
    pub name: String,
    pub display_name: String,
    pub enabled: bool,
    /// Display position, reassigned by [`crate::TallyStore::reorder_categories`].
    pub order: u32,
    pub description: Option<String>,
    pub image: Option<String>,
}

/// The categories a voter id has already voted in.
///
/// Invariant: a (voter id, category) pair appears at most once across all
/// records. The reconciliation engine enforces it before every commit.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct VoterRecord {
    /// National-id-like string supplied by the outside world. Not validated
    /// for authenticity.
    pub voter_id: String,
    /// Insertion-ordered, duplicate-free.
    pub voted_categories: Vec<String>,
    /// When the first vote of this voter was committed.
    pub first_vote_at: DateTime<Utc>,
}

/// One committed vote. Append-only.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct VoteRecord {
    pub voter_id: String,
    pub category: String,
    pub candidate_id: String,
    pub cast_at: DateTime<Utc>,
}

// ********* Mutation inputs ***********

/// Payload for registering a candidate.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct NewCandidate {
    /// Explicit id, or None to derive one from the category.
    pub id: Option<String>,
    pub name: String,
    pub party: String,
    pub category: String,
    pub enabled: bool,
    pub description: Option<String>,
    pub image: Option<String>,
}

impl NewCandidate {
    pub fn new(name: &str, party: &str, category: &str) -> NewCandidate {
        NewCandidate {
            id: None,
            name: name.to_string(),
            party: party.to_string(),
            category: category.to_string(),
            enabled: true,
            description: None,
            image: None,
        }
    }
}

/// Payload for registering a category.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct NewCategory {
    /// Explicit id, or None to derive a `cat-` one.
    pub id: Option<String>,
    pub name: String,
    pub display_name: String,
    pub enabled: bool,
    /// Explicit position, or None to append after the current last.
    pub order: Option<u32>,
    pub description: Option<String>,
    pub image: Option<String>,
}

impl NewCategory {
    pub fn new(name: &str, display_name: &str) -> NewCategory {
        NewCategory {
            id: None,
            name: name.to_string(),
            display_name: display_name.to_string(),
            enabled: true,
            order: None,
            description: None,
            image: None,
        }
    }
}

/// Partial update of a candidate. Fields left to None keep their value.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct CandidateUpdate {
    pub name: Option<String>,
    pub party: Option<String>,
    pub category: Option<String>,
    pub enabled: Option<bool>,
    pub description: Option<String>,
    pub image: Option<String>,
}

/// Partial update of a category. The id and the order are not updatable
/// here, the order only moves through reordering.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct CategoryUpdate {
    pub name: Option<String>,
    pub display_name: Option<String>,
    pub enabled: Option<bool>,
    pub description: Option<String>,
    pub image: Option<String>,
}

// ******** Dataset input *********

/// One parsed dataset row: column name / value pairs in file order.
///
/// Lookups scan in order, so with duplicated or aliased headers the leftmost
/// non-empty column wins.
pub type DatasetRow = Vec<(String, String)>;

/// The canonical triple extracted from a dataset row.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct NormalizedVote {
    pub voter_id: String,
    /// Canonical category id, one of [`DEFAULT_CATEGORY_IDS`].
    pub category: String,
    pub candidate_name: String,
}

// ******** Output data structures *********

/// Why a dataset row was rejected. None of these abort a batch.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum RowFailure {
    /// One or more of the logical fields had no usable column.
    IncompleteRow { missing: Vec<&'static str> },
    /// A category value was present but matched none of the known races.
    UnknownCategory { raw: String },
    /// No enabled candidate with this name runs in the category.
    CandidateNotFound { name: String, category: String },
}

impl RowFailure {
    /// The human-readable form recorded in batch summaries. Row numbers are
    /// 1-based over the kept data rows.
    pub fn message(&self, rowno: usize) -> String {
        match self {
            RowFailure::IncompleteRow { missing } => {
                format!("row {}: incomplete row, missing {}", rowno, missing.join(", "))
            }
            RowFailure::UnknownCategory { raw } => {
                format!("row {}: unknown category '{}'", rowno, raw)
            }
            RowFailure::CandidateNotFound { name, category } => {
                format!("row {}: candidate '{}' not found in category '{}'", rowno, name, category)
            }
        }
    }
}

/// Verdict of the validation checks for one normalized row.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum VoteCheck {
    /// The row may be committed for this candidate.
    Eligible { candidate_id: String },
    /// The voter already voted in this category. Counted, not an error.
    AlreadyVoted,
    /// Rejected with a row failure (always a candidate resolution failure
    /// at this stage).
    Rejected(RowFailure),
}

/// Accumulated outcome of one reconciliation batch.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct BatchSummary {
    pub processed_votes: u64,
    pub duplicates: u64,
    pub errors: u64,
    pub error_details: Vec<String>,
    /// Committed votes per canonical category, in seed order. Zero entries
    /// are kept.
    pub votes_by_category: Vec<(String, u64)>,
}

/// Aggregate numbers over the whole store.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct VoteStats {
    pub total_votes: u64,
    pub total_voters: u64,
    /// One entry per registered category, zero included, in listing order.
    pub votes_by_category: Vec<(String, u64)>,
}

// ******** Errors *********

/// Errors raised by store operations. Each aborts its single operation and
/// leaves the store unchanged.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum StoreError {
    UnknownCandidate { id: String },
    UnknownCategory { id: String },
    /// An explicit id collided with an existing entity.
    DuplicateId { id: String },
    /// Commit-time check: the candidate exists but cannot receive votes.
    CandidateDisabled { id: String },
    /// The category still has candidates and cannot be deleted.
    CategoryInUse { id: String, candidates: usize },
    /// The three seeded categories can never be deleted.
    DefaultCategoryProtected { id: String },
    /// The storage backend failed to write. The in-memory state has been
    /// rolled back to the last persisted one.
    Persistence { message: String },
}

impl Error for StoreError {}

impl Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::UnknownCandidate { id } => write!(f, "no candidate with id '{}'", id),
            StoreError::UnknownCategory { id } => write!(f, "no category with id '{}'", id),
            StoreError::DuplicateId { id } => write!(f, "id '{}' is already taken", id),
            StoreError::CandidateDisabled { id } => {
                write!(f, "candidate '{}' is not available for voting", id)
            }
            StoreError::CategoryInUse { id, candidates } => write!(
                f,
                "category '{}' still has {} candidate(s) and cannot be deleted",
                id, candidates
            ),
            StoreError::DefaultCategoryProtected { id } => {
                write!(f, "category '{}' is a default category and cannot be deleted", id)
            }
            StoreError::Persistence { message } => write!(f, "storage backend failure: {}", message),
        }
    }
}
