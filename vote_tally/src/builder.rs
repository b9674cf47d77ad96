pub use crate::config::*;
use crate::store::{MemoryBackend, StoreContents, TallyStore};

/// A builder for assembling an in-memory election.
///
/// Mostly useful for tests and embedders that do not want a data file.
///
/// ```
/// pub use vote_tally::builder::Builder;
/// # use vote_tally::StoreError;
///
/// let store = Builder::new()?
///     .category("mayor", "Alcaldía")?
///     .candidate("Elena Ruiz", "Movimiento Cívico", "mayor")?
///     .build();
///
/// assert_eq!(store.candidates().len(), 1);
/// # Ok::<(), StoreError>(())
/// ```
pub struct Builder {
    pub(crate) store: TallyStore,
}

impl Builder {
    /// An empty election: no categories, no candidates.
    pub fn new() -> Result<Builder, StoreError> {
        Ok(Builder {
            store: TallyStore::with_backend(StoreContents::default(), Box::new(MemoryBackend)),
        })
    }

    /// The seeded default election.
    pub fn with_defaults() -> Result<Builder, StoreError> {
        Ok(Builder {
            store: TallyStore::in_memory(),
        })
    }

    /// Registers an enabled category under an explicit id.
    pub fn category(mut self, id: &str, display_name: &str) -> Result<Builder, StoreError> {
        let entry = NewCategory {
            id: Some(id.to_string()),
            ..NewCategory::new(id, display_name)
        };
        self.store.add_category(entry)?;
        Ok(self)
    }

    /// Registers an enabled candidate with a generated id.
    pub fn candidate(
        mut self,
        name: &str,
        party: &str,
        category: &str,
    ) -> Result<Builder, StoreError> {
        self.store.add_candidate(NewCandidate::new(name, party, category))?;
        Ok(self)
    }

    /// Registers a candidate entry verbatim, explicit id included.
    pub fn candidate_entry(mut self, entry: NewCandidate) -> Result<Builder, StoreError> {
        self.store.add_candidate(entry)?;
        Ok(self)
    }

    pub fn build(self) -> TallyStore {
        self.store
    }
}
