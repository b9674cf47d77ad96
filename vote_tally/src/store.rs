use chrono::{DateTime, Utc};
use log::{debug, info};

use crate::config::*;

/// Persistence seam of the store.
///
/// The store hands the backend a full snapshot after every mutation, so a
/// backend write is always a complete, consistent image. Backends that
/// cannot write atomically should stage and rename.
pub trait StorageBackend {
    fn persist(&mut self, snapshot: &StoreSnapshot<'_>) -> Result<(), StoreError>;
}

/// Borrowed view of the whole store state, as passed to backends.
pub struct StoreSnapshot<'a> {
    pub candidates: &'a [Candidate],
    pub categories: &'a [Category],
    pub voters: &'a [VoterRecord],
    pub votes: &'a [VoteRecord],
    pub voting_closed_at: Option<DateTime<Utc>>,
}

/// Backend that keeps nothing. Used for tests and for embedding the engine
/// without a data file.
pub struct MemoryBackend;

impl StorageBackend for MemoryBackend {
    fn persist(&mut self, _snapshot: &StoreSnapshot<'_>) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Owned store state, as loaded from a backend or built from seeds.
#[derive(Debug, Clone, Default)]
pub struct StoreContents {
    pub candidates: Vec<Candidate>,
    pub categories: Vec<Category>,
    pub voters: Vec<VoterRecord>,
    pub votes: Vec<VoteRecord>,
    pub voting_closed_at: Option<DateTime<Utc>>,
}

impl StoreContents {
    /// The default election: three categories, nine candidates, no votes.
    pub fn seeded() -> StoreContents {
        StoreContents {
            candidates: default_candidates(),
            categories: default_categories(),
            voters: Vec::new(),
            votes: Vec::new(),
            voting_closed_at: None,
        }
    }
}

/// The tally store: candidates, categories, voters and votes behind one
/// handle.
///
/// Every mutating operation validates first, then applies the change in
/// memory and persists the full state through the backend. If the backend
/// write fails, the in-memory change is rolled back, so memory and storage
/// never diverge.
pub struct TallyStore {
    candidates: Vec<Candidate>,
    categories: Vec<Category>,
    voters: Vec<VoterRecord>,
    votes: Vec<VoteRecord>,
    voting_closed_at: Option<DateTime<Utc>>,
    backend: Box<dyn StorageBackend>,
}

impl TallyStore {
    pub fn with_backend(contents: StoreContents, backend: Box<dyn StorageBackend>) -> TallyStore {
        TallyStore {
            candidates: contents.candidates,
            categories: contents.categories,
            voters: contents.voters,
            votes: contents.votes,
            voting_closed_at: contents.voting_closed_at,
            backend,
        }
    }

    /// A seeded store with no persistence.
    pub fn in_memory() -> TallyStore {
        TallyStore::with_backend(StoreContents::seeded(), Box::new(MemoryBackend))
    }

    /// Writes the current state through the backend without mutating it.
    pub fn flush(&mut self) -> Result<(), StoreError> {
        self.commit()
    }

    // ******** Queries *********

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn candidates_in(&self, category: &str) -> Vec<&Candidate> {
        self.candidates.iter().filter(|c| c.category == category).collect()
    }

    /// Enabled candidates, optionally narrowed to one category.
    pub fn active_candidates(&self, category: Option<&str>) -> Vec<&Candidate> {
        self.candidates
            .iter()
            .filter(|c| c.enabled && category.map_or(true, |cat| c.category == cat))
            .collect()
    }

    pub fn candidate(&self, id: &str) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.id == id)
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Enabled categories sorted by order, then id. The id keeps the listing
    /// stable when two categories carry the same order value.
    pub fn active_categories(&self) -> Vec<&Category> {
        let mut cats: Vec<&Category> = self.categories.iter().filter(|c| c.enabled).collect();
        cats.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
        cats
    }

    pub fn category(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn voter(&self, voter_id: &str) -> Option<&VoterRecord> {
        self.voters.iter().find(|v| v.voter_id == voter_id)
    }

    pub fn has_voted(&self, voter_id: &str, category: &str) -> bool {
        self.voter(voter_id)
            .map_or(false, |v| v.voted_categories.iter().any(|c| c == category))
    }

    pub fn voters(&self) -> &[VoterRecord] {
        &self.voters
    }

    pub fn votes(&self) -> &[VoteRecord] {
        &self.votes
    }

    pub fn voting_closed_at(&self) -> Option<DateTime<Utc>> {
        self.voting_closed_at
    }

    // ******** Aggregates *********

    pub fn vote_stats(&self) -> VoteStats {
        let mut cats: Vec<&Category> = self.categories.iter().collect();
        cats.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
        let votes_by_category: Vec<(String, u64)> = cats
            .iter()
            .map(|cat| {
                let n = self.votes.iter().filter(|v| v.category == cat.id).count() as u64;
                (cat.id.clone(), n)
            })
            .collect();
        VoteStats {
            total_votes: self.votes.len() as u64,
            total_voters: self.voters.len() as u64,
            votes_by_category,
        }
    }

    /// The leading candidates of a category, disabled ones included.
    /// Sorted by vote count descending; equal counts fall back to the
    /// candidate id so the ranking is reproducible.
    pub fn top_candidates(&self, category: &str, limit: usize) -> Vec<Candidate> {
        let mut cands: Vec<Candidate> =
            self.candidates.iter().filter(|c| c.category == category).cloned().collect();
        cands.sort_by(|a, b| b.vote_count.cmp(&a.vote_count).then_with(|| a.id.cmp(&b.id)));
        cands.truncate(limit);
        cands
    }

    // ******** Candidate management *********

    pub fn add_candidate(&mut self, new: NewCandidate) -> Result<String, StoreError> {
        if self.category(&new.category).is_none() {
            return Err(StoreError::UnknownCategory { id: new.category });
        }
        let id = match new.id {
            Some(id) => {
                if self.id_taken(&id) {
                    return Err(StoreError::DuplicateId { id });
                }
                id
            }
            None => self.unused_id(&new.category),
        };
        debug!("add_candidate: '{}' -> {}", new.name, id);
        let candidate = Candidate {
            id: id.clone(),
            name: new.name,
            party: new.party,
            category: new.category,
            vote_count: 0,
            enabled: new.enabled,
            description: new.description,
            image: new.image,
        };
        self.candidates.push(candidate);
        if let Err(e) = self.commit() {
            self.candidates.pop();
            return Err(e);
        }
        Ok(id)
    }

    pub fn update_candidate(&mut self, id: &str, patch: CandidateUpdate) -> Result<(), StoreError> {
        if let Some(cat) = &patch.category {
            if self.category(cat).is_none() {
                return Err(StoreError::UnknownCategory { id: cat.clone() });
            }
        }
        let idx = self
            .candidates
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| StoreError::UnknownCandidate { id: id.to_string() })?;
        let before = self.candidates[idx].clone();
        {
            let cand = &mut self.candidates[idx];
            if let Some(name) = patch.name {
                cand.name = name;
            }
            if let Some(party) = patch.party {
                cand.party = party;
            }
            if let Some(category) = patch.category {
                cand.category = category;
            }
            if let Some(enabled) = patch.enabled {
                cand.enabled = enabled;
            }
            if let Some(description) = patch.description {
                cand.description = Some(description);
            }
            if let Some(image) = patch.image {
                cand.image = Some(image);
            }
        }
        debug!("update_candidate: {} -> {:?}", id, self.candidates[idx]);
        if let Err(e) = self.commit() {
            self.candidates[idx] = before;
            return Err(e);
        }
        Ok(())
    }

    /// Removes the candidate and every vote cast for it. Voter records keep
    /// the category entry, so the affected voters cannot vote again in it.
    pub fn delete_candidate(&mut self, id: &str) -> Result<(), StoreError> {
        if self.candidate(id).is_none() {
            return Err(StoreError::UnknownCandidate { id: id.to_string() });
        }
        let candidates_before = self.candidates.clone();
        let votes_before = self.votes.clone();
        self.candidates.retain(|c| c.id != id);
        self.votes.retain(|v| v.candidate_id != id);
        info!(
            "delete_candidate: {} removed along with {} vote(s)",
            id,
            votes_before.len() - self.votes.len()
        );
        if let Err(e) = self.commit() {
            self.candidates = candidates_before;
            self.votes = votes_before;
            return Err(e);
        }
        Ok(())
    }

    // ******** Category management *********

    pub fn add_category(&mut self, new: NewCategory) -> Result<String, StoreError> {
        let id = match new.id {
            Some(id) => {
                if self.id_taken(&id) {
                    return Err(StoreError::DuplicateId { id });
                }
                id
            }
            None => self.unused_id("cat"),
        };
        let order = new
            .order
            .unwrap_or_else(|| self.categories.iter().map(|c| c.order).max().unwrap_or(0) + 1);
        debug!("add_category: '{}' -> {} (order {})", new.display_name, id, order);
        let category = Category {
            id: id.clone(),
            name: new.name,
            display_name: new.display_name,
            enabled: new.enabled,
            order,
            description: new.description,
            image: new.image,
        };
        self.categories.push(category);
        if let Err(e) = self.commit() {
            self.categories.pop();
            return Err(e);
        }
        Ok(id)
    }

    pub fn update_category(&mut self, id: &str, patch: CategoryUpdate) -> Result<(), StoreError> {
        let idx = self
            .categories
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| StoreError::UnknownCategory { id: id.to_string() })?;
        let before = self.categories[idx].clone();
        {
            let cat = &mut self.categories[idx];
            if let Some(name) = patch.name {
                cat.name = name;
            }
            if let Some(display_name) = patch.display_name {
                cat.display_name = display_name;
            }
            if let Some(enabled) = patch.enabled {
                cat.enabled = enabled;
            }
            if let Some(description) = patch.description {
                cat.description = Some(description);
            }
            if let Some(image) = patch.image {
                cat.image = Some(image);
            }
        }
        debug!("update_category: {} -> {:?}", id, self.categories[idx]);
        if let Err(e) = self.commit() {
            self.categories[idx] = before;
            return Err(e);
        }
        Ok(())
    }

    /// Removes an empty category and the votes still tagged with it.
    ///
    /// Fails with [`StoreError::CategoryInUse`] while any candidate runs in
    /// it, and never deletes one of the seeded categories.
    pub fn delete_category(&mut self, id: &str) -> Result<(), StoreError> {
        if self.category(id).is_none() {
            return Err(StoreError::UnknownCategory { id: id.to_string() });
        }
        if DEFAULT_CATEGORY_IDS.contains(&id) {
            return Err(StoreError::DefaultCategoryProtected { id: id.to_string() });
        }
        let in_use = self.candidates.iter().filter(|c| c.category == id).count();
        if in_use > 0 {
            return Err(StoreError::CategoryInUse { id: id.to_string(), candidates: in_use });
        }
        let categories_before = self.categories.clone();
        let votes_before = self.votes.clone();
        self.categories.retain(|c| c.id != id);
        self.votes.retain(|v| v.category != id);
        info!(
            "delete_category: {} removed along with {} vote(s)",
            id,
            votes_before.len() - self.votes.len()
        );
        if let Err(e) = self.commit() {
            self.categories = categories_before;
            self.votes = votes_before;
            return Err(e);
        }
        Ok(())
    }

    /// Assigns each listed id the order equal to its 1-based position in the
    /// sequence. Unknown ids still consume their position; categories not
    /// listed keep their stored order values.
    pub fn reorder_categories(&mut self, ordered_ids: &[String]) -> Result<(), StoreError> {
        let before = self.categories.clone();
        for (index, id) in ordered_ids.iter().enumerate() {
            if let Some(cat) = self.categories.iter_mut().find(|c| &c.id == id) {
                cat.order = (index + 1) as u32;
            }
        }
        debug!("reorder_categories: {:?}", ordered_ids);
        if let Err(e) = self.commit() {
            self.categories = before;
            return Err(e);
        }
        Ok(())
    }

    // ******** Votes *********

    /// Commits one vote: appends the vote record, upserts the voter record
    /// and increments the candidate count, persisted as a single write.
    ///
    /// The disabled check runs before any mutation. The (voter, category)
    /// uniqueness invariant is the caller's contract: check
    /// [`TallyStore::has_voted`] first, as the reconciliation engine and the
    /// command line front end both do.
    pub fn register_vote(
        &mut self,
        voter_id: &str,
        category: &str,
        candidate_id: &str,
    ) -> Result<DateTime<Utc>, StoreError> {
        let cand_idx = self
            .candidates
            .iter()
            .position(|c| c.id == candidate_id)
            .ok_or_else(|| StoreError::UnknownCandidate { id: candidate_id.to_string() })?;
        if !self.candidates[cand_idx].enabled {
            return Err(StoreError::CandidateDisabled { id: candidate_id.to_string() });
        }

        let now = Utc::now();
        let voter_idx = self.voters.iter().position(|v| v.voter_id == voter_id);
        match voter_idx {
            Some(idx) => self.voters[idx].voted_categories.push(category.to_string()),
            None => self.voters.push(VoterRecord {
                voter_id: voter_id.to_string(),
                voted_categories: vec![category.to_string()],
                first_vote_at: now,
            }),
        }
        self.votes.push(VoteRecord {
            voter_id: voter_id.to_string(),
            category: category.to_string(),
            candidate_id: candidate_id.to_string(),
            cast_at: now,
        });
        self.candidates[cand_idx].vote_count += 1;

        debug!(
            "register_vote: voter {} category {} candidate {}",
            voter_id, category, candidate_id
        );
        if let Err(e) = self.commit() {
            self.candidates[cand_idx].vote_count -= 1;
            self.votes.pop();
            match voter_idx {
                Some(idx) => {
                    self.voters[idx].voted_categories.pop();
                }
                None => {
                    self.voters.pop();
                }
            }
            return Err(e);
        }
        Ok(now)
    }

    // ******** Voting window *********

    /// Marks voting as closed. Returns the closing time; calling it again
    /// keeps the first one.
    pub fn close_voting(&mut self) -> Result<DateTime<Utc>, StoreError> {
        if let Some(at) = self.voting_closed_at {
            return Ok(at);
        }
        let now = Utc::now();
        self.voting_closed_at = Some(now);
        info!("close_voting: closed at {}", now);
        if let Err(e) = self.commit() {
            self.voting_closed_at = None;
            return Err(e);
        }
        Ok(now)
    }

    pub fn reopen_voting(&mut self) -> Result<(), StoreError> {
        let before = self.voting_closed_at.take();
        if before.is_none() {
            return Ok(());
        }
        info!("reopen_voting: voting reopened");
        if let Err(e) = self.commit() {
            self.voting_closed_at = before;
            return Err(e);
        }
        Ok(())
    }

    // ******** System *********

    /// Wipes everything and reseeds the default election.
    pub fn reset(&mut self) -> Result<(), StoreError> {
        let before = StoreContents {
            candidates: std::mem::take(&mut self.candidates),
            categories: std::mem::take(&mut self.categories),
            voters: std::mem::take(&mut self.voters),
            votes: std::mem::take(&mut self.votes),
            voting_closed_at: self.voting_closed_at.take(),
        };
        let seeded = StoreContents::seeded();
        self.candidates = seeded.candidates;
        self.categories = seeded.categories;
        self.voters = seeded.voters;
        self.votes = seeded.votes;
        info!("reset: store reseeded with the default election");
        if let Err(e) = self.commit() {
            self.candidates = before.candidates;
            self.categories = before.categories;
            self.voters = before.voters;
            self.votes = before.votes;
            self.voting_closed_at = before.voting_closed_at;
            return Err(e);
        }
        Ok(())
    }

    // ******** Internals *********

    fn commit(&mut self) -> Result<(), StoreError> {
        let snapshot = StoreSnapshot {
            candidates: &self.candidates,
            categories: &self.categories,
            voters: &self.voters,
            votes: &self.votes,
            voting_closed_at: self.voting_closed_at,
        };
        self.backend.persist(&snapshot)
    }

    fn id_taken(&self, id: &str) -> bool {
        self.candidates.iter().any(|c| c.id == id) || self.categories.iter().any(|c| c.id == id)
    }

    /// Millisecond-stamped id, bumped until free.
    fn unused_id(&self, prefix: &str) -> String {
        let mut stamp = Utc::now().timestamp_millis();
        loop {
            let id = format!("{}-{}", prefix, stamp);
            if !self.id_taken(&id) {
                return id;
            }
            stamp += 1;
        }
    }
}

fn seed_candidate(id: &str, name: &str, party: &str, category: &str, description: &str) -> Candidate {
    Candidate {
        id: id.to_string(),
        name: name.to_string(),
        party: party.to_string(),
        category: category.to_string(),
        vote_count: 0,
        enabled: true,
        description: Some(description.to_string()),
        image: None,
    }
}

fn default_candidates() -> Vec<Candidate> {
    vec![
        seed_candidate(
            "pres-1",
            "María González",
            "Partido Progreso",
            PRESIDENTIAL,
            "Propuesta enfocada en educación y tecnología para el desarrollo nacional",
        ),
        seed_candidate(
            "pres-2",
            "Carlos Ramírez",
            "Alianza Nacional",
            PRESIDENTIAL,
            "Plan de gobierno centrado en economía y generación de empleo",
        ),
        seed_candidate(
            "pres-3",
            "Ana Torres",
            "Frente Unido",
            PRESIDENTIAL,
            "Enfoque en salud pública y bienestar social",
        ),
        seed_candidate(
            "cong-1",
            "Luis Martínez",
            "Partido Progreso",
            CONGRESS,
            "Experiencia en políticas de infraestructura y desarrollo urbano",
        ),
        seed_candidate(
            "cong-2",
            "Patricia Silva",
            "Alianza Nacional",
            CONGRESS,
            "Especialista en legislación laboral y derechos sociales",
        ),
        seed_candidate(
            "cong-3",
            "Roberto Díaz",
            "Frente Unido",
            CONGRESS,
            "Defensor de la transparencia y la lucha contra la corrupción",
        ),
        seed_candidate(
            "dist-1",
            "Carmen Vega",
            "Partido Progreso",
            DISTRICT,
            "Líder comunitaria con enfoque en seguridad ciudadana",
        ),
        seed_candidate(
            "dist-2",
            "Jorge Mendoza",
            "Alianza Nacional",
            DISTRICT,
            "Compromiso con el medio ambiente y espacios públicos",
        ),
        seed_candidate(
            "dist-3",
            "Sandra López",
            "Frente Unido",
            DISTRICT,
            "Promotora de cultura, deporte y recreación",
        ),
    ]
}

fn default_categories() -> Vec<Category> {
    let seed = |id: &str, display_name: &str, order: u32, description: &str| Category {
        id: id.to_string(),
        name: id.to_string(),
        display_name: display_name.to_string(),
        enabled: true,
        order,
        description: Some(description.to_string()),
        image: None,
    };
    vec![
        seed(
            PRESIDENTIAL,
            "Presidencial",
            1,
            "Elección para presidente y vicepresidente de la nación",
        ),
        seed(CONGRESS, "Congresistas", 2, "Representantes ante el Congreso Nacional"),
        seed(DISTRICT, "Distrital", 3, "Representantes del distrito local y municipal"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingBackend;

    impl StorageBackend for FailingBackend {
        fn persist(&mut self, _snapshot: &StoreSnapshot<'_>) -> Result<(), StoreError> {
            Err(StoreError::Persistence { message: "injected failure".to_string() })
        }
    }

    fn store() -> TallyStore {
        TallyStore::in_memory()
    }

    fn category_entry(id: &str) -> NewCategory {
        NewCategory { id: Some(id.to_string()), ..NewCategory::new(id, id) }
    }

    #[test]
    fn seeded_defaults() {
        let store = store();
        assert_eq!(store.candidates().len(), 9);
        assert_eq!(store.categories().len(), 3);
        let active: Vec<&str> = store.active_categories().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(active, vec![PRESIDENTIAL, CONGRESS, DISTRICT]);
        assert!(store.candidates().iter().all(|c| c.vote_count == 0 && c.enabled));
    }

    #[test]
    fn add_candidate_requires_known_category() {
        let mut store = store();
        let res = store.add_candidate(NewCandidate::new("X", "Y", "no-such-category"));
        assert_eq!(res, Err(StoreError::UnknownCategory { id: "no-such-category".to_string() }));
    }

    #[test]
    fn add_candidate_rejects_taken_id() {
        let mut store = store();
        let mut entry = NewCandidate::new("X", "Y", PRESIDENTIAL);
        entry.id = Some("pres-1".to_string());
        let res = store.add_candidate(entry);
        assert_eq!(res, Err(StoreError::DuplicateId { id: "pres-1".to_string() }));
    }

    #[test]
    fn register_vote_updates_all_three_collections() {
        let mut store = store();
        store.register_vote("11111111", PRESIDENTIAL, "pres-1").unwrap();
        assert_eq!(store.candidate("pres-1").unwrap().vote_count, 1);
        assert_eq!(store.votes().len(), 1);
        let voter = store.voter("11111111").unwrap();
        assert_eq!(voter.voted_categories, vec![PRESIDENTIAL.to_string()]);
        assert!(store.has_voted("11111111", PRESIDENTIAL));
        assert!(!store.has_voted("11111111", CONGRESS));
    }

    #[test]
    fn register_vote_rejects_disabled_candidate() {
        let mut store = store();
        store
            .update_candidate("pres-2", CandidateUpdate { enabled: Some(false), ..Default::default() })
            .unwrap();
        let res = store.register_vote("22222222", PRESIDENTIAL, "pres-2");
        assert_eq!(res, Err(StoreError::CandidateDisabled { id: "pres-2".to_string() }));
        assert_eq!(store.votes().len(), 0);
        assert!(store.voter("22222222").is_none());
    }

    #[test]
    fn register_vote_rejects_unknown_candidate() {
        let mut store = store();
        let res = store.register_vote("22222222", PRESIDENTIAL, "pres-9");
        assert_eq!(res, Err(StoreError::UnknownCandidate { id: "pres-9".to_string() }));
    }

    #[test]
    fn register_vote_rolls_back_on_backend_failure() {
        let mut store =
            TallyStore::with_backend(StoreContents::seeded(), Box::new(FailingBackend));
        let res = store.register_vote("11111111", PRESIDENTIAL, "pres-1");
        assert!(matches!(res, Err(StoreError::Persistence { .. })));
        assert_eq!(store.votes().len(), 0);
        assert_eq!(store.voters().len(), 0);
        assert_eq!(store.candidate("pres-1").unwrap().vote_count, 0);
    }

    #[test]
    fn delete_candidate_cascades_votes_but_keeps_voter_record() {
        let mut store = store();
        store.register_vote("11111111", PRESIDENTIAL, "pres-1").unwrap();
        store.register_vote("11111111", CONGRESS, "cong-1").unwrap();
        store.delete_candidate("pres-1").unwrap();
        assert!(store.candidate("pres-1").is_none());
        assert_eq!(store.votes().len(), 1);
        // The voter still counts as having voted in the category.
        assert!(store.has_voted("11111111", PRESIDENTIAL));
    }

    #[test]
    fn delete_category_guard_and_cascade() {
        let mut store = store();
        let cat = store.add_category(NewCategory::new("mayor", "Alcaldía")).unwrap();
        let cand = store.add_candidate(NewCandidate::new("Z", "P", &cat)).unwrap();
        store.register_vote("11111111", &cat, &cand).unwrap();

        let res = store.delete_category(&cat);
        assert_eq!(res, Err(StoreError::CategoryInUse { id: cat.clone(), candidates: 1 }));

        store.delete_candidate(&cand).unwrap();
        // Votes are tagged with the category they were cast in; this one
        // survives the candidate cascade because its candidate runs in
        // another category.
        store.register_vote("22222222", &cat, "pres-1").unwrap();
        store.delete_category(&cat).unwrap();
        assert!(store.category(&cat).is_none());
        assert_eq!(store.votes().len(), 0);
    }

    #[test]
    fn default_categories_cannot_be_deleted() {
        let mut store = store();
        for id in DEFAULT_CATEGORY_IDS {
            let res = store.delete_category(id);
            assert_eq!(res, Err(StoreError::DefaultCategoryProtected { id: id.to_string() }));
        }
        assert_eq!(store.categories().len(), 3);
    }

    #[test]
    fn reorder_assigns_dense_positions() {
        let mut store = TallyStore::with_backend(StoreContents::default(), Box::new(MemoryBackend));
        for id in ["a", "b", "c"] {
            store.add_category(category_entry(id)).unwrap();
        }
        store
            .reorder_categories(&["c".to_string(), "a".to_string(), "b".to_string()])
            .unwrap();
        assert_eq!(store.category("c").unwrap().order, 1);
        assert_eq!(store.category("a").unwrap().order, 2);
        assert_eq!(store.category("b").unwrap().order, 3);
        let listed: Vec<&str> = store.active_categories().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(listed, vec!["c", "a", "b"]);
    }

    #[test]
    fn reorder_leaves_unlisted_categories_untouched() {
        let mut store = TallyStore::with_backend(StoreContents::default(), Box::new(MemoryBackend));
        for id in ["a", "b", "c"] {
            store.add_category(category_entry(id)).unwrap();
        }
        store.reorder_categories(&["b".to_string()]).unwrap();
        assert_eq!(store.category("b").unwrap().order, 1);
        assert_eq!(store.category("a").unwrap().order, 1);
        assert_eq!(store.category("c").unwrap().order, 3);
        // Colliding order values resolve by id.
        let listed: Vec<&str> = store.active_categories().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(listed, vec!["a", "b", "c"]);
    }

    #[test]
    fn top_candidates_breaks_ties_by_id() {
        let mut store = store();
        store.register_vote("1", PRESIDENTIAL, "pres-2").unwrap();
        store.register_vote("2", PRESIDENTIAL, "pres-2").unwrap();
        store.register_vote("3", PRESIDENTIAL, "pres-1").unwrap();
        store.register_vote("4", PRESIDENTIAL, "pres-3").unwrap();
        let top: Vec<String> =
            store.top_candidates(PRESIDENTIAL, 3).iter().map(|c| c.id.clone()).collect();
        assert_eq!(top, vec!["pres-2", "pres-1", "pres-3"]);
        assert_eq!(store.top_candidates(PRESIDENTIAL, 1).len(), 1);
    }

    #[test]
    fn vote_stats_counts_every_category() {
        let mut store = store();
        store.register_vote("1", PRESIDENTIAL, "pres-1").unwrap();
        store.register_vote("1", CONGRESS, "cong-1").unwrap();
        store.register_vote("2", PRESIDENTIAL, "pres-2").unwrap();
        let stats = store.vote_stats();
        assert_eq!(stats.total_votes, 3);
        assert_eq!(stats.total_voters, 2);
        assert_eq!(
            stats.votes_by_category,
            vec![
                (PRESIDENTIAL.to_string(), 2),
                (CONGRESS.to_string(), 1),
                (DISTRICT.to_string(), 0)
            ]
        );
    }

    #[test]
    fn close_and_reopen_voting() {
        let mut store = store();
        assert!(store.voting_closed_at().is_none());
        let at = store.close_voting().unwrap();
        assert_eq!(store.voting_closed_at(), Some(at));
        // Closing twice keeps the original timestamp.
        assert_eq!(store.close_voting().unwrap(), at);
        store.reopen_voting().unwrap();
        assert!(store.voting_closed_at().is_none());
    }

    #[test]
    fn reset_restores_the_default_election() {
        let mut store = store();
        store.register_vote("1", PRESIDENTIAL, "pres-1").unwrap();
        store.add_category(NewCategory::new("mayor", "Alcaldía")).unwrap();
        store.close_voting().unwrap();
        store.reset().unwrap();
        assert_eq!(store.categories().len(), 3);
        assert_eq!(store.votes().len(), 0);
        assert_eq!(store.voters().len(), 0);
        assert_eq!(store.candidate("pres-1").unwrap().vote_count, 0);
        assert!(store.voting_closed_at().is_none());
    }

    #[test]
    fn update_candidate_patches_selected_fields() {
        let mut store = store();
        store
            .update_candidate(
                "pres-1",
                CandidateUpdate {
                    party: Some("Nuevo Rumbo".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        let cand = store.candidate("pres-1").unwrap();
        assert_eq!(cand.party, "Nuevo Rumbo");
        assert_eq!(cand.name, "María González");
        let res = store.update_candidate(
            "pres-1",
            CandidateUpdate { category: Some("nope".to_string()), ..Default::default() },
        );
        assert_eq!(res, Err(StoreError::UnknownCategory { id: "nope".to_string() }));
    }
}
