use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

/// A pending OTP challenge for one identifier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChallengeRecord {
    /// Names one issuance; a re-issue for the same phone gets a new id.
    pub id: Uuid,
    pub code: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl ChallengeRecord {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Result of a conditional removal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Lookup {
    Absent,
    Retained(ChallengeRecord),
    Removed(ChallengeRecord),
}

/// Keyed storage for challenges. Every method is atomic per identifier and
/// must not block on I/O.
pub trait ChallengeStore: Send + Sync {
    /// Insert or replace, returning the record that was displaced.
    fn put(&self, identifier: &str, record: ChallengeRecord) -> Option<ChallengeRecord>;
    fn get(&self, identifier: &str) -> Option<ChallengeRecord>;
    fn delete(&self, identifier: &str) -> Option<ChallengeRecord>;
    /// Look up `identifier` and remove it iff `predicate` holds, as one step.
    fn remove_if(&self, identifier: &str, predicate: &dyn Fn(&ChallengeRecord) -> bool) -> Lookup;
    /// Drop every record expired at `now`; returns how many went.
    fn purge_expired(&self, now: DateTime<Utc>) -> usize;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-local store (pod local, lost on restart).
#[derive(Clone, Default)]
pub struct InMemoryChallengeStore {
    map: Arc<DashMap<String, ChallengeRecord>>,
}

impl InMemoryChallengeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChallengeStore for InMemoryChallengeStore {
    fn put(&self, identifier: &str, record: ChallengeRecord) -> Option<ChallengeRecord> {
        self.map.insert(identifier.to_string(), record)
    }

    fn get(&self, identifier: &str) -> Option<ChallengeRecord> {
        self.map.get(identifier).map(|r| r.value().clone())
    }

    fn delete(&self, identifier: &str) -> Option<ChallengeRecord> {
        self.map.remove(identifier).map(|(_, r)| r)
    }

    fn remove_if(&self, identifier: &str, predicate: &dyn Fn(&ChallengeRecord) -> bool) -> Lookup {
        // the entry guard holds the shard write lock for the whole check
        match self.map.entry(identifier.to_string()) {
            Entry::Occupied(entry) => {
                if predicate(entry.get()) {
                    Lookup::Removed(entry.remove())
                } else {
                    Lookup::Retained(entry.get().clone())
                }
            }
            Entry::Vacant(_) => Lookup::Absent,
        }
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut purged = 0;
        self.map.retain(|_, r| {
            let keep = !r.is_expired_at(now);
            if !keep {
                purged += 1;
            }
            keep
        });
        purged
    }

    fn len(&self) -> usize {
        self.map.len()
    }
}
