use sparty_core::{PartyId, UserId};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

/// In-memory working set of active parties: party id to member ids (owner excluded).
///
/// Cloning shares the same map. Every method takes the lock for a single
/// short operation, so it is never held across a network or store call;
/// loops iterate over [`party_ids`](Self::party_ids) snapshots while others mutate.
#[derive(Debug, Clone, Default)]
pub struct ActivePartyRegistry {
    inner: Arc<Mutex<BTreeMap<PartyId, BTreeSet<UserId>>>>,
}

impl ActivePartyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<PartyId, BTreeSet<UserId>>> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns `true` when the party was not tracked before.
    pub fn insert_if_absent(&self, id: &str, members: BTreeSet<UserId>) -> bool {
        let mut map = self.lock();
        if map.contains_key(id) {
            return false;
        }
        map.insert(id.to_string(), members);
        true
    }

    pub fn evict(&self, id: &str) -> bool {
        self.lock().remove(id).is_some()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock().contains_key(id)
    }

    pub fn party_ids(&self) -> Vec<PartyId> {
        self.lock().keys().cloned().collect()
    }

    pub fn members(&self, id: &str) -> Option<BTreeSet<UserId>> {
        self.lock().get(id).cloned()
    }

    /// Replaces the member set of a tracked party. Untracked parties are ignored.
    pub fn set_members(&self, id: &str, members: BTreeSet<UserId>) {
        if let Some(entry) = self.lock().get_mut(id) {
            *entry = members;
        }
    }

    pub fn remove_member(&self, id: &str, user: &str) -> bool {
        self.lock()
            .get_mut(id)
            .map(|members| members.remove(user))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
