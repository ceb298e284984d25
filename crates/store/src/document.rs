use crate::error::{Result, StoreError};
use crate::filter::{PartyFilter, UserFilter};
use crate::update::{PartyUpdate, UserPatch};
use crate::{PartyStore, UserStore};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sparty_core::{Party, PartyId, PartyInfo, User, UserId};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

#[derive(Debug, Default, Serialize, Deserialize)]
struct Collections {
    #[serde(default)]
    parties: BTreeMap<PartyId, Value>,
    #[serde(default)]
    users: BTreeMap<UserId, Value>,
}

/// Key-value document store holding parties and users as JSON documents.
///
/// Documents are decoded on every read, so a record that drifted away from the
/// expected shape surfaces as [`StoreError::Validation`] rather than a panic.
/// When opened with a path, the whole store is snapshotted to that file after
/// each mutation (write to a temp file, then rename).
pub struct DocumentStore {
    docs: Mutex<Collections>,
    path: Option<PathBuf>,
    persist_lock: tokio::sync::Mutex<()>,
}

impl DocumentStore {
    pub fn in_memory() -> Self {
        Self {
            docs: Mutex::new(Collections::default()),
            path: None,
            persist_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let docs = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Collections::default(),
            Err(err) => return Err(err.into()),
        };
        debug!(path = %path.display(), "opened document store");
        Ok(Self {
            docs: Mutex::new(docs),
            path: Some(path),
            persist_lock: tokio::sync::Mutex::new(()),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Inserts a raw party document, bypassing decoding. Used to seed fixtures.
    pub async fn put_raw_party(&self, id: &str, doc: Value) -> Result<()> {
        self.docs().parties.insert(id.to_string(), doc);
        self.persist().await
    }

    fn docs(&self) -> MutexGuard<'_, Collections> {
        self.docs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn persist(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let _guard = self.persist_lock.lock().await;
        let bytes = {
            let docs = self.docs();
            serde_json::to_vec_pretty(&*docs)?
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}

fn decode_party(id: &str, doc: &Value) -> Result<Party> {
    let mut party: Party = serde_json::from_value(doc.clone())
        .map_err(|err| StoreError::Validation(format!("party {id}: {err}")))?;
    party.id = id.to_string();
    party.validate().map_err(StoreError::Validation)?;
    Ok(party)
}

fn decode_user(id: &str, doc: &Value) -> Result<User> {
    let mut user: User = serde_json::from_value(doc.clone())
        .map_err(|err| StoreError::Validation(format!("user {id}: {err}")))?;
    user.id = id.to_string();
    Ok(user)
}

#[async_trait]
impl PartyStore for DocumentStore {
    async fn create(&self, mut info: PartyInfo) -> Result<PartyId> {
        let owner = info.owner.clone();
        info.members.remove(&owner);
        let id = uuid::Uuid::new_v4().to_string();
        let party = Party {
            id: id.clone(),
            info,
            data: None,
        };
        let doc = serde_json::to_value(&party)?;
        self.docs().parties.insert(id.clone(), doc);
        self.persist().await?;
        Ok(id)
    }

    async fn get(&self, id: &str) -> Result<Party> {
        let doc = self
            .docs()
            .parties
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::party_not_found(id))?;
        decode_party(id, &doc)
    }

    async fn update(&self, id: &str, update: PartyUpdate) -> Result<()> {
        {
            let mut docs = self.docs();
            let doc = docs
                .parties
                .get_mut(id)
                .ok_or_else(|| StoreError::party_not_found(id))?;
            let mut party = decode_party(id, doc)?;
            update.apply(&mut party)?;
            *doc = serde_json::to_value(&party)?;
        }
        self.persist().await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let removed = self.docs().parties.remove(id).is_some();
        if removed {
            self.persist().await?;
        }
        Ok(())
    }

    async fn list(&self, filter: &PartyFilter) -> Result<Vec<Party>> {
        let docs = self.docs();
        let mut out = Vec::new();
        for (id, doc) in docs.parties.iter() {
            match decode_party(id, doc) {
                Ok(party) if filter.matches(&party) => out.push(party),
                Ok(_) => {}
                Err(err) => warn!(party = %id, error = %err, "skipping unreadable party document"),
            }
        }
        Ok(out)
    }

    async fn delete_all(&self) -> Result<()> {
        self.docs().parties.clear();
        self.persist().await
    }
}

#[async_trait]
impl UserStore for DocumentStore {
    async fn insert(&self, mut user: User) -> Result<UserId> {
        if user.id.is_empty() {
            user.id = uuid::Uuid::new_v4().to_string();
        }
        {
            let mut docs = self.docs();
            if docs.users.contains_key(&user.id) {
                return Err(StoreError::Duplicate(format!("user id {}", user.id)));
            }
            let taken = docs.users.iter().any(|(id, doc)| {
                decode_user(id, doc)
                    .map(|existing| existing.provider_id == user.provider_id)
                    .unwrap_or(false)
            });
            if taken {
                return Err(StoreError::Duplicate(format!(
                    "provider id {}",
                    user.provider_id
                )));
            }
            docs.users.insert(user.id.clone(), serde_json::to_value(&user)?);
        }
        self.persist().await?;
        Ok(user.id)
    }

    async fn get_by_id(&self, id: &str) -> Result<User> {
        let doc = self
            .docs()
            .users
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::user_not_found(id))?;
        decode_user(id, &doc)
    }

    async fn get_by_provider_id(&self, provider_id: &str) -> Result<User> {
        self.find_user(|user| user.provider_id == provider_id)
            .ok_or_else(|| StoreError::user_not_found(format!("provider:{provider_id}")))
    }

    async fn get_by_access_token(&self, token: &str) -> Result<User> {
        self.find_user(|user| {
            user.session
                .as_ref()
                .map(|s| s.access_token == token)
                .unwrap_or(false)
        })
        .ok_or_else(|| StoreError::user_not_found("<access token>"))
    }

    async fn update_user(&self, id: &str, patch: UserPatch) -> Result<()> {
        {
            let mut docs = self.docs();
            let doc = docs
                .users
                .get_mut(id)
                .ok_or_else(|| StoreError::user_not_found(id))?;
            let mut user = decode_user(id, doc)?;
            patch.apply(&mut user);
            *doc = serde_json::to_value(&user)?;
        }
        self.persist().await
    }

    async fn list_users(&self, filter: &UserFilter) -> Result<Vec<User>> {
        let docs = self.docs();
        let mut out = Vec::new();
        for (id, doc) in docs.users.iter() {
            match decode_user(id, doc) {
                Ok(user) if filter.matches(&user) => out.push(user),
                Ok(_) => {}
                Err(err) => warn!(user = %id, error = %err, "skipping unreadable user document"),
            }
        }
        Ok(out)
    }
}

impl DocumentStore {
    fn find_user(&self, pred: impl Fn(&User) -> bool) -> Option<User> {
        let docs = self.docs();
        docs.users
            .iter()
            .filter_map(|(id, doc)| decode_user(id, doc).ok())
            .find(|user| pred(user))
    }
}
