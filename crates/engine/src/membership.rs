//! Explicit membership changes made on a user's behalf. The reconciliation
//! loops only ever remove members; everything that adds one lives here.

use crate::error::{Result, SyncError};
use sparty_core::time::unix_secs;
use sparty_core::{PartyId, PartyInfo, UserId, Visibility};
use sparty_store::{PartyStore, PartyUpdate, UserPatch, UserStore};
use std::collections::BTreeSet;
use std::time::SystemTime;
use tracing::info;

const DEFAULT_DESCRIPTION: &str = "This is a party.";

#[derive(Debug, Clone)]
pub struct NewParty {
    pub name: String,
    pub description: Option<String>,
    pub visibility: Visibility,
    pub members: BTreeSet<UserId>,
}

impl NewParty {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            visibility: Visibility::Public,
            members: BTreeSet::new(),
        }
    }
}

pub async fn create_party(
    parties: &dyn PartyStore,
    users: &dyn UserStore,
    owner: &str,
    new: NewParty,
    now: SystemTime,
) -> Result<PartyId> {
    // fail before creating anything if the owner is unknown
    users.get_by_id(owner).await?;

    let id = parties
        .create(PartyInfo {
            name: new.name,
            description: new
                .description
                .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
            visibility: new.visibility,
            owner: owner.to_string(),
            members: new.members,
            created_at: unix_secs(now),
            genres: Vec::new(),
        })
        .await?;
    users
        .update_user(owner, UserPatch::current_party(Some(id.clone())))
        .await?;
    info!(party = %id, owner = %owner, "party created");
    Ok(id)
}

pub async fn join_party(
    parties: &dyn PartyStore,
    users: &dyn UserStore,
    party_id: &str,
    user_id: &str,
) -> Result<()> {
    let party = parties.get(party_id).await?;
    if party.info.visibility == Visibility::Private {
        return Err(SyncError::PrivateParty(party.id));
    }
    if party.info.owner == user_id {
        return Err(SyncError::OwnerCannotJoin(user_id.to_string()));
    }
    users.get_by_id(user_id).await?;

    parties
        .update(party_id, PartyUpdate::AddToSet(user_id.to_string()))
        .await?;
    users
        .update_user(user_id, UserPatch::current_party(Some(party_id.to_string())))
        .await?;
    info!(party = %party_id, user = %user_id, "user joined party");
    Ok(())
}

/// Removes `user_id` from the party. Leaving a party one is not in is a no-op.
pub async fn leave_party(
    parties: &dyn PartyStore,
    users: &dyn UserStore,
    party_id: &str,
    user_id: &str,
) -> Result<()> {
    parties
        .update(party_id, PartyUpdate::Pull(user_id.to_string()))
        .await?;
    let user = users.get_by_id(user_id).await?;
    if user.current_party.as_deref() == Some(party_id) {
        users
            .update_user(user_id, UserPatch::current_party(None))
            .await?;
    }
    info!(party = %party_id, user = %user_id, "user left party");
    Ok(())
}
