use crate::error::{Result, StoreError};
use sparty_core::{Party, PartyData, PartyId, ProviderSession, User, UserId, Visibility};

/// Field-level changes to a party's `info`. Unset fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct PartyPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub visibility: Option<Visibility>,
    pub owner: Option<UserId>,
    pub genres: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub enum PartyUpdate {
    Set(PartyPatch),
    /// Overwrites the whole document, `data` included.
    Replace(Party),
    /// Swaps the playback snapshot and leaves `info` as stored.
    SetData(PartyData),
    AddToSet(UserId),
    Pull(UserId),
}

impl PartyUpdate {
    pub fn genres(genres: Vec<String>) -> Self {
        Self::Set(PartyPatch {
            genres: Some(genres),
            ..PartyPatch::default()
        })
    }

    pub(crate) fn apply(self, party: &mut Party) -> Result<()> {
        match self {
            Self::Set(patch) => {
                if let Some(name) = patch.name {
                    party.info.name = name;
                }
                if let Some(description) = patch.description {
                    party.info.description = description;
                }
                if let Some(visibility) = patch.visibility {
                    party.info.visibility = visibility;
                }
                if let Some(owner) = patch.owner {
                    party.info.members.remove(&owner);
                    party.info.owner = owner;
                }
                if let Some(genres) = patch.genres {
                    party.info.genres = genres;
                }
            }
            Self::Replace(replacement) => {
                if replacement.id != party.id {
                    return Err(StoreError::Validation(format!(
                        "replacement for party {} carries id {}",
                        party.id, replacement.id
                    )));
                }
                *party = replacement;
            }
            Self::SetData(data) => {
                party.data = Some(data);
            }
            Self::AddToSet(user) => {
                if user == party.info.owner {
                    return Err(StoreError::Validation(format!(
                        "owner {user} cannot join its own party {}",
                        party.id
                    )));
                }
                party.info.add_member(&user);
            }
            Self::Pull(user) => {
                party.info.remove_member(&user);
            }
        }
        party.validate().map_err(StoreError::Validation)
    }
}

#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub display_name: Option<String>,
    pub session: Option<ProviderSession>,
    pub top_genres: Option<Vec<String>>,
    pub current_party: Option<Option<PartyId>>,
}

impl UserPatch {
    pub fn session(session: ProviderSession) -> Self {
        Self {
            session: Some(session),
            ..Self::default()
        }
    }

    pub fn top_genres(genres: Vec<String>) -> Self {
        Self {
            top_genres: Some(genres),
            ..Self::default()
        }
    }

    pub fn current_party(party: Option<PartyId>) -> Self {
        Self {
            current_party: Some(party),
            ..Self::default()
        }
    }

    pub(crate) fn apply(self, user: &mut User) {
        if let Some(name) = self.display_name {
            user.display_name = name;
        }
        if let Some(session) = self.session {
            user.session = Some(session);
        }
        if let Some(genres) = self.top_genres {
            user.top_genres = genres;
        }
        if let Some(party) = self.current_party {
            user.current_party = party;
        }
    }
}
