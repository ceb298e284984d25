use sparty_core::{Party, User, UserId, Visibility};

#[derive(Debug, Clone, Default)]
pub struct PartyFilter {
    pub owner: Option<UserId>,
    pub visibility: Option<Visibility>,
    pub member: Option<UserId>,
    pub genre: Option<String>,
}

impl PartyFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by_genre(genre: impl Into<String>) -> Self {
        Self {
            genre: Some(genre.into()),
            ..Self::default()
        }
    }

    pub fn by_owner(owner: impl Into<String>) -> Self {
        Self {
            owner: Some(owner.into()),
            ..Self::default()
        }
    }

    pub fn matches(&self, party: &Party) -> bool {
        if let Some(owner) = &self.owner {
            if &party.info.owner != owner {
                return false;
            }
        }
        if let Some(visibility) = self.visibility {
            if party.info.visibility != visibility {
                return false;
            }
        }
        if let Some(member) = &self.member {
            if !party.info.members.contains(member) {
                return false;
            }
        }
        if let Some(genre) = &self.genre {
            if !party.info.genres.iter().any(|g| g == genre) {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub with_session: bool,
    pub current_party: Option<String>,
}

impl UserFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_session() -> Self {
        Self {
            with_session: true,
            ..Self::default()
        }
    }

    pub fn matches(&self, user: &User) -> bool {
        if self.with_session && user.session.is_none() {
            return false;
        }
        if let Some(party) = &self.current_party {
            if user.current_party.as_ref() != Some(party) {
                return false;
            }
        }
        true
    }
}
