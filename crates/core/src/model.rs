use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub type PartyId = String;
pub type UserId = String;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Unlisted,
    Private,
}

impl std::str::FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "public" => Ok(Self::Public),
            "unlisted" => Ok(Self::Unlisted),
            "private" => Ok(Self::Private),
            other => Err(format!("{other} is not a valid party visibility")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Album {
    pub name: String,
    pub uri: String,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Artist {
    pub name: String,
    pub uri: String,
}

/// Uniform track descriptor used for "now playing", queue and history entries.
/// URIs are bare provider ids, without the `spotify:<kind>:` namespace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Track {
    pub uri: String,
    pub name: String,
    pub album: Album,
    pub artists: Vec<Artist>,
}

/// A listener's live playback as reported by the provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NowPlaying {
    pub is_playing: bool,
    pub progress_ms: u64,
    pub track: Track,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ArtistDetails {
    pub name: String,
    pub uri: String,
    #[serde(default)]
    pub genres: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PartyInfo {
    pub name: String,
    pub description: String,
    pub visibility: Visibility,
    pub owner: UserId,
    #[serde(default)]
    pub members: BTreeSet<UserId>,
    pub created_at: i64,
    #[serde(default)]
    pub genres: Vec<String>,
}

impl PartyInfo {
    /// Adds `user` to the member set. The owner is never a member of its own party.
    pub fn add_member(&mut self, user: &str) -> bool {
        if user == self.owner {
            return false;
        }
        self.members.insert(user.to_string())
    }

    pub fn remove_member(&mut self, user: &str) -> bool {
        self.members.remove(user)
    }

    pub fn is_participant(&self, user: &str) -> bool {
        self.owner == user || self.members.contains(user)
    }
}

/// Owner playback snapshot written by the detail refresh loop.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PartyData {
    pub is_playing: bool,
    pub current_track: Track,
    pub progress_ms: u64,
    /// Unix seconds of the last observed playback change.
    pub last_played_change: i64,
    #[serde(default)]
    pub queue: Vec<Track>,
    #[serde(default)]
    pub history: Vec<Track>,
}

impl PartyData {
    pub fn idle_secs(&self, now: i64) -> i64 {
        now - self.last_played_change
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Party {
    pub id: PartyId,
    pub info: PartyInfo,
    /// `None` until the first detail refresh tick has run for this party.
    #[serde(default)]
    pub data: Option<PartyData>,
}

impl Party {
    /// Checks invariants that the document shape alone cannot express.
    pub fn validate(&self) -> Result<(), String> {
        if self.info.members.contains(&self.info.owner) {
            return Err(format!(
                "party {} lists its owner {} as a member",
                self.id, self.info.owner
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderSession {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
    #[serde(default)]
    pub scope: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: UserId,
    pub display_name: String,
    pub provider_id: String,
    #[serde(default)]
    pub profile: serde_json::Value,
    #[serde(default)]
    pub session: Option<ProviderSession>,
    #[serde(default)]
    pub top_genres: Vec<String>,
    #[serde(default)]
    pub current_party: Option<PartyId>,
}
