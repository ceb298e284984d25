//! Narrow document-store interfaces for parties and users, plus the
//! in-process [`DocumentStore`] that implements both.

mod document;
mod error;
mod filter;
mod update;

pub use document::DocumentStore;
pub use error::{Result, StoreError};
pub use filter::{PartyFilter, UserFilter};
pub use update::{PartyPatch, PartyUpdate, UserPatch};

use async_trait::async_trait;
use sparty_core::{Party, PartyId, PartyInfo, User, UserId};

#[async_trait]
pub trait PartyStore: Send + Sync {
    /// Stores a new party and returns its id. The owner is dropped from the member set.
    async fn create(&self, info: PartyInfo) -> Result<PartyId>;

    /// Fails with [`StoreError::NotFound`] when absent and
    /// [`StoreError::Validation`] when the stored document is corrupt.
    async fn get(&self, id: &str) -> Result<Party>;

    async fn update(&self, id: &str, update: PartyUpdate) -> Result<()>;

    /// Deleting an absent party is not an error.
    async fn delete(&self, id: &str) -> Result<()>;

    async fn list(&self, filter: &PartyFilter) -> Result<Vec<Party>>;

    async fn delete_all(&self) -> Result<()>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with [`StoreError::Duplicate`] when the provider id is already registered.
    async fn insert(&self, user: User) -> Result<UserId>;

    async fn get_by_id(&self, id: &str) -> Result<User>;

    async fn get_by_provider_id(&self, provider_id: &str) -> Result<User>;

    async fn get_by_access_token(&self, token: &str) -> Result<User>;

    async fn update_user(&self, id: &str, patch: UserPatch) -> Result<()>;

    async fn list_users(&self, filter: &UserFilter) -> Result<Vec<User>>;
}
