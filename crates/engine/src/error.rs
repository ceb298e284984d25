use sparty_core::{PartyId, UserId};
use sparty_providers::ProviderError;
use sparty_store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("user {0} has no provider session")]
    MissingSession(UserId),

    #[error("party {0} is private")]
    PrivateParty(PartyId),

    #[error("user {0} owns the party and cannot join it")]
    OwnerCannotJoin(UserId),
}

pub type Result<T> = std::result::Result<T, SyncError>;
