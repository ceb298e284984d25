pub mod config;
pub mod model;
pub mod time;
pub mod uri;

pub use config::{AppConfig, ConfigIntervals, ProviderConfig, StoreConfig, SyncConfig};
pub use model::{
    Album, Artist, ArtistDetails, NowPlaying, Party, PartyData, PartyId, PartyInfo,
    ProviderSession, Track, User, UserId, Visibility,
};
