use serde::Deserialize;
use sparty_core::uri::strip_namespace;
use sparty_core::{Album, Artist, ArtistDetails, NowPlaying, Track};

#[derive(Debug, Deserialize)]
pub(crate) struct RawImage {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawAlbum {
    pub name: String,
    pub uri: String,
    #[serde(default)]
    pub images: Vec<RawImage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawArtist {
    pub name: String,
    pub uri: String,
    #[serde(default)]
    pub genres: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawTrack {
    pub name: String,
    pub uri: String,
    #[serde(default)]
    pub album: Option<RawAlbum>,
    #[serde(default)]
    pub artists: Vec<RawArtist>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawCurrentlyPlaying {
    pub is_playing: bool,
    #[serde(default)]
    pub progress_ms: Option<u64>,
    #[serde(default)]
    pub item: Option<RawTrack>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawQueue {
    #[serde(default)]
    pub queue: Vec<RawTrack>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawPlayHistory {
    pub track: RawTrack,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawRecentlyPlayed {
    #[serde(default)]
    pub items: Vec<RawPlayHistory>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawArtists {
    #[serde(default)]
    pub artists: Vec<Option<RawArtist>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawTracks {
    #[serde(default)]
    pub tracks: Vec<Option<RawTrack>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawTopArtists {
    #[serde(default)]
    pub items: Vec<RawArtist>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawToken {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub expires_in: u64,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl From<RawArtist> for Artist {
    fn from(raw: RawArtist) -> Self {
        Artist {
            name: raw.name,
            uri: strip_namespace(&raw.uri).to_string(),
        }
    }
}

impl From<RawArtist> for ArtistDetails {
    fn from(raw: RawArtist) -> Self {
        ArtistDetails {
            name: raw.name,
            uri: strip_namespace(&raw.uri).to_string(),
            genres: raw.genres,
        }
    }
}

impl From<RawTrack> for Track {
    fn from(raw: RawTrack) -> Self {
        let album = raw
            .album
            .map(|album| Album {
                name: album.name,
                uri: strip_namespace(&album.uri).to_string(),
                image: album.images.into_iter().next().map(|img| img.url),
            })
            .unwrap_or_default();
        Track {
            uri: strip_namespace(&raw.uri).to_string(),
            name: raw.name,
            album,
            artists: raw.artists.into_iter().map(Artist::from).collect(),
        }
    }
}

impl RawCurrentlyPlaying {
    pub fn into_now_playing(self) -> Option<NowPlaying> {
        let item = self.item?;
        Some(NowPlaying {
            is_playing: self.is_playing,
            progress_ms: self.progress_ms.unwrap_or(0),
            track: item.into(),
        })
    }
}
