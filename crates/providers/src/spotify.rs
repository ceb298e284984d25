use crate::auth::TokenRefresher;
use crate::error::{ProviderError, Result};
use crate::payload::{
    RawArtists, RawCurrentlyPlaying, RawQueue, RawRecentlyPlayed, RawTopArtists, RawTracks,
};
use crate::{PlaybackApi, BATCH_LIMIT};
use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use sparty_core::uri::track_uri;
use sparty_core::{ArtistDetails, NowPlaying, ProviderConfig, Track};
use sparty_store::UserStore;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub struct SpotifyClient {
    http: reqwest::Client,
    api_base_url: String,
    refresher: TokenRefresher,
}

impl SpotifyClient {
    pub fn new(cfg: &ProviderConfig, users: Arc<dyn UserStore>) -> Result<Self> {
        let api_base_url = normalize_base_url(&cfg.api_base_url)?;
        let accounts_base_url = normalize_base_url(&cfg.accounts_base_url)?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(cfg.request_timeout_ms.max(1)))
            .user_agent(format!("sparty/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        let refresher = TokenRefresher::new(
            http.clone(),
            &accounts_base_url,
            cfg.client_id.clone(),
            cfg.client_secret.clone(),
            users,
        );

        Ok(Self {
            http,
            api_base_url,
            refresher,
        })
    }

    /// Runs `call` with `token`; on a 401, refreshes the session and runs it
    /// exactly once more with the new token.
    async fn with_refresh<T, F, Fut>(&self, token: &str, call: F) -> Result<T>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        match call(token.to_string()).await {
            Err(ProviderError::Unauthorized) => {}
            other => return other,
        }

        debug!("access token rejected; refreshing");
        let session = self.refresher.refresh_for_token(token).await?;
        match call(session.access_token).await {
            Err(ProviderError::Unauthorized) => Err(ProviderError::Auth(
                "refreshed token was rejected".to_string(),
            )),
            other => other,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base_url, path.trim_start_matches('/'))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;
        match response.status() {
            StatusCode::UNAUTHORIZED => Err(ProviderError::Unauthorized),
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after_secs = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.trim().parse().ok())
                    .unwrap_or(1);
                Err(ProviderError::RateLimited { retry_after_secs })
            }
            _ => Ok(response),
        }
    }

    /// GETs `path` and decodes the body. `Ok(None)` on 204 No Content.
    async fn get_json<T: DeserializeOwned>(
        &self,
        token: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Option<T>> {
        let request = self.http.get(self.url(path)).bearer_auth(token).query(query);
        let response = self.send(request).await?;
        let status = response.status();

        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Ok(None);
        }
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|err| ProviderError::Unavailable(format!("{path}: {err}")))
    }

    async fn require_json<T: DeserializeOwned>(
        &self,
        token: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        self.get_json(token, path, query)
            .await?
            .ok_or_else(|| ProviderError::Unavailable(format!("{path}: empty response")))
    }
}

fn normalize_base_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    let parsed = url::Url::parse(trimmed)
        .map_err(|err| ProviderError::InvalidUrl(format!("{raw}: {err}")))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(ProviderError::InvalidUrl(format!(
            "{raw}: scheme must be http or https"
        )));
    }
    Ok(trimmed.to_string())
}

#[async_trait]
impl PlaybackApi for SpotifyClient {
    fn name(&self) -> &'static str {
        "spotify"
    }

    async fn current_user(&self, token: &str) -> Result<serde_json::Value> {
        self.with_refresh(token, |t| async move { self.require_json(&t, "me", &[]).await })
            .await
    }

    async fn currently_playing(&self, token: &str) -> Result<Option<NowPlaying>> {
        self.with_refresh(token, |t| async move {
            let raw: Option<RawCurrentlyPlaying> =
                self.get_json(&t, "me/player/currently-playing", &[]).await?;
            Ok(raw.and_then(RawCurrentlyPlaying::into_now_playing))
        })
        .await
    }

    async fn queue(&self, token: &str, limit: usize) -> Result<Vec<Track>> {
        self.with_refresh(token, |t| async move {
            let raw: Option<RawQueue> = self.get_json(&t, "me/player/queue", &[]).await?;
            Ok(raw
                .map(|q| q.queue.into_iter().take(limit).map(Track::from).collect())
                .unwrap_or_default())
        })
        .await
    }

    async fn recently_played(&self, token: &str, limit: usize) -> Result<Vec<Track>> {
        let query = [("limit", limit.clamp(1, BATCH_LIMIT).to_string())];
        self.with_refresh(token, |t| {
            let query = query.clone();
            async move {
                let raw: Option<RawRecentlyPlayed> = self
                    .get_json(&t, "me/player/recently-played", &query)
                    .await?;
                Ok(raw
                    .map(|r| r.items.into_iter().map(|i| Track::from(i.track)).collect())
                    .unwrap_or_default())
            }
        })
        .await
    }

    async fn play_at(&self, token: &str, track: &str, position_ms: u64) -> Result<u16> {
        let body = json!({ "uris": [track_uri(track)], "position_ms": position_ms });
        self.with_refresh(token, |t| {
            let body = body.clone();
            async move {
                let request = self
                    .http
                    .put(self.url("me/player/play"))
                    .bearer_auth(&t)
                    .json(&body);
                match self.send(request).await {
                    Ok(response) => {
                        let status = response.status().as_u16();
                        if !response.status().is_success() {
                            warn!(status, "play command not accepted");
                        }
                        Ok(status)
                    }
                    Err(ProviderError::RateLimited { .. }) => {
                        Ok(StatusCode::TOO_MANY_REQUESTS.as_u16())
                    }
                    Err(err) => Err(err),
                }
            }
        })
        .await
    }

    async fn artists(&self, token: &str, ids: &[String]) -> Result<Vec<ArtistDetails>> {
        let mut out = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(BATCH_LIMIT) {
            let query = [("ids", chunk.join(","))];
            let batch = self
                .with_refresh(token, |t| {
                    let query = query.clone();
                    async move {
                        let raw: RawArtists = self.require_json(&t, "artists", &query).await?;
                        Ok(raw
                            .artists
                            .into_iter()
                            .flatten()
                            .map(ArtistDetails::from)
                            .collect::<Vec<_>>())
                    }
                })
                .await?;
            out.extend(batch);
        }
        Ok(out)
    }

    async fn tracks(&self, token: &str, ids: &[String]) -> Result<Vec<Track>> {
        let mut out = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(BATCH_LIMIT) {
            let query = [("ids", chunk.join(","))];
            let batch = self
                .with_refresh(token, |t| {
                    let query = query.clone();
                    async move {
                        let raw: RawTracks = self.require_json(&t, "tracks", &query).await?;
                        Ok(raw
                            .tracks
                            .into_iter()
                            .flatten()
                            .map(Track::from)
                            .collect::<Vec<_>>())
                    }
                })
                .await?;
            out.extend(batch);
        }
        Ok(out)
    }

    async fn top_artists(&self, token: &str) -> Result<Vec<ArtistDetails>> {
        self.with_refresh(token, |t| async move {
            let raw: RawTopArtists = self.require_json(&t, "me/top/artists", &[]).await?;
            Ok(raw.items.into_iter().map(ArtistDetails::from).collect())
        })
        .await
    }
}
