use crate::error::{ProviderError, Result};
use crate::payload::RawToken;
use sparty_core::ProviderSession;
use sparty_store::{UserPatch, UserStore};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

const RECENT_REFRESH_CAP: usize = 256;

/// Exchanges stored refresh tokens for new sessions and persists them.
///
/// Callers presenting the same stale token share one exchange: the first does
/// the work, the rest wait on that token's gate and reuse the issued session.
/// Refreshes for different tokens run independently.
pub struct TokenRefresher {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    users: Arc<dyn UserStore>,
    gates: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
    recent: Mutex<HashMap<String, ProviderSession>>,
}

impl TokenRefresher {
    pub fn new(
        http: reqwest::Client,
        accounts_base_url: &str,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        users: Arc<dyn UserStore>,
    ) -> Self {
        Self {
            http,
            token_url: format!("{}/api/token", accounts_base_url.trim_end_matches('/')),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            users,
            gates: Mutex::new(HashMap::new()),
            recent: Mutex::new(HashMap::new()),
        }
    }

    /// Resolves the user owning `stale_token`, exchanges their refresh token,
    /// and stores the new session. Any failure is reported as [`ProviderError::Auth`].
    pub async fn refresh_for_token(&self, stale_token: &str) -> Result<ProviderSession> {
        let gate = self.gate(stale_token);
        let _held = gate.lock().await;
        let cached = lock(&self.recent).get(stale_token).cloned();
        if let Some(session) = cached {
            debug!("reusing session refreshed by a concurrent caller");
            return Ok(session);
        }

        let user = self.users.get_by_access_token(stale_token).await.map_err(|err| {
            ProviderError::Auth(format!("no user owns the rejected token: {err}"))
        })?;
        let current = user
            .session
            .ok_or_else(|| ProviderError::Auth(format!("user {} has no session", user.id)))?;

        let session = self.exchange(&current).await?;
        self.users
            .update_user(&user.id, UserPatch::session(session.clone()))
            .await
            .map_err(|err| {
                ProviderError::Auth(format!("refreshed session for {} not saved: {err}", user.id))
            })?;
        info!(user = %user.id, "provider session refreshed");

        let mut recent = lock(&self.recent);
        if recent.len() >= RECENT_REFRESH_CAP {
            recent.clear();
            // gates still shared by a waiting caller survive the purge
            lock(&self.gates)
                .retain(|token, gate| token == stale_token || Arc::strong_count(gate) > 1);
        }
        recent.insert(stale_token.to_string(), session.clone());
        Ok(session)
    }

    fn gate(&self, stale_token: &str) -> Arc<AsyncMutex<()>> {
        lock(&self.gates)
            .entry(stale_token.to_string())
            .or_default()
            .clone()
    }

    async fn exchange(&self, current: &ProviderSession) -> Result<ProviderSession> {
        let response = self
            .http
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", current.refresh_token.as_str()),
            ])
            .send()
            .await
            .map_err(|err| ProviderError::Auth(format!("token endpoint unreachable: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "token refresh rejected");
            return Err(ProviderError::Auth(format!(
                "token endpoint returned {}",
                status.as_u16()
            )));
        }

        let raw: RawToken = response
            .json()
            .await
            .map_err(|err| ProviderError::Auth(format!("malformed token response: {err}")))?;

        Ok(ProviderSession {
            access_token: raw.access_token,
            refresh_token: raw
                .refresh_token
                .unwrap_or_else(|| current.refresh_token.clone()),
            expires_in: raw.expires_in,
            scope: raw.scope.unwrap_or_else(|| current.scope.clone()),
            token_type: raw.token_type.unwrap_or_else(|| current.token_type.clone()),
        })
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
