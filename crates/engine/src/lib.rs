//! Playback synchronization engine: the active-party registry and the
//! periodic reconciliation ticks that keep party members in step with the owner.

pub mod drift;
mod error;
pub mod genres;
pub mod matching;
pub mod membership;
mod registry;
mod scheduler;
mod tasks;

#[cfg(test)]
mod testing;

pub use error::{Result, SyncError};
pub use registry::ActivePartyRegistry;
pub use scheduler::Scheduler;

use sparty_core::AppConfig;
use sparty_providers::PlaybackApi;
use sparty_store::{PartyStore, UserStore};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Discovery,
    Reaper,
    Details,
    Steering,
    PartyGenres,
    UserGenres,
}

impl TaskKind {
    pub const ALL: [TaskKind; 6] = [
        TaskKind::Discovery,
        TaskKind::Reaper,
        TaskKind::Details,
        TaskKind::Steering,
        TaskKind::PartyGenres,
        TaskKind::UserGenres,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TaskKind::Discovery => "discovery",
            TaskKind::Reaper => "reaper",
            TaskKind::Details => "details",
            TaskKind::Steering => "steering",
            TaskKind::PartyGenres => "party-genres",
            TaskKind::UserGenres => "user-genres",
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for TaskKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        TaskKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| format!("unknown task {s}"))
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub discovery_every: Duration,
    pub reaper_every: Duration,
    pub details_every: Duration,
    pub steering_every: Duration,
    pub party_genres_every: Duration,
    pub user_genres_every: Duration,
    pub drift_tolerance_ms: u64,
    pub inactivity_timeout: Duration,
    pub queue_limit: usize,
    pub history_limit: usize,
    pub top_genre_limit: usize,
}

impl EngineConfig {
    pub fn from_app_config(cfg: &AppConfig) -> Self {
        Self {
            discovery_every: Duration::from_millis(cfg.intervals.discovery_ms),
            reaper_every: Duration::from_millis(cfg.intervals.reaper_ms),
            details_every: Duration::from_millis(cfg.intervals.details_ms),
            steering_every: Duration::from_millis(cfg.intervals.steering_ms),
            party_genres_every: Duration::from_millis(cfg.intervals.party_genres_ms),
            user_genres_every: Duration::from_millis(cfg.intervals.user_genres_ms),
            drift_tolerance_ms: cfg.sync.drift_tolerance_ms,
            inactivity_timeout: Duration::from_secs(cfg.sync.inactivity_timeout_secs),
            queue_limit: cfg.sync.queue_limit,
            history_limit: cfg.sync.history_limit,
            top_genre_limit: cfg.sync.top_genre_limit,
        }
    }

    pub fn interval(&self, kind: TaskKind) -> Duration {
        match kind {
            TaskKind::Discovery => self.discovery_every,
            TaskKind::Reaper => self.reaper_every,
            TaskKind::Details => self.details_every,
            TaskKind::Steering => self.steering_every,
            TaskKind::PartyGenres => self.party_genres_every,
            TaskKind::UserGenres => self.user_genres_every,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from_app_config(&AppConfig::default())
    }
}

/// Outcome counters of one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Parties (or users, for user genres) looked at.
    pub visited: usize,
    /// Entries whose state this tick changed: inserted, evicted, written, corrected.
    pub changed: usize,
    /// Entries skipped because of an error.
    pub failed: usize,
}

/// The reconciliation loops' shared context. Each `TaskKind` maps to one tick
/// method; [`run_task`](Self::run_task) runs a single tick to completion.
pub struct SyncEngine {
    cfg: EngineConfig,
    parties: Arc<dyn PartyStore>,
    users: Arc<dyn UserStore>,
    api: Arc<dyn PlaybackApi>,
    registry: ActivePartyRegistry,
}

impl SyncEngine {
    pub fn new(
        cfg: EngineConfig,
        parties: Arc<dyn PartyStore>,
        users: Arc<dyn UserStore>,
        api: Arc<dyn PlaybackApi>,
        registry: ActivePartyRegistry,
    ) -> Self {
        Self {
            cfg,
            parties,
            users,
            api,
            registry,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    pub fn registry(&self) -> &ActivePartyRegistry {
        &self.registry
    }

    pub async fn run_task(&self, kind: TaskKind, now: SystemTime) -> TickReport {
        let report = match kind {
            TaskKind::Discovery => self.discover_parties().await,
            TaskKind::Reaper => self.reap_inactive(now).await,
            TaskKind::Details => self.refresh_details(now).await,
            TaskKind::Steering => self.steer_playback().await,
            TaskKind::PartyGenres => self.aggregate_party_genres().await,
            TaskKind::UserGenres => self.aggregate_user_genres().await,
        };
        debug!(
            task = %kind,
            visited = report.visited,
            changed = report.changed,
            failed = report.failed,
            "tick finished"
        );
        report
    }
}
