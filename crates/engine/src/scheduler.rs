use crate::{SyncEngine, TaskKind};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

const MIN_PERIOD: Duration = Duration::from_millis(100);

/// Owns one timer-driven task per [`TaskKind`]. Each loop ticks immediately on
/// start, then every configured interval; a slow tick delays the next one
/// instead of bursting to catch up.
pub struct Scheduler {
    shutdown: watch::Sender<bool>,
    tasks: JoinSet<()>,
}

impl Scheduler {
    pub fn start(engine: Arc<SyncEngine>) -> Self {
        let (shutdown, _) = watch::channel(false);
        let mut tasks = JoinSet::new();
        for kind in TaskKind::ALL {
            let period = engine.config().interval(kind).max(MIN_PERIOD);
            tasks.spawn(run_loop(
                engine.clone(),
                kind,
                period,
                shutdown.subscribe(),
            ));
        }
        info!(loops = TaskKind::ALL.len(), "scheduler started");
        Self { shutdown, tasks }
    }

    /// Signals every loop to stop and waits for them. A tick already in
    /// progress runs to completion first.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown.send(true);
        while let Some(joined) = self.tasks.join_next().await {
            if let Err(err) = joined {
                warn!(error = %err, "scheduler loop ended abnormally");
            }
        }
        info!("scheduler stopped");
    }
}

async fn run_loop(
    engine: Arc<SyncEngine>,
    kind: TaskKind,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    debug!(task = %kind, period_ms = period.as_millis() as u64, "loop started");

    loop {
        tokio::select! {
            biased;
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                engine.run_task(kind, SystemTime::now()).await;
            }
        }
    }
    debug!(task = %kind, "loop stopped");
}
