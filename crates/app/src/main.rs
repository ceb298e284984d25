use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sparty_core::{AppConfig, Visibility};
use sparty_engine::matching::match_parties;
use sparty_engine::membership::{create_party, join_party, leave_party, NewParty};
use sparty_engine::{ActivePartyRegistry, EngineConfig, Scheduler, SyncEngine, TaskKind};
use sparty_providers::{PlaybackApi, SpotifyClient};
use sparty_store::{DocumentStore, PartyFilter, PartyStore, UserStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "sparty",
    about = "Group listening: keeps every party member in step with the owner"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the reconciliation loops until interrupted.
    Run,
    /// Print the stored parties.
    Status,
    /// Run a single tick of one loop against the configured store.
    Tick {
        /// discovery, reaper, details, steering, party-genres or user-genres
        task: TaskKind,
    },
    /// List parties sharing genres with a user.
    Match {
        #[arg(long)]
        user: String,
    },
    Party {
        #[command(subcommand)]
        action: PartyAction,
    },
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum PartyAction {
    Create {
        #[arg(long)]
        owner: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, default_value = "public")]
        visibility: Visibility,
    },
    Join {
        #[arg(long)]
        party: String,
        #[arg(long)]
        user: String,
    },
    Leave {
        #[arg(long)]
        party: String,
        #[arg(long)]
        user: String,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cmd = cli.command.unwrap_or(Commands::Run);
    let cfg_path = cli.config.unwrap_or_else(default_config_path);

    if let Commands::Config {
        action: ConfigAction::Init,
    } = cmd
    {
        init_config(&cfg_path)?;
        println!("Initialized config at {}", cfg_path.display());
        return Ok(());
    }

    let cfg = load_or_default(&cfg_path)?;
    init_logging(&cfg.log_level);

    match cmd {
        Commands::Run => run(cfg, cfg_path).await,
        Commands::Status => status(&cfg).await,
        Commands::Tick { task } => tick(&cfg, task).await,
        Commands::Match { user } => print_matches(&cfg, &user).await,
        Commands::Party { action } => party(&cfg, action).await,
        Commands::Config { .. } => Ok(()),
    }
}

async fn run(mut cfg: AppConfig, cfg_path: PathBuf) -> Result<()> {
    let store = open_store(&cfg).await?;
    if store.path().is_none() {
        warn!("no store path configured; parties and users live in memory only");
    }
    let registry = ActivePartyRegistry::new();

    let mut scheduler = Scheduler::start(build_engine(&cfg, &store, &registry)?);
    info!(
        store = ?store.path(),
        "sparty started"
    );

    let (reload_tx, mut reload_rx) = mpsc::channel::<()>(4);
    spawn_reload_watchers(
        cfg_path.clone(),
        cfg.intervals.file_watch_poll_ms,
        reload_tx,
    )
    .await?;

    loop {
        tokio::select! {
            msg = reload_rx.recv() => {
                if msg.is_none() {
                    continue;
                }
                match load_or_default(&cfg_path).and_then(|new_cfg| {
                    let engine = build_engine(&new_cfg, &store, &registry)?;
                    Ok((new_cfg, engine))
                }) {
                    Ok((new_cfg, engine)) => {
                        if new_cfg.store.path != cfg.store.path {
                            warn!("store path changes take effect after a restart");
                        }
                        cfg = new_cfg;
                        scheduler.shutdown().await;
                        scheduler = Scheduler::start(engine);
                        info!(parties = registry.len(), "configuration reloaded");
                    }
                    Err(err) => {
                        error!(error = %err, "failed to reload config");
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("received ctrl-c; shutting down");
                break;
            }
        }
    }

    scheduler.shutdown().await;
    Ok(())
}

fn build_engine(
    cfg: &AppConfig,
    store: &Arc<DocumentStore>,
    registry: &ActivePartyRegistry,
) -> Result<Arc<SyncEngine>> {
    let client: Arc<dyn PlaybackApi> = Arc::new(
        SpotifyClient::new(&cfg.provider, store.clone())
            .context("failed to build playback client")?,
    );
    Ok(Arc::new(SyncEngine::new(
        EngineConfig::from_app_config(cfg),
        store.clone(),
        store.clone(),
        client,
        registry.clone(),
    )))
}

async fn open_store(cfg: &AppConfig) -> Result<Arc<DocumentStore>> {
    let store = match &cfg.store.path {
        Some(path) => DocumentStore::open(path)
            .await
            .with_context(|| format!("failed to open store {}", path.display()))?,
        None => DocumentStore::in_memory(),
    };
    Ok(Arc::new(store))
}

async fn status(cfg: &AppConfig) -> Result<()> {
    let store = open_store(cfg).await?;
    let parties = store.list(&PartyFilter::all()).await?;

    println!("store: {}", describe_store(&store));
    println!("parties: {}", parties.len());
    for party in parties {
        println!(
            "- {} \"{}\" ({:?}) owner={} members={}",
            party.id,
            party.info.name,
            party.info.visibility,
            party.info.owner,
            party.info.members.len()
        );
        match party.data {
            Some(data) => println!(
                "  {} {} @ {}ms, last change {}",
                if data.is_playing { "playing" } else { "paused" },
                data.current_track.uri,
                data.progress_ms,
                data.last_played_change
            ),
            None => println!("  <no playback snapshot yet>"),
        }
        if !party.info.genres.is_empty() {
            println!("  genres: {}", party.info.genres.join(", "));
        }
    }
    Ok(())
}

async fn tick(cfg: &AppConfig, task: TaskKind) -> Result<()> {
    let store = open_store(cfg).await?;
    let engine = build_engine(cfg, &store, &ActivePartyRegistry::new())?;

    // a one-shot process starts with an empty registry
    if task != TaskKind::Discovery {
        engine.run_task(TaskKind::Discovery, SystemTime::now()).await;
    }
    let report = engine.run_task(task, SystemTime::now()).await;

    println!("task: {task}");
    println!("visited: {}", report.visited);
    println!("changed: {}", report.changed);
    println!("failed: {}", report.failed);
    Ok(())
}

async fn print_matches(cfg: &AppConfig, user_id: &str) -> Result<()> {
    let store = open_store(cfg).await?;
    let user = store
        .get_by_id(user_id)
        .await
        .with_context(|| format!("unknown user {user_id}"))?;
    let parties = store.list(&PartyFilter::all()).await?;

    let matches = match_parties(parties, &user);
    if matches.is_empty() {
        println!("no matching parties");
    }
    for m in matches {
        println!(
            "{} \"{}\" shared: {}",
            m.party.id,
            m.party.info.name,
            m.shared.join(", ")
        );
    }
    Ok(())
}

async fn party(cfg: &AppConfig, action: PartyAction) -> Result<()> {
    let store = open_store(cfg).await?;
    match action {
        PartyAction::Create {
            owner,
            name,
            description,
            visibility,
        } => {
            let new = NewParty {
                name,
                description,
                visibility,
                members: Default::default(),
            };
            let id = create_party(&*store, &*store, &owner, new, SystemTime::now()).await?;
            println!("{id}");
        }
        PartyAction::Join { party, user } => {
            join_party(&*store, &*store, &party, &user).await?;
            println!("{user} joined {party}");
        }
        PartyAction::Leave { party, user } => {
            leave_party(&*store, &*store, &party, &user).await?;
            println!("{user} left {party}");
        }
    }
    if store.path().is_none() {
        warn!("no store path configured; the change was not persisted");
    }
    Ok(())
}

fn describe_store(store: &DocumentStore) -> String {
    store
        .path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "<in memory>".to_string())
}

fn default_config_path() -> PathBuf {
    let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("sparty").join("config.toml")
}

fn init_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }
    let cfg = AppConfig::default();
    let toml = toml::to_string_pretty(&cfg)?;
    std::fs::write(path, toml)
        .with_context(|| format!("failed to write config file {}", path.display()))?;
    Ok(())
}

fn load_or_default(path: &Path) -> Result<AppConfig> {
    let mut cfg = if !path.exists() {
        AppConfig::default()
    } else {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&data).with_context(|| format!("failed to parse {}", path.display()))?
    };
    apply_env_overrides(&mut cfg, |key| std::env::var(key).ok());
    Ok(cfg)
}

fn init_logging(log_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_new(log_level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .try_init();
}

async fn spawn_reload_watchers(path: PathBuf, poll_ms: u64, tx: mpsc::Sender<()>) -> Result<()> {
    let tx_poll = tx.clone();
    tokio::spawn(async move {
        let mut known_mtime = file_mtime(&path);
        let sleep = Duration::from_millis(poll_ms.max(2_000));
        loop {
            tokio::time::sleep(sleep).await;
            let current = file_mtime(&path);
            if current.is_some() && current != known_mtime {
                known_mtime = current;
                let _ = tx_poll.send(()).await;
            }
        }
    });

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let tx_hup = tx.clone();
        tokio::spawn(async move {
            if let Ok(mut sig) = signal(SignalKind::hangup()) {
                while sig.recv().await.is_some() {
                    let _ = tx_hup.send(()).await;
                }
            }
        });
    }

    Ok(())
}

fn file_mtime(path: &Path) -> Option<std::time::SystemTime> {
    std::fs::metadata(path).ok()?.modified().ok()
}

fn apply_env_overrides(cfg: &mut AppConfig, var: impl Fn(&str) -> Option<String>) {
    let set = |key: &str| var(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = set("SPARTY_LOG_LEVEL") {
        cfg.log_level = v;
    }
    if let Some(v) = set("SPARTY_CLIENT_ID") {
        cfg.provider.client_id = v;
    }
    if let Some(v) = set("SPARTY_CLIENT_SECRET") {
        cfg.provider.client_secret = v;
    }
    if let Some(v) = set("SPARTY_STORE_PATH") {
        cfg.store.path = Some(PathBuf::from(v));
    }
}
