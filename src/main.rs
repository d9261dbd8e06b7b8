//! alphamac-live binary entrypoint: drives the shell controller and the
//! leaderboard view against the in-memory backend with a synthetic score
//! feed, logging every published snapshot.

use std::{env, sync::Arc, time::Duration};

use anyhow::Context;
use futures::StreamExt;
use rand::Rng;
use serde_json::json;
use time::OffsetDateTime;
use tokio::time::sleep;
use tokio_stream::wrappers::WatchStream;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use alphamac_live::{
    config::AppConfig,
    feed::memory::{MemoryAuth, MemoryStore},
    projection::Identity,
    services::{leaderboard::LeaderboardView, shell::ShellController},
    state::{AppState, SharedState},
};

const DEMO_UID: &str = "u1";
const FIRST_NAMES: [&str; 4] = ["Jane", "John", "Ada", "Linus"];
const LAST_NAMES: [&str; 4] = ["Doe", "Smith", "Lovelace", ""];

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let interval_ms = env::var("ALPHAMAC_DEMO_INTERVAL_MS")
        .ok()
        .map(|value| {
            value
                .parse::<u64>()
                .context("parsing ALPHAMAC_DEMO_INTERVAL_MS")
        })
        .transpose()?
        .unwrap_or(2_000);

    let config = AppConfig::load();
    let store = Arc::new(MemoryStore::new());
    let auth = Arc::new(MemoryAuth::new());
    seed(&store, &config);

    let app_state = AppState::new();
    let shell = ShellController::start(
        app_state.clone(),
        auth.clone(),
        auth.clone(),
        store.clone(),
        &config,
    );
    let leaderboard = LeaderboardView::open(store.clone(), &config);

    log_sessions(&app_state);
    log_leaderboard(&leaderboard);

    auth.set_roles(vec!["player".into()]);
    auth.sign_in(Identity {
        uid: DEMO_UID.into(),
        email: Some("jane@example.com".into()),
    });

    let feed = tokio::spawn(run_demo_feed(
        store.clone(),
        config.clone(),
        Duration::from_millis(interval_ms),
    ));

    shutdown_signal().await;
    info!("shutting down");

    feed.abort();
    leaderboard.close();
    shell.shutdown().await;

    Ok(())
}

/// Seed the backend with the demo profile and a few completed games.
fn seed(store: &MemoryStore, config: &AppConfig) {
    store.upsert(
        &config.users_collection,
        DEMO_UID,
        json!({
            "firstName": "Jane",
            "lastName": "Doe",
            "username": "jd",
            "theme": { "primary": "teal", "secondary": "amber", "dark": true },
        }),
    );

    let now = now_ms();
    for (index, score) in [31, 18, 42].into_iter().enumerate() {
        store.upsert(
            &config.scores_collection,
            &Uuid::new_v4().simple().to_string(),
            json!({
                "score": score,
                "date": now - (index as i64) * 60_000,
                "firstName": "Jane",
                "lastName": "Doe",
                "username": "jd",
            }),
        );
    }
}

/// Push a random score document at a fixed cadence so the leaderboard feed
/// has something to react to.
async fn run_demo_feed(store: Arc<MemoryStore>, config: AppConfig, interval: Duration) {
    loop {
        sleep(interval).await;

        let mut rng = rand::rng();
        let first = FIRST_NAMES[rng.random_range(0..FIRST_NAMES.len())];
        let last = LAST_NAMES[rng.random_range(0..LAST_NAMES.len())];
        let score: i64 = rng.random_range(1..100);

        store.upsert(
            &config.scores_collection,
            &Uuid::new_v4().simple().to_string(),
            json!({
                "score": score,
                "date": now_ms(),
                "firstName": first,
                "lastName": last,
            }),
        );
    }
}

/// Log every session snapshot the shell publishes.
fn log_sessions(app_state: &SharedState) {
    let mut sessions = WatchStream::new(app_state.session_watcher());
    tokio::spawn(async move {
        while let Some(session) = sessions.next().await {
            info!(
                phase = ?session.phase,
                ready = session.ready,
                user = session.profile.as_ref().map(|profile| profile.username.as_str()),
                roles = session.roles.len(),
                "session changed"
            );
        }
    });
}

/// Log every leaderboard delivery.
fn log_leaderboard(leaderboard: &LeaderboardView) {
    let mut snapshots = WatchStream::new(leaderboard.watcher());
    tokio::spawn(async move {
        while let Some(snapshot) = snapshots.next().await {
            let leader = snapshot.rows.first();
            info!(
                mode = ?snapshot.mode,
                loading = snapshot.loading,
                rows = snapshot.rows.len(),
                leader = leader.map(|row| row.full_name.as_str()),
                top_score = leader.map(|row| row.score),
                "leaderboard changed"
            );
        }
    });
}

fn now_ms() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the shell down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
