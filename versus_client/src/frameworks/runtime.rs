// Framework bootstrap for the headless versus client.

use crate::domain::{FlightTuning, Playfield, RoomCode};
use crate::frameworks::config;
use crate::frameworks::headless::HeadlessScene;
use crate::frameworks::profile::{Profile, ProfileStore, ScoreEntry};
use crate::interface_adapters::clients::negotiate::NegotiateClient;
use crate::interface_adapters::clock::SystemClock;
use crate::interface_adapters::transport::{LoopbackBus, RoomConnector};
use crate::interface_adapters::utils::rng::peer_id;
use crate::use_cases::{MatchOutcome, VersusMatch};

use rand::SeedableRng;
use rand::rngs::StdRng;
use std::io::{Error, Result};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::Notify;
use url::Url;

const PLAYFIELD: Playfield = Playfield {
    width: 480.0,
    height: 640.0,
};

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

async fn load_profile(store: &ProfileStore) -> Profile {
    match store.load().await {
        Ok(profile) => profile,
        Err(e) => {
            tracing::warn!(
                path = %store.path().display(),
                error = %e,
                "profile unreadable; starting fresh"
            );
            Profile::default()
        }
    }
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let store = ProfileStore::new(config::profile_path());
    let profile = load_profile(&store).await;
    let name = config::display_name().or(profile.name.clone());

    let room = RoomCode::parse(&config::room_code())
        .map_err(|e| Error::other(format!("invalid room code: {e}")))?;
    let endpoint = Url::parse(&config::negotiate_url())
        .map_err(|e| Error::other(format!("invalid negotiate url: {e}")))?;
    let negotiate = NegotiateClient::new(endpoint.clone(), config::negotiate_timeout())
        .map_err(|e| Error::other(format!("failed to initialize negotiate client: {e}")))?;
    tracing::debug!(
        negotiate_url = %endpoint,
        negotiate_timeout_ms = config::negotiate_timeout().as_millis(),
        "negotiate client configured"
    );

    let connector = Arc::new(RoomConnector::new(
        negotiate,
        LoopbackBus::shared(),
        config::join_timeout(),
    ));

    let (local_id, rng) = {
        let mut os_rng = rand::rng();
        (peer_id(&mut os_rng), StdRng::from_rng(&mut os_rng))
    };
    tracing::info!(room = %room, peer_id = %local_id, name = ?name, "entering room");

    let mut versus = VersusMatch::new(
        local_id,
        room,
        name.clone(),
        HeadlessScene::new(PLAYFIELD, FlightTuning::default()),
        Arc::new(SystemClock::new()),
        connector,
        config::match_settings(),
        rng,
    );

    versus
        .connect()
        .await
        .map_err(|e| Error::other(format!("online: failed to connect: {e}")))?;

    let shutdown = Arc::new(Notify::new());
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                shutdown.notify_one();
            }
        });
    }

    let outcome = versus.run(shutdown).await;
    report(&store, &outcome, name).await;
    Ok(())
}

async fn report(store: &ProfileStore, outcome: &MatchOutcome, name: Option<String>) {
    tracing::info!(
        role = ?outcome.role,
        local_score = outcome.local_score,
        remote_score = outcome.remote_score,
        remote_name = ?outcome.remote_name,
        degraded = outcome.degraded,
        "match finished"
    );

    if !outcome.played {
        return;
    }

    let entry = ScoreEntry {
        score: outcome.local_score,
        date: SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default(),
        name,
    };
    match store.record_score(entry).await {
        Ok(profile) => tracing::info!(best = ?profile.best(), "score recorded"),
        Err(e) => tracing::warn!(error = %e, "failed to record score"),
    }
}
