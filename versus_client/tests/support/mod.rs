// One relay per test binary, plus builders for headless versus peers.
#![allow(dead_code)]

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::Notify;
use url::Url;
use versus_client::domain::{FlightTuning, PeerId, Playfield, RoomCode};
use versus_client::frameworks::headless::HeadlessScene;
use versus_client::interface_adapters::clients::negotiate::NegotiateClient;
use versus_client::interface_adapters::clock::SystemClock;
use versus_client::interface_adapters::transport::{LoopbackBus, RoomConnector};
use versus_client::use_cases::{MatchSettings, VersusMatch};

static RELAY_URL: OnceLock<String> = OnceLock::new();

pub const PLAYFIELD: Playfield = Playfield {
    width: 480.0,
    height: 640.0,
};

// Starts the relay on first use and returns its base URL. The listener is bound
// here, so peers can connect as soon as this returns.
pub fn ensure_relay() -> &'static str {
    RELAY_URL.get_or_init(|| {
        let listener =
            std::net::TcpListener::bind("127.0.0.1:0").expect("bind ephemeral relay port");
        listener
            .set_nonblocking(true)
            .expect("relay listener must be non-blocking for tokio");
        let addr = listener.local_addr().expect("relay local addr");

        std::thread::Builder::new()
            .name("test-relay".to_string())
            .spawn(move || {
                let runtime = tokio::runtime::Builder::new_multi_thread()
                    .enable_all()
                    .build()
                    .expect("relay runtime");
                runtime.block_on(async move {
                    let listener =
                        tokio::net::TcpListener::from_std(listener).expect("adopt relay listener");
                    relay_server::run(listener).await.expect("relay stopped");
                });
            })
            .expect("spawn relay thread");

        format!("http://{addr}")
    })
}

pub fn unique_room() -> RoomCode {
    RoomCode::parse(&uuid::Uuid::new_v4().simple().to_string()).expect("uuid is a valid room code")
}

pub fn connector(negotiate_url: &str, bus: Arc<LoopbackBus>) -> Arc<RoomConnector> {
    let endpoint = Url::parse(negotiate_url).expect("negotiate url");
    let negotiate =
        NegotiateClient::new(endpoint, Duration::from_secs(2)).expect("negotiate client");
    Arc::new(RoomConnector::new(negotiate, bus, Duration::from_secs(2)))
}

// Wakes every running match at once, so no peer outlives the other long
// enough to see its `leave`.
pub fn stop_after(shutdown: Arc<Notify>, delay: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        shutdown.notify_waiters();
    })
}

pub fn peer(
    id: &str,
    name: &str,
    room: &RoomCode,
    connector: Arc<RoomConnector>,
    seed: u64,
) -> VersusMatch<HeadlessScene> {
    VersusMatch::new(
        PeerId::new(id),
        room.clone(),
        Some(name.to_string()),
        HeadlessScene::new(PLAYFIELD, FlightTuning::default()),
        Arc::new(SystemClock::new()),
        connector,
        MatchSettings::default(),
        StdRng::seed_from_u64(seed),
    )
}
