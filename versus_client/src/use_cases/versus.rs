// Versus match task: owns the session, the transport and the host scene, and
// drives them from one select loop (frames, inbound messages, transport drops,
// reconnection results).

use crate::domain::{
    Clock, ConnectionError, Connector, Freshness, Link, PeerId, PeerMessage, Phase, Role,
    RoomCode, Scene, SessionNotice, SpawnTuning, TransportKind,
};
use crate::use_cases::authority::{AuthorityEmitter, SNAPSHOT_HZ};
use crate::use_cases::session::{Session, SessionSettings};
use crate::use_cases::supervisor::{ReconnectDecision, ReconnectPolicy, ReconnectSupervisor};
use rand::rngs::StdRng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, broadcast, mpsc};
use tracing::{Instrument, debug, info, info_span, warn};

/// Everything a match needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct MatchSettings {
    pub session: SessionSettings,
    pub reconnect: ReconnectPolicy,
    pub spawn: SpawnTuning,
    pub snapshot_hz: f64,
    /// Host frame period.
    pub frame_interval: Duration,
    /// Stop this long after the match starts running; `None` runs until shutdown.
    pub match_length: Option<Duration>,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            session: SessionSettings::default(),
            reconnect: ReconnectPolicy::default(),
            spawn: SpawnTuning::default(),
            snapshot_hz: SNAPSHOT_HZ,
            frame_interval: Duration::from_millis(16),
            match_length: None,
        }
    }
}

/// Final numbers of a match, for the local scoreboard.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchOutcome {
    pub role: Role,
    pub phase: Phase,
    pub local_score: u32,
    pub remote_score: u32,
    pub remote_name: Option<String>,
    /// The match reached running, even if the opponent left afterwards.
    pub played: bool,
    /// Reconnection budget was exhausted at some point.
    pub degraded: bool,
}

type ReconnectResult = Result<Box<dyn Link>, ConnectionError>;

pub struct VersusMatch<S> {
    session: Session,
    emitter: AuthorityEmitter<StdRng>,
    supervisor: ReconnectSupervisor,
    scene: S,
    clock: Arc<dyn Clock>,
    connector: Arc<dyn Connector>,
    settings: MatchSettings,
    played: bool,
    link: Option<Box<dyn Link>>,
    disconnect_rx: Option<broadcast::Receiver<()>>,
    // Survives reconnects: every transport instance pushes into the same sender.
    inbound_tx: mpsc::UnboundedSender<PeerMessage>,
    inbound_rx: mpsc::UnboundedReceiver<PeerMessage>,
    reconnect_tx: mpsc::UnboundedSender<(u32, ReconnectResult)>,
    reconnect_rx: mpsc::UnboundedReceiver<(u32, ReconnectResult)>,
}

impl<S: Scene + Send> VersusMatch<S> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        local_id: PeerId,
        room: RoomCode,
        name: Option<String>,
        scene: S,
        clock: Arc<dyn Clock>,
        connector: Arc<dyn Connector>,
        settings: MatchSettings,
        rng: StdRng,
    ) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (reconnect_tx, reconnect_rx) = mpsc::unbounded_channel();
        Self {
            session: Session::new(local_id, room, name, settings.session),
            emitter: AuthorityEmitter::new(settings.snapshot_hz, settings.spawn, rng),
            supervisor: ReconnectSupervisor::new(settings.reconnect),
            scene,
            clock,
            connector,
            settings,
            played: false,
            link: None,
            disconnect_rx: None,
            inbound_tx,
            inbound_rx,
            reconnect_tx,
            reconnect_rx,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn scene(&self) -> &S {
        &self.scene
    }

    pub fn into_scene(self) -> S {
        self.scene
    }

    /// Opens the room channel and announces presence.
    ///
    /// A failure here is fatal to the match: the scene is told and nothing runs.
    pub async fn connect(&mut self) -> Result<(), ConnectionError> {
        let room = self.session.room().clone();
        match self.connector.connect(&room, self.inbound_tx.clone()).await {
            Ok(link) => {
                info!(room = %room, transport = link.kind().as_str(), "connected");
                self.attach(link);
                self.scene.notify(&SessionNotice::Connected {
                    transport: self.link_kind(),
                });
                self.session.announce();
                self.flush();
                Ok(())
            }
            Err(e) => {
                warn!(room = %room, error = %e, "initial connect failed");
                self.scene.notify(&SessionNotice::ConnectionFailed {
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Runs frames until shutdown or the configured match length, then leaves.
    pub async fn run(&mut self, shutdown: Arc<Notify>) -> MatchOutcome {
        let span = info_span!(
            "versus",
            room = %self.session.room(),
            peer_id = %self.session.local_id()
        );
        self.run_loop(shutdown).instrument(span).await
    }

    async fn run_loop(&mut self, shutdown: Arc<Notify>) -> MatchOutcome {
        if self.link.is_none() {
            // Never connected: no countdown and no simulation.
            return self.outcome();
        }

        let mut interval = tokio::time::interval(self.settings.frame_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut last_frame = self.clock.monotonic_ms();
        let mut running_since: Option<f64> = None;
        let mut freshness = Freshness::Stale;

        loop {
            tokio::select! {
                _ = shutdown.notified() => {
                    info!("shutdown requested");
                    break;
                }
                Some(message) = self.inbound_rx.recv() => {
                    let clock = self.clock.clone();
                    self.session.handle_message(message, &*clock, &mut self.scene);
                    self.flush();
                }
                _ = wait_disconnect(&mut self.disconnect_rx) => {
                    self.on_disconnect();
                }
                Some((attempt, result)) = self.reconnect_rx.recv() => {
                    self.on_reconnect_result(attempt, result);
                }
                _ = interval.tick() => {
                    let now = self.clock.monotonic_ms();
                    let dt = ((now - last_frame) / 1000.0).clamp(0.0, 0.25);
                    last_frame = now;
                    self.frame(dt, now);

                    let current = self.session.freshness(now);
                    if current != freshness {
                        debug!(from = ?freshness, to = ?current, "presence freshness changed");
                        freshness = current;
                    }

                    if self.session.phase() == Phase::Running {
                        let since = *running_since.get_or_insert(now);
                        if let Some(length) = self.settings.match_length {
                            if now - since >= length.as_secs_f64() * 1000.0 {
                                info!("match length reached");
                                break;
                            }
                        }
                    }
                }
            }
        }

        self.leave();
        self.outcome()
    }

    fn frame(&mut self, dt: f64, now: f64) {
        let clock = self.clock.clone();
        self.session.tick(dt, &*clock, &mut self.scene);
        if self.session.phase() == Phase::Running {
            self.played = true;
            self.scene.step(dt);
        }

        let remote = self.session.remote_pose(now);
        self.scene.apply_remote_pose(&remote);
        self.emitter
            .tick(dt, &mut self.session, &mut self.scene, &*clock, remote.score);
        self.flush();
    }

    /// Sends queued messages and forwards notices to the scene.
    fn flush(&mut self) {
        let outbox = self.session.drain_outbox();
        match self.link.as_ref() {
            Some(link) => {
                for message in &outbox {
                    link.send(message);
                }
            }
            None if !outbox.is_empty() => {
                debug!(dropped = outbox.len(), "no transport; outbound messages dropped");
            }
            None => {}
        }

        for notice in self.session.drain_notices() {
            self.scene.notify(&notice);
        }
    }

    fn attach(&mut self, link: Box<dyn Link>) {
        self.disconnect_rx = Some(link.disconnected());
        self.link = Some(link);
    }

    fn link_kind(&self) -> TransportKind {
        self.link
            .as_ref()
            .map(|link| link.kind())
            .unwrap_or(TransportKind::Relay)
    }

    fn on_disconnect(&mut self) {
        warn!(phase = ?self.session.phase(), "transport disconnected");
        self.disconnect_rx = None;
        if let Some(mut link) = self.link.take() {
            link.close();
        }
        self.scene.notify(&SessionNotice::Disconnected);
        let decision = self.supervisor.on_disconnect();
        self.apply_decision(decision);
    }

    fn on_reconnect_result(&mut self, attempt: u32, result: ReconnectResult) {
        match result {
            Ok(link) => {
                info!(attempt, transport = link.kind().as_str(), "reconnected");
                self.supervisor.on_success();
                self.attach(link);
                self.scene.notify(&SessionNotice::Reconnected);
                // Replay the handshake so election and countdown re-trigger.
                self.session.announce();
                self.flush();
            }
            Err(e) => {
                warn!(attempt, error = %e, "reconnect attempt failed");
                self.scene.notify(&SessionNotice::ReconnectFailed {
                    attempt,
                    reason: e.to_string(),
                });
                let decision = self.supervisor.on_failure();
                self.apply_decision(decision);
            }
        }
    }

    fn apply_decision(&mut self, decision: ReconnectDecision) {
        match decision {
            ReconnectDecision::Schedule { attempt, delay } => {
                info!(attempt, delay_ms = delay.as_millis() as u64, "reconnect scheduled");
                self.scene.notify(&SessionNotice::Reconnecting { attempt });
                let connector = self.connector.clone();
                let room = self.session.room().clone();
                let inbound = self.inbound_tx.clone();
                let results = self.reconnect_tx.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    // Fresh transport instance; the old one was discarded.
                    let result = connector.connect(&room, inbound).await;
                    let _ = results.send((attempt, result));
                });
            }
            ReconnectDecision::InFlight => {}
            ReconnectDecision::Exhausted => {
                warn!(
                    attempts = self.supervisor.attempts(),
                    "reconnect budget exhausted; continuing offline"
                );
                self.scene.notify(&SessionNotice::Degraded);
            }
        }
    }

    /// Best-effort `leave` and transport release; never fails.
    pub fn leave(&mut self) {
        self.disconnect_rx = None;
        if let Some(mut link) = self.link.take() {
            link.send(&self.session.leave_message());
            link.close();
            debug!("left room");
        }
    }

    fn outcome(&mut self) -> MatchOutcome {
        let now = self.clock.monotonic_ms();
        MatchOutcome {
            role: self.session.role(),
            phase: self.session.phase(),
            local_score: self.scene.local_pose().score,
            remote_score: self.session.remote_pose(now).score,
            remote_name: self.session.remote_name().map(str::to_string),
            played: self.played,
            degraded: self.supervisor.is_exhausted(),
        }
    }
}

async fn wait_disconnect(rx: &mut Option<broadcast::Receiver<()>>) {
    let Some(rx) = rx.as_mut() else {
        return std::future::pending().await;
    };
    loop {
        match rx.recv().await {
            Ok(()) | Err(broadcast::error::RecvError::Closed) => return,
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
        }
    }
}
