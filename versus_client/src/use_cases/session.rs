// Lobby/session state machine: waiting -> counting down -> running.
//
// All inputs are applied synchronously: an inbound message or a frame tick
// mutates the session in one step, so the next frame never observes a
// half-applied transition. Outgoing messages and notices are queued and drained
// by the match task.

use crate::domain::clock::{countdown_seconds, local_start_deadline};
use crate::domain::{
    Clock, Freshness, PeerId, PeerMessage, Phase, Pose, Role, RoomCode, SessionNotice,
    SessionState, StartSignal, WorldEvent, WorldSink, elect_role,
};
use crate::use_cases::reconciler::{RemoteReconciler, WorldEventQueue, materialize};
use std::time::Duration;
use tracing::{debug, info};

/// Timing knobs of the lobby handshake and remote smoothing.
#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    /// Interval between presence `join` re-sends while waiting.
    pub presence_interval: Duration,
    /// Pause after election before the leader commits to a start.
    pub settle_delay: Duration,
    /// How far in the future the leader schedules the start.
    pub countdown_delay: Duration,
    /// Minimum countdown accepted from any start signal.
    pub countdown_floor: Duration,
    /// Remote pose is rendered this far in the past.
    pub interp_buffer: Duration,
    /// Maximum buffered remote snapshots.
    pub history_capacity: usize,
    /// Presence is fresh below this age.
    pub fresh_within: Duration,
    /// Presence is stale at or above this age.
    pub stale_after: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            presence_interval: Duration::from_secs(1),
            settle_delay: Duration::from_millis(600),
            countdown_delay: Duration::from_millis(2200),
            countdown_floor: Duration::from_millis(300),
            interp_buffer: Duration::from_millis(100),
            history_capacity: 30,
            fresh_within: Duration::from_secs(2),
            stale_after: Duration::from_secs(5),
        }
    }
}

fn ms(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

pub struct Session {
    local_id: PeerId,
    room: RoomCode,
    name: Option<String>,
    settings: SessionSettings,
    state: SessionState,
    // Seconds accumulated towards the next presence re-send.
    presence_accum: f64,
    // Monotonic instant at which the leader broadcasts its start.
    pending_start_at: Option<f64>,
    // Start the leader broadcast, kept to answer late joins.
    start_signal: Option<StartSignal>,
    last_countdown_second: Option<u32>,
    reconciler: RemoteReconciler,
    queued: WorldEventQueue,
    outbox: Vec<PeerMessage>,
    notices: Vec<SessionNotice>,
}

impl Session {
    pub fn new(
        local_id: PeerId,
        room: RoomCode,
        name: Option<String>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            local_id,
            room,
            name,
            reconciler: RemoteReconciler::new(
                settings.history_capacity,
                ms(settings.interp_buffer),
            ),
            settings,
            state: SessionState::default(),
            presence_accum: 0.0,
            pending_start_at: None,
            start_signal: None,
            last_countdown_second: None,
            queued: WorldEventQueue::default(),
            outbox: Vec::new(),
            notices: Vec::new(),
        }
    }

    pub fn local_id(&self) -> &PeerId {
        &self.local_id
    }

    pub fn room(&self) -> &RoomCode {
        &self.room
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn role(&self) -> Role {
        self.state.role
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn queued_events(&self) -> usize {
        self.queued.len()
    }

    pub fn remote_name(&self) -> Option<&str> {
        self.state
            .remote_name
            .as_deref()
            .or_else(|| self.reconciler.remote_name())
    }

    /// Announces presence in the room; used on entry and after every reconnect.
    pub fn announce(&mut self) {
        self.presence_accum = 0.0;
        self.outbox.push(PeerMessage::Join {
            id: self.local_id.clone(),
            room: self.room.clone(),
            name: self.name.clone(),
        });
    }

    /// Best-effort withdrawal sent on scene teardown.
    pub fn leave_message(&self) -> PeerMessage {
        PeerMessage::Leave {
            id: self.local_id.clone(),
            room: self.room.clone(),
        }
    }

    pub(crate) fn queue_outbound(&mut self, message: PeerMessage) {
        self.outbox.push(message);
    }

    pub fn drain_outbox(&mut self) -> Vec<PeerMessage> {
        std::mem::take(&mut self.outbox)
    }

    pub fn drain_notices(&mut self) -> Vec<SessionNotice> {
        std::mem::take(&mut self.notices)
    }

    /// Presence freshness derived purely from the last inbound message time.
    pub fn freshness(&self, now_ms: f64) -> Freshness {
        let Some(last) = self.state.last_message_at else {
            return Freshness::Stale;
        };
        let age = now_ms - last;
        if age < ms(self.settings.fresh_within) {
            Freshness::Fresh
        } else if age < ms(self.settings.stale_after) {
            Freshness::Aging
        } else {
            Freshness::Stale
        }
    }

    /// Interpolated remote pose for this frame.
    pub fn remote_pose(&mut self, now_ms: f64) -> Pose {
        self.reconciler.sample(now_ms)
    }

    /// Applies one inbound message.
    pub fn handle_message<W: WorldSink + ?Sized>(
        &mut self,
        message: PeerMessage,
        clock: &dyn Clock,
        world: &mut W,
    ) {
        let now = clock.monotonic_ms();
        self.state.last_message_at = Some(now);

        let from_self = message.sender() == &self.local_id;
        match message {
            PeerMessage::Join { id, room, name } => {
                if from_self || !self.same_room(&room) {
                    return;
                }
                self.on_join(id, name, now);
            }
            PeerMessage::Leave { id, room } => {
                if from_self || !self.same_room(&room) {
                    return;
                }
                if self.state.remote_peer_id.as_ref() == Some(&id) {
                    self.on_remote_leave();
                }
            }
            PeerMessage::State { id, snapshot } => {
                if from_self {
                    return;
                }
                let is_remote = self.state.remote_peer_id.as_ref() == Some(&id);
                if self.state.remote_name.is_none() && is_remote {
                    self.state.remote_name = snapshot.name.clone();
                }
                self.reconciler.ingest(snapshot);
            }
            PeerMessage::Spawn { obstacle, .. } => {
                if from_self || self.state.role == Role::Leader {
                    return;
                }
                self.on_world_event(WorldEvent::Obstacle(obstacle), world);
            }
            PeerMessage::PowerSpawn { power, .. } => {
                if from_self || self.state.role == Role::Leader {
                    return;
                }
                self.on_world_event(WorldEvent::PowerUp(power), world);
            }
            PeerMessage::Pickup { pid, .. } => {
                // Idempotent: the power-up may already be gone locally.
                if !world.remove_power_up(&pid) {
                    debug!(pid, "pickup for unknown power-up ignored");
                }
            }
            PeerMessage::Shoot { projectile, .. } => {
                if !from_self {
                    world.spawn_projectile(&projectile);
                }
            }
            PeerMessage::Start { id, room, signal } => {
                if from_self || !self.same_room(&room) {
                    return;
                }
                if self.state.phase != Phase::Waiting {
                    debug!(from = %id, phase = ?self.state.phase, "start ignored outside waiting");
                    return;
                }
                self.begin_countdown(&signal, clock);
                info!(
                    from = %id,
                    remaining_ms = self.state.start_at_local.map(|at| at - now),
                    "countdown started by peer"
                );
            }
        }
    }

    /// Advances presence, the settle timer and the countdown by one frame.
    pub fn tick<W: WorldSink + ?Sized>(&mut self, dt: f64, clock: &dyn Clock, world: &mut W) {
        let now = clock.monotonic_ms();
        match self.state.phase {
            Phase::Waiting => {
                self.presence_accum += dt;
                if self.presence_accum >= self.settings.presence_interval.as_secs_f64() {
                    self.announce();
                }

                if let Some(at) = self.pending_start_at {
                    if now >= at {
                        self.pending_start_at = None;
                        if self.state.role == Role::Leader && self.state.remote_peer_id.is_some() {
                            self.broadcast_start(clock);
                        }
                    }
                }
            }
            Phase::CountingDown => {
                let deadline = self.state.start_at_local.unwrap_or(now);
                let seconds = countdown_seconds(deadline, now);
                if self.last_countdown_second != Some(seconds) {
                    self.last_countdown_second = Some(seconds);
                    if seconds > 0 {
                        self.notices.push(SessionNotice::CountdownTick { seconds });
                    }
                }

                if now >= deadline {
                    self.state.phase = Phase::Running;
                    let flushed = self.queued.flush(world);
                    self.notices.push(SessionNotice::Go);
                    info!(role = ?self.state.role, flushed, "match running");
                }
            }
            Phase::Running => {}
        }
    }

    fn same_room(&self, room: &RoomCode) -> bool {
        if room == &self.room {
            return true;
        }
        debug!(room = %room, "message for another room ignored");
        false
    }

    fn on_join(&mut self, id: PeerId, name: Option<String>, now: f64) {
        let is_new = self.state.remote_peer_id.as_ref() != Some(&id);
        if is_new {
            if self.state.remote_peer_id.is_some() {
                // A different peer took over the remote slot.
                self.reconciler.reset();
            }
            self.notices
                .push(SessionNotice::OpponentJoined { name: name.clone() });
        }

        let role = elect_role(&self.local_id, &id);
        if is_new {
            info!(remote = %id, role = ?role, "opponent joined");
        }
        self.state.role = role;
        self.state.remote_peer_id = Some(id);
        if name.is_some() {
            self.state.remote_name = name;
        }

        if role != Role::Leader {
            return;
        }
        match self.state.phase {
            Phase::Waiting => {
                if self.pending_start_at.is_none() {
                    self.pending_start_at = Some(now + ms(self.settings.settle_delay));
                }
            }
            Phase::CountingDown | Phase::Running => {
                // The follower is still announcing itself: it missed the start.
                if let Some(signal) = self.start_signal {
                    self.outbox.push(PeerMessage::Start {
                        id: self.local_id.clone(),
                        room: self.room.clone(),
                        signal,
                    });
                }
            }
        }
    }

    fn on_remote_leave(&mut self) {
        info!(phase = ?self.state.phase, "opponent left");
        self.state = SessionState {
            last_message_at: self.state.last_message_at,
            ..SessionState::default()
        };
        self.pending_start_at = None;
        self.start_signal = None;
        self.last_countdown_second = None;
        self.reconciler.reset();
        self.queued = WorldEventQueue::default();
        self.notices.push(SessionNotice::OpponentLeft);
        self.announce();
    }

    fn on_world_event<W: WorldSink + ?Sized>(&mut self, event: WorldEvent, world: &mut W) {
        if self.state.phase == Phase::Running {
            materialize(world, &event);
        } else {
            self.queued.push(event);
        }
    }

    fn broadcast_start(&mut self, clock: &dyn Clock) {
        let delay_ms = ms(self.settings.countdown_delay);
        let signal = StartSignal {
            t: clock.monotonic_ms(),
            start_at: Some(clock.epoch_ms() + delay_ms),
            delay_ms: Some(delay_ms),
        };
        self.outbox.push(PeerMessage::Start {
            id: self.local_id.clone(),
            room: self.room.clone(),
            signal,
        });
        self.start_signal = Some(signal);
        self.begin_countdown(&signal, clock);
        info!(delay_ms, "countdown scheduled as leader");
    }

    fn begin_countdown(&mut self, signal: &StartSignal, clock: &dyn Clock) {
        let deadline = local_start_deadline(
            signal,
            clock.epoch_ms(),
            clock.monotonic_ms(),
            ms(self.settings.countdown_floor),
        );
        self.state.start_at_local = Some(deadline);
        self.state.phase = Phase::CountingDown;
        self.pending_start_at = None;
        self.last_countdown_second = None;
    }
}
