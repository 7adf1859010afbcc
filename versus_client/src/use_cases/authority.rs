// Local-authority emitter: throttled state snapshots for both peers, and
// obstacle/power-up generation on the leader only.

use crate::domain::{
    Clock, LocalEvent, ObstacleSpawn, PeerMessage, Phase, PlayerSnapshot, Playfield, PowerSpawn,
    Role, Scene, SpawnTuning, WorldEvent,
};
use crate::interface_adapters::utils::rng::power_up_pid;
use crate::use_cases::powerups::pick_power_kind;
use crate::use_cases::reconciler::materialize;
use crate::use_cases::session::Session;
use rand::Rng;
use tracing::debug;

/// Default snapshot rate; bounds bandwidth independent of the frame rate.
pub const SNAPSHOT_HZ: f64 = 25.0;

/// Accumulator that fires at a fixed frequency regardless of frame rate.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotThrottle {
    accum: f64,
    period: f64,
}

impl SnapshotThrottle {
    pub fn new(hz: f64) -> Self {
        Self {
            accum: 0.0,
            period: 1.0 / hz.max(1.0),
        }
    }

    /// Adds `dt` seconds; returns true when a snapshot is due.
    pub fn due(&mut self, dt: f64) -> bool {
        self.accum += dt;
        if self.accum >= self.period {
            self.accum = 0.0;
            return true;
        }
        false
    }
}

/// Leader-side generator of obstacles and power-ups.
///
/// The leader is the sole source of randomness for world layout; followers
/// replay the exact payloads it broadcasts.
pub struct SpawnDirector<R> {
    tuning: SpawnTuning,
    rng: R,
    // Seconds until the next obstacle; starts at zero so the first spawn is immediate.
    time_to_next: f64,
    speed: f64,
}

impl<R: Rng> SpawnDirector<R> {
    pub fn new(tuning: SpawnTuning, rng: R) -> Self {
        Self {
            speed: tuning.initial_speed,
            tuning,
            rng,
            time_to_next: 0.0,
        }
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Advances the spawn timer and returns the events due this frame.
    pub fn advance(
        &mut self,
        dt: f64,
        best_score: u32,
        field: Playfield,
        epoch_ms: f64,
    ) -> Vec<WorldEvent> {
        self.time_to_next -= dt;
        if self.time_to_next > 0.0 {
            return Vec::new();
        }

        let t = &self.tuning;
        let score = f64::from(best_score);
        self.speed = (self.speed + t.speed_step).min(t.max_speed);
        let gap = (t.base_gap - score * t.gap_per_score).max(t.min_gap);
        self.time_to_next = (t.base_interval - score * t.interval_per_score).max(t.min_interval);

        let min_top = t.edge_margin as i64;
        let max_top = ((field.height - gap - t.edge_margin).floor() as i64).max(min_top);
        let top_h = self.rng.random_range(min_top..=max_top) as f64;

        let obstacle = ObstacleSpawn {
            w: t.obstacle_width,
            gap,
            top_h,
            speed: self.speed,
        };
        let mut events = vec![WorldEvent::Obstacle(obstacle)];

        if self.rng.random_bool(t.power_up_chance.clamp(0.0, 1.0)) {
            let x = field.width + t.obstacle_width;
            let y = (top_h + gap * 0.5 - 8.0).min(field.height - 40.0).max(24.0);
            let kind = pick_power_kind(&mut self.rng, best_score);
            events.push(WorldEvent::PowerUp(PowerSpawn {
                pid: power_up_pid(&mut self.rng, epoch_ms),
                kind,
                x: x + t.power_up_offset,
                y,
                vx: -(self.speed * t.power_up_speed_ratio).max(t.power_up_min_speed),
            }));
        }

        events
    }
}

/// Per-frame outbound traffic of the local peer.
pub struct AuthorityEmitter<R> {
    throttle: SnapshotThrottle,
    director: SpawnDirector<R>,
}

impl<R: Rng> AuthorityEmitter<R> {
    pub fn new(snapshot_hz: f64, tuning: SpawnTuning, rng: R) -> Self {
        Self {
            throttle: SnapshotThrottle::new(snapshot_hz),
            director: SpawnDirector::new(tuning, rng),
        }
    }

    /// Emits this frame's snapshot, world events and local events.
    ///
    /// Does nothing until the session is running.
    pub fn tick<S: Scene + ?Sized>(
        &mut self,
        dt: f64,
        session: &mut Session,
        scene: &mut S,
        clock: &dyn Clock,
        remote_score: u32,
    ) {
        if session.phase() != Phase::Running {
            return;
        }

        let id = session.local_id().clone();
        let now = clock.monotonic_ms();
        let pose = scene.local_pose();

        if self.throttle.due(dt) {
            session.queue_outbound(PeerMessage::State {
                id: id.clone(),
                snapshot: PlayerSnapshot {
                    t: now,
                    x: pose.x,
                    y: pose.y,
                    vy: pose.vy,
                    score: pose.score,
                    hp: pose.hp,
                    name: session.name().map(str::to_string),
                },
            });
        }

        if session.role() == Role::Leader {
            let best = pose.score.max(remote_score);
            let events = self
                .director
                .advance(dt, best, scene.playfield(), clock.epoch_ms());
            for event in events {
                materialize(scene, &event);
                let message = match event {
                    WorldEvent::Obstacle(obstacle) => PeerMessage::Spawn {
                        id: id.clone(),
                        t: now,
                        obstacle,
                    },
                    WorldEvent::PowerUp(power) => {
                        debug!(pid = %power.pid, kind = power.kind.as_str(), "power-up spawned");
                        PeerMessage::PowerSpawn {
                            id: id.clone(),
                            t: now,
                            power,
                        }
                    }
                };
                session.queue_outbound(message);
            }
        }

        for event in scene.drain_local_events() {
            let message = match event {
                LocalEvent::Pickup { pid } => PeerMessage::Pickup {
                    id: id.clone(),
                    t: now,
                    pid,
                },
                LocalEvent::Shot(projectile) => PeerMessage::Shoot {
                    id: id.clone(),
                    t: now,
                    projectile,
                },
            };
            session.queue_outbound(message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PeerId, ProjectileSpawn, RoomCode, StartSignal};
    use crate::use_cases::session::SessionSettings;
    use crate::use_cases::test_support::{ManualClock, RecordingScene, RecordingWorld};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const FRAME: f64 = 1.0 / 60.0;

    fn field() -> Playfield {
        Playfield {
            width: 480.0,
            height: 640.0,
        }
    }

    fn running_session(local: &str, remote: &str, clock: &ManualClock) -> Session {
        let room = RoomCode::parse("abc").expect("room");
        let mut session = Session::new(
            PeerId::new(local),
            room.clone(),
            Some("Me".to_string()),
            SessionSettings::default(),
        );
        let mut world = RecordingWorld::default();
        session.handle_message(
            PeerMessage::Join {
                id: PeerId::new(remote),
                room: room.clone(),
                name: None,
            },
            clock,
            &mut world,
        );
        session.handle_message(
            PeerMessage::Start {
                id: PeerId::new(remote),
                room,
                signal: StartSignal {
                    t: 0.0,
                    start_at: None,
                    delay_ms: Some(300.0),
                },
            },
            clock,
            &mut world,
        );
        clock.advance(400.0);
        session.tick(FRAME, clock, &mut world);
        session.drain_outbox();
        session
    }

    #[test]
    fn when_frames_run_for_one_second_then_snapshot_rate_is_bounded() {
        let mut throttle = SnapshotThrottle::new(SNAPSHOT_HZ);
        let sent = (0..144).filter(|_| throttle.due(1.0 / 144.0)).count();
        assert!((20..=25).contains(&sent), "sent {sent}");

        let mut throttle = SnapshotThrottle::new(SNAPSHOT_HZ);
        let sent = (0..30).filter(|_| throttle.due(1.0 / 30.0)).count();
        assert_eq!(sent, 15);
    }

    #[test]
    fn when_director_first_advances_then_obstacle_spawns_immediately() {
        let mut director = SpawnDirector::new(SpawnTuning::default(), StdRng::seed_from_u64(1));

        let events = director.advance(FRAME, 0, field(), 1_700_000_000_000.0);

        let WorldEvent::Obstacle(obstacle) = &events[0] else {
            panic!("expected obstacle first");
        };
        assert_eq!(obstacle.w, 80.0);
        assert_eq!(obstacle.gap, 180.0);
        assert_eq!(obstacle.speed, 142.0);
        assert!(obstacle.top_h >= 40.0 && obstacle.top_h <= 640.0 - 180.0 - 40.0);
        assert_eq!(obstacle.top_h.fract(), 0.0);
        assert!(director.advance(FRAME, 0, field(), 0.0).is_empty());
    }

    #[test]
    fn when_score_is_high_then_gap_and_speed_are_clamped() {
        let mut director = SpawnDirector::new(SpawnTuning::default(), StdRng::seed_from_u64(2));
        let mut last = None;
        for _ in 0..100 {
            for event in director.advance(2.0, 60, field(), 0.0) {
                if let WorldEvent::Obstacle(obstacle) = event {
                    last = Some(obstacle);
                }
            }
        }
        let obstacle = last.expect("obstacles spawned");
        assert_eq!(obstacle.gap, 130.0);
        assert_eq!(obstacle.speed, 260.0);
    }

    #[test]
    fn when_power_up_spawns_then_it_trails_its_obstacle() {
        let mut director = SpawnDirector::new(SpawnTuning::default(), StdRng::seed_from_u64(3));
        let mut found = None;
        for _ in 0..200 {
            let events = director.advance(2.0, 0, field(), 1_700_000_000_000.0);
            if let [WorldEvent::Obstacle(obstacle), WorldEvent::PowerUp(power)] = events.as_slice()
            {
                found = Some((*obstacle, power.clone()));
                break;
            }
        }
        let (obstacle, power) = found.expect("a power-up within 200 spawns");
        assert_eq!(power.x, 480.0 + 80.0 + 140.0);
        let expected_y = (obstacle.top_h + obstacle.gap * 0.5 - 8.0).clamp(24.0, 600.0);
        assert_eq!(power.y, expected_y);
        assert_eq!(power.vx, -(obstacle.speed * 0.7).max(100.0));
        assert!(power.pid.starts_with("1700000000000-"));
    }

    #[test]
    fn when_session_is_not_running_then_nothing_is_emitted() {
        let clock = ManualClock::new(0.0, 0.0);
        let mut session = Session::new(
            PeerId::new("aaa"),
            RoomCode::parse("abc").expect("room"),
            None,
            SessionSettings::default(),
        );
        let mut scene = RecordingScene::default();
        let mut emitter = AuthorityEmitter::new(
            SNAPSHOT_HZ,
            SpawnTuning::default(),
            StdRng::seed_from_u64(4),
        );

        emitter.tick(1.0, &mut session, &mut scene, &clock, 0);

        assert!(session.drain_outbox().is_empty());
        assert!(scene.world.obstacles.is_empty());
    }

    #[test]
    fn when_leader_spawns_then_local_world_and_broadcast_match() {
        let clock = ManualClock::new(0.0, 1_700_000_000_000.0);
        let mut session = running_session("aaa", "zzz", &clock);
        assert_eq!(session.role(), Role::Leader);
        let mut scene = RecordingScene::default();
        let mut emitter = AuthorityEmitter::new(
            SNAPSHOT_HZ,
            SpawnTuning::default(),
            StdRng::seed_from_u64(5),
        );

        emitter.tick(FRAME, &mut session, &mut scene, &clock, 0);

        let sent: Vec<ObstacleSpawn> = session
            .drain_outbox()
            .into_iter()
            .filter_map(|m| match m {
                PeerMessage::Spawn { obstacle, .. } => Some(obstacle),
                _ => None,
            })
            .collect();
        assert_eq!(sent, scene.world.obstacles);
        assert_eq!(sent.len(), 1);
    }

    #[test]
    fn when_follower_ticks_then_it_never_generates_world_events() {
        let clock = ManualClock::new(0.0, 1_700_000_000_000.0);
        let mut session = running_session("zzz", "aaa", &clock);
        assert_eq!(session.role(), Role::Follower);
        let mut scene = RecordingScene::default();
        let mut emitter = AuthorityEmitter::new(
            SNAPSHOT_HZ,
            SpawnTuning::default(),
            StdRng::seed_from_u64(6),
        );

        for _ in 0..120 {
            emitter.tick(FRAME, &mut session, &mut scene, &clock, 0);
        }

        let outbox = session.drain_outbox();
        assert!(outbox.iter().all(|m| matches!(m, PeerMessage::State { .. })));
        assert!(!outbox.is_empty());
        assert!(scene.world.obstacles.is_empty());
    }

    #[test]
    fn when_local_pickup_and_shot_happen_then_they_are_broadcast() {
        let clock = ManualClock::new(0.0, 1_700_000_000_000.0);
        let mut session = running_session("zzz", "aaa", &clock);
        let mut scene = RecordingScene::default();
        scene.pending_events = vec![
            LocalEvent::Pickup {
                pid: "p1".to_string(),
            },
            LocalEvent::Shot(ProjectileSpawn {
                x: 1.0,
                y: 2.0,
                vx: 300.0,
                vy: 0.0,
                w: None,
                h: None,
                color: None,
            }),
        ];
        let mut emitter = AuthorityEmitter::new(
            SNAPSHOT_HZ,
            SpawnTuning::default(),
            StdRng::seed_from_u64(7),
        );

        emitter.tick(0.001, &mut session, &mut scene, &clock, 0);

        let outbox = session.drain_outbox();
        assert!(matches!(&outbox[0], PeerMessage::Pickup { pid, .. } if pid == "p1"));
        assert!(matches!(&outbox[1], PeerMessage::Shoot { .. }));
    }
}
