// Remote-state reconciliation: buffered interpolation of the opponent and
// pre-start queuing of leader world events.

use crate::domain::{PlayerSnapshot, Pose, WorldEvent, WorldSink};
use std::collections::VecDeque;

/// Buffers remote `state` snapshots and samples an interpolated pose per frame.
#[derive(Debug)]
pub struct RemoteReconciler {
    // Arrival-ordered, bounded history of remote snapshots.
    history: VecDeque<PlayerSnapshot>,
    capacity: usize,
    buffer_delay_ms: f64,
    last_pose: Pose,
    // Highest score reconciled for the current remote peer.
    score_floor: u32,
    remote_name: Option<String>,
}

impl RemoteReconciler {
    pub fn new(capacity: usize, buffer_delay_ms: f64) -> Self {
        Self {
            history: VecDeque::with_capacity(capacity.max(2)),
            capacity: capacity.max(2),
            buffer_delay_ms,
            last_pose: Pose::default(),
            score_floor: 0,
            remote_name: None,
        }
    }

    /// Appends a snapshot, evicting the oldest beyond capacity.
    pub fn ingest(&mut self, snapshot: PlayerSnapshot) {
        if let Some(name) = snapshot.name.as_ref() {
            self.remote_name = Some(name.clone());
        }
        self.history.push_back(snapshot);
        while self.history.len() > self.capacity {
            self.history.pop_front();
        }
    }

    /// Samples the remote pose `buffer_delay_ms` in the past.
    ///
    /// Superseded samples are discarded as time advances. With one sample the
    /// pose holds it exactly; with none the last known pose is returned.
    pub fn sample(&mut self, now_ms: f64) -> Pose {
        let target = now_ms - self.buffer_delay_ms;
        while self.history.len() >= 2 && self.history[1].t <= target {
            self.history.pop_front();
        }

        let pose = match (self.history.front(), self.history.get(1)) {
            (Some(a), Some(b)) => {
                let frac = ((target - a.t) / (b.t - a.t).max(1.0)).clamp(0.0, 1.0);
                Pose {
                    x: lerp(a.x, b.x, frac),
                    y: lerp(a.y, b.y, frac),
                    vy: lerp(a.vy, b.vy, frac),
                    // Scores are counters: never blended fractionally.
                    score: a.score.max(b.score),
                    hp: if frac >= 1.0 { b.hp } else { a.hp },
                }
            }
            (Some(a), None) => Pose {
                x: a.x,
                y: a.y,
                vy: a.vy,
                score: a.score,
                hp: a.hp,
            },
            _ => self.last_pose,
        };

        self.score_floor = self.score_floor.max(pose.score);
        self.last_pose = Pose {
            score: self.score_floor,
            ..pose
        };
        self.last_pose
    }

    pub fn last_pose(&self) -> Pose {
        self.last_pose
    }

    pub fn remote_name(&self) -> Option<&str> {
        self.remote_name.as_deref()
    }

    pub fn buffered(&self) -> usize {
        self.history.len()
    }

    /// Forgets the current remote peer, including its score floor.
    pub fn reset(&mut self) {
        self.history.clear();
        self.last_pose = Pose::default();
        self.score_floor = 0;
        self.remote_name = None;
    }
}

fn lerp(from: f64, to: f64, frac: f64) -> f64 {
    from + (to - from) * frac
}

/// Leader world events received before the match runs, in arrival order.
#[derive(Debug, Default)]
pub struct WorldEventQueue {
    pending: Vec<WorldEvent>,
}

impl WorldEventQueue {
    pub fn push(&mut self, event: WorldEvent) {
        self.pending.push(event);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Materializes every queued event once, in insertion order, and empties the queue.
    pub fn flush<W: WorldSink + ?Sized>(&mut self, world: &mut W) -> usize {
        let count = self.pending.len();
        for event in self.pending.drain(..) {
            materialize(world, &event);
        }
        count
    }
}

pub(crate) fn materialize<W: WorldSink + ?Sized>(world: &mut W, event: &WorldEvent) {
    match event {
        WorldEvent::Obstacle(obstacle) => world.spawn_obstacle(obstacle),
        WorldEvent::PowerUp(power) => world.spawn_power_up(power),
    }
}
