// Shared test doubles for use-case tests.

use crate::domain::{
    Clock, LocalEvent, ObstacleSpawn, Playfield, Pose, PowerSpawn, ProjectileSpawn, Scene,
    SessionNotice, WorldSink,
};
use std::sync::Mutex;

/// Clock whose monotonic and epoch readings only move when told to.
pub(crate) struct ManualClock {
    now: Mutex<(f64, f64)>,
}

impl ManualClock {
    pub(crate) fn new(monotonic_ms: f64, epoch_ms: f64) -> Self {
        Self {
            now: Mutex::new((monotonic_ms, epoch_ms)),
        }
    }

    pub(crate) fn advance(&self, ms: f64) {
        if let Ok(mut now) = self.now.lock() {
            now.0 += ms;
            now.1 += ms;
        }
    }

    pub(crate) fn set_epoch(&self, epoch_ms: f64) {
        if let Ok(mut now) = self.now.lock() {
            now.1 = epoch_ms;
        }
    }
}

impl Clock for ManualClock {
    fn monotonic_ms(&self) -> f64 {
        self.now.lock().map(|now| now.0).unwrap_or_default()
    }

    fn epoch_ms(&self) -> f64 {
        self.now.lock().map(|now| now.1).unwrap_or_default()
    }
}

/// World sink that records every spawn in order.
#[derive(Debug, Default)]
pub(crate) struct RecordingWorld {
    pub(crate) obstacles: Vec<ObstacleSpawn>,
    pub(crate) power_ups: Vec<PowerSpawn>,
    pub(crate) projectiles: Vec<ProjectileSpawn>,
    pub(crate) log: Vec<&'static str>,
}

impl WorldSink for RecordingWorld {
    fn spawn_obstacle(&mut self, obstacle: &ObstacleSpawn) {
        self.obstacles.push(*obstacle);
        self.log.push("obstacle");
    }

    fn spawn_power_up(&mut self, power: &PowerSpawn) {
        self.power_ups.push(power.clone());
        self.log.push("power");
    }

    fn remove_power_up(&mut self, pid: &str) -> bool {
        let before = self.power_ups.len();
        self.power_ups.retain(|p| p.pid != pid);
        before != self.power_ups.len()
    }

    fn spawn_projectile(&mut self, projectile: &ProjectileSpawn) {
        self.projectiles.push(projectile.clone());
        self.log.push("projectile");
    }
}

/// Scene double: a recording world plus scripted local pose and events.
#[derive(Debug)]
pub(crate) struct RecordingScene {
    pub(crate) world: RecordingWorld,
    pub(crate) playfield: Playfield,
    pub(crate) pose: Pose,
    pub(crate) remote_poses: Vec<Pose>,
    pub(crate) pending_events: Vec<LocalEvent>,
    pub(crate) notices: Vec<SessionNotice>,
    pub(crate) steps: usize,
}

impl Default for RecordingScene {
    fn default() -> Self {
        Self {
            world: RecordingWorld::default(),
            playfield: Playfield {
                width: 480.0,
                height: 640.0,
            },
            pose: Pose::default(),
            remote_poses: Vec::new(),
            pending_events: Vec::new(),
            notices: Vec::new(),
            steps: 0,
        }
    }
}

impl WorldSink for RecordingScene {
    fn spawn_obstacle(&mut self, obstacle: &ObstacleSpawn) {
        self.world.spawn_obstacle(obstacle);
    }

    fn spawn_power_up(&mut self, power: &PowerSpawn) {
        self.world.spawn_power_up(power);
    }

    fn remove_power_up(&mut self, pid: &str) -> bool {
        self.world.remove_power_up(pid)
    }

    fn spawn_projectile(&mut self, projectile: &ProjectileSpawn) {
        self.world.spawn_projectile(projectile);
    }
}

impl Scene for RecordingScene {
    fn playfield(&self) -> Playfield {
        self.playfield
    }

    fn step(&mut self, _dt: f64) {
        self.steps += 1;
    }

    fn local_pose(&self) -> Pose {
        self.pose
    }

    fn apply_remote_pose(&mut self, pose: &Pose) {
        self.remote_poses.push(*pose);
    }

    fn drain_local_events(&mut self) -> Vec<LocalEvent> {
        std::mem::take(&mut self.pending_events)
    }

    fn notify(&mut self, notice: &SessionNotice) {
        self.notices.push(notice.clone());
    }
}
