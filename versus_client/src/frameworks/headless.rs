// Headless host scene: minimal flap physics with an autopilot, so the binary
// can play a versus match without a renderer.

use crate::domain::{
    FlightTuning, LocalEvent, ObstacleSpawn, Playfield, Pose, PowerSpawn, ProjectileSpawn, Scene,
    SessionNotice, WorldSink,
};
use tracing::{debug, info};

const BIRD_SIZE: f64 = 24.0;
const PICKUP_RADIUS: f64 = 24.0;
const HIT_COOLDOWN: f64 = 1.0;
const SHOT_INTERVAL: f64 = 1.5;
const SHOT_SPEED: f64 = 420.0;
// Autopilot flaps once the bird sinks this far below the gap center.
const FLAP_MARGIN: f64 = 12.0;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Pipe {
    x: f64,
    spawn: ObstacleSpawn,
    passed: bool,
}

#[derive(Debug, Clone, PartialEq)]
struct PowerUp {
    spawn: PowerSpawn,
    x: f64,
}

#[derive(Debug, Clone, PartialEq)]
struct Shot {
    spawn: ProjectileSpawn,
    x: f64,
    y: f64,
}

pub struct HeadlessScene {
    tuning: FlightTuning,
    field: Playfield,
    pose: Pose,
    remote: Pose,
    pipes: Vec<Pipe>,
    power_ups: Vec<PowerUp>,
    shots: Vec<Shot>,
    events: Vec<LocalEvent>,
    hit_cooldown: f64,
    shot_timer: f64,
    notices: Vec<SessionNotice>,
}

impl HeadlessScene {
    pub fn new(field: Playfield, tuning: FlightTuning) -> Self {
        Self {
            pose: Pose {
                x: tuning.start_x,
                y: field.height * 0.5,
                ..Pose::default()
            },
            tuning,
            field,
            remote: Pose::default(),
            pipes: Vec::new(),
            power_ups: Vec::new(),
            shots: Vec::new(),
            events: Vec::new(),
            hit_cooldown: 0.0,
            shot_timer: SHOT_INTERVAL,
            notices: Vec::new(),
        }
    }

    pub fn pipes(&self) -> usize {
        self.pipes.len()
    }

    pub fn power_ups(&self) -> usize {
        self.power_ups.len()
    }

    pub fn remote_pose(&self) -> Pose {
        self.remote
    }

    pub fn notices(&self) -> &[SessionNotice] {
        &self.notices
    }

    fn autopilot(&mut self) {
        let bird_x = self.pose.x;
        let next = self
            .pipes
            .iter()
            .filter(|pipe| pipe.x + pipe.spawn.w >= bird_x)
            .min_by(|a, b| a.x.total_cmp(&b.x));
        let target = match next {
            Some(pipe) => pipe.spawn.top_h + pipe.spawn.gap * 0.5,
            None => self.field.height * 0.5,
        };
        if self.pose.y > target + FLAP_MARGIN && self.pose.vy >= 0.0 {
            self.pose.vy = self.tuning.jump_velocity;
        }
    }

    fn collide(&mut self, dt: f64) {
        self.hit_cooldown = (self.hit_cooldown - dt).max(0.0);
        let (x, y) = (self.pose.x, self.pose.y);
        let hit = self.pipes.iter().any(|pipe| {
            let overlaps_x = x + BIRD_SIZE > pipe.x && x < pipe.x + pipe.spawn.w;
            let in_gap = y > pipe.spawn.top_h && y + BIRD_SIZE < pipe.spawn.top_h + pipe.spawn.gap;
            overlaps_x && !in_gap
        });
        if hit && self.hit_cooldown == 0.0 && self.pose.hp > 0 {
            self.pose.hp -= 1;
            self.hit_cooldown = HIT_COOLDOWN;
            debug!(hp = self.pose.hp, "local bird hit");
        }
    }

    fn collect(&mut self) {
        let (x, y) = (self.pose.x, self.pose.y);
        let mut picked = Vec::new();
        self.power_ups.retain(|power| {
            let close =
                (power.x - x).abs() < PICKUP_RADIUS && (power.spawn.y - y).abs() < PICKUP_RADIUS;
            if close {
                picked.push(power.spawn.pid.clone());
            }
            !close
        });
        for pid in picked {
            debug!(pid, "power-up collected");
            self.events.push(LocalEvent::Pickup { pid });
        }
    }

    fn shoot(&mut self, dt: f64) {
        self.shot_timer -= dt;
        if self.shot_timer > 0.0 {
            return;
        }
        self.shot_timer = SHOT_INTERVAL;
        self.events.push(LocalEvent::Shot(ProjectileSpawn {
            x: self.pose.x + BIRD_SIZE,
            y: self.pose.y + BIRD_SIZE * 0.5,
            vx: SHOT_SPEED,
            vy: 0.0,
            w: None,
            h: None,
            color: None,
        }));
    }
}

impl WorldSink for HeadlessScene {
    fn spawn_obstacle(&mut self, obstacle: &ObstacleSpawn) {
        self.pipes.push(Pipe {
            x: self.field.width + obstacle.w,
            spawn: *obstacle,
            passed: false,
        });
    }

    fn spawn_power_up(&mut self, power: &PowerSpawn) {
        self.power_ups.push(PowerUp {
            x: power.x,
            spawn: power.clone(),
        });
    }

    fn remove_power_up(&mut self, pid: &str) -> bool {
        let before = self.power_ups.len();
        self.power_ups.retain(|power| power.spawn.pid != pid);
        before != self.power_ups.len()
    }

    fn spawn_projectile(&mut self, projectile: &ProjectileSpawn) {
        self.shots.push(Shot {
            x: projectile.x,
            y: projectile.y,
            spawn: projectile.clone(),
        });
    }
}

impl Scene for HeadlessScene {
    fn playfield(&self) -> Playfield {
        self.field
    }

    fn step(&mut self, dt: f64) {
        self.autopilot();
        self.pose.vy += self.tuning.gravity * dt;
        self.pose.y = (self.pose.y + self.pose.vy * dt).clamp(0.0, self.field.height - BIRD_SIZE);

        let bird_x = self.pose.x;
        let mut scored = 0;
        for pipe in &mut self.pipes {
            pipe.x -= pipe.spawn.speed * dt;
            if !pipe.passed && pipe.x + pipe.spawn.w < bird_x {
                pipe.passed = true;
                scored += 1;
            }
        }
        self.pose.score += scored;
        self.pipes.retain(|pipe| pipe.x + pipe.spawn.w > 0.0);

        for power in &mut self.power_ups {
            power.x += power.spawn.vx * dt;
        }
        self.power_ups.retain(|power| power.x > -PICKUP_RADIUS);

        let width = self.field.width;
        for shot in &mut self.shots {
            shot.x += shot.spawn.vx * dt;
            shot.y += shot.spawn.vy * dt;
        }
        self.shots.retain(|shot| shot.x > -BIRD_SIZE && shot.x < width + BIRD_SIZE);

        self.collide(dt);
        self.collect();
        self.shoot(dt);
    }

    fn local_pose(&self) -> Pose {
        self.pose
    }

    fn apply_remote_pose(&mut self, pose: &Pose) {
        self.remote = *pose;
    }

    fn drain_local_events(&mut self) -> Vec<LocalEvent> {
        std::mem::take(&mut self.events)
    }

    fn notify(&mut self, notice: &SessionNotice) {
        info!(notice = %notice.text(), "session notice");
        self.notices.push(notice.clone());
    }
}
