/// Gameplay tuning for leader-generated obstacles and power-ups.
///
/// Keep this separate from session timing (settle delay, countdown, buffers).

#[derive(Debug, Clone, Copy)]
pub struct SpawnTuning {
    /// Scroll speed of the first obstacle, in pixels per second.
    pub initial_speed: f64,

    /// Speed added on every obstacle spawn.
    pub speed_step: f64,

    /// Upper bound on obstacle speed.
    pub max_speed: f64,

    /// Gap between top and bottom pipes at score zero.
    pub base_gap: f64,

    /// Gap shrink per point of the best score.
    pub gap_per_score: f64,

    /// Smallest gap the director ever produces.
    pub min_gap: f64,

    /// Seconds between spawns at score zero.
    pub base_interval: f64,

    /// Interval shrink per point of the best score.
    pub interval_per_score: f64,

    /// Shortest interval between spawns.
    pub min_interval: f64,

    /// Obstacle width in pixels.
    pub obstacle_width: f64,

    /// Minimum pipe length at the top and bottom of the field.
    pub edge_margin: f64,

    /// Probability that an obstacle spawn also spawns a power-up.
    pub power_up_chance: f64,

    /// Horizontal offset of a power-up past its obstacle.
    pub power_up_offset: f64,

    /// Minimum leftward speed of a power-up.
    pub power_up_min_speed: f64,

    /// Power-up speed as a fraction of obstacle speed.
    pub power_up_speed_ratio: f64,
}

impl Default for SpawnTuning {
    fn default() -> Self {
        Self {
            initial_speed: 140.0,
            speed_step: 2.0,
            max_speed: 260.0,
            base_gap: 180.0,
            gap_per_score: 2.0,
            min_gap: 130.0,
            base_interval: 1.7,
            interval_per_score: 0.02,
            min_interval: 1.0,
            obstacle_width: 80.0,
            edge_margin: 40.0,
            power_up_chance: 0.3,
            power_up_offset: 140.0,
            power_up_min_speed: 100.0,
            power_up_speed_ratio: 0.7,
        }
    }
}

/// Flap physics used by the headless host.
#[derive(Debug, Clone, Copy)]
pub struct FlightTuning {
    /// Downward acceleration in pixels per second squared.
    pub gravity: f64,

    /// Vertical velocity applied on a flap (negative is up).
    pub jump_velocity: f64,

    /// Horizontal position of the local bird.
    pub start_x: f64,
}

impl Default for FlightTuning {
    fn default() -> Self {
        Self {
            gravity: 900.0,
            jump_velocity: -300.0,
            start_x: 120.0,
        }
    }
}
