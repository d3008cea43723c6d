//! Per-tick forager behavior: deposit, sense, steer, move, interact.

use crate::config::Config;
use crate::field::{CellPos, Field};
use crate::model::{Agent, Mode, Nest};
use rand::Rng;
use std::f64::consts::{PI, TAU};

/// Sensor reading for an obstacle or the world edge.
pub const SENSOR_REPEL: f64 = -1.0e9;
/// Sensor reading for food (seeking) or the nest (returning) in sight.
pub const SENSOR_ATTRACT: f64 = 1.0e9;

/// What happened to an agent during its update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    PickedUp,
    Delivered,
}

/// Left, center and right sensor values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Readings {
    pub left: f64,
    pub center: f64,
    pub right: f64,
}

impl Agent {
    /// Advance the agent by one tick.
    ///
    /// Reads and writes the shared field; never touches other agents.
    pub fn update<R: Rng + ?Sized>(
        &mut self,
        field: &mut Field,
        nest: &Nest,
        cfg: &Config,
        rng: &mut R,
    ) -> Option<Event> {
        let params = &cfg.agent;

        let here = field.cell_at(self.x, self.y);
        field.deposit(here, self.mode.trail(), cfg.pheromone.deposit);

        let readings = self.sense(field, nest, params.sensor_angle, params.sensor_length);
        self.heading += steer(readings, params.turn_rate, params.wander_turn, rng);
        self.heading += jitter(rng, params.wiggle);

        self.advance(field, params.speed, params.bounce_jitter, rng);

        let event = self.interact(field, nest, here, params.food_bite);
        self.heading = normalize_angle(self.heading);
        event
    }

    /// Cast the three sensor rays.
    pub fn sense(&self, field: &Field, nest: &Nest, angle: f64, length: f64) -> Readings {
        Readings {
            left: self.probe(field, nest, self.heading - angle, length),
            center: self.probe(field, nest, self.heading, length),
            right: self.probe(field, nest, self.heading + angle, length),
        }
    }

    fn probe(&self, field: &Field, nest: &Nest, angle: f64, length: f64) -> f64 {
        let (dir_y, dir_x) = angle.sin_cos();
        let n_steps = (length / field.cell_size()).ceil().max(1.0) as usize;
        let step = length / n_steps as f64;

        // March cell by cell so walls block the view and goals are seen before the tip.
        let mut tip = field.cell_at(self.x, self.y);
        for i_step in 1..=n_steps {
            let dist = step * i_step as f64;
            let (px, py) = (self.x + dir_x * dist, self.y + dir_y * dist);
            tip = field.cell_at(px, py);
            if !field.contains(tip) || field.is_obstacle(tip) {
                return SENSOR_REPEL;
            }
            let goal = match self.mode {
                Mode::SeekingFood => field.food_at(tip) > 0,
                Mode::ReturningHome => nest.contains(px, py),
            };
            if goal {
                return SENSOR_ATTRACT;
            }
        }
        field.sample(tip, self.mode.target()) as f64
    }

    fn advance<R: Rng + ?Sized>(
        &mut self,
        field: &Field,
        speed: f64,
        bounce_jitter: f64,
        rng: &mut R,
    ) {
        let mut next_x = self.x + self.heading.cos() * speed;
        let mut next_y = self.y + self.heading.sin() * speed;

        // Keep positions strictly inside the last cell so every agent maps to a grid cell.
        let margin = field.cell_size() * 1e-9;
        let max_x = field.width() - margin;
        let max_y = field.height() - margin;
        if !(0.0..=max_x).contains(&next_x) {
            next_x = next_x.clamp(0.0, max_x);
            self.heading = PI - self.heading;
        }
        if !(0.0..=max_y).contains(&next_y) {
            next_y = next_y.clamp(0.0, max_y);
            self.heading = -self.heading;
        }

        let from = field.cell_at(self.x, self.y);
        let to = field.cell_at(next_x, next_y);
        if field.is_obstacle(to) && !field.is_obstacle(from) {
            self.heading += PI + jitter(rng, bounce_jitter);
            log::trace!("bounced off obstacle at {to:?}");
            return;
        }

        self.x = next_x;
        self.y = next_y;
    }

    /// Pick up or deliver food. `start` is the cell the agent occupied before moving.
    fn interact(
        &mut self,
        field: &mut Field,
        nest: &Nest,
        start: CellPos,
        food_bite: u32,
    ) -> Option<Event> {
        match self.mode {
            Mode::SeekingFood => {
                let landing = field.cell_at(self.x, self.y);
                let Some(pos) = [landing, start]
                    .into_iter()
                    .find(|&pos| field.food_at(pos) > 0)
                else {
                    return None;
                };
                field.consume_food(pos, food_bite);
                self.mode = Mode::ReturningHome;
                self.heading += PI;
                Some(Event::PickedUp)
            }
            Mode::ReturningHome => {
                if !nest.contains(self.x, self.y) {
                    return None;
                }
                self.mode = Mode::SeekingFood;
                self.heading += PI;
                Some(Event::Delivered)
            }
        }
    }
}

/// Heading correction for a set of sensor readings.
///
/// Negative turns toward the left sensor, positive toward the right one.
pub fn steer<R: Rng + ?Sized>(
    readings: Readings,
    turn_rate: f64,
    wander_turn: f64,
    rng: &mut R,
) -> f64 {
    let Readings {
        left,
        center,
        right,
    } = readings;
    if center > left && center > right {
        log::trace!("center is strongest, keeping heading");
        0.0
    } else if center < left && center < right {
        log::trace!("center is weakest, wandering");
        jitter(rng, wander_turn)
    } else if left > right {
        log::trace!("turning left");
        -turn_rate
    } else if right > left {
        log::trace!("turning right");
        turn_rate
    } else {
        log::trace!("no preferred side, wandering");
        jitter(rng, wander_turn)
    }
}

/// Uniform sample in `(-magnitude, magnitude)`, or zero.
fn jitter<R: Rng + ?Sized>(rng: &mut R, magnitude: f64) -> f64 {
    if magnitude > 0.0 {
        rng.random_range(-magnitude..magnitude)
    } else {
        0.0
    }
}

/// Wrap an angle into `[-PI, PI)`.
pub fn normalize_angle(angle: f64) -> f64 {
    (angle + PI).rem_euclid(TAU) - PI
}
