//! Simulation data types.

use crate::field::{Field, Layer};
use serde::{Deserialize, Serialize};

/// Behavioral mode of a forager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    SeekingFood,
    ReturningHome,
}

impl Mode {
    /// Layer marked while walking in this mode.
    pub fn trail(self) -> Layer {
        match self {
            Mode::SeekingFood => Layer::Home,
            Mode::ReturningHome => Layer::Food,
        }
    }

    /// Layer followed while walking in this mode.
    pub fn target(self) -> Layer {
        match self {
            Mode::SeekingFood => Layer::Food,
            Mode::ReturningHome => Layer::Home,
        }
    }
}

/// Forager of the simulation.
///
/// Position is continuous in world units; heading is in radians.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub x: f64,
    pub y: f64,
    pub heading: f64,
    pub(crate) mode: Mode,
}

impl Agent {
    pub fn new(x: f64, y: f64, heading: f64, mode: Mode) -> Self {
        Self {
            x,
            y,
            heading,
            mode,
        }
    }

    pub fn carrying_food(&self) -> bool {
        self.mode == Mode::ReturningHome
    }
}

/// Circular drop-off zone, with the running count of delivered food.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Nest {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub delivered: u64,
}

impl Nest {
    pub fn new(x: f64, y: f64, radius: f64) -> Self {
        Self {
            x,
            y,
            radius,
            delivered: 0,
        }
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        let dx = x - self.x;
        let dy = y - self.y;
        dx * dx + dy * dy <= self.radius * self.radius
    }
}

/// State of the simulation at a given tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct State {
    /// Number of ticks simulated so far.
    pub tick: u64,
    pub field: Field,
    pub nest: Nest,
    pub agents: Vec<Agent>,
}

impl State {
    pub fn n_carrying(&self) -> usize {
        self.agents.iter().filter(|agt| agt.carrying_food()).count()
    }
}

/// Record of the simulation at a single frame.
#[derive(Debug, Serialize, Deserialize)]
pub struct Record {
    pub tick: u64,
    /// Food units delivered to the nest so far.
    pub delivered: u64,
    pub n_agents: usize,
    pub n_carrying: usize,
    pub home_mass: f64,
    pub food_mass: f64,
    pub food_remaining: u64,
    /// Render data, present when snapshots are enabled.
    pub snapshot: Option<Snapshot>,
}

impl Record {
    pub fn new(state: &State, with_snapshot: bool) -> Self {
        Self {
            tick: state.tick,
            delivered: state.nest.delivered,
            n_agents: state.agents.len(),
            n_carrying: state.n_carrying(),
            home_mass: state.field.mass(Layer::Home),
            food_mass: state.field.mass(Layer::Food),
            food_remaining: state.field.food_remaining(),
            snapshot: with_snapshot.then(|| Snapshot::new(state)),
        }
    }
}

/// Per-cell intensities and agent positions handed to a render target.
#[derive(Debug, Serialize, Deserialize)]
pub struct Snapshot {
    pub cols: usize,
    pub rows: usize,
    pub home: Vec<f32>,
    pub food: Vec<f32>,
    pub agents: Vec<AgentView>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AgentView {
    pub x: f64,
    pub y: f64,
    pub heading: f64,
    pub carrying_food: bool,
}

impl Snapshot {
    fn new(state: &State) -> Self {
        let field = &state.field;
        Self {
            cols: field.cols(),
            rows: field.rows(),
            home: field.home_layer().to_vec(),
            food: field.food_layer().to_vec(),
            agents: state
                .agents
                .iter()
                .map(|agt| AgentView {
                    x: agt.x,
                    y: agt.y,
                    heading: agt.heading,
                    carrying_food: agt.carrying_food(),
                })
                .collect(),
        }
    }
}
