use crate::config::Config;
use crate::field::{Cell, Field};
use crate::forager::Event;
use crate::model::{Agent, Mode, Nest, Record, State};
use anyhow::{Context, Result, bail};
use clap::ValueEnum;
use rand::prelude::*;
use rand_chacha::ChaCha12Rng;
use rand_distr::Uniform;
use rmp_serde::{decode, encode};
use serde::{Deserialize, Serialize};
use std::{
    f64::consts::TAU,
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

/// Static-layer edit applied between ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Brush {
    Obstacle,
    Food,
    Erase,
}

/// Paint the square of cells within `radius` of `(col, row)`.
#[derive(Debug, Clone, Copy)]
pub struct PaintCommand {
    pub brush: Brush,
    pub col: usize,
    pub row: usize,
    pub radius: usize,
    /// Food units per cell, used by [`Brush::Food`].
    pub amount: u32,
}

/// Simulation engine.
///
/// Holds the configuration, current state, and random number generator,
/// and provides methods to initialize, run, save, and load simulations.
#[derive(Serialize, Deserialize)]
pub struct Engine {
    cfg: Config,
    state: State,
    rng: ChaCha12Rng,
}

impl Engine {
    /// Create a new `Engine` with every agent at the nest.
    pub fn generate_initial_condition(cfg: Config) -> Result<Self> {
        let mut rng = match cfg.world.seed {
            Some(seed) => ChaCha12Rng::seed_from_u64(seed),
            None => ChaCha12Rng::try_from_os_rng()?,
        };

        let agents = spawn_agents(&cfg, &mut rng).context("failed to spawn agents")?;

        let state = State {
            tick: 0,
            field: Field::from_config(&cfg),
            nest: Nest::new(
                cfg.colony.nest_x,
                cfg.colony.nest_y,
                cfg.colony.nest_radius,
            ),
            agents,
        };

        Ok(Self { cfg, state, rng })
    }

    pub fn cfg(&self) -> &Config {
        &self.cfg
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    /// Perform the simulation and save one record per frame to a binary file.
    pub fn run_simulation<P: AsRef<Path>>(&mut self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(file);

        let output = &self.cfg.output;
        let (frames_per_file, ticks_per_frame) = (output.frames_per_file, output.ticks_per_frame);
        let snapshots = output.snapshots;

        for i_frame in 0..frames_per_file {
            for _ in 0..ticks_per_frame {
                self.perform_step();
            }

            let record = Record::new(&self.state, snapshots);
            encode::write(&mut writer, &record).context("failed to serialize record")?;

            let progress = 100.0 * (i_frame + 1) as f64 / frames_per_file as f64;
            log::info!("completed {progress:06.2}%");
        }

        writer.flush().context("failed to flush writer stream")?;

        log::info!(
            "tick {}: {} food delivered",
            self.state.tick,
            self.state.nest.delivered
        );

        Ok(())
    }

    /// Save a checkpoint of the entire engine state.
    ///
    /// Can be used to resume the simulation later.
    pub fn save_checkpoint<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(file);
        encode::write(&mut writer, &self).context("failed to serialize engine")?;
        writer.flush().context("failed to flush writer stream")?;
        Ok(())
    }

    /// Load a previously saved engine checkpoint.
    pub fn load_checkpoint<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
        let mut reader = BufReader::new(file);
        let engine = decode::from_read(&mut reader).context("failed to deserialize engine")?;
        Ok(engine)
    }

    /// Advance every agent once, then decay the field.
    ///
    /// Agents update in order against the live field.
    pub fn perform_step(&mut self) {
        let State {
            tick,
            field,
            nest,
            agents,
        } = &mut self.state;

        for (i_agt, agt) in agents.iter_mut().enumerate() {
            match agt.update(field, nest, &self.cfg, &mut self.rng) {
                Some(Event::PickedUp) => {
                    log::debug!("tick {tick}: agent {i_agt} picked up food");
                }
                Some(Event::Delivered) => {
                    nest.delivered += 1;
                    log::debug!("tick {tick}: agent {i_agt} delivered food");
                }
                None => {}
            }
        }

        field.decay_all(self.cfg.pheromone.evaporation_rate);
        *tick += 1;
    }

    /// Apply a paint command to the static layer.
    pub fn apply_paint(&mut self, cmd: &PaintCommand) -> Result<()> {
        let field = &mut self.state.field;
        if cmd.col >= field.cols() || cmd.row >= field.rows() {
            bail!(
                "cell ({}, {}) is outside the {}x{} grid",
                cmd.col,
                cmd.row,
                field.cols(),
                field.rows()
            );
        }

        let cell = match cmd.brush {
            Brush::Obstacle => Cell::Obstacle,
            Brush::Erase => Cell::Empty,
            Brush::Food => {
                if cmd.amount == 0 {
                    bail!("food amount must be positive");
                }
                Cell::Food(cmd.amount)
            }
        };

        // Square clipped to the grid.
        let cols = cmd.col.saturating_sub(cmd.radius)
            ..=cmd.col.saturating_add(cmd.radius).min(field.cols() - 1);
        let rows = cmd.row.saturating_sub(cmd.radius)
            ..=cmd.row.saturating_add(cmd.radius).min(field.rows() - 1);
        for r in rows {
            for c in cols.clone() {
                field.set_cell((c as i64, r as i64), cell);
            }
        }
        log::debug!("applied {cmd:?}");

        Ok(())
    }

    /// Clear the pheromones, respawn all agents at the nest and zero the counters.
    ///
    /// The static layer is kept.
    pub fn reset(&mut self) -> Result<()> {
        self.state.agents =
            spawn_agents(&self.cfg, &mut self.rng).context("failed to spawn agents")?;
        self.state.field.clear_pheromones();
        self.state.nest.delivered = 0;
        self.state.tick = 0;
        log::debug!("reset {} agents", self.state.agents.len());
        Ok(())
    }
}

fn spawn_agents(cfg: &Config, rng: &mut ChaCha12Rng) -> Result<Vec<Agent>> {
    let heading_dist = Uniform::new(0.0, TAU)?;
    let (x, y) = (cfg.colony.nest_x, cfg.colony.nest_y);
    let agents = (0..cfg.colony.n_agents)
        .map(|_| Agent::new(x, y, heading_dist.sample(rng), Mode::SeekingFood))
        .collect();
    Ok(agents)
}
