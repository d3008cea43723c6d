use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{
    f64::consts::{FRAC_PI_2, PI},
    fmt::Debug,
    fs,
    ops::{Bound, RangeBounds},
    path::Path,
};

/// Simulation configuration parameters.
///
/// Loaded from a TOML file and validated before use.
/// See [`Config::from_file`] for loading.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Grid geometry and seeding.
    pub world: WorldConfig,
    /// Nest placement and population.
    pub colony: ColonyConfig,
    /// Pheromone layer dynamics.
    pub pheromone: PheromoneConfig,
    /// Forager movement and sensing.
    pub agent: AgentConfig,
    /// Static food and obstacle layout.
    #[serde(default)]
    pub layout: LayoutConfig,
    /// Output cadence.
    pub output: OutputConfig,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct WorldConfig {
    /// Number of grid columns.
    pub cols: usize,
    /// Number of grid rows.
    pub rows: usize,
    /// Cell edge length in world units.
    pub cell_size: f64,
    /// Random seed (OS entropy if absent).
    #[serde(default)]
    pub seed: Option<u64>,
}

impl WorldConfig {
    pub fn width(&self) -> f64 {
        self.cols as f64 * self.cell_size
    }

    pub fn height(&self) -> f64 {
        self.rows as f64 * self.cell_size
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ColonyConfig {
    /// Nest center in world units.
    pub nest_x: f64,
    pub nest_y: f64,
    /// Nest radius in world units.
    pub nest_radius: f64,
    /// Number of foragers spawned at the nest.
    pub n_agents: usize,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct PheromoneConfig {
    /// Per-tick multiplicative decay factor.
    pub evaporation_rate: f32,
    /// Intensities below this value are snapped to zero after decay.
    pub epsilon: f32,
    /// Upper clamp applied on deposit.
    pub intensity_max: f32,
    /// Amount an agent deposits at its cell every tick.
    pub deposit: f32,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Distance travelled per tick in world units.
    pub speed: f64,
    /// Half-angle between the center and side sensors (radians).
    pub sensor_angle: f64,
    /// Sensor ray length in world units.
    pub sensor_length: f64,
    /// Heading correction toward the stronger side sensor (radians).
    pub turn_rate: f64,
    /// Magnitude of the random heading perturbation applied every tick (radians).
    pub wiggle: f64,
    /// Magnitude of the random turn used when wandering (radians).
    pub wander_turn: f64,
    /// Magnitude of the random jitter added to an obstacle bounce (radians).
    pub bounce_jitter: f64,
    /// Food units taken from a cell on pick-up.
    pub food_bite: u32,
}

#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    #[serde(default)]
    pub food: Vec<FoodPatch>,
    #[serde(default)]
    pub obstacles: Vec<Patch>,
}

/// Rectangle of cells, `width x height` starting at `(col, row)`.
#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
pub struct Patch {
    pub col: usize,
    pub row: usize,
    pub width: usize,
    pub height: usize,
}

impl Patch {
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> {
        let Patch {
            col,
            row,
            width,
            height,
        } = *self;
        (row..row + height).flat_map(move |r| (col..col + width).map(move |c| (c, r)))
    }
}

#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
pub struct FoodPatch {
    pub col: usize,
    pub row: usize,
    pub width: usize,
    pub height: usize,
    /// Food units placed in every cell of the patch.
    pub amount: u32,
}

impl FoodPatch {
    pub fn patch(&self) -> Patch {
        Patch {
            col: self.col,
            row: self.row,
            width: self.width,
            height: self.height,
        }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Number of ticks simulated per recorded frame.
    pub ticks_per_frame: usize,
    /// Number of frames written per trajectory file.
    pub frames_per_file: usize,
    /// Include agent positions and layer intensities in every frame.
    #[serde(default)]
    pub snapshots: bool,
}

impl Config {
    /// Load a [`Config`] from a file.
    ///
    /// The file must be TOML-encoded and contain a serialized [`Config`].
    /// Performs validation on all parameters before returning.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;
        Self::from_toml(&contents)
    }

    /// Parse and validate a [`Config`] from a TOML string.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents).context("failed to deserialize config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let world = &self.world;
        check_num(world.cols, 1..=4096).context("invalid number of columns")?;
        check_num(world.rows, 1..=4096).context("invalid number of rows")?;
        check_num(world.cols * world.rows, ..=4_194_304).context("invalid number of cells")?;
        check_num(world.cell_size, open(0.0, 1e6)).context("invalid cell size")?;

        let colony = &self.colony;
        check_num(colony.nest_x, 0.0..world.width()).context("invalid nest x coordinate")?;
        check_num(colony.nest_y, 0.0..world.height()).context("invalid nest y coordinate")?;
        check_num(colony.nest_radius, open(0.0, f64::INFINITY)).context("invalid nest radius")?;
        check_num(colony.n_agents, 0..=100_000).context("invalid number of agents")?;

        let pheromone = &self.pheromone;
        check_num(pheromone.evaporation_rate, open(0.0, 1.0))
            .context("invalid evaporation rate")?;
        check_num(pheromone.intensity_max, open(0.0, 1e6)).context("invalid maximum intensity")?;
        check_num(pheromone.epsilon, 0.0..pheromone.intensity_max)
            .context("invalid snapping epsilon")?;
        check_num(pheromone.deposit, open(0.0, f32::INFINITY))
            .context("invalid deposit amount")?;

        let agent = &self.agent;
        check_num(agent.speed, open(0.0, world.cell_size)).context("invalid agent speed")?;
        check_num(agent.sensor_angle, (Bound::Excluded(0.0), Bound::Included(FRAC_PI_2)))
            .context("invalid sensor angle")?;
        check_num(agent.sensor_length, open(0.0, f64::INFINITY))
            .context("invalid sensor length")?;
        check_num(agent.turn_rate, 0.0..=PI).context("invalid turn rate")?;
        check_num(agent.wiggle, 0.0..=PI).context("invalid wiggle magnitude")?;
        check_num(agent.wander_turn, 0.0..=PI).context("invalid wander turn")?;
        check_num(agent.bounce_jitter, 0.0..=FRAC_PI_2).context("invalid bounce jitter")?;
        check_num(agent.food_bite, 1..).context("invalid food bite")?;

        for (i_patch, food) in self.layout.food.iter().enumerate() {
            check_patch(&food.patch(), world)
                .and_then(|()| check_num(food.amount, 1..).context("invalid food amount"))
                .with_context(|| format!("invalid food patch {i_patch}"))?;
        }
        for (i_patch, patch) in self.layout.obstacles.iter().enumerate() {
            check_patch(patch, world).with_context(|| format!("invalid obstacle patch {i_patch}"))?;
        }

        let output = &self.output;
        check_num(output.ticks_per_frame, 1..10_000).context("invalid number of ticks per frame")?;
        check_num(output.frames_per_file, 1..100_000)
            .context("invalid number of frames per file")?;

        Ok(())
    }
}

fn open<T>(low: T, high: T) -> (Bound<T>, Bound<T>) {
    (Bound::Excluded(low), Bound::Excluded(high))
}

fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}

fn check_patch(patch: &Patch, world: &WorldConfig) -> Result<()> {
    check_num(patch.width, 1..).context("invalid patch width")?;
    check_num(patch.height, 1..).context("invalid patch height")?;
    // Patch must fit entirely inside the grid.
    if patch.col + patch.width > world.cols || patch.row + patch.height > world.rows {
        bail!(
            "patch {patch:?} exceeds the {}x{} grid",
            world.cols,
            world.rows
        );
    }
    Ok(())
}
