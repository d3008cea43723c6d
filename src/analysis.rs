use crate::config::Config;
use crate::model::Record;
use crate::stats::{RunningStats, Series};
use anyhow::{Context, Result};
use rmp_serde::decode;
use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

/// Observable accumulated over the records of a run.
pub trait Obs {
    fn update(&mut self, record: &Record);
    fn report(&self) -> serde_json::Value;
}

/// Food delivered per tick, measured between consecutive records.
#[derive(Default)]
pub struct DeliveryRate {
    last: Option<(u64, u64)>,
    series: Series,
}

impl Obs for DeliveryRate {
    fn update(&mut self, record: &Record) {
        // A reset restarts both counters from zero, so either one going back marks it.
        let (last_tick, last_delivered) = match self.last {
            Some((tick, delivered)) if tick < record.tick && delivered <= record.delivered => {
                (tick, delivered)
            }
            _ => (0, 0),
        };
        if record.tick > last_tick {
            let rate =
                (record.delivered - last_delivered) as f64 / (record.tick - last_tick) as f64;
            self.series.push(rate);
        }
        self.last = Some((record.tick, record.delivered));
    }

    fn report(&self) -> serde_json::Value {
        serde_json::json!({ "delivery_rate": self.series.report() })
    }
}

#[derive(Default)]
pub struct CarryingFraction {
    stats: RunningStats,
}

impl Obs for CarryingFraction {
    fn update(&mut self, record: &Record) {
        if record.n_agents > 0 {
            self.stats.add(record.n_carrying as f64 / record.n_agents as f64);
        }
    }

    fn report(&self) -> serde_json::Value {
        serde_json::json!({ "carrying_fraction": self.stats.report() })
    }
}

#[derive(Default)]
pub struct TrailMass {
    home: RunningStats,
    food: RunningStats,
}

impl Obs for TrailMass {
    fn update(&mut self, record: &Record) {
        self.home.add(record.home_mass);
        self.food.add(record.food_mass);
    }

    fn report(&self) -> serde_json::Value {
        serde_json::json!({
            "home_mass": self.home.report(),
            "food_mass": self.food.report(),
        })
    }
}

/// Counters of the last record seen.
#[derive(Default)]
pub struct FinalCounts {
    last: Option<(u64, u64, u64)>,
}

impl Obs for FinalCounts {
    fn update(&mut self, record: &Record) {
        self.last = Some((record.tick, record.delivered, record.food_remaining));
    }

    fn report(&self) -> serde_json::Value {
        match self.last {
            Some((tick, delivered, food_remaining)) => serde_json::json!({
                "final": {
                    "tick": tick,
                    "delivered": delivered,
                    "food_remaining": food_remaining,
                }
            }),
            None => serde_json::json!({ "final": null }),
        }
    }
}

pub struct Analyzer {
    cfg: Config,
    obs_ptr_vec: Vec<Box<dyn Obs>>,
}

impl Analyzer {
    pub fn new(cfg: Config) -> Self {
        let obs_ptr_vec: Vec<Box<dyn Obs>> = vec![
            Box::new(DeliveryRate::default()),
            Box::new(CarryingFraction::default()),
            Box::new(TrailMass::default()),
            Box::new(FinalCounts::default()),
        ];
        Self { cfg, obs_ptr_vec }
    }

    /// Feed every record of a trajectory file to the observables.
    pub fn add_file<P: AsRef<Path>>(&mut self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
        let mut reader = BufReader::new(file);

        for _ in 0..self.cfg.output.frames_per_file {
            let record: Record = decode::from_read(&mut reader).context("failed to read record")?;
            for obs in &mut self.obs_ptr_vec {
                obs.update(&record);
            }
        }
        Ok(())
    }

    pub fn save_results<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(file);

        let reports: Vec<_> = self.obs_ptr_vec.iter().map(|obs| obs.report()).collect();
        serde_json::to_writer_pretty(&mut writer, &reports)
            .context("failed to serialize results")?;
        writer.flush().context("failed to flush writer stream")?;
        Ok(())
    }
}
