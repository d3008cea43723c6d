use serde::{Deserialize, Serialize};

/// Streaming mean and standard deviation (Welford).
#[derive(Debug, Default)]
pub struct RunningStats {
    n_vals: usize,
    mean: f64,
    diff_2_sum: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RunningStatsReport {
    pub mean: f64,
    pub std_dev: f64,
}

impl RunningStats {
    pub fn add(&mut self, val: f64) {
        self.n_vals += 1;
        let diff_a = val - self.mean;
        self.mean += diff_a / self.n_vals as f64;
        let diff_b = val - self.mean;
        self.diff_2_sum += diff_a * diff_b;
    }

    pub fn report(&self) -> RunningStatsReport {
        RunningStatsReport {
            mean: if self.n_vals > 0 { self.mean } else { f64::NAN },
            std_dev: if self.n_vals > 1 {
                (self.diff_2_sum / (self.n_vals - 1) as f64).sqrt()
            } else {
                f64::NAN
            },
        }
    }
}

/// Correlated samples, summarized with a blocking estimate of the standard error.
#[derive(Debug, Default)]
pub struct Series {
    vals: Vec<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SeriesReport {
    pub mean: f64,
    pub std_dev: f64,
    pub sem: f64,
}

impl Series {
    pub fn push(&mut self, val: f64) {
        self.vals.push(val);
    }

    pub fn report(&self) -> SeriesReport {
        SeriesReport {
            mean: mean(&self.vals),
            std_dev: var(&self.vals).sqrt(),
            sem: blocked_sem(&self.vals),
        }
    }
}

fn mean(vals: &[f64]) -> f64 {
    if vals.is_empty() {
        return f64::NAN;
    }
    vals.iter().sum::<f64>() / vals.len() as f64
}

fn var(vals: &[f64]) -> f64 {
    if vals.len() < 2 {
        return f64::NAN;
    }
    let mean = mean(vals);
    vals.iter().map(|&val| (val - mean).powi(2)).sum::<f64>() / (vals.len() - 1) as f64
}

/// Standard error of the mean by Flyvbjerg-Petersen blocking.
///
/// Pairs are averaged until the squared-SEM estimate stops growing beyond its own error.
fn blocked_sem(vals: &[f64]) -> f64 {
    let mut blocks = vals.to_vec();
    let mut best = f64::NAN;
    while blocks.len() >= 2 {
        let n_blocks = blocks.len() as f64;
        let sem_2 = var(&blocks) / n_blocks;
        let err = sem_2 * (2.0 / (n_blocks - 1.0)).sqrt();
        if best.is_nan() || sem_2 - err > best {
            best = sem_2;
        } else {
            break;
        }
        blocks = blocks
            .chunks_exact(2)
            .map(|pair| (pair[0] + pair[1]) / 2.0)
            .collect();
    }
    best.sqrt()
}
