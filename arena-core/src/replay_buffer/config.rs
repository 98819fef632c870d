//! Configuration of the replay buffer.
use crate::schedule::LinearSchedule;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    default::Default,
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of prioritized sampling.
///
/// ```rust
/// use arena_core::replay_buffer::PerConfig;
///
/// let config = PerConfig::default()
///     .alpha(0.6)
///     .beta_start(0.4)
///     .beta_end(1.0)
///     .beta_anneal_frames(100_000)
///     .per_fraction(0.75);
/// ```
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct PerConfig {
    /// Exponent of priorities. `0` gives uniform sampling.
    pub alpha: f64,

    /// Importance weight exponent at the first training step.
    pub beta_start: f64,

    /// Importance weight exponent after annealing.
    pub beta_end: f64,

    /// Training steps over which `beta` moves from `beta_start` to `beta_end`.
    pub beta_anneal_frames: usize,

    /// Fraction of each batch drawn by priority; the rest is drawn uniformly.
    pub per_fraction: f64,
}

impl Default for PerConfig {
    fn default() -> Self {
        Self {
            alpha: 0.6,
            beta_start: 0.4,
            beta_end: 1.0,
            beta_anneal_frames: 100_000,
            per_fraction: 1.0,
        }
    }
}

impl PerConfig {
    /// Sets the exponent of priorities.
    pub fn alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Sets the initial importance weight exponent.
    pub fn beta_start(mut self, beta_start: f64) -> Self {
        self.beta_start = beta_start;
        self
    }

    /// Sets the final importance weight exponent.
    pub fn beta_end(mut self, beta_end: f64) -> Self {
        self.beta_end = beta_end;
        self
    }

    /// Sets the number of training steps for annealing `beta`.
    pub fn beta_anneal_frames(mut self, beta_anneal_frames: usize) -> Self {
        self.beta_anneal_frames = beta_anneal_frames;
        self
    }

    /// Sets the fraction of prioritized samples in a batch.
    pub fn per_fraction(mut self, per_fraction: f64) -> Self {
        self.per_fraction = per_fraction;
        self
    }

    /// Annealing schedule of `beta`.
    pub fn beta_schedule(&self) -> LinearSchedule {
        LinearSchedule::new(self.beta_start, self.beta_end, self.beta_anneal_frames)
    }
}

/// Configuration of [`PrioritizedReplayBuffer`](super::PrioritizedReplayBuffer).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct ReplayBufferConfig {
    /// Maximum number of stored transitions.
    pub capacity: usize,

    /// Seed of the sampling random number generator.
    pub seed: u64,

    /// Prioritized sampling.
    pub per: PerConfig,
}

impl Default for ReplayBufferConfig {
    fn default() -> Self {
        Self {
            capacity: 500_000,
            seed: 42,
            per: PerConfig::default(),
        }
    }
}

impl ReplayBufferConfig {
    /// Sets the capacity.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the random seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the configuration of prioritized sampling.
    pub fn per(mut self, per: PerConfig) -> Self {
        self.per = per;
        self
    }

    /// Loads the configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves the configuration to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}
