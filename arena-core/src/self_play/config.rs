//! Configuration of [`SelfPlay`](super::SelfPlay).
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::{Path, PathBuf},
    time::Duration,
};

/// Configuration of the self-play loop.
///
/// Intervals are counted in training steps. An interval of zero disables
/// the corresponding action.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct SelfPlayConfig {
    /// Training steps per training phase between two matches.
    pub train_iterations: usize,

    /// Interval of pushing a frozen copy of the live policy into the pool.
    pub checkpoint_interval: usize,

    /// Interval of writing the checkpoint document.
    pub save_interval: usize,

    /// Where the checkpoint document is written.
    pub checkpoint_path: Option<PathBuf>,

    /// Interval of flushing aggregated training records.
    pub flush_interval: usize,

    /// Maximum number of frozen policies in the pool.
    pub pool_size: usize,

    /// Probability of playing against the newest frozen policy.
    pub latest_opponent_prob: f64,

    /// Tick cap of a match; the capped tick ends the match.
    pub max_ticks: usize,

    /// Wait after starting a match, in milliseconds.
    pub start_delay_ms: u64,

    /// Wait between two ticks, in milliseconds.
    pub tick_interval_ms: u64,

    /// Action taken by both players while fewer than `forced_action_steps`
    /// training steps have been done.
    pub forced_action: Option<Vec<f32>>,

    /// Number of training steps during which `forced_action` is used.
    pub forced_action_steps: usize,

    /// Seed of exploration and opponent selection.
    pub seed: u64,
}

impl Default for SelfPlayConfig {
    fn default() -> Self {
        Self {
            train_iterations: 50,
            checkpoint_interval: 300,
            save_interval: 3000,
            checkpoint_path: None,
            flush_interval: 100,
            pool_size: 10,
            latest_opponent_prob: 0.5,
            max_ticks: 300,
            start_delay_ms: 1500,
            tick_interval_ms: 50,
            forced_action: None,
            forced_action_steps: 0,
            seed: 42,
        }
    }
}

impl SelfPlayConfig {
    /// Sets the number of training steps per training phase.
    pub fn train_iterations(mut self, v: usize) -> Self {
        self.train_iterations = v;
        self
    }

    /// Sets the interval of pool updates.
    pub fn checkpoint_interval(mut self, v: usize) -> Self {
        self.checkpoint_interval = v;
        self
    }

    /// Sets the interval of writing the checkpoint document.
    pub fn save_interval(mut self, v: usize) -> Self {
        self.save_interval = v;
        self
    }

    /// Sets the path of the checkpoint document.
    pub fn checkpoint_path(mut self, v: Option<PathBuf>) -> Self {
        self.checkpoint_path = v;
        self
    }

    /// Sets the interval of flushing records.
    pub fn flush_interval(mut self, v: usize) -> Self {
        self.flush_interval = v;
        self
    }

    /// Sets the pool size.
    pub fn pool_size(mut self, v: usize) -> Self {
        self.pool_size = v;
        self
    }

    /// Sets the probability of playing against the newest frozen policy.
    pub fn latest_opponent_prob(mut self, v: f64) -> Self {
        self.latest_opponent_prob = v;
        self
    }

    /// Sets the tick cap.
    pub fn max_ticks(mut self, v: usize) -> Self {
        self.max_ticks = v;
        self
    }

    /// Sets the wait after starting a match.
    pub fn start_delay_ms(mut self, v: u64) -> Self {
        self.start_delay_ms = v;
        self
    }

    /// Sets the wait between ticks.
    pub fn tick_interval_ms(mut self, v: u64) -> Self {
        self.tick_interval_ms = v;
        self
    }

    /// Sets the forced action and the number of training steps it is used for.
    pub fn forced_action(mut self, action: Option<Vec<f32>>, steps: usize) -> Self {
        self.forced_action = action;
        self.forced_action_steps = steps;
        self
    }

    /// Sets the seed.
    pub fn seed(mut self, v: u64) -> Self {
        self.seed = v;
        self
    }

    /// Wait after starting a match.
    pub fn start_delay(&self) -> Duration {
        Duration::from_millis(self.start_delay_ms)
    }

    /// Wait between ticks.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
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
