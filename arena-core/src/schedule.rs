//! Annealed hyperparameters.
//!
//! The self-play loop keeps a [`ScheduleState`] and replaces it with an
//! updated copy after every training step. Annealed values are functions of
//! the number of training steps only, so a state restored from a checkpoint
//! continues the schedules where they stopped.
use crate::replay_buffer::PerConfig;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Linear interpolation from `start` to `end` over `n_steps` steps,
/// constant at `end` afterwards.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq)]
pub struct LinearSchedule {
    /// Value at step 0.
    pub start: f64,

    /// Value from step `n_steps` on.
    pub end: f64,

    /// Length of the annealing period.
    pub n_steps: usize,
}

impl LinearSchedule {
    /// Creates a schedule.
    pub fn new(start: f64, end: f64, n_steps: usize) -> Self {
        Self {
            start,
            end,
            n_steps,
        }
    }

    /// Value at the given step.
    pub fn value(&self, step: usize) -> f64 {
        if step >= self.n_steps {
            self.end
        } else {
            let d = self.end - self.start;
            self.start + d * (step as f64 / self.n_steps as f64)
        }
    }
}

/// Exploration rate decreasing by a constant amount per step down to a floor.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq)]
pub struct EpsilonDecay {
    /// Rate at step 0.
    pub start: f64,

    /// Lower bound.
    pub min: f64,

    /// Decrease per training step.
    pub decay: f64,
}

impl EpsilonDecay {
    /// Exploration rate at the given step.
    pub fn value(&self, step: usize) -> f64 {
        (self.start - self.decay * step as f64).max(self.min)
    }
}

impl Default for EpsilonDecay {
    fn default() -> Self {
        Self {
            start: 0.1,
            min: 0.01,
            decay: 1e-5,
        }
    }
}

/// Schedules of the relaxation temperature and the exploration rate.
///
/// The schedule of the importance weight exponent is part of
/// [`PerConfig`].
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ScheduleConfig {
    /// Temperature of the relaxed Bernoulli actions.
    pub temperature: LinearSchedule,

    /// Probability of replacing a policy action with a random one.
    pub epsilon: EpsilonDecay,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            temperature: LinearSchedule::new(0.5, 0.1, 100_000),
            epsilon: EpsilonDecay::default(),
        }
    }
}

impl ScheduleConfig {
    /// Sets the temperature schedule.
    pub fn temperature(mut self, temperature: LinearSchedule) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sets the exploration schedule.
    pub fn epsilon(mut self, epsilon: EpsilonDecay) -> Self {
        self.epsilon = epsilon;
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

/// Training step counter and the values annealed from it.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq)]
pub struct ScheduleState {
    /// Number of completed training steps.
    pub train_steps: usize,

    /// Importance weight exponent.
    pub beta: f64,

    /// Relaxation temperature.
    pub temperature: f64,

    /// Exploration rate.
    pub epsilon: f64,
}

impl ScheduleState {
    /// State after `train_steps` training steps.
    pub fn at(train_steps: usize, per: &PerConfig, config: &ScheduleConfig) -> Self {
        Self {
            train_steps,
            beta: per.beta_schedule().value(train_steps),
            temperature: config.temperature.value(train_steps),
            epsilon: config.epsilon.value(train_steps),
        }
    }

    /// State before any training.
    pub fn initial(per: &PerConfig, config: &ScheduleConfig) -> Self {
        Self::at(0, per, config)
    }

    /// Same counter with the annealed values recomputed.
    pub fn annealed(&self, per: &PerConfig, config: &ScheduleConfig) -> Self {
        Self::at(self.train_steps, per, config)
    }

    /// Counter advanced by one training step; annealed values unchanged.
    pub fn advanced(&self) -> Self {
        Self {
            train_steps: self.train_steps + 1,
            ..*self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_schedule_endpoints() {
        let s = LinearSchedule::new(0.4, 1.0, 100);
        assert_eq!(s.value(0), 0.4);
        assert!((s.value(50) - 0.7).abs() < 1e-12);
        assert_eq!(s.value(100), 1.0);
        assert_eq!(s.value(1_000_000), 1.0);

        let s = LinearSchedule::new(0.5, 0.1, 0);
        assert_eq!(s.value(0), 0.1);
    }

    #[test]
    fn test_epsilon_floor() {
        let e = EpsilonDecay {
            start: 1.0,
            min: 0.05,
            decay: 0.1,
        };
        assert_eq!(e.value(0), 1.0);
        assert!((e.value(5) - 0.5).abs() < 1e-12);
        assert_eq!(e.value(100), 0.05);
    }

    #[test]
    fn test_schedules_are_monotone_and_clamped() {
        let per = PerConfig::default().beta_anneal_frames(1000);
        let config = ScheduleConfig::default().temperature(LinearSchedule::new(0.5, 0.1, 700));
        let mut state = ScheduleState::initial(&per, &config);
        let mut prev = state;

        for _ in 0..2000 {
            state = state.advanced().annealed(&per, &config);
            assert!(state.beta >= prev.beta);
            assert!(state.beta <= per.beta_end);
            assert!(state.temperature <= prev.temperature);
            assert!(state.temperature >= config.temperature.end);
            assert!(state.epsilon <= prev.epsilon);
            prev = state;
        }
        assert_eq!(state.beta, 1.0);
        assert_eq!(state.temperature, 0.1);
    }

    #[test]
    fn test_advanced_keeps_values() {
        let per = PerConfig::default();
        let config = ScheduleConfig::default();
        let s = ScheduleState::at(10, &per, &config);
        let t = s.advanced();
        assert_eq!(t.train_steps, 11);
        assert_eq!(t.beta, s.beta);
        assert_eq!(t.temperature, s.temperature);
    }
}
