//! Optimizers.
use anyhow::Result;
use candle_core::{backprop::GradStore, Var};
use candle_nn::{AdamW, Optimizer as _, ParamsAdamW};
use candle_optimisers::adam::{Adam, ParamsAdam};
use serde::{Deserialize, Serialize};

fn default_weight_decay() -> f64 {
    ParamsAdamW::default().weight_decay
}

/// Optimizer of an estimator.
///
/// Moment decays and the denominator guard are the defaults of the
/// underlying crates.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub enum OptimizerConfig {
    /// AdamW of `candle-nn`.
    AdamW {
        /// Learning rate.
        lr: f64,

        /// Decoupled weight decay.
        #[serde(default = "default_weight_decay")]
        weight_decay: f64,
    },

    /// Adam of `candle-optimisers`.
    Adam {
        /// Learning rate.
        lr: f64,
    },
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self::Adam { lr: 3e-4 }
    }
}

impl OptimizerConfig {
    /// Builds the optimizer of the given variables.
    pub fn build(&self, vars: Vec<Var>) -> Result<Optimizer> {
        Ok(match *self {
            Self::AdamW { lr, weight_decay } => Optimizer::AdamW(AdamW::new(
                vars,
                ParamsAdamW {
                    lr,
                    weight_decay,
                    ..ParamsAdamW::default()
                },
            )?),
            Self::Adam { lr } => Optimizer::Adam(Adam::new(
                vars,
                ParamsAdam {
                    lr,
                    ..ParamsAdam::default()
                },
            )?),
        })
    }

    /// Learning rate.
    pub fn lr(&self) -> f64 {
        match *self {
            Self::AdamW { lr, .. } | Self::Adam { lr } => lr,
        }
    }

    /// Overrides the learning rate.
    pub fn learning_rate(mut self, v: f64) -> Self {
        match &mut self {
            Self::AdamW { lr, .. } | Self::Adam { lr } => *lr = v,
        }
        self
    }
}

/// An optimizer built from [`OptimizerConfig`].
pub enum Optimizer {
    /// AdamW.
    AdamW(AdamW),

    /// Adam.
    Adam(Adam),
}

impl Optimizer {
    /// Updates the variables with precomputed gradients.
    ///
    /// Variables without a gradient in `grads` are left untouched.
    pub fn step(&mut self, grads: &GradStore) -> Result<()> {
        match self {
            Self::AdamW(opt) => opt.step(grads)?,
            Self::Adam(opt) => opt.step(grads)?,
        }
        Ok(())
    }
}
