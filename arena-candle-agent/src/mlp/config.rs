use anyhow::Result;
use candle_core::Tensor;
use serde::{Deserialize, Serialize};

/// Activation applied to the output of an MLP.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone, Copy, Default)]
pub enum Activation {
    /// Identity.
    #[default]
    None,

    /// Hyperbolic tangent.
    Tanh,

    /// Logistic sigmoid.
    Sigmoid,
}

impl Activation {
    /// Applies the activation.
    pub fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        Ok(match self {
            Self::None => xs.clone(),
            Self::Tanh => xs.tanh()?,
            Self::Sigmoid => candle_nn::ops::sigmoid(xs)?,
        })
    }
}

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`Mlp`](super::Mlp) and [`GaussianMlp`](super::GaussianMlp).
pub struct MlpConfig {
    /// Input dimension.
    pub in_dim: usize,

    /// Units of the hidden layers.
    pub units: Vec<usize>,

    /// Output dimension.
    pub out_dim: usize,

    /// Activation of the output layer.
    #[serde(default)]
    pub activation_out: Activation,
}

impl MlpConfig {
    /// Creates configuration of MLP.
    pub fn new(in_dim: usize, units: Vec<usize>, out_dim: usize, activation_out: Activation) -> Self {
        Self {
            in_dim,
            units,
            out_dim,
            activation_out,
        }
    }
}
