use super::{create_linear_layers, trunk_forward};
use crate::model::SubModel;
use anyhow::Result;
use candle_core::{Device, Tensor, D};
use candle_nn::{linear, Linear, Module, VarBuilder};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`DuelingMlp`].
pub struct DuelingMlpConfig {
    /// Dimension of the encoded state.
    pub in_dim: usize,

    /// Units of the shared layers.
    pub units: Vec<usize>,

    /// Number of binary action dimensions.
    pub action_dim: usize,
}

/// Action values of multi-binary actions with a dueling decomposition.
///
/// A shared trunk feeds a state value head and one advantage head with two
/// outputs (released, pressed) per action dimension. The output has the
/// shape `[batch_size, action_dim, 2]`.
pub struct DuelingMlp {
    device: Device,
    action_dim: usize,
    trunk: Vec<Linear>,
    value: Linear,
    advantage: Linear,
}

/// Combines a state value `[B, 1]` and advantages `[B, A, 2]` into action values.
///
/// `Q = V + (A - mean(A))`, the mean taken over the two choices of each dimension.
pub fn dueling_combine(value: &Tensor, advantage: &Tensor) -> Result<Tensor> {
    let centered = advantage.broadcast_sub(&advantage.mean_keepdim(D::Minus1)?)?;
    Ok(centered.broadcast_add(&value.unsqueeze(D::Minus1)?)?)
}

impl DuelingMlp {
    /// Returns the state value `[B, 1]` and the advantages `[B, A, 2]`.
    pub fn value_advantage(&self, xs: &Tensor) -> Result<(Tensor, Tensor)> {
        let xs = xs.to_device(&self.device)?;
        let batch_size = xs.dims()[0];
        let h = trunk_forward(&xs, &self.trunk)?;
        let value = self.value.forward(&h)?;
        let advantage = self
            .advantage
            .forward(&h)?
            .reshape((batch_size, self.action_dim, 2))?;
        Ok((value, advantage))
    }
}

impl SubModel for DuelingMlp {
    type Config = DuelingMlpConfig;
    type Input = Tensor;
    type Output = Tensor;

    fn build(vb: VarBuilder, config: Self::Config) -> Result<Self> {
        let device = vb.device().clone();
        let trunk = create_linear_layers(vb.pp("trunk"), config.in_dim, &config.units, None)?;
        let last = config.units.last().copied().unwrap_or(config.in_dim);
        let value = linear(last, 1, vb.pp("value"))?;
        let advantage = linear(last, 2 * config.action_dim, vb.pp("advantage"))?;

        Ok(Self {
            device,
            action_dim: config.action_dim,
            trunk,
            value,
            advantage,
        })
    }

    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let (value, advantage) = self.value_advantage(xs)?;
        dueling_combine(&value, &advantage)
    }
}
