use super::{create_linear_layers, trunk_forward, MlpConfig};
use crate::model::SubModel;
use anyhow::Result;
use candle_core::{Device, Tensor};
use candle_nn::{linear, Linear, Module, VarBuilder};

/// Multilayer perceptron that outputs the mean and the log standard
/// deviation of a Gaussian, both of dimension `out_dim`.
///
/// `activation_out` of the configuration is ignored.
pub struct GaussianMlp {
    device: Device,
    layers: Vec<Linear>,
    mean: Linear,
    log_std: Linear,
}

impl SubModel for GaussianMlp {
    type Config = MlpConfig;
    type Input = Tensor;
    type Output = (Tensor, Tensor);

    fn build(vb: VarBuilder, config: Self::Config) -> Result<Self> {
        let device = vb.device().clone();
        let layers = create_linear_layers(vb.pp("mlp"), config.in_dim, &config.units, None)?;
        let last = config.units.last().copied().unwrap_or(config.in_dim);
        let mean = linear(last, config.out_dim, vb.pp("mean"))?;
        let log_std = linear(last, config.out_dim, vb.pp("log_std"))?;

        Ok(Self {
            device,
            layers,
            mean,
            log_std,
        })
    }

    fn forward(&self, xs: &Tensor) -> Result<(Tensor, Tensor)> {
        let xs = xs.to_device(&self.device)?;
        let h = trunk_forward(&xs, &self.layers)?;
        Ok((self.mean.forward(&h)?, self.log_std.forward(&h)?))
    }
}
