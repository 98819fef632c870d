use super::{create_linear_layers, mlp_forward, MlpConfig};
use crate::model::SubModel;
use anyhow::Result;
use candle_core::{Device, Tensor};
use candle_nn::{Linear, VarBuilder};

/// Multilayer perceptron with ReLU activation function.
pub struct Mlp {
    config: MlpConfig,
    device: Device,
    layers: Vec<Linear>,
}

impl SubModel for Mlp {
    type Config = MlpConfig;
    type Input = Tensor;
    type Output = Tensor;

    fn build(vb: VarBuilder, config: Self::Config) -> Result<Self> {
        let device = vb.device().clone();
        let layers = create_linear_layers(
            vb.pp("mlp"),
            config.in_dim,
            &config.units,
            Some(config.out_dim),
        )?;

        Ok(Self {
            config,
            device,
            layers,
        })
    }

    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let xs = xs.to_device(&self.device)?;
        let xs = mlp_forward(&xs, &self.layers)?;
        self.config.activation_out.forward(&xs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{mlp::Activation, model::Network};

    #[test]
    fn test_output_shape_and_activation() -> Result<()> {
        let config = MlpConfig::new(4, vec![8, 8], 3, Activation::Sigmoid);
        let net = Network::<Mlp>::build(config, &Device::Cpu)?;
        let xs = Tensor::randn(0f32, 3f32, (5, 4), &Device::Cpu)?;
        let ys = net.predict(&xs)?;
        assert_eq!(ys.dims(), &[5, 3]);
        let ys = ys.flatten_all()?.to_vec1::<f32>()?;
        assert!(ys.iter().all(|&y| y >= 0.0 && y <= 1.0));

        // Three layers, each with a weight and a bias.
        assert_eq!(net.vars()?.len(), 6);
        Ok(())
    }
}
