//! Trainable networks.
use crate::{
    model::{Network, SubModel},
    opt::{Optimizer, OptimizerConfig},
    util::clip_grads,
};
use anyhow::Result;
use candle_core::{backprop::GradStore, Device, Tensor};
use log::trace;

/// A [`Network`] with its optimizer.
///
/// Training is split into [`Estimator::compute_gradients`] and
/// [`Estimator::apply_gradients`], so a loss can be inspected, or its
/// gradients clipped, before the variables change.
pub struct Estimator<M: SubModel> {
    net: Network<M>,
    opt: Optimizer,
    grad_clip: Option<f64>,
}

impl<M: SubModel> Estimator<M> {
    /// Builds an estimator with freshly initialized variables.
    ///
    /// If `grad_clip` is given, gradients are clamped element-wise to
    /// `[-grad_clip, grad_clip]` before every update.
    pub fn build(
        config: M::Config,
        opt_config: &OptimizerConfig,
        grad_clip: Option<f64>,
        device: &Device,
    ) -> Result<Self> {
        let net = Network::build(config, device)?;
        let opt = opt_config.build(net.vars()?)?;
        Ok(Self {
            net,
            opt,
            grad_clip,
        })
    }

    /// Applies the model.
    pub fn predict(&self, input: &M::Input) -> Result<M::Output> {
        self.net.predict(input)
    }

    /// The underlying network.
    pub fn network(&self) -> &Network<M> {
        &self.net
    }

    /// Gradients of `loss` with respect to all variables it depends on.
    ///
    /// Gradients of the variables of this estimator are clipped.
    pub fn compute_gradients(&self, loss: &Tensor) -> Result<GradStore> {
        let mut grads = loss.backward()?;
        if let Some(clip) = self.grad_clip {
            clip_grads(&mut grads, &self.net.vars()?, clip)?;
        }
        Ok(grads)
    }

    /// Updates the variables of this estimator; other gradients are ignored.
    pub fn apply_gradients(&mut self, grads: &GradStore) -> Result<()> {
        self.opt.step(grads)
    }

    /// Computes and applies the gradients of `loss`, returning its value.
    pub fn backward_step(&mut self, loss: &Tensor) -> Result<f32> {
        let value = loss.to_scalar::<f32>()?;
        trace!("backward_step, loss = {}", value);
        let grads = self.compute_gradients(loss)?;
        self.apply_gradients(&grads)?;
        Ok(value)
    }

    /// A bare copy of the network, e.g., a target network or a frozen policy.
    pub fn target(&self) -> Result<Network<M>> {
        self.net.deep_clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        mlp::{Activation, Mlp, MlpConfig},
        util::named_vars,
    };

    fn estimator(grad_clip: Option<f64>) -> Result<Estimator<Mlp>> {
        Estimator::build(
            MlpConfig::new(3, vec![4], 1, Activation::None),
            &OptimizerConfig::Adam { lr: 1e-2 },
            grad_clip,
            &Device::Cpu,
        )
    }

    fn loss(est: &Estimator<Mlp>, xs: &Tensor) -> Result<Tensor> {
        Ok(est.predict(xs)?.affine(1.0, -10.0)?.sqr()?.mean_all()?)
    }

    #[test]
    fn test_backward_step_reduces_loss() -> Result<()> {
        let mut est = estimator(None)?;
        let xs = Tensor::from_slice(&[0.1f32, 0.2, 0.3, -0.4, 0.5, 0.6], (2, 3), &Device::Cpu)?;
        let before = loss(&est, &xs)?.to_scalar::<f32>()?;
        for _ in 0..20 {
            est.backward_step(&loss(&est, &xs)?)?;
        }
        let after = loss(&est, &xs)?.to_scalar::<f32>()?;
        assert!(after < before);
        Ok(())
    }

    #[test]
    fn test_gradients_are_clipped() -> Result<()> {
        let est = estimator(Some(0.01))?;
        let xs = Tensor::from_slice(&[1f32, 2., 3.], (1, 3), &Device::Cpu)?;
        let grads = est.compute_gradients(&loss(&est, &xs)?)?;
        for var in named_vars(est.network().varmap())?.values() {
            if let Some(g) = grads.get(var.as_tensor()) {
                let g = g.flatten_all()?.to_vec1::<f32>()?;
                assert!(g.iter().all(|v| v.abs() <= 0.01 + 1e-7));
            }
        }
        Ok(())
    }

    #[test]
    fn test_target_is_independent() -> Result<()> {
        let mut est = estimator(None)?;
        let tgt = est.target()?;
        let xs = Tensor::from_slice(&[1f32, 2., 3.], (1, 3), &Device::Cpu)?;
        let y0 = tgt.predict(&xs)?.flatten_all()?.to_vec1::<f32>()?;
        assert_eq!(y0, est.predict(&xs)?.flatten_all()?.to_vec1::<f32>()?);

        est.backward_step(&loss(&est, &xs)?)?;
        assert_eq!(tgt.predict(&xs)?.flatten_all()?.to_vec1::<f32>()?, y0);
        assert_ne!(est.predict(&xs)?.flatten_all()?.to_vec1::<f32>()?, y0);

        tgt.copy_from(est.network())?;
        assert_eq!(
            tgt.predict(&xs)?.flatten_all()?.to_vec1::<f32>()?,
            est.predict(&xs)?.flatten_all()?.to_vec1::<f32>()?
        );
        Ok(())
    }
}
