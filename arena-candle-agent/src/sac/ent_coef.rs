//! Entropy coefficient of SAC.
use crate::{
    opt::{Optimizer, OptimizerConfig},
    util::{clip_grads, NamedTensors},
};
use anyhow::Result;
use candle_core::{backprop::GradStore, DType, Device, Tensor};
use candle_nn::{init::Init, VarBuilder, VarMap};
use serde::{Deserialize, Serialize};

/// Mode of the entropy coefficient of SAC.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub enum EntCoefMode {
    /// Use a constant as alpha.
    Fix(f64),

    /// Learn `log(alpha)` toward a target entropy, starting from alpha = 1.
    Auto {
        /// Target entropy; minus the action dimension if not given.
        target_entropy: Option<f64>,

        /// Optimizer of `log(alpha)`.
        opt_config: OptimizerConfig,
    },
}

impl Default for EntCoefMode {
    fn default() -> Self {
        Self::Auto {
            target_entropy: None,
            opt_config: OptimizerConfig::Adam { lr: 3e-4 },
        }
    }
}

/// The entropy coefficient of SAC.
pub struct EntCoef {
    varmap: VarMap,
    log_alpha: Tensor,
    target_entropy: Option<f64>,
    grad_clip: Option<f64>,
    opt: Option<Optimizer>,
}

impl EntCoef {
    /// Constructs an instance of `EntCoef`.
    ///
    /// If `grad_clip` is given, the gradient of `log(alpha)` is clamped to
    /// `[-grad_clip, grad_clip]` before every update.
    pub fn new(
        mode: &EntCoefMode,
        action_dim: usize,
        grad_clip: Option<f64>,
        device: &Device,
    ) -> Result<Self> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);
        let (log_alpha, target_entropy, opt) = match mode {
            EntCoefMode::Fix(alpha) => {
                let init = Init::Const(alpha.ln());
                let log_alpha = vb.get_with_hints(1, "log_alpha", init)?;
                (log_alpha, None, None)
            }
            EntCoefMode::Auto {
                target_entropy,
                opt_config,
            } => {
                let init = Init::Const(0.0);
                let log_alpha = vb.get_with_hints(1, "log_alpha", init)?;
                let opt = opt_config.build(varmap.all_vars())?;
                let target_entropy = target_entropy.unwrap_or(-(action_dim as f64));
                (log_alpha, Some(target_entropy), Some(opt))
            }
        };

        Ok(Self {
            varmap,
            log_alpha,
            opt,
            target_entropy,
            grad_clip,
        })
    }

    /// Returns the entropy coefficient, a tensor of shape `[1]` without gradient.
    pub fn alpha(&self) -> Result<Tensor> {
        Ok(self.log_alpha.detach().exp()?)
    }

    /// Returns the entropy coefficient as a scalar.
    pub fn alpha_value(&self) -> Result<f32> {
        Ok(self.alpha()?.to_vec1::<f32>()?[0])
    }

    /// Target entropy, `None` for a fixed coefficient.
    pub fn target_entropy(&self) -> Option<f64> {
        self.target_entropy
    }

    /// The `log(alpha)` variable, a tensor of shape `[1]`.
    pub fn log_alpha(&self) -> &Tensor {
        &self.log_alpha
    }

    /// Computes the temperature loss and its clipped gradients.
    ///
    /// Returns `None` for a fixed coefficient.
    pub fn compute_gradients(&self, logp: &Tensor) -> Result<Option<(f32, GradStore)>> {
        let target_entropy = match self.target_entropy {
            Some(v) => v,
            None => return Ok(None),
        };
        let loss = self
            .log_alpha
            .broadcast_mul(&logp.affine(1.0, target_entropy)?.detach())?
            .mean_all()?
            .neg()?;
        let mut grads = loss.backward()?;
        if let Some(clip) = self.grad_clip {
            clip_grads(&mut grads, &self.varmap.all_vars(), clip)?;
        }
        Ok(Some((loss.to_scalar::<f32>()?, grads)))
    }

    /// Updates `log(alpha)` given log probabilities of sampled actions.
    ///
    /// Returns the loss, or `None` for a fixed coefficient.
    pub fn update(&mut self, logp: &Tensor) -> Result<Option<f32>> {
        let (loss, grads) = match self.compute_gradients(logp)? {
            Some(v) => v,
            None => return Ok(None),
        };
        match &mut self.opt {
            Some(opt) => opt.step(&grads)?,
            None => return Ok(None),
        }
        Ok(Some(loss))
    }

    /// Copies `log(alpha)` out.
    pub fn export(&self) -> Result<NamedTensors> {
        NamedTensors::copy_from(&self.varmap)
    }

    /// Overwrites `log(alpha)`.
    pub fn import(&self, params: &NamedTensors) -> Result<()> {
        params.copy_to(&self.varmap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_coefficient() -> Result<()> {
        let mut ent_coef = EntCoef::new(&EntCoefMode::Fix(0.2), 3, None, &Device::Cpu)?;
        assert!((ent_coef.alpha_value()? - 0.2).abs() < 1e-6);
        let logp = Tensor::from_slice(&[1f32, 2.0], (2,), &Device::Cpu)?;
        assert_eq!(ent_coef.update(&logp)?, None);
        assert!((ent_coef.alpha_value()? - 0.2).abs() < 1e-6);
        Ok(())
    }

    #[test]
    fn test_auto_coefficient_direction() -> Result<()> {
        let mode = EntCoefMode::Auto {
            target_entropy: None,
            opt_config: OptimizerConfig::Adam { lr: 0.1 },
        };
        let mut ent_coef = EntCoef::new(&mode, 2, None, &Device::Cpu)?;
        assert_eq!(ent_coef.target_entropy(), Some(-2.0));
        assert_eq!(ent_coef.alpha_value()?, 1.0);

        // Entropy above the target (logp + target < 0) lowers alpha.
        let logp = Tensor::from_slice(&[-5f32, -6.0], (2,), &Device::Cpu)?;
        ent_coef.update(&logp)?;
        assert!(ent_coef.alpha_value()? < 1.0);

        // Entropy below the target raises it again.
        let mut ent_coef = EntCoef::new(&mode, 2, None, &Device::Cpu)?;
        let logp = Tensor::from_slice(&[5f32, 6.0], (2,), &Device::Cpu)?;
        ent_coef.update(&logp)?;
        assert!(ent_coef.alpha_value()? > 1.0);
        Ok(())
    }
}
