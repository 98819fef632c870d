//! Twin critics of the soft actor-critic agents.
use crate::{
    estimator::Estimator,
    mlp::{Activation, Mlp, MlpConfig},
    model::Network,
    opt::OptimizerConfig,
    util::{weighted_huber_loss, NamedTensors},
};
use anyhow::Result;
use candle_core::{Device, Tensor, D};
use log::trace;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`TwinCritic`].
pub struct CriticConfig {
    /// Units of the hidden layers.
    pub units: Vec<usize>,

    /// Optimizer of each critic.
    pub opt_config: OptimizerConfig,
}

impl Default for CriticConfig {
    fn default() -> Self {
        Self {
            units: vec![256, 256],
            opt_config: OptimizerConfig::Adam { lr: 3e-4 },
        }
    }
}

impl CriticConfig {
    /// Sets the units of the hidden layers.
    pub fn units(mut self, v: Vec<usize>) -> Self {
        self.units = v;
        self
    }

    /// Sets the optimizer.
    pub fn opt_config(mut self, v: OptimizerConfig) -> Self {
        self.opt_config = v;
        self
    }
}

/// Losses of a critic update.
pub struct CriticUpdate {
    /// Loss of the first critic.
    pub loss_q1: f32,

    /// Loss of the second critic.
    pub loss_q2: f32,

    /// `|target - Q1|` per sample.
    pub td_errors: Vec<f64>,
}

/// Two action-value estimators with target copies.
///
/// Each critic maps the concatenation of state and action to a scalar.
pub struct TwinCritic {
    q1: Estimator<Mlp>,
    q2: Estimator<Mlp>,
    q1_tgt: Network<Mlp>,
    q2_tgt: Network<Mlp>,
}

fn input(obs: &Tensor, act: &Tensor) -> Result<Tensor> {
    Ok(Tensor::cat(&[obs, act], D::Minus1)?)
}

fn value(net: &Network<Mlp>, xs: &Tensor) -> Result<Tensor> {
    Ok(net.predict(xs)?.squeeze(D::Minus1)?)
}

impl TwinCritic {
    /// Builds the critics; the targets start as copies of them.
    pub fn build(
        config: &CriticConfig,
        state_dim: usize,
        action_dim: usize,
        grad_clip: Option<f64>,
        device: &Device,
    ) -> Result<Self> {
        let mlp_config = MlpConfig::new(
            state_dim + action_dim,
            config.units.clone(),
            1,
            Activation::None,
        );
        let q1 = Estimator::build(mlp_config.clone(), &config.opt_config, grad_clip, device)?;
        let q2 = Estimator::build(mlp_config, &config.opt_config, grad_clip, device)?;
        let q1_tgt = q1.target()?;
        let q2_tgt = q2.target()?;

        Ok(Self {
            q1,
            q2,
            q1_tgt,
            q2_tgt,
        })
    }

    /// Action values `[B]` of both critics.
    pub fn q(&self, obs: &Tensor, act: &Tensor) -> Result<(Tensor, Tensor)> {
        let xs = input(obs, act)?;
        Ok((value(self.q1.network(), &xs)?, value(self.q2.network(), &xs)?))
    }

    /// Element-wise minimum of the two critics.
    pub fn q_min(&self, obs: &Tensor, act: &Tensor) -> Result<Tensor> {
        let (q1, q2) = self.q(obs, act)?;
        Ok(q1.minimum(&q2)?)
    }

    /// Element-wise minimum of the two target critics.
    pub fn target_min(&self, obs: &Tensor, act: &Tensor) -> Result<Tensor> {
        let xs = input(obs, act)?;
        let q1 = value(&self.q1_tgt, &xs)?;
        let q2 = value(&self.q2_tgt, &xs)?;
        Ok(q1.minimum(&q2)?)
    }

    /// Trains both critics toward `target` with the importance-weighted Huber loss.
    pub fn update(
        &mut self,
        obs: &Tensor,
        act: &Tensor,
        target: &Tensor,
        weight: &Tensor,
    ) -> Result<CriticUpdate> {
        let xs = input(obs, act)?;
        let target = target.detach();

        trace!("update q1");
        let q1 = value(self.q1.network(), &xs)?;
        let td_errors = crate::util::to_f64s(&(&target - &q1)?.abs()?)?;
        let loss_q1 = self
            .q1
            .backward_step(&weighted_huber_loss(&q1, &target, weight)?)?;

        trace!("update q2");
        let q2 = value(self.q2.network(), &xs)?;
        let loss_q2 = self
            .q2
            .backward_step(&weighted_huber_loss(&q2, &target, weight)?)?;

        Ok(CriticUpdate {
            loss_q1,
            loss_q2,
            td_errors,
        })
    }

    /// Polyak update of the targets.
    pub fn soft_update(&self, tau: f64) -> Result<()> {
        self.q1_tgt.track(self.q1.network(), tau)?;
        self.q2_tgt.track(self.q2.network(), tau)
    }

    /// Adds the parameters of the four networks to `params`.
    pub fn export_into(&self, params: &mut NamedTensors) -> Result<()> {
        params.insert_prefixed("q1", self.q1.network().export()?);
        params.insert_prefixed("q2", self.q2.network().export()?);
        params.insert_prefixed("q1_tgt", self.q1_tgt.export()?);
        params.insert_prefixed("q2_tgt", self.q2_tgt.export()?);
        Ok(())
    }

    /// Overwrites the parameters of the four networks.
    pub fn import_from(&self, params: &NamedTensors) -> Result<()> {
        self.q1.network().import(&params.prefixed("q1"))?;
        self.q2.network().import(&params.prefixed("q2"))?;
        self.q1_tgt.import(&params.prefixed("q1_tgt"))?;
        self.q2_tgt.import(&params.prefixed("q2_tgt"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn critic() -> Result<TwinCritic> {
        TwinCritic::build(
            &CriticConfig::default().units(vec![8]),
            3,
            2,
            None,
            &Device::Cpu,
        )
    }

    #[test]
    fn test_targets_start_as_copies_and_track() -> Result<()> {
        let mut critic = critic()?;
        let obs = Tensor::randn(0f32, 1f32, (4, 3), &Device::Cpu)?;
        let act = Tensor::randn(0f32, 1f32, (4, 2), &Device::Cpu)?;
        let q_min = critic.q_min(&obs, &act)?.to_vec1::<f32>()?;
        assert_eq!(q_min, critic.target_min(&obs, &act)?.to_vec1::<f32>()?);

        let target = Tensor::from_slice(&[5f32, 5., 5., 5.], (4,), &Device::Cpu)?;
        let weight = Tensor::ones((4,), candle_core::DType::F32, &Device::Cpu)?;
        let update = critic.update(&obs, &act, &target, &weight)?;
        assert_eq!(update.td_errors.len(), 4);
        assert!(update.td_errors.iter().all(|e| *e >= 0.0));

        // The online critics moved, the targets did not.
        assert_eq!(q_min, critic.target_min(&obs, &act)?.to_vec1::<f32>()?);
        assert_ne!(q_min, critic.q_min(&obs, &act)?.to_vec1::<f32>()?);

        // tau = 1 copies the online critics.
        critic.soft_update(1.0)?;
        let online = critic.q_min(&obs, &act)?.to_vec1::<f32>()?;
        let target = critic.target_min(&obs, &act)?.to_vec1::<f32>()?;
        for (a, b) in online.iter().zip(target.iter()) {
            assert!((a - b).abs() < 1e-5);
        }
        Ok(())
    }

    #[test]
    fn test_export_import() -> Result<()> {
        let a = critic()?;
        let b = critic()?;
        let mut params = NamedTensors::default();
        a.export_into(&mut params)?;
        assert_eq!(params.len(), 16);
        b.import_from(&params)?;

        let obs = Tensor::randn(0f32, 1f32, (2, 3), &Device::Cpu)?;
        let act = Tensor::randn(0f32, 1f32, (2, 2), &Device::Cpu)?;
        assert_eq!(
            a.q_min(&obs, &act)?.to_vec1::<f32>()?,
            b.q_min(&obs, &act)?.to_vec1::<f32>()?
        );
        Ok(())
    }
}
