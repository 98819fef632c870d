//! SAC agent with tanh-Gaussian actions.
use super::{EntCoef, SacConfig};
use crate::{
    critic::TwinCritic,
    estimator::Estimator,
    mlp::GaussianMlp,
    model::Network,
    tensor_batch::state_tensor,
    util::{NamedTensors, LOG_EPS},
    TensorBatch,
};
use anyhow::Result;
use arena_core::{
    record::{Record, RecordValue},
    ActionKind, Agent, Policy, Snapshot, TrainContext, TrainOutput, TransitionBatch,
};
use candle_core::{Device, Tensor, D};
use log::{info, trace};

/// Squashed Gaussian sample and its log probability.
///
/// `u = mu + exp(log_std) * eps` and the action is `tanh(u)`; the log
/// probability of the action sums over the last dimension the Normal log
/// density of `u` minus `log(1 - tanh(u)^2 + 1e-6)`. `log_std` is expected
/// to be clamped already.
pub fn tanh_gaussian(mu: &Tensor, log_std: &Tensor, eps: &Tensor) -> Result<(Tensor, Tensor)> {
    let std = log_std.exp()?;
    let a = (mu + (&std * eps)?)?.tanh()?;
    let log_n = ((eps.sqr()? * -0.5)? - log_std)?
        .affine(1.0, -0.5 * (2.0 * std::f64::consts::PI).ln())?;
    let jac = a.sqr()?.affine(-1.0, 1.0 + LOG_EPS)?.log()?;
    let logp = (log_n - jac)?.sum(D::Minus1)?;
    Ok((a, logp))
}

fn sample_action(
    pi: &Network<GaussianMlp>,
    obs: &Tensor,
    (min_lstd, max_lstd): (f64, f64),
) -> Result<(Tensor, Tensor)> {
    let (mu, lstd) = pi.predict(obs)?;
    let lstd = lstd.clamp(min_lstd, max_lstd)?;
    let eps = mu.randn_like(0.0, 1.0)?;
    tanh_gaussian(&mu, &lstd, &eps)
}

fn act(pi: &Network<GaussianMlp>, state: &[f32], state_dim: usize, lstd: (f64, f64)) -> Result<Vec<f32>> {
    let xs = state_tensor(state, state_dim, pi.device())?;
    let (a, _) = sample_action(pi, &xs, lstd)?;
    Ok(a.flatten_all()?.to_vec1::<f32>()?)
}

/// Soft actor-critic agent with automatic temperature.
///
/// The critics and their targets are updated every training step; the
/// actor and the entropy coefficient every `actor_update_delay` steps.
pub struct Sac {
    config: SacConfig,
    device: Device,
    pi: Estimator<GaussianMlp>,
    critic: TwinCritic,
    ent_coef: EntCoef,
    n_opts: usize,
    n_actor_updates: usize,
}

impl Sac {
    fn lstd_range(&self) -> (f64, f64) {
        (self.config.min_lstd, self.config.max_lstd)
    }

    fn update(&mut self, batch: &TensorBatch, ctx: &TrainContext) -> Result<TrainOutput> {
        let alpha = self.ent_coef.alpha()?;
        let mut record = Record::from_slice(&[(
            "ent_coef",
            RecordValue::Scalar(self.ent_coef.alpha_value()?),
        )]);

        let tgt = {
            let (a_next, logp_next) =
                sample_action(self.pi.network(), &batch.next_obs, self.lstd_range())?;
            let q_next = self.critic.target_min(&batch.next_obs, &a_next)?;
            let v_next = (q_next - logp_next.broadcast_mul(&alpha)?)?;
            (batch.reward.affine(self.config.reward_scale, 0.0)?
                + (v_next * &batch.not_done)?.affine(self.config.discount_factor, 0.0)?)?
        }
        .detach();

        trace!("update critics");
        let critic = self
            .critic
            .update(&batch.obs, &batch.act, &tgt, &batch.weight)?;
        record.insert("loss_critic1", RecordValue::Scalar(critic.loss_q1));
        record.insert("loss_critic2", RecordValue::Scalar(critic.loss_q2));

        let delay = self.config.actor_update_delay.max(1);
        if ctx.train_steps % delay == 0 {
            trace!("update actor");
            let (a, logp) = sample_action(self.pi.network(), &batch.obs, self.lstd_range())?;
            let q = self.critic.q_min(&batch.obs, &a)?;
            let loss = (logp.broadcast_mul(&alpha)? - q)?.mean_all()?;
            let loss_actor = self.pi.backward_step(&loss)?;
            record.insert("loss_actor", RecordValue::Scalar(loss_actor));

            trace!("update entropy coefficient");
            let (_, logp) = sample_action(self.pi.network(), &batch.obs, self.lstd_range())?;
            if let Some(loss_alpha) = self.ent_coef.update(&logp.detach())? {
                record.insert("loss_alpha", RecordValue::Scalar(loss_alpha));
            }
            self.n_actor_updates += 1;
        }

        self.critic.soft_update(self.config.tau)?;
        self.n_opts += 1;

        Ok(TrainOutput {
            losses: record,
            td_errors: critic.td_errors,
        })
    }

    /// Number of optimization steps done.
    pub fn n_opts(&self) -> usize {
        self.n_opts
    }

    /// Number of actor updates done.
    pub fn n_actor_updates(&self) -> usize {
        self.n_actor_updates
    }

    /// The entropy coefficient.
    pub fn ent_coef(&self) -> &EntCoef {
        &self.ent_coef
    }
}

impl Policy for Sac {
    fn sample(&mut self, state: &[f32]) -> Result<Vec<f32>> {
        act(self.pi.network(), state, self.config.state_dim, self.lstd_range())
    }
}

impl Snapshot for Sac {
    type Params = NamedTensors;

    fn export_params(&self) -> Result<NamedTensors> {
        let mut params = NamedTensors::default();
        params.insert_prefixed("pi", self.pi.network().export()?);
        self.critic.export_into(&mut params)?;
        params.insert_prefixed("ent_coef", self.ent_coef.export()?);
        Ok(params)
    }

    fn import_params(&mut self, params: &NamedTensors) -> Result<()> {
        self.pi.network().import(&params.prefixed("pi"))?;
        self.critic.import_from(params)?;
        self.ent_coef.import(&params.prefixed("ent_coef"))
    }
}

impl Agent for Sac {
    type Config = SacConfig;
    type Frozen = FrozenGaussian;

    fn build(config: SacConfig) -> Result<Self> {
        let device = config.device.build()?;
        let pi = Estimator::build(
            config.actor_config(),
            &config.actor_opt_config,
            config.grad_clip,
            &device,
        )?;
        let critic = TwinCritic::build(
            &config.critic_config,
            config.state_dim,
            config.action_dim,
            config.grad_clip,
            &device,
        )?;
        let ent_coef = EntCoef::new(
            &config.ent_coef_mode,
            config.action_dim,
            config.grad_clip,
            &device,
        )?;
        info!(
            "Build SAC agent, state_dim = {}, action_dim = {}",
            config.state_dim, config.action_dim
        );

        Ok(Self {
            config,
            device,
            pi,
            critic,
            ent_coef,
            n_opts: 0,
            n_actor_updates: 0,
        })
    }

    fn config(&self) -> &SacConfig {
        &self.config
    }

    fn action_kind(&self) -> ActionKind {
        ActionKind::Continuous
    }

    fn action_dim(&self) -> usize {
        self.config.action_dim
    }

    fn batch_size(&self) -> usize {
        self.config.batch_size
    }

    fn opt(&mut self, batch: &TransitionBatch, ctx: &TrainContext) -> Result<Option<TrainOutput>> {
        if batch.len() < self.config.batch_size {
            return Ok(None);
        }
        let batch = TensorBatch::from_batch(
            batch,
            self.config.state_dim,
            self.config.action_dim,
            &self.device,
        )?;
        Ok(Some(self.update(&batch, ctx)?))
    }

    fn freeze(&self) -> Result<FrozenGaussian> {
        Ok(FrozenGaussian {
            pi: self.pi.target()?,
            state_dim: self.config.state_dim,
            lstd: self.lstd_range(),
        })
    }
}

/// Frozen actor of a [`Sac`].
pub struct FrozenGaussian {
    pi: Network<GaussianMlp>,
    state_dim: usize,
    lstd: (f64, f64),
}

impl Policy for FrozenGaussian {
    fn sample(&mut self, state: &[f32]) -> Result<Vec<f32>> {
        act(&self.pi, state, self.state_dim, self.lstd)
    }
}

impl Snapshot for FrozenGaussian {
    type Params = NamedTensors;

    fn export_params(&self) -> Result<NamedTensors> {
        let mut params = NamedTensors::default();
        params.insert_prefixed("pi", self.pi.export()?);
        Ok(params)
    }

    fn import_params(&mut self, params: &NamedTensors) -> Result<()> {
        self.pi.import(&params.prefixed("pi"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tanh_gaussian_log_prob() -> Result<()> {
        let device = Device::Cpu;
        let mu = [0.3f64, -1.2];
        let lstd = [-0.5f64, 0.4];
        let eps = [0.7f64, -1.5];
        let t = |v: &[f64; 2]| -> Result<Tensor> {
            Ok(Tensor::from_vec(v.iter().map(|x| *x as f32).collect::<Vec<_>>(), (1, 2), &device)?)
        };
        let (a, logp) = tanh_gaussian(&t(&mu)?, &t(&lstd)?, &t(&eps)?)?;
        let a = a.flatten_all()?.to_vec1::<f32>()?;
        let logp = logp.to_vec1::<f32>()?;

        let mut expected = 0.0;
        for d in 0..2 {
            let std = lstd[d].exp();
            let u = mu[d] + std * eps[d];
            let x = (u - mu[d]) / std;
            let log_n = -0.5 * x * x - std.ln() - 0.5 * (2.0 * std::f64::consts::PI).ln();
            let ad = u.tanh();
            assert!((a[d] as f64 - ad).abs() < 1e-5);
            expected += log_n - (1.0 - ad * ad + 1e-6).ln();
        }
        assert_eq!(logp.len(), 1);
        assert!((logp[0] as f64 - expected).abs() < 1e-4, "{} {}", logp[0], expected);
        Ok(())
    }

    #[test]
    fn test_actions_are_bounded() -> Result<()> {
        let config = SacConfig::default()
            .dims(4, 3)
            .actor_units(vec![8])
            .critic_config(crate::critic::CriticConfig::default().units(vec![8]));
        let mut sac = Sac::build(config)?;
        let mut frozen = sac.freeze()?;
        for _ in 0..10 {
            let a = sac.sample(&[0.1, -0.2, 0.3, 5.0])?;
            assert_eq!(a.len(), 3);
            assert!(a.iter().all(|v| (-1.0..=1.0).contains(v)));
            let a = frozen.sample(&[0.1, -0.2, 0.3, 5.0])?;
            assert!(a.iter().all(|v| (-1.0..=1.0).contains(v)));
        }
        assert!(sac.sample(&[0.0; 3]).is_err());
        Ok(())
    }
}
