//! Discrete SAC agent.
use super::DiscreteSacConfig;
use crate::{
    critic::TwinCritic,
    estimator::Estimator,
    mlp::Mlp,
    model::Network,
    tensor_batch::state_tensor,
    util::{bernoulli_entropy, NamedTensors, LOG_EPS},
    TensorBatch,
};
use anyhow::Result;
use arena_core::{
    record::{Record, RecordValue},
    ActionKind, Agent, Policy, Snapshot, TrainContext, TrainOutput, TransitionBatch,
};
use candle_core::{Device, Tensor};
use log::{info, trace};
use rand::{rngs::SmallRng, Rng, SeedableRng};

fn gumbel(u: &Tensor) -> Result<Tensor> {
    Ok(u.affine(1.0, LOG_EPS)?.log()?.neg()?.affine(1.0, LOG_EPS)?.log()?.neg()?)
}

/// Relaxed multi-binary action of per-dimension probabilities `p`.
///
/// `u1` and `u2` are independent uniform noise of the shape of `p`; their
/// Gumbel difference is logistic noise added to the logit of `p` before
/// the sigmoid. The result lies in `(0, 1)` and approaches a hard sample
/// as `temperature` goes to zero.
pub fn relaxed_bernoulli(p: &Tensor, u1: &Tensor, u2: &Tensor, temperature: f64) -> Result<Tensor> {
    let logit = (p.affine(1.0, LOG_EPS)?.log()? - p.affine(-1.0, 1.0 + LOG_EPS)?.log()?)?;
    let noise = (gumbel(u1)? - gumbel(u2)?)?;
    let xs = (logit + noise)?.affine(1.0 / temperature.max(f64::EPSILON), 0.0)?;
    Ok(candle_nn::ops::sigmoid(&xs)?)
}

fn relaxed(p: &Tensor, temperature: f64) -> Result<Tensor> {
    let u1 = p.rand_like(0.0, 1.0)?;
    let u2 = p.rand_like(0.0, 1.0)?;
    relaxed_bernoulli(p, &u1, &u2, temperature)
}

/// Presses each key with its probability under the actor.
fn pressing_probs(pi: &Network<Mlp>, state: &[f32], state_dim: usize) -> Result<Vec<f32>> {
    let xs = state_tensor(state, state_dim, pi.device())?;
    Ok(pi.predict(&xs)?.flatten_all()?.to_vec1::<f32>()?)
}

fn bernoulli_action(
    pi: &Network<Mlp>,
    state: &[f32],
    state_dim: usize,
    rng: &mut SmallRng,
) -> Result<Vec<f32>> {
    Ok(pressing_probs(pi, state, state_dim)?
        .into_iter()
        .map(|p| if rng.gen::<f32>() < p { 1.0 } else { 0.0 })
        .collect())
}

/// Soft actor-critic agent over multi-binary actions.
///
/// The actor outputs a pressing probability per key. Critics are trained
/// on relaxed actions drawn with the annealed temperature of the
/// [`TrainContext`].
pub struct DiscreteSac {
    config: DiscreteSacConfig,
    device: Device,
    pi: Estimator<Mlp>,
    critic: TwinCritic,
    rng: SmallRng,
    n_opts: usize,
}

impl DiscreteSac {
    /// Entropy-regularized value of the relaxed actions of the actor at `obs`.
    fn soft_value(&self, obs: &Tensor, temperature: f64, target: bool) -> Result<(Tensor, Tensor)> {
        let p = self.pi.predict(obs)?;
        let a = relaxed(&p, temperature)?;
        let h = bernoulli_entropy(&p)?;
        let q = match target {
            true => self.critic.target_min(obs, &a)?,
            false => self.critic.q_min(obs, &a)?,
        };
        Ok(((q + h.affine(self.config.ent_coef, 0.0)?)?, h))
    }

    fn update(&mut self, batch: &TensorBatch, ctx: &TrainContext) -> Result<TrainOutput> {
        let tgt = {
            let (v_next, _) = self.soft_value(&batch.next_obs, ctx.temperature, true)?;
            (&batch.reward + (v_next * &batch.not_done)?.affine(self.config.discount_factor, 0.0)?)?
        }
        .detach();

        trace!("update critics");
        let critic = self
            .critic
            .update(&batch.obs, &batch.act, &tgt, &batch.weight)?;

        trace!("update actor");
        let (loss_actor, entropy) = {
            let (v, h) = self.soft_value(&batch.obs, ctx.temperature, false)?;
            let loss = v.mean_all()?.neg()?;
            (self.pi.backward_step(&loss)?, h.mean_all()?.to_scalar::<f32>()?)
        };

        self.critic.soft_update(self.config.tau)?;
        self.n_opts += 1;

        Ok(TrainOutput {
            losses: Record::from_slice(&[
                ("loss_critic1", RecordValue::Scalar(critic.loss_q1)),
                ("loss_critic2", RecordValue::Scalar(critic.loss_q2)),
                ("loss_actor", RecordValue::Scalar(loss_actor)),
                ("entropy", RecordValue::Scalar(entropy)),
            ]),
            td_errors: critic.td_errors,
        })
    }

    /// Number of optimization steps done.
    pub fn n_opts(&self) -> usize {
        self.n_opts
    }
}

impl Policy for DiscreteSac {
    fn sample(&mut self, state: &[f32]) -> Result<Vec<f32>> {
        bernoulli_action(self.pi.network(), state, self.config.state_dim, &mut self.rng)
    }
}

impl Snapshot for DiscreteSac {
    type Params = NamedTensors;

    fn export_params(&self) -> Result<NamedTensors> {
        let mut params = NamedTensors::default();
        params.insert_prefixed("pi", self.pi.network().export()?);
        self.critic.export_into(&mut params)?;
        Ok(params)
    }

    fn import_params(&mut self, params: &NamedTensors) -> Result<()> {
        self.pi.network().import(&params.prefixed("pi"))?;
        self.critic.import_from(params)
    }
}

impl Agent for DiscreteSac {
    type Config = DiscreteSacConfig;
    type Frozen = FrozenBernoulli;

    fn build(config: DiscreteSacConfig) -> Result<Self> {
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
        info!(
            "Build discrete SAC agent, state_dim = {}, action_dim = {}",
            config.state_dim, config.action_dim
        );

        Ok(Self {
            rng: SmallRng::seed_from_u64(config.seed),
            config,
            device,
            pi,
            critic,
            n_opts: 0,
        })
    }

    fn config(&self) -> &DiscreteSacConfig {
        &self.config
    }

    fn action_kind(&self) -> ActionKind {
        ActionKind::Discrete
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

    fn freeze(&self) -> Result<FrozenBernoulli> {
        Ok(FrozenBernoulli {
            pi: self.pi.target()?,
            state_dim: self.config.state_dim,
            rng: SmallRng::seed_from_u64(self.config.seed.wrapping_add(self.n_opts as u64)),
        })
    }
}

/// Frozen actor of a [`DiscreteSac`].
pub struct FrozenBernoulli {
    pi: Network<Mlp>,
    state_dim: usize,
    rng: SmallRng,
}

impl Policy for FrozenBernoulli {
    fn sample(&mut self, state: &[f32]) -> Result<Vec<f32>> {
        bernoulli_action(&self.pi, state, self.state_dim, &mut self.rng)
    }
}

impl Snapshot for FrozenBernoulli {
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
