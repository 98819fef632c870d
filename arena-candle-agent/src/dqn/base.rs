//! Double-Dueling DQN agent implemented with candle.
use super::DqnConfig;
use crate::{
    estimator::Estimator,
    mlp::DuelingMlp,
    model::Network,
    tensor_batch::state_tensor,
    util::{huber, to_f64s, NamedTensors},
    TensorBatch,
};
use anyhow::Result;
use arena_core::{
    record::{Record, RecordValue},
    ActionKind, Agent, Policy, Snapshot, TrainContext, TrainOutput, TransitionBatch,
};
use candle_core::{DType, Device, D};
use log::{debug, info, trace};

/// Presses a key where the pressed branch has the larger value.
fn greedy(q: &Network<DuelingMlp>, state: &[f32], state_dim: usize) -> Result<Vec<f32>> {
    let xs = state_tensor(state, state_dim, q.device())?;
    let q = q.predict(&xs)?.squeeze(0)?.to_vec2::<f32>()?;
    Ok(q
        .iter()
        .map(|b| if b[1] > b[0] { 1.0 } else { 0.0 })
        .collect())
}

/// Double-Dueling DQN agent.
///
/// Each action dimension is a binary branch of a shared dueling Q-network.
/// The TD target of a branch is evaluated by the target network at the
/// choice that is greedy under the online network.
pub struct Dqn {
    config: DqnConfig,
    device: Device,
    q: Estimator<DuelingMlp>,
    q_tgt: Network<DuelingMlp>,
    n_opts: usize,
}

impl Dqn {
    fn update(&mut self, batch: &TensorBatch, ctx: &TrainContext) -> Result<TrainOutput> {
        let pred = {
            let ix = batch
                .act
                .gt(0.0)?
                .to_dtype(DType::U32)?
                .unsqueeze(D::Minus1)?;
            self.q
                .predict(&batch.obs)?
                .gather(&ix, D::Minus1)?
                .squeeze(D::Minus1)?
        };

        let tgt = {
            let ix = self.q.predict(&batch.next_obs)?.argmax_keepdim(D::Minus1)?;
            let q_next = self
                .q_tgt
                .predict(&batch.next_obs)?
                .gather(&ix, D::Minus1)?
                .squeeze(D::Minus1)?;
            let not_done = batch.not_done.unsqueeze(D::Minus1)?;
            let reward = batch.reward.unsqueeze(D::Minus1)?;
            q_next
                .broadcast_mul(&not_done)?
                .affine(self.config.discount_factor, 0.0)?
                .broadcast_add(&reward)?
        }
        .detach();

        // [batch_size, action_dim]
        let td = (&tgt - &pred)?;
        let td_errors = to_f64s(&td.abs()?.max(D::Minus1)?)?;
        let loss = (huber(&td)?.mean(D::Minus1)? * &batch.weight)?.mean_all()?;
        let q_mean = pred.mean_all()?.to_scalar::<f32>()?;

        trace!("backward_step()");
        let loss = self.q.backward_step(&loss)?;

        let freq = self.config.target_update_frequency;
        if freq > 0 && (ctx.train_steps + 1) % freq == 0 {
            debug!("Copy Q-network to target at step {}", ctx.train_steps + 1);
            self.q_tgt.copy_from(self.q.network())?;
        }
        self.n_opts += 1;

        Ok(TrainOutput {
            losses: Record::from_slice(&[
                ("loss_q", RecordValue::Scalar(loss)),
                ("q_mean", RecordValue::Scalar(q_mean)),
            ]),
            td_errors,
        })
    }

    /// Number of optimization steps done.
    pub fn n_opts(&self) -> usize {
        self.n_opts
    }

    /// The online Q-network.
    pub fn q(&self) -> &Network<DuelingMlp> {
        self.q.network()
    }

    /// The target Q-network.
    pub fn q_tgt(&self) -> &Network<DuelingMlp> {
        &self.q_tgt
    }
}

impl Policy for Dqn {
    fn sample(&mut self, state: &[f32]) -> Result<Vec<f32>> {
        greedy(self.q.network(), state, self.config.state_dim)
    }
}

impl Snapshot for Dqn {
    type Params = NamedTensors;

    fn export_params(&self) -> Result<NamedTensors> {
        let mut params = NamedTensors::default();
        params.insert_prefixed("q", self.q.network().export()?);
        params.insert_prefixed("q_tgt", self.q_tgt.export()?);
        Ok(params)
    }

    fn import_params(&mut self, params: &NamedTensors) -> Result<()> {
        self.q.network().import(&params.prefixed("q"))?;
        self.q_tgt.import(&params.prefixed("q_tgt"))
    }
}

impl Agent for Dqn {
    type Config = DqnConfig;
    type Frozen = FrozenDqn;

    fn build(config: DqnConfig) -> Result<Self> {
        let device = config.device.build()?;
        let q = Estimator::build(
            config.q_config(),
            &config.opt_config,
            config.grad_clip,
            &device,
        )?;
        let q_tgt = q.target()?;
        info!(
            "Build Double-Dueling DQN agent, state_dim = {}, action_dim = {}",
            config.state_dim, config.action_dim
        );

        Ok(Self {
            config,
            device,
            q,
            q_tgt,
            n_opts: 0,
        })
    }

    fn config(&self) -> &DqnConfig {
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

    fn freeze(&self) -> Result<FrozenDqn> {
        Ok(FrozenDqn {
            q: self.q.target()?,
            state_dim: self.config.state_dim,
        })
    }
}

/// Frozen greedy policy of a [`Dqn`].
pub struct FrozenDqn {
    q: Network<DuelingMlp>,
    state_dim: usize,
}

impl Policy for FrozenDqn {
    fn sample(&mut self, state: &[f32]) -> Result<Vec<f32>> {
        greedy(&self.q, state, self.state_dim)
    }
}

impl Snapshot for FrozenDqn {
    type Params = NamedTensors;

    fn export_params(&self) -> Result<NamedTensors> {
        let mut params = NamedTensors::default();
        params.insert_prefixed("q", self.q.export()?);
        Ok(params)
    }

    fn import_params(&mut self, params: &NamedTensors) -> Result<()> {
        self.q.import(&params.prefixed("q"))
    }
}
