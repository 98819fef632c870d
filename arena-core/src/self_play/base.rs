use super::PauseHandle;
use crate::{
    checkpoint::{CheckpointDocument, CheckpointRef},
    config::ArenaConfig,
    ensemble::{ModelEnsemble, Opponent},
    error::ArenaError,
    record::{AggregateRecorder, NullRecorder, Record, RecordValue},
    replay_buffer::PrioritizedReplayBuffer,
    reward::{RewardPolicy, ShapedReward},
    schedule::ScheduleState,
    Actuator, Agent, Environment, InputIntent, PlayerId, Policy, Snapshot, TrainContext,
};
use anyhow::Result;
use log::{debug, info, trace};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::path::Path;
use tokio::time::sleep;

/// Why [`SelfPlay::run_matches`] returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopExit {
    /// A pause was requested through the [`PauseHandle`].
    Paused,

    /// The requested number of matches was played.
    MatchLimit,
}

/// Outcome of a single match.
#[derive(Clone, Debug, PartialEq)]
pub struct MatchSummary {
    /// Number of state captures after the warmup, including the last one.
    pub ticks: usize,

    /// Winner, `None` for draws and capped matches.
    pub winner: Option<PlayerId>,

    /// `true` if the tick cap ended the match.
    pub capped: bool,

    /// Sum of the rewards of player one and player two.
    pub returns: (f64, f64),

    /// Policy that controlled player two.
    pub opponent: Opponent,

    /// Transitions added to the replay buffer.
    pub transitions: usize,
}

impl MatchSummary {
    fn record(&self) -> Record {
        let winner = match self.winner {
            Some(id) => id.as_str(),
            None if self.capped => "timeout",
            None => "draw",
        };
        Record::from_slice(&[
            ("match_ticks", RecordValue::Scalar(self.ticks as f32)),
            ("match_return_player_one", RecordValue::Scalar(self.returns.0 as f32)),
            ("match_return_player_two", RecordValue::Scalar(self.returns.1 as f32)),
            ("match_winner", RecordValue::String(winner.to_string())),
            ("match_opponent", RecordValue::String(self.opponent.label())),
        ])
    }
}

fn is_multiple(steps: usize, interval: usize) -> bool {
    interval > 0 && steps % interval == 0
}

#[cfg_attr(doc, aquamarine::aquamarine)]
/// Trains an agent by letting it play against itself and its past copies.
///
/// # Loop
///
/// ```mermaid
/// stateDiagram-v2
///     [*] --> MaybeTrain
///     MaybeTrain --> StartMatch
///     StartMatch --> Warmup: start_delay
///     Warmup --> StepMatch: tick_interval
///     StepMatch --> StepMatch: tick_interval
///     StepMatch --> MatchEnd: terminal or max_ticks
///     MatchEnd --> MaybeTrain
///     MatchEnd --> [*]: paused
/// ```
///
/// * `MaybeTrain`: if the buffer holds at least a batch, anneal `beta`, the
///   temperature and the exploration rate, then run `train_iterations`
///   training steps. Each step samples a batch, trains the agent, writes the
///   TD errors back as priorities and advances the [`ScheduleState`].
///   Every `checkpoint_interval` steps a frozen copy of the agent enters
///   the pool; every `save_interval` steps the checkpoint document is written.
/// * `StartMatch`: choose the opponent of the match and start it.
/// * `Warmup`: read and discard one snapshot.
/// * `StepMatch`: read a snapshot, add one transition per player from the
///   previous state and action, then choose and apply new actions. Player
///   two sees every state mirrored. The tick numbered `max_ticks` ends the
///   match with `done = true` and its transitions are recorded.
/// * `MatchEnd`: release the keys and store the match record. A pending
///   pause request is taken here and only here.
///
/// The loop runs on the current task; waits are `tokio` sleeps.
pub struct SelfPlay<A, E, C>
where
    A: Agent,
    E: Environment,
    C: Actuator,
{
    config: ArenaConfig<A::Config>,
    agent: A,
    env: E,
    actuator: C,
    buffer: PrioritizedReplayBuffer,
    pool: ModelEnsemble<A::Frozen>,
    schedule: ScheduleState,
    reward: Box<dyn RewardPolicy>,
    recorder: Box<dyn AggregateRecorder>,
    pause: PauseHandle,
    rng: StdRng,
    n_matches: usize,
}

impl<A, E, C> SelfPlay<A, E, C>
where
    A: Agent,
    E: Environment,
    C: Actuator,
{
    /// Builds the loop with a new agent and an empty replay buffer.
    pub fn build(config: ArenaConfig<A::Config>, env: E, actuator: C) -> Result<Self> {
        let agent = A::build(config.agent.clone())?;
        let buffer = PrioritizedReplayBuffer::build(&config.replay_buffer)?;
        let pool = ModelEnsemble::new(config.self_play.pool_size);
        let schedule = ScheduleState::initial(&config.replay_buffer.per, &config.schedule);
        Self::from_parts(config, agent, buffer, pool, schedule, env, actuator)
    }

    /// Restores the loop from a checkpoint document.
    ///
    /// The buffer, the schedule counter, the pool and the live parameters
    /// are taken from the document; annealed values are recomputed from
    /// the restored counter.
    pub fn resume(path: impl AsRef<Path>, env: E, actuator: C) -> Result<Self> {
        let path = path.as_ref();
        let mut doc = CheckpointDocument::<A::Config, A::Params>::load(path)?;
        let (models, live) = doc.take_models()?;
        let CheckpointDocument {
            saved_at,
            config,
            schedule,
            mut replay_buffer,
            ..
        } = doc;

        let mut agent = A::build(config.agent.clone())?;
        agent.import_params(&live)?;

        let mut pool = ModelEnsemble::new(config.self_play.pool_size);
        for params in models.iter() {
            let mut frozen = agent.freeze()?;
            frozen.import_params(params)?;
            pool.push(frozen);
        }

        replay_buffer.reseed(config.replay_buffer.seed);
        let schedule = ScheduleState::at(
            schedule.train_steps,
            &config.replay_buffer.per,
            &config.schedule,
        );
        info!(
            "Resumed from {:?} saved at {}: {} transitions, {} pool entries, {} training steps",
            path,
            saved_at,
            replay_buffer.len(),
            pool.len(),
            schedule.train_steps
        );

        Self::from_parts(config, agent, replay_buffer, pool, schedule, env, actuator)
    }

    fn from_parts(
        config: ArenaConfig<A::Config>,
        agent: A,
        buffer: PrioritizedReplayBuffer,
        pool: ModelEnsemble<A::Frozen>,
        schedule: ScheduleState,
        env: E,
        actuator: C,
    ) -> Result<Self> {
        if let Some(action) = &config.self_play.forced_action {
            if action.len() != agent.action_dim() {
                return Err(ArenaError::DimensionMismatch {
                    name: "forced_action",
                    expected: agent.action_dim(),
                    actual: action.len(),
                }
                .into());
            }
        }

        Ok(Self {
            reward: Box::new(ShapedReward::new(config.reward.clone())),
            recorder: Box::new(NullRecorder),
            pause: PauseHandle::new(),
            rng: StdRng::seed_from_u64(config.self_play.seed),
            n_matches: 0,
            config,
            agent,
            env,
            actuator,
            buffer,
            pool,
            schedule,
        })
    }

    /// Replaces the recorder, which by default discards everything.
    pub fn with_recorder(mut self, recorder: Box<dyn AggregateRecorder>) -> Self {
        self.recorder = recorder;
        self
    }

    /// Replaces the reward policy built from the configuration.
    pub fn with_reward_policy(mut self, reward: Box<dyn RewardPolicy>) -> Self {
        self.reward = reward;
        self
    }

    /// A handle to request a pause from outside the loop.
    pub fn pause_handle(&self) -> PauseHandle {
        self.pause.clone()
    }

    /// Configuration in force.
    pub fn config(&self) -> &ArenaConfig<A::Config> {
        &self.config
    }

    /// The live agent.
    pub fn agent(&self) -> &A {
        &self.agent
    }

    /// The replay buffer.
    pub fn buffer(&self) -> &PrioritizedReplayBuffer {
        &self.buffer
    }

    /// The pool of frozen opponents.
    pub fn pool(&self) -> &ModelEnsemble<A::Frozen> {
        &self.pool
    }

    /// Training step counter and annealed values.
    pub fn schedule(&self) -> &ScheduleState {
        &self.schedule
    }

    /// Matches played since the loop was built or resumed.
    pub fn n_matches(&self) -> usize {
        self.n_matches
    }

    /// Writes the checkpoint document.
    pub fn save_checkpoint(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut models = self
            .pool
            .iter()
            .map(|m| m.export_params())
            .collect::<Result<Vec<_>>>()?;
        models.push(self.agent.export_params()?);
        CheckpointRef::new(&self.config, &self.schedule, &self.buffer, &models).save(path)
    }

    /// Runs until a pause is requested.
    pub async fn run(&mut self) -> Result<()> {
        self.run_matches(None).await.map(|_| ())
    }

    /// Runs until a pause is requested or `max_matches` matches were played.
    ///
    /// Calling it again after a pause continues with a training phase.
    pub async fn run_matches(&mut self, max_matches: Option<usize>) -> Result<LoopExit> {
        let mut played = 0;
        loop {
            if max_matches.map_or(false, |n| played >= n) {
                return Ok(LoopExit::MatchLimit);
            }

            self.maybe_train()?;
            let summary = self.play_match().await?;
            played += 1;
            self.n_matches += 1;

            info!(
                "Match {}: {} ticks, winner {:?}, returns ({:.3}, {:.3}), opponent {}",
                self.n_matches,
                summary.ticks,
                summary.winner,
                summary.returns.0,
                summary.returns.1,
                summary.opponent.label()
            );
            let mut record = summary.record();
            record.insert("buffer_size", RecordValue::Scalar(self.buffer.len() as f32));
            self.recorder.store(record);

            if self.pause.take() {
                self.recorder.flush(self.schedule.train_steps as i64);
                info!("Paused after match {}", self.n_matches);
                return Ok(LoopExit::Paused);
            }
        }
    }

    /// Runs a training phase if the buffer holds at least one batch.
    ///
    /// Returns the number of training steps done.
    pub fn maybe_train(&mut self) -> Result<usize> {
        let batch_size = self.agent.batch_size();
        let iterations = self.config.self_play.train_iterations;
        if self.buffer.len() < batch_size || iterations == 0 {
            return Ok(0);
        }

        self.schedule = self
            .schedule
            .annealed(&self.config.replay_buffer.per, &self.config.schedule);
        let (alpha, per_fraction) = (
            self.config.replay_buffer.per.alpha,
            self.config.replay_buffer.per.per_fraction,
        );
        let (beta, temperature, epsilon) = (
            self.schedule.beta,
            self.schedule.temperature,
            self.schedule.epsilon,
        );
        debug!(
            "Training {} iterations: beta = {:.4}, temperature = {:.4}, epsilon = {:.4}",
            iterations, beta, temperature, epsilon
        );

        let mut n_steps = 0;
        for _ in 0..iterations {
            let batch = self
                .buffer
                .sample_mixed(batch_size, per_fraction, alpha, beta);
            let ctx = TrainContext {
                train_steps: self.schedule.train_steps,
                temperature,
            };
            let out = match self.agent.opt(&batch, &ctx)? {
                Some(out) => out,
                None => {
                    debug!("Skipped a batch of {} samples", batch.len());
                    continue;
                }
            };
            self.buffer.update_priorities(&batch.indices, &out.td_errors);
            self.schedule = self.schedule.advanced();
            n_steps += 1;

            let steps = self.schedule.train_steps;
            let mut record = out.losses;
            record.insert("beta", RecordValue::Scalar(beta as f32));
            record.insert("temperature", RecordValue::Scalar(temperature as f32));
            record.insert("epsilon", RecordValue::Scalar(epsilon as f32));
            self.recorder.store(record);

            if is_multiple(steps, self.config.self_play.flush_interval) {
                self.recorder.flush(steps as i64);
            }

            if is_multiple(steps, self.config.self_play.checkpoint_interval) {
                self.pool.push(self.agent.freeze()?);
                info!(
                    "Added a checkpoint to the pool at step {} ({}/{})",
                    steps,
                    self.pool.len(),
                    self.pool.max_size()
                );
            }

            if is_multiple(steps, self.config.self_play.save_interval) {
                if let Some(path) = self.config.self_play.checkpoint_path.clone() {
                    self.save_checkpoint(&path)?;
                    info!("Saved checkpoint to {:?} at step {}", path, steps);
                }
            }
        }
        Ok(n_steps)
    }

    /// Plays a single match and stores its transitions.
    pub async fn play_match(&mut self) -> Result<MatchSummary> {
        let opponent = self
            .pool
            .choose_opponent(self.config.self_play.latest_opponent_prob, &mut self.rng);
        let max_ticks = self.config.self_play.max_ticks.max(1);
        let tick_interval = self.config.self_play.tick_interval();

        self.env.start_match()?;
        sleep(self.config.self_play.start_delay()).await;

        let _ = self.env.snapshot()?;
        sleep(tick_interval).await;

        // States and actions of player one and two on the previous tick.
        let mut prev: Option<(Vec<f32>, Vec<f32>, Vec<f32>, Vec<f32>)> = None;
        let mut returns = (0f64, 0f64);
        let mut transitions = 0;
        let mut ticks = 0;

        let (winner, capped) = loop {
            let snapshot = self.env.snapshot()?;
            ticks += 1;
            let capped = ticks >= max_ticks && !snapshot.terminal;
            let done = snapshot.terminal || capped;

            let (r1, r2) = self.reward.rewards(&snapshot, capped);
            let s1 = self.config.state.encode(&snapshot);
            let s2 = self.config.state.mirror_state(&s1)?;

            if let Some((ps1, pa1, ps2, pa2)) = prev.take() {
                self.buffer.add(ps1, pa1, r1, s1.clone(), done);
                self.buffer.add(ps2, pa2, r2, s2.clone(), done);
                returns.0 += r1;
                returns.1 += r2;
                transitions += 2;
            }

            if done {
                break (snapshot.winner, capped);
            }

            let a1 = self.select_action(&s1, Opponent::Live)?;
            let a2 = self.select_action(&s2, opponent)?;
            self.actuator
                .apply(PlayerId::One, &InputIntent::from_action(&a1))?;
            self.actuator
                .apply(PlayerId::Two, &InputIntent::from_action(&a2))?;
            trace!("Tick {}: actions {:?} {:?}", ticks, a1, a2);

            prev = Some((s1, a1, s2, a2));
            sleep(tick_interval).await;
        };

        let released = InputIntent::default();
        self.actuator.apply(PlayerId::One, &released)?;
        self.actuator.apply(PlayerId::Two, &released)?;

        Ok(MatchSummary {
            ticks,
            winner,
            capped,
            returns,
            opponent,
            transitions,
        })
    }

    fn select_action(&mut self, state: &[f32], who: Opponent) -> Result<Vec<f32>> {
        if let Some(action) = &self.config.self_play.forced_action {
            if self.schedule.train_steps < self.config.self_play.forced_action_steps {
                return Ok(action.clone());
            }
        }

        if self.schedule.epsilon > 0.0 && self.rng.gen::<f64>() < self.schedule.epsilon {
            let dim = self.agent.action_dim();
            return Ok(self.agent.action_kind().random(dim, &mut self.rng));
        }

        match who {
            Opponent::Pool(ix) => match self.pool.get_mut(ix) {
                Some(policy) => policy.sample(state),
                None => self.agent.sample(state),
            },
            Opponent::Live => self.agent.sample(state),
        }
    }
}
