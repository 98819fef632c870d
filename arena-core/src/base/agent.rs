//! Agent.
use super::{ActionKind, Policy};
use crate::{record::Record, TransitionBatch};
use anyhow::Result;
use serde::{de::DeserializeOwned, Serialize};
use std::{
    fs::File,
    io::{BufReader, BufWriter},
    path::Path,
};

/// Values of the schedules in force for one training step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrainContext {
    /// Training steps completed before this one.
    pub train_steps: usize,

    /// Temperature of relaxed discrete actions.
    pub temperature: f64,
}

/// Result of one training step.
#[derive(Clone, Debug)]
pub struct TrainOutput {
    /// Scalar losses and other diagnostics.
    pub losses: Record,

    /// Absolute TD error per sample, in the order of the batch.
    pub td_errors: Vec<f64>,
}

/// An object whose parameters can be exported and imported.
pub trait Snapshot {
    /// Serializable form of the parameters.
    type Params: Serialize + DeserializeOwned;

    /// Copies the parameters out.
    fn export_params(&self) -> Result<Self::Params>;

    /// Overwrites the parameters.
    fn import_params(&mut self, params: &Self::Params) -> Result<()>;
}

/// A trainable policy.
///
/// The live agent is trained by the self-play loop. [`Agent::freeze`] takes
/// a copy of its acting part which is stored in the checkpoint pool and
/// plays as a historical opponent.
pub trait Agent: Policy + Snapshot + Sized {
    /// Configuration from which the agent is built.
    type Config: Clone + Serialize + DeserializeOwned;

    /// Frozen copy of the acting part of the agent.
    type Frozen: Policy + Snapshot<Params = Self::Params>;

    /// Builds the agent.
    fn build(config: Self::Config) -> Result<Self>;

    /// Configuration of the agent.
    fn config(&self) -> &Self::Config;

    /// Kind of the actions of the agent.
    fn action_kind(&self) -> ActionKind;

    /// Length of the action vectors.
    fn action_dim(&self) -> usize;

    /// Number of samples required for a training step.
    fn batch_size(&self) -> usize;

    /// Performs a training step on the given batch.
    ///
    /// Returns `Ok(None)` without touching any parameter if the batch has
    /// fewer than [`Agent::batch_size`] samples.
    fn opt(&mut self, batch: &TransitionBatch, ctx: &TrainContext) -> Result<Option<TrainOutput>>;

    /// Takes a frozen copy of the current policy.
    fn freeze(&self) -> Result<Self::Frozen>;

    /// Saves the parameters as JSON to the given file.
    fn save_params(&self, path: &Path) -> Result<()> {
        let file = BufWriter::new(File::create(path)?);
        serde_json::to_writer(file, &self.export_params()?)?;
        Ok(())
    }

    /// Loads the parameters from a JSON file written by [`Agent::save_params`].
    fn load_params(&mut self, path: &Path) -> Result<()> {
        let rdr = BufReader::new(File::open(path)?);
        let params: Self::Params = serde_json::from_reader(rdr)?;
        self.import_params(&params)
    }
}
