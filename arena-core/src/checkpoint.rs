//! Checkpoint documents.
//!
//! A checkpoint is a single JSON document with the replay buffer, the
//! configuration in force, the schedule state and the parameters of the
//! pool, followed by the parameters of the live agent.
use crate::{
    config::ArenaConfig, error::ArenaError, replay_buffer::PrioritizedReplayBuffer,
    schedule::ScheduleState,
};
use anyhow::Result;
use chrono::Local;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, BufWriter},
    path::Path,
};

/// A loaded checkpoint.
///
/// `A` is the agent configuration and `P` the parameter snapshot type.
#[derive(Deserialize, Serialize)]
pub struct CheckpointDocument<A, P> {
    /// Local time of saving, RFC 3339.
    pub saved_at: String,

    /// Configuration in force at saving.
    pub config: ArenaConfig<A>,

    /// Training step counter and annealed values.
    pub schedule: ScheduleState,

    /// Transitions, priorities, capacity and write cursor.
    pub replay_buffer: PrioritizedReplayBuffer,

    /// Pool snapshots from the oldest to the newest, then the live parameters.
    pub models: Vec<P>,
}

/// Borrowed form of [`CheckpointDocument`] used for writing.
#[derive(Serialize)]
pub struct CheckpointRef<'a, A, P> {
    saved_at: String,
    config: &'a ArenaConfig<A>,
    schedule: &'a ScheduleState,
    replay_buffer: &'a PrioritizedReplayBuffer,
    models: &'a [P],
}

impl<'a, A, P> CheckpointRef<'a, A, P>
where
    A: Serialize,
    P: Serialize,
{
    /// Creates the document. `models` must end with the live parameters.
    pub fn new(
        config: &'a ArenaConfig<A>,
        schedule: &'a ScheduleState,
        replay_buffer: &'a PrioritizedReplayBuffer,
        models: &'a [P],
    ) -> Self {
        Self {
            saved_at: Local::now().to_rfc3339(),
            config,
            schedule,
            replay_buffer,
            models,
        }
    }

    /// Writes the document to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = BufWriter::new(File::create(path)?);
        serde_json::to_writer(file, self)?;
        Ok(())
    }
}

impl<A, P> CheckpointDocument<A, P>
where
    A: DeserializeOwned,
    P: DeserializeOwned,
{
    /// Reads a document from a JSON file.
    ///
    /// Fails if the buffer is inconsistent or the document has no live parameters.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let rdr = BufReader::new(File::open(path)?);
        let doc: Self = serde_json::from_reader(rdr)?;
        if doc.models.is_empty() {
            return Err(ArenaError::InvalidCheckpoint("no live parameters".to_string()).into());
        }
        Ok(doc)
    }

    /// Takes the parameters out, split into the pool snapshots and the live
    /// parameters. The document keeps no models afterwards.
    pub fn take_models(&mut self) -> Result<(Vec<P>, P)> {
        let mut models = std::mem::take(&mut self.models);
        let live = models
            .pop()
            .ok_or_else(|| ArenaError::InvalidCheckpoint("no live parameters".to_string()))?;
        Ok((models, live))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{replay_buffer::PerConfig, schedule::ScheduleConfig};
    use tempdir::TempDir;

    #[test]
    fn test_checkpoint_round_trip() -> Result<()> {
        let config = ArenaConfig::new(vec![64usize, 64]);
        let mut buffer = PrioritizedReplayBuffer::new(3, 0)?;
        for i in 0..5 {
            buffer.add(vec![i as f32; 4], vec![1.0, 0.0], 0.5, vec![0.0; 4], i == 4);
        }
        buffer.update_priorities(&[0, 2], &[0.3, -2.0]);
        let schedule = ScheduleState::at(1234, &PerConfig::default(), &ScheduleConfig::default());
        let models = vec![vec![1f32, 2.0], vec![3.0], vec![4.0, 5.0, 6.0]];

        let dir = TempDir::new("checkpoint")?;
        let path = dir.path().join("checkpoint.json");
        CheckpointRef::new(&config, &schedule, &buffer, &models).save(&path)?;

        let mut doc = CheckpointDocument::<Vec<usize>, Vec<f32>>::load(&path)?;
        assert_eq!(doc.config, config);
        assert_eq!(doc.schedule, schedule);
        assert_eq!(doc.replay_buffer.entries(), buffer.entries());
        assert_eq!(doc.replay_buffer.priorities(), buffer.priorities());
        assert_eq!(doc.replay_buffer.cursor(), 2);
        assert_eq!(doc.replay_buffer.capacity(), 3);

        let (pool, live) = doc.take_models()?;
        assert_eq!(pool, vec![vec![1f32, 2.0], vec![3.0]]);
        assert_eq!(live, vec![4.0, 5.0, 6.0]);
        assert!(doc.take_models().is_err());
        Ok(())
    }

    #[test]
    fn test_rejects_document_without_models() -> Result<()> {
        let config = ArenaConfig::new(0usize);
        let buffer = PrioritizedReplayBuffer::new(2, 0)?;
        let schedule = ScheduleState::initial(&PerConfig::default(), &ScheduleConfig::default());
        let models: Vec<Vec<f32>> = vec![];

        let dir = TempDir::new("checkpoint")?;
        let path = dir.path().join("checkpoint.json");
        CheckpointRef::new(&config, &schedule, &buffer, &models).save(&path)?;
        assert!(CheckpointDocument::<usize, Vec<f32>>::load(&path).is_err());
        Ok(())
    }
}
