//! Writes records of self-play runs to TensorBoard event files.
use arena_core::record::{AggregateRecorder, Record, RecordStorage, RecordValue, Recorder};
use log::warn;
use std::path::Path;
use tensorboard_rs::summary_writer::SummaryWriter;

/// Writes scalar records to TFRecord event files.
///
/// Stored records are aggregated by [`RecordStorage`] and written on flush
/// at the given training step. Strings and timestamps are skipped.
pub struct TensorboardRecorder {
    writer: SummaryWriter,
    storage: RecordStorage,
    step_key: String,
}

impl TensorboardRecorder {
    /// Constructs a [`TensorboardRecorder`] writing into `logdir`.
    pub fn new<P: AsRef<Path>>(logdir: P) -> Self {
        Self {
            writer: SummaryWriter::new(logdir),
            storage: RecordStorage::new(),
            step_key: "train_steps".to_string(),
        }
    }
}

impl Recorder for TensorboardRecorder {
    /// Writes the scalars of a record.
    ///
    /// The record must hold the step under the key `train_steps`; records
    /// without it are dropped with a warning.
    fn write(&mut self, record: Record) {
        let step = match record.get(&self.step_key) {
            Some(RecordValue::Scalar(v)) => *v as usize,
            _ => {
                warn!("Dropped a record without {}", self.step_key);
                return;
            }
        };

        for (k, v) in record.iter() {
            if *k == self.step_key {
                continue;
            }
            match v {
                RecordValue::Scalar(v) => self.writer.add_scalar(k, *v, step),
                RecordValue::Array1(vs) if vs.len() == 1 => self.writer.add_scalar(k, vs[0], step),
                _ => {}
            }
        }
    }
}

impl AggregateRecorder for TensorboardRecorder {
    fn store(&mut self, record: Record) {
        self.storage.store(record);
    }

    fn flush(&mut self, step: i64) {
        let mut record = self.storage.aggregate();
        if record.is_empty() {
            return;
        }
        record.insert(self.step_key.clone(), RecordValue::Scalar(step as f32));
        self.write(record);
        self.writer.flush();
    }
}
