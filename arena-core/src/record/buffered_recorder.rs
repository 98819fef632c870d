use super::{AggregateRecorder, Record, RecordStorage, RecordValue, Recorder};

/// Keeps records in memory.
///
/// Stored records are aggregated on [`AggregateRecorder::flush`] and the
/// aggregate is appended to the buffer together with the step count.
/// Wrap it in `Rc<RefCell<_>>` to inspect the records of a running
/// [`SelfPlay`](crate::self_play::SelfPlay).
#[derive(Default)]
pub struct BufferedRecorder {
    buf: Vec<Record>,
    storage: RecordStorage,
}

impl BufferedRecorder {
    /// Constructs the recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns an iterator over the written records.
    pub fn iter(&self) -> std::slice::Iter<Record> {
        self.buf.iter()
    }

    /// Returns the number of written records.
    pub fn len(&self) -> usize {
        self.buf.len()
    }
}

impl Recorder for BufferedRecorder {
    fn write(&mut self, record: Record) {
        self.buf.push(record);
    }
}

impl AggregateRecorder for BufferedRecorder {
    fn store(&mut self, record: Record) {
        self.storage.store(record);
    }

    fn flush(&mut self, step: i64) {
        let mut record = self.storage.aggregate();
        if record.is_empty() {
            return;
        }
        record.insert("train_steps", RecordValue::Scalar(step as f32));
        self.write(record);
    }
}
