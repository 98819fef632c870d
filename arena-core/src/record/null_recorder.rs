use super::{AggregateRecorder, Record, Recorder};

/// Discards every record.
///
/// Default recorder of [`SelfPlay`](crate::self_play::SelfPlay) runs
/// without an output.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullRecorder;

impl Recorder for NullRecorder {
    fn write(&mut self, _: Record) {}
}

impl AggregateRecorder for NullRecorder {
    fn store(&mut self, _: Record) {}

    fn flush(&mut self, _: i64) {}
}
