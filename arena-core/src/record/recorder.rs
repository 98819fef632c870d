use super::Record;
use std::{cell::RefCell, rc::Rc};

/// Writes a record to an output destination.
pub trait Recorder {
    /// Writes a record.
    fn write(&mut self, record: Record);
}

/// A [`Recorder`] that buffers records and writes their aggregate.
pub trait AggregateRecorder {
    /// Stores a record until the next call of [`AggregateRecorder::flush`].
    fn store(&mut self, record: Record);

    /// Writes values aggregated from the stored records.
    ///
    /// `step` is the number of training steps at the time of flushing.
    fn flush(&mut self, step: i64);
}

/// Lets the owner of a recorder read it while the self-play loop writes to it.
impl<R: Recorder> Recorder for Rc<RefCell<R>> {
    fn write(&mut self, record: Record) {
        self.borrow_mut().write(record);
    }
}

impl<R: AggregateRecorder> AggregateRecorder for Rc<RefCell<R>> {
    fn store(&mut self, record: Record) {
        self.borrow_mut().store(record);
    }

    fn flush(&mut self, step: i64) {
        self.borrow_mut().flush(step);
    }
}
