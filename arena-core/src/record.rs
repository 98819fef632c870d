//! Records of training metrics and match outcomes.
//!
//! A [`Record`] is a set of key-value pairs. Trainers return one per
//! optimization step and the self-play loop adds one per finished match.
//! Records are passed to an [`AggregateRecorder`], which stores them and
//! periodically writes aggregated values (min, max, mean and median of
//! scalars) to its destination.
//!
//! ```rust
//! use arena_core::record::{Record, RecordValue};
//!
//! let mut record = Record::from_scalar("loss_critic", 0.25);
//! record.insert("winner", RecordValue::String("player_one".to_string()));
//! assert_eq!(record.get_scalar("loss_critic").unwrap(), 0.25);
//! ```
mod base;
mod buffered_recorder;
mod null_recorder;
mod recorder;
mod storage;

pub use base::{Record, RecordValue};
pub use buffered_recorder::BufferedRecorder;
pub use null_recorder::NullRecorder;
pub use recorder::{AggregateRecorder, Recorder};
pub use storage::RecordStorage;
