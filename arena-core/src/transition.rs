//! Transitions and sampled batches.
use serde::{Deserialize, Serialize};

/// One step of experience of a single player.
///
/// `state` and `next_state` are encoded in the frame of the acting player,
/// so transitions of both players of a match share a single buffer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    /// Encoded state before the action.
    pub state: Vec<f32>,

    /// Action vector; multi-hot for discrete agents, `[-1, 1]` for continuous ones.
    pub action: Vec<f32>,

    /// Reward observed after the action.
    pub reward: f64,

    /// Encoded state after the action.
    pub next_state: Vec<f32>,

    /// `true` if the match ended at `next_state`.
    pub done: bool,
}

/// A batch of transitions drawn from a replay buffer.
///
/// `indices[i]` is the buffer slot of `transitions[i]` and `weights[i]`
/// its importance weight. The three vectors always have the same length.
#[derive(Clone, Debug, Default)]
pub struct TransitionBatch {
    /// Sampled transitions.
    pub transitions: Vec<Transition>,

    /// Slots in the buffer, used to write back priorities.
    pub indices: Vec<usize>,

    /// Importance weights.
    pub weights: Vec<f64>,
}

impl TransitionBatch {
    /// Number of samples in the batch.
    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    /// Returns `true` if the batch has no samples.
    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    /// Appends the samples of another batch.
    pub fn extend(&mut self, other: TransitionBatch) {
        self.transitions.extend(other.transitions);
        self.indices.extend(other.indices);
        self.weights.extend(other.weights);
    }
}
