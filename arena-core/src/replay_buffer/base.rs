use super::ReplayBufferConfig;
use crate::{error::ArenaError, Transition, TransitionBatch};
use log::warn;
use rand::{rngs::StdRng, Rng, SeedableRng};
use segment_tree::{ops::MaxIgnoreNaN, SegmentPoint};
use serde::{Deserialize, Serialize, Serializer};
use std::convert::TryFrom;

/// Added to the absolute TD error when it is written back as a priority.
pub const PRIORITY_EPS: f64 = 1e-5;

const DEFAULT_SEED: u64 = 42;

/// Fixed-capacity ring buffer of transitions with a priority per entry.
///
/// Once the buffer is full, each insertion overwrites the slot under the
/// write cursor, which evicts the oldest entry together with its priority.
/// A new entry receives the current maximum priority so that it is likely
/// to be replayed at least once, or `1.0` if no positive priority exists.
#[derive(Deserialize)]
#[serde(try_from = "BufferData")]
pub struct PrioritizedReplayBuffer {
    capacity: usize,

    /// Slot written by the next insertion.
    cursor: usize,

    entries: Vec<Transition>,

    /// Always the same length as `entries`.
    priorities: Vec<f64>,

    /// Maximum over priorities; slots not yet written hold zero.
    max_tree: SegmentPoint<f64, MaxIgnoreNaN>,

    rng: StdRng,
}

impl PrioritizedReplayBuffer {
    /// Constructs an empty buffer.
    pub fn build(config: &ReplayBufferConfig) -> Result<Self, ArenaError> {
        Self::new(config.capacity, config.seed)
    }

    /// Constructs an empty buffer with the given capacity and sampling seed.
    pub fn new(capacity: usize, seed: u64) -> Result<Self, ArenaError> {
        if capacity == 0 {
            return Err(ArenaError::InvalidConfig(
                "replay buffer capacity must be positive".to_string(),
            ));
        }
        Ok(Self {
            capacity,
            cursor: 0,
            entries: Vec::with_capacity(capacity.min(1 << 16)),
            priorities: Vec::with_capacity(capacity.min(1 << 16)),
            max_tree: SegmentPoint::build(vec![0f64; capacity], MaxIgnoreNaN),
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// Replaces the random number generator used for sampling.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// Number of stored transitions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing has been stored yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of stored transitions.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slot written by the next insertion.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Priorities of the stored transitions, by slot.
    pub fn priorities(&self) -> &[f64] {
        &self.priorities
    }

    /// Stored transitions, by slot.
    pub fn entries(&self) -> &[Transition] {
        &self.entries
    }

    /// The transition stored in slot `ix`.
    pub fn get(&self, ix: usize) -> Option<&Transition> {
        self.entries.get(ix)
    }

    /// Priority given to a transition inserted now.
    pub fn max_priority(&self) -> f64 {
        let max = self.max_tree.query(0, self.capacity);
        if max > 0.0 && max.is_finite() {
            max
        } else {
            1.0
        }
    }

    /// Stores a transition.
    pub fn add(
        &mut self,
        state: Vec<f32>,
        action: Vec<f32>,
        reward: f64,
        next_state: Vec<f32>,
        done: bool,
    ) {
        self.push(Transition {
            state,
            action,
            reward,
            next_state,
            done,
        });
    }

    /// Stores a transition, overwriting the oldest one if the buffer is full.
    pub fn push(&mut self, transition: Transition) {
        let priority = self.max_priority();
        if self.entries.len() < self.capacity {
            self.entries.push(transition);
            self.priorities.push(priority);
        } else {
            self.entries[self.cursor] = transition;
            self.priorities[self.cursor] = priority;
        }
        self.max_tree.modify(self.cursor, priority);
        self.cursor = (self.cursor + 1) % self.capacity;
    }

    /// Draws `batch_size` transitions by priority.
    ///
    /// Indices are drawn independently (with replacement) by roulette wheel
    /// over `priority^alpha`. `alpha = 0` gives uniform sampling. Weights are
    /// `(N * P(i))^(-beta)` divided by their maximum within the batch.
    /// An empty buffer gives an empty batch.
    pub fn sample(&mut self, batch_size: usize, alpha: f64, beta: f64) -> TransitionBatch {
        let n = self.entries.len();
        if n == 0 || batch_size == 0 {
            return TransitionBatch::default();
        }

        let mut cumulative = Vec::with_capacity(n);
        let mut total = 0f64;
        for p in self.priorities.iter() {
            total += p.powf(alpha);
            cumulative.push(total);
        }

        if !(total > 0.0 && total.is_finite()) {
            warn!("Priorities sum to {}, falling back to uniform sampling", total);
            return self.sample_uniform(batch_size);
        }

        let mut indices = Vec::with_capacity(batch_size);
        let mut weights = Vec::with_capacity(batch_size);
        for _ in 0..batch_size {
            let u = self.rng.gen::<f64>() * total;
            let ix = cumulative.partition_point(|&c| c <= u).min(n - 1);
            let prob = self.priorities[ix].powf(alpha) / total;
            indices.push(ix);
            weights.push((n as f64 * prob).powf(-beta));
        }

        let w_max = weights.iter().copied().fold(f64::MIN_POSITIVE, f64::max);
        let weights = weights.into_iter().map(|w| w / w_max).collect();

        TransitionBatch {
            transitions: indices.iter().map(|&ix| self.entries[ix].clone()).collect(),
            indices,
            weights,
        }
    }

    /// Draws a batch where a fraction `per_fraction` of the samples is chosen
    /// by priority and the rest uniformly with weight `1.0`.
    pub fn sample_mixed(
        &mut self,
        batch_size: usize,
        per_fraction: f64,
        alpha: f64,
        beta: f64,
    ) -> TransitionBatch {
        let n_per = ((batch_size as f64) * per_fraction.clamp(0.0, 1.0)).round() as usize;
        let n_per = n_per.min(batch_size);
        let mut batch = self.sample(n_per, alpha, beta);
        if batch_size > n_per {
            batch.extend(self.sample_uniform(batch_size - n_per));
        }
        batch
    }

    fn sample_uniform(&mut self, batch_size: usize) -> TransitionBatch {
        let n = self.entries.len();
        if n == 0 {
            return TransitionBatch::default();
        }
        let indices: Vec<usize> = (0..batch_size).map(|_| self.rng.gen_range(0..n)).collect();
        TransitionBatch {
            transitions: indices.iter().map(|&ix| self.entries[ix].clone()).collect(),
            weights: vec![1.0; indices.len()],
            indices,
        }
    }

    /// Writes back `|td_error| + 1e-5` as the priority of each index.
    ///
    /// When an index appears more than once, the last error wins.
    pub fn update_priorities(&mut self, indices: &[usize], td_errors: &[f64]) {
        if indices.len() != td_errors.len() {
            warn!(
                "{} indices but {} TD errors, extra values are ignored",
                indices.len(),
                td_errors.len()
            );
        }
        for (&ix, &e) in indices.iter().zip(td_errors.iter()) {
            if ix >= self.priorities.len() {
                warn!("Priority update for empty slot {} ignored", ix);
                continue;
            }
            if !e.is_finite() {
                warn!("Non-finite TD error {} for slot {} ignored", e, ix);
                continue;
            }
            let p = e.abs() + PRIORITY_EPS;
            self.priorities[ix] = p;
            self.max_tree.modify(ix, p);
        }
    }
}

#[derive(Serialize)]
struct BufferView<'a> {
    capacity: usize,
    cursor: usize,
    entries: &'a [Transition],
    priorities: &'a [f64],
}

#[derive(Deserialize)]
struct BufferData {
    capacity: usize,
    cursor: usize,
    entries: Vec<Transition>,
    priorities: Vec<f64>,
}

impl Serialize for PrioritizedReplayBuffer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        BufferView {
            capacity: self.capacity,
            cursor: self.cursor,
            entries: &self.entries,
            priorities: &self.priorities,
        }
        .serialize(serializer)
    }
}

impl TryFrom<BufferData> for PrioritizedReplayBuffer {
    type Error = ArenaError;

    fn try_from(data: BufferData) -> Result<Self, Self::Error> {
        let BufferData {
            capacity,
            cursor,
            entries,
            priorities,
        } = data;

        if entries.len() != priorities.len() {
            return Err(ArenaError::InvalidCheckpoint(format!(
                "{} entries but {} priorities",
                entries.len(),
                priorities.len()
            )));
        }
        if entries.len() > capacity {
            return Err(ArenaError::InvalidCheckpoint(format!(
                "{} entries exceed capacity {}",
                entries.len(),
                capacity
            )));
        }
        let full = entries.len() == capacity;
        if (full && cursor >= capacity) || (!full && cursor != entries.len()) {
            return Err(ArenaError::InvalidCheckpoint(format!(
                "write cursor {} is inconsistent with {} entries of capacity {}",
                cursor,
                entries.len(),
                capacity
            )));
        }

        let mut buffer = Self::new(capacity, DEFAULT_SEED)
            .map_err(|e| ArenaError::InvalidCheckpoint(e.to_string()))?;
        for (ix, &p) in priorities.iter().enumerate() {
            buffer.max_tree.modify(ix, p);
        }
        buffer.entries = entries;
        buffer.priorities = priorities;
        buffer.cursor = cursor;
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transition(v: f32) -> Transition {
        Transition {
            state: vec![v; 2],
            action: vec![1.0, 0.0],
            reward: v as f64,
            next_state: vec![v + 1.0; 2],
            done: false,
        }
    }

    #[test]
    fn test_new_entry_gets_max_priority() {
        let mut buffer = PrioritizedReplayBuffer::new(4, 0).unwrap();
        buffer.push(transition(0.0));
        assert_eq!(buffer.priorities(), &[1.0]);

        buffer.update_priorities(&[0], &[-2.5]);
        buffer.push(transition(1.0));
        assert_eq!(buffer.priorities()[1], 2.5 + PRIORITY_EPS);
    }

    #[test]
    fn test_max_revalidated_after_eviction() {
        let mut buffer = PrioritizedReplayBuffer::new(2, 0).unwrap();
        buffer.push(transition(0.0));
        buffer.push(transition(1.0));
        buffer.update_priorities(&[0, 1], &[9.0, 0.5]);

        // Overwrites slot 0, the maximal entry; the new entry inherits 9.0.
        buffer.push(transition(2.0));
        assert_eq!(buffer.priorities()[0], 9.0 + PRIORITY_EPS);

        buffer.update_priorities(&[0], &[0.1]);
        buffer.push(transition(3.0));
        assert_eq!(buffer.priorities()[1], 0.5 + PRIORITY_EPS);
    }

    #[test]
    fn test_zero_priorities_fall_back() {
        let mut buffer = PrioritizedReplayBuffer::new(3, 0).unwrap();
        buffer.push(transition(0.0));
        buffer.push(transition(1.0));
        buffer.priorities = vec![0.0, 0.0];
        buffer.max_tree = SegmentPoint::build(vec![0f64; 3], MaxIgnoreNaN);

        assert_eq!(buffer.max_priority(), 1.0);
        let batch = buffer.sample(8, 0.6, 0.4);
        assert_eq!(batch.len(), 8);
        assert!(batch.weights.iter().all(|&w| w == 1.0));
    }

    #[test]
    fn test_mixed_sampling_sizes() {
        let mut buffer = PrioritizedReplayBuffer::new(8, 0).unwrap();
        for i in 0..8 {
            buffer.push(transition(i as f32));
        }
        buffer.update_priorities(&[0, 1, 2, 3], &[4.0, 3.0, 2.0, 1.0]);

        let batch = buffer.sample_mixed(10, 0.7, 0.6, 0.4);
        assert_eq!(batch.len(), 10);
        assert_eq!(batch.indices.len(), 10);
        assert!(batch.weights[7..].iter().all(|&w| w == 1.0));
        let w_max = batch.weights.iter().copied().fold(0.0, f64::max);
        assert!((w_max - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_zero_capacity() {
        assert!(PrioritizedReplayBuffer::new(0, 0).is_err());
    }

    #[test]
    fn test_rejects_inconsistent_data() {
        let data = BufferData {
            capacity: 2,
            cursor: 1,
            entries: vec![transition(0.0)],
            priorities: vec![1.0, 1.0],
        };
        assert!(PrioritizedReplayBuffer::try_from(data).is_err());

        let data = BufferData {
            capacity: 2,
            cursor: 0,
            entries: vec![transition(0.0)],
            priorities: vec![1.0],
        };
        assert!(PrioritizedReplayBuffer::try_from(data).is_err());
    }
}
