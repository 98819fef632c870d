//! Pool of frozen policies used as historical opponents.
use rand::Rng;
use std::collections::VecDeque;

/// Policy controlling player two during a match.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Opponent {
    /// The live policy plays against itself.
    Live,

    /// The pool entry at the given index, 0 being the oldest.
    Pool(usize),
}

impl Opponent {
    /// Label used in match records.
    pub fn label(&self) -> String {
        match self {
            Self::Live => "live".to_string(),
            Self::Pool(i) => format!("pool_{}", i),
        }
    }
}

/// Bounded FIFO of frozen policies.
///
/// Pushing into a full pool evicts the oldest entry.
pub struct ModelEnsemble<P> {
    models: VecDeque<P>,
    max_size: usize,
}

impl<P> ModelEnsemble<P> {
    /// Creates an empty pool holding at most `max_size` entries.
    pub fn new(max_size: usize) -> Self {
        Self {
            models: VecDeque::with_capacity(max_size),
            max_size,
        }
    }

    /// Maximum number of entries.
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Returns `true` if the pool has no entry.
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Appends a policy, evicting the oldest one if the pool is full.
    ///
    /// A pool of size zero drops every policy.
    pub fn push(&mut self, model: P) {
        if self.max_size == 0 {
            return;
        }
        while self.models.len() >= self.max_size {
            self.models.pop_front();
        }
        self.models.push_back(model);
    }

    /// Entry at the given index, 0 being the oldest.
    pub fn get(&self, ix: usize) -> Option<&P> {
        self.models.get(ix)
    }

    /// Mutable entry at the given index.
    pub fn get_mut(&mut self, ix: usize) -> Option<&mut P> {
        self.models.get_mut(ix)
    }

    /// Iterates from the oldest to the newest entry.
    pub fn iter(&self) -> impl Iterator<Item = &P> {
        self.models.iter()
    }

    /// Chooses the opponent of a match.
    ///
    /// With probability `latest_prob` the newest entry, otherwise an entry
    /// drawn uniformly; the live policy if the pool is empty.
    pub fn choose_opponent<R: Rng>(&self, latest_prob: f64, rng: &mut R) -> Opponent {
        let n = self.models.len();
        if n == 0 {
            Opponent::Live
        } else if rng.gen::<f64>() < latest_prob {
            Opponent::Pool(n - 1)
        } else {
            Opponent::Pool(rng.gen_range(0..n))
        }
    }
}
