//! Policy.
use anyhow::Result;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A mapping from an encoded state to an action vector.
///
/// The mapping can be either deterministic or stochastic.
pub trait Policy {
    /// Samples an action for the given state.
    fn sample(&mut self, state: &[f32]) -> Result<Vec<f32>>;
}

/// Kind of the action vectors produced by an agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionKind {
    /// Multi-hot vectors of `0.0`/`1.0`.
    Discrete,

    /// Vectors in `[-1, 1]`.
    Continuous,
}

impl ActionKind {
    /// A random action of the given dimension.
    ///
    /// Discrete components are pressed with probability 1/2, continuous ones
    /// are uniform in `[-1, 1)`.
    pub fn random<R: Rng>(&self, dim: usize, rng: &mut R) -> Vec<f32> {
        match self {
            Self::Discrete => (0..dim)
                .map(|_| if rng.gen_bool(0.5) { 1.0 } else { 0.0 })
                .collect(),
            Self::Continuous => (0..dim).map(|_| rng.gen_range(-1f32..1f32)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_random_action_ranges() {
        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..100 {
            let a = ActionKind::Discrete.random(5, &mut rng);
            assert_eq!(a.len(), 5);
            assert!(a.iter().all(|&v| v == 0.0 || v == 1.0));

            let a = ActionKind::Continuous.random(3, &mut rng);
            assert!(a.iter().all(|&v| (-1.0..1.0).contains(&v)));
        }
    }
}
