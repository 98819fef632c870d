use anyhow::Result;
use arena_core::{error::ArenaError, TransitionBatch};
use candle_core::{Device, Tensor};

/// A [`TransitionBatch`] converted to tensors.
///
/// `obs` and `next_obs` are `[B, S]`, `act` is `[B, A]`; the other fields
/// are `[B]`. All tensors are `f32`.
pub struct TensorBatch {
    /// Encoded states.
    pub obs: Tensor,

    /// Actions.
    pub act: Tensor,

    /// Encoded next states.
    pub next_obs: Tensor,

    /// Rewards.
    pub reward: Tensor,

    /// `0.0` for terminal transitions, `1.0` otherwise.
    pub not_done: Tensor,

    /// Importance weights.
    pub weight: Tensor,
}

fn stack(rows: Vec<&[f32]>, dim: usize, name: &'static str, device: &Device) -> Result<Tensor> {
    let batch_size = rows.len();
    let mut data = Vec::with_capacity(batch_size * dim);
    for row in rows {
        if row.len() != dim {
            return Err(ArenaError::DimensionMismatch {
                name,
                expected: dim,
                actual: row.len(),
            }
            .into());
        }
        data.extend_from_slice(row);
    }
    Ok(Tensor::from_vec(data, (batch_size, dim), device)?)
}

impl TensorBatch {
    /// Converts a batch, checking the state and action dimensions and the
    /// number of importance weights.
    pub fn from_batch(
        batch: &TransitionBatch,
        state_dim: usize,
        action_dim: usize,
        device: &Device,
    ) -> Result<Self> {
        let ts = &batch.transitions;
        let batch_size = ts.len();
        let obs = stack(ts.iter().map(|t| t.state.as_slice()).collect(), state_dim, "state", device)?;
        let next_obs = stack(
            ts.iter().map(|t| t.next_state.as_slice()).collect(),
            state_dim,
            "next_state",
            device,
        )?;
        let act = stack(ts.iter().map(|t| t.action.as_slice()).collect(), action_dim, "action", device)?;

        let reward: Vec<f32> = ts.iter().map(|t| t.reward as f32).collect();
        let not_done: Vec<f32> = ts.iter().map(|t| if t.done { 0.0 } else { 1.0 }).collect();
        if batch.weights.len() != batch_size {
            return Err(ArenaError::DimensionMismatch {
                name: "weights",
                expected: batch_size,
                actual: batch.weights.len(),
            }
            .into());
        }
        let weight: Vec<f32> = batch.weights.iter().map(|&w| w as f32).collect();

        Ok(Self {
            obs,
            act,
            next_obs,
            reward: Tensor::from_vec(reward, (batch_size,), device)?,
            not_done: Tensor::from_vec(not_done, (batch_size,), device)?,
            weight: Tensor::from_vec(weight, (batch_size,), device)?,
        })
    }
}

/// Converts a single state to a `[1, S]` tensor.
pub(crate) fn state_tensor(state: &[f32], state_dim: usize, device: &Device) -> Result<Tensor> {
    stack(vec![state], state_dim, "state", device)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena_core::Transition;

    #[test]
    fn test_from_batch() -> Result<()> {
        let t = |r: f64, done: bool| Transition {
            state: vec![r as f32; 3],
            action: vec![1.0, 0.0],
            reward: r,
            next_state: vec![0.0; 3],
            done,
        };
        let batch = TransitionBatch {
            transitions: vec![t(1.0, false), t(2.0, true)],
            indices: vec![0, 1],
            weights: vec![0.5, 1.0],
        };
        let tb = TensorBatch::from_batch(&batch, 3, 2, &Device::Cpu)?;
        assert_eq!(tb.obs.dims(), &[2, 3]);
        assert_eq!(tb.act.dims(), &[2, 2]);
        assert_eq!(tb.reward.to_vec1::<f32>()?, vec![1.0, 2.0]);
        assert_eq!(tb.not_done.to_vec1::<f32>()?, vec![1.0, 0.0]);
        assert_eq!(tb.weight.to_vec1::<f32>()?, vec![0.5, 1.0]);

        assert!(TensorBatch::from_batch(&batch, 4, 2, &Device::Cpu).is_err());

        let batch = TransitionBatch {
            weights: vec![1.0],
            ..batch
        };
        let err = TensorBatch::from_batch(&batch, 3, 2, &Device::Cpu)
            .err()
            .expect("a weight is missing");
        assert!(matches!(
            err.downcast_ref::<ArenaError>(),
            Some(ArenaError::DimensionMismatch { name: "weights", expected: 2, actual: 1 })
        ));
        Ok(())
    }
}
