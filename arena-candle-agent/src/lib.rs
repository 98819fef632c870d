//! Agents for arena self-play implemented with [candle](https://crates.io/crates/candle-core).
//!
//! Three trainers share the [`arena_core::Agent`] interface:
//!
//! * [`dqn::Dqn`], Double-Dueling Q-learning over multi-binary actions,
//! * [`sac_discrete::DiscreteSac`], soft actor-critic with relaxed Bernoulli actions,
//! * [`sac::Sac`], soft actor-critic with tanh-Gaussian actions.
//!
//! [`AgentConfig`] selects one of them from configuration and [`ArenaAgent`]
//! dispatches to it.
mod agent;
pub mod critic;
pub mod dqn;
pub mod estimator;
pub mod mlp;
pub mod model;
pub mod opt;
pub mod sac;
pub mod sac_discrete;
mod tensor_batch;
pub mod util;
pub use agent::{AgentConfig, ArenaAgent, FrozenPolicy, Trainer};
use anyhow::Result;
use serde::{Deserialize, Serialize};
pub use tensor_batch::TensorBatch;

#[derive(Clone, Debug, Copy, Deserialize, Serialize, PartialEq, Default)]
/// Device for using candle.
///
/// This enum is added because [`candle_core::Device`] does not support serialization.
pub enum Device {
    /// The main CPU device.
    #[default]
    Cpu,

    /// The GPU device with the given ordinal.
    Cuda(usize),
}

impl Device {
    /// Creates the candle device.
    ///
    /// Fails for [`Device::Cuda`] if candle was built without CUDA support.
    pub fn build(&self) -> Result<candle_core::Device> {
        Ok(match self {
            Self::Cpu => candle_core::Device::Cpu,
            Self::Cuda(n) => candle_core::Device::new_cuda(*n)?,
        })
    }
}
