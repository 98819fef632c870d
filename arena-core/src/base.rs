//! Core traits and value types.
mod agent;
mod env;
mod policy;
pub use agent::{Agent, Snapshot, TrainContext, TrainOutput};
pub use env::{
    Actuator, Environment, InputIntent, PlayerId, PlayerSnapshot, SensorUnavailable,
    StateSnapshot,
};
pub use policy::{ActionKind, Policy};
