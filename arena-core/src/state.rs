//! Encoding of match snapshots into state vectors.
use crate::{error::ArenaError, PlayerSnapshot, StateSnapshot};
use anyhow::Result;
use log::debug;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Number of values of a player block besides its keys.
const KINEMATICS: usize = 5;

/// Number of values of the difference block.
const DIFFS: usize = 4;

/// Scales and layout of the encoded state.
///
/// The encoding of a snapshot from the view of player one is
/// `[own (5 + K), opponent (5 + K), diff (4)]`, where a player block is
/// position, velocity, heavy attack charge and the `K` held keys, and the
/// difference block is own minus opponent position and velocity.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct StateConfig {
    /// Multiplier of positions.
    pub position_scale: f32,

    /// Multiplier of velocities.
    pub velocity_scale: f32,

    /// Encode the special key; `K` is 6 if set, 5 otherwise.
    pub include_special: bool,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            position_scale: 1.0 / 500.0,
            velocity_scale: 1.5,
            include_special: false,
        }
    }
}

impl StateConfig {
    /// Sets the position multiplier.
    pub fn position_scale(mut self, v: f32) -> Self {
        self.position_scale = v;
        self
    }

    /// Sets the velocity multiplier.
    pub fn velocity_scale(mut self, v: f32) -> Self {
        self.velocity_scale = v;
        self
    }

    /// Sets whether the special key is encoded.
    pub fn include_special(mut self, v: bool) -> Self {
        self.include_special = v;
        self
    }

    /// Number of keys per player.
    pub fn n_keys(&self) -> usize {
        if self.include_special {
            6
        } else {
            5
        }
    }

    fn player_block(&self) -> usize {
        KINEMATICS + self.n_keys()
    }

    /// Length of encoded states.
    pub fn state_dim(&self) -> usize {
        2 * self.player_block() + DIFFS
    }

    fn encode_player(&self, p: &PlayerSnapshot, out: &mut Vec<f32>) {
        let heavy_alpha = match p.heavy_alpha {
            Ok(v) => v,
            Err(e) => {
                debug!("Heavy attack charge: {}, using 0", e);
                0.0
            }
        };
        out.extend_from_slice(&[
            p.x * self.position_scale,
            p.y * self.position_scale,
            p.vx * self.velocity_scale,
            p.vy * self.velocity_scale,
            heavy_alpha,
        ]);
        out.extend(p.keys.to_vec(self.include_special));
    }

    /// Encodes a snapshot from the view of player one.
    ///
    /// [`StateConfig::mirror_state`] turns the result into the view of player two.
    pub fn encode(&self, s: &StateSnapshot) -> Vec<f32> {
        let (p1, p2) = (&s.player_one, &s.player_two);
        let mut v = Vec::with_capacity(self.state_dim());
        self.encode_player(p1, &mut v);
        self.encode_player(p2, &mut v);
        v.extend_from_slice(&[
            self.position_scale * (p1.x - p2.x),
            self.position_scale * (p1.y - p2.y),
            self.velocity_scale * (p1.vx - p2.vx),
            self.velocity_scale * (p1.vy - p2.vy),
        ]);
        v
    }

    /// Mirrors an encoded state: swaps the player blocks and negates the differences.
    ///
    /// The result equals the encoding of the snapshot with the players
    /// swapped and the winner relabeled. Mirroring twice is the identity.
    pub fn mirror_state(&self, state: &[f32]) -> Result<Vec<f32>, ArenaError> {
        if state.len() != self.state_dim() {
            return Err(ArenaError::DimensionMismatch {
                name: "state",
                expected: self.state_dim(),
                actual: state.len(),
            });
        }
        let b = self.player_block();
        let mut v = Vec::with_capacity(state.len());
        v.extend_from_slice(&state[b..2 * b]);
        v.extend_from_slice(&state[..b]);
        v.extend(state[2 * b..].iter().map(|d| -d));
        Ok(v)
    }

    /// Loads the configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves the configuration to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}
