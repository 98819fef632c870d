//! Interfaces to the game host.
use anyhow::Result;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One of the two players of a match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerId {
    /// The player controlled by the live policy.
    One,

    /// The opponent; acts on the mirrored state.
    Two,
}

impl PlayerId {
    /// The other player.
    pub fn opponent(self) -> Self {
        match self {
            Self::One => Self::Two,
            Self::Two => Self::One,
        }
    }

    /// Name used in records and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::One => "player_one",
            Self::Two => "player_two",
        }
    }
}

/// A sensor of the host could not be read on this tick.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[error("sensor unavailable")]
pub struct SensorUnavailable;

/// Keys held by a player.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputIntent {
    /// Move left.
    pub left: bool,
    /// Move right.
    pub right: bool,
    /// Jump or move up.
    pub up: bool,
    /// Move down.
    pub down: bool,
    /// Heavy attack.
    pub heavy: bool,
    /// Special move; only driven when the action vector has a sixth component.
    pub special: bool,
}

impl InputIntent {
    /// Keys pressed by an action vector; a component is pressed if it is positive.
    ///
    /// Components are read in the order left, right, up, down, heavy, special.
    /// Missing components are released.
    pub fn from_action(action: &[f32]) -> Self {
        let pressed = |i: usize| action.get(i).map_or(false, |&v| v > 0.0);
        Self {
            left: pressed(0),
            right: pressed(1),
            up: pressed(2),
            down: pressed(3),
            heavy: pressed(4),
            special: pressed(5),
        }
    }

    /// Keys as `0.0`/`1.0` values, in the order of [`InputIntent::from_action`].
    pub fn to_vec(&self, include_special: bool) -> Vec<f32> {
        let b = |v: bool| if v { 1f32 } else { 0f32 };
        let mut keys = vec![
            b(self.left),
            b(self.right),
            b(self.up),
            b(self.down),
            b(self.heavy),
        ];
        if include_special {
            keys.push(b(self.special));
        }
        keys
    }
}

/// Reading of a single player on one tick, in world units.
#[derive(Clone, Debug, PartialEq)]
pub struct PlayerSnapshot {
    /// Horizontal position.
    pub x: f32,
    /// Vertical position.
    pub y: f32,
    /// Horizontal velocity.
    pub vx: f32,
    /// Vertical velocity.
    pub vy: f32,
    /// Charge indicator of the heavy attack in `[0, 1]`.
    pub heavy_alpha: Result<f32, SensorUnavailable>,
    /// Keys currently held.
    pub keys: InputIntent,
}

impl Default for PlayerSnapshot {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            vx: 0.0,
            vy: 0.0,
            heavy_alpha: Ok(0.0),
            keys: InputIntent::default(),
        }
    }
}

/// Reading of the whole match on one tick.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StateSnapshot {
    /// First player.
    pub player_one: PlayerSnapshot,
    /// Second player.
    pub player_two: PlayerSnapshot,
    /// `true` once a player is out.
    pub terminal: bool,
    /// Winner of a finished match; `None` while running and for draws.
    pub winner: Option<PlayerId>,
}

impl StateSnapshot {
    /// The same tick seen from the second player.
    ///
    /// Swaps the players and relabels the winner, so that mirroring twice
    /// gives back the original snapshot.
    #[cfg(test)]
    pub(crate) fn mirrored(&self) -> Self {
        Self {
            player_one: self.player_two.clone(),
            player_two: self.player_one.clone(),
            terminal: self.terminal,
            winner: self.winner.map(PlayerId::opponent),
        }
    }
}

/// Source of match state.
pub trait Environment {
    /// Asks the host to start a new match.
    fn start_match(&mut self) -> Result<()>;

    /// Reads the current state of the match.
    fn snapshot(&mut self) -> Result<StateSnapshot>;
}

/// Sink of player inputs.
pub trait Actuator {
    /// Holds the given keys for the player until the next call.
    fn apply(&mut self, player: PlayerId, intent: &InputIntent) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_from_action() {
        let intent = InputIntent::from_action(&[0.3, -0.2, 0.0, 1.0, 0.9]);
        assert_eq!(
            intent,
            InputIntent {
                left: true,
                right: false,
                up: false,
                down: true,
                heavy: true,
                special: false,
            }
        );
        assert_eq!(intent.to_vec(false), vec![1.0, 0.0, 0.0, 1.0, 1.0]);
        assert_eq!(intent.to_vec(true).len(), 6);
    }

    #[test]
    fn test_mirrored_relabels_winner() {
        let mut s = StateSnapshot::default();
        s.player_one.x = 3.0;
        s.terminal = true;
        s.winner = Some(PlayerId::One);

        let m = s.mirrored();
        assert_eq!(m.player_two.x, 3.0);
        assert_eq!(m.winner, Some(PlayerId::Two));
        assert_eq!(m.mirrored(), s);
    }
}
