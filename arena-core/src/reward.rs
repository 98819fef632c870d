//! Rewards of both players on a tick.
use crate::{PlayerId, StateSnapshot};
use serde::{Deserialize, Serialize};

/// Computes the rewards of both players from a snapshot.
pub trait RewardPolicy {
    /// Rewards of player one and player two.
    ///
    /// `forced_terminal` is set on the tick where the loop ends the match
    /// because it reached its tick cap.
    fn rewards(&self, snapshot: &StateSnapshot, forced_terminal: bool) -> (f64, f64);
}

/// Parameters of [`ShapedReward`].
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct RewardConfig {
    /// Reward of the winner.
    pub win: f64,

    /// Reward of the loser.
    pub loss: f64,

    /// Reward of every tick of a running match.
    pub tick: f64,

    /// Bonus per tick at distance zero, decreasing linearly to zero at
    /// scaled distance one.
    pub proximity: f64,

    /// Multiplier of the distance between the players.
    pub distance_scale: f64,

    /// Added to both rewards when the tick cap ends the match.
    pub timeout: f64,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            win: 1.0,
            loss: -0.8,
            tick: -0.005,
            proximity: 0.003,
            distance_scale: 1.0 / 500.0,
            timeout: 0.0,
        }
    }
}

impl RewardConfig {
    /// Sets the reward of the winner.
    pub fn win(mut self, v: f64) -> Self {
        self.win = v;
        self
    }

    /// Sets the reward of the loser.
    pub fn loss(mut self, v: f64) -> Self {
        self.loss = v;
        self
    }

    /// Sets the reward per tick.
    pub fn tick(mut self, v: f64) -> Self {
        self.tick = v;
        self
    }

    /// Sets the proximity bonus.
    pub fn proximity(mut self, v: f64) -> Self {
        self.proximity = v;
        self
    }

    /// Sets the reward added on a capped match end.
    pub fn timeout(mut self, v: f64) -> Self {
        self.timeout = v;
        self
    }
}

/// Terminal win/loss rewards plus per-tick shaping toward engagement.
///
/// A decided match gives `win` and `loss`. Otherwise both players receive
/// `tick + max(0, (1 - d) * proximity)` where `d` is the scaled distance
/// between them, so that approaching the opponent is encouraged. Draws are
/// shaped like running ticks.
#[derive(Clone, Debug, Default)]
pub struct ShapedReward {
    config: RewardConfig,
}

impl ShapedReward {
    /// Creates the reward policy.
    pub fn new(config: RewardConfig) -> Self {
        Self { config }
    }
}

impl RewardPolicy for ShapedReward {
    fn rewards(&self, s: &StateSnapshot, forced_terminal: bool) -> (f64, f64) {
        let c = &self.config;
        match s.winner {
            Some(PlayerId::One) => return (c.win, c.loss),
            Some(PlayerId::Two) => return (c.loss, c.win),
            None => {}
        }

        let dx = (s.player_one.x - s.player_two.x) as f64;
        let dy = (s.player_one.y - s.player_two.y) as f64;
        let d = dx.hypot(dy) * c.distance_scale;
        let mut r = c.tick + ((1.0 - d) * c.proximity).max(0.0);
        if forced_terminal {
            r += c.timeout;
        }
        (r, r)
    }
}
