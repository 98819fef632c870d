//! A toy two-player arena.
//!
//! Players move on a line with gravity, can jump and charge a heavy attack.
//! Releasing a charged attack within reach pushes the opponent away; a
//! player pushed beyond the edge of the stage is out. The arena stands in
//! for a game host in demos and tests.
use anyhow::Result;
use arena_core::{
    Actuator, Environment, InputIntent, PlayerId, PlayerSnapshot, SensorUnavailable,
    StateSnapshot,
};
use log::debug;
use serde::{Deserialize, Serialize};
use std::{cell::RefCell, rc::Rc};

/// Configuration of the toy arena.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct SimConfig {
    /// Players are out beyond this distance from the center.
    pub half_width: f32,

    /// Distance between a player and the center at the start of a match.
    pub start_x: f32,

    /// Maximum random offset added to the starting positions.
    pub start_jitter: f32,

    /// Physics steps per snapshot.
    pub steps_per_snapshot: usize,

    /// Horizontal acceleration per step while a direction key is held.
    pub accel: f32,

    /// Fraction of the horizontal velocity kept on each step.
    pub friction: f32,

    /// Vertical velocity of a jump.
    pub jump_speed: f32,

    /// Downward acceleration per step.
    pub gravity: f32,

    /// Charge gained per step while the heavy key is held.
    pub charge_rate: f32,

    /// Horizontal reach of the heavy attack.
    pub reach: f32,

    /// Velocity given to the opponent by a fully charged attack.
    pub knockback: f32,

    /// Probability that the charge sensor is unavailable on a snapshot.
    pub sensor_dropout: f64,

    /// Seed of the random draws.
    pub seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            half_width: 600.0,
            start_x: 200.0,
            start_jitter: 50.0,
            steps_per_snapshot: 4,
            accel: 1.5,
            friction: 0.9,
            jump_speed: 12.0,
            gravity: 0.8,
            charge_rate: 0.05,
            reach: 80.0,
            knockback: 40.0,
            sensor_dropout: 0.0,
            seed: 42,
        }
    }
}

impl SimConfig {
    /// Sets the half width of the stage.
    pub fn half_width(mut self, v: f32) -> Self {
        self.half_width = v;
        self
    }

    /// Sets the starting distance from the center and its jitter.
    pub fn start(mut self, x: f32, jitter: f32) -> Self {
        self.start_x = x;
        self.start_jitter = jitter;
        self
    }

    /// Sets the number of physics steps per snapshot.
    pub fn steps_per_snapshot(mut self, v: usize) -> Self {
        self.steps_per_snapshot = v;
        self
    }

    /// Sets the probability of an unavailable charge sensor.
    pub fn sensor_dropout(mut self, v: f64) -> Self {
        self.sensor_dropout = v;
        self
    }

    /// Sets the random seed.
    pub fn seed(mut self, v: u64) -> Self {
        self.seed = v;
        self
    }
}

#[derive(Clone, Debug, Default)]
struct Body {
    x: f32,
    y: f32,
    vx: f32,
    vy: f32,
    charge: f32,
    keys: InputIntent,
}

impl Body {
    fn on_ground(&self) -> bool {
        self.y <= 0.0
    }
}

/// State of the arena shared by [`SimEnvironment`] and [`SimActuator`].
pub struct World {
    config: SimConfig,
    rng: fastrand::Rng,
    bodies: [Body; 2],
    outcome: Option<Option<PlayerId>>,
    steps: usize,
}

fn index(id: PlayerId) -> usize {
    match id {
        PlayerId::One => 0,
        PlayerId::Two => 1,
    }
}

impl World {
    /// Creates a world with both players at their starting positions.
    pub fn new(config: SimConfig) -> Self {
        let rng = fastrand::Rng::with_seed(config.seed);
        let mut world = Self {
            config,
            rng,
            bodies: [Body::default(), Body::default()],
            outcome: None,
            steps: 0,
        };
        world.reset();
        world
    }

    /// Places the players for a new match.
    pub fn reset(&mut self) {
        let c = &self.config;
        let mut jitter = || c.start_jitter * (2.0 * self.rng.f32() - 1.0);
        let x1 = -c.start_x + jitter();
        let x2 = c.start_x + jitter();
        self.bodies = [
            Body {
                x: x1,
                ..Body::default()
            },
            Body {
                x: x2,
                ..Body::default()
            },
        ];
        self.outcome = None;
        self.steps = 0;
    }

    /// Holds the keys of a player.
    pub fn set_keys(&mut self, id: PlayerId, keys: InputIntent) {
        self.bodies[index(id)].keys = keys;
    }

    /// `None` while the match runs; the winner, or `None` for a draw, after it ended.
    pub fn outcome(&self) -> Option<Option<PlayerId>> {
        self.outcome
    }

    /// Physics steps since the last reset.
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Horizontal positions of the players.
    pub fn positions(&self) -> (f32, f32) {
        (self.bodies[0].x, self.bodies[1].x)
    }

    /// Advances the world by one physics step.
    pub fn step(&mut self) {
        if self.outcome.is_some() {
            return;
        }
        self.steps += 1;

        let mut hits = [0f32; 2];
        for i in 0..2 {
            let c = &self.config;
            let b = &mut self.bodies[i];
            let dir = (b.keys.right as i32 - b.keys.left as i32) as f32;
            b.vx = c.friction * b.vx + c.accel * dir;
            if b.keys.up && b.on_ground() {
                b.vy = c.jump_speed;
            }
            let fall = if b.keys.down { 2.0 } else { 1.0 };
            b.vy -= fall * c.gravity;

            if b.keys.heavy {
                b.charge = (b.charge + c.charge_rate).min(1.0);
            } else if b.charge > 0.0 {
                hits[i] = b.charge;
                b.charge = 0.0;
            }
        }

        // Released attacks push the other player away.
        for id in [PlayerId::One, PlayerId::Two] {
            let (me, other) = (index(id), index(id.opponent()));
            let charge = hits[me];
            if charge <= 0.0 {
                continue;
            }
            let dx = self.bodies[other].x - self.bodies[me].x;
            if dx.abs() <= self.config.reach {
                self.bodies[other].vx += self.config.knockback * charge * dx.signum();
                debug!("{} hit with charge {:.2}", id.as_str(), charge);
            }
        }

        for b in self.bodies.iter_mut() {
            b.x += b.vx;
            b.y = (b.y + b.vy).max(0.0);
            if b.on_ground() {
                b.vy = 0.0;
            }
        }

        let out = |b: &Body| b.x.abs() > self.config.half_width;
        self.outcome = match (out(&self.bodies[0]), out(&self.bodies[1])) {
            (false, false) => None,
            (true, true) => Some(None),
            (true, false) => Some(Some(PlayerId::Two)),
            (false, true) => Some(Some(PlayerId::One)),
        };
    }

    /// Reading of both players.
    pub fn snapshot(&mut self) -> StateSnapshot {
        let dropout = self.config.sensor_dropout;
        let mut read = |b: &Body| {
            let heavy_alpha = match dropout > 0.0 && self.rng.f64() < dropout {
                true => Err(SensorUnavailable),
                false => Ok(b.charge),
            };
            PlayerSnapshot {
                x: b.x,
                y: b.y,
                vx: b.vx,
                vy: b.vy,
                heavy_alpha,
                keys: b.keys,
            }
        };
        let player_one = read(&self.bodies[0]);
        let player_two = read(&self.bodies[1]);
        StateSnapshot {
            player_one,
            player_two,
            terminal: self.outcome.is_some(),
            winner: self.outcome.flatten(),
        }
    }
}

/// [`Environment`] reading a shared [`World`].
///
/// Each snapshot advances the world by
/// [`SimConfig::steps_per_snapshot`] physics steps.
pub struct SimEnvironment {
    world: Rc<RefCell<World>>,
}

impl SimEnvironment {
    /// The shared world.
    pub fn world(&self) -> Rc<RefCell<World>> {
        self.world.clone()
    }
}

impl Environment for SimEnvironment {
    fn start_match(&mut self) -> Result<()> {
        self.world.borrow_mut().reset();
        Ok(())
    }

    fn snapshot(&mut self) -> Result<StateSnapshot> {
        let mut world = self.world.borrow_mut();
        for _ in 0..world.config.steps_per_snapshot {
            world.step();
        }
        Ok(world.snapshot())
    }
}

/// [`Actuator`] holding keys in a shared [`World`].
pub struct SimActuator {
    world: Rc<RefCell<World>>,
}

impl Actuator for SimActuator {
    fn apply(&mut self, player: PlayerId, intent: &InputIntent) -> Result<()> {
        self.world.borrow_mut().set_keys(player, *intent);
        Ok(())
    }
}

/// Creates an environment and an actuator sharing a new world.
pub fn arena(config: SimConfig) -> (SimEnvironment, SimActuator) {
    let world = Rc::new(RefCell::new(World::new(config)));
    (
        SimEnvironment {
            world: world.clone(),
        },
        SimActuator { world },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(f: impl FnOnce(&mut InputIntent)) -> InputIntent {
        let mut k = InputIntent::default();
        f(&mut k);
        k
    }

    #[test]
    fn test_reset_is_symmetric_without_jitter() {
        let world = World::new(SimConfig::default().start(150.0, 0.0));
        assert_eq!(world.positions(), (-150.0, 150.0));
        assert_eq!(world.outcome(), None);
    }

    #[test]
    fn test_walking_off_the_stage_loses() {
        let (mut env, mut act) = arena(SimConfig::default().start(100.0, 0.0).half_width(150.0));
        env.start_match().unwrap();
        act.apply(PlayerId::One, &keys(|k| k.left = true)).unwrap();

        let mut s = env.snapshot().unwrap();
        for _ in 0..50 {
            if s.terminal {
                break;
            }
            s = env.snapshot().unwrap();
        }
        assert!(s.terminal);
        assert_eq!(s.winner, Some(PlayerId::Two));
        assert!(s.player_one.x < -150.0);

        // The world stays frozen until the next match.
        let steps = env.world().borrow().steps();
        env.snapshot().unwrap();
        assert_eq!(env.world().borrow().steps(), steps);
        env.start_match().unwrap();
        assert_eq!(env.world().borrow().outcome(), None);
    }

    #[test]
    fn test_charged_attack_pushes_opponent() {
        let mut world = World::new(SimConfig::default().start(30.0, 0.0));
        world.set_keys(PlayerId::One, keys(|k| k.heavy = true));
        for _ in 0..25 {
            world.step();
        }
        let s = world.snapshot();
        assert!((s.player_one.heavy_alpha.unwrap() - 1.0).abs() < 1e-6);
        assert_eq!(s.player_two.vx, 0.0);

        world.set_keys(PlayerId::One, InputIntent::default());
        world.step();
        let s = world.snapshot();
        assert_eq!(s.player_one.heavy_alpha, Ok(0.0));
        assert!(s.player_two.vx > 30.0);
    }

    #[test]
    fn test_jump_and_land() {
        let mut world = World::new(SimConfig::default());
        world.set_keys(PlayerId::Two, keys(|k| k.up = true));
        world.step();
        assert!(world.snapshot().player_two.y > 0.0);

        world.set_keys(PlayerId::Two, InputIntent::default());
        for _ in 0..100 {
            world.step();
        }
        let s = world.snapshot();
        assert_eq!(s.player_two.y, 0.0);
        assert_eq!(s.player_two.vy, 0.0);
    }

    #[test]
    fn test_sensor_dropout() {
        let mut world = World::new(SimConfig::default().sensor_dropout(1.0));
        let s = world.snapshot();
        assert_eq!(s.player_one.heavy_alpha, Err(SensorUnavailable));
        assert_eq!(s.player_two.heavy_alpha, Err(SensorUnavailable));
    }
}
