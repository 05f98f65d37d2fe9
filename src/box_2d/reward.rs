//! Observation, engine throttle and reward bookkeeping for the lander.
//!
//! Nothing here touches the physics world, so the reward rules can be
//! checked on plain numbers.

use super::physics::BodyState;
use super::{FPS, LEG_DOWN, SCALE, VIEWPORT_H, VIEWPORT_W};

pub const OBSERVATION_SIZE: usize = 8;

/// Engine command, after it has been read out of the action tensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    /// Main engine throttle and lateral throttle, each in `[-1, 1]`.
    Continuous([f32; 2]),
    /// 0 no-op, 1 left engine, 2 main engine, 3 right engine.
    Discrete(u32),
}

impl Action {
    pub const NOOP_DISCRETE: Action = Action::Discrete(0);
    pub const NOOP_CONTINUOUS: Action = Action::Continuous([0.0, 0.0]);
}

/// How hard each engine fires on a step.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Throttle {
    /// Main engine power, 0 or in `[0.5, 1]`.
    pub main: f32,
    /// Side engine power, 0 or in `[0.5, 1]`.
    pub side: f32,
    /// -1 fires the left engine, +1 the right one.
    pub direction: f32,
}

impl Throttle {
    pub fn from_action(action: &Action) -> Self {
        let mut throttle = Throttle::default();
        match *action {
            Action::Continuous(raw) => {
                let main = raw[0].clamp(-1.0, 1.0);
                let lateral = raw[1].clamp(-1.0, 1.0);
                if main > 0.0 {
                    throttle.main = (main.clamp(0.0, 1.0) + 1.0) * 0.5;
                }
                if lateral.abs() > 0.5 {
                    throttle.direction = lateral.signum();
                    throttle.side = lateral.abs().clamp(0.5, 1.0);
                }
            }
            Action::Discrete(a) => {
                if a == 2 {
                    throttle.main = 1.0;
                }
                if a == 1 || a == 3 {
                    throttle.direction = a as f32 - 2.0;
                    throttle.side = 1.0;
                }
            }
        }
        throttle
    }
}

/// Normalized observation of the lander relative to the platform.
pub fn observe(
    lander: &BodyState,
    platform_y: f32,
    legs_contact: [bool; 2],
) -> [f32; OBSERVATION_SIZE] {
    let (x, y) = lander.position;
    let (vx, vy) = lander.velocity;
    [
        (x - VIEWPORT_W / SCALE / 2.0) / (VIEWPORT_W / SCALE / 2.0),
        (y - (platform_y + LEG_DOWN / SCALE)) / (VIEWPORT_H / SCALE / 2.0),
        vx * (VIEWPORT_W / SCALE / 2.0) / FPS,
        vy * (VIEWPORT_H / SCALE / 2.0) / FPS,
        lander.angle,
        20.0 * lander.angular_velocity / FPS,
        if legs_contact[0] { 1.0 } else { 0.0 },
        if legs_contact[1] { 1.0 } else { 0.0 },
    ]
}

/// Potential of a state: closer, slower, more upright and touching down is better.
pub fn shaping(state: &[f32; OBSERVATION_SIZE]) -> f32 {
    -100.0 * (state[0] * state[0] + state[1] * state[1]).sqrt()
        - 100.0 * (state[2] * state[2] + state[3] * state[3]).sqrt()
        - 100.0 * state[4].abs()
        + 10.0 * state[6]
        + 10.0 * state[7]
}

/// Turns successive potentials into per-step rewards.
#[derive(Debug, Clone, Copy, Default)]
pub struct RewardTracker {
    prev_shaping: Option<f32>,
}

impl RewardTracker {
    pub fn reset(&mut self) {
        self.prev_shaping = None;
    }

    pub fn prev_shaping(&self) -> Option<f32> {
        self.prev_shaping
    }

    pub fn reward(&mut self, state: &[f32; OBSERVATION_SIZE], throttle: &Throttle) -> f32 {
        let shaping = shaping(state);
        let mut reward = match self.prev_shaping {
            Some(prev) => shaping - prev,
            None => 0.0,
        };
        self.prev_shaping = Some(shaping);

        reward -= throttle.main * 0.30; // less fuel spent is better
        reward -= throttle.side * 0.03;
        reward
    }
}

/// Where an episode stands after a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Flying,
    /// Hull hit the ground or the lander left the screen sideways.
    Crashed,
    /// The lander came to rest.
    Landed,
}

impl Outcome {
    pub fn judge(game_over: bool, state: &[f32; OBSERVATION_SIZE], awake: bool) -> Self {
        let mut outcome = Outcome::Flying;
        if game_over || state[0].abs() >= 1.0 {
            outcome = Outcome::Crashed;
        }
        // coming to rest wins, even after a crash
        if !awake {
            outcome = Outcome::Landed;
        }
        outcome
    }

    pub fn is_terminal(&self) -> bool {
        *self != Outcome::Flying
    }

    /// Reward replacing the shaped one when the episode ends.
    pub fn terminal_reward(&self) -> Option<f32> {
        match self {
            Outcome::Flying => None,
            Outcome::Crashed => Some(-100.0),
            Outcome::Landed => Some(100.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(x: f32, y: f32) -> [f32; OBSERVATION_SIZE] {
        [x, y, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]
    }

    #[test]
    fn discrete_throttle() {
        assert_eq!(Throttle::from_action(&Action::Discrete(0)), Throttle::default());

        let main = Throttle::from_action(&Action::Discrete(2));
        assert_eq!(main.main, 1.0);
        assert_eq!(main.side, 0.0);

        let left = Throttle::from_action(&Action::Discrete(1));
        assert_eq!((left.main, left.side, left.direction), (0.0, 1.0, -1.0));

        let right = Throttle::from_action(&Action::Discrete(3));
        assert_eq!((right.main, right.side, right.direction), (0.0, 1.0, 1.0));
    }

    #[test]
    fn continuous_throttle() {
        assert_eq!(Throttle::from_action(&Action::NOOP_CONTINUOUS), Throttle::default());

        let full = Throttle::from_action(&Action::Continuous([1.0, 0.0]));
        assert_eq!(full.main, 1.0);
        assert_eq!(full.side, 0.0);

        let half = Throttle::from_action(&Action::Continuous([0.5, 0.7]));
        assert!((half.main - 0.75).abs() < 1e-6);
        assert!((half.side - 0.7).abs() < 1e-6);
        assert_eq!(half.direction, 1.0);

        // below the side dead zone and with the main engine reversed
        let idle = Throttle::from_action(&Action::Continuous([-0.2, -0.3]));
        assert_eq!(idle, Throttle::default());

        // out of range inputs are clipped
        let clipped = Throttle::from_action(&Action::Continuous([5.0, -9.0]));
        assert_eq!(clipped.main, 1.0);
        assert_eq!(clipped.side, 1.0);
        assert_eq!(clipped.direction, -1.0);

        let barely = Throttle::from_action(&Action::Continuous([1e-3, 0.0]));
        assert!(barely.main >= 0.5 && barely.main <= 1.0);
    }

    #[test]
    fn observation_is_normalized() {
        let lander = BodyState {
            position: (VIEWPORT_W / SCALE / 2.0, 8.0 + LEG_DOWN / SCALE),
            velocity: (0.0, -FPS / (VIEWPORT_H / SCALE / 2.0)),
            angle: 0.1,
            angular_velocity: FPS / 20.0,
            awake: true,
        };
        let obs = observe(&lander, 8.0, [true, false]);
        assert!(obs[0].abs() < 1e-6);
        assert!(obs[1].abs() < 1e-6);
        assert_eq!(obs[2], 0.0);
        assert!((obs[3] + 1.0).abs() < 1e-5);
        assert_eq!(obs[4], 0.1);
        assert!((obs[5] - 1.0).abs() < 1e-6);
        assert_eq!(&obs[6..], &[1.0, 0.0]);
    }

    #[test]
    fn shaping_terms() {
        assert_eq!(shaping(&state(0.0, 0.0)), 0.0);
        assert!((shaping(&state(0.3, 0.4)) + 50.0).abs() < 1e-4);

        let mut touching = state(0.0, 0.0);
        touching[6] = 1.0;
        touching[7] = 1.0;
        assert_eq!(shaping(&touching), 20.0);

        let mut tilted = state(0.0, 0.0);
        tilted[4] = -0.2;
        assert!((shaping(&tilted) + 20.0).abs() < 1e-4);
    }

    #[test]
    fn first_reward_is_only_fuel_cost() {
        for action in [
            Action::Discrete(0),
            Action::Discrete(1),
            Action::Discrete(2),
            Action::Continuous([0.5, -0.8]),
        ] {
            let throttle = Throttle::from_action(&action);
            let mut tracker = RewardTracker::default();
            let reward = tracker.reward(&state(0.7, -0.4), &throttle);
            let expected = -0.30 * throttle.main - 0.03 * throttle.side;
            assert!((reward - expected).abs() < 1e-6);
            assert!(tracker.prev_shaping().is_some());
        }
    }

    #[test]
    fn reward_is_shaping_difference() {
        let mut tracker = RewardTracker::default();
        tracker.reward(&state(0.0, 0.5), &Throttle::default());
        let reward = tracker.reward(&state(0.0, 0.2), &Throttle::default());
        assert!((reward - 30.0).abs() < 1e-4);

        tracker.reset();
        assert!(tracker.prev_shaping().is_none());
    }

    #[test]
    fn terminal_outcomes() {
        assert_eq!(Outcome::judge(false, &state(0.2, 0.1), true), Outcome::Flying);
        assert_eq!(Outcome::judge(true, &state(0.2, 0.1), true), Outcome::Crashed);
        assert_eq!(Outcome::judge(false, &state(1.0, 0.1), true), Outcome::Crashed);
        assert_eq!(Outcome::judge(false, &state(-1.3, 0.1), true), Outcome::Crashed);
        assert_eq!(Outcome::judge(false, &state(0.0, 0.0), false), Outcome::Landed);
        assert_eq!(Outcome::judge(true, &state(0.0, 0.0), false), Outcome::Landed);

        assert_eq!(Outcome::Crashed.terminal_reward(), Some(-100.0));
        assert_eq!(Outcome::Landed.terminal_reward(), Some(100.0));
        assert_eq!(Outcome::Flying.terminal_reward(), None);
        assert!(!Outcome::Flying.is_terminal());
    }
}
