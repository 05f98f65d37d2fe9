pub mod contact;
pub mod physics;
pub mod reward;
pub mod terrain;
pub mod uav_lander;
pub mod vehicle;

use rand::distr::uniform::{SampleRange, SampleUniform};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub(crate) const FPS: f32 = 50.0;
pub(crate) const SCALE: f32 = 30.0; // affects how fast-paced the game is, forces should be adjusted as well

pub(crate) const MAIN_ENGINE_POWER: f32 = 13.0;
pub(crate) const SIDE_ENGINE_POWER: f32 = 0.6;

pub(crate) const INITIAL_RANDOM: f32 = 1000.0;

pub(crate) const LANDER_POLY: [(f32, f32); 6] = [
    (-14.0, 17.0),
    (-17.0, 0.0),
    (-17.0, -10.0),
    (17.0, -10.0),
    (17.0, 0.0),
    (14.0, 17.0),
];
pub(crate) const LEG_AWAY: f32 = 20.0;
pub(crate) const LEG_DOWN: f32 = 18.0;
pub(crate) const LEG_W: f32 = 2.0;
pub(crate) const LEG_H: f32 = 8.0;
pub(crate) const LEG_SPRING_TORQUE: f32 = 40.0;

pub(crate) const SIDE_ENGINE_HEIGHT: f32 = 14.0;
pub(crate) const SIDE_ENGINE_AWAY: f32 = 12.0;
pub(crate) const MAIN_ENGINE_Y_LOCATION: f32 = 4.0; // The Y location of the main engine on the body of the Lander.

pub(crate) const VIEWPORT_W: f32 = 600.0;
pub(crate) const VIEWPORT_H: f32 = 400.0;

/// Viewport width in world units.
pub(crate) const W: f32 = VIEWPORT_W / SCALE;
/// Viewport height in world units.
pub(crate) const H: f32 = VIEWPORT_H / SCALE;

/// Random source owned by a single environment instance.
///
/// Every random draw made while generating terrain, assembling the vehicle
/// and firing engines goes through this, so a fixed seed reproduces an
/// episode exactly.
#[derive(Debug, Clone)]
pub struct EnvRng(StdRng);

impl EnvRng {
    pub fn from_seed(seed: u64) -> Self {
        EnvRng(StdRng::seed_from_u64(seed))
    }

    pub fn from_os_rng() -> Self {
        EnvRng(StdRng::from_os_rng())
    }

    pub fn random_range<T, R>(&mut self, range: R) -> T
    where
        T: SampleUniform,
        R: SampleRange<T>,
    {
        self.0.random_range(range)
    }
}

impl Default for EnvRng {
    fn default() -> Self {
        EnvRng::from_os_rng()
    }
}
