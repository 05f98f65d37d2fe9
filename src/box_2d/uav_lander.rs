use bon::bon;
use candle_core::{DType, Device, Tensor};
use modurl::{
    gym::{Gym, ResetInfo, StepInfo},
    spaces::{BoxSpace, Discrete, Space},
};
use serde::{Deserialize, Serialize};

use crate::error::LanderError;

use super::contact::ContactState;
use super::physics::{Body, PhysicsWorld};
use super::reward::{Action, OBSERVATION_SIZE, Outcome, RewardTracker, Throttle, observe};
use super::terrain::{PlatformTerrain, Terrain, TerrainGenerator, TerrainParams};
use super::vehicle::{LeggedLander, Vehicle, VehicleAssembler};
use super::{
    EnvRng, FPS, MAIN_ENGINE_POWER, MAIN_ENGINE_Y_LOCATION, SCALE, SIDE_ENGINE_AWAY,
    SIDE_ENGINE_HEIGHT, SIDE_ENGINE_POWER,
};

/// Extra data returned with every reset and step. Always empty for now.
pub type Info = serde_json::Map<String, serde_json::Value>;

/// Per-reset overrides of the terrain settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetOptions {
    pub terrain_nodes: Option<usize>,
    pub flat_platform: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpisodePhase {
    Uninitialized,
    Running,
    Terminated,
}

/// Non-periodic gust profile in `[-1, 1]`: tanh(sin(2kx) + sin(pi kx)), k = 0.01.
fn gust(idx: i32) -> f32 {
    ((0.02 * idx as f32).sin() + (std::f32::consts::PI * 0.01 * idx as f32).sin()).tanh()
}

/// Lander that has to touch down on an elevated, possibly tilted boat platform.
///
/// ## Action Space
/// Discrete(4) by default:
/// - 0: do nothing
/// - 1: fire left orientation engine
/// - 2: fire main engine
/// - 3: fire right orientation engine
///
/// With `continuous(true)` the action is a 2-vector in `[-1, 1]`: main engine
/// throttle (fires above 0) and lateral throttle (fires beyond ±0.5).
///
/// ## Observation
/// Position relative to the platform, velocity, angle and angular velocity
/// (all normalized), then one ground-contact flag per leg.
pub struct UavLander {
    // Environment parameters
    gravity: f32,
    continuous: bool,
    enable_wind: bool,
    wind_power: f32,
    turbulence_power: f32,
    terrain_params: TerrainParams,

    terrain_generator: Box<dyn TerrainGenerator>,
    vehicle_assembler: Box<dyn VehicleAssembler>,

    // Box2D world and bodies
    world: Option<PhysicsWorld>,
    ground: Option<Body>,
    vehicle: Option<Vehicle>,
    terrain: Option<Terrain>,
    drawlist: Vec<Body>,

    // Episode state
    contacts: ContactState,
    rewards: RewardTracker,
    phase: EpisodePhase,
    warned_after_termination: bool,

    // Wind state
    wind_idx: i32,
    torque_idx: i32,

    rng: EnvRng,
    device: Device,
}

#[bon]
impl UavLander {
    #[builder]
    pub fn new(
        #[builder(default = -10.0)] gravity: f32,
        #[builder(default = false)] continuous: bool,
        #[builder(default = false)] enable_wind: bool,
        #[builder(default = 15.0)] wind_power: f32,
        #[builder(default = 1.5)] turbulence_power: f32,
        #[builder(default = 90)] terrain_nodes: usize,
        #[builder(default = false)] flat_platform: bool,
        #[builder(default = Box::new(PlatformTerrain))] terrain: Box<dyn TerrainGenerator>,
        #[builder(default = Box::new(LeggedLander::default()))] vehicle: Box<dyn VehicleAssembler>,
        #[builder(default = Device::Cpu)] device: Device,
        seed: Option<u64>,
    ) -> Result<Self, LanderError> {
        if !(-12.0 < gravity && gravity < 0.0) {
            return Err(LanderError::InvalidConfig(format!(
                "gravity (current value: {}) must be between -12 and 0",
                gravity
            )));
        }

        #[cfg(feature = "logging")]
        if !(0.0..=20.0).contains(&wind_power) {
            log::warn!(
                "wind_power value is recommended to be between 0.0 and 20.0, (current value: {})",
                wind_power
            );
        }

        #[cfg(feature = "logging")]
        if !(0.0..=2.0).contains(&turbulence_power) {
            log::warn!(
                "turbulence_power value is recommended to be between 0.0 and 2.0, (current value: {})",
                turbulence_power
            );
        }

        let rng = match seed {
            Some(s) => EnvRng::from_seed(s),
            None => EnvRng::default(),
        };

        Ok(Self {
            gravity,
            continuous,
            enable_wind,
            wind_power,
            turbulence_power,
            terrain_params: TerrainParams {
                nodes: terrain_nodes,
                flat_platform,
            },
            terrain_generator: terrain,
            vehicle_assembler: vehicle,
            world: None,
            ground: None,
            vehicle: None,
            terrain: None,
            drawlist: Vec::new(),
            contacts: ContactState::default(),
            rewards: RewardTracker::default(),
            phase: EpisodePhase::Uninitialized,
            warned_after_termination: false,
            wind_idx: 0,
            torque_idx: 0,
            rng,
            device,
        })
    }
}

impl UavLander {
    /// Starts a new episode. A seed reseeds the environment's generator;
    /// without one the generator carries on from the previous episode.
    pub fn reset_with(
        &mut self,
        seed: Option<u64>,
        options: Option<ResetOptions>,
    ) -> Result<(Tensor, Info), LanderError> {
        if let Some(seed) = seed {
            self.rng = EnvRng::from_seed(seed);
        }
        self.destroy();

        let options = options.unwrap_or_default();
        let params = TerrainParams {
            nodes: options.terrain_nodes.unwrap_or(self.terrain_params.nodes),
            flat_platform: options
                .flat_platform
                .unwrap_or(self.terrain_params.flat_platform),
        };

        let mut world = PhysicsWorld::new(self.gravity);
        self.contacts = ContactState::default();
        self.rewards.reset();
        self.warned_after_termination = false;

        let terrain = self.terrain_generator.generate(&params, &mut self.rng)?;
        let ground = terrain.build_ground(&mut world);
        let vehicle = self.vehicle_assembler.assemble(&mut world, &mut self.rng);

        if self.enable_wind {
            self.wind_idx = self.rng.random_range(-9999..9999);
            self.torque_idx = self.rng.random_range(-9999..9999);
        }

        #[cfg(feature = "logging")]
        log::debug!(
            "reset: seed={:?} nodes={} platform_y={:.3} tilt={:.3}",
            seed,
            params.nodes,
            terrain.platform().y,
            terrain.platform().angle
        );

        self.drawlist = vehicle.bodies();
        self.world = Some(world);
        self.ground = Some(ground);
        self.vehicle = Some(vehicle);
        self.terrain = Some(terrain);
        self.phase = EpisodePhase::Running;

        let noop = if self.continuous {
            Action::NOOP_CONTINUOUS
        } else {
            Action::NOOP_DISCRETE
        };
        let step_info = self.step_action(noop)?;
        Ok((step_info.state, Info::new()))
    }

    /// Advances the episode with an already decoded action. The action kind
    /// has to match the mode the environment was built in.
    pub fn step_action(&mut self, action: Action) -> Result<StepInfo<Info>, LanderError> {
        match action {
            Action::Continuous(_) if !self.continuous => {
                return Err(LanderError::ActionMode {
                    expected: "discrete",
                    given: "continuous",
                });
            }
            Action::Discrete(_) if self.continuous => {
                return Err(LanderError::ActionMode {
                    expected: "continuous",
                    given: "discrete",
                });
            }
            Action::Discrete(a) => assert!(a < 4, "{} is not a valid discrete action", a),
            Action::Continuous(_) => {}
        }

        let (Some(world), Some(vehicle), Some(terrain)) =
            (self.world.as_mut(), self.vehicle.as_ref(), self.terrain.as_ref())
        else {
            return Err(LanderError::NotReset);
        };
        let lander = &vehicle.lander;

        if self.phase == EpisodePhase::Terminated && !self.warned_after_termination {
            #[cfg(feature = "logging")]
            log::warn!(
                "You are calling 'step()' even though this environment has already returned terminated = True. You should always call 'reset()' once you receive 'terminated = True'"
            );
            self.warned_after_termination = true;
        }

        // Wind only blows while airborne
        if self.enable_wind && !self.contacts.any_leg_contact() {
            let wind_mag = gust(self.wind_idx) * self.wind_power;
            self.wind_idx += 1;
            world.apply_force_to_center(lander, (wind_mag, 0.0));

            let torque_mag = gust(self.torque_idx) * self.turbulence_power;
            self.torque_idx += 1;
            world.apply_torque(lander, torque_mag);
        }

        let throttle = Throttle::from_action(&action);
        let before = world.body_state(lander);
        let tip = (before.angle.sin(), before.angle.cos());
        let side = (-tip.1, tip.0);
        let dispersion = [
            self.rng.random_range(-1.0f32..1.0) / SCALE,
            self.rng.random_range(-1.0f32..1.0) / SCALE,
        ];
        let (x, y) = before.position;

        if throttle.main > 0.0 {
            // 4 is move a bit downwards, +-2 for randomness
            let ox = tip.0 * (MAIN_ENGINE_Y_LOCATION / SCALE + 2.0 * dispersion[0])
                + side.0 * dispersion[1];
            let oy = -tip.1 * (MAIN_ENGINE_Y_LOCATION / SCALE + 2.0 * dispersion[0])
                - side.1 * dispersion[1];
            let power = MAIN_ENGINE_POWER * throttle.main;
            world.apply_linear_impulse(lander, (-ox * power, -oy * power), (x + ox, y + oy));
        }

        if throttle.side > 0.0 {
            let lateral = 3.0 * dispersion[1] + throttle.direction * SIDE_ENGINE_AWAY / SCALE;
            let ox = tip.0 * dispersion[0] + side.0 * lateral;
            let oy = -tip.1 * dispersion[0] - side.1 * lateral;
            let impulse_pos = (
                x + ox - tip.0 * 17.0 / SCALE,
                y + oy + tip.1 * SIDE_ENGINE_HEIGHT / SCALE,
            );
            let power = SIDE_ENGINE_POWER * throttle.side;
            world.apply_linear_impulse(lander, (-ox * power, -oy * power), impulse_pos);
        }

        world.step(1.0 / FPS, 6 * 30, 2 * 30);

        for event in world.drain_contacts() {
            self.contacts.apply(&event);
        }

        let after = world.body_state(lander);
        let state = observe(
            &after,
            terrain.platform().y,
            self.contacts.legs_ground_contact,
        );

        let mut reward = self.rewards.reward(&state, &throttle);
        let outcome = Outcome::judge(self.contacts.game_over, &state, after.awake);
        if let Some(terminal) = outcome.terminal_reward() {
            reward = terminal;
            if self.phase == EpisodePhase::Running {
                #[cfg(feature = "logging")]
                log::debug!("episode finished: {:?}", outcome);
                self.phase = EpisodePhase::Terminated;
            }
        }

        Ok(StepInfo {
            state: Tensor::from_vec(state.to_vec(), vec![OBSERVATION_SIZE], &self.device)?,
            reward,
            done: outcome.is_terminal(),
            truncated: false,
            info: Info::new(),
        })
    }

    fn decode_action(&self, action: &Tensor) -> Result<Action, LanderError> {
        if self.continuous {
            if action.dims() != [2] {
                return Err(LanderError::ActionShape {
                    expected: vec![2],
                    actual: action.dims().to_vec(),
                });
            }
            let values = action.to_dtype(DType::F32)?.to_vec1::<f32>()?;
            Ok(Action::Continuous([values[0], values[1]]))
        } else {
            assert!(Discrete::new(4).contains(action), "{:?} invalid", action);
            Ok(Action::Discrete(action.to_dtype(DType::U32)?.to_vec0::<u32>()?))
        }
    }

    fn destroy(&mut self) {
        if let Some(mut world) = self.world.take() {
            if let Some(vehicle) = self.vehicle.take() {
                vehicle.destroy(&mut world);
            }
            if let Some(ground) = self.ground.take() {
                world.destroy_body(ground);
            }
        }
        self.drawlist.clear();
        self.terrain = None;
        self.phase = EpisodePhase::Uninitialized;
    }

    pub fn phase(&self) -> EpisodePhase {
        self.phase
    }

    pub fn terrain(&self) -> Option<&Terrain> {
        self.terrain.as_ref()
    }

    pub fn contacts(&self) -> &ContactState {
        &self.contacts
    }

    pub fn is_continuous(&self) -> bool {
        self.continuous
    }

    /// Bodies a renderer should draw, lander first.
    pub fn drawlist(&self) -> &[Body] {
        &self.drawlist
    }
}

impl Gym<Info> for UavLander {
    type Error = LanderError;
    type SpaceError = candle_core::Error;

    fn reset(&mut self) -> Result<ResetInfo<Info>, Self::Error> {
        let (state, info) = self.reset_with(None, None)?;
        Ok(ResetInfo { state, info })
    }

    fn step(&mut self, action: Tensor) -> Result<StepInfo<Info>, Self::Error> {
        if self.world.is_none() {
            return Err(LanderError::NotReset);
        }
        let action = self.decode_action(&action)?;
        self.step_action(action)
    }

    fn observation_space(&self) -> Box<dyn Space<Error = Self::SpaceError>> {
        let low = vec![
            -2.5,
            -2.5,
            -10.0,
            -10.0,
            -2.0 * std::f32::consts::PI,
            -10.0,
            0.0,
            0.0,
        ];
        let high = vec![
            2.5,
            2.5,
            10.0,
            10.0,
            2.0 * std::f32::consts::PI,
            10.0,
            1.0,
            1.0,
        ];
        let low_tensor = Tensor::from_vec(low, vec![OBSERVATION_SIZE], &self.device)
            .expect("Failed to create low tensor");
        let high_tensor = Tensor::from_vec(high, vec![OBSERVATION_SIZE], &self.device)
            .expect("Failed to create high tensor");
        Box::new(BoxSpace::new(low_tensor, high_tensor))
    }

    fn action_space(&self) -> Box<dyn Space<Error = Self::SpaceError>> {
        if self.continuous {
            let low = Tensor::from_vec(vec![-1.0f32, -1.0], vec![2], &self.device)
                .expect("Failed to create low tensor");
            let high = Tensor::from_vec(vec![1.0f32, 1.0], vec![2], &self.device)
                .expect("Failed to create high tensor");
            Box::new(BoxSpace::new(low, high))
        } else {
            Box::new(Discrete::new(4))
        }
    }
}
