use super::physics::{
    Body, BodyTag, FixtureSpec, GROUND_CATEGORY, Joint, LANDER_CATEGORY, LEG_CATEGORY,
    PhysicsWorld, RevoluteSpec,
};
use super::{
    EnvRng, H, INITIAL_RANDOM, LANDER_POLY, LEG_AWAY, LEG_DOWN, LEG_H, LEG_SPRING_TORQUE, LEG_W,
    SCALE, W,
};

/// A leg body and the spring joint holding it to the lander.
pub struct Leg {
    pub body: Body,
    pub joint: Joint,
}

/// The bodies making up the controllable vehicle.
pub struct Vehicle {
    pub lander: Body,
    pub legs: [Leg; 2],
}

impl Vehicle {
    /// All bodies of the vehicle, lander first.
    pub fn bodies(&self) -> Vec<Body> {
        let mut bodies = vec![self.lander.clone()];
        bodies.extend(self.legs.iter().map(|leg| leg.body.clone()));
        bodies
    }

    pub fn destroy(self, world: &mut PhysicsWorld) {
        for leg in self.legs {
            world.destroy_joint(leg.joint);
            world.destroy_body(leg.body);
        }
        world.destroy_body(self.lander);
    }
}

/// Strategy building the vehicle into a freshly generated world.
pub trait VehicleAssembler {
    fn assemble(&self, world: &mut PhysicsWorld, rng: &mut EnvRng) -> Vehicle;
}

/// The standard lander: a six-sided hull with two spring-loaded legs,
/// spawned at the top centre of the viewport with a random nudge.
#[derive(Debug, Clone, Copy)]
pub struct LeggedLander {
    pub spawn: (f32, f32),
    /// Bound on each component of the initial random force.
    pub initial_random: f32,
    pub leg_spring_torque: f32,
}

impl Default for LeggedLander {
    fn default() -> Self {
        Self {
            spawn: (W / 2.0, H),
            initial_random: INITIAL_RANDOM,
            leg_spring_torque: LEG_SPRING_TORQUE,
        }
    }
}

impl LeggedLander {
    /// Joint limits for the leg on side `i` (-1 left, +1 right). Each spans
    /// 0.5 rad; the left one sits on the positive side, the right one on the
    /// negative side.
    pub fn leg_limits(i: f32) -> (f32, f32) {
        if i < 0.0 {
            (0.9 - 0.5, 0.9)
        } else {
            (-0.9, -0.9 + 0.5)
        }
    }
}

impl VehicleAssembler for LeggedLander {
    fn assemble(&self, world: &mut PhysicsWorld, rng: &mut EnvRng) -> Vehicle {
        let (initial_x, initial_y) = self.spawn;

        let hull: Vec<(f32, f32)> = LANDER_POLY
            .iter()
            .map(|(x, y)| (x / SCALE, y / SCALE))
            .collect();
        let lander = world.create_dynamic_polygon(
            BodyTag::Lander,
            (initial_x, initial_y),
            0.0,
            &hull,
            FixtureSpec {
                density: 5.0,
                friction: 0.1,
                restitution: 0.0,
                category_bits: LANDER_CATEGORY,
                mask_bits: GROUND_CATEGORY,
            },
        );

        if self.initial_random > 0.0 {
            let force = (
                rng.random_range(-self.initial_random..self.initial_random),
                rng.random_range(-self.initial_random..self.initial_random),
            );
            world.apply_force_to_center(&lander, force);
        }

        let legs = [0usize, 1].map(|leg_index| {
            let i = if leg_index == 0 { -1.0f32 } else { 1.0 };
            let body = world.create_dynamic_box(
                BodyTag::Leg(leg_index),
                (initial_x - i * LEG_AWAY / SCALE, initial_y),
                i * 0.05,
                (LEG_W / SCALE, LEG_H / SCALE),
                FixtureSpec {
                    density: 1.0,
                    friction: 0.2,
                    restitution: 0.0,
                    category_bits: LEG_CATEGORY,
                    mask_bits: GROUND_CATEGORY,
                },
            );

            let (lower_angle, upper_angle) = Self::leg_limits(i);
            let joint = world.create_revolute_joint(
                &lander,
                &body,
                RevoluteSpec {
                    local_anchor_a: (0.0, 0.0),
                    local_anchor_b: (i * LEG_AWAY / SCALE, LEG_DOWN / SCALE),
                    max_motor_torque: self.leg_spring_torque,
                    motor_speed: 0.3 * i, // low enough not to jump back into the sky
                    lower_angle,
                    upper_angle,
                },
            );
            Leg { body, joint }
        });

        Vehicle { lander, legs }
    }
}
