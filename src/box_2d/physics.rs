//! Thin adapter over the `box2d-rs` world.
//!
//! Bodies carry a [`BodyTag`] as user data so contact events can be routed
//! without holding on to body pointers.

use box2d_rs::b2_body::*;
use box2d_rs::b2_fixture::*;
use box2d_rs::b2_joint::*;
use box2d_rs::b2_math::*;
use box2d_rs::b2_world::*;
use box2d_rs::b2rs_common::UserDataType;
use box2d_rs::joints::b2_revolute_joint::*;
use box2d_rs::shapes::b2_edge_shape::*;
use box2d_rs::shapes::b2_polygon_shape::*;

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use super::contact::{ContactDetector, ContactEvent};

/// Identifies which part of the scene a body belongs to.
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq)]
pub enum BodyTag {
    #[default]
    Ground,
    Lander,
    Leg(usize),
}

#[derive(Default, Copy, Clone, Debug, PartialEq)]
pub struct UserDataTypes;
impl UserDataType for UserDataTypes {
    type Fixture = i32;
    type Body = BodyTag;
    type Joint = i32;
}

pub type Body = BodyPtr<UserDataTypes>;
pub type Joint = B2jointPtr<UserDataTypes>;

/// Collision category of the terrain. Lander and legs only collide with it.
pub const GROUND_CATEGORY: u16 = 0x0001;
pub const LANDER_CATEGORY: u16 = 0x0010;
pub const LEG_CATEGORY: u16 = 0x0020;

/// Material and collision filter for a dynamic body's single fixture.
#[derive(Debug, Clone, Copy)]
pub struct FixtureSpec {
    pub density: f32,
    pub friction: f32,
    pub restitution: f32,
    pub category_bits: u16,
    pub mask_bits: u16,
}

/// Revolute joint parameters, anchors given in each body's local frame.
#[derive(Debug, Clone, Copy)]
pub struct RevoluteSpec {
    pub local_anchor_a: (f32, f32),
    pub local_anchor_b: (f32, f32),
    pub max_motor_torque: f32,
    pub motor_speed: f32,
    pub lower_angle: f32,
    pub upper_angle: f32,
}

/// Kinematic snapshot of a body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyState {
    pub position: (f32, f32),
    pub velocity: (f32, f32),
    pub angle: f32,
    pub angular_velocity: f32,
    pub awake: bool,
}

/// Owns a Box2D world and the queue its contact listener feeds.
pub struct PhysicsWorld {
    world: B2worldPtr<UserDataTypes>,
    contacts: Rc<RefCell<ContactDetector>>,
}

impl PhysicsWorld {
    pub fn new(gravity: f32) -> Self {
        let world = B2world::<UserDataTypes>::new(B2vec2::new(0.0, gravity));
        let contacts = Rc::new(RefCell::new(ContactDetector::new()));
        world.borrow_mut().set_contact_listener(contacts.clone());
        Self { world, contacts }
    }

    /// Static body made of two-sided edges.
    pub fn create_static_edges(
        &mut self,
        tag: BodyTag,
        segments: &[((f32, f32), (f32, f32))],
        friction: f32,
    ) -> Body {
        let mut body_def = B2bodyDef::default();
        body_def.body_type = B2bodyType::B2StaticBody;
        body_def.position.set(0.0, 0.0);
        body_def.user_data = Some(tag);
        let body = B2world::create_body(self.world.clone(), &body_def);

        for &(p1, p2) in segments {
            let mut edge = B2edgeShape::default();
            edge.set_two_sided(B2vec2::new(p1.0, p1.1), B2vec2::new(p2.0, p2.1));

            let mut fixture_def = B2fixtureDef::default();
            fixture_def.shape = Some(Rc::new(RefCell::new(edge)));
            fixture_def.density = 0.0;
            fixture_def.friction = friction;
            fixture_def.filter.category_bits = GROUND_CATEGORY;

            B2body::create_fixture(body.clone(), &fixture_def);
        }
        body
    }

    /// Dynamic body with a convex polygon fixture.
    pub fn create_dynamic_polygon(
        &mut self,
        tag: BodyTag,
        position: (f32, f32),
        angle: f32,
        vertices: &[(f32, f32)],
        fixture: FixtureSpec,
    ) -> Body {
        let mut shape = B2polygonShape::default();
        let vertices: Vec<B2vec2> = vertices.iter().map(|&(x, y)| B2vec2::new(x, y)).collect();
        shape.set(&vertices);
        self.create_dynamic(tag, position, angle, shape, fixture)
    }

    /// Dynamic body with a box fixture of the given half extents.
    pub fn create_dynamic_box(
        &mut self,
        tag: BodyTag,
        position: (f32, f32),
        angle: f32,
        half_extents: (f32, f32),
        fixture: FixtureSpec,
    ) -> Body {
        let mut shape = B2polygonShape::default();
        shape.set_as_box(half_extents.0, half_extents.1);
        self.create_dynamic(tag, position, angle, shape, fixture)
    }

    fn create_dynamic(
        &mut self,
        tag: BodyTag,
        position: (f32, f32),
        angle: f32,
        shape: B2polygonShape,
        fixture: FixtureSpec,
    ) -> Body {
        let mut body_def = B2bodyDef::default();
        body_def.body_type = B2bodyType::B2DynamicBody;
        body_def.position.set(position.0, position.1);
        body_def.angle = angle;
        body_def.user_data = Some(tag);
        let body = B2world::create_body(self.world.clone(), &body_def);

        let mut fixture_def = B2fixtureDef::default();
        fixture_def.shape = Some(Rc::new(RefCell::new(shape)));
        fixture_def.density = fixture.density;
        fixture_def.friction = fixture.friction;
        fixture_def.restitution = fixture.restitution;
        fixture_def.filter.category_bits = fixture.category_bits;
        fixture_def.filter.mask_bits = fixture.mask_bits;

        B2body::create_fixture(body.clone(), &fixture_def);
        body
    }

    /// Revolute joint with both motor and limit enabled.
    pub fn create_revolute_joint(
        &mut self,
        body_a: &Body,
        body_b: &Body,
        spec: RevoluteSpec,
    ) -> Joint {
        let mut joint_def = B2revoluteJointDef::default();
        joint_def.base.body_a = Some(body_a.clone());
        joint_def.base.body_b = Some(body_b.clone());
        joint_def.local_anchor_a = B2vec2::new(spec.local_anchor_a.0, spec.local_anchor_a.1);
        joint_def.local_anchor_b = B2vec2::new(spec.local_anchor_b.0, spec.local_anchor_b.1);
        joint_def.enable_motor = true;
        joint_def.enable_limit = true;
        joint_def.max_motor_torque = spec.max_motor_torque;
        joint_def.motor_speed = spec.motor_speed;
        joint_def.lower_angle = spec.lower_angle;
        joint_def.upper_angle = spec.upper_angle;

        let joint_def_enum = B2JointDefEnum::RevoluteJoint(joint_def);
        self.world.borrow_mut().create_joint(&joint_def_enum)
    }

    pub fn apply_force_to_center(&mut self, body: &Body, force: (f32, f32)) {
        body.borrow_mut()
            .apply_force_to_center(B2vec2::new(force.0, force.1), true);
    }

    pub fn apply_linear_impulse(&mut self, body: &Body, impulse: (f32, f32), point: (f32, f32)) {
        body.borrow_mut().apply_linear_impulse(
            B2vec2::new(impulse.0, impulse.1),
            B2vec2::new(point.0, point.1),
            true,
        );
    }

    pub fn apply_torque(&mut self, body: &Body, torque: f32) {
        body.borrow_mut().apply_torque(torque, true);
    }

    /// Advances the simulation by `dt` seconds.
    pub fn step(&mut self, dt: f32, velocity_iterations: i32, position_iterations: i32) {
        self.world
            .borrow_mut()
            .step(dt, velocity_iterations, position_iterations);
    }

    /// Contact events recorded since the last drain, oldest first.
    pub fn drain_contacts(&mut self) -> VecDeque<ContactEvent> {
        self.contacts.borrow_mut().drain()
    }

    pub fn body_state(&self, body: &Body) -> BodyState {
        let body = body.borrow();
        let position = body.get_position();
        let velocity = body.get_linear_velocity();
        BodyState {
            position: (position.x, position.y),
            velocity: (velocity.x, velocity.y),
            angle: body.get_angle(),
            angular_velocity: body.get_angular_velocity(),
            awake: body.is_awake(),
        }
    }

    pub fn destroy_joint(&mut self, joint: Joint) {
        self.world.borrow_mut().destroy_joint(joint);
    }

    pub fn destroy_body(&mut self, body: Body) {
        self.world.borrow_mut().destroy_body(body);
    }
}
