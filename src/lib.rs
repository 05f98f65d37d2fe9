//! Box2D landing environments for reinforcement learning.
//!
//! [`UavLander`] drops a legged lander above procedurally generated terrain
//! and asks the agent to put it down on a raised, possibly tilted platform.

pub mod box_2d;
pub mod error;
pub(crate) mod testing;

pub use box_2d::uav_lander::{EpisodePhase, Info, ResetOptions, UavLander};
pub use error::LanderError;
