#![cfg(test)]

use candle_core::{Device, Tensor};
use modurl::gym::{Gym, StepInfo};

pub(crate) fn discrete_action(action: u32) -> Tensor {
    Tensor::new(action, &Device::Cpu).expect("Failed to create action tensor")
}

pub(crate) fn continuous_action(main: f32, lateral: f32) -> Tensor {
    Tensor::new(&[main, lateral], &Device::Cpu).expect("Failed to create action tensor")
}

pub(crate) fn observation(state: &Tensor) -> Vec<f32> {
    state
        .to_vec1::<f32>()
        .expect("Failed to convert state to vector")
}

/// Hand-tuned discrete pilot: tilt towards the target, then hover down onto it.
pub(crate) fn heuristic(obs: &[f32]) -> u32 {
    let angle_target = (obs[0] * 0.5 + obs[2]).clamp(-0.4, 0.4);
    let hover_target = 0.55 * obs[0].abs();

    let mut angle_todo = (angle_target - obs[4]) * 0.5 - obs[5];
    let mut hover_todo = (hover_target - obs[1]) * 0.5 - obs[3] * 0.5;
    if obs[6] == 1.0 || obs[7] == 1.0 {
        // legs down, only damp the fall
        angle_todo = 0.0;
        hover_todo = -obs[3] * 0.5;
    }

    if hover_todo > angle_todo.abs() && hover_todo > 0.05 {
        2
    } else if angle_todo < -0.05 {
        3
    } else if angle_todo > 0.05 {
        1
    } else {
        0
    }
}

/// Steps `env` with `policy` until the episode ends or `max_steps` is hit,
/// returning the last step.
pub(crate) fn run_until_done<G, I, E>(
    env: &mut G,
    mut policy: impl FnMut(usize) -> Tensor,
    max_steps: usize,
) -> StepInfo<I>
where
    G: Gym<I, Error = E>,
    E: std::fmt::Debug,
{
    assert!(max_steps > 0, "need at least one step");
    let mut last = None;
    for i in 0..max_steps {
        let step_info = env.step(policy(i)).expect("Failed to step environment");
        let done = step_info.done;
        for (j, v) in observation(&step_info.state).iter().enumerate() {
            assert!(v.is_finite(), "observation {} at step {} is {}", j, i, v);
        }
        last = Some(step_info);
        if done {
            break;
        }
    }
    last.expect("at least one step was taken")
}
