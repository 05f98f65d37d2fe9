use thiserror::Error;

/// Errors raised while configuring, resetting or stepping an environment.
#[derive(Debug, Error)]
pub enum LanderError {
    #[error(transparent)]
    Tensor(#[from] candle_core::Error),

    #[error("terrain with {nodes} nodes has no room for a platform (need at least {min})")]
    DegenerateTerrain { nodes: usize, min: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("step() called before reset()")]
    NotReset,

    #[error("continuous action must have shape {expected:?}, got {actual:?}")]
    ActionShape {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("{given} action passed to an environment expecting {expected} actions")]
    ActionMode {
        expected: &'static str,
        given: &'static str,
    },
}
