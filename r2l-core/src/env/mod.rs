pub mod dummy_vec_env;
pub mod normalizer;

use crate::error::Result;
use candle_core::Tensor;

#[derive(Debug, Clone)]
pub enum Space {
    Discrete(usize),
    Continous {
        min: Option<Tensor>,
        max: Option<Tensor>,
        size: usize,
    },
    MultiBinary(usize),
}

impl Space {
    pub fn continous_from_dims(dims: Vec<usize>) -> Self {
        Self::Continous {
            min: None,
            max: None,
            size: dims.iter().product(),
        }
    }

    pub fn size(&self) -> usize {
        match &self {
            Self::Discrete(size) => *size,
            Self::Continous { size, .. } => *size,
            Self::MultiBinary(size) => *size,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EnvironmentDescription {
    pub observation_space: Space,
    pub action_space: Space,
}

impl EnvironmentDescription {
    pub fn new(observation_space: Space, action_space: Space) -> Self {
        Self {
            observation_space,
            action_space,
        }
    }

    pub fn action_size(&self) -> usize {
        self.action_space.size()
    }

    pub fn observation_size(&self) -> usize {
        self.observation_space.size()
    }
}

/// The outcome of stepping a single environment.
#[derive(Debug, Clone)]
pub struct SnapShot {
    pub state: Tensor,
    pub reward: f32,
    pub terminated: bool,
    pub trancuated: bool,
}

impl SnapShot {
    pub fn done(&self) -> bool {
        self.terminated || self.trancuated
    }
}

/// A single environment instance. Observations are flat rank 1 tensors.
pub trait Env {
    fn reset(&mut self, seed: u64) -> Result<Tensor>;
    fn step(&mut self, action: &Tensor) -> Result<SnapShot>;
    fn env_description(&self) -> EnvironmentDescription;

    /// Best effort, callers ignore failures.
    fn render(&mut self) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct StepInfo {
    pub terminated: bool,
    pub trancuated: bool,
    /// Last observation of a finished episode, before the slot was reset.
    pub terminal_observation: Option<Tensor>,
}

/// One lockstep transition of every slot in a vector environment.
#[derive(Debug, Clone)]
pub struct VecStep {
    pub observations: Tensor,
    pub rewards: Vec<f32>,
    pub dones: Vec<bool>,
    pub infos: Vec<StepInfo>,
}

impl VecStep {
    /// Batch size reported by the step, checked component by component.
    pub fn batch_sizes(&self) -> Result<[usize; 4]> {
        Ok([
            self.observations.dim(0)?,
            self.rewards.len(),
            self.dones.len(),
            self.infos.len(),
        ])
    }
}

/// `num_envs` environment slots advanced together. Finished slots are reset by the
/// implementation, so every call to `step` returns a full batch.
pub trait VecEnv {
    fn num_envs(&self) -> usize;
    fn reset(&mut self) -> Result<Tensor>;
    fn step(&mut self, actions: &Tensor) -> Result<VecStep>;

    fn render(&mut self) -> Result<()> {
        Ok(())
    }
}
