use super::{Env, EnvironmentDescription, SnapShot, StepInfo, VecEnv, VecStep};
use crate::{
    error::{R2lError, Result},
    rng::with_rng,
};
use candle_core::Tensor;
use rand::Rng;
use tracing::{trace, warn};

/// Runs its environments one after the other in the calling thread, one action row per slot.
pub struct DummyVecEnv<E: Env> {
    pub envs: Vec<E>,
}

impl<E: Env> DummyVecEnv<E> {
    pub fn new(envs: Vec<E>) -> Self {
        Self { envs }
    }

    pub fn from_builder(n_envs: usize, builder: impl Fn(usize) -> Result<E>) -> Result<Self> {
        let envs = (0..n_envs).map(builder).collect::<Result<Vec<_>>>()?;
        Ok(Self { envs })
    }

    pub fn env_description(&self) -> Option<EnvironmentDescription> {
        self.envs.first().map(|env| env.env_description())
    }
}

fn random_seed() -> u64 {
    with_rng(|rng| rng.random::<u64>())
}

impl<E: Env> VecEnv for DummyVecEnv<E> {
    fn num_envs(&self) -> usize {
        self.envs.len()
    }

    fn reset(&mut self) -> Result<Tensor> {
        let states = self
            .envs
            .iter_mut()
            .map(|env| env.reset(random_seed()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Tensor::stack(&states, 0)?)
    }

    fn step(&mut self, actions: &Tensor) -> Result<VecStep> {
        let n_actions = actions.dim(0)?;
        if n_actions != self.envs.len() {
            return Err(R2lError::BatchSizeMismatch {
                expected: self.envs.len(),
                got: n_actions,
            });
        }
        let mut observations = Vec::with_capacity(n_actions);
        let mut rewards = Vec::with_capacity(n_actions);
        let mut dones = Vec::with_capacity(n_actions);
        let mut infos = Vec::with_capacity(n_actions);
        for (env_idx, env) in self.envs.iter_mut().enumerate() {
            let action = actions.get(env_idx)?;
            let snapshot = env.step(&action)?;
            let done = snapshot.done();
            let SnapShot {
                state,
                reward,
                terminated,
                trancuated,
            } = snapshot;
            let (state, terminal_observation) = if done {
                trace!(env_idx, "episode finished, resetting slot");
                (env.reset(random_seed())?, Some(state))
            } else {
                (state, None)
            };
            observations.push(state);
            rewards.push(reward);
            dones.push(done);
            infos.push(StepInfo {
                terminated,
                trancuated,
                terminal_observation,
            });
        }
        Ok(VecStep {
            observations: Tensor::stack(&observations, 0)?,
            rewards,
            dones,
            infos,
        })
    }

    fn render(&mut self) -> Result<()> {
        for (env_idx, env) in self.envs.iter_mut().enumerate() {
            if let Err(err) = env.render() {
                warn!(env_idx, %err, "render failed");
            }
        }
        Ok(())
    }
}
