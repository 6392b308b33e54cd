use anyhow::Result;
use candle_core::Device;
use r2l_core::env::{Env, dummy_vec_env::DummyVecEnv};

pub trait EnvBuilderTrait {
    type Env: Env;

    fn build_env(&self, device: &Device) -> Result<Self::Env>;

    fn build_vec_env(&self, n_envs: usize, device: &Device) -> Result<DummyVecEnv<Self::Env>> {
        anyhow::ensure!(n_envs > 0, "a vector env needs at least one slot");
        let envs = (0..n_envs)
            .map(|_| self.build_env(device))
            .collect::<Result<Vec<_>>>()?;
        Ok(DummyVecEnv::new(envs))
    }
}

impl<E: Env, F> EnvBuilderTrait for F
where
    F: Fn(&Device) -> Result<E>,
{
    type Env = E;

    fn build_env(&self, device: &Device) -> Result<Self::Env> {
        (self)(device)
    }
}
