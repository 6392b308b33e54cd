use crate::utils::evaluator::Evaluator;
use anyhow::Result;
use r2l_core::{
    env::{VecEnv, normalizer::ObsNormalizer},
    evaluation::EvaluationConfig,
};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub struct EvaluatorBuilder {
    pub n_episodes: usize,
    pub eval_freq: usize,
    pub deterministic: bool,
    pub render: bool,
}

impl Default for EvaluatorBuilder {
    fn default() -> Self {
        let config = EvaluationConfig::default();
        Self {
            n_episodes: config.n_episodes,
            eval_freq: 10_000,
            deterministic: config.deterministic,
            render: config.render,
        }
    }
}

impl EvaluatorBuilder {
    pub fn with_n_episodes(mut self, n_episodes: usize) -> Self {
        self.n_episodes = n_episodes;
        self
    }

    pub fn with_eval_freq(mut self, eval_freq: usize) -> Self {
        self.eval_freq = eval_freq;
        self
    }

    pub fn with_deterministic(mut self, deterministic: bool) -> Self {
        self.deterministic = deterministic;
        self
    }

    pub fn with_render(mut self, render: bool) -> Self {
        self.render = render;
        self
    }

    pub fn config(&self) -> Result<EvaluationConfig> {
        anyhow::ensure!(self.n_episodes > 0, "n_episodes must be positive");
        Ok(EvaluationConfig::default()
            .with_n_episodes(self.n_episodes)
            .with_deterministic(self.deterministic)
            .with_render(self.render))
    }

    pub fn build<E: VecEnv, N: ObsNormalizer>(
        &self,
        env: E,
        normalizer: N,
    ) -> Result<Evaluator<E, N>> {
        anyhow::ensure!(env.num_envs() > 0, "evaluation env has no slots");
        Ok(Evaluator::new(
            env,
            normalizer,
            self.config()?,
            self.eval_freq,
            Arc::new(Mutex::new(vec![])),
        ))
    }
}
