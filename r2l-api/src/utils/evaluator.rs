use anyhow::{Result, anyhow};
use r2l_core::{
    env::{VecEnv, normalizer::ObsNormalizer},
    evaluation::{EvaluationConfig, EvaluationReport, evaluate_policy, mean_std},
    policies::Policy,
};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Periodic evaluation during training. Every call's episode returns are appended to a shared
/// history so a UI thread can read it while training continues.
pub struct Evaluator<E: VecEnv, N: ObsNormalizer> {
    pub env: E,
    pub normalizer: N,
    pub config: EvaluationConfig,
    pub eval_freq: usize,
    pub eval_step: usize,
    pub evaluations_results: Arc<Mutex<Vec<Vec<f32>>>>,
}

impl<E: VecEnv, N: ObsNormalizer> Evaluator<E, N> {
    pub fn new(
        env: E,
        normalizer: N,
        config: EvaluationConfig,
        eval_freq: usize,
        evaluations_results: Arc<Mutex<Vec<Vec<f32>>>>,
    ) -> Self {
        Self {
            env,
            normalizer,
            config,
            eval_freq,
            eval_step: 0,
            evaluations_results,
        }
    }

    pub fn eval_res(&self) -> Arc<Mutex<Vec<Vec<f32>>>> {
        self.evaluations_results.clone()
    }

    /// Counts `n_steps` training steps towards the next evaluation and runs it in the call
    /// that brings the total to `eval_freq`.
    pub fn evaluate(
        &mut self,
        policy: &dyn Policy,
        n_steps: usize,
    ) -> Result<Option<EvaluationReport>> {
        self.eval_step += n_steps;
        if self.eval_step < self.eval_freq {
            debug!(eval_step = self.eval_step, eval_freq = self.eval_freq, "evaluation not due");
            Ok(None)
        } else {
            let report = self.evaluate_now(policy)?;
            self.eval_step = 0;
            Ok(Some(report))
        }
    }

    pub fn evaluate_now(&mut self, policy: &dyn Policy) -> Result<EvaluationReport> {
        let report = evaluate_policy(policy, &mut self.env, &self.normalizer, &self.config)?;
        self.evaluations_results
            .lock()
            .map_err(|_| anyhow!("evaluation results lock poisoned"))?
            .push(report.episode_returns.clone());
        info!(
            mean_reward = report.mean,
            std_reward = report.std,
            steps = report.steps,
            "periodic evaluation"
        );
        Ok(report)
    }

    /// Mean and standard deviation of each evaluation so far, oldest first.
    pub fn summaries(&self) -> Result<Vec<(f32, f32)>> {
        let results = self
            .evaluations_results
            .lock()
            .map_err(|_| anyhow!("evaluation results lock poisoned"))?;
        Ok(results.iter().map(|returns| mean_std(returns)).collect())
    }
}
