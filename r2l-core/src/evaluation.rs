use crate::{
    env::{VecEnv, VecStep, normalizer::ObsNormalizer},
    error::{R2lError, Result},
    policies::{Policy, PolicyStep},
    tensors::{HiddenStates, Masks},
};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct EvaluationConfig {
    /// Completed episodes, across all slots combined, after which evaluation stops.
    pub n_episodes: usize,
    pub deterministic: bool,
    pub render: bool,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            n_episodes: 10,
            deterministic: true,
            render: false,
        }
    }
}

impl EvaluationConfig {
    pub fn with_n_episodes(mut self, n_episodes: usize) -> Self {
        self.n_episodes = n_episodes;
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
}

#[derive(Debug, Clone)]
pub struct EvaluationReport {
    /// Undiscounted returns in the order the episodes finished.
    pub episode_returns: Vec<f32>,
    pub mean: f32,
    pub std: f32,
    /// Number of lockstep vector env steps taken.
    pub steps: usize,
}

impl EvaluationReport {
    pub fn from_returns(episode_returns: Vec<f32>, steps: usize) -> Self {
        let (mean, std) = mean_std(&episode_returns);
        Self {
            episode_returns,
            mean,
            std,
            steps,
        }
    }
}

/// Population mean and standard deviation, NaN for an empty slice.
pub fn mean_std(values: &[f32]) -> (f32, f32) {
    if values.is_empty() {
        return (f32::NAN, f32::NAN);
    }
    let n = values.len() as f32;
    let mean = values.iter().sum::<f32>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n;
    (mean, var.sqrt())
}

fn check_batch(num_envs: usize, step: &VecStep) -> Result<()> {
    match step.batch_sizes()?.into_iter().find(|got| *got != num_envs) {
        Some(got) => Err(R2lError::BatchSizeMismatch {
            expected: num_envs,
            got,
        }),
        None => Ok(()),
    }
}

/// Rolls `policy` out on every slot of `env` in lockstep until `n_episodes` episodes have
/// finished. Finished slots keep running a fresh episode, their recurrent state is cleared
/// through the mask on the following step.
pub fn evaluate_policy<P, E, N>(
    policy: &P,
    env: &mut E,
    normalizer: &N,
    config: &EvaluationConfig,
) -> Result<EvaluationReport>
where
    P: Policy + ?Sized,
    E: VecEnv + ?Sized,
    N: ObsNormalizer + ?Sized,
{
    let num_envs = env.num_envs();
    let observations = env.reset()?;
    let got = observations.dim(0)?;
    if got != num_envs {
        return Err(R2lError::BatchSizeMismatch {
            expected: num_envs,
            got,
        });
    }
    let device = observations.device().clone();
    let mut observations = normalizer.normalize_obs(&observations)?;
    let mut recurrent_hidden_states =
        HiddenStates::zeros(num_envs, policy.recurrent_hidden_state_size(), &device)?;
    let mut masks = Masks::zeros(num_envs, &device)?;
    let mut running_returns = vec![0f32; num_envs];
    let mut episode_returns = Vec::with_capacity(config.n_episodes);
    let mut steps = 0;

    while episode_returns.len() < config.n_episodes {
        let PolicyStep {
            action,
            recurrent_hidden_states: next_hidden_states,
            ..
        } = policy.act(
            &observations,
            &recurrent_hidden_states,
            &masks,
            config.deterministic,
        )?;
        recurrent_hidden_states = next_hidden_states;
        let step = env.step(&action)?;
        check_batch(num_envs, &step)?;
        steps += 1;
        observations = normalizer.normalize_obs(&step.observations)?;

        for (slot, (reward, done)) in step.rewards.iter().zip(step.dones.iter()).enumerate() {
            running_returns[slot] += reward;
            if *done {
                episode_returns.push(running_returns[slot]);
                debug!(
                    slot,
                    episode_return = running_returns[slot],
                    completed = episode_returns.len(),
                    "evaluation episode finished"
                );
                running_returns[slot] = 0.;
            }
        }
        masks = Masks::from_dones(&step.dones, &device)?;

        if config.render {
            if let Err(err) = env.render() {
                warn!(%err, "render failed during evaluation");
            }
        }
    }

    let report = EvaluationReport::from_returns(episode_returns, steps);
    info!(
        episodes = report.episode_returns.len(),
        mean_reward = report.mean,
        "evaluation finished"
    );
    Ok(report)
}

#[cfg(test)]
mod test {
    use super::{EvaluationConfig, evaluate_policy, mean_std};
    use crate::{
        env::{StepInfo, VecEnv, VecStep, normalizer::IdentityNormalizer},
        error::{R2lError, Result},
        policies::{Policy, PolicyStep},
        tensors::{HiddenStates, Logp, Masks, ValuesPred},
    };
    use candle_core::{DType, Device, Tensor};
    use std::cell::RefCell;

    /// Slot `i` finishes an episode every `lengths[i]` steps with reward 1 per step.
    struct CountdownVecEnv {
        lengths: Vec<usize>,
        t: Vec<usize>,
        extra_rows: usize,
    }

    impl CountdownVecEnv {
        fn new(lengths: Vec<usize>) -> Self {
            let t = vec![0; lengths.len()];
            Self {
                lengths,
                t,
                extra_rows: 0,
            }
        }

        fn observations(&self, rows: usize) -> Result<Tensor> {
            let obs: Vec<f32> = (0..rows)
                .map(|i| self.t.get(i).copied().unwrap_or(0) as f32)
                .collect();
            Ok(Tensor::from_vec(obs, (rows, 1), &Device::Cpu)?)
        }
    }

    impl VecEnv for CountdownVecEnv {
        fn num_envs(&self) -> usize {
            self.lengths.len()
        }

        fn reset(&mut self) -> Result<Tensor> {
            self.t.iter_mut().for_each(|t| *t = 0);
            self.observations(self.lengths.len())
        }

        fn step(&mut self, _actions: &Tensor) -> Result<VecStep> {
            let mut dones = vec![];
            for (t, length) in self.t.iter_mut().zip(self.lengths.iter()) {
                *t += 1;
                let done = *t == *length;
                if done {
                    *t = 0;
                }
                dones.push(done);
            }
            let rows = self.lengths.len() + self.extra_rows;
            Ok(VecStep {
                observations: self.observations(rows)?,
                rewards: vec![1.; rows],
                dones: dones.clone(),
                infos: vec![StepInfo::default(); dones.len()],
            })
        }
    }

    /// Records the masks it is given and counts steps in its recurrent state.
    #[derive(Default)]
    struct RecordingPolicy {
        masks: RefCell<Vec<Vec<f32>>>,
        hidden: RefCell<Vec<Vec<f32>>>,
    }

    impl Policy for RecordingPolicy {
        fn recurrent_hidden_state_size(&self) -> usize {
            1
        }

        fn act(
            &self,
            observations: &Tensor,
            recurrent_hidden_states: &HiddenStates,
            masks: &Masks,
            _deterministic: bool,
        ) -> Result<PolicyStep> {
            let batch_size = observations.dim(0)?;
            self.masks.borrow_mut().push(masks.flatten_all()?.to_vec1()?);
            self.hidden
                .borrow_mut()
                .push(recurrent_hidden_states.flatten_all()?.to_vec1()?);
            let next = (recurrent_hidden_states.mul(masks)? + 1.)?;
            let zeros = Tensor::zeros((batch_size, 1), DType::F32, &Device::Cpu)?;
            Ok(PolicyStep {
                value: ValuesPred(zeros.clone()),
                action: zeros.clone(),
                action_log_probs: Logp(zeros),
                recurrent_hidden_states: HiddenStates(next),
            })
        }
    }

    #[test]
    fn every_episode_returns_its_length() -> Result<()> {
        let k = 4;
        let mut env = CountdownVecEnv::new(vec![k; 3]);
        let policy = RecordingPolicy::default();
        let config = EvaluationConfig::default();
        let report = evaluate_policy(&policy, &mut env, &IdentityNormalizer, &config)?;
        // the last step finishes three episodes at once, all of them are kept
        assert_eq!(report.episode_returns.len(), 12);
        assert!(report.episode_returns.iter().all(|r| *r == k as f32));
        assert_eq!(report.mean, k as f32);
        assert_eq!(report.std, 0.);
        assert_eq!(report.steps, 16);
        Ok(())
    }

    #[test]
    fn masks_drop_to_zero_right_after_an_episode_ends() -> Result<()> {
        let mut env = CountdownVecEnv::new(vec![2, 3, 5]);
        let policy = RecordingPolicy::default();
        let config = EvaluationConfig::default().with_n_episodes(4);
        evaluate_policy(&policy, &mut env, &IdentityNormalizer, &config)?;
        let masks = policy.masks.borrow();
        // step 0 starts every slot fresh
        assert_eq!(masks[0], vec![0., 0., 0.]);
        assert_eq!(masks[1], vec![1., 1., 1.]);
        // slot 0 ended at step 1, slot 1 at step 2
        assert_eq!(masks[2], vec![0., 1., 1.]);
        assert_eq!(masks[3], vec![1., 0., 1.]);
        assert_eq!(masks[4], vec![0., 1., 1.]);
        // the policy zeroes the recurrent state through the mask
        let hidden = policy.hidden.borrow();
        assert_eq!(hidden[2], vec![2., 2., 2.]);
        assert_eq!(hidden[3], vec![1., 3., 3.]);
        Ok(())
    }

    #[test]
    fn staggered_slots_collect_the_target_count() -> Result<()> {
        let mut env = CountdownVecEnv::new(vec![2, 3, 5]);
        let policy = RecordingPolicy::default();
        let config = EvaluationConfig::default().with_n_episodes(10);
        let report = evaluate_policy(&policy, &mut env, &IdentityNormalizer, &config)?;
        assert!(report.episode_returns.len() >= 10);
        let (mean, _) = mean_std(&report.episode_returns);
        assert_eq!(report.mean, mean);
        // every return is one of the episode lengths
        assert!(
            report
                .episode_returns
                .iter()
                .all(|r| [2., 3., 5.].contains(r))
        );
        Ok(())
    }

    #[test]
    fn single_slot_single_episode() -> Result<()> {
        let mut env = CountdownVecEnv::new(vec![7]);
        let policy = RecordingPolicy::default();
        let config = EvaluationConfig::default().with_n_episodes(1);
        let report = evaluate_policy(&policy, &mut env, &IdentityNormalizer, &config)?;
        assert_eq!(report.episode_returns, vec![7.]);
        assert_eq!(report.steps, 7);
        assert_eq!(report.mean, 7.);
        Ok(())
    }

    #[test]
    fn wrong_batch_from_env_is_an_error() -> Result<()> {
        let mut env = CountdownVecEnv::new(vec![3, 3]);
        env.extra_rows = 1;
        let policy = RecordingPolicy::default();
        let result = evaluate_policy(
            &policy,
            &mut env,
            &IdentityNormalizer,
            &EvaluationConfig::default(),
        );
        assert!(matches!(
            result,
            Err(R2lError::BatchSizeMismatch {
                expected: 2,
                got: 3
            })
        ));
        Ok(())
    }

    #[test]
    fn mean_std_of_known_values() {
        let (mean, std) = mean_std(&[1., 2., 3., 4.]);
        assert_eq!(mean, 2.5);
        assert!((std - 1.25f32.sqrt()).abs() < 1e-6);
        assert!(mean_std(&[]).0.is_nan());
    }
}
