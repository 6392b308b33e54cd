use r2l_core::env::{EnvironmentDescription, Space};

#[derive(Debug, Clone, Copy, Default)]
pub enum DistributionType {
    /// Follow the environment's action space.
    #[default]
    Dynamic,
    CategoricalDistribution,
    DiagGaussianDistribution,
    BernoulliDistribution,
}

impl DistributionType {
    /// The action space the policy head is built for. Forcing a type keeps the action size of
    /// the environment.
    pub fn action_space(&self, env_description: &EnvironmentDescription) -> Space {
        let action_size = env_description.action_size();
        match self {
            Self::Dynamic => env_description.action_space.clone(),
            Self::CategoricalDistribution => Space::Discrete(action_size),
            Self::DiagGaussianDistribution => Space::continous_from_dims(vec![action_size]),
            Self::BernoulliDistribution => Space::MultiBinary(action_size),
        }
    }
}
