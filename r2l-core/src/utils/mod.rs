pub mod build_sequential;
pub mod orthogonal;
pub mod running_mean_std;
