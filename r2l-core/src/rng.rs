// Every sampling routine that runs on the host draws from this generator, so a single
// `set_seed` call makes action sampling, orthogonal init and env reset seeds reproducible.

use crate::error::Result;
use candle_core::{Device, Shape, Tensor};
use rand::{SeedableRng, rngs::StdRng};
use rand_distr::{Distribution, StandardNormal};
use std::cell::RefCell;

thread_local! {
    pub static RNG: RefCell<StdRng> = RefCell::new(StdRng::seed_from_u64(0));
}

pub fn set_seed(seed: u64) {
    RNG.with_borrow_mut(|rng| *rng = StdRng::seed_from_u64(seed));
}

pub fn with_rng<T>(f: impl FnOnce(&mut StdRng) -> T) -> T {
    RNG.with_borrow_mut(f)
}

/// Standard normal `f32` tensor drawn from the thread-local generator.
pub fn randn<S: Into<Shape>>(shape: S, device: &Device) -> Result<Tensor> {
    let shape = shape.into();
    let values: Vec<f32> = with_rng(|rng| {
        StandardNormal
            .sample_iter(rng)
            .take(shape.elem_count())
            .collect()
    });
    Ok(Tensor::from_vec(values, shape, device)?)
}
