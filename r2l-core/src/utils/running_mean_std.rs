use crate::error::Result;
use candle_core::shape::Dim;
use candle_core::{DType, Device, Shape, Tensor};

/// Per feature mean and (biased) variance of every batch seen so far.
#[derive(Debug, Clone)]
pub struct RunningMeanStd {
    pub mean: Tensor,
    pub var: Tensor,
    pub count: f32,
    pub device: Device,
}

pub(crate) fn biased_var<D: Dim>(t: &Tensor, dim: D) -> Result<Tensor> {
    let dim = dim.to_index(t.shape(), "var")?;
    let mean = t.mean_keepdim(dim)?;
    let squares = t.broadcast_sub(&mean)?.sqr()?;
    Ok((squares.sum_keepdim(dim)? / t.dim(dim)? as f64)?.squeeze(dim)?)
}

impl RunningMeanStd {
    pub fn new<S: Into<Shape>>(shape: S, device: Device) -> Result<Self> {
        let shape = shape.into();
        let mean = Tensor::zeros(shape.clone(), DType::F32, &device)?;
        let var = Tensor::ones(shape, DType::F32, &device)?;
        Ok(Self {
            mean,
            var,
            count: 1e-4,
            device,
        })
    }

    /// `arr` is a batch with the feature dims trailing, shape (batch, ..).
    pub fn update(&mut self, arr: &Tensor) -> Result<()> {
        let batch_mean = arr.mean(0)?;
        let batch_var = biased_var(arr, 0)?;
        let batch_count = arr.dim(0)? as f32;
        self.update_from_moments(batch_mean, batch_var, batch_count)
    }

    // Chan et al. parallel variant of Welford's algorithm
    fn update_from_moments(
        &mut self,
        batch_mean: Tensor,
        batch_var: Tensor,
        batch_count: f32,
    ) -> Result<()> {
        let delta = batch_mean.sub(&self.mean)?;
        let tot_count = self.count + batch_count;
        self.mean = self
            .mean
            .add(&(&delta * (batch_count / tot_count) as f64)?)?;
        let m_a = (&self.var * self.count as f64)?;
        let m_b = (&batch_var * batch_count as f64)?;
        let m_2 = m_a
            .add(&m_b)?
            .add(&(delta.sqr()? * (self.count * batch_count / tot_count) as f64)?)?;
        self.var = (m_2 / tot_count as f64)?;
        self.count = tot_count;
        Ok(())
    }
}
