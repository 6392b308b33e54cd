use super::orthogonal::orthogonal_linear;
use crate::error::Result;
use candle_core::{Device, Module, Tensor};
use candle_nn::{Linear, VarMap};

/// Stack of linear layers, each followed by `tanh`.
#[derive(Debug, Clone)]
pub struct TanhMlp {
    layers: Vec<Linear>,
    output_dim: usize,
}

impl TanhMlp {
    pub fn output_dim(&self) -> usize {
        self.output_dim
    }
}

impl Module for TanhMlp {
    fn forward(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        self.layers
            .iter()
            .try_fold(xs.clone(), |xs, layer| layer.forward(&xs)?.tanh())
    }
}

pub fn build_sequential(
    input_dim: usize,
    layers: &[usize],
    gain: f64,
    varmap: &VarMap,
    prefix: &str,
    device: &Device,
) -> Result<TanhMlp> {
    let mut last_dim = input_dim;
    let mut nn = Vec::with_capacity(layers.len());
    for (layer_idx, layer_size) in layers.iter().enumerate() {
        let layer_pp = format!("{prefix}.{layer_idx}");
        nn.push(orthogonal_linear(
            last_dim, *layer_size, gain, varmap, &layer_pp, device,
        )?);
        last_dim = *layer_size;
    }
    Ok(TanhMlp {
        layers: nn,
        output_dim: last_dim,
    })
}
