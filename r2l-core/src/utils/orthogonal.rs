use crate::{error::Result, rng::randn};
use candle_core::{DType, Device, Error, Tensor, Var};
use candle_nn::{Linear, VarMap};

/// A (rows, cols) matrix with orthonormal columns (tall) or rows (wide), scaled by `gain`.
/// Built by Gram-Schmidt on a standard normal matrix.
pub fn orthogonal(rows: usize, cols: usize, gain: f64, device: &Device) -> Result<Tensor> {
    let (n, len) = if rows >= cols { (cols, rows) } else { (rows, cols) };
    // n vectors of length len, orthonormalized in place
    let mut vectors: Vec<Vec<f32>> = randn((n, len), &Device::Cpu)?.to_vec2()?;
    for i in 0..n {
        loop {
            let (done, rest) = vectors.split_at_mut(i);
            let v = &mut rest[0];
            for u in done.iter() {
                let dot: f32 = u.iter().zip(v.iter()).map(|(a, b)| a * b).sum();
                v.iter_mut().zip(u).for_each(|(x, u)| *x -= dot * u);
            }
            let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm > 1e-6 {
                v.iter_mut().for_each(|x| *x /= norm);
                break;
            }
            // linearly dependent draw, try another direction
            *v = randn(len, &Device::Cpu)?.to_vec1()?;
        }
    }
    let flat: Vec<f32> = vectors.into_iter().flatten().collect();
    let matrix = (Tensor::from_vec(flat, (n, len), device)? * gain)?;
    if rows >= cols {
        Ok(matrix.t()?.contiguous()?)
    } else {
        Ok(matrix)
    }
}

/// Turns `init` into a trainable variable stored in `varmap` under `name`.
pub fn register_var(varmap: &VarMap, name: String, init: &Tensor) -> Result<Tensor> {
    let var = Var::from_tensor(init)?;
    let tensor = var.as_tensor().clone();
    varmap
        .data()
        .lock()
        .map_err(|_| Error::Msg("varmap lock poisoned".into()))?
        .insert(name, var);
    Ok(tensor)
}

/// A linear layer with orthogonal weights scaled by `gain` and a zero bias.
pub fn orthogonal_linear(
    in_dim: usize,
    out_dim: usize,
    gain: f64,
    varmap: &VarMap,
    prefix: &str,
    device: &Device,
) -> Result<Linear> {
    let weight = orthogonal(out_dim, in_dim, gain, device)?;
    let weight = register_var(varmap, format!("{prefix}.weight"), &weight)?;
    let bias = Tensor::zeros(out_dim, DType::F32, device)?;
    let bias = register_var(varmap, format!("{prefix}.bias"), &bias)?;
    Ok(Linear::new(weight, Some(bias)))
}
