//! Multilayer perceptrons.
mod base;
mod config;
mod dueling;
mod gaussian;
use anyhow::Result;
pub use base::Mlp;
use candle_core::Tensor;
use candle_nn::{linear, Linear, Module, VarBuilder};
pub use config::{Activation, MlpConfig};
pub use dueling::{dueling_combine, DuelingMlp, DuelingMlpConfig};
pub use gaussian::GaussianMlp;

/// Returns linear modules mapping `in_dim` through `units`, and to `out_dim` if given.
fn create_linear_layers(
    vb: VarBuilder,
    in_dim: usize,
    units: &[usize],
    out_dim: Option<usize>,
) -> Result<Vec<Linear>> {
    let mut dims = vec![in_dim];
    dims.extend_from_slice(units);
    dims.extend(out_dim);

    dims.windows(2)
        .enumerate()
        .map(|(i, w)| Ok(linear(w[0], w[1], vb.pp(format!("ln{}", i)))?))
        .collect()
}

/// Applies the layers with ReLU in between; the last layer is linear.
fn mlp_forward(xs: &Tensor, layers: &[Linear]) -> Result<Tensor> {
    let mut xs = xs.clone();
    for (i, layer) in layers.iter().enumerate() {
        xs = layer.forward(&xs)?;
        if i + 1 < layers.len() {
            xs = xs.relu()?;
        }
    }
    Ok(xs)
}

/// Applies the layers, each followed by ReLU.
fn trunk_forward(xs: &Tensor, layers: &[Linear]) -> Result<Tensor> {
    let mut xs = xs.clone();
    for layer in layers.iter() {
        xs = layer.forward(&xs)?.relu()?;
    }
    Ok(xs)
}
