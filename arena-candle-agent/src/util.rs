//! Utilities.
use anyhow::{anyhow, Result};
use candle_core::{backprop::GradStore, Tensor, Var, D};
use candle_nn::VarMap;
use log::trace;
mod named_tensors;
pub use named_tensors::{NamedTensors, TensorData};
use std::collections::BTreeMap;

/// Guard added inside logarithms.
pub const LOG_EPS: f64 = 1e-6;

/// Variables of a [`VarMap`] sorted by name.
pub fn named_vars(varmap: &VarMap) -> Result<BTreeMap<String, Var>> {
    let data = varmap
        .data()
        .lock()
        .map_err(|_| anyhow!("variable map is poisoned"))?;
    Ok(data.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
}

/// Apply soft update on variables.
///
/// Variables are identified by their names.
///
/// dest = tau * src + (1.0 - tau) * dest
pub fn track(dest: &VarMap, src: &VarMap, tau: f64) -> Result<()> {
    let src = named_vars(src)?;
    for (k, v_dest) in named_vars(dest)? {
        trace!("track {}", k);
        let v_src = src
            .get(&k)
            .ok_or_else(|| anyhow!("variable {} is missing in the source", k))?;
        let t = (v_src.as_tensor().affine(tau, 0.0)? + v_dest.as_tensor().affine(1.0 - tau, 0.0)?)?;
        v_dest.set(&t)?;
    }
    Ok(())
}

/// Copies the values of the variables of `src` into `dest`.
pub fn hard_update(dest: &VarMap, src: &VarMap) -> Result<()> {
    let src = named_vars(src)?;
    for (k, v_dest) in named_vars(dest)? {
        let v_src = src
            .get(&k)
            .ok_or_else(|| anyhow!("variable {} is missing in the source", k))?;
        v_dest.set(v_src.as_tensor())?;
    }
    Ok(())
}

/// Clamps the gradients of `vars` element-wise to `[-clip, clip]`.
pub fn clip_grads(grads: &mut GradStore, vars: &[Var], clip: f64) -> Result<()> {
    for var in vars {
        if let Some(g) = grads.remove(var.as_tensor()) {
            grads.insert(var.as_tensor(), g.clamp(-clip, clip)?);
        }
    }
    Ok(())
}

/// Element-wise Huber loss of the errors `d` with threshold 1.
///
/// `0.5 * d^2` for `|d| <= 1` and `|d| - 0.5` otherwise.
pub fn huber(d: &Tensor) -> Result<Tensor> {
    let d = d.abs()?;
    let q = d.clamp(0.0, 1.0)?;
    Ok(((q.sqr()? * 0.5)? + (d - &q)?)?)
}

/// Mean over the batch of the Huber loss of `target - pred` weighted by `weight`.
///
/// All three tensors have the shape `[batch_size]`.
pub fn weighted_huber_loss(pred: &Tensor, target: &Tensor, weight: &Tensor) -> Result<Tensor> {
    let loss = huber(&(target - pred)?)?;
    Ok((loss * weight)?.mean_all()?)
}

/// Entropy of independent Bernoulli variables, summed over the last dimension.
pub fn bernoulli_entropy(p: &Tensor) -> Result<Tensor> {
    let q = p.affine(-1.0, 1.0)?;
    let h = ((p * p.affine(1.0, LOG_EPS)?.log()?)? + (&q * q.affine(1.0, LOG_EPS)?.log()?)?)?;
    Ok(h.sum(D::Minus1)?.neg()?)
}

/// Converts a tensor of per-sample values to `f64`s.
pub fn to_f64s(t: &Tensor) -> Result<Vec<f64>> {
    Ok(t
        .flatten_all()?
        .to_vec1::<f32>()?
        .into_iter()
        .map(|v| v as f64)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};
    use candle_nn::Init;

    fn varmap_with(values: &[f32]) -> Result<VarMap> {
        let vm = VarMap::new();
        let init = Init::Randn {
            mean: 0.0,
            stdev: 1.0,
        };
        vm.get((values.len(),), "var1", init, DType::F32, &Device::Cpu)?;
        let t = Tensor::from_slice(values, (values.len(),), &Device::Cpu)?;
        named_vars(&vm)?["var1"].set(&t)?;
        Ok(vm)
    }

    fn values(vm: &VarMap) -> Result<Vec<f32>> {
        Ok(named_vars(vm)?["var1"].as_tensor().to_vec1::<f32>()?)
    }

    #[test]
    fn test_track() -> Result<()> {
        let vm_src = varmap_with(&[1.0, 2.0, 3.0])?;
        let vm_dest = varmap_with(&[4.0, 5.0, 6.0])?;
        track(&vm_dest, &vm_src, 0.7)?;

        let expected = [1.9f32, 2.9, 3.9];
        for (v, e) in values(&vm_dest)?.iter().zip(expected.iter()) {
            assert!((v - e).abs() < 1e-6);
        }
        assert_eq!(values(&vm_src)?, vec![1.0, 2.0, 3.0]);
        Ok(())
    }

    #[test]
    fn test_hard_update() -> Result<()> {
        let vm_src = varmap_with(&[1.0, -2.0])?;
        let vm_dest = varmap_with(&[0.0, 0.0])?;
        hard_update(&vm_dest, &vm_src)?;
        assert_eq!(values(&vm_dest)?, vec![1.0, -2.0]);

        // The copy does not share storage with the source.
        named_vars(&vm_src)?["var1"].set(&Tensor::from_slice(&[7f32, 7.0], (2,), &Device::Cpu)?)?;
        assert_eq!(values(&vm_dest)?, vec![1.0, -2.0]);
        Ok(())
    }

    #[test]
    fn test_huber() -> Result<()> {
        let d = Tensor::from_slice(&[0.0f32, 0.5, -0.5, 1.0, 3.0, -2.5], (6,), &Device::Cpu)?;
        let loss = huber(&d)?.to_vec1::<f32>()?;
        let expected = [0.0f32, 0.125, 0.125, 0.5, 2.5, 2.0];
        for (l, e) in loss.iter().zip(expected.iter()) {
            assert!((l - e).abs() < 1e-6, "{:?}", loss);
        }
        Ok(())
    }

    #[test]
    fn test_weighted_huber_loss() -> Result<()> {
        let pred = Tensor::from_slice(&[0.0f32, 0.0], (2,), &Device::Cpu)?;
        let target = Tensor::from_slice(&[1.0f32, 3.0], (2,), &Device::Cpu)?;
        let weight = Tensor::from_slice(&[1.0f32, 0.5], (2,), &Device::Cpu)?;
        let loss = weighted_huber_loss(&pred, &target, &weight)?.to_scalar::<f32>()?;
        assert!((loss - (0.5 + 1.25) / 2.0).abs() < 1e-6);
        Ok(())
    }

    #[test]
    fn test_bernoulli_entropy() -> Result<()> {
        let p = Tensor::from_slice(&[0.5f32, 0.5, 0.0, 1.0, 0.2, 0.9], (3, 2), &Device::Cpu)?;
        let h = bernoulli_entropy(&p)?.to_vec1::<f32>()?;
        let h_02 = -(0.2f32 * 0.2f32.ln() + 0.8 * 0.8f32.ln());
        let h_09 = -(0.9f32 * 0.9f32.ln() + 0.1 * 0.1f32.ln());
        assert!((h[0] - 2.0 * std::f32::consts::LN_2).abs() < 1e-4);
        assert!(h[1].abs() < 1e-4);
        assert!((h[2] - (h_02 + h_09)).abs() < 1e-4);
        Ok(())
    }

    #[test]
    fn test_clip_grads() -> Result<()> {
        let vm = varmap_with(&[3.0, -4.0, 0.1])?;
        let var = named_vars(&vm)?["var1"].clone();
        let loss = var.as_tensor().sqr()?.sum_all()?;
        let mut grads = loss.backward()?;
        clip_grads(&mut grads, &[var.clone()], 0.5)?;

        let g = grads.get(var.as_tensor()).unwrap().to_vec1::<f32>()?;
        assert!(g.iter().all(|v| v.abs() <= 0.5 + 1e-6));
        assert_eq!(g[0], 0.5);
        assert_eq!(g[1], -0.5);
        assert!((g[2] - 0.2).abs() < 1e-6);
        Ok(())
    }
}
