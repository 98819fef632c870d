use super::named_vars;
use anyhow::{anyhow, bail, Result};
use candle_core::{DType, Tensor};
use candle_nn::VarMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Shape and row-major values of a tensor.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct TensorData {
    /// Dimensions.
    pub shape: Vec<usize>,

    /// Flattened values.
    pub data: Vec<f32>,
}

/// Named tensors used to move model parameters in and out of a [`VarMap`].
///
/// This is the serialized form of agent parameters in checkpoints and
/// in the pool of historical opponents.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct NamedTensors {
    /// Tensors keyed by variable name.
    pub tensors: BTreeMap<String, TensorData>,
}

impl NamedTensors {
    /// Copies the variables of a [`VarMap`].
    pub fn copy_from(vm: &VarMap) -> Result<Self> {
        let mut tensors = BTreeMap::new();
        for (name, var) in named_vars(vm)? {
            let t = var.as_tensor();
            let data = t.flatten_all()?.to_dtype(DType::F32)?.to_vec1::<f32>()?;
            tensors.insert(
                name,
                TensorData {
                    shape: t.dims().to_vec(),
                    data,
                },
            );
        }
        Ok(Self { tensors })
    }

    /// Copies the named tensors into the variables of a [`VarMap`].
    ///
    /// Every variable must have a tensor of the same name and shape.
    pub fn copy_to(&self, vm: &VarMap) -> Result<()> {
        for (name, var) in named_vars(vm)? {
            let src = self
                .tensors
                .get(&name)
                .ok_or_else(|| anyhow!("no tensor named {}", name))?;
            if src.shape != var.dims() {
                bail!(
                    "shape mismatch for {}: {:?} and {:?}",
                    name,
                    src.shape,
                    var.dims()
                );
            }
            let t = Tensor::from_vec(src.data.clone(), src.shape.as_slice(), var.device())?
                .to_dtype(var.dtype())?;
            var.set(&t)?;
        }
        Ok(())
    }

    /// Number of tensors.
    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    /// Returns `true` if there is no tensor.
    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    /// Adds the tensors of `other` with their names prefixed by `prefix/`.
    pub fn insert_prefixed(&mut self, prefix: &str, other: NamedTensors) {
        for (name, t) in other.tensors {
            self.tensors.insert(format!("{}/{}", prefix, name), t);
        }
    }

    /// Tensors whose names start with `prefix/`, with the prefix removed.
    pub fn prefixed(&self, prefix: &str) -> NamedTensors {
        let head = format!("{}/", prefix);
        let tensors = self
            .tensors
            .iter()
            .filter_map(|(name, t)| {
                name.strip_prefix(&head)
                    .map(|rest| (rest.to_string(), t.clone()))
            })
            .collect();
        NamedTensors { tensors }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;
    use candle_nn::{linear, Module, VarBuilder};

    #[test]
    fn test_named_tensors() -> Result<()> {
        let device = Device::Cpu;
        let x = Tensor::from_slice(&[1f32, 2., 3.], (1, 3), &device)?;

        let vm1 = VarMap::new();
        let l1 = linear(3, 2, VarBuilder::from_varmap(&vm1, DType::F32, &device).pp("layer"))?;
        let vm2 = VarMap::new();
        let l2 = linear(3, 2, VarBuilder::from_varmap(&vm2, DType::F32, &device).pp("layer"))?;

        let nt = NamedTensors::copy_from(&vm1)?;
        assert_eq!(nt.len(), 2);
        assert_eq!(nt.tensors["layer.weight"].shape, vec![2, 3]);
        nt.copy_to(&vm2)?;

        let y1 = l1.forward(&x)?.flatten_all()?.to_vec1::<f32>()?;
        let y2 = l2.forward(&x)?.flatten_all()?.to_vec1::<f32>()?;
        assert_eq!(y1, y2);
        Ok(())
    }

    #[test]
    fn test_prefixes() -> Result<()> {
        let device = Device::Cpu;
        let vm = VarMap::new();
        let _ = linear(2, 2, VarBuilder::from_varmap(&vm, DType::F32, &device).pp("ln0"))?;

        let mut all = NamedTensors::default();
        all.insert_prefixed("q", NamedTensors::copy_from(&vm)?);
        all.insert_prefixed("q_tgt", NamedTensors::copy_from(&vm)?);
        assert_eq!(all.len(), 4);
        assert!(all.tensors.contains_key("q_tgt/ln0.bias"));

        let q = all.prefixed("q");
        assert_eq!(q.len(), 2);
        assert_eq!(q, NamedTensors::copy_from(&vm)?);

        // Missing names are rejected.
        assert!(NamedTensors::default().copy_to(&vm).is_err());
        Ok(())
    }
}
