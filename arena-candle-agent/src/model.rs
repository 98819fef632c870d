//! Interface of neural networks used in the agents.
use crate::util::{hard_update, named_vars, track, NamedTensors};
use anyhow::Result;
use candle_core::{DType, Device, Var};
use candle_nn::{VarBuilder, VarMap};
use serde::{de::DeserializeOwned, Serialize};

/// Neural network model not owning its [`VarMap`] internally.
pub trait SubModel: Sized {
    /// Configuration from which [`SubModel`] is constructed.
    type Config: Clone + Serialize + DeserializeOwned;

    /// Input of the [`SubModel`].
    type Input;

    /// Output of the [`SubModel`].
    type Output;

    /// Builds [`SubModel`] with [`VarBuilder`] and [`SubModel::Config`].
    fn build(vb: VarBuilder, config: Self::Config) -> Result<Self>;

    /// A generalized forward function.
    fn forward(&self, input: &Self::Input) -> Result<Self::Output>;
}

/// A [`SubModel`] together with the variables it was built on.
///
/// Target networks and frozen policies are bare networks; trained networks
/// are wrapped in an [`Estimator`](crate::estimator::Estimator).
pub struct Network<M: SubModel> {
    device: Device,
    varmap: VarMap,
    config: M::Config,
    model: M,
}

impl<M: SubModel> Network<M> {
    /// Builds a network with freshly initialized variables.
    pub fn build(config: M::Config, device: &Device) -> Result<Self> {
        let varmap = VarMap::new();
        let model = {
            let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);
            M::build(vb, config.clone())?
        };

        Ok(Self {
            device: device.clone(),
            varmap,
            config,
            model,
        })
    }

    /// Builds a network with its own copy of the variables of `self`.
    pub fn deep_clone(&self) -> Result<Self> {
        let net = Self::build(self.config.clone(), &self.device)?;
        net.copy_from(self)?;
        Ok(net)
    }

    /// Applies the model.
    pub fn predict(&self, input: &M::Input) -> Result<M::Output> {
        self.model.forward(input)
    }

    /// The model.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Device holding the variables.
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Configuration of the model.
    pub fn config(&self) -> &M::Config {
        &self.config
    }

    /// Variables of the model.
    pub fn varmap(&self) -> &VarMap {
        &self.varmap
    }

    /// Variables as a list, for optimizers.
    pub fn vars(&self) -> Result<Vec<Var>> {
        Ok(named_vars(&self.varmap)?.into_values().collect())
    }

    /// Overwrites the variables with those of `src`.
    pub fn copy_from(&self, src: &Self) -> Result<()> {
        hard_update(&self.varmap, &src.varmap)
    }

    /// Moves the variables toward those of `src` by the factor `tau`.
    pub fn track(&self, src: &Self, tau: f64) -> Result<()> {
        track(&self.varmap, &src.varmap, tau)
    }

    /// Copies the variables out.
    pub fn export(&self) -> Result<NamedTensors> {
        NamedTensors::copy_from(&self.varmap)
    }

    /// Overwrites the variables.
    pub fn import(&self, params: &NamedTensors) -> Result<()> {
        params.copy_to(&self.varmap)
    }
}
