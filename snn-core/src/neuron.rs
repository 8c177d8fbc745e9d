//! Neuron models as a closed set of variants sharing one integration pipeline.
//!
//! Each variant contributes its voltage derivative through a pure function:
//!
//! ```text
//! LIF:    tau*dv/dt = (v_rest - v) + R*I
//! ELIF:   tau*dv/dt = (v_rest - v) + R*I + sharpness*exp((v - theta_rh)/sharpness)
//! AELIF:  tau*dv/dt = (v_rest - v) + R*I + sharpness*exp(..) - R*A
//!         A' = (alpha*(v - v_rest) + beta*tau_a*spike - A) / tau_a
//! ```

use crate::error::{require_finite, require_positive, SnnResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Parameters shared by every variant.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LifParams {
    /// Membrane time constant
    pub tau: f64,
    pub v_rest: f64,
    pub v_reset: f64,
    pub threshold: f64,
    /// Membrane resistance (scales input current)
    pub resistance: f64,
}

impl Default for LifParams {
    fn default() -> Self {
        Self {
            tau: 10.0,
            v_rest: -65.0,
            v_reset: -65.0,
            threshold: -55.0,
            resistance: 1.0,
        }
    }
}

impl LifParams {
    pub fn validate(&self) -> SnnResult<()> {
        require_positive("tau", self.tau)?;
        require_finite("v_rest", self.v_rest)?;
        require_finite("v_reset", self.v_reset)?;
        require_finite("threshold", self.threshold)?;
        require_finite("resistance", self.resistance)
    }

    #[inline]
    pub fn derivative(&self, v: f64, input: f64) -> f64 {
        (self.v_rest - v) + self.resistance * input
    }
}

/// Exponential LIF: adds a sharp upswing once `v` approaches `theta_rh`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ExponentialParams {
    pub lif: LifParams,
    /// Sharpness of the exponential curve
    pub sharpness: f64,
    /// Rheobase threshold
    pub theta_rh: f64,
}

impl Default for ExponentialParams {
    fn default() -> Self {
        Self {
            lif: LifParams::default(),
            sharpness: 5.0,
            theta_rh: -58.0,
        }
    }
}

impl ExponentialParams {
    pub fn validate(&self) -> SnnResult<()> {
        self.lif.validate()?;
        require_positive("sharpness", self.sharpness)?;
        require_finite("theta_rh", self.theta_rh)
    }

    #[inline]
    pub fn exponential_term(&self, v: f64) -> f64 {
        self.sharpness * ((v - self.theta_rh) / self.sharpness).exp()
    }

    #[inline]
    pub fn derivative(&self, v: f64, input: f64) -> f64 {
        self.lif.derivative(v, input) + self.exponential_term(v)
    }
}

/// Adaptive exponential LIF: a spike-triggered adaptation current `A`
/// is subtracted from the drive.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AdaptiveParams {
    pub exponential: ExponentialParams,
    /// Subthreshold adaptation
    pub alpha: f64,
    /// Spike-triggered adaptation
    pub beta: f64,
    /// Adaptation time constant
    pub tau_a: f64,
}

impl Default for AdaptiveParams {
    fn default() -> Self {
        Self {
            exponential: ExponentialParams::default(),
            alpha: 1.0,
            beta: 2.0,
            tau_a: 10.0,
        }
    }
}

impl AdaptiveParams {
    pub fn validate(&self) -> SnnResult<()> {
        self.exponential.validate()?;
        require_finite("alpha", self.alpha)?;
        require_finite("beta", self.beta)?;
        require_positive("tau_a", self.tau_a)
    }

    #[inline]
    pub fn derivative(&self, v: f64, input: f64, adaptation: f64) -> f64 {
        self.exponential.derivative(v, input) - self.exponential.lif.resistance * adaptation
    }

    /// Next adaptation value from the end-of-tick voltage, this tick's spike
    /// and the previous adaptation.
    #[inline]
    pub fn adaptation(&self, v: f64, spiked: bool, adaptation: f64) -> f64 {
        let spike = if spiked { 1.0 } else { 0.0 };
        let sub_threshold = self.alpha * (v - self.exponential.lif.v_rest);
        let spike_triggered = self.beta * self.tau_a * spike;
        (sub_threshold + spike_triggered - adaptation) / self.tau_a
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum NeuronModel {
    Lif(LifParams),
    Exponential(ExponentialParams),
    Adaptive(AdaptiveParams),
}

impl Default for NeuronModel {
    fn default() -> Self {
        NeuronModel::Lif(LifParams::default())
    }
}

impl NeuronModel {
    pub fn tag(&self) -> &'static str {
        match self {
            NeuronModel::Lif(_) => "LIF",
            NeuronModel::Exponential(_) => "ELIF",
            NeuronModel::Adaptive(_) => "AELIF",
        }
    }

    pub fn validate(&self) -> SnnResult<()> {
        match self {
            NeuronModel::Lif(p) => p.validate(),
            NeuronModel::Exponential(p) => p.validate(),
            NeuronModel::Adaptive(p) => p.validate(),
        }
    }

    /// Parameters common to every variant (threshold, reset, tau, ...).
    pub fn lif(&self) -> &LifParams {
        match self {
            NeuronModel::Lif(p) => p,
            NeuronModel::Exponential(p) => &p.lif,
            NeuronModel::Adaptive(p) => &p.exponential.lif,
        }
    }

    pub fn is_adaptive(&self) -> bool {
        matches!(self, NeuronModel::Adaptive(_))
    }

    /// Voltage derivative (before division by tau). `adaptation` is ignored
    /// by the non-adaptive variants.
    #[inline]
    pub fn derivative(&self, v: f64, input: f64, adaptation: f64) -> f64 {
        match self {
            NeuronModel::Lif(p) => p.derivative(v, input),
            NeuronModel::Exponential(p) => p.derivative(v, input),
            NeuronModel::Adaptive(p) => p.derivative(v, input, adaptation),
        }
    }
}

/// Everything a population needs at construction.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NeuronConfig {
    pub model: NeuronModel,
    /// Integration step; multiplies dv/tau
    pub dt: f64,
}

impl Default for NeuronConfig {
    fn default() -> Self {
        Self {
            model: NeuronModel::default(),
            dt: 1.0,
        }
    }
}

impl NeuronConfig {
    pub fn new(model: NeuronModel) -> Self {
        Self { model, dt: 1.0 }
    }

    pub fn with_dt(mut self, dt: f64) -> Self {
        self.dt = dt;
        self
    }

    pub fn validate(&self) -> SnnResult<()> {
        require_positive("dt", self.dt)?;
        self.model.validate()
    }
}
