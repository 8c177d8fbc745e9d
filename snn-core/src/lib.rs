//! snn-core: neuron dynamics for fixed-size spiking populations
//!
//! - LIF, exponential LIF and adaptive exponential LIF as one closed enum
//! - One integrate / detect / reset pipeline per tick
//! - Construction-time validation; ticks never fail
//!
//! Projections and plasticity live in snn-core-plus.

pub mod error;
pub mod neuron;
pub mod population;

// Re-exports
pub use error::{SnnError, SnnResult};
pub use neuron::{AdaptiveParams, ExponentialParams, LifParams, NeuronConfig, NeuronModel};
pub use population::NeuronPopulation;
