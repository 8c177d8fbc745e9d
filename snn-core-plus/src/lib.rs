//! snn-core-plus: projections and plasticity atop snn-core (keeps snn-core unchanged)
//!
//! Additions:
//! - Square-layout 2-D convolution geometry with weight-shared forward pass
//! - Dense and convolutional synaptic projections with clipped weights
//! - Optional STDP learning rule (feature "plasticity", on by default)
//!
//! The host owns every population and projection and sequences each tick as
//! dynamics, then projections, then plasticity.

pub mod conv;
pub mod projection;
#[cfg(feature = "plasticity")]
pub mod plasticity;

// Re-exports
pub use conv::ConvGeometry;
pub use projection::{Conv2dConfig, DenseConfig, SynapticProjection, WeightBounds, Weights};
pub use snn_core::{SnnError, SnnResult};

#[cfg(feature = "plasticity")]
pub use plasticity::{PlasticityRule, Stdp, StdpParams};
