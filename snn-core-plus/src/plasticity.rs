//! Plasticity primitives for snn-core-plus (feature "plasticity").
//!
//! - Trait PlasticityRule: attach state to a projection's populations, then
//!   update the projection's weights once per tick.
//! - Stdp: trace-based STDP for dense and convolutional projections.
//!
//! Traces follow
//!
//! ```text
//! dx/dt = -x/tau_plus  + pre.spikes
//! dy/dt = -y/tau_minus + post.spikes
//! dw/dt = a_plus * x * post.spikes - a_minus * y * pre.spikes
//! ```
//!
//! and every update is clamped back into the projection's weight bounds.

use ndarray::{s, Array, Array2, Array4, ArrayView1, Dimension, Zip};
use tracing::{debug, trace, warn};

use snn_core::error::{require_finite, require_positive};
use snn_core::{NeuronPopulation, SnnResult};

use crate::conv::ConvGeometry;
use crate::projection::{SynapticProjection, WeightBounds, Weights};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Plasticity rule interface
pub trait PlasticityRule {
    /// Allocate per-neuron learning state on both sides of a projection.
    fn initialize(&mut self, src: &mut NeuronPopulation, dst: &mut NeuronPopulation);

    /// One learning step; must observe the same spikes the forward pass used.
    fn step(
        &mut self,
        projection: &mut SynapticProjection,
        src: &mut NeuronPopulation,
        dst: &mut NeuronPopulation,
    );
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StdpParams {
    /// Pre-post time window
    pub tau_plus: f64,
    /// Post-pre time window
    pub tau_minus: f64,
    /// Potentiation intensity
    pub a_plus: f64,
    /// Depression intensity
    pub a_minus: f64,
    pub dt: f64,
}

impl Default for StdpParams {
    fn default() -> Self {
        Self {
            tau_plus: 20.0,
            tau_minus: 20.0,
            a_plus: 0.01,
            a_minus: 0.012,
            dt: 1.0,
        }
    }
}

impl StdpParams {
    pub fn validate(&self) -> SnnResult<()> {
        require_positive("tau_plus", self.tau_plus)?;
        require_positive("tau_minus", self.tau_minus)?;
        require_positive("dt", self.dt)?;
        require_finite("a_plus", self.a_plus)?;
        require_finite("a_minus", self.a_minus)
    }
}

#[derive(Debug, Clone)]
pub struct Stdp {
    params: StdpParams,
}

impl Stdp {
    pub fn new(params: StdpParams) -> SnnResult<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    /// a_plus 0.01, a_minus 0.012, both windows 20 ticks.
    pub fn with_defaults() -> Self {
        Self {
            params: StdpParams::default(),
        }
    }

    pub fn params(&self) -> &StdpParams {
        &self.params
    }

    /// Exponential decay plus spike injection on both sides.
    pub fn update_traces(&self, src: &mut NeuronPopulation, dst: &mut NeuronPopulation) {
        let dt = self.params.dt;
        for (population, tau) in [(src, self.params.tau_plus), (dst, self.params.tau_minus)] {
            let (trace, spikes) = population.trace_with_spikes();
            Zip::from(trace).and(spikes).for_each(|x, &spiked| {
                let spike = if spiked { 1.0 } else { 0.0 };
                *x += (-*x / tau + spike) * dt;
            });
        }
    }

    /// Weight change for a dense `[dst, src]` matrix.
    pub fn dense_delta(
        &self,
        pre_spikes: ArrayView1<f64>,
        pre_trace: ArrayView1<f64>,
        post_spikes: ArrayView1<f64>,
        post_trace: ArrayView1<f64>,
    ) -> Array2<f64> {
        let StdpParams { a_plus, a_minus, .. } = self.params;
        Array2::from_shape_fn((post_spikes.len(), pre_spikes.len()), |(j, i)| {
            a_plus * pre_trace[i] * post_spikes[j] - a_minus * post_trace[j] * pre_spikes[i]
        })
    }

    /// Weight change for a shared kernel: each kernel weight accumulates its
    /// pre/post coincidences over every output position it takes part in.
    pub fn conv_delta(
        &self,
        geometry: &ConvGeometry,
        pre_spikes: ArrayView1<f64>,
        pre_trace: ArrayView1<f64>,
        post_spikes: ArrayView1<f64>,
        post_trace: ArrayView1<f64>,
    ) -> Array4<f64> {
        let StdpParams { a_plus, a_minus, .. } = self.params;
        assert_eq!(
            post_spikes.len(),
            geometry.output_size(),
            "conv2d destination size does not match the kernel geometry"
        );
        let spike_field = geometry.pad_field(pre_spikes);
        let trace_field = geometry.pad_field(pre_trace);
        let (kh, kw, n_filters) = (geometry.kernel_h, geometry.kernel_w, geometry.n_filters);
        let mut delta = Array4::zeros(geometry.kernel_shape());

        for (ho, wo, p) in geometry.positions() {
            let spike_window = spike_field.slice(s![ho..ho + kh, wo..wo + kw, ..]);
            let trace_window = trace_field.slice(s![ho..ho + kh, wo..wo + kw, ..]);
            for f in 0..n_filters {
                let post = p * n_filters + f;
                let (post_spike, post_tr) = (post_spikes[post], post_trace[post]);
                if post_spike == 0.0 && post_tr == 0.0 {
                    continue;
                }
                Zip::from(delta.slice_mut(s![.., .., .., f]))
                    .and(&trace_window)
                    .and(&spike_window)
                    .for_each(|d, &x, &pre_spike| {
                        *d += a_plus * x * post_spike - a_minus * post_tr * pre_spike;
                    });
            }
        }
        delta
    }

    /// Apply `dw * dt` to the projection's weights and clamp into bounds.
    pub fn update_weights(
        &self,
        projection: &mut SynapticProjection,
        src: &NeuronPopulation,
        dst: &NeuronPopulation,
    ) {
        let (Some(pre_trace), Some(post_trace)) = (src.trace(), dst.trace()) else {
            warn!("stdp weight update skipped: traces not attached");
            return;
        };
        let pre_spikes = src.spike_activity();
        let post_spikes = dst.spike_activity();
        let bounds = *projection.bounds();
        let dt = self.params.dt;

        match projection.weights_mut() {
            Weights::Dense(w) => {
                let delta = self.dense_delta(
                    pre_spikes.view(),
                    pre_trace.view(),
                    post_spikes.view(),
                    post_trace.view(),
                );
                apply_clamped(w, &delta, dt, &bounds);
            }
            Weights::Conv2d { kernel, geometry } => {
                let delta = self.conv_delta(
                    geometry,
                    pre_spikes.view(),
                    pre_trace.view(),
                    post_spikes.view(),
                    post_trace.view(),
                );
                apply_clamped(kernel, &delta, dt, &bounds);
            }
        }
        trace!(tag = projection.tag(), mean_w = projection.weights().mean(), "stdp update");
    }
}

/// Panics when `delta` and `weights` disagree in shape.
fn apply_clamped<D: Dimension>(
    weights: &mut Array<f64, D>,
    delta: &Array<f64, D>,
    dt: f64,
    bounds: &WeightBounds,
) {
    Zip::from(weights)
        .and(delta)
        .for_each(|w, &dw| *w = bounds.clamp(*w + dw * dt));
}

impl PlasticityRule for Stdp {
    fn initialize(&mut self, src: &mut NeuronPopulation, dst: &mut NeuronPopulation) {
        src.attach_trace().fill(0.0);
        dst.attach_trace().fill(0.0);
        debug!(src = src.size(), dst = dst.size(), params = ?self.params, "stdp initialized");
    }

    fn step(
        &mut self,
        projection: &mut SynapticProjection,
        src: &mut NeuronPopulation,
        dst: &mut NeuronPopulation,
    ) {
        self.update_traces(src, dst);
        self.update_weights(projection, src, dst);
    }
}
