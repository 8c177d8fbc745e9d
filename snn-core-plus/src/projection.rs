//! Synaptic projections: a weight tensor plus hard clipping bounds.
//!
//! A projection never owns its populations. Every operation borrows the
//! source and destination for the duration of the call.

use ndarray::{Array2, Array4, ArrayView, ArrayViewD, ArrayViewMutD, Dimension};
use rand::Rng;
use tracing::{debug, trace};

use snn_core::{NeuronPopulation, SnnError, SnnResult};

use crate::conv::ConvGeometry;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WeightBounds {
    pub w_min: f64,
    pub w_max: f64,
}

impl Default for WeightBounds {
    fn default() -> Self {
        Self { w_min: 0.0, w_max: 1.0 }
    }
}

impl WeightBounds {
    pub fn new(w_min: f64, w_max: f64) -> SnnResult<Self> {
        let bounds = Self { w_min, w_max };
        bounds.validate()?;
        Ok(bounds)
    }

    pub fn validate(&self) -> SnnResult<()> {
        if !self.w_min.is_finite() || !self.w_max.is_finite() || self.w_min > self.w_max {
            return Err(SnnError::InvalidWeightBounds {
                w_min: self.w_min,
                w_max: self.w_max,
            });
        }
        Ok(())
    }

    #[inline]
    pub fn clamp(&self, w: f64) -> f64 {
        w.max(self.w_min).min(self.w_max)
    }

    pub fn contains(&self, w: f64) -> bool {
        w >= self.w_min && w <= self.w_max
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DenseConfig {
    pub bounds: WeightBounds,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Conv2dConfig {
    pub bounds: WeightBounds,
    pub kernel_size: (usize, usize),
    pub n_filters: usize,
    /// Pad by `kernel_size / 2` on each side
    pub padding: bool,
    /// Inferred from the source size when `None`
    pub channels_in: Option<usize>,
}

impl Default for Conv2dConfig {
    fn default() -> Self {
        Self {
            bounds: WeightBounds::default(),
            kernel_size: (3, 3),
            n_filters: 1,
            padding: false,
            channels_in: None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Weights {
    /// `[dst.size, src.size]`
    Dense(Array2<f64>),
    /// `[kernel_h, kernel_w, channels_in, n_filters]`
    Conv2d {
        kernel: Array4<f64>,
        geometry: ConvGeometry,
    },
}

impl Weights {
    pub fn view(&self) -> ArrayViewD<'_, f64> {
        match self {
            Weights::Dense(w) => w.view().into_dyn(),
            Weights::Conv2d { kernel, .. } => kernel.view().into_dyn(),
        }
    }

    pub fn view_mut(&mut self) -> ArrayViewMutD<'_, f64> {
        match self {
            Weights::Dense(w) => w.view_mut().into_dyn(),
            Weights::Conv2d { kernel, .. } => kernel.view_mut().into_dyn(),
        }
    }

    pub fn len(&self) -> usize {
        self.view().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn mean(&self) -> f64 {
        self.view().mean().unwrap_or(0.0)
    }
}

#[derive(Debug, Clone)]
pub struct SynapticProjection {
    weights: Weights,
    bounds: WeightBounds,
}

impl SynapticProjection {
    /// All-to-all projection with weights drawn uniformly from the bounds.
    pub fn dense<R: Rng>(
        config: &DenseConfig,
        src: &NeuronPopulation,
        dst: &NeuronPopulation,
        rng: &mut R,
    ) -> SnnResult<Self> {
        config.bounds.validate()?;
        let bounds = config.bounds;
        let shape = (dst.size(), src.size());
        let w = Array2::from_shape_fn(shape, |_| rng.gen_range(bounds.w_min..=bounds.w_max));
        debug!(dst = shape.0, src = shape.1, "dense projection initialized");

        Ok(Self {
            weights: Weights::Dense(w),
            bounds,
        })
    }

    /// Weight-shared 2-D convolution over a square source layout.
    pub fn conv2d<R: Rng>(
        config: &Conv2dConfig,
        src: &NeuronPopulation,
        dst: &NeuronPopulation,
        rng: &mut R,
    ) -> SnnResult<Self> {
        config.bounds.validate()?;
        let geometry = ConvGeometry::infer(
            src.size(),
            config.kernel_size,
            config.n_filters,
            config.padding,
            config.channels_in,
        )?;
        if dst.size() != geometry.output_size() {
            return Err(SnnError::ShapeMismatch {
                what: "conv2d destination",
                expected: geometry.output_size(),
                actual: dst.size(),
            });
        }

        let bounds = config.bounds;
        let kernel = Array4::from_shape_fn(geometry.kernel_shape(), |_| {
            rng.gen_range(bounds.w_min..=bounds.w_max)
        });
        debug!(?geometry, "conv2d projection initialized");

        Ok(Self {
            weights: Weights::Conv2d { kernel, geometry },
            bounds,
        })
    }

    pub fn tag(&self) -> &'static str {
        match self.weights {
            Weights::Dense(_) => "dense",
            Weights::Conv2d { .. } => "conv2d",
        }
    }

    pub fn weights(&self) -> &Weights {
        &self.weights
    }

    #[cfg(feature = "plasticity")]
    pub(crate) fn weights_mut(&mut self) -> &mut Weights {
        &mut self.weights
    }

    /// Overwrite the weight tensor in place. The shape is fixed at
    /// construction; values are taken as given, without clipping.
    pub fn set_weights<D: Dimension>(&mut self, values: ArrayView<'_, f64, D>) -> SnnResult<()> {
        let mut target = self.weights.view_mut();
        if target.len() != values.len() {
            return Err(SnnError::ShapeMismatch {
                what: "projection weights",
                expected: target.len(),
                actual: values.len(),
            });
        }
        if target.shape() != values.shape() {
            return Err(SnnError::InvalidGeometry("weight tensor shape differs from the projection"));
        }
        target.assign(&values.into_dyn());
        Ok(())
    }

    pub fn bounds(&self) -> &WeightBounds {
        &self.bounds
    }

    pub fn geometry(&self) -> Option<&ConvGeometry> {
        match &self.weights {
            Weights::Conv2d { geometry, .. } => Some(geometry),
            Weights::Dense(_) => None,
        }
    }

    /// Accumulate the current produced by `src`'s spikes into `dst`'s input.
    pub fn forward(&self, src: &NeuronPopulation, dst: &mut NeuronPopulation) {
        let activity = src.spike_activity();
        let current = match &self.weights {
            Weights::Dense(w) => w.dot(&activity),
            Weights::Conv2d { kernel, geometry } => geometry.forward(activity.view(), kernel.view()),
        };
        assert_eq!(current.len(), dst.size(), "projected current does not match the destination");
        *dst.input_mut() += &current;
        trace!(tag = self.tag(), active = src.spike_count(), "projection forward");
    }

    /// Re-clamp every weight into the bounds.
    pub fn clip_weights(&mut self) {
        let bounds = self.bounds;
        match &mut self.weights {
            Weights::Dense(w) => w.mapv_inplace(|x| bounds.clamp(x)),
            Weights::Conv2d { kernel, .. } => kernel.mapv_inplace(|x| bounds.clamp(x)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use snn_core::NeuronConfig;

    fn pop(size: usize) -> NeuronPopulation {
        NeuronPopulation::new(size, NeuronConfig::default()).unwrap()
    }

    #[test]
    fn test_bounds_validation() {
        assert!(WeightBounds::new(0.0, 1.0).is_ok());
        assert!(WeightBounds::new(0.5, 0.5).is_ok());
        assert!(matches!(
            WeightBounds::new(1.0, 0.0),
            Err(SnnError::InvalidWeightBounds { .. })
        ));
        assert!(WeightBounds::new(f64::NAN, 1.0).is_err());
        let b = WeightBounds::default();
        assert_eq!(b.clamp(2.0), 1.0);
        assert_eq!(b.clamp(-2.0), 0.0);
        assert_eq!(b.clamp(0.3), 0.3);
    }

    #[test]
    fn test_dense_init_within_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        let (src, dst) = (pop(5), pop(3));
        let config = DenseConfig {
            bounds: WeightBounds::new(-0.5, 2.0).unwrap(),
        };
        let proj = SynapticProjection::dense(&config, &src, &dst, &mut rng).unwrap();
        assert_eq!(proj.tag(), "dense");
        assert!(proj.geometry().is_none());
        match proj.weights() {
            Weights::Dense(w) => assert_eq!(w.dim(), (3, 5)),
            _ => panic!("expected dense weights"),
        }
        assert!(proj.weights().view().iter().all(|&w| proj.bounds().contains(w)));
    }

    #[test]
    fn test_dense_init_rejects_inverted_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        let config = DenseConfig {
            bounds: WeightBounds { w_min: 1.0, w_max: 0.0 },
        };
        assert!(SynapticProjection::dense(&config, &pop(2), &pop(2), &mut rng).is_err());
    }

    #[test]
    fn test_conv_init_shapes() {
        let mut rng = StdRng::seed_from_u64(1);
        let config = Conv2dConfig {
            n_filters: 2,
            ..Default::default()
        };
        let proj = SynapticProjection::conv2d(&config, &pop(36), &pop(32), &mut rng).unwrap();
        assert_eq!(proj.tag(), "conv2d");
        match proj.weights() {
            Weights::Conv2d { kernel, .. } => assert_eq!(kernel.dim(), (3, 3, 1, 2)),
            _ => panic!("expected conv weights"),
        }
        assert_eq!(proj.weights().len(), 18);
        assert!(proj.weights().view().iter().all(|&w| proj.bounds().contains(w)));
    }

    #[test]
    fn test_conv_init_rejects_wrong_destination() {
        let mut rng = StdRng::seed_from_u64(1);
        let err = SynapticProjection::conv2d(&Conv2dConfig::default(), &pop(36), &pop(10), &mut rng)
            .unwrap_err();
        assert_eq!(
            err,
            SnnError::ShapeMismatch {
                what: "conv2d destination",
                expected: 16,
                actual: 10
            }
        );
    }

    #[test]
    fn test_dense_forward_accumulates() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut src = pop(2);
        let mut dst = pop(2);
        let mut proj = SynapticProjection::dense(&DenseConfig::default(), &src, &dst, &mut rng).unwrap();
        proj.set_weights(array![[0.25, 0.5], [0.75, 1.0]].view()).unwrap();

        src.spikes_mut()[1] = true;
        dst.fill_input(1.0);
        proj.forward(&src, &mut dst);
        assert_eq!(dst.input(), &array![1.5, 2.0]);
    }

    #[test]
    fn test_conv_forward_unit_kernel() {
        let mut rng = StdRng::seed_from_u64(3);
        let config = Conv2dConfig {
            bounds: WeightBounds::new(0.75, 0.75).unwrap(),
            kernel_size: (1, 1),
            ..Default::default()
        };
        let mut src = pop(4);
        let mut dst = pop(4);
        let proj = SynapticProjection::conv2d(&config, &src, &dst, &mut rng).unwrap();
        src.spikes_mut()[0] = true;
        src.spikes_mut()[3] = true;
        proj.forward(&src, &mut dst);
        assert_eq!(dst.input(), &array![0.75, 0.0, 0.0, 0.75]);
    }

    #[test]
    fn test_set_weights_keeps_shape() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut proj = SynapticProjection::conv2d(&Conv2dConfig::default(), &pop(16), &pop(4), &mut rng)
            .unwrap();
        let kernel = Array4::from_elem((3, 3, 1, 1), 0.5);
        proj.set_weights(kernel.view()).unwrap();
        assert_eq!(proj.weights().mean(), 0.5);

        // same element count, different layout
        assert_eq!(
            proj.set_weights(Array2::<f64>::zeros((9, 1)).view()),
            Err(SnnError::InvalidGeometry("weight tensor shape differs from the projection"))
        );
        assert!(matches!(
            proj.set_weights(Array4::<f64>::zeros((3, 3, 1, 2)).view()),
            Err(SnnError::ShapeMismatch { expected: 9, actual: 18, .. })
        ));
        assert_eq!(proj.geometry().unwrap().kernel_shape(), (3, 3, 1, 1));
        assert_eq!(proj.weights().mean(), 0.5);
    }

    #[test]
    #[should_panic(expected = "does not match the destination")]
    fn test_forward_rejects_mismatched_destination() {
        let mut rng = StdRng::seed_from_u64(6);
        let mut src = pop(2);
        let proj = SynapticProjection::dense(&DenseConfig::default(), &src, &pop(1), &mut rng).unwrap();
        src.spikes_mut().fill(true);
        // a single-row current must not broadcast over a wider population
        proj.forward(&src, &mut pop(5));
    }

    #[test]
    fn test_clip_weights() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut proj =
            SynapticProjection::dense(&DenseConfig::default(), &pop(2), &pop(1), &mut rng).unwrap();
        proj.set_weights(array![[-3.0, 3.0]].view()).unwrap();
        proj.clip_weights();
        assert_eq!(proj.weights().view().iter().copied().collect::<Vec<_>>(), vec![0.0, 1.0]);
    }
}
