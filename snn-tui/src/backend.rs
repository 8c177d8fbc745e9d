// Backend abstraction for the TUI so we can swap different network hosts.

use ndarray::Array1;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use snn_core::{AdaptiveParams, NeuronConfig, NeuronModel, NeuronPopulation, SnnResult};
use snn_core_plus::{Conv2dConfig, SynapticProjection, WeightBounds};

/// Common interface for any SNN host that can drive the TUI.
pub trait SnnBackend {
    /// Advance the network by one tick and return the raster rows that spiked.
    fn step(&mut self) -> Vec<usize>;
    /// Number of raster rows (neurons across all populations).
    fn neurons(&self) -> usize;
    /// Row label shown left of the raster.
    fn label(&self, row: usize) -> String {
        format!("n{:02}", row)
    }
    /// Mean synaptic weight, for the status line.
    fn mean_weight(&self) -> f64 {
        0.0
    }

    /// Optional plasticity controls (feature-gated); default no-ops/reports disabled.
    #[cfg(feature = "plasticity")]
    fn enable_default_plasticity(&mut self) {}

    #[cfg(feature = "plasticity")]
    fn plasticity_enabled(&self) -> bool {
        false
    }
}

const SIDE: usize = 6;
const KERNEL: (usize, usize) = (3, 3);
const FILTERS: usize = 2;

/// A 6x6 LIF sheet driven by fixed random currents, projecting through a
/// shared 3x3 kernel bank onto an adaptive (AELIF) layer.
pub struct CoreBackend {
    src: NeuronPopulation,
    dst: NeuronPopulation,
    projection: SynapticProjection,
    #[cfg(feature = "plasticity")]
    plasticity: Option<Box<dyn snn_core_plus::PlasticityRule>>,
}

impl CoreBackend {
    pub fn new(seed: u64) -> SnnResult<Self> {
        let mut rng = StdRng::seed_from_u64(seed);

        let mut src = NeuronPopulation::new(SIDE * SIDE, NeuronConfig::default())?;
        let drive = Array1::from_shape_fn(src.size(), |_| rng.gen_range(4.0..24.0));
        src.set_input(drive.view())?;

        let out_side = SIDE - KERNEL.0 + 1;
        let dst = NeuronPopulation::new(
            out_side * out_side * FILTERS,
            NeuronConfig::new(NeuronModel::Adaptive(AdaptiveParams::default())),
        )?;

        let config = Conv2dConfig {
            bounds: WeightBounds::new(0.0, 6.0)?,
            kernel_size: KERNEL,
            n_filters: FILTERS,
            padding: false,
            channels_in: None,
        };
        let projection = SynapticProjection::conv2d(&config, &src, &dst, &mut rng)?;

        Ok(Self {
            src,
            dst,
            projection,
            #[cfg(feature = "plasticity")]
            plasticity: None,
        })
    }
}

impl SnnBackend for CoreBackend {
    fn step(&mut self) -> Vec<usize> {
        // dynamics, then projection, then plasticity
        self.src.step();
        self.dst.step();
        self.dst.clear_input();
        self.projection.forward(&self.src, &mut self.dst);

        #[cfg(feature = "plasticity")]
        if let Some(rule) = self.plasticity.as_mut() {
            rule.step(&mut self.projection, &mut self.src, &mut self.dst);
        }

        let offset = self.src.size();
        self.src
            .spike_indices()
            .into_iter()
            .chain(self.dst.spike_indices().into_iter().map(|i| i + offset))
            .collect()
    }

    fn neurons(&self) -> usize {
        self.src.size() + self.dst.size()
    }

    fn label(&self, row: usize) -> String {
        if row < self.src.size() {
            format!("s{:02}", row)
        } else {
            format!("d{:02}", row - self.src.size())
        }
    }

    fn mean_weight(&self) -> f64 {
        self.projection.weights().mean()
    }

    #[cfg(feature = "plasticity")]
    fn enable_default_plasticity(&mut self) {
        if self.plasticity.is_none() {
            let mut rule = snn_core_plus::Stdp::with_defaults();
            snn_core_plus::PlasticityRule::initialize(&mut rule, &mut self.src, &mut self.dst);
            self.plasticity = Some(Box::new(rule));
        }
    }

    #[cfg(feature = "plasticity")]
    fn plasticity_enabled(&self) -> bool {
        self.plasticity.is_some()
    }
}
