//! Fixed-size neuron population with per-tick integrate / detect / reset.
//!
//! Tick order (identical for every variant):
//! 1. dv from the current `v`, `input` and adaptation
//! 2. `v += dv * dt / tau`
//! 3. `spikes = v >= threshold`
//! 4. `v = v_reset` where spiking
//! 5. adaptive only: adaptation update from the end-of-tick `v` and this tick's spikes
//!
//! A spiking neuron therefore always ends its tick at exactly `v_reset`.

use ndarray::{Array1, ArrayView1, Zip};
use tracing::{debug, trace};

use crate::error::{SnnError, SnnResult};
use crate::neuron::{NeuronConfig, NeuronModel};

#[derive(Debug, Clone)]
pub struct NeuronPopulation {
    model: NeuronModel,
    dt: f64,
    v: Array1<f64>,
    input: Array1<f64>,
    spikes: Array1<bool>,
    // Present only once a plasticity rule is attached
    trace: Option<Array1<f64>>,
    // Present only for the adaptive variant
    adaptation: Option<Array1<f64>>,
}

impl NeuronPopulation {
    /// Validate `config` and allocate the population at rest.
    pub fn new(size: usize, config: NeuronConfig) -> SnnResult<Self> {
        if size == 0 {
            return Err(SnnError::InvalidGeometry("population size must be positive"));
        }
        config.validate()?;

        let model = config.model;
        let adaptation = model.is_adaptive().then(|| Array1::zeros(size));
        debug!(size, tag = model.tag(), dt = config.dt, "population initialized");

        Ok(Self {
            model,
            dt: config.dt,
            v: Array1::from_elem(size, model.lif().v_rest),
            input: Array1::zeros(size),
            spikes: Array1::from_elem(size, false),
            trace: None,
            adaptation,
        })
    }

    /// Advance every neuron by one tick.
    pub fn step(&mut self) {
        let model = self.model;
        let lif = *model.lif();
        let dt = self.dt;

        let integrate = |v: &mut f64, spiked: &mut bool, input: f64, adaptation: f64| {
            let dv = model.derivative(*v, input, adaptation);
            *v += dv * dt / lif.tau;
            *spiked = *v >= lif.threshold;
            if *spiked {
                *v = lif.v_reset;
            }
        };

        match (&model, self.adaptation.as_mut()) {
            (NeuronModel::Adaptive(params), Some(adaptation)) => {
                Zip::from(&mut self.v)
                    .and(&mut self.spikes)
                    .and(&self.input)
                    .and(adaptation)
                    .for_each(|v, spiked, &input, a| {
                        integrate(v, spiked, input, *a);
                        *a = params.adaptation(*v, *spiked, *a);
                    });
            }
            _ => {
                Zip::from(&mut self.v)
                    .and(&mut self.spikes)
                    .and(&self.input)
                    .for_each(|v, spiked, &input| integrate(v, spiked, input, 0.0));
            }
        }

        trace!(tag = model.tag(), spikes = self.spike_count(), "population step");
    }

    pub fn size(&self) -> usize {
        self.v.len()
    }

    pub fn model(&self) -> &NeuronModel {
        &self.model
    }

    pub fn tag(&self) -> &'static str {
        self.model.tag()
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn v(&self) -> &Array1<f64> {
        &self.v
    }

    pub fn input(&self) -> &Array1<f64> {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut Array1<f64> {
        &mut self.input
    }

    /// Overwrite the input current.
    pub fn set_input(&mut self, current: ArrayView1<f64>) -> SnnResult<()> {
        self.check_len("input current", current.len())?;
        self.input.assign(&current);
        Ok(())
    }

    /// Accumulate into the input current.
    pub fn add_input(&mut self, current: ArrayView1<f64>) -> SnnResult<()> {
        self.check_len("input current", current.len())?;
        self.input += &current;
        Ok(())
    }

    pub fn fill_input(&mut self, value: f64) {
        self.input.fill(value);
    }

    pub fn clear_input(&mut self) {
        self.input.fill(0.0);
    }

    pub fn spikes(&self) -> &Array1<bool> {
        &self.spikes
    }

    pub fn spikes_mut(&mut self) -> &mut Array1<bool> {
        &mut self.spikes
    }

    /// Spikes as 0/1 activity.
    pub fn spike_activity(&self) -> Array1<f64> {
        self.spikes.mapv(|s| if s { 1.0 } else { 0.0 })
    }

    pub fn spike_count(&self) -> usize {
        self.spikes.iter().filter(|&&s| s).count()
    }

    pub fn spike_indices(&self) -> Vec<usize> {
        self.spikes
            .iter()
            .enumerate()
            .filter_map(|(i, &s)| s.then_some(i))
            .collect()
    }

    pub fn trace(&self) -> Option<&Array1<f64>> {
        self.trace.as_ref()
    }

    /// Allocate a zeroed trace if none exists yet and return it.
    pub fn attach_trace(&mut self) -> &mut Array1<f64> {
        let size = self.size();
        self.trace.get_or_insert_with(|| Array1::zeros(size))
    }

    /// Trace (allocated on demand) alongside this tick's spikes.
    pub fn trace_with_spikes(&mut self) -> (&mut Array1<f64>, &Array1<bool>) {
        let size = self.v.len();
        let trace = self.trace.get_or_insert_with(|| Array1::zeros(size));
        (trace, &self.spikes)
    }

    pub fn adaptation(&self) -> Option<&Array1<f64>> {
        self.adaptation.as_ref()
    }

    /// Zero-filled vector of the population's size.
    pub fn zeros(&self) -> Array1<f64> {
        Array1::zeros(self.size())
    }

    /// One-filled vector of the population's size.
    pub fn ones(&self) -> Array1<f64> {
        Array1::ones(self.size())
    }

    fn check_len(&self, what: &'static str, actual: usize) -> SnnResult<()> {
        if actual == self.size() {
            Ok(())
        } else {
            Err(SnnError::ShapeMismatch {
                what,
                expected: self.size(),
                actual,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neuron::{AdaptiveParams, ExponentialParams, LifParams};
    use ndarray::array;

    fn all_models() -> Vec<NeuronModel> {
        vec![
            NeuronModel::Lif(LifParams::default()),
            NeuronModel::Exponential(ExponentialParams::default()),
            NeuronModel::Adaptive(AdaptiveParams::default()),
        ]
    }

    #[test]
    fn test_initial_state() {
        for model in all_models() {
            for n in [1, 10, 100, 10000] {
                let pop = NeuronPopulation::new(n, NeuronConfig::new(model)).unwrap();
                assert_eq!(pop.size(), n);
                assert!(pop.v().iter().all(|&v| v == model.lif().v_rest));
                assert!(pop.spikes().iter().all(|&s| !s));
                assert!(pop.input().iter().all(|&i| i == 0.0));
                assert!(pop.trace().is_none());
                assert_eq!(pop.adaptation().is_some(), model.is_adaptive());
                assert_eq!(pop.tag(), model.tag());
            }
        }
    }

    #[test]
    fn test_rejects_empty_and_invalid() {
        assert!(NeuronPopulation::new(0, NeuronConfig::default()).is_err());
        let mut lif = LifParams::default();
        lif.tau = -1.0;
        assert!(NeuronPopulation::new(4, NeuronConfig::new(NeuronModel::Lif(lif))).is_err());
    }

    #[test]
    fn test_quiescent_lif_stays_at_rest() {
        let mut pop = NeuronPopulation::new(16, NeuronConfig::default()).unwrap();
        for _ in 0..100 {
            pop.step();
            assert!(pop.v().iter().all(|&v| v == -65.0));
            assert_eq!(pop.spike_count(), 0);
        }
    }

    #[test]
    fn test_periodic_firing() {
        let mut pop = NeuronPopulation::new(1, NeuronConfig::default()).unwrap();
        pop.fill_input(80.0);

        pop.step();
        assert_eq!(pop.v()[0], -57.0);
        assert!(!pop.spikes()[0]);

        pop.step();
        assert_eq!(pop.v()[0], -65.0);
        assert!(pop.spikes()[0]);

        pop.step();
        assert_eq!(pop.v()[0], -57.0);
        assert!(!pop.spikes()[0]);

        pop.step();
        assert_eq!(pop.v()[0], -65.0);
        assert!(pop.spikes()[0]);
    }

    #[test]
    fn test_spiking_neurons_end_at_reset() {
        for model in all_models() {
            let mut pop = NeuronPopulation::new(5, NeuronConfig::new(model)).unwrap();
            pop.set_input(array![0.0, 5.0, 12.0, 40.0, 200.0].view()).unwrap();
            for _ in 0..50 {
                pop.step();
                let reset = model.lif().v_reset;
                for (v, s) in pop.v().iter().zip(pop.spikes().iter()) {
                    if *s {
                        assert_eq!(*v, reset);
                    }
                }
            }
        }
    }

    #[test]
    fn test_dt_scales_integration() {
        let mut pop = NeuronPopulation::new(1, NeuronConfig::default().with_dt(0.5)).unwrap();
        pop.fill_input(20.0);
        pop.step();
        // dv = 20, dv * dt / tau = 1
        assert_eq!(pop.v()[0], -64.0);
    }

    #[test]
    fn test_exponential_drifts_above_rest() {
        let mut pop = NeuronPopulation::new(
            1,
            NeuronConfig::new(NeuronModel::Exponential(ExponentialParams::default())),
        )
        .unwrap();
        pop.step();
        assert!(pop.v()[0] > -65.0);
    }

    #[test]
    fn test_adaptation_grows_on_spike() {
        let params = AdaptiveParams::default();
        let mut pop =
            NeuronPopulation::new(1, NeuronConfig::new(NeuronModel::Adaptive(params))).unwrap();
        pop.fill_input(500.0);
        pop.step();
        assert!(pop.spikes()[0]);
        // at v_reset == v_rest with a spike and A == 0: A = beta
        assert!((pop.adaptation().unwrap()[0] - params.beta).abs() < 1e-12);
    }

    #[test]
    fn test_input_helpers() {
        let mut pop = NeuronPopulation::new(3, NeuronConfig::default()).unwrap();
        assert!(pop.set_input(array![1.0, 2.0].view()).is_err());
        pop.set_input(array![1.0, 2.0, 3.0].view()).unwrap();
        pop.add_input(pop.ones().view()).unwrap();
        assert_eq!(pop.input(), &array![2.0, 3.0, 4.0]);
        pop.clear_input();
        assert_eq!(pop.input(), &pop.zeros());
    }

    #[test]
    fn test_trace_attach_and_spike_views() {
        let mut pop = NeuronPopulation::new(4, NeuronConfig::default()).unwrap();
        assert!(pop.attach_trace().iter().all(|&t| t == 0.0));
        pop.attach_trace()[1] = 0.5;
        // attaching again keeps existing state
        assert_eq!(pop.attach_trace()[1], 0.5);

        pop.spikes_mut()[2] = true;
        assert_eq!(pop.spike_indices(), vec![2]);
        assert_eq!(pop.spike_activity(), array![0.0, 0.0, 1.0, 0.0]);
    }
}
