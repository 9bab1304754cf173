use std::time::{Duration, Instant};

use itertools::izip;
use ndarray::Array3;
use rand::{rngs::StdRng, Rng, SeedableRng};
use rayon::prelude::*;
use tracing::{debug, trace};

use crate::{
    error::{Result, VariographyError},
    simulation::{Padding, SimulationRequest, Simulator},
    spatial_database::lattice::{LatticeGeometry, LatticePoint},
    variography::model_variograms::VariogramModel,
};

use super::{convergence::ConvergenceTracker, reference_points::ReferenceStrategy};

/// Upper bound on the number of resolution bins
pub const MAX_RESOLUTION_BINS: usize = 1 << 24;

/// Fixed-width distance bins centered on multiples of the resolution.
///
/// Bin `k` holds distances in `[(k - 1/2) * res, (k + 1/2) * res)` and spans the whole
/// lattice, so every reference point shares the same bins.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionBins {
    resolution: f64,
    midpoints: Vec<f64>,
}

impl ResolutionBins {
    pub fn new(lattice: &LatticeGeometry, resolution: f64) -> Result<Self> {
        if !(resolution.is_finite() && resolution > 0.0) {
            return Err(VariographyError::InvalidArgument(format!(
                "resolution must be positive, got {}",
                resolution
            )));
        }
        let last_bin = (lattice.max_distance() / resolution).round();
        if !(last_bin < MAX_RESOLUTION_BINS as f64) {
            return Err(VariographyError::InvalidArgument(format!(
                "resolution {} gives more than {} bins over a max distance of {}",
                resolution,
                MAX_RESOLUTION_BINS,
                lattice.max_distance()
            )));
        }
        let n_bins = last_bin as usize + 1;
        let midpoints = (0..n_bins).map(|k| k as f64 * resolution).collect();
        Ok(Self {
            resolution,
            midpoints,
        })
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    pub fn midpoints(&self) -> &[f64] {
        &self.midpoints
    }

    pub fn len(&self) -> usize {
        self.midpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.midpoints.is_empty()
    }

    /// Bin holding distance `d`
    pub fn bin_of(&self, d: f64) -> usize {
        ((d / self.resolution).round() as usize).min(self.midpoints.len() - 1)
    }
}

/// Wall clock time spent per iteration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimingDiagnostics {
    pub simulation: Vec<Duration>,
    pub estimation: Vec<Duration>,
}

impl TimingDiagnostics {
    pub fn total_simulation(&self) -> Duration {
        self.simulation.iter().sum()
    }

    pub fn total_estimation(&self) -> Duration {
        self.estimation.iter().sum()
    }
}

/// Result of a Monte-Carlo estimation run.
///
/// `mean` holds NaN for bins that never received a sample; filter those before any further
/// numeric processing.
#[derive(Debug, Clone)]
pub struct VariogramEstimate {
    pub midpoints: Vec<f64>,
    pub mean: Vec<f64>,
    /// Number of (iteration, reference point) pairs that contributed to each bin
    pub sample_counts: Vec<usize>,
    pub timing: TimingDiagnostics,
    pub convergence: ConvergenceTracker,
    /// Field of the final iteration
    pub last_realization: Option<Array3<f64>>,
}

/// Monte-Carlo empirical variogram of an unconditional simulator.
///
/// Every iteration asks the simulator for one realization, averages the squared increments
/// between each reference cell and all other cells per distance bin and turns the mean `m`
/// into `1 - m / 2`. For a unit variance field this converges to the correlation at the bin
/// distance. Estimates are averaged over reference points and then over iterations.
pub struct EmpiricalVariogram<V, S> {
    variogram: V,
    lattice: LatticeGeometry,
    padding: Padding,
    smoothing: Option<[f64; 3]>,
    simulator: S,
}

impl<V, S> EmpiricalVariogram<V, S>
where
    V: VariogramModel,
    S: Simulator,
{
    /// Create a new estimator
    /// # Arguments
    /// * `variogram` - Model handed to the simulator
    /// * `lattice` - Lattice the field is simulated on
    /// * `padding` - Padding forwarded to the simulator
    /// * `simulator` - Source of realizations
    pub fn new(variogram: V, lattice: LatticeGeometry, padding: Padding, simulator: S) -> Self {
        Self {
            variogram,
            lattice,
            padding,
            smoothing: None,
            simulator,
        }
    }

    pub fn with_smoothing(mut self, smoothing: [f64; 3]) -> Self {
        self.smoothing = Some(smoothing);
        self
    }

    pub fn variogram(&self) -> &V {
        &self.variogram
    }

    pub fn lattice(&self) -> &LatticeGeometry {
        &self.lattice
    }

    pub fn padding(&self) -> Padding {
        self.padding
    }

    pub fn simulator(&self) -> &S {
        &self.simulator
    }

    pub fn pick_reference_points(&self, strategy: ReferenceStrategy) -> Result<Vec<LatticePoint>> {
        strategy.pick(&self.lattice)
    }

    /// Bin midpoints for `resolution`
    pub fn find_midpoints(&self, resolution: f64) -> Result<Vec<f64>> {
        Ok(ResolutionBins::new(&self.lattice, resolution)?.midpoints)
    }

    /// Bin midpoints and the model correlation at each of them.
    ///
    /// Only meaningful for isotropic models: the correlation is evaluated along the first
    /// principal axis.
    pub fn true_variogram(&self, resolution: f64) -> Result<(Vec<f64>, Vec<f64>)> {
        let bins = ResolutionBins::new(&self.lattice, resolution)?;
        let corr = self.corr_at(&bins);
        Ok((bins.midpoints, corr))
    }

    fn corr_at(&self, bins: &ResolutionBins) -> Vec<f64> {
        bins.midpoints()
            .iter()
            .map(|&h| self.variogram.corr(h))
            .collect()
    }

    fn check_reference_points(&self, reference_points: &[LatticePoint]) -> Result<()> {
        match reference_points.iter().find(|p| !self.lattice.contains(p)) {
            Some(p) => Err(VariographyError::PreconditionViolation(format!(
                "reference point {:?} is not on the {:?} lattice",
                p,
                self.lattice.shape()
            ))),
            None => Ok(()),
        }
    }

    /// Run a Monte-Carlo estimation.
    /// # Arguments
    /// * `iterations` - Number of realizations
    /// * `resolution` - Width of the distance bins
    /// * `reference_points` - Cells increments are measured from
    /// * `analyze_convergence` - Record the deviation from the model every this many
    ///   iterations, 0 disables tracking
    /// * `rng` - One seed per iteration is drawn from this generator before the first
    ///   iteration starts
    pub fn estimate_variogram(
        &mut self,
        iterations: usize,
        resolution: f64,
        reference_points: &[LatticePoint],
        analyze_convergence: usize,
        rng: &mut StdRng,
    ) -> Result<VariogramEstimate> {
        let bins = ResolutionBins::new(&self.lattice, resolution)?;
        self.check_reference_points(reference_points)?;
        let seeds = iteration_seeds(rng, iterations);

        let mut accumulator =
            EstimateAccumulator::new(&bins, self.corr_at(&bins), analyze_convergence);
        let kernel = IterationKernel {
            lattice: &self.lattice,
            request: SimulationRequest {
                lattice: &self.lattice,
                padding: self.padding,
                smoothing: self.smoothing,
            },
            variogram: &self.variogram,
            bins: &bins,
            reference_points,
        };

        for (iteration, seed) in seeds.into_iter().enumerate() {
            let sample = kernel.run(&mut self.simulator, seed, iteration + 1 == iterations)?;
            accumulator.feed(iteration, sample);
        }

        Ok(accumulator.finish(iterations, bins))
    }

    /// Same as [`EmpiricalVariogram::estimate_variogram`] with iterations spread over the
    /// rayon pool. Each worker simulates with its own clone of the simulator; results are
    /// identical to the sequential run for the same generator state.
    pub fn par_estimate_variogram(
        &self,
        iterations: usize,
        resolution: f64,
        reference_points: &[LatticePoint],
        analyze_convergence: usize,
        rng: &mut StdRng,
    ) -> Result<VariogramEstimate>
    where
        V: Sync,
        S: Clone + Send,
    {
        let bins = ResolutionBins::new(&self.lattice, resolution)?;
        self.check_reference_points(reference_points)?;
        let seeds = iteration_seeds(rng, iterations);

        let kernel = IterationKernel {
            lattice: &self.lattice,
            request: SimulationRequest {
                lattice: &self.lattice,
                padding: self.padding,
                smoothing: self.smoothing,
            },
            variogram: &self.variogram,
            bins: &bins,
            reference_points,
        };

        let samples = seeds
            .par_iter()
            .enumerate()
            .map_with(self.simulator.clone(), |simulator, (iteration, seed)| {
                kernel.run(simulator, *seed, iteration + 1 == iterations)
            })
            .collect::<Result<Vec<_>>>()?;

        let mut accumulator =
            EstimateAccumulator::new(&bins, self.corr_at(&bins), analyze_convergence);
        for (iteration, sample) in samples.into_iter().enumerate() {
            accumulator.feed(iteration, sample);
        }

        Ok(accumulator.finish(iterations, bins))
    }
}

pub(crate) fn iteration_seeds(rng: &mut StdRng, iterations: usize) -> Vec<u64> {
    (0..iterations).map(|_| rng.gen()).collect()
}

struct IterationSample {
    mean: Vec<f64>,
    counts: Vec<usize>,
    simulation_time: Duration,
    estimation_time: Duration,
    realization: Option<Array3<f64>>,
}

/// Work shared by the sequential and parallel loops
struct IterationKernel<'a, V> {
    lattice: &'a LatticeGeometry,
    request: SimulationRequest<'a>,
    variogram: &'a V,
    bins: &'a ResolutionBins,
    reference_points: &'a [LatticePoint],
}

impl<'a, V: VariogramModel> IterationKernel<'a, V> {
    fn run<S: Simulator>(
        &self,
        simulator: &mut S,
        seed: u64,
        keep_realization: bool,
    ) -> Result<IterationSample> {
        let mut rng = StdRng::seed_from_u64(seed);

        let start = Instant::now();
        let values = simulator
            .simulate(self.variogram, &self.request, &mut rng)
            .map_err(VariographyError::simulation)?;
        let simulation_time = start.elapsed();

        let start = Instant::now();
        let field = self.lattice.reshape_realization(values)?;

        let n_bins = self.bins.len();
        let mut estimate_sum = vec![0.0; n_bins];
        let mut counts = vec![0usize; n_bins];
        let mut squared_sum = vec![0.0; n_bins];
        let mut members = vec![0usize; n_bins];

        for reference in self.reference_points {
            squared_sum.fill(0.0);
            members.fill(0);

            let reference_value = field[*reference];
            let reference_point = self.lattice.ind_to_point(reference);
            for (ind, point) in izip!(self.lattice.indexes(), self.lattice.points()) {
                let bin = self
                    .bins
                    .bin_of(nalgebra::distance(&reference_point, point));
                let increment = field[*ind] - reference_value;
                squared_sum[bin] += increment * increment;
                members[bin] += 1;
            }

            for (bin, (sum, n)) in squared_sum.iter().zip(members.iter()).enumerate() {
                if *n == 0 {
                    continue;
                }
                let m = sum / *n as f64;
                estimate_sum[bin] += 1.0 - m / 2.0;
                counts[bin] += 1;
            }
        }

        //0 / 0 leaves NaN in bins no reference point reached
        let mean = estimate_sum
            .iter()
            .zip(counts.iter())
            .map(|(sum, n)| sum / *n as f64)
            .collect();
        let estimation_time = start.elapsed();

        Ok(IterationSample {
            mean,
            counts,
            simulation_time,
            estimation_time,
            realization: keep_realization.then_some(field),
        })
    }
}

struct EstimateAccumulator {
    sum: Vec<f64>,
    sample_counts: Vec<usize>,
    timing: TimingDiagnostics,
    convergence: ConvergenceTracker,
    cadence: usize,
    last_realization: Option<Array3<f64>>,
}

impl EstimateAccumulator {
    fn new(bins: &ResolutionBins, true_variogram: Vec<f64>, cadence: usize) -> Self {
        Self {
            sum: vec![0.0; bins.len()],
            sample_counts: vec![0; bins.len()],
            timing: TimingDiagnostics::default(),
            convergence: ConvergenceTracker::new(bins.midpoints().to_vec(), true_variogram),
            cadence,
            last_realization: None,
        }
    }

    fn feed(&mut self, iteration: usize, sample: IterationSample) {
        for (sum, mean) in self.sum.iter_mut().zip(sample.mean.iter()) {
            *sum += mean;
        }
        for (total, n) in self.sample_counts.iter_mut().zip(sample.counts.iter()) {
            *total += n;
        }
        self.timing.simulation.push(sample.simulation_time);
        self.timing.estimation.push(sample.estimation_time);

        if self.cadence > 0 && iteration % self.cadence == 0 {
            let running = self
                .sum
                .iter()
                .map(|sum| sum / (iteration + 1) as f64)
                .collect::<Vec<_>>();
            trace!(iteration, "convergence checkpoint");
            self.convergence.feed(&running);
        }

        if sample.realization.is_some() {
            self.last_realization = sample.realization;
        }
    }

    fn finish(self, iterations: usize, bins: ResolutionBins) -> VariogramEstimate {
        let mean = self
            .sum
            .iter()
            .map(|sum| sum / iterations as f64)
            .collect();

        debug!(
            iterations,
            bins = bins.len(),
            simulation = ?self.timing.total_simulation(),
            estimation = ?self.timing.total_estimation(),
            "variogram estimation finished"
        );

        VariogramEstimate {
            midpoints: bins.midpoints,
            mean,
            sample_counts: self.sample_counts,
            timing: self.timing,
            convergence: self.convergence,
            last_realization: self.last_realization,
        }
    }
}
