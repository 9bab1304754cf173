use std::time::Instant;

use ndarray::Array3;
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::{Result, VariographyError},
    simulation::{Padding, SimulationRequest, Simulator},
    spatial_database::lattice::{LatticeGeometry, LatticePoint},
    variography::model_variograms::VariogramModel,
};

use super::{
    distance_bins::{close_range_mask, sub_lattice_mask, DistanceBins},
    estimator::{iteration_seeds, TimingDiagnostics},
};

/// Where exact-distance bins are built.
///
/// Cells closer than `close_range` to the reference are all used. Further out only the
/// sub-lattice of cells whose coordinates are all multiples of `step` is sampled.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExactBinningParameters {
    pub reference: LatticePoint,
    pub close_range: f64,
    pub step: usize,
}

impl Default for ExactBinningParameters {
    fn default() -> Self {
        Self {
            reference: [0, 0, 0],
            close_range: 30.0,
            step: 10,
        }
    }
}

/// Per-bin statistics of the mean squared increment across iterations.
#[derive(Debug, Clone, PartialEq)]
pub struct BinnedSeries {
    pub distances: Vec<f64>,
    pub mean: Vec<f64>,
    /// Population standard deviation
    pub std_dev: Vec<f64>,
    pub iterations: usize,
}

impl BinnedSeries {
    /// Half the mean squared increment
    pub fn semivariogram(&self) -> Vec<f64> {
        self.mean.iter().map(|m| m / 2.0).collect()
    }
}

#[derive(Debug, Clone)]
pub struct ExactVariogramEstimate {
    pub close: BinnedSeries,
    pub sampled: BinnedSeries,
    pub timing: TimingDiagnostics,
    pub last_realization: Option<Array3<f64>>,
}

/// Welford accumulation of a vector valued series
struct RunningStatistics {
    count: usize,
    mean: Vec<f64>,
    m2: Vec<f64>,
}

impl RunningStatistics {
    fn new(n: usize) -> Self {
        Self {
            count: 0,
            mean: vec![0.0; n],
            m2: vec![0.0; n],
        }
    }

    fn push(&mut self, values: &[f64]) {
        self.count += 1;
        let n = self.count as f64;
        for ((mean, m2), x) in self.mean.iter_mut().zip(self.m2.iter_mut()).zip(values) {
            let delta = x - *mean;
            *mean += delta / n;
            *m2 += delta * (x - *mean);
        }
    }

    fn finish(self, distances: Vec<f64>) -> BinnedSeries {
        let n = self.count as f64;
        let (mean, std_dev) = if self.count == 0 {
            (vec![f64::NAN; distances.len()], vec![f64::NAN; distances.len()])
        } else {
            (
                self.mean,
                self.m2.iter().map(|m2| (m2 / n).sqrt()).collect(),
            )
        };
        BinnedSeries {
            distances,
            mean,
            std_dev,
            iterations: self.count,
        }
    }
}

/// Empirical variogram over exact-distance bins from a single reference cell.
///
/// Avoids histogram width artifacts: every bin holds cells at one realizable lattice
/// distance. The mean squared increment is reported with its spread over iterations.
pub struct ExactEmpiricalVariogram<V, S> {
    variogram: V,
    lattice: LatticeGeometry,
    padding: Padding,
    smoothing: Option<[f64; 3]>,
    simulator: S,
    parameters: ExactBinningParameters,
    close: DistanceBins,
    sampled: DistanceBins,
}

impl<V, S> ExactEmpiricalVariogram<V, S>
where
    V: VariogramModel,
    S: Simulator,
{
    pub fn new(
        variogram: V,
        lattice: LatticeGeometry,
        padding: Padding,
        parameters: ExactBinningParameters,
        simulator: S,
    ) -> Result<Self> {
        let dists = lattice.distances_from(&parameters.reference)?;
        let close_mask = close_range_mask(&dists, parameters.close_range);
        let sample_mask = sub_lattice_mask(&lattice, parameters.step)?;

        let close = DistanceBins::from_distances(parameters.reference, &dists, &close_mask);
        let sampled = DistanceBins::from_distances(parameters.reference, &dists, &sample_mask);

        Ok(Self {
            variogram,
            lattice,
            padding,
            smoothing: None,
            simulator,
            parameters,
            close,
            sampled,
        })
    }

    /// Per-axis smoothing factors handed to the simulator with every request
    pub fn with_smoothing(mut self, smoothing: [f64; 3]) -> Self {
        self.smoothing = Some(smoothing);
        self
    }

    pub fn smoothing(&self) -> Option<[f64; 3]> {
        self.smoothing
    }

    pub fn parameters(&self) -> &ExactBinningParameters {
        &self.parameters
    }

    pub fn close_bins(&self) -> &DistanceBins {
        &self.close
    }

    pub fn sampled_bins(&self) -> &DistanceBins {
        &self.sampled
    }

    pub fn lattice(&self) -> &LatticeGeometry {
        &self.lattice
    }

    pub fn variogram(&self) -> &V {
        &self.variogram
    }

    /// Run `iterations` realizations and collect per-bin statistics.
    pub fn estimate_variogram(
        &mut self,
        iterations: usize,
        rng: &mut StdRng,
    ) -> Result<ExactVariogramEstimate> {
        let request = SimulationRequest {
            lattice: &self.lattice,
            padding: self.padding,
            smoothing: self.smoothing,
        };
        let seeds = iteration_seeds(rng, iterations);

        let mut close_stats = RunningStatistics::new(self.close.len());
        let mut sampled_stats = RunningStatistics::new(self.sampled.len());
        let mut timing = TimingDiagnostics::default();
        let mut last_realization = None;
        let mut squared = vec![0.0; self.lattice.len()];

        for (iteration, seed) in seeds.into_iter().enumerate() {
            let mut iteration_rng = StdRng::seed_from_u64(seed);

            let start = Instant::now();
            let values = self
                .simulator
                .simulate(&self.variogram, &request, &mut iteration_rng)
                .map_err(VariographyError::simulation)?;
            timing.simulation.push(start.elapsed());

            let start = Instant::now();
            let field = self.lattice.reshape_realization(values)?;
            let reference_value = field[self.parameters.reference];
            for (sq, ind) in squared.iter_mut().zip(self.lattice.indexes()) {
                let increment = field[*ind] - reference_value;
                *sq = increment * increment;
            }
            close_stats.push(&self.close.bin_means(&squared));
            sampled_stats.push(&self.sampled.bin_means(&squared));
            timing.estimation.push(start.elapsed());

            if iteration + 1 == iterations {
                last_realization = Some(field);
            }
        }

        debug!(
            iterations,
            close_bins = self.close.len(),
            sampled_bins = self.sampled.len(),
            simulation = ?timing.total_simulation(),
            estimation = ?timing.total_estimation(),
            "exact variogram estimation finished"
        );

        Ok(ExactVariogramEstimate {
            close: close_stats.finish(self.close.distances()),
            sampled: sampled_stats.finish(self.sampled.distances()),
            timing,
            last_realization,
        })
    }
}
