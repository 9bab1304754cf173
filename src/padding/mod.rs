use std::time::Instant;

use indicatif::ProgressBar;
use itertools::Itertools;
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    error::{Result, VariographyError},
    simulation::{Padding, Simulator},
    spatial_database::lattice::LatticeGeometry,
    variography::{
        experimental::{
            estimator::{EmpiricalVariogram, VariogramEstimate},
            reference_points::ReferenceStrategy,
        },
        model_variograms::{variogram::Variogram, VariogramType},
    },
};

pub mod tensor;

pub use tensor::{MonotonicityViolation, PaddingErrorTensor};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaddingAnalyzerParameters {
    /// Side length of the simulated grid
    pub grid_length: f64,
    /// Cells along each simulated axis
    pub cell_count: usize,
    /// Bin width in units of the cell size
    pub resolution_factor: f64,
    pub iterations: usize,
    pub variogram_type: VariogramType,
    pub seed: u64,
    /// 1 or 2
    pub dimensions: usize,
    pub convergence_step: usize,
    pub reference_strategy: ReferenceStrategy,
    pub show_progress: bool,
}

impl Default for PaddingAnalyzerParameters {
    fn default() -> Self {
        Self {
            grid_length: 1000.0,
            cell_count: 100,
            resolution_factor: 1.0,
            iterations: 600,
            variogram_type: VariogramType::default(),
            seed: 12313,
            dimensions: 1,
            convergence_step: 10,
            reference_strategy: ReferenceStrategy::Origo,
            show_progress: false,
        }
    }
}

impl PaddingAnalyzerParameters {
    pub fn cell_size(&self) -> f64 {
        self.grid_length / self.cell_count as f64
    }

    /// Padding fraction of the grid length converted to whole cells
    pub fn padding_cells(&self, fraction: f64) -> usize {
        (fraction * self.grid_length / self.cell_size()) as usize
    }

    fn validate(&self) -> Result<()> {
        if !matches!(self.dimensions, 1 | 2) {
            return Err(VariographyError::InvalidArgument(format!(
                "padding analysis is only implemented for 1 and 2 dimensions, got {}",
                self.dimensions
            )));
        }
        if self.cell_count == 0 {
            return Err(VariographyError::InvalidArgument(
                "cell count must be positive".to_string(),
            ));
        }
        if !(self.grid_length.is_finite() && self.grid_length > 0.0) {
            return Err(VariographyError::InvalidArgument(format!(
                "grid length must be positive, got {}",
                self.grid_length
            )));
        }
        if self.iterations == 0 {
            return Err(VariographyError::InvalidArgument(
                "at least one iteration is required".to_string(),
            ));
        }
        if self.convergence_step == 0 {
            return Err(VariographyError::InvalidArgument(
                "convergence step must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Outcome of a range × padding sweep.
#[derive(Debug, Clone)]
pub struct PaddingAnalysis {
    /// Ranges as fractions of the grid length
    pub range: Vec<f64>,
    /// Padding actually used, as a fraction of the cell count
    pub padding_f: Vec<f64>,
    pub padding_cells: Vec<usize>,
    /// Distance bin midpoints shared by every run
    pub grid: Vec<f64>,
    pub deltas: PaddingErrorTensor,
    /// Indexes into `range` of ranges too short for the family on this grid
    pub unresolved_ranges: Vec<usize>,
}

impl PaddingAnalysis {
    /// Bins among the first `max_bin` whose deviation magnitude grows as padding increases
    pub fn monotonicity_violations(&self, max_bin: usize) -> Vec<MonotonicityViolation> {
        let order = (0..self.padding_cells.len())
            .sorted_by_key(|&j| self.padding_cells[j])
            .collect::<Vec<_>>();
        self.deltas.monotonicity_violations(max_bin, &order)
    }
}

/// Sweeps variogram range and padding to measure the bias wraparound puts on the estimated
/// variogram.
///
/// For every (range, padding) pair a fresh estimator is run for the full iteration budget and
/// the deviation at the last convergence checkpoint is stored in the error tensor. Any failed
/// run aborts the sweep.
pub struct PaddingAnalyzer<S> {
    parameters: PaddingAnalyzerParameters,
    simulator: S,
}

impl<S> PaddingAnalyzer<S>
where
    S: Simulator + Clone,
{
    pub fn new(parameters: PaddingAnalyzerParameters, simulator: S) -> Self {
        Self {
            parameters,
            simulator,
        }
    }

    pub fn parameters(&self) -> &PaddingAnalyzerParameters {
        &self.parameters
    }

    fn lattice(&self) -> LatticeGeometry {
        let n = self.parameters.cell_count;
        let d = self.parameters.cell_size();
        match self.parameters.dimensions {
            1 => LatticeGeometry::line(n, d),
            _ => LatticeGeometry::plane(n, d, n, d),
        }
    }

    fn variogram(&self, range: f64) -> Variogram {
        let range = range * self.parameters.grid_length;
        Variogram::isotropic(self.parameters.variogram_type, range)
    }

    /// Indexes of `ranges` below the smallest range the variogram family can be simulated with
    /// at the analyzer's cell size
    pub fn unresolved_ranges(&self, ranges: &[f64]) -> Vec<usize> {
        let cell_size = self.parameters.cell_size();
        ranges
            .iter()
            .enumerate()
            .filter(|(_, range)| !self.variogram(**range).resolvable_on(cell_size))
            .map(|(i, _)| i)
            .collect()
    }

    fn run(&self, range: f64, padding: usize, rng: &mut StdRng) -> Result<VariogramEstimate> {
        let mut estimator = EmpiricalVariogram::new(
            self.variogram(range),
            self.lattice(),
            Padding::cells(padding),
            self.simulator.clone(),
        );
        let references = estimator.pick_reference_points(self.parameters.reference_strategy)?;
        let resolution = self.parameters.resolution_factor * self.parameters.cell_size();
        estimator.estimate_variogram(
            self.parameters.iterations,
            resolution,
            &references,
            self.parameters.convergence_step,
            rng,
        )
    }

    /// Run the sweep.
    /// # Arguments
    /// * `ranges` - Variogram ranges as fractions of the grid length
    /// * `padding_fractions` - Approximate padding as fractions of the grid length
    pub fn analyze(&self, ranges: &[f64], padding_fractions: &[f64]) -> Result<PaddingAnalysis> {
        self.parameters.validate()?;
        if ranges.is_empty() || padding_fractions.is_empty() {
            return Err(VariographyError::InvalidArgument(
                "ranges and padding fractions must not be empty".to_string(),
            ));
        }

        let padding_cells = padding_fractions
            .iter()
            .map(|&p| self.parameters.padding_cells(p))
            .collect::<Vec<_>>();
        let unresolved_ranges = self.unresolved_ranges(ranges);
        for &i in unresolved_ranges.iter() {
            let variogram = self.variogram(ranges[i]);
            warn!(
                range = ranges[i],
                min_range = variogram.min_range(self.parameters.cell_size()),
                family = %self.parameters.variogram_type,
                "range is too short for the grid spacing"
            );
        }
        let mut rng = StdRng::seed_from_u64(self.parameters.seed);

        //calibration run fixes the bins shared by the sweep
        let calibration = self.run(ranges[0], padding_cells[0], &mut rng)?;
        let grid = calibration.midpoints;

        let mut deltas = PaddingErrorTensor::zeros(padding_cells.len(), ranges.len(), grid.len());
        let progress = if self.parameters.show_progress {
            ProgressBar::new((ranges.len() * padding_cells.len()) as u64)
        } else {
            ProgressBar::hidden()
        };

        let start = Instant::now();
        for (i, &range) in ranges.iter().enumerate() {
            info!(
                range,
                elapsed = ?start.elapsed(),
                "padding sweep {}/{}",
                i + 1,
                ranges.len()
            );
            for (j, &padding) in padding_cells.iter().enumerate() {
                let estimate = self.run(range, padding, &mut rng)?;
                if let Some(last) = estimate.convergence.last() {
                    deltas.set(j, i, last);
                }
                progress.inc(1);
            }
        }
        progress.finish_and_clear();

        let n = self.parameters.cell_count as f64;
        Ok(PaddingAnalysis {
            range: ranges.to_vec(),
            padding_f: padding_cells.iter().map(|&p| p as f64 / n).collect(),
            padding_cells,
            grid,
            deltas,
            unresolved_ranges,
        })
    }
}

#[cfg(test)]
mod test {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::{
        simulation::dummy::DummySimulator, variography::model_variograms::VariogramModel,
    };

    fn parameters(dimensions: usize) -> PaddingAnalyzerParameters {
        PaddingAnalyzerParameters {
            iterations: 3,
            convergence_step: 1,
            dimensions,
            ..Default::default()
        }
    }

    #[test]
    fn defaults() {
        let parameters = PaddingAnalyzerParameters::default();
        assert_eq!(parameters.cell_size(), 10.0);
        assert_eq!(parameters.padding_cells(0.25), 25);
        assert_eq!(parameters.padding_cells(0.0), 0);
        assert_eq!(parameters.variogram_type.name(), "gaussian");
        assert_eq!(parameters.reference_strategy, ReferenceStrategy::Origo);
    }

    #[test]
    fn parameters_from_partial_config() {
        let parameters: PaddingAnalyzerParameters = serde_json::from_str(
            r#"{
                "cell_count": 50,
                "variogram_type": {"family": "general_exponential", "power": 1.2},
                "reference_strategy": {"regular": {"n": 4, "offset": 0}},
                "dimensions": 2
            }"#,
        )
        .unwrap();
        assert_eq!(parameters.cell_size(), 20.0);
        assert_eq!(parameters.variogram_type, VariogramType::general_exponential(1.2));
        assert_eq!(
            parameters.reference_strategy,
            ReferenceStrategy::Regular { n: 4, offset: 0 }
        );
        //everything else keeps its default
        assert_eq!(parameters.iterations, 600);
        assert_eq!(parameters.seed, 12313);

        let json = serde_json::to_string(&parameters).unwrap();
        let back: PaddingAnalyzerParameters = serde_json::from_str(&json).unwrap();
        assert_eq!(back, parameters);

        assert!(serde_json::from_str::<PaddingAnalyzerParameters>(
            r#"{"variogram_type": {"family": "cubic"}}"#
        )
        .is_err());
    }

    #[test]
    fn periodic_bias_shrinks_with_padding() {
        let mut parameters = parameters(1);
        parameters.variogram_type = "spherical".parse().unwrap();
        let analyzer = PaddingAnalyzer::new(parameters, DummySimulator::periodic());
        let analysis = analyzer
            .analyze(&[0.2, 0.5], &[0.0, 0.1, 0.3, 0.6, 1.0])
            .unwrap();

        assert_eq!(analysis.padding_cells, vec![0, 10, 30, 60, 100]);
        assert_eq!(analysis.padding_f, vec![0.0, 0.1, 0.3, 0.6, 1.0]);
        assert_eq!(analysis.grid.len(), 100);
        assert_eq!(analysis.grid[1], 10.0);
        assert_eq!(
            analysis.deltas.as_array().shape(),
            &[5, 2, analysis.grid.len()]
        );
        assert!(analysis.monotonicity_violations(50).is_empty());
        assert!(analysis.unresolved_ranges.is_empty());

        //without padding the far half of the line wraps back towards the origin
        assert!(analysis.deltas.get(0, 0, 90) > 0.1);
        //a full grid of padding removes the bias
        for bin in 0..analysis.grid.len() {
            assert_abs_diff_eq!(analysis.deltas.get(4, 0, bin), 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn sweep_matches_true_variogram_without_wraparound() {
        let analyzer = PaddingAnalyzer::new(parameters(2), DummySimulator::new());
        let analysis = analyzer.analyze(&[0.1], &[0.0, 0.5]).unwrap();
        assert_eq!(analysis.deltas.n_padding(), 2);
        assert_eq!(analysis.deltas.n_range(), 1);
        assert_eq!(analysis.deltas.n_bins(), analysis.grid.len());

        //bin 0 only holds the origin, bin 1 holds distances 10 and 10 * sqrt(2)
        let v = analyzer.variogram(0.1);
        assert_abs_diff_eq!(analysis.deltas.get(0, 0, 0), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(
            analysis.deltas.get(1, 0, 1) + v.corr(10.0),
            (2.0 * v.corr(10.0) + v.corr(200f64.sqrt())) / 3.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn short_ranges_are_flagged() {
        //gaussian needs 6.67 cells, the cell size is 10
        let analyzer = PaddingAnalyzer::new(parameters(1), DummySimulator::new());
        assert_eq!(
            analyzer.unresolved_ranges(&[0.005, 0.1, 0.06, 0.07]),
            vec![0, 2]
        );

        let analysis = analyzer.analyze(&[0.1, 0.005], &[0.0]).unwrap();
        assert_eq!(analysis.unresolved_ranges, vec![1]);
        //the sweep still covers the short range
        assert_eq!(analysis.deltas.n_range(), 2);
    }

    #[test]
    fn unsupported_dimensions_fail_fast() {
        let analyzer = PaddingAnalyzer::new(parameters(3), DummySimulator::new());
        let err = analyzer.analyze(&[0.1], &[0.0]).unwrap_err();
        assert!(matches!(err, VariographyError::InvalidArgument(_)));
    }

    #[test]
    fn invalid_sweeps() {
        let analyzer = PaddingAnalyzer::new(parameters(1), DummySimulator::new());
        assert!(matches!(
            analyzer.analyze(&[], &[0.0]),
            Err(VariographyError::InvalidArgument(_))
        ));
        assert!(matches!(
            analyzer.analyze(&[0.1], &[]),
            Err(VariographyError::InvalidArgument(_))
        ));

        let mut parameters = parameters(1);
        parameters.convergence_step = 0;
        let analyzer = PaddingAnalyzer::new(parameters, DummySimulator::new());
        assert!(matches!(
            analyzer.analyze(&[0.1], &[0.0]),
            Err(VariographyError::InvalidArgument(_))
        ));
    }
}
