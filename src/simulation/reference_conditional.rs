use ndarray::Array3;
use rand::{rngs::StdRng, Rng};
use rand_distr::StandardNormal;

use crate::{
    error::VariographyError,
    spatial_database::lattice::{LatticeGeometry, LatticePoint},
    variography::model_variograms::VariogramModel,
};

use super::{SimulationRequest, Simulator};

/// Stochastic field that is exact for every pair of cells that includes one reference cell.
///
/// The reference cell is drawn from `N(0, 1)` and every other cell as
/// `rho * z_ref + sqrt(1 - rho^2) * eps` with independent standard normal `eps`, where `rho` is
/// the model correlation between the two cells. Pairs not involving the reference cell are
/// uncorrelated, so the field is only suitable for variogram estimation from that reference
/// point. It has no wraparound and ignores padding.
#[derive(Debug, Clone, Copy)]
pub struct ReferenceConditionalSimulator {
    reference: LatticePoint,
}

impl ReferenceConditionalSimulator {
    pub fn new(reference: LatticePoint) -> Self {
        Self { reference }
    }

    pub fn reference(&self) -> LatticePoint {
        self.reference
    }
}

impl Default for ReferenceConditionalSimulator {
    fn default() -> Self {
        Self::new([0, 0, 0])
    }
}

impl Simulator for ReferenceConditionalSimulator {
    type Error = VariographyError;

    fn simulate<V>(
        &mut self,
        variogram: &V,
        request: &SimulationRequest<'_>,
        rng: &mut StdRng,
    ) -> Result<Vec<f64>, Self::Error>
    where
        V: VariogramModel + ?Sized,
    {
        let lattice = request.lattice;
        let lags = lattice.lags_from(&self.reference)?;

        let z_ref: f64 = rng.sample(StandardNormal);
        let mut field = Array3::zeros(lattice.shape());
        for (ind, lag) in lattice.indexes().iter().zip(lags) {
            if *ind == self.reference {
                field[*ind] = z_ref;
                continue;
            }
            let rho = variogram.corr_lag(lag);
            let eps: f64 = rng.sample(StandardNormal);
            field[*ind] = rho * z_ref + (1.0 - rho * rho).max(0.0).sqrt() * eps;
        }

        Ok(LatticeGeometry::flatten_realization(&field))
    }
}

#[cfg(test)]
mod test {
    use approx::assert_abs_diff_eq;
    use rand::SeedableRng;

    use super::*;
    use crate::{
        simulation::Padding,
        variography::model_variograms::{variogram::Variogram, VariogramType},
    };

    #[test]
    fn pair_covariance_with_reference() {
        let lattice = LatticeGeometry::line(6, 1.0);
        let v = Variogram::isotropic("exponential".parse::<VariogramType>().unwrap(), 4.0);
        let request = SimulationRequest::new(&lattice, Padding::cells(0));
        let mut simulator = ReferenceConditionalSimulator::new([2, 0, 0]);
        let mut rng = StdRng::seed_from_u64(7);

        let n = 20000;
        let mut cross = vec![0.0; lattice.len()];
        let mut variance = vec![0.0; lattice.len()];
        for _ in 0..n {
            let values = simulator.simulate(&v, &request, &mut rng).unwrap();
            for (i, value) in values.iter().enumerate() {
                cross[i] += value * values[2] / n as f64;
                variance[i] += value * value / n as f64;
            }
        }

        for i in 0..lattice.len() {
            let lag = (i as f64 - 2.0).abs();
            assert_abs_diff_eq!(cross[i], v.corr(lag), epsilon = 0.05);
            assert_abs_diff_eq!(variance[i], 1.0, epsilon = 0.05);
        }
    }

    #[test]
    fn same_seed_same_realization() {
        let lattice = LatticeGeometry::plane(4, 1.0, 4, 1.0);
        let v = Variogram::isotropic(VariogramType::default(), 3.0);
        let request = SimulationRequest::new(&lattice, Padding::cells(0));
        let mut simulator = ReferenceConditionalSimulator::default();

        let a = simulator
            .simulate(&v, &request, &mut StdRng::seed_from_u64(3))
            .unwrap();
        let b = simulator
            .simulate(&v, &request, &mut StdRng::seed_from_u64(3))
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn reference_off_lattice_fails() {
        let lattice = LatticeGeometry::line(4, 1.0);
        let v = Variogram::isotropic(VariogramType::default(), 3.0);
        let request = SimulationRequest::new(&lattice, Padding::cells(0));
        let err = ReferenceConditionalSimulator::new([0, 1, 0])
            .simulate(&v, &request, &mut StdRng::seed_from_u64(3))
            .unwrap_err();
        assert!(matches!(err, VariographyError::PreconditionViolation(_)));
    }
}
