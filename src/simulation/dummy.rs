use std::convert::Infallible;

use nalgebra::Vector3;
use ndarray::Array3;
use rand::rngs::StdRng;

use crate::{
    spatial_database::lattice::LatticeGeometry, variography::model_variograms::VariogramModel,
};

use super::{SimulationRequest, Simulator};

/// Variance free "simulator" whose squared increments from the origin reproduce the model
/// exactly.
///
/// The value at every cell is `sqrt(2 * (1 - corr(lag from origin)))`, so the mean squared
/// increment between the origin and any cell equals twice the semivariogram and the
/// `1 - m / 2` estimate from the origin equals the correlation. Only estimates using the
/// origin as reference point are meaningful.
///
/// In periodic mode the lag along each axis is measured on the torus of the padded extent
/// (`n + padding` cells), which mimics the circular wraparound of a spectral simulator without
/// any Monte-Carlo noise.
#[derive(Debug, Clone, Copy, Default)]
pub struct DummySimulator {
    periodic: bool,
}

impl DummySimulator {
    pub fn new() -> Self {
        Self { periodic: false }
    }

    pub fn periodic() -> Self {
        Self { periodic: true }
    }

    fn wrapped(ind: usize, n_total: usize) -> usize {
        ind.min(n_total - ind)
    }
}

impl Simulator for DummySimulator {
    type Error = Infallible;

    fn simulate<V>(
        &mut self,
        variogram: &V,
        request: &SimulationRequest<'_>,
        _rng: &mut StdRng,
    ) -> Result<Vec<f64>, Self::Error>
    where
        V: VariogramModel + ?Sized,
    {
        let lattice = request.lattice;
        let shape = lattice.shape();
        let spacing = lattice.grid_spacing();
        let padding = request.padding.resolve(lattice, variogram.range());

        let mut field = Array3::zeros(shape);
        for ind in lattice.indexes() {
            let lag = if self.periodic {
                let [i, j, k] = [0, 1, 2].map(|axis| {
                    Self::wrapped(ind[axis], shape[axis] + padding[axis]) as f64
                });
                Vector3::new(i * spacing.x, j * spacing.y, k * spacing.z)
            } else {
                lattice.ind_to_point(ind).coords
            };
            let gamma = (1.0 - variogram.corr_lag(lag)).max(0.0);
            field[*ind] = (2.0 * gamma).sqrt();
        }

        Ok(LatticeGeometry::flatten_realization(&field))
    }
}
