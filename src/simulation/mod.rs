use nalgebra::Vector3;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::{
    spatial_database::lattice::LatticeGeometry, variography::model_variograms::VariogramModel,
};

pub mod dummy;
pub mod reference_conditional;

/// Padding along a single axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AxisPadding {
    /// Let the simulator pick the padding from the variogram range
    #[default]
    Automatic,
    /// Exact number of extra cells
    Cells(usize),
}

impl AxisPadding {
    /// Number of padding cells for an axis of `grid_size` cells with spacing `step`.
    ///
    /// `Automatic` pads until the correlation has died out: four ranges in total, and never
    /// less than one range.
    pub fn resolve(&self, grid_size: usize, range: f64, step: f64) -> usize {
        match *self {
            AxisPadding::Cells(cells) => cells,
            AxisPadding::Automatic => {
                if step <= 0.0 {
                    return 0;
                }
                let full = (4.0 * range / step - grid_size as f64) as i64;
                let single = (range / step) as i64;
                full.max(single).max(0) as usize
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Padding {
    pub x: AxisPadding,
    pub y: AxisPadding,
    pub z: AxisPadding,
}

impl Padding {
    pub fn new(x: AxisPadding, y: AxisPadding, z: AxisPadding) -> Self {
        Self { x, y, z }
    }

    /// Same number of padding cells along every axis
    pub fn cells(cells: usize) -> Self {
        Self::new(
            AxisPadding::Cells(cells),
            AxisPadding::Cells(cells),
            AxisPadding::Cells(cells),
        )
    }

    /// Padding cells per axis for `lattice` and variogram ranges `range`
    pub fn resolve(&self, lattice: &LatticeGeometry, range: Vector3<f64>) -> [usize; 3] {
        let [nx, ny, nz] = lattice.shape();
        let spacing = lattice.grid_spacing();
        [
            self.x.resolve(nx, range.x, spacing.x),
            self.y.resolve(ny, range.y, spacing.y),
            self.z.resolve(nz, range.z, spacing.z),
        ]
    }
}

/// Everything a simulator needs besides the variogram and the random state.
#[derive(Debug, Clone, Copy)]
pub struct SimulationRequest<'a> {
    pub lattice: &'a LatticeGeometry,
    pub padding: Padding,
    /// Per-axis smoothing factors forwarded to the simulator
    pub smoothing: Option<[f64; 3]>,
}

impl<'a> SimulationRequest<'a> {
    pub fn new(lattice: &'a LatticeGeometry, padding: Padding) -> Self {
        Self {
            lattice,
            padding,
            smoothing: None,
        }
    }

    pub fn with_smoothing(mut self, smoothing: [f64; 3]) -> Self {
        self.smoothing = Some(smoothing);
        self
    }
}

/// Unconditional gaussian random field simulator.
///
/// A realization is returned as a flat vector of `nx * ny * nz` values in first-axis-fastest
/// order. All randomness must come from `rng`; two calls with generators in the same state
/// must produce the same realization.
pub trait Simulator {
    type Error: std::error::Error + Send + Sync + 'static;

    fn simulate<V>(
        &mut self,
        variogram: &V,
        request: &SimulationRequest<'_>,
        rng: &mut StdRng,
    ) -> Result<Vec<f64>, Self::Error>
    where
        V: VariogramModel + ?Sized;
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn automatic_padding() {
        //four ranges minus the grid
        assert_eq!(AxisPadding::Automatic.resolve(100, 500.0, 10.0), 100);
        //never less than one range
        assert_eq!(AxisPadding::Automatic.resolve(100, 100.0, 10.0), 10);
        //axes without spacing are never padded
        assert_eq!(AxisPadding::Automatic.resolve(1, 100.0, 0.0), 0);
        assert_eq!(AxisPadding::Cells(7).resolve(100, 100.0, 10.0), 7);
    }

    #[test]
    fn padding_per_axis() {
        let lattice = LatticeGeometry::plane(100, 10.0, 50, 10.0);
        let padding = Padding::new(
            AxisPadding::Automatic,
            AxisPadding::Cells(3),
            AxisPadding::Automatic,
        );
        assert_eq!(
            padding.resolve(&lattice, Vector3::new(500.0, 500.0, 500.0)),
            [100, 3, 0]
        );
        assert_eq!(
            Padding::cells(4).resolve(&lattice, Vector3::new(1.0, 1.0, 1.0)),
            [4, 4, 4]
        );
    }
}
