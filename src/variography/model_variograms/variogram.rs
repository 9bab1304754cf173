use nalgebra::{UnitQuaternion, Vector3};

use super::{IsoCorrelationModel, VariogramModel, VariogramType};

/// Unit-variance variogram of a given family with per-axis ranges and an orientation.
///
/// The lag is rotated into the principal axes (azimuth around z, then dip around y), divided
/// component wise by the ranges and the family is evaluated at the norm of the result. A
/// positive dip tilts the main axis towards +z.
#[derive(Debug, Clone, PartialEq)]
pub struct Variogram {
    vtype: VariogramType,
    range: Vector3<f64>,
    azimuth: f64,
    dip: f64,
    rotation: UnitQuaternion<f64>,
}

impl Variogram {
    /// Create a new variogram
    /// # Arguments
    /// * `vtype` - Variogram family
    /// * `range` - Range along the principal axes
    /// * `azimuth` - Rotation around the z axis in degrees
    /// * `dip` - Inclination of the main axis above the xy plane in degrees
    pub fn new(vtype: VariogramType, range: Vector3<f64>, azimuth: f64, dip: f64) -> Self {
        //a positive pitch turns x towards -z
        let rotation =
            UnitQuaternion::from_euler_angles(0.0, -dip.to_radians(), azimuth.to_radians());
        Self {
            vtype,
            range,
            azimuth,
            dip,
            rotation,
        }
    }

    /// Same range in every direction
    pub fn isotropic(vtype: VariogramType, range: f64) -> Self {
        Self::new(vtype, Vector3::new(range, range, range), 0.0, 0.0)
    }

    pub fn vtype(&self) -> VariogramType {
        self.vtype
    }

    pub fn azimuth(&self) -> f64 {
        self.azimuth
    }

    pub fn dip(&self) -> f64 {
        self.dip
    }

    /// Lag in units of the range along the principal axes
    fn scaled_distance(&self, lag: Vector3<f64>) -> f64 {
        let mut h = self.rotation.inverse_transform_vector(&lag);
        h.component_div_assign(&self.range);
        h.norm()
    }

    /// Smallest range the family can be simulated with on a grid of spacing `step`
    pub fn min_range(&self, step: f64) -> f64 {
        self.vtype.min_range_to_grid_ratio() * step
    }

    /// Whether every principal range reaches [`Variogram::min_range`] for spacing `step`
    pub fn resolvable_on(&self, step: f64) -> bool {
        let min_range = self.min_range(step);
        self.range.iter().all(|&r| r >= min_range)
    }
}

impl VariogramModel for Variogram {
    fn corr(&self, h: f64) -> f64 {
        self.corr_lag(Vector3::new(h, 0.0, 0.0))
    }

    fn corr_lag(&self, lag: Vector3<f64>) -> f64 {
        self.vtype.corr(self.scaled_distance(lag))
    }

    fn range(&self) -> Vector3<f64> {
        self.range
    }
}
