use super::IsoCorrelationModel;

/// `exp(-3 r^power)`. A power of 1 is the exponential model and a power of 2 the gaussian.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IsoGeneralExponential {
    pub power: f64,
}

impl IsoGeneralExponential {
    pub fn new(power: f64) -> Self {
        Self { power }
    }
}

impl Default for IsoGeneralExponential {
    fn default() -> Self {
        Self { power: 1.5 }
    }
}

impl IsoCorrelationModel for IsoGeneralExponential {
    fn corr(&self, r: f64) -> f64 {
        (-3.0 * r.powf(self.power)).exp()
    }

    // interpolated between power 1.5 (3.23, raised to 4.0) and the gaussian (6.67)
    fn min_range_to_grid_ratio(&self) -> f64 {
        4.0 + (self.power - 1.5) * 5.34
    }
}
