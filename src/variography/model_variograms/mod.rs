use std::{fmt, str::FromStr};

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::VariographyError;

use self::{
    iso_constant::IsoConstant,
    iso_exponential::IsoExponential,
    iso_gaussian::IsoGaussian,
    iso_general_exponential::IsoGeneralExponential,
    iso_matern::{IsoMatern32, IsoMatern52, IsoMatern72},
    iso_spherical::IsoSpherical,
};

pub mod iso_constant;
pub mod iso_exponential;
pub mod iso_gaussian;
pub mod iso_general_exponential;
pub mod iso_matern;
pub mod iso_spherical;
pub mod variogram;

/// Unit-variance correlation function of a single family, evaluated on distances measured
/// in units of the range.
pub trait IsoCorrelationModel {
    fn corr(&self, r: f64) -> f64;

    /// Smallest range (in grid cells) the family can be simulated with on a spectral grid
    fn min_range_to_grid_ratio(&self) -> f64;
}

/// Correlation structure handed to a simulator and compared against estimates.
pub trait VariogramModel {
    /// Correlation at distance `h` along the first principal axis
    fn corr(&self, h: f64) -> f64;

    /// Correlation for an arbitrary lag vector
    fn corr_lag(&self, lag: Vector3<f64>) -> f64;

    /// Range along each principal axis
    fn range(&self) -> Vector3<f64>;

    fn semivariogram(&self, h: f64) -> f64 {
        1.0 - self.corr(h)
    }
}

/// Closed set of supported variogram families.
///
/// Serialized as `{"family": "spherical"}`; the general exponential carries its power,
/// `{"family": "general_exponential", "power": 1.8}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "VariogramTypeConfig", into = "VariogramTypeConfig")]
pub enum VariogramType {
    Constant(IsoConstant),
    Exponential(IsoExponential),
    Gaussian(IsoGaussian),
    GeneralExponential(IsoGeneralExponential),
    Spherical(IsoSpherical),
    Matern32(IsoMatern32),
    Matern52(IsoMatern52),
    Matern72(IsoMatern72),
}

impl VariogramType {
    pub fn general_exponential(power: f64) -> Self {
        VariogramType::GeneralExponential(IsoGeneralExponential::new(power))
    }

    pub fn name(&self) -> &'static str {
        match self {
            VariogramType::Constant(_) => "constant",
            VariogramType::Exponential(_) => "exponential",
            VariogramType::Gaussian(_) => "gaussian",
            VariogramType::GeneralExponential(_) => "general_exponential",
            VariogramType::Spherical(_) => "spherical",
            VariogramType::Matern32(_) => "matern32",
            VariogramType::Matern52(_) => "matern52",
            VariogramType::Matern72(_) => "matern72",
        }
    }
}

impl Default for VariogramType {
    fn default() -> Self {
        VariogramType::Gaussian(IsoGaussian)
    }
}

impl IsoCorrelationModel for VariogramType {
    fn corr(&self, r: f64) -> f64 {
        match self {
            VariogramType::Constant(v) => v.corr(r),
            VariogramType::Exponential(v) => v.corr(r),
            VariogramType::Gaussian(v) => v.corr(r),
            VariogramType::GeneralExponential(v) => v.corr(r),
            VariogramType::Spherical(v) => v.corr(r),
            VariogramType::Matern32(v) => v.corr(r),
            VariogramType::Matern52(v) => v.corr(r),
            VariogramType::Matern72(v) => v.corr(r),
        }
    }

    fn min_range_to_grid_ratio(&self) -> f64 {
        match self {
            VariogramType::Constant(v) => v.min_range_to_grid_ratio(),
            VariogramType::Exponential(v) => v.min_range_to_grid_ratio(),
            VariogramType::Gaussian(v) => v.min_range_to_grid_ratio(),
            VariogramType::GeneralExponential(v) => v.min_range_to_grid_ratio(),
            VariogramType::Spherical(v) => v.min_range_to_grid_ratio(),
            VariogramType::Matern32(v) => v.min_range_to_grid_ratio(),
            VariogramType::Matern52(v) => v.min_range_to_grid_ratio(),
            VariogramType::Matern72(v) => v.min_range_to_grid_ratio(),
        }
    }
}

impl FromStr for VariogramType {
    type Err = VariographyError;

    /// Case insensitive family name. `general_exponential` gets a power of 1.5.
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let vtype = match name.to_ascii_lowercase().as_str() {
            "constant" => VariogramType::Constant(IsoConstant),
            "exponential" => VariogramType::Exponential(IsoExponential),
            "gaussian" => VariogramType::Gaussian(IsoGaussian),
            "general_exponential" => {
                VariogramType::GeneralExponential(IsoGeneralExponential::default())
            }
            "spherical" => VariogramType::Spherical(IsoSpherical),
            "matern32" => VariogramType::Matern32(IsoMatern32),
            "matern52" => VariogramType::Matern52(IsoMatern52),
            "matern72" => VariogramType::Matern72(IsoMatern72),
            _ => {
                return Err(VariographyError::InvalidArgument(format!(
                    "unknown variogram type '{}'",
                    name
                )))
            }
        };
        Ok(vtype)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct VariogramTypeConfig {
    family: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    power: Option<f64>,
}

impl From<VariogramType> for VariogramTypeConfig {
    fn from(vtype: VariogramType) -> Self {
        let power = match vtype {
            VariogramType::GeneralExponential(v) => Some(v.power),
            _ => None,
        };
        Self {
            family: vtype.name().to_string(),
            power,
        }
    }
}

impl TryFrom<VariogramTypeConfig> for VariogramType {
    type Error = VariographyError;

    fn try_from(config: VariogramTypeConfig) -> Result<Self, Self::Error> {
        let vtype = config.family.parse::<VariogramType>()?;
        match (vtype, config.power) {
            (_, None) => Ok(vtype),
            (VariogramType::GeneralExponential(_), Some(power)) => {
                if power > 0.0 && power <= 2.0 {
                    Ok(VariogramType::general_exponential(power))
                } else {
                    Err(VariographyError::InvalidArgument(format!(
                        "general exponential power must be in (0, 2], got {}",
                        power
                    )))
                }
            }
            (_, Some(_)) => Err(VariographyError::InvalidArgument(format!(
                "variogram type '{}' takes no power",
                vtype
            ))),
        }
    }
}

impl fmt::Display for VariogramType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_family_names() {
        for name in [
            "constant",
            "exponential",
            "gaussian",
            "general_exponential",
            "spherical",
            "matern32",
            "matern52",
            "matern72",
        ] {
            let vtype: VariogramType = name.parse().unwrap();
            assert_eq!(vtype.name(), name);
            assert_eq!(vtype.to_string(), name);
        }

        assert_eq!(
            "SPHERICAL".parse::<VariogramType>().unwrap(),
            VariogramType::Spherical(IsoSpherical)
        );
        assert_eq!(
            "general_exponential".parse::<VariogramType>().unwrap(),
            VariogramType::general_exponential(1.5)
        );
    }

    #[test]
    fn serde_uses_family_names() {
        let json = serde_json::to_string(&VariogramType::Spherical(IsoSpherical)).unwrap();
        assert_eq!(json, r#"{"family":"spherical"}"#);
        let json = serde_json::to_string(&VariogramType::general_exponential(1.8)).unwrap();
        assert_eq!(json, r#"{"family":"general_exponential","power":1.8}"#);

        for vtype in [
            VariogramType::Constant(IsoConstant),
            VariogramType::Matern52(IsoMatern52),
            VariogramType::general_exponential(0.7),
        ] {
            let json = serde_json::to_string(&vtype).unwrap();
            assert_eq!(serde_json::from_str::<VariogramType>(&json).unwrap(), vtype);
        }

        //power defaults like the parsed name, family names are case insensitive
        let vtype: VariogramType =
            serde_json::from_str(r#"{"family":"General_Exponential"}"#).unwrap();
        assert_eq!(vtype, VariogramType::general_exponential(1.5));

        for json in [
            r#"{"family":"cubic"}"#,
            r#"{"family":"gaussian","power":1.2}"#,
            r#"{"family":"general_exponential","power":2.5}"#,
            r#"{"gaussian":null}"#,
        ] {
            assert!(serde_json::from_str::<VariogramType>(json).is_err(), "{}", json);
        }
    }

    #[test]
    fn unknown_family_is_invalid() {
        let err = "cubic".parse::<VariogramType>().unwrap_err();
        assert!(matches!(err, VariographyError::InvalidArgument(_)));
    }

    #[test]
    fn all_families_are_correlations() {
        let families = [
            VariogramType::Constant(IsoConstant),
            VariogramType::Exponential(IsoExponential),
            VariogramType::Gaussian(IsoGaussian),
            VariogramType::general_exponential(1.8),
            VariogramType::Spherical(IsoSpherical),
            VariogramType::Matern32(IsoMatern32),
            VariogramType::Matern52(IsoMatern52),
            VariogramType::Matern72(IsoMatern72),
        ];
        for vtype in families {
            assert!((vtype.corr(0.0) - 1.0).abs() < 1e-12, "{}", vtype);
            let mut previous = vtype.corr(0.0);
            for step in 1..40 {
                let c = vtype.corr(step as f64 * 0.05);
                assert!((0.0..=1.0).contains(&c), "{} out of bounds", vtype);
                assert!(c <= previous + 1e-12, "{} not decreasing", vtype);
                previous = c;
            }
        }
    }
}
