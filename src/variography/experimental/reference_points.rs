use rand::{rngs::StdRng, seq::index, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Result, VariographyError},
    spatial_database::lattice::{LatticeGeometry, LatticePoint},
};

/// How reference points for the Monte-Carlo estimator are selected from a lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceStrategy {
    /// Every lattice point in enumeration order
    All,
    /// The corner `[0, 0, 0]`
    #[default]
    Origo,
    /// `[nx / 2, ny / 2, nz / 2]`
    Center,
    /// `n` distinct points drawn uniformly without replacement
    Random { n: usize, seed: Option<u64> },
    /// Every `total / n`-th point of the enumeration, starting at `offset`
    Regular { n: usize, offset: usize },
}

impl ReferenceStrategy {
    /// Build a strategy from its name.
    /// # Arguments
    /// * `name` - one of `all`, `origo`, `center`, `random` or `regular`
    /// * `n` - number of points for `random` and `regular`
    /// * `offset` - first enumeration index for `regular`
    /// * `seed` - seed for `random`, fresh entropy when `None`
    pub fn from_name(name: &str, n: usize, offset: usize, seed: Option<u64>) -> Result<Self> {
        let strategy = match name {
            "all" => ReferenceStrategy::All,
            "origo" => ReferenceStrategy::Origo,
            "center" => ReferenceStrategy::Center,
            "random" => ReferenceStrategy::Random { n, seed },
            "regular" => ReferenceStrategy::Regular { n, offset },
            _ => {
                return Err(VariographyError::InvalidArgument(format!(
                    "unknown reference point strategy '{}'",
                    name
                )))
            }
        };
        Ok(strategy)
    }

    /// Select reference points from `lattice`.
    ///
    /// `Regular` follows slicing semantics and may return more than `n` points when `n` does
    /// not divide the number of cells.
    pub fn pick(&self, lattice: &LatticeGeometry) -> Result<Vec<LatticePoint>> {
        let indexes = lattice.indexes();
        let total = indexes.len();
        let [nx, ny, nz] = lattice.shape();

        match *self {
            ReferenceStrategy::All => Ok(indexes.to_vec()),
            ReferenceStrategy::Origo => Ok(vec![[0, 0, 0]]),
            ReferenceStrategy::Center => Ok(vec![[nx / 2, ny / 2, nz / 2]]),
            ReferenceStrategy::Random { n, seed } => {
                check_count(n, total)?;
                let mut rng = match seed {
                    Some(seed) => StdRng::seed_from_u64(seed),
                    None => StdRng::from_entropy(),
                };
                Ok(index::sample(&mut rng, total, n)
                    .into_iter()
                    .map(|i| indexes[i])
                    .collect())
            }
            ReferenceStrategy::Regular { n, offset } => {
                check_count(n, total)?;
                if offset >= total {
                    return Err(VariographyError::InvalidArgument(format!(
                        "offset {} is outside a lattice of {} points",
                        offset, total
                    )));
                }
                let stride = total / n;
                Ok(indexes[offset..].iter().step_by(stride).copied().collect())
            }
        }
    }
}

fn check_count(n: usize, total: usize) -> Result<()> {
    if n == 0 || n > total {
        return Err(VariographyError::InvalidArgument(format!(
            "cannot pick {} reference points from a lattice of {} points",
            n, total
        )));
    }
    Ok(())
}
