use nalgebra::{Point3, Vector3};
use ndarray::{Array3, ShapeBuilder};
use serde::{Deserialize, Serialize};

use crate::error::{Result, VariographyError};

/// Integer index `[i, j, k]` of a lattice cell.
pub type LatticePoint = [usize; 3];

#[derive(Debug, Copy, Clone, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct GridSpacing {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl GridSpacing {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// A regular 1, 2 or 3 dimensional lattice.
///
/// Cells are enumerated with `i` outermost and `k` innermost, and the physical position of
/// cell `[i, j, k]` is `(i * dx, j * dy, k * dz)`. Realizations coming out of a simulator are
/// flat vectors in first-axis-fastest order and are mapped onto the lattice with
/// [`LatticeGeometry::reshape_realization`].
///
/// Lower dimensional lattices are expressed with singleton trailing axes (`ny = 1` and/or
/// `nz = 1`), so downstream code never special cases them.
#[derive(Debug, Clone, PartialEq)]
pub struct LatticeGeometry {
    shape: [usize; 3],
    grid_spacing: GridSpacing,
    points: Vec<Point3<f64>>,
    indexes: Vec<LatticePoint>,
}

impl LatticeGeometry {
    /// Create a new lattice
    /// # Arguments
    /// * `nx`, `ny`, `nz` - Number of cells along each axis (at least 1)
    /// * `dx`, `dy`, `dz` - Cell spacing along each axis (0 for a singleton axis)
    pub fn new(nx: usize, dx: f64, ny: usize, dy: f64, nz: usize, dz: f64) -> Self {
        let grid_spacing = GridSpacing::new(dx, dy, dz);
        let mut points = Vec::with_capacity(nx * ny * nz);
        let mut indexes = Vec::with_capacity(nx * ny * nz);

        for i in 0..nx {
            for j in 0..ny {
                for k in 0..nz {
                    points.push(Self::scale_ind(&grid_spacing, [i, j, k]));
                    indexes.push([i, j, k]);
                }
            }
        }

        Self {
            shape: [nx, ny, nz],
            grid_spacing,
            points,
            indexes,
        }
    }

    /// A single line of cells along the x axis
    pub fn line(nx: usize, dx: f64) -> Self {
        Self::new(nx, dx, 1, 0.0, 1, 0.0)
    }

    /// A single layer of cells in the xy plane
    pub fn plane(nx: usize, dx: f64, ny: usize, dy: f64) -> Self {
        Self::new(nx, dx, ny, dy, 1, 0.0)
    }

    fn scale_ind(grid_spacing: &GridSpacing, ind: LatticePoint) -> Point3<f64> {
        Point3::new(
            ind[0] as f64 * grid_spacing.x,
            ind[1] as f64 * grid_spacing.y,
            ind[2] as f64 * grid_spacing.z,
        )
    }

    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    pub fn grid_spacing(&self) -> GridSpacing {
        self.grid_spacing
    }

    /// Number of cells in the lattice
    pub fn len(&self) -> usize {
        self.indexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }

    /// Physical positions of all cells in enumeration order
    pub fn points(&self) -> &[Point3<f64>] {
        &self.points
    }

    /// Integer indexes of all cells in enumeration order
    pub fn indexes(&self) -> &[LatticePoint] {
        &self.indexes
    }

    pub fn contains(&self, ind: &LatticePoint) -> bool {
        ind.iter().zip(self.shape.iter()).all(|(i, n)| i < n)
    }

    /// Position of `ind` in the enumeration order, if the index lies on the lattice
    pub fn enumeration_index(&self, ind: &LatticePoint) -> Option<usize> {
        if !self.contains(ind) {
            return None;
        }
        let [_, ny, nz] = self.shape;
        Some(ind[0] * ny * nz + ind[1] * nz + ind[2])
    }

    /// Physical position of a cell
    pub fn ind_to_point(&self, ind: &LatticePoint) -> Point3<f64> {
        Self::scale_ind(&self.grid_spacing, *ind)
    }

    /// Largest distance between two cells of the lattice (origin to the far corner)
    pub fn max_distance(&self) -> f64 {
        let [nx, ny, nz] = self.shape;
        let span = Vector3::new(
            nx.saturating_sub(1) as f64 * self.grid_spacing.x,
            ny.saturating_sub(1) as f64 * self.grid_spacing.y,
            nz.saturating_sub(1) as f64 * self.grid_spacing.z,
        );
        span.norm()
    }

    /// Euclidean distance from `reference` to every cell, in enumeration order
    pub fn distances_from(&self, reference: &LatticePoint) -> Result<Vec<f64>> {
        let origin = self.reference_position(reference)?;
        Ok(self
            .points
            .iter()
            .map(|point| nalgebra::distance(&origin, point))
            .collect())
    }

    /// Lag vector from `reference` to every cell, in enumeration order
    pub fn lags_from(&self, reference: &LatticePoint) -> Result<Vec<Vector3<f64>>> {
        let origin = self.reference_position(reference)?;
        Ok(self.points.iter().map(|point| point - origin).collect())
    }

    fn reference_position(&self, reference: &LatticePoint) -> Result<Point3<f64>> {
        if !self.contains(reference) {
            return Err(VariographyError::PreconditionViolation(format!(
                "reference point {:?} is not on the {:?} lattice",
                reference, self.shape
            )));
        }
        Ok(self.ind_to_point(reference))
    }

    /// Map a flat, first-axis-fastest realization onto the lattice.
    pub fn reshape_realization(&self, values: Vec<f64>) -> Result<Array3<f64>> {
        let actual = values.len();
        let [nx, ny, nz] = self.shape;
        Array3::from_shape_vec((nx, ny, nz).f(), values).map_err(|_| {
            VariographyError::RealizationShape {
                expected: self.len(),
                actual,
            }
        })
    }

    /// Inverse of [`LatticeGeometry::reshape_realization`]
    pub fn flatten_realization(field: &Array3<f64>) -> Vec<f64> {
        //reversed axes iterate with the first axis fastest
        field.t().iter().copied().collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn lattice_points_and_positions() {
        let lattice = LatticeGeometry::new(4, 2.0, 3, 0.5, 2, 10.0);
        assert_eq!(lattice.len(), 4 * 3 * 2);

        for (ind, point) in lattice.indexes().iter().zip(lattice.points()) {
            assert_eq!(point.x, ind[0] as f64 * 2.0);
            assert_eq!(point.y, ind[1] as f64 * 0.5);
            assert_eq!(point.z, ind[2] as f64 * 10.0);
        }

        //k varies fastest in the enumeration
        assert_eq!(lattice.indexes()[0], [0, 0, 0]);
        assert_eq!(lattice.indexes()[1], [0, 0, 1]);
        assert_eq!(lattice.indexes()[2], [0, 1, 0]);
        assert_eq!(lattice.indexes()[6], [1, 0, 0]);

        for (n, ind) in lattice.indexes().iter().enumerate() {
            assert_eq!(lattice.enumeration_index(ind), Some(n));
        }
        assert_eq!(lattice.enumeration_index(&[4, 0, 0]), None);
    }

    #[test]
    fn degenerate_axes() {
        let line = LatticeGeometry::line(5, 10.0);
        assert_eq!(line.shape(), [5, 1, 1]);
        assert_eq!(line.len(), 5);
        assert_eq!(line.max_distance(), 40.0);
        assert!(line.points().iter().all(|p| p.y == 0.0 && p.z == 0.0));

        let plane = LatticeGeometry::plane(3, 1.0, 4, 1.0);
        assert_eq!(plane.shape(), [3, 4, 1]);
        assert_eq!(plane.len(), 12);
        assert!((plane.max_distance() - 13f64.sqrt()).abs() < 1e-12);

        let field = plane.reshape_realization((0..12).map(|v| v as f64).collect()).unwrap();
        assert_eq!(field.shape(), &[3, 4, 1]);
    }

    #[test]
    fn reshape_is_first_axis_fastest() {
        let lattice = LatticeGeometry::new(3, 1.0, 2, 1.0, 2, 1.0);
        let values = (0..12).map(|v| v as f64).collect::<Vec<_>>();
        let field = lattice.reshape_realization(values.clone()).unwrap();

        assert_eq!(field[[1, 0, 0]], 1.0);
        assert_eq!(field[[0, 1, 0]], 3.0);
        assert_eq!(field[[0, 0, 1]], 6.0);
        assert_eq!(field[[2, 1, 1]], 11.0);

        assert_eq!(LatticeGeometry::flatten_realization(&field), values);
    }

    #[test]
    fn reshape_rejects_wrong_length() {
        let lattice = LatticeGeometry::plane(3, 1.0, 3, 1.0);
        let err = lattice.reshape_realization(vec![0.0; 8]).unwrap_err();
        assert!(matches!(
            err,
            VariographyError::RealizationShape {
                expected: 9,
                actual: 8
            }
        ));
    }

    #[test]
    fn distances_require_lattice_reference() {
        let lattice = LatticeGeometry::plane(3, 1.0, 3, 1.0);
        let dists = lattice.distances_from(&[1, 1, 0]).unwrap();
        assert_eq!(dists[lattice.enumeration_index(&[1, 1, 0]).unwrap()], 0.0);
        assert!((dists[0] - 2f64.sqrt()).abs() < 1e-12);

        let err = lattice.distances_from(&[0, 0, 1]).unwrap_err();
        assert!(matches!(err, VariographyError::PreconditionViolation(_)));
    }
}
