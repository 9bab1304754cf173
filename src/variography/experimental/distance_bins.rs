use bitvec::prelude::*;
use ordered_float::OrderedFloat;

use crate::{
    error::{Result, VariographyError},
    spatial_database::lattice::{LatticeGeometry, LatticePoint},
};

/// Two distances closer than this are considered equal
pub const DISTANCE_TOLERANCE: f64 = 1e-10;

/// Lattice cells sharing the same distance from a reference point.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceBin {
    pub distance: f64,
    /// Indexes into the lattice enumeration
    pub members: Vec<usize>,
}

/// Exact-distance equivalence classes of lattice cells around one reference point.
///
/// Distances on a regular lattice cluster on a small set of exact values, so instead of
/// fixed-width histogram bins the cells are grouped by connected components of the graph
/// linking cells whose distances differ by less than [`DISTANCE_TOLERANCE`]. Bins are sorted
/// by increasing distance.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceBins {
    reference: LatticePoint,
    bins: Vec<DistanceBin>,
}

impl DistanceBins {
    /// Bin the cells selected by `subset` (one bit per cell in enumeration order)
    pub fn from_reference(
        lattice: &LatticeGeometry,
        reference: &LatticePoint,
        subset: &BitSlice,
    ) -> Result<Self> {
        let dists = lattice.distances_from(reference)?;
        if subset.len() != dists.len() {
            return Err(VariographyError::InvalidArgument(format!(
                "subset has {} entries but the lattice has {} cells",
                subset.len(),
                dists.len()
            )));
        }
        Ok(Self::from_distances(*reference, &dists, subset))
    }

    /// Bin every cell of the lattice
    pub fn all(lattice: &LatticeGeometry, reference: &LatticePoint) -> Result<Self> {
        let subset = bitvec![1; lattice.len()];
        Self::from_reference(lattice, reference, &subset)
    }

    pub(crate) fn from_distances(reference: LatticePoint, dists: &[f64], subset: &BitSlice) -> Self {
        let selected = subset.iter_ones().collect::<Vec<_>>();
        let selected_dists = selected.iter().map(|&i| dists[i]).collect::<Vec<_>>();

        let (n_components, labels) = connected_components(&selected_dists);

        let mut bins = vec![
            DistanceBin {
                distance: f64::NAN,
                members: Vec::new()
            };
            n_components
        ];
        for (&cell, &label) in selected.iter().zip(labels.iter()) {
            let bin = &mut bins[label];
            if bin.members.is_empty() {
                bin.distance = dists[cell];
            }
            bin.members.push(cell);
        }

        Self { reference, bins }
    }

    pub fn reference(&self) -> LatticePoint {
        self.reference
    }

    pub fn bins(&self) -> &[DistanceBin] {
        &self.bins
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    pub fn distances(&self) -> Vec<f64> {
        self.bins.iter().map(|bin| bin.distance).collect()
    }

    /// Mean of `values` (one per lattice cell) over the members of each bin
    pub fn bin_means(&self, values: &[f64]) -> Vec<f64> {
        self.bins
            .iter()
            .map(|bin| {
                bin.members.iter().map(|&m| values[m]).sum::<f64>() / bin.members.len() as f64
            })
            .collect()
    }
}

/// Cells strictly closer than `close_range` to the reference
pub fn close_range_mask(dists: &[f64], close_range: f64) -> BitVec {
    dists.iter().map(|&d| d < close_range).collect()
}

/// Cells whose integer coordinates are all divisible by `step`
pub fn sub_lattice_mask(lattice: &LatticeGeometry, step: usize) -> Result<BitVec> {
    if step == 0 {
        return Err(VariographyError::InvalidArgument(
            "sub-lattice step must be positive".to_string(),
        ));
    }
    Ok(lattice
        .indexes()
        .iter()
        .map(|ind| ind.iter().all(|i| i % step == 0))
        .collect())
}

/// Label the connected components of the closeness graph over `dists`.
///
/// Two values are adjacent if they differ by less than [`DISTANCE_TOLERANCE`]. Components of
/// such a threshold graph are runs of sorted values with small gaps, so only neighbours in
/// sorted order need to be linked. Labels are assigned in order of increasing distance.
fn connected_components(dists: &[f64]) -> (usize, Vec<usize>) {
    let mut order = (0..dists.len()).collect::<Vec<_>>();
    order.sort_by_key(|&i| OrderedFloat(dists[i]));

    let mut components = DisjointSet::new(dists.len());
    for pair in order.windows(2) {
        if (dists[pair[1]] - dists[pair[0]]).abs() < DISTANCE_TOLERANCE {
            components.union(pair[0], pair[1]);
        }
    }

    let mut root_labels = vec![usize::MAX; dists.len()];
    let mut labels = vec![0; dists.len()];
    let mut n_components = 0;
    for &i in order.iter() {
        let root = components.find(i);
        if root_labels[root] == usize::MAX {
            root_labels[root] = n_components;
            n_components += 1;
        }
        labels[i] = root_labels[root];
    }

    (n_components, labels)
}

struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSet {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            //path halving
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    fn union(&mut self, a: usize, b: usize) {
        let (a, b) = (self.find(a), self.find(b));
        if a == b {
            return;
        }
        match self.rank[a].cmp(&self.rank[b]) {
            std::cmp::Ordering::Less => self.parent[a] = b,
            std::cmp::Ordering::Greater => self.parent[b] = a,
            std::cmp::Ordering::Equal => {
                self.parent[b] = a;
                self.rank[a] += 1;
            }
        }
    }
}
