use ndarray::Array3;

use crate::{particle::ParticleArrays, BoxDim};

/// One spatial bin: indices and positions of the particles currently in it
#[derive(Clone, Debug, Default)]
pub struct Bin {
    pub indices: Vec<usize>,
    pub positions: Vec<[f64; 3]>,
}
impl Bin {
    fn clear(&mut self) {
        self.indices.clear();
        self.positions.clear();
    }
    fn push(&mut self, index: usize, position: [f64; 3]) {
        self.indices.push(index);
        self.positions.push(position);
    }
    pub fn len(&self) -> usize {
        self.indices.len()
    }
}

/// Spatial binning grid for O(N) neighbor candidate finding.
///
/// Each axis is split into floor(L / r_max) bins, at least one, so every
/// bin is at least r_max wide and all neighbors of a particle sit in the
/// 3x3x3 block of bins around its own.
#[derive(Debug)]
pub struct Bins {
    box_dim: BoxDim,
    r_max: f64,
    num_bins: [usize; 3],
    bins: Array3<Bin>,
}
impl Bins {
    pub fn new(box_dim: BoxDim, r_max: f64) -> Self {
        assert!(r_max > 0.0, "Bin reach should be positive, found {}", r_max);
        let num_bins = [
            Self::bins_along(box_dim.lx(), r_max),
            Self::bins_along(box_dim.ly(), r_max),
            Self::bins_along(box_dim.lz(), r_max),
        ];
        let bins = Array3::from_elem((num_bins[0], num_bins[1], num_bins[2]), Bin::default());
        Self {
            box_dim,
            r_max,
            num_bins,
            bins,
        }
    }
    fn bins_along(l: f64, r_max: f64) -> usize {
        ((l / r_max).floor() as usize).max(1)
    }

    // Getters
    pub fn box_dim(&self) -> BoxDim {
        self.box_dim
    }
    pub fn r_max(&self) -> f64 {
        self.r_max
    }
    pub fn num_bins(&self) -> [usize; 3] {
        self.num_bins
    }
    pub fn total_num_bins(&self) -> usize {
        self.num_bins[0] * self.num_bins[1] * self.num_bins[2]
    }
    pub fn bin(&self, ix: usize, iy: usize, iz: usize) -> &Bin {
        &self.bins[[ix, iy, iz]]
    }

    /// Bin coordinate of a position, assuming it is at most one box
    /// length outside the box. A coordinate exactly on the high face
    /// wraps to bin 0.
    pub fn bin_coord(&self, p: [f64; 3]) -> [usize; 3] {
        [
            Self::axis_bin(p[0], self.box_dim.xlo(), self.box_dim.lx(), self.num_bins[0]),
            Self::axis_bin(p[1], self.box_dim.ylo(), self.box_dim.ly(), self.num_bins[1]),
            Self::axis_bin(p[2], self.box_dim.zlo(), self.box_dim.lz(), self.num_bins[2]),
        ]
    }
    fn axis_bin(value: f64, lo: f64, l: f64, m: usize) -> usize {
        let mut ib = ((value - lo) / l * m as f64).floor() as isize;
        if ib >= m as isize {
            ib -= m as isize;
        } else if ib < 0 {
            ib += m as isize;
        }
        ib as usize
    }

    /// Flattened bin index of a position, row-major in x, y, z.
    ///
    /// The sort key for [`crate::neighbor::NeighborList::sort_by_bins`]:
    /// particles ordered by it sit grouped bin by bin.
    pub fn flat_index(&self, p: [f64; 3]) -> usize {
        let [ix, iy, iz] = self.bin_coord(p);
        (ix * self.num_bins[1] + iy) * self.num_bins[2] + iz
    }

    /// The distinct wrapped indices {i-1, i, i+1} modulo m.
    ///
    /// Deduplication keeps small grids (m <= 3) from visiting the same
    /// bin twice.
    pub fn wrapped_offsets(i: usize, m: usize) -> Vec<usize> {
        let mut out = Vec::with_capacity(3);
        for di in [-1isize, 0, 1] {
            let mut j = i as isize + di;
            if j < 0 {
                j += m as isize;
            }
            if j >= m as isize {
                j -= m as isize;
            }
            let j = j as usize;
            if !out.contains(&j) {
                out.push(j);
            }
        }
        out
    }

    /// Clear and refill every bin from the particle positions. O(N).
    pub fn update(&mut self, arrays: &ParticleArrays) {
        for bin in self.bins.iter_mut() {
            bin.clear();
        }
        for i in 0..arrays.len() {
            let p = arrays.position(i);
            let [ix, iy, iz] = self.bin_coord(p);
            self.bins[[ix, iy, iz]].push(i, p);
        }
    }
}
