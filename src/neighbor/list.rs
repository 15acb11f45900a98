use std::{cell::RefCell, rc::Rc};

use crate::{
    compute::ComputeState, neighbor::Bins, particle::ParticleArrays, particle::ParticleData,
    profiler::Profiler, utils, BoxDim,
};

/// How neighbor candidates are found
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuildMethod {
    /// All-pairs scan, O(N^2); the reference for the binned method
    Direct,
    /// Spatial binning, O(N)
    Binned,
}

/// Cached per-particle lists of every other particle within
/// r_cut + r_buff under the minimum-image convention.
///
/// Lists are full: a pair appears in both members' lists, so consumers
/// accumulate one-sided without special cases. The cache rebuilds on
/// first use, on a box change, on request through [`force_update`], and
/// whenever any particle has drifted more than r_buff / 2 since the
/// last build.
///
/// [`force_update`]: NeighborList::force_update
pub struct NeighborList {
    pdata: Rc<ParticleData>,
    r_cut: f64,
    r_buff: f64,
    method: BuildMethod,
    neighbors: Vec<Vec<usize>>,
    bins: Option<Bins>,
    last_box: Option<BoxDim>,
    last_positions: Vec<[f64; 3]>,
    force_update: bool,
    state: ComputeState,
    prof: Option<Rc<RefCell<Profiler>>>,
    num_checks: u64,
    num_updates: u64,
}
impl NeighborList {
    pub fn new(pdata: Rc<ParticleData>, r_cut: f64, r_buff: f64, method: BuildMethod) -> Self {
        assert!(
            r_cut > 0.0,
            "Cutoff distance should be positive, found {}",
            r_cut
        );
        assert!(
            r_buff >= 0.0,
            "Buffer distance should not be negative, found {}",
            r_buff
        );
        let n = pdata.num_particles();
        Self {
            pdata,
            r_cut,
            r_buff,
            method,
            neighbors: vec![Vec::new(); n],
            bins: None,
            last_box: None,
            last_positions: Vec::new(),
            force_update: false,
            state: ComputeState::new(),
            prof: None,
            num_checks: 0,
            num_updates: 0,
        }
    }

    // Getters
    pub fn r_cut(&self) -> f64 {
        self.r_cut
    }
    pub fn r_buff(&self) -> f64 {
        self.r_buff
    }
    pub fn method(&self) -> BuildMethod {
        self.method
    }
    pub fn neighbors(&self) -> &Vec<Vec<usize>> {
        &self.neighbors
    }
    pub fn num_checks(&self) -> u64 {
        self.num_checks
    }
    pub fn num_updates(&self) -> u64 {
        self.num_updates
    }

    pub fn set_profiler(&mut self, prof: Option<Rc<RefCell<Profiler>>>) {
        self.prof = prof;
    }

    /// Mark the cache stale; the next compute call rebuilds it
    pub fn force_update(&mut self) {
        self.force_update = true;
    }

    /// Reorder particles in memory by spatial bin, so neighbors sit near
    /// each other, and mark the cache for rebuild. Tags keep identifying
    /// particles across the move.
    pub fn sort_by_bins(&mut self) {
        let pdata = Rc::clone(&self.pdata);
        let bins = Bins::new(pdata.box_dim(), self.r_cut + self.r_buff);
        let mut arrays = pdata.acquire_write();
        let keys: Vec<usize> = (0..arrays.len())
            .map(|i| bins.flat_index(arrays.position(i)))
            .collect();
        arrays.reorder(&utils::counting_sort_order(&keys));
        self.force_update = true;
    }

    /// Rebuild the cache if it has gone stale. Runs the staleness check
    /// at most once per timestep.
    pub fn compute(&mut self, timestep: u64) {
        if !self.state.should_compute(timestep) {
            return;
        }
        if let Some(prof) = &self.prof {
            prof.borrow_mut().push("Neighbor");
        }
        self.num_checks += 1;
        let pdata = Rc::clone(&self.pdata);
        {
            let arrays = pdata.acquire_read();
            if self.needs_rebuild(&arrays) {
                self.num_updates += 1;
                self.build(&arrays);
            }
        }
        if let Some(prof) = &self.prof {
            prof.borrow_mut().pop();
        }
    }

    /// Report build statistics through the log
    pub fn print_stats(&self) {
        let total: usize = self.neighbors.iter().map(|list| list.len()).sum();
        log::info!(
            "Neighbor list: {} checks, {} updates, {:.1} neighbors / particle",
            self.num_checks,
            self.num_updates,
            total as f64 / self.neighbors.len() as f64
        );
    }

    fn needs_rebuild(&self, arrays: &ParticleArrays) -> bool {
        if self.force_update {
            return true;
        }
        let last_box = match self.last_box {
            Some(last_box) => last_box,
            None => return true,
        };
        let box_dim = self.pdata.box_dim();
        if last_box != box_dim {
            return true;
        }
        let half_buff_sq = (0.5 * self.r_buff).powi(2);
        (0..arrays.len()).any(|i| {
            box_dim.min_image_dist_sq(&arrays.position(i), &self.last_positions[i]) > half_buff_sq
        })
    }

    fn build(&mut self, arrays: &ParticleArrays) {
        let box_dim = self.pdata.box_dim();
        for list in self.neighbors.iter_mut() {
            list.clear();
        }
        match self.method {
            BuildMethod::Direct => self.build_direct(arrays, box_dim),
            BuildMethod::Binned => self.build_binned(arrays, box_dim),
        }
        self.last_box = Some(box_dim);
        self.last_positions = (0..arrays.len()).map(|i| arrays.position(i)).collect();
        self.force_update = false;
    }

    fn build_direct(&mut self, arrays: &ParticleArrays, box_dim: BoxDim) {
        let r_max_sq = (self.r_cut + self.r_buff).powi(2);
        for i in 0..arrays.len() {
            for j in 0..i {
                let dist_sq = box_dim.min_image_dist_sq(&arrays.position(i), &arrays.position(j));
                if dist_sq <= r_max_sq {
                    self.neighbors[i].push(j);
                    self.neighbors[j].push(i);
                }
            }
        }
    }

    fn build_binned(&mut self, arrays: &ParticleArrays, box_dim: BoxDim) {
        let r_max = self.r_cut + self.r_buff;
        let r_max_sq = r_max * r_max;
        let mut bins = match self.bins.take() {
            Some(bins) if bins.box_dim() == box_dim => bins,
            _ => Bins::new(box_dim, r_max),
        };
        bins.update(arrays);

        let [mx, my, mz] = bins.num_bins();
        for i in 0..arrays.len() {
            let p = arrays.position(i);
            let [cx, cy, cz] = bins.bin_coord(p);
            for &ix in &Bins::wrapped_offsets(cx, mx) {
                for &iy in &Bins::wrapped_offsets(cy, my) {
                    for &iz in &Bins::wrapped_offsets(cz, mz) {
                        let bin = bins.bin(ix, iy, iz);
                        for (&j, q) in bin.indices.iter().zip(bin.positions.iter()) {
                            if j == i {
                                continue;
                            }
                            if box_dim.min_image_dist_sq(&p, q) <= r_max_sq {
                                self.neighbors[i].push(j);
                            }
                        }
                    }
                }
            }
        }
        self.bins = Some(bins);
    }
}
