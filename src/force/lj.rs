use std::{cell::RefCell, rc::Rc};

use crate::{
    compute::ComputeState,
    force::{ForceBuffer, ForceComputeTrait},
    neighbor::NeighborList,
    particle::ParticleData,
    profiler::Profiler,
    utils::zeroed_vec,
    Error,
};

/// Lennard-Jones 12-6 pair force, truncated at r_cut.
///
/// Stores the precomputed coefficients lj1 = 4 eps sigma^12 and
/// lj2 = 4 eps sigma^6 per ordered type pair, row-major. Pairs left
/// unset interact with zero coefficients; the first compute that sees
/// one logs a warning.
pub struct LjForce {
    pdata: Rc<ParticleData>,
    nlist: Rc<RefCell<NeighborList>>,
    buffer: ForceBuffer,
    r_cut: f64,
    n_types: usize,
    lj1: Vec<f64>,
    lj2: Vec<f64>,
    param_set: Vec<bool>,
    warned_unset: bool,
    num_computes: u64,
    num_pair_evals: u64,
    state: ComputeState,
    prof: Option<Rc<RefCell<Profiler>>>,
}
impl LjForce {
    pub fn new(pdata: Rc<ParticleData>, nlist: Rc<RefCell<NeighborList>>, r_cut: f64) -> Self {
        assert!(
            r_cut > 0.0,
            "Cutoff distance should be positive, found {}",
            r_cut
        );
        let nlist_r_cut = nlist.borrow().r_cut();
        assert!(
            nlist_r_cut >= r_cut,
            "Neighbor list cutoff {} should cover the force cutoff {}",
            nlist_r_cut,
            r_cut
        );
        let n = pdata.num_particles();
        let n_types = pdata.num_types();
        let buffer = ForceBuffer::new(n, Rc::clone(pdata.exec()));
        Self {
            pdata,
            nlist,
            buffer,
            r_cut,
            n_types,
            lj1: zeroed_vec(n_types * n_types),
            lj2: zeroed_vec(n_types * n_types),
            param_set: vec![false; n_types * n_types],
            warned_unset: false,
            num_computes: 0,
            num_pair_evals: 0,
            state: ComputeState::new(),
            prof: None,
        }
    }

    // Getters
    pub fn r_cut(&self) -> f64 {
        self.r_cut
    }
    pub fn all_params_set(&self) -> bool {
        self.param_set.iter().all(|&set| set)
    }
    pub fn num_computes(&self) -> u64 {
        self.num_computes
    }
    pub fn num_pair_evals(&self) -> u64 {
        self.num_pair_evals
    }

    /// Set epsilon and sigma for one type pair. The pair is symmetric,
    /// so (i, j) and (j, i) both update.
    pub fn set_params(
        &mut self,
        type_i: u32,
        type_j: u32,
        epsilon: f64,
        sigma: f64,
    ) -> Result<(), Error> {
        let n_types = self.n_types as u32;
        for type_idx in [type_i, type_j] {
            if type_idx >= n_types {
                return Err(Error::InvalidType { type_idx, n_types });
            }
        }
        let sigma6 = sigma.powi(6);
        let lj1 = 4.0 * epsilon * sigma6 * sigma6;
        let lj2 = 4.0 * epsilon * sigma6;
        for (i, j) in [(type_i, type_j), (type_j, type_i)] {
            let idx = i as usize * self.n_types + j as usize;
            self.lj1[idx] = lj1;
            self.lj2[idx] = lj2;
            self.param_set[idx] = true;
        }
        Ok(())
    }
}

impl ForceComputeTrait for LjForce {
    fn compute(&mut self, timestep: u64) {
        if !self.state.should_compute(timestep) {
            return;
        }
        self.nlist.borrow_mut().compute(timestep);
        if let Some(prof) = &self.prof {
            prof.borrow_mut().push("LJ");
        }
        if !self.warned_unset && !self.all_params_set() {
            log::warn!("Lennard-Jones parameters are unset for some type pairs, treating as zero");
            self.warned_unset = true;
        }

        let pdata = Rc::clone(&self.pdata);
        let nlist = Rc::clone(&self.nlist);
        let box_dim = pdata.box_dim();
        let r_cut_sq = self.r_cut * self.r_cut;
        let nlist = nlist.borrow();
        let neighbors = nlist.neighbors();
        let arrays = pdata.acquire_read();
        let mut forces = self.buffer.acquire_write();

        let mut n_calc: u64 = 0;
        for i in 0..arrays.len() {
            let pi = arrays.position(i);
            let type_i = arrays.types[i] as usize;
            let mut fxi = 0.0;
            let mut fyi = 0.0;
            let mut fzi = 0.0;
            for &j in &neighbors[i] {
                let pj = arrays.position(j);
                let (dx, dy, dz) = box_dim.min_image(pi[0] - pj[0], pi[1] - pj[1], pi[2] - pj[2]);
                let r_sq = dx * dx + dy * dy + dz * dz;
                if r_sq >= r_cut_sq {
                    continue;
                }
                let idx = type_i * self.n_types + arrays.types[j] as usize;
                let r2inv = 1.0 / r_sq;
                let r6inv = r2inv * r2inv * r2inv;
                let force_over_r =
                    r2inv * r6inv * (12.0 * self.lj1[idx] * r6inv - 6.0 * self.lj2[idx]);
                fxi += dx * force_over_r;
                fyi += dy * force_over_r;
                fzi += dz * force_over_r;
                n_calc += 1;
            }
            forces.fx[i] = fxi;
            forces.fy[i] = fyi;
            forces.fz[i] = fzi;
        }
        let n = arrays.len() as u64;
        drop(forces);
        drop(arrays);
        drop(nlist);
        self.num_computes += 1;
        self.num_pair_evals += n_calc;

        if let Some(prof) = &self.prof {
            // rough per-pair flop and byte counts for the profile report
            prof.borrow_mut().pop_with(26 * n_calc, 24 * n_calc + 48 * n);
        }
    }

    fn buffer(&self) -> &ForceBuffer {
        &self.buffer
    }

    fn set_profiler(&mut self, prof: Option<Rc<RefCell<Profiler>>>) {
        self.prof = prof.clone();
        self.buffer.set_profiler(prof);
    }

    fn print_stats(&self) {
        log::info!(
            "LJ force: {} computes, {:.1} pair evaluations / compute",
            self.num_computes,
            self.num_pair_evals as f64 / self.num_computes.max(1) as f64
        );
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::{
        device::Execution,
        neighbor::{BuildMethod, NeighborList},
        BoxDim,
    };

    fn pair_setup(
        x0: f64,
        x1: f64,
        n_types: usize,
    ) -> (Rc<ParticleData>, Rc<RefCell<NeighborList>>) {
        let exec = Rc::new(Execution::host_only());
        let pdata = Rc::new(ParticleData::with_types(2, n_types, BoxDim::cube(20.0), exec));
        {
            let mut arrays = pdata.acquire_write();
            arrays.x[0] = x0;
            arrays.x[1] = x1;
        }
        let nlist = Rc::new(RefCell::new(NeighborList::new(
            Rc::clone(&pdata),
            3.0,
            0.0,
            BuildMethod::Direct,
        )));
        (pdata, nlist)
    }

    #[test]
    fn repulsive_at_sigma_and_newtons_third_law() {
        let (pdata, nlist) = pair_setup(-0.5, 0.5, 1);
        let mut lj = LjForce::new(pdata, nlist, 3.0);
        lj.set_params(0, 0, 1.0, 1.0).expect("Valid types");
        lj.compute(0);

        // at r = sigma the force magnitude is 24 eps / sigma
        let forces = lj.buffer().acquire_read();
        assert_relative_eq!(forces.fx[0], -24.0, epsilon = 1e-6);
        assert_relative_eq!(forces.fx[1], 24.0, epsilon = 1e-6);
        assert_eq!(forces.fx[0], -forces.fx[1]);
        assert_eq!(forces.fy[0], 0.0);
        assert_eq!(forces.fz[1], 0.0);
    }

    #[test]
    fn vanishes_at_the_potential_minimum() {
        let r_min = 2.0_f64.powf(1.0 / 6.0);
        let (pdata, nlist) = pair_setup(0.0, r_min, 1);
        let mut lj = LjForce::new(pdata, nlist, 3.0);
        lj.set_params(0, 0, 1.0, 1.0).expect("Valid types");
        lj.compute(0);

        let forces = lj.buffer().acquire_read();
        assert!(
            forces.fx[0].abs() < 1e-8,
            "Force at the minimum should vanish, found {}",
            forces.fx[0]
        );
    }

    #[test]
    fn pairs_beyond_the_cutoff_contribute_nothing() {
        let exec = Rc::new(Execution::host_only());
        let pdata = Rc::new(ParticleData::new(2, BoxDim::cube(20.0), exec));
        {
            let mut arrays = pdata.acquire_write();
            arrays.x[1] = 1.5;
        }
        // the list holds the pair, the force cutoff rejects it
        let nlist = Rc::new(RefCell::new(NeighborList::new(
            Rc::clone(&pdata),
            1.2,
            0.5,
            BuildMethod::Direct,
        )));
        let mut lj = LjForce::new(pdata, nlist, 1.2);
        lj.set_params(0, 0, 1.0, 1.0).expect("Valid types");
        lj.compute(0);

        let forces = lj.buffer().acquire_read();
        assert_eq!(forces.fx[0], 0.0);
        assert_eq!(forces.fx[1], 0.0);
    }

    #[test]
    fn cross_type_params_apply_both_ways() {
        let (pdata, nlist) = pair_setup(-0.5, 0.5, 2);
        pdata.acquire_write().types[1] = 1;
        let mut lj = LjForce::new(pdata, nlist, 3.0);
        lj.set_params(0, 1, 1.0, 1.0).expect("Valid types");
        lj.compute(0);

        let forces = lj.buffer().acquire_read();
        assert_relative_eq!(forces.fx[0], -24.0, epsilon = 1e-6);
        assert_relative_eq!(forces.fx[1], 24.0, epsilon = 1e-6);
    }

    #[test]
    fn unset_pairs_contribute_nothing() {
        let (pdata, nlist) = pair_setup(-0.5, 0.5, 2);
        pdata.acquire_write().types[1] = 1;
        let mut lj = LjForce::new(pdata, nlist, 3.0);
        lj.set_params(0, 0, 1.0, 1.0).expect("Valid types");
        assert!(!lj.all_params_set());
        lj.compute(0);

        let forces = lj.buffer().acquire_read();
        assert_eq!(forces.fx[0], 0.0);
        assert_eq!(forces.fx[1], 0.0);
    }

    #[test]
    fn rejects_out_of_range_types() {
        let (pdata, nlist) = pair_setup(-0.5, 0.5, 1);
        let mut lj = LjForce::new(pdata, nlist, 3.0);
        assert_eq!(
            lj.set_params(0, 1, 1.0, 1.0),
            Err(Error::InvalidType {
                type_idx: 1,
                n_types: 1
            })
        );
    }

    #[test]
    fn acts_across_the_periodic_boundary() {
        let (pdata, nlist) = pair_setup(-9.9, 9.9, 1);
        let mut lj = LjForce::new(Rc::clone(&pdata), nlist, 3.0);
        lj.set_params(0, 0, 1.0, 1.0).expect("Valid types");
        lj.compute(0);

        // nearest image is 0.2 apart through the boundary
        let forces = lj.buffer().acquire_read();
        assert!(
            forces.fx[0] > 0.0,
            "Particle near the low face should be pushed inward, found {}",
            forces.fx[0]
        );
        assert_eq!(forces.fx[0], -forces.fx[1]);
    }

    #[test]
    fn computes_once_per_timestep() {
        let (pdata, nlist) = pair_setup(-0.5, 0.5, 1);
        let mut lj = LjForce::new(Rc::clone(&pdata), nlist, 3.0);
        lj.set_params(0, 0, 1.0, 1.0).expect("Valid types");
        lj.compute(0);
        {
            let mut arrays = pdata.acquire_write();
            arrays.x[1] = 0.7;
        }
        lj.compute(0);
        {
            let forces = lj.buffer().acquire_read();
            assert_relative_eq!(forces.fx[1], 24.0, epsilon = 1e-6);
        }

        lj.compute(1);
        let forces = lj.buffer().acquire_read();
        assert!(forces.fx[1] < 24.0, "Farther pair should pull the force down");
    }

    #[test]
    fn counts_pair_evaluations() {
        let (pdata, nlist) = pair_setup(-0.5, 0.5, 1);
        let mut lj = LjForce::new(pdata, nlist, 3.0);
        lj.set_params(0, 0, 1.0, 1.0).expect("Valid types");
        lj.compute(0);
        lj.compute(0);
        lj.compute(1);

        // full lists evaluate each pair from both sides
        assert_eq!(lj.num_computes(), 2);
        assert_eq!(lj.num_pair_evals(), 4);
    }
}
