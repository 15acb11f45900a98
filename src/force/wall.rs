use std::{cell::RefCell, rc::Rc};

use crate::{
    compute::ComputeState,
    force::{ForceBuffer, ForceComputeTrait},
    particle::ParticleData,
    profiler::Profiler,
    utils::zeroed_vec,
    Error,
};

/// An infinite plane, stored as a point on it and a unit normal
#[derive(Clone, Copy, Debug)]
pub struct Wall {
    origin: [f64; 3],
    normal: [f64; 3],
}
impl Wall {
    pub fn new(origin: [f64; 3], normal: [f64; 3]) -> Self {
        let length =
            (normal[0] * normal[0] + normal[1] * normal[1] + normal[2] * normal[2]).sqrt();
        assert!(
            length > 0.0,
            "Wall normal should have nonzero length, found ({}, {}, {})",
            normal[0],
            normal[1],
            normal[2]
        );
        Self {
            origin,
            normal: [normal[0] / length, normal[1] / length, normal[2] / length],
        }
    }

    pub fn origin(&self) -> [f64; 3] {
        self.origin
    }
    pub fn normal(&self) -> [f64; 3] {
        self.normal
    }
    /// Signed distance from the plane along the unit normal
    pub fn distance_to(&self, p: [f64; 3]) -> f64 {
        (p[0] - self.origin[0]) * self.normal[0]
            + (p[1] - self.origin[1]) * self.normal[1]
            + (p[2] - self.origin[2]) * self.normal[2]
    }
}

/// Lennard-Jones force between each particle and a set of wall planes.
///
/// A wall acts like a fixed particle at the foot of the perpendicular,
/// so the pair expression applies with r the distance along the normal.
/// Particles feel the wall from either side. Coefficients are per
/// particle type.
pub struct WallForce {
    pdata: Rc<ParticleData>,
    buffer: ForceBuffer,
    walls: Vec<Wall>,
    r_cut: f64,
    n_types: usize,
    lj1: Vec<f64>,
    lj2: Vec<f64>,
    param_set: Vec<bool>,
    warned_unset: bool,
    state: ComputeState,
    prof: Option<Rc<RefCell<Profiler>>>,
}
impl WallForce {
    pub fn new(pdata: Rc<ParticleData>, r_cut: f64) -> Self {
        assert!(
            r_cut > 0.0,
            "Cutoff distance should be positive, found {}",
            r_cut
        );
        let n = pdata.num_particles();
        let n_types = pdata.num_types();
        let buffer = ForceBuffer::new(n, Rc::clone(pdata.exec()));
        Self {
            pdata,
            buffer,
            walls: Vec::new(),
            r_cut,
            n_types,
            lj1: zeroed_vec(n_types),
            lj2: zeroed_vec(n_types),
            param_set: vec![false; n_types],
            warned_unset: false,
            state: ComputeState::new(),
            prof: None,
        }
    }

    // Getters
    pub fn r_cut(&self) -> f64 {
        self.r_cut
    }
    pub fn walls(&self) -> &Vec<Wall> {
        &self.walls
    }
    pub fn num_walls(&self) -> usize {
        self.walls.len()
    }

    pub fn add_wall(&mut self, wall: Wall) {
        self.walls.push(wall);
    }

    /// Set epsilon and sigma for one particle type against every wall
    pub fn set_params(&mut self, type_idx: u32, epsilon: f64, sigma: f64) -> Result<(), Error> {
        if type_idx >= self.n_types as u32 {
            return Err(Error::InvalidType {
                type_idx,
                n_types: self.n_types as u32,
            });
        }
        let sigma6 = sigma.powi(6);
        self.lj1[type_idx as usize] = 4.0 * epsilon * sigma6 * sigma6;
        self.lj2[type_idx as usize] = 4.0 * epsilon * sigma6;
        self.param_set[type_idx as usize] = true;
        Ok(())
    }
}

impl ForceComputeTrait for WallForce {
    fn compute(&mut self, timestep: u64) {
        if !self.state.should_compute(timestep) {
            return;
        }
        if let Some(prof) = &self.prof {
            prof.borrow_mut().push("Wall");
        }
        if !self.warned_unset && self.param_set.iter().any(|&set| !set) {
            log::warn!("Wall parameters are unset for some particle types, treating as zero");
            self.warned_unset = true;
        }

        let pdata = Rc::clone(&self.pdata);
        let r_cut_sq = self.r_cut * self.r_cut;
        let arrays = pdata.acquire_read();
        let mut forces = self.buffer.acquire_write();

        let mut n_calc: u64 = 0;
        for i in 0..arrays.len() {
            let p = arrays.position(i);
            let type_i = arrays.types[i] as usize;
            let mut fxi = 0.0;
            let mut fyi = 0.0;
            let mut fzi = 0.0;
            for wall in &self.walls {
                let dist = wall.distance_to(p);
                let r_sq = dist * dist;
                // a particle exactly on the plane feels nothing
                if r_sq >= r_cut_sq || r_sq == 0.0 {
                    continue;
                }
                let r2inv = 1.0 / r_sq;
                let r6inv = r2inv * r2inv * r2inv;
                let force_over_r =
                    r2inv * r6inv * (12.0 * self.lj1[type_i] * r6inv - 6.0 * self.lj2[type_i]);
                let normal = wall.normal();
                fxi += dist * normal[0] * force_over_r;
                fyi += dist * normal[1] * force_over_r;
                fzi += dist * normal[2] * force_over_r;
                n_calc += 1;
            }
            forces.fx[i] = fxi;
            forces.fy[i] = fyi;
            forces.fz[i] = fzi;
        }
        let n = arrays.len() as u64;
        drop(forces);
        drop(arrays);

        if let Some(prof) = &self.prof {
            prof.borrow_mut().pop_with(20 * n_calc, 24 * n_calc + 48 * n);
        }
    }

    fn buffer(&self) -> &ForceBuffer {
        &self.buffer
    }

    fn set_profiler(&mut self, prof: Option<Rc<RefCell<Profiler>>>) {
        self.prof = prof.clone();
        self.buffer.set_profiler(prof);
    }
}
