mod nve;

pub use nve::NveUpdater;

use std::{cell::RefCell, rc::Rc};

use crate::{
    force::{ForceCompute, ForceComputeTrait},
    particle::ParticleData,
    profiler::Profiler,
};

/// Trait for things that advance the system by one timestep
pub trait Updater {
    fn update(&mut self, timestep: u64);
}

/// Shared base for integrators: the particle data, the registered
/// forces, and the step size.
pub struct Integrator {
    pdata: Rc<ParticleData>,
    forces: Vec<ForceCompute>,
    delta_t: f64,
    prof: Option<Rc<RefCell<Profiler>>>,
}
impl Integrator {
    pub fn new(pdata: Rc<ParticleData>, delta_t: f64) -> Self {
        assert!(
            delta_t > 0.0,
            "Timestep size should be positive, found {}",
            delta_t
        );
        Self {
            pdata,
            forces: Vec::new(),
            delta_t,
            prof: None,
        }
    }

    // Getters
    pub fn delta_t(&self) -> f64 {
        self.delta_t
    }
    pub fn num_forces(&self) -> usize {
        self.forces.len()
    }

    pub fn set_delta_t(&mut self, delta_t: f64) {
        assert!(
            delta_t > 0.0,
            "Timestep size should be positive, found {}",
            delta_t
        );
        self.delta_t = delta_t;
    }

    pub fn add_force_compute(&mut self, force: ForceCompute) {
        self.forces.push(force);
    }

    /// Ask every registered force to log its statistics
    pub fn print_stats(&self) {
        for force in self.forces.iter() {
            force.print_stats();
        }
    }

    /// Attach a profiler to the integrator and every registered force
    pub fn set_profiler(&mut self, prof: Option<Rc<RefCell<Profiler>>>) {
        for force in self.forces.iter_mut() {
            force.set_profiler(prof.clone());
        }
        self.prof = prof;
    }

    /// Run every force at the given timestep, then sum the buffers into
    /// the acceleration arrays. Particle mass is 1, so a = sum F.
    pub fn compute_accelerations(&mut self, timestep: u64, profile_name: &str) {
        for force in self.forces.iter_mut() {
            force.compute(timestep);
        }
        if let Some(prof) = &self.prof {
            let mut prof = prof.borrow_mut();
            prof.push(profile_name);
            prof.push("Sum accel");
        }

        let pdata = Rc::clone(&self.pdata);
        {
            let mut arrays = pdata.acquire_write();
            arrays.ax.fill(0.0);
            arrays.ay.fill(0.0);
            arrays.az.fill(0.0);
            for force in self.forces.iter() {
                let forces = force.acquire();
                for i in 0..forces.len() {
                    arrays.ax[i] += forces.fx[i];
                    arrays.ay[i] += forces.fy[i];
                    arrays.az[i] += forces.fz[i];
                }
            }
        }

        if let Some(prof) = &self.prof {
            let mut prof = prof.borrow_mut();
            prof.pop();
            prof.pop();
        }
    }
}
