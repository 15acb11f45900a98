use std::{cell::RefCell, rc::Rc};

use crate::{
    compute::ComputeState,
    force::{ForceBuffer, ForceComputeTrait},
    particle::ParticleData,
    profiler::Profiler,
};

/// Applies the same fixed force to every particle
pub struct ConstForce {
    buffer: ForceBuffer,
    force: [f64; 3],
    state: ComputeState,
}
impl ConstForce {
    pub fn new(pdata: &ParticleData, fx: f64, fy: f64, fz: f64) -> Self {
        Self {
            buffer: ForceBuffer::new(pdata.num_particles(), Rc::clone(pdata.exec())),
            force: [fx, fy, fz],
            state: ComputeState::new(),
        }
    }

    pub fn force(&self) -> [f64; 3] {
        self.force
    }
    /// Change the applied force; takes effect at the next computed timestep
    pub fn set_force(&mut self, fx: f64, fy: f64, fz: f64) {
        self.force = [fx, fy, fz];
    }
}

impl ForceComputeTrait for ConstForce {
    fn compute(&mut self, timestep: u64) {
        if !self.state.should_compute(timestep) {
            return;
        }
        let mut forces = self.buffer.acquire_write();
        forces.fx.fill(self.force[0]);
        forces.fy.fill(self.force[1]);
        forces.fz.fill(self.force[2]);
    }

    fn buffer(&self) -> &ForceBuffer {
        &self.buffer
    }

    fn set_profiler(&mut self, prof: Option<Rc<RefCell<Profiler>>>) {
        self.buffer.set_profiler(prof);
    }
}
