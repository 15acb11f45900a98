use super::*;

/// Velocity-Verlet integrator at constant energy.
///
/// Positions wrap back into the box every step; a particle is assumed
/// to move less than one box length per step.
pub struct NveUpdater {
    base: Integrator,
    accel_set: bool,
    warned_no_forces: bool,
}
impl NveUpdater {
    pub fn new(pdata: Rc<ParticleData>, delta_t: f64) -> Self {
        Self {
            base: Integrator::new(pdata, delta_t),
            accel_set: false,
            warned_no_forces: false,
        }
    }

    pub fn delta_t(&self) -> f64 {
        self.base.delta_t()
    }
    pub fn set_delta_t(&mut self, delta_t: f64) {
        self.base.set_delta_t(delta_t);
    }
    pub fn add_force_compute(&mut self, force: ForceCompute) {
        self.base.add_force_compute(force);
    }
    pub fn set_profiler(&mut self, prof: Option<Rc<RefCell<Profiler>>>) {
        self.base.set_profiler(prof);
    }
    pub fn print_stats(&self) {
        self.base.print_stats();
    }
}

impl Updater for NveUpdater {
    fn update(&mut self, timestep: u64) {
        if self.base.forces.is_empty() && !self.warned_no_forces {
            log::warn!("No forces registered, integrating ballistically");
            self.warned_no_forces = true;
        }
        // the very first step needs accelerations from before any motion
        if !self.accel_set {
            self.accel_set = true;
            self.base.compute_accelerations(timestep, "NVE");
        }

        if let Some(prof) = &self.base.prof {
            let mut prof = prof.borrow_mut();
            prof.push("NVE");
            prof.push("Half-step 1");
        }
        let pdata = Rc::clone(&self.base.pdata);
        let box_dim = pdata.box_dim();
        let dt = self.base.delta_t();
        {
            let mut arrays = pdata.acquire_write();
            for i in 0..arrays.len() {
                arrays.x[i] += arrays.vx[i] * dt + 0.5 * arrays.ax[i] * dt * dt;
                arrays.y[i] += arrays.vy[i] * dt + 0.5 * arrays.ay[i] * dt * dt;
                arrays.z[i] += arrays.vz[i] * dt + 0.5 * arrays.az[i] * dt * dt;
                arrays.vx[i] += 0.5 * arrays.ax[i] * dt;
                arrays.vy[i] += 0.5 * arrays.ay[i] * dt;
                arrays.vz[i] += 0.5 * arrays.az[i] * dt;
                if arrays.ax[i].abs() > 1e6
                    || arrays.ay[i].abs() > 1e6
                    || arrays.az[i].abs() > 1e6
                {
                    log::warn!(
                        "Timestep {}: particle {} has acceleration ({:.3e}, {:.3e}, {:.3e})",
                        timestep,
                        i,
                        arrays.ax[i],
                        arrays.ay[i],
                        arrays.az[i]
                    );
                }
                let (x, y, z) = box_dim.wrap(arrays.x[i], arrays.y[i], arrays.z[i]);
                arrays.x[i] = x;
                arrays.y[i] = y;
                arrays.z[i] = z;
            }
        }
        if let Some(prof) = &self.base.prof {
            let mut prof = prof.borrow_mut();
            prof.pop();
            prof.pop();
        }

        // forces at the new positions; each one profiles itself
        self.base.compute_accelerations(timestep + 1, "NVE");

        if let Some(prof) = &self.base.prof {
            let mut prof = prof.borrow_mut();
            prof.push("NVE");
            prof.push("Half-step 2");
        }
        {
            let mut arrays = pdata.acquire_write();
            for i in 0..arrays.len() {
                arrays.vx[i] += 0.5 * arrays.ax[i] * dt;
                arrays.vy[i] += 0.5 * arrays.ay[i] * dt;
                arrays.vz[i] += 0.5 * arrays.az[i] * dt;
            }
        }
        if let Some(prof) = &self.base.prof {
            let mut prof = prof.borrow_mut();
            prof.pop();
            prof.pop();
        }
    }
}
