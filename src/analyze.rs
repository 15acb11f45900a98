use std::{cell::RefCell, rc::Rc};

use crate::{particle::ParticleData, profiler::Profiler};

/// Trait for observers that inspect state without changing it
pub trait Analyzer {
    fn analyze(&mut self, timestep: u64);
}

/// Reports the instantaneous temperature.
///
/// At unit mass T = 2 KE / (3 N - 3), with three degrees of freedom
/// removed for the conserved center-of-mass momentum.
pub struct TempAnalyzer {
    pdata: Rc<ParticleData>,
    prof: Option<Rc<RefCell<Profiler>>>,
}
impl TempAnalyzer {
    pub fn new(pdata: Rc<ParticleData>) -> Self {
        assert!(
            pdata.num_particles() > 1,
            "Temperature requires at least 2 particles, found {}",
            pdata.num_particles()
        );
        Self { pdata, prof: None }
    }

    pub fn set_profiler(&mut self, prof: Option<Rc<RefCell<Profiler>>>) {
        self.prof = prof;
    }

    /// Instantaneous temperature from the current velocities
    pub fn temperature(&self) -> f64 {
        let arrays = self.pdata.acquire_read();
        let twice_kinetic: f64 = (0..arrays.len())
            .map(|i| {
                arrays.vx[i] * arrays.vx[i]
                    + arrays.vy[i] * arrays.vy[i]
                    + arrays.vz[i] * arrays.vz[i]
            })
            .sum();
        twice_kinetic / (3 * arrays.len() - 3) as f64
    }
}
impl Analyzer for TempAnalyzer {
    fn analyze(&mut self, timestep: u64) {
        if let Some(prof) = &self.prof {
            prof.borrow_mut().push("Temp");
        }
        let temperature = self.temperature();
        if let Some(prof) = &self.prof {
            prof.borrow_mut().pop();
        }
        log::info!("Timestep {}: temperature {:.4}", timestep, temperature);
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::{
        device::Execution,
        particle::{thermal_velocities, RandomInitializer},
        BoxDim,
    };

    #[test]
    fn counterpropagating_pair() {
        let exec = Rc::new(Execution::host_only());
        let pdata = Rc::new(ParticleData::new(2, BoxDim::cube(10.0), exec));
        {
            let mut arrays = pdata.acquire_write();
            arrays.vx[0] = 1.0;
            arrays.vx[1] = -1.0;
        }
        let analyzer = TempAnalyzer::new(pdata);

        // 2 KE = 2, dof = 3
        assert_relative_eq!(analyzer.temperature(), 2.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn recovers_the_sampling_temperature() {
        let exec = Rc::new(Execution::host_only());
        let mut init = RandomInitializer::new(4000, 0.2, 0.0);
        init.set_seed(7);
        let pdata =
            Rc::new(ParticleData::from_initializer(&init, exec).expect("Initializer error"));
        {
            let mut arrays = pdata.acquire_write();
            thermal_velocities(&mut arrays, 1.5, 11);
        }
        let analyzer = TempAnalyzer::new(pdata);
        let temperature = analyzer.temperature();
        assert!(
            (temperature - 1.5).abs() < 0.1,
            "Sampled temperature should be near 1.5, found {}",
            temperature
        );
    }

    #[test]
    #[should_panic(expected = "at least 2 particles")]
    fn a_single_particle_has_no_temperature() {
        let exec = Rc::new(Execution::host_only());
        let pdata = Rc::new(ParticleData::new(1, BoxDim::cube(10.0), exec));
        TempAnalyzer::new(pdata);
    }
}
