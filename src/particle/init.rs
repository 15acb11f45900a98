use std::f64::consts::PI;

use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::Distribution;

use crate::{particle::ParticleArrays, BoxDim, Error};

/// Placement attempts per particle before random initialization gives up
const MAX_PLACEMENT_ATTEMPTS: u32 = 10_000;

/// Produces the starting state of a simulation.
///
/// `init_arrays` receives zeroed arrays sized for `num_particles` and
/// fills them; fields it leaves alone keep their zero defaults.
pub trait Initializer {
    fn num_particles(&self) -> usize;
    fn num_particle_types(&self) -> usize;
    fn box_dim(&self) -> BoxDim;
    fn init_arrays(&self, arrays: &mut ParticleArrays) -> Result<(), Error>;
}

/// M x M x M particles on a simple cubic lattice, one type.
///
/// The box side is `m * spacing`, centered at the origin, with particles
/// starting on the low corner. The x index varies fastest.
pub struct SimpleCubicInitializer {
    m: usize,
    spacing: f64,
}
impl SimpleCubicInitializer {
    pub fn new(m: usize, spacing: f64) -> Self {
        assert!(m > 0, "Lattice dimension should be positive");
        assert!(
            spacing > 0.0,
            "Lattice spacing should be positive, found {}",
            spacing
        );
        Self { m, spacing }
    }
}
impl Initializer for SimpleCubicInitializer {
    fn num_particles(&self) -> usize {
        self.m * self.m * self.m
    }
    fn num_particle_types(&self) -> usize {
        1
    }
    fn box_dim(&self) -> BoxDim {
        BoxDim::cube(self.m as f64 * self.spacing)
    }
    fn init_arrays(&self, arrays: &mut ParticleArrays) -> Result<(), Error> {
        let box_dim = self.box_dim();
        let mut idx = 0;
        for k in 0..self.m {
            for j in 0..self.m {
                for i in 0..self.m {
                    arrays.x[idx] = box_dim.xlo() + i as f64 * self.spacing;
                    arrays.y[idx] = box_dim.ylo() + j as f64 * self.spacing;
                    arrays.z[idx] = box_dim.zlo() + k as f64 * self.spacing;
                    idx += 1;
                }
            }
        }
        Ok(())
    }
}

/// Randomly placed particles with a minimum pair separation, one type.
///
/// The box is a cube sized so that `n` unit-diameter spheres fill the
/// packing fraction `phi_p`. Placement is rejection sampling under the
/// minimum-image metric and is deterministic for a fixed seed.
pub struct RandomInitializer {
    n: usize,
    phi_p: f64,
    min_dist: f64,
    seed: u64,
}
impl RandomInitializer {
    pub fn new(n: usize, phi_p: f64, min_dist: f64) -> Self {
        assert!(n > 0, "Number of particles should be positive, found {}", n);
        assert!(
            phi_p > 0.0,
            "Packing fraction should be positive, found {}",
            phi_p
        );
        assert!(
            min_dist >= 0.0,
            "Minimum distance should be non-negative, found {}",
            min_dist
        );
        Self {
            n,
            phi_p,
            min_dist,
            seed: 0,
        }
    }
    /// Reseed the generator; equal seeds place identically
    pub fn set_seed(&mut self, seed: u64) {
        self.seed = seed;
    }
}
impl Initializer for RandomInitializer {
    fn num_particles(&self) -> usize {
        self.n
    }
    fn num_particle_types(&self) -> usize {
        1
    }
    fn box_dim(&self) -> BoxDim {
        let l = (PI / 6.0 * self.n as f64 / self.phi_p).cbrt();
        BoxDim::cube(l)
    }
    fn init_arrays(&self, arrays: &mut ParticleArrays) -> Result<(), Error> {
        let box_dim = self.box_dim();
        let min_dist_sq = self.min_dist * self.min_dist;
        let mut rng = StdRng::seed_from_u64(self.seed);

        for i in 0..self.n {
            let mut attempts = 0;
            loop {
                attempts += 1;
                let p = [
                    rng.gen::<f64>() * box_dim.lx() + box_dim.xlo(),
                    rng.gen::<f64>() * box_dim.ly() + box_dim.ylo(),
                    rng.gen::<f64>() * box_dim.lz() + box_dim.zlo(),
                ];
                let accepted = (0..i)
                    .all(|j| box_dim.min_image_dist_sq(&p, &arrays.position(j)) >= min_dist_sq);
                if accepted {
                    arrays.x[i] = p[0];
                    arrays.y[i] = p[1];
                    arrays.z[i] = p[2];
                    break;
                }
                if attempts >= MAX_PLACEMENT_ATTEMPTS {
                    return Err(Error::PlacementFailed {
                        particle: i,
                        attempts,
                        min_dist: self.min_dist,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Overwrite velocities with a Maxwell-Boltzmann draw at `temperature`,
/// unit mass. Deterministic for a fixed seed.
pub fn thermal_velocities(arrays: &mut ParticleArrays, temperature: f64, seed: u64) {
    assert!(
        temperature >= 0.0,
        "Temperature should be non-negative, found {}",
        temperature
    );
    let mut rng = StdRng::seed_from_u64(seed);
    let dist = rand_distr::Normal::new(0.0, temperature.sqrt()).expect("Invalid temperature");
    for i in 0..arrays.len() {
        arrays.vx[i] = dist.sample(&mut rng);
        arrays.vy[i] = dist.sample(&mut rng);
        arrays.vz[i] = dist.sample(&mut rng);
    }
}
