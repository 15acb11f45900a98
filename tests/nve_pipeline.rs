//! End-to-end runs through the initializer, neighbor list, force, and
//! integrator pipeline.

use std::{cell::RefCell, rc::Rc};

use approx::assert_relative_eq;
use ferromd::{
    neighbor::Bins,
    particle::{thermal_velocities, RandomInitializer, SimpleCubicInitializer},
    BuildMethod, Execution, ForceComputeTrait, LjForce, NeighborList, NveUpdater, ParticleData,
    Profiler, TempAnalyzer, Updater, Wall, WallForce,
};

fn random_fluid(n: usize, phi_p: f64, seed: u64) -> Rc<ParticleData> {
    let exec = Rc::new(Execution::host_only());
    let mut init = RandomInitializer::new(n, phi_p, 0.85);
    init.set_seed(seed);
    Rc::new(ParticleData::from_initializer(&init, exec).expect("Initializer error"))
}

fn lj_nlist(pdata: &Rc<ParticleData>, r_cut: f64, r_buff: f64) -> Rc<RefCell<NeighborList>> {
    Rc::new(RefCell::new(NeighborList::new(
        Rc::clone(pdata),
        r_cut,
        r_buff,
        BuildMethod::Binned,
    )))
}

/// Every particle in a perfect simple cubic lattice at the potential
/// minimum spacing sits at an inversion center, so net forces cancel
/// and nothing moves.
#[test]
fn lattice_at_the_lj_minimum_stays_in_place() {
    let spacing = 2.0_f64.powf(1.0 / 6.0);
    let init = SimpleCubicInitializer::new(6, spacing);
    let exec = Rc::new(Execution::host_only());
    let pdata =
        Rc::new(ParticleData::from_initializer(&init, exec).expect("Initializer error"));
    let initial: Vec<[f64; 3]> = {
        let arrays = pdata.acquire_read();
        (0..arrays.len()).map(|i| arrays.position(i)).collect()
    };

    let nlist = lj_nlist(&pdata, 2.0, 0.3);
    let mut lj = LjForce::new(Rc::clone(&pdata), nlist, 2.0);
    lj.set_params(0, 0, 1.0, 1.0).expect("Valid types");
    let mut nve = NveUpdater::new(Rc::clone(&pdata), 0.005);
    nve.add_force_compute(lj.into());

    for timestep in 0..20 {
        nve.update(timestep);
    }

    let arrays = pdata.acquire_read();
    for (i, p0) in initial.iter().enumerate() {
        let p = arrays.position(i);
        for axis in 0..3 {
            assert!(
                (p[axis] - p0[axis]).abs() < 1e-9,
                "Particle {} drifted on axis {}: {} -> {}",
                i,
                axis,
                p0[axis],
                p[axis]
            );
        }
    }
}

#[test]
fn fluid_run_stays_in_the_box_and_touches_every_timestep() {
    let pdata = random_fluid(200, 0.2, 5);
    {
        let mut arrays = pdata.acquire_write();
        thermal_velocities(&mut arrays, 1.2, 6);
    }
    let prof = Rc::new(RefCell::new(Profiler::new("pipeline")));
    let nlist = lj_nlist(&pdata, 3.0, 0.4);
    nlist.borrow_mut().set_profiler(Some(Rc::clone(&prof)));
    let mut lj = LjForce::new(Rc::clone(&pdata), Rc::clone(&nlist), 3.0);
    lj.set_params(0, 0, 1.0, 1.0).expect("Valid types");
    let mut nve = NveUpdater::new(Rc::clone(&pdata), 0.005);
    nve.add_force_compute(lj.into());
    nve.set_profiler(Some(Rc::clone(&prof)));

    let num_steps: u64 = 50;
    for timestep in 0..num_steps {
        nve.update(timestep);
    }

    let box_dim = pdata.box_dim();
    {
        let arrays = pdata.acquire_read();
        for i in 0..arrays.len() {
            let p = arrays.position(i);
            assert!(
                p[0] >= box_dim.xlo() && p[0] < box_dim.xhi(),
                "Particle {} left the box: x = {}",
                i,
                p[0]
            );
            assert!(p[1] >= box_dim.ylo() && p[1] < box_dim.yhi());
            assert!(p[2] >= box_dim.zlo() && p[2] < box_dim.zhi());
            assert!(arrays.vx[i].is_finite() && arrays.vz[i].is_finite());
        }
    }

    let temperature = TempAnalyzer::new(Rc::clone(&pdata)).temperature();
    assert!(
        temperature.is_finite() && temperature > 0.0,
        "Temperature should stay physical, found {}",
        temperature
    );

    // timesteps 0 ..= num_steps each get exactly one staleness check
    assert_eq!(nlist.borrow().num_checks(), num_steps + 1);
    assert!(nlist.borrow().num_updates() >= 1);

    let report = prof.borrow().to_string();
    for label in ["NVE", "LJ", "Neighbor", "Sum accel"] {
        assert!(report.contains(label), "Report should mention {}", label);
    }
}

#[test]
fn fluid_energy_is_conserved() {
    let pdata = random_fluid(150, 0.3, 9);
    {
        let mut arrays = pdata.acquire_write();
        thermal_velocities(&mut arrays, 0.9, 10);
    }
    let r_cut = 3.0;
    let nlist = lj_nlist(&pdata, r_cut, 0.3);
    let mut lj = LjForce::new(Rc::clone(&pdata), nlist, r_cut);
    lj.set_params(0, 0, 1.0, 1.0).expect("Valid types");
    let mut nve = NveUpdater::new(Rc::clone(&pdata), 0.0005);
    nve.add_force_compute(lj.into());

    let total_energy = |pdata: &ParticleData| {
        let box_dim = pdata.box_dim();
        let arrays = pdata.acquire_read();
        let mut energy = 0.0;
        for i in 0..arrays.len() {
            energy += 0.5
                * (arrays.vx[i] * arrays.vx[i]
                    + arrays.vy[i] * arrays.vy[i]
                    + arrays.vz[i] * arrays.vz[i]);
            for j in 0..i {
                let r_sq = box_dim.min_image_dist_sq(&arrays.position(i), &arrays.position(j));
                if r_sq < r_cut * r_cut {
                    let r6inv = 1.0 / (r_sq * r_sq * r_sq);
                    energy += 4.0 * (r6inv * r6inv - r6inv);
                }
            }
        }
        energy
    };

    let initial = total_energy(&pdata);
    for timestep in 0..200 {
        nve.update(timestep);
    }
    let after = total_energy(&pdata);

    // the truncation step at r_cut leaks a little energy per crossing
    assert!(
        (after - initial).abs() < 1.5,
        "Energy drifted from {:.4} to {:.4}",
        initial,
        after
    );
}

#[test]
fn wall_reflects_a_ballistic_particle() {
    let exec = Rc::new(Execution::host_only());
    let pdata = Rc::new(ParticleData::new(1, ferromd::BoxDim::cube(20.0), exec));
    {
        let mut arrays = pdata.acquire_write();
        arrays.vz[0] = 1.0;
    }
    let mut wall_force = WallForce::new(Rc::clone(&pdata), 1.0);
    wall_force.add_wall(Wall::new([0.0, 0.0, 2.0], [0.0, 0.0, 1.0]));
    wall_force.set_params(0, 1.0, 1.0).expect("Valid type");
    let mut nve = NveUpdater::new(Rc::clone(&pdata), 0.001);
    nve.add_force_compute(wall_force.into());

    for timestep in 0..2500 {
        nve.update(timestep);
    }

    let arrays = pdata.acquire_read();
    assert!(
        arrays.z[0] < 1.0,
        "Particle should have come back out of the wall zone, found z = {}",
        arrays.z[0]
    );
    assert!(
        (arrays.vz[0] + 1.0).abs() < 0.05,
        "Reflection should be elastic, found vz = {}",
        arrays.vz[0]
    );
    assert_eq!(arrays.vx[0], 0.0);
    assert_eq!(arrays.vy[0], 0.0);
}

/// Sorting the storage by spatial bin must not change any physical
/// quantity tracked by tag.
#[test]
fn spatial_sort_preserves_forces_by_tag() {
    let pdata = random_fluid(200, 0.2, 13);
    let nlist = lj_nlist(&pdata, 2.5, 0.4);
    let mut lj = LjForce::new(Rc::clone(&pdata), Rc::clone(&nlist), 2.5);
    lj.set_params(0, 0, 1.0, 1.0).expect("Valid types");

    lj.compute(0);
    let (rtags_before, forces_before) = {
        let arrays = pdata.acquire_read();
        let forces = lj.acquire();
        (
            arrays.rtags.clone(),
            (0..forces.len()).map(|i| forces.force(i)).collect::<Vec<_>>(),
        )
    };

    nlist.borrow_mut().sort_by_bins();
    lj.compute(1);

    let arrays = pdata.acquire_read();
    let identity: Vec<u32> = (0..pdata.num_particles() as u32).collect();
    assert_ne!(arrays.tags, identity, "The sort should have moved particles");
    let bins = Bins::new(pdata.box_dim(), 2.5 + 0.4);
    let keys: Vec<usize> = (0..arrays.len())
        .map(|i| bins.flat_index(arrays.position(i)))
        .collect();
    assert!(
        keys.windows(2).all(|w| w[0] <= w[1]),
        "Bin keys should be nondecreasing after the sort"
    );

    let forces = lj.acquire();
    for tag in 0..pdata.num_particles() as u32 {
        let before = forces_before[rtags_before[tag as usize] as usize];
        let after = forces.force(arrays.rtags[tag as usize] as usize);
        for axis in 0..3 {
            assert_relative_eq!(before[axis], after[axis], epsilon = 1e-6);
        }
    }
}
