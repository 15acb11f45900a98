use std::{cell::RefCell, rc::Rc};

use ferromd::{
    particle::{thermal_velocities, RandomInitializer},
    Analyzer, BuildMethod, Error, Execution, LjForce, NeighborList, NveUpdater, ParticleData,
    Profiler, TempAnalyzer, Updater,
};

const NUM_PARTICLES: usize = 1000;
const NUM_STEPS: u64 = 500;

fn main() -> Result<(), Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let exec = Rc::new(Execution::host_only());
    let mut init = RandomInitializer::new(NUM_PARTICLES, 0.2, 0.85);
    init.set_seed(1);
    let pdata = Rc::new(ParticleData::from_initializer(&init, exec)?);
    {
        let mut arrays = pdata.acquire_write();
        thermal_velocities(&mut arrays, 1.2, 2);
    }
    log::info!(
        "{} particles in a box of side {:.3}",
        pdata.num_particles(),
        pdata.box_dim().lx()
    );

    let prof = Rc::new(RefCell::new(Profiler::new("LJ liquid")));

    let nlist = Rc::new(RefCell::new(NeighborList::new(
        Rc::clone(&pdata),
        3.0,
        0.8,
        BuildMethod::Binned,
    )));
    nlist.borrow_mut().set_profiler(Some(Rc::clone(&prof)));
    // group particle storage by bin before the run
    nlist.borrow_mut().sort_by_bins();

    let mut lj = LjForce::new(Rc::clone(&pdata), Rc::clone(&nlist), 3.0);
    lj.set_params(0, 0, 1.0, 1.0)?;

    let mut nve = NveUpdater::new(Rc::clone(&pdata), 0.005);
    nve.add_force_compute(lj.into());
    nve.set_profiler(Some(Rc::clone(&prof)));

    let mut temp = TempAnalyzer::new(Rc::clone(&pdata));
    temp.set_profiler(Some(Rc::clone(&prof)));

    for timestep in 0..NUM_STEPS {
        if timestep % 100 == 0 {
            temp.analyze(timestep);
        }
        nve.update(timestep);
    }
    temp.analyze(NUM_STEPS);

    nve.print_stats();
    nlist.borrow().print_stats();
    println!("{}", prof.borrow());
    Ok(())
}
