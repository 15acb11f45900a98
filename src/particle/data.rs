use std::{
    cell::{Cell, RefCell, RefMut},
    ops::{Deref, DerefMut},
    rc::Rc,
};

use crate::{
    device::{Access, DeviceBuffer, Execution, Location, Mirrored},
    particle::{Initializer, ParticleArrays},
    BoxDim, Error,
};

/// Owner of all per-particle state, shared across a run by `Rc`.
///
/// The arrays sit behind an acquire/release protocol: at most one guard is
/// live at a time, acquiring makes the requested side current (copying if
/// it was stale), and dropping the guard releases the data. Acquiring
/// while a guard is live is a programming error and panics immediately.
pub struct ParticleData {
    arrays: RefCell<Mirrored<ParticleArrays>>,
    box_dim: Cell<BoxDim>,
    acquired: Cell<bool>,
    n: usize,
    n_types: usize,
    exec: Rc<Execution>,
}
impl ParticleData {
    // Creation

    /// `n` particles of a single type, all state zero, identity tags
    pub fn new(n: usize, box_dim: BoxDim, exec: Rc<Execution>) -> Self {
        Self::with_types(n, 1, box_dim, exec)
    }
    /// `n` particles with `n_types` available types
    pub fn with_types(n: usize, n_types: usize, box_dim: BoxDim, exec: Rc<Execution>) -> Self {
        assert!(
            n_types > 0,
            "Number of particle types should be positive, found {}",
            n_types
        );
        let arrays = ParticleArrays::zeroed(n);
        Self {
            arrays: RefCell::new(Mirrored::new(arrays, Rc::clone(&exec))),
            box_dim: Cell::new(box_dim),
            acquired: Cell::new(false),
            n,
            n_types,
            exec,
        }
    }
    /// Build the starting state from an initializer
    pub fn from_initializer(init: &impl Initializer, exec: Rc<Execution>) -> Result<Self, Error> {
        let mut arrays = ParticleArrays::zeroed(init.num_particles());
        init.init_arrays(&mut arrays)?;
        Ok(Self {
            arrays: RefCell::new(Mirrored::new(arrays, Rc::clone(&exec))),
            box_dim: Cell::new(init.box_dim()),
            acquired: Cell::new(false),
            n: init.num_particles(),
            n_types: init.num_particle_types(),
            exec,
        })
    }

    // Getters
    pub fn num_particles(&self) -> usize {
        self.n
    }
    pub fn num_types(&self) -> usize {
        self.n_types
    }
    pub fn box_dim(&self) -> BoxDim {
        self.box_dim.get()
    }
    pub fn exec(&self) -> &Rc<Execution> {
        &self.exec
    }
    /// Where the authoritative copy currently lives
    pub fn location(&self) -> Location {
        self.arrays.borrow().location()
    }

    /// Replace the periodic box. Collaborators caching geometry must
    /// detect this through [`ParticleData::box_dim`].
    pub fn set_box_dim(&self, box_dim: BoxDim) {
        self.box_dim.set(box_dim);
    }

    // Acquiring

    /// Borrow the arrays for host-side reading
    pub fn acquire_read(&self) -> ReadGuard<'_> {
        self.start_acquire();
        let mut arrays = self.arrays.borrow_mut();
        arrays.sync_host(Access::ReadOnly);
        ReadGuard {
            arrays,
            acquired: &self.acquired,
        }
    }
    /// Borrow the arrays for host-side writing; the device copy goes stale
    pub fn acquire_write(&self) -> WriteGuard<'_> {
        self.start_acquire();
        let mut arrays = self.arrays.borrow_mut();
        arrays.sync_host(Access::ReadWrite);
        WriteGuard {
            arrays,
            acquired: &self.acquired,
        }
    }
    /// Device-side read access, uploading first if the device copy is
    /// stale. Panics on a host-only execution.
    pub fn acquire_read_device(&self) -> DeviceGuard<'_> {
        self.start_acquire();
        let mut arrays = self.arrays.borrow_mut();
        arrays.sync_device(Access::ReadOnly);
        let buffer = arrays.device_buffer();
        DeviceGuard {
            buffer,
            _arrays: arrays,
            acquired: &self.acquired,
        }
    }
    /// Device-side write access; the host copy goes stale
    pub fn acquire_write_device(&self) -> DeviceGuard<'_> {
        self.start_acquire();
        let mut arrays = self.arrays.borrow_mut();
        arrays.sync_device(Access::ReadWrite);
        let buffer = arrays.device_buffer();
        DeviceGuard {
            buffer,
            _arrays: arrays,
            acquired: &self.acquired,
        }
    }

    fn start_acquire(&self) {
        assert!(
            !self.acquired.get(),
            "Particle data acquired while a previous acquire is still live"
        );
        self.acquired.set(true);
    }
}

/// Shared read view of the particle arrays; dropping it releases the data
pub struct ReadGuard<'a> {
    arrays: RefMut<'a, Mirrored<ParticleArrays>>,
    acquired: &'a Cell<bool>,
}
impl Deref for ReadGuard<'_> {
    type Target = ParticleArrays;
    fn deref(&self) -> &ParticleArrays {
        self.arrays.host_ref()
    }
}
impl Drop for ReadGuard<'_> {
    fn drop(&mut self) {
        self.acquired.set(false);
    }
}

/// Exclusive write view of the particle arrays; dropping it releases the
/// data
pub struct WriteGuard<'a> {
    arrays: RefMut<'a, Mirrored<ParticleArrays>>,
    acquired: &'a Cell<bool>,
}
impl Deref for WriteGuard<'_> {
    type Target = ParticleArrays;
    fn deref(&self) -> &ParticleArrays {
        self.arrays.host_ref()
    }
}
impl DerefMut for WriteGuard<'_> {
    fn deref_mut(&mut self) -> &mut ParticleArrays {
        self.arrays.host_mut()
    }
}
impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        self.acquired.set(false);
    }
}

/// Device-side view handing out the buffer handle for kernel launches
pub struct DeviceGuard<'a> {
    buffer: DeviceBuffer<ParticleArrays>,
    _arrays: RefMut<'a, Mirrored<ParticleArrays>>,
    acquired: &'a Cell<bool>,
}
impl DeviceGuard<'_> {
    pub fn buffer(&self) -> DeviceBuffer<ParticleArrays> {
        self.buffer
    }
}
impl Drop for DeviceGuard<'_> {
    fn drop(&mut self) {
        self.acquired.set(false);
    }
}
