use std::{
    cell::{Cell, RefCell, RefMut},
    ops::{Deref, DerefMut},
    rc::Rc,
};

use crate::{
    device::{Access, DeviceBuffer, Execution, Mirrored},
    profiler::Profiler,
    utils::zeroed_vec,
};

/// Per-particle force components, indexed like the particle arrays
#[derive(Clone, Debug)]
pub struct ForceArrays {
    pub fx: Vec<f64>,
    pub fy: Vec<f64>,
    pub fz: Vec<f64>,
}
impl ForceArrays {
    pub fn zeroed(n: usize) -> Self {
        assert!(n > 0, "Number of particles should be positive, found {}", n);
        Self {
            fx: zeroed_vec(n),
            fy: zeroed_vec(n),
            fz: zeroed_vec(n),
        }
    }

    pub fn len(&self) -> usize {
        self.fx.len()
    }
    pub fn force(&self, i: usize) -> [f64; 3] {
        [self.fx[i], self.fy[i], self.fz[i]]
    }
    /// Memory footprint of one copy, for profiling transfers
    pub fn num_bytes(&self) -> u64 {
        (self.len() * 3 * std::mem::size_of::<f64>()) as u64
    }
}

/// Dual-location storage for the output of one force computation.
///
/// Starts zeroed on the host. Holders of a guard have exclusive access;
/// a second acquire before the first guard drops is a bug and panics.
/// Host/device copies triggered by an acquire are charged to the
/// profiler as "Force copy" when one is attached.
pub struct ForceBuffer {
    arrays: RefCell<Mirrored<ForceArrays>>,
    num_bytes: u64,
    acquired: Cell<bool>,
    prof: Option<Rc<RefCell<Profiler>>>,
}
impl ForceBuffer {
    pub fn new(n: usize, exec: Rc<Execution>) -> Self {
        let arrays = ForceArrays::zeroed(n);
        Self {
            num_bytes: arrays.num_bytes(),
            arrays: RefCell::new(Mirrored::new(arrays, exec)),
            acquired: Cell::new(false),
            prof: None,
        }
    }

    pub fn set_profiler(&mut self, prof: Option<Rc<RefCell<Profiler>>>) {
        self.prof = prof;
    }

    pub fn acquire_read(&self) -> ForceReadGuard<'_> {
        self.start_acquire();
        let mut arrays = self.arrays.borrow_mut();
        self.sync_host_profiled(&mut arrays, Access::ReadOnly);
        ForceReadGuard {
            arrays,
            acquired: &self.acquired,
        }
    }

    pub fn acquire_write(&self) -> ForceWriteGuard<'_> {
        self.start_acquire();
        let mut arrays = self.arrays.borrow_mut();
        self.sync_host_profiled(&mut arrays, Access::ReadWrite);
        ForceWriteGuard {
            arrays,
            acquired: &self.acquired,
        }
    }

    pub fn acquire_read_device(&self) -> ForceDeviceGuard<'_> {
        self.acquire_device(Access::ReadOnly)
    }

    pub fn acquire_write_device(&self) -> ForceDeviceGuard<'_> {
        self.acquire_device(Access::ReadWrite)
    }

    fn acquire_device(&self, access: Access) -> ForceDeviceGuard<'_> {
        self.start_acquire();
        let mut arrays = self.arrays.borrow_mut();
        let copying = arrays.device_is_stale();
        self.push_copy_region(copying);
        arrays.sync_device(access);
        self.pop_copy_region(copying);
        let buffer = arrays.device_buffer();
        ForceDeviceGuard {
            buffer,
            _arrays: arrays,
            acquired: &self.acquired,
        }
    }

    fn start_acquire(&self) {
        assert!(
            !self.acquired.get(),
            "Force buffer acquired while a previous acquire is still live"
        );
        self.acquired.set(true);
    }

    fn sync_host_profiled(&self, arrays: &mut RefMut<'_, Mirrored<ForceArrays>>, access: Access) {
        let copying = arrays.host_is_stale();
        self.push_copy_region(copying);
        arrays.sync_host(access);
        self.pop_copy_region(copying);
    }

    fn push_copy_region(&self, copying: bool) {
        if copying {
            if let Some(prof) = &self.prof {
                prof.borrow_mut().push("Force copy");
            }
        }
    }

    fn pop_copy_region(&self, copying: bool) {
        if copying {
            if let Some(prof) = &self.prof {
                prof.borrow_mut().pop_with(0, self.num_bytes);
            }
        }
    }
}

pub struct ForceReadGuard<'a> {
    arrays: RefMut<'a, Mirrored<ForceArrays>>,
    acquired: &'a Cell<bool>,
}
impl Deref for ForceReadGuard<'_> {
    type Target = ForceArrays;
    fn deref(&self) -> &ForceArrays {
        self.arrays.host_ref()
    }
}
impl Drop for ForceReadGuard<'_> {
    fn drop(&mut self) {
        self.acquired.set(false);
    }
}

pub struct ForceWriteGuard<'a> {
    arrays: RefMut<'a, Mirrored<ForceArrays>>,
    acquired: &'a Cell<bool>,
}
impl Deref for ForceWriteGuard<'_> {
    type Target = ForceArrays;
    fn deref(&self) -> &ForceArrays {
        self.arrays.host_ref()
    }
}
impl DerefMut for ForceWriteGuard<'_> {
    fn deref_mut(&mut self) -> &mut ForceArrays {
        self.arrays.host_mut()
    }
}
impl Drop for ForceWriteGuard<'_> {
    fn drop(&mut self) {
        self.acquired.set(false);
    }
}

pub struct ForceDeviceGuard<'a> {
    buffer: DeviceBuffer<ForceArrays>,
    _arrays: RefMut<'a, Mirrored<ForceArrays>>,
    acquired: &'a Cell<bool>,
}
impl ForceDeviceGuard<'_> {
    pub fn buffer(&self) -> DeviceBuffer<ForceArrays> {
        self.buffer
    }
}
impl Drop for ForceDeviceGuard<'_> {
    fn drop(&mut self) {
        self.acquired.set(false);
    }
}
