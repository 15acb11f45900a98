mod buffer;
pub mod constant;
pub mod lj;
pub mod wall;

pub use buffer::{ForceArrays, ForceBuffer, ForceDeviceGuard, ForceReadGuard, ForceWriteGuard};
pub use constant::ConstForce;
pub use lj::LjForce;
pub use wall::{Wall, WallForce};

use std::{cell::RefCell, rc::Rc};

use enum_dispatch::enum_dispatch;

use crate::profiler::Profiler;

#[enum_dispatch]
pub enum ForceCompute {
    LjForce,
    WallForce,
    ConstForce,
}
#[enum_dispatch(ForceCompute)]
/// Trait for per-particle force computations
pub trait ForceComputeTrait {
    /// Recompute forces unless this timestep was already computed
    fn compute(&mut self, timestep: u64);

    /// The buffer the last compute filled
    fn buffer(&self) -> &ForceBuffer;

    /// Read view of the forces, copied to the host if stale
    fn acquire(&self) -> ForceReadGuard<'_> {
        self.buffer().acquire_read()
    }

    /// Device view of the forces, copied to the device if stale
    fn acquire_device(&self) -> ForceDeviceGuard<'_> {
        self.buffer().acquire_read_device()
    }

    /// Attach or detach a profiler
    fn set_profiler(&mut self, prof: Option<Rc<RefCell<Profiler>>>);

    /// Log accumulated statistics; the default reports nothing
    fn print_stats(&self) {}
}
