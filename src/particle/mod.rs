mod arrays;
mod data;
mod init;

pub use arrays::ParticleArrays;
pub use data::{DeviceGuard, ParticleData, ReadGuard, WriteGuard};
pub use init::{thermal_velocities, Initializer, RandomInitializer, SimpleCubicInitializer};
