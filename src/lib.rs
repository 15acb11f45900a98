pub mod analyze;
pub mod box_dim;
pub mod compute;
pub mod device;
pub mod error;
pub mod force;
pub mod integrator;
pub mod neighbor;
pub mod particle;
pub mod profiler;
pub mod utils;

pub use analyze::{Analyzer, TempAnalyzer};
pub use box_dim::BoxDim;
pub use device::Execution;
pub use error::Error;
pub use force::*;
pub use integrator::{NveUpdater, Updater};
pub use neighbor::{BuildMethod, NeighborList};
pub use particle::ParticleData;
pub use profiler::Profiler;
