/// Tracks whether a cached quantity needs recomputing this timestep.
///
/// The first query always computes; after that a given timestep computes at
/// most once, no matter how many collaborators share the owner.
#[derive(Clone, Debug)]
pub struct ComputeState {
    first_compute: bool,
    last_computed: u64,
}
impl ComputeState {
    pub fn new() -> Self {
        Self {
            first_compute: true,
            last_computed: 0,
        }
    }
    /// Whether a compute at `timestep` should proceed, recording it if so
    pub fn should_compute(&mut self, timestep: u64) -> bool {
        if self.first_compute {
            self.first_compute = false;
            self.last_computed = timestep;
            return true;
        }
        if self.last_computed != timestep {
            self.last_computed = timestep;
            return true;
        }
        false
    }
}
