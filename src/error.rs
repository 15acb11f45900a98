use thiserror::Error;

/// Recoverable failures reported to the caller.
///
/// Precondition and protocol violations (zero particles, non-positive
/// timestep, double acquire) panic instead of returning one of these.
#[derive(Error, Clone, Debug, PartialEq)]
pub enum Error {
    /// A coefficient was set for a particle type the system does not have.
    #[error("invalid particle type {type_idx} (system has {n_types} types)")]
    InvalidType { type_idx: u32, n_types: u32 },
    /// Random placement could not satisfy the minimum-distance constraint.
    #[error(
        "could not place particle {particle} after {attempts} attempts \
         (min_dist = {min_dist})"
    )]
    PlacementFailed {
        particle: usize,
        attempts: u32,
        min_dist: f64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_values() {
        let e = Error::InvalidType {
            type_idx: 3,
            n_types: 2,
        };
        assert_eq!(
            e.to_string(),
            "invalid particle type 3 (system has 2 types)"
        );

        let e = Error::PlacementFailed {
            particle: 41,
            attempts: 10_000,
            min_dist: 2.0,
        };
        assert!(e.to_string().contains("particle 41"));
        assert!(e.to_string().contains("10000 attempts"));
    }
}
