use crate::utils;

/// Per-particle state as independent contiguous arrays.
///
/// Each field is its own allocation; entry `i` of every array belongs to
/// the same particle. `tags[i]` identifies a particle for its whole life,
/// and `rtags[tags[i] as usize] == i` holds through every reordering.
/// Lengths are equal and fixed at construction.
#[derive(Clone, Debug)]
pub struct ParticleArrays {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
    pub vx: Vec<f64>,
    pub vy: Vec<f64>,
    pub vz: Vec<f64>,
    pub ax: Vec<f64>,
    pub ay: Vec<f64>,
    pub az: Vec<f64>,
    pub types: Vec<u32>,
    pub tags: Vec<u32>,
    pub rtags: Vec<u32>,
}
impl ParticleArrays {
    /// All-zero state for `n` particles of type 0, with identity tags
    pub fn zeroed(n: usize) -> Self {
        assert!(n > 0, "Number of particles should be positive, found {}", n);
        Self {
            x: utils::zeroed_vec(n),
            y: utils::zeroed_vec(n),
            z: utils::zeroed_vec(n),
            vx: utils::zeroed_vec(n),
            vy: utils::zeroed_vec(n),
            vz: utils::zeroed_vec(n),
            ax: utils::zeroed_vec(n),
            ay: utils::zeroed_vec(n),
            az: utils::zeroed_vec(n),
            types: utils::zeroed_vec(n),
            tags: (0..n as u32).collect(),
            rtags: (0..n as u32).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }
    /// Position of particle `i`
    pub fn position(&self, i: usize) -> [f64; 3] {
        [self.x[i], self.y[i], self.z[i]]
    }

    /// Reorder particles by the given index permutation and rebuild rtags.
    ///
    /// `order[new_idx] == old_idx`, as produced by
    /// [`utils::counting_sort_order`]. Tags travel with their particles,
    /// so the tag/rtag bijection survives.
    pub fn reorder(&mut self, order: &[usize]) {
        utils::apply_order(order, &mut self.x);
        utils::apply_order(order, &mut self.y);
        utils::apply_order(order, &mut self.z);
        utils::apply_order(order, &mut self.vx);
        utils::apply_order(order, &mut self.vy);
        utils::apply_order(order, &mut self.vz);
        utils::apply_order(order, &mut self.ax);
        utils::apply_order(order, &mut self.ay);
        utils::apply_order(order, &mut self.az);
        utils::apply_order(order, &mut self.types);
        utils::apply_order(order, &mut self.tags);
        for (i, &tag) in self.tags.iter().enumerate() {
            self.rtags[tag as usize] = i as u32;
        }
    }
}
