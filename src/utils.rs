use num_traits::Zero;

/// Stable counting-sort permutation over small integer keys.
///
/// Returns `order` with `order[new] == old`, so `keys[order[0]]` is a
/// smallest key. Meant for bin indices, where the key range is about
/// the same size as the input.
///
/// ```rust
/// use ferromd::utils::counting_sort_order;
///
/// let bins = vec![2, 0, 1];
/// assert_eq!(counting_sort_order(&bins), vec![1, 2, 0]);
/// ```
pub fn counting_sort_order(keys: &[usize]) -> Vec<usize> {
    let num_buckets = match keys.iter().max() {
        Some(&max) => max + 1,
        None => return Vec::new(),
    };
    // offsets[k] is where the next entry with key k lands
    let mut offsets = vec![0usize; num_buckets + 1];
    for &k in keys {
        offsets[k + 1] += 1;
    }
    for k in 1..=num_buckets {
        offsets[k] += offsets[k - 1];
    }
    let mut order = vec![0usize; keys.len()];
    for (old, &k) in keys.iter().enumerate() {
        order[offsets[k]] = old;
        offsets[k] += 1;
    }
    order
}

/// Apply a permutation to one per-particle array.
///
/// `order[new] == old`; giving every array of a bundle the same `order`
/// keeps their entries aligned.
///
/// ```rust
/// use ferromd::utils::{apply_order, counting_sort_order};
///
/// let keys = vec![2usize, 0, 1];
/// let order = counting_sort_order(&keys);
/// let mut prop = vec![1.0, 2.0, 3.0];
/// apply_order(&order, &mut prop);
/// assert_eq!(prop, vec![2.0, 3.0, 1.0]);
/// ```
pub fn apply_order<T: Copy>(order: &[usize], values: &mut Vec<T>) {
    assert_eq!(order.len(), values.len());
    let sorted: Vec<T> = order.iter().map(|&old| values[old]).collect();
    *values = sorted;
}

/// Allocate a zero-filled vector of the given length
pub fn zeroed_vec<T: Zero + Clone>(len: usize) -> Vec<T> {
    vec![T::zero(); len]
}
