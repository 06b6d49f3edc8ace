//! Randomized index selection for shuffle mode

use rand::Rng;

/// Pick a uniformly random index in `0..len` that differs from `current`
///
/// A queue of one has nowhere else to go, so `current` is returned.
/// `len` must be non-zero.
pub fn pick_other_index<R: Rng + ?Sized>(len: usize, current: usize, rng: &mut R) -> usize {
    if len <= 1 {
        return current;
    }

    // Draw from the len-1 other slots and step over `current`
    let pick = rng.gen_range(0..len - 1);
    if pick >= current {
        pick + 1
    } else {
        pick
    }
}
