//! Processing-order shuffle.
//!
//! The allocator is first-fit, so the order in which records are visited
//! decides who ends up together. Each topic gets a fresh permutation of the
//! roster positions; the roster itself is never reordered.
//!
//! Randomness is best-effort. Callers that need reproducible runs pass a
//! seeded RNG (see [`seeded_rng`]).

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Return a new random permutation of `0..len`.
pub fn shuffle_order<R: Rng + ?Sized>(len: usize, rng: &mut R) -> Vec<usize> {
    let mut order: Vec<usize> = (0..len).collect();
    order.shuffle(rng);
    order
}

/// Build the RNG for a run: deterministic when `seed` is given, entropy-seeded
/// otherwise.
#[must_use]
pub fn seeded_rng(seed: Option<u64>) -> StdRng {
    seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64)
}
