//! Seed derivation and the seeded random stream threaded through generation and traversal.

use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use rand_chacha::ChaCha8Rng;
use rand_chacha::rand_core::{Rng, SeedableRng};
use xxhash_rust::xxh3::xxh3_64;

const SEGMENT_DOMAIN: &[u8] = b"overworld/segment";
const MAP_DOMAIN: &[u8] = b"overworld/map";
const RUNTIME_DOMAIN: &[u8] = b"overworld/runtime";

static RUNTIME_DRAWS: AtomicU64 = AtomicU64::new(0);

/// Seed for segment `segment_index` of a run, stable for identical inputs.
pub fn derive_segment_seed(run_seed: u64, segment_index: usize) -> u64 {
    hash_seed(SEGMENT_DOMAIN, run_seed, segment_index as u64)
}

/// Run seed handed to map `map_index` of a traversal sequence.
pub fn derive_map_seed(run_seed: u64, map_index: usize) -> u64 {
    hash_seed(MAP_DOMAIN, run_seed, map_index as u64)
}

/// Seed drawn from the clock, for callers that do not pin one.
///
/// Draws within one process never repeat their inputs, so two traversals started in the same
/// instant still get different message streams.
pub fn runtime_seed() -> u64 {
    let clock = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_nanos() as u64);
    let draw = RUNTIME_DRAWS.fetch_add(1, Ordering::Relaxed);
    hash_seed(RUNTIME_DOMAIN, clock, (u64::from(process::id()) << 32) ^ draw)
}

/// Hashes `value` and `index` under a domain tag so the seed families never overlap.
fn hash_seed(domain: &[u8], value: u64, index: u64) -> u64 {
    let mut bytes = Vec::with_capacity(domain.len() + 16);
    bytes.extend_from_slice(domain);
    bytes.extend_from_slice(&value.to_le_bytes());
    bytes.extend_from_slice(&index.to_le_bytes());
    xxh3_64(&bytes)
}

/// Explicit random stream; every random decision in the crate goes through one of these.
#[derive(Clone, Debug)]
pub struct MapRng {
    inner: ChaCha8Rng,
}

impl MapRng {
    pub fn new(seed: u64) -> Self {
        Self { inner: ChaCha8Rng::seed_from_u64(seed) }
    }

    /// Uniform float in [0, 1).
    pub fn value(&mut self) -> f32 {
        (self.inner.next_u32() >> 8) as f32 / (1_u32 << 24) as f32
    }

    /// True with probability `chance`; values outside [0, 1] saturate.
    pub fn chance(&mut self, chance: f32) -> bool {
        self.value() < chance
    }

    /// Uniform integer in `[0, bound)`; `bound` must be non-zero.
    pub fn below(&mut self, bound: u64) -> u64 {
        debug_assert!(bound > 0);
        self.inner.next_u64() % bound
    }

    /// Uniform integer in `[min, max]`.
    pub fn range_inclusive(&mut self, min: u32, max: u32) -> u32 {
        debug_assert!(min <= max);
        let span = u64::from(max - min) + 1;
        min + self.below(span) as u32
    }

    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        items.get(self.below(items.len() as u64) as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_seed_changes_when_inputs_change() {
        let baseline = derive_segment_seed(99, 2);
        assert_ne!(baseline, derive_segment_seed(98, 2));
        assert_ne!(baseline, derive_segment_seed(99, 3));
        assert_eq!(baseline, derive_segment_seed(99, 2));
    }

    #[test]
    fn map_and_segment_seeds_do_not_collide() {
        for index in 0..8 {
            assert_ne!(derive_map_seed(5, index), derive_segment_seed(5, index));
        }
    }

    #[test]
    fn runtime_seeds_differ_between_draws() {
        let seeds: Vec<u64> = (0..16).map(|_| runtime_seed()).collect();
        for (i, seed) in seeds.iter().enumerate() {
            assert!(!seeds[i + 1..].contains(seed));
        }
    }

    #[test]
    fn range_inclusive_stays_inside_requested_bounds() {
        let mut rng = MapRng::new(12_345);
        for _ in 0..200 {
            let value = rng.range_inclusive(7, 13);
            assert!((7..=13).contains(&value));
        }
        assert_eq!(rng.range_inclusive(4, 4), 4);
    }

    #[test]
    fn unit_values_stay_below_one() {
        let mut rng = MapRng::new(7);
        for _ in 0..1_000 {
            let value = rng.value();
            assert!((0.0..1.0).contains(&value));
        }
    }

    #[test]
    fn same_seed_replays_the_same_stream() {
        let mut left = MapRng::new(42);
        let mut right = MapRng::new(42);
        for _ in 0..32 {
            assert_eq!(left.below(1_000), right.below(1_000));
        }
    }

    #[test]
    fn pick_from_empty_slice_is_none() {
        let mut rng = MapRng::new(1);
        let empty: [u8; 0] = [];
        assert!(rng.pick(&empty).is_none());
    }
}
