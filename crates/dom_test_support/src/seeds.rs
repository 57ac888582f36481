//! Deterministic randomness for seeded property tests.
//!
//! `DOM_MIRROR_FUZZ_SEEDS` sets how many seeds a test runs (default 200, 50 under
//! CI) and `DOM_MIRROR_FUZZ_SEED` the base seed (decimal or `0x` hex).
pub const SEED_COUNT_ENV: &str = "DOM_MIRROR_FUZZ_SEEDS";
pub const SEED_BASE_ENV: &str = "DOM_MIRROR_FUZZ_SEED";

pub fn fuzz_seed_count() -> usize {
    if let Ok(value) = std::env::var(SEED_COUNT_ENV)
        && let Ok(parsed) = value.parse::<usize>()
        && parsed > 0
    {
        return parsed;
    }
    if std::env::var("CI").is_ok() { 50 } else { 200 }
}

pub fn fuzz_seed_base() -> u64 {
    if let Ok(value) = std::env::var(SEED_BASE_ENV) {
        if let Some(hex) = value.strip_prefix("0x")
            && let Ok(parsed) = u64::from_str_radix(hex, 16)
        {
            return parsed;
        }
        if let Ok(parsed) = value.parse::<u64>() {
            return parsed;
        }
    }
    0x5d0b_3a71_c2e4_9f18
}

/// Mixes a test name and a per-case salt into the base seed (FNV-1a).
pub fn derive_seed(base: u64, name: &str, salt: u64) -> u64 {
    let mut hash = 0xcbf29ce484222325u64;
    for byte in name.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    base ^ hash ^ salt.wrapping_mul(0x9e3779b97f4a7c15)
}

pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self(seed)
    }

    pub fn next_u32(&mut self) -> u32 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1);
        (self.0 >> 32) as u32
    }

    /// Uniform-ish in `min..max`; `min` when the range is empty.
    pub fn gen_range(&mut self, min: usize, max: usize) -> usize {
        if max <= min {
            return min;
        }
        min + (self.next_u32() as usize % (max - min))
    }

    pub fn chance(&mut self, one_in: usize) -> bool {
        self.gen_range(0, one_in.max(1)) == 0
    }

    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        items.get(self.gen_range(0, items.len()))
    }
}
