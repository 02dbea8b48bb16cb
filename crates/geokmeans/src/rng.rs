use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

// pi * 100_000
const RANDOM_SEED: u64 = 314159;

pub fn new() -> Xoshiro256PlusPlus {
    Xoshiro256PlusPlus::seed_from_u64(RANDOM_SEED)
}

pub fn with_seed(seed: u64) -> Xoshiro256PlusPlus {
    Xoshiro256PlusPlus::seed_from_u64(seed)
}
