//! A single seeded generator type is threaded through ensemble training so
//! that a run is reproducible given a seed. `ChaCha8Rng` is used instead of
//! `rand::rngs::StdRng`: StdRng's algorithm is explicitly not guaranteed to
//! stay the same across `rand` releases, while ChaCha8Rng is a named,
//! documented, stable algorithm.

pub use rand_chacha::ChaCha8Rng;
use rand::SeedableRng;

pub fn seeded(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}
