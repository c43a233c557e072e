use crate::chess::bits::{BOARD_SIZE, BOARD_WIDTH};
use rand::{Rng, SeedableRng};
use std::array::from_fn;
use std::sync::LazyLock;

// One fixed pseudo-random key per hashable position feature. Each table gets
// its own seed so the hash of a feature class never depends on table order.

pub static PIECE_KEYS: LazyLock<[[[u64; BOARD_SIZE]; 6]; 2]> = LazyLock::new(|| {
    let mut rng = rand::rngs::SmallRng::seed_from_u64(11);
    from_fn(|_| from_fn(|_| from_fn(|_| rng.random())))
});

pub static SIDE_KEY: LazyLock<u64> = LazyLock::new(|| {
    let mut rng = rand::rngs::SmallRng::seed_from_u64(12);
    rng.random()
});

pub static CASTLING_KEYS: LazyLock<[u64; 16]> = LazyLock::new(|| {
    let mut rng = rand::rngs::SmallRng::seed_from_u64(13);
    from_fn(|_| rng.random())
});

pub static EN_PASSANT_KEYS: LazyLock<[u64; BOARD_WIDTH]> = LazyLock::new(|| {
    let mut rng = rand::rngs::SmallRng::seed_from_u64(14);
    from_fn(|_| rng.random())
});
