use rand::Rng;
use rand::seq::index;

use crate::error::Result;
use crate::frequency::FrequencyTable;
use crate::types::{PICK_COUNT, POOL_SIZE, Strategy};

/// The 20 numbers a strategy draws from. Ties at the boundary go to the lower number,
/// so the pool is always exactly 20 wide.
pub fn candidate_pool(frequencies: &FrequencyTable, strategy: Strategy) -> [u8; POOL_SIZE] {
    let ranked = match strategy {
        Strategy::Top20 => frequencies.ranked_desc(),
        Strategy::Bottom20 => frequencies.ranked_asc(),
    };

    let mut pool = [0u8; POOL_SIZE];
    pool.copy_from_slice(&ranked[..POOL_SIZE]);
    pool
}

/// Picks six distinct numbers uniformly from the strategy's pool, sorted ascending.
pub fn recommend<R: Rng + ?Sized>(
    frequencies: &FrequencyTable,
    strategy: Strategy,
    rng: &mut R,
) -> [u8; PICK_COUNT] {
    let pool = candidate_pool(frequencies, strategy);

    let mut picked = [0u8; PICK_COUNT];
    for (slot, i) in picked
        .iter_mut()
        .zip(index::sample(rng, POOL_SIZE, PICK_COUNT))
    {
        *slot = pool[i];
    }
    picked.sort_unstable();
    picked
}

pub fn recommend_by_name<R: Rng + ?Sized>(
    frequencies: &FrequencyTable,
    strategy: &str,
    rng: &mut R,
) -> Result<[u8; PICK_COUNT]> {
    let strategy: Strategy = strategy.parse()?;
    Ok(recommend(frequencies, strategy, rng))
}
