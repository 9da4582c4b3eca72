use dqmc_core::derive_substream_seed;

/// Derives the deterministic seed used for an independent chain.
pub fn chain_seed(master_seed: u64, chain_index: usize) -> u64 {
    derive_substream_seed(master_seed, chain_index as u64)
}

/// Seed for the random initial field, kept apart from the sweep stream so that a
/// resumed run and a fresh run draw the same update sequence.
pub fn field_seed(seed: u64) -> u64 {
    derive_substream_seed(seed ^ 0x5A5A_5A5A_5A5A_5A5A, 0)
}
