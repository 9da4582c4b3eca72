//! Seeded random streams for Markov chains.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use siphasher::sip::SipHasher13;
use std::hash::Hasher;

/// Random stream owned by exactly one Markov chain.
///
/// Every stream starts from an explicit `u64` seed. Streams branched from one master seed
/// go through [`derive_substream_seed`], so a run is reproducible from its master seed
/// alone.
#[derive(Debug, Clone)]
pub struct RngHandle {
    rng: StdRng,
}

impl RngHandle {
    /// Stream seeded directly with `seed`.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Stream number `substream` branched from `master_seed`.
    pub fn substream(master_seed: u64, substream: u64) -> Self {
        Self::from_seed(derive_substream_seed(master_seed, substream))
    }

    /// Uniform variate in `[0, 1)`.
    pub fn uniform(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    /// Fair `±1` draw for an Ising-like field component.
    pub fn ising(&mut self) -> f64 {
        if self.rng.gen::<bool>() {
            1.0
        } else {
            -1.0
        }
    }

    /// Metropolis test against the weight ratio `ratio`; the magnitude is used so that
    /// negative weights are accepted with probability `min(1, |ratio|)`.
    pub fn metropolis(&mut self, ratio: f64) -> bool {
        self.uniform() < ratio.abs()
    }
}

/// SipHash-1-3 with zero keys over `(master_seed, substream)`.
pub fn derive_substream_seed(master_seed: u64, substream: u64) -> u64 {
    let mut hasher = SipHasher13::new_with_keys(0, 0);
    hasher.write_u64(master_seed);
    hasher.write_u64(substream);
    hasher.finish()
}
