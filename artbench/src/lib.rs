//! Shared key-generation workloads for the benchmark driver and the
//! criterion benches.

use std::collections::BTreeSet;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Key population shapes, matching the driver's numeric modes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Workload {
    /// Mode 0: `1..=n`, in order.
    DenseSorted,
    /// Mode 1: `1..=n`, shuffled.
    DenseRandom,
    /// Mode 2: two random 32-bit halves concatenated, masked to 63 bits.
    PseudoSparse,
}

impl Workload {
    /// Map the driver's numeric mode argument.
    pub fn from_mode(mode: u8) -> Option<Workload> {
        match mode {
            0 => Some(Workload::DenseSorted),
            1 => Some(Workload::DenseRandom),
            2 => Some(Workload::PseudoSparse),
            _ => None,
        }
    }
}

/// Generate `n` distinct tuple identifiers for a workload. Randomness is
/// seeded for reproducible runs.
pub fn generate_keys(n: usize, workload: Workload, seed: u64) -> Vec<u64> {
    match workload {
        Workload::DenseSorted => (1..=n as u64).collect(),
        Workload::DenseRandom => {
            let mut keys: Vec<u64> = (1..=n as u64).collect();
            keys.shuffle(&mut StdRng::seed_from_u64(seed));
            keys
        }
        Workload::PseudoSparse => {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut seen = BTreeSet::new();
            let mut keys = Vec::with_capacity(n);
            while keys.len() < n {
                let tid =
                    (((rng.gen::<u32>() as u64) << 32) | rng.gen::<u32>() as u64) & (u64::MAX >> 1);
                if seen.insert(tid) {
                    keys.push(tid);
                }
            }
            keys
        }
    }
}
