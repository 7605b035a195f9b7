//  Copyright 2024 MrCroxx
//
//  Licensed under the Apache License, Version 2.0 (the "License");
//  you may not use this file except in compliance with the License.
//  You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.

use std::sync::atomic::{AtomicU64, Ordering};

use super::zipfian::ZipfianGenerator;
use super::{Generator, NumberGenerator};
use crate::utils::fnvhash64;

/// Size of the virtual domain the inner Zipfian generator draws from.
const VIRTUAL_ITEMS: u64 = 10_000_000_000;

/// `zeta(VIRTUAL_ITEMS, 0.99)`, precomputed: summing ten billion terms at
/// construction time is infeasible, so the converged value is baked in as
/// a constant instead.
const ZETA_VIRTUAL_ITEMS_THETA_099: f64 = 26.469_028_201_783_02;

/// A Zipfian generator whose hot keys are scattered across the output
/// range instead of clustering at its low end. Draws from a Zipfian
/// distribution over a large virtual domain, then scrambles the draw
/// through an FNV-1a hash before folding it into `[lo, hi]`.
#[derive(Debug)]
pub struct ScrambledZipfianGenerator {
    lo: u64,
    count: u64,
    inner: ZipfianGenerator,
    last: AtomicU64,
}

impl ScrambledZipfianGenerator {
    /// Creates a scrambled Zipfian generator over `[lo, hi]` inclusive.
    pub fn new(lo: u64, hi: u64) -> Self {
        let inner = ZipfianGenerator::with_precomputed_zetan(
            0,
            VIRTUAL_ITEMS - 1,
            super::zipfian::DEFAULT_THETA,
            ZETA_VIRTUAL_ITEMS_THETA_099,
        );
        Self {
            lo,
            count: hi - lo + 1,
            inner,
            last: AtomicU64::new(lo),
        }
    }

    fn scramble(&self, value: u64) -> u64 {
        self.lo + fnvhash64(value) % self.count
    }
}

impl Generator for ScrambledZipfianGenerator {
    type Output = u64;

    fn next(&self) -> Self::Output {
        let raw = self.inner.next();
        let val = self.scramble(raw);
        self.last.store(val, Ordering::Relaxed);
        val
    }

    fn last(&self) -> Self::Output {
        self.last.load(Ordering::Relaxed)
    }
}

impl NumberGenerator for ScrambledZipfianGenerator {
    fn mean(&self) -> f64 {
        self.lo as f64 + (self.count as f64 - 1.0) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stays_in_range() {
        let gen = ScrambledZipfianGenerator::new(100, 10_100);
        for _ in 0..10_000 {
            let v = gen.next();
            assert!((100..=10_100).contains(&v));
        }
    }

    #[test]
    fn scrambling_spreads_hot_keys() {
        let gen = ScrambledZipfianGenerator::new(0, 999);
        let mut counts = [0u32; 1000];
        for _ in 0..50_000 {
            counts[gen.next() as usize] += 1;
        }
        // A pure (non-scrambled) Zipfian draw would pile almost
        // everything onto index 0; scrambling should keep any single
        // bucket from dominating the sample.
        let max = *counts.iter().max().unwrap();
        assert!((max as f64) < 50_000.0 * 0.2);
    }
}
