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
use std::sync::Arc;

use super::zipfian::ZipfianGenerator;
use super::{Counter, Generator};

/// Skews towards keys that were inserted most recently, by drawing a
/// Zipfian offset back from `basis`'s current watermark.
///
/// `basis` is an `Arc` rather than a borrowed reference, since this
/// generator does not own the counter's lifetime -- the worker that
/// owns the counter hands out clones of the same `Arc` to every
/// generator that needs to observe it.
pub struct SkewedLatestGenerator {
    basis: Arc<dyn Counter<Output = u64>>,
    zipfian: ZipfianGenerator,
    last: AtomicU64,
}

impl SkewedLatestGenerator {
    /// Creates a generator that skews towards the most recent keys
    /// issued by `basis`.
    pub fn new(basis: Arc<dyn Counter<Output = u64>>) -> Self {
        let max = basis.last().max(1);
        let zipfian = ZipfianGenerator::new(0, max);
        Self {
            basis,
            zipfian,
            last: AtomicU64::new(0),
        }
    }
}

impl Generator for SkewedLatestGenerator {
    type Output = u64;

    fn next(&self) -> Self::Output {
        let max = self.basis.last().max(1);
        let offset = self.zipfian.next_upto(max);
        let val = max - offset;
        self.last.store(val, Ordering::Relaxed);
        val
    }

    fn last(&self) -> Self::Output {
        self.last.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::counter::CounterGenerator;

    #[test]
    fn stays_within_issued_range() {
        let basis = Arc::new(CounterGenerator::new(0));
        for _ in 0..10_000 {
            basis.next();
        }
        let gen = SkewedLatestGenerator::new(basis.clone());
        for _ in 0..1000 {
            let v = gen.next();
            assert!(v <= basis.last());
        }
    }

    #[test]
    fn tracks_growth() {
        let basis = Arc::new(CounterGenerator::new(0));
        basis.next();
        let gen = SkewedLatestGenerator::new(basis.clone());
        for _ in 0..5000 {
            basis.next();
        }
        let v = gen.next();
        assert!(v <= basis.last());
    }
}
