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

use parking_lot::RwLock;
use rand::{thread_rng, Rng};

use super::{Generator, NumberGenerator};

/// Default Zipfian skew constant.
pub const DEFAULT_THETA: f64 = 0.99;

/// Smallest key-space size a Zipfian generator will accept.
pub const MIN_N: u64 = 2;

/// Largest key-space size a Zipfian generator will accept (`2^40`).
pub const MAX_N: u64 = 1 << 40;

fn zeta_range(lo: u64, hi_inclusive: u64, theta: f64) -> f64 {
    (lo..=hi_inclusive).map(|i| (i as f64).powf(-theta)).sum()
}

struct State {
    /// Number of items currently covered, `hi - base + 1`.
    n: u64,
    zetan: f64,
    eta: f64,
}

/// Gray-Sanders rejection-free Zipfian generator over `[base, base + n -
/// 1]`. Supports growing `n` incrementally (shrinking is disallowed) so
/// the same instance can back a distribution whose upper bound advances
/// over time, as [`crate::generator::skewed_latest::SkewedLatestGenerator`]
/// requires.
pub struct ZipfianGenerator {
    base: u64,
    theta: f64,
    zeta2: f64,
    alpha: f64,
    state: RwLock<State>,
    last: AtomicU64,
}

impl ZipfianGenerator {
    /// Create a Zipfian generator over `[lo, hi]` inclusive with the
    /// default skew constant, computing `zeta(N, theta)` by direct
    /// summation.
    pub fn new(lo: u64, hi: u64) -> Self {
        Self::with_theta(lo, hi, DEFAULT_THETA)
    }

    /// As [`Self::new`], with an explicit skew constant.
    pub fn with_theta(lo: u64, hi: u64, theta: f64) -> Self {
        let n = hi - lo + 1;
        assert!(
            (MIN_N..MAX_N).contains(&n),
            "zipfian item count {n} out of bounds [{MIN_N}, {MAX_N})"
        );
        let zetan = zeta_range(1, n, theta);
        Self::build(lo, n, theta, zetan)
    }

    /// Build a generator whose `zeta(N, theta)` has already been
    /// computed elsewhere (e.g. a cached constant for a huge virtual
    /// domain where direct summation would be infeasible).
    pub fn with_precomputed_zetan(lo: u64, hi: u64, theta: f64, zetan: f64) -> Self {
        let n = hi - lo + 1;
        assert!(
            (MIN_N..MAX_N).contains(&n),
            "zipfian item count {n} out of bounds [{MIN_N}, {MAX_N})"
        );
        Self::build(lo, n, theta, zetan)
    }

    fn build(base: u64, n: u64, theta: f64, zetan: f64) -> Self {
        let zeta2 = zeta_range(1, 2, theta);
        let alpha = 1.0 / (1.0 - theta);
        let eta = Self::compute_eta(n, theta, zeta2, zetan);
        Self {
            base,
            theta,
            zeta2,
            alpha,
            state: RwLock::new(State { n, zetan, eta }),
            last: AtomicU64::new(base),
        }
    }

    fn compute_eta(n: u64, theta: f64, zeta2: f64, zetan: f64) -> f64 {
        (1.0 - (2.0 / n as f64).powf(1.0 - theta)) / (1.0 - zeta2 / zetan)
    }

    /// Draw a value from `[base, hi]` where `hi = base + n - 1`,
    /// extending the precomputed `zeta(N, theta)` first if `hi` grows the
    /// generator's range beyond what it has seen so far.
    pub fn next_upto(&self, hi: u64) -> u64 {
        let n = hi - self.base + 1;
        assert!(n >= MIN_N, "zipfian item count {n} below minimum {MIN_N}");

        {
            let state = self.state.read();
            if n > state.n {
                drop(state);
                self.grow(n);
            }
        }

        let (n, zetan, eta) = {
            let state = self.state.read();
            (state.n, state.zetan, state.eta)
        };

        let u: f64 = thread_rng().gen_range(0.0..1.0);
        let uz = u * zetan;

        let value = if uz < 1.0 {
            self.base
        } else if uz < 1.0 + 0.5f64.powf(self.theta) {
            self.base + 1
        } else {
            self.base + (n as f64 * (eta * u - eta + 1.0).powf(self.alpha)) as u64
        };

        self.last.store(value, Ordering::Relaxed);
        value
    }

    fn grow(&self, new_n: u64) {
        let mut state = self.state.write();
        if new_n <= state.n {
            // Another thread already grew past us.
            return;
        }
        let old_n = state.n;
        state.zetan += zeta_range(old_n + 1, new_n, self.theta);
        state.n = new_n;
        state.eta = Self::compute_eta(state.n, self.theta, self.zeta2, state.zetan);
    }
}

impl Generator for ZipfianGenerator {
    type Output = u64;

    fn next(&self) -> Self::Output {
        let hi = self.base + self.state.read().n - 1;
        self.next_upto(hi)
    }

    fn last(&self) -> Self::Output {
        self.last.load(Ordering::Relaxed)
    }
}

impl NumberGenerator for ZipfianGenerator {
    fn mean(&self) -> f64 {
        // The harmonic-like series underlying a Zipfian distribution has
        // no closed-form mean; report the midpoint of the current range
        // as a coarse estimate, matching the crate-wide convention that
        // `mean()` is an expectation hint rather than an exact value.
        let n = self.state.read().n as f64;
        self.base as f64 + (n - 1.0) / 2.0
    }
}
