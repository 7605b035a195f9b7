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

use rand::{thread_rng, Rng};

use super::{Generator, NumberGenerator};

/// Generates values uniformly at random from `[lower_bound, upper_bound]`
/// inclusive, via a thread-local Mersenne-twister-class PRNG.
#[derive(Debug)]
pub struct UniformGenerator {
    lower_bound: u64,
    upper_bound: u64,
    last: AtomicU64,
}

impl UniformGenerator {
    /// Creates a generator that returns integers uniformly at random from
    /// `[lower_bound, upper_bound]` inclusive.
    pub fn new(lower_bound: u64, upper_bound: u64) -> Self {
        Self {
            lower_bound,
            upper_bound,
            last: AtomicU64::new(lower_bound),
        }
    }
}

impl Generator for UniformGenerator {
    type Output = u64;

    fn next(&self) -> Self::Output {
        let val = thread_rng().gen_range(self.lower_bound..=self.upper_bound);
        self.last.store(val, Ordering::Relaxed);
        val
    }

    fn last(&self) -> Self::Output {
        self.last.load(Ordering::Relaxed)
    }
}

impl NumberGenerator for UniformGenerator {
    fn mean(&self) -> f64 {
        (self.lower_bound as f64 + self.upper_bound as f64) / 2.0
    }
}
