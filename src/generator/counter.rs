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

use super::Generator;

/// A plain monotonic id issuer: `next()` hands out `start, start+1, …`.
/// Used as the issuing generator during pure-insert phases, where there
/// is no acknowledgment gap between "issued" and "visible".
#[derive(Debug)]
pub struct CounterGenerator {
    counter: AtomicU64,
}

impl CounterGenerator {
    /// Create a counter that starts at `start`.
    pub fn new(start: u64) -> Self {
        Self {
            counter: AtomicU64::new(start),
        }
    }
}

impl Generator for CounterGenerator {
    type Output = u64;

    fn next(&self) -> Self::Output {
        self.counter.fetch_add(1, Ordering::Relaxed)
    }

    fn last(&self) -> Self::Output {
        self.counter.load(Ordering::Relaxed) - 1
    }
}
