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

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use itertools::Itertools;
use parking_lot::RwLock;

use super::{AcknowledgedCounter, Counter, Generator};
use crate::error::{Result, UkvsbError};

/// Number of in-flight ids the window can track before `acknowledge()`
/// starts refusing acknowledgments for ids older than the window. Chosen
/// to bound memory use regardless of how many threads are issuing keys.
const WINDOW_SIZE: usize = 1 << 16;
const WINDOW_MASK: usize = WINDOW_SIZE - 1;

/// A counter that decouples "issued" from "visible". `next()` hands out
/// fresh ids monotonically via a sliding window of booleans; `last()`
/// only advances past an id once [`AcknowledgedCounter::acknowledge`] has
/// been called for it, so a reader racing an in-flight writer never
/// targets a key that is not actually there yet.
#[derive(Debug)]
pub struct AcknowledgedCounterGenerator {
    counter: AtomicU64,
    windows: Vec<AtomicBool>,
    limit: RwLock<u64>,
}

impl AcknowledgedCounterGenerator {
    /// Create a counter that starts issuing ids at `start`.
    pub fn new(start: u64) -> Self {
        Self {
            counter: AtomicU64::new(start),
            windows: (0..WINDOW_SIZE).map(|_| AtomicBool::new(false)).collect_vec(),
            limit: RwLock::new(start.wrapping_sub(1)),
        }
    }
}

impl Generator for AcknowledgedCounterGenerator {
    type Output = u64;

    fn next(&self) -> Self::Output {
        self.counter.fetch_add(1, Ordering::Relaxed)
    }

    fn last(&self) -> Self::Output {
        *self.limit.read()
    }
}

impl AcknowledgedCounter for AcknowledgedCounterGenerator {
    fn acknowledge(&self, val: u64) -> Result<()> {
        let slot = val as usize & WINDOW_MASK;
        if self.windows[slot].fetch_or(true, Ordering::SeqCst) {
            return Err(UkvsbError::GeneratorExhausted {
                window: WINDOW_SIZE,
            });
        }

        if let Some(mut limit) = self.limit.try_write() {
            let stop = *limit as usize & WINDOW_MASK;
            let mut index = limit.wrapping_add(1);
            while index as usize & WINDOW_MASK != stop {
                let slot = index as usize & WINDOW_MASK;
                if !self.windows[slot].load(Ordering::SeqCst) {
                    break;
                }
                self.windows[slot].store(false, Ordering::SeqCst);
                index = index.wrapping_add(1);
            }
            *limit = index.wrapping_sub(1);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_order_acknowledgment_advances_last() {
        let gen = AcknowledgedCounterGenerator::new(0);
        for _ in 0..10 {
            let id = gen.next();
            gen.acknowledge(id).unwrap();
        }
        assert_eq!(gen.last(), 9);
    }

    #[test]
    fn out_of_order_acknowledgment_stalls_until_gap_fills() {
        let gen = AcknowledgedCounterGenerator::new(0);
        let ids: Vec<u64> = (0..5).map(|_| gen.next()).collect();
        gen.acknowledge(ids[1]).unwrap();
        gen.acknowledge(ids[2]).unwrap();
        assert_eq!(gen.last(), u64::MAX);
        gen.acknowledge(ids[0]).unwrap();
        assert_eq!(gen.last(), 2);
        gen.acknowledge(ids[4]).unwrap();
        assert_eq!(gen.last(), 2);
        gen.acknowledge(ids[3]).unwrap();
        assert_eq!(gen.last(), 4);
    }

    #[test]
    fn reacknowledging_the_same_id_is_rejected() {
        let gen = AcknowledgedCounterGenerator::new(0);
        let id = gen.next();
        gen.acknowledge(id).unwrap();
        assert!(gen.acknowledge(id).is_err());
    }
}
