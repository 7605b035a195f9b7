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

use std::sync::atomic::{AtomicUsize, Ordering};

/// A reusable spin-based rendezvous for exactly `threads_count` parties.
/// Every party calls [`ThreadFence::sync`]; none proceeds past the call
/// until all of them have arrived, and the fence resets itself so the
/// same instance can be reused for the next rendezvous (open phase,
/// per-thread loop, close phase all share one fence per orchestrator
/// run).
#[derive(Debug)]
pub struct ThreadFence {
    threads_count: usize,
    arrived: AtomicUsize,
    released: AtomicUsize,
}

impl ThreadFence {
    /// Build a fence for `threads_count` parties. `threads_count` must be
    /// at least 1, or every call to `sync()` spins forever.
    pub fn new(threads_count: usize) -> Self {
        Self {
            threads_count,
            arrived: AtomicUsize::new(0),
            released: AtomicUsize::new(0),
        }
    }

    /// Block the calling thread until every other party has also called
    /// `sync()`, then return. Safe to call back-to-back: the fence only
    /// admits a new wave of arrivals once the previous wave has fully
    /// drained.
    pub fn sync(&self) {
        while self.released.load(Ordering::Acquire) != 0 {
            std::hint::spin_loop();
        }

        self.arrived.fetch_add(1, Ordering::AcqRel);
        while self.arrived.load(Ordering::Acquire) != self.threads_count {
            std::hint::spin_loop();
        }

        let released = self.released.fetch_add(1, Ordering::AcqRel) + 1;
        if released == self.threads_count {
            self.arrived.store(0, Ordering::Release);
            self.released.store(0, Ordering::Release);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[test]
    fn releases_only_once_everyone_arrives() {
        let fence = Arc::new(ThreadFence::new(4));
        let mut handles = vec![];
        for _ in 0..4 {
            let fence = fence.clone();
            handles.push(std::thread::spawn(move || {
                fence.sync();
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
    }

    #[test]
    fn is_reusable_across_consecutive_waves() {
        let fence = Arc::new(ThreadFence::new(3));
        for _ in 0..5 {
            let mut handles = vec![];
            for _ in 0..3 {
                let fence = fence.clone();
                handles.push(std::thread::spawn(move || {
                    fence.sync();
                }));
            }
            for handle in handles {
                handle.join().unwrap();
            }
        }
    }

    #[test]
    fn single_party_never_blocks() {
        let fence = ThreadFence::new(1);
        for _ in 0..3 {
            fence.sync();
        }
    }

    #[test]
    fn laggard_does_not_let_others_race_ahead_into_next_wave() {
        let fence = Arc::new(ThreadFence::new(2));
        let f2 = fence.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            f2.sync();
            f2.sync();
        });
        fence.sync();
        fence.sync();
        handle.join().unwrap();
    }
}
