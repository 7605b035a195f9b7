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

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use sysinfo::{Pid, ProcessRefreshKind, RefreshKind, System};

/// Min/max/avg triple over a profiler's samples, reported once the
/// profiler stops.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stats {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

impl Default for Stats {
    fn default() -> Self {
        Self {
            min: f64::MAX,
            max: 0.0,
            avg: 0.0,
        }
    }
}

struct Samples {
    stats: Stats,
    count: u64,
}

impl Default for Samples {
    fn default() -> Self {
        Self {
            stats: Stats::default(),
            count: 0,
        }
    }
}

impl Samples {
    fn record(&mut self, value: f64) {
        self.count += 1;
        self.stats.min = self.stats.min.min(value);
        self.stats.max = self.stats.max.max(value);
        self.stats.avg += (value - self.stats.avg) / self.count as f64;
    }
}

/// Background-thread profiler sampling this process's CPU usage. A
/// fresh `System` handle is polled on a sibling thread at
/// `sample_interval`, and stopped via an `Arc<AtomicBool>` "time to die"
/// flag.
pub struct CpuProfiler {
    pid: Pid,
    sample_interval: Duration,
    time_to_die: Arc<AtomicBool>,
    samples: Arc<Mutex<Samples>>,
    handle: Option<JoinHandle<()>>,
}

impl CpuProfiler {
    /// Build a profiler for the current process, sampling every
    /// `sample_interval` once started.
    pub fn new(sample_interval: Duration) -> Self {
        Self {
            pid: Pid::from_u32(std::process::id()),
            sample_interval,
            time_to_die: Arc::new(AtomicBool::new(true)),
            samples: Arc::new(Mutex::new(Samples::default())),
            handle: None,
        }
    }

    /// Start sampling. A no-op if already running.
    pub fn start(&mut self) {
        if self.handle.is_some() {
            return;
        }
        *self.samples.lock().unwrap() = Samples::default();
        self.time_to_die.store(false, Ordering::SeqCst);

        let pid = self.pid;
        let interval = self.sample_interval;
        let time_to_die = self.time_to_die.clone();
        let samples = self.samples.clone();

        self.handle = Some(std::thread::spawn(move || {
            let mut sys = System::new_with_specifics(RefreshKind::everything());
            while !time_to_die.load(Ordering::Relaxed) {
                sys.refresh_process_specifics(pid, ProcessRefreshKind::everything());
                if let Some(process) = sys.process(pid) {
                    samples.lock().unwrap().record(process.cpu_usage() as f64);
                }
                std::thread::sleep(interval);
            }
        }));
    }

    /// Stop sampling and join the background thread. A no-op if not
    /// running.
    pub fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        self.time_to_die.store(true, Ordering::SeqCst);
        let _ = handle.join();
    }

    /// CPU usage percent statistics since the last `start()`.
    pub fn percent(&self) -> Stats {
        self.samples.lock().unwrap().stats
    }
}

impl Drop for CpuProfiler {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Background-thread profiler sampling this process's resident set
/// size.
pub struct MemProfiler {
    pid: Pid,
    sample_interval: Duration,
    time_to_die: Arc<AtomicBool>,
    samples: Arc<Mutex<Samples>>,
    handle: Option<JoinHandle<()>>,
}

impl MemProfiler {
    /// Build a profiler for the current process, sampling every
    /// `sample_interval` once started.
    pub fn new(sample_interval: Duration) -> Self {
        Self {
            pid: Pid::from_u32(std::process::id()),
            sample_interval,
            time_to_die: Arc::new(AtomicBool::new(true)),
            samples: Arc::new(Mutex::new(Samples::default())),
            handle: None,
        }
    }

    /// Start sampling. A no-op if already running.
    pub fn start(&mut self) {
        if self.handle.is_some() {
            return;
        }
        *self.samples.lock().unwrap() = Samples::default();
        self.time_to_die.store(false, Ordering::SeqCst);

        let pid = self.pid;
        let interval = self.sample_interval;
        let time_to_die = self.time_to_die.clone();
        let samples = self.samples.clone();

        self.handle = Some(std::thread::spawn(move || {
            let mut sys = System::new_with_specifics(RefreshKind::everything());
            while !time_to_die.load(Ordering::Relaxed) {
                sys.refresh_process_specifics(pid, ProcessRefreshKind::everything());
                if let Some(process) = sys.process(pid) {
                    samples.lock().unwrap().record(process.memory() as f64);
                }
                std::thread::sleep(interval);
            }
        }));
    }

    /// Stop sampling and join the background thread. A no-op if not
    /// running.
    pub fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        self.time_to_die.store(true, Ordering::SeqCst);
        let _ = handle.join();
    }

    /// Resident set size statistics (bytes) since the last `start()`.
    pub fn rss(&self) -> Stats {
        self.samples.lock().unwrap().stats
    }
}

impl Drop for MemProfiler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_profiler_collects_at_least_one_sample() {
        let mut profiler = CpuProfiler::new(Duration::from_millis(10));
        profiler.start();
        std::thread::sleep(Duration::from_millis(50));
        profiler.stop();
        let stats = profiler.percent();
        assert!(stats.max >= stats.min);
    }

    #[test]
    fn mem_profiler_collects_nonzero_rss() {
        let mut profiler = MemProfiler::new(Duration::from_millis(10));
        profiler.start();
        std::thread::sleep(Duration::from_millis(50));
        profiler.stop();
        let stats = profiler.rss();
        assert!(stats.max > 0.0);
    }

    #[test]
    fn restarting_resets_statistics() {
        let mut profiler = CpuProfiler::new(Duration::from_millis(10));
        profiler.start();
        std::thread::sleep(Duration::from_millis(30));
        profiler.stop();
        profiler.start();
        std::thread::sleep(Duration::from_millis(30));
        profiler.stop();
        let stats = profiler.percent();
        assert!(stats.min <= stats.max);
    }
}
