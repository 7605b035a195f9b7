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

use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::Context;

use crate::contract::{DataAccessor, Engine};
use crate::error::UkvsbError;
use crate::fence::ThreadFence;
use crate::profiler::{CpuProfiler, MemProfiler};
use crate::worker::{Timer, Worker};
use crate::workload::WorkloadDescriptor;

/// Unit hint accompanying a published metric, so a sink can format rates,
/// byte counts, and bare percentages differently without parsing the
/// metric's name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricUnit {
    Rate,
    Bytes,
    Percent,
    Count,
}

/// External collaborator boundary for a workload's final counters: what
/// sits behind it (a reporting framework, a metrics exporter, a plain
/// log line) is out of scope for this crate. Every record is tagged with
/// the workload's `name`, per spec.md §6's "the named counters...plus the
/// workload name."
pub trait MetricsSink {
    fn record(&self, workload: &str, name: &str, value: f64, unit: MetricUnit);
}

/// Shared, per-workload atomic counters every worker thread folds its
/// results into with a relaxed fetch-add.
#[derive(Debug, Default)]
struct MetricsAggregator {
    entries_touched: AtomicU64,
    fails_count: AtomicU64,
    bytes_processed: AtomicU64,
    done_iterations_count: AtomicU64,
    flushed: AtomicBool,
}

impl MetricsAggregator {
    fn add(&self, entries_touched: u64, fails_count: u64, bytes_processed: u64) -> u64 {
        self.entries_touched.fetch_add(entries_touched, Ordering::Relaxed);
        self.fails_count.fetch_add(fails_count, Ordering::Relaxed);
        self.bytes_processed.fetch_add(bytes_processed, Ordering::Relaxed);
        self.done_iterations_count.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// One-shot latch: returns `true` for exactly one caller across every
    /// thread, the first to observe it.
    fn claim_flush(&self) -> bool {
        self.flushed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// A [`Timer`] that accumulates wall-clock time while running, excluding
/// any span between `pause()` and `resume()`. Owns its own clock instead
/// of delegating to an external benchmarking harness.
pub struct AccumulatingTimer {
    running_since: Mutex<Option<Instant>>,
    elapsed_nanos: AtomicU64,
}

impl AccumulatingTimer {
    pub fn new() -> Self {
        Self {
            running_since: Mutex::new(Some(Instant::now())),
            elapsed_nanos: AtomicU64::new(0),
        }
    }

    /// Total wall-clock time charged so far (excluding paused spans).
    pub fn elapsed(&self) -> Duration {
        let mut nanos = self.elapsed_nanos.load(Ordering::Acquire);
        if let Some(since) = *self.running_since.lock().unwrap() {
            nanos += since.elapsed().as_nanos() as u64;
        }
        Duration::from_nanos(nanos)
    }
}

impl Default for AccumulatingTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer for AccumulatingTimer {
    fn pause(&self) {
        let mut guard = self.running_since.lock().unwrap();
        if let Some(since) = guard.take() {
            self.elapsed_nanos
                .fetch_add(since.elapsed().as_nanos() as u64, Ordering::AcqRel);
        }
    }

    fn resume(&self) {
        let mut guard = self.running_since.lock().unwrap();
        if guard.is_none() {
            *guard = Some(Instant::now());
        }
    }
}

/// Drives one workload to completion across `threads_count` worker
/// threads sharing a single engine handle: opens the engine, fences all
/// threads before and after the timed operation loop, closes the engine,
/// and publishes the aggregated counters. CLI parsing, workload-file
/// loading, and result-file merging are left to the caller.
pub struct Orchestrator {
    threads_count: usize,
    transactional: bool,
    sample_interval: Duration,
}

impl Orchestrator {
    /// Build an orchestrator that runs a workload across `threads_count`
    /// threads in non-transactional mode, sampling profilers every 100ms.
    pub fn new(threads_count: usize) -> Self {
        Self {
            threads_count,
            transactional: false,
            sample_interval: Duration::from_millis(100),
        }
    }

    /// Run each thread against `engine.create_transaction()` instead of
    /// the raw engine.
    pub fn with_transactional(mut self, transactional: bool) -> Self {
        self.transactional = transactional;
        self
    }

    /// Override the profiler sample interval (default 100ms).
    pub fn with_sample_interval(mut self, interval: Duration) -> Self {
        self.sample_interval = interval;
        self
    }

    /// Execute `descriptor` against `engine`, publishing its final
    /// counters to `sink`: open, fence, run, fence, close, flush (once),
    /// size-on-disk, report.
    pub fn run(
        &self,
        descriptor: &WorkloadDescriptor,
        engine: Arc<dyn Engine>,
        sink: &(dyn MetricsSink + Sync),
    ) -> anyhow::Result<()> {
        let per_thread = descriptor
            .partition(self.threads_count)
            .context("failed to partition workload across threads")?;

        let total_operations = descriptor.operations_count.max(1);
        let printable_distance = total_operations / 10;

        let aggregator = Arc::new(MetricsAggregator::default());
        let fence = Arc::new(ThreadFence::new(self.threads_count));
        let cpu_profiler = Arc::new(Mutex::new(CpuProfiler::new(self.sample_interval)));
        let mem_profiler = Arc::new(Mutex::new(MemProfiler::new(self.sample_interval)));
        let last_printed = Arc::new(AtomicU64::new(0));
        // Set by any thread that hits a fatal error so every other party
        // still reaches the same number of fence syncs instead of
        // spinning forever waiting for a thread that already returned.
        let abort: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));

        let name = descriptor.name.clone();
        let transactional = self.transactional;
        let threads_count = self.threads_count;

        let results: Vec<anyhow::Result<()>> = std::thread::scope(|scope| {
            per_thread
                .into_iter()
                .enumerate()
                .map(|(thread_index, thread_descriptor)| {
                    let engine = engine.clone();
                    let fence = fence.clone();
                    let aggregator = aggregator.clone();
                    let cpu_profiler = cpu_profiler.clone();
                    let mem_profiler = mem_profiler.clone();
                    let last_printed = last_printed.clone();
                    let name = name.clone();
                    let abort = abort.clone();

                    scope.spawn(move || -> anyhow::Result<()> {
                        if thread_index == 0 {
                            match engine.open() {
                                Ok(()) => {
                                    cpu_profiler.lock().unwrap().start();
                                    mem_profiler.lock().unwrap().start();
                                    print!("{name}: {:>6.2f}%\r", 0.0);
                                    let _ = std::io::stdout().flush();
                                }
                                Err(e) => {
                                    tracing::error!(workload = %name, error = %e, "engine open failed");
                                    *abort.lock().unwrap() = Some(format!("engine open failed: {e}"));
                                }
                            }
                        }
                        fence.sync();

                        if let Some(reason) = abort.lock().unwrap().clone() {
                            fence.sync();
                            return Err(UkvsbError::EngineLifecycle(reason).into());
                        }

                        let transaction = if transactional {
                            match engine.create_transaction() {
                                Ok(Some(tx)) => Some(tx),
                                Ok(None) => {
                                    *abort.lock().unwrap() =
                                        Some("engine does not support transactions".into());
                                    None
                                }
                                Err(e) => {
                                    tracing::error!(workload = %name, error = %e, "failed to create transaction");
                                    *abort.lock().unwrap() =
                                        Some(format!("failed to create transaction: {e}"));
                                    None
                                }
                            }
                        } else {
                            None
                        };
                        // Every thread reaches this sync regardless of
                        // whether its own transaction creation succeeded,
                        // so a failure on just one thread still aborts
                        // every other thread instead of leaving them
                        // waiting at a fence sync nobody else reaches.
                        fence.sync();
                        if let Some(reason) = abort.lock().unwrap().clone() {
                            fence.sync();
                            return Err(UkvsbError::EngineLifecycle(reason).into());
                        }
                        let accessor: &dyn DataAccessor = transaction
                            .as_deref()
                            .unwrap_or_else(|| engine.as_data_accessor());

                        let operations_count = thread_descriptor.operations_count;
                        let mut worker = Worker::new(thread_descriptor);
                        let timer = AccumulatingTimer::new();

                        for _ in 0..operations_count {
                            let outcome = worker.step(accessor, &timer)?;
                            let done = aggregator.add(
                                outcome.entries_touched,
                                u64::from(!outcome.ok),
                                outcome.bytes_processed,
                            );

                            let previous = last_printed.load(Ordering::Relaxed);
                            if done - previous > printable_distance
                                || done <= threads_count as u64
                                || done == total_operations
                            {
                                last_printed.store(done, Ordering::Relaxed);
                                let percent = 100.0 * done as f64 / total_operations as f64;
                                print!("{name}: {percent:>6.2f}%\r");
                                let _ = std::io::stdout().flush();
                            }

                            if done == total_operations && aggregator.claim_flush() {
                                engine
                                    .flush()
                                    .map_err(|e| UkvsbError::EngineLifecycle(e.to_string()))?;
                            }
                        }

                        fence.sync();
                        if thread_index == 0 {
                            engine
                                .close()
                                .map_err(|e| UkvsbError::EngineLifecycle(e.to_string()))?;
                            tracing::info!(workload = %name, "workload complete, engine closed");

                            cpu_profiler.lock().unwrap().stop();
                            mem_profiler.lock().unwrap().stop();
                            let cpu = cpu_profiler.lock().unwrap().percent();
                            let mem = mem_profiler.lock().unwrap().rss();

                            let entries_touched =
                                aggregator.entries_touched.load(Ordering::Relaxed);
                            let fails_count = aggregator.fails_count.load(Ordering::Relaxed);
                            let bytes_processed =
                                aggregator.bytes_processed.load(Ordering::Relaxed);
                            let fails_percent = if entries_touched > 0 {
                                100.0 * fails_count as f64 / entries_touched as f64
                            } else {
                                100.0
                            };
                            let disk_bytes = engine.size_on_disk().unwrap_or_else(|e| {
                                tracing::warn!(error = %e, "failed to read engine size on disk");
                                0
                            });

                            sink.record(&name, "fails_percent", fails_percent, MetricUnit::Percent);
                            sink.record(
                                &name,
                                "operations_per_second",
                                (entries_touched.saturating_sub(fails_count)) as f64,
                                MetricUnit::Rate,
                            );
                            sink.record(&name, "cpu_max_percent", cpu.max, MetricUnit::Percent);
                            sink.record(&name, "cpu_avg_percent", cpu.avg, MetricUnit::Percent);
                            sink.record(&name, "mem_max_bytes", mem.max, MetricUnit::Bytes);
                            sink.record(&name, "mem_avg_bytes", mem.avg, MetricUnit::Bytes);
                            sink.record(
                                &name,
                                "processed_bytes",
                                bytes_processed as f64,
                                MetricUnit::Bytes,
                            );
                            sink.record(&name, "disk_bytes", disk_bytes as f64, MetricUnit::Bytes);
                        }

                        Ok(())
                    })
                })
                .collect::<Vec<_>>()
                .into_iter()
                .map(|handle| match handle.join() {
                    Ok(result) => result,
                    Err(_) => Err(UkvsbError::EngineLifecycle("worker thread panicked".into()).into()),
                })
                .collect()
        });

        results.into_iter().collect::<anyhow::Result<Vec<()>>>()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use super::*;
    use crate::testutil::MemoryEngine;
    use crate::workload::{default, KeyDist, LengthDist, ValueLengthDist, WorkloadConfig};

    struct RecordingSink {
        records: StdMutex<Vec<(String, String, f64, MetricUnit)>>,
    }

    impl RecordingSink {
        fn new() -> Self {
            Self {
                records: StdMutex::new(vec![]),
            }
        }
    }

    impl MetricsSink for RecordingSink {
        fn record(&self, workload: &str, name: &str, value: f64, unit: MetricUnit) {
            self.records
                .lock()
                .unwrap()
                .push((workload.to_string(), name.to_string(), value, unit));
        }
    }

    fn insert_only_config() -> WorkloadConfig {
        WorkloadConfig {
            name: "s0".into(),
            records_count: 200,
            operations_count: 200,
            upsert_proportion: 1.0,
            update_proportion: 0.0,
            remove_proportion: 0.0,
            read_proportion: 0.0,
            read_modify_write_proportion: 0.0,
            batch_upsert_proportion: 0.0,
            batch_read_proportion: 0.0,
            bulk_load_proportion: 0.0,
            range_select_proportion: 0.0,
            scan_proportion: 0.0,
            start_key: 0,
            key_dist: KeyDist::Uniform,
            value_length: 32,
            value_length_dist: ValueLengthDist::Const,
            batch_upsert_min_length: default::min_length(),
            batch_upsert_max_length: default::max_length(),
            batch_upsert_length_dist: LengthDist::Uniform,
            batch_read_min_length: default::min_length(),
            batch_read_max_length: default::max_length(),
            batch_read_length_dist: LengthDist::Uniform,
            bulk_load_min_length: default::min_length(),
            bulk_load_max_length: default::max_length(),
            bulk_load_length_dist: LengthDist::Uniform,
            range_select_min_length: default::min_length(),
            range_select_max_length: default::max_length(),
            range_select_length_dist: LengthDist::Uniform,
        }
    }

    #[test]
    fn runs_insert_only_workload_and_publishes_counters() {
        let config = insert_only_config();
        let descriptor = WorkloadDescriptor::from_config(&config);
        let engine: Arc<dyn Engine> = Arc::new(MemoryEngine::default());
        let sink = RecordingSink::new();

        let orchestrator = Orchestrator::new(4).with_sample_interval(Duration::from_millis(5));
        orchestrator.run(&descriptor, engine, &sink).unwrap();

        let records = sink.records.lock().unwrap();
        let names: Vec<&str> = records.iter().map(|(_, name, _, _)| name.as_str()).collect();
        assert!(names.contains(&"operations_per_second"));
        assert!(names.contains(&"disk_bytes"));
        assert!(records.iter().all(|(workload, ..)| workload == "s0"));
    }

    #[test]
    fn fence_round_trips_across_the_run() {
        let config = insert_only_config();
        let descriptor = WorkloadDescriptor::from_config(&config);
        let engine: Arc<dyn Engine> = Arc::new(MemoryEngine::default());
        let sink = RecordingSink::new();

        let orchestrator = Orchestrator::new(2).with_sample_interval(Duration::from_millis(5));
        assert!(orchestrator.run(&descriptor, engine, &sink).is_ok());
    }
}
