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

//! `ukvsb` is a universal key-value store benchmark harness: the
//! workload-generation and execution engine a storage-adapter crate plugs
//! into, not a benchmark binary in its own right.
//!
//! A user crate implements [`contract::Engine`] for the storage it wants
//! to measure, builds a [`workload::WorkloadConfig`] (or loads one with
//! [`workload::load_workloads_json`]), and drives it with
//! [`orchestrator::Orchestrator`]. Everything in between -- distribution
//! generators, the acknowledged counter, the operation chooser, the
//! per-thread worker, the workload partitioner, the thread fence, and the
//! background CPU/RSS profilers -- lives here.
//!
//! CLI argument parsing, workload-file loading beyond the one JSON
//! convenience function, result-file merging, and the storage adapters
//! themselves stay out of scope; see the crate's `DESIGN.md` for the
//! full rationale.

/// The data-access and engine-lifecycle capability set every storage
/// adapter must expose.
pub mod contract;
/// The harness's error taxonomy.
pub mod error;
/// A reusable N-party rendezvous barrier.
pub mod fence;
/// Distribution generators: uniform, Zipfian and its derivatives, the
/// acknowledged counter, the byte stream, and the operation chooser.
pub mod generator;
/// Drives a workload to completion across worker threads and publishes
/// its counters to a metrics sink.
pub mod orchestrator;
/// Background CPU and resident-set-size samplers.
pub mod profiler;
/// Shared non-generator numeric helpers (FNV-1a hashing).
pub mod utils;
/// The per-thread operation synthesizer and executor.
pub mod worker;
/// Workload descriptors, their wire format, validation, and partitioning.
pub mod workload;

/// An in-memory [`contract::DataAccessor`]/[`contract::Engine`]
/// implementation used by this crate's own tests. Not a production
/// storage adapter -- gated behind the `test-util` feature so
/// integration tests under `tests/` can use it without pulling it into
/// every downstream build.
#[cfg(any(test, feature = "test-util"))]
pub mod testutil;
