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

use thiserror::Error;

/// Error taxonomy for the harness core, mirroring the three fatal error
/// kinds of the error-handling design: configuration, engine lifecycle,
/// and generator exhaustion. Data-access errors are *not* represented
/// here -- they are reflected as [`crate::contract::OperationStatus`] and
/// folded into the fails counter instead of aborting the run.
#[derive(Debug, Error)]
pub enum UkvsbError {
    /// A workload descriptor violated one of its invariants, or required
    /// configuration (db name, workloads) was missing. Fatal before any
    /// engine activity.
    #[error("configuration error: {0}")]
    Config(String),

    /// `Engine::open`, `Engine::close`, or `Engine::create_transaction`
    /// failed. Fatal for the workload that triggered it.
    #[error("engine lifecycle error: {0}")]
    EngineLifecycle(String),

    /// An acknowledged counter's acknowledgment window was exhausted: a
    /// slot was re-acknowledged before the oldest unacknowledged id in
    /// the window could be cleared. Indicates a misconfiguration of
    /// thread count vs. in-flight window size.
    #[error("acknowledged counter window of size {window} exhausted")]
    GeneratorExhausted {
        /// Size of the acknowledgment window that overflowed.
        window: usize,
    },
}

/// Convenience alias used throughout the crate's library-internal,
/// fallible paths.
pub type Result<T> = std::result::Result<T, UkvsbError>;
