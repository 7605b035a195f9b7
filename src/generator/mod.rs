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

/// A [`Generator`] produces a lazy, effectively infinite sequence of
/// values following some distribution. Every generator used by this
/// crate yields `u64`: keys, value lengths, and batch/scan lengths all
/// live in the same 64-bit integer domain, so one numeric generator
/// family covers all of them -- the worker casts down to `usize` only at
/// the point it indexes a buffer.
pub trait Generator: Send + Sync {
    /// Output type of the generator.
    type Output;

    /// Generate the next value.
    fn next(&self) -> Self::Output;

    /// The most recently yielded value.
    ///
    /// # Panics
    ///
    /// `next()` must be called before calling `last()`.
    fn last(&self) -> Self::Output;
}

/// A [`NumberGenerator`] generates numeric values.
pub trait NumberGenerator: Generator {
    /// Return the expected value (mean) of the values this generator will generate.
    fn mean(&self) -> f64;
}

/// A [`Counter`] is a generator over a monotonically issued integer
/// domain. Blanket-implemented for any `u64` generator.
pub trait Counter: Generator<Output = u64> {}

impl<T> Counter for T where T: Generator<Output = u64> {}

/// An [`AcknowledgedCounter`] decouples "issued" from "visible": `next()`
/// hands out fresh ids monotonically, but `last()` only advances once the
/// issued ids have been acknowledged, so readers never target an
/// in-flight insert.
pub trait AcknowledgedCounter: Counter {
    /// Record that the insert for `val` has completed.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::UkvsbError::GeneratorExhausted`] if the
    /// acknowledgment window overflowed (a hole older than the window
    /// persisted).
    fn acknowledge(&self, val: u64) -> crate::error::Result<()>;
}

/// Constant value generator.
pub mod constant;
/// Uniform value generator.
pub mod uniform;

/// Zipfian and derived (scrambled, skewed-latest) generators.
pub mod scrambled_zipfian;
pub mod skewed_latest;
pub mod zipfian;

/// Discrete value and operation-kind choosers.
pub mod discrete;

/// Acknowledged and plain atomic counters.
pub mod acknowledge;
pub mod counter;

/// Non-allocating pseudo-random byte stream.
pub mod byte_stream;
