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

use std::path::Path;

use anyhow::Result;

/// A 64-bit opaque key. The harness never reformats it; byte order on the
/// wire is left to the adapter.
pub type Key = u64;

/// The ten operation kinds a worker can dispatch, each weighted
/// independently in a workload's proportions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Upsert,
    Update,
    Remove,
    Read,
    ReadModifyWrite,
    BatchUpsert,
    BatchRead,
    BulkLoad,
    RangeSelect,
    Scan,
}

/// Status of a single data-access call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationStatus {
    /// The operation completed successfully.
    Ok,
    /// The adapter reported an internal error.
    Error,
    /// The requested key does not exist.
    NotFound,
    /// The adapter does not implement this operation.
    NotImplemented,
}

/// Result of a single data-access call: how many entries the call
/// touched, and its outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationResult {
    /// Number of entries the call touched (1 for point operations, up to
    /// `length` for batch/range/scan operations).
    pub entries_touched: usize,
    /// Outcome of the call.
    pub status: OperationStatus,
}

impl OperationResult {
    /// Build a successful result that touched `entries_touched` entries.
    pub fn ok(entries_touched: usize) -> Self {
        Self {
            entries_touched,
            status: OperationStatus::Ok,
        }
    }

    /// Build a result for a failed operation. `entries_touched` is
    /// conventionally 1 for point operations that failed outright.
    pub fn failed(entries_touched: usize, status: OperationStatus) -> Self {
        debug_assert!(status != OperationStatus::Ok);
        Self {
            entries_touched,
            status,
        }
    }

    /// Whether the call succeeded.
    pub fn is_ok(&self) -> bool {
        self.status == OperationStatus::Ok
    }
}

/// The data-access capability set every storage adapter must expose. A
/// worker depends only on this trait, never on a concrete adapter type;
/// the polymorphism is by trait object (`&dyn DataAccessor`) rather than
/// a virtual-inheritance hierarchy.
///
/// Implementations must tolerate concurrent calls from multiple worker
/// threads against the same instance. Adapters that serialize internally
/// are permitted but will lose scaling.
pub trait DataAccessor: Send + Sync {
    /// Unconditionally write `key` -> `value`.
    fn upsert(&self, key: Key, value: &[u8]) -> OperationResult;

    /// Write `key` -> `value` only if `key` already exists.
    fn update(&self, key: Key, value: &[u8]) -> OperationResult;

    /// Remove `key`.
    fn remove(&self, key: Key) -> OperationResult;

    /// Copy the value stored at `key` into `value`, resized/truncated by
    /// the adapter as appropriate. `NotFound` if absent.
    fn read(&self, key: Key, value: &mut [u8]) -> OperationResult;

    /// Write many keys at once. `keys` are in strict ascending order;
    /// `values` is the concatenation of each key's value, `sizes` gives
    /// each value's length in the same order as `keys`.
    fn batch_upsert(&self, keys: &[Key], values: &[u8], sizes: &[usize]) -> OperationResult;

    /// Read many keys at once. `keys` are in arbitrary order; the
    /// adapter is free to reorder lookups. `values` is a single
    /// contiguous buffer sized for the maximum possible result.
    fn batch_read(&self, keys: &[Key], values: &mut [u8]) -> OperationResult;

    /// Bulk-load many keys at once during the initialization phase.
    /// `keys` are in strict ascending order; the adapter may stream
    /// them into sorted files and ingest without a per-operation flush.
    fn bulk_load(&self, keys: &[Key], values: &[u8], sizes: &[usize]) -> OperationResult;

    /// Copy up to `length` consecutive values starting at `start_key`
    /// into `values`.
    fn range_select(&self, start_key: Key, length: usize, values: &mut [u8]) -> OperationResult;

    /// Iterate up to `length` consecutive entries starting at
    /// `start_key`, overwriting `single_value` for each. Only iteration
    /// is observed, not transfer.
    fn scan(&self, start_key: Key, length: usize, single_value: &mut [u8]) -> OperationResult;
}

/// Engine-level lifecycle on top of the data-access capability set.
pub trait Engine: DataAccessor {
    /// Set the engine's configuration file and working directory. Called
    /// exactly once, before `open()`.
    fn set_config(&self, config_path: &Path, working_dir_path: &Path) -> Result<()>;

    /// Open the engine. The harness aborts the workload on failure.
    fn open(&self) -> Result<()>;

    /// Close the engine.
    fn close(&self) -> Result<()>;

    /// Flush any buffered writes to durable storage.
    fn flush(&self) -> Result<()>;

    /// Current on-disk footprint, in bytes.
    fn size_on_disk(&self) -> Result<u64>;

    /// Upcast to the data-access capability set. A concrete stand-in for
    /// trait-object upcasting, which stabilized only in rustc 1.86 --
    /// newer than this crate's declared `rust-version`. The default body
    /// is monomorphized per implementing type, so it compiles to a plain
    /// reference coercion even when called through `dyn Engine`.
    fn as_data_accessor(&self) -> &dyn DataAccessor {
        self
    }

    /// Create a transactional accessor sharing the same contract. The
    /// default implementation reports that transactions are not
    /// supported by returning `Ok(None)`; adapters that support
    /// transactions override this. Failure to create one when requested
    /// is fatal for the workload.
    fn create_transaction(&self) -> Result<Option<Box<dyn DataAccessor>>> {
        Ok(None)
    }
}
