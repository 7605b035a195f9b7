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

use serde::{Deserialize, Serialize};

use crate::error::{Result, UkvsbError};

/// Key distribution a workload draws read/update/remove-class keys from.
/// Wire names are short aliases (`scrambled`, `latest`, `acknowledged`)
/// rather than the longer component names used internally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyDist {
    Uniform,
    Zipfian,
    #[serde(rename = "scrambled")]
    ScrambledZipfian,
    #[serde(rename = "latest")]
    SkewedLatest,
    #[serde(rename = "acknowledged")]
    AcknowledgedCounter,
}

/// Distribution a value's length is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueLengthDist {
    Const,
    Uniform,
}

/// Distribution a batch/bulk/range operation's length is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LengthDist {
    Uniform,
    Zipfian,
}

/// The `{min_length, max_length, length_dist}` triple shared by
/// `batch_upsert`, `batch_read`, `bulk_load`, and `range_select`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LengthRange {
    pub min_length: u64,
    pub max_length: u64,
    pub length_dist: LengthDist,
}

impl LengthRange {
    fn validate(&self, field: &'static str, max_allowed: u64) -> Result<()> {
        if self.min_length > self.max_length {
            return Err(UkvsbError::Config(format!(
                "{field}_min_length ({}) must be <= {field}_max_length ({})",
                self.min_length, self.max_length
            )));
        }
        if self.max_length > max_allowed {
            return Err(UkvsbError::Config(format!(
                "{field}_max_length ({}) must be <= db_records_count / threads_count ({max_allowed})",
                self.max_length
            )));
        }
        Ok(())
    }
}

/// The serde-facing wire shape of a workload. This is the pre-partition,
/// single-workload-wide descriptor; [`WorkloadDescriptor`] is its
/// runtime, per-thread realization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadConfig {
    pub name: String,

    #[serde(default = "default::records_count")]
    pub records_count: u64,
    #[serde(default = "default::operations_count")]
    pub operations_count: u64,

    #[serde(default = "default::proportion")]
    pub upsert_proportion: f64,
    #[serde(default = "default::proportion")]
    pub update_proportion: f64,
    #[serde(default = "default::proportion")]
    pub remove_proportion: f64,
    #[serde(default = "default::proportion")]
    pub read_proportion: f64,
    #[serde(default = "default::proportion")]
    pub read_modify_write_proportion: f64,
    #[serde(default = "default::proportion")]
    pub batch_upsert_proportion: f64,
    #[serde(default = "default::proportion")]
    pub batch_read_proportion: f64,
    #[serde(default = "default::proportion")]
    pub bulk_load_proportion: f64,
    #[serde(default = "default::proportion")]
    pub range_select_proportion: f64,
    #[serde(default = "default::proportion")]
    pub scan_proportion: f64,

    #[serde(default = "default::start_key")]
    pub start_key: u64,
    #[serde(default = "default::key_dist")]
    pub key_dist: KeyDist,

    #[serde(default = "default::value_length")]
    pub value_length: u64,
    #[serde(default = "default::value_length_dist")]
    pub value_length_dist: ValueLengthDist,

    #[serde(default = "default::min_length")]
    pub batch_upsert_min_length: u64,
    #[serde(default = "default::max_length")]
    pub batch_upsert_max_length: u64,
    #[serde(default = "default::length_dist")]
    pub batch_upsert_length_dist: LengthDist,

    #[serde(default = "default::min_length")]
    pub batch_read_min_length: u64,
    #[serde(default = "default::max_length")]
    pub batch_read_max_length: u64,
    #[serde(default = "default::length_dist")]
    pub batch_read_length_dist: LengthDist,

    #[serde(default = "default::min_length")]
    pub bulk_load_min_length: u64,
    #[serde(default = "default::max_length")]
    pub bulk_load_max_length: u64,
    #[serde(default = "default::length_dist")]
    pub bulk_load_length_dist: LengthDist,

    #[serde(default = "default::min_length")]
    pub range_select_min_length: u64,
    #[serde(default = "default::max_length")]
    pub range_select_max_length: u64,
    #[serde(default = "default::length_dist")]
    pub range_select_length_dist: LengthDist,
}

impl WorkloadConfig {
    pub fn batch_upsert(&self) -> LengthRange {
        LengthRange {
            min_length: self.batch_upsert_min_length,
            max_length: self.batch_upsert_max_length,
            length_dist: self.batch_upsert_length_dist,
        }
    }

    pub fn batch_read(&self) -> LengthRange {
        LengthRange {
            min_length: self.batch_read_min_length,
            max_length: self.batch_read_max_length,
            length_dist: self.batch_read_length_dist,
        }
    }

    pub fn bulk_load(&self) -> LengthRange {
        LengthRange {
            min_length: self.bulk_load_min_length,
            max_length: self.bulk_load_max_length,
            length_dist: self.bulk_load_length_dist,
        }
    }

    pub fn range_select(&self) -> LengthRange {
        LengthRange {
            min_length: self.range_select_min_length,
            max_length: self.range_select_max_length,
            length_dist: self.range_select_length_dist,
        }
    }

    /// Sum of every operation-kind proportion.
    pub fn proportion_sum(&self) -> f64 {
        self.upsert_proportion
            + self.update_proportion
            + self.remove_proportion
            + self.read_proportion
            + self.read_modify_write_proportion
            + self.batch_upsert_proportion
            + self.batch_read_proportion
            + self.bulk_load_proportion
            + self.range_select_proportion
            + self.scan_proportion
    }

    /// Whether this workload is in a "pure insert" phase: exactly one of
    /// the insert-class proportions is 1.0, so the issuing generator can
    /// be a plain unacknowledged counter.
    pub fn is_pure_insert_class(&self) -> bool {
        self.upsert_proportion == 1.0
            || self.batch_upsert_proportion == 1.0
            || self.bulk_load_proportion == 1.0
    }

}

/// The runtime, per-thread realization of a [`WorkloadConfig`], including
/// the `db_records_count`/`records_count` and
/// `db_operations_count`/`operations_count` duality between the
/// workload-wide totals and this thread's residual share.
#[derive(Debug, Clone)]
pub struct WorkloadDescriptor {
    pub name: String,

    pub db_records_count: u64,
    pub db_operations_count: u64,
    pub records_count: u64,
    pub operations_count: u64,

    pub upsert_proportion: f64,
    pub update_proportion: f64,
    pub remove_proportion: f64,
    pub read_proportion: f64,
    pub read_modify_write_proportion: f64,
    pub batch_upsert_proportion: f64,
    pub batch_read_proportion: f64,
    pub bulk_load_proportion: f64,
    pub range_select_proportion: f64,
    pub scan_proportion: f64,

    pub start_key: u64,
    pub key_dist: KeyDist,

    pub value_length: u64,
    pub value_length_dist: ValueLengthDist,

    pub batch_upsert: LengthRange,
    pub batch_read: LengthRange,
    pub bulk_load: LengthRange,
    pub range_select: LengthRange,
}

impl WorkloadDescriptor {
    /// Build the workload-wide descriptor from its config, prior to
    /// per-thread partitioning (`records_count == db_records_count` and
    /// likewise for operations until [`Self::partition`] is called).
    pub fn from_config(config: &WorkloadConfig) -> Self {
        Self {
            name: config.name.clone(),
            db_records_count: config.records_count,
            db_operations_count: config.operations_count,
            records_count: config.records_count,
            operations_count: config.operations_count,
            upsert_proportion: config.upsert_proportion,
            update_proportion: config.update_proportion,
            remove_proportion: config.remove_proportion,
            read_proportion: config.read_proportion,
            read_modify_write_proportion: config.read_modify_write_proportion,
            batch_upsert_proportion: config.batch_upsert_proportion,
            batch_read_proportion: config.batch_read_proportion,
            bulk_load_proportion: config.bulk_load_proportion,
            range_select_proportion: config.range_select_proportion,
            scan_proportion: config.scan_proportion,
            start_key: config.start_key,
            key_dist: config.key_dist,
            value_length: config.value_length,
            value_length_dist: config.value_length_dist,
            batch_upsert: config.batch_upsert(),
            batch_read: config.batch_read(),
            bulk_load: config.bulk_load(),
            range_select: config.range_select(),
        }
    }

    /// Whether this workload is in a "pure insert" phase.
    pub fn is_pure_insert_class(&self) -> bool {
        self.upsert_proportion == 1.0
            || self.batch_upsert_proportion == 1.0
            || self.bulk_load_proportion == 1.0
    }

    fn insert_key_multiplier(&self) -> u64 {
        if self.upsert_proportion == 1.0 {
            1
        } else if self.batch_upsert_proportion == 1.0 {
            self.batch_upsert.max_length.max(1)
        } else if self.bulk_load_proportion == 1.0 {
            self.bulk_load.max_length.max(1)
        } else {
            1
        }
    }

    /// Validate this descriptor against a prospective thread count.
    /// Never panics; every violation is a [`UkvsbError::Config`].
    pub fn validate(&self, threads_count: usize) -> Result<()> {
        if threads_count == 0 {
            return Err(UkvsbError::Config("threads_count must be > 0".into()));
        }

        let sum = self.upsert_proportion
            + self.update_proportion
            + self.remove_proportion
            + self.read_proportion
            + self.read_modify_write_proportion
            + self.batch_upsert_proportion
            + self.batch_read_proportion
            + self.bulk_load_proportion
            + self.range_select_proportion
            + self.scan_proportion;
        if !(sum > 0.0 && sum <= 1.0 + f64::EPSILON) {
            return Err(UkvsbError::Config(format!(
                "sum of operation proportions must be in (0, 1], got {sum}"
            )));
        }

        let max_allowed = self.db_records_count / threads_count as u64;
        self.batch_upsert.validate("batch_upsert", max_allowed)?;
        self.batch_read.validate("batch_read", max_allowed)?;
        self.bulk_load.validate("bulk_load", max_allowed)?;
        self.range_select.validate("range_select", max_allowed)?;

        Ok(())
    }

    /// Split this workload-wide descriptor into `threads_count` per-thread
    /// descriptors: residual record/operation counts distributed evenly,
    /// with remainders assigned to the lowest-indexed threads, and each
    /// thread's start key advanced past the previous thread's span.
    pub fn partition(&self, threads_count: usize) -> Result<Vec<WorkloadDescriptor>> {
        self.validate(threads_count)?;

        let pure_insert = self.is_pure_insert_class();
        let multiplier = self.insert_key_multiplier();

        let mut descriptors = Vec::with_capacity(threads_count);
        let mut cursor = self.start_key;

        for i in 0..threads_count as u64 {
            let records_count_i = self.db_records_count / threads_count as u64
                + u64::from(i < self.db_records_count % threads_count as u64);
            let operations_count_i = (self.db_operations_count / threads_count as u64
                + u64::from(i < self.db_operations_count % threads_count as u64))
            .max(1);

            let mut descriptor = self.clone();
            descriptor.records_count = records_count_i;
            descriptor.operations_count = operations_count_i;
            descriptor.start_key = cursor;
            descriptors.push(descriptor);

            cursor += if pure_insert {
                operations_count_i * multiplier
            } else {
                records_count_i
            };
        }

        Ok(descriptors)
    }
}

/// Load a list of workload configurations from a JSON file. This is a
/// thin convenience, not a general workload-file-format loader:
/// multi-format support and CLI-driven discovery stay external.
pub fn load_workloads_json(path: impl AsRef<Path>) -> anyhow::Result<Vec<WorkloadConfig>> {
    let text = std::fs::read_to_string(path)?;
    let configs = serde_json::from_str(&text)?;
    Ok(configs)
}

/// Default values for [`WorkloadConfig`] fields not supplied on the wire.
#[allow(missing_docs)]
pub mod default {
    use super::{KeyDist, LengthDist, ValueLengthDist};

    pub fn records_count() -> u64 {
        0
    }

    pub fn operations_count() -> u64 {
        0
    }

    pub fn proportion() -> f64 {
        0.0
    }

    pub fn start_key() -> u64 {
        0
    }

    pub fn key_dist() -> KeyDist {
        KeyDist::Uniform
    }

    pub fn value_length() -> u64 {
        100
    }

    pub fn value_length_dist() -> ValueLengthDist {
        ValueLengthDist::Const
    }

    pub fn min_length() -> u64 {
        1
    }

    pub fn max_length() -> u64 {
        1
    }

    pub fn length_dist() -> LengthDist {
        LengthDist::Uniform
    }
}
