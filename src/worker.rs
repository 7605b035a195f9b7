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
use std::sync::Arc;

use crate::contract::{DataAccessor, Key, OperationKind, OperationResult};
use crate::error::Result;
use crate::generator::acknowledge::AcknowledgedCounterGenerator;
use crate::generator::byte_stream::ByteStreamGenerator;
use crate::generator::counter::CounterGenerator;
use crate::generator::discrete::OperationChooser;
use crate::generator::scrambled_zipfian::ScrambledZipfianGenerator;
use crate::generator::skewed_latest::SkewedLatestGenerator;
use crate::generator::uniform::UniformGenerator;
use crate::generator::zipfian::ZipfianGenerator;
use crate::generator::{AcknowledgedCounter, Counter, Generator, NumberGenerator};
use crate::workload::{KeyDist, LengthDist, LengthRange, ValueLengthDist, WorkloadDescriptor};

const PAGE_SIZE: usize = 4096;

fn round_up_page(n: usize) -> usize {
    n.div_ceil(PAGE_SIZE) * PAGE_SIZE
}

/// A single reusable value buffer split into two non-overlapping
/// sub-views: one written by value synthesis, one handed to the adapter
/// as a read destination, so the write and read paths never observe
/// each other's in-flight bytes.
pub struct ValueScratch {
    buf: Vec<u8>,
    half: usize,
}

impl ValueScratch {
    /// Allocates room for two views of `capacity_per_view` bytes each,
    /// each rounded up to a 4096-byte multiple.
    pub fn new(capacity_per_view: usize) -> Self {
        let half = round_up_page(capacity_per_view.max(1));
        Self {
            buf: vec![0u8; half * 2],
            half,
        }
    }

    /// The write-side sub-view, used to synthesize upsert/update values.
    pub fn write_view(&mut self) -> &mut [u8] {
        &mut self.buf[..self.half]
    }

    /// The read-side sub-view, used as the adapter's copy destination.
    pub fn read_view(&mut self) -> &mut [u8] {
        &mut self.buf[self.half..]
    }

    /// Capacity of a single view.
    pub fn view_len(&self) -> usize {
        self.half
    }
}

/// Pause/resume control over whatever timing source the orchestrator
/// measures throughput with. Batch-class operations (batch_upsert,
/// bulk_load) pause the timer while preparing their inputs so data
/// synthesis is not charged against measured latency, resuming it only
/// for the contract call itself.
///
/// `Timer` is a bare pause/resume capability, not tied to any specific
/// clock implementation; the orchestrator implements it against
/// whatever clock it uses.
pub trait Timer: Send + Sync {
    /// Stop charging elapsed time to the current measurement window.
    fn pause(&self);
    /// Resume charging elapsed time.
    fn resume(&self);
}

/// A `Timer` that does nothing, for contexts (tests, `scan`-only
/// workloads) where no operation ever pauses it.
#[derive(Debug, Default)]
pub struct NullTimer;

impl Timer for NullTimer {
    fn pause(&self) {}
    fn resume(&self) {}
}

/// The generator that hands out ids for insert-class operations.
/// A plain [`CounterGenerator`] during a pure-insert phase; an
/// [`AcknowledgedCounterGenerator`] once reads can interleave with
/// inserts, so readers never race an in-flight write.
enum IssuingGenerator {
    Plain(CounterGenerator),
    Acknowledged(Arc<AcknowledgedCounterGenerator>),
}

impl IssuingGenerator {
    fn next(&self) -> u64 {
        match self {
            Self::Plain(g) => g.next(),
            Self::Acknowledged(g) => g.next(),
        }
    }

    fn last(&self) -> u64 {
        match self {
            Self::Plain(g) => g.last(),
            Self::Acknowledged(g) => g.last(),
        }
    }

    fn acknowledge(&self, val: u64) -> Result<()> {
        match self {
            Self::Plain(_) => Ok(()),
            Self::Acknowledged(g) => g.acknowledge(val),
        }
    }

    fn as_counter(&self) -> Arc<dyn Counter<Output = u64>> {
        match self {
            Self::Plain(_) => unreachable!(
                "skewed_latest requires the mixed-phase acknowledged issuing generator"
            ),
            Self::Acknowledged(g) => g.clone() as Arc<dyn Counter<Output = u64>>,
        }
    }
}

/// Watermark-tracking read-key source for `key_dist = acknowledged`: it
/// always reads back whatever the issuing counter currently considers
/// acknowledged, rather than drawing from an independent distribution.
struct WatermarkGenerator {
    basis: Arc<dyn Counter<Output = u64>>,
    last: AtomicU64,
}

impl Generator for WatermarkGenerator {
    type Output = u64;

    fn next(&self) -> Self::Output {
        let v = self.basis.last();
        self.last.store(v, Ordering::Relaxed);
        v
    }

    fn last(&self) -> Self::Output {
        self.last.load(Ordering::Relaxed)
    }
}

/// A length generator bounded by `[min_length, max_length]` per a
/// workload's configured `length_dist`.
fn build_length_generator(range: LengthRange) -> Box<dyn NumberGenerator<Output = u64>> {
    match range.length_dist {
        LengthDist::Uniform => Box::new(UniformGenerator::new(range.min_length, range.max_length)),
        LengthDist::Zipfian => Box::new(ZipfianGenerator::new(range.min_length, range.max_length)),
    }
}

fn build_value_length_generator(
    dist: ValueLengthDist,
    value_length: u64,
) -> Box<dyn NumberGenerator<Output = u64>> {
    match dist {
        ValueLengthDist::Const => Box::new(crate::generator::constant::ConstGenerator::new(value_length)),
        ValueLengthDist::Uniform => Box::new(UniformGenerator::new(1, value_length.max(1))),
    }
}

/// Per-thread operation synthesizer and executor. Owns its generators,
/// key scratch, and value scratch for the worker's lifetime; dispatches
/// the ten operation kinds against a `&dyn DataAccessor`.
pub struct Worker {
    descriptor: WorkloadDescriptor,
    issuing: IssuingGenerator,
    read_key_gen: Option<Box<dyn Generator<Output = u64>>>,
    value_length_gen: Box<dyn NumberGenerator<Output = u64>>,
    batch_upsert_length_gen: Box<dyn NumberGenerator<Output = u64>>,
    batch_read_length_gen: Box<dyn NumberGenerator<Output = u64>>,
    bulk_load_length_gen: Box<dyn NumberGenerator<Output = u64>>,
    range_select_length_gen: Box<dyn NumberGenerator<Output = u64>>,
    operation_chooser: OperationChooser,
    byte_gen: ByteStreamGenerator,
    key_scratch: Vec<Key>,
    value_scratch: ValueScratch,
}

impl Worker {
    /// Build a worker for `descriptor`, constructing all of its
    /// generators and scratch buffers up front.
    pub fn new(descriptor: WorkloadDescriptor) -> Self {
        let pure_insert = descriptor.is_pure_insert_class();

        let issuing = if pure_insert {
            IssuingGenerator::Plain(CounterGenerator::new(descriptor.start_key))
        } else {
            IssuingGenerator::Acknowledged(Arc::new(AcknowledgedCounterGenerator::new(
                descriptor.start_key + descriptor.db_records_count,
            )))
        };

        let read_key_gen: Option<Box<dyn Generator<Output = u64>>> = if pure_insert {
            None
        } else {
            let lo = descriptor.start_key;
            let hi = (descriptor.start_key + descriptor.records_count).saturating_sub(1).max(lo);
            let gen: Box<dyn Generator<Output = u64>> = match descriptor.key_dist {
                KeyDist::Uniform => Box::new(UniformGenerator::new(lo, hi)),
                KeyDist::Zipfian => Box::new(ZipfianGenerator::new(lo, hi)),
                KeyDist::ScrambledZipfian => Box::new(ScrambledZipfianGenerator::new(lo, hi)),
                KeyDist::SkewedLatest => {
                    Box::new(SkewedLatestGenerator::new(issuing.as_counter()))
                }
                KeyDist::AcknowledgedCounter => Box::new(WatermarkGenerator {
                    basis: issuing.as_counter(),
                    last: AtomicU64::new(lo),
                }),
            };
            Some(gen)
        };

        let elements_max_count = [
            descriptor.batch_upsert.max_length,
            descriptor.batch_read.max_length,
            descriptor.bulk_load.max_length,
            1,
        ]
        .into_iter()
        .max()
        .unwrap_or(1)
        .max(1) as usize;

        let value_length_gen = build_value_length_generator(descriptor.value_length_dist, descriptor.value_length);
        let batch_upsert_length_gen = build_length_generator(descriptor.batch_upsert);
        let batch_read_length_gen = build_length_generator(descriptor.batch_read);
        let bulk_load_length_gen = build_length_generator(descriptor.bulk_load);
        let range_select_length_gen = build_length_generator(descriptor.range_select);

        let operation_chooser = OperationChooser::new([
            (OperationKind::Upsert, descriptor.upsert_proportion),
            (OperationKind::Update, descriptor.update_proportion),
            (OperationKind::Remove, descriptor.remove_proportion),
            (OperationKind::Read, descriptor.read_proportion),
            (
                OperationKind::ReadModifyWrite,
                descriptor.read_modify_write_proportion,
            ),
            (OperationKind::BatchUpsert, descriptor.batch_upsert_proportion),
            (OperationKind::BatchRead, descriptor.batch_read_proportion),
            (OperationKind::BulkLoad, descriptor.bulk_load_proportion),
            (
                OperationKind::RangeSelect,
                descriptor.range_select_proportion,
            ),
            (OperationKind::Scan, descriptor.scan_proportion),
        ]);

        let key_scratch = vec![0; elements_max_count];
        let value_scratch = ValueScratch::new(elements_max_count * descriptor.value_length.max(1) as usize);

        Self {
            descriptor,
            issuing,
            read_key_gen,
            value_length_gen,
            batch_upsert_length_gen,
            batch_read_length_gen,
            bulk_load_length_gen,
            range_select_length_gen,
            operation_chooser,
            byte_gen: ByteStreamGenerator::new(),
            key_scratch,
            value_scratch,
        }
    }

    /// Draw one read-class key, rejecting and redrawing candidates above
    /// the issuing generator's watermark.
    fn draw_read_key(&self) -> Key {
        let gen = self
            .read_key_gen
            .as_ref()
            .expect("read-key generator required outside pure-insert phase");
        loop {
            let candidate = gen.next();
            if candidate <= self.issuing.last() {
                return candidate;
            }
        }
    }

    /// Run `operations_count` iterations against `accessor`, pausing
    /// `timer` around batch/bulk data preparation, and returning the
    /// folded totals. Fatal errors (generator exhaustion) abort the
    /// loop early.
    ///
    /// Convenience for tests and standalone use; the orchestrator drives
    /// a worker one [`Worker::step`] at a time instead, since it needs to
    /// update shared counters and print progress between iterations.
    pub fn run(
        &mut self,
        accessor: &dyn DataAccessor,
        timer: &dyn Timer,
    ) -> Result<WorkerTotals> {
        let mut totals = WorkerTotals::default();
        for _ in 0..self.descriptor.operations_count {
            let outcome = self.step(accessor, timer)?;
            totals.entries_touched += outcome.entries_touched;
            totals.bytes_processed += outcome.bytes_processed;
            if !outcome.ok {
                totals.fails_count += 1;
            }
            totals.done_iterations += 1;
        }
        Ok(totals)
    }

    /// Choose and dispatch a single operation, returning its outcome.
    /// This is the granularity the orchestrator's main loop operates at:
    /// one call per iteration, so the caller can fold
    /// `entries_touched`/`bytes_processed`/`ok` into shared atomic
    /// counters and check the progress/flush conditions between calls.
    pub fn step(&mut self, accessor: &dyn DataAccessor, timer: &dyn Timer) -> Result<StepOutcome> {
        let result = self.dispatch_one(accessor, timer)?;
        Ok(StepOutcome {
            entries_touched: result.entries_touched as u64,
            bytes_processed: result.bytes_processed,
            ok: result.status.is_ok(),
        })
    }

    fn dispatch_one(
        &mut self,
        accessor: &dyn DataAccessor,
        timer: &dyn Timer,
    ) -> Result<DispatchResult> {
        match self.operation_chooser.choose() {
            OperationKind::Upsert => self.op_upsert(accessor),
            OperationKind::Update => Ok(self.op_update(accessor)),
            OperationKind::Remove => Ok(self.op_remove(accessor)),
            OperationKind::Read => Ok(self.op_read(accessor)),
            OperationKind::ReadModifyWrite => Ok(self.op_read_modify_write(accessor)),
            OperationKind::BatchUpsert => self.op_batch_upsert(accessor, timer),
            OperationKind::BatchRead => Ok(self.op_batch_read(accessor)),
            OperationKind::BulkLoad => self.op_bulk_load(accessor, timer),
            OperationKind::RangeSelect => Ok(self.op_range_select(accessor)),
            OperationKind::Scan => Ok(self.op_scan(accessor)),
        }
    }

    fn op_upsert(&mut self, accessor: &dyn DataAccessor) -> Result<DispatchResult> {
        let key = self.issuing.next();
        let len = self.value_length_gen.next() as usize;
        self.byte_gen.fill(&mut self.value_scratch.write_view()[..len]);
        let value = self.value_scratch.write_view()[..len].to_vec();
        let result = accessor.upsert(key, &value);
        self.issuing.acknowledge(key)?;
        Ok(DispatchResult {
            result,
            bytes_processed: len as u64,
        })
    }

    fn op_update(&mut self, accessor: &dyn DataAccessor) -> DispatchResult {
        let key = self.draw_read_key();
        let len = self.value_length_gen.next() as usize;
        self.byte_gen.fill(&mut self.value_scratch.write_view()[..len]);
        let value = self.value_scratch.write_view()[..len].to_vec();
        let result = accessor.update(key, &value);
        DispatchResult {
            result,
            bytes_processed: len as u64,
        }
    }

    fn op_remove(&mut self, accessor: &dyn DataAccessor) -> DispatchResult {
        let key = self.draw_read_key();
        let result = accessor.remove(key);
        DispatchResult {
            result,
            bytes_processed: 0,
        }
    }

    fn op_read(&mut self, accessor: &dyn DataAccessor) -> DispatchResult {
        let key = self.draw_read_key();
        let len = self.value_scratch.view_len();
        let result = accessor.read(key, &mut self.value_scratch.read_view()[..len]);
        DispatchResult {
            bytes_processed: (result.entries_touched * self.descriptor.value_length as usize) as u64,
            result,
        }
    }

    fn op_read_modify_write(&mut self, accessor: &dyn DataAccessor) -> DispatchResult {
        let key = self.draw_read_key();
        let read_len = self.value_scratch.view_len();
        let read_result = accessor.read(key, &mut self.value_scratch.read_view()[..read_len]);

        let write_len = self.value_length_gen.next() as usize;
        self.byte_gen
            .fill(&mut self.value_scratch.write_view()[..write_len]);
        let value = self.value_scratch.write_view()[..write_len].to_vec();
        let write_result = accessor.update(key, &value);

        let status = if !read_result.is_ok() {
            read_result.status
        } else {
            write_result.status
        };
        let combined = OperationResult {
            entries_touched: read_result.entries_touched + write_result.entries_touched,
            status,
        };
        DispatchResult {
            bytes_processed: (read_result.entries_touched * self.descriptor.value_length as usize
                + write_len) as u64,
            result: combined,
        }
    }

    fn op_batch_upsert(
        &mut self,
        accessor: &dyn DataAccessor,
        timer: &dyn Timer,
    ) -> Result<DispatchResult> {
        timer.pause();
        let n = (self.batch_upsert_length_gen.next() as usize).max(1);
        let value_len = self.value_length_gen.next() as usize;

        for i in 0..n {
            self.key_scratch[i] = self.issuing.next();
        }
        let mut values = Vec::with_capacity(n * value_len);
        let mut sizes = Vec::with_capacity(n);
        for _ in 0..n {
            let mut chunk = vec![0u8; value_len];
            self.byte_gen.fill(&mut chunk);
            values.extend_from_slice(&chunk);
            sizes.push(value_len);
        }
        timer.resume();

        let result = accessor.batch_upsert(&self.key_scratch[..n], &values, &sizes);
        for i in 0..n {
            self.issuing.acknowledge(self.key_scratch[i])?;
        }
        Ok(DispatchResult {
            bytes_processed: values.len() as u64,
            result,
        })
    }

    fn op_batch_read(&mut self, accessor: &dyn DataAccessor) -> DispatchResult {
        let n = (self.batch_read_length_gen.next() as usize).max(1);
        for i in 0..n {
            self.key_scratch[i] = self.draw_read_key();
        }
        let len = self.value_scratch.view_len();
        let result = accessor.batch_read(&self.key_scratch[..n], &mut self.value_scratch.read_view()[..len]);
        DispatchResult {
            bytes_processed: (result.entries_touched * self.descriptor.value_length as usize) as u64,
            result,
        }
    }

    fn op_bulk_load(
        &mut self,
        accessor: &dyn DataAccessor,
        timer: &dyn Timer,
    ) -> Result<DispatchResult> {
        timer.pause();
        let n = (self.bulk_load_length_gen.next() as usize).max(1);
        let value_len = self.value_length_gen.next() as usize;

        for i in 0..n {
            self.key_scratch[i] = self.issuing.next();
        }
        let mut values = Vec::with_capacity(n * value_len);
        let mut sizes = Vec::with_capacity(n);
        for _ in 0..n {
            let mut chunk = vec![0u8; value_len];
            self.byte_gen.fill(&mut chunk);
            values.extend_from_slice(&chunk);
            sizes.push(value_len);
        }
        timer.resume();

        let result = accessor.bulk_load(&self.key_scratch[..n], &values, &sizes);
        for i in 0..n {
            self.issuing.acknowledge(self.key_scratch[i])?;
        }
        Ok(DispatchResult {
            bytes_processed: values.len() as u64,
            result,
        })
    }

    fn op_range_select(&mut self, accessor: &dyn DataAccessor) -> DispatchResult {
        let key = self.draw_read_key();
        let length = (self.range_select_length_gen.next() as usize).max(1);
        let len = self.value_scratch.view_len();
        let result = accessor.range_select(key, length, &mut self.value_scratch.read_view()[..len]);
        DispatchResult {
            bytes_processed: (result.entries_touched * self.descriptor.value_length as usize) as u64,
            result,
        }
    }

    fn op_scan(&mut self, accessor: &dyn DataAccessor) -> DispatchResult {
        let key = self.descriptor.start_key;
        let length = self.descriptor.records_count as usize;
        let value_len = self.descriptor.value_length as usize;
        let result = accessor.scan(key, length, &mut self.value_scratch.write_view()[..value_len]);
        DispatchResult {
            bytes_processed: (result.entries_touched * value_len) as u64,
            result,
        }
    }
}

struct DispatchResult {
    result: OperationResult,
    bytes_processed: u64,
}

/// Outcome of one [`Worker::step`] call, already collapsed to the plain
/// numbers the orchestrator folds into its shared counters.
#[derive(Debug, Clone, Copy)]
pub struct StepOutcome {
    pub entries_touched: u64,
    pub bytes_processed: u64,
    pub ok: bool,
}

/// Totals folded by one worker over its whole run, matching the
/// per-thread slice of the shared metrics aggregator.
#[derive(Debug, Default, Clone, Copy)]
pub struct WorkerTotals {
    pub entries_touched: u64,
    pub fails_count: u64,
    pub bytes_processed: u64,
    pub done_iterations: u64,
}

impl std::ops::Deref for DispatchResult {
    type Target = OperationResult;
    fn deref(&self) -> &Self::Target {
        &self.result
    }
}
