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

//! An in-memory [`DataAccessor`]/[`Engine`] implementation, not a
//! production storage adapter -- storage engines stay external
//! collaborators. This exists so the crate's own test suite can drive a
//! worker, partitioner, fence, and orchestrator end to end without a real
//! engine dependency.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use anyhow::Result;

use crate::contract::{DataAccessor, Engine, Key, OperationResult, OperationStatus};

/// `RwLock<BTreeMap<Key, Vec<u8>>>`-backed reference implementation of
/// the data-access capability set: one concrete, trait-object-compatible
/// type standing in for a real storage adapter.
#[derive(Debug, Default)]
pub struct MemoryEngine {
    table: RwLock<BTreeMap<Key, Vec<u8>>>,
    opened: AtomicU64,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn copy_out(value: &[u8], dst: &mut [u8]) -> usize {
        let n = value.len().min(dst.len());
        dst[..n].copy_from_slice(&value[..n]);
        n
    }
}

impl DataAccessor for MemoryEngine {
    fn upsert(&self, key: Key, value: &[u8]) -> OperationResult {
        self.table.write().unwrap().insert(key, value.to_vec());
        OperationResult::ok(1)
    }

    fn update(&self, key: Key, value: &[u8]) -> OperationResult {
        let mut table = self.table.write().unwrap();
        match table.get_mut(&key) {
            Some(slot) => {
                *slot = value.to_vec();
                OperationResult::ok(1)
            }
            None => OperationResult::failed(0, OperationStatus::NotFound),
        }
    }

    fn remove(&self, key: Key) -> OperationResult {
        match self.table.write().unwrap().remove(&key) {
            Some(_) => OperationResult::ok(1),
            None => OperationResult::failed(0, OperationStatus::NotFound),
        }
    }

    fn read(&self, key: Key, value: &mut [u8]) -> OperationResult {
        match self.table.read().unwrap().get(&key) {
            Some(stored) => {
                Self::copy_out(stored, value);
                OperationResult::ok(1)
            }
            None => OperationResult::failed(0, OperationStatus::NotFound),
        }
    }

    fn batch_upsert(&self, keys: &[Key], values: &[u8], sizes: &[usize]) -> OperationResult {
        let mut table = self.table.write().unwrap();
        let mut offset = 0;
        for (&key, &size) in keys.iter().zip(sizes.iter()) {
            table.insert(key, values[offset..offset + size].to_vec());
            offset += size;
        }
        OperationResult::ok(keys.len())
    }

    fn batch_read(&self, keys: &[Key], values: &mut [u8]) -> OperationResult {
        let table = self.table.read().unwrap();
        let mut offset = 0;
        let mut touched = 0;
        for &key in keys {
            if let Some(stored) = table.get(&key) {
                let remaining = values.len().saturating_sub(offset);
                if remaining == 0 {
                    break;
                }
                let n = Self::copy_out(stored, &mut values[offset..]);
                offset += n;
                touched += 1;
            }
        }
        if touched == 0 && !keys.is_empty() {
            OperationResult::failed(0, OperationStatus::NotFound)
        } else {
            OperationResult::ok(touched)
        }
    }

    fn bulk_load(&self, keys: &[Key], values: &[u8], sizes: &[usize]) -> OperationResult {
        self.batch_upsert(keys, values, sizes)
    }

    fn range_select(&self, start_key: Key, length: usize, values: &mut [u8]) -> OperationResult {
        let table = self.table.read().unwrap();
        let mut offset = 0;
        let mut touched = 0;
        for (_, stored) in table.range(start_key..).take(length) {
            let remaining = values.len().saturating_sub(offset);
            if remaining == 0 {
                break;
            }
            let n = Self::copy_out(stored, &mut values[offset..]);
            offset += n;
            touched += 1;
        }
        OperationResult::ok(touched)
    }

    fn scan(&self, start_key: Key, length: usize, single_value: &mut [u8]) -> OperationResult {
        let table = self.table.read().unwrap();
        let mut touched = 0;
        for (_, stored) in table.range(start_key..).take(length) {
            Self::copy_out(stored, single_value);
            touched += 1;
        }
        OperationResult::ok(touched)
    }
}

impl Engine for MemoryEngine {
    fn set_config(&self, _config_path: &Path, _working_dir_path: &Path) -> Result<()> {
        Ok(())
    }

    fn open(&self) -> Result<()> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }

    fn size_on_disk(&self) -> Result<u64> {
        let table = self.table.read().unwrap();
        Ok(table.values().map(|v| v.len() as u64).sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_then_read_round_trips() {
        let engine = MemoryEngine::new();
        assert!(engine.upsert(1, b"hello").is_ok());
        let mut buf = [0u8; 16];
        let result = engine.read(1, &mut buf);
        assert!(result.is_ok());
        assert_eq!(&buf[..5], b"hello");
    }

    #[test]
    fn read_of_missing_key_is_not_found() {
        let engine = MemoryEngine::new();
        let mut buf = [0u8; 8];
        let result = engine.read(42, &mut buf);
        assert_eq!(result.status, OperationStatus::NotFound);
    }

    #[test]
    fn update_of_missing_key_is_not_found() {
        let engine = MemoryEngine::new();
        let result = engine.update(1, b"x");
        assert_eq!(result.status, OperationStatus::NotFound);
    }

    #[test]
    fn range_select_respects_ascending_order_and_length() {
        let engine = MemoryEngine::new();
        for key in 0..10u64 {
            engine.upsert(key, format!("v{key}").as_bytes());
        }
        let mut buf = [0u8; 256];
        let result = engine.range_select(3, 4, &mut buf);
        assert_eq!(result.entries_touched, 4);
    }

    #[test]
    fn size_on_disk_tracks_stored_bytes() {
        let engine = MemoryEngine::new();
        assert_eq!(engine.size_on_disk().unwrap(), 0);
        engine.upsert(1, b"abcdef");
        assert_eq!(engine.size_on_disk().unwrap(), 6);
    }
}
