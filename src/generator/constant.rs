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

use super::{Generator, NumberGenerator};

/// A trivial numeric generator that always returns the same value.
#[derive(Debug)]
pub struct ConstGenerator {
    val: u64,
}

impl ConstGenerator {
    /// Creates a trivial numeric generator that always returns `val`.
    pub fn new(val: u64) -> Self {
        Self { val }
    }
}

impl Generator for ConstGenerator {
    type Output = u64;

    fn next(&self) -> Self::Output {
        self.val
    }

    fn last(&self) -> Self::Output {
        self.val
    }
}

impl NumberGenerator for ConstGenerator {
    fn mean(&self) -> f64 {
        self.val as f64
    }
}
