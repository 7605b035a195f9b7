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

const FNV_OFFSET_BASIS_64: u64 = 0xCBF29CE484222325;
const FNV_PRIME_64: u64 = 1099511628211;

/// FNV-1a over the little-endian bytes of `val`, used by
/// [`crate::generator::scrambled_zipfian`] to scramble a Zipfian draw
/// before folding it into the output range.
///
/// <http://www.isthe.com/chongo/tech/comp/fnv/>
pub fn fnvhash64(mut val: u64) -> u64 {
    let mut hash = FNV_OFFSET_BASIS_64;

    for _ in 0..8 {
        let byte = val as u8;
        val >>= 8;

        hash ^= byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME_64);
    }

    hash
}
