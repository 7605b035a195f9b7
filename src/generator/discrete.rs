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

use std::sync::Mutex;

use rand::{thread_rng, Rng};

use super::Generator;
use crate::contract::OperationKind;

/// Choice of the generated value of [`DiscreteGenerator`].
pub struct Choice<T> {
    /// Value to generate.
    pub val: T,
    /// Possibility weight of the choice.
    pub weight: f64,
}

/// Generates a distribution by choosing from a discrete set of values.
pub struct DiscreteGenerator<T> {
    choices: Vec<Choice<T>>,
    sum: f64,
    last: Mutex<Option<T>>,
}

impl<T> DiscreteGenerator<T>
where
    T: Clone,
{
    /// Create a generator that generates a distribution by choosing from a discrete set of values.
    pub fn new(choices: Vec<Choice<T>>) -> Self {
        let sum = choices.iter().map(|choice| choice.weight).sum();
        Self {
            choices,
            sum,
            last: Mutex::new(None),
        }
    }
}

impl<T> Generator for DiscreteGenerator<T>
where
    T: Clone + Send + Sync,
{
    type Output = T;

    fn next(&self) -> Self::Output {
        let target = thread_rng().gen_range(0.0..self.sum);
        let mut acc = 0.0;
        let val = 'choose: {
            for choice in self.choices.iter() {
                acc += choice.weight;
                if target < acc {
                    break 'choose choice.val.clone();
                }
            }
            // Floating-point rounding may leave `target` a hair above
            // the accumulated sum; fall back to the last choice.
            self.choices
                .last()
                .expect("DiscreteGenerator must have at least one choice")
                .val
                .clone()
        };
        *self.last.lock().unwrap() = Some(val.clone());
        val
    }

    fn last(&self) -> Self::Output {
        self.last
            .lock()
            .unwrap()
            .clone()
            .expect("next() must be called before last()")
    }
}

/// Picks which [`OperationKind`] a worker should perform next, weighted
/// by a workload's configured proportions. Kinds with zero weight are
/// dropped entirely rather than given a (never-selected) slot, so a
/// workload that never configures e.g. `scan` pays nothing for it.
pub struct OperationChooser {
    inner: DiscreteGenerator<OperationKind>,
}

impl OperationChooser {
    /// Build a chooser from `(kind, weight)` pairs. Panics if every
    /// weight is zero or the list is empty, since no operation could
    /// ever be chosen.
    pub fn new(weights: impl IntoIterator<Item = (OperationKind, f64)>) -> Self {
        let choices: Vec<Choice<OperationKind>> = weights
            .into_iter()
            .filter(|(_, weight)| *weight > 0.0)
            .map(|(val, weight)| Choice { val, weight })
            .collect();
        assert!(
            !choices.is_empty(),
            "OperationChooser needs at least one operation with positive weight"
        );
        Self {
            inner: DiscreteGenerator::new(choices),
        }
    }

    /// Draw the next operation kind.
    pub fn choose(&self) -> OperationKind {
        self.inner.next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_choice_always_wins() {
        let gen = DiscreteGenerator::new(vec![Choice {
            val: 7,
            weight: 1.0,
        }]);
        for _ in 0..100 {
            assert_eq!(gen.next(), 7);
        }
    }

    #[test]
    fn zero_weight_operations_are_never_chosen() {
        let chooser = OperationChooser::new([
            (OperationKind::Read, 1.0),
            (OperationKind::Scan, 0.0),
        ]);
        for _ in 0..1000 {
            assert_eq!(chooser.choose(), OperationKind::Read);
        }
    }

    #[test]
    #[should_panic]
    fn all_zero_weights_panics() {
        OperationChooser::new([(OperationKind::Read, 0.0)]);
    }
}
