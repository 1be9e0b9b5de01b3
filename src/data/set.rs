// Reference rust implementation of the Bali virtual machine (BVM).
//
// SPDX-License-Identifier: Apache-2.0
//
// Written in 2021-2025 by
//     Dr Maxim Orlovsky <orlovsky@ubideco.org>
//
// Copyright (C) 2021-2025 UBIDECO Labs,
//     Laboratories for Distributed and Cognitive Computing, Switzerland.
//     All rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use core::fmt::{self, Debug, Display, Formatter};
use std::collections::btree_set::{self, BTreeSet};

/// Ordered set supporting the higher-level collection types of the platform.
///
/// Provides ordered iteration, logarithmic membership tests and 1-based index lookups. Backed by
/// a balanced ordered tree from the standard collections rather than a hand-rolled randomized
/// structure; the ordering semantics come from the item's `Ord` implementation.
#[derive(Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct OrderedSet<T: Ord>(BTreeSet<T>);

impl<T: Ord> OrderedSet<T> {
    /// Constructs an empty set.
    pub fn new() -> Self { OrderedSet(BTreeSet::new()) }

    /// Returns the number of items in the set.
    pub fn len(&self) -> usize { self.0.len() }

    /// Detects an empty set.
    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    /// Adds an item, returning whether it was absent before.
    pub fn insert(&mut self, item: T) -> bool { self.0.insert(item) }

    /// Removes an item, returning whether it was present.
    pub fn remove(&mut self, item: &T) -> bool { self.0.remove(item) }

    /// Tests membership.
    pub fn contains(&self, item: &T) -> bool { self.0.contains(item) }

    /// Returns the 1-based position of an item in the set ordering.
    pub fn index_of(&self, item: &T) -> Option<usize> {
        self.0.iter().position(|i| i == item).map(|pos| pos + 1)
    }

    /// Returns the item at a 1-based position in the set ordering.
    pub fn get(&self, index: usize) -> Option<&T> {
        index.checked_sub(1).and_then(|i| self.0.iter().nth(i))
    }

    /// Iterates items in ascending order.
    pub fn iter(&self) -> btree_set::Iter<'_, T> { self.0.iter() }
}

impl<T: Ord> FromIterator<T> for OrderedSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self { OrderedSet(iter.into_iter().collect()) }
}

impl<T: Ord> IntoIterator for OrderedSet<T> {
    type Item = T;
    type IntoIter = btree_set::IntoIter<T>;
    fn into_iter(self) -> Self::IntoIter { self.0.into_iter() }
}

impl<'set, T: Ord> IntoIterator for &'set OrderedSet<T> {
    type Item = &'set T;
    type IntoIter = btree_set::Iter<'set, T>;
    fn into_iter(self) -> Self::IntoIter { self.0.iter() }
}

impl<T: Ord + Display> Display for OrderedSet<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (no, item) in self.iter().enumerate() {
            if no > 0 {
                f.write_str(", ")?;
            }
            Display::fmt(item, f)?;
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::data::Value;

    #[test]
    fn membership_and_order() {
        let mut set = OrderedSet::new();
        assert!(set.insert(Value::symbol("c")));
        assert!(set.insert(Value::symbol("a")));
        assert!(set.insert(Value::number(7.0)));
        assert!(!set.insert(Value::symbol("a")));

        assert_eq!(set.len(), 3);
        assert!(set.contains(&Value::symbol("c")));
        let ordered = set.iter().cloned().collect::<Vec<_>>();
        assert_eq!(ordered, vec![Value::number(7.0), Value::symbol("a"), Value::symbol("c")]);
    }

    #[test]
    fn one_based_indexing() {
        let set = ["delta", "alpha", "bravo"]
            .into_iter()
            .map(Value::symbol)
            .collect::<OrderedSet<_>>();
        assert_eq!(set.index_of(&Value::symbol("alpha")), Some(1));
        assert_eq!(set.index_of(&Value::symbol("delta")), Some(3));
        assert_eq!(set.index_of(&Value::symbol("omega")), None);
        assert_eq!(set.get(2), Some(&Value::symbol("bravo")));
        assert_eq!(set.get(0), None);
        assert_eq!(set.get(4), None);
    }

    #[test]
    fn removal() {
        let mut set = ["a", "b"].into_iter().map(Value::symbol).collect::<OrderedSet<_>>();
        assert!(set.remove(&Value::symbol("a")));
        assert!(!set.remove(&Value::symbol("a")));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn display() {
        let set = ["b", "a"].into_iter().map(Value::symbol).collect::<OrderedSet<_>>();
        assert_eq!(set.to_string(), "[$a, $b]");
    }
}
