//! Duplicate-free string collection used for "known peers"

use serde::{Serialize, Serializer};
use std::collections::BTreeSet;

/// An unordered collection of unique, non-empty strings
///
/// Empty strings are ignored on insertion, so a broadcast probe (no SSID)
/// never shows up as a known network. Iteration happens in sorted order,
/// but callers should not rely on any particular order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Set {
    elements: BTreeSet<String>,
}

impl Set {
    /// Create a new empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an element, returns true if the set changed
    pub fn add(&mut self, element: &str) -> bool {
        if element.is_empty() || self.elements.contains(element) {
            return false;
        }
        self.elements.insert(element.to_string())
    }

    pub fn contains(&self, element: &str) -> bool {
        self.elements.contains(element)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.elements.iter().map(String::as_str)
    }
}

impl<'a> FromIterator<&'a str> for Set {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut set = Set::new();
        for element in iter {
            set.add(element);
        }
        set
    }
}

/// Serialized as a JSON array
impl Serialize for Set {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.elements.iter())
    }
}
