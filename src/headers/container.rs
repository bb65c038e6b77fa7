//! Case-insensitive multi-value header storage.
//!
//! # Responsibilities
//! - Store header names with the casing they arrived in
//! - Match every lookup and mutation on the lowercased name
//! - Fold colliding names deterministically when built in bulk
//!
//! # Design Decisions
//! - Backed by an insertion-ordered `Vec`; lookups are linear
//! - Mutators are crate-private. Outside the crate a container is only built in bulk (from
//!   engine callbacks) and edited through [`crate::headers::HeadersBuilder`], which owns the
//!   restricted-name policy.

use std::collections::HashMap;

/// A header name with all of its values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    name: String,
    values: Vec<String>,
}

impl Header {
    /// Name in its display casing.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }
}

/// Header map keyed by lowercased name.
#[derive(Debug, Clone, Default)]
pub struct HeaderContainer {
    entries: Vec<(String, Header)>,
}

impl HeaderContainer {
    /// Create an empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a container from (name, values) pairs.
    ///
    /// Names that fold to the same lowercased key are merged: the alphabetically
    /// smallest name becomes the display name and values are concatenated in
    /// alphabetical order of their source names. The result does not depend on
    /// the order in which colliding pairs are supplied.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, Vec<String>)>,
    {
        let mut groups: Vec<(String, Vec<(String, Vec<String>)>)> = Vec::new();
        for (name, values) in pairs {
            let key = name.to_lowercase();
            match groups.iter_mut().find(|(k, _)| *k == key) {
                Some((_, members)) => members.push((name, values)),
                None => groups.push((key, vec![(name, values)])),
            }
        }

        let entries = groups
            .into_iter()
            .map(|(key, mut members)| {
                members.sort_by(|a, b| a.0.cmp(&b.0));
                let name = members
                    .first()
                    .map(|(name, _)| name.clone())
                    .unwrap_or_else(|| key.clone());
                let values = members.into_iter().flat_map(|(_, values)| values).collect();
                (key, Header { name, values })
            })
            .collect();

        Self { entries }
    }

    /// All values for `name`, matched case-insensitively.
    pub fn value(&self, name: &str) -> Option<&[String]> {
        self.find(name).map(|index| self.entries[index].1.values())
    }

    /// First value for `name`.
    pub fn first_value(&self, name: &str) -> Option<&str> {
        self.value(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Snapshot keyed by display name.
    pub fn all_headers(&self) -> HashMap<String, Vec<String>> {
        self.entries
            .iter()
            .map(|(_, header)| (header.name.clone(), header.values.clone()))
            .collect()
    }

    /// Headers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Header> {
        self.entries.iter().map(|(_, header)| header)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append a value, creating the header if missing.
    pub(crate) fn add(&mut self, name: &str, value: String) {
        self.add_all(name, vec![value]);
    }

    /// Append several values. Adding nothing to a missing name is a no-op.
    pub(crate) fn add_all(&mut self, name: &str, values: Vec<String>) {
        match self.find(name) {
            Some(index) => self.entries[index].1.values.extend(values),
            None if values.is_empty() => {}
            None => self.entries.push((
                name.to_lowercase(),
                Header {
                    name: name.to_string(),
                    values,
                },
            )),
        }
    }

    /// Replace all values for `name`; `None` removes the header.
    ///
    /// An existing header keeps its display casing and position.
    pub(crate) fn set(&mut self, name: &str, values: Option<Vec<String>>) {
        let Some(values) = values else {
            self.remove(name);
            return;
        };
        match self.find(name) {
            Some(index) => self.entries[index].1.values = values,
            None => self.entries.push((
                name.to_lowercase(),
                Header {
                    name: name.to_string(),
                    values,
                },
            )),
        }
    }

    pub(crate) fn remove(&mut self, name: &str) {
        if let Some(index) = self.find(name) {
            self.entries.remove(index);
        }
    }

    fn find(&self, name: &str) -> Option<usize> {
        let key = name.to_lowercase();
        self.entries.iter().position(|(k, _)| *k == key)
    }
}

impl PartialEq for HeaderContainer {
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len()
            && self.entries.iter().all(|(key, header)| {
                other
                    .entries
                    .iter()
                    .any(|(other_key, other_header)| key == other_key && header == other_header)
            })
    }
}

impl Eq for HeaderContainer {}

impl From<HashMap<String, Vec<String>>> for HeaderContainer {
    fn from(headers: HashMap<String, Vec<String>>) -> Self {
        Self::from_pairs(headers)
    }
}

impl FromIterator<(String, Vec<String>)> for HeaderContainer {
    fn from_iter<I: IntoIterator<Item = (String, Vec<String>)>>(iter: I) -> Self {
        Self::from_pairs(iter)
    }
}
