//! Ordered header metadata carried through unchanged.

use std::fmt;

/// Header key holding the per-band wavelength list.
pub const WAVELENGTH_KEY: &str = "wavelength";

/// Insertion-ordered `key = value` header fields.
///
/// Keys are stored lower-case and trimmed; values keep their raw text
/// (including braces for list values) so that they can be written back
/// byte-for-byte.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMetadata {
    entries: Vec<(String, String)>,
}

impl HeaderMetadata {
    /// Create an empty metadata map.
    pub fn new() -> Self {
        Self::default()
    }

    fn normalize_key(key: &str) -> String {
        key.trim().to_ascii_lowercase()
    }

    /// Raw value text for a key.
    pub fn get(&self, key: &str) -> Option<&str> {
        let key = Self::normalize_key(key);
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Whether a key is present.
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Set a value, keeping the key's original position if it already exists.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let key = Self::normalize_key(key);
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Remove a key, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let key = Self::normalize_key(key);
        let index = self.entries.iter().position(|(k, _)| *k == key)?;
        Some(self.entries.remove(index).1)
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse a `{a, b, c}` list value into its trimmed items.
    pub fn list_items(value: &str) -> Vec<&str> {
        let inner = value.trim();
        let inner = inner.strip_prefix('{').unwrap_or(inner);
        let inner = inner.strip_suffix('}').unwrap_or(inner);
        inner
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .collect()
    }

    /// Format numbers as a `{a, b, c}` list value.
    pub fn format_list(values: &[f64]) -> String {
        let items: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        format!("{{{}}}", items.join(", "))
    }
}

impl fmt::Display for HeaderMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.entries {
            writeln!(f, "{} = {}", key, value)?;
        }
        Ok(())
    }
}
