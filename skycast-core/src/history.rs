//! Recently searched cities, most recent first.

use tracing::warn;

pub const MAX_HISTORY: usize = 5;

/// Ordered, deduplicated list of canonical city names, capped at
/// [`MAX_HISTORY`] entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchHistory {
    entries: Vec<String>,
}

impl SearchHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds `name` into the history.
    ///
    /// A name that is already present leaves the history untouched (it is not
    /// moved to the front). Otherwise the name is prepended and the oldest
    /// entries beyond [`MAX_HISTORY`] are dropped.
    pub fn record(&self, name: &str) -> SearchHistory {
        if name.trim().is_empty() || self.contains(name) {
            return self.clone();
        }

        let entries = std::iter::once(name.to_string())
            .chain(self.entries.iter().cloned())
            .take(MAX_HISTORY)
            .collect();

        SearchHistory { entries }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e == name)
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// JSON array of strings.
    pub fn serialize(&self) -> String {
        // A Vec<String> always serializes.
        serde_json::to_string(&self.entries).unwrap_or_else(|_| "[]".to_string())
    }

    /// Parses a serialized history. Malformed input yields an empty history;
    /// well-formed input is normalized back into the size and uniqueness
    /// invariants.
    pub fn deserialize(raw: &str) -> SearchHistory {
        let names: Vec<String> = match serde_json::from_str(raw) {
            Ok(names) => names,
            Err(err) => {
                warn!(error = %err, "Discarding malformed search history");
                return SearchHistory::default();
            }
        };

        let mut entries: Vec<String> = Vec::with_capacity(MAX_HISTORY);
        for name in names {
            if entries.len() == MAX_HISTORY {
                break;
            }
            if name.trim().is_empty() || entries.contains(&name) {
                continue;
            }
            entries.push(name);
        }

        SearchHistory { entries }
    }
}

impl<'a> IntoIterator for &'a SearchHistory {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
