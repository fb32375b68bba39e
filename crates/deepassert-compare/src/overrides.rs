//! Consumable, path-keyed overrides for one comparison pass.

use deepassert_types::{Expectation, Override};

/// The caller's overrides, consumed as the traversal reaches their paths.
///
/// Paths are relative to the comparison root. Whatever is left when a node
/// finishes, and lies below that node, is excess.
#[derive(Debug, Default)]
pub struct OverrideSet {
    entries: Vec<Override>,
}

impl OverrideSet {
    pub fn new(entries: Vec<Override>) -> Self {
        Self { entries }
    }

    /// Strip a leading root qualifier (`Person.name` becomes `name`) in place.
    pub fn qualify_for_root(&mut self, root_type: &str) {
        for entry in &mut self.entries {
            entry.path.strip_qualifier(root_type);
        }
    }

    /// Remove and return the first override whose path equals `path`.
    ///
    /// A duplicate for the same path stays behind and later surfaces as excess.
    pub fn take(&mut self, path: &[String]) -> Option<Expectation> {
        let index = self.entries.iter().position(|o| o.path.matches(path))?;
        Some(self.entries.remove(index).expectation)
    }

    /// Remove and return every override strictly below `path`.
    pub fn drain_under(&mut self, path: &[String]) -> Vec<Override> {
        let (under, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|o| o.path.is_below(path));
        self.entries = rest;
        under
    }

    /// Remove and return everything that is left.
    pub fn drain_all(&mut self) -> Vec<Override> {
        std::mem::take(&mut self.entries)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segs(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    fn set(paths: &[&str]) -> OverrideSet {
        OverrideSet::new(
            paths
                .iter()
                .map(|p| Override::not_null(p).unwrap())
                .collect(),
        )
    }

    #[test]
    fn take_consumes_once() {
        let mut overrides = set(&["name", "NAME"]);
        assert!(overrides.take(&segs(&["name"])).is_some());
        assert_eq!(overrides.len(), 1);
        assert!(overrides.take(&segs(&["name"])).is_some());
        assert!(overrides.take(&segs(&["name"])).is_none());
    }

    #[test]
    fn drain_under_only_takes_descendants() {
        let mut overrides = set(&["address.street", "address", "name", "address.zip.code"]);
        let under: Vec<String> = overrides
            .drain_under(&segs(&["address"]))
            .into_iter()
            .map(|o| o.path.to_string())
            .collect();
        assert_eq!(under, vec!["address.street", "address.zip.code"]);
        assert_eq!(overrides.len(), 2);
    }

    #[test]
    fn root_qualifier_is_stripped() {
        let mut overrides = set(&["Person.name", "address.street"]);
        overrides.qualify_for_root("person");
        assert!(overrides.take(&segs(&["name"])).is_some());
        assert!(overrides.take(&segs(&["address", "street"])).is_some());
        assert!(overrides.is_empty());
    }

    #[test]
    fn drain_all_empties() {
        let mut overrides = set(&["a", "b"]);
        assert_eq!(overrides.drain_all().len(), 2);
        assert!(overrides.is_empty());
    }
}
