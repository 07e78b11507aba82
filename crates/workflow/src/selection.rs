use serde::Serialize;

pub const MAX_SELECTION: usize = 2;

/// Ordered set of at most two selected node ids. Doubles as the parent list
/// of the next generation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Selection {
    ids: Vec<String>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps the first two distinct ids.
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut selection = Self::new();
        for id in ids {
            let id = id.into();
            if selection.ids.len() < MAX_SELECTION && !selection.contains(&id) {
                selection.ids.push(id);
            }
        }
        selection
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|s| s == id)
    }

    pub fn last(&self) -> Option<&str> {
        self.ids.last().map(String::as_str)
    }

    /// A selected id is removed; a new one is added only while fewer than two
    /// are selected. Returns whether the selection changed.
    pub fn toggle(&mut self, id: &str) -> bool {
        if let Some(pos) = self.ids.iter().position(|s| s == id) {
            self.ids.remove(pos);
            return true;
        }
        if self.ids.len() < MAX_SELECTION {
            self.ids.push(id.to_string());
            return true;
        }
        false
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.ids.len();
        self.ids.retain(|s| s != id);
        self.ids.len() != before
    }

    /// Drops ids for which `exists` is false.
    pub fn retain_existing(&mut self, exists: impl Fn(&str) -> bool) {
        self.ids.retain(|id| exists(id.as_str()));
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_caps_at_two() {
        let mut s = Selection::new();
        assert!(s.toggle("a"));
        assert!(s.toggle("b"));
        assert!(!s.toggle("c"));
        assert_eq!(s.ids(), ["a", "b"]);
        assert!(s.toggle("a"));
        assert_eq!(s.ids(), ["b"]);
        assert!(s.toggle("c"));
        assert_eq!(s.last(), Some("c"));
    }

    #[test]
    fn test_bound_holds_for_any_sequence() {
        let mut s = Selection::new();
        let ids = ["a", "b", "c", "d"];
        let mut seed = 7u32;
        for _ in 0..500 {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            s.toggle(ids[(seed >> 16) as usize % ids.len()]);
            assert!(s.len() <= MAX_SELECTION);
        }
    }

    #[test]
    fn test_from_ids_and_pruning() {
        let mut s = Selection::from_ids(["a", "a", "b", "c"]);
        assert_eq!(s.ids(), ["a", "b"]);
        assert!(s.remove("a"));
        assert!(!s.remove("zz"));
        s.retain_existing(|id| id != "b");
        assert!(s.is_empty());
    }
}
