use crate::Coordinate;
use std::collections::HashMap;
use std::collections::hash_map::Entry;

/// Deduplicated set of resolved coordinates, keyed by `path@version`.
///
/// Insertion is idempotent and membership checks are O(1).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClosureSet {
    members: HashMap<String, Coordinate>,
}

impl ClosureSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a coordinate, returning `true` if it was not already present.
    pub fn insert(&mut self, coordinate: Coordinate) -> bool {
        match self.members.entry(coordinate.key()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(coordinate);
                true
            },
        }
    }

    pub fn contains(&self, coordinate: &Coordinate) -> bool {
        self.members.contains_key(&coordinate.key())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.members.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Coordinate> {
        self.members.values()
    }

    /// Members in a stable order, for reporting.
    pub fn sorted(&self) -> Vec<&Coordinate> {
        let mut members: Vec<_> = self.members.values().collect();
        members.sort();
        members
    }
}

impl FromIterator<Coordinate> for ClosureSet {
    fn from_iter<I: IntoIterator<Item = Coordinate>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl Extend<Coordinate> for ClosureSet {
    fn extend<I: IntoIterator<Item = Coordinate>>(&mut self, iter: I) {
        for coordinate in iter {
            self.insert(coordinate);
        }
    }
}

impl IntoIterator for ClosureSet {
    type Item = Coordinate;
    type IntoIter = std::collections::hash_map::IntoValues<String, Coordinate>;
    fn into_iter(self) -> Self::IntoIter {
        self.members.into_values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_is_idempotent() {
        let mut set = ClosureSet::new();
        assert!(set.insert(Coordinate::new("example.com/a", "v1.0.0")));
        assert!(!set.insert(Coordinate::new("example.com/a", "v1.0.0")));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_versions_are_distinct_members() {
        let set: ClosureSet =
            [Coordinate::new("example.com/a", "v1.0.0"), Coordinate::new("example.com/a", "v1.1.0")].into_iter().collect();
        assert_eq!(set.len(), 2);
        assert!(set.contains_key("example.com/a@v1.1.0"));
        assert!(!set.contains(&Coordinate::new("example.com/a", "v2.0.0")));
    }

    #[test]
    fn test_sorted() {
        let set: ClosureSet = [Coordinate::new("b", "v1"), Coordinate::new("a", "v2"), Coordinate::new("a", "v1")]
            .into_iter()
            .collect();
        let keys: Vec<_> = set.sorted().into_iter().map(Coordinate::key).collect();
        assert_eq!(keys, vec!["a@v1", "a@v2", "b@v1"]);
    }
}
