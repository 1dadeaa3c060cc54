use std::collections::BTreeSet;

/// A set of selected record keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection<K: Ord> {
    keys: BTreeSet<K>,
}

impl<K: Ord> Default for Selection<K> {
    fn default() -> Self {
        Self {
            keys: BTreeSet::new(),
        }
    }
}

impl<K: Ord + Clone> Selection<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip membership of `key`. Returns whether it is now selected.
    pub fn toggle(&mut self, key: &K) -> bool {
        if self.keys.remove(key) {
            false
        } else {
            self.keys.insert(key.clone());
            true
        }
    }

    /// Replace the selection with exactly `keys`.
    pub fn select_all<'a, I>(&mut self, keys: I)
    where
        I: IntoIterator<Item = &'a K>,
        K: 'a,
    {
        self.keys = keys.into_iter().cloned().collect();
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }

    pub fn remove(&mut self, key: &K) -> bool {
        self.keys.remove(key)
    }

    /// Drop every key for which `keep` is false.
    pub fn retain(&mut self, mut keep: impl FnMut(&K) -> bool) {
        self.keys.retain(|k| keep(k));
    }

    pub fn contains(&self, key: &K) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &K> {
        self.keys.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_flips_membership() {
        let mut sel: Selection<String> = Selection::new();
        assert!(sel.toggle(&"a".to_string()));
        assert!(sel.contains(&"a".to_string()));
        assert!(!sel.toggle(&"a".to_string()));
        assert!(sel.is_empty());
    }

    #[test]
    fn select_all_replaces() {
        let mut sel = Selection::new();
        sel.toggle(&"stale".to_string());
        let keys = vec!["a".to_string(), "b".to_string()];
        sel.select_all(&keys);
        assert_eq!(sel.len(), 2);
        assert!(!sel.contains(&"stale".to_string()));
        sel.clear();
        assert!(sel.is_empty());
    }

    #[test]
    fn retain_prunes() {
        let mut sel = Selection::new();
        sel.select_all(&[1, 2, 3, 4]);
        sel.retain(|k| k % 2 == 0);
        assert_eq!(sel.iter().copied().collect::<Vec<_>>(), vec![2, 4]);
        assert!(sel.remove(&2));
        assert!(!sel.remove(&2));
    }
}
