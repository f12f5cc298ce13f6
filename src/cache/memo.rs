//! Per-query memo tier

use dashmap::DashMap;

use crate::service::Neighbours;
use crate::vector::Measure;

/// Stable identity of a query element
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    Index(usize),
    Word(String),
    /// Raw vector with a caller-supplied identity
    Keyed(String),
}

/// Every call parameter that determines a result
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemoKey {
    query: QueryKey,
    measure: Measure,
    topk: Option<usize>,
    /// Threshold bit pattern; thresholds are validated finite first
    dist: Option<u32>,
    return_words: bool,
}

impl MemoKey {
    pub fn new(
        query: QueryKey,
        measure: Measure,
        topk: Option<usize>,
        dist: Option<f32>,
        return_words: bool,
    ) -> Self {
        Self {
            query,
            measure,
            topk,
            dist: dist.map(f32::to_bits),
            return_words,
        }
    }
}

/// Insert-if-absent map of finished results
#[derive(Debug, Default)]
pub struct MemoCache {
    entries: DashMap<MemoKey, Neighbours>,
}

impl MemoCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &MemoKey) -> Option<Neighbours> {
        self.entries.get(key).map(|e| e.value().clone())
    }

    /// Store `value` unless another caller got there first; returns the
    /// value that ends up cached
    pub fn insert(&self, key: MemoKey, value: Neighbours) -> Neighbours {
        self.entries.entry(key).or_insert(value).value().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_insert_wins() {
        let memo = MemoCache::new();
        let key = MemoKey::new(QueryKey::Word("cat".into()), Measure::Cosine, Some(2), None, true);

        let first = memo.insert(key.clone(), Neighbours::Words(vec!["cat".into()]));
        let second = memo.insert(key.clone(), Neighbours::Words(vec!["dog".into()]));

        assert_eq!(first, second);
        assert_eq!(memo.get(&key), Some(Neighbours::Words(vec!["cat".into()])));
        assert_eq!(memo.len(), 1);
    }

    #[test]
    fn test_keys_distinguish_every_parameter() {
        let base = MemoKey::new(QueryKey::Index(0), Measure::Cosine, Some(2), Some(0.5), false);
        let variants = [
            MemoKey::new(QueryKey::Index(1), Measure::Cosine, Some(2), Some(0.5), false),
            MemoKey::new(QueryKey::Index(0), Measure::Euclidean, Some(2), Some(0.5), false),
            MemoKey::new(QueryKey::Index(0), Measure::Cosine, None, Some(0.5), false),
            MemoKey::new(QueryKey::Index(0), Measure::Cosine, Some(2), Some(0.25), false),
            MemoKey::new(QueryKey::Index(0), Measure::Cosine, Some(2), Some(0.5), true),
        ];
        for variant in variants {
            assert_ne!(base, variant);
        }
        assert_eq!(
            base,
            MemoKey::new(QueryKey::Index(0), Measure::Cosine, Some(2), Some(0.5), false)
        );
    }
}
