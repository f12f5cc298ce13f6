//! Substitution Candidates
//!
//! Embedding-based replacement words for word-substitution augmenters.
//! Results are cached through the service's memo tier, so each word is
//! searched once per configuration.

use std::sync::Arc;

use crate::error::Result;
use crate::service::NeighborService;
use crate::vector::Measure;

#[derive(Clone)]
pub struct SubstitutionCandidates {
    service: Arc<NeighborService>,
    measure: Measure,
    topk: usize,
    dist: Option<f32>,
}

impl SubstitutionCandidates {
    pub fn new(service: Arc<NeighborService>, measure: Measure, topk: usize) -> Self {
        Self {
            service,
            measure,
            topk,
            dist: None,
        }
    }

    /// Only offer neighbours closer than `dist`
    pub fn with_dist(mut self, dist: f32) -> Result<Self> {
        self.measure.validate_threshold(dist)?;
        self.dist = Some(dist);
        Ok(self)
    }

    /// Up to `topk` neighbours of `word`, nearest first, never `word` itself.
    ///
    /// Words outside the vocabulary or without a pretrained vector have no
    /// candidates.
    pub fn get_cands(&self, word: &str) -> Result<Vec<String>> {
        if !self.service.store().contains(word) {
            return Ok(Vec::new());
        }

        // One extra slot since the word is its own nearest neighbour
        let words = self.service.find_words(
            word,
            self.measure,
            Some(self.topk.saturating_add(1)),
            self.dist,
        )?;

        Ok(words
            .into_iter()
            .filter(|candidate| candidate != word)
            .take(self.topk)
            .collect())
    }

    pub fn has_cands(&self, word: &str) -> Result<bool> {
        Ok(!self.get_cands(word)?.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::vector::VectorStore;

    fn service() -> Arc<NeighborService> {
        let store = VectorStore::from_rows(
            vec![
                "happy".into(),
                "glad".into(),
                "joyful".into(),
                "sad".into(),
                "zzz".into(),
            ],
            vec![
                vec![1.0, 0.1, 0.0],
                vec![0.9, 0.2, 0.0],
                vec![0.8, 0.1, 0.1],
                vec![-1.0, 0.0, 0.2],
                vec![0.0, 0.0, 0.0],
            ],
        )
        .unwrap();
        Arc::new(NeighborService::new(Arc::new(store)))
    }

    #[test]
    fn test_candidates_exclude_the_word() {
        let cands = SubstitutionCandidates::new(service(), Measure::Cosine, 2);
        let words = cands.get_cands("happy").unwrap();
        assert_eq!(words.len(), 2);
        assert!(!words.contains(&"happy".to_string()));
        assert!(!words.contains(&"sad".to_string()));
        assert!(cands.has_cands("happy").unwrap());
    }

    #[test]
    fn test_no_candidates_outside_vocabulary() {
        let cands = SubstitutionCandidates::new(service(), Measure::Euclidean, 3);
        assert!(cands.get_cands("ecstatic").unwrap().is_empty());
        assert!(!cands.has_cands("zzz").unwrap());
    }

    #[test]
    fn test_threshold_limits_candidates() {
        let cands = SubstitutionCandidates::new(service(), Measure::Cosine, 4)
            .with_dist(0.05)
            .unwrap();
        let words = cands.get_cands("happy").unwrap();
        assert!(!words.is_empty());
        assert!(!words.contains(&"sad".to_string()));

        assert!(matches!(
            SubstitutionCandidates::new(service(), Measure::Cosine, 4).with_dist(2.0),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_repeated_lookups_hit_the_memo() {
        let service = service();
        let cands = SubstitutionCandidates::new(service.clone(), Measure::Cosine, 2);
        cands.get_cands("glad").unwrap();
        cands.get_cands("glad").unwrap();
        assert_eq!(service.stats().memo_hits(), 1);
    }
}
