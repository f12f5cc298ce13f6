//! Vector Similarity Functions
//!
//! Distance computations between one query and every stored vector.
//! Both measures are distances: smaller means more similar.

use std::fmt;
use std::str::FromStr;

use super::store::VectorStore;
use crate::error::{Error, Result};

/// Distance measure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Measure {
    /// sqrt(sum((q - v)^2)), range [0, inf)
    Euclidean,
    /// 1 - cos(q, v), range [0, 2]
    Cosine,
}

impl Measure {
    pub fn as_str(&self) -> &'static str {
        match self {
            Measure::Euclidean => "euclidean",
            Measure::Cosine => "cosine",
        }
    }

    /// Check a distance threshold against the measure's accepted range
    pub fn validate_threshold(&self, dist: f32) -> Result<()> {
        let valid = match self {
            Measure::Euclidean => dist.is_finite() && dist > 0.0,
            Measure::Cosine => dist > 0.0 && dist < 1.0,
        };
        if valid {
            Ok(())
        } else {
            let range = match self {
                Measure::Euclidean => "> 0",
                Measure::Cosine => "in (0, 1)",
            };
            Err(Error::configuration(format!(
                "{} distance threshold must be {}, got {}",
                self, range, dist
            )))
        }
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Measure {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "euclidean" => Ok(Measure::Euclidean),
            "cosine" => Ok(Measure::Cosine),
            other => Err(Error::configuration(format!(
                "unknown measure '{}', expected 'euclidean' or 'cosine'",
                other
            ))),
        }
    }
}

/// Compute dot product of two vectors
///
/// Uses unrolled loop for better CPU performance.
#[inline]
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "Vector dimensions must match");

    let len = a.len();
    let mut sum = 0.0f32;

    let chunks = len / 4;
    let remainder = len % 4;

    for i in 0..chunks {
        let idx = i * 4;
        sum += a[idx] * b[idx];
        sum += a[idx + 1] * b[idx + 1];
        sum += a[idx + 2] * b[idx + 2];
        sum += a[idx + 3] * b[idx + 3];
    }

    for i in (len - remainder)..len {
        sum += a[i] * b[i];
    }

    sum
}

#[inline]
pub fn magnitude(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

#[inline]
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "Vector dimensions must match");

    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f32>()
        .sqrt()
}

/// 1 - cosine similarity, given precomputed magnitudes.
///
/// A zero magnitude on either side counts as similarity 0. The result is
/// clamped to [0, 2]; rounding would otherwise push parallel vectors below 0.
#[inline]
fn cosine_distance_with_norms(a: &[f32], norm_a: f32, b: &[f32], norm_b: f32) -> f32 {
    let denom = norm_a * norm_b;
    let similarity = if denom > 0.0 {
        dot_product(a, b) / denom
    } else {
        0.0
    };
    (1.0 - similarity).clamp(0.0, 2.0)
}

#[inline]
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    cosine_distance_with_norms(a, magnitude(a), b, magnitude(b))
}

/// Computes distances from a query to every row of a [`VectorStore`]
#[derive(Debug, Clone, Copy)]
pub struct SimilarityEngine<'a> {
    store: &'a VectorStore,
}

impl<'a> SimilarityEngine<'a> {
    pub fn new(store: &'a VectorStore) -> Self {
        Self { store }
    }

    /// One distance per stored vector, in index order
    pub fn distances(&self, query: &[f32], measure: Measure) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.store.len());
        self.distances_into(query, measure, &mut out);
        out
    }

    /// Same as [`distances`](Self::distances) but reuses `out`
    pub fn distances_into(&self, query: &[f32], measure: Measure, out: &mut Vec<f32>) {
        debug_assert_eq!(query.len(), self.store.dimension());
        out.clear();
        match measure {
            Measure::Euclidean => {
                out.extend(self.store.rows().map(|row| euclidean_distance(query, row)));
            }
            Measure::Cosine => {
                let query_norm = magnitude(query);
                out.extend((0..self.store.len()).map(|i| {
                    cosine_distance_with_norms(
                        query,
                        query_norm,
                        self.store.row(i),
                        self.store.norm(i),
                    )
                }));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dot_product() {
        let a = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let b = vec![5.0, 4.0, 3.0, 2.0, 1.0];
        assert!((dot_product(&a, &b) - 35.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_distance_range() {
        assert!(cosine_distance(&[1.0, 0.0], &[2.0, 0.0]).abs() < 1e-6);
        assert!((cosine_distance(&[1.0, 0.0], &[0.0, 1.0]) - 1.0).abs() < 1e-6);
        assert!((cosine_distance(&[1.0, 0.0], &[-1.0, 0.0]) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_distance_stays_in_range_off_axis() {
        let words = (0..200).map(|i| format!("w{}", i)).collect();
        let rows: Vec<Vec<f32>> = (0..200)
            .map(|i| {
                let x = i as f32 * 0.37 + 0.1;
                (0..8).map(|j| (x * (j as f32 + 1.3)).sin() * 3.7).collect()
            })
            .collect();
        let store = VectorStore::from_rows(words, rows.clone()).unwrap();
        let engine = SimilarityEngine::new(&store);

        for (i, row) in rows.iter().enumerate() {
            let distances = engine.distances(row, Measure::Cosine);
            assert!(distances[i] >= 0.0, "self distance {} for row {}", distances[i], i);
            assert!(distances[i] < 1e-5);
            assert!(distances.iter().all(|d| (0.0..=2.0).contains(d)));

            let scaled: Vec<f32> = row.iter().map(|x| -x * 1.7).collect();
            assert!(cosine_distance(row, &scaled) <= 2.0);
        }
    }

    #[test]
    fn test_cosine_distance_zero_vector() {
        assert!((cosine_distance(&[0.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_euclidean_distance() {
        let a = vec![0.0, 0.0, 0.0];
        let b = vec![3.0, 4.0, 0.0];
        assert!((euclidean_distance(&a, &b) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_measure_parsing() {
        assert_eq!("euclidean".parse::<Measure>().unwrap(), Measure::Euclidean);
        assert_eq!("Cosine".parse::<Measure>().unwrap(), Measure::Cosine);
        assert!(matches!(
            "manhattan".parse::<Measure>(),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_threshold_ranges() {
        assert!(Measure::Euclidean.validate_threshold(3.5).is_ok());
        assert!(Measure::Euclidean.validate_threshold(-1.0).is_err());
        assert!(Measure::Euclidean.validate_threshold(0.0).is_err());
        assert!(Measure::Euclidean.validate_threshold(f32::INFINITY).is_err());
        assert!(Measure::Cosine.validate_threshold(0.5).is_ok());
        assert!(Measure::Cosine.validate_threshold(1.5).is_err());
        assert!(Measure::Cosine.validate_threshold(1.0).is_err());
        assert!(Measure::Cosine.validate_threshold(f32::NAN).is_err());
    }

    #[test]
    fn test_engine_matches_pairwise_functions() {
        let store = VectorStore::from_rows(
            vec!["a".into(), "b".into(), "c".into()],
            vec![vec![1.0, 0.0], vec![0.9, 0.1], vec![0.0, 1.0]],
        )
        .unwrap();
        let engine = SimilarityEngine::new(&store);
        let query = [0.5, 0.5];

        let euclid = engine.distances(&query, Measure::Euclidean);
        let cosine = engine.distances(&query, Measure::Cosine);
        assert_eq!(euclid.len(), 3);
        for (i, row) in store.rows().enumerate() {
            assert!((euclid[i] - euclidean_distance(&query, row)).abs() < 1e-6);
            assert!((cosine[i] - cosine_distance(&query, row)).abs() < 1e-6);
        }
    }
}
