//! Vector Store
//!
//! Immutable embedding matrix with a word <-> index mapping.

use hashbrown::HashMap;

use crate::error::{Error, Result};

/// Identifies a vocabulary entry either by row index or by word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VocabId<'a> {
    Index(usize),
    Word(&'a str),
}

impl From<usize> for VocabId<'_> {
    fn from(index: usize) -> Self {
        VocabId::Index(index)
    }
}

impl<'a> From<&'a str> for VocabId<'a> {
    fn from(word: &'a str) -> Self {
        VocabId::Word(word)
    }
}

/// Returns false only when every component is exactly zero.
///
/// All-zero rows mark words that have no pretrained representation.
#[inline]
pub fn is_pretrained(vector: &[f32]) -> bool {
    vector.iter().any(|&x| x != 0.0)
}

/// Read-only vector space
///
/// Rows are stored contiguously (N x D, row-major). L2 norms are computed
/// once at construction so cosine queries only pay for the dot product.
#[derive(Debug)]
pub struct VectorStore {
    words: Vec<String>,
    index: HashMap<String, usize>,
    data: Vec<f32>,
    norms: Vec<f32>,
    dimension: usize,
}

impl VectorStore {
    /// Build from a word list and one vector per word
    pub fn from_rows(words: Vec<String>, rows: Vec<Vec<f32>>) -> Result<Self> {
        let dimension = rows.first().map(Vec::len).unwrap_or(0);
        let mut data = Vec::with_capacity(rows.len() * dimension);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != dimension {
                return Err(Error::InvalidVectorSpace(format!(
                    "row {} has dimension {}, expected {}",
                    i,
                    row.len(),
                    dimension
                )));
            }
            data.extend_from_slice(row);
        }
        Self::from_flat(words, data, dimension)
    }

    /// Build from a flat row-major buffer of `words.len() * dimension` values
    pub fn from_flat(words: Vec<String>, data: Vec<f32>, dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(Error::InvalidVectorSpace(
                "embedding dimension must be positive".to_string(),
            ));
        }
        if data.len() != words.len() * dimension {
            return Err(Error::InvalidVectorSpace(format!(
                "{} words but {} values for dimension {}",
                words.len(),
                data.len(),
                dimension
            )));
        }

        let mut index = HashMap::with_capacity(words.len());
        for (i, word) in words.iter().enumerate() {
            if index.insert(word.clone(), i).is_some() {
                return Err(Error::InvalidVectorSpace(format!(
                    "duplicate word '{}'",
                    word
                )));
            }
        }

        let norms = data
            .chunks_exact(dimension)
            .map(|row| row.iter().map(|x| x * x).sum::<f32>().sqrt())
            .collect();

        Ok(Self {
            words,
            index,
            data,
            norms,
            dimension,
        })
    }

    /// Number of vocabulary entries (N)
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Embedding dimension (D)
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn contains(&self, word: &str) -> bool {
        self.index.contains_key(word)
    }

    /// Look up a vector by index or word
    pub fn vector_of<'a>(&self, id: impl Into<VocabId<'a>>) -> Result<&[f32]> {
        let index = match id.into() {
            VocabId::Index(index) => index,
            VocabId::Word(word) => self.index_of(word)?,
        };
        self.checked_row(index)
    }

    pub fn index_of(&self, word: &str) -> Result<usize> {
        self.index
            .get(word)
            .copied()
            .ok_or_else(|| Error::not_found(format!("word '{}' is not in the vocabulary", word)))
    }

    pub fn word_of(&self, index: usize) -> Result<&str> {
        self.words
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| self.out_of_range(index))
    }

    /// Row `index` without bounds reporting; callers iterate `0..len()`
    #[inline]
    pub(crate) fn row(&self, index: usize) -> &[f32] {
        let start = index * self.dimension;
        &self.data[start..start + self.dimension]
    }

    #[inline]
    pub(crate) fn norm(&self, index: usize) -> f32 {
        self.norms[index]
    }

    /// Iterate over all rows in index order
    pub fn rows(&self) -> impl ExactSizeIterator<Item = &[f32]> + '_ {
        self.data.chunks_exact(self.dimension)
    }

    /// Vocabulary in index order
    pub fn words(&self) -> &[String] {
        &self.words
    }

    fn checked_row(&self, index: usize) -> Result<&[f32]> {
        if index >= self.len() {
            return Err(self.out_of_range(index));
        }
        Ok(self.row(index))
    }

    fn out_of_range(&self, index: usize) -> Error {
        Error::not_found(format!(
            "index {} is out of range for vocabulary of size {}",
            index,
            self.len()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn animals() -> VectorStore {
        VectorStore::from_rows(
            vec!["cat".into(), "dog".into(), "car".into(), "unk".into()],
            vec![
                vec![1.0, 0.0],
                vec![0.9, 0.1],
                vec![0.0, 1.0],
                vec![0.0, 0.0],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_word_and_index_lookups_agree() {
        let store = animals();
        for word in store.words() {
            let index = store.index_of(word).unwrap();
            assert_eq!(store.word_of(index).unwrap(), word);
            assert_eq!(
                store.vector_of(word.as_str()).unwrap(),
                store.vector_of(index).unwrap()
            );
        }
    }

    #[test]
    fn test_missing_entries() {
        let store = animals();
        assert!(matches!(store.index_of("bird"), Err(Error::NotFound(_))));
        assert!(matches!(store.word_of(4), Err(Error::NotFound(_))));
        assert!(matches!(store.vector_of(17usize), Err(Error::NotFound(_))));
        assert!(matches!(store.vector_of("bird"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_is_pretrained() {
        let store = animals();
        assert!(is_pretrained(store.vector_of("cat").unwrap()));
        assert!(!is_pretrained(store.vector_of("unk").unwrap()));
        assert!(is_pretrained(&[0.0, 1e-30]));
        assert!(!is_pretrained(&[-0.0, 0.0]));
    }

    #[test]
    fn test_norms_precomputed() {
        let store = VectorStore::from_rows(vec!["a".into()], vec![vec![3.0, 4.0]]).unwrap();
        assert!((store.norm(0) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_invalid_spaces() {
        let ragged = VectorStore::from_rows(
            vec!["a".into(), "b".into()],
            vec![vec![1.0, 0.0], vec![1.0]],
        );
        assert!(matches!(ragged, Err(Error::InvalidVectorSpace(_))));

        let duplicate = VectorStore::from_rows(
            vec!["a".into(), "a".into()],
            vec![vec![1.0], vec![2.0]],
        );
        assert!(matches!(duplicate, Err(Error::InvalidVectorSpace(_))));

        let short = VectorStore::from_flat(vec!["a".into(), "b".into()], vec![1.0, 2.0, 3.0], 2);
        assert!(matches!(short, Err(Error::InvalidVectorSpace(_))));

        let empty = VectorStore::from_rows(vec![], vec![]);
        assert!(matches!(empty, Err(Error::InvalidVectorSpace(_))));
    }
}
