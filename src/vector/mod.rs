//! Vector Module
//!
//! Embedding storage and distance computations.

mod similarity;
mod store;

pub use similarity::{
    cosine_distance, dot_product, euclidean_distance, magnitude, Measure, SimilarityEngine,
};
pub use store::{is_pretrained, VectorStore, VocabId};
