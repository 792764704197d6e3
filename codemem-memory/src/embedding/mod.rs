//! Embedding module for similarity search
//!
//! Uses feature hashing, so no model files are needed at runtime.

mod engine;

pub use engine::{cosine_similarity, VectorEngine, DEFAULT_DIMENSION};
