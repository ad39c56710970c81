// src/index/mod.rs — Semantic index over channel messages

pub mod bootstrap;
pub mod ranker;
pub mod similarity;
pub mod store;

pub use ranker::{MatchResult, SimilarityRanker, DEFAULT_THRESHOLD};
pub use store::{IndexedMessage, VectorIndex};
