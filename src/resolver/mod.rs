//! Entity Resolver: fuzzy title matching against the canonical title set

pub mod index;
pub mod similarity;

pub use index::{normalize_title, EntityResolver, ResolutionResult, Suggestion, TitleIndex};
pub use similarity::{SimilarityScorer, WeightedRatio};
