/// Integration tests for the Entity Resolver over the fixture dataset
///
/// Run with: cargo test --test resolver_test

mod common;

use game_sales_nlq::resolver::{normalize_title, EntityResolver, SimilarityScorer};
use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

fn resolver() -> EntityResolver {
    EntityResolver::new(common::table())
}

fn fixture_titles() -> Vec<String> {
    let mut titles: Vec<String> = common::records().into_iter().map(|r| r.name).collect();
    titles.dedup();
    titles
}

/// Scores by normalized title; unknown titles score zero
struct TableScorer(HashMap<String, f64>);

impl TableScorer {
    fn new(scores: &[(&str, f64)]) -> Arc<Self> {
        Arc::new(Self(scores.iter().map(|(t, s)| (normalize_title(t), *s)).collect()))
    }
}

impl SimilarityScorer for TableScorer {
    fn score(&self, _query: &str, choice: &str) -> f64 {
        self.0.get(choice).copied().unwrap_or(0.0)
    }
}

#[test]
fn test_high_confidence_match_is_canonical() {
    let scorer = TableScorer::new(&[("Mario Kart Wii", 95.0), ("Wii Sports", 70.0)]);
    let result = resolver().with_scorer(scorer).resolve("mario kart");
    assert_eq!(result.canonical_title.as_deref(), Some("Mario Kart Wii"));
    assert_eq!(result.confidence, 95.0);
    assert_eq!(result.suggestion_titles(), vec!["Mario Kart Wii", "Wii Sports"]);
}

#[test]
fn test_below_threshold_returns_ranked_suggestions() {
    let scorer = TableScorer::new(&[("Mario Kart Wii", 80.0), ("Wii Sports", 70.0)]);
    let result = resolver().with_scorer(scorer).resolve("mario kart");
    assert_eq!(result.canonical_title, None);
    assert_eq!(result.confidence, 80.0);
    assert_eq!(result.suggestion_titles(), vec!["Mario Kart Wii", "Wii Sports"]);
}

#[test]
fn test_threshold_is_configurable() {
    let scorer = TableScorer::new(&[("Mario Kart Wii", 80.0)]);
    let result = resolver().with_scorer(scorer).with_threshold(75.0).resolve("mario kart");
    assert_eq!(result.canonical_title.as_deref(), Some("Mario Kart Wii"));
}

#[test]
fn test_suggestions_are_bounded_and_sorted() {
    let result = resolver().resolve("legend of zelda");
    assert!(result.suggestions.len() <= 5);
    for pair in result.suggestions.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
    assert!(result.suggestions[0].title.contains("Zelda"));
}

#[test]
fn test_roman_numerals_and_abbreviations() {
    let resolver = resolver();
    assert_eq!(resolver.resolve("GTA 5").canonical_title.as_deref(), Some("Grand Theft Auto V"));
    assert_eq!(
        resolver.resolve("zelda 2 the adventure of link").canonical_title.as_deref(),
        Some("Zelda II: The Adventure of Link")
    );
}

#[test]
fn test_index_builds_once_across_threads() {
    let resolver = Arc::new(resolver());
    let handles: Vec<_> = fixture_titles()
        .into_iter()
        .map(|title| {
            let resolver = Arc::clone(&resolver);
            std::thread::spawn(move || resolver.resolve(&title).is_resolved())
        })
        .collect();
    for handle in handles {
        assert!(handle.join().unwrap());
    }
    assert_eq!(resolver.index_builds(), 1);
}

#[test]
fn test_engine_warms_index_at_startup() {
    let engine = common::engine();
    assert_eq!(engine.resolver().index_builds(), 1);
    engine.answer("Em que ano foi lançado Tetris?");
    assert_eq!(engine.resolver().index_builds(), 1);
}

proptest! {
    #[test]
    fn prop_resolution_is_idempotent(title in prop::sample::select(fixture_titles())) {
        let resolver = resolver();
        let first = resolver.resolve(&title);
        let canonical = first.canonical_title.clone();
        prop_assert_eq!(canonical.as_deref(), Some(title.as_str()));

        let second = resolver.resolve(&title);
        prop_assert_eq!(second.canonical_title, canonical);
        prop_assert_eq!(second.confidence, 100.0);
    }
}
