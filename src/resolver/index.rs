//! Canonical-title index and the Entity Resolver.

use crate::query::normalize::{fold, words};
use crate::resolver::similarity::{SimilarityScorer, WeightedRatio};
use crate::storage::columnar::GamesTable;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::{debug, info};

/// Minimum score for a canonical match
pub const DEFAULT_TITLE_THRESHOLD: f64 = 90.0;
pub const DEFAULT_SUGGESTION_LIMIT: usize = 5;

const ROMAN_NUMERALS: &[(&str, &str)] = &[
    ("i", "1"),
    ("ii", "2"),
    ("iii", "3"),
    ("iv", "4"),
    ("v", "5"),
    ("vi", "6"),
    ("vii", "7"),
    ("viii", "8"),
    ("ix", "9"),
    ("x", "10"),
];

/// Series abbreviations expanded before matching
const SERIES_SYNONYMS: &[(&str, &str)] = &[
    ("gta", "grand theft auto"),
    ("cod", "call of duty"),
    ("mk", "mortal kombat"),
    ("smb", "super mario bros"),
    ("ff", "final fantasy"),
    ("nfs", "need for speed"),
    ("re4", "resident evil 4"),
    ("re", "resident evil"),
    ("rdr2", "red dead redemption 2"),
    ("rdr", "red dead redemption"),
    ("bof", "breath of fire"),
];

/// Lower-case, strip accents and punctuation, expand synonyms and roman numerals
pub fn normalize_title(text: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    let tokens = words(&fold(text));
    for token in &tokens {
        if let Some((_, expansion)) = SERIES_SYNONYMS.iter().find(|(abbr, _)| abbr == token) {
            parts.extend(expansion.split(' '));
        } else if let Some((_, arabic)) = ROMAN_NUMERALS.iter().find(|(roman, _)| roman == token) {
            parts.push(*arabic);
        } else {
            parts.push(token.as_str());
        }
    }
    parts.join(" ")
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub title: String,
    pub score: f64,
}

/// Outcome of resolving a title fragment
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolutionResult {
    /// Set only when the best score reaches the threshold
    pub canonical_title: Option<String>,
    /// Best score, 0-100
    pub confidence: f64,
    /// Up to five candidates, best first
    pub suggestions: Vec<Suggestion>,
}

impl ResolutionResult {
    pub fn is_resolved(&self) -> bool {
        self.canonical_title.is_some()
    }

    pub fn suggestion_titles(&self) -> Vec<String> {
        self.suggestions.iter().map(|s| s.title.clone()).collect()
    }
}

#[derive(Clone, Debug)]
struct IndexedTitle {
    canonical: String,
    normalized: String,
}

/// Normalized index of distinct titles. Titles that normalize identically keep the first spelling.
#[derive(Clone, Debug, Default)]
pub struct TitleIndex {
    entries: Vec<IndexedTitle>,
}

impl TitleIndex {
    pub fn build<I, S>(titles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let entries = titles
            .into_iter()
            .filter_map(|title| {
                let canonical = title.as_ref().trim().to_string();
                let normalized = normalize_title(&canonical);
                if normalized.is_empty() || !seen.insert(normalized.clone()) {
                    return None;
                }
                Some(IndexedTitle { canonical, normalized })
            })
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Score every entry and keep the best `limit`, ties in index order
    pub fn top_matches(&self, query: &str, scorer: &dyn SimilarityScorer, limit: usize) -> Vec<Suggestion> {
        let normalized = normalize_title(query);
        if normalized.is_empty() {
            return Vec::new();
        }
        let mut scored: Vec<(usize, f64)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (i, scorer.score(&normalized, &entry.normalized)))
            .filter(|(_, score)| *score > 0.0)
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored
            .into_iter()
            .take(limit)
            .map(|(i, score)| Suggestion {
                title: self.entries[i].canonical.clone(),
                score,
            })
            .collect()
    }
}

/// Entity Resolver over the shared dataset snapshot.
/// The title index is built at most once, by `warm` at startup or by the first resolution.
pub struct EntityResolver {
    table: Arc<GamesTable>,
    index: OnceLock<TitleIndex>,
    builds: AtomicUsize,
    scorer: Arc<dyn SimilarityScorer>,
    threshold: f64,
    limit: usize,
}

impl EntityResolver {
    pub fn new(table: Arc<GamesTable>) -> Self {
        Self {
            table,
            index: OnceLock::new(),
            builds: AtomicUsize::new(0),
            scorer: Arc::new(WeightedRatio),
            threshold: DEFAULT_TITLE_THRESHOLD,
            limit: DEFAULT_SUGGESTION_LIMIT,
        }
    }

    pub fn with_scorer(mut self, scorer: Arc<dyn SimilarityScorer>) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.max(1);
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Build the index now; returns the number of indexed titles
    pub fn warm(&self) -> usize {
        self.index().len()
    }

    /// How many times the index was built (0 or 1)
    pub fn index_builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    pub fn index(&self) -> &TitleIndex {
        self.index.get_or_init(|| {
            self.builds.fetch_add(1, Ordering::SeqCst);
            let index = TitleIndex::build(self.table.distinct_titles());
            info!(titles = index.len(), "built canonical title index");
            index
        })
    }

    pub fn resolve(&self, text: &str) -> ResolutionResult {
        let suggestions = self.index().top_matches(text, self.scorer.as_ref(), self.limit);
        let Some(best) = suggestions.first() else {
            return ResolutionResult::default();
        };
        let confidence = best.score;
        let canonical_title = (confidence >= self.threshold).then(|| best.title.clone());
        debug!(fragment = text, ?canonical_title, confidence, "resolved title fragment");
        ResolutionResult {
            canonical_title,
            confidence,
            suggestions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::columnar::GameRecord;
    use std::collections::HashMap;

    fn table(titles: &[&str]) -> Arc<GamesTable> {
        let records: Vec<GameRecord> = titles.iter().map(|t| GameRecord::new(*t, "PS3", Some(2010))).collect();
        Arc::new(GamesTable::from_records(&records))
    }

    struct FixedScorer(HashMap<&'static str, f64>);

    impl SimilarityScorer for FixedScorer {
        fn score(&self, _query: &str, choice: &str) -> f64 {
            self.0.get(choice).copied().unwrap_or(0.0)
        }
    }

    #[test]
    fn test_normalize_expands_synonyms_and_numerals() {
        assert_eq!(normalize_title("GTA V"), "grand theft auto 5");
        assert_eq!(normalize_title("Final Fantasy VII"), "final fantasy 7");
        assert_eq!(normalize_title("Pokémon: Red/Blue"), "pokemon red blue");
        assert_eq!(normalize_title("RE4"), "resident evil 4");
    }

    #[test]
    fn test_resolves_abbreviation_to_canonical() {
        let resolver = EntityResolver::new(table(&["Grand Theft Auto V", "Grand Theft Auto IV", "Wii Sports"]));
        let result = resolver.resolve("gta 5");
        assert_eq!(result.canonical_title.as_deref(), Some("Grand Theft Auto V"));
        assert_eq!(result.confidence, 100.0);
        assert_eq!(result.suggestions[1].title, "Grand Theft Auto IV");
    }

    #[test]
    fn test_threshold_accepts_95_rejects_80() {
        let titles = ["Alpha Quest", "Beta Quest"];
        let scorer = FixedScorer(HashMap::from([("alpha quest", 95.0), ("beta quest", 70.0)]));
        let resolver = EntityResolver::new(table(&titles)).with_scorer(Arc::new(scorer));
        let result = resolver.resolve("alpha");
        assert_eq!(result.canonical_title.as_deref(), Some("Alpha Quest"));
        assert_eq!(result.suggestions.len(), 2);

        let scorer = FixedScorer(HashMap::from([("alpha quest", 80.0), ("beta quest", 70.0)]));
        let resolver = EntityResolver::new(table(&titles)).with_scorer(Arc::new(scorer));
        let result = resolver.resolve("alpha");
        assert_eq!(result.canonical_title, None);
        assert_eq!(result.confidence, 80.0);
        assert_eq!(result.suggestion_titles(), vec!["Alpha Quest", "Beta Quest"]);
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let resolver = EntityResolver::new(table(&["Super Mario Bros.", "Super Mario World", "Mario Kart Wii"]));
        let first = resolver.resolve("smb");
        let canonical = first.canonical_title.clone().unwrap();
        let second = resolver.resolve(&canonical);
        assert_eq!(second.canonical_title.as_deref(), Some(canonical.as_str()));
        assert_eq!(second.confidence, 100.0);
    }

    #[test]
    fn test_index_dedupes_case_variants() {
        let index = TitleIndex::build(["FIFA 14", "Fifa 14", "FIFA 15"]);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_empty_fragment_has_no_suggestions() {
        let resolver = EntityResolver::new(table(&["Wii Sports"]));
        let result = resolver.resolve("?!");
        assert!(!result.is_resolved());
        assert!(result.suggestions.is_empty());
    }

    #[test]
    fn test_index_is_built_once_under_concurrency() {
        let resolver = Arc::new(EntityResolver::new(table(&["Wii Sports", "Mario Kart Wii"])));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let resolver = Arc::clone(&resolver);
                std::thread::spawn(move || resolver.resolve("wii sports").canonical_title)
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap().as_deref(), Some("Wii Sports"));
        }
        assert_eq!(resolver.index_builds(), 1);
    }
}
