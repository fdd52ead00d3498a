//! Intent Classifier - rule-based question to `QueryPlan`
//!
//! Decision order, first match wins:
//! 1. out-of-scope lexicon
//! 2. title lookup phrase with a captured title fragment
//! 3. average vocabulary with a franchise word or a known franchise
//! 4. total / count / summary vocabulary, only without explicit ranking words
//! 5. ranking vocabulary or sales words
//! 6. ranking default with no filters
//!
//! Metric, top-N, years and filters are detected in independent passes.
//! Classification never fails.

use crate::query::normalize::{fold, NormalizedText};
use crate::query::plan::*;
use crate::query::vocabulary::*;
use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

fn year_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(19[7-9]\d|20\d{2}|21\d{2})\b").expect("static regex"))
}

fn top_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\btop\s*(\d{1,3})\b").expect("static regex"))
}

fn count_best_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(\d{1,3})\s+(?:melhores|maiores|best|mais vendidos|mais vendidas|jogos mais|games)\b")
            .expect("static regex")
    })
}

fn range_connective_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(?:-|–|a|ate|to|e|and|until|till|through)\s*$").expect("static regex"))
}

fn explicit_filter_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"\b(publisher|publicadora|editora|developer|desenvolvedora|desenvolvedor|estudio|studio|platform|plataforma|genre|genero)\s*[:=]\s*([^,;?!]+)",
        )
        .expect("static regex")
    })
}

fn quoted_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"["“”']([^"“”']{2,})["“”']"#).expect("static regex"))
}

/// Intent Classifier
#[derive(Clone, Debug, Default)]
pub struct IntentClassifier {
    default_language: Language,
}

impl IntentClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_language(language: Language) -> Self {
        Self {
            default_language: language,
        }
    }

    /// Classify a raw question into a plan
    pub fn classify(&self, question: &str) -> QueryPlan {
        let text = NormalizedText::new(question);
        let plan = self.classify_normalized(question, &text);
        debug!(
            intent = %plan.intent,
            metric = plan.metric.label(),
            top_n = plan.top_n,
            year = ?plan.year,
            entity = ?plan.entity,
            "classified question"
        );
        plan
    }

    fn classify_normalized(&self, raw: &str, text: &NormalizedText) -> QueryPlan {
        let language = self.detect_language(raw, text);
        let mut plan = QueryPlan::new(Intent::Ranking);
        plan.language = language;

        // 1. out of scope short-circuits everything
        if text.has_any(OUT_OF_SCOPE) {
            let mut oos = QueryPlan::new(Intent::OutOfScope);
            oos.language = language;
            return oos;
        }

        plan.metric = detect_metric(text);
        plan.top_n = extract_top_n(&text.folded);
        let (year, year_from, year_to) = extract_years(&text.folded);
        plan.year = year;
        plan.year_from = year_from;
        plan.year_to = year_to;
        plan.filters = extract_filters(text);

        // 2. title lookup
        if let Some((field, fragment)) = detect_title_lookup(raw, text) {
            plan.intent = Intent::TitleLookup;
            plan.lookup = Some(field);
            plan.entity = Some(fragment);
            if field == LookupField::Sales && plan.metric.is_score() {
                plan.metric = Metric::GlobalSales;
            }
            return plan;
        }

        let has_average = text.has_any(AVERAGE_WORDS);
        let franchise = capture_franchise(text);

        // 3. franchise average
        if has_average && franchise.is_some() {
            plan.intent = Intent::FranchiseAverage;
            plan.entity = franchise;
            return plan;
        }

        let ranking_cue = text.has_any(RANKING_WORDS);
        let has_sales = text.has_any(SALES_WORDS);
        let has_total = text.has_any(TOTAL_WORDS);

        // 4. totals, counts and summaries yield to explicit ranking words
        if !ranking_cue {
            if has_total && has_sales && franchise.is_some() {
                plan.intent = Intent::TotalFranchiseSales;
                plan.entity = franchise;
                if plan.metric.is_score() {
                    plan.metric = Metric::GlobalSales;
                }
                return plan;
            }
            if text.has_any(COUNT_WORDS) {
                plan.intent = Intent::Aggregate;
                plan.aggregate = Some(AggregateFunc::Count);
                plan.entity = franchise;
                return plan;
            }
            if has_average && (plan.metric.is_score() || text.has_any(SCORE_WORDS)) {
                plan.intent = Intent::Aggregate;
                plan.aggregate = Some(AggregateFunc::Avg);
                if plan.metric.is_sales() {
                    plan.metric = Metric::UserScore;
                }
                return plan;
            }
            if has_total && has_sales {
                plan.intent = Intent::Aggregate;
                plan.aggregate = Some(AggregateFunc::Sum);
                if plan.metric.is_score() {
                    plan.metric = Metric::GlobalSales;
                }
                return plan;
            }
            if text.has_any(SUMMARY_WORDS) {
                plan.intent = Intent::Summary;
                return plan;
            }
        }

        // 5. ranking
        if ranking_cue || has_sales {
            plan.entity = franchise;
            return plan;
        }

        // 6. default: ranking with no filters
        plan.filters = PlanFilters::default();
        plan.origin = PlanOrigin::DefaultFallback;
        plan
    }

    /// Portuguese is primary; English wins only with more English markers
    pub fn detect_language(&self, raw: &str, text: &NormalizedText) -> Language {
        let count = |markers: &[&str]| text.tokens.iter().filter(|t| markers.contains(&t.as_str())).count();
        let mut pt = count(PT_MARKERS);
        let en = count(EN_MARKERS);
        if NormalizedText::had_accents(raw) {
            pt += 2;
        }
        if en > pt {
            Language::En
        } else if pt > en {
            Language::Pt
        } else {
            self.default_language
        }
    }
}

/// Region beats score, score beats the global default
pub fn detect_metric(text: &NormalizedText) -> Metric {
    if text.has_any(REGION_JP) {
        return Metric::JpSales;
    }
    if text.has_any(REGION_EU) || mentions_eu_region(text) {
        return Metric::EuSales;
    }
    if text.has_any(REGION_NA) {
        return Metric::NaSales;
    }
    if text.has_any(REGION_OTHER) {
        return Metric::OtherSales;
    }
    if text.has_any(COMBO_WORDS) {
        return Metric::Combo;
    }
    if text.has_any(CRITIC_WORDS) {
        return Metric::CriticScore;
    }
    if text.has_any(USER_WORDS) {
        return Metric::UserScore;
    }
    Metric::GlobalSales
}

// Bare "eu" is also the Portuguese pronoun; count it as a region only after a preposition.
fn mentions_eu_region(text: &NormalizedText) -> bool {
    text.tokens.windows(2).any(|w| {
        w[1] == "eu" && matches!(w[0].as_str(), "na" | "no" | "da" | "do" | "in" | "the" | "em")
    })
}

/// `top N` or `N melhores`, default 10, clamped to [1, 100]
pub fn extract_top_n(folded: &str) -> u32 {
    let captured = top_regex()
        .captures(folded)
        .or_else(|| count_best_regex().captures(folded))
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok());
    match captured {
        Some(n) => QueryPlan::clamp_top_n(n),
        None => DEFAULT_TOP_N,
    }
}

/// Single year, or a range when two years are joined by a range connective
pub fn extract_years(folded: &str) -> (Option<i64>, Option<i64>, Option<i64>) {
    let matches: Vec<_> = year_regex().find_iter(folded).collect();
    let parse = |m: &regex::Match| m.as_str().parse::<i64>().ok();
    match matches.as_slice() {
        [] => (None, None, None),
        [only] => (parse(only), None, None),
        [first, second, ..] => {
            let between = &folded[first.end()..second.start()];
            match (parse(first), parse(second)) {
                (Some(a), Some(b)) if range_connective_regex().is_match(between) => {
                    (None, Some(a.min(b)), Some(a.max(b)))
                }
                (a, _) => (a, None, None),
            }
        }
    }
}

/// Platform, genre, publisher and developer predicates
pub fn extract_filters(text: &NormalizedText) -> PlanFilters {
    let mut filters = PlanFilters::default();

    let platform = PLATFORMS
        .iter()
        .find_map(|(term, code)| text.find_term(term).map(|span| (span, *code)));
    if let Some((_, code)) = platform {
        filters.platform = Some(code.to_string());
    }

    filters.genre = GENRES
        .iter()
        .find(|(term, _)| text.has_term(term))
        .map(|(_, genre)| genre.to_string());

    // "nintendo ds" names a platform, not the publisher
    filters.publisher = PUBLISHERS
        .iter()
        .find_map(|(term, name)| {
            let span = text.find_term(term)?;
            let overlaps = platform
                .map(|((start, end), _)| span.0 < end && start < span.1)
                .unwrap_or(false);
            (!overlaps).then(|| name.to_string())
        });

    for caps in explicit_filter_regex().captures_iter(&text.folded) {
        let (Some(key), Some(value)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        let value = value.as_str().trim().to_string();
        if value.is_empty() {
            continue;
        }
        match key.as_str() {
            "publisher" | "publicadora" | "editora" => filters.publisher = Some(value),
            "developer" | "desenvolvedora" | "desenvolvedor" | "estudio" | "studio" => filters.developer = Some(value),
            "platform" | "plataforma" => filters.platform = Some(value),
            _ => filters.genre = Some(value),
        }
    }
    filters
}

/// Known franchise token, else the words right after (or before) a franchise word
pub fn capture_franchise(text: &NormalizedText) -> Option<String> {
    if let Some((_, fragment)) = KNOWN_FRANCHISES.iter().find(|(term, _)| text.has_term(term)) {
        return Some(fragment.to_string());
    }
    let (start, end) = FRANCHISE_WORDS.iter().find_map(|w| text.find_term(w))?;

    let after: Vec<&str> = text.tokens[end..]
        .iter()
        .map(String::as_str)
        .take_while(|t| !FRANCHISE_STOPWORDS.contains(t))
        .take(3)
        .collect();
    if !after.is_empty() {
        return Some(after.join(" "));
    }

    let mut before: Vec<&str> = text.tokens[..start]
        .iter()
        .rev()
        .map(String::as_str)
        .take_while(|t| !FRANCHISE_STOPWORDS.contains(t) && !RANKING_WORDS.contains(t))
        .take(3)
        .collect();
    before.reverse();
    (!before.is_empty()).then(|| before.join(" "))
}

/// Lookup field plus the title fragment the question refers to
pub fn detect_title_lookup(raw: &str, text: &NormalizedText) -> Option<(LookupField, String)> {
    let hits: Vec<((usize, usize), LookupField)> = LOOKUP_LEADS
        .iter()
        .filter_map(|(term, field)| text.rfind_term(term).map(|span| (span, *field)))
        .collect();
    if hits.is_empty() {
        return None;
    }
    let field = hits
        .iter()
        .min_by_key(|((start, _), _)| *start)
        .map(|(_, f)| *f)
        .unwrap_or_default();

    if let Some(quoted) = quoted_regex().captures(raw).and_then(|c| c.get(1)) {
        let fragment = fold(quoted.as_str().trim());
        if !fragment.is_empty() {
            return Some((field, fragment));
        }
    }

    let last_end = hits.iter().map(|((_, end), _)| *end).max().unwrap_or(0);
    let first_start = hits.iter().map(|((start, _), _)| *start).min().unwrap_or(0);
    let after = trim_fragment(&text.tokens[last_end..]);
    let fragment = if after.is_empty() {
        trim_fragment(&text.tokens[..first_start])
    } else {
        after
    };
    is_title_fragment(&fragment).then_some((field, fragment))
}

/// A fragment names a title only if something besides years and noise words is left,
/// so "lançamento em 2010" stays a year filter
fn is_title_fragment(fragment: &str) -> bool {
    fragment.split_whitespace().any(|token| {
        !year_regex().is_match(token)
            && !FRAGMENT_LEADING_NOISE.contains(&token)
            && !FRAGMENT_TRAILING_NOISE.contains(&token)
    })
}

fn trim_fragment(tokens: &[String]) -> String {
    let mut start = 0;
    let mut end = tokens.len();
    while start < end && FRAGMENT_LEADING_NOISE.contains(&tokens[start].as_str()) {
        start += 1;
    }
    while end > start && FRAGMENT_TRAILING_NOISE.contains(&tokens[end - 1].as_str()) {
        end -= 1;
    }
    tokens[start..end].join(" ")
}
