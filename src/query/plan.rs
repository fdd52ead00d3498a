//! Query Plan DSL
//!
//! The structured, intent-tagged form of a question. Produced by the classifier
//! (or proposed by the oracle), checked by `validate`, and compiled to SQL.

use crate::error::{NlqError, NlqResult};
use crate::storage::columnar::GameColumn;
use serde::{Deserialize, Serialize};

pub const DEFAULT_TOP_N: u32 = 10;
pub const MAX_TOP_N: u32 = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Ranking,
    FranchiseAverage,
    TitleLookup,
    Aggregate,
    TotalFranchiseSales,
    Summary,
    OutOfScope,
    NotFound,
}

impl Intent {
    pub fn as_str(self) -> &'static str {
        match self {
            Intent::Ranking => "ranking",
            Intent::FranchiseAverage => "franchise_average",
            Intent::TitleLookup => "title_lookup",
            Intent::Aggregate => "aggregate",
            Intent::TotalFranchiseSales => "total_franchise_sales",
            Intent::Summary => "summary",
            Intent::OutOfScope => "out_of_scope",
            Intent::NotFound => "not_found",
        }
    }

    /// Intents that never reach the compiler
    pub fn is_terminal(self) -> bool {
        matches!(self, Intent::OutOfScope | Intent::NotFound)
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The quantity a plan ranks or aggregates
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    #[default]
    GlobalSales,
    NaSales,
    EuSales,
    JpSales,
    OtherSales,
    CriticScore,
    UserScore,
    Combo,
}

impl Metric {
    /// Backing column; `Combo` is derived from both score columns
    pub fn column(self) -> Option<GameColumn> {
        match self {
            Metric::GlobalSales => Some(GameColumn::GlobalSales),
            Metric::NaSales => Some(GameColumn::NaSales),
            Metric::EuSales => Some(GameColumn::EuSales),
            Metric::JpSales => Some(GameColumn::JpSales),
            Metric::OtherSales => Some(GameColumn::OtherSales),
            Metric::CriticScore => Some(GameColumn::CriticScore),
            Metric::UserScore => Some(GameColumn::UserScore),
            Metric::Combo => None,
        }
    }

    /// Label used as the metric column alias and in the response
    pub fn label(self) -> &'static str {
        match self.column() {
            Some(column) => column.name(),
            None => "Combo_Score",
        }
    }

    pub fn is_sales(self) -> bool {
        self.column().map(GameColumn::is_sales).unwrap_or(false)
    }

    pub fn is_score(self) -> bool {
        !self.is_sales()
    }

    /// Human name used in rendered answers
    pub fn display_name(self, language: Language) -> &'static str {
        match (self, language) {
            (Metric::GlobalSales, Language::Pt) => "vendas globais",
            (Metric::NaSales, Language::Pt) => "vendas na América do Norte",
            (Metric::EuSales, Language::Pt) => "vendas na Europa",
            (Metric::JpSales, Language::Pt) => "vendas no Japão",
            (Metric::OtherSales, Language::Pt) => "vendas em outras regiões",
            (Metric::CriticScore, Language::Pt) => "nota da crítica",
            (Metric::UserScore, Language::Pt) => "nota dos usuários",
            (Metric::Combo, Language::Pt) => "nota combinada",
            (Metric::GlobalSales, Language::En) => "global sales",
            (Metric::NaSales, Language::En) => "North America sales",
            (Metric::EuSales, Language::En) => "Europe sales",
            (Metric::JpSales, Language::En) => "Japan sales",
            (Metric::OtherSales, Language::En) => "other regions sales",
            (Metric::CriticScore, Language::En) => "critic score",
            (Metric::UserScore, Language::En) => "user score",
            (Metric::Combo, Language::En) => "combined score",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Pt,
    En,
}

impl Language {
    pub fn parse(code: &str) -> Option<Self> {
        match code.trim().to_lowercase().as_str() {
            "pt" | "pt-br" | "pt_br" | "portuguese" => Some(Language::Pt),
            "en" | "en-us" | "en_us" | "english" => Some(Language::En),
            _ => None,
        }
    }
}

/// Which fact a title lookup asks for
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupField {
    #[default]
    ReleaseYear,
    Platforms,
    Publisher,
    Developer,
    Genre,
    Sales,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateFunc {
    Count,
    Avg,
    Sum,
}

/// Where a plan came from
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanOrigin {
    #[default]
    Rules,
    /// No rule matched; the ranking default was used
    DefaultFallback,
    Oracle,
}

/// Optional equality predicates
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanFilters {
    pub platform: Option<String>,
    pub genre: Option<String>,
    pub publisher: Option<String>,
    pub developer: Option<String>,
}

impl PlanFilters {
    pub fn is_empty(&self) -> bool {
        self.platform.is_none() && self.genre.is_none() && self.publisher.is_none() && self.developer.is_none()
    }

    /// (column, value) pairs in a fixed order
    pub fn predicates(&self) -> Vec<(GameColumn, &str)> {
        [
            (GameColumn::Platform, &self.platform),
            (GameColumn::Genre, &self.genre),
            (GameColumn::Publisher, &self.publisher),
            (GameColumn::Developer, &self.developer),
        ]
        .into_iter()
        .filter_map(|(column, value)| value.as_deref().map(|v| (column, v)))
        .collect()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryPlan {
    pub intent: Intent,
    pub metric: Metric,
    pub top_n: u32,
    pub year: Option<i64>,
    pub year_from: Option<i64>,
    pub year_to: Option<i64>,
    pub filters: PlanFilters,
    pub entity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lookup: Option<LookupField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregate: Option<AggregateFunc>,
    pub language: Language,
    pub origin: PlanOrigin,
}

impl Default for QueryPlan {
    fn default() -> Self {
        Self::new(Intent::Ranking)
    }
}

impl QueryPlan {
    pub fn new(intent: Intent) -> Self {
        Self {
            intent,
            metric: Metric::GlobalSales,
            top_n: DEFAULT_TOP_N,
            year: None,
            year_from: None,
            year_to: None,
            filters: PlanFilters::default(),
            entity: None,
            lookup: None,
            aggregate: None,
            language: Language::Pt,
            origin: PlanOrigin::Rules,
        }
    }

    pub fn clamp_top_n(n: u32) -> u32 {
        n.clamp(1, MAX_TOP_N)
    }

    /// Inclusive year bounds, if any year constraint is set
    pub fn year_bounds(&self) -> Option<(i64, i64)> {
        match (self.year, self.year_from, self.year_to) {
            (Some(y), _, _) => Some((y, y)),
            (None, Some(from), Some(to)) => Some((from, to)),
            _ => None,
        }
    }

    /// Entity text, trimmed; None when blank
    pub fn entity_text(&self) -> Option<&str> {
        self.entity.as_deref().map(str::trim).filter(|e| !e.is_empty())
    }

    /// Check the DSL invariants
    pub fn validate(&self) -> NlqResult<()> {
        if self.year.is_some() && (self.year_from.is_some() || self.year_to.is_some()) {
            return Err(NlqError::invalid_plan("both a single year and a year range are set"));
        }
        if self.year_from.is_some() != self.year_to.is_some() {
            return Err(NlqError::invalid_plan("year range needs both year_from and year_to"));
        }
        if let (Some(from), Some(to)) = (self.year_from, self.year_to) {
            if from > to {
                return Err(NlqError::invalid_plan(format!("year_from {} is after year_to {}", from, to)));
            }
        }
        if self.top_n == 0 || self.top_n > MAX_TOP_N {
            return Err(NlqError::invalid_plan(format!("top_n {} outside [1, {}]", self.top_n, MAX_TOP_N)));
        }
        let needs_entity = matches!(
            self.intent,
            Intent::FranchiseAverage | Intent::TitleLookup | Intent::TotalFranchiseSales
        );
        if needs_entity && self.entity_text().is_none() {
            return Err(NlqError::invalid_plan(format!("{} plan has no entity", self.intent)));
        }
        if self.intent == Intent::Aggregate && self.aggregate.is_none() {
            return Err(NlqError::invalid_plan("aggregate plan has no aggregate function"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_and_range_are_exclusive() {
        let mut plan = QueryPlan::new(Intent::Ranking);
        plan.year = Some(2010);
        assert!(plan.validate().is_ok());
        plan.year_from = Some(2005);
        plan.year_to = Some(2008);
        assert!(plan.validate().is_err());
        plan.year = None;
        assert!(plan.validate().is_ok());
        assert_eq!(plan.year_bounds(), Some((2005, 2008)));
    }

    #[test]
    fn test_entity_required_for_title_intents() {
        let mut plan = QueryPlan::new(Intent::FranchiseAverage);
        assert!(plan.validate().is_err());
        plan.entity = Some("zelda".into());
        assert!(plan.validate().is_ok());
    }

    #[test]
    fn test_plan_deserializes_with_defaults() {
        let plan: QueryPlan = serde_json::from_str(r#"{"intent":"ranking","metric":"jp_sales","top_n":5}"#).unwrap();
        assert_eq!(plan.metric, Metric::JpSales);
        assert_eq!(plan.top_n, 5);
        assert!(plan.filters.is_empty());
        assert_eq!(plan.language, Language::Pt);
    }

    #[test]
    fn test_metric_labels() {
        assert_eq!(Metric::GlobalSales.label(), "Global_Sales");
        assert_eq!(Metric::Combo.label(), "Combo_Score");
        assert!(Metric::EuSales.is_sales());
        assert!(Metric::Combo.is_score());
    }
}
