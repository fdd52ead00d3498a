//! Plan Compiler
//!
//! Turns a validated `QueryPlan` into a single read-only SELECT over the games
//! table. Each intent has a primary generator and a fixed fallback template;
//! whatever is emitted must pass the Safety Validator first.

use crate::aggregation::{CRITIC_CONFIDENCE, USER_CONFIDENCE};
use crate::error::{NlqError, NlqResult};
use crate::query::normalize::{fold, words};
use crate::query::plan::{AggregateFunc, Intent, LookupField, Metric, QueryPlan};
use crate::query::plan_validator::{SafetyValidator, SafetyViolation};
use crate::query::shape::{output_columns, ExpectedShape, RankingShape};
use crate::storage::columnar::GameColumn;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const DEFAULT_TABLE: &str = "games";

const COMBO_ROW_EXPR: &str = "0.6 * COALESCE(Critic_Score, 0) + 0.4 * COALESCE(User_Score, 0) * 10";
const COMBO_PRESENCE: &str = "(Critic_Score IS NOT NULL OR User_Score IS NOT NULL)";

/// Which path produced the statement that will run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementOrigin {
    Compiled,
    Oracle,
    Fallback,
}

/// A statement that passed the Safety Validator
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SqlStatement {
    pub sql: String,
    pub intent: Intent,
    /// Name of the metric column in the result
    pub metric_label: String,
    pub origin: StatementOrigin,
}

/// Quote a string literal, doubling embedded quotes
pub fn quote_literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

/// LIKE pattern matching every word of `entity` in order, e.g. `'%legend%zelda%'`.
/// Words are folded to lower-case ASCII; wildcard characters never survive.
pub fn like_fragment(entity: &str) -> String {
    let tokens = words(&fold(entity));
    if tokens.is_empty() {
        return quote_literal("%");
    }
    quote_literal(&format!("%{}%", tokens.join("%")))
}

/// Confidence in a score by its vote count; a null count leaves the score unscaled
fn confidence_expr(count: GameColumn, (center, spread): (f64, f64)) -> String {
    format!(
        "COALESCE(1.0 / (1.0 + EXP(({:?} - {}) / {:?})), 1.0)",
        center,
        count.name(),
        spread
    )
}

/// Combo scaled by the mean confidence of both vote counts
fn weighted_combo_expr() -> String {
    format!(
        "({}) * (0.5 * {} + 0.5 * {})",
        COMBO_ROW_EXPR,
        confidence_expr(GameColumn::CriticCount, CRITIC_CONFIDENCE),
        confidence_expr(GameColumn::UserCount, USER_CONFIDENCE)
    )
}

/// Per-row expression of a metric
fn metric_row_expr(metric: Metric, confidence_weight: bool) -> String {
    match metric.column() {
        Some(column) if metric.is_sales() => format!("COALESCE({}, 0)", column.name()),
        Some(column) => column.name().to_string(),
        None if confidence_weight => weighted_combo_expr(),
        None => COMBO_ROW_EXPR.to_string(),
    }
}

/// Per-title aggregate of a metric: sales are summed, scores averaged
fn metric_aggregate_expr(metric: Metric, confidence_weight: bool) -> String {
    if metric.is_sales() {
        format!("SUM({})", metric_row_expr(metric, confidence_weight))
    } else {
        format!("AVG({})", metric_row_expr(metric, confidence_weight))
    }
}

/// Predicate keeping only rows where the metric is present
fn metric_presence(metric: Metric) -> Option<String> {
    match metric.column() {
        Some(_) if metric.is_sales() => None,
        Some(column) => Some(format!("{} IS NOT NULL", column.name())),
        None => Some(COMBO_PRESENCE.to_string()),
    }
}

fn lookup_label(field: LookupField, metric: Metric) -> &'static str {
    match field {
        LookupField::ReleaseYear => "year",
        LookupField::Platforms => GameColumn::Platform.name(),
        LookupField::Publisher => GameColumn::Publisher.name(),
        LookupField::Developer => GameColumn::Developer.name(),
        LookupField::Genre => GameColumn::Genre.name(),
        LookupField::Sales => sales_metric(metric).label(),
    }
}

fn sales_metric(metric: Metric) -> Metric {
    if metric.is_sales() {
        metric
    } else {
        Metric::GlobalSales
    }
}

/// Collects WHERE conjuncts in a stable order
#[derive(Default)]
struct WhereClause {
    predicates: Vec<String>,
}

impl WhereClause {
    fn push(&mut self, predicate: impl Into<String>) -> &mut Self {
        self.predicates.push(predicate.into());
        self
    }

    fn years(&mut self, plan: &QueryPlan) -> &mut Self {
        match (plan.year, plan.year_from, plan.year_to) {
            (Some(year), _, _) => self.push(format!("Year_of_Release = {}", year)),
            (None, Some(from), Some(to)) => self.push(format!("Year_of_Release BETWEEN {} AND {}", from, to)),
            _ => self,
        }
    }

    fn filters(&mut self, plan: &QueryPlan) -> &mut Self {
        for (column, value) in plan.filters.predicates() {
            self.predicates
                .push(format!("lower({}) = lower({})", column.name(), quote_literal(value)));
        }
        self
    }

    fn name_like(&mut self, entity: &str) -> &mut Self {
        self.push(format!("lower(Name) LIKE {}", like_fragment(entity)))
    }

    fn name_equals(&mut self, title: &str) -> &mut Self {
        self.push(format!("lower(Name) = lower({})", quote_literal(title)))
    }

    fn render(&self) -> String {
        if self.predicates.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.predicates.join(" AND "))
        }
    }
}

/// Compiler from plans to validated statements
#[derive(Clone, Debug)]
pub struct PlanCompiler {
    table: String,
    validator: SafetyValidator,
    /// Scale combo rankings by vote-count confidence
    confidence_weight: bool,
}

impl Default for PlanCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl PlanCompiler {
    pub fn new() -> Self {
        Self::with_table(DEFAULT_TABLE)
    }

    pub fn with_table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            validator: SafetyValidator::new(),
            confidence_weight: true,
        }
    }

    pub fn with_confidence_weight(mut self, enabled: bool) -> Self {
        self.confidence_weight = enabled;
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn validate(&self, sql: &str, intent: Intent) -> Result<(), SafetyViolation> {
        self.validator.validate(sql, intent)
    }

    /// Compile with the primary generator, falling back to the intent's template
    pub fn compile(&self, plan: &QueryPlan) -> NlqResult<SqlStatement> {
        let primary = self.generate(plan)?;
        self.compile_candidate(plan, primary, StatementOrigin::Compiled)
    }

    /// Validate a candidate statement (compiled or oracle-proposed). Oracle
    /// candidates must also have the compiled statement's result shape. On
    /// rejection the fallback template is tried; if that fails too nothing may run.
    pub fn compile_candidate(
        &self,
        plan: &QueryPlan,
        candidate: String,
        origin: StatementOrigin,
    ) -> NlqResult<SqlStatement> {
        let metric_label = self.metric_label(plan);
        let accepted = self
            .validator
            .validate(&candidate, plan.intent)
            .map_err(|violation| violation.to_string())
            .and_then(|()| match origin {
                StatementOrigin::Oracle => self.check_shape(plan, &candidate),
                StatementOrigin::Compiled | StatementOrigin::Fallback => Ok(()),
            });
        match accepted {
            Ok(()) => {
                debug!(intent = %plan.intent, ?origin, sql = %candidate, "statement accepted");
                return Ok(SqlStatement {
                    sql: candidate,
                    intent: plan.intent,
                    metric_label,
                    origin,
                });
            }
            Err(reason) => {
                warn!(intent = %plan.intent, ?origin, %reason, "statement rejected, using fallback template");
            }
        }

        let fallback = self.fallback_template(plan)?;
        match self.validator.validate(&fallback, plan.intent) {
            Ok(()) => Ok(SqlStatement {
                sql: fallback,
                intent: plan.intent,
                metric_label,
                origin: StatementOrigin::Fallback,
            }),
            Err(violation) => Err(NlqError::compile(
                format!("fallback template rejected: {}", violation),
                fallback,
            )),
        }
    }

    /// Result shape an oracle statement must have to stand in for the compiled one
    pub fn expected_shape(&self, plan: &QueryPlan) -> NlqResult<ExpectedShape> {
        let metric_label = self.metric_label(plan);
        if plan.intent != Intent::Ranking {
            let primary = self.generate(plan)?;
            let columns = output_columns(&primary).map_err(|e| NlqError::compile(e.to_string(), primary.clone()))?;
            return Ok(ExpectedShape { columns, ranking: None });
        }

        let mut metric_exprs = vec![metric_aggregate_expr(plan.metric, self.confidence_weight)];
        if let Some(column) = plan.metric.column() {
            let plain = if plan.metric.is_sales() { "SUM" } else { "AVG" };
            metric_exprs.push(format!("{}({})", plain, column.name()));
        }
        Ok(ExpectedShape {
            columns: vec![GameColumn::Name.name().to_string(), metric_label.clone()],
            ranking: Some(RankingShape {
                metric_label,
                metric_exprs,
                max_limit: QueryPlan::clamp_top_n(plan.top_n),
            }),
        })
    }

    fn check_shape(&self, plan: &QueryPlan, candidate: &str) -> Result<(), String> {
        let shape = self.expected_shape(plan).map_err(|e| e.to_string())?;
        shape.check(candidate).map_err(|mismatch| mismatch.to_string())
    }

    pub fn metric_label(&self, plan: &QueryPlan) -> String {
        match plan.intent {
            Intent::TitleLookup => lookup_label(plan.lookup.unwrap_or_default(), plan.metric).to_string(),
            Intent::FranchiseAverage => "Weighted_Score".to_string(),
            Intent::TotalFranchiseSales => Metric::GlobalSales.label().to_string(),
            Intent::Aggregate => match plan.aggregate {
                Some(AggregateFunc::Count) | None => "Games".to_string(),
                Some(AggregateFunc::Avg) => format!("avg_{}", plan.metric.label()),
                Some(AggregateFunc::Sum) => sales_metric(plan.metric).label().to_string(),
            },
            Intent::Summary => "Summary".to_string(),
            _ => plan.metric.label().to_string(),
        }
    }

    /// Primary generator
    pub fn generate(&self, plan: &QueryPlan) -> NlqResult<String> {
        plan.validate()?;
        let sql = match plan.intent {
            Intent::Ranking => self.ranking(plan, true),
            Intent::FranchiseAverage => self.franchise_average(plan, true),
            Intent::TitleLookup => self.title_lookup(plan),
            Intent::Aggregate => self.aggregate(plan, true),
            Intent::TotalFranchiseSales => self.total_franchise_sales(plan, true),
            Intent::Summary => self.summary(plan, true),
            Intent::OutOfScope | Intent::NotFound => {
                return Err(NlqError::invalid_plan(format!("{} plans are never compiled", plan.intent)));
            }
        };
        Ok(sql)
    }

    /// Fixed per-intent template: only year, metric, limit and entity are substituted
    pub fn fallback_template(&self, plan: &QueryPlan) -> NlqResult<String> {
        let sql = match plan.intent {
            Intent::Ranking => self.ranking(plan, false),
            Intent::FranchiseAverage => self.franchise_average(plan, false),
            Intent::TitleLookup => {
                let title = plan.entity_text().unwrap_or_default();
                let mut clause = WhereClause::default();
                clause.name_equals(title);
                format!(
                    "SELECT CAST(MIN(Year_of_Release) AS INTEGER) AS year FROM {}{}",
                    self.table,
                    clause.render()
                )
            }
            Intent::Aggregate => self.aggregate(plan, false),
            Intent::TotalFranchiseSales => self.total_franchise_sales(plan, false),
            Intent::Summary => self.summary(plan, false),
            Intent::OutOfScope | Intent::NotFound => {
                return Err(NlqError::invalid_plan(format!("{} plans are never compiled", plan.intent)));
            }
        };
        Ok(sql)
    }

    /// Top-N titles, one row per case-insensitive title with a dense ROW_NUMBER rank.
    /// Ties on the metric are broken by title, ascending.
    fn ranking(&self, plan: &QueryPlan, full: bool) -> String {
        let metric = plan.metric;
        let aggregate = metric_aggregate_expr(metric, self.confidence_weight);
        let mut clause = WhereClause::default();
        clause.years(plan);
        if full {
            clause.filters(plan);
            if let Some(entity) = plan.entity_text() {
                clause.name_like(entity);
            }
        }
        if let Some(presence) = metric_presence(metric) {
            clause.push(presence);
        }
        format!(
            "SELECT ROW_NUMBER() OVER (ORDER BY {agg} DESC, lower(MIN(Name)) ASC) AS Rank, \
             MIN(Name) AS Name, MIN(Year_of_Release) AS year, {agg} AS {label} \
             FROM {table}{where_clause} GROUP BY lower(Name) ORDER BY Rank ASC LIMIT {limit}",
            agg = aggregate,
            label = metric.label(),
            table = self.table,
            where_clause = clause.render(),
            limit = QueryPlan::clamp_top_n(plan.top_n),
        )
    }

    /// Detail rows of a franchise with at least one score, oldest first
    fn franchise_average(&self, plan: &QueryPlan, full: bool) -> String {
        let mut clause = WhereClause::default();
        clause.name_like(plan.entity_text().unwrap_or_default());
        clause.push(COMBO_PRESENCE);
        if full {
            clause.years(plan).filters(plan);
        }
        format!(
            "SELECT Name, Platform, Year_of_Release AS year, Critic_Score, Critic_Count, User_Score, User_Count \
             FROM {}{} ORDER BY Year_of_Release ASC NULLS LAST, Name ASC",
            self.table,
            clause.render()
        )
    }

    fn title_lookup(&self, plan: &QueryPlan) -> String {
        let title = plan.entity_text().unwrap_or_default();
        let mut clause = WhereClause::default();
        clause.name_equals(title);
        let field = plan.lookup.unwrap_or_default();
        match field {
            LookupField::ReleaseYear => format!(
                "SELECT CAST(MIN(TRY_CAST(Year_of_Release AS INTEGER)) AS INTEGER) AS year FROM {}{}",
                self.table,
                clause.render()
            ),
            LookupField::Platforms | LookupField::Publisher | LookupField::Developer | LookupField::Genre => {
                let column = lookup_label(field, plan.metric);
                clause.push(format!("{} IS NOT NULL", column));
                format!(
                    "SELECT {col} FROM {table}{where_clause} GROUP BY {col} ORDER BY {col} ASC",
                    col = column,
                    table = self.table,
                    where_clause = clause.render()
                )
            }
            LookupField::Sales => {
                let metric = sales_metric(plan.metric);
                format!(
                    "SELECT SUM(COALESCE(TRY_CAST({col} AS DOUBLE), 0)) AS {col}, COUNT(*) AS Entries FROM {table}{where_clause}",
                    col = metric.label(),
                    table = self.table,
                    where_clause = clause.render()
                )
            }
        }
    }

    fn aggregate(&self, plan: &QueryPlan, full: bool) -> String {
        let mut clause = WhereClause::default();
        if full {
            clause.years(plan).filters(plan);
            if let Some(entity) = plan.entity_text() {
                clause.name_like(entity);
            }
        }
        match plan.aggregate.unwrap_or(AggregateFunc::Count) {
            AggregateFunc::Count => format!("SELECT COUNT(*) AS Games FROM {}{}", self.table, clause.render()),
            AggregateFunc::Avg => {
                let metric = plan.metric;
                let value = match metric.column() {
                    Some(column) => format!("TRY_CAST({} AS DOUBLE)", column.name()),
                    None => {
                        clause.push(COMBO_PRESENCE);
                        format!("({})", COMBO_ROW_EXPR)
                    }
                };
                format!(
                    "SELECT AVG({value}) AS avg_{label}, COUNT({value}) AS n FROM {table}{where_clause}",
                    value = value,
                    label = metric.label(),
                    table = self.table,
                    where_clause = clause.render()
                )
            }
            AggregateFunc::Sum => {
                let metric = sales_metric(plan.metric);
                format!(
                    "SELECT SUM(COALESCE(TRY_CAST({col} AS DOUBLE), 0)) AS {col}, COUNT(*) AS Games FROM {table}{where_clause}",
                    col = metric.label(),
                    table = self.table,
                    where_clause = clause.render()
                )
            }
        }
    }

    fn total_franchise_sales(&self, plan: &QueryPlan, full: bool) -> String {
        let mut clause = WhereClause::default();
        clause.name_like(plan.entity_text().unwrap_or_default());
        if full {
            clause.years(plan).filters(plan);
        }
        let sums = [
            GameColumn::GlobalSales,
            GameColumn::NaSales,
            GameColumn::EuSales,
            GameColumn::JpSales,
            GameColumn::OtherSales,
        ]
        .iter()
        .map(|c| format!("SUM(COALESCE({col}, 0)) AS {col}", col = c.name()))
        .collect::<Vec<_>>()
        .join(", ");
        format!(
            "SELECT {}, COUNT(*) AS Entries FROM {}{}",
            sums,
            self.table,
            clause.render()
        )
    }

    fn summary(&self, plan: &QueryPlan, full: bool) -> String {
        let mut clause = WhereClause::default();
        clause.years(plan);
        if full {
            clause.filters(plan);
        }
        format!(
            "SELECT COUNT(*) AS Entries, MIN(Year_of_Release) AS First_Year, MAX(Year_of_Release) AS Last_Year, \
             SUM(COALESCE(TRY_CAST(Global_Sales AS DOUBLE), 0)) AS Global_Sales, \
             AVG(TRY_CAST(Critic_Score AS DOUBLE)) AS Avg_Critic_Score, \
             AVG(TRY_CAST(User_Score AS DOUBLE)) AS Avg_User_Score FROM {}{}",
            self.table,
            clause.render()
        )
    }
}
