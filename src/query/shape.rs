//! Result-shape check for oracle-proposed statements.
//!
//! The Safety Validator proves a statement is read-only; it says nothing about
//! whether the rows are the ones the templates render. Oracle SQL must project
//! the columns the compiled statement would, and a ranking must keep one row per
//! title ordered by the metric descending, ties by title ascending.

use crate::storage::columnar::GameColumn;
use sqlparser::ast::{Expr, GroupByExpr, OrderByExpr, Query, Select, SelectItem, SetExpr, Statement, Value, WindowType};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShapeMismatch {
    #[error("unparseable statement: {0}")]
    Unparseable(String),
    #[error("expected a single plain SELECT")]
    NotASelect,
    #[error("missing output column {0}")]
    MissingColumn(String),
    #[error("column {0} is not the ranked metric")]
    WrongMetric(String),
    #[error("ranking must group by lower(Name)")]
    WrongGrouping,
    #[error("ranking must order by the metric descending, then lower(Name) ascending")]
    WrongOrder,
    #[error("ranking LIMIT must be a constant of at most {0}")]
    WrongLimit(u32),
}

/// What a ranking statement must look like
#[derive(Clone, Debug, PartialEq)]
pub struct RankingShape {
    pub metric_label: String,
    /// Accepted per-title aggregates of the metric, as SQL text
    pub metric_exprs: Vec<String>,
    pub max_limit: u32,
}

/// Expected output of a statement
#[derive(Clone, Debug, PartialEq)]
pub struct ExpectedShape {
    pub columns: Vec<String>,
    pub ranking: Option<RankingShape>,
}

/// Lower-case SQL text without whitespace or identifier quotes
fn key(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace() && *c != '"')
        .flat_map(char::to_lowercase)
        .collect()
}

fn parse_query(sql: &str) -> Result<Box<Query>, ShapeMismatch> {
    let mut statements =
        Parser::parse_sql(&GenericDialect {}, sql).map_err(|e| ShapeMismatch::Unparseable(e.to_string()))?;
    match (statements.pop(), statements.is_empty()) {
        (Some(Statement::Query(query)), true) if query.with.is_none() => Ok(query),
        _ => Err(ShapeMismatch::NotASelect),
    }
}

fn select_of(query: &Query) -> Result<&Select, ShapeMismatch> {
    match query.body.as_ref() {
        SetExpr::Select(select) => Ok(select),
        _ => Err(ShapeMismatch::NotASelect),
    }
}

/// Output names in projection order, with the expression behind each name
fn outputs(select: &Select) -> Vec<(String, Option<&Expr>)> {
    let mut out = Vec::with_capacity(select.projection.len());
    for item in &select.projection {
        match item {
            SelectItem::UnnamedExpr(expr) => {
                let name = match expr {
                    Expr::Identifier(ident) => ident.value.clone(),
                    Expr::CompoundIdentifier(idents) => idents.last().map(|i| i.value.clone()).unwrap_or_default(),
                    other => other.to_string(),
                };
                out.push((name, Some(expr)));
            }
            SelectItem::ExprWithAlias { expr, alias } => out.push((alias.value.clone(), Some(expr))),
            SelectItem::Wildcard(_) | SelectItem::QualifiedWildcard(..) => {
                out.extend(GameColumn::ALL.iter().map(|c| (c.name().to_string(), None)));
            }
        }
    }
    out
}

/// Output column names of a statement, as the executor would name them
pub fn output_columns(sql: &str) -> Result<Vec<String>, ShapeMismatch> {
    let query = parse_query(sql)?;
    let select = select_of(&query)?;
    Ok(outputs(select).into_iter().map(|(name, _)| name).collect())
}

impl RankingShape {
    fn is_metric(&self, expr: &Expr) -> bool {
        let text = key(&expr.to_string());
        text == key(&self.metric_label) || self.metric_exprs.iter().any(|m| key(m) == text)
    }

    fn is_title(expr: &Expr) -> bool {
        matches!(key(&expr.to_string()).as_str(), "lower(name)" | "lower(min(name))")
    }

    /// `metric DESC, lower(Name) ASC`
    fn ordered(&self, keys: &[OrderByExpr]) -> bool {
        match keys {
            [metric, title] => {
                metric.asc == Some(false)
                    && self.is_metric(&metric.expr)
                    && title.asc != Some(false)
                    && Self::is_title(&title.expr)
            }
            _ => false,
        }
    }

    /// `ORDER BY Rank` where Rank is `ROW_NUMBER() OVER (ORDER BY metric DESC, lower(Name) ASC)`
    fn ordered_by_rank(&self, keys: &[OrderByExpr], outputs: &[(String, Option<&Expr>)]) -> bool {
        let [rank] = keys else {
            return false;
        };
        if rank.asc == Some(false) {
            return false;
        }
        let target = key(&rank.expr.to_string());
        let window = outputs
            .iter()
            .find(|(name, _)| key(name) == target)
            .and_then(|(_, expr)| match expr {
                Some(Expr::Function(func)) if key(&func.name.to_string()) == "row_number" => func.over.as_ref(),
                _ => None,
            });
        match window {
            Some(WindowType::WindowSpec(spec)) => spec.partition_by.is_empty() && self.ordered(&spec.order_by),
            _ => false,
        }
    }

    fn check(&self, query: &Query, select: &Select, outputs: &[(String, Option<&Expr>)]) -> Result<(), ShapeMismatch> {
        match outputs.iter().find(|(name, _)| name.eq_ignore_ascii_case(&self.metric_label)) {
            Some((_, Some(expr))) if self.metric_exprs.iter().any(|m| key(m) == key(&expr.to_string())) => {}
            _ => return Err(ShapeMismatch::WrongMetric(self.metric_label.clone())),
        }

        let grouped_by_title = match &select.group_by {
            GroupByExpr::Expressions(exprs) => matches!(exprs.as_slice(), [e] if key(&e.to_string()) == "lower(name)"),
            GroupByExpr::All => false,
        };
        if !grouped_by_title {
            return Err(ShapeMismatch::WrongGrouping);
        }

        if !self.ordered(&query.order_by) && !self.ordered_by_rank(&query.order_by, outputs) {
            return Err(ShapeMismatch::WrongOrder);
        }

        match &query.limit {
            Some(Expr::Value(Value::Number(n, _))) if n.parse::<u32>().map_or(false, |n| n <= self.max_limit) => Ok(()),
            _ => Err(ShapeMismatch::WrongLimit(self.max_limit)),
        }
    }
}

impl ExpectedShape {
    pub fn check(&self, sql: &str) -> Result<(), ShapeMismatch> {
        let query = parse_query(sql)?;
        let select = select_of(&query)?;
        let outputs = outputs(select);

        for column in &self.columns {
            if !outputs.iter().any(|(name, _)| name.eq_ignore_ascii_case(column)) {
                return Err(ShapeMismatch::MissingColumn(column.clone()));
            }
        }
        match &self.ranking {
            Some(ranking) => ranking.check(&query, select, &outputs),
            None => Ok(()),
        }
    }
}
