//! Query Executor
//!
//! Runs one validated SELECT against the in-memory games table. The supported
//! shape is a single-table SELECT with WHERE, GROUP BY, HAVING, a ROW_NUMBER
//! window, DISTINCT, ORDER BY and LIMIT/OFFSET. Anything else is an execution error.

use crate::error::{NlqError, NlqResult};
use crate::query::compiler::{SqlStatement, DEFAULT_TABLE};
use crate::query::expression::{compare_sort_values, lower_expr, truth, Expression, Scope, SortKey};
use crate::query::result::ResultSet;
use crate::storage::columnar::{GameColumn, GamesTable};
use crate::storage::value::Value;
use sqlparser::ast::{self, Expr, GroupByExpr, Query, Select, SelectItem, SetExpr, Statement, TableFactor};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// One projected column
struct OutputColumn {
    name: String,
    expr: Expression,
}

/// How an ORDER BY key is evaluated
enum OrderSource {
    /// Index into the projected row
    Output(usize),
    Expr(Expression),
}

struct OrderKey {
    source: OrderSource,
    descending: bool,
    nulls_first: bool,
}

/// A group of input rows (or a single row when the query is not aggregated)
struct Unit {
    rows: Vec<usize>,
    row_number: Option<i64>,
}

pub struct QueryExecutor {
    table: Arc<GamesTable>,
    table_name: String,
}

impl QueryExecutor {
    pub fn new(table: Arc<GamesTable>) -> Self {
        Self {
            table,
            table_name: DEFAULT_TABLE.to_string(),
        }
    }

    pub fn with_table_name(mut self, name: impl Into<String>) -> Self {
        self.table_name = name.into();
        self
    }

    pub fn table(&self) -> &Arc<GamesTable> {
        &self.table
    }

    /// Run a validated statement
    pub fn execute(&self, statement: &SqlStatement) -> NlqResult<ResultSet> {
        self.execute_sql(&statement.sql)
    }

    /// Parse and run a SELECT
    pub fn execute_sql(&self, sql: &str) -> NlqResult<ResultSet> {
        let start = Instant::now();
        let statements = Parser::parse_sql(&GenericDialect {}, sql)
            .map_err(|e| NlqError::execution(format!("parse error: {}", e)).with_sql(sql))?;
        let query = match statements.as_slice() {
            [Statement::Query(query)] => query,
            _ => return Err(NlqError::execution("expected exactly one SELECT").with_sql(sql)),
        };
        let result = self.run_query(query).map_err(|e| e.with_sql(sql))?;
        debug!(
            rows = result.len(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "executed statement"
        );
        Ok(result)
    }

    fn run_query(&self, query: &Query) -> NlqResult<ResultSet> {
        if query.with.is_some() {
            return Err(NlqError::execution("WITH clauses are not supported"));
        }
        let select = match query.body.as_ref() {
            SetExpr::Select(select) => select.as_ref(),
            SetExpr::Query(inner) => return self.run_query(inner),
            other => return Err(NlqError::execution(format!("unsupported query body: {}", other))),
        };
        self.check_from(select)?;

        let outputs = lower_projection(select)?;
        let filter = select.selection.as_ref().map(lower_expr).transpose()?;
        let group_by = match &select.group_by {
            GroupByExpr::Expressions(exprs) => exprs.iter().map(lower_expr).collect::<NlqResult<Vec<_>>>()?,
            GroupByExpr::All => return Err(NlqError::execution("GROUP BY ALL is not supported")),
        };
        let having = select.having.as_ref().map(lower_expr).transpose()?;
        let order_keys = self.lower_order_by(&query.order_by, &outputs)?;

        let aggregated = !group_by.is_empty()
            || having.is_some()
            || outputs.iter().any(|o| o.expr.contains_aggregate())
            || order_keys
                .iter()
                .any(|k| matches!(&k.source, OrderSource::Expr(e) if e.contains_aggregate()));

        let table = self.table.as_ref();

        // WHERE
        let mut rows = Vec::with_capacity(table.row_count());
        for row in 0..table.row_count() {
            let keep = match &filter {
                Some(expr) => truth(&expr.evaluate(&Scope::row(table, &row))?) == Some(true),
                None => true,
            };
            if keep {
                rows.push(row);
            }
        }

        // GROUP BY
        let mut units = if aggregated {
            self.group_rows(rows, &group_by)?
        } else {
            rows.into_iter()
                .map(|row| Unit {
                    rows: vec![row],
                    row_number: None,
                })
                .collect()
        };

        // HAVING
        if let Some(having) = &having {
            let mut kept = Vec::with_capacity(units.len());
            for unit in units {
                if truth(&having.evaluate(&self.scope(&unit, aggregated))?) == Some(true) {
                    kept.push(unit);
                }
            }
            units = kept;
        }

        // ROW_NUMBER
        if let Some(window) = outputs.iter().find_map(|o| o.expr.window()) {
            self.number_units(&mut units, window, aggregated)?;
        }

        // Projection
        let mut projected: Vec<(Vec<Value>, usize)> = Vec::with_capacity(units.len());
        for (i, unit) in units.iter().enumerate() {
            let scope = self.scope(unit, aggregated);
            let values = outputs
                .iter()
                .map(|o| o.expr.evaluate(&scope))
                .collect::<NlqResult<Vec<_>>>()?;
            projected.push((values, i));
        }

        if select.distinct.is_some() {
            let mut seen = std::collections::HashSet::new();
            projected.retain(|(values, _)| seen.insert(values.clone()));
        }

        // ORDER BY
        if !order_keys.is_empty() {
            let mut keyed = Vec::with_capacity(projected.len());
            for (values, unit_idx) in projected {
                let scope = self.scope(&units[unit_idx], aggregated);
                let mut sort_values = Vec::with_capacity(order_keys.len());
                for key in &order_keys {
                    sort_values.push(match &key.source {
                        OrderSource::Output(idx) => values[*idx].clone(),
                        OrderSource::Expr(expr) => expr.evaluate(&scope)?,
                    });
                }
                keyed.push((sort_values, values));
            }
            keyed.sort_by(|(a, _), (b, _)| {
                order_keys
                    .iter()
                    .zip(a.iter().zip(b.iter()))
                    .map(|(key, (x, y))| compare_sort_values(x, y, key.descending, key.nulls_first))
                    .find(|o| o.is_ne())
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            projected = keyed.into_iter().map(|(_, values)| (values, 0)).collect();
        }

        // OFFSET / LIMIT
        let offset = match &query.offset {
            Some(offset) => constant_count(&offset.value, "OFFSET")?,
            None => 0,
        };
        let limit = query.limit.as_ref().map(|e| constant_count(e, "LIMIT")).transpose()?;
        let rows: Vec<Vec<Value>> = projected
            .into_iter()
            .skip(offset)
            .take(limit.unwrap_or(usize::MAX))
            .map(|(values, _)| values)
            .collect();

        Ok(ResultSet::new(outputs.into_iter().map(|o| o.name).collect(), rows))
    }

    fn check_from(&self, select: &Select) -> NlqResult<()> {
        let [from] = select.from.as_slice() else {
            return Err(NlqError::execution("exactly one table must be selected from"));
        };
        if !from.joins.is_empty() {
            return Err(NlqError::execution("joins are not supported"));
        }
        match &from.relation {
            TableFactor::Table { name, .. } => {
                let table = name.0.last().map(|i| i.value.as_str()).unwrap_or("");
                if table.eq_ignore_ascii_case(&self.table_name) {
                    Ok(())
                } else {
                    Err(NlqError::execution(format!("unknown table: {}", name)))
                }
            }
            other => Err(NlqError::execution(format!("unsupported FROM clause: {}", other))),
        }
    }

    fn scope<'a>(&'a self, unit: &'a Unit, aggregated: bool) -> Scope<'a> {
        Scope {
            table: self.table.as_ref(),
            rows: &unit.rows,
            grouped: aggregated,
            row_number: unit.row_number,
        }
    }

    /// Group filtered rows by key, keeping first-occurrence order.
    /// Without GROUP BY all rows form one group, even when there are none.
    fn group_rows(&self, rows: Vec<usize>, group_by: &[Expression]) -> NlqResult<Vec<Unit>> {
        if group_by.is_empty() {
            return Ok(vec![Unit { rows, row_number: None }]);
        }
        let table = self.table.as_ref();
        let mut index: HashMap<Vec<Value>, usize> = HashMap::new();
        let mut units: Vec<Unit> = Vec::new();
        for row in rows {
            let scope = Scope::row(table, &row);
            let key = group_by
                .iter()
                .map(|e| e.evaluate(&scope))
                .collect::<NlqResult<Vec<_>>>()?;
            match index.get(&key) {
                Some(&i) => units[i].rows.push(row),
                None => {
                    index.insert(key, units.len());
                    units.push(Unit {
                        rows: vec![row],
                        row_number: None,
                    });
                }
            }
        }
        Ok(units)
    }

    /// Assign 1-based ROW_NUMBER values in window order
    fn number_units(&self, units: &mut [Unit], window: &[SortKey], aggregated: bool) -> NlqResult<()> {
        let mut keyed: Vec<(Vec<Value>, usize)> = Vec::with_capacity(units.len());
        for (i, unit) in units.iter().enumerate() {
            let scope = self.scope(unit, aggregated);
            let values = window
                .iter()
                .map(|k| k.expr.evaluate(&scope))
                .collect::<NlqResult<Vec<_>>>()?;
            keyed.push((values, i));
        }
        keyed.sort_by(|(a, _), (b, _)| {
            window
                .iter()
                .zip(a.iter().zip(b.iter()))
                .map(|(key, (x, y))| compare_sort_values(x, y, key.descending, key.nulls_first))
                .find(|o| o.is_ne())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        for (n, (_, i)) in keyed.into_iter().enumerate() {
            units[i].row_number = Some(n as i64 + 1);
        }
        Ok(())
    }

    /// ORDER BY items may name an output column, give a 1-based ordinal, or be an expression
    fn lower_order_by(&self, order_by: &[ast::OrderByExpr], outputs: &[OutputColumn]) -> NlqResult<Vec<OrderKey>> {
        order_by
            .iter()
            .map(|item| {
                let source = match &item.expr {
                    Expr::Identifier(ident) => match outputs.iter().position(|o| o.name.eq_ignore_ascii_case(&ident.value)) {
                        Some(idx) => OrderSource::Output(idx),
                        None => OrderSource::Expr(lower_expr(&item.expr)?),
                    },
                    Expr::Value(ast::Value::Number(n, _)) => {
                        let ordinal: usize = n
                            .parse()
                            .map_err(|_| NlqError::execution(format!("bad ORDER BY ordinal {}", n)))?;
                        if ordinal == 0 || ordinal > outputs.len() {
                            return Err(NlqError::execution(format!("ORDER BY position {} is out of range", ordinal)));
                        }
                        OrderSource::Output(ordinal - 1)
                    }
                    other => OrderSource::Expr(lower_expr(other)?),
                };
                Ok(OrderKey {
                    source,
                    descending: item.asc == Some(false),
                    nulls_first: item.nulls_first.unwrap_or(false),
                })
            })
            .collect()
    }
}

fn lower_projection(select: &Select) -> NlqResult<Vec<OutputColumn>> {
    let mut outputs = Vec::with_capacity(select.projection.len());
    for item in &select.projection {
        match item {
            SelectItem::UnnamedExpr(expr) => {
                let name = match expr {
                    Expr::Identifier(ident) => ident.value.clone(),
                    Expr::CompoundIdentifier(idents) => {
                        idents.last().map(|i| i.value.clone()).unwrap_or_default()
                    }
                    other => other.to_string(),
                };
                outputs.push(OutputColumn {
                    name,
                    expr: lower_expr(expr)?,
                });
            }
            SelectItem::ExprWithAlias { expr, alias } => outputs.push(OutputColumn {
                name: alias.value.clone(),
                expr: lower_expr(expr)?,
            }),
            SelectItem::Wildcard(_) | SelectItem::QualifiedWildcard(..) => {
                outputs.extend(GameColumn::ALL.iter().map(|c| OutputColumn {
                    name: c.name().to_string(),
                    expr: Expression::Column(*c),
                }));
            }
        }
    }
    Ok(outputs)
}

fn constant_count(expr: &Expr, clause: &str) -> NlqResult<usize> {
    match expr {
        Expr::Value(ast::Value::Number(n, _)) => n
            .parse::<usize>()
            .map_err(|_| NlqError::execution(format!("{} must be a non-negative integer, got {}", clause, n))),
        other => Err(NlqError::execution(format!("{} must be a constant, got {}", clause, other))),
    }
}
