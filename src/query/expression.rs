/// SQL Expression Evaluation
/// Lowers parser expressions into a small evaluable tree and evaluates it
/// against one row or one group of rows of the games table.
use crate::error::{NlqError, NlqResult};
use crate::query::coerce::{cast_value, CastTarget};
use crate::storage::columnar::{GameColumn, GamesTable};
use crate::storage::value::Value;
use sqlparser::ast::{self, Expr, FunctionArg, FunctionArgExpr, WindowType};
use std::cmp::Ordering;

#[derive(Clone, Debug, PartialEq)]
pub enum Expression {
    Column(GameColumn),
    Literal(Value),
    BinaryOp {
        left: Box<Expression>,
        op: BinaryOperator,
        right: Box<Expression>,
    },
    UnaryOp {
        op: UnaryOperator,
        expr: Box<Expression>,
    },
    /// Scalar function call
    Function {
        func: ScalarFunction,
        args: Vec<Expression>,
    },
    /// Aggregate; `arg == None` is COUNT(*)
    Aggregate {
        func: AggregateFunction,
        arg: Option<Box<Expression>>,
    },
    /// ROW_NUMBER() OVER (ORDER BY ...)
    RowNumber { order_by: Vec<SortKey> },
    Case {
        operand: Option<Box<Expression>>,
        branches: Vec<(Expression, Expression)>,
        else_result: Option<Box<Expression>>,
    },
    /// CAST and TRY_CAST both yield NULL on failure
    Cast {
        expr: Box<Expression>,
        target: CastTarget,
    },
    Like {
        expr: Box<Expression>,
        pattern: Box<Expression>,
        negated: bool,
        case_insensitive: bool,
    },
    Between {
        expr: Box<Expression>,
        low: Box<Expression>,
        high: Box<Expression>,
        negated: bool,
    },
    InList {
        expr: Box<Expression>,
        list: Vec<Expression>,
        negated: bool,
    },
    IsNull {
        expr: Box<Expression>,
        negated: bool,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Concat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOperator {
    Not,
    Negate,
    Plus,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScalarFunction {
    Lower,
    Upper,
    Coalesce,
    Round,
    Abs,
    Exp,
    NullIf,
    Length,
    Trim,
}

impl ScalarFunction {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "lower" => Some(ScalarFunction::Lower),
            "upper" => Some(ScalarFunction::Upper),
            "coalesce" | "ifnull" => Some(ScalarFunction::Coalesce),
            "round" => Some(ScalarFunction::Round),
            "abs" => Some(ScalarFunction::Abs),
            "exp" => Some(ScalarFunction::Exp),
            "nullif" => Some(ScalarFunction::NullIf),
            "length" | "char_length" => Some(ScalarFunction::Length),
            "trim" => Some(ScalarFunction::Trim),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AggregateFunction {
    Sum,
    Avg,
    Min,
    Max,
    Count,
}

impl AggregateFunction {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "sum" => Some(AggregateFunction::Sum),
            "avg" | "mean" => Some(AggregateFunction::Avg),
            "min" => Some(AggregateFunction::Min),
            "max" => Some(AggregateFunction::Max),
            "count" => Some(AggregateFunction::Count),
            _ => None,
        }
    }
}

/// One ORDER BY key
#[derive(Clone, Debug, PartialEq)]
pub struct SortKey {
    pub expr: Expression,
    pub descending: bool,
    pub nulls_first: bool,
}

impl SortKey {
    /// Missing direction means ASC; missing NULLS placement means NULLS LAST
    pub fn from_ast(order: &ast::OrderByExpr) -> NlqResult<Self> {
        Ok(Self {
            expr: lower_expr(&order.expr)?,
            descending: order.asc == Some(false),
            nulls_first: order.nulls_first.unwrap_or(false),
        })
    }
}

/// Compare two sort values under one key's direction and null placement
pub fn compare_sort_values(a: &Value, b: &Value, descending: bool, nulls_first: bool) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => {
            if nulls_first {
                Ordering::Less
            } else {
                Ordering::Greater
            }
        }
        (false, true) => {
            if nulls_first {
                Ordering::Greater
            } else {
                Ordering::Less
            }
        }
        (false, false) => {
            let ord = a.sql_cmp(b).unwrap_or_else(|| a.sort_cmp(b));
            if descending {
                ord.reverse()
            } else {
                ord
            }
        }
    }
}

/// Evaluation scope: one row, or one group when `grouped`
#[derive(Clone, Copy, Debug)]
pub struct Scope<'a> {
    pub table: &'a GamesTable,
    pub rows: &'a [usize],
    pub grouped: bool,
    pub row_number: Option<i64>,
}

impl<'a> Scope<'a> {
    pub fn row(table: &'a GamesTable, row: &'a usize) -> Self {
        Self {
            table,
            rows: std::slice::from_ref(row),
            grouped: false,
            row_number: None,
        }
    }

    pub fn group(table: &'a GamesTable, rows: &'a [usize]) -> Self {
        Self {
            table,
            rows,
            grouped: true,
            row_number: None,
        }
    }
}

/// SQL truthiness; NULL (and non-boolean text) is unknown
pub fn truth(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Int64(v) => Some(*v != 0),
        Value::Float64(v) => Some(*v != 0.0),
        Value::String(_) | Value::Null => None,
    }
}

/// LIKE matching: `%` is any run, `_` any single char
pub fn like_match(text: &str, pattern: &str) -> bool {
    let t: Vec<char> = text.chars().collect();
    let p: Vec<char> = pattern.chars().collect();
    let (mut ti, mut pi) = (0usize, 0usize);
    let mut star: Option<usize> = None;
    let mut mark = 0usize;
    while ti < t.len() {
        if pi < p.len() && p[pi] == '%' {
            star = Some(pi);
            mark = ti;
            pi += 1;
        } else if pi < p.len() && (p[pi] == '_' || p[pi] == t[ti]) {
            ti += 1;
            pi += 1;
        } else if let Some(s) = star {
            pi = s + 1;
            mark += 1;
            ti = mark;
        } else {
            return false;
        }
    }
    while pi < p.len() && p[pi] == '%' {
        pi += 1;
    }
    pi == p.len()
}

fn unsupported(what: impl std::fmt::Display) -> NlqError {
    NlqError::execution(format!("unsupported expression: {}", what))
}

fn column_by_name(name: &str) -> NlqResult<GameColumn> {
    GameColumn::from_name(name)
        .or_else(|| name.eq_ignore_ascii_case("year").then_some(GameColumn::YearOfRelease))
        .ok_or_else(|| NlqError::execution(format!("unknown column: {}", name)))
}

fn lower_literal(value: &ast::Value) -> NlqResult<Value> {
    match value {
        ast::Value::Number(n, _) => {
            if let Ok(i) = n.parse::<i64>() {
                Ok(Value::Int64(i))
            } else {
                n.parse::<f64>()
                    .map(Value::Float64)
                    .map_err(|_| NlqError::execution(format!("bad number literal: {}", n)))
            }
        }
        ast::Value::SingleQuotedString(s) | ast::Value::DoubleQuotedString(s) => Ok(Value::String(s.clone())),
        ast::Value::Boolean(b) => Ok(Value::Bool(*b)),
        ast::Value::Null => Ok(Value::Null),
        other => Err(unsupported(other)),
    }
}

fn lower_binary_op(op: &ast::BinaryOperator) -> NlqResult<BinaryOperator> {
    use ast::BinaryOperator as Sql;
    Ok(match op {
        Sql::Plus => BinaryOperator::Add,
        Sql::Minus => BinaryOperator::Subtract,
        Sql::Multiply => BinaryOperator::Multiply,
        Sql::Divide => BinaryOperator::Divide,
        Sql::Modulo => BinaryOperator::Modulo,
        Sql::Eq => BinaryOperator::Eq,
        Sql::NotEq => BinaryOperator::Ne,
        Sql::Lt => BinaryOperator::Lt,
        Sql::LtEq => BinaryOperator::Le,
        Sql::Gt => BinaryOperator::Gt,
        Sql::GtEq => BinaryOperator::Ge,
        Sql::And => BinaryOperator::And,
        Sql::Or => BinaryOperator::Or,
        Sql::StringConcat => BinaryOperator::Concat,
        other => return Err(unsupported(other)),
    })
}

fn lower_function(func: &ast::Function) -> NlqResult<Expression> {
    let name = func.name.to_string().to_lowercase();

    let mut args: Vec<Option<Expression>> = Vec::with_capacity(func.args.len());
    for arg in &func.args {
        let arg_expr = match arg {
            FunctionArg::Unnamed(arg_expr) | FunctionArg::Named { arg: arg_expr, .. } => arg_expr,
        };
        match arg_expr {
            FunctionArgExpr::Expr(e) => args.push(Some(lower_expr(e)?)),
            FunctionArgExpr::Wildcard | FunctionArgExpr::QualifiedWildcard(_) => args.push(None),
        }
    }

    if let Some(over) = &func.over {
        if name != "row_number" {
            return Err(unsupported(format!("window function {}", name)));
        }
        let spec = match over {
            WindowType::WindowSpec(spec) => spec,
            WindowType::NamedWindow(_) => return Err(unsupported("named window")),
        };
        if !spec.partition_by.is_empty() {
            return Err(unsupported("PARTITION BY"));
        }
        let order_by = spec
            .order_by
            .iter()
            .map(SortKey::from_ast)
            .collect::<NlqResult<Vec<_>>>()?;
        return Ok(Expression::RowNumber { order_by });
    }

    if let Some(agg) = AggregateFunction::from_name(&name) {
        let arg = match args.as_slice() {
            [None] if agg == AggregateFunction::Count => None,
            [Some(e)] => Some(Box::new(e.clone())),
            _ => return Err(unsupported(format!("{} with {} arguments", name, args.len()))),
        };
        return Ok(Expression::Aggregate { func: agg, arg });
    }

    let func = ScalarFunction::from_name(&name).ok_or_else(|| unsupported(format!("function {}", name)))?;
    let args = args
        .into_iter()
        .map(|a| a.ok_or_else(|| unsupported(format!("* argument to {}", name))))
        .collect::<NlqResult<Vec<_>>>()?;
    let arity_ok = match func {
        ScalarFunction::Coalesce => !args.is_empty(),
        ScalarFunction::Round => args.len() == 1 || args.len() == 2,
        ScalarFunction::NullIf => args.len() == 2,
        _ => args.len() == 1,
    };
    if !arity_ok {
        return Err(unsupported(format!("{} with {} arguments", name, args.len())));
    }
    Ok(Expression::Function { func, args })
}

fn lower_cast(expr: &Expr, data_type: &ast::DataType) -> NlqResult<Expression> {
    let target = CastTarget::from_sql_type(&data_type.to_string())
        .ok_or_else(|| unsupported(format!("cast to {}", data_type)))?;
    Ok(Expression::Cast {
        expr: Box::new(lower_expr(expr)?),
        target,
    })
}

fn boxed(expr: &Expr) -> NlqResult<Box<Expression>> {
    Ok(Box::new(lower_expr(expr)?))
}

/// Convert a parser expression into an evaluable one
pub fn lower_expr(expr: &Expr) -> NlqResult<Expression> {
    match expr {
        Expr::Identifier(ident) => Ok(Expression::Column(column_by_name(&ident.value)?)),
        Expr::CompoundIdentifier(idents) => match idents.last() {
            Some(ident) => Ok(Expression::Column(column_by_name(&ident.value)?)),
            None => Err(unsupported("empty identifier")),
        },
        Expr::Value(value) => Ok(Expression::Literal(lower_literal(value)?)),
        Expr::Nested(inner) => lower_expr(inner),
        Expr::BinaryOp { left, op, right } => Ok(Expression::BinaryOp {
            left: boxed(left)?,
            op: lower_binary_op(op)?,
            right: boxed(right)?,
        }),
        Expr::UnaryOp { op, expr: inner } => {
            let op = match op {
                ast::UnaryOperator::Not => UnaryOperator::Not,
                ast::UnaryOperator::Minus => UnaryOperator::Negate,
                ast::UnaryOperator::Plus => UnaryOperator::Plus,
                other => return Err(unsupported(other)),
            };
            Ok(Expression::UnaryOp { op, expr: boxed(inner)? })
        }
        Expr::IsNull(inner) => Ok(Expression::IsNull {
            expr: boxed(inner)?,
            negated: false,
        }),
        Expr::IsNotNull(inner) => Ok(Expression::IsNull {
            expr: boxed(inner)?,
            negated: true,
        }),
        Expr::Like {
            negated,
            expr: inner,
            pattern,
            ..
        } => Ok(Expression::Like {
            expr: boxed(inner)?,
            pattern: boxed(pattern)?,
            negated: *negated,
            case_insensitive: false,
        }),
        Expr::ILike {
            negated,
            expr: inner,
            pattern,
            ..
        } => Ok(Expression::Like {
            expr: boxed(inner)?,
            pattern: boxed(pattern)?,
            negated: *negated,
            case_insensitive: true,
        }),
        Expr::Between {
            expr: inner,
            negated,
            low,
            high,
        } => Ok(Expression::Between {
            expr: boxed(inner)?,
            low: boxed(low)?,
            high: boxed(high)?,
            negated: *negated,
        }),
        Expr::InList {
            expr: inner,
            list,
            negated,
        } => Ok(Expression::InList {
            expr: boxed(inner)?,
            list: list.iter().map(lower_expr).collect::<NlqResult<Vec<_>>>()?,
            negated: *negated,
        }),
        Expr::Case {
            operand,
            conditions,
            results,
            else_result,
        } => {
            let operand = operand.as_deref().map(boxed).transpose()?;
            let branches = conditions
                .iter()
                .zip(results.iter())
                .map(|(c, r)| Ok((lower_expr(c)?, lower_expr(r)?)))
                .collect::<NlqResult<Vec<_>>>()?;
            let else_result = else_result.as_deref().map(boxed).transpose()?;
            Ok(Expression::Case {
                operand,
                branches,
                else_result,
            })
        }
        Expr::Cast {
            expr: inner, data_type, ..
        } => lower_cast(inner, data_type),
        Expr::TryCast {
            expr: inner, data_type, ..
        } => lower_cast(inner, data_type),
        Expr::Trim { expr: inner, .. } => Ok(Expression::Function {
            func: ScalarFunction::Trim,
            args: vec![lower_expr(inner)?],
        }),
        Expr::Function(func) => lower_function(func),
        other => Err(unsupported(other)),
    }
}

impl Expression {
    fn children(&self) -> Vec<&Expression> {
        match self {
            Expression::Column(_) | Expression::Literal(_) => vec![],
            Expression::BinaryOp { left, right, .. } => vec![&**left, &**right],
            Expression::UnaryOp { expr, .. }
            | Expression::Cast { expr, .. }
            | Expression::IsNull { expr, .. } => vec![&**expr],
            Expression::Function { args, .. } => args.iter().collect(),
            Expression::Aggregate { arg, .. } => arg.iter().map(|a| &**a).collect(),
            Expression::RowNumber { order_by } => order_by.iter().map(|k| &k.expr).collect(),
            Expression::Case {
                operand,
                branches,
                else_result,
            } => {
                let mut out: Vec<&Expression> = operand.iter().map(|o| &**o).collect();
                for (c, r) in branches {
                    out.push(c);
                    out.push(r);
                }
                out.extend(else_result.iter().map(|e| &**e));
                out
            }
            Expression::Like { expr, pattern, .. } => vec![&**expr, &**pattern],
            Expression::Between { expr, low, high, .. } => vec![&**expr, &**low, &**high],
            Expression::InList { expr, list, .. } => {
                let mut out = vec![&**expr];
                out.extend(list.iter());
                out
            }
        }
    }

    pub fn contains_aggregate(&self) -> bool {
        match self {
            Expression::Aggregate { .. } => true,
            // window keys run in the grouped scope, they do not group by themselves
            Expression::RowNumber { .. } => false,
            other => other.children().into_iter().any(Expression::contains_aggregate),
        }
    }

    /// First ROW_NUMBER window in this expression
    pub fn window(&self) -> Option<&[SortKey]> {
        match self {
            Expression::RowNumber { order_by } => Some(order_by),
            other => other.children().into_iter().find_map(Expression::window),
        }
    }

    pub fn evaluate(&self, scope: &Scope<'_>) -> NlqResult<Value> {
        match self {
            Expression::Column(column) => Ok(scope
                .rows
                .first()
                .map(|&row| scope.table.value(*column, row))
                .unwrap_or(Value::Null)),
            Expression::Literal(value) => Ok(value.clone()),
            Expression::BinaryOp { left, op, right } => eval_binary(left, *op, right, scope),
            Expression::UnaryOp { op, expr } => {
                let value = expr.evaluate(scope)?;
                Ok(match (op, value) {
                    (_, Value::Null) => Value::Null,
                    (UnaryOperator::Not, v) => truth(&v).map(|b| Value::Bool(!b)).unwrap_or(Value::Null),
                    (UnaryOperator::Negate, Value::Int64(i)) => Value::Int64(-i),
                    (UnaryOperator::Negate, Value::Float64(f)) => Value::Float64(-f),
                    (UnaryOperator::Plus, v) if v.is_numeric() => v,
                    (op, v) => return Err(NlqError::execution(format!("cannot apply {:?} to {}", op, v))),
                })
            }
            Expression::Function { func, args } => eval_scalar(*func, args, scope),
            Expression::Aggregate { func, arg } => eval_aggregate(*func, arg.as_deref(), scope),
            Expression::RowNumber { .. } => scope
                .row_number
                .map(Value::Int64)
                .ok_or_else(|| NlqError::execution("ROW_NUMBER evaluated outside a window")),
            Expression::Case {
                operand,
                branches,
                else_result,
            } => {
                let operand = operand.as_ref().map(|o| o.evaluate(scope)).transpose()?;
                for (condition, result) in branches {
                    let cond = condition.evaluate(scope)?;
                    let hit = match &operand {
                        Some(op) => op.sql_cmp(&cond) == Some(Ordering::Equal),
                        None => truth(&cond) == Some(true),
                    };
                    if hit {
                        return result.evaluate(scope);
                    }
                }
                match else_result {
                    Some(e) => e.evaluate(scope),
                    None => Ok(Value::Null),
                }
            }
            Expression::Cast { expr, target } => Ok(cast_value(&expr.evaluate(scope)?, *target)),
            Expression::Like {
                expr,
                pattern,
                negated,
                case_insensitive,
            } => {
                let value = expr.evaluate(scope)?;
                let pattern = pattern.evaluate(scope)?;
                if value.is_null() || pattern.is_null() {
                    return Ok(Value::Null);
                }
                let (text, pattern) = (value.to_string(), pattern.to_string());
                let matched = if *case_insensitive {
                    like_match(&text.to_lowercase(), &pattern.to_lowercase())
                } else {
                    like_match(&text, &pattern)
                };
                Ok(Value::Bool(matched != *negated))
            }
            Expression::Between {
                expr,
                low,
                high,
                negated,
            } => {
                let value = expr.evaluate(scope)?;
                let low = low.evaluate(scope)?;
                let high = high.evaluate(scope)?;
                match (value.sql_cmp(&low), value.sql_cmp(&high)) {
                    (Some(lo), Some(hi)) => {
                        let inside = lo != Ordering::Less && hi != Ordering::Greater;
                        Ok(Value::Bool(inside != *negated))
                    }
                    _ => Ok(Value::Null),
                }
            }
            Expression::InList { expr, list, negated } => {
                let value = expr.evaluate(scope)?;
                if value.is_null() {
                    return Ok(Value::Null);
                }
                let mut saw_null = false;
                for item in list {
                    let item = item.evaluate(scope)?;
                    match value.sql_cmp(&item) {
                        Some(Ordering::Equal) => return Ok(Value::Bool(!*negated)),
                        None if item.is_null() => saw_null = true,
                        _ => {}
                    }
                }
                if saw_null {
                    Ok(Value::Null)
                } else {
                    Ok(Value::Bool(*negated))
                }
            }
            Expression::IsNull { expr, negated } => {
                let is_null = expr.evaluate(scope)?.is_null();
                Ok(Value::Bool(is_null != *negated))
            }
        }
    }
}

fn eval_binary(left: &Expression, op: BinaryOperator, right: &Expression, scope: &Scope<'_>) -> NlqResult<Value> {
    let l = left.evaluate(scope)?;

    // Three-valued AND/OR
    if matches!(op, BinaryOperator::And | BinaryOperator::Or) {
        let lt = truth(&l);
        if op == BinaryOperator::And && lt == Some(false) {
            return Ok(Value::Bool(false));
        }
        if op == BinaryOperator::Or && lt == Some(true) {
            return Ok(Value::Bool(true));
        }
        let rt = truth(&right.evaluate(scope)?);
        return Ok(match (op, lt, rt) {
            (BinaryOperator::And, _, Some(false)) => Value::Bool(false),
            (BinaryOperator::And, Some(true), Some(true)) => Value::Bool(true),
            (BinaryOperator::Or, _, Some(true)) => Value::Bool(true),
            (BinaryOperator::Or, Some(false), Some(false)) => Value::Bool(false),
            _ => Value::Null,
        });
    }

    let r = right.evaluate(scope)?;
    if l.is_null() || r.is_null() {
        return Ok(Value::Null);
    }

    let compare = |accept: fn(Ordering) -> bool| -> Value {
        l.sql_cmp(&r).map(|o| Value::Bool(accept(o))).unwrap_or(Value::Null)
    };

    match op {
        BinaryOperator::Eq => Ok(compare(|o| o == Ordering::Equal)),
        BinaryOperator::Ne => Ok(compare(|o| o != Ordering::Equal)),
        BinaryOperator::Lt => Ok(compare(|o| o == Ordering::Less)),
        BinaryOperator::Le => Ok(compare(|o| o != Ordering::Greater)),
        BinaryOperator::Gt => Ok(compare(|o| o == Ordering::Greater)),
        BinaryOperator::Ge => Ok(compare(|o| o != Ordering::Less)),
        BinaryOperator::Concat => Ok(Value::String(format!("{}{}", l, r))),
        BinaryOperator::Add | BinaryOperator::Subtract | BinaryOperator::Multiply | BinaryOperator::Modulo => {
            if let (Value::Int64(a), Value::Int64(b)) = (&l, &r) {
                let exact = match op {
                    BinaryOperator::Add => a.checked_add(*b),
                    BinaryOperator::Subtract => a.checked_sub(*b),
                    BinaryOperator::Multiply => a.checked_mul(*b),
                    _ if *b == 0 => return Ok(Value::Null),
                    _ => a.checked_rem(*b),
                };
                if let Some(v) = exact {
                    return Ok(Value::Int64(v));
                }
            }
            let (a, b) = numeric_pair(&l, &r, op)?;
            Ok(match op {
                BinaryOperator::Add => Value::Float64(a + b),
                BinaryOperator::Subtract => Value::Float64(a - b),
                BinaryOperator::Multiply => Value::Float64(a * b),
                _ if b == 0.0 => Value::Null,
                _ => Value::Float64(a % b),
            })
        }
        BinaryOperator::Divide => {
            let (a, b) = numeric_pair(&l, &r, op)?;
            if b == 0.0 {
                Ok(Value::Null)
            } else {
                Ok(Value::Float64(a / b))
            }
        }
        BinaryOperator::And | BinaryOperator::Or => Ok(Value::Null),
    }
}

fn numeric_pair(l: &Value, r: &Value, op: BinaryOperator) -> NlqResult<(f64, f64)> {
    match (l.as_f64(), r.as_f64()) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(NlqError::execution(format!("cannot apply {:?} to {} and {}", op, l, r))),
    }
}

fn eval_scalar(func: ScalarFunction, args: &[Expression], scope: &Scope<'_>) -> NlqResult<Value> {
    if func == ScalarFunction::Coalesce {
        for arg in args {
            let value = arg.evaluate(scope)?;
            if !value.is_null() {
                return Ok(value);
            }
        }
        return Ok(Value::Null);
    }

    let values = args.iter().map(|a| a.evaluate(scope)).collect::<NlqResult<Vec<_>>>()?;
    let first = values.first().cloned().unwrap_or(Value::Null);
    if func == ScalarFunction::NullIf {
        let second = values.get(1).cloned().unwrap_or(Value::Null);
        return Ok(if first.sql_cmp(&second) == Some(Ordering::Equal) {
            Value::Null
        } else {
            first
        });
    }
    if first.is_null() {
        return Ok(Value::Null);
    }

    match func {
        ScalarFunction::Lower => Ok(Value::String(first.to_string().to_lowercase())),
        ScalarFunction::Upper => Ok(Value::String(first.to_string().to_uppercase())),
        ScalarFunction::Trim => Ok(Value::String(first.to_string().trim().to_string())),
        ScalarFunction::Length => Ok(Value::Int64(first.to_string().chars().count() as i64)),
        ScalarFunction::Abs => match first {
            Value::Int64(i) => Ok(Value::Int64(i.saturating_abs())),
            Value::Float64(f) => Ok(Value::Float64(f.abs())),
            other => Err(NlqError::execution(format!("abs of non-number {}", other))),
        },
        ScalarFunction::Exp => first
            .as_f64()
            .map(|x| Value::Float64(x.exp()))
            .ok_or_else(|| NlqError::execution(format!("exp of non-number {}", first))),
        ScalarFunction::Round => {
            let digits = match values.get(1) {
                Some(v) if v.is_null() => return Ok(Value::Null),
                Some(v) => v
                    .as_i64()
                    .ok_or_else(|| NlqError::execution(format!("round digits must be an integer, got {}", v)))?,
                None => 0,
            };
            match first {
                Value::Int64(i) if digits >= 0 => Ok(Value::Int64(i)),
                other => {
                    let x = other
                        .as_f64()
                        .ok_or_else(|| NlqError::execution(format!("round of non-number {}", other)))?;
                    let factor = 10f64.powi(digits.clamp(-15, 15) as i32);
                    Ok(Value::Float64((x * factor).round() / factor))
                }
            }
        }
        ScalarFunction::Coalesce | ScalarFunction::NullIf => Ok(first),
    }
}

fn eval_aggregate(func: AggregateFunction, arg: Option<&Expression>, scope: &Scope<'_>) -> NlqResult<Value> {
    if !scope.grouped {
        return Err(NlqError::execution(format!("{:?} used outside an aggregate query", func)));
    }
    let Some(arg) = arg else {
        return Ok(Value::Int64(scope.rows.len() as i64));
    };

    let mut values = Vec::with_capacity(scope.rows.len());
    for row in scope.rows {
        let value = arg.evaluate(&Scope::row(scope.table, row))?;
        if !value.is_null() {
            values.push(value);
        }
    }

    match func {
        AggregateFunction::Count => Ok(Value::Int64(values.len() as i64)),
        AggregateFunction::Sum => {
            if values.is_empty() {
                return Ok(Value::Null);
            }
            if values.iter().all(|v| matches!(v, Value::Int64(_))) {
                let total = values.iter().filter_map(Value::as_i64).try_fold(0i64, |acc, v| acc.checked_add(v));
                if let Some(total) = total {
                    return Ok(Value::Int64(total));
                }
            }
            Ok(Value::Float64(values.iter().filter_map(Value::as_f64).sum()))
        }
        AggregateFunction::Avg => {
            let numbers: Vec<f64> = values.iter().filter_map(Value::as_f64).collect();
            if numbers.is_empty() {
                Ok(Value::Null)
            } else {
                Ok(Value::Float64(numbers.iter().sum::<f64>() / numbers.len() as f64))
            }
        }
        AggregateFunction::Min | AggregateFunction::Max => {
            let pick_max = func == AggregateFunction::Max;
            Ok(values
                .into_iter()
                .reduce(|best, v| {
                    let ord = v.sql_cmp(&best).unwrap_or_else(|| v.sort_cmp(&best));
                    let better = if pick_max {
                        ord == Ordering::Greater
                    } else {
                        ord == Ordering::Less
                    };
                    if better {
                        v
                    } else {
                        best
                    }
                })
                .unwrap_or(Value::Null))
        }
    }
}
