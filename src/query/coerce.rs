//! Dataset-wide coercion rules.
//!
//! Raw cells are strings; every typed field is parsed leniently and any value
//! that cannot be interpreted becomes null. Nothing here returns an error.
//! The same rules back `CAST`/`TRY_CAST` in the executor.

use crate::storage::value::Value;

/// Placeholder tokens treated as missing in every numeric column
pub const MISSING_TOKENS: &[&str] = &["", "n/a", "na", "nan", "null", "none", "-", "tbd"];

/// Sentinel used by the source data for a user score not yet determined
pub const USER_SCORE_SENTINEL: &str = "tbd";

pub fn is_missing_token(raw: &str) -> bool {
    let trimmed = raw.trim();
    MISSING_TOKENS.iter().any(|t| trimmed.eq_ignore_ascii_case(t))
}

/// Release year: blank, placeholder, non-numeric or fractional values become null
pub fn coerce_year(raw: &str) -> Option<i64> {
    coerce_integer(raw)
}

/// Floating point sales and critic scores
pub fn coerce_float(raw: &str) -> Option<f64> {
    if is_missing_token(raw) {
        return None;
    }
    let trimmed = raw.trim();
    let parsed = match trimmed.parse::<f64>() {
        Ok(v) => Some(v),
        // Decimal comma, e.g. "8,5"
        Err(_) if !trimmed.contains('.') && trimmed.matches(',').count() == 1 => {
            trimmed.replace(',', ".").parse::<f64>().ok()
        }
        Err(_) => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// User score on the 0-10 scale; the "tbd" sentinel becomes null
pub fn coerce_user_score(raw: &str) -> Option<f64> {
    if raw.trim().eq_ignore_ascii_case(USER_SCORE_SENTINEL) {
        return None;
    }
    coerce_float(raw)
}

/// Vote counts and years. Integral floats such as "2010.0" are accepted.
pub fn coerce_integer(raw: &str) -> Option<i64> {
    if is_missing_token(raw) {
        return None;
    }
    let trimmed = raw.trim();
    if let Ok(v) = trimmed.parse::<i64>() {
        return Some(v);
    }
    coerce_float(trimmed)
        .filter(|v| v.fract() == 0.0 && v.abs() < i64::MAX as f64)
        .map(|v| v as i64)
}

/// Free-text columns: trimmed, empty becomes null
pub fn coerce_text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Target of a CAST / TRY_CAST expression
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CastTarget {
    Integer,
    Double,
    Text,
    Boolean,
}

impl CastTarget {
    /// Map a SQL type name (as rendered by the parser) to a cast target
    pub fn from_sql_type(type_name: &str) -> Option<Self> {
        let upper = type_name.trim().to_uppercase();
        let base = upper.split('(').next().unwrap_or("").trim();
        match base {
            "INT" | "INTEGER" | "BIGINT" | "SMALLINT" | "TINYINT" | "INT64" | "INT4" | "INT8" | "HUGEINT" => {
                Some(CastTarget::Integer)
            }
            "DOUBLE" | "DOUBLE PRECISION" | "FLOAT" | "FLOAT4" | "FLOAT8" | "REAL" | "DECIMAL" | "NUMERIC" => {
                Some(CastTarget::Double)
            }
            "VARCHAR" | "TEXT" | "STRING" | "CHAR" | "CHARACTER VARYING" => Some(CastTarget::Text),
            "BOOLEAN" | "BOOL" => Some(CastTarget::Boolean),
            _ => None,
        }
    }
}

/// Cast with coercion semantics: failures yield NULL
pub fn cast_value(value: &Value, target: CastTarget) -> Value {
    match (value, target) {
        (Value::Null, _) => Value::Null,
        (Value::Int64(v), CastTarget::Integer) => Value::Int64(*v),
        (Value::Float64(v), CastTarget::Integer) => {
            if v.is_finite() {
                Value::Int64(v.trunc() as i64)
            } else {
                Value::Null
            }
        }
        (Value::String(s), CastTarget::Integer) => coerce_integer(s)
            .or_else(|| coerce_float(s).map(|f| f.trunc() as i64))
            .into(),
        (Value::Bool(b), CastTarget::Integer) => Value::Int64(i64::from(*b)),
        (Value::Int64(v), CastTarget::Double) => Value::Float64(*v as f64),
        (Value::Float64(v), CastTarget::Double) => Value::Float64(*v),
        (Value::String(s), CastTarget::Double) => coerce_float(s).into(),
        (Value::Bool(b), CastTarget::Double) => Value::Float64(if *b { 1.0 } else { 0.0 }),
        (Value::String(s), CastTarget::Text) => Value::String(s.clone()),
        (other, CastTarget::Text) => Value::String(other.to_string()),
        (Value::Bool(b), CastTarget::Boolean) => Value::Bool(*b),
        (Value::String(s), CastTarget::Boolean) => match s.trim().to_lowercase().as_str() {
            "true" | "t" | "1" | "yes" => Value::Bool(true),
            "false" | "f" | "0" | "no" => Value::Bool(false),
            _ => Value::Null,
        },
        (v, CastTarget::Boolean) => v.as_f64().map(|f| Value::Bool(f != 0.0)).unwrap_or(Value::Null),
    }
}
