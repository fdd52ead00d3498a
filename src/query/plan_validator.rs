//! Safety Validator - the read-only boundary in front of the executor.
//!
//! Every statement, compiled or oracle-proposed, passes here before it may run.

use crate::query::plan::Intent;
use regex::Regex;
use sqlparser::ast::Statement;
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;
use std::sync::OnceLock;
use thiserror::Error;

/// Mutating or administrative keywords that may never appear outside string literals
pub const DENYLIST: &[&str] = &[
    "INSERT", "UPDATE", "DELETE", "DROP", "ALTER", "CREATE", "ATTACH", "DETACH", "PRAGMA", "COPY", "EXPORT",
    "IMPORT", "INSTALL", "LOAD", "TRUNCATE", "GRANT", "REVOKE", "MERGE", "CALL", "EXEC", "EXECUTE", "VACUUM",
    "CHECKPOINT", "REPLACE", "UPSERT", "RENAME", "SET", "INTO",
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SafetyViolation {
    #[error("empty statement")]
    Empty,
    #[error("statement does not start with SELECT or WITH")]
    NotReadOnly,
    #[error("forbidden keyword {0}")]
    ForbiddenKeyword(String),
    #[error("more than one statement")]
    MultipleStatements,
    #[error("ranking query without GROUP BY")]
    MissingGroupBy,
    #[error("unparseable statement: {0}")]
    Unparseable(String),
    #[error("statement is not a query")]
    NotAQuery,
}

fn denylist_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let pattern = format!(r"(?i)\b({})\b", DENYLIST.join("|"));
        Regex::new(&pattern).expect("static regex")
    })
}

fn group_by_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bGROUP\s+BY\b").expect("static regex"))
}

/// Replace the contents of single-quoted literals with spaces so keyword scans
/// ignore titles such as 'Drop Zone'. Quote characters are kept.
pub fn mask_string_literals(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut in_literal = false;
    let mut chars = sql.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\'' {
            if in_literal && chars.peek() == Some(&'\'') {
                // escaped quote inside a literal
                chars.next();
                out.push_str("  ");
                continue;
            }
            in_literal = !in_literal;
            out.push(c);
        } else if in_literal {
            out.push(' ');
        } else {
            out.push(c);
        }
    }
    out
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SafetyValidator;

impl SafetyValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, sql: &str, intent: Intent) -> Result<(), SafetyViolation> {
        let trimmed = sql.trim();
        if trimmed.is_empty() {
            return Err(SafetyViolation::Empty);
        }
        let masked = mask_string_literals(trimmed);

        if masked.contains("--") || masked.contains("/*") {
            return Err(SafetyViolation::ForbiddenKeyword("comment".to_string()));
        }

        let first_word = masked
            .split(|c: char| c.is_whitespace() || c == '(')
            .find(|w| !w.is_empty())
            .unwrap_or("")
            .to_uppercase();
        if first_word != "SELECT" && first_word != "WITH" {
            return Err(SafetyViolation::NotReadOnly);
        }

        if let Some(m) = denylist_regex().find(&masked) {
            return Err(SafetyViolation::ForbiddenKeyword(m.as_str().to_uppercase()));
        }

        if masked.trim_end().trim_end_matches(';').contains(';') {
            return Err(SafetyViolation::MultipleStatements);
        }

        let statements = Parser::parse_sql(&GenericDialect {}, trimmed)
            .map_err(|e| SafetyViolation::Unparseable(e.to_string()))?;
        match statements.as_slice() {
            [Statement::Query(_)] => {}
            [_] => return Err(SafetyViolation::NotAQuery),
            _ => return Err(SafetyViolation::MultipleStatements),
        }

        if intent == Intent::Ranking && !group_by_regex().is_match(&masked) {
            return Err(SafetyViolation::MissingGroupBy);
        }
        Ok(())
    }
}
