/// Unified error type for the question-answering pipeline
/// Each variant maps to one failure category of a request
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum NlqError {
    /// Dataset errors: malformed snapshot, missing columns, arrow failures
    #[error("Dataset error: {message}")]
    Dataset {
        message: String,
        context: Option<String>,
    },

    /// IO errors: reading the CSV file
    #[error("IO error: {message}")]
    Io {
        message: String,
        path: Option<String>,
    },

    /// Plan errors: a plan that breaks the DSL invariants
    #[error("Invalid plan: {message}")]
    InvalidPlan {
        message: String,
        context: Option<String>,
    },

    /// Compile errors: the statement and its fallback both failed validation
    #[error("Compile error: {message}")]
    Compile {
        message: String,
        sql: Option<String>,
        context: Option<String>,
    },

    /// Execution errors: a statement the interpreter cannot run
    #[error("Execution error: {message}")]
    Execution {
        message: String,
        sql: Option<String>,
        context: Option<String>,
    },

    /// Oracle errors: never leave the gateway
    #[error("Oracle unavailable: {message}")]
    OracleUnavailable { message: String },
}

impl NlqError {
    pub fn dataset(message: impl Into<String>) -> Self {
        Self::Dataset {
            message: message.into(),
            context: None,
        }
    }

    pub fn io_with_path(message: impl Into<String>, path: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
            path: Some(path.into()),
        }
    }

    pub fn invalid_plan(message: impl Into<String>) -> Self {
        Self::InvalidPlan {
            message: message.into(),
            context: None,
        }
    }

    pub fn compile(message: impl Into<String>, sql: impl Into<String>) -> Self {
        Self::Compile {
            message: message.into(),
            sql: Some(sql.into()),
            context: None,
        }
    }

    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution {
            message: message.into(),
            sql: None,
            context: None,
        }
    }

    pub fn oracle_unavailable(message: impl Into<String>) -> Self {
        Self::OracleUnavailable {
            message: message.into(),
        }
    }

    /// Attach the statement text to an execution error
    pub fn with_sql(mut self, statement: impl Into<String>) -> Self {
        match &mut self {
            Self::Execution { sql, .. } | Self::Compile { sql, .. } => *sql = Some(statement.into()),
            _ => {}
        }
        self
    }

    /// Add context to an error
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        match &mut self {
            Self::Dataset { context: ctx, .. } => *ctx = Some(context.into()),
            Self::InvalidPlan { context: ctx, .. } => *ctx = Some(context.into()),
            Self::Compile { context: ctx, .. } => *ctx = Some(context.into()),
            Self::Execution { context: ctx, .. } => *ctx = Some(context.into()),
            _ => {}
        }
        self
    }

    /// Short category name used in logs and audit entries
    pub fn category(&self) -> &'static str {
        match self {
            Self::Dataset { .. } => "dataset",
            Self::Io { .. } => "io",
            Self::InvalidPlan { .. } => "invalid_plan",
            Self::Compile { .. } => "compile",
            Self::Execution { .. } => "execution",
            Self::OracleUnavailable { .. } => "oracle_unavailable",
        }
    }
}

impl From<anyhow::Error> for NlqError {
    fn from(err: anyhow::Error) -> Self {
        Self::Dataset {
            message: err.to_string(),
            context: None,
        }
    }
}

impl From<std::io::Error> for NlqError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
            path: None,
        }
    }
}

impl From<csv::Error> for NlqError {
    fn from(err: csv::Error) -> Self {
        Self::Dataset {
            message: err.to_string(),
            context: Some("csv".to_string()),
        }
    }
}

impl From<arrow::error::ArrowError> for NlqError {
    fn from(err: arrow::error::ArrowError) -> Self {
        Self::Dataset {
            message: err.to_string(),
            context: Some("arrow".to_string()),
        }
    }
}

/// Result type alias for pipeline operations
pub type NlqResult<T> = Result<T, NlqError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_sql_only_touches_statement_errors() {
        let err = NlqError::execution("unknown column").with_sql("SELECT x FROM games");
        match err {
            NlqError::Execution { sql, .. } => assert_eq!(sql.as_deref(), Some("SELECT x FROM games")),
            other => panic!("unexpected {:?}", other),
        }

        let err = NlqError::dataset("bad").with_sql("SELECT 1");
        assert_eq!(err.category(), "dataset");
    }

    #[test]
    fn test_display_includes_category_prefix() {
        let err = NlqError::compile("fallback rejected", "DROP TABLE games");
        assert_eq!(err.to_string(), "Compile error: fallback rejected");
    }
}
