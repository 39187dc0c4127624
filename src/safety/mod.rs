//! Read-only guard for generated SQL.
//!
//! Parses SQL and classifies statements so that only reads (queries,
//! EXPLAIN, SHOW, DESCRIBE) reach a store.

mod parser;

pub use parser::{classify_sql, SqlClassifier};

use std::fmt;

use crate::error::{AskError, Result};

/// The type of SQL statement detected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementType {
    Select,
    Explain,
    Show,
    Describe,
    Insert,
    Update,
    Delete,
    Merge,
    Drop,
    Truncate,
    Alter,
    Create,
    Grant,
    /// More than one statement; contains the first offending type.
    Multiple(Box<StatementType>),
    /// Statement type could not be determined.
    Unknown,
}

impl fmt::Display for StatementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Select => write!(f, "SELECT"),
            Self::Explain => write!(f, "EXPLAIN"),
            Self::Show => write!(f, "SHOW"),
            Self::Describe => write!(f, "DESCRIBE"),
            Self::Insert => write!(f, "INSERT"),
            Self::Update => write!(f, "UPDATE"),
            Self::Delete => write!(f, "DELETE"),
            Self::Merge => write!(f, "MERGE"),
            Self::Drop => write!(f, "DROP"),
            Self::Truncate => write!(f, "TRUNCATE"),
            Self::Alter => write!(f, "ALTER"),
            Self::Create => write!(f, "CREATE"),
            Self::Grant => write!(f, "GRANT"),
            Self::Multiple(inner) => write!(f, "Multiple ({})", inner),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Result of classifying a SQL string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Whether every statement only reads data.
    pub read_only: bool,
    /// The statement type, or the first offending one.
    pub statement_type: StatementType,
    /// Whether the verdict came from the keyword fallback rather than a parse.
    pub parsed: bool,
}

impl Classification {
    pub fn read_only(statement_type: StatementType) -> Self {
        Self {
            read_only: true,
            statement_type,
            parsed: true,
        }
    }

    pub fn writes(statement_type: StatementType) -> Self {
        Self {
            read_only: false,
            statement_type,
            parsed: true,
        }
    }
}

/// Fails with a query error unless `sql` only reads data.
///
/// The error feeds the retry path like any other execution failure.
pub fn ensure_read_only(sql: &str) -> Result<()> {
    let classification = classify_sql(sql);
    if classification.read_only {
        Ok(())
    } else {
        Err(AskError::query(format!(
            "Only read-only statements may be executed, got {}",
            classification.statement_type
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statement_type_display() {
        assert_eq!(StatementType::Select.to_string(), "SELECT");
        assert_eq!(StatementType::Delete.to_string(), "DELETE");
        assert_eq!(
            StatementType::Multiple(Box::new(StatementType::Drop)).to_string(),
            "Multiple (DROP)"
        );
    }

    #[test]
    fn test_ensure_read_only_accepts_select() {
        assert!(ensure_read_only("SELECT SUM(amount) FROM orders").is_ok());
    }

    #[test]
    fn test_ensure_read_only_rejects_writes_as_query_error() {
        let err = ensure_read_only("DELETE FROM orders").unwrap_err();
        assert!(matches!(err, AskError::Query(_)));
        assert_eq!(
            err.detail(),
            "Only read-only statements may be executed, got DELETE"
        );
    }
}
