//! SQL parsing and classification logic.
//!
//! Uses sqlparser-rs with the generic dialect, which accepts the
//! double-quoted identifiers and ANSI syntax shared by Athena and
//! PostgreSQL. SQL the parser rejects falls back to a keyword check.

use sqlparser::ast::{Query, Select, SetExpr, Statement, TableFactor, TableWithJoins};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;
use tracing::debug;

use super::{Classification, StatementType};

/// Leading keywords accepted when the statement cannot be parsed.
const READ_KEYWORDS: &[&str] = &["SELECT", "WITH", "SHOW", "DESCRIBE", "DESC", "EXPLAIN", "VALUES"];

/// Keywords that mark a write anywhere in an unparseable statement.
const WRITE_KEYWORDS: &[&str] = &[
    "INSERT", "UPDATE", "DELETE", "MERGE", "DROP", "TRUNCATE", "ALTER", "CREATE", "GRANT",
    "REVOKE", "UNLOAD",
];

/// SQL classifier that parses and classifies SQL queries.
#[derive(Debug, Default)]
pub struct SqlClassifier {
    dialect: GenericDialect,
}

impl SqlClassifier {
    /// Creates a new SQL classifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Classifies a SQL string.
    ///
    /// If the SQL cannot be parsed, the leading keyword decides and any
    /// write keyword in the text rejects it.
    pub fn classify(&self, sql: &str) -> Classification {
        match Parser::parse_sql(&self.dialect, sql) {
            Ok(statements) => classify_statements(&statements),
            Err(e) => {
                debug!(error = %e, "SQL did not parse, using keyword check");
                classify_by_keywords(sql)
            }
        }
    }
}

/// Convenience function to classify SQL without creating a classifier instance.
pub fn classify_sql(sql: &str) -> Classification {
    SqlClassifier::new().classify(sql)
}

fn classify_statements(statements: &[Statement]) -> Classification {
    let Some(first) = statements.first() else {
        return Classification::writes(StatementType::Unknown);
    };

    if statements.len() == 1 {
        return classify_statement(first);
    }

    // Multiple statements: the first write decides
    let offending = statements
        .iter()
        .map(classify_statement)
        .find(|c| !c.read_only);

    match offending {
        Some(c) => Classification::writes(StatementType::Multiple(Box::new(c.statement_type))),
        None => Classification::read_only(StatementType::Multiple(Box::new(StatementType::Select))),
    }
}

/// Classifies a single parsed statement.
fn classify_statement(statement: &Statement) -> Classification {
    match statement {
        // Query: may contain data-modifying CTEs, so recurse
        Statement::Query(query) => classify_query(query),
        Statement::Explain {
            analyze, statement, ..
        } => {
            // EXPLAIN ANALYZE executes the inner statement
            if *analyze && !classify_statement(statement).read_only {
                Classification::writes(StatementType::Explain)
            } else {
                Classification::read_only(StatementType::Explain)
            }
        }
        Statement::ExplainTable { .. } => Classification::read_only(StatementType::Describe),
        Statement::ShowTables { .. }
        | Statement::ShowColumns { .. }
        | Statement::ShowCreate { .. }
        | Statement::ShowFunctions { .. }
        | Statement::ShowVariable { .. } => Classification::read_only(StatementType::Show),

        Statement::Insert { .. } => Classification::writes(StatementType::Insert),
        Statement::Update { .. } => Classification::writes(StatementType::Update),
        Statement::Delete { .. } => Classification::writes(StatementType::Delete),
        Statement::Merge { .. } => Classification::writes(StatementType::Merge),
        Statement::Drop { .. } => Classification::writes(StatementType::Drop),
        Statement::Truncate { .. } => Classification::writes(StatementType::Truncate),
        Statement::AlterTable { .. } | Statement::AlterView { .. } => {
            Classification::writes(StatementType::Alter)
        }
        Statement::CreateTable { .. }
        | Statement::CreateView { .. }
        | Statement::CreateSchema { .. }
        | Statement::CreateDatabase { .. } => Classification::writes(StatementType::Create),
        Statement::Grant { .. } | Statement::Revoke { .. } => {
            Classification::writes(StatementType::Grant)
        }

        _ => Classification::writes(StatementType::Unknown),
    }
}

/// Classifies a Query by recursively inspecting CTEs and the body.
fn classify_query(query: &Query) -> Classification {
    if let Some(with) = &query.with {
        for cte in &with.cte_tables {
            let classification = classify_query(&cte.query);
            if !classification.read_only {
                return classification;
            }
        }
    }

    classify_set_expr(&query.body)
}

/// Classifies a SetExpr, detecting mutations and recursing into nested queries.
fn classify_set_expr(set_expr: &SetExpr) -> Classification {
    match set_expr {
        SetExpr::Query(query) => classify_query(query),
        SetExpr::Select(select) => classify_select(select),
        SetExpr::SetOperation { left, right, .. } => {
            let left = classify_set_expr(left);
            if left.read_only {
                classify_set_expr(right)
            } else {
                left
            }
        }
        SetExpr::Values(_) | SetExpr::Table(_) => {
            Classification::read_only(StatementType::Select)
        }
        // Data-modifying bodies (INSERT/UPDATE inside a CTE)
        SetExpr::Insert(_) => Classification::writes(StatementType::Insert),
        _ => Classification::writes(StatementType::Update),
    }
}

/// Classifies a Select by checking its FROM clause for subqueries.
fn classify_select(select: &Select) -> Classification {
    select
        .from
        .iter()
        .map(classify_table_with_joins)
        .find(|c| !c.read_only)
        .unwrap_or_else(|| Classification::read_only(StatementType::Select))
}

/// Classifies a TableWithJoins, checking the main relation and all joins.
fn classify_table_with_joins(twj: &TableWithJoins) -> Classification {
    std::iter::once(&twj.relation)
        .chain(twj.joins.iter().map(|join| &join.relation))
        .map(classify_table_factor)
        .find(|c| !c.read_only)
        .unwrap_or_else(|| Classification::read_only(StatementType::Select))
}

/// Classifies a TableFactor, recursing into derived tables (subqueries).
fn classify_table_factor(factor: &TableFactor) -> Classification {
    match factor {
        TableFactor::Derived { subquery, .. } => classify_query(subquery),
        TableFactor::NestedJoin {
            table_with_joins, ..
        } => classify_table_with_joins(table_with_joins),
        _ => Classification::read_only(StatementType::Select),
    }
}

/// Keyword fallback for SQL the parser rejects.
fn classify_by_keywords(sql: &str) -> Classification {
    let upper = sql.to_uppercase();
    let words: Vec<&str> = upper
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|w| !w.is_empty())
        .collect();

    let statement_type = match words.first() {
        Some(&"SELECT") | Some(&"WITH") | Some(&"VALUES") => StatementType::Select,
        Some(&"SHOW") => StatementType::Show,
        Some(&"DESCRIBE") | Some(&"DESC") => StatementType::Describe,
        Some(&"EXPLAIN") => StatementType::Explain,
        _ => StatementType::Unknown,
    };

    let leading_ok = words.first().is_some_and(|w| READ_KEYWORDS.contains(w));
    let has_write = words.iter().any(|w| WRITE_KEYWORDS.contains(w));

    Classification {
        read_only: leading_ok && !has_write,
        statement_type,
        parsed: false,
    }
}
