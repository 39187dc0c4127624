//! Store schema types for glue-ask.
//!
//! Represents the tables a store exposes and renders them as the
//! `table_info` block of the SQL generation prompt.

use serde::{Deserialize, Serialize};

/// The tables visible to a store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schema {
    /// All tables in the schema.
    pub tables: Vec<Table>,
}

impl Schema {
    /// Creates a new empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Formats the schema for inclusion in an LLM prompt.
    ///
    /// Every table becomes a `CREATE TABLE` statement with double-quoted
    /// identifiers; tables are separated by a blank line.
    pub fn format_for_llm(&self) -> String {
        self.tables
            .iter()
            .map(Table::create_statement)
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Returns the table with the given name, if present.
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name.eq_ignore_ascii_case(name))
    }
}

/// Represents a table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Table {
    /// Table name.
    pub name: String,

    /// Columns in the table.
    pub columns: Vec<Column>,
}

impl Table {
    /// Creates a new table with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    /// Adds a column.
    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    fn create_statement(&self) -> String {
        let columns = self
            .columns
            .iter()
            .map(|c| {
                let not_null = if c.is_nullable { "" } else { " NOT NULL" };
                format!("\t\"{}\" {}{}", c.name, c.data_type, not_null)
            })
            .collect::<Vec<_>>()
            .join(",\n");
        format!("CREATE TABLE \"{}\" (\n{}\n)", self.name, columns)
    }
}

/// Represents a column in a table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Column {
    /// Column name.
    pub name: String,

    /// Data type (e.g., "bigint", "varchar").
    pub data_type: String,

    /// Whether the column allows NULL values.
    pub is_nullable: bool,
}

impl Column {
    /// Creates a new nullable column with the given name and data type.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            is_nullable: true,
        }
    }

    /// Sets whether the column is nullable.
    pub fn nullable(self, nullable: bool) -> Self {
        Self {
            is_nullable: nullable,
            ..self
        }
    }
}
