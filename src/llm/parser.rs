//! Response parsing for LLM outputs.
//!
//! Extracts SQL from generation completions, the final answer from
//! summarization completions, and the database/table pick from routing
//! completions.

use regex::Regex;
use std::sync::LazyLock;

use crate::llm::prompt::{ANSWER_LABEL, SQL_QUERY_LABEL, SQL_RESULT_LABEL};

/// Label models sometimes prepend to the statement despite instructions.
const STRAY_QUERY_LABEL: &str = "Query:";

static DATABASE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?mi)^\W*database\s*==\s*([^\s,]+)").expect("valid database regex")
});

static QUALIFIED_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?mi)^\W*database\.table\s*==\s*([^\s.,]+)\.([^\s,]+)")
        .expect("valid database.table regex")
});

/// Database (and optionally table) named by a routing completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteAnswer {
    pub database: String,
    pub table: Option<String>,
}

/// Extracts the SQL statement from a generation completion.
///
/// Looks for SQL in the following formats:
/// - a fenced ```sql ... ``` or ``` ... ``` block
/// - the text after a `SQLQuery:` label
/// - the bare completion
///
/// Anything from `SQLResult:` on is ignored. A stray `Query:` label is
/// removed, backticks become double quotes and trailing semicolons are
/// dropped. Returns `None` when nothing remains.
pub fn extract_sql(completion: &str) -> Option<String> {
    let text = completion
        .split_once(SQL_RESULT_LABEL)
        .map_or(completion, |(before, _)| before);

    let candidate = extract_code_block(text, "sql")
        .or_else(|| extract_code_block(text, ""))
        .unwrap_or_else(|| {
            text.rsplit_once(SQL_QUERY_LABEL)
                .map_or(text, |(_, after)| after)
                .to_string()
        });

    let candidate = candidate.trim();
    let candidate = candidate
        .strip_prefix(STRAY_QUERY_LABEL)
        .unwrap_or(candidate);

    let sql = candidate
        .replace('`', "\"")
        .trim()
        .trim_end_matches(';')
        .trim_end()
        .to_string();

    (!sql.is_empty()).then_some(sql)
}

/// Extracts the final answer from a summarization completion.
///
/// Returns the text after the last `Answer:` label, or the whole
/// completion when the label is missing.
pub fn extract_answer(completion: &str) -> String {
    completion
        .rsplit_once(ANSWER_LABEL)
        .map_or(completion, |(_, answer)| answer)
        .trim()
        .to_string()
}

/// Parses the `database ==` and `database.table ==` lines of a routing
/// completion.
///
/// A `database.table` line also supplies the database when the plain
/// `database` line is missing. Returns `None` when neither line parses.
pub fn parse_route(completion: &str) -> Option<RouteAnswer> {
    let qualified = QUALIFIED_LINE
        .captures(completion)
        .map(|c| (clean_identifier(&c[1]), clean_identifier(&c[2])));
    let database = DATABASE_LINE
        .captures(completion)
        .map(|c| clean_identifier(&c[1]))
        .filter(|d| !d.is_empty());

    match (database, qualified) {
        (Some(database), Some((qualified_db, table))) => Some(RouteAnswer {
            table: (qualified_db == database && !table.is_empty()).then_some(table),
            database,
        }),
        (Some(database), None) => Some(RouteAnswer {
            database,
            table: None,
        }),
        (None, Some((database, table))) if !database.is_empty() => Some(RouteAnswer {
            database,
            table: (!table.is_empty()).then_some(table),
        }),
        _ => None,
    }
}

/// Strips quoting and trailing punctuation models wrap identifiers in.
fn clean_identifier(raw: &str) -> String {
    raw.trim_matches(|c: char| matches!(c, '"' | '\'' | '`' | '*' | '.' | ';'))
        .to_string()
}

/// Extracts content from a markdown code block with the specified language.
///
/// Pass an empty string for `lang` to match blocks without a language specifier.
fn extract_code_block(text: &str, lang: &str) -> Option<String> {
    let start_pattern = format!("```{lang}");

    let start_idx = text.find(&start_pattern)?;

    // Find the newline after the opening fence
    let content_start = text[start_idx + start_pattern.len()..]
        .find('\n')
        .map(|i| start_idx + start_pattern.len() + i + 1)?;

    // A generic fence followed by text is a language-specific block
    if lang.is_empty() {
        let after_fence = &text[start_idx + 3..content_start - 1];
        if !after_fence.trim().is_empty() {
            return None;
        }
    }

    let end_idx = text[content_start..].find("```")?;

    Some(text[content_start..content_start + end_idx].to_string())
}
