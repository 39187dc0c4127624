//! SQL generation, execution and summarization.

use std::time::Instant;

use tracing::{debug, info};

use crate::error::{AskError, Result};
use crate::llm::prompt::{build_messages, build_sql_prompt, build_summary_prompt, SQL_RESULT_LABEL};
use crate::llm::{extract_answer, extract_sql, LlmHandle};
use crate::pipeline::ChannelDecision;
use crate::safety::ensure_read_only;

/// Turns a question into SQL, runs it on the decided store and phrases
/// the rows as an answer.
#[derive(Clone)]
pub struct SqlQueryEngine {
    llm: LlmHandle,
}

impl SqlQueryEngine {
    pub fn new(llm: LlmHandle) -> Self {
        Self { llm }
    }

    /// Runs generate, execute and summarize in sequence.
    ///
    /// Any stage failure ends the run; callers do not learn which stage failed
    /// beyond the error variant.
    pub async fn run(&self, question: &str, decision: &ChannelDecision) -> Result<String> {
        let store = &decision.store;
        let schema = store.introspect_schema().await?;
        let prompt = build_sql_prompt(store.dialect(), &schema.format_for_llm(), question);

        // Generate
        let start = Instant::now();
        let stop = format!("\n{SQL_RESULT_LABEL}");
        let completion = self
            .llm
            .complete_with_stop(&build_messages(prompt.as_str()), &[stop.as_str()])
            .await?;
        let sql = extract_sql(&completion)
            .ok_or_else(|| AskError::query("The model did not produce a SQL query"))?;
        debug!(
            channel = %decision.channel_id,
            sql = %sql,
            sql_len = sql.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Generated SQL"
        );

        // Execute
        ensure_read_only(&sql)?;
        let result = store.execute_query(&sql).await?;
        info!(
            channel = %decision.channel_id,
            row_count = result.row_count,
            truncated = result.was_truncated,
            duration_ms = result.execution_time.as_millis() as u64,
            "Executed query"
        );

        // Summarize
        let summary_prompt = build_summary_prompt(&prompt, &sql, &result.format_for_llm());
        let completion = self.llm.complete(&build_messages(summary_prompt)).await?;

        Ok(extract_answer(&completion))
    }
}
