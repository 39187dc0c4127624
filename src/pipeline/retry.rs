//! Single-shot retry around the answering pipeline.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::error::{AskError, Result};
use crate::pipeline::AnswerQuestion;

/// Phrase joining the original question and the failure description.
pub const RETRY_SUFFIX: &str = " When querying please consider the previous exception: ";

/// Maximum number of characters of the failure description carried into
/// the retry question.
pub const MAX_ERROR_CHARS: usize = 500;

/// Which attempt is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    FirstAttempt,
    /// Terminal: its outcome is returned as-is.
    RetryAttempt,
}

impl AttemptState {
    /// 1-based attempt number for logs.
    pub fn number(&self) -> u32 {
        match self {
            Self::FirstAttempt => 1,
            Self::RetryAttempt => 2,
        }
    }
}

/// The question one attempt runs with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryAttempt {
    pub question: String,
    pub error_context: Option<String>,
    pub state: AttemptState,
}

impl QueryAttempt {
    /// The first attempt, running the question verbatim.
    pub fn first(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            error_context: None,
            state: AttemptState::FirstAttempt,
        }
    }

    /// The retry attempt after `error`, carrying its truncated description.
    pub fn retry_after(&self, error: &AskError) -> Self {
        let context: String = error.detail().chars().take(MAX_ERROR_CHARS).collect();
        Self {
            question: retry_question(&self.question, &context),
            error_context: Some(context),
            state: AttemptState::RetryAttempt,
        }
    }
}

/// Builds the retry question from the original and the failure description.
///
/// The description is cut to [`MAX_ERROR_CHARS`] characters.
pub fn retry_question(original: &str, error_description: &str) -> String {
    let truncated: String = error_description.chars().take(MAX_ERROR_CHARS).collect();
    format!("{original}{RETRY_SUFFIX}{truncated}")
}

/// Runs the pipeline, and on failure runs it exactly once more with the
/// failure appended to the question.
#[derive(Clone)]
pub struct RetryOrchestrator {
    pipeline: Arc<dyn AnswerQuestion>,
}

impl RetryOrchestrator {
    pub fn new(pipeline: Arc<dyn AnswerQuestion>) -> Self {
        Self { pipeline }
    }

    /// Answers `question`; a failure of the retry attempt propagates.
    pub async fn execute(&self, question: &str) -> Result<String> {
        let first = QueryAttempt::first(question);

        match self.run(&first).await {
            Ok(answer) => Ok(answer),
            Err(err) => {
                warn!(
                    attempt = first.state.number(),
                    kind = err.kind(),
                    error = %err,
                    "Attempt failed, retrying with error context"
                );
                let retry = first.retry_after(&err);
                self.run(&retry).await
            }
        }
    }

    async fn run(&self, attempt: &QueryAttempt) -> Result<String> {
        let start = Instant::now();
        let result = self.pipeline.answer(&attempt.question).await;

        if result.is_ok() {
            info!(
                attempt = attempt.state.number(),
                duration_ms = start.elapsed().as_millis() as u64,
                "Question answered"
            );
        }

        result
    }
}
