//! Question answering pipeline.
//!
//! Resolves a question to a channel, turns it into SQL against that
//! channel's store, summarizes the rows, and retries once with the failure
//! appended to the question.

mod channel;
mod engine;
mod retry;

pub use channel::{ChannelDecision, ChannelResolver, Route, StoreRegistry, STATIC_CHANNEL_ID};
pub use engine::SqlQueryEngine;
pub use retry::{
    retry_question, AttemptState, QueryAttempt, RetryOrchestrator, MAX_ERROR_CHARS, RETRY_SUFFIX,
};

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{AskError, Result};

/// How the routing completion is turned into a channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutingMode {
    /// The completion is logged and the single default channel is used.
    #[default]
    Static,
    /// The completion's `database ==` lines select a registered store.
    Parsed,
}

impl RoutingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Parsed => "parsed",
        }
    }
}

impl FromStr for RoutingMode {
    type Err = AskError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "static" => Ok(Self::Static),
            "parsed" => Ok(Self::Parsed),
            _ => Err(AskError::config(format!("Unknown routing mode: {s}"))),
        }
    }
}

impl fmt::Display for RoutingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One end-to-end attempt at answering a question.
///
/// Implemented by [`Pipeline`]; the retry orchestrator only sees this seam.
#[async_trait]
pub trait AnswerQuestion: Send + Sync {
    async fn answer(&self, question: &str) -> Result<String>;
}

/// Channel resolution followed by SQL generation, execution and summary.
#[derive(Clone)]
pub struct Pipeline {
    resolver: ChannelResolver,
    engine: SqlQueryEngine,
}

impl Pipeline {
    pub fn new(resolver: ChannelResolver, engine: SqlQueryEngine) -> Self {
        Self { resolver, engine }
    }
}

#[async_trait]
impl AnswerQuestion for Pipeline {
    async fn answer(&self, question: &str) -> Result<String> {
        let decision = self.resolver.resolve(question).await?;
        self.engine.run(question, &decision).await
    }
}
