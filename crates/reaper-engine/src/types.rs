use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use reaper_common::Condition;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("HTTP Error: {status} - {body}")]
    HttpStatus { status: u16, body: String },

    #[error("invalid response body: {0}")]
    Parse(String),
}

impl EngineError {
    /// Transport failures and 5xx responses may succeed on a second attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            EngineError::Transport(_) => true,
            EngineError::HttpStatus { status, .. } => *status >= 500,
            EngineError::Parse(_) => false,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            EngineError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// A process instance as returned by the history query. Only `id` is
/// required; everything else the engine sends is ignored.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProcessInstance {
    pub id: String,

    #[serde(default)]
    pub process_definition_key: Option<String>,
    #[serde(default)]
    pub business_key: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

impl ProcessInstance {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            process_definition_key: None,
            business_key: None,
            state: None,
        }
    }

    pub fn with_definition(mut self, key: impl Into<String>) -> Self {
        self.process_definition_key = Some(key.into());
        self
    }

    pub fn with_business_key(mut self, key: impl Into<String>) -> Self {
        self.business_key = Some(key.into());
        self
    }

    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }
}

#[async_trait]
pub trait ProcessEngine: Send + Sync {
    /// Target shown in log lines, e.g. the REST root URL.
    fn describe(&self) -> String;

    async fn health(&self) -> Result<(), EngineError>;

    /// Ids of historic instances matching `condition`, in server order.
    async fn find_instance_ids(&self, condition: &Condition) -> Result<Vec<String>, EngineError>;

    async fn delete_instance(&self, id: &str) -> Result<(), EngineError>;
}
