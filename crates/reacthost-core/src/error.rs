//! Errors - エラー型
//!
//! - `HostError`: what the engine reports to its caller.
//! - `AppError`: what application callbacks report to the engine. The engine
//!   logs these (action handlers, timers) or wraps them (`start`).

use std::fmt;

use thiserror::Error;

use crate::ports::{ChatError, StorageError};

#[derive(Debug, Error)]
pub enum HostError {
    #[error("engine is stopping")]
    Stopping,

    #[error("application `{app_id}` failed to start: {source}")]
    StartFailed {
        app_id: String,
        #[source]
        source: AppError,
    },

    #[error("application `{0}` exited during start")]
    ExitedDuringStart(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Error returned by an application callback.
#[derive(Debug)]
pub struct AppError {
    message: String,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{}: {}", self.message, source),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

impl From<ChatError> for AppError {
    fn from(err: ChatError) -> Self {
        Self::with_source("chat request failed", err)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source("state encoding failed", err)
    }
}
