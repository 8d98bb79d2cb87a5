//! Error types for subprocess and search operations.

use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while running the extraction/transcode pipeline
/// or the search backend.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("{0} not found in PATH")]
    ToolNotFound(&'static str),

    #[error("failed to spawn {tool}: {source}")]
    SpawnFailed {
        tool: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} exited with {}", exit_label(.exit_code))]
    StageFailed {
        tool: &'static str,
        exit_code: Option<i32>,
        /// Bounded tail of the stage's stderr, for logs only.
        stderr: String,
    },

    #[error("search query is empty")]
    EmptyQuery,

    #[error("no results from search backend")]
    NoResults,

    #[error("operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse search output: {0}")]
    JsonParse(#[from] serde_json::Error),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        // On unix a missing code means the process died to a signal.
        None => "a signal".to_string(),
    }
}

impl MediaError {
    /// Short, stable reason code for API error envelopes.
    pub fn reason_code(&self) -> &'static str {
        match self {
            MediaError::ToolNotFound(_) | MediaError::SpawnFailed { .. } => "backend_unavailable",
            MediaError::StageFailed { .. } => "stage_failed",
            MediaError::EmptyQuery => "empty_query",
            MediaError::NoResults => "no_results",
            MediaError::Timeout(_) => "timeout",
            MediaError::Io(_) => "io_error",
            MediaError::JsonParse(_) => "bad_backend_output",
        }
    }
}
