//! Error types for configuration, record store access, and notification.

/// A required setting is missing or malformed.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is not set (add it to the environment before running this command)")]
    Missing(&'static str),

    #[error("{name} has an invalid value '{value}': {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Errors from a single call against the record store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    /// The open API answered with a non-zero code.
    #[error("API error {code}: {msg}")]
    Api { code: i64, msg: String },

    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Fetching a table failed; nothing fetched from it is kept.
#[derive(Debug, thiserror::Error)]
#[error("failed to fetch records from table {table}: {source}")]
pub struct FetchError {
    pub table: String,
    #[source]
    pub source: StoreError,
}

/// Writing aggregates back to a table failed.
#[derive(Debug, thiserror::Error)]
#[error("failed to update record {record_id} in table {table}: {source}")]
pub struct WriteError {
    pub table: String,
    pub record_id: String,
    #[source]
    pub source: StoreError,
}

/// Webhook delivery failed. Never fatal for a run.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("no webhook URL configured (set LARK_WEBHOOK_URL)")]
    NotConfigured,

    #[error("webhook request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("webhook returned HTTP {0}")]
    Status(u16),
}

/// Anything that ends a run with a non-zero exit code.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error(transparent)]
    Client(#[from] crate::client::ClientInitError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
