// ---------------------------------------------------------------------------
// Error categories reported to the host as `errorType`
// ---------------------------------------------------------------------------

pub const ERR_PROTOCOL: &str = "ProtocolError";
pub const ERR_DECODE: &str = "DecodeError";
pub const ERR_HANDLER: &str = "HandlerError";
pub const ERR_REPORT: &str = "ReportError";
pub const ERR_TRANSPORT: &str = "TransportError";
pub const ERR_CONFIG: &str = "ConfigError";

// ---------------------------------------------------------------------------
// Main runtime error type
// ---------------------------------------------------------------------------

#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// The host answered a poll with something the runtime cannot use
    /// (missing request id header, non-success status).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The payload is not JSON, or a required field is absent or has the
    /// wrong type.
    #[error("decode error: {0}")]
    Decode(String),

    /// Record extraction or the per-record extension point failed.
    #[error("handler error: {message}")]
    Handler {
        message: String,
        #[source]
        source: Option<Box<RuntimeError>>,
    },

    /// Posting a success or error report back to the host failed.
    #[error("report error: {0}")]
    Report(String),

    /// The HTTP client could not complete a request at all.
    #[error("transport error: {0}")]
    Transport(String),

    /// Startup misconfiguration (missing runtime API address, unknown handler).
    #[error("config error: {0}")]
    Config(String),
}

impl RuntimeError {
    /// Build a handler error with no underlying cause.
    pub fn handler(message: impl Into<String>) -> Self {
        RuntimeError::Handler {
            message: message.into(),
            source: None,
        }
    }

    /// Build a handler error wrapping the failure that caused it.
    pub fn handler_caused_by(message: impl Into<String>, source: RuntimeError) -> Self {
        RuntimeError::Handler {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Build a decode error for a required field that is absent.
    pub fn missing_field(path: &str) -> Self {
        RuntimeError::Decode(format!("missing required field `{}`", path))
    }

    /// The category name reported to the host as `errorType`.
    pub fn error_type(&self) -> &'static str {
        match self {
            RuntimeError::Protocol(_) => ERR_PROTOCOL,
            RuntimeError::Decode(_) => ERR_DECODE,
            RuntimeError::Handler { .. } => ERR_HANDLER,
            RuntimeError::Report(_) => ERR_REPORT,
            RuntimeError::Transport(_) => ERR_TRANSPORT,
            RuntimeError::Config(_) => ERR_CONFIG,
        }
    }

    /// The message reported to the host as `errorMessage`.
    ///
    /// Handler errors include their cause so the host sees why the batch
    /// failed, not only which SNS message it came from.
    pub fn error_message(&self) -> String {
        match self {
            RuntimeError::Protocol(msg)
            | RuntimeError::Decode(msg)
            | RuntimeError::Report(msg)
            | RuntimeError::Transport(msg)
            | RuntimeError::Config(msg) => msg.clone(),
            RuntimeError::Handler {
                message,
                source: Some(source),
            } => format!("{}: {}", message, source.error_message()),
            RuntimeError::Handler {
                message,
                source: None,
            } => message.clone(),
        }
    }
}

impl From<serde_json::Error> for RuntimeError {
    fn from(err: serde_json::Error) -> Self {
        RuntimeError::Decode(err.to_string())
    }
}

#[cfg(feature = "reqwest-transport")]
impl From<reqwest::Error> for RuntimeError {
    fn from(err: reqwest::Error) -> Self {
        RuntimeError::Transport(err.to_string())
    }
}

/// Render an error and its `source()` chain on one line, outermost first.
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut rendered = err.to_string();
    let mut current = err.source();
    while let Some(cause) = current {
        rendered.push_str(": caused by: ");
        rendered.push_str(&cause.to_string());
        current = cause.source();
    }
    rendered
}

// ---------------------------------------------------------------------------
// Result type alias
// ---------------------------------------------------------------------------

pub type Result<T> = std::result::Result<T, RuntimeError>;
