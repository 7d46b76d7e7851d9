//! Per-invocation context and the log sink handed to handlers.

use crate::config::FunctionMetadata;
use crate::transport::{
    InvocationRequest, HEADER_CLIENT_CONTEXT, HEADER_COGNITO_IDENTITY, HEADER_DEADLINE_MS,
    HEADER_INVOKED_FUNCTION_ARN, HEADER_TRACE_ID,
};
use chrono::{DateTime, Utc};
use std::fmt::Debug;
use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

// ---------------------------------------------------------------------------
// Log sinks
// ---------------------------------------------------------------------------

/// Destination for the raw text a handler logs while processing an invocation.
///
/// Messages are written as given; callers include their own line endings.
pub trait LogSink: Send + Sync + Debug {
    /// Write raw bytes.
    fn log_bytes(&self, message: &[u8]);

    /// Write text.
    fn log(&self, message: &str) {
        self.log_bytes(message.as_bytes());
    }
}

/// A cloneable, type-erased log sink handle.
pub type DynLogSink = Arc<dyn LogSink>;

/// Writes straight to the process's standard output, which the host captures.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl LogSink for StdoutSink {
    fn log_bytes(&self, message: &[u8]) {
        let mut out = std::io::stdout().lock();
        // A closed stdout must not fail the invocation.
        let _ = out.write_all(message);
        let _ = out.flush();
    }
}

/// Buffers everything logged in memory.
///
/// Clones share the same buffer, so a test can keep one handle and give
/// another to the runtime.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything logged so far, lossily decoded as UTF-8.
    pub fn contents(&self) -> String {
        let buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&buffer).into_owned()
    }

    /// Logged text split into lines, without terminators.
    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(String::from).collect()
    }

    /// Drop everything logged so far.
    pub fn clear(&self) {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl LogSink for MemorySink {
    fn log_bytes(&self, message: &[u8]) {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(message);
    }
}

// ---------------------------------------------------------------------------
// Invocation context
// ---------------------------------------------------------------------------

/// Read-only metadata about the invocation being processed.
///
/// Built fresh for every invocation from the request id, the headers of the
/// poll response, and the process-wide [`FunctionMetadata`]. Fields the host
/// did not provide read as empty or `None`; none of them is an error.
#[derive(Debug)]
pub struct InvocationContext {
    request_id: String,
    metadata: Arc<FunctionMetadata>,
    logger: DynLogSink,
    invoked_function_arn: String,
    deadline: Option<DateTime<Utc>>,
    trace_id: Option<String>,
    client_context: Option<String>,
    identity: Option<String>,
}

impl InvocationContext {
    /// Create a context that carries only a request id.
    pub fn new(
        request_id: impl Into<String>,
        metadata: Arc<FunctionMetadata>,
        logger: DynLogSink,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            metadata,
            logger,
            invoked_function_arn: String::new(),
            deadline: None,
            trace_id: None,
            client_context: None,
            identity: None,
        }
    }

    /// Create a context from a polled invocation, picking up the optional
    /// metadata headers the host sends alongside the request id.
    pub fn from_request(
        request: &InvocationRequest,
        metadata: Arc<FunctionMetadata>,
        logger: DynLogSink,
    ) -> Self {
        let deadline = request
            .header(HEADER_DEADLINE_MS)
            .and_then(|v| v.trim().parse::<i64>().ok())
            .and_then(DateTime::from_timestamp_millis);

        Self {
            invoked_function_arn: request
                .header(HEADER_INVOKED_FUNCTION_ARN)
                .unwrap_or_default()
                .to_string(),
            deadline,
            trace_id: request.header(HEADER_TRACE_ID).map(String::from),
            client_context: request.header(HEADER_CLIENT_CONTEXT).map(String::from),
            identity: request.header(HEADER_COGNITO_IDENTITY).map(String::from),
            ..Self::new(request.request_id.clone(), metadata, logger)
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn logger(&self) -> &dyn LogSink {
        self.logger.as_ref()
    }

    pub fn function_name(&self) -> &str {
        &self.metadata.function_name
    }

    pub fn function_version(&self) -> &str {
        &self.metadata.function_version
    }

    pub fn log_group_name(&self) -> &str {
        &self.metadata.log_group_name
    }

    pub fn log_stream_name(&self) -> &str {
        &self.metadata.log_stream_name
    }

    pub fn memory_limit_mb(&self) -> u32 {
        self.metadata.memory_limit_mb
    }

    /// ARN used to invoke the function; empty when the host did not send one.
    pub fn invoked_function_arn(&self) -> &str {
        &self.invoked_function_arn
    }

    /// Wall-clock deadline for this invocation, if the host sent one.
    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.deadline
    }

    /// Time left before the deadline. Zero when there is no deadline or it
    /// has already passed.
    pub fn remaining_time(&self) -> Duration {
        self.deadline
            .and_then(|deadline| (deadline - Utc::now()).to_std().ok())
            .unwrap_or(Duration::ZERO)
    }

    pub fn trace_id(&self) -> Option<&str> {
        self.trace_id.as_deref()
    }

    /// Raw client context header, untouched.
    pub fn client_context(&self) -> Option<&str> {
        self.client_context.as_deref()
    }

    /// Raw identity header, untouched.
    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }
}
