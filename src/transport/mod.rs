#[cfg(feature = "reqwest-transport")]
pub(crate) mod http;

#[cfg(feature = "reqwest-transport")]
pub use self::http::HttpRuntimeApi;

use crate::errors::RuntimeError;
use crate::outcome::ErrorReport;
use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Header carrying the id every report for an invocation must reference.
pub const HEADER_REQUEST_ID: &str = "Lambda-Runtime-Aws-Request-Id";
pub const HEADER_DEADLINE_MS: &str = "Lambda-Runtime-Deadline-Ms";
pub const HEADER_INVOKED_FUNCTION_ARN: &str = "Lambda-Runtime-Invoked-Function-Arn";
pub const HEADER_TRACE_ID: &str = "Lambda-Runtime-Trace-Id";
pub const HEADER_CLIENT_CONTEXT: &str = "Lambda-Runtime-Client-Context";
pub const HEADER_COGNITO_IDENTITY: &str = "Lambda-Runtime-Cognito-Identity";

/// Header and fixed value sent with every error report.
pub const HEADER_FUNCTION_ERROR_TYPE: &str = "Lambda-Runtime-Function-Error-Type";
pub const FUNCTION_ERROR_TYPE: &str = "RuntimeException";

/// Body of every success report. No handler return value is forwarded.
pub const SUCCESS_BODY: &str = "null";

/// A boxed future returned by [`RuntimeApi`] methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

// ---------------------------------------------------------------------------
// Invocation request
// ---------------------------------------------------------------------------

/// One unit of work handed out by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationRequest {
    /// Id used to correlate the outcome report with this invocation.
    pub request_id: String,
    /// Raw event payload.
    pub body: Vec<u8>,
    /// Response headers, keyed by lowercase name.
    pub headers: HashMap<String, String>,
}

impl InvocationRequest {
    /// Build a request from the parts of a poll response.
    ///
    /// Fails with [`RuntimeError::Protocol`] when the request id header is
    /// missing or blank, since nothing can be reported without it.
    pub fn from_parts(headers: HashMap<String, String>, body: Vec<u8>) -> crate::Result<Self> {
        let headers: HashMap<String, String> = headers
            .into_iter()
            .map(|(name, value)| (name.to_ascii_lowercase(), value))
            .collect();

        let request_id = headers
            .get(&HEADER_REQUEST_ID.to_ascii_lowercase())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                RuntimeError::Protocol(format!("missing {} header", HEADER_REQUEST_ID))
            })?;

        Ok(Self {
            request_id,
            body,
            headers,
        })
    }

    /// Look up a response header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// Runtime API
// ---------------------------------------------------------------------------

/// The host's invocation protocol.
///
/// This trait is object-safe and uses `Pin<Box<dyn Future>>` for async
/// support. The default implementation, [`HttpRuntimeApi`], speaks HTTP via
/// reqwest (enabled via the `reqwest-transport` feature).
///
/// # Example
///
/// ```rust,no_run
/// use s3_notify_runtime::transport::{BoxFuture, InvocationRequest, RuntimeApi};
/// use s3_notify_runtime::ErrorReport;
///
/// #[derive(Debug)]
/// struct Replay;
///
/// impl RuntimeApi for Replay {
///     fn next_invocation(&self) -> BoxFuture<'_, s3_notify_runtime::Result<InvocationRequest>> {
///         Box::pin(async move { todo!() })
///     }
///
///     fn post_response<'a>(&'a self, _request_id: &'a str) -> BoxFuture<'a, s3_notify_runtime::Result<()>> {
///         Box::pin(async move { Ok(()) })
///     }
///
///     fn post_error<'a>(
///         &'a self,
///         _request_id: &'a str,
///         _report: &'a ErrorReport,
///     ) -> BoxFuture<'a, s3_notify_runtime::Result<()>> {
///         Box::pin(async move { Ok(()) })
///     }
/// }
/// ```
pub trait RuntimeApi: Send + Sync + Debug {
    /// Block until the host hands out the next invocation.
    ///
    /// There is no client-side timeout; the host's long poll governs.
    fn next_invocation(&self) -> BoxFuture<'_, crate::Result<InvocationRequest>>;

    /// Report that the invocation succeeded, with a `null` body.
    fn post_response<'a>(&'a self, request_id: &'a str) -> BoxFuture<'a, crate::Result<()>>;

    /// Report that the invocation failed.
    fn post_error<'a>(
        &'a self,
        request_id: &'a str,
        report: &'a ErrorReport,
    ) -> BoxFuture<'a, crate::Result<()>>;
}

/// A cloneable, type-erased runtime API handle.
pub type DynRuntimeApi = Arc<dyn RuntimeApi>;
