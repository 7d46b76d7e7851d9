use crate::config::{FunctionMetadata, RuntimeConfig};
use crate::context::{DynLogSink, InvocationContext, StdoutSink};
use crate::errors::{error_chain, RuntimeError};
use crate::event::EventDecoder;
use crate::handler::Handler;
use crate::outcome::OutcomeReport;
use crate::transport::{DynRuntimeApi, InvocationRequest};
use std::future::Future;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Runtime builder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Runtime`].
pub struct RuntimeBuilder<H> {
    handler: H,
    config: Option<RuntimeConfig>,
    api: Option<DynRuntimeApi>,
    metadata: FunctionMetadata,
    decoder: EventDecoder,
    logger: DynLogSink,
}

impl<H: Handler> RuntimeBuilder<H> {
    fn new(handler: H) -> Self {
        Self {
            handler,
            config: None,
            api: None,
            metadata: FunctionMetadata::default(),
            decoder: EventDecoder::new(),
            logger: Arc::new(StdoutSink),
        }
    }

    /// Talk to the runtime API at the configured address over HTTP.
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use a custom protocol implementation instead of HTTP.
    pub fn api(mut self, api: DynRuntimeApi) -> Self {
        self.api = Some(api);
        self
    }

    /// Set the function metadata exposed through every context.
    pub fn metadata(mut self, metadata: FunctionMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Set the sink handed to handlers through the context. Defaults to stdout.
    pub fn logger(mut self, logger: DynLogSink) -> Self {
        self.logger = logger;
        self
    }

    /// Build the runtime.
    pub fn build(self) -> crate::Result<Runtime<H>> {
        let api = match (self.api, self.config) {
            (Some(api), _) => api,
            #[cfg(feature = "reqwest-transport")]
            (None, Some(config)) => {
                Arc::new(crate::transport::HttpRuntimeApi::new(&config)) as DynRuntimeApi
            }
            #[cfg(not(feature = "reqwest-transport"))]
            (None, Some(_)) => {
                return Err(RuntimeError::Config(
                    "no HTTP transport compiled in; provide a runtime api".into(),
                ))
            }
            (None, None) => {
                return Err(RuntimeError::Config(
                    "a runtime config or runtime api is required".into(),
                ))
            }
        };

        Ok(Runtime {
            api,
            handler: Arc::new(self.handler),
            metadata: Arc::new(self.metadata),
            decoder: self.decoder,
            logger: self.logger,
        })
    }
}

// ---------------------------------------------------------------------------
// Runtime
// ---------------------------------------------------------------------------

/// What happened to one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedInvocation {
    pub request_id: String,
    pub outcome: OutcomeReport,
    /// Whether the host accepted the outcome report.
    pub delivered: bool,
}

/// The invocation loop.
///
/// Strictly sequential: each invocation is decoded, handled and reported
/// before the next poll. Nothing that goes wrong inside an invocation stops
/// the loop.
///
/// # Example
///
/// ```rust,no_run
/// use s3_notify_runtime::{FunctionMetadata, NoopProcessor, Runtime, RuntimeConfig, S3EventHandler};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> s3_notify_runtime::Result<()> {
/// let runtime = Runtime::builder(S3EventHandler::new(NoopProcessor))
///     .config(RuntimeConfig::from_env()?)
///     .metadata(FunctionMetadata::from_env())
///     .build()?;
///
/// runtime.run().await;
/// # Ok(())
/// # }
/// ```
pub struct Runtime<H> {
    api: DynRuntimeApi,
    handler: Arc<H>,
    metadata: Arc<FunctionMetadata>,
    decoder: EventDecoder,
    logger: DynLogSink,
}

impl<H> std::fmt::Debug for Runtime<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("api", &self.api)
            .field("function_name", &self.metadata.function_name)
            .field("decoder", &self.decoder)
            .finish()
    }
}

impl<H: Handler> Runtime<H> {
    /// Create a new runtime builder around the given handler.
    pub fn builder(handler: H) -> RuntimeBuilder<H> {
        RuntimeBuilder::new(handler)
    }

    /// Poll and process invocations forever.
    pub async fn run(&self) {
        self.run_until(std::future::pending::<()>()).await;
    }

    /// Poll and process invocations until `shutdown` resolves.
    ///
    /// Shutdown is only observed while waiting for the next invocation; an
    /// invocation that has been handed out is always finished and reported.
    pub async fn run_until<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tracing::info!(
            function_name = %self.metadata.function_name,
            function_version = %self.metadata.function_version,
            "runtime starting"
        );

        tokio::pin!(shutdown);

        loop {
            let polled = tokio::select! {
                biased;
                () = &mut shutdown => break,
                polled = self.api.next_invocation() => polled,
            };

            match polled {
                Ok(request) => {
                    self.process(request).await;
                }
                Err(e) => {
                    // No request id, so there is nothing to report against.
                    tracing::warn!(
                        error_type = e.error_type(),
                        error = %e,
                        "failed to poll next invocation"
                    );
                }
            }
        }

        tracing::info!("runtime stopped");
    }

    /// Poll for one invocation and process it.
    ///
    /// Returns `Err` only when the poll itself failed, in which case no
    /// report was sent.
    pub async fn run_once(&self) -> crate::Result<CompletedInvocation> {
        let request = self.api.next_invocation().await?;
        Ok(self.process(request).await)
    }

    async fn process(&self, request: InvocationRequest) -> CompletedInvocation {
        let ctx = InvocationContext::from_request(&request, self.metadata.clone(), self.logger.clone());
        let request_id = request.request_id;

        tracing::debug!(request_id = %request_id, body_len = request.body.len(), "invocation received");

        let result = self.dispatch(&request.body, ctx).await;
        if let Err(e) = &result {
            tracing::error!(
                request_id = %request_id,
                error_type = e.error_type(),
                error = %error_chain(e),
                "invocation failed"
            );
        }

        let outcome = OutcomeReport::from_result(&result);
        let delivered = match self.report(&request_id, &outcome).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(request_id = %request_id, error = %e, "failed to report outcome");
                false
            }
        };

        tracing::info!(
            request_id = %request_id,
            success = outcome.is_success(),
            delivered,
            "invocation completed"
        );

        CompletedInvocation {
            request_id,
            outcome,
            delivered,
        }
    }

    /// Decode and handle one payload. Every failure, including a handler
    /// panic, comes back as an `Err`.
    async fn dispatch(&self, body: &[u8], ctx: InvocationContext) -> crate::Result<()> {
        let event = self.decoder.decode(body)?;
        let handler = self.handler.clone();

        let task = tokio::spawn(async move { handler.handle(event, &ctx).await });

        match task.await {
            Ok(result) => result,
            Err(join_err) if join_err.is_panic() => {
                let panic = join_err.into_panic();
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                Err(RuntimeError::handler(format!("handler panicked: {}", message)))
            }
            Err(join_err) => Err(RuntimeError::handler(format!(
                "handler task did not complete: {}",
                join_err
            ))),
        }
    }

    async fn report(&self, request_id: &str, outcome: &OutcomeReport) -> crate::Result<()> {
        match outcome {
            OutcomeReport::Success => self.api.post_response(request_id).await,
            OutcomeReport::Failure(report) => self.api.post_error(request_id, report).await,
        }
    }
}
