//! `bootstrap`: the executable the host starts for a custom runtime.
//!
//! Reads the runtime API address and function metadata from the
//! environment, selects the handler from `_HANDLER`, and processes
//! invocations until the host freezes or stops the process. Exits non-zero
//! only when startup configuration is unusable.

use s3_notify_runtime::{
    FunctionMetadata, Handler, HandlerKind, NoopProcessor, Runtime, RuntimeConfig, S3EventHandler,
    S3SnsEventHandler,
};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    init_logging();

    match start().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error_type = e.error_type(), error = %e, "runtime failed to start");
            ExitCode::FAILURE
        }
    }
}

async fn start() -> s3_notify_runtime::Result<()> {
    let config = RuntimeConfig::from_env()?;
    let kind = HandlerKind::from_env()?;
    let metadata = FunctionMetadata::from_env();

    tracing::info!(
        runtime_api = %config.runtime_api,
        handler = ?kind,
        memory_limit_mb = metadata.memory_limit_mb,
        "bootstrap configured"
    );

    match kind {
        HandlerKind::Direct => serve(S3EventHandler::new(NoopProcessor), config, metadata).await,
        HandlerKind::Sns => serve(S3SnsEventHandler::new(NoopProcessor), config, metadata).await,
    }
}

async fn serve<H: Handler>(
    handler: H,
    config: RuntimeConfig,
    metadata: FunctionMetadata,
) -> s3_notify_runtime::Result<()> {
    let runtime = Runtime::builder(handler)
        .config(config)
        .metadata(metadata)
        .build()?;

    runtime.run().await;
    Ok(())
}

/// Diagnostics go to stderr; handler log lines go to stdout through the
/// context's sink. The host captures both.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();
}
