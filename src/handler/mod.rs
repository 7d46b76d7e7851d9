//! Invocation handlers and the per-record extension point.
//!
//! A [`Handler`] turns one decoded event into zero or more
//! [`S3ObjectEvent`]s, logs a summary line for each, and passes each one to
//! a [`RecordProcessor`]. The first failure aborts the rest of the batch and
//! fails the whole invocation.

mod s3;
mod sns;

pub use self::s3::S3EventHandler;
pub use self::sns::S3SnsEventHandler;

use crate::context::InvocationContext;
use crate::event::{DecodedEvent, S3ObjectEvent};
use std::sync::Arc;

/// Handles one decoded invocation payload.
///
/// # Example
///
/// ```rust,ignore
/// use s3_notify_runtime::{DecodedEvent, Handler, InvocationContext};
///
/// struct Echo;
///
/// #[async_trait::async_trait]
/// impl Handler for Echo {
///     async fn handle(&self, event: DecodedEvent, ctx: &InvocationContext) -> s3_notify_runtime::Result<()> {
///         ctx.logger().log(&format!("{}\n", event.as_value()));
///         Ok(())
///     }
/// }
/// ```
#[async_trait::async_trait]
pub trait Handler: Send + Sync + 'static {
    async fn handle(&self, event: DecodedEvent, ctx: &InvocationContext) -> crate::Result<()>;
}

#[async_trait::async_trait]
impl<H: Handler + ?Sized> Handler for Arc<H> {
    async fn handle(&self, event: DecodedEvent, ctx: &InvocationContext) -> crate::Result<()> {
        (**self).handle(event, ctx).await
    }
}

// ---------------------------------------------------------------------------
// Extension point
// ---------------------------------------------------------------------------

/// Business logic run once per S3 record, after the record is logged.
#[async_trait::async_trait]
pub trait RecordProcessor: Send + Sync + 'static {
    async fn process(&self, record: &S3ObjectEvent, ctx: &InvocationContext) -> crate::Result<()>;
}

#[async_trait::async_trait]
impl<P: RecordProcessor + ?Sized> RecordProcessor for Arc<P> {
    async fn process(&self, record: &S3ObjectEvent, ctx: &InvocationContext) -> crate::Result<()> {
        (**self).process(record, ctx).await
    }
}

/// Does nothing; every record succeeds.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProcessor;

#[async_trait::async_trait]
impl RecordProcessor for NoopProcessor {
    async fn process(&self, _record: &S3ObjectEvent, _ctx: &InvocationContext) -> crate::Result<()> {
        Ok(())
    }
}

/// Adapts a synchronous closure into a [`RecordProcessor`].
pub struct FnProcessor<F> {
    f: F,
}

/// Build a [`RecordProcessor`] from a closure.
///
/// ```rust
/// use s3_notify_runtime::{processor_fn, RuntimeError, S3EventHandler};
///
/// let handler = S3EventHandler::new(processor_fn(|record, _ctx| {
///     if record.key.ends_with(".tmp") {
///         return Err(RuntimeError::handler("temporary objects are not accepted"));
///     }
///     Ok(())
/// }));
/// # let _ = handler;
/// ```
pub fn processor_fn<F>(f: F) -> FnProcessor<F>
where
    F: Fn(&S3ObjectEvent, &InvocationContext) -> crate::Result<()> + Send + Sync + 'static,
{
    FnProcessor { f }
}

#[async_trait::async_trait]
impl<F> RecordProcessor for FnProcessor<F>
where
    F: Fn(&S3ObjectEvent, &InvocationContext) -> crate::Result<()> + Send + Sync + 'static,
{
    async fn process(&self, record: &S3ObjectEvent, ctx: &InvocationContext) -> crate::Result<()> {
        (self.f)(record, ctx)
    }
}

// ---------------------------------------------------------------------------
// Shared per-record loop
// ---------------------------------------------------------------------------

async fn process_records<P: RecordProcessor + ?Sized>(
    processor: &P,
    records: &[S3ObjectEvent],
    ctx: &InvocationContext,
) -> crate::Result<()> {
    for record in records {
        ctx.logger().log(&format!("{}\n", record));
        tracing::debug!(
            request_id = %ctx.request_id(),
            event_name = %record.event_name,
            bucket = %record.bucket,
            key = %record.key,
            size = record.size,
            "s3 record"
        );
        processor.process(record, ctx).await?;
    }
    Ok(())
}
