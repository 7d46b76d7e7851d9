use crate::context::InvocationContext;
use crate::event::{s3_records, DecodedEvent};
use crate::handler::{process_records, Handler, NoopProcessor, RecordProcessor};

/// Handles S3 notifications delivered straight to the function.
///
/// The payload is inspected structurally, so no envelope type is bound.
/// Every record is extracted before any is processed: a malformed record
/// anywhere in the batch fails the invocation without running the
/// processor at all.
#[derive(Debug, Default)]
pub struct S3EventHandler<P = NoopProcessor> {
    processor: P,
}

impl<P: RecordProcessor> S3EventHandler<P> {
    pub fn new(processor: P) -> Self {
        Self { processor }
    }
}

#[async_trait::async_trait]
impl<P: RecordProcessor> Handler for S3EventHandler<P> {
    async fn handle(&self, event: DecodedEvent, ctx: &InvocationContext) -> crate::Result<()> {
        let records = s3_records(&event)?;
        ctx.logger()
            .log(&format!("Received {} S3 record(s)\n", records.len()));

        process_records(&self.processor, &records, ctx).await
    }
}
