use crate::context::InvocationContext;
use crate::errors::RuntimeError;
use crate::event::{s3_records, DecodedEvent, EventDecoder, SnsEvent, SnsRecord};
use crate::handler::{process_records, Handler, NoopProcessor, RecordProcessor};

/// Handles S3 notifications relayed through an SNS topic.
///
/// The outer event is bound to [`SnsEvent`]. Each SNS message body is a
/// JSON-encoded S3 notification, decoded in a second pass and then handled
/// like a direct delivery. A failure in any SNS record is logged, wrapped
/// with that record's message id, and fails the invocation so SNS retries it.
#[derive(Debug, Default)]
pub struct S3SnsEventHandler<P = NoopProcessor> {
    processor: P,
    decoder: EventDecoder,
}

impl<P: RecordProcessor> S3SnsEventHandler<P> {
    pub fn new(processor: P) -> Self {
        Self {
            processor,
            decoder: EventDecoder::new(),
        }
    }

    async fn process_sns_record(
        &self,
        record: &SnsRecord,
        ctx: &InvocationContext,
    ) -> crate::Result<()> {
        let inner = self.decoder.decode_str(&record.sns.message)?;
        let records = s3_records(&inner)?;
        process_records(&self.processor, &records, ctx).await
    }
}

#[async_trait::async_trait]
impl<P: RecordProcessor> Handler for S3SnsEventHandler<P> {
    async fn handle(&self, event: DecodedEvent, ctx: &InvocationContext) -> crate::Result<()> {
        let event: SnsEvent = event.decode_envelope()?;
        let records = event.records();
        let logger = ctx.logger();

        logger.log(&format!("Received {} SNS record(s)\n", records.len()));

        for record in records {
            let message_id = &record.sns.message_id;
            logger.log(&format!("Processing SNS message: {}\n", message_id));

            if let Err(e) = self.process_sns_record(record, ctx).await {
                logger.log(&format!(
                    "ERROR processing SNS message {}: {}\n",
                    message_id,
                    e.error_message()
                ));
                return Err(RuntimeError::handler_caused_by(
                    format!("failed to process S3 event from SNS message: {}", message_id),
                    e,
                ));
            }
        }

        Ok(())
    }
}
