use serde::Deserialize;

// Field names are lowercase because `DecodedEvent::decode_envelope` lowercases
// every key before binding.

/// S3 notifications relayed through an SNS topic.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SnsEvent {
    #[serde(default)]
    pub records: Option<Vec<SnsRecord>>,
}

impl SnsEvent {
    /// The outer records; empty when `Records` is absent or `null`.
    pub fn records(&self) -> &[SnsRecord] {
        self.records.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnsRecord {
    #[serde(rename = "eventsource", default)]
    pub event_source: String,
    pub sns: SnsMessage,
}

/// The SNS notification itself. `message` holds the S3 notification as a
/// JSON string that needs a second decode pass.
#[derive(Debug, Clone, Deserialize)]
pub struct SnsMessage {
    #[serde(rename = "messageid", default)]
    pub message_id: String,
    #[serde(rename = "topicarn", default)]
    pub topic_arn: String,
    #[serde(default)]
    pub subject: Option<String>,
    pub message: String,
}
