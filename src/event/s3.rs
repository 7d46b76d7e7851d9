use crate::errors::RuntimeError;
use crate::event::{DecodedEvent, Node};
use std::fmt;

/// One S3 notification record, reduced to the fields the handlers use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3ObjectEvent {
    /// e.g. `ObjectCreated:Put`.
    pub event_name: String,
    pub bucket: String,
    /// Object key exactly as S3 sent it, still percent-encoded.
    pub key: String,
    /// Object size in bytes. S3 omits it for `ObjectRemoved:*` events, which
    /// read as zero; every other event type must carry it.
    pub size: u64,
}

impl S3ObjectEvent {
    /// Extract the record fields from one element of `Records`.
    pub fn from_record(record: Node<'_>) -> crate::Result<Self> {
        let event_name = record.require_str(&["eventName"])?;
        let size = match record.path(&["s3", "object", "size"]) {
            Some(node) if !node.is_null() => node.as_u64().ok_or_else(|| {
                RuntimeError::Decode(
                    "field `s3.object.size` must be a non-negative integer".to_string(),
                )
            })?,
            _ if is_removal(event_name) => 0,
            _ => return Err(RuntimeError::missing_field("s3.object.size")),
        };

        Ok(Self {
            event_name: event_name.to_string(),
            bucket: record.require_str(&["s3", "bucket", "name"])?.to_string(),
            key: record.require_str(&["s3", "object", "key"])?.to_string(),
            size,
        })
    }
}

fn is_removal(event_name: &str) -> bool {
    event_name
        .get(..REMOVAL_PREFIX.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(REMOVAL_PREFIX))
}

const REMOVAL_PREFIX: &str = "ObjectRemoved:";

impl fmt::Display for S3ObjectEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "S3 Event | type={} | bucket={} | key={} | size={} bytes",
            self.event_name, self.bucket, self.key, self.size
        )
    }
}

/// Extract every record of a direct S3 notification.
///
/// An absent or `null` `Records` field, or an empty array, yields no
/// records. Any other non-array value, or a record missing a required
/// field, fails the whole event.
pub fn s3_records(event: &DecodedEvent) -> crate::Result<Vec<S3ObjectEvent>> {
    let records = match event.get("Records") {
        None => return Ok(Vec::new()),
        Some(node) if node.is_null() => return Ok(Vec::new()),
        Some(node) => node,
    };

    if !records.value().is_array() {
        return Err(RuntimeError::Decode(
            "field `Records` must be an array".to_string(),
        ));
    }

    records.items().map(S3ObjectEvent::from_record).collect()
}
