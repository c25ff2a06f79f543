//! Ingestion event shape, as delivered by the device webhook.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::normalizer::RawRecord;
use crate::schema;

/// One ingestion request: `data` is the fixed-order comma-separated field
/// list declared in [`schema::SCHEMA`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestEvent {
    pub event: String,
    pub coreid: String,
    pub published_at: String,
    pub data: String,
}

impl IngestEvent {
    /// Validates the event shape and payload against the schema, producing
    /// the raw record to persist.
    ///
    /// Shape errors ([`Error::UnknownEventType`], [`Error::EmptyPayload`])
    /// and payload errors ([`Error::Validation`]) are rejected here, at the
    /// ingestion boundary; nothing is retried.
    pub fn into_raw_record(self) -> Result<RawRecord> {
        if self.event != "fix" {
            return Err(Error::UnknownEventType(self.event));
        }
        if self.data.trim().is_empty() {
            return Err(Error::EmptyPayload);
        }

        let timestamp = self.published_at.parse()?;
        let fields: Vec<String> = self.data.split(',').map(str::to_string).collect();
        // Casts are checked up front so malformed payloads never reach the
        // store; the stored form stays raw.
        schema::cast_fields(&fields)?;

        Ok(RawRecord {
            asset_id: self.coreid,
            timestamp,
            fields,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(data: &str) -> IngestEvent {
        IngestEvent {
            event: "fix".to_string(),
            coreid: "boat-1".to_string(),
            published_at: "2026-08-01T10:00:00Z".to_string(),
            data: data.to_string(),
        }
    }

    const GOOD: &str = "N,3743.2500,W,12213.2683,5.3,54,1,120,-3,2,18.5,12.6,5.1";

    #[test]
    fn test_valid_event_becomes_raw_record() {
        let record = event(GOOD).into_raw_record().unwrap();
        assert_eq!(record.asset_id, "boat-1");
        assert_eq!(record.fields.len(), 13);
        assert_eq!(record.fields[1], "3743.2500");
    }

    #[test]
    fn test_unknown_event_type() {
        let mut e = event(GOOD);
        e.event = "diagnostic".to_string();
        let err = e.into_raw_record().unwrap_err();
        assert!(matches!(err, Error::UnknownEventType(t) if t == "diagnostic"));
    }

    #[test]
    fn test_empty_payload() {
        let err = event("  ").into_raw_record().unwrap_err();
        assert!(matches!(err, Error::EmptyPayload));
    }

    #[test]
    fn test_bad_timestamp() {
        let mut e = event(GOOD);
        e.published_at = "yesterday".to_string();
        assert!(matches!(e.into_raw_record(), Err(Error::Timestamp(_))));
    }

    #[test]
    fn test_wrong_field_count_rejected_at_boundary() {
        let err = event("N,3743.2500,W").into_raw_record().unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
