//! Cache entry: a payload with its creation and expiry timestamps

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::converter::Converters;
use super::error::CacheError;

/// Serialized shape of an entry as stored on disk
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntryRecord {
    data: Value,
    expires_at: String,
    created_at: String,
}

/// A cached value together with the instants it was created and expires
///
/// Entries are never modified after construction. Refreshing a key means
/// building a new entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry<T> {
    data: T,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl<T> Entry<T> {
    /// Creates an entry from explicit timestamps
    ///
    /// The ordering of `created_at` and `expires_at` is not checked.
    pub fn new(data: T, expires_at: DateTime<Utc>, created_at: DateTime<Utc>) -> Self {
        Self {
            data,
            created_at,
            expires_at,
        }
    }

    /// Creates an entry stamped now that expires after `ttl`
    ///
    /// The expiry is clamped to years 1 through 9999 so that any TTL, including
    /// `Duration::MAX`, yields a timestamp that survives the on-disk format.
    pub fn with_ttl(data: T, ttl: Duration) -> Self {
        let now = Utc::now();
        let (earliest, latest) = storable_range();
        let expires_at = match now.checked_add_signed(ttl) {
            Some(at) => at.clamp(earliest, latest),
            None if ttl < Duration::zero() => earliest,
            None => latest,
        };
        Self::new(data, expires_at, now)
    }

    pub fn data(&self) -> &T {
        &self.data
    }

    pub fn into_data(self) -> T {
        self.data
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Whether the expiry instant has been reached; evaluated against the clock on every call
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Time left before expiry, zero once expired
    pub fn remaining_time(&self) -> Duration {
        (self.expires_at - Utc::now()).max(Duration::zero())
    }

    /// Converts the entry into its generic record form
    ///
    /// # Returns
    /// * `Ok(Value)` shaped as `{"data", "expiresAt", "createdAt"}`
    /// * `Err(CacheError::Serialization)` if the payload converter fails
    pub fn serialize(&self, converters: &Converters<T>) -> Result<Value, CacheError> {
        let data = converters
            .to_generic(&self.data)
            .map_err(|e| CacheError::Serialization(e.to_string()))?;

        let record = EntryRecord {
            data,
            expires_at: format_timestamp(self.expires_at),
            created_at: format_timestamp(self.created_at),
        };

        serde_json::to_value(record).map_err(|e| CacheError::Serialization(e.to_string()))
    }

    /// Rebuilds an entry from its generic record form
    ///
    /// # Returns
    /// * `Err(CacheError::Deserialization)` if a field is missing, a timestamp cannot be
    ///   parsed, or the payload converter rejects the data
    pub fn deserialize(record: Value, converters: &Converters<T>) -> Result<Self, CacheError> {
        let record: EntryRecord = serde_json::from_value(record)
            .map_err(|e| CacheError::Deserialization(e.to_string()))?;

        let expires_at = parse_timestamp(&record.expires_at).ok_or_else(|| {
            CacheError::Deserialization(format!("invalid expiresAt: {}", record.expires_at))
        })?;
        let created_at = parse_timestamp(&record.created_at).ok_or_else(|| {
            CacheError::Deserialization(format!("invalid createdAt: {}", record.created_at))
        })?;

        let data = converters
            .from_generic(record.data)
            .map_err(|e| CacheError::Deserialization(e.to_string()))?;

        Ok(Self::new(data, expires_at, created_at))
    }
}

/// First and last instants whose RFC 3339 form has a four-digit year
fn storable_range() -> (DateTime<Utc>, DateTime<Utc>) {
    let earliest = NaiveDate::from_ymd_opt(1, 1, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    let latest = NaiveDate::from_ymd_opt(9999, 12, 31)
        .and_then(|date| date.and_hms_micro_opt(23, 59, 59, 999_999))
        .map(|naive| naive.and_utc())
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    (earliest, latest)
}

/// Formats a timestamp as RFC 3339 in UTC with microsecond precision
pub(crate) fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parses an ISO-8601 timestamp
///
/// Timestamps without an offset are read as UTC.
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use std::thread;
    use std::time::Duration as StdDuration;

    fn converters() -> Converters<String> {
        Converters::serde()
    }

    #[test]
    fn test_fresh_entry_is_not_expired() {
        let entry = Entry::with_ttl("value".to_string(), Duration::minutes(5));

        assert!(!entry.is_expired());
        assert!(entry.remaining_time() > Duration::minutes(4));
        assert!(entry.remaining_time() <= Duration::minutes(5));
    }

    #[test]
    fn test_entry_expires_after_ttl() {
        let entry = Entry::with_ttl("value".to_string(), Duration::milliseconds(1));

        thread::sleep(StdDuration::from_millis(10));

        assert!(entry.is_expired());
        assert_eq!(entry.remaining_time(), Duration::zero());
    }

    #[test]
    fn test_entry_is_expired_at_exact_expiry_instant() {
        let now = Utc::now();
        let entry = Entry::new(1, now, now);

        assert!(entry.is_expired());
    }

    #[test]
    fn test_unbounded_ttl_clamps_to_last_storable_instant() {
        let entry = Entry::with_ttl("forever".to_string(), Duration::MAX);

        assert!(!entry.is_expired());
        assert_eq!(
            format_timestamp(entry.expires_at()),
            "9999-12-31T23:59:59.999999Z"
        );

        let record = entry.serialize(&converters()).unwrap();
        let restored = Entry::deserialize(record, &converters()).expect("Should deserialize");
        assert_eq!(restored.expires_at(), entry.expires_at());
    }

    #[test]
    fn test_hugely_negative_ttl_is_expired() {
        let entry = Entry::with_ttl("never".to_string(), Duration::MIN);

        assert!(entry.is_expired());
        assert_eq!(entry.remaining_time(), Duration::zero());
        assert_eq!(
            format_timestamp(entry.expires_at()),
            "0001-01-01T00:00:00.000000Z"
        );
    }

    #[test]
    fn test_remaining_time_never_negative() {
        let past = Utc::now() - Duration::hours(1);
        let entry = Entry::new(1, past, past - Duration::hours(1));

        assert_eq!(entry.remaining_time(), Duration::zero());
    }

    #[test]
    fn test_serialize_produces_record_shape() {
        let created = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
        let expires = created + Duration::minutes(30);
        let entry = Entry::new("tide".to_string(), expires, created);

        let record = entry.serialize(&converters()).expect("Serialize should succeed");

        assert_eq!(record["data"], json!("tide"));
        assert_eq!(record["createdAt"], json!("2026-01-01T12:00:00.000000Z"));
        assert_eq!(record["expiresAt"], json!("2026-01-01T12:30:00.000000Z"));
    }

    #[test]
    fn test_deserialize_restores_timestamps_and_data() {
        let created = Utc.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap();
        let expires = created + Duration::hours(2);
        let entry = Entry::new("payload".to_string(), expires, created);

        let record = entry.serialize(&converters()).unwrap();
        let restored = Entry::deserialize(record, &converters()).expect("Should deserialize");

        assert_eq!(restored, entry);
    }

    #[test]
    fn test_deserialize_accepts_timestamp_without_offset() {
        let record = json!({
            "data": "x",
            "expiresAt": "2026-01-01T12:30:00.000",
            "createdAt": "2026-01-01T12:00:00.000",
        });

        let entry = Entry::deserialize(record, &converters()).expect("Should deserialize");

        assert_eq!(
            entry.expires_at(),
            Utc.with_ymd_and_hms(2026, 1, 1, 12, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_deserialize_rejects_missing_field() {
        let record = json!({ "data": "x", "createdAt": "2026-01-01T12:00:00Z" });

        let result = Entry::deserialize(record, &converters());

        assert!(matches!(result, Err(CacheError::Deserialization(_))));
    }

    #[test]
    fn test_deserialize_rejects_bad_timestamp() {
        let record = json!({
            "data": "x",
            "expiresAt": "tomorrow",
            "createdAt": "2026-01-01T12:00:00Z",
        });

        let result = Entry::deserialize(record, &converters());

        assert!(matches!(result, Err(CacheError::Deserialization(_))));
    }

    #[test]
    fn test_deserialize_rejects_payload_the_converter_refuses() {
        let record = json!({
            "data": 42,
            "expiresAt": "2026-01-01T12:30:00Z",
            "createdAt": "2026-01-01T12:00:00Z",
        });

        let result = Entry::deserialize(record, &converters());

        assert!(matches!(result, Err(CacheError::Deserialization(_))));
    }
}
