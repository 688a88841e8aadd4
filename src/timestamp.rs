//! Internal timestamp representation: `(seconds, nanos)`, matching the
//! wire shape of `google.protobuf.Timestamp` rather than any JSON
//! presentation (gRPC binary traffic never takes the RFC-3339 path).

use chrono::{DateTime, Utc};

/// A point in time, represented the way Firestore does on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp {
    /// Seconds since the Unix epoch. May be negative.
    pub seconds: i64,
    /// Nanoseconds within the second, in `[0, 999_999_999]`.
    pub nanos: i32,
}

impl Timestamp {
    /// The current wall-clock time.
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// Build a timestamp from a `chrono` `DateTime<Utc>`.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self {
            seconds: dt.timestamp(),
            nanos: dt.timestamp_subsec_nanos() as i32,
        }
    }

    /// Convert to `chrono`, falling back to now if the stored value is out
    /// of chrono's representable range.
    pub fn to_datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.seconds, self.nanos as u32).unwrap_or_else(Utc::now)
    }

    /// Total nanoseconds since the epoch, used for ordering and equality
    /// in the query engine.
    pub fn as_nanos(&self) -> i128 {
        self.seconds as i128 * 1_000_000_000 + self.nanos as i128
    }

    /// Convert from the generated `prost_types::Timestamp`.
    pub fn from_proto(ts: prost_types::Timestamp) -> Self {
        Self {
            seconds: ts.seconds,
            nanos: ts.nanos,
        }
    }

    /// Convert to the generated `prost_types::Timestamp`.
    pub fn into_proto(self) -> prost_types::Timestamp {
        prost_types::Timestamp {
            seconds: self.seconds,
            nanos: self.nanos,
        }
    }
}
