use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::error::Result;
use crate::model::attendance::AttendanceRecord;
use crate::model::location::LocationSample;

/// Outcome of the atomic check-in write. Conflicts are values, not errors, so
/// a lost race is never mistaken for a store failure.
#[derive(Debug)]
pub enum CheckInOutcome {
    Inserted(AttendanceRecord),
    AlreadyCheckedIn,
}

#[derive(Debug)]
pub enum CheckOutOutcome {
    Updated(AttendanceRecord),
    NotCheckedIn,
    AlreadyCheckedOut,
}

/// Durable attendance record keeper. Implementations must make the
/// precondition-check-then-write atomic per (username, date) without any
/// cross-bucket contention.
#[async_trait]
pub trait AttendanceStore: Send + Sync {
    async fn find(&self, username: &str, date: NaiveDate) -> Result<Option<AttendanceRecord>>;

    /// Exactly one of any set of concurrent callers for the same bucket
    /// observes `Inserted`; the rest observe `AlreadyCheckedIn`.
    async fn insert_check_in(
        &self,
        username: &str,
        date: NaiveDate,
        time: DateTime<Utc>,
        sample: LocationSample,
        address: Option<String>,
    ) -> Result<CheckInOutcome>;

    /// Sets the checkout exactly once; the stored checkout time never
    /// precedes the check-in time.
    async fn apply_check_out(
        &self,
        username: &str,
        date: NaiveDate,
        time: DateTime<Utc>,
        sample: LocationSample,
        address: Option<String>,
    ) -> Result<CheckOutOutcome>;

    /// Most recently committed location for the user across all days, if any.
    async fn last_sample(&self, username: &str) -> Result<Option<LocationSample>>;

    /// Records committed strictly after `since`, oldest first.
    async fn committed_since(
        &self,
        since: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<AttendanceRecord>>;
}
