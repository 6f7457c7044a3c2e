use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::Mutex as AsyncMutex;

use crate::attendance::store::{AttendanceStore, CheckInOutcome, CheckOutOutcome};
use crate::error::Result;
use crate::model::attendance::AttendanceRecord;
use crate::model::location::LocationSample;

type Bucket = (String, NaiveDate);
type Slot = Arc<AsyncMutex<Option<AttendanceRecord>>>;

/// In-memory store used in dev mode (no DATABASE_URL) and in tests. Each
/// (username, date) bucket owns its own async lock, so concurrent writers to
/// one bucket serialize while unrelated buckets never contend. The outer map
/// mutex is held only to fetch the slot, never across an await.
pub struct MemoryAttendanceStore {
    buckets: Mutex<HashMap<Bucket, Slot>>,
    commits: Mutex<Vec<AttendanceRecord>>,
    next_id: AtomicU64,
}

impl MemoryAttendanceStore {
    pub fn new() -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            commits: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    fn slot(&self, username: &str, date: NaiveDate) -> Slot {
        let mut buckets = self.buckets.lock().unwrap();
        buckets
            .entry((username.to_string(), date))
            .or_default()
            .clone()
    }

    fn peek(&self, username: &str, date: NaiveDate) -> Option<Slot> {
        let buckets = self.buckets.lock().unwrap();
        buckets.get(&(username.to_string(), date)).cloned()
    }

    fn log_commit(&self, record: &AttendanceRecord) {
        self.commits.lock().unwrap().push(record.clone());
    }
}

impl Default for MemoryAttendanceStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AttendanceStore for MemoryAttendanceStore {
    async fn find(&self, username: &str, date: NaiveDate) -> Result<Option<AttendanceRecord>> {
        match self.peek(username, date) {
            None => Ok(None),
            Some(slot) => Ok(slot.lock().await.clone()),
        }
    }

    async fn insert_check_in(
        &self,
        username: &str,
        date: NaiveDate,
        time: DateTime<Utc>,
        sample: LocationSample,
        address: Option<String>,
    ) -> Result<CheckInOutcome> {
        let slot = self.slot(username, date);
        let mut guard = slot.lock().await;

        if guard.is_some() {
            return Ok(CheckInOutcome::AlreadyCheckedIn);
        }

        let record = AttendanceRecord {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            username: username.to_string(),
            date,
            check_in_time: Some(time),
            check_out_time: None,
            check_in_latitude: Some(sample.latitude),
            check_in_longitude: Some(sample.longitude),
            check_in_accuracy: Some(sample.accuracy_meters),
            check_in_captured_at: Some(sample.captured_at_epoch_ms),
            check_in_address: address,
            check_out_latitude: None,
            check_out_longitude: None,
            check_out_accuracy: None,
            check_out_captured_at: None,
            check_out_address: None,
            committed_at: time,
        };

        *guard = Some(record.clone());
        self.log_commit(&record);
        Ok(CheckInOutcome::Inserted(record))
    }

    async fn apply_check_out(
        &self,
        username: &str,
        date: NaiveDate,
        time: DateTime<Utc>,
        sample: LocationSample,
        address: Option<String>,
    ) -> Result<CheckOutOutcome> {
        let slot = self.slot(username, date);
        let mut guard = slot.lock().await;

        match guard.as_mut() {
            None => Ok(CheckOutOutcome::NotCheckedIn),
            Some(record) if record.check_out_time.is_some() => {
                Ok(CheckOutOutcome::AlreadyCheckedOut)
            }
            Some(record) => {
                // Checkout never precedes check-in, whatever the clocks say.
                let effective = record.check_in_time.map_or(time, |ci| time.max(ci));
                record.check_out_time = Some(effective);
                record.check_out_latitude = Some(sample.latitude);
                record.check_out_longitude = Some(sample.longitude);
                record.check_out_accuracy = Some(sample.accuracy_meters);
                record.check_out_captured_at = Some(sample.captured_at_epoch_ms);
                record.check_out_address = address;
                record.committed_at = effective;

                let snapshot = record.clone();
                self.log_commit(&snapshot);
                Ok(CheckOutOutcome::Updated(snapshot))
            }
        }
    }

    async fn last_sample(&self, username: &str) -> Result<Option<LocationSample>> {
        let commits = self.commits.lock().unwrap();
        Ok(commits
            .iter()
            .rev()
            .find(|r| r.username == username)
            .and_then(|r| r.last_sample()))
    }

    async fn committed_since(
        &self,
        since: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<AttendanceRecord>> {
        let commits = self.commits.lock().unwrap();
        Ok(commits
            .iter()
            .filter(|r| r.committed_at > since)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}
