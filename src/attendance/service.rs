use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};

use crate::attendance::state::{self, AttendanceState};
use crate::attendance::store::{AttendanceStore, CheckInOutcome, CheckOutOutcome};
use crate::error::{Error, Result};
use crate::geo::integrity::{self, IntegrityThresholds};
use crate::model::attendance::{AttendanceEvent, AttendanceStatus};
use crate::model::location::{IntegritySignal, LocationSample};
use crate::sync::StatusSync;
use crate::utils::status_cache;

/// One transition attempt as received from a client. The client-reported time
/// is informational only; the server clock decides what gets recorded.
#[derive(Debug, Clone)]
pub struct TransitionRequest {
    pub username: String,
    /// Bucket day; defaults to the server's current day in the organization's
    /// timezone when absent.
    pub date: Option<NaiveDate>,
    pub client_time: Option<DateTime<Utc>>,
    pub sample: LocationSample,
    pub address: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TransitionReceipt {
    pub message: &'static str,
    pub integrity: IntegritySignal,
}

/// Orchestrates one attendance transition: integrity evaluation, the atomic
/// store write, cache invalidation and dashboard notification.
#[derive(Clone)]
pub struct AttendanceService {
    store: Arc<dyn AttendanceStore>,
    sync: StatusSync,
    thresholds: IntegrityThresholds,
    tz_offset_minutes: i32,
    workday_end_hour: u32,
}

impl AttendanceService {
    pub fn new(
        store: Arc<dyn AttendanceStore>,
        sync: StatusSync,
        thresholds: IntegrityThresholds,
        tz_offset_minutes: i32,
        workday_end_hour: u32,
    ) -> Self {
        Self {
            store,
            sync,
            thresholds,
            tz_offset_minutes,
            workday_end_hour,
        }
    }

    pub async fn check_in(&self, request: TransitionRequest) -> Result<TransitionReceipt> {
        self.check_in_at(request, Utc::now()).await
    }

    pub async fn check_out(&self, request: TransitionRequest) -> Result<TransitionReceipt> {
        self.check_out_at(request, Utc::now()).await
    }

    pub async fn status(&self, username: &str) -> Result<AttendanceStatus> {
        self.status_at(username, Utc::now()).await
    }

    pub async fn check_in_at(
        &self,
        request: TransitionRequest,
        now: DateTime<Utc>,
    ) -> Result<TransitionReceipt> {
        let username = normalized(&request.username)?;
        let date = request.date.unwrap_or_else(|| self.bucket_day(now));
        self.note_client_time(&username, "check-in", request.client_time);

        // Advisory fast-fail; the store's CAS write below has the final word.
        let current = self.store.find(&username, date).await?;
        AttendanceState::of(current.as_ref()).check_in()?;

        let previous = self.store.last_sample(&username).await?;
        let signal = integrity::evaluate(&request.sample, previous.as_ref(), &self.thresholds);
        self.surface_flags(&username, "check-in", &signal);

        match self
            .store
            .insert_check_in(&username, date, now, request.sample, request.address)
            .await?
        {
            CheckInOutcome::Inserted(record) => {
                self.committed(&record).await;
                Ok(TransitionReceipt {
                    message: "Checked in successfully",
                    integrity: signal,
                })
            }
            CheckInOutcome::AlreadyCheckedIn => Err(Error::AlreadyCheckedIn),
        }
    }

    pub async fn check_out_at(
        &self,
        request: TransitionRequest,
        now: DateTime<Utc>,
    ) -> Result<TransitionReceipt> {
        let username = normalized(&request.username)?;
        let date = request.date.unwrap_or_else(|| self.bucket_day(now));
        self.note_client_time(&username, "check-out", request.client_time);

        let current = self.store.find(&username, date).await?;
        AttendanceState::of(current.as_ref()).check_out()?;

        // The previous accepted sample for a checkout is that day's check-in,
        // falling back to the user's most recent commit on any day.
        let previous = match current.as_ref().and_then(|r| r.check_in_sample()) {
            Some(sample) => Some(sample),
            None => self.store.last_sample(&username).await?,
        };
        let signal = integrity::evaluate(&request.sample, previous.as_ref(), &self.thresholds);
        self.surface_flags(&username, "check-out", &signal);

        match self
            .store
            .apply_check_out(&username, date, now, request.sample, request.address)
            .await?
        {
            CheckOutOutcome::Updated(record) => {
                self.committed(&record).await;
                Ok(TransitionReceipt {
                    message: "Checked out successfully",
                    integrity: signal,
                })
            }
            CheckOutOutcome::NotCheckedIn => Err(Error::NotCheckedIn),
            CheckOutOutcome::AlreadyCheckedOut => Err(Error::AlreadyCheckedOut),
        }
    }

    pub async fn status_at(&self, username: &str, now: DateTime<Utc>) -> Result<AttendanceStatus> {
        let username = normalized(username)?;
        let date = self.bucket_day(now);

        if let Some(hit) = status_cache::get(&username, date).await {
            return Ok(hit);
        }

        let record = self.store.find(&username, date).await?;
        let status = AttendanceStatus::project(record.as_ref());
        status_cache::put(&username, date, status.clone()).await;
        Ok(status)
    }

    /// Committed records newer than the cursor, oldest first, as dashboard
    /// events.
    pub async fn feed(&self, since: DateTime<Utc>, limit: u32) -> Result<Vec<AttendanceEvent>> {
        let records = self.store.committed_since(since, limit).await?;
        Ok(records.iter().map(AttendanceEvent::from).collect())
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<AttendanceEvent> {
        self.sync.subscribe()
    }

    fn bucket_day(&self, now: DateTime<Utc>) -> NaiveDate {
        state::local_day(now, self.tz_offset_minutes)
    }

    fn note_client_time(&self, username: &str, op: &str, client_time: Option<DateTime<Utc>>) {
        if let Some(t) = client_time {
            tracing::debug!(username, op, client_time = %t, "client-reported time (informational, server clock is recorded)");
        }
    }

    fn surface_flags(&self, username: &str, op: &str, signal: &IntegritySignal) {
        if signal.flags.low_accuracy {
            tracing::warn!(
                username,
                op,
                accuracy = signal.accuracy_meters,
                "low-accuracy location fix"
            );
        }
        if signal.flags.rapid_movement {
            tracing::warn!(
                username,
                op,
                speed = signal.implied_speed_meters_per_second,
                "implausibly rapid movement since last accepted fix"
            );
        }
    }

    async fn committed(&self, record: &crate::model::attendance::AttendanceRecord) {
        status_cache::invalidate(&record.username, record.date).await;

        match record.check_out_time {
            Some(out) => {
                let full_day =
                    state::closes_work_day(out, self.tz_offset_minutes, self.workday_end_hour);
                tracing::info!(username = %record.username, date = %record.date, full_day, "check-out committed");
            }
            None => {
                tracing::info!(username = %record.username, date = %record.date, "check-in committed");
            }
        }

        self.sync.publish(AttendanceEvent::from(record));
    }
}

fn normalized(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation("username is required".into()));
    }
    Ok(trimmed.to_lowercase())
}
