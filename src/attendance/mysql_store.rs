use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use futures_util::StreamExt;
use sqlx::MySqlPool;

use crate::attendance::store::{AttendanceStore, CheckInOutcome, CheckOutOutcome};
use crate::error::Result;
use crate::model::attendance::AttendanceRecord;
use crate::model::location::LocationSample;

const COLUMNS: &str = "id, username, date, check_in_time, check_out_time, \
     check_in_latitude, check_in_longitude, check_in_accuracy, check_in_captured_at, check_in_address, \
     check_out_latitude, check_out_longitude, check_out_accuracy, check_out_captured_at, check_out_address, \
     committed_at";

/// MySQL-backed store. Atomicity per (username, date) comes from the table's
/// unique key plus compare-and-swap style writes, so no application-level
/// locks are held and different buckets never contend.
///
/// Expected schema:
///
/// ```sql
/// CREATE TABLE attendance (
///     id BIGINT UNSIGNED AUTO_INCREMENT PRIMARY KEY,
///     username VARCHAR(64) NOT NULL,
///     date DATE NOT NULL,
///     check_in_time TIMESTAMP NULL,
///     check_out_time TIMESTAMP NULL,
///     check_in_latitude DOUBLE NULL,
///     check_in_longitude DOUBLE NULL,
///     check_in_accuracy DOUBLE NULL,
///     check_in_captured_at BIGINT NULL,
///     check_in_address VARCHAR(255) NULL,
///     check_out_latitude DOUBLE NULL,
///     check_out_longitude DOUBLE NULL,
///     check_out_accuracy DOUBLE NULL,
///     check_out_captured_at BIGINT NULL,
///     check_out_address VARCHAR(255) NULL,
///     committed_at TIMESTAMP NOT NULL,
///     UNIQUE KEY uniq_user_day (username, date),
///     KEY idx_committed (committed_at)
/// );
/// ```
pub struct MySqlAttendanceStore {
    pool: MySqlPool,
}

impl MySqlAttendanceStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn fetch(&self, username: &str, date: NaiveDate) -> Result<Option<AttendanceRecord>> {
        let sql = format!("SELECT {COLUMNS} FROM attendance WHERE username = ? AND date = ?");
        let record = sqlx::query_as::<_, AttendanceRecord>(&sql)
            .bind(username)
            .bind(date)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }
}

#[async_trait]
impl AttendanceStore for MySqlAttendanceStore {
    async fn find(&self, username: &str, date: NaiveDate) -> Result<Option<AttendanceRecord>> {
        self.fetch(username, date).await
    }

    async fn insert_check_in(
        &self,
        username: &str,
        date: NaiveDate,
        time: DateTime<Utc>,
        sample: LocationSample,
        address: Option<String>,
    ) -> Result<CheckInOutcome> {
        let result = sqlx::query(
            r#"
            INSERT INTO attendance
                (username, date, check_in_time,
                 check_in_latitude, check_in_longitude, check_in_accuracy,
                 check_in_captured_at, check_in_address, committed_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(username)
        .bind(date)
        .bind(time)
        .bind(sample.latitude)
        .bind(sample.longitude)
        .bind(sample.accuracy_meters)
        .bind(sample.captured_at_epoch_ms)
        .bind(address)
        .bind(time)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                let record = self
                    .fetch(username, date)
                    .await?
                    .ok_or(sqlx::Error::RowNotFound)?;
                Ok(CheckInOutcome::Inserted(record))
            }
            Err(e) => {
                // Duplicate key on (username, date): a concurrent or retried
                // check-in already won the day.
                if let sqlx::Error::Database(db_err) = &e {
                    if db_err.code().as_deref() == Some("23000") {
                        return Ok(CheckInOutcome::AlreadyCheckedIn);
                    }
                }
                Err(e.into())
            }
        }
    }

    async fn apply_check_out(
        &self,
        username: &str,
        date: NaiveDate,
        time: DateTime<Utc>,
        sample: LocationSample,
        address: Option<String>,
    ) -> Result<CheckOutOutcome> {
        // GREATEST keeps the checkout at or after the check-in even if the
        // caller's clock is skewed. The NULL guard makes the write one-shot.
        let result = sqlx::query(
            r#"
            UPDATE attendance
            SET check_out_time = GREATEST(?, check_in_time),
                check_out_latitude = ?,
                check_out_longitude = ?,
                check_out_accuracy = ?,
                check_out_captured_at = ?,
                check_out_address = ?,
                committed_at = GREATEST(?, check_in_time)
            WHERE username = ?
              AND date = ?
              AND check_out_time IS NULL
            "#,
        )
        .bind(time)
        .bind(sample.latitude)
        .bind(sample.longitude)
        .bind(sample.accuracy_meters)
        .bind(sample.captured_at_epoch_ms)
        .bind(address)
        .bind(time)
        .bind(username)
        .bind(date)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(match self.fetch(username, date).await? {
                None => CheckOutOutcome::NotCheckedIn,
                Some(_) => CheckOutOutcome::AlreadyCheckedOut,
            });
        }

        let record = self
            .fetch(username, date)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;
        Ok(CheckOutOutcome::Updated(record))
    }

    async fn last_sample(&self, username: &str) -> Result<Option<LocationSample>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM attendance WHERE username = ? \
             ORDER BY committed_at DESC, id DESC LIMIT 1"
        );
        let record = sqlx::query_as::<_, AttendanceRecord>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record.and_then(|r| r.last_sample()))
    }

    async fn committed_since(
        &self,
        since: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<AttendanceRecord>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM attendance WHERE committed_at > ? \
             ORDER BY committed_at ASC, id ASC LIMIT ?"
        );
        let mut stream = sqlx::query_as::<_, AttendanceRecord>(&sql)
            .bind(since)
            .bind(limit)
            .fetch(&self.pool);

        let mut records = Vec::new();
        while let Some(row) = stream.next().await {
            records.push(row?);
        }
        Ok(records)
    }
}
