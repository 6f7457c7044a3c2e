use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::model::location::LocationSample;

/// One row per (username, date). The (username, date) pair is unique; once
/// `check_out_time` is set the record is terminal for that day.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AttendanceRecord {
    pub id: u64,
    pub username: String,
    /// Calendar day in the organization's timezone.
    pub date: NaiveDate,
    pub check_in_time: Option<DateTime<Utc>>,
    pub check_out_time: Option<DateTime<Utc>>,
    pub check_in_latitude: Option<f64>,
    pub check_in_longitude: Option<f64>,
    pub check_in_accuracy: Option<f64>,
    pub check_in_captured_at: Option<i64>,
    pub check_in_address: Option<String>,
    pub check_out_latitude: Option<f64>,
    pub check_out_longitude: Option<f64>,
    pub check_out_accuracy: Option<f64>,
    pub check_out_captured_at: Option<i64>,
    pub check_out_address: Option<String>,
    pub committed_at: DateTime<Utc>,
}

impl AttendanceRecord {
    pub fn check_in_sample(&self) -> Option<LocationSample> {
        match (
            self.check_in_latitude,
            self.check_in_longitude,
            self.check_in_accuracy,
            self.check_in_captured_at,
        ) {
            (Some(latitude), Some(longitude), Some(accuracy_meters), Some(captured_at_epoch_ms)) => {
                Some(LocationSample {
                    latitude,
                    longitude,
                    accuracy_meters,
                    captured_at_epoch_ms,
                })
            }
            _ => None,
        }
    }

    pub fn check_out_sample(&self) -> Option<LocationSample> {
        match (
            self.check_out_latitude,
            self.check_out_longitude,
            self.check_out_accuracy,
            self.check_out_captured_at,
        ) {
            (Some(latitude), Some(longitude), Some(accuracy_meters), Some(captured_at_epoch_ms)) => {
                Some(LocationSample {
                    latitude,
                    longitude,
                    accuracy_meters,
                    captured_at_epoch_ms,
                })
            }
            _ => None,
        }
    }

    /// Latest accepted location on this record, checkout preferred.
    pub fn last_sample(&self) -> Option<LocationSample> {
        self.check_out_sample().or_else(|| self.check_in_sample())
    }
}

/// Projection of the current day's record; derived, never persisted.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceStatus {
    pub checked_in: bool,
    pub checked_out: bool,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub check_in_time: Option<DateTime<Utc>>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub check_out_time: Option<DateTime<Utc>>,
}

impl AttendanceStatus {
    /// Missing record projects as absent.
    pub fn project(record: Option<&AttendanceRecord>) -> Self {
        match record {
            None => Self {
                checked_in: false,
                checked_out: false,
                check_in_time: None,
                check_out_time: None,
            },
            Some(r) => Self {
                checked_in: r.check_in_time.is_some(),
                checked_out: r.check_out_time.is_some(),
                check_in_time: r.check_in_time,
                check_out_time: r.check_out_time,
            },
        }
    }
}

/// Shape pushed to dashboards for each committed transition.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceEvent {
    pub id: u64,
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub check_in_time: Option<DateTime<Utc>>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub check_out_time: Option<DateTime<Utc>>,
    pub user_identifier: String,
    #[schema(value_type = String, format = "date-time")]
    pub committed_at: DateTime<Utc>,
}

impl From<&AttendanceRecord> for AttendanceEvent {
    fn from(record: &AttendanceRecord) -> Self {
        Self {
            id: record.id,
            date: record.date,
            check_in_time: record.check_in_time,
            check_out_time: record.check_out_time,
            user_identifier: record.username.clone(),
            committed_at: record.committed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record() -> AttendanceRecord {
        AttendanceRecord {
            id: 1,
            username: "alice".into(),
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            check_in_time: Some(Utc.with_ymd_and_hms(2024, 3, 1, 3, 35, 0).unwrap()),
            check_out_time: None,
            check_in_latitude: Some(23.78),
            check_in_longitude: Some(90.40),
            check_in_accuracy: Some(4.0),
            check_in_captured_at: Some(1_709_264_100_000),
            check_in_address: None,
            check_out_latitude: None,
            check_out_longitude: None,
            check_out_accuracy: None,
            check_out_captured_at: None,
            check_out_address: None,
            committed_at: Utc.with_ymd_and_hms(2024, 3, 1, 3, 35, 0).unwrap(),
        }
    }

    #[test]
    fn projects_absent_when_no_record() {
        let status = AttendanceStatus::project(None);
        assert!(!status.checked_in);
        assert!(!status.checked_out);
        assert!(status.check_in_time.is_none());
    }

    #[test]
    fn projects_checked_in_record() {
        let r = record();
        let status = AttendanceStatus::project(Some(&r));
        assert!(status.checked_in);
        assert!(!status.checked_out);
        assert_eq!(status.check_in_time, r.check_in_time);
    }

    #[test]
    fn reassembles_check_in_sample_from_columns() {
        let sample = record().check_in_sample().unwrap();
        assert_eq!(sample.accuracy_meters, 4.0);
        assert_eq!(sample.latitude, 23.78);
    }

    #[test]
    fn last_sample_prefers_checkout() {
        let mut r = record();
        assert_eq!(r.last_sample().unwrap().accuracy_meters, 4.0);
        r.check_out_latitude = Some(23.79);
        r.check_out_longitude = Some(90.41);
        r.check_out_accuracy = Some(6.0);
        r.check_out_captured_at = Some(1_709_294_400_000);
        assert_eq!(r.last_sample().unwrap().accuracy_meters, 6.0);
    }

    #[test]
    fn status_serializes_camel_case() {
        let json = serde_json::to_value(AttendanceStatus::project(None)).unwrap();
        assert!(json.get("checkedIn").is_some());
        assert!(json.get("checkedOut").is_some());
    }
}
