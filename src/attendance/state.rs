use chrono::{DateTime, FixedOffset, NaiveDate, Timelike, Utc};

use crate::error::Error;
use crate::model::attendance::AttendanceRecord;

/// Per (user, calendar day) attendance state. `CheckedOut` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttendanceState {
    Absent,
    CheckedIn,
    CheckedOut,
}

impl AttendanceState {
    pub fn of(record: Option<&AttendanceRecord>) -> Self {
        match record {
            None => AttendanceState::Absent,
            Some(r) if r.check_out_time.is_some() => AttendanceState::CheckedOut,
            Some(r) if r.check_in_time.is_some() => AttendanceState::CheckedIn,
            Some(_) => AttendanceState::Absent,
        }
    }

    /// Legal only from `Absent`.
    pub fn check_in(self) -> Result<Self, Error> {
        match self {
            AttendanceState::Absent => Ok(AttendanceState::CheckedIn),
            AttendanceState::CheckedIn | AttendanceState::CheckedOut => {
                Err(Error::AlreadyCheckedIn)
            }
        }
    }

    /// Legal only from `CheckedIn`.
    pub fn check_out(self) -> Result<Self, Error> {
        match self {
            AttendanceState::CheckedIn => Ok(AttendanceState::CheckedOut),
            AttendanceState::Absent => Err(Error::NotCheckedIn),
            AttendanceState::CheckedOut => Err(Error::AlreadyCheckedOut),
        }
    }
}

fn org_offset(tz_offset_minutes: i32) -> FixedOffset {
    FixedOffset::east_opt(tz_offset_minutes * 60)
        .unwrap_or_else(|| FixedOffset::east_opt(0).unwrap())
}

/// The calendar-day bucket an instant belongs to in the organization's
/// timezone. Transitions either side of local midnight land in independent
/// buckets.
pub fn local_day(now: DateTime<Utc>, tz_offset_minutes: i32) -> NaiveDate {
    now.with_timezone(&org_offset(tz_offset_minutes)).date_naive()
}

/// Whether a checkout instant reaches the configured work-day boundary hour
/// (local time). Consumed by downstream "late"/"left early" classification.
pub fn closes_work_day(
    check_out: DateTime<Utc>,
    tz_offset_minutes: i32,
    boundary_hour: u32,
) -> bool {
    check_out
        .with_timezone(&org_offset(tz_offset_minutes))
        .hour()
        >= boundary_hour
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const IST_MINUTES: i32 = 330;

    #[test]
    fn transition_legality() {
        assert_eq!(
            AttendanceState::Absent.check_in().unwrap(),
            AttendanceState::CheckedIn
        );
        assert_eq!(
            AttendanceState::CheckedIn.check_out().unwrap(),
            AttendanceState::CheckedOut
        );

        assert!(matches!(
            AttendanceState::CheckedIn.check_in(),
            Err(Error::AlreadyCheckedIn)
        ));
        assert!(matches!(
            AttendanceState::CheckedOut.check_in(),
            Err(Error::AlreadyCheckedIn)
        ));
        assert!(matches!(
            AttendanceState::Absent.check_out(),
            Err(Error::NotCheckedIn)
        ));
        assert!(matches!(
            AttendanceState::CheckedOut.check_out(),
            Err(Error::AlreadyCheckedOut)
        ));
    }

    #[test]
    fn no_record_is_absent() {
        assert_eq!(AttendanceState::of(None), AttendanceState::Absent);
    }

    #[test]
    fn midnight_boundary_splits_buckets() {
        // 23:59 IST on March 1 is 18:29 UTC.
        let before = Utc.with_ymd_and_hms(2024, 3, 1, 18, 29, 0).unwrap();
        // 00:01 IST on March 2 is 18:31 UTC, two minutes later.
        let after = Utc.with_ymd_and_hms(2024, 3, 1, 18, 31, 0).unwrap();

        assert_eq!(
            local_day(before, IST_MINUTES),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );
        assert_eq!(
            local_day(after, IST_MINUTES),
            NaiveDate::from_ymd_opt(2024, 3, 2).unwrap()
        );
    }

    #[test]
    fn work_day_boundary_classification() {
        // 17:30 IST = 12:00 UTC
        let early = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        // 18:05 IST = 12:35 UTC
        let late = Utc.with_ymd_and_hms(2024, 3, 1, 12, 35, 0).unwrap();

        assert!(!closes_work_day(early, IST_MINUTES, 18));
        assert!(closes_work_day(late, IST_MINUTES, 18));
    }
}
