use std::time::Duration;

use chrono::NaiveDate;
use moka::future::Cache;
use once_cell::sync::Lazy;

use crate::model::attendance::AttendanceStatus;

/// Today's status projections, keyed `username:date`. Short TTL keeps
/// dashboard polling off the store; writers invalidate their own bucket on
/// commit so a user always reads their own transition back.
static STATUS_CACHE: Lazy<Cache<String, AttendanceStatus>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(100_000)
        .time_to_live(Duration::from_secs(15))
        .build()
});

fn key(username: &str, date: NaiveDate) -> String {
    format!("{}:{}", username, date)
}

pub async fn get(username: &str, date: NaiveDate) -> Option<AttendanceStatus> {
    STATUS_CACHE.get(&key(username, date)).await
}

pub async fn put(username: &str, date: NaiveDate, status: AttendanceStatus) {
    STATUS_CACHE.insert(key(username, date), status).await;
}

pub async fn invalidate(username: &str, date: NaiveDate) {
    STATUS_CACHE.invalidate(&key(username, date)).await;
}
