use crate::geo::integrity::IntegrityThresholds;
use crate::geo::sampler::RetryPolicy;
use dotenvy::dotenv;
use std::env;
use std::time::Duration;

#[derive(Clone)]
pub struct Config {
    pub server_addr: String,
    /// Unset means dev mode with the in-memory store.
    pub database_url: Option<String>,
    pub api_prefix: String,

    // Location acquisition (advertised to clients)
    pub location_timeout_secs: u64,
    pub location_max_attempts: u32,
    pub early_exit_accuracy_meters: f64,

    // Integrity thresholds
    pub accuracy_threshold_meters: f64,
    pub speed_threshold_mps: f64,

    // Attendance semantics
    pub tz_offset_minutes: i32,
    pub workday_end_hour: u32,

    // Rate limiting
    pub rate_attendance_per_min: u32,
    pub rate_feed_per_min: u32,

    /// Broadcast buffer for the dashboard stream.
    pub sync_buffer: usize,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        Self {
            server_addr: env::var("SERVER_ADDR").expect("SERVER_ADDR must be set"),
            database_url: env::var("DATABASE_URL").ok(),
            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),

            location_timeout_secs: env::var("LOCATION_TIMEOUT_SECS")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .unwrap(),
            location_max_attempts: env::var("LOCATION_MAX_ATTEMPTS")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .unwrap(),
            early_exit_accuracy_meters: env::var("EARLY_EXIT_ACCURACY_METERS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .unwrap(),

            accuracy_threshold_meters: env::var("ACCURACY_THRESHOLD_METERS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .unwrap(),
            speed_threshold_mps: env::var("SPEED_THRESHOLD_MPS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap(),

            // IST (+05:30)
            tz_offset_minutes: env::var("TZ_OFFSET_MINUTES")
                .unwrap_or_else(|_| "330".to_string())
                .parse()
                .unwrap(),
            workday_end_hour: env::var("WORKDAY_END_HOUR")
                .unwrap_or_else(|_| "18".to_string())
                .parse()
                .unwrap(),

            rate_attendance_per_min: env::var("RATE_ATTENDANCE_PER_MIN")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .unwrap(),
            rate_feed_per_min: env::var("RATE_FEED_PER_MIN")
                .unwrap_or_else(|_| "120".to_string())
                .parse()
                .unwrap(),

            sync_buffer: env::var("SYNC_BUFFER")
                .unwrap_or_else(|_| "256".to_string())
                .parse()
                .unwrap(),
        }
    }

    /// The acquisition policy clients are expected to apply.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.location_max_attempts,
            per_attempt_timeout: Duration::from_secs(self.location_timeout_secs),
            early_exit_accuracy_meters: self.early_exit_accuracy_meters,
        }
    }

    pub fn integrity_thresholds(&self) -> IntegrityThresholds {
        IntegrityThresholds {
            accuracy_limit_meters: self.accuracy_threshold_meters,
            speed_limit_mps: self.speed_threshold_mps,
        }
    }
}
