use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A single device position fix. Immutable once produced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LocationSample {
    pub latitude: f64,
    pub longitude: f64,
    /// Device-reported uncertainty radius in meters; smaller is more trustworthy.
    #[schema(example = 4.2)]
    pub accuracy_meters: f64,
    pub captured_at_epoch_ms: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IntegrityFlags {
    pub low_accuracy: bool,
    pub rapid_movement: bool,
}

/// Plausibility annotations for one transition attempt. Advisory only, never
/// a gate; attached to the response and warn-logged for operator visibility.
#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IntegritySignal {
    pub accuracy_meters: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub implied_speed_meters_per_second: Option<f64>,
    pub flags: IntegrityFlags,
}
