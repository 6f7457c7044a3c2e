use crate::geo::distance::haversine_meters;
use crate::model::location::{IntegrityFlags, IntegritySignal, LocationSample};

/// Plausibility thresholds; externally configured, defaults match the
/// deployed values.
#[derive(Debug, Clone, Copy)]
pub struct IntegrityThresholds {
    /// Fixes with a larger reported radius are flagged `low_accuracy`.
    pub accuracy_limit_meters: f64,
    /// Implied travel speeds above this are flagged `rapid_movement`.
    pub speed_limit_mps: f64,
}

impl Default for IntegrityThresholds {
    fn default() -> Self {
        Self {
            accuracy_limit_meters: 5.0,
            speed_limit_mps: 30.0,
        }
    }
}

/// Evaluate a sample against the previous accepted one. Pure: the caller owns
/// tracking of the previous sample and the logging of any raised flags.
pub fn evaluate(
    sample: &LocationSample,
    previous: Option<&LocationSample>,
    thresholds: &IntegrityThresholds,
) -> IntegritySignal {
    let mut flags = IntegrityFlags::default();

    if sample.accuracy_meters > thresholds.accuracy_limit_meters {
        flags.low_accuracy = true;
    }

    // Clock skew between fixes can yield a non-positive interval; no speed
    // estimate is possible then.
    let implied_speed = previous.and_then(|prev| {
        let elapsed_ms = sample.captured_at_epoch_ms - prev.captured_at_epoch_ms;
        if elapsed_ms <= 0 {
            return None;
        }
        let distance = haversine_meters(
            prev.latitude,
            prev.longitude,
            sample.latitude,
            sample.longitude,
        );
        Some(distance / (elapsed_ms as f64 / 1000.0))
    });

    if let Some(speed) = implied_speed {
        if speed > thresholds.speed_limit_mps {
            flags.rapid_movement = true;
        }
    }

    IntegritySignal {
        accuracy_meters: sample.accuracy_meters,
        implied_speed_meters_per_second: implied_speed,
        flags,
    }
}
