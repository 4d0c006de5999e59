//! The accelerometer processor.
//!
//! Grounded on `mpf.devices.accelerometer.Accelerometer`: an exponentially
//! smoothed 3-axis filter, a delta-magnitude threshold for transient "hit"
//! events, and an angle-from-upright threshold for sustained "tilt" events.

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::events::{EventBus, EventPayload};

/// A raw or filtered three-axis sample.
pub type Vector3 = (f64, f64, f64);

/// One threshold-to-event mapping. Kept as a list rather than a map keyed on
/// the threshold itself, since thresholds are floating point (magnitudes,
/// angle degrees) and neither `f64`'s lack of `Eq`/`Ord` nor YAML's mapping
/// keys make a float-keyed map pleasant to configure or deserialize.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdEvent {
    pub threshold: f64,
    pub event: String,
}

/// Static configuration for one accelerometer device.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccelerometerConfig {
    /// The "upright" reference vector that level detection measures against.
    pub level_ref: Vector3,
    /// Angle-from-`level_ref` thresholds, in degrees. Iteration order
    /// matches configuration order; more than one may fire per sample.
    #[serde(default)]
    pub level_limits: Vec<ThresholdEvent>,
    /// Delta-magnitude thresholds. Iteration order matches configuration
    /// order; more than one may fire per sample.
    #[serde(default)]
    pub hit_limits: Vec<ThresholdEvent>,
    /// Exponential smoothing coefficient in `[0, 1]`.
    #[serde(default = "default_alpha")]
    pub alpha: f64,
}

fn default_alpha() -> f64 {
    0.95
}

impl Default for AccelerometerConfig {
    fn default() -> Self {
        Self {
            level_ref: (0.0, 0.0, 1.0),
            level_limits: Vec::new(),
            hit_limits: Vec::new(),
            alpha: default_alpha(),
        }
    }
}

/// Filters samples from one accelerometer and posts hit/level events.
pub struct AccelerometerProcessor {
    events: Rc<RefCell<EventBus>>,
    config: AccelerometerConfig,
    filtered: Option<Vector3>,
}

impl AccelerometerProcessor {
    /// Creates a processor posting to `events`, configured per `config`.
    pub fn new(events: Rc<RefCell<EventBus>>, config: AccelerometerConfig) -> Self {
        Self {
            events,
            config,
            filtered: None,
        }
    }

    /// Feeds one raw sample through the filter, posting any hit or level
    /// events it crosses the threshold for.
    ///
    /// The delta driving hit detection is the raw sample minus the
    /// *pre-update* filtered state, so it reads as the high-frequency
    /// residual the low-pass filter is about to absorb.
    pub fn update_acceleration(&mut self, sample: Vector3) {
        let delta = match self.filtered {
            None => {
                self.filtered = Some(sample);
                (0.0, 0.0, 0.0)
            }
            Some(prev) => {
                let d = (sample.0 - prev.0, sample.1 - prev.1, sample.2 - prev.2);
                let a = self.config.alpha;
                self.filtered = Some((
                    a * prev.0 + (1.0 - a) * sample.0,
                    a * prev.1 + (1.0 - a) * sample.1,
                    a * prev.2 + (1.0 - a) * sample.2,
                ));
                d
            }
        };

        self.handle_hits(delta);
        self.handle_level(sample);
    }

    fn handle_hits(&mut self, delta: Vector3) {
        let mag = magnitude(delta);
        for limit in &self.config.hit_limits {
            if mag > limit.threshold {
                debug!(magnitude = mag, threshold = limit.threshold, event = %limit.event, "accelerometer hit");
                self.events.borrow_mut().post(&limit.event);
            }
        }
    }

    fn handle_level(&mut self, sample: Vector3) {
        let reference = self.config.level_ref;
        let Some(theta_total) = angle_between(reference, sample) else {
            return;
        };
        let theta_x =
            angle_between((0.0, reference.1, reference.2), (0.0, sample.1, sample.2)).unwrap_or(0.0);
        let theta_y =
            angle_between((reference.0, 0.0, reference.2), (sample.0, 0.0, sample.2)).unwrap_or(0.0);

        let degrees = theta_total.to_degrees();
        for limit in &self.config.level_limits {
            if degrees > limit.threshold {
                debug!(degrees, threshold = limit.threshold, event = %limit.event, "accelerometer tilt");
                let mut payload = EventPayload::new();
                payload.insert("deviation_total".into(), theta_total);
                payload.insert("deviation_x".into(), theta_x);
                payload.insert("deviation_y".into(), theta_y);
                self.events.borrow_mut().post_with(&limit.event, payload);
            }
        }
    }
}

fn magnitude(v: Vector3) -> f64 {
    (v.0 * v.0 + v.1 * v.1 + v.2 * v.2).sqrt()
}

/// The angle in radians between two vectors, or `None` if either has zero
/// length (level detection is skipped for that sample rather than dividing
/// by zero).
fn angle_between(a: Vector3, b: Vector3) -> Option<f64> {
    let mag_a = magnitude(a);
    let mag_b = magnitude(b);
    if mag_a == 0.0 || mag_b == 0.0 {
        return None;
    }
    let dot = a.0 * b.0 + a.1 * b.1 + a.2 * b.2;
    let cos_theta = (dot / (mag_a * mag_b)).clamp(-1.0, 1.0);
    Some(cos_theta.acos())
}
