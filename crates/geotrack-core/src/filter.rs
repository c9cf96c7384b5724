//! Accuracy filter for location samples.

use crate::types::LocationSample;

/// Whether `sample` is accurate enough to act on.
///
/// A threshold of `0` disables the filter. Otherwise the sample passes only
/// when its accuracy is strictly below the threshold.
#[must_use]
pub fn is_within_accuracy_threshold(sample: &LocationSample, threshold_m: u32) -> bool {
    threshold_m == 0 || sample.accuracy < f64::from(threshold_m)
}
