//! Confidence interpretation
//!
//! Maps a confidence percentage to a qualitative tier with fixed thresholds.

use serde::Serialize;

/// Lower bound (inclusive) of the High tier
pub const HIGH_THRESHOLD: f64 = 80.0;

/// Lower bound (inclusive) of the Moderate tier
pub const MODERATE_THRESHOLD: f64 = 60.0;

/// Qualitative confidence bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConfidenceTier {
    High,
    Moderate,
    Low,
}

impl ConfidenceTier {
    /// Tier for a confidence percentage
    ///
    /// Negative and NaN inputs fall through to `Low`.
    pub fn from_percent(confidence_percent: f64) -> Self {
        if confidence_percent >= HIGH_THRESHOLD {
            ConfidenceTier::High
        } else if confidence_percent >= MODERATE_THRESHOLD {
            ConfidenceTier::Moderate
        } else {
            ConfidenceTier::Low
        }
    }

    /// Heading shown on the result card
    pub fn title(&self) -> &'static str {
        match self {
            ConfidenceTier::High => "High Confidence Result",
            ConfidenceTier::Moderate => "Moderate Confidence Result",
            ConfidenceTier::Low => "Low Confidence Result",
        }
    }

    /// Guidance shown on the result card
    pub fn message(&self) -> &'static str {
        match self {
            ConfidenceTier::High => {
                "The AI model is very confident in this prediction. The result is highly reliable."
            }
            ConfidenceTier::Moderate => {
                "The AI model shows moderate confidence. Consider additional medical consultation."
            }
            ConfidenceTier::Low => {
                "The AI model has low confidence. Please consult with medical professionals and consider retaking the scan."
            }
        }
    }
}

/// Shorthand for [`ConfidenceTier::from_percent`]
pub fn tier(confidence_percent: f64) -> ConfidenceTier {
    ConfidenceTier::from_percent(confidence_percent)
}
