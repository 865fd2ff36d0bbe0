//! Remote classifier
//!
//! Wraps the single outbound call to the hosted brain MRI classification
//! model. Every transport or service fault is converted into a
//! [`ClassifierError`] value here; nothing past this boundary sees a
//! `reqwest` error.
//!
//! # Architecture
//! - [`Connector`] establishes a [`ConnectionState`] (never fails, a failed
//!   attempt is a `Disconnected` state carrying the reason)
//! - [`Classifier`] is the handle held by a connected state
//! - [`gradio`] implements both over the Gradio HTTP API

pub mod gradio;

pub use gradio::{GradioClassifier, GradioConnector};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Label used when the service omits the top class name
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Classifier errors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ClassifierError {
    /// Transport failure (DNS, connect, reset, timeout)
    #[error("Network error: {0}")]
    Network(String),

    /// Endpoint answered with a non-success status
    #[error("API error {0}: {1}")]
    Api(u16, String),

    /// The model service reported a failure for this request
    #[error("Service error: {0}")]
    Service(String),

    /// Response did not have the expected shape
    #[error("Malformed response: {0}")]
    Parse(String),

    /// Local image file could not be read
    #[error("Image read error: {0}")]
    Io(String),
}

impl From<reqwest::Error> for ClassifierError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ClassifierError::Parse(e.to_string())
        } else {
            ClassifierError::Network(e.to_string())
        }
    }
}

/// Normalized classification output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Top predicted class name
    pub label: String,
    /// Confidence of the top class, 0-100
    pub confidence_percent: f64,
}

/// Outcome of one remote classification: a prediction or an error, never both
pub type ClassificationResult = Result<Prediction, ClassifierError>;

/// Handle to a reachable remote model
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Endpoint description for logs and status display
    fn endpoint(&self) -> &str;

    /// Send the image at `image_path` to the model and wait for its answer
    ///
    /// Does not validate image content; the remote service owns that.
    async fn classify(&self, image_path: &Path) -> ClassificationResult;
}

/// Factory for connection attempts
#[async_trait]
pub trait Connector: Send + Sync {
    /// Attempt to reach the remote model
    async fn connect(&self) -> ConnectionState;
}

/// Whether the remote model is reachable for a session
#[derive(Clone)]
pub enum ConnectionState {
    /// Reachable; holds the handle used for classification
    Connected(Arc<dyn Classifier>),
    /// Last connection attempt failed
    Disconnected { reason: String },
}

impl ConnectionState {
    /// Disconnected state with the given reason
    pub fn disconnected(reason: impl Into<String>) -> Self {
        ConnectionState::Disconnected {
            reason: reason.into(),
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected(_))
    }

    /// Classifier handle, if connected
    pub fn handle(&self) -> Option<&Arc<dyn Classifier>> {
        match self {
            ConnectionState::Connected(handle) => Some(handle),
            ConnectionState::Disconnected { .. } => None,
        }
    }

    /// Failure reason, if disconnected
    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            ConnectionState::Connected(_) => None,
            ConnectionState::Disconnected { reason } => Some(reason),
        }
    }
}

impl fmt::Debug for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Connected(handle) => f
                .debug_tuple("Connected")
                .field(&handle.endpoint())
                .finish(),
            ConnectionState::Disconnected { reason } => f
                .debug_struct("Disconnected")
                .field("reason", reason)
                .finish(),
        }
    }
}

/// Label component payload returned by the model
///
/// `{"label": "Glioma", "confidences": [{"label": "Glioma", "confidence": 0.92}, ...]}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LabelPayload {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub confidences: Option<Vec<LabelConfidence>>,
}

/// One per-class confidence entry, fraction in [0, 1]
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LabelConfidence {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

impl LabelPayload {
    /// Normalize into `(label, confidence_percent)`
    ///
    /// The confidence is taken from the entry naming the top label; when no
    /// entry names it, the first entry is used. Missing data yields 0.
    pub fn into_prediction(self) -> Prediction {
        let label = self.label.unwrap_or_else(|| UNKNOWN_LABEL.to_string());
        let confidences = self.confidences.unwrap_or_default();

        let entry = confidences
            .iter()
            .find(|c| c.label.as_deref() == Some(label.as_str()))
            .or_else(|| confidences.first());

        let fraction = entry.and_then(|c| c.confidence).unwrap_or(0.0);

        Prediction {
            label,
            confidence_percent: to_percent(fraction),
        }
    }
}

/// Scale a [0, 1] fraction to a [0, 100] percentage
fn to_percent(fraction: f64) -> f64 {
    if fraction.is_nan() {
        return 0.0;
    }
    (fraction * 100.0).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: serde_json::Value) -> LabelPayload {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_first_entry_scaled_to_percent() {
        let prediction = payload(json!({
            "label": "Glioma",
            "confidences": [{"confidence": 0.92}]
        }))
        .into_prediction();

        assert_eq!(prediction.label, "Glioma");
        assert!((prediction.confidence_percent - 92.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_confidences_default_to_zero() {
        let prediction = payload(json!({"label": "No Tumor"})).into_prediction();
        assert_eq!(prediction.label, "No Tumor");
        assert_eq!(prediction.confidence_percent, 0.0);

        let prediction = payload(json!({"label": "No Tumor", "confidences": []})).into_prediction();
        assert_eq!(prediction.confidence_percent, 0.0);

        let prediction = payload(json!({"label": "No Tumor", "confidences": null})).into_prediction();
        assert_eq!(prediction.confidence_percent, 0.0);
    }

    #[test]
    fn test_missing_label_is_unknown() {
        let prediction = payload(json!({"confidences": [{"confidence": 0.5}]})).into_prediction();
        assert_eq!(prediction.label, UNKNOWN_LABEL);
        assert!((prediction.confidence_percent - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_entry_matching_top_label_wins() {
        let prediction = payload(json!({
            "label": "Meningioma",
            "confidences": [
                {"label": "Glioma", "confidence": 0.10},
                {"label": "Meningioma", "confidence": 0.85},
                {"label": "Pituitary", "confidence": 0.05}
            ]
        }))
        .into_prediction();

        assert_eq!(prediction.label, "Meningioma");
        assert!((prediction.confidence_percent - 85.0).abs() < 1e-9);
    }

    #[test]
    fn test_out_of_range_confidence_clamped() {
        let prediction = payload(json!({"label": "Glioma", "confidences": [{"confidence": 1.7}]}))
            .into_prediction();
        assert_eq!(prediction.confidence_percent, 100.0);

        let prediction = payload(json!({"label": "Glioma", "confidences": [{"confidence": -0.2}]}))
            .into_prediction();
        assert_eq!(prediction.confidence_percent, 0.0);
    }

    #[test]
    fn test_connection_state_accessors() {
        let state = ConnectionState::disconnected("dns failure");
        assert!(!state.is_connected());
        assert!(state.handle().is_none());
        assert_eq!(state.failure_reason(), Some("dns failure"));
        assert!(format!("{:?}", state).contains("dns failure"));
    }
}
