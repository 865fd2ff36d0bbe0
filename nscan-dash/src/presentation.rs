//! Presentation view models
//!
//! Shapes core data for the dashboard page. Nothing here decides anything;
//! tiers come from [`crate::confidence`] and statistics from
//! [`crate::history`].

use crate::classifier::{ConnectionState, Prediction};
use crate::confidence::ConfidenceTier;
use crate::history::{AnalysisRecord, HistoryStore};
use crate::pipeline::UploadedImage;
use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use std::io::Cursor;

/// Label for the remainder bar of the confidence chart
const OTHER_BAR: &str = "Other";

/// Connection indicator
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionView {
    pub connected: bool,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&ConnectionState> for ConnectionView {
    fn from(state: &ConnectionState) -> Self {
        match state {
            ConnectionState::Connected(handle) => Self {
                connected: true,
                status: "AI Model Connected",
                endpoint: Some(handle.endpoint().to_string()),
                error: None,
            },
            ConnectionState::Disconnected { reason } => Self {
                connected: false,
                status: "AI Model Disconnected",
                endpoint: None,
                error: Some(reason.clone()),
            },
        }
    }
}

/// One horizontal bar
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartBar {
    pub name: String,
    pub value: f64,
    pub text: String,
}

/// Two-bar chart: the predicted label against the remainder
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfidenceChart {
    pub title: String,
    pub bars: Vec<ChartBar>,
}

impl ConfidenceChart {
    pub fn new(label: &str, confidence_percent: f64) -> Self {
        let remainder = 100.0 - confidence_percent;
        Self {
            title: format!("Prediction Confidence: {}", label),
            bars: vec![
                ChartBar {
                    name: label.to_string(),
                    value: confidence_percent,
                    text: format_percent(confidence_percent),
                },
                ChartBar {
                    name: OTHER_BAR.to_string(),
                    value: remainder,
                    text: format_percent(remainder),
                },
            ],
        }
    }
}

/// Result card for a completed analysis
#[derive(Debug, Clone, Serialize)]
pub struct ResultCard {
    pub label: String,
    pub confidence_percent: f64,
    pub confidence_display: String,
    pub tier: ConfidenceTier,
    pub tier_title: &'static str,
    pub tier_message: &'static str,
    pub chart: ConfidenceChart,
}

impl From<&Prediction> for ResultCard {
    fn from(prediction: &Prediction) -> Self {
        let tier = ConfidenceTier::from_percent(prediction.confidence_percent);
        Self {
            label: prediction.label.clone(),
            confidence_percent: prediction.confidence_percent,
            confidence_display: format_percent(prediction.confidence_percent),
            tier,
            tier_title: tier.title(),
            tier_message: tier.message(),
            chart: ConfidenceChart::new(&prediction.label, prediction.confidence_percent),
        }
    }
}

/// Sidebar history entry
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntryView {
    /// "Analysis N", numbered from the oldest retained record
    pub title: String,
    pub time: String,
    pub timestamp: DateTime<Utc>,
    pub image_name: String,
    pub prediction: String,
    pub confidence_display: String,
}

/// Recent history, most recent first
pub fn history_entries(history: &HistoryStore, limit: usize) -> Vec<HistoryEntryView> {
    let total = history.len();
    history
        .recent(limit)
        .iter()
        .enumerate()
        .map(|(i, record)| history_entry(total - i, record))
        .collect()
}

fn history_entry(number: usize, record: &AnalysisRecord) -> HistoryEntryView {
    HistoryEntryView {
        title: format!("Analysis {}", number),
        time: record
            .timestamp
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        timestamp: record.timestamp,
        image_name: record.image_name.clone(),
        prediction: record.prediction.clone(),
        confidence_display: format_percent(record.confidence_percent),
    }
}

/// One slice of the prediction distribution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionSlice {
    pub prediction: String,
    pub count: usize,
}

/// Statistics panel
#[derive(Debug, Clone, Serialize)]
pub struct StatisticsView {
    pub total_analyses: usize,
    pub average_confidence_percent: f64,
    pub average_confidence_display: String,
    pub most_common: String,
    /// Only populated with more than one analysis
    pub distribution: Vec<DistributionSlice>,
}

impl From<&HistoryStore> for StatisticsView {
    fn from(history: &HistoryStore) -> Self {
        let summary = history.summary();
        let distribution = if summary.count > 1 {
            history
                .distribution()
                .into_iter()
                .map(|(prediction, count)| DistributionSlice { prediction, count })
                .collect()
        } else {
            Vec::new()
        };

        Self {
            total_analyses: summary.count,
            average_confidence_percent: summary.mean_confidence_percent,
            average_confidence_display: format_percent(summary.mean_confidence_percent),
            most_common: summary.most_common,
            distribution,
        }
    }
}

/// Image information panel
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageInfo {
    pub file_name: String,
    pub size_bytes: usize,
    pub size_display: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Detected from content; `None` for formats the decoder does not know (e.g. DICOM)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

impl From<&UploadedImage> for ImageInfo {
    fn from(image: &UploadedImage) -> Self {
        let (format, dimensions) = read_image_header(&image.bytes);
        Self {
            file_name: image.file_name.clone(),
            size_bytes: image.size(),
            size_display: format!("{:.1} KB", image.size() as f64 / 1024.0),
            content_type: image.content_type.clone(),
            format,
            width: dimensions.map(|(w, _)| w),
            height: dimensions.map(|(_, h)| h),
        }
    }
}

/// Detect format and read dimensions from the header only
fn read_image_header(bytes: &[u8]) -> (Option<String>, Option<(u32, u32)>) {
    let reader = match image::ImageReader::new(Cursor::new(bytes)).with_guessed_format() {
        Ok(reader) => reader,
        Err(_) => return (None, None),
    };

    let format = reader.format().map(|f| format!("{:?}", f).to_uppercase());
    let dimensions = match format {
        Some(_) => reader.into_dimensions().ok(),
        None => None,
    };

    (format, dimensions)
}

/// One-decimal percentage, e.g. "92.0%"
pub fn format_percent(value: f64) -> String {
    format!("{:.1}%", value)
}
