//! Analysis pipeline
//!
//! Runs one analysis for a session:
//! 1. Refuse immediately when the session has no classifier connection
//! 2. Write the upload to a uniquely named transient file
//! 3. Classify it remotely
//! 4. Remove the transient file (on every exit path, see below)
//! 5. On success, append the result to the session history
//!
//! The transient file is a `tempfile::NamedTempFile`; dropping it deletes the
//! file, so early returns and panics cannot leak it. On the normal path it is
//! closed explicitly so a failed delete gets logged.

use crate::classifier::{ClassifierError, Prediction};
use crate::history::AnalysisRecord;
use crate::session::Session;
use chrono::Utc;
use nscan_common::events::{EventBus, NeuroScanEvent};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info, warn};

/// File extensions accepted by the upload widget
pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "dcm"];

/// Longest original-name fragment kept in a transient file name
const MAX_NAME_FRAGMENT: usize = 64;

/// Transient files are named `nscan_<random>_<sanitized original name>`
pub const TRANSIENT_PREFIX: &str = "nscan_";

/// Length of the random component of a transient file name
pub const TRANSIENT_RAND_LEN: usize = 8;

/// Analysis errors
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Session has no classifier connection; nothing was sent
    #[error("AI model is not connected")]
    NotConnected,

    /// Remote classification failed; history untouched
    #[error("Analysis failed: {0}")]
    Classification(#[from] ClassifierError),

    /// Transient file could not be written
    #[error("Transient storage error: {0}")]
    Storage(#[from] std::io::Error),
}

/// An uploaded image, alive for one analysis request
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub file_name: String,
    /// Declared MIME type, if the client sent one
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadedImage {
    pub fn new(file_name: impl Into<String>, content_type: Option<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type,
            bytes,
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Lowercased file extension
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.file_name)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
    }

    /// Whether the extension is one the dashboard accepts
    pub fn has_supported_extension(&self) -> bool {
        self.extension()
            .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
            .unwrap_or(false)
    }
}

/// Successful analysis output
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisOutcome {
    pub prediction: Prediction,
    pub record: AnalysisRecord,
}

/// Orchestrates transient storage, classification and history
#[derive(Clone)]
pub struct AnalysisPipeline {
    temp_dir: PathBuf,
    event_bus: EventBus,
}

impl AnalysisPipeline {
    pub fn new(temp_dir: PathBuf, event_bus: EventBus) -> Self {
        Self {
            temp_dir,
            event_bus,
        }
    }

    /// Analyze `image` within `session`
    ///
    /// Mutates the session history exactly once on success and never on
    /// failure.
    pub async fn analyze(
        &self,
        session: &mut Session,
        image: &UploadedImage,
    ) -> Result<AnalysisOutcome, AnalysisError> {
        let classifier = match session.connection.handle() {
            Some(handle) => handle.clone(),
            None => {
                debug!(session_id = %session.id, "Analyze refused: not connected");
                return Err(AnalysisError::NotConnected);
            }
        };

        info!(
            session_id = %session.id,
            image = %image.file_name,
            bytes = image.size(),
            "Starting analysis"
        );
        self.event_bus.emit_lossy(NeuroScanEvent::AnalysisStarted {
            session_id: session.id,
            image_name: image.file_name.clone(),
            timestamp: Utc::now(),
        });

        let result = match self.write_transient(image) {
            Ok(transient) => {
                let result = classifier.classify(transient.path()).await;
                let path = transient.path().to_path_buf();
                if let Err(e) = transient.close() {
                    warn!(path = %path.display(), error = %e, "Failed to remove transient file");
                }
                result.map_err(AnalysisError::from)
            }
            Err(e) => Err(AnalysisError::Storage(e)),
        };

        match result {
            Ok(prediction) => {
                let record = AnalysisRecord::new(
                    image.file_name.clone(),
                    prediction.label.clone(),
                    prediction.confidence_percent,
                );
                session.history.append(record.clone());

                self.event_bus.emit_lossy(NeuroScanEvent::AnalysisCompleted {
                    session_id: session.id,
                    image_name: image.file_name.clone(),
                    label: prediction.label.clone(),
                    confidence_percent: prediction.confidence_percent,
                    timestamp: Utc::now(),
                });

                Ok(AnalysisOutcome { prediction, record })
            }
            Err(e) => {
                warn!(session_id = %session.id, error = %e, "Analysis failed");
                self.event_bus.emit_lossy(NeuroScanEvent::AnalysisFailed {
                    session_id: session.id,
                    image_name: image.file_name.clone(),
                    error: e.to_string(),
                    timestamp: Utc::now(),
                });
                Err(e)
            }
        }
    }

    fn write_transient(&self, image: &UploadedImage) -> std::io::Result<NamedTempFile> {
        let suffix = format!("_{}", sanitize_file_name(&image.file_name));
        let mut transient = tempfile::Builder::new()
            .prefix(TRANSIENT_PREFIX)
            .rand_bytes(TRANSIENT_RAND_LEN)
            .suffix(&suffix)
            .tempfile_in(&self.temp_dir)?;

        transient.write_all(&image.bytes)?;
        transient.flush()?;

        debug!(path = %transient.path().display(), "Transient file written");
        Ok(transient)
    }
}

/// Sanitized original name carried by a transient file path
///
/// Returns `None` when the path does not follow the transient naming scheme.
pub fn transient_original_name(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let original = name
        .strip_prefix(TRANSIENT_PREFIX)?
        .get(TRANSIENT_RAND_LEN..)?
        .strip_prefix('_')?;
    if original.is_empty() {
        None
    } else {
        Some(original.to_string())
    }
}

/// Reduce an uploaded name to a safe file name fragment
///
/// Keeps ASCII alphanumerics, `.`, `-` and `_`; anything else becomes `_`.
/// Path components are dropped and the fragment is capped from the end so
/// the extension survives.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let cleaned = cleaned.trim_start_matches('.');
    let start = cleaned.len().saturating_sub(MAX_NAME_FRAGMENT);
    let fragment = &cleaned[start..];

    if fragment.is_empty() {
        "upload".to_string()
    } else {
        fragment.to_string()
    }
}
