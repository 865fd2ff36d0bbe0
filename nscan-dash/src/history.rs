//! Session analysis history
//!
//! Bounded, insertion-ordered log of the most recent analyses. Holds at most
//! [`HISTORY_CAPACITY`] records; appending beyond that evicts the oldest.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};

/// Maximum number of retained analyses per session
pub const HISTORY_CAPACITY: usize = 10;

/// Placeholder for the most common prediction when history is empty
pub const NO_PREDICTION: &str = "N/A";

/// One completed analysis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRecord {
    pub timestamp: DateTime<Utc>,
    pub image_name: String,
    pub prediction: String,
    pub confidence_percent: f64,
}

impl AnalysisRecord {
    /// Record stamped with the current time
    pub fn new(image_name: impl Into<String>, prediction: impl Into<String>, confidence_percent: f64) -> Self {
        Self {
            timestamp: Utc::now(),
            image_name: image_name.into(),
            prediction: prediction.into(),
            confidence_percent,
        }
    }
}

/// Aggregate statistics over retained records
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistorySummary {
    pub count: usize,
    /// Arithmetic mean; 0 when empty
    pub mean_confidence_percent: f64,
    /// Mode of predictions; [`NO_PREDICTION`] when empty
    pub most_common: String,
}

/// Bounded history of analyses for one session
#[derive(Debug, Clone, Default)]
pub struct HistoryStore {
    records: VecDeque<AnalysisRecord>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self {
            records: VecDeque::with_capacity(HISTORY_CAPACITY + 1),
        }
    }

    /// Append a record, evicting the oldest beyond capacity
    pub fn append(&mut self, record: AnalysisRecord) {
        self.records.push_back(record);
        while self.records.len() > HISTORY_CAPACITY {
            self.records.pop_front();
        }
    }

    /// The last `n` records, most recent first
    pub fn recent(&self, n: usize) -> Vec<AnalysisRecord> {
        self.records.iter().rev().take(n).cloned().collect()
    }

    /// Count, mean confidence and most common prediction
    pub fn summary(&self) -> HistorySummary {
        let count = self.records.len();
        let mean_confidence_percent = if count == 0 {
            0.0
        } else {
            self.records.iter().map(|r| r.confidence_percent).sum::<f64>() / count as f64
        };
        let most_common = self
            .distribution()
            .into_iter()
            .next()
            .map(|(prediction, _)| prediction)
            .unwrap_or_else(|| NO_PREDICTION.to_string());

        HistorySummary {
            count,
            mean_confidence_percent,
            most_common,
        }
    }

    /// `(prediction, count)` pairs, most frequent first
    ///
    /// Equal counts keep first-occurrence order, so the head of the list is
    /// the mode with ties going to the earliest retained prediction.
    pub fn distribution(&self) -> Vec<(String, usize)> {
        let mut counts: Vec<(String, usize)> = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::new();

        for record in &self.records {
            match index.get(record.prediction.as_str()) {
                Some(&i) => counts[i].1 += 1,
                None => {
                    index.insert(record.prediction.as_str(), counts.len());
                    counts.push((record.prediction.clone(), 1));
                }
            }
        }

        // Stable sort preserves first-occurrence order among ties
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        counts
    }

    /// Records in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &AnalysisRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
