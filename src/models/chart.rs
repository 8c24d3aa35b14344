//! Chart-ready series models

/// Legend for the historical closes track
pub const HISTORY_TRACK_LABEL: &str = "Previous Close";
/// Legend for the prediction marker track
pub const PREDICTION_TRACK_LABEL: &str = "Prediction";

/// Vertical range a chart renders
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisBounds {
    pub min: f64,
    pub max: f64,
}

impl AxisBounds {
    pub fn is_finite(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }
}

/// Derived on every render, never stored
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    /// "Day 1", "Day 2", ... one per history point
    pub labels: Vec<String>,
    pub history_track: Vec<f64>,
    /// Same length as the history; only the last slot is populated.
    /// `None` when there is no prediction, in which case only one track is drawn.
    pub prediction_track: Option<Vec<Option<f64>>>,
    pub axis: AxisBounds,
}

impl ChartSeries {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Index and value of the prediction marker, if any
    pub fn prediction_point(&self) -> Option<(usize, f64)> {
        self.prediction_track
            .as_ref()?
            .iter()
            .enumerate()
            .rev()
            .find_map(|(i, v)| v.map(|price| (i, price)))
    }
}
