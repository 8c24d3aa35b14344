//! Data models for the predictor commands and services
//!
//! Request lifecycle state, chart-ready series and the derived page view.

pub mod chart;
pub mod prediction;
pub mod view;

pub use chart::{AxisBounds, ChartSeries};
pub use prediction::{PredictionRequest, PredictionResult, RequestState};
pub use view::PageView;
