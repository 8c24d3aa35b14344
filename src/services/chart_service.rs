use std::fs;
use std::path::Path;

use plotters::prelude::*;
use thiserror::Error;
use uuid::Uuid;

use crate::models::chart::{HISTORY_TRACK_LABEL, PREDICTION_TRACK_LABEL};
use crate::models::ChartSeries;

const HISTORY_COLOR: RGBColor = RGBColor(59, 130, 246);
const PREDICTION_COLOR: RGBColor = RGBColor(34, 197, 94);

/// Keeps the x axis readable for long histories
const MAX_X_LABELS: usize = 12;

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("Axis bounds are not finite ({min}, {max})")]
    NonFiniteBounds { min: f64, max: f64 },
    #[error("Failed to render chart: {0}")]
    Render(String),
    #[error("Failed to read chart file: {0}")]
    Io(#[from] std::io::Error),
}

fn render_err<E: std::fmt::Display>(e: E) -> ChartError {
    ChartError::Render(e.to_string())
}

/// Render a projected series as PNG bytes
pub fn render_chart(
    series: &ChartSeries,
    ticker: &str,
    width: u32,
    height: u32,
) -> Result<Vec<u8>, ChartError> {
    if !series.axis.is_finite() {
        return Err(ChartError::NonFiniteBounds {
            min: series.axis.min,
            max: series.axis.max,
        });
    }

    // BitMapBackend encodes PNG only when writing to a path
    let temp_file = std::env::temp_dir().join(format!("stockcast_chart_{}.png", Uuid::new_v4()));

    let image = draw(series, ticker, &temp_file, (width, height))
        .and_then(|_| fs::read(&temp_file).map_err(ChartError::from));

    if let Err(e) = fs::remove_file(&temp_file) {
        tracing::warn!("Failed to delete temporary chart file {}: {}", temp_file.display(), e);
    }

    image
}

fn draw(series: &ChartSeries, ticker: &str, path: &Path, size: (u32, u32)) -> Result<(), ChartError> {
    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE).map_err(render_err)?;

    let last_index = series.len().saturating_sub(1) as f64;
    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!("{} Price History & Prediction", ticker),
            ("sans-serif", 32.0).into_font(),
        )
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(-0.5..last_index + 0.5, series.axis.min..series.axis.max)
        .map_err(render_err)?;

    let labels = &series.labels;
    chart
        .configure_mesh()
        .x_labels(series.len().min(MAX_X_LABELS))
        .x_label_formatter(&|x| label_at(labels, *x))
        .y_label_formatter(&|y| format!("{:.2}", y))
        .x_desc("Day")
        .y_desc("Price")
        .draw()
        .map_err(render_err)?;

    let history_points = || {
        series
            .history_track
            .iter()
            .enumerate()
            .map(|(i, price)| (i as f64, *price))
    };

    chart
        .draw_series(LineSeries::new(history_points(), HISTORY_COLOR.stroke_width(2)))
        .map_err(render_err)?
        .label(HISTORY_TRACK_LABEL)
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], HISTORY_COLOR.stroke_width(2)));

    chart
        .draw_series(history_points().map(|point| Circle::new(point, 3, HISTORY_COLOR.filled())))
        .map_err(render_err)?;

    if let Some((index, price)) = series.prediction_point() {
        chart
            .draw_series(std::iter::once(Circle::new(
                (index as f64, price),
                6,
                PREDICTION_COLOR.filled(),
            )))
            .map_err(render_err)?
            .label(PREDICTION_TRACK_LABEL)
            .legend(|(x, y)| Circle::new((x + 10, y), 5, PREDICTION_COLOR.filled()));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()
        .map_err(render_err)?;

    root.present().map_err(render_err)?;
    Ok(())
}

/// Label for an x tick; ticks between days stay blank
fn label_at(labels: &[String], x: f64) -> String {
    let index = x.round();
    if (x - index).abs() > 1e-6 || index < 0.0 {
        return String::new();
    }
    labels.get(index as usize).cloned().unwrap_or_default()
}
