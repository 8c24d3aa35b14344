use crate::models::{AxisBounds, ChartSeries};

/// Share of the data range added above and below the data
pub const AXIS_PADDING_RATIO: f64 = 0.1;

/// Padding used instead when every value is identical
pub const MIN_AXIS_PADDING: f64 = 1.0;

/// Turn a history and an optional prediction into a chart-ready series.
///
/// Returns `None` when there is nothing to plot. The prediction is placed on
/// the final index so its marker sits next to the last close. Non-finite
/// inputs are not rejected and show up as non-finite bounds.
pub fn project(history: &[f64], prediction: Option<f64>) -> Option<ChartSeries> {
    if history.is_empty() {
        return None;
    }

    let labels = (1..=history.len()).map(|day| format!("Day {}", day)).collect();

    let prediction_track = prediction.map(|price| {
        let mut track = vec![None; history.len()];
        if let Some(last) = track.last_mut() {
            *last = Some(price);
        }
        track
    });

    let axis = axis_bounds(history.iter().copied().chain(prediction));

    Some(ChartSeries {
        labels,
        history_track: history.to_vec(),
        prediction_track,
        axis,
    })
}

/// Min/max of `values` padded by 10% of their range on each side
pub fn axis_bounds(values: impl IntoIterator<Item = f64>) -> AxisBounds {
    let (raw_min, raw_max) = values
        .into_iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (nan_min(lo, v), nan_max(hi, v))
        });

    let range = raw_max - raw_min;
    let padding = if range == 0.0 {
        MIN_AXIS_PADDING
    } else {
        range * AXIS_PADDING_RATIO
    };

    AxisBounds {
        min: raw_min - padding,
        max: raw_max + padding,
    }
}

// f64::min/max skip NaN; these let it through
fn nan_min(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else {
        a.min(b)
    }
}

fn nan_max(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else {
        a.max(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < EPSILON,
            "expected {} but got {}",
            expected,
            actual
        );
    }

    #[test]
    fn test_empty_history_projects_nothing() {
        assert_eq!(project(&[], Some(200.0)), None);
        assert_eq!(project(&[], None), None);
    }

    #[test]
    fn test_history_with_prediction() {
        let series = project(&[100.0, 102.0, 101.0], Some(200.0)).expect("series");

        assert_eq!(series.labels, vec!["Day 1", "Day 2", "Day 3"]);
        assert_eq!(series.history_track, vec![100.0, 102.0, 101.0]);
        assert_eq!(series.prediction_track, Some(vec![None, None, Some(200.0)]));
        assert_close(series.axis.min, 90.0);
        assert_close(series.axis.max, 210.0);
        assert_eq!(series.prediction_point(), Some((2, 200.0)));
    }

    #[test]
    fn test_without_prediction_only_history_track() {
        let series = project(&[10.0, 20.0], None).expect("series");

        assert_eq!(series.prediction_track, None);
        assert_eq!(series.prediction_point(), None);
        assert_close(series.axis.min, 9.0);
        assert_close(series.axis.max, 21.0);
    }

    #[test]
    fn test_prediction_below_history_extends_min() {
        let series = project(&[50.0, 60.0], Some(40.0)).expect("series");

        assert_close(series.axis.min, 38.0);
        assert_close(series.axis.max, 62.0);
    }

    #[test]
    fn test_labels_match_history_length() {
        for len in 1..40 {
            let history: Vec<f64> = (0..len).map(|i| (i as f64 * 1.7).sin() * 10.0 + 50.0).collect();
            for prediction in [None, Some(55.0)] {
                let series = project(&history, prediction).expect("series");
                assert_eq!(series.labels.len(), history.len());
                assert_eq!(series.len(), history.len());
                if let Some(track) = &series.prediction_track {
                    assert_eq!(track.len(), history.len());
                }
            }
        }
    }

    #[test]
    fn test_padding_is_twenty_percent_of_range() {
        let cases: [(&[f64], Option<f64>); 4] = [
            (&[1.0, 2.0, 3.0], None),
            (&[-5.0, 5.0], Some(0.0)),
            (&[0.001, 0.002], Some(0.0015)),
            (&[1_000_000.0, 999_000.0], Some(1_200_000.0)),
        ];

        for (history, prediction) in cases {
            let values: Vec<f64> = history.iter().copied().chain(prediction).collect();
            let raw_min = values.iter().copied().fold(f64::INFINITY, f64::min);
            let raw_max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

            let axis = project(history, prediction).expect("series").axis;
            assert!(axis.min < raw_min);
            assert!(raw_max < axis.max);
            let span = axis.max - axis.min;
            let expected = 1.2 * (raw_max - raw_min);
            assert!((span - expected).abs() <= expected * 1e-9, "span {} vs {}", span, expected);
        }
    }

    #[test]
    fn test_flat_series_gets_minimum_padding() {
        let axis = project(&[42.0], None).expect("series").axis;
        assert_close(axis.min, 41.0);
        assert_close(axis.max, 43.0);

        let axis = project(&[42.0, 42.0], Some(42.0)).expect("series").axis;
        assert_close(axis.min, 41.0);
        assert_close(axis.max, 43.0);
    }

    #[test]
    fn test_projection_is_pure() {
        let history = [3.0, 1.0, 4.0, 1.0, 5.0];
        assert_eq!(project(&history, Some(9.0)), project(&history, Some(9.0)));
        assert_eq!(history, [3.0, 1.0, 4.0, 1.0, 5.0]);
    }

    #[test]
    fn test_nan_propagates_to_bounds() {
        let series = project(&[1.0, f64::NAN, 3.0], Some(2.0)).expect("series");
        assert!(series.axis.min.is_nan());
        assert!(series.axis.max.is_nan());
        assert!(!series.axis.is_finite());
    }

    #[test]
    fn test_infinity_propagates_to_bounds() {
        let axis = project(&[1.0, 2.0], Some(f64::INFINITY)).expect("series").axis;
        assert!(!axis.is_finite());
    }
}
