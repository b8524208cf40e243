use serde::Serialize;

use crate::model::{MAX_GAMES, MIN_GAMES_FOR_PREDICTION, round1};
use crate::predictor::predict_points;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BacktestReport {
    pub samples: usize,
    pub mean_abs_error: f64,
    pub rmse: f64,
    /// Mean of predicted minus actual; positive means the model runs high.
    pub bias: f64,
    /// Share of actuals that landed within the reported error margin.
    pub within_margin_rate: f64,
}

/// Replays the predictor over a chronological series: every game after the
/// first `min_history` is predicted from the (at most ten) games before it.
pub fn walk_forward(points: &[f64], min_history: usize) -> BacktestReport {
    let min_history = min_history.max(MIN_GAMES_FOR_PREDICTION);

    let mut samples = 0usize;
    let mut abs_sum = 0.0;
    let mut sq_sum = 0.0;
    let mut signed_sum = 0.0;
    let mut within = 0usize;

    for idx in min_history..points.len() {
        let window = &points[idx.saturating_sub(MAX_GAMES)..idx];
        let prediction = predict_points(window);
        let actual = points[idx];
        let err = prediction.predicted_points - actual;

        samples += 1;
        abs_sum += err.abs();
        sq_sum += err * err;
        signed_sum += err;
        if err.abs() <= prediction.error_margin {
            within += 1;
        }
    }

    if samples == 0 {
        return BacktestReport {
            samples: 0,
            mean_abs_error: 0.0,
            rmse: 0.0,
            bias: 0.0,
            within_margin_rate: 0.0,
        };
    }
    let n = samples as f64;
    BacktestReport {
        samples,
        mean_abs_error: round1(abs_sum / n),
        rmse: round1((sq_sum / n).sqrt()),
        bias: round1(signed_sum / n),
        within_margin_rate: (within as f64 / n * 1000.0).round() / 1000.0,
    }
}
