use crate::model::{GameSeries, MAX_GAMES, Prediction, RegressionFit, round1};

const SAMPLE_WEIGHT: f64 = 50.0;
const CONSISTENCY_WEIGHT: f64 = 30.0;
const FIT_WEIGHT: f64 = 20.0;

/// Fits an OLS trend over the series in chronological order and projects the
/// next game. Callers enforce the minimum-history precondition.
pub fn predict(series: &GameSeries) -> Prediction {
    predict_points(&series.chronological_points())
}

/// `points` must be oldest first.
pub fn predict_points(points: &[f64]) -> Prediction {
    let n = points.len();
    let fit = fit_trend(points);
    let next_index = (n + 1) as f64;
    let projected = fit.intercept + fit.slope * next_index;

    let (mean, std_dev) = mean_and_std_dev(points);
    let confidence = confidence_score(n, mean, std_dev, fit.r_squared);

    Prediction {
        predicted_points: round1(projected),
        confidence: round1(confidence),
        error_margin: round1(std_dev),
        games_used: n,
        fit,
    }
}

pub fn fit_trend(points: &[f64]) -> RegressionFit {
    let n = points.len();
    if n == 0 {
        return RegressionFit {
            slope: 0.0,
            intercept: 0.0,
            r_squared: 0.0,
        };
    }
    let nf = n as f64;
    let mean_x = (nf + 1.0) / 2.0;
    let mean_y = points.iter().sum::<f64>() / nf;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for (i, y) in points.iter().enumerate() {
        let dx = (i + 1) as f64 - mean_x;
        sxx += dx * dx;
        sxy += dx * (y - mean_y);
    }
    let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };
    let intercept = mean_y - slope * mean_x;

    let mut tss = 0.0;
    let mut rss = 0.0;
    for (i, y) in points.iter().enumerate() {
        let fitted = intercept + slope * (i + 1) as f64;
        tss += (y - mean_y).powi(2);
        rss += (y - fitted).powi(2);
    }

    RegressionFit {
        slope,
        intercept,
        r_squared: r_squared(rss, tss),
    }
}

fn r_squared(rss: f64, tss: f64) -> f64 {
    const EPS: f64 = 1e-12;
    if tss <= EPS {
        return if rss <= EPS { 1.0 } else { 0.0 };
    }
    (1.0 - rss / tss).clamp(0.0, 1.0)
}

pub fn mean_and_std_dev(points: &[f64]) -> (f64, f64) {
    if points.is_empty() {
        return (0.0, 0.0);
    }
    let n = points.len() as f64;
    let mean = points.iter().sum::<f64>() / n;
    let variance = points.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

fn confidence_score(games: usize, mean: f64, std_dev: f64, r_squared: f64) -> f64 {
    let sample = games.min(MAX_GAMES) as f64 / MAX_GAMES as f64 * SAMPLE_WEIGHT;
    let consistency = if mean > 0.0 {
        (1.0 - (std_dev / mean).min(1.0)) * CONSISTENCY_WEIGHT
    } else {
        0.0
    };
    let fit = r_squared * FIT_WEIGHT;
    (sample + consistency + fit).clamp(0.0, 100.0)
}
