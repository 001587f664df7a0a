use crate::config::{ClipBound, Smoothing, SonifyConfig};
use crate::series::PriceSeries;

/// Smoothed series spanning less than this are treated as constant
const ZERO_SPREAD: f64 = 1e-15;

/// Relative change from each price to the next.
///
/// `change[i] = (price[i] - price[i-1]) / price[i-1]`, and the first point
/// has no reference so its change is 0. The result has one value per point.
pub fn percentage_changes(series: &PriceSeries) -> Vec<f64> {
    let prices = series.prices();
    std::iter::once(0.0)
        .chain(prices.windows(2).map(|w| (w[1] - w[0]) / w[0]))
        .collect()
}

/// Centered Gaussian-weighted moving average.
///
/// Each output is the weighted mean of the `window` points centered on it,
/// with weights `exp(-k² / 2σ²)` for offset `k`. Near the edges only the
/// neighbours that exist are used and their weights are renormalized.
pub fn smooth(values: &[f64], smoothing: &Smoothing) -> Vec<f64> {
    let half = (smoothing.window / 2) as isize;
    let two_var = 2.0 * smoothing.std * smoothing.std;
    let weights: Vec<f64> = (-half..=half)
        .map(|k| (-((k * k) as f64) / two_var).exp())
        .collect();

    let len = values.len() as isize;
    (0..len)
        .map(|i| {
            let mut sum = 0.0;
            let mut total = 0.0;
            for (w, k) in weights.iter().zip(-half..=half) {
                let j = i + k;
                if (0..len).contains(&j) {
                    sum += w * values[j as usize];
                    total += w;
                }
            }
            sum / total
        })
        .collect()
}

/// The symmetric bound smoothed values are clipped to.
///
/// For [`ClipBound::Percentile`] this is the percentile of the absolute
/// values, linearly interpolated between ranks.
pub fn clip_bound(values: &[f64], clip: &ClipBound) -> f64 {
    match *clip {
        ClipBound::Absolute { bound } => bound,
        ClipBound::Percentile { percentile } => {
            let mut magnitudes: Vec<f64> = values.iter().map(|v| v.abs()).collect();
            if magnitudes.is_empty() {
                return 0.0;
            }
            magnitudes.sort_by(f64::total_cmp);

            let position = percentile.clamp(0.0, 1.0) * (magnitudes.len() - 1) as f64;
            let lower = position.floor() as usize;
            let upper = position.ceil() as usize;
            let fraction = position - lower as f64;
            magnitudes[lower] + (magnitudes[upper] - magnitudes[lower]) * fraction
        }
    }
}

/// Turns a price series into a control signal in [-1, 1].
///
/// This function performs the following steps:
/// 1. Computes percentage changes
/// 2. Smooths them to suppress single-point spikes
/// 3. Clips them to a symmetric bound so one extreme move cannot dominate
/// 4. Divides by the bound, which keeps the sign of every change
///
/// A smoothed series with no spread (or a zero bound) gives all zeros.
pub fn normalize(series: &PriceSeries, config: &SonifyConfig) -> Vec<f64> {
    scale_changes(&percentage_changes(series), config)
}

/// Steps 2 to 4 of [`normalize`], for changes that are already computed
pub fn scale_changes(changes: &[f64], config: &SonifyConfig) -> Vec<f64> {
    let smoothed = smooth(changes, &config.smoothing);

    let (min, max) = smoothed
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let bound = clip_bound(&smoothed, &config.clip);

    if max - min <= ZERO_SPREAD || !bound.is_finite() || bound <= 0.0 {
        tracing::debug!("Smoothed changes have no usable spread; no modulation");
        return vec![0.0; smoothed.len()];
    }

    tracing::debug!("Clipping smoothed changes to ±{:.6}", bound);
    smoothed
        .iter()
        .map(|&v| v.clamp(-bound, bound) / bound)
        .collect()
}
