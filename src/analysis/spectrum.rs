use crate::config::{FundamentalMapping, SonifyConfig};
use crate::series::PriceSeries;
use rustfft::{num_complex::Complex, FftPlanner};
use std::f64::consts::PI;
use std::fmt;

/// Magnitudes at or below this fraction of the summed absolute input count as silence
const FLAT_TOLERANCE: f64 = 1e-12;

/// Highest frequency a one-sample-per-step series can carry (cycles/sample)
const NYQUIST: f64 = 0.5;

/// Why detection fell back to the default fundamental
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    /// Fewer than two points, or no non-DC bin to choose from
    TooShort,
    /// Every non-DC magnitude is zero (constant series)
    FlatSpectrum,
    /// The peak converted to a non-positive or non-finite frequency
    NonFinite,
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            FallbackReason::TooShort => "series too short for spectral analysis",
            FallbackReason::FlatSpectrum => "flat spectrum (constant series)",
            FallbackReason::NonFinite => "peak frequency is not a positive finite number",
        };
        f.write_str(text)
    }
}

/// Strongest non-DC component of a series
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectralPeak {
    pub bin: usize,
    /// Frequency in cycles per sample, in (0, 0.5]
    pub frequency: f64,
    pub magnitude: f64,
}

/// The base pitch chosen for a whole series
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fundamental {
    /// Frequency used by the rest of the pipeline (Hz)
    pub hz: f64,
    /// The detected peak, when detection succeeded
    pub peak: Option<SpectralPeak>,
    /// Set when `hz` is the configured default instead of a detection
    pub fallback: Option<FallbackReason>,
}

/// Detects the fundamental frequency of a price series.
///
/// This function performs the following steps:
/// 1. Finds the strongest non-DC spectral peak (see [`detect_peak`])
/// 2. Maps its frequency into `fundamental_range_hz` using the configured
///    [`FundamentalMapping`]
///
/// When the peak cannot be found, the configured
/// `default_fundamental_hz` is returned as-is and the reason is recorded.
pub fn detect_fundamental(series: &PriceSeries, config: &SonifyConfig) -> Fundamental {
    let prices = series.prices();

    let result = detect_peak(&prices).and_then(|peak| {
        let hz = to_audible(peak.frequency, config);
        if hz.is_finite() && hz > 0.0 {
            Ok(Fundamental {
                hz,
                peak: Some(peak),
                fallback: None,
            })
        } else {
            Err(FallbackReason::NonFinite)
        }
    });

    match result {
        Ok(fundamental) => {
            tracing::info!(
                "Detected fundamental {:.2} Hz (bin {}, {:.4} cycles/sample)",
                fundamental.hz,
                fundamental.peak.map_or(0, |p| p.bin),
                fundamental.peak.map_or(0.0, |p| p.frequency)
            );
            fundamental
        }
        Err(reason) => {
            tracing::warn!(
                "No usable spectral peak ({}). Using default {} Hz",
                reason,
                config.default_fundamental_hz
            );
            Fundamental {
                hz: config.default_fundamental_hz,
                peak: None,
                fallback: Some(reason),
            }
        }
    }
}

/// Finds the strongest non-DC component of a series sampled once per step.
///
/// The series is mean-centered and Hann-windowed before the FFT. Bins
/// `1..=N/2` are searched; equal magnitudes resolve to the lowest bin.
///
/// # Errors
/// * [`FallbackReason::TooShort`] for fewer than two points
/// * [`FallbackReason::FlatSpectrum`] when every candidate magnitude is zero
/// * [`FallbackReason::NonFinite`] when the input holds non-finite values
pub fn detect_peak(prices: &[f64]) -> Result<SpectralPeak, FallbackReason> {
    let len = prices.len();
    if len < 2 {
        return Err(FallbackReason::TooShort);
    }
    if prices.iter().any(|p| !p.is_finite()) {
        return Err(FallbackReason::NonFinite);
    }
    if prices.iter().all(|&p| p == prices[0]) {
        return Err(FallbackReason::FlatSpectrum);
    }

    let mean = prices.iter().sum::<f64>() / len as f64;
    let centered: Vec<f64> = prices.iter().map(|p| p - mean).collect();
    let windowed = apply_hann_window(&centered);
    let spectrum = compute_fft(&windowed);

    let mut best: Option<(usize, f64)> = None;
    for (bin, value) in spectrum.iter().enumerate().take(len / 2 + 1).skip(1) {
        let magnitude = value.norm();
        // Strictly greater keeps the lowest bin on ties
        if best.map_or(true, |(_, m)| magnitude > m) {
            best = Some((bin, magnitude));
        }
    }

    let (bin, magnitude) = best.ok_or(FallbackReason::TooShort)?;
    let scale: f64 = prices.iter().map(|p| p.abs()).sum();
    if !magnitude.is_finite() {
        return Err(FallbackReason::NonFinite);
    }
    if magnitude <= FLAT_TOLERANCE * scale {
        return Err(FallbackReason::FlatSpectrum);
    }

    Ok(SpectralPeak {
        bin,
        frequency: bin as f64 / len as f64,
        magnitude,
    })
}

fn to_audible(frequency: f64, config: &SonifyConfig) -> f64 {
    let [low, high] = config.fundamental_range_hz;
    match config.fundamental_mapping {
        FundamentalMapping::Clamp => frequency.clamp(low, high),
        FundamentalMapping::LogScale => {
            let position = (frequency / NYQUIST).clamp(0.0, 1.0);
            low * (high / low).powf(position)
        }
    }
}

/// Applies a Hann window: w(n) = 0.5 * (1 - cos(2πn/(N-1)))
fn apply_hann_window(samples: &[f64]) -> Vec<f64> {
    let len = samples.len();
    samples
        .iter()
        .enumerate()
        .map(|(i, &sample)| {
            let window = 0.5 * (1.0 - (2.0 * PI * i as f64 / (len - 1) as f64).cos());
            sample * window
        })
        .collect()
}

fn compute_fft(samples: &[f64]) -> Vec<Complex<f64>> {
    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(samples.len());

    let mut buffer: Vec<Complex<f64>> = samples.iter().map(|&x| Complex::new(x, 0.0)).collect();
    fft.process(&mut buffer);

    buffer
}
