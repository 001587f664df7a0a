/// Whole-series analysis run once per price series.
///
/// This module provides:
/// - Fundamental-frequency detection from the price spectrum
/// - Percentage-change smoothing, clipping and rescaling into [-1, 1]
mod changes;
mod spectrum;

pub use changes::{clip_bound, normalize, percentage_changes, scale_changes, smooth};
pub use spectrum::{detect_fundamental, detect_peak, FallbackReason, Fundamental, SpectralPeak};
