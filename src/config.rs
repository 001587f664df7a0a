use crate::audio::MAX_SAMPLES;
use crate::error::SonifyError;
use crate::harmony::HarmonicRatioTable;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Name of the configuration file looked up in the working directory
pub const CONFIG_FILE: &str = "config.toml";

/// Everything a single run needs to know besides the prices themselves.
///
/// Every field has a default, so a `config.toml` only needs the keys it
/// wants to change.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SonifyConfig {
    /// Output sample rate in Hz
    pub sample_rate: u32,
    /// Fundamental used when spectral detection is degenerate (Hz)
    pub default_fundamental_hz: f64,
    /// How a detected fundamental is brought into the audible range
    pub fundamental_mapping: FundamentalMapping,
    /// Audible band `[low, high]` for detected fundamentals (Hz)
    pub fundamental_range_hz: [f64; 2],
    /// Length of each note
    pub tone_duration: ToneDuration,
    /// Just-intonation intervals, ascending
    pub harmonic_ratios: HarmonicRatioTable,
    /// Peak amplitude of every tone, as a fraction of full scale
    pub amplitude: f64,
    /// Length of the linear fade at each end of a tone (milliseconds)
    pub fade_ms: f64,
    pub smoothing: Smoothing,
    pub clip: ClipBound,
    /// Inclusive MIDI note range used for labeling
    pub midi_range: MidiRange,
}

/// Maps a detected (sub-hertz) fundamental into `fundamental_range_hz`
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FundamentalMapping {
    /// Clamp the raw frequency to the band edges
    Clamp,
    /// Spread the raw range (0, 0.5] cycles/sample logarithmically over the band
    LogScale,
}

/// How long each note lasts
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ToneDuration {
    /// Every note lasts the same number of seconds
    Fixed { seconds: f64 },
    /// A note lasts as long as the market gap to the next point, scaled.
    /// The last point reuses the gap before it.
    Interval { seconds_per_market_second: f64 },
}

/// Centered Gaussian-weighted moving average applied to percentage changes
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct Smoothing {
    /// Number of points in the window; must be odd
    pub window: usize,
    /// Standard deviation of the Gaussian weights, in points
    pub std: f64,
}

/// Symmetric bound applied to smoothed changes before rescaling
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ClipBound {
    /// Bound at this percentile (0, 1] of the absolute smoothed changes
    Percentile { percentile: f64 },
    /// Fixed bound on the absolute smoothed change
    Absolute { bound: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct MidiRange {
    pub low: u8,
    pub high: u8,
}

impl MidiRange {
    pub const FULL: MidiRange = MidiRange { low: 0, high: 127 };
    /// A0 to C8
    pub const PIANO: MidiRange = MidiRange { low: 21, high: 108 };
}

impl Default for SonifyConfig {
    fn default() -> Self {
        SonifyConfig {
            sample_rate: 44100,
            default_fundamental_hz: 440.0,
            fundamental_mapping: FundamentalMapping::Clamp,
            fundamental_range_hz: [80.0, 2000.0],
            tone_duration: ToneDuration::default(),
            harmonic_ratios: HarmonicRatioTable::default(),
            amplitude: 0.5,
            fade_ms: 5.0,
            smoothing: Smoothing::default(),
            clip: ClipBound::default(),
            midi_range: MidiRange::default(),
        }
    }
}

impl Default for ToneDuration {
    fn default() -> Self {
        ToneDuration::Fixed { seconds: 0.15 }
    }
}

impl Default for Smoothing {
    fn default() -> Self {
        Smoothing {
            window: 3,
            std: 0.5,
        }
    }
}

impl Default for ClipBound {
    fn default() -> Self {
        ClipBound::Percentile { percentile: 0.95 }
    }
}

impl Default for MidiRange {
    fn default() -> Self {
        MidiRange::FULL
    }
}

impl SonifyConfig {
    /// Checks every value is usable before a run starts
    ///
    /// # Returns
    /// * `Ok(())` if the configuration is valid
    /// * `Err(SonifyError::InvalidParams)` naming the first bad value
    pub fn validate(&self) -> Result<(), SonifyError> {
        if self.sample_rate == 0 {
            return invalid("sample_rate must be greater than zero".to_string());
        }
        if !is_positive(self.default_fundamental_hz) {
            return invalid(format!(
                "default_fundamental_hz must be positive, got {}",
                self.default_fundamental_hz
            ));
        }

        let [low, high] = self.fundamental_range_hz;
        if !is_positive(low) || !is_positive(high) || low > high {
            return invalid(format!(
                "fundamental_range_hz must be two positive values in ascending order, got [{}, {}]",
                low, high
            ));
        }

        match self.tone_duration {
            ToneDuration::Fixed { seconds } if !is_positive(seconds) => {
                return invalid(format!("tone duration must be positive, got {}s", seconds));
            }
            ToneDuration::Fixed { seconds }
                if (seconds * self.sample_rate as f64).round() > MAX_SAMPLES as f64 =>
            {
                return invalid(format!(
                    "tone duration of {}s exceeds {} samples at {} Hz",
                    seconds, MAX_SAMPLES, self.sample_rate
                ));
            }
            ToneDuration::Interval {
                seconds_per_market_second,
            } if !is_positive(seconds_per_market_second) => {
                return invalid(format!(
                    "seconds_per_market_second must be positive, got {}",
                    seconds_per_market_second
                ));
            }
            _ => {}
        }

        if !(0.0..=1.0).contains(&self.amplitude) {
            return invalid(format!("amplitude must be within [0, 1], got {}", self.amplitude));
        }
        if !self.fade_ms.is_finite() || self.fade_ms < 0.0 {
            return invalid(format!("fade_ms must be zero or positive, got {}", self.fade_ms));
        }

        if self.smoothing.window == 0 || self.smoothing.window % 2 == 0 {
            return invalid(format!(
                "smoothing window must be an odd number of points, got {}",
                self.smoothing.window
            ));
        }
        if !is_positive(self.smoothing.std) {
            return invalid(format!(
                "smoothing std must be positive, got {}",
                self.smoothing.std
            ));
        }

        match self.clip {
            ClipBound::Percentile { percentile } if !(percentile > 0.0 && percentile <= 1.0) => {
                return invalid(format!(
                    "clip percentile must be within (0, 1], got {}",
                    percentile
                ));
            }
            ClipBound::Absolute { bound } if !is_positive(bound) => {
                return invalid(format!("clip bound must be positive, got {}", bound));
            }
            _ => {}
        }

        if self.midi_range.low > self.midi_range.high || self.midi_range.high > 127 {
            return invalid(format!(
                "midi_range must satisfy low <= high <= 127, got {}..={}",
                self.midi_range.low, self.midi_range.high
            ));
        }

        self.harmonic_ratios.validate()
    }
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

fn invalid(message: String) -> Result<(), SonifyError> {
    Err(SonifyError::InvalidParams(message))
}

/// Load configuration from `config.toml` in the working directory.
///
/// A missing file is not an error: the defaults are returned instead.
pub fn load_config() -> Result<SonifyConfig, SonifyError> {
    let path = Path::new(CONFIG_FILE);
    if !path.exists() {
        return Ok(SonifyConfig::default());
    }
    load_config_from(path)
}

/// Load configuration from an explicit TOML file
///
/// # Errors
/// * If the file cannot be read
/// * If the TOML does not parse or describes an invalid ratio table
pub fn load_config_from(path: &Path) -> Result<SonifyConfig, SonifyError> {
    let contents = fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Parse configuration from TOML text
pub fn parse_config(contents: &str) -> Result<SonifyConfig, SonifyError> {
    Ok(toml::from_str(contents)?)
}
