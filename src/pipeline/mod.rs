/// One run of the sonification pipeline over a single price series.
///
/// [`Pipeline::new`] does the whole-series work (fundamental detection,
/// change normalization, note durations); [`Pipeline::notes`] then yields
/// one [`NoteEvent`] per point on demand, and [`Pipeline::run`] collects the
/// notes and synthesizes the waveform.
mod types;

pub use types::{Diagnostics, NoteEvent, Rendering};

use crate::analysis::{self, Fundamental};
use crate::audio;
use crate::config::{SonifyConfig, ToneDuration};
use crate::error::SonifyError;
use crate::harmony::{self, Direction, Selection};
use crate::midi;
use crate::series::PriceSeries;

pub struct Pipeline<'a> {
    series: &'a PriceSeries,
    config: &'a SonifyConfig,
    fundamental: Fundamental,
    changes: Vec<f64>,
    scaled: Vec<f64>,
    durations: Vec<f64>,
}

impl<'a> Pipeline<'a> {
    /// Validates the configuration and runs the whole-series analysis
    ///
    /// # Errors
    /// * [`SonifyError::InvalidParams`] for an invalid configuration,
    ///   interval-derived durations on a single-point series, or notes that
    ///   together exceed [`audio::MAX_SAMPLES`]
    pub fn new(series: &'a PriceSeries, config: &'a SonifyConfig) -> Result<Self, SonifyError> {
        config.validate()?;
        tracing::debug!("Processing {} price points", series.len());

        let durations = note_durations(series, &config.tone_duration)?;
        let total_samples: f64 = durations.iter().map(|d| d * config.sample_rate as f64).sum();
        if total_samples > audio::MAX_SAMPLES as f64 {
            return Err(SonifyError::InvalidParams(format!(
                "{:.0} samples of audio requested, at most {} allowed; shorten the tones",
                total_samples,
                audio::MAX_SAMPLES
            )));
        }
        let fundamental = analysis::detect_fundamental(series, config);
        let changes = analysis::percentage_changes(series);
        let scaled = analysis::scale_changes(&changes, config);

        Ok(Pipeline {
            series,
            config,
            fundamental,
            changes,
            scaled,
            durations,
        })
    }

    pub fn fundamental(&self) -> &Fundamental {
        &self.fundamental
    }

    pub fn changes(&self) -> &[f64] {
        &self.changes
    }

    pub fn scaled_changes(&self) -> &[f64] {
        &self.scaled
    }

    /// Lazily builds the note for each point, in order.
    ///
    /// Each call starts a fresh pass over the series.
    pub fn notes(&self) -> NoteEvents<'_, 'a> {
        NoteEvents {
            pipeline: self,
            next: 0,
            clamped: 0,
        }
    }

    /// Builds every note, then renders the waveform
    ///
    /// # Errors
    /// * [`SonifyError::NumericDefect`] if any note ends up without a
    ///   positive finite frequency
    pub fn run(&self) -> Result<Rendering, SonifyError> {
        let mut events = self.notes();
        let notes = events.by_ref().collect::<Result<Vec<_>, _>>()?;

        let diagnostics = Diagnostics {
            fundamental_fallback: self.fundamental.fallback,
            clamped_notes: events.clamped_notes(),
        };
        if diagnostics.clamped_notes > 0 {
            tracing::warn!(
                "{} of {} notes were outside MIDI {}..={} and were clamped",
                diagnostics.clamped_notes,
                notes.len(),
                self.config.midi_range.low,
                self.config.midi_range.high
            );
        }

        let audio = audio::synthesize(&notes, self.config.sample_rate, self.config.fade_ms)?;

        Ok(Rendering {
            fundamental: self.fundamental,
            notes,
            audio,
            diagnostics,
        })
    }

    fn note_at(&self, index: usize) -> Result<(NoteEvent, bool), SonifyError> {
        let table = &self.config.harmonic_ratios;
        let scaled = self.scaled[index];

        let selection = harmony::select_interval(scaled, table)?;
        let frequency_hz = selection.frequency(self.fundamental.hz)?;
        let quantized = midi::quantize(frequency_hz, self.config.midi_range);

        let note = NoteEvent {
            index,
            timestamp: self.series.points()[index].timestamp,
            change: self.changes[index],
            scaled_change: scaled,
            interval: describe(&selection),
            frequency_hz,
            midi_note: quantized.note,
            duration_seconds: self.durations[index],
            amplitude: self.config.amplitude,
        };
        Ok((note, quantized.clamped))
    }
}

/// Iterator over the notes of one pipeline run
pub struct NoteEvents<'p, 'a> {
    pipeline: &'p Pipeline<'a>,
    next: usize,
    clamped: usize,
}

impl NoteEvents<'_, '_> {
    /// Notes so far whose MIDI label had to be clamped
    pub fn clamped_notes(&self) -> usize {
        self.clamped
    }
}

impl Iterator for NoteEvents<'_, '_> {
    type Item = Result<NoteEvent, SonifyError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.pipeline.series.len() {
            return None;
        }
        let index = self.next;
        self.next += 1;

        Some(self.pipeline.note_at(index).map(|(note, clamped)| {
            if clamped {
                self.clamped += 1;
                tracing::debug!(
                    "Note {} at {:.2} Hz clamped to MIDI {}",
                    note.index,
                    note.frequency_hz,
                    note.midi_note
                );
            }
            note
        }))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.pipeline.series.len() - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for NoteEvents<'_, '_> {}

/// Runs the full pipeline over one series
pub fn sonify(series: &PriceSeries, config: &SonifyConfig) -> Result<Rendering, SonifyError> {
    Pipeline::new(series, config)?.run()
}

fn describe(selection: &Selection<'_>) -> String {
    let label = &selection.interval.label;
    let is_unison = selection.interval.numer == selection.interval.denom;
    if selection.direction == Direction::Descending && !is_unison {
        format!("{} below", label)
    } else {
        label.clone()
    }
}

fn note_durations(series: &PriceSeries, duration: &ToneDuration) -> Result<Vec<f64>, SonifyError> {
    match *duration {
        ToneDuration::Fixed { seconds } => Ok(vec![seconds; series.len()]),
        ToneDuration::Interval {
            seconds_per_market_second,
        } => {
            let timestamps = series.timestamps();
            if timestamps.len() < 2 {
                return Err(SonifyError::InvalidParams(
                    "interval-based tone durations need at least two price points".to_string(),
                ));
            }
            let mut gaps: Vec<f64> = timestamps
                .windows(2)
                .map(|w| (w[1] - w[0]) as f64 * seconds_per_market_second)
                .collect();
            gaps.push(gaps[gaps.len() - 1]);
            Ok(gaps)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::PricePoint;

    #[test]
    fn test_interval_durations_follow_gaps() {
        let series = PriceSeries::new(vec![
            PricePoint { timestamp: 0, price: 1.0 },
            PricePoint { timestamp: 60, price: 1.1 },
            PricePoint { timestamp: 180, price: 1.2 },
        ])
        .unwrap();
        let durations = note_durations(
            &series,
            &ToneDuration::Interval {
                seconds_per_market_second: 0.001,
            },
        )
        .unwrap();
        assert_eq!(durations.len(), 3);
        assert!((durations[0] - 0.06).abs() < 1e-12);
        assert!((durations[1] - 0.12).abs() < 1e-12);
        assert!((durations[2] - 0.12).abs() < 1e-12);
    }

    #[test]
    fn test_interval_durations_need_two_points() {
        let series = PriceSeries::from_prices(&[100.0]).unwrap();
        let config = SonifyConfig {
            tone_duration: ToneDuration::Interval {
                seconds_per_market_second: 0.01,
            },
            ..SonifyConfig::default()
        };
        assert!(matches!(
            Pipeline::new(&series, &config),
            Err(SonifyError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_notes_are_restartable() {
        let series = PriceSeries::from_prices(&[100.0, 101.0, 99.0, 102.0, 98.0]).unwrap();
        let config = SonifyConfig::default();
        let pipeline = Pipeline::new(&series, &config).unwrap();

        let first: Vec<NoteEvent> = pipeline.notes().map(|n| n.unwrap()).collect();
        let second: Vec<NoteEvent> = pipeline.notes().map(|n| n.unwrap()).collect();
        assert_eq!(first, second);
        assert_eq!(pipeline.notes().len(), 5);
    }

    #[test]
    fn test_clamped_notes_are_counted() {
        let series = PriceSeries::from_prices(&[100.0, 100.0, 100.0]).unwrap();
        let config = SonifyConfig {
            default_fundamental_hz: 4.0,
            ..SonifyConfig::default()
        };
        let rendering = sonify(&series, &config).unwrap();
        assert_eq!(rendering.diagnostics.clamped_notes, 3);
        assert!(rendering.notes.iter().all(|n| n.midi_note == 0));
        assert!(rendering.notes.iter().all(|n| n.frequency_hz == 4.0));
    }

    #[test]
    fn test_descending_label() {
        let table = crate::harmony::HarmonicRatioTable::default();
        let down = harmony::select_interval(-0.6, &table).unwrap();
        assert_eq!(describe(&down), "perfect fifth below");
        let flat = harmony::select_interval(-0.1, &table).unwrap();
        assert_eq!(describe(&flat), "unison");
    }
}
