// End-to-end pipeline tests
//
// These tests run whole price series through the pipeline and check the
// properties every run must hold: one note per point, bounded control
// values, strictly positive frequencies, audio length matching the notes
// and silent boundaries between tones. The fixed scenarios (flat series,
// a rise/fall/rise series and a single point) are checked explicitly.

use price_sonify::analysis::FallbackReason;
use price_sonify::audio::{fade_samples, tone_samples};
use price_sonify::config::{ClipBound, SonifyConfig, ToneDuration};
use price_sonify::harmony::{map_to_frequency, HarmonicRatioTable};
use price_sonify::{sonify, InputError, Pipeline, PricePoint, PriceSeries, SonifyError};

use test_utils::{max_step, series, wandering_series};

/// A flat series has no spectrum and no modulation: every note is A4.
#[test]
fn test_flat_series_plays_a4() {
    let rendering = sonify(&series(&[100.0, 100.0, 100.0, 100.0]), &SonifyConfig::default())
        .expect("flat series renders");

    assert_eq!(rendering.fundamental.hz, 440.0);
    assert_eq!(
        rendering.diagnostics.fundamental_fallback,
        Some(FallbackReason::FlatSpectrum)
    );
    assert_eq!(rendering.notes.len(), 4);
    for note in &rendering.notes {
        assert_eq!(note.scaled_change, 0.0);
        assert_eq!(note.frequency_hz, 440.0);
        assert_eq!(note.midi_note, 69);
        assert_eq!(note.interval, "unison");
    }
}

/// Rise, fall, rise: the rises sit at or above the fundamental and the
/// fall sits below it.
#[test]
fn test_rise_fall_rise_directions() {
    let config = SonifyConfig::default();
    let price_series = series(&[100.0, 105.0, 95.0, 110.0]);
    let pipeline = Pipeline::new(&price_series, &config).unwrap();

    let expected_changes = [0.0, 0.05, -0.0952, 0.1579];
    for (got, want) in pipeline.changes().iter().zip(expected_changes) {
        assert!((got - want).abs() < 1e-4, "{} != {}", got, want);
    }
    assert!(pipeline
        .scaled_changes()
        .iter()
        .all(|v| (-1.0..=1.0).contains(v)));

    let rendering = pipeline.run().unwrap();
    let f = rendering.fundamental.hz;
    assert_eq!(rendering.diagnostics.fundamental_fallback, None);

    let notes = &rendering.notes;
    assert!(notes[1].frequency_hz >= f);
    assert!(notes[2].frequency_hz < f);
    assert!(notes[3].frequency_hz > f);
    assert!(notes[2].interval.ends_with("below"));

    // The largest move saturates the scale and lands on the octave
    assert_eq!(notes[3].scaled_change, 1.0);
    assert_eq!(notes[3].frequency_hz, 2.0 * f);
}

/// A single price is a valid series: zero change, default fundamental.
#[test]
fn test_single_point_series() {
    let rendering = sonify(&series(&[100.0]), &SonifyConfig::default()).unwrap();

    assert_eq!(
        rendering.diagnostics.fundamental_fallback,
        Some(FallbackReason::TooShort)
    );
    assert_eq!(rendering.notes.len(), 1);
    assert_eq!(rendering.notes[0].change, 0.0);
    assert_eq!(rendering.notes[0].frequency_hz, 440.0);
    assert_eq!(rendering.notes[0].midi_note, 69);
    assert_eq!(rendering.audio.len(), tone_samples(0.15, 44100));
}

/// Malformed input is rejected before any processing.
#[test]
fn test_malformed_input_is_rejected() {
    assert_eq!(PriceSeries::from_prices(&[]).unwrap_err(), InputError::Empty);
    assert!(matches!(
        PriceSeries::from_prices(&[100.0, -1.0]),
        Err(InputError::InvalidPrice { index: 1, .. })
    ));
    let backwards = vec![
        PricePoint { timestamp: 5, price: 1.0 },
        PricePoint { timestamp: 4, price: 1.0 },
    ];
    assert!(matches!(
        PriceSeries::new(backwards),
        Err(InputError::NonMonotonic { index: 1, .. })
    ));
}

/// One note per point, for a range of series lengths.
#[test]
fn test_note_count_matches_series() {
    let config = SonifyConfig::default();
    for len in [1, 2, 3, 7, 64, 301] {
        let rendering = sonify(&wandering_series(len), &config).unwrap();
        assert_eq!(rendering.notes.len(), len);
        for (i, note) in rendering.notes.iter().enumerate() {
            assert_eq!(note.index, i);
            assert!(note.frequency_hz > 0.0 && note.frequency_hz.is_finite());
            assert!((-1.0..=1.0).contains(&note.scaled_change));
        }
    }
}

/// Total audio length equals the sum of note durations, within per-note rounding.
#[test]
fn test_audio_length_matches_note_durations() {
    let points: Vec<PricePoint> = [0, 7, 19, 20, 45, 61, 90]
        .iter()
        .zip([10.0, 10.2, 10.1, 10.4, 9.9, 10.0, 10.3])
        .map(|(&timestamp, price)| PricePoint { timestamp, price })
        .collect();
    let price_series = PriceSeries::new(points).unwrap();
    let config = SonifyConfig {
        tone_duration: ToneDuration::Interval {
            seconds_per_market_second: 0.0123,
        },
        ..SonifyConfig::default()
    };

    let rendering = sonify(&price_series, &config).unwrap();
    let expected: usize = rendering
        .notes
        .iter()
        .map(|n| tone_samples(n.duration_seconds, config.sample_rate))
        .sum();
    assert_eq!(rendering.audio.len(), expected);

    let tolerance = rendering.notes.len() as f64 * 0.5 / config.sample_rate as f64;
    let diff = (rendering.audio.duration_seconds() - rendering.total_note_seconds()).abs();
    assert!(diff <= tolerance, "{}s off", diff);
}

/// Adjacent tones meet at silence, so no boundary jump exceeds the fade slope.
#[test]
fn test_tone_boundaries_are_click_free() {
    let config = SonifyConfig::default();
    let rendering = sonify(&wandering_series(40), &config).unwrap();
    let samples = &rendering.audio.samples;

    let fade = fade_samples(config.fade_ms, config.sample_rate);
    let max_slope = (config.amplitude / fade as f64) as f32;

    let mut boundary = 0;
    for note in &rendering.notes[..rendering.notes.len() - 1] {
        boundary += tone_samples(note.duration_seconds, config.sample_rate);
        let jump = (samples[boundary] - samples[boundary - 1]).abs();
        assert!(jump <= max_slope, "jump {} at sample {}", jump, boundary);
        assert!(max_step(&samples[boundary - 2..boundary + 2]) <= 0.5);
    }
    assert!(rendering.audio.peak() <= config.amplitude as f32);
}

/// The mapper never produces a non-positive pitch for in-range controls.
#[test]
fn test_mapper_positive_for_all_controls() {
    for table in [HarmonicRatioTable::default(), HarmonicRatioTable::extended()] {
        for fundamental in [0.5, 80.0, 440.0, 2000.0] {
            for step in 0..=400 {
                let v = -1.0 + step as f64 / 200.0;
                let f = map_to_frequency(fundamental, v, &table).unwrap();
                assert!(f > 0.0 && f.is_finite());
            }
        }
    }
}

/// An absolute clip bound scales every change by the same factor.
#[test]
fn test_absolute_clip_bound() {
    let config = SonifyConfig {
        clip: ClipBound::Absolute { bound: 1.0 },
        ..SonifyConfig::default()
    };
    let price_series = series(&[100.0, 101.0, 102.0, 101.0]);
    let pipeline = Pipeline::new(&price_series, &config).unwrap();
    // Percentage changes of about 1% stay tiny against a 100% bound
    assert!(pipeline.scaled_changes().iter().all(|v| v.abs() < 0.02));
    let rendering = pipeline.run().unwrap();
    assert!(rendering.notes.iter().all(|n| n.interval == "unison"));
}

/// An invalid configuration stops the run before analysis.
#[test]
fn test_invalid_config_is_rejected() {
    let config = SonifyConfig {
        fade_ms: -1.0,
        ..SonifyConfig::default()
    };
    assert!(matches!(
        sonify(&series(&[1.0, 2.0]), &config),
        Err(SonifyError::InvalidParams(_))
    ));
}

/// Tone lengths beyond what a waveform can hold are rejected, not rendered.
#[test]
fn test_oversized_durations_are_rejected() {
    let fixed = SonifyConfig {
        tone_duration: ToneDuration::Fixed { seconds: 1e15 },
        ..SonifyConfig::default()
    };
    assert!(matches!(
        sonify(&series(&[100.0, 101.0]), &fixed),
        Err(SonifyError::InvalidParams(_))
    ));

    let interval = SonifyConfig {
        tone_duration: ToneDuration::Interval {
            seconds_per_market_second: 1e12,
        },
        ..SonifyConfig::default()
    };
    assert!(matches!(
        Pipeline::new(&series(&[100.0, 101.0, 102.0]), &interval),
        Err(SonifyError::InvalidParams(_))
    ));
}

/// A fade shorter than one sample period still silences every tone boundary.
#[test]
fn test_low_rate_boundaries_stay_silent() {
    let config = SonifyConfig {
        sample_rate: 100,
        fade_ms: 4.0,
        ..SonifyConfig::default()
    };
    let rendering = sonify(&series(&[100.0, 100.0, 100.0, 100.0]), &config).unwrap();
    let per_tone = tone_samples(0.15, 100);
    assert_eq!(per_tone, 15);
    assert_eq!(rendering.audio.len(), 4 * per_tone);

    for boundary in (1..4).map(|i| i * per_tone) {
        assert_eq!(rendering.audio.samples[boundary - 1], 0.0);
        assert_eq!(rendering.audio.samples[boundary], 0.0);
    }
}
