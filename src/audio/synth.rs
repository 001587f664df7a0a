use super::types::AudioBuffer;
use crate::error::SonifyError;
use crate::pipeline::NoteEvent;
use std::f64::consts::PI;
use std::slice;

/// Largest waveform a run may produce: the sample count a 16-bit mono WAV
/// data chunk can hold
pub const MAX_SAMPLES: usize = i32::MAX as usize;

/// Number of samples a note occupies: `round(duration * sample_rate)`
pub fn tone_samples(duration_seconds: f64, sample_rate: u32) -> usize {
    (duration_seconds * sample_rate as f64).round() as usize
}

/// Number of samples in each linear fade.
///
/// Any positive fade spans at least one sample, so tone ends stay silent
/// even when `fade_ms` is shorter than a sample period.
pub fn fade_samples(fade_ms: f64, sample_rate: u32) -> usize {
    let samples = (fade_ms * sample_rate as f64 / 1000.0).round() as usize;
    if fade_ms > 0.0 {
        samples.max(1)
    } else {
        samples
    }
}

/// Renders one note as a faded sine tone.
///
/// The tone starts at phase zero. A linear fade of `fade_ms` (capped at half
/// the tone) ramps the envelope from exactly 0 on the first sample and back
/// to exactly 0 on the last, so concatenated tones meet at silence.
///
/// # Errors
/// * [`SonifyError::NumericDefect`] if the frequency is not positive and finite
/// * [`SonifyError::InvalidParams`] for a bad duration, amplitude or sample
///   rate, or a tone longer than [`MAX_SAMPLES`]
pub fn render_tone(
    note: &NoteEvent,
    sample_rate: u32,
    fade_ms: f64,
) -> Result<Vec<f32>, SonifyError> {
    if !note.frequency_hz.is_finite() || note.frequency_hz <= 0.0 {
        return Err(SonifyError::NumericDefect(format!(
            "note {} has frequency {} Hz",
            note.index, note.frequency_hz
        )));
    }
    if !note.duration_seconds.is_finite() || note.duration_seconds <= 0.0 {
        return Err(SonifyError::InvalidParams(format!(
            "note {} has duration {}s",
            note.index, note.duration_seconds
        )));
    }
    if !(0.0..=1.0).contains(&note.amplitude) {
        return Err(SonifyError::InvalidParams(format!(
            "note {} has amplitude {} outside [0, 1]",
            note.index, note.amplitude
        )));
    }
    if sample_rate == 0 {
        return Err(SonifyError::InvalidParams(
            "sample rate must be greater than zero".to_string(),
        ));
    }

    if (note.duration_seconds * sample_rate as f64).round() > MAX_SAMPLES as f64 {
        return Err(SonifyError::InvalidParams(format!(
            "note {} lasts {}s, more than {} samples at {} Hz",
            note.index, note.duration_seconds, MAX_SAMPLES, sample_rate
        )));
    }

    let nyquist = sample_rate as f64 / 2.0;
    if note.frequency_hz >= nyquist {
        tracing::warn!(
            "Note {} at {:.2} Hz is at or above Nyquist ({:.1} Hz) and will alias",
            note.index,
            note.frequency_hz,
            nyquist
        );
    }

    let len = tone_samples(note.duration_seconds, sample_rate);
    let fade = fade_samples(fade_ms, sample_rate).min(len / 2);
    let step = 2.0 * PI * note.frequency_hz / sample_rate as f64;

    let samples = (0..len)
        .map(|i| {
            let envelope = if fade == 0 {
                1.0
            } else {
                let rise = i.min(fade) as f64 / fade as f64;
                let fall = (len - 1 - i).min(fade) as f64 / fade as f64;
                rise.min(fall)
            };
            (note.amplitude * envelope * (step * i as f64).sin()) as f32
        })
        .collect();

    Ok(samples)
}

/// Lazily renders one tone per note, in order.
///
/// Each item is the complete sample block of one note, so a caller can
/// report progress between notes.
pub struct Tones<'n> {
    notes: slice::Iter<'n, NoteEvent>,
    sample_rate: u32,
    fade_ms: f64,
}

impl Iterator for Tones<'_> {
    type Item = Result<Vec<f32>, SonifyError>;

    fn next(&mut self) -> Option<Self::Item> {
        let note = self.notes.next()?;
        Some(render_tone(note, self.sample_rate, self.fade_ms))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.notes.size_hint()
    }
}

impl ExactSizeIterator for Tones<'_> {}

pub fn tones(notes: &[NoteEvent], sample_rate: u32, fade_ms: f64) -> Tones<'_> {
    Tones {
        notes: notes.iter(),
        sample_rate,
        fade_ms,
    }
}

/// Renders every note and concatenates the tones back to back.
///
/// The i-th tone's first sample directly follows the (i-1)-th tone's last
/// sample; the buffer holds exactly the sum of each note's
/// [`tone_samples`].
///
/// # Errors
/// * [`SonifyError::InvalidParams`] if the notes together need more than
///   [`MAX_SAMPLES`] samples, or the buffer cannot be allocated
/// * Any error from [`render_tone`]; the first failing note aborts the run
pub fn synthesize(
    notes: &[NoteEvent],
    sample_rate: u32,
    fade_ms: f64,
) -> Result<AudioBuffer, SonifyError> {
    let total = notes
        .iter()
        .try_fold(0usize, |total, n| {
            total
                .checked_add(tone_samples(n.duration_seconds, sample_rate))
                .filter(|&t| t <= MAX_SAMPLES)
        })
        .ok_or_else(|| {
            SonifyError::InvalidParams(format!(
                "{} notes need more than {} samples at {} Hz",
                notes.len(),
                MAX_SAMPLES,
                sample_rate
            ))
        })?;

    let mut buffer = AudioBuffer::new(sample_rate);
    buffer.samples.try_reserve_exact(total).map_err(|e| {
        SonifyError::InvalidParams(format!("cannot allocate {} samples: {}", total, e))
    })?;

    for tone in tones(notes, sample_rate, fade_ms) {
        buffer.samples.extend(tone?);
    }

    tracing::debug!(
        "Synthesized {} notes into {} samples ({:.2}s)",
        notes.len(),
        buffer.len(),
        buffer.duration_seconds()
    );
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(index: usize, frequency_hz: f64, duration_seconds: f64) -> NoteEvent {
        NoteEvent {
            index,
            timestamp: index as i64,
            change: 0.0,
            scaled_change: 0.0,
            interval: "unison".to_string(),
            frequency_hz,
            midi_note: 69,
            duration_seconds,
            amplitude: 0.5,
        }
    }

    #[test]
    fn test_tone_length_and_edges() {
        let tone = render_tone(&note(0, 440.0, 0.1), 8000, 5.0).unwrap();
        assert_eq!(tone.len(), 800);
        assert_eq!(tone[0], 0.0);
        assert_eq!(tone[799], 0.0);
        assert!(tone.iter().all(|s| s.abs() <= 0.5));
    }

    #[test]
    fn test_fade_is_capped_for_short_tones() {
        // 4 samples with a 40-sample fade request
        let tone = render_tone(&note(0, 1000.0, 0.0005), 8000, 5.0).unwrap();
        assert_eq!(tone.len(), 4);
        assert_eq!(tone[0], 0.0);
        assert_eq!(tone[3], 0.0);
    }

    #[test]
    fn test_rejects_bad_frequency() {
        for f in [0.0, -10.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                render_tone(&note(3, f, 0.1), 44100, 5.0),
                Err(SonifyError::NumericDefect(_))
            ));
        }
    }

    #[test]
    fn test_short_fade_keeps_one_sample() {
        assert_eq!(fade_samples(4.0, 100), 1);
        assert_eq!(fade_samples(0.05, 8000), 1);
        assert_eq!(fade_samples(0.0, 100), 0);

        let tone = render_tone(&note(0, 7.0, 0.15), 100, 4.0).unwrap();
        assert_eq!(tone.len(), 15);
        assert_eq!(tone[0], 0.0);
        assert_eq!(tone[14], 0.0);
    }

    #[test]
    fn test_rejects_oversized_tones() {
        assert!(matches!(
            render_tone(&note(0, 440.0, 1e15), 44100, 5.0),
            Err(SonifyError::InvalidParams(_))
        ));

        // Each tone fits on its own, but not both together
        let half = (MAX_SAMPLES / 2 + 1) as f64;
        let notes = vec![note(0, 0.25, half), note(1, 0.25, half)];
        assert!(matches!(
            synthesize(&notes, 1, 0.0),
            Err(SonifyError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_rejects_bad_amplitude() {
        let mut loud = note(0, 440.0, 0.1);
        loud.amplitude = 1.2;
        assert!(matches!(
            render_tone(&loud, 44100, 5.0),
            Err(SonifyError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_concatenation_is_sample_accurate() {
        let notes = vec![note(0, 440.0, 0.15), note(1, 550.0, 0.1), note(2, 660.0, 0.2)];
        let buffer = synthesize(&notes, 44100, 5.0).unwrap();
        assert_eq!(buffer.len(), 6615 + 4410 + 8820);

        let first = render_tone(&notes[0], 44100, 5.0).unwrap();
        let second = render_tone(&notes[1], 44100, 5.0).unwrap();
        assert_eq!(&buffer.samples[..6615], &first[..]);
        assert_eq!(&buffer.samples[6615..6615 + 4410], &second[..]);
    }

    #[test]
    fn test_tones_iterator_matches_notes() {
        let notes = vec![note(0, 440.0, 0.01), note(1, 880.0, 0.02)];
        let iter = tones(&notes, 1000, 1.0);
        assert_eq!(iter.len(), 2);
        let lengths: Vec<usize> = iter.map(|t| t.unwrap().len()).collect();
        assert_eq!(lengths, vec![10, 20]);
    }
}
