use crate::error::SonifyError;
use crate::midi::{note_name, MidiNote};
use crate::pipeline::NoteEvent;
use crate::series::Timestamp;
use serde::Serialize;
use std::path::Path;

/// One row of the note table
#[derive(Debug, Serialize)]
struct NoteRow<'a> {
    index: usize,
    timestamp: Timestamp,
    change: f64,
    scaled_change: f64,
    interval: &'a str,
    frequency_hz: f64,
    midi_note: MidiNote,
    note: String,
    duration_seconds: f64,
    amplitude: f64,
}

impl<'a> From<&'a NoteEvent> for NoteRow<'a> {
    fn from(event: &'a NoteEvent) -> Self {
        NoteRow {
            index: event.index,
            timestamp: event.timestamp,
            change: event.change,
            scaled_change: event.scaled_change,
            interval: &event.interval,
            frequency_hz: (event.frequency_hz * 100.0).round() / 100.0,
            midi_note: event.midi_note,
            note: note_name(event.midi_note),
            duration_seconds: event.duration_seconds,
            amplitude: event.amplitude,
        }
    }
}

/// Writes one CSV row per note, with a header.
///
/// Frequencies are rounded to 0.01 Hz in the table; the waveform is
/// rendered from the unrounded values.
pub fn write_notes_csv(path: &Path, notes: &[NoteEvent]) -> Result<(), SonifyError> {
    let mut writer = csv::Writer::from_path(path)?;
    for note in notes {
        writer.serialize(NoteRow::from(note))?;
    }
    writer.flush()?;

    tracing::debug!("Wrote {} note rows to {}", notes.len(), path.display());
    Ok(())
}
