use crate::error::SonifyError;
use crate::pipeline::NoteEvent;
use midly::num::{u15, u24, u28, u4, u7};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};
use std::path::Path;

const TICKS_PER_QUARTER: u16 = 480;
/// 120 BPM
const MICROS_PER_QUARTER: u32 = 500_000;
/// 480 ticks per half-second quarter note
const TICKS_PER_SECOND: f64 = 960.0;
const MAX_DELTA: u32 = (1 << 28) - 1;

/// Builds a single-track Standard MIDI File with one note per event.
///
/// Notes play back to back on channel 1 at 120 BPM. Note boundaries are
/// placed from the running total of durations, so rounding to ticks never
/// accumulates drift. Velocity follows each note's amplitude.
pub fn to_smf(notes: &[NoteEvent]) -> Smf<'static> {
    let mut track = Vec::with_capacity(notes.len() * 2 + 2);
    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(MICROS_PER_QUARTER))),
    });

    let mut elapsed_seconds = 0.0;
    let mut elapsed_ticks: u64 = 0;
    for note in notes {
        elapsed_seconds += note.duration_seconds;
        let end_ticks = (elapsed_seconds * TICKS_PER_SECOND).round() as u64;
        let length = end_ticks.saturating_sub(elapsed_ticks);
        elapsed_ticks = end_ticks;

        let key = u7::new(note.midi_note.min(127));
        let velocity = (note.amplitude * 127.0).round().clamp(1.0, 127.0) as u8;

        track.push(TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Midi {
                channel: u4::new(0),
                message: MidiMessage::NoteOn {
                    key,
                    vel: u7::new(velocity),
                },
            },
        });
        track.push(TrackEvent {
            delta: u28::new(length.min(MAX_DELTA as u64) as u32),
            kind: TrackEventKind::Midi {
                channel: u4::new(0),
                message: MidiMessage::NoteOff {
                    key,
                    vel: u7::new(0),
                },
            },
        });
    }

    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });

    let mut smf = Smf::new(Header::new(
        Format::SingleTrack,
        Timing::Metrical(u15::new(TICKS_PER_QUARTER)),
    ));
    smf.tracks.push(track);
    smf
}

/// Writes the notes as a Standard MIDI File
pub fn write_midi(path: &Path, notes: &[NoteEvent]) -> Result<(), SonifyError> {
    to_smf(notes).save(path)?;
    tracing::debug!("Wrote {} MIDI notes to {}", notes.len(), path.display());
    Ok(())
}
