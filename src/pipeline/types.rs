use crate::analysis::{FallbackReason, Fundamental};
use crate::audio::AudioBuffer;
use crate::midi::MidiNote;
use crate::series::Timestamp;

/// One point of the price series rendered as a note
#[derive(Debug, Clone, PartialEq)]
pub struct NoteEvent {
    /// Position in the price series
    pub index: usize,
    pub timestamp: Timestamp,
    /// Raw percentage change from the previous point
    pub change: f64,
    /// Smoothed, clipped and rescaled change in [-1, 1]
    pub scaled_change: f64,
    /// The interval applied to the fundamental, e.g. "perfect fifth below"
    pub interval: String,
    /// Continuous synthesis frequency (Hz)
    pub frequency_hz: f64,
    /// Nearest MIDI note, for labeling only
    pub midi_note: MidiNote,
    pub duration_seconds: f64,
    /// Peak amplitude in [0, 1]
    pub amplitude: f64,
}

/// Conditions that were recovered from during a run
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Diagnostics {
    /// Set when the default fundamental replaced a degenerate detection
    pub fundamental_fallback: Option<FallbackReason>,
    /// Number of notes whose MIDI label was pulled into range
    pub clamped_notes: usize,
}

/// Everything one run produces
#[derive(Debug, Clone)]
pub struct Rendering {
    pub fundamental: Fundamental,
    pub notes: Vec<NoteEvent>,
    pub audio: AudioBuffer,
    pub diagnostics: Diagnostics,
}

impl Rendering {
    /// Sum of every note's duration in seconds
    pub fn total_note_seconds(&self) -> f64 {
        self.notes.iter().map(|n| n.duration_seconds).sum()
    }
}
