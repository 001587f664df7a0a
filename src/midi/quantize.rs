use crate::config::MidiRange;

pub type MidiNote = u8;

/// MIDI note number of A4
const A4_NOTE: f64 = 69.0;
/// Concert pitch of A4 (Hz)
const A4_HZ: f64 = 440.0;

/// Values this close below a half-semitone still round up
const TIE_TOLERANCE: f64 = 1e-9;

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// A frequency snapped to a MIDI note
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quantized {
    pub note: MidiNote,
    /// True when the nearest note fell outside the range and was pulled to its edge
    pub clamped: bool,
}

/// Continuous MIDI pitch: 69 + 12·log2(f / 440)
pub fn midi_value(frequency_hz: f64) -> f64 {
    A4_NOTE + 12.0 * (frequency_hz / A4_HZ).log2()
}

/// Snaps a frequency to the nearest note inside `range`.
///
/// Exact half-semitones round up. Results outside the range (including
/// non-positive or NaN frequencies, which have no pitch) are pulled to the
/// nearest range edge and flagged as clamped.
pub fn quantize(frequency_hz: f64, range: MidiRange) -> Quantized {
    let value = midi_value(frequency_hz);
    if value.is_nan() {
        return Quantized {
            note: range.low,
            clamped: true,
        };
    }

    let rounded = (value + 0.5 + TIE_TOLERANCE).floor();
    if rounded < range.low as f64 {
        Quantized {
            note: range.low,
            clamped: true,
        }
    } else if rounded > range.high as f64 {
        Quantized {
            note: range.high,
            clamped: true,
        }
    } else {
        Quantized {
            note: rounded as MidiNote,
            clamped: false,
        }
    }
}

/// Nearest MIDI note in the full 0–127 range
pub fn to_midi(frequency_hz: f64) -> MidiNote {
    quantize(frequency_hz, MidiRange::FULL).note
}

/// Equal-tempered frequency of a MIDI note
pub fn midi_to_hz(note: MidiNote) -> f64 {
    A4_HZ * 2f64.powf((note as f64 - A4_NOTE) / 12.0)
}

/// Scientific pitch name, e.g. 60 -> "C4", 69 -> "A4"
pub fn note_name(note: MidiNote) -> String {
    let octave = note as i32 / 12 - 1;
    format!("{}{}", NOTE_NAMES[note as usize % 12], octave)
}
