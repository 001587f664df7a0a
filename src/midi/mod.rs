/// MIDI labeling of synthesized frequencies.
///
/// Quantization only names notes; synthesis keeps the continuous frequency.
mod quantize;

pub use quantize::{midi_to_hz, midi_value, note_name, quantize, to_midi, MidiNote, Quantized};
