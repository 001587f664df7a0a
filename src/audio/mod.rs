/// Tone synthesis and WAV file handling.
///
/// This module provides functionality to:
/// - Render one faded sine tone per note
/// - Concatenate tones into a single click-free waveform
/// - Write (and read back) mono PCM WAV files
mod synth;
mod types;
mod wav;

pub use synth::{
    fade_samples, render_tone, synthesize, tone_samples, tones, Tones, MAX_SAMPLES,
};
pub use types::AudioBuffer;
pub use wav::{read_wav_file, write_wav_file};
