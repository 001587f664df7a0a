use super::types::AudioBuffer;
use crate::error::SonifyError;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::path::Path;

/// Writes a buffer as a mono 16-bit PCM WAV file.
///
/// Samples are clamped to [-1, 1] before conversion.
///
/// # Errors
/// * If the file cannot be created or written
pub fn write_wav_file(path: &Path, buffer: &AudioBuffer) -> Result<(), SonifyError> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: buffer.sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec)?;
    for &sample in &buffer.samples {
        let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16;
        writer.write_sample(value)?;
    }
    writer.finalize()?;

    tracing::debug!(
        "Wrote {} samples at {} Hz to {}",
        buffer.len(),
        buffer.sample_rate,
        path.display()
    );
    Ok(())
}

/// Reads a WAV file back into a mono buffer.
///
/// This function supports the following WAV formats:
/// - 32-bit float
/// - 16-bit integer
/// - 24-bit integer
///
/// Integer formats are normalized to the [-1, 1] range and multi-channel
/// files are averaged down to mono.
///
/// # Errors
/// * If the file cannot be read
/// * If the WAV format is unsupported
pub fn read_wav_file(path: &Path) -> Result<AudioBuffer, SonifyError> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, 32) => reader.into_samples::<f32>().collect::<Result<_, _>>()?,
        (SampleFormat::Int, 16) => reader
            .into_samples::<i16>()
            .map(|s| s.map(|v| v as f32 / 32768.0))
            .collect::<Result<_, _>>()?,
        (SampleFormat::Int, 24) => reader
            .into_samples::<i32>()
            .map(|s| s.map(|v| v as f32 / 8388608.0))
            .collect::<Result<_, _>>()?,
        _ => {
            return Err(SonifyError::InvalidParams(format!(
                "Unsupported WAV format: {:?} {}-bit",
                spec.sample_format, spec.bits_per_sample
            )))
        }
    };

    let channels = spec.channels.max(1) as usize;
    let samples = interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect();

    Ok(AudioBuffer {
        samples,
        sample_rate: spec.sample_rate,
    })
}
