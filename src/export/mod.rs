/// File writers for the results of a run.
///
/// The core never touches the filesystem; these helpers turn a
/// [`Rendering`](crate::pipeline::Rendering) into a note table (CSV), a
/// waveform (WAV) and a Standard MIDI File.
mod notes;
mod smf;

pub use notes::write_notes_csv;
pub use smf::{to_smf, write_midi};

use crate::audio::write_wav_file;
use crate::error::SonifyError;
use crate::pipeline::Rendering;
use std::fs;
use std::path::{Path, PathBuf};

/// Paths written by [`export_rendering`]
#[derive(Debug, Clone)]
pub struct ExportedFiles {
    pub notes_csv: PathBuf,
    pub audio_wav: PathBuf,
    pub midi: Option<PathBuf>,
}

/// Writes `notes_<stem>.csv`, `audio_<stem>.wav` and, if asked,
/// `notes_<stem>.mid` into `dir`, creating the directory if needed.
pub fn export_rendering(
    rendering: &Rendering,
    dir: &Path,
    stem: &str,
    with_midi: bool,
) -> Result<ExportedFiles, SonifyError> {
    fs::create_dir_all(dir)?;

    let notes_csv = dir.join(format!("notes_{}.csv", stem));
    write_notes_csv(&notes_csv, &rendering.notes)?;

    let audio_wav = dir.join(format!("audio_{}.wav", stem));
    write_wav_file(&audio_wav, &rendering.audio)?;

    let midi = if with_midi {
        let path = dir.join(format!("notes_{}.mid", stem));
        write_midi(&path, &rendering.notes)?;
        Some(path)
    } else {
        None
    };

    Ok(ExportedFiles {
        notes_csv,
        audio_wav,
        midi,
    })
}
