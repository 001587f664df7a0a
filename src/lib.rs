//! Turn one trading day of intraday prices into a sequence of just-intonation
//! tones.
//!
//! The pipeline runs strictly left to right:
//!
//! 1. [`analysis::detect_fundamental`] picks one base pitch for the whole day.
//! 2. [`analysis::normalize`] turns percentage changes into a control signal in [-1, 1].
//! 3. [`harmony::map_to_frequency`] picks an interval per point and applies it.
//! 4. [`midi::to_midi`] labels each frequency with the nearest MIDI note.
//! 5. [`audio::synthesize`] renders and concatenates one sine tone per note.
//!
//! [`pipeline::Pipeline`] wires these together for a single run, and the
//! [`export`] module writes the results out as CSV, WAV and MIDI files.
pub mod analysis;
pub mod audio;
pub mod config;
pub mod error;
pub mod export;
pub mod harmony;
pub mod midi;
pub mod pipeline;
pub mod series;

pub use config::SonifyConfig;
pub use error::{InputError, SonifyError};
pub use pipeline::{sonify, Diagnostics, NoteEvent, Pipeline, Rendering};
pub use series::{PricePoint, PriceSeries, Timestamp};
