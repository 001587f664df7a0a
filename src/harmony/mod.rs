/// Harmonic interval selection.
///
/// A just-intonation ratio table plus the step function that turns a
/// control value in [-1, 1] into "which interval, up or down".
mod mapper;
mod ratios;

pub use mapper::{map_to_frequency, select_interval, Direction, Selection};
pub use ratios::{HarmonicRatioTable, Interval};
