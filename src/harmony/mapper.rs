use super::ratios::{HarmonicRatioTable, Interval};
use crate::error::SonifyError;

/// Whether an interval raises or lowers the fundamental
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// The interval picked for one control value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selection<'t> {
    pub interval: &'t Interval,
    pub direction: Direction,
    /// Index of the bucket (and interval) in the table
    pub bucket: usize,
}

impl Selection<'_> {
    /// Raises or lowers `fundamental_hz` by the selected interval
    pub fn apply(&self, fundamental_hz: f64) -> f64 {
        match self.direction {
            Direction::Ascending => fundamental_hz * self.interval.ratio(),
            Direction::Descending => fundamental_hz / self.interval.ratio(),
        }
    }

    /// Like [`apply`](Self::apply), but rejects a fundamental or a result
    /// that is not a positive finite frequency
    ///
    /// # Errors
    /// * [`SonifyError::NumericDefect`] for a bad fundamental or result
    pub fn frequency(&self, fundamental_hz: f64) -> Result<f64, SonifyError> {
        if !fundamental_hz.is_finite() || fundamental_hz <= 0.0 {
            return Err(SonifyError::NumericDefect(format!(
                "fundamental {} Hz is not a positive finite frequency",
                fundamental_hz
            )));
        }

        let frequency = self.apply(fundamental_hz);
        if !frequency.is_finite() || frequency <= 0.0 {
            return Err(SonifyError::NumericDefect(format!(
                "interval {} applied to {} Hz gave {} Hz",
                self.interval, fundamental_hz, frequency
            )));
        }
        Ok(frequency)
    }
}

/// Picks an interval for a control value.
///
/// With `N` intervals, `|scaled_change|` is split into `N` equal buckets
/// `[k/N, (k+1)/N)`, the last one closed at 1. A value sitting exactly on a
/// threshold lands in the higher bucket. Values beyond 1 saturate in the top
/// bucket. Non-negative values ascend, negative values descend.
///
/// # Errors
/// * [`SonifyError::NumericDefect`] if `scaled_change` is NaN or infinite
pub fn select_interval(
    scaled_change: f64,
    table: &HarmonicRatioTable,
) -> Result<Selection<'_>, SonifyError> {
    if !scaled_change.is_finite() {
        return Err(SonifyError::NumericDefect(format!(
            "control value {} is not finite",
            scaled_change
        )));
    }

    let intervals = table.intervals();
    let n = intervals.len();
    let bucket = ((scaled_change.abs() * n as f64).floor() as usize).min(n - 1);
    let direction = if scaled_change >= 0.0 {
        Direction::Ascending
    } else {
        Direction::Descending
    };

    Ok(Selection {
        interval: &intervals[bucket],
        direction,
        bucket,
    })
}

/// Computes the target frequency for one point: the fundamental raised or
/// lowered by the interval [`select_interval`] picks.
///
/// # Errors
/// * [`SonifyError::NumericDefect`] if the fundamental is not a positive
///   finite number, the control value is not finite, or the result is not a
///   positive finite frequency
pub fn map_to_frequency(
    fundamental_hz: f64,
    scaled_change: f64,
    table: &HarmonicRatioTable,
) -> Result<f64, SonifyError> {
    select_interval(scaled_change, table)?.frequency(fundamental_hz)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_thresholds() {
        let table = HarmonicRatioTable::default();
        let labels: Vec<&str> = [0.0, 0.24, 0.25, 0.5, 0.74, 0.75, 1.0]
            .iter()
            .map(|&v| select_interval(v, &table).unwrap().interval.label.as_str())
            .collect();
        assert_eq!(
            labels,
            vec![
                "unison",
                "unison",
                "major third",
                "perfect fifth",
                "perfect fifth",
                "octave",
                "octave"
            ]
        );
    }

    #[test]
    fn test_sign_selects_direction() {
        let table = HarmonicRatioTable::default();
        assert_eq!(map_to_frequency(440.0, 1.0, &table).unwrap(), 880.0);
        assert_eq!(map_to_frequency(440.0, -1.0, &table).unwrap(), 220.0);
        assert_eq!(map_to_frequency(440.0, 0.5, &table).unwrap(), 660.0);
        assert_eq!(map_to_frequency(440.0, -0.25, &table).unwrap(), 352.0);
        assert_eq!(map_to_frequency(440.0, 0.0, &table).unwrap(), 440.0);
    }

    #[test]
    fn test_out_of_range_saturates() {
        let table = HarmonicRatioTable::default();
        let selection = select_interval(3.0, &table).unwrap();
        assert_eq!(selection.bucket, 3);
    }

    #[test]
    fn test_defects_are_surfaced() {
        let table = HarmonicRatioTable::default();
        assert!(matches!(
            map_to_frequency(0.0, 0.5, &table),
            Err(SonifyError::NumericDefect(_))
        ));
        assert!(matches!(
            map_to_frequency(440.0, f64::NAN, &table),
            Err(SonifyError::NumericDefect(_))
        ));
        assert!(matches!(
            map_to_frequency(f64::MAX, 1.0, &table),
            Err(SonifyError::NumericDefect(_))
        ));
    }

    #[test]
    fn test_selection_frequency_matches_mapper() {
        let table = HarmonicRatioTable::extended();
        for v in [-1.0, -0.4, 0.0, 0.3, 0.99] {
            let selection = select_interval(v, &table).unwrap();
            assert_eq!(
                selection.frequency(261.63).unwrap(),
                map_to_frequency(261.63, v, &table).unwrap()
            );
        }

        let selection = select_interval(0.5, &table).unwrap();
        assert!(matches!(
            selection.frequency(-1.0),
            Err(SonifyError::NumericDefect(_))
        ));
    }

    #[test]
    fn test_output_positive_across_range() {
        let table = HarmonicRatioTable::extended();
        for step in -100..=100 {
            let v = step as f64 / 100.0;
            let f = map_to_frequency(80.0, v, &table).unwrap();
            assert!(f > 0.0 && f.is_finite(), "v={} gave {}", v, f);
        }
    }
}
