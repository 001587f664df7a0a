use crate::error::SonifyError;
use serde::Deserialize;
use std::fmt;

/// A just-intonation interval expressed as a small-integer ratio
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Interval {
    pub label: String,
    pub numer: u32,
    pub denom: u32,
}

impl Interval {
    pub fn new(label: &str, numer: u32, denom: u32) -> Self {
        Interval {
            label: label.to_string(),
            numer,
            denom,
        }
    }

    pub fn ratio(&self) -> f64 {
        self.numer as f64 / self.denom as f64
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}/{})", self.label, self.numer, self.denom)
    }
}

/// Ordered set of intervals the harmonic mapper chooses from.
///
/// A table is always valid once built: non-empty, no zero terms, first
/// ratio at least 1/1 and ratios strictly ascending. Tables parsed from
/// TOML go through the same check.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Vec<Interval>")]
pub struct HarmonicRatioTable {
    intervals: Vec<Interval>,
}

impl HarmonicRatioTable {
    pub fn new(intervals: Vec<Interval>) -> Result<Self, SonifyError> {
        let table = HarmonicRatioTable { intervals };
        table.validate()?;
        Ok(table)
    }

    /// Every interval of the major-leaning palette: unison, major second,
    /// major third, fourth, fifth, minor sixth, octave
    pub fn extended() -> Self {
        HarmonicRatioTable {
            intervals: vec![
                Interval::new("unison", 1, 1),
                Interval::new("major second", 9, 8),
                Interval::new("major third", 5, 4),
                Interval::new("perfect fourth", 4, 3),
                Interval::new("perfect fifth", 3, 2),
                Interval::new("minor sixth", 8, 5),
                Interval::new("octave", 2, 1),
            ],
        }
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn validate(&self) -> Result<(), SonifyError> {
        let first = self.intervals.first().ok_or_else(|| {
            SonifyError::InvalidParams("harmonic ratio table is empty".to_string())
        })?;

        if let Some(bad) = self.intervals.iter().find(|i| i.numer == 0 || i.denom == 0) {
            return Err(SonifyError::InvalidParams(format!(
                "interval {} has a zero term",
                bad
            )));
        }
        if first.numer < first.denom {
            return Err(SonifyError::InvalidParams(format!(
                "first interval {} must be at least unison",
                first
            )));
        }

        // a/b < c/d  <=>  a*d < c*b
        for pair in self.intervals.windows(2) {
            let (lo, hi) = (&pair[0], &pair[1]);
            if (lo.numer as u64) * (hi.denom as u64) >= (hi.numer as u64) * (lo.denom as u64) {
                return Err(SonifyError::InvalidParams(format!(
                    "intervals must be strictly ascending, but {} is not below {}",
                    lo, hi
                )));
            }
        }

        Ok(())
    }
}

/// Unison, major third, perfect fifth, octave
impl Default for HarmonicRatioTable {
    fn default() -> Self {
        HarmonicRatioTable {
            intervals: vec![
                Interval::new("unison", 1, 1),
                Interval::new("major third", 5, 4),
                Interval::new("perfect fifth", 3, 2),
                Interval::new("octave", 2, 1),
            ],
        }
    }
}

impl TryFrom<Vec<Interval>> for HarmonicRatioTable {
    type Error = SonifyError;

    fn try_from(intervals: Vec<Interval>) -> Result<Self, Self::Error> {
        HarmonicRatioTable::new(intervals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_tables_are_valid() {
        assert!(HarmonicRatioTable::default().validate().is_ok());
        assert!(HarmonicRatioTable::extended().validate().is_ok());
    }

    #[test]
    fn test_rejects_invalid_tables() {
        assert!(HarmonicRatioTable::new(vec![]).is_err());
        assert!(HarmonicRatioTable::new(vec![Interval::new("zero", 0, 1)]).is_err());
        assert!(HarmonicRatioTable::new(vec![Interval::new("below", 4, 5)]).is_err());
        assert!(HarmonicRatioTable::new(vec![
            Interval::new("unison", 1, 1),
            Interval::new("also unison", 2, 2),
        ])
        .is_err());
    }

    #[test]
    fn test_ratio_value() {
        assert_eq!(Interval::new("fifth", 3, 2).ratio(), 1.5);
        assert_eq!(Interval::new("fifth", 3, 2).to_string(), "fifth (3/2)");
    }
}
