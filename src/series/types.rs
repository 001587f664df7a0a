use crate::error::InputError;

/// Seconds since the Unix epoch (UTC)
pub type Timestamp = i64;

/// One intraday observation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub timestamp: Timestamp,
    pub price: f64,
}

/// An ordered, validated price series for one trading day.
///
/// Construction guarantees the series is non-empty, its timestamps are
/// strictly increasing and every price is positive and finite. The series
/// is read-only afterwards.
#[derive(Debug, Clone)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Validates and wraps a list of points
    ///
    /// # Errors
    /// * [`InputError::Empty`] if there are no points
    /// * [`InputError::InvalidPrice`] for a price that is not a positive, finite number
    /// * [`InputError::NonMonotonic`] if a timestamp does not increase
    pub fn new(points: Vec<PricePoint>) -> Result<Self, InputError> {
        if points.is_empty() {
            return Err(InputError::Empty);
        }

        for (index, point) in points.iter().enumerate() {
            if !point.price.is_finite() || point.price <= 0.0 {
                return Err(InputError::InvalidPrice {
                    index,
                    price: point.price,
                });
            }
            if index > 0 {
                let previous = points[index - 1].timestamp;
                if point.timestamp <= previous {
                    return Err(InputError::NonMonotonic {
                        index,
                        previous,
                        timestamp: point.timestamp,
                    });
                }
            }
        }

        Ok(PriceSeries { points })
    }

    /// Builds a series from bare prices, one per second starting at zero
    pub fn from_prices(prices: &[f64]) -> Result<Self, InputError> {
        Self::new(
            prices
                .iter()
                .enumerate()
                .map(|(i, &price)| PricePoint {
                    timestamp: i as Timestamp,
                    price,
                })
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the series has no points; never true for a validated series
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn prices(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.price).collect()
    }

    pub fn timestamps(&self) -> Vec<Timestamp> {
        self.points.iter().map(|p| p.timestamp).collect()
    }
}
