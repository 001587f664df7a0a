/// Price series handling.
///
/// This module provides:
/// - The validated [`PriceSeries`] the pipeline consumes
/// - CSV loading of raw price rows
/// - Splitting a multi-day file into single trading days
mod load;
mod types;

pub use load::{available_dates, for_date, load_csv, parse_timestamp};
pub use types::{PricePoint, PriceSeries, Timestamp};
