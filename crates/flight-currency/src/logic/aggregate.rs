//! Composite expiry aggregation.

use chrono::NaiveDate;

use crate::currency::ExpiryCalculation;

/// Reduce the contributing expiry dates of a satisfied composite to one date.
///
/// `EarliestChild` takes the minimum (the composite lapses when its first
/// contributor lapses); `LatestChild` takes the maximum. No dates yields `None`.
pub fn aggregate_expiry(dates: &[NaiveDate], calculation: ExpiryCalculation) -> Option<NaiveDate> {
    match calculation {
        ExpiryCalculation::EarliestChild => dates.iter().min().copied(),
        ExpiryCalculation::LatestChild => dates.iter().max().copied(),
    }
}
