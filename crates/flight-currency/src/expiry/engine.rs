//! Expiry calculator — primitive currencies from matching event dates.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::{EngineConfig, RollingWindowMode};
use crate::currency::{ExpiryRule, PrimitiveCurrency};
use crate::status::{project_satisfied, project_status, CurrencyState, StatusProjection};
use crate::time::{add_days, days_between};

/// Computed expiry for one primitive currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimitiveExpiry {
    pub last_event_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub days_remaining: Option<i64>,
    pub state: CurrencyState,
    /// Held on the evaluation date.
    pub satisfied: bool,
    /// Qualifying events considered (for a rolling window, those inside it).
    pub qualifying_events: usize,
    /// The expiry date fell outside the representable calendar.
    pub date_overflow: bool,
}

impl PrimitiveExpiry {
    fn no_data(last_event_date: Option<NaiveDate>, qualifying_events: usize) -> Self {
        Self {
            last_event_date,
            expiry_date: None,
            days_remaining: None,
            state: CurrencyState::NoData,
            satisfied: false,
            qualifying_events,
            date_overflow: false,
        }
    }

    fn overflowed(last_event_date: Option<NaiveDate>, qualifying_events: usize) -> Self {
        Self {
            date_overflow: true,
            ..Self::no_data(last_event_date, qualifying_events)
        }
    }
}

/// Compute the expiry of `primitive` on `as_of` from its matching event dates.
///
/// `matching_dates` may be in any order and may be empty; empty history is
/// the ordinary NoData state, never an error. Dates after `as_of` are ignored.
pub fn compute_expiry(
    primitive: &PrimitiveCurrency,
    matching_dates: &[NaiveDate],
    as_of: NaiveDate,
    config: &EngineConfig,
) -> PrimitiveExpiry {
    let mut dates: Vec<NaiveDate> = matching_dates
        .iter()
        .copied()
        .filter(|d| *d <= as_of)
        .collect();
    // Newest first
    dates.sort_unstable_by(|a, b| b.cmp(a));

    match primitive.expiry_rule {
        ExpiryRule::LastEventPlusPeriod => last_event_plus_period(primitive, &dates, as_of, config),
        ExpiryRule::RollingWindow => rolling_window(primitive, &dates, as_of, config),
    }
}

/// Anchor on the newest event; `required_count` only gates data sufficiency.
fn last_event_plus_period(
    primitive: &PrimitiveCurrency,
    newest_first: &[NaiveDate],
    as_of: NaiveDate,
    config: &EngineConfig,
) -> PrimitiveExpiry {
    let last_event_date = newest_first.first().copied();
    let count = newest_first.len();

    if count < primitive.required_count.max(1) as usize {
        return PrimitiveExpiry::no_data(last_event_date, count);
    }
    let Some(anchor) = last_event_date else {
        return PrimitiveExpiry::no_data(None, count);
    };
    let Some(expiry) = add_days(anchor, primitive.validity_days) else {
        return PrimitiveExpiry::overflowed(last_event_date, count);
    };

    let StatusProjection {
        days_remaining,
        state,
    } = project_status(Some(expiry), as_of, config.expiring_soon_days);

    PrimitiveExpiry {
        last_event_date,
        expiry_date: Some(expiry),
        days_remaining,
        state,
        satisfied: state.is_held(),
        qualifying_events: count,
        date_overflow: false,
    }
}

/// Held when enough events fall inside the trailing `validity_days`.
fn rolling_window(
    primitive: &PrimitiveCurrency,
    newest_first: &[NaiveDate],
    as_of: NaiveDate,
    config: &EngineConfig,
) -> PrimitiveExpiry {
    let last_event_date = newest_first.first().copied();
    let window_days = i64::from(primitive.validity_days);
    let in_window: Vec<NaiveDate> = newest_first
        .iter()
        .copied()
        .filter(|d| days_between(*d, as_of) < window_days)
        .collect();
    let required = primitive.required_count.max(1) as usize;

    if in_window.len() < required {
        if newest_first.is_empty() {
            return PrimitiveExpiry::no_data(None, 0);
        }
        return PrimitiveExpiry {
            last_event_date,
            expiry_date: None,
            days_remaining: None,
            state: CurrencyState::Expired,
            satisfied: false,
            qualifying_events: in_window.len(),
            date_overflow: false,
        };
    }

    let expiry = match config.rolling_window {
        RollingWindowMode::AsOfEvaluation => as_of,
        RollingWindowMode::ProjectedLapse => {
            // The window drops below `required` once the required-th newest
            // event ages out.
            match add_days(in_window[required - 1], primitive.validity_days) {
                Some(date) => date,
                None => return PrimitiveExpiry::overflowed(last_event_date, in_window.len()),
            }
        }
    };

    let StatusProjection {
        days_remaining,
        state,
    } = project_satisfied(Some(expiry), as_of, config.expiring_soon_days);

    PrimitiveExpiry {
        last_event_date,
        expiry_date: Some(expiry),
        days_remaining,
        state,
        satisfied: true,
        qualifying_events: in_window.len(),
        date_overflow: false,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
