//! Status projection: expiry date + evaluation date → state and days remaining.
//!
//! Pure functions. Thresholds are always supplied by the caller.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::SeverityBands;
use crate::time::days_between;

/// Projected state of a currency on the evaluation date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurrencyState {
    Current,
    ExpiringSoon,
    Expired,
    NoData,
}

impl CurrencyState {
    /// Whether the qualification is held (current or expiring soon).
    pub fn is_held(&self) -> bool {
        matches!(self, CurrencyState::Current | CurrencyState::ExpiringSoon)
    }
}

impl std::fmt::Display for CurrencyState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CurrencyState::Current => write!(f, "current"),
            CurrencyState::ExpiringSoon => write!(f, "expiring_soon"),
            CurrencyState::Expired => write!(f, "expired"),
            CurrencyState::NoData => write!(f, "no_data"),
        }
    }
}

/// Days remaining and state for one currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusProjection {
    pub days_remaining: Option<i64>,
    pub state: CurrencyState,
}

/// Project an optional expiry date onto `as_of`.
///
/// Expired when zero or fewer days remain, expiring soon when fewer than
/// `expiring_soon_days` remain, current otherwise, and no data without a date.
pub fn project_status(
    expiry: Option<NaiveDate>,
    as_of: NaiveDate,
    expiring_soon_days: i64,
) -> StatusProjection {
    let Some(expiry) = expiry else {
        return StatusProjection {
            days_remaining: None,
            state: CurrencyState::NoData,
        };
    };

    let days = days_between(as_of, expiry);
    let state = if days <= 0 {
        CurrencyState::Expired
    } else if days < expiring_soon_days {
        CurrencyState::ExpiringSoon
    } else {
        CurrencyState::Current
    };

    StatusProjection {
        days_remaining: Some(days),
        state,
    }
}

/// Project a currency already known to be held on `as_of`.
///
/// A held currency whose only date is the evaluation day itself (a
/// rolling window held "as of now") reports zero days but stays current.
pub fn project_satisfied(
    expiry: Option<NaiveDate>,
    as_of: NaiveDate,
    expiring_soon_days: i64,
) -> StatusProjection {
    let projection = project_status(expiry, as_of, expiring_soon_days);
    match projection.state {
        CurrencyState::Expired | CurrencyState::NoData => StatusProjection {
            days_remaining: projection.days_remaining.map(|d| d.max(0)),
            state: CurrencyState::Current,
        },
        _ => projection,
    }
}

/// Coarse band for display, following the roster colour scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Expired,
    Critical,
    Warning,
    Normal,
    Unknown,
}

/// Classify a projected status into a [`Severity`] band.
///
/// A held currency is never [`Severity::Expired`]. When it is held with no
/// days left (a rolling window satisfied as of the evaluation date) it has
/// no countdown, so it reads as normal.
pub fn classify_severity(
    state: CurrencyState,
    days_remaining: Option<i64>,
    bands: &SeverityBands,
) -> Severity {
    match (state.is_held(), days_remaining) {
        (_, None) => Severity::Unknown,
        (true, Some(d)) if d <= 0 => Severity::Normal,
        (false, Some(d)) if d <= 0 => Severity::Expired,
        (_, Some(d)) if d < bands.critical_days => Severity::Critical,
        (_, Some(d)) if d < bands.warning_days => Severity::Warning,
        (_, Some(_)) => Severity::Normal,
    }
}
