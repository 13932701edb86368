//! Expiry calculation for primitive currencies.
//!
//! The expiry module provides:
//! - LastEventPlusPeriod: newest qualifying event plus the validity period
//! - RollingWindow: enough qualifying events inside the trailing window
//! - Optional projected lapse dates for rolling windows

pub mod engine;

pub use engine::{compute_expiry, PrimitiveExpiry};
