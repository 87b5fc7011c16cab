//! fulfillsla library - expected fulfillment timestamps
//!
//! Cutoff hours per sales channel and working weeks per location decide
//! when an order is expected to ship.

pub mod calendar;
pub mod cli;
pub mod clock;
pub mod config;
pub mod estimator;

pub use calendar::{CalendarError, CutoffTable, WorkWeek, WorkdayCalendar};
pub use clock::{to_utc_string, HourConversion, ReferenceOffset};
pub use config::Config;
pub use estimator::{EstimateError, FulfillmentEstimate, FulfillmentEstimator};
