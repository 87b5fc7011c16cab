//! Expected fulfillment timestamp for an order.
//!
//! An order that lands before its channel's cutoff ships on the next
//! working day of its location, otherwise one day later. The result is
//! pinned to the cutoff hour, expressed in UTC.

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::calendar::WorkWeek;
use crate::clock::{to_utc_string, ReferenceTime};
use crate::config::Config;

/// Caller input errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EstimateError {
    #[error("Unknown sales channel: '{0}'")]
    UnknownSalesChannel(String),
    #[error("Unknown fulfillment location: '{0}'")]
    UnknownLocation(String),
    #[error("Order time {0} is too close to the edge of the supported date range")]
    InstantOutOfRange(String),
}

/// Everything that went into one estimate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FulfillmentEstimate {
    pub sales_channel: String,
    pub location: String,
    pub ordered_at: DateTime<Utc>,
    /// Order hour in the reference timezone; negative only in legacy mode
    pub reference_hour: i32,
    pub cutoff_hour: u32,
    pub made_cutoff: bool,
    /// Working day chosen for fulfillment, reference-timezone calendar
    pub business_date: NaiveDate,
    pub fulfillment_at: DateTime<Utc>,
}

impl FulfillmentEstimate {
    /// RFC-1123 rendering of `fulfillment_at`
    pub fn utc_string(&self) -> String {
        to_utc_string(self.fulfillment_at)
    }
}

#[derive(Debug, Clone, Default)]
pub struct FulfillmentEstimator {
    config: Config,
}

impl FulfillmentEstimator {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Expected fulfillment instant for an order placed at `ordered_at`
    pub fn estimate(
        &self,
        sales_channel: &str,
        location: &str,
        ordered_at: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, EstimateError> {
        self.estimate_detailed(sales_channel, location, ordered_at)
            .map(|e| e.fulfillment_at)
    }

    pub fn estimate_detailed(
        &self,
        sales_channel: &str,
        location: &str,
        ordered_at: DateTime<Utc>,
    ) -> Result<FulfillmentEstimate, EstimateError> {
        // Resolve both inputs before doing any date arithmetic
        let cutoff_hour = self.cutoff_hour(sales_channel)?;
        let week = self.work_week(location)?;

        let reference = self.reference_time(ordered_at)?;
        let made_cutoff = reference.hour < cutoff_hour as i32;

        let business_date = advance_to_workday(reference.date, made_cutoff, week)
            .ok_or_else(|| EstimateError::InstantOutOfRange(ordered_at.to_rfc3339()))?;
        let fulfillment_at = self
            .config
            .offset
            .utc_at(business_date, cutoff_hour)
            .ok_or_else(|| EstimateError::InstantOutOfRange(ordered_at.to_rfc3339()))?;

        debug!(
            "Order {} on '{}' for {}: reference hour {} vs cutoff {} (made_cutoff={}), business date {}, fulfillment {}",
            ordered_at,
            sales_channel,
            location,
            reference.hour,
            cutoff_hour,
            made_cutoff,
            business_date,
            fulfillment_at
        );

        Ok(FulfillmentEstimate {
            sales_channel: sales_channel.to_lowercase(),
            location: location.to_string(),
            ordered_at,
            reference_hour: reference.hour,
            cutoff_hour,
            made_cutoff,
            business_date,
            fulfillment_at,
        })
    }

    /// Whether an order at `ordered_at` beat the channel's cutoff
    pub fn made_cutoff(&self, sales_channel: &str, ordered_at: DateTime<Utc>) -> Result<bool, EstimateError> {
        let cutoff_hour = self.cutoff_hour(sales_channel)?;
        let reference = self.reference_time(ordered_at)?;
        Ok(reference.hour < cutoff_hour as i32)
    }

    /// Next working day for `location` after `order_date`, skipping one
    /// extra day when the cutoff was missed
    pub fn next_business_date(
        &self,
        made_cutoff: bool,
        location: &str,
        order_date: NaiveDate,
    ) -> Result<NaiveDate, EstimateError> {
        let week = self.work_week(location)?;
        advance_to_workday(order_date, made_cutoff, week)
            .ok_or_else(|| EstimateError::InstantOutOfRange(order_date.to_string()))
    }

    fn reference_time(&self, ordered_at: DateTime<Utc>) -> Result<ReferenceTime, EstimateError> {
        self.config
            .hour_conversion
            .reference_time(ordered_at, self.config.offset)
            .ok_or_else(|| EstimateError::InstantOutOfRange(ordered_at.to_rfc3339()))
    }

    fn cutoff_hour(&self, sales_channel: &str) -> Result<u32, EstimateError> {
        self.config
            .cutoffs
            .cutoff_hour(sales_channel)
            .ok_or_else(|| EstimateError::UnknownSalesChannel(sales_channel.to_string()))
    }

    fn work_week(&self, location: &str) -> Result<WorkWeek, EstimateError> {
        self.config
            .workdays
            .work_week(location)
            .ok_or_else(|| EstimateError::UnknownLocation(location.to_string()))
    }
}

/// `None` only when the advance runs past `NaiveDate::MAX`; WorkdayCalendar
/// rejects empty weeks, so a working day is otherwise found within 7 days
fn advance_to_workday(order_date: NaiveDate, made_cutoff: bool, week: WorkWeek) -> Option<NaiveDate> {
    let days_to_add = if made_cutoff { 1 } else { 2 };
    let start = order_date.checked_add_days(Days::new(days_to_add))?;
    week.first_workday_on_or_after(start)
}
