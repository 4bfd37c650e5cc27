//! Daily revenue series over paid orders.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use super::money::{Money, MoneyError};
use super::order::Order;
use super::status::OrderStatus;

/// Revenue from paid orders on one UTC calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DailySales {
    /// Serialized as `YYYY-MM-DD`.
    pub date: NaiveDate,
    pub amount: Money,
}

/// Sum `amount` of paid orders created at or after `since`, grouped by UTC
/// day and sorted ascending. Days without paid orders are omitted.
///
/// # Errors
///
/// Returns [`MoneyError::Overflow`] if a day's total is not representable.
pub fn daily_series<'a, I>(orders: I, since: DateTime<Utc>) -> Result<Vec<DailySales>, MoneyError>
where
    I: IntoIterator<Item = &'a Order>,
{
    let mut by_day: BTreeMap<NaiveDate, Money> = BTreeMap::new();
    for order in orders {
        if order.status != OrderStatus::Paid || order.created_at < since {
            continue;
        }
        let day = by_day.entry(order.created_at.date_naive()).or_default();
        *day = day.checked_add(order.amount)?;
    }
    Ok(by_day
        .into_iter()
        .map(|(date, amount)| DailySales { date, amount })
        .collect())
}
