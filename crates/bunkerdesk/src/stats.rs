//! Pie chart breakdowns.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::{Call, Contact, DealStatus, FuelDeal};

/// One slice of a pie chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PieSlice {
    /// Category name.
    pub label: String,
    /// Absolute amount.
    pub value: f64,
    /// Share of the total, 0-100.
    pub percent: f64,
}

/// Turn labelled amounts into slices, largest first.
///
/// Zero and negative amounts are dropped. Ties keep label order.
#[must_use]
pub fn pie<I, L>(values: I) -> Vec<PieSlice>
where
    I: IntoIterator<Item = (L, f64)>,
    L: Into<String>,
{
    let mut merged: BTreeMap<String, f64> = BTreeMap::new();
    for (label, value) in values {
        if value > 0.0 {
            *merged.entry(label.into()).or_default() += value;
        }
    }
    let total: f64 = merged.values().sum();
    if total <= 0.0 {
        return Vec::new();
    }

    let mut slices: Vec<PieSlice> = merged
        .into_iter()
        .map(|(label, value)| PieSlice {
            label,
            value,
            percent: value / total * 100.0,
        })
        .collect();
    slices.sort_by(|a, b| b.value.total_cmp(&a.value));
    slices
}

/// Contacts by primary status.
#[must_use]
pub fn status_breakdown(contacts: &[Contact]) -> Vec<PieSlice> {
    pie(contacts
        .iter()
        .map(|contact| (contact.status.primary().as_str(), 1.0)))
}

/// Calls by outcome.
#[must_use]
pub fn call_outcome_breakdown(calls: &[Call]) -> Vec<PieSlice> {
    pie(calls.iter().map(|call| (call.outcome.as_str(), 1.0)))
}

/// Metric tonnes by fuel grade, cancelled deals excluded.
#[must_use]
pub fn fuel_volume_breakdown(deals: &[FuelDeal]) -> Vec<PieSlice> {
    pie(deals
        .iter()
        .filter(|deal| deal.status != DealStatus::Cancelled)
        .map(|deal| (deal.fuel_type.as_str(), deal.quantity_mt)))
}
