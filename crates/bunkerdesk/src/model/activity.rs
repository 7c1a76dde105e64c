use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::FuelType;
use crate::error::{Error, Result};
use crate::imo::validate_imo;

string_enum! {
    /// How a call ended.
    pub enum CallOutcome {
        /// Spoke to the contact.
        Connected => "connected",
        /// Left a message.
        Voicemail => "voicemail",
        /// Nobody picked up.
        NoAnswer => "no_answer",
        /// Line busy.
        Busy => "busy",
        /// Number no longer reaches the contact.
        WrongNumber => "wrong_number",
    }
}

string_enum! {
    /// Whether an email went out or came in.
    pub enum EmailDirection {
        /// Sent by us.
        Sent => "sent",
        /// Received from the contact.
        Received => "received",
    }
}

string_enum! {
    /// Lifecycle of a fuel deal.
    pub enum DealStatus {
        /// Price given, not fixed.
        Quoted => "quoted",
        /// Stem confirmed.
        Confirmed => "confirmed",
        /// Fuel delivered.
        Delivered => "delivered",
        /// Called off.
        Cancelled => "cancelled",
    }
}

/// A logged phone call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Call {
    /// Storage id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Contact called.
    pub contact_id: i64,
    /// When the call happened.
    pub called_at: DateTime<Utc>,
    /// Length of the call.
    pub duration_minutes: u32,
    /// How it ended.
    pub outcome: CallOutcome,
    /// Free text.
    pub notes: Option<String>,
}

impl Call {
    /// A call to `contact_id` happening now.
    #[must_use]
    pub fn new(contact_id: i64, outcome: CallOutcome) -> Self {
        Self {
            id: None,
            contact_id,
            called_at: Utc::now(),
            duration_minutes: 0,
            outcome,
            notes: None,
        }
    }
}

/// A logged email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Email {
    /// Storage id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Contact written to or from.
    pub contact_id: i64,
    /// When it was sent or received.
    pub sent_at: DateTime<Utc>,
    /// Direction.
    pub direction: EmailDirection,
    /// Subject line.
    pub subject: String,
    /// Body text, if kept.
    pub body: Option<String>,
}

impl Email {
    /// An email to `contact_id` sent now.
    #[must_use]
    pub fn sent(contact_id: i64, subject: impl Into<String>) -> Self {
        Self {
            id: None,
            contact_id,
            sent_at: Utc::now(),
            direction: EmailDirection::Sent,
            subject: subject.into(),
            body: None,
        }
    }

    /// Check the record before it is written.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty subject.
    pub fn validate(&self) -> Result<()> {
        if self.subject.trim().is_empty() {
            return Err(Error::validation("email subject must not be empty"));
        }
        Ok(())
    }
}

/// A fuel sale, from quote to delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuelDeal {
    /// Storage id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Buyer.
    pub contact_id: i64,
    /// Physical supplier, once chosen.
    pub supplier_id: Option<i64>,
    /// Vessel receiving the fuel.
    pub vessel_name: String,
    /// Vessel IMO number, normalised to seven digits.
    pub imo: Option<String>,
    /// Delivery port.
    pub port: String,
    /// Grade.
    pub fuel_type: FuelType,
    /// Quantity in metric tonnes.
    pub quantity_mt: f64,
    /// Our selling price per tonne.
    pub sell_price_usd: f64,
    /// Supplier's price per tonne.
    pub buy_price_usd: Option<f64>,
    /// Expected delivery date.
    pub delivery_date: Option<NaiveDate>,
    /// Lifecycle state.
    pub status: DealStatus,
    /// When the deal was entered.
    pub created_at: DateTime<Utc>,
}

impl FuelDeal {
    /// A quoted deal entered now.
    #[must_use]
    pub fn quote(
        contact_id: i64,
        vessel_name: impl Into<String>,
        port: impl Into<String>,
        fuel_type: FuelType,
        quantity_mt: f64,
        sell_price_usd: f64,
    ) -> Self {
        Self {
            id: None,
            contact_id,
            supplier_id: None,
            vessel_name: vessel_name.into(),
            imo: None,
            port: port.into(),
            fuel_type,
            quantity_mt,
            sell_price_usd,
            buy_price_usd: None,
            delivery_date: None,
            status: DealStatus::Quoted,
            created_at: Utc::now(),
        }
    }

    /// Gross margin in USD, when the buy price is known.
    #[must_use]
    pub fn margin(&self) -> Option<f64> {
        self.buy_price_usd
            .map(|buy| (self.sell_price_usd - buy) * self.quantity_mt)
    }

    /// Sale value in USD.
    #[must_use]
    pub fn value(&self) -> f64 {
        self.sell_price_usd * self.quantity_mt
    }

    /// Check the record and normalise the IMO number.
    ///
    /// # Errors
    ///
    /// Returns a validation error for empty vessel or port names,
    /// non-positive quantities, negative prices or a bad IMO number.
    pub fn validate(&mut self) -> Result<()> {
        if self.vessel_name.trim().is_empty() {
            return Err(Error::validation("vessel name must not be empty"));
        }
        if self.port.trim().is_empty() {
            return Err(Error::validation("port must not be empty"));
        }
        if !(self.quantity_mt.is_finite() && self.quantity_mt > 0.0) {
            return Err(Error::validation("quantity must be greater than 0"));
        }
        let prices = std::iter::once(self.sell_price_usd).chain(self.buy_price_usd);
        for price in prices {
            if !(price.is_finite() && price >= 0.0) {
                return Err(Error::validation("prices must not be negative"));
            }
        }
        if let Some(imo) = self.imo.as_deref() {
            self.imo = Some(validate_imo(imo)?);
        }
        Ok(())
    }
}
