use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

string_enum! {
    /// Marine fuel grades traded on the desk.
    pub enum FuelType {
        /// High sulphur fuel oil (3.5%).
        Hsfo => "hsfo",
        /// Very low sulphur fuel oil (0.5%).
        Vlsfo => "vlsfo",
        /// Ultra low sulphur fuel oil (0.1%).
        Ulsfo => "ulsfo",
        /// Marine gas oil.
        Mgo => "mgo",
        /// Low sulphur marine gas oil.
        Lsmgo => "lsmgo",
    }
}

string_enum! {
    /// How a supplier gets fuel into a vessel at a port.
    pub enum DeliveryMethod {
        /// Bunker barge alongside.
        Barge => "barge",
        /// Road tanker.
        Truck => "truck",
        /// Shore pipeline.
        Pipeline => "pipeline",
        /// Vessel comes to the terminal.
        ExWharf => "ex_wharf",
    }
}

/// A physical supplier of fuel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supplier {
    /// Storage id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Trading name.
    pub name: String,
    /// Desk email.
    pub email: Option<String>,
    /// Desk phone.
    pub phone: Option<String>,
    /// Free text.
    pub notes: Option<String>,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
}

impl Supplier {
    /// Create an unsaved supplier.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            email: None,
            phone: None,
            notes: None,
            created_at: Utc::now(),
        }
    }

    /// Check the record before it is written.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty name.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::validation("supplier name must not be empty"));
        }
        Ok(())
    }
}

/// A port a supplier serves, with what it can deliver there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierPort {
    /// Storage id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Owning supplier.
    pub supplier_id: i64,
    /// Port name.
    pub port: String,
    /// Country.
    pub country: Option<String>,
    /// Supported delivery methods.
    pub delivery: Vec<DeliveryMethod>,
    /// Supported fuel grades.
    pub fuels: Vec<FuelType>,
    /// Free text.
    pub notes: Option<String>,
}

impl SupplierPort {
    /// Create an unsaved port entry with no capabilities.
    #[must_use]
    pub fn new(supplier_id: i64, port: impl Into<String>) -> Self {
        Self {
            id: None,
            supplier_id,
            port: port.into(),
            country: None,
            delivery: Vec::new(),
            fuels: Vec::new(),
            notes: None,
        }
    }

    /// Whether this port can supply the given grade.
    #[must_use]
    pub fn supports(&self, fuel: FuelType) -> bool {
        self.fuels.contains(&fuel)
    }

    /// Check the record and normalise capability lists.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty port name.
    pub fn validate(&mut self) -> Result<()> {
        if self.port.trim().is_empty() {
            return Err(Error::validation("port name must not be empty"));
        }
        self.delivery.sort();
        self.delivery.dedup();
        self.fuels.sort();
        self.fuels.dedup();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_supports() {
        let mut port = SupplierPort::new(1, "Singapore");
        port.fuels = vec![FuelType::Vlsfo, FuelType::Mgo];
        assert!(port.supports(FuelType::Vlsfo));
        assert!(!port.supports(FuelType::Hsfo));
    }

    #[test]
    fn test_port_validate_dedups() {
        let mut port = SupplierPort::new(1, "Fujairah");
        port.fuels = vec![FuelType::Mgo, FuelType::Hsfo, FuelType::Mgo];
        port.delivery = vec![DeliveryMethod::Barge, DeliveryMethod::Barge];
        port.validate().unwrap();
        assert_eq!(port.fuels, vec![FuelType::Hsfo, FuelType::Mgo]);
        assert_eq!(port.delivery, vec![DeliveryMethod::Barge]);
    }

    #[test]
    fn test_port_validate_empty_name() {
        let mut port = SupplierPort::new(1, " ");
        assert!(port.validate().is_err());
    }

    #[test]
    fn test_supplier_validate() {
        assert!(Supplier::new("Peninsula").validate().is_ok());
        assert!(Supplier::new("").validate().is_err());
    }

    #[test]
    fn test_delivery_method_text() {
        assert_eq!(DeliveryMethod::ExWharf.to_string(), "ex_wharf");
        assert_eq!(
            "ex-wharf".parse::<DeliveryMethod>().unwrap(),
            DeliveryMethod::ExWharf
        );
    }
}
