use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Highest priority rank a contact can carry.
pub const MAX_PRIORITY: u8 = 5;

string_enum! {
    /// One of the relationship flags on a contact.
    pub enum StatusFlag {
        /// Buying from us.
        Client => "client",
        /// Showing interest.
        Traction => "traction",
        /// Stalled.
        Jammed => "jammed",
        /// Not worth calling.
        Dead => "dead",
    }
}

string_enum! {
    /// The single status used when contacts are grouped, e.g. in pie charts.
    pub enum PrimaryStatus {
        /// Dead overrides every other flag.
        Dead => "dead",
        /// Client.
        Client => "client",
        /// Traction.
        Traction => "traction",
        /// Jammed.
        Jammed => "jammed",
        /// No flag set.
        Prospect => "prospect",
    }
}

/// Relationship flags. They are independent; a client can also be jammed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactStatus {
    /// Buying from us.
    pub client: bool,
    /// Showing interest.
    pub traction: bool,
    /// Stalled.
    pub jammed: bool,
    /// Not worth calling.
    pub dead: bool,
}

impl ContactStatus {
    /// Build a status with the given flags set.
    #[must_use]
    pub fn from_flags(flags: &[StatusFlag]) -> Self {
        let mut status = Self::default();
        for flag in flags {
            status.set(*flag, true);
        }
        status
    }

    /// Whether `flag` is set.
    #[must_use]
    pub fn has(&self, flag: StatusFlag) -> bool {
        match flag {
            StatusFlag::Client => self.client,
            StatusFlag::Traction => self.traction,
            StatusFlag::Jammed => self.jammed,
            StatusFlag::Dead => self.dead,
        }
    }

    /// Set or clear `flag`.
    pub fn set(&mut self, flag: StatusFlag, value: bool) {
        match flag {
            StatusFlag::Client => self.client = value,
            StatusFlag::Traction => self.traction = value,
            StatusFlag::Jammed => self.jammed = value,
            StatusFlag::Dead => self.dead = value,
        }
    }

    /// The flags that are set, in declaration order.
    #[must_use]
    pub fn flags(&self) -> Vec<StatusFlag> {
        StatusFlag::ALL
            .iter()
            .copied()
            .filter(|flag| self.has(*flag))
            .collect()
    }

    /// Collapse the flags to one status: dead > client > traction > jammed.
    #[must_use]
    pub fn primary(&self) -> PrimaryStatus {
        if self.dead {
            PrimaryStatus::Dead
        } else if self.client {
            PrimaryStatus::Client
        } else if self.traction {
            PrimaryStatus::Traction
        } else if self.jammed {
            PrimaryStatus::Jammed
        } else {
            PrimaryStatus::Prospect
        }
    }
}

impl std::fmt::Display for ContactStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let flags = self.flags();
        if flags.is_empty() {
            return f.write_str("-");
        }
        let names: Vec<&str> = flags.iter().map(|flag| flag.as_str()).collect();
        f.write_str(&names.join(","))
    }
}

/// A lead or customer: ship broker, owner, operator, trader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    /// Storage id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Person's name.
    pub name: String,
    /// Company they work for.
    pub company: Option<String>,
    /// Email address.
    pub email: Option<String>,
    /// Phone number, free form.
    pub phone: Option<String>,
    /// Job title or role.
    pub role: Option<String>,
    /// Trading region.
    pub region: Option<String>,
    /// Relationship flags.
    pub status: ContactStatus,
    /// Rank from 0 (lowest) to 5.
    pub priority: u8,
    /// Free text.
    pub notes: Option<String>,
    /// Last logged call or email.
    pub last_contacted_at: Option<DateTime<Utc>>,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the record last changed.
    pub updated_at: DateTime<Utc>,
}

impl Contact {
    /// Create an unsaved contact with only a name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            name: name.into(),
            company: None,
            email: None,
            phone: None,
            role: None,
            region: None,
            status: ContactStatus::default(),
            priority: 0,
            notes: None,
            last_contacted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check the record before it is written.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty name, a priority above
    /// [`MAX_PRIORITY`] or a malformed email address.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::validation("contact name must not be empty"));
        }
        if self.priority > MAX_PRIORITY {
            return Err(Error::validation(format!(
                "priority must be between 0 and {MAX_PRIORITY}, got {}",
                self.priority
            )));
        }
        if let Some(email) = self.email.as_deref() {
            if !email_pattern().is_match(email) {
                return Err(Error::validation(format!("invalid email address: {email}")));
            }
        }
        Ok(())
    }

    /// Name with company, for one-line listings.
    #[must_use]
    pub fn display_name(&self) -> String {
        match &self.company {
            Some(company) => format!("{} ({company})", self.name),
            None => self.name.clone(),
        }
    }
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_status_precedence() {
        let mut status = ContactStatus::from_flags(&[StatusFlag::Jammed, StatusFlag::Client]);
        assert_eq!(status.primary(), PrimaryStatus::Client);

        status.set(StatusFlag::Dead, true);
        assert_eq!(status.primary(), PrimaryStatus::Dead);

        assert_eq!(ContactStatus::default().primary(), PrimaryStatus::Prospect);
    }

    #[test]
    fn test_status_flags_and_display() {
        let status = ContactStatus::from_flags(&[StatusFlag::Traction, StatusFlag::Client]);
        assert_eq!(status.flags(), vec![StatusFlag::Client, StatusFlag::Traction]);
        assert_eq!(status.to_string(), "client,traction");
        assert_eq!(ContactStatus::default().to_string(), "-");
    }

    #[test]
    fn test_validate_ok() {
        let mut contact = Contact::new("Ingrid Holm");
        contact.email = Some("ingrid@nordicbroking.no".to_string());
        contact.priority = 5;
        assert!(contact.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_name() {
        let contact = Contact::new("   ");
        assert!(contact.validate().unwrap_err().is_validation());
    }

    #[test]
    fn test_validate_priority_range() {
        let mut contact = Contact::new("Ravi");
        contact.priority = 6;
        let err = contact.validate().unwrap_err().to_string();
        assert!(err.contains("priority"));
    }

    #[test]
    fn test_validate_email() {
        let mut contact = Contact::new("Ravi");
        contact.email = Some("not-an-email".to_string());
        assert!(contact.validate().is_err());
    }

    #[test]
    fn test_display_name() {
        let mut contact = Contact::new("Ravi");
        assert_eq!(contact.display_name(), "Ravi");
        contact.company = Some("Oceanic Shipping".to_string());
        assert_eq!(contact.display_name(), "Ravi (Oceanic Shipping)");
    }
}
