//! Domain records for the CRM.
//!
//! Every table in the store has a matching type here. Records carry an
//! `Option<i64>` id which is `None` until the storage layer assigns one.

use thiserror::Error;

/// Error returned when a textual enum value is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} value '{value}'")]
pub struct ParseEnumError {
    /// Name of the enum being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

/// Declares a fieldless enum stored as lowercase text.
///
/// Generates `as_str`, `ALL`, `Display`, `FromStr` (case-insensitive, `-`
/// accepted for `_`) and serde derives using the same text.
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $(
                $(#[$vmeta:meta])*
                $variant:ident => $text:literal
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $text)]
                $variant
            ),+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// The stored text form.
            #[must_use]
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::model::ParseEnumError;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                let needle = s.trim().to_ascii_lowercase().replace('-', "_");
                match needle.as_str() {
                    $($text => Ok($name::$variant),)+
                    _ => Err($crate::model::ParseEnumError {
                        kind: stringify!($name),
                        value: s.to_string(),
                    }),
                }
            }
        }
    };
}

pub(crate) use string_enum;

mod activity;
mod contact;
mod goal;
mod note;
mod preferences;
mod supplier;
mod task;

pub use activity::{Call, CallOutcome, DealStatus, Email, EmailDirection, FuelDeal};
pub use contact::{Contact, ContactStatus, PrimaryStatus, StatusFlag, MAX_PRIORITY};
pub use goal::{CallSchedule, DailyGoal, GoalType, ScheduleSlot};
pub use note::{NoteShare, SavedNote, SharePermission};
pub use preferences::UserPreferences;
pub use supplier::{DeliveryMethod, FuelType, Supplier, SupplierPort};
pub use task::{Task, TaskKind};

/// Parse a comma separated list of enum values, ignoring blanks.
///
/// # Errors
///
/// Returns the first value that fails to parse.
pub fn parse_list<T>(input: &str) -> std::result::Result<Vec<T>, ParseEnumError>
where
    T: std::str::FromStr<Err = ParseEnumError>,
{
    input
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::parse)
        .collect()
}
