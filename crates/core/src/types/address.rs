//! Shipping address snapshot.
//!
//! Orders copy the delivery details at creation time instead of referencing
//! the account profile, so later profile edits never rewrite order history.

use serde::{Deserialize, Serialize};

/// Country used when the client omits one.
pub const DEFAULT_COUNTRY: &str = "India";

/// Validation failures for a [`ShippingAddress`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("Shipping address is required")]
    Missing,
    #[error("Shipping address full name is required")]
    MissingFullName,
    #[error("Shipping address street line is required")]
    MissingStreet,
    #[error("Shipping address field {field} is too long (max {max} characters)")]
    TooLong { field: &'static str, max: usize },
}

/// Delivery details captured when an order is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    #[serde(default)]
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Street line(s).
    #[serde(default)]
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    #[serde(default = "default_country")]
    pub country: String,
}

fn default_country() -> String {
    DEFAULT_COUNTRY.to_owned()
}

impl ShippingAddress {
    /// Longest value accepted for any single field.
    pub const MAX_FIELD_LENGTH: usize = 200;

    /// Trim every field, drop empty optionals and check the minimum
    /// requirements (full name and street line).
    ///
    /// # Errors
    ///
    /// Returns the first violated rule.
    pub fn validated(self) -> Result<Self, AddressError> {
        let full_name = self.full_name.trim().to_owned();
        if full_name.is_empty() {
            return Err(AddressError::MissingFullName);
        }
        let address = self.address.trim().to_owned();
        if address.is_empty() {
            return Err(AddressError::MissingStreet);
        }
        let country = match self.country.trim() {
            "" => default_country(),
            other => other.to_owned(),
        };

        let validated = Self {
            full_name,
            phone: trimmed(self.phone),
            email: trimmed(self.email),
            address,
            city: trimmed(self.city),
            state: trimmed(self.state),
            zip: trimmed(self.zip),
            country,
        };
        validated.check_lengths()?;
        Ok(validated)
    }

    fn check_lengths(&self) -> Result<(), AddressError> {
        let fields = [
            ("fullName", Some(self.full_name.as_str())),
            ("phone", self.phone.as_deref()),
            ("email", self.email.as_deref()),
            ("address", Some(self.address.as_str())),
            ("city", self.city.as_deref()),
            ("state", self.state.as_deref()),
            ("zip", self.zip.as_deref()),
            ("country", Some(self.country.as_str())),
        ];
        for (field, value) in fields {
            if value.is_some_and(|v| v.chars().count() > Self::MAX_FIELD_LENGTH) {
                return Err(AddressError::TooLong {
                    field,
                    max: Self::MAX_FIELD_LENGTH,
                });
            }
        }
        Ok(())
    }
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}
