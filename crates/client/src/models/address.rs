//! Saved shipping and billing addresses.

use bazaar_core::AddressId;
use serde::{Deserialize, Serialize};

use crate::error::ClientError;

/// A saved address.
///
/// `id` is `None` for an address that has not been created yet.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<AddressId>,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub address_line1: String,
    #[serde(default)]
    pub address_line2: Option<String>,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub city: String,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub state: String,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub postal_code: String,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub country: String,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub phone_number: String,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub address_name: String,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub recipient_name: String,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub is_default: bool,
}

impl Address {
    /// Check that every required field is filled in.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` naming the missing fields.
    pub fn validate(&self) -> Result<(), ClientError> {
        let required = [
            ("address name", &self.address_name),
            ("recipient name", &self.recipient_name),
            ("address line 1", &self.address_line1),
            ("city", &self.city),
            ("state", &self.state),
            ("postal code", &self.postal_code),
            ("country", &self.country),
            ("phone number", &self.phone_number),
        ];
        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ClientError::Validation(format!(
                "Please fill in: {}",
                missing.join(", ")
            )))
        }
    }

    /// One-line summary, e.g. `Home: Jane Doe, 1 Main St, Springfield 12345, US`.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut street = self.address_line1.clone();
        if let Some(line2) = self.address_line2.as_deref().filter(|l| !l.trim().is_empty()) {
            street.push(' ');
            street.push_str(line2);
        }
        format!(
            "{}: {}, {}, {} {}, {}",
            self.address_name,
            self.recipient_name,
            street,
            self.city,
            self.postal_code,
            self.country
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn home() -> Address {
        Address {
            id: Some(AddressId::new(7)),
            address_line1: "1 Main St".to_string(),
            address_line2: None,
            city: "Springfield".to_string(),
            state: "IL".to_string(),
            postal_code: "12345".to_string(),
            country: "US".to_string(),
            phone_number: "555-0100".to_string(),
            address_name: "Home".to_string(),
            recipient_name: "Jane Doe".to_string(),
            is_default: true,
        }
    }

    #[test]
    fn test_wire_format_is_camel_case() {
        let value = serde_json::to_value(home()).unwrap();
        assert_eq!(value["addressLine1"], "1 Main St");
        assert_eq!(value["postalCode"], "12345");
        assert_eq!(value["isDefault"], true);
    }

    #[test]
    fn test_null_default_flag() {
        let address: Address =
            serde_json::from_str(r#"{"id":1,"addressLine1":"x","isDefault":null}"#).unwrap();
        assert!(!address.is_default);
        assert_eq!(address.city, "");
    }

    #[test]
    fn test_validate_lists_missing_fields() {
        let mut address = home();
        assert!(address.validate().is_ok());

        address.city = " ".to_string();
        address.country = String::new();
        let err = address.validate().unwrap_err();
        assert_eq!(err.to_string(), "Please fill in: city, country");
    }

    #[test]
    fn test_summary() {
        let mut address = home();
        address.address_line2 = Some("Apt 4".to_string());
        assert_eq!(
            address.summary(),
            "Home: Jane Doe, 1 Main St Apt 4, Springfield 12345, US"
        );
    }
}
