//! Marketplace user roles.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Role attached to a marketplace account.
///
/// Serialized the way the backend emits it (`USER`, `SELLER`, `ADMIN`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    /// Regular customer.
    #[default]
    User,
    /// Can list products and see orders containing them.
    Seller,
    /// Full access, including user management.
    Admin,
}

impl UserRole {
    /// All roles, in display order.
    pub const ALL: [Self; 3] = [Self::User, Self::Seller, Self::Admin];

    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Seller => "SELLER",
            Self::Admin => "ADMIN",
        }
    }

    /// Human-readable label for role badges.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::User => "Customer",
            Self::Seller => "Seller",
            Self::Admin => "Administrator",
        }
    }

    /// Sellers and admins may manage products and see seller orders.
    #[must_use]
    pub const fn is_seller_or_admin(self) -> bool {
        matches!(self, Self::Seller | Self::Admin)
    }

    /// The role an admin toggle switches to: admins lose the role, everyone
    /// else gains it.
    #[must_use]
    pub const fn toggled_admin(self) -> Self {
        match self {
            Self::Admin => Self::User,
            Self::User | Self::Seller => Self::Admin,
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().trim_start_matches("ROLE_") {
            "USER" | "CUSTOMER" => Ok(Self::User),
            "SELLER" => Ok(Self::Seller),
            "ADMIN" => Ok(Self::Admin),
            _ => Err(format!("invalid role: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_accepts_backend_spellings() {
        assert_eq!("SELLER".parse::<UserRole>().unwrap(), UserRole::Seller);
        assert_eq!("admin".parse::<UserRole>().unwrap(), UserRole::Admin);
        assert_eq!("ROLE_USER".parse::<UserRole>().unwrap(), UserRole::User);
        assert!("owner".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_seller_or_admin() {
        assert!(!UserRole::User.is_seller_or_admin());
        assert!(UserRole::Seller.is_seller_or_admin());
        assert!(UserRole::Admin.is_seller_or_admin());
    }

    #[test]
    fn test_toggled_admin() {
        assert_eq!(UserRole::Admin.toggled_admin(), UserRole::User);
        assert_eq!(UserRole::Seller.toggled_admin(), UserRole::Admin);
    }

    #[test]
    fn test_serde_wire_format() {
        assert_eq!(serde_json::to_string(&UserRole::Seller).unwrap(), "\"SELLER\"");
        let role: UserRole = serde_json::from_str("\"ADMIN\"").unwrap();
        assert_eq!(role, UserRole::Admin);
    }
}
