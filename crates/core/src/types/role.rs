//! Marketplace profile roles.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned for an unknown role name.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown role: {0}")]
pub struct RoleError(pub String);

/// Role stored on a profile row.
///
/// Only sellers may manage products. The storefront enforces this for
/// navigation only; the backend's row-level rules are the real boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Read-only marketplace access.
    #[default]
    Buyer,
    /// May create, edit and delete their own products.
    Seller,
}

impl Role {
    /// Wire name, as stored in the `profiles.role` column.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Buyer => "buyer",
            Self::Seller => "seller",
        }
    }

    /// Whether this role may use the seller dashboard.
    #[must_use]
    pub const fn can_sell(self) -> bool {
        matches!(self, Self::Seller)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = RoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "buyer" => Ok(Self::Buyer),
            "seller" => Ok(Self::Seller),
            other => Err(RoleError(other.to_owned())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_buyer() {
        assert_eq!(Role::default(), Role::Buyer);
        assert!(!Role::Buyer.can_sell());
        assert!(Role::Seller.can_sell());
    }

    #[test]
    fn test_wire_format() {
        assert_eq!(serde_json::to_string(&Role::Seller).unwrap(), "\"seller\"");
        let role: Role = serde_json::from_str("\"buyer\"").unwrap();
        assert_eq!(role, Role::Buyer);
    }

    #[test]
    fn test_from_str() {
        assert_eq!("seller".parse::<Role>().unwrap(), Role::Seller);
        assert_eq!(
            "admin".parse::<Role>().unwrap_err(),
            RoleError("admin".to_string())
        );
    }
}
