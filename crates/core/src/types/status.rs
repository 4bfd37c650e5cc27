//! Status enums for orders and accounts.
//!
//! [`OrderStatus`] is a one-directional state machine:
//!
//! ```text
//!            +--> Paid
//!  Pending --+
//!            +--> Failed
//! ```
//!
//! Orders placed without a payment gateway are created directly as `Paid`.
//! `Paid` and `Failed` are terminal.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle status of an order.
///
/// Serialized as `"Pending"`, `"Paid"`, `"Failed"` for API compatibility;
/// stored as the lowercase `order_status` enum in Postgres.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "order_status", rename_all = "lowercase")
)]
pub enum OrderStatus {
    #[default]
    Pending,
    Paid,
    Failed,
}

/// Attempted a transition that is not an edge of the order state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal order status transition: {from} -> {to}")]
pub struct InvalidTransition {
    pub from: OrderStatus,
    pub to: OrderStatus,
}

impl OrderStatus {
    /// Whether no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Paid | Self::Failed)
    }

    /// Whether `self -> to` is a legal edge.
    #[must_use]
    pub const fn can_transition_to(self, to: Self) -> bool {
        matches!((self, to), (Self::Pending, Self::Paid | Self::Failed))
    }

    /// Apply a transition.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTransition`] for anything other than
    /// `Pending -> Paid` or `Pending -> Failed`.
    pub const fn transition_to(self, to: Self) -> Result<Self, InvalidTransition> {
        if self.can_transition_to(to) {
            Ok(to)
        } else {
            Err(InvalidTransition { from: self, to })
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Paid => "Paid",
            Self::Failed => "Failed",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Account role supplied by the identity layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "user_role", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    User,
    Admin,
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            _ => Err(format!("invalid user role: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const ALL: [OrderStatus; 3] = [OrderStatus::Pending, OrderStatus::Paid, OrderStatus::Failed];

    #[test]
    fn test_legal_edges() {
        assert_eq!(
            OrderStatus::Pending.transition_to(OrderStatus::Paid),
            Ok(OrderStatus::Paid)
        );
        assert_eq!(
            OrderStatus::Pending.transition_to(OrderStatus::Failed),
            Ok(OrderStatus::Failed)
        );
    }

    #[test]
    fn test_terminal_states_are_sticky() {
        for from in [OrderStatus::Paid, OrderStatus::Failed] {
            assert!(from.is_terminal());
            for to in ALL {
                assert_eq!(
                    from.transition_to(to),
                    Err(InvalidTransition { from, to }),
                    "{from} -> {to} must be rejected"
                );
            }
        }
    }

    #[test]
    fn test_no_transition_back_to_pending() {
        for from in ALL {
            assert!(!from.can_transition_to(OrderStatus::Pending));
        }
    }

    #[test]
    fn test_status_serde_matches_api() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::Paid).unwrap(),
            "\"Paid\""
        );
        let parsed: OrderStatus = serde_json::from_str("\"Failed\"").unwrap();
        assert_eq!(parsed, OrderStatus::Failed);
    }

    #[test]
    fn test_role_roundtrip() {
        assert_eq!("admin".parse::<UserRole>().unwrap(), UserRole::Admin);
        assert_eq!(UserRole::User.to_string(), "user");
        assert!("root".parse::<UserRole>().is_err());
    }
}
