//! Status and role enums.
//!
//! [`OrderStatus`] is the fulfilment state of a single order item. It is an
//! explicit state machine: sellers move items forward, any non-terminal item
//! may be cancelled, and `Delivered` / `Cancelled` are final.

use serde::{Deserialize, Serialize};

/// Fulfilment status of an order item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "printhub.order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    OutForDelivery,
    Delivered,
    Cancelled,
}

/// Rejected status change.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTransitionError {
    /// The item is already in the requested status.
    #[error("order item is already {0}")]
    Unchanged(OrderStatus),
    /// The item is delivered or cancelled and cannot change.
    #[error("order item is {0} and can no longer change")]
    Terminal(OrderStatus),
    /// The move would go backwards in the fulfilment sequence.
    #[error("cannot move order item from {from} back to {to}")]
    Backwards {
        /// Current status.
        from: OrderStatus,
        /// Requested status.
        to: OrderStatus,
    },
}

impl OrderStatus {
    /// All statuses in fulfilment order.
    pub const ALL: [Self; 5] = [
        Self::Pending,
        Self::Processing,
        Self::OutForDelivery,
        Self::Delivered,
        Self::Cancelled,
    ];

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Processing => "Processing",
            Self::OutForDelivery => "Out for Delivery",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Badge colour shown next to the status.
    #[must_use]
    pub const fn color(self) -> &'static str {
        match self {
            Self::Pending => "gray",
            Self::Processing => "orange",
            Self::OutForDelivery => "yellow",
            Self::Delivered => "green",
            Self::Cancelled => "red",
        }
    }

    /// Whether no further transitions are allowed.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Position in the forward fulfilment sequence; `None` for `Cancelled`.
    const fn step(self) -> Option<u8> {
        match self {
            Self::Pending => Some(0),
            Self::Processing => Some(1),
            Self::OutForDelivery => Some(2),
            Self::Delivered => Some(3),
            Self::Cancelled => None,
        }
    }

    /// Validate a move from `self` to `next`.
    ///
    /// # Errors
    ///
    /// Returns `StatusTransitionError` when `next` equals the current status,
    /// the current status is terminal, or `next` is behind the current step.
    pub fn transition_to(self, next: Self) -> Result<Self, StatusTransitionError> {
        if self == next {
            return Err(StatusTransitionError::Unchanged(self));
        }
        if self.is_terminal() {
            return Err(StatusTransitionError::Terminal(self));
        }
        match (self.step(), next.step()) {
            (Some(from), Some(to)) if to < from => Err(StatusTransitionError::Backwards {
                from: self,
                to: next,
            }),
            _ => Ok(next),
        }
    }

    /// Whether a move from `self` to `next` is allowed.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.transition_to(next).is_ok()
    }

    /// Combined status of an order from its item statuses.
    ///
    /// Uniform items report their shared status. Otherwise the least-advanced
    /// status among non-cancelled items wins. An empty slice is `Pending`.
    #[must_use]
    pub fn aggregate(statuses: &[Self]) -> Self {
        let Some(first) = statuses.first().copied() else {
            return Self::Pending;
        };
        if statuses.iter().all(|s| *s == first) {
            return first;
        }
        statuses
            .iter()
            .copied()
            .filter(|s| *s != Self::Cancelled)
            .min()
            .unwrap_or(Self::Cancelled)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Which side of the marketplace an account belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "printhub.account_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum AccountRole {
    /// Customer purchasing printed goods.
    Buyer,
    /// Printing press listing products and fulfilling orders.
    Seller,
}

impl std::fmt::Display for AccountRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buyer => write!(f, "buyer"),
            Self::Seller => write!(f, "seller"),
        }
    }
}

impl std::str::FromStr for AccountRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buyer" => Ok(Self::Buyer),
            "seller" => Ok(Self::Seller),
            _ => Err(format!("invalid account role: {s}")),
        }
    }
}

/// How an order is paid for. Only cash on delivery is offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "printhub.payment_method", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    #[serde(alias = "COD", alias = "cod")]
    CashOnDelivery,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_moves_allowed() {
        use OrderStatus::*;
        assert!(Pending.can_transition_to(Processing));
        assert!(Processing.can_transition_to(OutForDelivery));
        assert!(OutForDelivery.can_transition_to(Delivered));
        // Sellers may skip ahead.
        assert!(Pending.can_transition_to(Delivered));
    }

    #[test]
    fn test_cancel_from_any_open_status() {
        use OrderStatus::*;
        for from in [Pending, Processing, OutForDelivery] {
            assert_eq!(from.transition_to(Cancelled), Ok(Cancelled));
        }
    }

    #[test]
    fn test_terminal_states_are_frozen() {
        use OrderStatus::*;
        for next in OrderStatus::ALL {
            if next != Delivered {
                assert_eq!(
                    Delivered.transition_to(next),
                    Err(StatusTransitionError::Terminal(Delivered))
                );
            }
            if next != Cancelled {
                assert_eq!(
                    Cancelled.transition_to(next),
                    Err(StatusTransitionError::Terminal(Cancelled))
                );
            }
        }
    }

    #[test]
    fn test_backwards_rejected() {
        use OrderStatus::*;
        assert_eq!(
            OutForDelivery.transition_to(Processing),
            Err(StatusTransitionError::Backwards {
                from: OutForDelivery,
                to: Processing
            })
        );
        assert!(!Processing.can_transition_to(Pending));
    }

    #[test]
    fn test_same_status_rejected() {
        assert_eq!(
            OrderStatus::Processing.transition_to(OrderStatus::Processing),
            Err(StatusTransitionError::Unchanged(OrderStatus::Processing))
        );
    }

    #[test]
    fn test_aggregate() {
        use OrderStatus::*;
        assert_eq!(OrderStatus::aggregate(&[]), Pending);
        assert_eq!(OrderStatus::aggregate(&[Delivered, Delivered]), Delivered);
        assert_eq!(OrderStatus::aggregate(&[Delivered, Processing]), Processing);
        assert_eq!(OrderStatus::aggregate(&[Cancelled, Delivered]), Delivered);
        assert_eq!(OrderStatus::aggregate(&[Cancelled, Cancelled]), Cancelled);
    }

    #[test]
    fn test_serde_snake_case() {
        let json = serde_json::to_string(&OrderStatus::OutForDelivery).unwrap();
        assert_eq!(json, "\"out_for_delivery\"");
        let parsed: PaymentMethod = serde_json::from_str("\"COD\"").unwrap();
        assert_eq!(parsed, PaymentMethod::CashOnDelivery);
    }

    #[test]
    fn test_labels_and_colors() {
        assert_eq!(OrderStatus::OutForDelivery.label(), "Out for Delivery");
        assert_eq!(OrderStatus::Cancelled.color(), "red");
        assert_eq!(OrderStatus::Pending.color(), "gray");
    }

    #[test]
    fn test_role_round_trip() {
        assert_eq!("seller".parse::<AccountRole>().unwrap(), AccountRole::Seller);
        assert_eq!(AccountRole::Buyer.to_string(), "buyer");
        assert!("admin".parse::<AccountRole>().is_err());
    }
}
