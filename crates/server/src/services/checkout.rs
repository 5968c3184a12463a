//! Checkout orchestration.
//!
//! Validates the request here, then hands the stock check and every write
//! to [`MarketplaceStore::place_order`], which runs them as one unit of work.

use serde::Deserialize;

use printhub_core::{BuyerId, CartItemId};

use crate::db::MarketplaceStore;
use crate::models::{CheckoutError, CheckoutRequest, DeliveryDetails, PlacedOrder};

/// Checkout form posted by the buyer.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutForm {
    pub cart_item_ids: Vec<CartItemId>,
    pub delivery: DeliveryDetails,
}

/// Turn a checkout form into a validated request.
///
/// # Errors
///
/// Returns `CheckoutError::InvalidDelivery` listing every blank delivery
/// field, or `EmptySelection` when no cart line is selected.
pub fn build_request(buyer_id: BuyerId, form: &CheckoutForm) -> Result<CheckoutRequest, CheckoutError> {
    let missing = form.delivery.missing_fields();
    if !missing.is_empty() {
        return Err(CheckoutError::InvalidDelivery(
            missing
                .into_iter()
                .map(|field| format!("{field} is required"))
                .collect(),
        ));
    }

    let mut cart_item_ids = Vec::with_capacity(form.cart_item_ids.len());
    for id in &form.cart_item_ids {
        if !cart_item_ids.contains(id) {
            cart_item_ids.push(*id);
        }
    }
    if cart_item_ids.is_empty() {
        return Err(CheckoutError::EmptySelection);
    }

    Ok(CheckoutRequest {
        buyer_id,
        cart_item_ids,
        delivery: form.delivery.trimmed(),
    })
}

/// Checkout service.
pub struct CheckoutService<'a> {
    store: &'a dyn MarketplaceStore,
}

impl<'a> CheckoutService<'a> {
    /// Create a new checkout service.
    #[must_use]
    pub const fn new(store: &'a dyn MarketplaceStore) -> Self {
        Self { store }
    }

    /// Place an order for the selected cart lines.
    ///
    /// # Errors
    ///
    /// Returns the `CheckoutError` of [`build_request`] or of the store.
    #[tracing::instrument(skip(self, form), fields(buyer_id = %buyer_id))]
    pub async fn checkout(
        &self,
        buyer_id: BuyerId,
        form: &CheckoutForm,
    ) -> Result<PlacedOrder, CheckoutError> {
        let request = build_request(buyer_id, form)?;

        match self.store.place_order(&request).await {
            Ok(placed) => {
                tracing::info!(
                    order_id = %placed.order.id,
                    items = placed.order.items.len(),
                    sellers = placed.seller_orders.len(),
                    total = %placed.order.total_price,
                    "Order placed"
                );
                Ok(placed)
            }
            Err(CheckoutError::OutOfStock(violations)) => {
                tracing::warn!(violations = violations.len(), "Checkout rejected: stock");
                Err(CheckoutError::OutOfStock(violations))
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use printhub_core::PaymentMethod;

    use super::*;

    fn form(ids: &[i32]) -> CheckoutForm {
        CheckoutForm {
            cart_item_ids: ids.iter().copied().map(CartItemId::new).collect(),
            delivery: DeliveryDetails {
                name: " Hamza ".to_owned(),
                phone: "0321".to_owned(),
                city: "Multan".to_owned(),
                postal_code: "60000".to_owned(),
                address: "Cantt".to_owned(),
                payment_method: PaymentMethod::CashOnDelivery,
            },
        }
    }

    #[test]
    fn test_build_request_dedupes_and_trims() {
        let request = build_request(BuyerId::new(1), &form(&[3, 1, 3])).unwrap();
        assert_eq!(
            request.cart_item_ids,
            vec![CartItemId::new(3), CartItemId::new(1)]
        );
        assert_eq!(request.delivery.name, "Hamza");
    }

    #[test]
    fn test_build_request_reports_all_blank_fields() {
        let mut blank = form(&[1]);
        blank.delivery.city = String::new();
        blank.delivery.address = " ".to_owned();

        let Err(CheckoutError::InvalidDelivery(details)) = build_request(BuyerId::new(1), &blank)
        else {
            panic!("expected invalid delivery");
        };
        assert_eq!(details, vec!["city is required", "address is required"]);
    }

    #[test]
    fn test_build_request_requires_selection() {
        assert!(matches!(
            build_request(BuyerId::new(1), &form(&[])),
            Err(CheckoutError::EmptySelection)
        ));
    }
}
