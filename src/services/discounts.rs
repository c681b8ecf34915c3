//! Discount workflows: activate a percentage discount on a product,
//! deactivate it, and notify wishlist owners of the price drop.

use std::sync::Arc;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::aggregates::{Discount, Product};
use crate::domain::events::DomainEvent;
use crate::error::Result;
use crate::services::notifications::{EventBus, Mailer};
use crate::store::Store;

pub struct DiscountService {
    store: Arc<dyn Store>,
    mailer: Arc<dyn Mailer>,
    events: EventBus,
}

impl DiscountService {
    pub fn new(store: Arc<dyn Store>, mailer: Arc<dyn Mailer>, events: EventBus) -> Self {
        Self { store, mailer, events }
    }

    /// Activates a discount on a product, replacing any currently active
    /// one. The discounted price is always computed from the undiscounted
    /// base price, which the product keeps for later restoration.
    pub async fn create(&self, product_id: Uuid, rate: Decimal) -> Result<Discount> {
        let mut product = self.store.product(product_id).await?;
        let discount = Discount::new(product_id, rate)?;

        let base = product.original_price.unwrap_or(product.price);
        product.original_price = Some(base);
        product.discount_rate = Some(rate);
        product.on_sale = true;
        product.price = discount.apply_to(base);
        // Retiring the prior discount, repricing, and inserting the new row
        // share one store operation.
        self.store.activate_discount(&discount, &product).await?;

        tracing::info!(%product_id, %rate, discount_id = %discount.id, "discount activated");
        self.events.publish(DomainEvent::DiscountActivated {
            discount_id: discount.id,
            product_id,
            rate,
        });
        self.notify_wishlist_owners(product, rate);
        Ok(discount)
    }

    /// Price-drop emails for everyone wishing for this product.
    fn notify_wishlist_owners(&self, product: Product, rate: Decimal) {
        let store = Arc::clone(&self.store);
        let mailer = Arc::clone(&self.mailer);
        tokio::spawn(async move {
            let owners = match store.wishlist_owners_for_product(product.id).await {
                Ok(owners) => owners,
                Err(e) => {
                    tracing::warn!(product_id = %product.id, error = %e, "wishlist lookup failed");
                    return;
                }
            };
            for user_id in owners {
                if let Err(e) = mailer.send_price_drop(user_id, &product, rate).await {
                    tracing::warn!(%user_id, error = %e, "price drop email failed");
                }
            }
        });
    }

    /// Deactivates a discount and restores the product's pre-discount
    /// price.
    pub async fn deactivate(&self, discount_id: Uuid) -> Result<()> {
        let discount = self.store.discount(discount_id).await?;
        let mut product = self.store.product(discount.product_id).await?;
        if let Some(original) = product.original_price.take() {
            product.price = original;
        }
        product.discount_rate = None;
        product.on_sale = false;
        // Conditional on the discount still being active, with the price
        // restoration in the same store operation.
        self.store.deactivate_discount(discount_id, &product).await?;

        tracing::info!(%discount_id, product_id = %product.id, "discount deactivated");
        self.events.publish(DomainEvent::DiscountDeactivated {
            discount_id,
            product_id: product.id,
        });
        Ok(())
    }

    pub async fn list(&self, active_only: bool) -> Result<Vec<Discount>> {
        self.store.list_discounts(active_only).await
    }
}
