//! File-backed invoice rendering.
//!
//! Invoices are rendered once per order into `INVOICE_DIR/<order_id>.html`;
//! fetching an invoice regenerates the document if the file went missing.

use std::path::{Path, PathBuf};

use crate::domain::aggregates::Order;

pub struct Invoices {
    dir: PathBuf,
}

impl Invoices {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, order: &Order) -> PathBuf {
        self.dir.join(format!("{}.html", order.id))
    }

    pub async fn generate(&self, order: &Order) -> anyhow::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(order);
        tokio::fs::write(&path, render(order)).await?;
        tracing::debug!(order_id = %order.id, path = %path.display(), "invoice rendered");
        Ok(path)
    }

    /// Idempotent fetch: returns the existing document or regenerates it.
    pub async fn get_or_generate(&self, order: &Order) -> anyhow::Result<PathBuf> {
        let path = self.path_for(order);
        if Path::new(&path).exists() {
            return Ok(path);
        }
        self.generate(order).await
    }
}

fn render(order: &Order) -> String {
    let mut rows = String::new();
    for item in &order.items {
        rows.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{} {}</td></tr>\n",
            item.name, item.quantity, item.unit_price, order.currency
        ));
    }
    format!(
        "<html><body>\n\
         <h1>Invoice for order {}</h1>\n\
         <p>Ordered at: {}</p>\n\
         <p>Ship to: {}</p>\n\
         <table>\n\
         <tr><th>Item</th><th>Qty</th><th>Unit price</th></tr>\n\
         {rows}\
         </table>\n\
         <p>Total: {} {}</p>\n\
         </body></html>\n",
        order.id,
        order.ordered_at.format("%Y-%m-%d"),
        order.shipping.address,
        order.total,
        order.currency,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{Cart, Product, ShippingDetails};
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn order() -> Order {
        let p = Product::new("Widget", Decimal::new(1000, 2), "USD", 5);
        let user = Uuid::now_v7();
        let mut cart = Cart::for_user(user, "USD");
        cart.add_item(&p, 2).unwrap();
        Order::from_cart(
            &cart,
            user,
            ShippingDetails {
                address: "1 Main St".into(),
                phone: "555-0100".into(),
                email: "buyer@example.com".into(),
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn get_regenerates_missing_invoice() {
        let dir = tempfile::tempdir().unwrap();
        let invoices = Invoices::new(dir.path());
        let order = order();

        let path = invoices.generate(&order).await.unwrap();
        assert!(path.exists());

        tokio::fs::remove_file(&path).await.unwrap();
        let regenerated = invoices.get_or_generate(&order).await.unwrap();
        assert!(regenerated.exists());
        assert_eq!(path, regenerated);
    }

    #[tokio::test]
    async fn rendered_invoice_lists_items_and_total() {
        let dir = tempfile::tempdir().unwrap();
        let invoices = Invoices::new(dir.path());
        let order = order();
        let path = invoices.generate(&order).await.unwrap();
        let html = tokio::fs::read_to_string(path).await.unwrap();
        assert!(html.contains("Widget"));
        assert!(html.contains("Total: 20.00 USD"));
    }
}
