//! Postgres-backed store.
//!
//! Checkout, cancellation, and refund resolution each run inside one
//! transaction. Stock decrements use a conditional update
//! (`inventory = inventory - n WHERE inventory >= n`) so the sufficiency
//! check and the mutation are a single statement; the `inventory >= 0`
//! constraint in the schema backs this up.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::aggregates::{
    Cart, CartItem, Discount, Order, OrderItem, OrderStatus, Product, RefundStatus, Review,
    ShippingDetails, Wishlist,
};
use crate::error::{Error, Result};
use crate::store::Store;

use async_trait::async_trait;

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_cart(&self, row: CartRow) -> Result<Cart> {
        let items = sqlx::query_as::<_, CartItemRow>(
            "SELECT id, product_id, name, quantity, unit_price FROM cart_items WHERE cart_id = $1",
        )
        .bind(row.id)
        .fetch_all(&self.pool)
        .await?;
        Ok(row.into_cart(items))
    }

    async fn load_order(&self, row: OrderRow) -> Result<Order> {
        let items = sqlx::query_as::<_, OrderItemRow>(
            "SELECT id, order_id, product_id, name, quantity, unit_price, refund_status \
             FROM order_items WHERE order_id = $1",
        )
        .bind(row.id)
        .fetch_all(&self.pool)
        .await?;
        row.into_order(items)
    }
}

#[derive(sqlx::FromRow)]
struct CartRow {
    id: Uuid,
    user_id: Option<Uuid>,
    guest_token: Option<String>,
    total: Decimal,
    currency: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CartRow {
    fn into_cart(self, items: Vec<CartItemRow>) -> Cart {
        Cart {
            id: self.id,
            user_id: self.user_id,
            guest_token: self.guest_token,
            items: items.into_iter().map(CartItemRow::into_item).collect(),
            total: self.total,
            currency: self.currency,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CartItemRow {
    id: Uuid,
    product_id: Uuid,
    name: String,
    quantity: i32,
    unit_price: Decimal,
}

impl CartItemRow {
    fn into_item(self) -> CartItem {
        CartItem {
            id: self.id,
            product_id: self.product_id,
            name: self.name,
            quantity: self.quantity.max(0) as u32,
            unit_price: self.unit_price,
        }
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    user_id: Uuid,
    status: String,
    ordered_at: DateTime<Utc>,
    total: Decimal,
    currency: String,
    shipping_address: String,
    shipping_phone: String,
    shipping_email: String,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItemRow>) -> Result<Order> {
        let items = items
            .into_iter()
            .map(OrderItemRow::into_item)
            .collect::<Result<Vec<_>>>()?;
        Ok(Order {
            id: self.id,
            user_id: self.user_id,
            status: OrderStatus::parse(&self.status)?,
            ordered_at: self.ordered_at,
            total: self.total,
            currency: self.currency,
            shipping: ShippingDetails {
                address: self.shipping_address,
                phone: self.shipping_phone,
                email: self.shipping_email,
            },
            items,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    id: Uuid,
    order_id: Uuid,
    product_id: Uuid,
    name: String,
    quantity: i32,
    unit_price: Decimal,
    refund_status: String,
}

impl OrderItemRow {
    fn into_item(self) -> Result<OrderItem> {
        Ok(OrderItem {
            id: self.id,
            order_id: self.order_id,
            product_id: self.product_id,
            name: self.name,
            quantity: self.quantity.max(0) as u32,
            unit_price: self.unit_price,
            refund_status: RefundStatus::parse(&self.refund_status)?,
        })
    }
}

const CART_COLS: &str = "id, user_id, guest_token, total, currency, created_at, updated_at";
const ORDER_COLS: &str = "id, user_id, status, ordered_at, total, currency, \
                          shipping_address, shipping_phone, shipping_email";

#[async_trait]
impl Store for PgStore {
    async fn insert_product(&self, product: &Product) -> Result<()> {
        sqlx::query(
            "INSERT INTO products (id, name, brand, description, price, currency, inventory, \
             original_price, discount_rate, on_sale, average_rating, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(&product.brand)
        .bind(&product.description)
        .bind(product.price)
        .bind(&product.currency)
        .bind(product.inventory)
        .bind(product.original_price)
        .bind(product.discount_rate)
        .bind(product.on_sale)
        .bind(product.average_rating)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_product(&self, product: &Product) -> Result<()> {
        let res = sqlx::query(
            "UPDATE products SET name = $2, brand = $3, description = $4, price = $5, \
             original_price = $6, discount_rate = $7, on_sale = $8, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(&product.brand)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.original_price)
        .bind(product.discount_rate)
        .bind(product.on_sale)
        .execute(&self.pool)
        .await?;
        if res.rows_affected() == 0 {
            return Err(Error::NotFound("product"));
        }
        Ok(())
    }

    async fn product(&self, id: Uuid) -> Result<Product> {
        sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(Error::NotFound("product"))
    }

    async fn list_products(&self, limit: i64, offset: i64) -> Result<Vec<Product>> {
        Ok(sqlx::query_as::<_, Product>(
            "SELECT * FROM products ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn increment_stock(&self, product_id: Uuid, quantity: u32) -> Result<()> {
        let res = sqlx::query(
            "UPDATE products SET inventory = inventory + $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(product_id)
        .bind(quantity as i32)
        .execute(&self.pool)
        .await?;
        if res.rows_affected() == 0 {
            return Err(Error::NotFound("product"));
        }
        Ok(())
    }

    async fn cart_for_user(&self, user_id: Uuid, currency: &str) -> Result<Cart> {
        let sql = format!("SELECT {CART_COLS} FROM carts WHERE user_id = $1");
        if let Some(row) = sqlx::query_as::<_, CartRow>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
        {
            return self.load_cart(row).await;
        }
        let cart = Cart::for_user(user_id, currency);
        sqlx::query(
            "INSERT INTO carts (id, user_id, total, currency, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6) ON CONFLICT (user_id) DO NOTHING",
        )
        .bind(cart.id)
        .bind(user_id)
        .bind(cart.total)
        .bind(&cart.currency)
        .bind(cart.created_at)
        .bind(cart.updated_at)
        .execute(&self.pool)
        .await?;
        // Re-read in case a concurrent request created the row first.
        let row = sqlx::query_as::<_, CartRow>(&sql)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        self.load_cart(row).await
    }

    async fn cart_for_guest(&self, token: &str, currency: &str) -> Result<Cart> {
        let sql = format!("SELECT {CART_COLS} FROM carts WHERE guest_token = $1");
        if let Some(row) = sqlx::query_as::<_, CartRow>(&sql)
            .bind(token)
            .fetch_optional(&self.pool)
            .await?
        {
            return self.load_cart(row).await;
        }
        let cart = Cart::for_guest(token, currency);
        sqlx::query(
            "INSERT INTO carts (id, guest_token, total, currency, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6) ON CONFLICT (guest_token) DO NOTHING",
        )
        .bind(cart.id)
        .bind(token)
        .bind(cart.total)
        .bind(&cart.currency)
        .bind(cart.created_at)
        .bind(cart.updated_at)
        .execute(&self.pool)
        .await?;
        let row = sqlx::query_as::<_, CartRow>(&sql)
            .bind(token)
            .fetch_one(&self.pool)
            .await?;
        self.load_cart(row).await
    }

    async fn find_guest_cart(&self, token: &str) -> Result<Option<Cart>> {
        let sql = format!("SELECT {CART_COLS} FROM carts WHERE guest_token = $1");
        match sqlx::query_as::<_, CartRow>(&sql)
            .bind(token)
            .fetch_optional(&self.pool)
            .await?
        {
            Some(row) => Ok(Some(self.load_cart(row).await?)),
            None => Ok(None),
        }
    }

    async fn save_cart(&self, cart: &Cart) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO carts (id, user_id, guest_token, total, currency, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (id) DO UPDATE SET total = $4, updated_at = $7",
        )
        .bind(cart.id)
        .bind(cart.user_id)
        .bind(&cart.guest_token)
        .bind(cart.total)
        .bind(&cart.currency)
        .bind(cart.created_at)
        .bind(cart.updated_at)
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
            .bind(cart.id)
            .execute(&mut *tx)
            .await?;
        for item in &cart.items {
            sqlx::query(
                "INSERT INTO cart_items (id, cart_id, product_id, name, quantity, unit_price) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(item.id)
            .bind(cart.id)
            .bind(item.product_id)
            .bind(&item.name)
            .bind(item.quantity as i32)
            .bind(item.unit_price)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn delete_cart(&self, cart_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM carts WHERE id = $1")
            .bind(cart_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn place_order(&self, order: &Order, cart_id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for item in &order.items {
            let res = sqlx::query(
                "UPDATE products SET inventory = inventory - $2, updated_at = NOW() \
                 WHERE id = $1 AND inventory >= $2",
            )
            .bind(item.product_id)
            .bind(item.quantity as i32)
            .execute(&mut *tx)
            .await?;
            if res.rows_affected() == 0 {
                // Missing row or short stock; dropping the transaction rolls
                // back every decrement applied so far.
                let found: Option<(String, i32)> =
                    sqlx::query_as("SELECT name, inventory FROM products WHERE id = $1")
                        .bind(item.product_id)
                        .fetch_optional(&mut *tx)
                        .await?;
                return Err(match found {
                    Some((name, inventory)) => Error::InsufficientStock {
                        name,
                        requested: item.quantity,
                        available: inventory.max(0) as u32,
                    },
                    None => Error::NotFound("product"),
                });
            }
        }

        sqlx::query(
            "INSERT INTO orders (id, user_id, status, ordered_at, total, currency, \
             shipping_address, shipping_phone, shipping_email) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(order.id)
        .bind(order.user_id)
        .bind(order.status.as_str())
        .bind(order.ordered_at)
        .bind(order.total)
        .bind(&order.currency)
        .bind(&order.shipping.address)
        .bind(&order.shipping.phone)
        .bind(&order.shipping.email)
        .execute(&mut *tx)
        .await?;

        for item in &order.items {
            sqlx::query(
                "INSERT INTO order_items (id, order_id, product_id, name, quantity, unit_price, \
                 refund_status) VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(item.id)
            .bind(order.id)
            .bind(item.product_id)
            .bind(&item.name)
            .bind(item.quantity as i32)
            .bind(item.unit_price)
            .bind(item.refund_status.as_str())
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
            .bind(cart_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE carts SET total = 0, updated_at = NOW() WHERE id = $1")
            .bind(cart_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn order(&self, id: Uuid) -> Result<Order> {
        let sql = format!("SELECT {ORDER_COLS} FROM orders WHERE id = $1");
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(Error::NotFound("order"))?;
        self.load_order(row).await
    }

    async fn orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>> {
        let sql =
            format!("SELECT {ORDER_COLS} FROM orders WHERE user_id = $1 ORDER BY ordered_at DESC");
        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            orders.push(self.load_order(row).await?);
        }
        Ok(orders)
    }

    async fn all_orders(&self) -> Result<Vec<Order>> {
        let sql = format!("SELECT {ORDER_COLS} FROM orders ORDER BY ordered_at DESC");
        let rows = sqlx::query_as::<_, OrderRow>(&sql).fetch_all(&self.pool).await?;
        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            orders.push(self.load_order(row).await?);
        }
        Ok(orders)
    }

    async fn update_order_status(
        &self,
        order_id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
        restock: &[(Uuid, u32)],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        // The status write carries its own precondition; zero rows means a
        // concurrent request won the swap and no restock may happen.
        let res = sqlx::query("UPDATE orders SET status = $3 WHERE id = $1 AND status = $2")
            .bind(order_id)
            .bind(from.as_str())
            .bind(to.as_str())
            .execute(&mut *tx)
            .await?;
        if res.rows_affected() == 0 {
            let current: Option<(String,)> =
                sqlx::query_as("SELECT status FROM orders WHERE id = $1")
                    .bind(order_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            return Err(match current {
                Some((status,)) => Error::InvalidState(format!(
                    "order is {status}, expected {}",
                    from.as_str()
                )),
                None => Error::NotFound("order"),
            });
        }
        for (product_id, quantity) in restock {
            sqlx::query(
                "UPDATE products SET inventory = inventory + $2, updated_at = NOW() WHERE id = $1",
            )
            .bind(product_id)
            .bind(*quantity as i32)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn update_refund_status(
        &self,
        order_id: Uuid,
        item_id: Uuid,
        from: RefundStatus,
        to: RefundStatus,
        restock: Option<(Uuid, u32)>,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let res = sqlx::query(
            "UPDATE order_items SET refund_status = $4 \
             WHERE id = $2 AND order_id = $1 AND refund_status = $3",
        )
        .bind(order_id)
        .bind(item_id)
        .bind(from.as_str())
        .bind(to.as_str())
        .execute(&mut *tx)
        .await?;
        if res.rows_affected() == 0 {
            let current: Option<(String,)> = sqlx::query_as(
                "SELECT refund_status FROM order_items WHERE id = $2 AND order_id = $1",
            )
            .bind(order_id)
            .bind(item_id)
            .fetch_optional(&mut *tx)
            .await?;
            return Err(match current {
                Some((status,)) => Error::InvalidState(format!(
                    "refund is {status}, expected {}",
                    from.as_str()
                )),
                None => Error::NotFound("order item"),
            });
        }
        if let Some((product_id, quantity)) = restock {
            let res = sqlx::query(
                "UPDATE products SET inventory = inventory + $2, updated_at = NOW() WHERE id = $1",
            )
            .bind(product_id)
            .bind(quantity as i32)
            .execute(&mut *tx)
            .await?;
            if res.rows_affected() == 0 {
                return Err(Error::NotFound("product"));
            }
        }
        tx.commit().await?;
        Ok(())
    }

    async fn has_delivered_order_with_product(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> Result<bool> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM orders o \
             JOIN order_items i ON i.order_id = o.id \
             WHERE o.user_id = $1 AND i.product_id = $2 AND o.status = 'DELIVERED')",
        )
        .bind(user_id)
        .bind(product_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn activate_discount(&self, discount: &Discount, product: &Product) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE discounts SET active = FALSE WHERE product_id = $1 AND active")
            .bind(product.id)
            .execute(&mut *tx)
            .await?;
        let res = sqlx::query(
            "UPDATE products SET price = $2, original_price = $3, discount_rate = $4, \
             on_sale = $5, updated_at = NOW() WHERE id = $1",
        )
        .bind(product.id)
        .bind(product.price)
        .bind(product.original_price)
        .bind(product.discount_rate)
        .bind(product.on_sale)
        .execute(&mut *tx)
        .await?;
        if res.rows_affected() == 0 {
            return Err(Error::NotFound("product"));
        }
        sqlx::query(
            "INSERT INTO discounts (id, product_id, rate, starts_at, ends_at, active, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(discount.id)
        .bind(discount.product_id)
        .bind(discount.rate)
        .bind(discount.starts_at)
        .bind(discount.ends_at)
        .bind(discount.active)
        .bind(discount.created_at)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn deactivate_discount(&self, discount_id: Uuid, product: &Product) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let res = sqlx::query("UPDATE discounts SET active = FALSE WHERE id = $1 AND active")
            .bind(discount_id)
            .execute(&mut *tx)
            .await?;
        if res.rows_affected() == 0 {
            let found: Option<(bool,)> =
                sqlx::query_as("SELECT active FROM discounts WHERE id = $1")
                    .bind(discount_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            return Err(match found {
                Some(_) => Error::InvalidState("discount is not active".into()),
                None => Error::NotFound("discount"),
            });
        }
        let res = sqlx::query(
            "UPDATE products SET price = $2, original_price = $3, discount_rate = $4, \
             on_sale = $5, updated_at = NOW() WHERE id = $1",
        )
        .bind(product.id)
        .bind(product.price)
        .bind(product.original_price)
        .bind(product.discount_rate)
        .bind(product.on_sale)
        .execute(&mut *tx)
        .await?;
        if res.rows_affected() == 0 {
            return Err(Error::NotFound("product"));
        }
        tx.commit().await?;
        Ok(())
    }

    async fn discount(&self, id: Uuid) -> Result<Discount> {
        sqlx::query_as::<_, Discount>("SELECT * FROM discounts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(Error::NotFound("discount"))
    }

    async fn active_discount_for_product(&self, product_id: Uuid) -> Result<Option<Discount>> {
        Ok(sqlx::query_as::<_, Discount>(
            "SELECT * FROM discounts WHERE product_id = $1 AND active",
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn list_discounts(&self, active_only: bool) -> Result<Vec<Discount>> {
        let sql = if active_only {
            "SELECT * FROM discounts WHERE active ORDER BY created_at DESC"
        } else {
            "SELECT * FROM discounts ORDER BY created_at DESC"
        };
        Ok(sqlx::query_as::<_, Discount>(sql).fetch_all(&self.pool).await?)
    }

    async fn insert_review(&self, review: &Review) -> Result<()> {
        sqlx::query(
            "INSERT INTO reviews (id, product_id, user_id, content, rating, approved, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(review.id)
        .bind(review.product_id)
        .bind(review.user_id)
        .bind(&review.content)
        .bind(review.rating)
        .bind(review.approved)
        .bind(review.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn review(&self, id: Uuid) -> Result<Review> {
        sqlx::query_as::<_, Review>("SELECT * FROM reviews WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(Error::NotFound("review"))
    }

    async fn set_review_approved(&self, id: Uuid) -> Result<()> {
        let res = sqlx::query("UPDATE reviews SET approved = TRUE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if res.rows_affected() == 0 {
            return Err(Error::NotFound("review"));
        }
        Ok(())
    }

    async fn delete_review(&self, id: Uuid) -> Result<()> {
        let res = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if res.rows_affected() == 0 {
            return Err(Error::NotFound("review"));
        }
        Ok(())
    }

    async fn reviews_for_product(
        &self,
        product_id: Uuid,
        approved_only: bool,
    ) -> Result<Vec<Review>> {
        let sql = if approved_only {
            "SELECT * FROM reviews WHERE product_id = $1 AND approved ORDER BY created_at DESC"
        } else {
            "SELECT * FROM reviews WHERE product_id = $1 ORDER BY created_at DESC"
        };
        Ok(sqlx::query_as::<_, Review>(sql)
            .bind(product_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn set_product_rating(&self, product_id: Uuid, rating: f64) -> Result<()> {
        let res = sqlx::query(
            "UPDATE products SET average_rating = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(product_id)
        .bind(rating)
        .execute(&self.pool)
        .await?;
        if res.rows_affected() == 0 {
            return Err(Error::NotFound("product"));
        }
        Ok(())
    }

    async fn wishlist_for_user(&self, user_id: Uuid) -> Result<Wishlist> {
        let fresh = Wishlist::for_user(user_id);
        sqlx::query(
            "INSERT INTO wishlists (id, user_id, created_at) VALUES ($1, $2, $3) \
             ON CONFLICT (user_id) DO NOTHING",
        )
        .bind(fresh.id)
        .bind(user_id)
        .bind(fresh.created_at)
        .execute(&self.pool)
        .await?;
        let (id, created_at): (Uuid, DateTime<Utc>) =
            sqlx::query_as("SELECT id, created_at FROM wishlists WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;
        let product_ids: Vec<(Uuid,)> =
            sqlx::query_as("SELECT product_id FROM wishlist_items WHERE wishlist_id = $1")
                .bind(id)
                .fetch_all(&self.pool)
                .await?;
        Ok(Wishlist {
            id,
            user_id,
            product_ids: product_ids.into_iter().map(|(p,)| p).collect(),
            created_at,
        })
    }

    async fn save_wishlist(&self, wishlist: &Wishlist) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM wishlist_items WHERE wishlist_id = $1")
            .bind(wishlist.id)
            .execute(&mut *tx)
            .await?;
        for product_id in &wishlist.product_ids {
            sqlx::query("INSERT INTO wishlist_items (wishlist_id, product_id) VALUES ($1, $2)")
                .bind(wishlist.id)
                .bind(product_id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn wishlist_owners_for_product(&self, product_id: Uuid) -> Result<Vec<Uuid>> {
        let rows: Vec<(Uuid,)> = sqlx::query_as(
            "SELECT w.user_id FROM wishlists w \
             JOIN wishlist_items wi ON wi.wishlist_id = w.id \
             WHERE wi.product_id = $1",
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(u,)| u).collect())
    }
}
