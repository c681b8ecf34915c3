//! REST surface: thin axum adapters over the services.
//!
//! Identity is supplied by the upstream auth layer as an `x-user-id`
//! header; guest carts are addressed by an opaque token in the path.

use std::sync::Arc;

use axum::extract::{FromRequestParts, Path, Query, State};
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;
use validator::Validate;

use crate::domain::aggregates::{OrderStatus, Product, ShippingDetails};
use crate::error::Error;
use crate::services::{
    CartOwner, CartService, DiscountService, EventBus, Invoices, Mailer, OrderService,
    ReviewService, WishlistService,
};
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub carts: Arc<CartService>,
    pub orders: Arc<OrderService>,
    pub discounts: Arc<DiscountService>,
    pub reviews: Arc<ReviewService>,
    pub wishlists: Arc<WishlistService>,
    pub currency: String,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        mailer: Arc<dyn Mailer>,
        invoices: Arc<Invoices>,
        events: EventBus,
        currency: &str,
    ) -> Self {
        Self {
            carts: Arc::new(CartService::new(Arc::clone(&store), currency)),
            orders: Arc::new(OrderService::new(
                Arc::clone(&store),
                Arc::clone(&mailer),
                invoices,
                events.clone(),
                currency,
            )),
            discounts: Arc::new(DiscountService::new(
                Arc::clone(&store),
                mailer,
                events,
            )),
            reviews: Arc::new(ReviewService::new(Arc::clone(&store))),
            wishlists: Arc::new(WishlistService::new(Arc::clone(&store))),
            store,
            currency: currency.to_string(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        // Catalog
        .route("/api/v1/products", get(list_products).post(create_product))
        .route("/api/v1/products/:id", get(get_product).put(update_product))
        .route("/api/v1/products/:id/restock", post(restock_product))
        // Reviews
        .route(
            "/api/v1/products/:id/reviews",
            get(list_reviews).post(add_comment),
        )
        .route("/api/v1/products/:id/rating", post(add_rating))
        .route("/api/v1/reviews/:id/moderate", post(moderate_review))
        // Carts
        .route("/api/v1/cart", get(get_cart).delete(clear_cart))
        .route("/api/v1/cart/items", post(add_cart_item))
        .route(
            "/api/v1/cart/items/:product_id",
            axum::routing::put(update_cart_item).delete(remove_cart_item),
        )
        .route("/api/v1/cart/merge", post(merge_guest_cart))
        .route("/api/v1/guest-cart/:token", get(get_guest_cart))
        .route("/api/v1/guest-cart/:token/items", post(add_guest_cart_item))
        .route(
            "/api/v1/guest-cart/:token/items/:product_id",
            delete(remove_guest_cart_item),
        )
        // Orders
        .route("/api/v1/orders", get(my_orders).post(create_order))
        .route("/api/v1/orders/:id", get(get_order))
        .route("/api/v1/orders/:id/cancel", post(cancel_order))
        .route("/api/v1/orders/:id/invoice", get(get_invoice))
        .route("/api/v1/orders/:id/status", post(update_order_status))
        .route("/api/v1/admin/orders", get(all_orders))
        // Refunds
        .route(
            "/api/v1/orders/:order_id/items/:item_id/refund",
            post(request_refund),
        )
        .route(
            "/api/v1/orders/:order_id/items/:item_id/refund/resolve",
            post(resolve_refund),
        )
        // Discounts
        .route("/api/v1/discounts", get(list_discounts).post(create_discount))
        .route("/api/v1/discounts/:id", delete(deactivate_discount))
        // Wishlist
        .route("/api/v1/wishlist", get(get_wishlist))
        .route(
            "/api/v1/wishlist/:product_id",
            post(add_to_wishlist).delete(remove_from_wishlist),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Authenticated user identity, forwarded by the auth layer.
pub struct UserId(pub Uuid);

#[axum::async_trait]
impl<S> FromRequestParts<S> for UserId
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<serde_json::Value>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Uuid::parse_str(v).ok())
            .map(UserId)
            .ok_or_else(|| {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(serde_json::json!({ "message": "not authenticated", "data": null })),
                )
            })
    }
}

#[derive(Serialize)]
struct ApiResponse<T> {
    message: String,
    data: T,
}

fn ok<T: Serialize>(message: &str, data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse { message: message.to_string(), data })
}

fn validated<T: Validate>(req: T) -> Result<T, Error> {
    req.validate()
        .map_err(|e| Error::InvalidArgument(e.to_string()))?;
    Ok(req)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy", "service": "storefront" }))
}

// --- Catalog ---------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ListParams {
    page: Option<u32>,
    per_page: Option<u32>,
}

async fn list_products(
    State(s): State<AppState>,
    Query(p): Query<ListParams>,
) -> Result<impl IntoResponse, Error> {
    let page = p.page.unwrap_or(1).max(1);
    let per_page = p.per_page.unwrap_or(20).min(100);
    let products = s
        .store
        .list_products(per_page as i64, ((page - 1) * per_page) as i64)
        .await?;
    Ok(ok("products retrieved", products))
}

#[derive(Debug, Deserialize, Validate)]
struct CreateProductRequest {
    #[validate(length(min = 1))]
    name: String,
    brand: Option<String>,
    description: Option<String>,
    price: Decimal,
    #[validate(range(min = 0))]
    inventory: Option<i32>,
}

async fn create_product(
    State(s): State<AppState>,
    Json(req): Json<CreateProductRequest>,
) -> Result<impl IntoResponse, Error> {
    let req = validated(req)?;
    if req.price < Decimal::ZERO {
        return Err(Error::InvalidArgument("price must not be negative".into()));
    }
    let mut product = Product::new(req.name, req.price, &s.currency, req.inventory.unwrap_or(0));
    product.brand = req.brand;
    product.description = req.description;
    s.store.insert_product(&product).await?;
    Ok((StatusCode::CREATED, ok("product created", product)))
}

async fn get_product(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, Error> {
    Ok(ok("product retrieved", s.store.product(id).await?))
}

#[derive(Debug, Deserialize, Validate)]
struct UpdateProductRequest {
    #[validate(length(min = 1))]
    name: Option<String>,
    brand: Option<String>,
    description: Option<String>,
    price: Option<Decimal>,
}

async fn update_product(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateProductRequest>,
) -> Result<impl IntoResponse, Error> {
    let req = validated(req)?;
    let mut product = s.store.product(id).await?;
    if let Some(name) = req.name {
        product.name = name;
    }
    if let Some(brand) = req.brand {
        product.brand = Some(brand);
    }
    if let Some(description) = req.description {
        product.description = Some(description);
    }
    if let Some(price) = req.price {
        if price < Decimal::ZERO {
            return Err(Error::InvalidArgument("price must not be negative".into()));
        }
        product.price = price;
    }
    s.store.update_product(&product).await?;
    Ok(ok("product updated", product))
}

#[derive(Debug, Deserialize, Validate)]
struct RestockRequest {
    #[validate(range(min = 1))]
    quantity: u32,
}

async fn restock_product(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<RestockRequest>,
) -> Result<impl IntoResponse, Error> {
    let req = validated(req)?;
    s.store.increment_stock(id, req.quantity).await?;
    Ok(ok("product restocked", s.store.product(id).await?))
}

// --- Carts -----------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
struct AddItemRequest {
    product_id: Uuid,
    #[validate(range(min = 1))]
    quantity: u32,
}

#[derive(Debug, Deserialize)]
struct UpdateQuantityRequest {
    quantity: u32,
}

async fn get_cart(State(s): State<AppState>, UserId(user): UserId) -> Result<impl IntoResponse, Error> {
    Ok(ok("cart retrieved", s.carts.cart(&CartOwner::User(user)).await?))
}

async fn add_cart_item(
    State(s): State<AppState>,
    UserId(user): UserId,
    Json(req): Json<AddItemRequest>,
) -> Result<impl IntoResponse, Error> {
    let req = validated(req)?;
    let cart = s
        .carts
        .add_item(&CartOwner::User(user), req.product_id, req.quantity)
        .await?;
    Ok(ok("item added", cart))
}

async fn update_cart_item(
    State(s): State<AppState>,
    UserId(user): UserId,
    Path(product_id): Path<Uuid>,
    Json(req): Json<UpdateQuantityRequest>,
) -> Result<impl IntoResponse, Error> {
    let cart = s
        .carts
        .update_quantity(&CartOwner::User(user), product_id, req.quantity)
        .await?;
    Ok(ok("item updated", cart))
}

async fn remove_cart_item(
    State(s): State<AppState>,
    UserId(user): UserId,
    Path(product_id): Path<Uuid>,
) -> Result<impl IntoResponse, Error> {
    let cart = s.carts.remove_item(&CartOwner::User(user), product_id).await?;
    Ok(ok("item removed", cart))
}

async fn clear_cart(State(s): State<AppState>, UserId(user): UserId) -> Result<impl IntoResponse, Error> {
    Ok(ok("cart cleared", s.carts.clear(&CartOwner::User(user)).await?))
}

#[derive(Debug, Deserialize, Validate)]
struct MergeCartRequest {
    #[validate(length(min = 1))]
    guest_token: String,
}

async fn merge_guest_cart(
    State(s): State<AppState>,
    UserId(user): UserId,
    Json(req): Json<MergeCartRequest>,
) -> Result<impl IntoResponse, Error> {
    let req = validated(req)?;
    let cart = s.carts.merge_guest_cart(&req.guest_token, user).await?;
    Ok(ok("guest cart merged", cart))
}

async fn get_guest_cart(
    State(s): State<AppState>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, Error> {
    Ok(ok("cart retrieved", s.carts.cart(&CartOwner::Guest(token)).await?))
}

async fn add_guest_cart_item(
    State(s): State<AppState>,
    Path(token): Path<String>,
    Json(req): Json<AddItemRequest>,
) -> Result<impl IntoResponse, Error> {
    let req = validated(req)?;
    let cart = s
        .carts
        .add_item(&CartOwner::Guest(token), req.product_id, req.quantity)
        .await?;
    Ok(ok("item added", cart))
}

async fn remove_guest_cart_item(
    State(s): State<AppState>,
    Path((token, product_id)): Path<(String, Uuid)>,
) -> Result<impl IntoResponse, Error> {
    let cart = s
        .carts
        .remove_item(&CartOwner::Guest(token), product_id)
        .await?;
    Ok(ok("item removed", cart))
}

// --- Orders ----------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
struct ShippingRequest {
    #[validate(length(min = 1))]
    address: String,
    #[validate(length(min = 1))]
    phone: String,
    #[validate(email)]
    email: String,
}

impl From<ShippingRequest> for ShippingDetails {
    fn from(r: ShippingRequest) -> Self {
        ShippingDetails { address: r.address, phone: r.phone, email: r.email }
    }
}

async fn create_order(
    State(s): State<AppState>,
    UserId(user): UserId,
    Json(req): Json<ShippingRequest>,
) -> Result<impl IntoResponse, Error> {
    let req = validated(req)?;
    let order = s.orders.checkout(user, req.into()).await?;
    Ok((StatusCode::CREATED, ok("order created", order)))
}

async fn my_orders(State(s): State<AppState>, UserId(user): UserId) -> Result<impl IntoResponse, Error> {
    Ok(ok("orders retrieved", s.orders.orders_for_user(user).await?))
}

async fn get_order(
    State(s): State<AppState>,
    UserId(user): UserId,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, Error> {
    Ok(ok("order retrieved", s.orders.order_for_user(id, user).await?))
}

async fn cancel_order(
    State(s): State<AppState>,
    UserId(user): UserId,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, Error> {
    Ok(ok("order cancelled", s.orders.cancel(id, user).await?))
}

async fn get_invoice(
    State(s): State<AppState>,
    UserId(user): UserId,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, Error> {
    let path = s.orders.invoice(id, user).await?;
    let html = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| Error::Storage(e.to_string()))?;
    Ok(([(header::CONTENT_TYPE, "text/html")], html))
}

#[derive(Debug, Deserialize)]
struct StatusRequest {
    status: String,
}

async fn update_order_status(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<StatusRequest>,
) -> Result<impl IntoResponse, Error> {
    let status = OrderStatus::parse(&req.status)?;
    Ok(ok("order status updated", s.orders.update_status(id, status).await?))
}

async fn all_orders(State(s): State<AppState>) -> Result<impl IntoResponse, Error> {
    Ok(ok("orders retrieved", s.orders.all_orders().await?))
}

// --- Refunds ---------------------------------------------------------------

async fn request_refund(
    State(s): State<AppState>,
    UserId(user): UserId,
    Path((order_id, item_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, Error> {
    let item = s.orders.request_refund(order_id, item_id, user).await?;
    Ok(ok("refund requested", item))
}

#[derive(Debug, Deserialize)]
struct ResolveRefundRequest {
    approved: bool,
}

async fn resolve_refund(
    State(s): State<AppState>,
    Path((order_id, item_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<ResolveRefundRequest>,
) -> Result<impl IntoResponse, Error> {
    let item = s.orders.resolve_refund(order_id, item_id, req.approved).await?;
    let message = if req.approved { "refund approved" } else { "refund rejected" };
    Ok(ok(message, item))
}

// --- Discounts -------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct DiscountRequest {
    product_id: Uuid,
    rate: Decimal,
}

async fn create_discount(
    State(s): State<AppState>,
    Json(req): Json<DiscountRequest>,
) -> Result<impl IntoResponse, Error> {
    let discount = s.discounts.create(req.product_id, req.rate).await?;
    Ok((StatusCode::CREATED, ok("discount created", discount)))
}

#[derive(Debug, Deserialize)]
struct DiscountListParams {
    active: Option<bool>,
}

async fn list_discounts(
    State(s): State<AppState>,
    Query(p): Query<DiscountListParams>,
) -> Result<impl IntoResponse, Error> {
    Ok(ok("discounts retrieved", s.discounts.list(p.active.unwrap_or(false)).await?))
}

async fn deactivate_discount(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, Error> {
    s.discounts.deactivate(id).await?;
    Ok(ok("discount deactivated", serde_json::json!(null)))
}

// --- Reviews ---------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct CommentRequest {
    content: String,
    rating: Option<i32>,
}

async fn add_comment(
    State(s): State<AppState>,
    UserId(user): UserId,
    Path(product_id): Path<Uuid>,
    Json(req): Json<CommentRequest>,
) -> Result<impl IntoResponse, Error> {
    let review = s
        .reviews
        .add_comment(product_id, user, req.content, req.rating)
        .await?;
    Ok((StatusCode::CREATED, ok("comment submitted for review", review)))
}

#[derive(Debug, Deserialize)]
struct RatingRequest {
    rating: i32,
}

async fn add_rating(
    State(s): State<AppState>,
    UserId(user): UserId,
    Path(product_id): Path<Uuid>,
    Json(req): Json<RatingRequest>,
) -> Result<impl IntoResponse, Error> {
    let review = s.reviews.add_rating(product_id, user, req.rating).await?;
    Ok((StatusCode::CREATED, ok("rating added", review)))
}

#[derive(Debug, Deserialize)]
struct ReviewListParams {
    include_pending: Option<bool>,
}

async fn list_reviews(
    State(s): State<AppState>,
    Path(product_id): Path<Uuid>,
    Query(p): Query<ReviewListParams>,
) -> Result<impl IntoResponse, Error> {
    let reviews = s
        .reviews
        .for_product(product_id, p.include_pending.unwrap_or(false))
        .await?;
    Ok(ok("reviews retrieved", reviews))
}

#[derive(Debug, Deserialize)]
struct ModerateRequest {
    approved: bool,
}

async fn moderate_review(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ModerateRequest>,
) -> Result<impl IntoResponse, Error> {
    s.reviews.moderate(id, req.approved).await?;
    let message = if req.approved { "review approved" } else { "review rejected" };
    Ok(ok(message, serde_json::json!(null)))
}

// --- Wishlist --------------------------------------------------------------

async fn get_wishlist(State(s): State<AppState>, UserId(user): UserId) -> Result<impl IntoResponse, Error> {
    Ok(ok("wishlist retrieved", s.wishlists.for_user(user).await?))
}

async fn add_to_wishlist(
    State(s): State<AppState>,
    UserId(user): UserId,
    Path(product_id): Path<Uuid>,
) -> Result<impl IntoResponse, Error> {
    Ok(ok("product added to wishlist", s.wishlists.add(user, product_id).await?))
}

async fn remove_from_wishlist(
    State(s): State<AppState>,
    UserId(user): UserId,
    Path(product_id): Path<Uuid>,
) -> Result<impl IntoResponse, Error> {
    Ok(ok("product removed from wishlist", s.wishlists.remove(user, product_id).await?))
}
