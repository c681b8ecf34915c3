//! Aggregates module
pub mod cart;
pub mod discount;
pub mod order;
pub mod product;
pub mod review;
pub mod wishlist;

pub use cart::{Cart, CartItem};
pub use discount::Discount;
pub use order::{Order, OrderItem, OrderStatus, RefundStatus, ShippingDetails, REFUND_WINDOW_DAYS};
pub use product::Product;
pub use review::Review;
pub use wishlist::Wishlist;
