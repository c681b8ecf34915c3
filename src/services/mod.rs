//! Application services orchestrating the domain over the store, plus the
//! best-effort collaborators (mail, invoices, events).
pub mod carts;
pub mod discounts;
pub mod invoices;
pub mod notifications;
pub mod orders;
pub mod reviews;
pub mod wishlists;

pub use carts::{CartOwner, CartService};
pub use discounts::DiscountService;
pub use invoices::Invoices;
pub use notifications::{EventBus, LogMailer, Mailer};
pub use orders::OrderService;
pub use reviews::ReviewService;
pub use wishlists::WishlistService;
