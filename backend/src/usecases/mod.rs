pub mod auth;
pub mod cart;
pub mod orders;
pub mod payments;
pub mod products;
pub mod stripe_webhook;
