pub mod carts;
pub mod enums;
pub mod iam;
pub mod images;
pub mod orders;
pub mod payment_transitions;
pub mod payments;
pub mod products;
