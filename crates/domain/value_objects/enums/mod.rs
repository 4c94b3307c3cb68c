pub mod order_statuses;
pub mod payment_statuses;
pub mod product_sorts;
