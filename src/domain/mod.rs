pub mod checkout;
pub mod status;

pub use checkout::{place_order, NewOrderItem, PlaceOrder};
pub use status::OrderStatus;
