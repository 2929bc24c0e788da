pub mod delivery_attempts;
pub mod order_items;
pub mod orders;
