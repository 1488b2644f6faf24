pub mod cart;
pub mod identity;
pub mod order;
pub mod product;
pub mod profile;
pub mod quantity;
