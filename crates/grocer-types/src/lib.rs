//! grocer-types: storefront domain model and the ports the cart/checkout core calls out to.

pub mod domain;
pub mod ports;
