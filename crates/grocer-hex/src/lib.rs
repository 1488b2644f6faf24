//! grocer-hex: storefront cart and checkout core plus its inbound HTTP adapter

pub mod config;
pub mod errors;

pub mod application;
pub mod catalog;

pub use grocer_types::{domain, ports};

pub mod inbound; // HTTP adapter (server, handlers, identity headers)
