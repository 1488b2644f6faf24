pub mod identity;
pub mod server;

pub use server::{AppState, HttpServer, HttpServerConfig};
