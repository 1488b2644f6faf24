pub mod cart_repository;
pub mod guest_cart_store;
pub mod order_repository;
pub mod profile_repository;
pub mod repo_error;

pub use repo_error::RepoError;

use cart_repository::CartRepository;
use order_repository::OrderRepository;
use profile_repository::ProfileRepository;

/// Everything the storefront core needs from the remote row store.
pub trait Persistence: CartRepository + ProfileRepository + OrderRepository {}

impl<T> Persistence for T where T: CartRepository + ProfileRepository + OrderRepository {}
