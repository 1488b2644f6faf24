//! Cart core: one identity's lines, quantity bounds, and where they persist.
//!
//! Members' lines mirror `cart_items` rows one to one and every mutation is
//! written remotely before the in-memory lines change, so a failed call leaves
//! the cart as it was. Guests' lines live in a [`GuestCartStore`] payload that
//! is rewritten after every mutation; failures there are logged and ignored.

use std::sync::Arc;
use std::time::Duration;

use grocer_types::domain::cart::{self, CartLine, NewCartRow};
use grocer_types::domain::identity::Identity;
use grocer_types::domain::product::Product;
use grocer_types::domain::quantity::Quantity;
use grocer_types::ports::cart_repository::CartRepository;
use grocer_types::ports::guest_cart_store::GuestCartStore;
use uuid::Uuid;

use crate::application::deadline::bounded;
use crate::catalog::Catalog;
use crate::errors::CartError;

/// Collaborators shared by every cart.
pub struct CartDeps<R> {
    pub repo: Arc<R>,
    pub guest_store: Arc<dyn GuestCartStore>,
    pub catalog: Arc<Catalog>,
    pub timeout: Duration,
}

impl<R> Clone for CartDeps<R> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            guest_store: self.guest_store.clone(),
            catalog: self.catalog.clone(),
            timeout: self.timeout,
        }
    }
}

/// A guest payload that is not a JSON array of lines.
#[derive(thiserror::Error, Debug)]
#[error("guest cart payload unreadable: {0}")]
struct StorageParseError(#[from] serde_json::Error);

pub struct CartService<R: CartRepository> {
    deps: CartDeps<R>,
    identity: Identity,
    lines: Vec<CartLine>,
    loaded: bool,
}

impl<R: CartRepository> CartService<R> {
    /// An empty, not yet loaded cart.
    pub fn new(identity: Identity, deps: CartDeps<R>) -> Self {
        Self {
            deps,
            identity,
            lines: Vec::new(),
            loaded: false,
        }
    }

    pub async fn open(identity: Identity, deps: CartDeps<R>) -> Result<Self, CartError> {
        let mut cart = Self::new(identity, deps);
        cart.load().await?;
        Ok(cart)
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn catalog(&self) -> &Catalog {
        &self.deps.catalog
    }

    pub fn line_for_product(&self, product_id: &str) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.product.id == product_id)
    }

    pub fn total_cents(&self) -> i64 {
        cart::total_cents(&self.lines)
    }

    pub fn total_items(&self) -> u32 {
        cart::total_items(&self.lines)
    }

    /// Replaces the in-memory lines with the identity's stored cart.
    pub async fn load(&mut self) -> Result<(), CartError> {
        self.lines = match &self.identity {
            Identity::Member(account) => {
                let rows = bounded(
                    self.deps.timeout,
                    self.deps.repo.list_cart_rows(account.id),
                )
                .await?;
                rows.into_iter()
                    .filter_map(|row| match self.deps.catalog.get(&row.product_id) {
                        Some(product) => Some(CartLine {
                            id: row.id,
                            product: product.clone(),
                            quantity: row.quantity,
                        }),
                        None => {
                            tracing::debug!(
                                row_id = %row.id,
                                product_id = %row.product_id,
                                "skipping cart row for product missing from catalog"
                            );
                            None
                        }
                    })
                    .collect()
            }
            Identity::Guest { session } => self.read_guest(*session).await,
        };
        self.loaded = true;
        Ok(())
    }

    pub async fn ensure_loaded(&mut self) -> Result<(), CartError> {
        if !self.loaded {
            self.load().await?;
        }
        Ok(())
    }

    /// Drops the current lines and loads `identity`'s cart instead.
    pub async fn switch_identity(&mut self, identity: Identity) -> Result<(), CartError> {
        self.identity = identity;
        self.lines.clear();
        self.loaded = false;
        self.load().await
    }

    /// Adds `quantity` of `product`, merging into an existing line for the
    /// same product (capped at 99). Returns the id of the affected line.
    pub async fn add_line(&mut self, product: &Product, quantity: i64) -> Result<Uuid, CartError> {
        let quantity = Quantity::new(quantity)?;

        if let Some(idx) = self.position_of_product(&product.id) {
            let merged = self.lines[idx].quantity.saturating_add(quantity);
            self.write_quantity(idx, merged).await?;
            return Ok(self.lines[idx].id);
        }

        let line = match &self.identity {
            Identity::Member(account) => {
                let row = bounded(
                    self.deps.timeout,
                    self.deps.repo.insert_cart_row(NewCartRow {
                        user_id: account.id,
                        product_id: product.id.clone(),
                        quantity,
                    }),
                )
                .await?;
                CartLine {
                    id: row.id,
                    product: product.clone(),
                    quantity: row.quantity,
                }
            }
            Identity::Guest { .. } => CartLine {
                id: Uuid::new_v4(),
                product: product.clone(),
                quantity,
            },
        };
        let id = line.id;
        self.lines.push(line);
        self.persist_guest().await;
        Ok(id)
    }

    /// [`CartService::add_line`] for a catalog product id.
    pub async fn add_product(&mut self, product_id: &str, quantity: i64) -> Result<Uuid, CartError> {
        let product = self
            .deps
            .catalog
            .get(product_id)
            .cloned()
            .ok_or_else(|| CartError::UnknownProduct(product_id.to_string()))?;
        self.add_line(&product, quantity).await
    }

    /// Sets a line's quantity. Anything below 1 removes the line; above 99 is
    /// rejected. Unknown line ids are ignored.
    pub async fn set_quantity(&mut self, line_id: Uuid, quantity: i64) -> Result<(), CartError> {
        if quantity < 1 {
            return self.remove_line(line_id).await;
        }
        let quantity = Quantity::new(quantity)?;
        let Some(idx) = self.position_of_line(line_id) else {
            return Ok(());
        };
        self.write_quantity(idx, quantity).await
    }

    /// Removing a line that is not in the cart is a no-op.
    pub async fn remove_line(&mut self, line_id: Uuid) -> Result<(), CartError> {
        let Some(idx) = self.position_of_line(line_id) else {
            return Ok(());
        };
        if let Identity::Member(account) = &self.identity {
            bounded(
                self.deps.timeout,
                self.deps.repo.delete_cart_row(account.id, line_id),
            )
            .await?;
        }
        self.lines.remove(idx);
        self.persist_guest().await;
        Ok(())
    }

    pub async fn clear(&mut self) -> Result<(), CartError> {
        match &self.identity {
            Identity::Member(account) => {
                bounded(self.deps.timeout, self.deps.repo.delete_cart_rows(account.id)).await?;
                self.lines.clear();
            }
            Identity::Guest { session } => {
                self.lines.clear();
                let session = *session;
                if let Err(e) = bounded(self.deps.timeout, self.deps.guest_store.remove(session)).await
                {
                    tracing::warn!(%session, error = %e, "failed to clear guest cart storage");
                }
            }
        }
        Ok(())
    }

    /// Moves every line of `other` into this cart by product id. A line
    /// leaves `other` as soon as it has landed here, so after a failure
    /// `other` holds exactly the lines still to move.
    pub async fn absorb(&mut self, other: &mut CartService<R>) -> Result<(), CartError> {
        for line in other.lines.clone() {
            self.add_line(&line.product, i64::from(line.quantity)).await?;
            other.remove_line(line.id).await?;
        }
        Ok(())
    }

    fn position_of_product(&self, product_id: &str) -> Option<usize> {
        self.lines.iter().position(|l| l.product.id == product_id)
    }

    fn position_of_line(&self, line_id: Uuid) -> Option<usize> {
        self.lines.iter().position(|l| l.id == line_id)
    }

    async fn write_quantity(&mut self, idx: usize, quantity: Quantity) -> Result<(), CartError> {
        let line_id = self.lines[idx].id;
        if let Identity::Member(account) = &self.identity {
            bounded(
                self.deps.timeout,
                self.deps.repo.update_cart_row(account.id, line_id, quantity),
            )
            .await?;
        }
        self.lines[idx].quantity = quantity;
        self.persist_guest().await;
        Ok(())
    }

    async fn read_guest(&self, session: Uuid) -> Vec<CartLine> {
        let payload = match bounded(self.deps.timeout, self.deps.guest_store.read(session)).await {
            Ok(Some(payload)) => payload,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!(%session, error = %e, "failed to read guest cart; starting empty");
                return Vec::new();
            }
        };

        match parse_guest_payload(&payload, &self.deps.catalog) {
            Ok(lines) => lines,
            Err(e) => {
                tracing::warn!(%session, error = %e, "discarding corrupt guest cart");
                if let Err(e) = bounded(self.deps.timeout, self.deps.guest_store.remove(session)).await {
                    tracing::warn!(%session, error = %e, "failed to remove corrupt guest cart");
                }
                Vec::new()
            }
        }
    }

    /// Write-through of the full line list for guests; no-op for members.
    async fn persist_guest(&self) {
        let Identity::Guest { session } = &self.identity else {
            return;
        };
        let session = *session;
        let payload = match serde_json::to_string(&self.lines) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(%session, error = %e, "failed to serialize guest cart");
                return;
            }
        };
        if let Err(e) = bounded(
            self.deps.timeout,
            self.deps.guest_store.write(session, payload),
        )
        .await
        {
            tracing::warn!(%session, error = %e, "failed to save guest cart");
        }
    }
}

/// Decodes a stored guest cart. Products are re-resolved against the catalog
/// so prices follow it; lines for vanished products are dropped and repeated
/// products are folded into one line.
fn parse_guest_payload(payload: &str, catalog: &Catalog) -> Result<Vec<CartLine>, StorageParseError> {
    let stored: Vec<CartLine> = serde_json::from_str(payload)?;
    let mut lines: Vec<CartLine> = Vec::with_capacity(stored.len());
    for line in stored {
        let Some(product) = catalog.get(&line.product.id) else {
            tracing::debug!(product_id = %line.product.id, "skipping guest line for product missing from catalog");
            continue;
        };
        match lines.iter_mut().find(|l| l.product.id == product.id) {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(line.quantity),
            None => lines.push(CartLine {
                id: line.id,
                product: product.clone(),
                quantity: line.quantity,
            }),
        }
    }
    Ok(lines)
}
