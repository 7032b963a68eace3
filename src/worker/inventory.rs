//! Checkout and return handlers.
//!
//! The real inventory system lives outside this crate. The worker only
//! needs a yes/no answer for each side effect, so it talks to an
//! [`InventoryHandler`] and ships a simulated one.

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

/// Side effects against the library inventory.
#[async_trait]
pub trait InventoryHandler: Send + Sync {
    /// Lend the item described by `data`. Returns whether it succeeded.
    async fn checkout(&self, data: &Value) -> bool;

    /// Take back the item described by `data`. Returns whether it succeeded.
    async fn return_item(&self, data: &Value) -> bool;
}

/// Inventory stand-in that logs each request and always succeeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedInventory;

#[async_trait]
impl InventoryHandler for SimulatedInventory {
    async fn checkout(&self, data: &Value) -> bool {
        info!(data = %data, "Checking out book");
        true
    }

    async fn return_item(&self, data: &Value) -> bool {
        info!(data = %data, "Returning book");
        true
    }
}
