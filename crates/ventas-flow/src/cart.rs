//! Shopping cart ledger.
//!
//! Owned by the flow controller; the checkout flow reads it when building an
//! order. At most one line exists per product id.

use rust_decimal::Decimal;

use ventas_core::types::CartItem;

use crate::error::FlowError;

/// Mutable collection of cart line items, keyed by product id.
#[derive(Debug, Default)]
pub struct CartLedger {
    items: Vec<CartItem>,
}

impl CartLedger {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Add an item. If the product already has a line, its quantity grows by
    /// the added amount; otherwise the item is appended.
    ///
    /// Rejects zero quantity and negative unit price.
    pub fn add(&mut self, item: CartItem) -> Result<(), FlowError> {
        if item.quantity == 0 {
            return Err(FlowError::InvalidQuantity);
        }
        if item.unit_price < Decimal::ZERO {
            return Err(FlowError::InvalidPrice);
        }

        if let Some(existing) = self
            .items
            .iter_mut()
            .find(|i| i.product_id == item.product_id)
        {
            existing.quantity += item.quantity;
        } else {
            self.items.push(item);
        }
        Ok(())
    }

    /// Remove a product's line. Absent products are a no-op, not an error.
    pub fn remove(&mut self, product_id: &str) {
        self.items.retain(|i| i.product_id != product_id);
    }

    /// Empty the cart.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Grand total, recomputed on every call.
    pub fn total(&self) -> Decimal {
        self.items.iter().map(|i| i.subtotal()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }
}
