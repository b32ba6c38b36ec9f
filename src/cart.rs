//! Shopping cart feeding the allocator.
//!
//! The cart is a plain value owned by the caller. It admits items that fit
//! into a single package, keeps them in order and tracks running totals.

use std::cmp::Ordering;

use thiserror::Error;

use crate::model::{Item, ItemId, ItemSpec, PackageLimits, ValidationError};
use crate::types::{Grams, Money, Priced, Weighted};

/// Reasons an item does not enter the cart.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CartError {
    /// The item alone exceeds a package cap and could never be shipped.
    #[error(
        "We can not process items costing more than ${max_price:.2} or weighing more than {max_weight} g at the moment ('{name}': ${price:.2}, {weight} g)"
    )]
    ItemRejected {
        name: String,
        price: Money,
        weight: Grams,
        max_price: Money,
        max_weight: Grams,
    },
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// Ordered list of admitted items with running totals.
#[derive(Clone, Debug)]
pub struct Cart {
    items: Vec<Item>,
    limits: PackageLimits,
    next_id: usize,
    total_price: Money,
    total_weight: Grams,
}

impl Cart {
    pub fn new(limits: PackageLimits) -> Self {
        Self {
            items: Vec::new(),
            limits,
            next_id: 1,
            total_price: 0.0,
            total_weight: 0,
        }
    }

    /// Admits an item if it is well-formed and within the package caps.
    ///
    /// # Returns
    /// The identity assigned to the admitted item
    pub fn add(&mut self, spec: ItemSpec) -> Result<ItemId, CartError> {
        let id = ItemId(self.next_id);
        let item = Item::from_spec(id, spec)?;
        if !self.limits.admits(&item) {
            return Err(CartError::ItemRejected {
                name: item.name().to_string(),
                price: item.price(),
                weight: item.weight(),
                max_price: self.limits.max_price,
                max_weight: self.limits.max_weight,
            });
        }

        self.next_id += 1;
        self.total_price += item.price();
        self.total_weight += item.weight();
        self.items.push(item);
        Ok(id)
    }

    /// Removes every item. Identities keep counting up.
    pub fn clear(&mut self) {
        self.items.clear();
        self.total_price = 0.0;
        self.total_weight = 0;
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn total_price(&self) -> Money {
        self.total_price
    }

    pub fn total_weight(&self) -> Grams {
        self.total_weight
    }

    pub fn limits(&self) -> PackageLimits {
        self.limits
    }

    /// Stable sort with a caller-supplied ordering.
    pub fn sort_by(&mut self, compare: impl FnMut(&Item, &Item) -> Ordering) {
        self.items.sort_by(compare);
    }
}

impl Default for Cart {
    fn default() -> Self {
        Self::new(PackageLimits::default())
    }
}

impl Weighted for Cart {
    fn weight(&self) -> Grams {
        self.total_weight
    }
}

impl Priced for Cart {
    fn price(&self) -> Money {
        self.total_price
    }
}
