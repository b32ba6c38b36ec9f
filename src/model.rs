//! Data models for the package allocation.
//!
//! This module defines the fundamental data structures:
//! - `Item`: A catalog entry admitted to a cart, with a stable identity
//! - `Package`: A capacity-tracked shipment container of items
//! - `PackageLimits`: The global per-package caps
//!
//! All structures implement the traits from the `types` module.

use std::fmt;

use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use thiserror::Error;
use utoipa::ToSchema;

use crate::shipping::ShippingSchedule;
use crate::types::{Grams, Money, Priced, Weighted, price_at_most, validation};

/// Validation error for item and limit data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Invalid name: {0}")]
    InvalidName(String),
    #[error("Invalid price: {0}")]
    InvalidPrice(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Errors raised by package mutations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PackError {
    #[error("Item {id} is not contained in this package")]
    RemoveNotFound { id: ItemId },
    #[error("No item named '{name}' is contained in this package")]
    NameNotFound { name: String },
}

/// Stable per-item sequence number, assigned when an item enters a cart.
///
/// Item names are not unique, so packages identify their items by this id.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct ItemId(pub usize);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Unvalidated item record as read from a catalog or a request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({ "name": "Item 1", "price": 10.0, "weight": 200 }))]
pub struct ItemSpec {
    pub name: String,
    pub price: Money,
    pub weight: Grams,
}

impl ItemSpec {
    pub fn new(name: impl Into<String>, price: Money, weight: Grams) -> Self {
        Self {
            name: name.into(),
            price,
            weight,
        }
    }
}

/// An item admitted for packing. Immutable after creation.
///
/// # Fields
/// * `id` - Identity within one cart
/// * `name` - Catalog name, not necessarily unique
/// * `price` - Price in currency units
/// * `weight` - Weight in grams
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct Item {
    id: ItemId,
    name: String,
    price: Money,
    weight: Grams,
}

impl Item {
    /// Creates a new item with validation.
    ///
    /// # Returns
    /// `Ok(Item)` for a non-empty name and a finite non-negative price,
    /// otherwise `Err(ValidationError)`
    pub fn new(
        id: ItemId,
        name: impl Into<String>,
        price: Money,
        weight: Grams,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        validation::validate_name(&name).map_err(ValidationError::InvalidName)?;
        validation::validate_price(price).map_err(ValidationError::InvalidPrice)?;
        Ok(Self {
            id,
            name,
            price,
            weight,
        })
    }

    /// Validates a raw record and assigns it the given identity.
    pub fn from_spec(id: ItemId, spec: ItemSpec) -> Result<Self, ValidationError> {
        Self::new(id, spec.name, spec.price, spec.weight)
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Weighted for Item {
    fn weight(&self) -> Grams {
        self.weight
    }
}

impl Priced for Item {
    fn price(&self) -> Money {
        self.price
    }
}

/// Global caps every package must respect.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PackageLimits {
    pub max_weight: Grams,
    pub max_price: Money,
}

impl PackageLimits {
    pub const DEFAULT_MAX_WEIGHT: Grams = 5000;
    pub const DEFAULT_MAX_PRICE: Money = 250.0;

    /// Creates limits after validating the parameters.
    pub fn new(max_weight: Grams, max_price: Money) -> Result<Self, ValidationError> {
        if max_weight == 0 {
            return Err(ValidationError::InvalidConfiguration(
                "Maximum package weight must be positive".to_string(),
            ));
        }
        if !max_price.is_finite() || max_price <= 0.0 {
            return Err(ValidationError::InvalidConfiguration(format!(
                "Maximum package price must be positive, got: {}",
                max_price
            )));
        }
        Ok(Self {
            max_weight,
            max_price,
        })
    }

    /// Checks whether a single item fits into an empty package.
    pub fn admits(&self, item: &(impl Weighted + Priced)) -> bool {
        item.weight() <= self.max_weight && price_at_most(item.price(), self.max_price)
    }
}

impl Default for PackageLimits {
    fn default() -> Self {
        Self {
            max_weight: Self::DEFAULT_MAX_WEIGHT,
            max_price: Self::DEFAULT_MAX_PRICE,
        }
    }
}

/// A shipment container with capacity tracking.
///
/// The derived fields are refreshed on every mutation, so reads never walk
/// the item list.
///
/// # Fields
/// * `items` - Contained items in insertion order
/// * `weight` / `price` - Sums over the contained items
/// * `weight_capacity` / `price_capacity` - Remaining room under the caps
/// * `weight_capacity_sh` - Grams left before the next shipping bracket
/// * `shipping_cost` - Cost of the current bracket
/// * `cost_per_gram` - `shipping_cost / weight`, 0 for an empty package
#[derive(Clone, Debug)]
pub struct Package {
    items: Vec<Item>,
    weight: Grams,
    price: Money,
    weight_capacity: Grams,
    price_capacity: Money,
    weight_capacity_sh: Grams,
    shipping_cost: Money,
    cost_per_gram: f64,
    limits: PackageLimits,
    schedule: ShippingSchedule,
}

impl Package {
    /// Creates an empty package bounded by `limits`, priced by `schedule`.
    ///
    /// The weight cap must not exceed the heaviest shipping bracket; the
    /// packing configuration guarantees this.
    pub fn new(limits: PackageLimits, schedule: ShippingSchedule) -> Self {
        debug_assert!(limits.max_weight <= schedule.max_weight());
        let mut package = Self {
            items: Vec::new(),
            weight: 0,
            price: 0.0,
            weight_capacity: limits.max_weight,
            price_capacity: limits.max_price,
            weight_capacity_sh: 0,
            shipping_cost: 0.0,
            cost_per_gram: 0.0,
            limits,
            schedule,
        };
        package.refresh_derived();
        package
    }

    /// Checks if the package has enough capacity, price and weight wise, to
    /// hold the item. Pure query.
    pub fn can_hold(&self, item: &Item) -> bool {
        price_at_most(item.price, self.price_capacity) && item.weight <= self.weight_capacity
    }

    /// Adds an item unconditionally. Callers check `can_hold` first.
    pub fn add(&mut self, item: Item) {
        debug_assert!(self.can_hold(&item), "package cap exceeded by {}", item.id);
        self.weight += item.weight;
        self.price += item.price;
        self.items.push(item);
        self.refresh_derived();
    }

    /// Removes the item with the given identity.
    ///
    /// # Returns
    /// The removed item, or `PackError::RemoveNotFound` if it is not here
    pub fn remove(&mut self, id: ItemId) -> Result<Item, PackError> {
        let index = self
            .items
            .iter()
            .position(|item| item.id == id)
            .ok_or(PackError::RemoveNotFound { id })?;
        Ok(self.take_at(index))
    }

    /// Removes the first item carrying `name`.
    ///
    /// Names can repeat; prefer `remove` when the identity is known.
    pub fn remove_first_named(&mut self, name: &str) -> Result<Item, PackError> {
        let index = self
            .items
            .iter()
            .position(|item| item.name == name)
            .ok_or_else(|| PackError::NameNotFound {
                name: name.to_string(),
            })?;
        Ok(self.take_at(index))
    }

    fn take_at(&mut self, index: usize) -> Item {
        let item = self.items.remove(index);
        self.weight -= item.weight;
        self.price -= item.price;
        if self.items.is_empty() {
            self.price = 0.0;
        }
        self.refresh_derived();
        item
    }

    fn refresh_derived(&mut self) {
        self.weight_capacity = self.limits.max_weight.saturating_sub(self.weight);
        self.price_capacity = self.limits.max_price - self.price;
        // Caps keep the weight inside the schedule, the fallbacks are unreachable.
        self.shipping_cost = self
            .schedule
            .cost_for(self.weight)
            .unwrap_or_else(|| self.schedule.brackets().last().map_or(0.0, |b| b.cost));
        self.weight_capacity_sh = self.schedule.headroom(self.weight).unwrap_or(0);
        self.cost_per_gram = if self.weight == 0 {
            0.0
        } else {
            self.shipping_cost / self.weight as f64
        };
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

    pub fn weight_capacity(&self) -> Grams {
        self.weight_capacity
    }

    pub fn price_capacity(&self) -> Money {
        self.price_capacity
    }

    pub fn weight_capacity_sh(&self) -> Grams {
        self.weight_capacity_sh
    }

    pub fn shipping_cost(&self) -> Money {
        self.shipping_cost
    }

    pub fn cost_per_gram(&self) -> f64 {
        self.cost_per_gram
    }

    pub fn limits(&self) -> PackageLimits {
        self.limits
    }
}

impl Default for Package {
    fn default() -> Self {
        Self::new(PackageLimits::default(), ShippingSchedule::default())
    }
}

impl Weighted for Package {
    fn weight(&self) -> Grams {
        self.weight
    }
}

impl Priced for Package {
    fn price(&self) -> Money {
        self.price
    }
}
