//! Shipment packaging for shopping carts.
//!
//! Items are distributed over the fewest packages that respect a price and a
//! weight cap, preferring cheap shipping tiers and balancing weight between
//! packages afterwards. The `api` module exposes the engine over HTTP.

pub mod api;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod model;
pub mod optimizer;
pub mod shipping;
pub mod subset;
pub mod types;
