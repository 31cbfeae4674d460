//! Domain records shared between the store and its callers.

pub mod models;
pub mod stats;
