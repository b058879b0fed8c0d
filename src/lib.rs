//! Schedule K-2 Part II line items per entity, with a cross-entity
//! aggregation of foreign-source totals by line and country.

pub mod config;
pub mod core;
pub mod countries;
pub mod session;
pub mod store;
