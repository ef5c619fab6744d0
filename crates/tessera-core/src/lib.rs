//! Tessera Core Types
//!
//! This crate provides the dataset graph that Tessera macros are evaluated
//! against. It includes:
//!
//! - **Entities**: data set lists, data sets, attributes and parameters ([`entity`])
//! - **Services**: read-only lookup traits consumed by reference resolution ([`service`])
//! - **Aliases**: the closed set of reference alias types ([`alias::ReferenceAliasType`])
//! - **Store**: an in-memory graph with a name-based builder ([`store::MemoryStore`])

pub mod alias;
pub mod entity;
pub mod service;
pub mod store;

mod error;

pub use error::CoreError;
