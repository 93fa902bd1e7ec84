//! Domain models for fieldops.
//!
//! These are the core types shared across all crates. Wire
//! representation is camelCase; credential hashes never serialize.

pub mod agent;
pub mod claims;
pub mod export;
pub mod inspection;
pub mod product;
pub mod registration;
pub mod tenant;
