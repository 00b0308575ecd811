//! Entity model shared by every DAO backend.
//!
//! # Responsibility
//! - Define the identity contract entities expose to the DAO layer.
//! - Define the example `Bet` entity.
//!
//! # Invariants
//! - An entity identifier is `None` until the entity is persisted once.

pub mod bet;
pub mod entity;
