//! Use-case services over the DAO contract.
//!
//! # Responsibility
//! - Orchestrate DAO calls into use-case level APIs.
//! - Stay independent of the backend adapter in use.

pub mod bet_service;
