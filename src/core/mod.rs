//! Core composition logic: types, profiles, routing, inventories, assembly.

pub mod assembler;
pub mod batch;
pub mod builder;
pub mod composer;
pub mod config;
pub mod error;
pub mod inventory;
pub mod profile;
pub mod resolver;
pub mod router;
pub mod types;
pub mod validate;
