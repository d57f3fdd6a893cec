//! Core types shared by ISL generated code and the contract runtime
//!
//! This crate provides the building blocks the contract engine evaluates
//! against:
//! - `Value`, the dynamic value used for criteria, context and captured state
//! - `FieldAccess` and `Snapshot`, the capabilities domain types implement
//! - Value conversion errors

pub mod traits;
pub mod value;

pub use traits::{FieldAccess, Record, Snapshot};
pub use value::{Value, ValueError, ValueResult};
