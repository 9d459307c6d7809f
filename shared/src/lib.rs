//! Shared types and models for the Farm Management Platform
//!
//! This crate contains types shared between the backend, the browser forms
//! (via WASM), and other components of the system.

pub mod models;
pub mod reconciliation;
pub mod types;
pub mod validation;

pub use models::*;
pub use reconciliation::*;
pub use types::*;
pub use validation::*;
