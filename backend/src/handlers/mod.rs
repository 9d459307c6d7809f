//! HTTP handlers for the Farm Management Platform

mod harvest;
mod health;
mod plan;

pub use harvest::*;
pub use health::*;
pub use plan::*;
