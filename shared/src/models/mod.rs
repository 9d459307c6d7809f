//! Domain models for the Farm Management Platform

mod harvest;
mod plan;

pub use harvest::*;
pub use plan::*;
