//! Shared data model, product-identifier parsers and configuration for the
//! HR-WSI orchestrator.

pub mod config;
pub mod defaults;
pub mod model;
pub mod parsers;
pub mod product_type;
pub mod retry;

pub use model::*;
pub use product_type::{ProductType, RuleName};
