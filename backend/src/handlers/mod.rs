//! HTTP handlers

pub mod activity;
pub mod health;
pub mod product;
pub mod stock;

pub use activity::*;
pub use health::*;
pub use product::*;
pub use stock::*;
