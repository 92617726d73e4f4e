//! Shared types and algorithms for the Stockroom inventory backend
//!
//! This crate contains the stock domain models and the FIFO planner, shared
//! between the backend and the browser client (via WASM).

pub mod fifo;
pub mod models;
pub mod types;
pub mod validation;

pub use fifo::*;
pub use models::*;
pub use types::*;
pub use validation::*;
