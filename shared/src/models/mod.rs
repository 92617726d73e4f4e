//! Domain models for the Stockroom inventory backend

mod activity;
mod consumption;
mod lot;
mod product;

pub use activity::*;
pub use consumption::*;
pub use lot::*;
pub use product::*;
