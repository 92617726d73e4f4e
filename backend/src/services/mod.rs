//! Business logic services for the Stockroom inventory backend

pub mod activity;
pub mod lot;
pub mod postgres;
pub mod product;
pub mod reconciliation;
pub mod stock;
pub mod store;
pub mod withdrawal;

pub use activity::{ActivityLog, ActivityService};
pub use lot::{AdjustLotInput, LotAdjustment, LotReceipt, ReceiveLotInput};
pub use postgres::PgStockStore;
pub use product::{ProductService, RegisterProductInput, RegisteredProduct};
pub use reconciliation::ReconciliationReport;
pub use stock::StockService;
pub use store::{StockStore, StockTx};
pub use withdrawal::{WithdrawInput, WithdrawalResult};
