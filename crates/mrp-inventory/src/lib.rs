//! # MRP Inventory
//!
//! 庫存分類帳、分配狀態機與退料對帳

pub mod allocation;
pub mod book;
pub mod ledger;
pub mod returns;
pub mod stock;
pub mod store;

// Re-export 主要類型
pub use allocation::{
    AllocationFailure, AllocationMachine, AutoConsumeResult, IssueResult, PickResult,
};
pub use book::MaterialBook;
pub use ledger::TransactionLedger;
pub use returns::{ReturnInput, ReturnReceipt, ReturnReconciler, ReturnSummary};
pub use stock::StockAggregator;
pub use store::InventoryStore;
