//! # MRP Core
//!
//! 核心資料模型與類型定義：物料、庫存異動、分配、訂單、BOM 與計劃配置

pub mod allocation;
pub mod bom;
pub mod config;
pub mod inventory;
pub mod material;
pub mod order;
pub mod source;
pub mod supply;
pub mod transaction;

// Re-export 主要類型
pub use allocation::{
    Allocation, AllocationEvent, AllocationStatus, ReturnAction, ReturnOutcome, VarianceWarning,
};
pub use bom::{BomItem, BomRevision};
pub use config::{DemandBasis, PlanningConfig, ShortageAttribution};
pub use inventory::StockSnapshot;
pub use material::{Material, UnitOfMeasure};
pub use order::{Order, OrderStatus};
pub use source::{BomSource, OrderSource, PlanningSnapshot, StockSource};
pub use supply::PurchaseOrderLine;
pub use transaction::{OwnerType, Reference, Transaction, TransactionType};

use rust_decimal::Decimal;
use uuid::Uuid;

/// MRP 錯誤類型
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MrpError {
    /// 狀態機違規，呼叫端應重新讀取狀態
    #[error("分配 {allocation_id} 無法由 {from} 轉換為 {to}")]
    InvalidTransition {
        allocation_id: Uuid,
        from: AllocationStatus,
        to: AllocationStatus,
    },

    #[error("物料 {material_id} 庫存不足：需要 {requested}, 可用 {available}")]
    InsufficientStock {
        material_id: String,
        requested: Decimal,
        available: Decimal,
    },

    #[error("無效的數量: {0}")]
    InvalidQuantity(String),

    #[error("找不到{entity}: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("配置錯誤: {0}")]
    Config(String),
}

impl MrpError {
    /// 建立「找不到」錯誤
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// 是否可由呼叫端重新整理狀態後重試
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::InvalidTransition { .. })
    }
}

pub type Result<T> = std::result::Result<T, MrpError>;
