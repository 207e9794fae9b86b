//! 庫存快照模型

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 單一物料的庫存快照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockSnapshot {
    /// 物料ID
    pub material_id: String,

    /// 現有庫存
    pub on_hand: Decimal,

    /// 已分配數量（ACTIVE + PICKED + ISSUED）
    pub allocated: Decimal,

    /// 工單保管量：已結案分配中未回庫的數量（現場庫存與未說明差異）
    #[serde(default)]
    pub in_custody: Decimal,

    /// 可用庫存（現有 - 已分配 - 工單保管，可為負數）
    pub available: Decimal,

    /// 採購在途
    pub on_order: Decimal,
}

impl StockSnapshot {
    /// 創建新的庫存快照
    pub fn new(material_id: String, on_hand: Decimal, allocated: Decimal, on_order: Decimal) -> Self {
        Self {
            material_id,
            on_hand,
            allocated,
            in_custody: Decimal::ZERO,
            available: on_hand - allocated,
            on_order,
        }
    }

    /// 建構器模式：設定工單保管量並重算可用量
    pub fn with_in_custody(mut self, in_custody: Decimal) -> Self {
        self.in_custody = in_custody;
        self.available = self.on_hand - self.allocated - in_custody;
        self
    }

    /// 空快照（無任何庫存記錄）
    pub fn empty(material_id: String) -> Self {
        Self::new(material_id, Decimal::ZERO, Decimal::ZERO, Decimal::ZERO)
    }

    /// 可用 + 在途
    pub fn projected_supply(&self) -> Decimal {
        self.available + self.on_order
    }

    /// 檢查是否超額分配
    pub fn is_over_allocated(&self) -> bool {
        self.available < Decimal::ZERO
    }
}
