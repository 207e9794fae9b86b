//! 採購在途供應模型（外部採購系統的唯讀視圖）

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 採購單行
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseOrderLine {
    pub id: Uuid,

    /// 採購單號
    pub purchase_order_id: String,

    /// 物料ID
    pub material_id: String,

    /// 訂購數量
    pub quantity_ordered: Decimal,

    /// 已收貨數量
    pub quantity_received: Decimal,

    /// 預計到貨日
    pub expected_date: Option<NaiveDate>,

    /// 是否已結案（結案後剩餘量不再計入在途）
    pub is_closed: bool,
}

impl PurchaseOrderLine {
    /// 創建新的採購單行
    pub fn new(purchase_order_id: String, material_id: String, quantity_ordered: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            purchase_order_id,
            material_id,
            quantity_ordered,
            quantity_received: Decimal::ZERO,
            expected_date: None,
            is_closed: false,
        }
    }

    /// 建構器模式：設置已收貨數量
    pub fn with_quantity_received(mut self, quantity_received: Decimal) -> Self {
        self.quantity_received = quantity_received;
        self
    }

    /// 建構器模式：設置預計到貨日
    pub fn with_expected_date(mut self, expected_date: NaiveDate) -> Self {
        self.expected_date = Some(expected_date);
        self
    }

    /// 建構器模式：設置為結案
    pub fn closed(mut self) -> Self {
        self.is_closed = true;
        self
    }

    /// 未交數量（超收或結案時為零）
    pub fn outstanding(&self) -> Decimal {
        if self.is_closed {
            return Decimal::ZERO;
        }
        (self.quantity_ordered - self.quantity_received).max(Decimal::ZERO)
    }
}
