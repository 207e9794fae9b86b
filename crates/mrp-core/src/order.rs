//! 客戶訂單模型（外部訂單系統的唯讀視圖）

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::DemandBasis;

/// 訂單狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Draft,
    Confirmed,
    InProduction,
    Shipped,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// 未結訂單才產生 MRP 需求
    pub fn is_open(self) -> bool {
        !matches!(self, Self::Shipped | Self::Completed | Self::Cancelled)
    }
}

/// 訂單
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// 訂單ID
    pub order_id: String,

    /// 訂單號
    pub order_number: String,

    /// 客戶
    pub customer_id: String,

    /// 訂購數量
    pub quantity: Decimal,

    /// 已出貨數量
    pub quantity_shipped: Decimal,

    pub status: OrderStatus,

    /// 下單時生效的 BOM 版本
    pub bom_revision_id: String,

    /// 交期
    pub due_date: Option<NaiveDate>,

    pub created_at: DateTime<Utc>,
}

impl Order {
    /// 創建新的訂單
    pub fn new(
        order_id: String,
        customer_id: String,
        quantity: Decimal,
        bom_revision_id: String,
    ) -> Self {
        Self {
            order_number: order_id.clone(),
            order_id,
            customer_id,
            quantity,
            quantity_shipped: Decimal::ZERO,
            status: OrderStatus::Confirmed,
            bom_revision_id,
            due_date: None,
            created_at: Utc::now(),
        }
    }

    /// 建構器模式：設置訂單號
    pub fn with_order_number(mut self, order_number: String) -> Self {
        self.order_number = order_number;
        self
    }

    /// 建構器模式：設置交期
    pub fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }

    /// 建構器模式：設置狀態
    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.status = status;
        self
    }

    /// 建構器模式：設置已出貨數量
    pub fn with_quantity_shipped(mut self, quantity_shipped: Decimal) -> Self {
        self.quantity_shipped = quantity_shipped;
        self
    }

    /// 建構器模式：設置建立時間
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }

    /// 依需求基準計算的生產數量
    pub fn demand_quantity(&self, basis: DemandBasis) -> Decimal {
        match basis {
            DemandBasis::OrderQuantity => self.quantity,
            DemandBasis::RemainingQuantity => {
                (self.quantity - self.quantity_shipped).max(Decimal::ZERO)
            }
        }
    }

    /// 庫存分配優先順序：交期早者優先（無交期排最後），其次建立時間，最後訂單ID
    pub fn priority_cmp(&self, other: &Order) -> Ordering {
        let due = match (self.due_date, other.due_date) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        due.then_with(|| self.created_at.cmp(&other.created_at))
            .then_with(|| self.order_id.cmp(&other.order_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn order(id: &str) -> Order {
        Order::new(
            id.to_string(),
            "CUST-1".to_string(),
            Decimal::from(100),
            "REV-A".to_string(),
        )
    }

    #[test]
    fn test_open_statuses() {
        assert!(OrderStatus::Draft.is_open());
        assert!(OrderStatus::InProduction.is_open());
        assert!(!OrderStatus::Shipped.is_open());
        assert!(!OrderStatus::Completed.is_open());
        assert!(!OrderStatus::Cancelled.is_open());
    }

    #[test]
    fn test_demand_quantity_basis() {
        let o = order("SO-1").with_quantity_shipped(Decimal::from(30));
        assert_eq!(o.demand_quantity(DemandBasis::OrderQuantity), Decimal::from(100));
        assert_eq!(o.demand_quantity(DemandBasis::RemainingQuantity), Decimal::from(70));

        let over = order("SO-2").with_quantity_shipped(Decimal::from(120));
        assert_eq!(over.demand_quantity(DemandBasis::RemainingQuantity), Decimal::ZERO);
    }

    #[test]
    fn test_priority_due_date_then_created_at() {
        let t0 = Utc.with_ymd_and_hms(2025, 10, 1, 8, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2025, 10, 2, 8, 0, 0).unwrap();
        let due = NaiveDate::from_ymd_opt(2025, 11, 1).unwrap();

        let early = order("SO-1").with_due_date(due).with_created_at(t1);
        let tie = order("SO-2").with_due_date(due).with_created_at(t0);
        let undated = order("SO-0").with_created_at(t0);

        assert_eq!(tie.priority_cmp(&early), Ordering::Less);
        assert_eq!(early.priority_cmp(&undated), Ordering::Less);
        assert_eq!(undated.priority_cmp(&tie), Ordering::Greater);
    }
}
