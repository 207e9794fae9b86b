//! 分配（訂單保留量）模型與狀態機轉換表

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::{MrpError, OwnerType};

/// 分配狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AllocationStatus {
    /// 已保留
    Active,
    /// 已揀料
    Picked,
    /// 已發料至工單
    Issued,
    /// 已耗用
    Consumed,
    /// 已退回庫存
    Returned,
    /// 轉為現場庫存（不再追蹤）
    FloorStock,
    /// 已取消
    Cancelled,
}

impl AllocationStatus {
    /// 是否計入已分配數量
    pub fn holds_reservation(self) -> bool {
        matches!(self, Self::Active | Self::Picked | Self::Issued)
    }

    /// 是否為終止狀態
    pub fn is_terminal(self) -> bool {
        !self.holds_reservation()
    }

    /// 套用事件，回傳下一個狀態
    pub fn next(self, event: AllocationEvent) -> Option<AllocationStatus> {
        TRANSITIONS
            .iter()
            .find(|(from, ev, _)| *from == self && *ev == event)
            .map(|(_, _, to)| *to)
    }
}

impl fmt::Display for AllocationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Active => "ACTIVE",
            Self::Picked => "PICKED",
            Self::Issued => "ISSUED",
            Self::Consumed => "CONSUMED",
            Self::Returned => "RETURNED",
            Self::FloorStock => "FLOOR_STOCK",
            Self::Cancelled => "CANCELLED",
        };
        f.write_str(name)
    }
}

/// 驅動狀態轉換的事件
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AllocationEvent {
    Pick,
    Issue,
    Consume,
    Return,
    FloorStock,
    Cancel,
}

impl AllocationEvent {
    /// 事件要求的目標狀態
    pub fn target(self) -> AllocationStatus {
        match self {
            Self::Pick => AllocationStatus::Picked,
            Self::Issue => AllocationStatus::Issued,
            Self::Consume => AllocationStatus::Consumed,
            Self::Return => AllocationStatus::Returned,
            Self::FloorStock => AllocationStatus::FloorStock,
            Self::Cancel => AllocationStatus::Cancelled,
        }
    }
}

/// 合法轉換表：(目前狀態, 事件, 下一狀態)
pub const TRANSITIONS: &[(AllocationStatus, AllocationEvent, AllocationStatus)] = &[
    (AllocationStatus::Active, AllocationEvent::Pick, AllocationStatus::Picked),
    (AllocationStatus::Active, AllocationEvent::Cancel, AllocationStatus::Cancelled),
    (AllocationStatus::Picked, AllocationEvent::Issue, AllocationStatus::Issued),
    (AllocationStatus::Picked, AllocationEvent::Cancel, AllocationStatus::Cancelled),
    (AllocationStatus::Issued, AllocationEvent::Consume, AllocationStatus::Consumed),
    (AllocationStatus::Issued, AllocationEvent::Return, AllocationStatus::Returned),
    (AllocationStatus::Issued, AllocationEvent::FloorStock, AllocationStatus::FloorStock),
];

/// 退料處置方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReturnAction {
    /// 退回可用庫存
    Return,
    /// 留在現場作為非正式可用庫存
    FloorStock,
}

impl ReturnAction {
    pub fn event(self) -> AllocationEvent {
        match self {
            Self::Return => AllocationEvent::Return,
            Self::FloorStock => AllocationEvent::FloorStock,
        }
    }
}

/// 退料對帳結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnOutcome {
    pub issued_quantity: Decimal,
    pub counted_quantity: Decimal,
    pub consumed_quantity: Decimal,
    pub waste_quantity: Decimal,
    /// 未說明差異 = 發料 - 點收 - 耗用 - 報廢
    pub variance: Decimal,
    pub action: ReturnAction,
}

impl ReturnOutcome {
    pub fn new(
        issued_quantity: Decimal,
        counted_quantity: Decimal,
        consumed_quantity: Decimal,
        waste_quantity: Decimal,
        action: ReturnAction,
    ) -> Self {
        Self {
            issued_quantity,
            counted_quantity,
            consumed_quantity,
            waste_quantity,
            variance: issued_quantity - counted_quantity - consumed_quantity - waste_quantity,
            action,
        }
    }

    pub fn has_variance(&self) -> bool {
        !self.variance.is_zero()
    }

    /// 結案後仍留在工單保管、未回到可用庫存的數量
    ///
    /// RETURN 只有點收量經 RETURN_FROM_WO 回庫，剩下差異；
    /// FLOOR_STOCK 點收量留在現場，連同差異一起保管。
    pub fn retained_quantity(&self) -> Decimal {
        match self.action {
            ReturnAction::Return => self.variance,
            ReturnAction::FloorStock => self.counted_quantity + self.variance,
        }
    }
}

/// 差異警示（非錯誤）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarianceWarning {
    pub allocation_id: Uuid,
    pub material_id: String,
    pub variance: Decimal,
}

/// 分配記錄
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Allocation {
    /// 分配ID
    pub id: Uuid,

    /// 訂單ID
    pub order_id: String,

    /// 物料ID
    pub material_id: String,

    /// 保留數量（建立後不變）
    pub quantity: Decimal,

    /// 狀態
    pub status: AllocationStatus,

    /// 所有權（與來源庫存一致）
    pub owner_type: OwnerType,
    pub owner_id: Option<String>,

    /// 保留原因
    pub reason: Option<String>,

    /// 來源 BOM 行
    pub bom_item_id: Option<Uuid>,

    /// BOM 行的資源類型標記（如錫膏、膠水）
    pub resource_type: Option<String>,

    /// 退料對帳結果
    pub return_outcome: Option<ReturnOutcome>,

    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub picked_at: Option<DateTime<Utc>>,
    pub issued_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Allocation {
    /// 創建新的分配（狀態為 ACTIVE）
    pub fn new(
        order_id: String,
        material_id: String,
        quantity: Decimal,
        created_by: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            order_id,
            material_id,
            quantity,
            status: AllocationStatus::Active,
            owner_type: OwnerType::Company,
            owner_id: None,
            reason: None,
            bom_item_id: None,
            resource_type: None,
            return_outcome: None,
            created_by,
            created_at: now,
            updated_at: now,
            picked_at: None,
            issued_at: None,
            closed_at: None,
        }
    }

    /// 建構器模式：設置所有權
    pub fn with_owner(mut self, owner_type: OwnerType, owner_id: Option<String>) -> Self {
        self.owner_type = owner_type;
        self.owner_id = owner_id;
        self
    }

    /// 建構器模式：設置原因
    pub fn with_reason(mut self, reason: String) -> Self {
        self.reason = Some(reason);
        self
    }

    /// 建構器模式：設置 BOM 行
    pub fn with_bom_item(mut self, bom_item_id: Uuid, resource_type: Option<String>) -> Self {
        self.bom_item_id = Some(bom_item_id);
        self.resource_type = resource_type;
        self
    }

    /// 檢查事件是否合法（不修改狀態）
    pub fn check(&self, event: AllocationEvent) -> crate::Result<AllocationStatus> {
        self.status
            .next(event)
            .ok_or(MrpError::InvalidTransition {
                allocation_id: self.id,
                from: self.status,
                to: event.target(),
            })
    }

    /// 套用事件；只改變狀態與時間戳，從不改變數量
    pub fn apply(&mut self, event: AllocationEvent) -> crate::Result<AllocationStatus> {
        let next = self.check(event)?;
        let now = Utc::now();

        self.status = next;
        self.updated_at = now;
        match next {
            AllocationStatus::Picked => self.picked_at = Some(now),
            AllocationStatus::Issued => self.issued_at = Some(now),
            _ => self.closed_at = Some(now),
        }

        Ok(next)
    }

    /// 是否計入已分配數量
    pub fn is_reserving(&self) -> bool {
        self.status.holds_reservation()
    }
}
