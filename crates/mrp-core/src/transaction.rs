//! 庫存異動（分類帳分錄）

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// 異動類型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    /// 收貨
    Receipt,
    /// 耗用
    Consumption,
    /// 調整（盤點）
    Adjustment,
    /// 報廢
    Scrap,
    /// 調撥
    Transfer,
    /// 發料至工單
    IssueToWo,
    /// 工單退料
    ReturnFromWo,
}

/// 數量符號規則
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignRule {
    Positive,
    Negative,
    Either,
}

impl TransactionType {
    /// 該類型允許的數量符號
    pub fn sign_rule(self) -> SignRule {
        match self {
            Self::Receipt | Self::ReturnFromWo => SignRule::Positive,
            Self::Consumption | Self::Scrap | Self::IssueToWo => SignRule::Negative,
            Self::Adjustment | Self::Transfer => SignRule::Either,
        }
    }

    /// 保管移轉備忘分錄：記錄庫存與在製品之間的保管變化，不影響現有庫存
    pub fn is_custody_memo(self) -> bool {
        matches!(self, Self::IssueToWo | Self::ReturnFromWo)
    }

    /// 零數量是否允許（僅盤點調整）
    pub fn allows_zero(self) -> bool {
        self == Self::Adjustment
    }

    /// 檢查數量是否符合此類型
    pub fn validate_quantity(self, quantity: Decimal) -> crate::Result<()> {
        if quantity.is_zero() {
            if self.allows_zero() {
                return Ok(());
            }
            return Err(crate::MrpError::InvalidQuantity(format!(
                "{} 異動數量不可為零",
                self
            )));
        }

        let ok = match self.sign_rule() {
            SignRule::Positive => quantity > Decimal::ZERO,
            SignRule::Negative => quantity < Decimal::ZERO,
            SignRule::Either => true,
        };

        if ok {
            Ok(())
        } else {
            Err(crate::MrpError::InvalidQuantity(format!(
                "{} 異動數量符號錯誤: {}",
                self, quantity
            )))
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Receipt => "RECEIPT",
            Self::Consumption => "CONSUMPTION",
            Self::Adjustment => "ADJUSTMENT",
            Self::Scrap => "SCRAP",
            Self::Transfer => "TRANSFER",
            Self::IssueToWo => "ISSUE_TO_WO",
            Self::ReturnFromWo => "RETURN_FROM_WO",
        };
        f.write_str(name)
    }
}

/// 庫存所有權（支援客供料寄售）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OwnerType {
    Company,
    Customer,
}

/// 來源單據參照
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    /// 參照類型（如 ORDER、ALLOCATION、CYCLE_COUNT、TRANSACTION）
    pub reference_type: String,
    /// 參照ID
    pub reference_id: String,
}

impl Reference {
    pub fn new(reference_type: impl Into<String>, reference_id: impl ToString) -> Self {
        Self {
            reference_type: reference_type.into(),
            reference_id: reference_id.to_string(),
        }
    }

    pub fn order(order_id: &str) -> Self {
        Self::new("ORDER", order_id)
    }

    pub fn allocation(allocation_id: Uuid) -> Self {
        Self::new("ALLOCATION", allocation_id)
    }

    pub fn transaction(transaction_id: Uuid) -> Self {
        Self::new("TRANSACTION", transaction_id)
    }
}

/// 庫存異動分錄（寫入後不可變更，更正一律以新分錄處理）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// 異動ID
    pub id: Uuid,

    /// 物料ID
    pub material_id: String,

    /// 帶符號數量（正數增加、負數減少）
    pub quantity: Decimal,

    /// 異動類型
    pub transaction_type: TransactionType,

    /// 來源單據
    pub reference: Option<Reference>,

    /// 單位成本
    pub unit_cost: Option<Decimal>,

    /// 所有權類型
    pub owner_type: OwnerType,

    /// 所有者（客戶寄售時填入）
    pub owner_id: Option<String>,

    /// 儲位（保留擴充點，不強制）
    pub location_id: Option<String>,

    pub created_by: String,

    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// 創建新的異動分錄
    pub fn new(
        material_id: String,
        quantity: Decimal,
        transaction_type: TransactionType,
        created_by: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            material_id,
            quantity,
            transaction_type,
            reference: None,
            unit_cost: None,
            owner_type: OwnerType::Company,
            owner_id: None,
            location_id: None,
            created_by,
            created_at: Utc::now(),
        }
    }

    /// 建構器模式：設置來源單據
    pub fn with_reference(mut self, reference: Reference) -> Self {
        self.reference = Some(reference);
        self
    }

    /// 建構器模式：設置單位成本
    pub fn with_unit_cost(mut self, unit_cost: Decimal) -> Self {
        self.unit_cost = Some(unit_cost);
        self
    }

    /// 建構器模式：設置所有權
    pub fn with_owner(mut self, owner_type: OwnerType, owner_id: Option<String>) -> Self {
        self.owner_type = owner_type;
        self.owner_id = owner_id;
        self
    }

    /// 建構器模式：設置儲位
    pub fn with_location_id(mut self, location_id: String) -> Self {
        self.location_id = Some(location_id);
        self
    }

    /// 對現有庫存的影響量（保管備忘分錄為零）
    pub fn stock_effect(&self) -> Decimal {
        if self.transaction_type.is_custody_memo() {
            Decimal::ZERO
        } else {
            self.quantity
        }
    }
}
