//! MRP 計劃配置

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::MrpError;

/// 需求基準
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DemandBasis {
    /// 以訂購數量計算（預設）
    OrderQuantity,
    /// 只計算未出貨數量
    RemainingQuantity,
}

/// 單一訂單缺料歸屬方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShortageAttribution {
    /// 依交期優先順序模擬分配共享庫存（預設）
    DueDatePriority,
    /// 直接沿用物料層級的全域缺料（較簡化）
    GlobalShortage,
}

/// 計劃配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanningConfig {
    /// 需求基準
    pub demand_basis: DemandBasis,

    /// 缺料歸屬方式
    pub shortage_attribution: ShortageAttribution,

    /// 缺料與淨需求的小數位數
    pub quantity_precision: u32,

    /// 每批掃描的訂單數
    pub order_batch_size: usize,

    /// 差異容許值（絕對值不超過此值時不發出警示）
    pub variance_tolerance: Decimal,
}

impl Default for PlanningConfig {
    fn default() -> Self {
        Self {
            demand_basis: DemandBasis::OrderQuantity,
            shortage_attribution: ShortageAttribution::DueDatePriority,
            quantity_precision: 4,
            order_batch_size: 500,
            variance_tolerance: Decimal::ZERO,
        }
    }
}

impl PlanningConfig {
    /// 創建預設配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 從 JSON 載入配置
    pub fn from_json_str(json: &str) -> crate::Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| MrpError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// 檢查配置
    pub fn validate(&self) -> crate::Result<()> {
        if self.order_batch_size == 0 {
            return Err(MrpError::Config("order_batch_size 必須大於 0".to_string()));
        }
        if self.variance_tolerance < Decimal::ZERO {
            return Err(MrpError::Config("variance_tolerance 不可為負數".to_string()));
        }
        if self.quantity_precision > 28 {
            return Err(MrpError::Config("quantity_precision 不可超過 28".to_string()));
        }
        Ok(())
    }

    /// 建構器模式：設置需求基準
    pub fn with_demand_basis(mut self, basis: DemandBasis) -> Self {
        self.demand_basis = basis;
        self
    }

    /// 建構器模式：設置缺料歸屬方式
    pub fn with_shortage_attribution(mut self, attribution: ShortageAttribution) -> Self {
        self.shortage_attribution = attribution;
        self
    }

    /// 建構器模式：設置小數位數
    pub fn with_quantity_precision(mut self, precision: u32) -> Self {
        self.quantity_precision = precision;
        self
    }

    /// 建構器模式：設置批次大小
    pub fn with_order_batch_size(mut self, size: usize) -> Self {
        self.order_batch_size = size.max(1);
        self
    }

    /// 建構器模式：設置差異容許值
    pub fn with_variance_tolerance(mut self, tolerance: Decimal) -> Self {
        self.variance_tolerance = tolerance;
        self
    }

    /// 缺料數量進位（遠離零，避免少買）
    pub fn round_shortage(&self, quantity: Decimal) -> Decimal {
        quantity.round_dp_with_strategy(self.quantity_precision, RoundingStrategy::AwayFromZero)
    }

    /// 差異是否超過容許值
    pub fn exceeds_variance_tolerance(&self, variance: Decimal) -> bool {
        variance.abs() > self.variance_tolerance
    }
}
