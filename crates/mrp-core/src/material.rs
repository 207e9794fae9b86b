//! 物料主檔

use serde::{Deserialize, Serialize};

/// 計量單位
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitOfMeasure {
    /// 個
    Each,
    /// 公克
    Gram,
    /// 公尺
    Meter,
    /// 毫升
    Milliliter,
    /// 其他自訂單位
    Other(String),
}

/// 物料（本核心只作為外鍵使用）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Material {
    /// 物料ID
    pub material_id: String,

    /// 描述
    pub description: Option<String>,

    /// 計量單位
    pub unit_of_measure: UnitOfMeasure,
}

impl Material {
    /// 創建新的物料
    pub fn new(material_id: String, unit_of_measure: UnitOfMeasure) -> Self {
        Self {
            material_id,
            description: None,
            unit_of_measure,
        }
    }

    /// 建構器模式：設置描述
    pub fn with_description(mut self, description: String) -> Self {
        self.description = Some(description);
        self
    }
}
