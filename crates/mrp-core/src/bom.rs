//! BOM 版本與 BOM 行（外部 BOM 系統的唯讀視圖）

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// BOM 行
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BomItem {
    pub id: Uuid,

    /// 子件物料
    pub material_id: String,

    /// 每單位成品用量
    pub quantity_required: Decimal,

    /// 資源類型標記（如 SMT、THT、ADHESIVE）
    pub resource_type: Option<String>,

    /// 位號
    pub reference_designator: Option<String>,
}

impl BomItem {
    pub fn new(material_id: String, quantity_required: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            material_id,
            quantity_required,
            resource_type: None,
            reference_designator: None,
        }
    }

    /// 建構器模式：設置資源類型
    pub fn with_resource_type(mut self, resource_type: String) -> Self {
        self.resource_type = Some(resource_type);
        self
    }

    /// 建構器模式：設置位號
    pub fn with_reference_designator(mut self, designator: String) -> Self {
        self.reference_designator = Some(designator);
        self
    }

    /// 用量必須為正數
    pub fn is_valid(&self) -> bool {
        self.quantity_required > Decimal::ZERO
    }
}

/// BOM 版本
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BomRevision {
    pub revision_id: String,

    /// 父件（成品組件）
    pub product_id: String,

    /// 版本號
    pub revision: String,

    pub is_active: bool,

    pub items: Vec<BomItem>,
}

impl BomRevision {
    pub fn new(revision_id: String, product_id: String, revision: String) -> Self {
        Self {
            revision_id,
            product_id,
            revision,
            is_active: true,
            items: Vec::new(),
        }
    }

    /// 建構器模式：設置 BOM 行
    pub fn with_items(mut self, items: Vec<BomItem>) -> Self {
        self.items = items;
        self
    }

    /// 添加 BOM 行
    pub fn add_item(&mut self, item: BomItem) {
        self.items.push(item);
    }

    /// 建構器模式：設置為停用
    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }
}
