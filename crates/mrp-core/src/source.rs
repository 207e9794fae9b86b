//! 外部協作系統介面（唯讀）
//!
//! 訂單、BOM 與庫存數字都由外部提供；計算層只透過這些 trait 讀取。

use std::collections::HashMap;

use crate::{BomRevision, Order, StockSnapshot};

/// 訂單來源
pub trait OrderSource: Send + Sync {
    /// 分頁讀取訂單（依 order_id 穩定排序）
    fn orders_page(&self, offset: usize, limit: usize) -> Vec<Order>;

    /// 讀取單一訂單
    fn order(&self, order_id: &str) -> Option<Order>;
}

/// BOM 來源
pub trait BomSource: Send + Sync {
    fn revision(&self, revision_id: &str) -> Option<BomRevision>;
}

/// 庫存數字來源
pub trait StockSource: Send + Sync {
    fn stock(&self, material_id: &str) -> crate::Result<StockSnapshot>;
}

impl StockSource for HashMap<String, StockSnapshot> {
    fn stock(&self, material_id: &str) -> crate::Result<StockSnapshot> {
        self.get(material_id)
            .cloned()
            .ok_or_else(|| crate::MrpError::not_found("物料", material_id))
    }
}

/// 記憶體中的訂單與 BOM 快照
#[derive(Debug, Clone, Default)]
pub struct PlanningSnapshot {
    orders: Vec<Order>,
    revisions: HashMap<String, BomRevision>,
}

impl PlanningSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加訂單
    pub fn add_order(&mut self, order: Order) {
        self.orders.retain(|o| o.order_id != order.order_id);
        self.orders.push(order);
        self.orders.sort_by(|a, b| a.order_id.cmp(&b.order_id));
    }

    /// 添加 BOM 版本
    pub fn add_revision(&mut self, revision: BomRevision) {
        self.revisions.insert(revision.revision_id.clone(), revision);
    }

    /// 建構器模式：添加訂單
    pub fn with_order(mut self, order: Order) -> Self {
        self.add_order(order);
        self
    }

    /// 建構器模式：添加 BOM 版本
    pub fn with_revision(mut self, revision: BomRevision) -> Self {
        self.add_revision(revision);
        self
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }
}

impl OrderSource for PlanningSnapshot {
    fn orders_page(&self, offset: usize, limit: usize) -> Vec<Order> {
        self.orders.iter().skip(offset).take(limit).cloned().collect()
    }

    fn order(&self, order_id: &str) -> Option<Order> {
        self.orders.iter().find(|o| o.order_id == order_id).cloned()
    }
}

impl BomSource for PlanningSnapshot {
    fn revision(&self, revision_id: &str) -> Option<BomRevision> {
        self.revisions.get(revision_id).cloned()
    }
}
