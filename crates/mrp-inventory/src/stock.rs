//! 庫存彙總

use mrp_core::{StockSnapshot, StockSource};

use crate::store::InventoryStore;

/// 庫存彙總器
pub struct StockAggregator;

impl StockAggregator {
    /// 單一物料快照；現有與已分配在同一把列鎖內讀取
    pub fn snapshot(store: &InventoryStore, material_id: &str) -> mrp_core::Result<StockSnapshot> {
        let on_order = store.on_order(material_id);
        store.with_book(material_id, |book| Ok(book.snapshot(on_order)))
    }

    /// 全部物料快照（依物料ID排序）
    pub fn snapshot_all(store: &InventoryStore) -> Vec<StockSnapshot> {
        store
            .material_ids()
            .iter()
            .filter_map(|id| Self::snapshot(store, id).ok())
            .collect()
    }
}

impl StockSource for InventoryStore {
    fn stock(&self, material_id: &str) -> mrp_core::Result<StockSnapshot> {
        StockAggregator::snapshot(self, material_id)
    }
}
