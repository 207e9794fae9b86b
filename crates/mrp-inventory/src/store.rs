//! 庫存存放區
//!
//! 每個物料一把列鎖，所有寫入只鎖定受影響的物料帳冊，不使用整表鎖。

use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;
use rust_decimal::Decimal;
use uuid::Uuid;

use mrp_core::{Allocation, Material, MrpError, PurchaseOrderLine, Transaction};

use crate::book::MaterialBook;

/// 庫存存放區
#[derive(Debug, Default)]
pub struct InventoryStore {
    /// 物料 → 帳冊（列鎖）
    books: DashMap<String, Arc<Mutex<MaterialBook>>>,

    /// 分配 → 物料
    allocation_index: DashMap<Uuid, String>,

    /// 訂單 → 分配
    order_index: DashMap<String, Vec<Uuid>>,

    /// 物料 → 採購單行（唯讀協作資料）
    purchase_lines: DashMap<String, Vec<PurchaseOrderLine>>,
}

impl InventoryStore {
    /// 創建空的存放區
    pub fn new() -> Self {
        Self::default()
    }

    /// 登記物料；重複登記不會覆蓋既有帳冊
    pub fn register_material(&self, material: Material) {
        self.books
            .entry(material.material_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(MaterialBook::new(material))));
    }

    /// 登記採購單行（同一行ID重複登記時取代）
    pub fn register_purchase_line(&self, line: PurchaseOrderLine) {
        let mut lines = self.purchase_lines.entry(line.material_id.clone()).or_default();
        lines.retain(|l| l.id != line.id);
        lines.push(line);
    }

    pub fn contains_material(&self, material_id: &str) -> bool {
        self.books.contains_key(material_id)
    }

    /// 所有已登記物料（排序）
    pub fn material_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.books.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    fn book(&self, material_id: &str) -> mrp_core::Result<Arc<Mutex<MaterialBook>>> {
        self.books
            .get(material_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| MrpError::not_found("物料", material_id))
    }

    /// 在物料列鎖內執行操作
    pub fn with_book<T>(
        &self,
        material_id: &str,
        f: impl FnOnce(&mut MaterialBook) -> mrp_core::Result<T>,
    ) -> mrp_core::Result<T> {
        let book = self.book(material_id)?;
        let mut guard = book.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// 分配所屬物料
    pub fn material_of(&self, allocation_id: Uuid) -> mrp_core::Result<String> {
        self.allocation_index
            .get(&allocation_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| MrpError::not_found("分配", allocation_id))
    }

    /// 在分配所屬物料的列鎖內執行操作
    pub fn with_allocation<T>(
        &self,
        allocation_id: Uuid,
        f: impl FnOnce(&mut MaterialBook) -> mrp_core::Result<T>,
    ) -> mrp_core::Result<T> {
        let material_id = self.material_of(allocation_id)?;
        self.with_book(&material_id, f)
    }

    /// 附加分類帳分錄，回傳異動ID
    pub fn append(&self, tx: Transaction) -> mrp_core::Result<Uuid> {
        let material_id = tx.material_id.clone();
        let transaction_type = tx.transaction_type;
        let quantity = tx.quantity;

        let id = self.with_book(&material_id, |book| book.post(tx))?;
        tracing::debug!(
            "分類帳附加: {} {} {} ({})",
            material_id,
            transaction_type,
            quantity,
            id
        );
        Ok(id)
    }

    /// 以補償分錄沖銷既有分錄
    pub fn reverse(
        &self,
        material_id: &str,
        transaction_id: Uuid,
        created_by: &str,
    ) -> mrp_core::Result<Uuid> {
        let id = self.with_book(material_id, |book| book.reverse(transaction_id, created_by))?;
        tracing::info!("異動 {} 已沖銷，補償分錄 {}", transaction_id, id);
        Ok(id)
    }

    /// 物料全部分錄（依寫入順序）
    pub fn transactions(&self, material_id: &str) -> mrp_core::Result<Vec<Transaction>> {
        self.with_book(material_id, |book| Ok(book.ledger().entries().to_vec()))
    }

    /// 新增分配（在物料列鎖內檢查可用量）
    pub fn insert_allocation(&self, allocation: Allocation) -> mrp_core::Result<Uuid> {
        let material_id = allocation.material_id.clone();
        let order_id = allocation.order_id.clone();

        let id = self.with_book(&material_id, |book| book.reserve(allocation))?;
        self.allocation_index.insert(id, material_id);
        self.order_index.entry(order_id).or_default().push(id);
        Ok(id)
    }

    /// 讀取分配
    pub fn allocation(&self, allocation_id: Uuid) -> mrp_core::Result<Allocation> {
        self.with_allocation(allocation_id, |book| {
            book.allocation(allocation_id)
                .cloned()
                .ok_or_else(|| MrpError::not_found("分配", allocation_id))
        })
    }

    /// 訂單的分配ID（依建立順序）
    pub fn order_allocation_ids(&self, order_id: &str) -> Vec<Uuid> {
        self.order_index
            .get(order_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// 訂單的全部分配
    pub fn allocations_for_order(&self, order_id: &str) -> Vec<Allocation> {
        self.order_allocation_ids(order_id)
            .into_iter()
            .filter_map(|id| self.allocation(id).ok())
            .collect()
    }

    /// 物料採購在途量
    pub fn on_order(&self, material_id: &str) -> Decimal {
        self.purchase_lines
            .get(material_id)
            .map(|lines| lines.iter().map(|l| l.outstanding()).sum())
            .unwrap_or(Decimal::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mrp_core::{TransactionType, UnitOfMeasure};

    fn store() -> InventoryStore {
        let store = InventoryStore::new();
        store.register_material(Material::new("FUSE-2A".to_string(), UnitOfMeasure::Each));
        store
    }

    fn receipt(quantity: i64) -> Transaction {
        Transaction::new(
            "FUSE-2A".to_string(),
            Decimal::from(quantity),
            TransactionType::Receipt,
            "receiving".to_string(),
        )
    }

    #[test]
    fn test_append_unknown_material() {
        let store = store();
        let tx = Transaction::new(
            "UNKNOWN".to_string(),
            Decimal::ONE,
            TransactionType::Receipt,
            "receiving".to_string(),
        );
        assert!(matches!(store.append(tx), Err(MrpError::NotFound { .. })));
    }

    #[test]
    fn test_register_material_keeps_existing_book() {
        let store = store();
        store.append(receipt(10)).unwrap();
        store.register_material(Material::new("FUSE-2A".to_string(), UnitOfMeasure::Each));

        assert_eq!(store.transactions("FUSE-2A").unwrap().len(), 1);
        assert_eq!(store.material_ids(), vec!["FUSE-2A".to_string()]);
    }

    #[test]
    fn test_allocation_indexes() {
        let store = store();
        store.append(receipt(10)).unwrap();

        let id = store
            .insert_allocation(Allocation::new(
                "SO-7".to_string(),
                "FUSE-2A".to_string(),
                Decimal::from(4),
                "planner".to_string(),
            ))
            .unwrap();

        assert_eq!(store.material_of(id).unwrap(), "FUSE-2A");
        assert_eq!(store.order_allocation_ids("SO-7"), vec![id]);
        assert_eq!(store.allocations_for_order("SO-7")[0].quantity, Decimal::from(4));
        assert!(store.order_allocation_ids("SO-8").is_empty());
        assert!(store.allocation(Uuid::new_v4()).is_err());
    }

    #[test]
    fn test_on_order_sums_outstanding_lines() {
        let store = store();
        store.register_purchase_line(PurchaseOrderLine::new(
            "PO-1".to_string(),
            "FUSE-2A".to_string(),
            Decimal::from(100),
        ));
        store.register_purchase_line(
            PurchaseOrderLine::new("PO-2".to_string(), "FUSE-2A".to_string(), Decimal::from(50))
                .with_quantity_received(Decimal::from(20)),
        );

        assert_eq!(store.on_order("FUSE-2A"), Decimal::from(130));
        assert_eq!(store.on_order("OTHER"), Decimal::ZERO);
    }
}
