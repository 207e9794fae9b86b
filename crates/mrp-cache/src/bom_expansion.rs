//! BOM 展開緩存

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use mrp_core::BomRevision;

/// 展開後的物料行（同一物料的多個 BOM 行合併）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpandedLine {
    pub material_id: String,

    /// 每單位成品合計用量
    pub quantity_per: Decimal,

    /// 出現過的資源類型標記
    pub resource_types: BTreeSet<String>,

    /// 是否有未標記資源類型的 BOM 行
    pub has_untagged: bool,

    pub bom_item_ids: Vec<Uuid>,
}

/// 單一 BOM 版本的展開結果
#[derive(Debug, Clone, Serialize)]
pub struct BomExpansion {
    pub revision_id: String,
    pub product_id: String,

    /// 依物料ID排序
    pub lines: Vec<ExpandedLine>,

    /// 用量不合法而略過的 BOM 行數
    pub skipped_items: usize,
}

impl BomExpansion {
    /// 展開 BOM 版本
    pub fn from_revision(revision: &BomRevision) -> Self {
        let mut merged: BTreeMap<String, ExpandedLine> = BTreeMap::new();
        let mut skipped_items = 0;

        for item in &revision.items {
            if !item.is_valid() {
                skipped_items += 1;
                continue;
            }

            let line = merged
                .entry(item.material_id.clone())
                .or_insert_with(|| ExpandedLine {
                    material_id: item.material_id.clone(),
                    quantity_per: Decimal::ZERO,
                    resource_types: BTreeSet::new(),
                    has_untagged: false,
                    bom_item_ids: Vec::new(),
                });

            line.quantity_per += item.quantity_required;
            line.bom_item_ids.push(item.id);
            match &item.resource_type {
                Some(tag) => {
                    line.resource_types.insert(tag.clone());
                }
                None => line.has_untagged = true,
            }
        }

        Self {
            revision_id: revision.revision_id.clone(),
            product_id: revision.product_id.clone(),
            lines: merged.into_values().collect(),
            skipped_items,
        }
    }
}

/// 緩存統計
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// BOM 展開緩存，鍵為 (成品, 版本)
#[derive(Debug, Default)]
pub struct BomExpansionCache {
    entries: DashMap<(String, String), Arc<BomExpansion>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl BomExpansionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 取得展開結果，未緩存時展開並保存
    pub fn get_or_expand(&self, revision: &BomRevision) -> Arc<BomExpansion> {
        let key = (revision.product_id.clone(), revision.revision_id.clone());

        if let Some(hit) = self.entries.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Arc::clone(hit.value());
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let expansion = Arc::new(BomExpansion::from_revision(revision));
        tracing::debug!(
            "展開 BOM: {} 版本 {}，物料 {} 種",
            revision.product_id,
            revision.revision_id,
            expansion.lines.len()
        );

        Arc::clone(
            self.entries
                .entry(key)
                .or_insert_with(|| Arc::clone(&expansion))
                .value(),
        )
    }

    /// BOM 版本內容變更時清除
    pub fn invalidate(&self, product_id: &str, revision_id: &str) -> bool {
        self.entries
            .remove(&(product_id.to_string(), revision_id.to_string()))
            .is_some()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.len(),
        }
    }
}
