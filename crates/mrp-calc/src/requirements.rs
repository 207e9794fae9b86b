//! 需求彙總：掃描未結訂單，依 BOM 展開並按物料累加需求

use std::collections::{BTreeMap, BTreeSet, HashSet};

use rayon::prelude::*;
use rust_decimal::Decimal;
use serde::Serialize;

use mrp_cache::BomExpansionCache;
use mrp_core::{BomSource, Order, OrderSource, PlanningConfig, StockSnapshot, StockSource};

use crate::netting::NettingCalculator;
use crate::{MrpWarning, ReportDiagnostics};

/// 物料需求行
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequirementLine {
    pub material_id: String,

    /// 所有未結訂單的總需求
    pub total_required: Decimal,

    pub on_hand: Decimal,
    pub allocated: Decimal,
    pub available: Decimal,
    pub on_order: Decimal,

    /// 淨需求 = max(0, 總需求 - 可用 - 在途)
    pub net_requirement: Decimal,

    /// 需要此物料的訂單數
    pub order_count: usize,
}

/// 單一訂單對某物料的需求
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderDemandLine {
    pub material_id: String,
    pub required: Decimal,
    pub resource_types: BTreeSet<String>,
    pub has_untagged: bool,
}

/// 單一訂單的需求明細
#[derive(Debug, Clone, Serialize)]
pub struct OrderDemand {
    pub order: Order,

    /// 成品（BOM 的父件）
    pub product_id: String,

    /// 依需求基準計算的成品數量
    pub quantity: Decimal,

    /// 依物料ID排序
    pub lines: Vec<OrderDemandLine>,
}

/// 需求彙總報表
#[derive(Debug, Clone, Default, Serialize)]
pub struct RequirementsReport {
    /// 依物料ID排序
    pub lines: Vec<RequirementLine>,

    /// 每張計入的訂單的需求明細（依訂單ID排序）
    pub order_demands: Vec<OrderDemand>,

    pub diagnostics: ReportDiagnostics,

    /// 計算耗時（毫秒）
    pub calculation_time_ms: Option<u128>,
}

impl RequirementsReport {
    /// 查詢物料需求行
    pub fn line(&self, material_id: &str) -> Option<&RequirementLine> {
        self.lines
            .binary_search_by(|l| l.material_id.as_str().cmp(material_id))
            .ok()
            .map(|i| &self.lines[i])
    }
}

/// 需求彙總計算器
pub struct RequirementsCalculator;

impl RequirementsCalculator {
    /// 計算需求彙總
    ///
    /// 訂單分批讀取；不合法的訂單、BOM 行或物料會被略過並記入診斷資訊。
    pub fn calculate(
        orders: &dyn OrderSource,
        boms: &dyn BomSource,
        stock: &dyn StockSource,
        cache: &BomExpansionCache,
        config: &PlanningConfig,
    ) -> RequirementsReport {
        let start_time = std::time::Instant::now();
        let mut diagnostics = ReportDiagnostics::default();

        let mut order_demands = Self::collect_demands(orders, boms, cache, config, &mut diagnostics);

        // 按物料累加
        let mut totals: BTreeMap<String, (Decimal, usize)> = BTreeMap::new();
        for demand in &order_demands {
            for line in &demand.lines {
                let entry = totals
                    .entry(line.material_id.clone())
                    .or_insert((Decimal::ZERO, 0));
                entry.0 += line.required;
                entry.1 += 1;
            }
        }

        // 並行讀取庫存快照
        let material_ids: Vec<&String> = totals.keys().collect();
        let snapshots: Vec<(String, mrp_core::Result<StockSnapshot>)> = material_ids
            .par_iter()
            .map(|id| ((*id).clone(), stock.stock(id)))
            .collect();

        let mut lines = Vec::with_capacity(snapshots.len());
        let mut unknown: HashSet<String> = HashSet::new();

        for (material_id, snapshot) in snapshots {
            let snapshot = match snapshot {
                Ok(s) => s,
                Err(e) => {
                    diagnostics.materials_skipped += 1;
                    diagnostics.add_warning(MrpWarning::warning(
                        material_id.clone(),
                        format!("略過物料：{}", e),
                    ));
                    unknown.insert(material_id);
                    continue;
                }
            };

            let Some(&(total_required, order_count)) = totals.get(&material_id) else {
                continue;
            };

            lines.push(RequirementLine {
                net_requirement: config.round_shortage(NettingCalculator::net_requirement(
                    total_required,
                    snapshot.available,
                    snapshot.on_order,
                )),
                material_id,
                total_required,
                on_hand: snapshot.on_hand,
                allocated: snapshot.allocated,
                available: snapshot.available,
                on_order: snapshot.on_order,
                order_count,
            });
        }

        if !unknown.is_empty() {
            for demand in &mut order_demands {
                demand.lines.retain(|l| !unknown.contains(&l.material_id));
            }
        }

        lines.sort_by(|a, b| a.material_id.cmp(&b.material_id));

        tracing::info!(
            "需求彙總完成：訂單 {} 張（略過 {}），物料 {} 種，耗時 {:?}",
            diagnostics.orders_included,
            diagnostics.orders_skipped,
            lines.len(),
            start_time.elapsed()
        );

        RequirementsReport {
            lines,
            order_demands,
            diagnostics,
            calculation_time_ms: Some(start_time.elapsed().as_millis()),
        }
    }

    /// 分批掃描訂單並展開 BOM
    fn collect_demands(
        orders: &dyn OrderSource,
        boms: &dyn BomSource,
        cache: &BomExpansionCache,
        config: &PlanningConfig,
        diagnostics: &mut ReportDiagnostics,
    ) -> Vec<OrderDemand> {
        let batch_size = config.order_batch_size.max(1);
        let mut demands = Vec::new();
        let mut counted_revisions: HashSet<String> = HashSet::new();
        let mut offset = 0;

        loop {
            let page = orders.orders_page(offset, batch_size);
            let page_len = page.len();
            tracing::debug!("讀取訂單批次：offset {}，{} 筆", offset, page_len);

            for order in page {
                diagnostics.orders_scanned += 1;

                if !order.is_open() {
                    continue;
                }

                if order.quantity <= Decimal::ZERO {
                    diagnostics.orders_skipped += 1;
                    diagnostics.add_warning(MrpWarning::warning(
                        order.order_id.clone(),
                        format!("訂單數量不合法：{}", order.quantity),
                    ));
                    continue;
                }

                let Some(revision) = boms.revision(&order.bom_revision_id) else {
                    diagnostics.orders_skipped += 1;
                    diagnostics.add_warning(MrpWarning::warning(
                        order.order_id.clone(),
                        format!("找不到 BOM 版本：{}", order.bom_revision_id),
                    ));
                    continue;
                };

                let expansion = cache.get_or_expand(&revision);
                if counted_revisions.insert(revision.revision_id.clone()) && expansion.skipped_items > 0 {
                    diagnostics.bom_items_skipped += expansion.skipped_items;
                    diagnostics.add_warning(MrpWarning::warning(
                        revision.revision_id.clone(),
                        format!("BOM 版本有 {} 行用量不合法", expansion.skipped_items),
                    ));
                }

                let quantity = order.demand_quantity(config.demand_basis);
                if quantity <= Decimal::ZERO {
                    diagnostics.add_warning(MrpWarning::info(
                        order.order_id.clone(),
                        format!("訂單已無剩餘需求（已出貨 {}）", order.quantity_shipped),
                    ));
                }
                let lines = expansion
                    .lines
                    .iter()
                    .map(|line| OrderDemandLine {
                        material_id: line.material_id.clone(),
                        required: quantity * line.quantity_per,
                        resource_types: line.resource_types.clone(),
                        has_untagged: line.has_untagged,
                    })
                    .filter(|line| line.required > Decimal::ZERO)
                    .collect();

                diagnostics.orders_included += 1;
                demands.push(OrderDemand {
                    product_id: expansion.product_id.clone(),
                    quantity,
                    order,
                    lines,
                });
            }

            offset += page_len;
            if page_len < batch_size {
                break;
            }
        }

        demands.sort_by(|a, b| a.order.order_id.cmp(&b.order.order_id));
        demands
    }
}
