//! 缺料分類與分組視圖
//!
//! 所有視圖都由同一份物料缺料集合推導，彼此數字一致。

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use mrp_core::PlanningConfig;

use crate::netting::NettingCalculator;
use crate::requirements::{OrderDemand, RequirementsReport};

/// 未標記資源類型的 BOM 行歸入此組
pub const UNTAGGED_RESOURCE_TYPE: &str = "UNTAGGED";

/// 物料缺料
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialShortage {
    pub material_id: String,
    pub on_hand: Decimal,
    pub allocated: Decimal,
    pub available: Decimal,
    pub on_order: Decimal,
    pub total_required: Decimal,

    /// 缺料數量（總需求 - 可用 - 在途），恆大於 0
    pub shortage: Decimal,
}

/// 訂單中的單一缺料物料
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderMaterialShortage {
    pub material_id: String,

    /// 此訂單自身的需求
    pub required: Decimal,

    /// 物料層級缺料
    pub shortage: Decimal,
}

/// 受影響訂單
#[derive(Debug, Clone, Serialize)]
pub struct OrderShortage {
    pub order_id: String,
    pub order_number: String,
    pub product_id: String,
    pub due_date: Option<NaiveDate>,
    pub materials: Vec<OrderMaterialShortage>,
}

/// 按客戶分組
#[derive(Debug, Clone, Serialize)]
pub struct CustomerShortage {
    pub customer_id: String,

    /// 依交期優先順序排序
    pub orders: Vec<OrderShortage>,

    /// 此客戶相關的缺料物料數（不重複）
    pub materials_short: usize,
}

/// 按資源類型分組
#[derive(Debug, Clone, Serialize)]
pub struct ResourceTypeShortage {
    pub resource_type: String,
    pub materials: Vec<MaterialShortage>,

    /// 本組內的缺料物料數
    pub materials_short: usize,
}

/// 受影響成品
#[derive(Debug, Clone, Serialize)]
pub struct AssemblyShortage {
    pub product_id: String,

    /// 阻擋此成品的缺料物料
    pub materials: Vec<MaterialShortage>,

    /// 受影響訂單（依訂單ID排序）
    pub order_ids: Vec<String>,

    /// 受影響訂單的總訂購數量
    pub total_units_ordered: Decimal,
}

/// 缺料計算器
pub struct ShortageCalculator;

impl ShortageCalculator {
    /// 物料缺料集合：只包含總需求 > 可用 + 在途 的物料
    ///
    /// 依缺料數量由大到小排序，相同時依物料ID。
    pub fn shortages(report: &RequirementsReport, config: &PlanningConfig) -> Vec<MaterialShortage> {
        let mut shortages: Vec<MaterialShortage> = report
            .lines
            .iter()
            .filter(|l| NettingCalculator::is_short(l.total_required, l.available, l.on_order))
            .map(|l| MaterialShortage {
                material_id: l.material_id.clone(),
                on_hand: l.on_hand,
                allocated: l.allocated,
                available: l.available,
                on_order: l.on_order,
                total_required: l.total_required,
                shortage: config.round_shortage(l.total_required - l.available - l.on_order),
            })
            .collect();

        shortages.sort_by(|a, b| {
            b.shortage
                .cmp(&a.shortage)
                .then_with(|| a.material_id.cmp(&b.material_id))
        });

        tracing::debug!("缺料物料 {} 種", shortages.len());
        shortages
    }

    /// 按客戶分組
    pub fn by_customer(
        report: &RequirementsReport,
        shortages: &[MaterialShortage],
    ) -> Vec<CustomerShortage> {
        let index = Self::index(shortages);
        let mut demands: Vec<&OrderDemand> = report.order_demands.iter().collect();
        demands.sort_by(|a, b| a.order.priority_cmp(&b.order));

        let mut groups: BTreeMap<String, (Vec<OrderShortage>, BTreeSet<String>)> = BTreeMap::new();

        for demand in demands {
            let materials: Vec<OrderMaterialShortage> = demand
                .lines
                .iter()
                .filter_map(|line| {
                    index.get(line.material_id.as_str()).map(|s| OrderMaterialShortage {
                        material_id: line.material_id.clone(),
                        required: line.required,
                        shortage: s.shortage,
                    })
                })
                .collect();

            if materials.is_empty() {
                continue;
            }

            let group = groups
                .entry(demand.order.customer_id.clone())
                .or_insert_with(|| (Vec::new(), BTreeSet::new()));
            group
                .1
                .extend(materials.iter().map(|m| m.material_id.clone()));
            group.0.push(OrderShortage {
                order_id: demand.order.order_id.clone(),
                order_number: demand.order.order_number.clone(),
                product_id: demand.product_id.clone(),
                due_date: demand.order.due_date,
                materials,
            });
        }

        groups
            .into_iter()
            .map(|(customer_id, (orders, materials))| CustomerShortage {
                customer_id,
                orders,
                materials_short: materials.len(),
            })
            .collect()
    }

    /// 按資源類型分組；同一物料可出現在多個組
    pub fn by_resource_type(
        report: &RequirementsReport,
        shortages: &[MaterialShortage],
    ) -> Vec<ResourceTypeShortage> {
        let index = Self::index(shortages);
        let mut groups: BTreeMap<String, BTreeSet<&str>> = BTreeMap::new();

        for line in report.order_demands.iter().flat_map(|d| &d.lines) {
            let Some(shortage) = index.get(line.material_id.as_str()) else {
                continue;
            };

            for tag in &line.resource_types {
                groups
                    .entry(tag.clone())
                    .or_default()
                    .insert(shortage.material_id.as_str());
            }
            if line.has_untagged {
                groups
                    .entry(UNTAGGED_RESOURCE_TYPE.to_string())
                    .or_default()
                    .insert(shortage.material_id.as_str());
            }
        }

        groups
            .into_iter()
            .map(|(resource_type, material_ids)| {
                let materials = Self::ordered(shortages, &material_ids);
                ResourceTypeShortage {
                    resource_type,
                    materials_short: materials.len(),
                    materials,
                }
            })
            .collect()
    }

    /// 按成品分組
    pub fn affected_assemblies(
        report: &RequirementsReport,
        shortages: &[MaterialShortage],
    ) -> Vec<AssemblyShortage> {
        let index = Self::index(shortages);
        let mut groups: BTreeMap<String, (BTreeSet<&str>, Vec<String>, Decimal)> = BTreeMap::new();

        for demand in &report.order_demands {
            let blocking: Vec<&str> = demand
                .lines
                .iter()
                .filter(|l| index.contains_key(l.material_id.as_str()))
                .map(|l| l.material_id.as_str())
                .collect();

            if blocking.is_empty() {
                continue;
            }

            let group = groups
                .entry(demand.product_id.clone())
                .or_insert_with(|| (BTreeSet::new(), Vec::new(), Decimal::ZERO));
            group.0.extend(blocking);
            group.1.push(demand.order.order_id.clone());
            group.2 += demand.quantity;
        }

        groups
            .into_iter()
            .map(|(product_id, (material_ids, order_ids, total_units_ordered))| AssemblyShortage {
                product_id,
                materials: Self::ordered(shortages, &material_ids),
                order_ids,
                total_units_ordered,
            })
            .collect()
    }

    fn index(shortages: &[MaterialShortage]) -> HashMap<&str, &MaterialShortage> {
        shortages
            .iter()
            .map(|s| (s.material_id.as_str(), s))
            .collect()
    }

    /// 依缺料集合原有順序挑出指定物料
    fn ordered(shortages: &[MaterialShortage], material_ids: &BTreeSet<&str>) -> Vec<MaterialShortage> {
        shortages
            .iter()
            .filter(|s| material_ids.contains(s.material_id.as_str()))
            .cloned()
            .collect()
    }
}
