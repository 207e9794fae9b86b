//! 訂單可生產性
//!
//! 共享庫存依交期優先順序分配給競爭的訂單，再據以判斷每張訂單是否可生產。

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use mrp_core::{PlanningConfig, ShortageAttribution};

use crate::netting::NettingCalculator;
use crate::pegging::PeggingCalculator;
use crate::requirements::{OrderDemand, RequirementsReport};

/// 可生產狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuildStatus {
    /// 所有物料都不缺
    CanBuild,
    /// 所有物料都缺
    Blocked,
    /// 部分物料缺
    Partial,
}

/// 訂單中單一物料的可生產性
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialBuildLine {
    pub material_id: String,

    /// 此訂單自身的需求
    pub required: Decimal,

    /// 全域可用庫存（所有訂單共享）
    pub available: Decimal,

    /// 全域在途
    pub on_order: Decimal,

    /// 此訂單的缺料
    pub shortage: Decimal,

    /// 物料層級缺料，不小於任何單一訂單的缺料
    pub global_shortage: Decimal,
}

impl MaterialBuildLine {
    pub fn is_short(&self) -> bool {
        self.shortage > Decimal::ZERO
    }
}

/// 訂單可生產性
#[derive(Debug, Clone, Serialize)]
pub struct OrderBuildability {
    pub order_id: String,
    pub order_number: String,
    pub customer_id: String,
    pub product_id: String,
    pub due_date: Option<NaiveDate>,
    pub status: BuildStatus,
    pub materials: Vec<MaterialBuildLine>,
    pub materials_ready: usize,
    pub materials_short: usize,
    pub materials_total: usize,
}

/// 可生產性計算器
pub struct BuildabilityCalculator;

impl BuildabilityCalculator {
    /// 依優先順序分配供應池，回傳每筆需求的缺口
    ///
    /// `claims` 必須已依優先順序排序（交期早者在前）。
    pub fn fair_share(pool: Decimal, claims: &[Decimal]) -> Vec<Decimal> {
        PeggingCalculator::shortfalls(pool, claims)
    }

    /// 計算所有訂單的可生產性，依優先順序排序輸出
    pub fn calculate(report: &RequirementsReport, config: &PlanningConfig) -> Vec<OrderBuildability> {
        let mut demands: Vec<&OrderDemand> = report.order_demands.iter().collect();
        demands.sort_by(|a, b| a.order.priority_cmp(&b.order));

        // 每張訂單每個物料的缺料：(訂單序號, 物料) -> 缺料
        let per_order = match config.shortage_attribution {
            ShortageAttribution::DueDatePriority => Self::simulate(report, &demands),
            ShortageAttribution::GlobalShortage => HashMap::new(),
        };

        let results: Vec<OrderBuildability> = demands
            .iter()
            .enumerate()
            .map(|(rank, demand)| {
                let materials: Vec<MaterialBuildLine> = demand
                    .lines
                    .iter()
                    .filter_map(|line| {
                        let stock = report.line(&line.material_id)?;
                        let global_shortage = config.round_shortage(NettingCalculator::net_requirement(
                            stock.total_required,
                            stock.available,
                            stock.on_order,
                        ));
                        let shortage = match config.shortage_attribution {
                            ShortageAttribution::DueDatePriority => per_order
                                .get(&(rank, line.material_id.as_str()))
                                .copied()
                                .unwrap_or(Decimal::ZERO),
                            ShortageAttribution::GlobalShortage => line.required.min(global_shortage),
                        };

                        Some(MaterialBuildLine {
                            material_id: line.material_id.clone(),
                            required: line.required,
                            available: stock.available,
                            on_order: stock.on_order,
                            shortage: config.round_shortage(shortage),
                            global_shortage,
                        })
                    })
                    .collect();

                Self::classify(demand, materials)
            })
            .collect();

        tracing::info!(
            "可生產性計算完成：訂單 {} 張，可生產 {} 張",
            results.len(),
            results
                .iter()
                .filter(|r| r.status == BuildStatus::CanBuild)
                .count()
        );

        results
    }

    /// 逐物料模擬分配
    fn simulate<'a>(
        report: &RequirementsReport,
        demands: &[&'a OrderDemand],
    ) -> HashMap<(usize, &'a str), Decimal> {
        let mut claims: HashMap<&'a str, Vec<(usize, Decimal)>> = HashMap::new();
        for (rank, demand) in demands.iter().enumerate() {
            for line in &demand.lines {
                claims
                    .entry(line.material_id.as_str())
                    .or_default()
                    .push((rank, line.required));
            }
        }

        let mut shortages = HashMap::new();
        for (material_id, material_claims) in claims {
            let Some(stock) = report.line(material_id) else {
                continue;
            };

            let pool = NettingCalculator::supply_pool(stock.available, stock.on_order);
            let quantities: Vec<Decimal> = material_claims.iter().map(|&(_, q)| q).collect();
            let shortfalls = Self::fair_share(pool, &quantities);

            tracing::debug!(
                "物料 {} 供應池 {}，競爭訂單 {} 張",
                material_id,
                pool,
                quantities.len()
            );

            for ((rank, _), shortfall) in material_claims.into_iter().zip(shortfalls) {
                shortages.insert((rank, material_id), shortfall);
            }
        }

        shortages
    }

    fn classify(demand: &OrderDemand, materials: Vec<MaterialBuildLine>) -> OrderBuildability {
        let materials_total = materials.len();
        let materials_short = materials.iter().filter(|m| m.is_short()).count();
        let materials_ready = materials_total - materials_short;

        let status = if materials_short == 0 {
            BuildStatus::CanBuild
        } else if materials_short == materials_total {
            BuildStatus::Blocked
        } else {
            BuildStatus::Partial
        };

        OrderBuildability {
            order_id: demand.order.order_id.clone(),
            order_number: demand.order.order_number.clone(),
            customer_id: demand.order.customer_id.clone(),
            product_id: demand.product_id.clone(),
            due_date: demand.order.due_date,
            status,
            materials,
            materials_ready,
            materials_short,
            materials_total,
        }
    }
}
