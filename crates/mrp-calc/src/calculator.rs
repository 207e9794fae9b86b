//! MRP 主計算器

use std::sync::Arc;

use mrp_cache::BomExpansionCache;
use mrp_core::{BomSource, OrderSource, PlanningConfig, StockSource};

use crate::buildability::{BuildabilityCalculator, OrderBuildability};
use crate::requirements::{RequirementsCalculator, RequirementsReport};
use crate::shortage::{
    AssemblyShortage, CustomerShortage, MaterialShortage, ResourceTypeShortage, ShortageCalculator,
};

/// MRP 計算器
///
/// 持有計劃配置與 BOM 展開緩存；每次讀取都重新計算，報表是時間點快照。
pub struct MrpCalculator {
    /// 計劃配置
    config: PlanningConfig,

    /// BOM 展開緩存（可跨計算器共享）
    cache: Arc<BomExpansionCache>,
}

impl MrpCalculator {
    /// 創建新的 MRP 計算器
    pub fn new(config: PlanningConfig) -> Self {
        Self {
            config,
            cache: Arc::new(BomExpansionCache::new()),
        }
    }

    /// 建構器模式：共享外部緩存
    pub fn with_cache(mut self, cache: Arc<BomExpansionCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn config(&self) -> &PlanningConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<BomExpansionCache> {
        &self.cache
    }

    /// 需求彙總
    pub fn requirements(
        &self,
        orders: &dyn OrderSource,
        boms: &dyn BomSource,
        stock: &dyn StockSource,
    ) -> RequirementsReport {
        tracing::info!("開始需求彙總");
        RequirementsCalculator::calculate(orders, boms, stock, &self.cache, &self.config)
    }

    /// 物料缺料集合
    pub fn shortages(&self, report: &RequirementsReport) -> Vec<MaterialShortage> {
        ShortageCalculator::shortages(report, &self.config)
    }

    /// 按客戶分組的缺料
    pub fn shortages_by_customer(&self, report: &RequirementsReport) -> Vec<CustomerShortage> {
        ShortageCalculator::by_customer(report, &self.shortages(report))
    }

    /// 按資源類型分組的缺料
    pub fn shortages_by_resource_type(&self, report: &RequirementsReport) -> Vec<ResourceTypeShortage> {
        ShortageCalculator::by_resource_type(report, &self.shortages(report))
    }

    /// 受影響成品
    pub fn affected_assemblies(&self, report: &RequirementsReport) -> Vec<AssemblyShortage> {
        ShortageCalculator::affected_assemblies(report, &self.shortages(report))
    }

    /// 訂單可生產性
    pub fn order_buildability(&self, report: &RequirementsReport) -> Vec<OrderBuildability> {
        BuildabilityCalculator::calculate(report, &self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mrp_core::{BomItem, BomRevision, Order, PlanningSnapshot, StockSnapshot};
    use rust_decimal::Decimal;
    use std::collections::HashMap;

    #[test]
    fn test_views_agree_with_shortage_set() {
        let planning = PlanningSnapshot::new()
            .with_revision(
                BomRevision::new("REV-A".to_string(), "PCBA-100".to_string(), "A".to_string())
                    .with_items(vec![BomItem::new("M".to_string(), Decimal::from(3))
                        .with_resource_type("SMT".to_string())]),
            )
            .with_order(Order::new(
                "SO-1".to_string(),
                "ACME".to_string(),
                Decimal::from(10),
                "REV-A".to_string(),
            ));
        let mut stock = HashMap::new();
        stock.insert(
            "M".to_string(),
            StockSnapshot::new("M".to_string(), Decimal::from(12), Decimal::from(2), Decimal::ZERO),
        );

        let calculator = MrpCalculator::new(PlanningConfig::new());
        let report = calculator.requirements(&planning, &planning, &stock);
        let shortages = calculator.shortages(&report);

        assert_eq!(shortages.len(), 1);
        assert_eq!(shortages[0].shortage, Decimal::from(20));
        assert_eq!(
            calculator.shortages_by_customer(&report)[0].orders[0].materials[0].shortage,
            shortages[0].shortage
        );
        assert_eq!(
            calculator.shortages_by_resource_type(&report)[0].materials,
            shortages
        );
        assert_eq!(calculator.affected_assemblies(&report)[0].materials, shortages);
        assert_eq!(
            calculator.order_buildability(&report)[0].materials[0].global_shortage,
            shortages[0].shortage
        );
    }

    #[test]
    fn test_shared_cache() {
        let cache = Arc::new(BomExpansionCache::new());
        let calculator = MrpCalculator::new(PlanningConfig::new()).with_cache(Arc::clone(&cache));

        assert!(Arc::ptr_eq(calculator.cache(), &cache));
    }
}
