//! # Contract Manufacturing MRP
//!
//! 庫存分配與物料需求計劃引擎的對外介面。
//!
//! 寫入（揀料、發料、退料、自動耗用）逐物料加鎖；
//! 讀取（需求、缺料、可生產性）每次重新計算，是時間點快照。

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

pub use mrp_cache::{BomExpansion, BomExpansionCache, CacheStats};
pub use mrp_calc::{
    AssemblyShortage, BuildStatus, CustomerShortage, MaterialBuildLine, MaterialShortage,
    MrpCalculator, OrderBuildability, ReportDiagnostics, RequirementLine, RequirementsReport,
    ResourceTypeShortage,
};
pub use mrp_core::{
    Allocation, AllocationStatus, BomItem, BomRevision, BomSource, DemandBasis, Material,
    MrpError, Order, OrderSource, OrderStatus, OwnerType, PlanningConfig, PlanningSnapshot,
    PurchaseOrderLine, Reference, ReturnAction, ShortageAttribution, StockSnapshot, StockSource,
    Transaction, TransactionType, UnitOfMeasure, VarianceWarning,
};
pub use mrp_inventory::{
    AllocationFailure, AllocationMachine, AutoConsumeResult, InventoryStore, IssueResult,
    PickResult, ReturnInput, ReturnReconciler, ReturnSummary, StockAggregator,
};

/// 同一份需求報表推導出的完整缺料報表
#[derive(Debug, Clone, Serialize)]
pub struct ShortageReport {
    pub requirements: RequirementsReport,
    pub shortages: Vec<MaterialShortage>,
    pub by_customer: Vec<CustomerShortage>,
    pub by_resource_type: Vec<ResourceTypeShortage>,
    pub affected_assemblies: Vec<AssemblyShortage>,
    pub buildability: Vec<OrderBuildability>,
}

/// 引擎門面
pub struct ContractMrp {
    store: Arc<InventoryStore>,
    orders: Arc<dyn OrderSource>,
    boms: Arc<dyn BomSource>,
    calculator: MrpCalculator,
}

impl ContractMrp {
    /// 創建引擎；配置不合法時回傳錯誤
    pub fn new(
        store: Arc<InventoryStore>,
        orders: Arc<dyn OrderSource>,
        boms: Arc<dyn BomSource>,
        config: PlanningConfig,
    ) -> mrp_core::Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            orders,
            boms,
            calculator: MrpCalculator::new(config),
        })
    }

    /// 建構器模式：共享 BOM 展開緩存
    pub fn with_cache(mut self, cache: Arc<BomExpansionCache>) -> Self {
        self.calculator = self.calculator.with_cache(cache);
        self
    }

    pub fn store(&self) -> &Arc<InventoryStore> {
        &self.store
    }

    pub fn config(&self) -> &PlanningConfig {
        self.calculator.config()
    }

    pub fn cache(&self) -> &Arc<BomExpansionCache> {
        self.calculator.cache()
    }

    fn ensure_order(&self, order_id: &str) -> mrp_core::Result<Order> {
        self.orders.order(order_id).ok_or_else(|| {
            tracing::warn!("訂單 {} 不存在", order_id);
            MrpError::not_found("訂單", order_id)
        })
    }

    /// 訂單使用的 BOM 版本
    pub fn order_bom(&self, order_id: &str) -> mrp_core::Result<BomRevision> {
        let order = self.ensure_order(order_id)?;
        self.boms
            .revision(&order.bom_revision_id)
            .ok_or_else(|| MrpError::not_found("BOM 版本", &order.bom_revision_id))
    }

    // ------------------------------------------------------------------
    // 分類帳
    // ------------------------------------------------------------------

    /// 附加分類帳分錄（收料、盤點調整等協作方寫入）
    pub fn post(&self, tx: Transaction) -> mrp_core::Result<Uuid> {
        self.store.append(tx)
    }

    /// 沖銷分錄
    pub fn reverse(&self, material_id: &str, transaction_id: Uuid, actor: &str) -> mrp_core::Result<Uuid> {
        self.store.reverse(material_id, transaction_id, actor)
    }

    /// 物料庫存快照
    pub fn snapshot(&self, material_id: &str) -> mrp_core::Result<StockSnapshot> {
        StockAggregator::snapshot(&self.store, material_id)
    }

    // ------------------------------------------------------------------
    // 分配狀態機
    // ------------------------------------------------------------------

    /// 建立分配；訂單必須存在
    ///
    /// 連結 BOM 行時，該行必須屬於訂單的 BOM 版本且物料相同；
    /// 資源類型一律取自 BOM 行，呼叫端帶入的標記會被覆寫。
    pub fn allocate(&self, mut allocation: Allocation) -> mrp_core::Result<Uuid> {
        allocation.resource_type = match allocation.bom_item_id {
            Some(item_id) => {
                let revision = self.order_bom(&allocation.order_id)?;
                let item = revision
                    .items
                    .iter()
                    .find(|item| item.id == item_id && item.material_id == allocation.material_id)
                    .ok_or_else(|| {
                        MrpError::not_found(
                            "BOM 行",
                            format!("{}/{}", revision.revision_id, item_id),
                        )
                    })?;
                item.resource_type.clone()
            }
            None => {
                self.ensure_order(&allocation.order_id)?;
                None
            }
        };

        tracing::debug!(
            "訂單 {} 分配物料 {} 數量 {}（資源類型 {:?}）",
            allocation.order_id,
            allocation.material_id,
            allocation.quantity,
            allocation.resource_type
        );
        AllocationMachine::allocate(&self.store, allocation)
    }

    /// 揀料；未指定ID時揀取訂單全部 ACTIVE 分配
    pub fn pick(&self, order_id: &str, allocation_ids: Option<&[Uuid]>) -> mrp_core::Result<PickResult> {
        self.ensure_order(order_id)?;
        Ok(AllocationMachine::pick(&self.store, order_id, allocation_ids))
    }

    /// 發料
    pub fn issue(
        &self,
        order_id: &str,
        allocation_ids: Option<&[Uuid]>,
        actor: &str,
    ) -> mrp_core::Result<IssueResult> {
        self.ensure_order(order_id)?;
        Ok(AllocationMachine::issue(&self.store, order_id, allocation_ids, actor))
    }

    /// 取消分配
    pub fn cancel(&self, allocation_id: Uuid) -> mrp_core::Result<()> {
        AllocationMachine::cancel(&self.store, allocation_id)
    }

    /// 訂單批次退料
    pub fn return_order(
        &self,
        order_id: &str,
        returns: &[ReturnInput],
        actor: &str,
    ) -> mrp_core::Result<ReturnSummary> {
        self.ensure_order(order_id)?;
        Ok(ReturnReconciler::return_order(
            &self.store,
            order_id,
            returns,
            self.config(),
            actor,
        ))
    }

    /// 自動耗用指定資源類型的已發料分配
    pub fn auto_consume(
        &self,
        order_id: &str,
        resource_type: &str,
        actor: &str,
    ) -> mrp_core::Result<AutoConsumeResult> {
        self.ensure_order(order_id)?;
        Ok(AllocationMachine::auto_consume(
            &self.store,
            order_id,
            resource_type,
            actor,
        ))
    }

    // ------------------------------------------------------------------
    // 報表
    // ------------------------------------------------------------------

    /// 需求彙總
    pub fn requirements(&self) -> RequirementsReport {
        self.calculator
            .requirements(self.orders.as_ref(), self.boms.as_ref(), self.store.as_ref())
    }

    /// 物料缺料集合
    ///
    /// 每次呼叫重新彙總需求，且不回傳診斷；同時需要多個視圖時
    /// 改用 [`ContractMrp::shortage_report`]，確保各視圖出自同一份快照。
    pub fn shortages(&self) -> Vec<MaterialShortage> {
        self.calculator.shortages(&self.requirements())
    }

    /// 依客戶分組的缺料；單獨重算需求，見 [`ContractMrp::shortage_report`]
    pub fn shortages_by_customer(&self) -> Vec<CustomerShortage> {
        self.calculator.shortages_by_customer(&self.requirements())
    }

    /// 依資源類型分組的缺料；單獨重算需求，見 [`ContractMrp::shortage_report`]
    pub fn shortages_by_resource_type(&self) -> Vec<ResourceTypeShortage> {
        self.calculator
            .shortages_by_resource_type(&self.requirements())
    }

    /// 受影響成品；單獨重算需求，見 [`ContractMrp::shortage_report`]
    pub fn affected_assemblies(&self) -> Vec<AssemblyShortage> {
        self.calculator.affected_assemblies(&self.requirements())
    }

    /// 訂單可生產性；單獨重算需求，見 [`ContractMrp::shortage_report`]
    pub fn order_buildability(&self) -> Vec<OrderBuildability> {
        self.calculator.order_buildability(&self.requirements())
    }

    /// 從同一份需求報表產生所有視圖，數字彼此一致，並附帶診斷
    pub fn shortage_report(&self) -> ShortageReport {
        let requirements = self.requirements();
        let shortages = self.calculator.shortages(&requirements);
        tracing::info!(
            "缺料報表：物料 {} 種，缺料 {} 種，略過訂單 {} 張",
            requirements.lines.len(),
            shortages.len(),
            requirements.diagnostics.orders_skipped
        );
        if !requirements.diagnostics.is_clean() {
            tracing::warn!("缺料報表有 {} 筆診斷警示", requirements.diagnostics.warnings.len());
        }

        ShortageReport {
            by_customer: mrp_calc::ShortageCalculator::by_customer(&requirements, &shortages),
            by_resource_type: mrp_calc::ShortageCalculator::by_resource_type(
                &requirements,
                &shortages,
            ),
            affected_assemblies: mrp_calc::ShortageCalculator::affected_assemblies(
                &requirements,
                &shortages,
            ),
            buildability: self.calculator.order_buildability(&requirements),
            shortages,
            requirements,
        }
    }
}
