//! 退料對帳
//!
//! 發料數量 = 點收 + 耗用 + 報廢 + 差異。差異只回報，不入帳。
//! 只有 RETURN_FROM_WO 讓點收量回到可用；現場庫存與差異留在工單保管。

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use mrp_core::{
    MrpError, PlanningConfig, Reference, ReturnAction, ReturnOutcome, Transaction,
    TransactionType, VarianceWarning,
};

use crate::allocation::{AllocationFailure, AllocationMachine};
use crate::store::InventoryStore;

/// 單筆退料輸入
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnInput {
    pub allocation_id: Uuid,
    pub counted_quantity: Decimal,
    pub consumed_quantity: Decimal,
    pub waste_quantity: Decimal,
    pub action: ReturnAction,
}

impl ReturnInput {
    pub fn new(
        allocation_id: Uuid,
        counted_quantity: Decimal,
        consumed_quantity: Decimal,
        waste_quantity: Decimal,
        action: ReturnAction,
    ) -> Self {
        Self {
            allocation_id,
            counted_quantity,
            consumed_quantity,
            waste_quantity,
            action,
        }
    }

    fn validate(&self) -> mrp_core::Result<()> {
        let fields = [
            ("counted_quantity", self.counted_quantity),
            ("consumed_quantity", self.consumed_quantity),
            ("waste_quantity", self.waste_quantity),
        ];
        for (name, value) in fields {
            if value < Decimal::ZERO {
                return Err(MrpError::InvalidQuantity(format!(
                    "{} 不可為負數: {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// 單筆退料結果
#[derive(Debug, Clone, Serialize)]
pub struct ReturnReceipt {
    pub allocation_id: Uuid,
    pub material_id: String,
    pub outcome: ReturnOutcome,
    pub transaction_ids: Vec<Uuid>,
    pub warning: Option<VarianceWarning>,
}

/// 訂單批次退料彙總
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReturnSummary {
    pub returned: usize,
    pub total_materials_returned: Decimal,
    pub total_consumed: Decimal,
    pub total_waste: Decimal,
    pub total_variance: Decimal,
    pub warnings: Vec<VarianceWarning>,
    pub failed: Vec<AllocationFailure>,
}

impl ReturnSummary {
    /// 合計差異非零時一律視為警示
    pub fn has_variance(&self) -> bool {
        !self.total_variance.is_zero() || !self.warnings.is_empty()
    }
}

/// 退料對帳器
pub struct ReturnReconciler;

impl ReturnReconciler {
    /// 對單一 ISSUED 分配退料；分錄與狀態在同一把列鎖內生效
    pub fn return_allocation(
        store: &InventoryStore,
        input: &ReturnInput,
        config: &PlanningConfig,
        actor: &str,
    ) -> mrp_core::Result<ReturnReceipt> {
        input.validate()?;
        let id = input.allocation_id;
        let event = input.action.event();

        let receipt = store.with_allocation(id, |book| {
            let alloc = book
                .allocation(id)
                .ok_or_else(|| MrpError::not_found("分配", id))?;
            alloc.check(event)?;

            let outcome = ReturnOutcome::new(
                alloc.quantity,
                input.counted_quantity,
                input.consumed_quantity,
                input.waste_quantity,
                input.action,
            );

            let mut entries = Vec::new();
            if input.consumed_quantity > Decimal::ZERO {
                entries.push(AllocationMachine::consumption(alloc, input.consumed_quantity, actor));
            }
            if input.waste_quantity > Decimal::ZERO {
                entries.push(
                    Transaction::new(
                        alloc.material_id.clone(),
                        -input.waste_quantity,
                        TransactionType::Scrap,
                        actor.to_string(),
                    )
                    .with_reference(Reference::allocation(id))
                    .with_owner(alloc.owner_type, alloc.owner_id.clone()),
                );
            }
            if input.action == ReturnAction::Return && input.counted_quantity > Decimal::ZERO {
                entries.push(
                    Transaction::new(
                        alloc.material_id.clone(),
                        input.counted_quantity,
                        TransactionType::ReturnFromWo,
                        actor.to_string(),
                    )
                    .with_reference(Reference::allocation(id))
                    .with_owner(alloc.owner_type, alloc.owner_id.clone()),
                );
            }

            let material_id = alloc.material_id.clone();
            let transaction_ids = entries.iter().map(|tx| tx.id).collect();
            book.transition(id, event, entries)?;
            if let Some(alloc) = book.allocation_mut(id) {
                alloc.return_outcome = Some(outcome.clone());
            }

            let warning = config
                .exceeds_variance_tolerance(outcome.variance)
                .then(|| VarianceWarning {
                    allocation_id: id,
                    material_id: material_id.clone(),
                    variance: outcome.variance,
                });

            Ok(ReturnReceipt {
                allocation_id: id,
                material_id,
                outcome,
                transaction_ids,
                warning,
            })
        })?;

        if let Some(warning) = &receipt.warning {
            tracing::warn!(
                "分配 {} 物料 {} 退料差異 {}",
                warning.allocation_id,
                warning.material_id,
                warning.variance
            );
        }
        Ok(receipt)
    }

    /// 訂單批次退料：逐筆獨立生效，單筆失敗不回滾其他分配
    pub fn return_order(
        store: &InventoryStore,
        order_id: &str,
        inputs: &[ReturnInput],
        config: &PlanningConfig,
        actor: &str,
    ) -> ReturnSummary {
        let owned = store.order_allocation_ids(order_id);
        let mut summary = ReturnSummary::default();

        for input in inputs {
            if !owned.contains(&input.allocation_id) {
                summary.failed.push(AllocationFailure::new(
                    input.allocation_id,
                    MrpError::not_found(
                        "訂單分配",
                        format!("{}/{}", order_id, input.allocation_id),
                    ),
                ));
                continue;
            }

            match Self::return_allocation(store, input, config, actor) {
                Ok(receipt) => {
                    let outcome = &receipt.outcome;
                    if outcome.action == ReturnAction::Return {
                        summary.total_materials_returned += outcome.counted_quantity;
                    }
                    summary.total_consumed += outcome.consumed_quantity;
                    summary.total_waste += outcome.waste_quantity;
                    summary.total_variance += outcome.variance;
                    summary.returned += 1;
                    summary.warnings.extend(receipt.warning);
                }
                Err(e) => summary
                    .failed
                    .push(AllocationFailure::new(input.allocation_id, e)),
            }
        }

        if summary.has_variance() {
            tracing::warn!(
                "訂單 {} 退料合計差異 {}（{} 筆警示）",
                order_id,
                summary.total_variance,
                summary.warnings.len()
            );
        }
        tracing::info!(
            "訂單 {} 退料完成：成功 {} 筆，失敗 {} 筆",
            order_id,
            summary.returned,
            summary.failed.len()
        );
        summary
    }
}
