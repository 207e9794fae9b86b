//! 分配狀態機操作
//!
//! 批次操作逐筆獨立處理：單筆失敗（例如已被其他請求轉換）只記錄在結果中，不影響其他分配。

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use mrp_core::{
    Allocation, AllocationEvent, AllocationStatus, MrpError, Reference, Transaction,
    TransactionType,
};

use crate::store::InventoryStore;

/// 單筆分配失敗
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllocationFailure {
    pub allocation_id: Uuid,
    pub error: String,
    #[serde(skip)]
    pub cause: MrpError,
}

impl AllocationFailure {
    pub fn new(allocation_id: Uuid, cause: MrpError) -> Self {
        Self {
            allocation_id,
            error: cause.to_string(),
            cause,
        }
    }
}

/// 揀料結果
#[derive(Debug, Clone, Default, Serialize)]
pub struct PickResult {
    pub picked: usize,
    pub failed: Vec<AllocationFailure>,
}

/// 發料結果
#[derive(Debug, Clone, Default, Serialize)]
pub struct IssueResult {
    pub issued: usize,
    pub failed: Vec<AllocationFailure>,
}

/// 自動耗用結果（零筆為正常結果）
#[derive(Debug, Clone, Default, Serialize)]
pub struct AutoConsumeResult {
    pub auto_consumed: usize,
    pub failed: Vec<AllocationFailure>,
}

/// 分配狀態機
pub struct AllocationMachine;

impl AllocationMachine {
    /// 建立分配（ACTIVE），數量不可超過當下可用量
    pub fn allocate(store: &InventoryStore, allocation: Allocation) -> mrp_core::Result<Uuid> {
        if allocation.status != AllocationStatus::Active {
            return Err(MrpError::InvalidTransition {
                allocation_id: allocation.id,
                from: allocation.status,
                to: AllocationStatus::Active,
            });
        }

        let order_id = allocation.order_id.clone();
        let material_id = allocation.material_id.clone();
        let quantity = allocation.quantity;

        let id = store.insert_allocation(allocation)?;
        tracing::debug!(
            "建立分配 {}: 訂單 {} 物料 {} 數量 {}",
            id,
            order_id,
            material_id,
            quantity
        );
        Ok(id)
    }

    /// ACTIVE → PICKED；未指定ID時揀取訂單全部 ACTIVE 分配
    pub fn pick(
        store: &InventoryStore,
        order_id: &str,
        allocation_ids: Option<&[Uuid]>,
    ) -> PickResult {
        let (targets, mut failed) =
            Self::targets(store, order_id, allocation_ids, |a| a.status == AllocationStatus::Active);

        let mut picked = 0;
        for id in targets {
            match store.with_allocation(id, |book| {
                book.transition(id, AllocationEvent::Pick, Vec::new())
            }) {
                Ok(_) => picked += 1,
                Err(e) => failed.push(AllocationFailure::new(id, e)),
            }
        }

        tracing::info!(
            "訂單 {} 揀料完成：成功 {} 筆，失敗 {} 筆",
            order_id,
            picked,
            failed.len()
        );
        PickResult { picked, failed }
    }

    /// PICKED → ISSUED，寫入 ISSUE_TO_WO 保管備忘分錄
    pub fn issue(
        store: &InventoryStore,
        order_id: &str,
        allocation_ids: Option<&[Uuid]>,
        actor: &str,
    ) -> IssueResult {
        let (targets, mut failed) =
            Self::targets(store, order_id, allocation_ids, |a| a.status == AllocationStatus::Picked);

        let mut issued = 0;
        for id in targets {
            let outcome = store.with_allocation(id, |book| {
                let alloc = book
                    .allocation(id)
                    .ok_or_else(|| MrpError::not_found("分配", id))?;
                let tx = Transaction::new(
                    alloc.material_id.clone(),
                    -alloc.quantity,
                    TransactionType::IssueToWo,
                    actor.to_string(),
                )
                .with_reference(Reference::order(&alloc.order_id))
                .with_owner(alloc.owner_type, alloc.owner_id.clone());

                book.transition(id, AllocationEvent::Issue, vec![tx])
            });

            match outcome {
                Ok(_) => issued += 1,
                Err(e) => failed.push(AllocationFailure::new(id, e)),
            }
        }

        tracing::info!(
            "訂單 {} 發料完成：成功 {} 筆，失敗 {} 筆",
            order_id,
            issued,
            failed.len()
        );
        IssueResult { issued, failed }
    }

    /// ACTIVE/PICKED → CANCELLED，釋放保留量，不寫分錄
    pub fn cancel(store: &InventoryStore, allocation_id: Uuid) -> mrp_core::Result<()> {
        store.with_allocation(allocation_id, |book| {
            book.transition(allocation_id, AllocationEvent::Cancel, Vec::new())
        })?;
        tracing::info!("分配 {} 已取消", allocation_id);
        Ok(())
    }

    /// 指定資源類型的 ISSUED 分配直接轉為 CONSUMED，並寫入全額耗用分錄
    pub fn auto_consume(
        store: &InventoryStore,
        order_id: &str,
        resource_type: &str,
        actor: &str,
    ) -> AutoConsumeResult {
        let (targets, mut failed) = Self::targets(store, order_id, None, |a| {
            a.status == AllocationStatus::Issued && a.resource_type.as_deref() == Some(resource_type)
        });

        let mut auto_consumed = 0;
        for id in targets {
            let outcome = store.with_allocation(id, |book| {
                let alloc = book
                    .allocation(id)
                    .ok_or_else(|| MrpError::not_found("分配", id))?;
                let tx = Self::consumption(alloc, alloc.quantity, actor);
                book.transition(id, AllocationEvent::Consume, vec![tx])
            });

            match outcome {
                Ok(_) => auto_consumed += 1,
                Err(e) => failed.push(AllocationFailure::new(id, e)),
            }
        }

        tracing::info!(
            "訂單 {} 資源類型 {} 自動耗用 {} 筆",
            order_id,
            resource_type,
            auto_consumed
        );
        AutoConsumeResult {
            auto_consumed,
            failed,
        }
    }

    /// 耗用分錄
    pub(crate) fn consumption(alloc: &Allocation, quantity: Decimal, actor: &str) -> Transaction {
        Transaction::new(
            alloc.material_id.clone(),
            -quantity,
            TransactionType::Consumption,
            actor.to_string(),
        )
        .with_reference(Reference::allocation(alloc.id))
        .with_owner(alloc.owner_type, alloc.owner_id.clone())
    }

    /// 決定批次目標：指定ID時檢查所屬訂單，否則依條件篩選訂單分配
    fn targets(
        store: &InventoryStore,
        order_id: &str,
        allocation_ids: Option<&[Uuid]>,
        select: impl Fn(&Allocation) -> bool,
    ) -> (Vec<Uuid>, Vec<AllocationFailure>) {
        let owned = store.order_allocation_ids(order_id);

        match allocation_ids {
            Some(ids) => {
                let mut targets = Vec::new();
                let mut failed = Vec::new();
                for &id in ids {
                    if owned.contains(&id) {
                        targets.push(id);
                    } else {
                        failed.push(AllocationFailure::new(
                            id,
                            MrpError::not_found("訂單分配", format!("{}/{}", order_id, id)),
                        ));
                    }
                }
                (targets, failed)
            }
            None => {
                let targets = store
                    .allocations_for_order(order_id)
                    .iter()
                    .filter(|a| select(*a))
                    .map(|a| a.id)
                    .collect();
                (targets, Vec::new())
            }
        }
    }
}
