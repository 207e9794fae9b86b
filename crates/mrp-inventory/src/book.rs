//! 物料帳冊：單一物料的分類帳與分配記錄，作為列鎖的保護範圍

use std::collections::HashMap;

use rust_decimal::Decimal;
use uuid::Uuid;

use mrp_core::{Allocation, AllocationEvent, AllocationStatus, Material, MrpError, StockSnapshot, Transaction};

use crate::ledger::TransactionLedger;

/// 物料帳冊
#[derive(Debug, Clone)]
pub struct MaterialBook {
    material: Material,
    ledger: TransactionLedger,
    allocations: HashMap<Uuid, Allocation>,
}

impl MaterialBook {
    pub fn new(material: Material) -> Self {
        let ledger = TransactionLedger::new(material.material_id.clone());
        Self {
            material,
            ledger,
            allocations: HashMap::new(),
        }
    }

    pub fn material(&self) -> &Material {
        &self.material
    }

    pub fn ledger(&self) -> &TransactionLedger {
        &self.ledger
    }

    pub fn on_hand(&self) -> Decimal {
        self.ledger.on_hand()
    }

    /// 已分配 = ACTIVE + PICKED + ISSUED
    pub fn allocated(&self) -> Decimal {
        self.allocations
            .values()
            .filter(|a| a.is_reserving())
            .map(|a| a.quantity)
            .sum()
    }

    /// 工單保管量：已結案分配留在現場或下落不明的數量
    pub fn in_custody(&self) -> Decimal {
        self.allocations
            .values()
            .filter_map(|a| a.return_outcome.as_ref())
            .map(|o| o.retained_quantity())
            .sum()
    }

    /// 可用 = 現有 - 已分配 - 工單保管
    pub fn available(&self) -> Decimal {
        self.on_hand() - self.allocated() - self.in_custody()
    }

    /// 庫存快照（在途由呼叫端提供）
    pub fn snapshot(&self, on_order: Decimal) -> StockSnapshot {
        StockSnapshot::new(
            self.material.material_id.clone(),
            self.on_hand(),
            self.allocated(),
            on_order,
        )
        .with_in_custody(self.in_custody())
    }

    /// 附加分錄
    pub fn post(&mut self, tx: Transaction) -> mrp_core::Result<Uuid> {
        self.ledger.append(tx)
    }

    /// 沖銷分錄
    pub fn reverse(&mut self, transaction_id: Uuid, created_by: &str) -> mrp_core::Result<Uuid> {
        let reversal = self.ledger.reversal_of(transaction_id, created_by)?;
        self.ledger.append(reversal)
    }

    /// 保留庫存；數量不可超過當下可用量
    pub fn reserve(&mut self, allocation: Allocation) -> mrp_core::Result<Uuid> {
        if allocation.quantity <= Decimal::ZERO {
            return Err(MrpError::InvalidQuantity(format!(
                "分配數量必須為正數: {}",
                allocation.quantity
            )));
        }

        let available = self.available();
        if allocation.quantity > available {
            return Err(MrpError::InsufficientStock {
                material_id: self.material.material_id.clone(),
                requested: allocation.quantity,
                available,
            });
        }

        let id = allocation.id;
        self.allocations.insert(id, allocation);
        Ok(id)
    }

    pub fn allocation(&self, allocation_id: Uuid) -> Option<&Allocation> {
        self.allocations.get(&allocation_id)
    }

    pub fn allocations(&self) -> impl Iterator<Item = &Allocation> {
        self.allocations.values()
    }

    /// 狀態轉換與分錄一併生效：先完整驗證，再寫入
    pub fn transition(
        &mut self,
        allocation_id: Uuid,
        event: AllocationEvent,
        entries: Vec<Transaction>,
    ) -> mrp_core::Result<AllocationStatus> {
        let allocation = self
            .allocations
            .get(&allocation_id)
            .ok_or_else(|| MrpError::not_found("分配", allocation_id))?;
        allocation.check(event)?;
        for tx in &entries {
            self.ledger.validate(tx)?;
        }

        for tx in entries {
            self.ledger.append(tx)?;
        }
        let allocation = self
            .allocations
            .get_mut(&allocation_id)
            .ok_or_else(|| MrpError::not_found("分配", allocation_id))?;
        allocation.apply(event)
    }

    /// 記錄退料對帳結果
    pub(crate) fn allocation_mut(&mut self, allocation_id: Uuid) -> Option<&mut Allocation> {
        self.allocations.get_mut(&allocation_id)
    }
}
