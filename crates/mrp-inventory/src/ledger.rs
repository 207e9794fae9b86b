//! 庫存異動分類帳
//!
//! 只允許附加。每筆附加同時更新現有庫存累計值，累計值必須能由重播全部分錄重現。

use rust_decimal::Decimal;
use uuid::Uuid;

use mrp_core::{MrpError, Reference, Transaction, TransactionType};

/// 單一物料的分類帳
#[derive(Debug, Clone)]
pub struct TransactionLedger {
    material_id: String,
    entries: Vec<Transaction>,
    on_hand: Decimal,
}

impl TransactionLedger {
    /// 創建空的分類帳
    pub fn new(material_id: String) -> Self {
        Self {
            material_id,
            entries: Vec::new(),
            on_hand: Decimal::ZERO,
        }
    }

    /// 檢查分錄是否可附加（不修改分類帳）
    pub fn validate(&self, tx: &Transaction) -> mrp_core::Result<()> {
        if tx.material_id != self.material_id {
            return Err(MrpError::not_found("物料", &tx.material_id));
        }
        tx.transaction_type.validate_quantity(tx.quantity)
    }

    /// 附加分錄
    pub fn append(&mut self, tx: Transaction) -> mrp_core::Result<Uuid> {
        self.validate(&tx)?;

        let id = tx.id;
        self.on_hand += tx.stock_effect();
        self.entries.push(tx);

        Ok(id)
    }

    /// 現有庫存（累計值）
    pub fn on_hand(&self) -> Decimal {
        self.on_hand
    }

    /// 重播全部分錄計算現有庫存
    pub fn replay(&self) -> Decimal {
        self.entries.iter().map(|tx| tx.stock_effect()).sum()
    }

    pub fn entries(&self) -> &[Transaction] {
        &self.entries
    }

    pub fn find(&self, transaction_id: Uuid) -> Option<&Transaction> {
        self.entries.iter().find(|tx| tx.id == transaction_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 建立沖銷分錄（ADJUSTMENT，數量為原分錄庫存影響的相反數）
    pub fn reversal_of(
        &self,
        transaction_id: Uuid,
        created_by: &str,
    ) -> mrp_core::Result<Transaction> {
        let original = self
            .find(transaction_id)
            .ok_or_else(|| MrpError::not_found("異動", transaction_id))?;

        if original.transaction_type.is_custody_memo() {
            return Err(MrpError::InvalidQuantity(format!(
                "保管備忘分錄 {} 無庫存影響，不可沖銷",
                transaction_id
            )));
        }

        let reference = Reference::transaction(transaction_id);
        if self
            .entries
            .iter()
            .any(|tx| tx.reference.as_ref() == Some(&reference))
        {
            return Err(MrpError::InvalidQuantity(format!(
                "異動 {} 已沖銷",
                transaction_id
            )));
        }

        Ok(Transaction::new(
            self.material_id.clone(),
            -original.stock_effect(),
            TransactionType::Adjustment,
            created_by.to_string(),
        )
        .with_reference(reference)
        .with_owner(original.owner_type, original.owner_id.clone()))
    }
}
