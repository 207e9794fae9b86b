//! 淨需求計算

use rust_decimal::Decimal;

/// 淨需求計算器
pub struct NettingCalculator;

impl NettingCalculator {
    /// 淨需求 = max(0, 總需求 - 可用 - 在途)
    ///
    /// 可用量可能為負（超額分配），此時照實扣減，淨需求相應增加。
    pub fn net_requirement(total_required: Decimal, available: Decimal, on_order: Decimal) -> Decimal {
        (total_required - available - on_order).max(Decimal::ZERO)
    }

    /// 是否缺料：總需求 > 可用 + 在途
    pub fn is_short(total_required: Decimal, available: Decimal, on_order: Decimal) -> bool {
        total_required > available + on_order
    }

    /// 分配模擬用的供應池：負的可用量不提供任何供應
    pub fn supply_pool(available: Decimal, on_order: Decimal) -> Decimal {
        available.max(Decimal::ZERO) + on_order
    }
}
