//! 供應追溯：依優先順序把共享供應分配給競爭的需求

use rust_decimal::Decimal;

/// 供應追溯計算器
pub struct PeggingCalculator;

impl PeggingCalculator {
    /// 依序滿足需求（先到先得），回傳每筆需求分得的數量
    ///
    /// `claims` 必須已依優先順序排序；供應池為負時視為零。
    pub fn peg(pool: Decimal, claims: &[Decimal]) -> Vec<Decimal> {
        let mut remaining = pool.max(Decimal::ZERO);

        claims
            .iter()
            .map(|&claim| {
                let pegged = claim.max(Decimal::ZERO).min(remaining);
                remaining -= pegged;
                pegged
            })
            .collect()
    }

    /// 每筆需求未被滿足的數量
    pub fn shortfalls(pool: Decimal, claims: &[Decimal]) -> Vec<Decimal> {
        Self::peg(pool, claims)
            .into_iter()
            .zip(claims)
            .map(|(pegged, &claim)| (claim - pegged).max(Decimal::ZERO))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn d(values: &[i64]) -> Vec<Decimal> {
        values.iter().map(|&v| Decimal::from(v)).collect()
    }

    #[test]
    fn test_earlier_claim_served_first() {
        let claims = d(&[60, 70]);

        assert_eq!(PeggingCalculator::peg(Decimal::from(100), &claims), d(&[60, 40]));
        assert_eq!(PeggingCalculator::shortfalls(Decimal::from(100), &claims), d(&[0, 30]));
    }

    #[test]
    fn test_negative_pool_serves_nothing() {
        let claims = d(&[5, 5]);
        assert_eq!(PeggingCalculator::peg(Decimal::from(-3), &claims), d(&[0, 0]));
        assert_eq!(PeggingCalculator::shortfalls(Decimal::from(-3), &claims), d(&[5, 5]));
    }

    #[test]
    fn test_surplus_pool() {
        let claims = d(&[1, 2, 3]);
        assert_eq!(PeggingCalculator::peg(Decimal::from(100), &claims), claims);
    }

    proptest! {
        #[test]
        fn prop_pegged_plus_shortfall_is_demand(
            pool in -100i64..1000,
            claims in prop::collection::vec(0i64..200, 0..20),
        ) {
            let claims = d(&claims);
            let pool = Decimal::from(pool);
            let pegged = PeggingCalculator::peg(pool, &claims);
            let short = PeggingCalculator::shortfalls(pool, &claims);

            let total_pegged: Decimal = pegged.iter().copied().sum();
            let total_claims: Decimal = claims.iter().copied().sum();
            let total_short: Decimal = short.iter().copied().sum();

            prop_assert!(total_pegged <= pool.max(Decimal::ZERO));
            prop_assert_eq!(total_pegged + total_short, total_claims);
            // 總缺口 = max(0, 總需求 - 供應池)
            prop_assert_eq!(total_short, (total_claims - pool.max(Decimal::ZERO)).max(Decimal::ZERO));
        }
    }
}
