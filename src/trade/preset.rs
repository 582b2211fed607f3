//! 按余额比例预设交易金额。

use rust_decimal::{Decimal, RoundingStrategy};

use crate::types::Side;

/// `round(balance * pct / 100, decimals)`，四舍五入远离零，结果补齐
/// 到固定小数位。
///
/// gas 预留只在 100% 买入时扣除：低比例下剩余的原生币本身足够付
/// 手续费，这一不对称是沿用的线上行为而不是 bug。扣除后不会为负。
pub fn preset_amount(
    side: Side,
    pct: u32,
    balance: Decimal,
    decimals: u32,
    fee_reserve: Decimal,
) -> Decimal {
    let base = balance * Decimal::from(pct) / Decimal::from(100u32);
    let amount = match side {
        Side::Buy if pct == 100 => (base - fee_reserve).max(Decimal::ZERO),
        _ => base.max(Decimal::ZERO),
    };
    let mut rounded = amount.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(decimals);
    rounded
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(raw: &str) -> Decimal {
        raw.parse().unwrap()
    }

    #[test]
    fn full_buy_preset_reserves_gas_buffer() {
        let amount = preset_amount(Side::Buy, 100, dec("1.0"), 6, dec("0.0002"));
        assert_eq!(amount.to_string(), "0.999800");
        assert_eq!(amount, dec("0.9998"));
    }

    #[test]
    fn full_buy_preset_never_goes_negative() {
        let amount = preset_amount(Side::Buy, 100, dec("0.0001"), 6, dec("0.0002"));
        assert_eq!(amount, Decimal::ZERO);
    }

    #[test]
    fn half_buy_preset_keeps_six_decimals() {
        let amount = preset_amount(Side::Buy, 50, dec("2.5"), 6, dec("0.0002"));
        assert_eq!(amount.to_string(), "1.250000");
    }

    #[test]
    fn partial_buy_preset_skips_gas_reserve() {
        // 预留只作用于 100%，75% 不扣
        let amount = preset_amount(Side::Buy, 75, dec("1.0"), 6, dec("0.0002"));
        assert_eq!(amount.to_string(), "0.750000");
    }

    #[test]
    fn sell_preset_rounds_to_three_decimals() {
        let amount = preset_amount(Side::Sell, 25, dec("100.123456"), 3, dec("0.0002"));
        assert_eq!(amount.to_string(), "25.031");
    }

    #[test]
    fn full_sell_preset_ignores_gas_reserve() {
        let amount = preset_amount(Side::Sell, 100, dec("10"), 3, dec("0.0002"));
        assert_eq!(amount.to_string(), "10.000");
    }
}
