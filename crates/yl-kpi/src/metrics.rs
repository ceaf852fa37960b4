use rust_decimal::{Decimal, MathematicalOps};
use serde::Serialize;
use yieldlens_db::models::PoolSnapshot;

use crate::error::KpiError;

const VOLATILITY_DP: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Volatility {
    /// Population standard deviation of supply APY, in percentage points.
    pub value: Decimal,
    pub samples: usize,
    /// Fewer snapshots than the requested window were available.
    pub low_confidence: bool,
}

/// Standard deviation of supply APY over the most recent `window_size` snapshots.
///
/// `history` must be ordered oldest first.
pub fn rolling_volatility(
    history: &[PoolSnapshot],
    window_size: usize,
) -> Result<Volatility, KpiError> {
    let recent = &history[history.len().saturating_sub(window_size)..];
    let samples = recent.len();
    let low_confidence = samples < window_size || samples < 2;

    if samples < 2 {
        return Ok(Volatility {
            value: Decimal::ZERO,
            samples,
            low_confidence,
        });
    }

    let overflow =
        || KpiError::CalculationError("Supply APY out of range for volatility".to_string());
    let count = Decimal::from(samples);
    let mean = recent
        .iter()
        .try_fold(Decimal::ZERO, |acc, s| acc.checked_add(s.supply_apy))
        .and_then(|sum| sum.checked_div(count))
        .ok_or_else(overflow)?;
    let variance = recent
        .iter()
        .try_fold(Decimal::ZERO, |acc, s| {
            let deviation = s.supply_apy.checked_sub(mean)?;
            acc.checked_add(deviation.checked_mul(deviation)?)
        })
        .and_then(|squares| squares.checked_div(count))
        .ok_or_else(overflow)?;
    let value = variance.sqrt().ok_or_else(|| {
        KpiError::CalculationError("Failed to compute standard deviation".to_string())
    })?;

    Ok(Volatility {
        value: value.round_dp(VOLATILITY_DP),
        samples,
        low_confidence,
    })
}

/// True when utilization rose by more than `threshold` since the previous snapshot.
pub fn utilization_spike(history: &[PoolSnapshot], threshold: Decimal) -> bool {
    match history {
        [.., previous, latest] => latest.utilization - previous.utilization > threshold,
        _ => false,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal::dec;

    pub(crate) fn snapshot(hour: i64, supply_apy: Decimal, utilization: Decimal) -> PoolSnapshot {
        let ts = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + Duration::hours(hour);
        PoolSnapshot {
            id: hour,
            pool_id: 1,
            timestamp: ts,
            source: "mock".to_string(),
            supply_apy,
            borrow_apy: dec!(5),
            incentive_apy: dec!(1),
            utilization,
            tvl_usd: dec!(1000000),
            created_at: ts,
        }
    }

    fn history(apys: &[Decimal]) -> Vec<PoolSnapshot> {
        apys.iter()
            .enumerate()
            .map(|(i, apy)| snapshot(i as i64, *apy, dec!(0.5)))
            .collect()
    }

    #[test]
    fn test_volatility_over_window() {
        let h = history(&[
            dec!(100),
            dec!(2),
            dec!(4),
            dec!(4),
            dec!(4),
            dec!(5),
            dec!(5),
            dec!(7),
            dec!(9),
        ]);
        // Only the last 8 values count: mean 5, population std dev 2.
        let vol = rolling_volatility(&h, 8).unwrap();
        assert_eq!(vol.value, dec!(2));
        assert_eq!(vol.samples, 8);
        assert!(!vol.low_confidence);
    }

    #[test]
    fn test_short_history_is_low_confidence() {
        let vol = rolling_volatility(&history(&[dec!(3), dec!(5)]), 24).unwrap();
        assert_eq!(vol.value, dec!(1));
        assert_eq!(vol.samples, 2);
        assert!(vol.low_confidence);

        let vol = rolling_volatility(&history(&[dec!(3)]), 24).unwrap();
        assert_eq!(vol.value, Decimal::ZERO);
        assert!(vol.low_confidence);

        let vol = rolling_volatility(&[], 24).unwrap();
        assert_eq!(vol.samples, 0);
    }

    #[test]
    fn test_extreme_apys_are_rejected() {
        let h = history(&[dec!(1000000000000000), dec!(-1000000000000000)]);
        assert!(matches!(
            rolling_volatility(&h, 24),
            Err(KpiError::CalculationError(_))
        ));

        let h = history(&[Decimal::MAX, Decimal::MAX]);
        assert!(rolling_volatility(&h, 24).is_err());
    }

    #[test]
    fn test_utilization_spike() {
        let calm = vec![snapshot(0, dec!(3), dec!(0.50)), snapshot(1, dec!(3), dec!(0.52))];
        let spiking = vec![snapshot(0, dec!(3), dec!(0.50)), snapshot(1, dec!(3), dec!(0.70))];
        let falling = vec![snapshot(0, dec!(3), dec!(0.70)), snapshot(1, dec!(3), dec!(0.50))];

        assert!(!utilization_spike(&calm, dec!(0.05)));
        assert!(utilization_spike(&spiking, dec!(0.05)));
        assert!(!utilization_spike(&falling, dec!(0.05)));
        assert!(!utilization_spike(&calm[..1], dec!(0.0)));
    }
}
