use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, dec};
use serde::Serialize;
use yieldlens_db::models::PoolSnapshot;
use yieldlens_types::ConfigError;

use crate::error::KpiError;
use crate::metrics::{Volatility, rolling_volatility, utilization_spike};

/// Coefficients of the stability and risk-adjusted scores.
///
/// `stability = clamp(100 - a * volatility - b * spike_penalty, 0, 100)` where the
/// penalty only applies while utilization is spiking, and
/// `risk_adjusted = w1 * supply_apy + w2 * stability + w3 * incentive_apy - w4 * borrow_apy`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoringConfig {
    pub a: Decimal,
    pub b: Decimal,
    pub spike_penalty: Decimal,
    pub w1: Decimal,
    pub w2: Decimal,
    pub w3: Decimal,
    pub w4: Decimal,
    /// Number of most recent snapshots used for volatility.
    pub volatility_window: usize,
    /// Utilization increase between two snapshots that counts as a spike (ratio).
    pub spike_threshold: Decimal,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            a: dec!(10),
            b: dec!(1),
            spike_penalty: dec!(15),
            w1: dec!(1),
            w2: dec!(0.05),
            w3: dec!(0.5),
            w4: dec!(0.25),
            volatility_window: 24,
            spike_threshold: dec!(0.05),
        }
    }
}

impl ScoringConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.volatility_window == 0 {
            return Err(ConfigError::invalid("VOLATILITY_WINDOW", "must be positive"));
        }
        for (setting, value) in [
            ("SPIKE_THRESHOLD", self.spike_threshold),
            ("SCORE_A", self.a),
            ("SCORE_B", self.b),
            ("SCORE_SPIKE_PENALTY", self.spike_penalty),
        ] {
            if value.is_sign_negative() {
                return Err(ConfigError::invalid(setting, "must not be negative"));
            }
        }
        Ok(())
    }
}

pub fn stability_score(volatility: Decimal, spiking: bool, config: &ScoringConfig) -> Decimal {
    let penalty = if spiking {
        config.spike_penalty
    } else {
        Decimal::ZERO
    };
    // Saturation only ever lands outside [0, 100], where the clamp applies anyway.
    Decimal::ONE_HUNDRED
        .saturating_sub(config.a.saturating_mul(volatility))
        .saturating_sub(config.b.saturating_mul(penalty))
        .clamp(Decimal::ZERO, Decimal::ONE_HUNDRED)
}

pub fn risk_adjusted_score(
    supply_apy: Decimal,
    incentive_apy: Decimal,
    borrow_apy: Decimal,
    stability: Decimal,
    config: &ScoringConfig,
) -> Result<Decimal, KpiError> {
    let score = || {
        config
            .w1
            .checked_mul(supply_apy)?
            .checked_add(config.w2.checked_mul(stability)?)?
            .checked_add(config.w3.checked_mul(incentive_apy)?)?
            .checked_sub(config.w4.checked_mul(borrow_apy)?)
    };
    score()
        .ok_or_else(|| KpiError::CalculationError("Risk-adjusted score overflow".to_string()))
}

/// Metrics and scores of a pool as of its latest snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolScore {
    pub timestamp: DateTime<Utc>,
    pub volatility: Volatility,
    pub utilization_spike: bool,
    pub stability_score: Decimal,
    pub risk_adjusted_score: Decimal,
}

/// Scores the latest snapshot of `history` (oldest first). `None` for an empty history.
pub fn score_history(
    history: &[PoolSnapshot],
    config: &ScoringConfig,
) -> Result<Option<PoolScore>, KpiError> {
    let Some(latest) = history.last() else {
        return Ok(None);
    };

    let volatility = rolling_volatility(history, config.volatility_window)?;
    let spiking = utilization_spike(history, config.spike_threshold);
    let stability = stability_score(volatility.value, spiking, config);
    let risk_adjusted = risk_adjusted_score(
        latest.supply_apy,
        latest.incentive_apy,
        latest.borrow_apy,
        stability,
        config,
    )?;

    Ok(Some(PoolScore {
        timestamp: latest.timestamp,
        volatility,
        utilization_spike: spiking,
        stability_score: stability,
        risk_adjusted_score: risk_adjusted,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::tests::snapshot;

    #[test]
    fn test_stability_is_clamped() {
        let config = ScoringConfig::default();
        assert_eq!(stability_score(dec!(0), false, &config), dec!(100));
        assert_eq!(stability_score(dec!(2), true, &config), dec!(65));
        assert_eq!(stability_score(dec!(50), true, &config), Decimal::ZERO);
        assert_eq!(stability_score(Decimal::MAX, false, &config), Decimal::ZERO);
    }

    #[test]
    fn test_risk_adjusted_score() {
        let config = ScoringConfig::default();
        // 4 + 0.05 * 80 + 0.5 * 1 - 0.25 * 6
        assert_eq!(
            risk_adjusted_score(dec!(4), dec!(1), dec!(6), dec!(80), &config).unwrap(),
            dec!(7)
        );
        assert!(risk_adjusted_score(Decimal::MAX, dec!(0), dec!(0), dec!(0), &config).is_ok());
        let heavy = ScoringConfig {
            w1: dec!(2),
            ..Default::default()
        };
        assert!(risk_adjusted_score(Decimal::MAX, dec!(0), dec!(0), dec!(0), &heavy).is_err());
    }

    #[test]
    fn test_scoring_is_deterministic() {
        let config = ScoringConfig::default();
        let history: Vec<_> = (0..48)
            .map(|h| {
                snapshot(
                    h,
                    dec!(4) + Decimal::new(h % 7, 1),
                    dec!(0.6) + Decimal::new(h % 3, 2),
                )
            })
            .collect();

        let first = score_history(&history, &config).unwrap().unwrap();
        for _ in 0..10 {
            assert_eq!(score_history(&history, &config).unwrap().unwrap(), first);
        }
        assert!(score_history(&[], &config).unwrap().is_none());
    }

    #[test]
    fn test_validate() {
        assert!(ScoringConfig::default().validate().is_ok());
        let config = ScoringConfig {
            volatility_window: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        let config = ScoringConfig {
            spike_threshold: dec!(-0.1),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
