use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::error::KpiError;

/// Largest peak-to-trough decline, in percent.
// NOTE: series must be pre-sorted in chronological order (oldest first)
pub fn calculate_max_drawdown(series: &[(DateTime<Utc>, Decimal)]) -> Result<Decimal, KpiError> {
    let mut peak = Decimal::ZERO;
    let mut max_drawdown = Decimal::ZERO;

    for (timestamp, value) in series {
        if value.is_sign_negative() {
            return Err(KpiError::InvalidData(format!(
                "Portfolio value at {timestamp} cannot be negative"
            )));
        }
        if *value > peak {
            peak = *value;
        } else if peak > Decimal::ZERO {
            let drawdown = (peak - *value) / peak * Decimal::ONE_HUNDRED;
            max_drawdown = max_drawdown.max(drawdown);
        }
    }

    Ok(max_drawdown)
}
