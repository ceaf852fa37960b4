pub mod dune;
pub mod mock;
pub mod thegraph;

pub use dune::DuneProvider;
pub use mock::{MockProvider, SeedPool};
pub use thegraph::TheGraphProvider;

use rust_decimal::{Decimal, dec};
use yieldlens_types::SnapshotRecord;

/// Largest APY magnitude accepted from a provider, in percent.
pub(crate) const MAX_ABS_APY: Decimal = dec!(100000);

/// Bounds every normalizer enforces on canonical records.
pub(crate) fn check_record(record: &SnapshotRecord) -> Result<(), String> {
    if record.utilization < Decimal::ZERO || record.utilization > Decimal::ONE {
        return Err(format!(
            "utilization {} outside [0, 1] for {}",
            record.utilization, record.pool.key
        ));
    }
    for (field, apy) in [
        ("supply_apy", record.supply_apy),
        ("borrow_apy", record.borrow_apy),
        ("incentive_apy", record.incentive_apy),
    ] {
        if apy.abs() > MAX_ABS_APY {
            return Err(format!(
                "{field} {apy} outside [-{MAX_ABS_APY}, {MAX_ABS_APY}] for {}",
                record.pool.key
            ));
        }
    }
    if record.tvl_usd.is_sign_negative() {
        return Err(format!("negative tvl_usd for {}", record.pool.key));
    }
    if record.pool.key.pool_address.is_empty() {
        return Err("empty pool address".to_string());
    }
    Ok(())
}
