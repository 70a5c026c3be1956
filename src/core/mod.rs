pub mod aggregate;
pub mod config;
pub mod parse;
pub mod records;
pub mod report;
pub mod tax;

pub use config::{ChartStyle, Config, TaxRules};
pub use records::{read_cash, read_sales, TransactionRecord};
pub use report::{AnnualReport, ChartSeries, ReportRow, COLUMNS};

use aggregate::{aggregate_years, year_range, AggregateError};
use tax::{assess_years, TaxError};

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Aggregate(#[from] AggregateError),
    #[error(transparent)]
    Tax(#[from] TaxError),
}

/// Aggregate every stream by calendar year and assess each year in order.
///
/// Returns an empty report when no stream holds a record.
pub fn reconcile(
    streams: &[&[TransactionRecord]],
    rules: &TaxRules,
) -> Result<AnnualReport, ReconcileError> {
    let Some(years) = year_range(streams.iter().copied()) else {
        return Ok(AnnualReport::assemble(&[], &[])?);
    };
    log::info!("Reconciling years {}..={}", years.start(), years.end());

    let records: Vec<TransactionRecord> = streams.iter().flat_map(|s| s.iter().cloned()).collect();
    let aggregates = aggregate_years(&records, years)?;
    let results = assess_years(&aggregates, rules)?;
    Ok(AnnualReport::assemble(&aggregates, &results)?)
}
