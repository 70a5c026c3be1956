//! Annual tax liability: two-bracket schedule with a rolling loss carryforward.

use super::aggregate::YearlyAggregate;
use super::config::TaxRules;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

const HUNDRED: Decimal = dec!(100);

/// Misuse of the engine, or amounts too large to represent
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaxError {
    #[error("tax requested on an empty income history")]
    EmptyHistory,
    #[error("income for {year} appended after {last}; years must be strictly ascending")]
    OutOfOrder { last: i32, year: i32 },
    #[error("tax requested for {year} but the income history ends at {last}")]
    NotAppended { year: i32, last: i32 },
    #[error("{aggregates} yearly aggregates do not line up with {results} tax results")]
    Misaligned { aggregates: usize, results: usize },
    #[error("{year}: taxed income with carried losses overflows")]
    Overflow { year: i32 },
    #[error("report totals overflow")]
    TotalOverflow,
}

/// Bracket constants in force for one year
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BracketSchedule {
    pub base_rate: Decimal,
    pub margin_rate: Decimal,
    pub margin_threshold: Decimal,
    pub zero_tax_threshold: Decimal,
}

impl BracketSchedule {
    pub fn for_year(rules: &TaxRules, year: i32) -> Self {
        BracketSchedule {
            base_rate: rules.base_rate,
            margin_rate: rules.margin_rate,
            margin_threshold: rules.margin_threshold_for(year),
            zero_tax_threshold: rules.zero_tax_threshold,
        }
    }

    /// Tax on a single year's income
    pub fn tax(&self, income: Decimal) -> Decimal {
        // rates are at most 100%, so scaling by them never overflows
        let base_rate = self.base_rate / HUNDRED;
        let margin_rate = self.margin_rate / HUNDRED;
        if income > self.margin_threshold {
            base_rate * self.margin_threshold + margin_rate * (income - self.margin_threshold)
        } else if income <= self.zero_tax_threshold {
            Decimal::ZERO
        } else {
            base_rate * income
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearIncome {
    pub year: i32,
    pub income: Decimal,
}

/// Taxed incomes of every processed year, oldest first. Append-only.
#[derive(Debug, Clone, Default)]
pub struct TaxableIncomeHistory {
    entries: Vec<YearIncome>,
}

impl TaxableIncomeHistory {
    pub fn new() -> Self {
        TaxableIncomeHistory::default()
    }

    pub fn push(&mut self, year: i32, income: Decimal) -> Result<(), TaxError> {
        if let Some(last) = self.last() {
            if year <= last.year {
                return Err(TaxError::OutOfOrder {
                    last: last.year,
                    year,
                });
            }
        }
        self.entries.push(YearIncome { year, income });
        Ok(())
    }

    pub fn last(&self) -> Option<YearIncome> {
        self.entries.last().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &YearIncome> {
        self.entries.iter()
    }

    /// Sum of at most `window - 1` entries immediately before the last one,
    /// `None` on overflow
    pub fn prior_sum(&self, window: usize) -> Option<Decimal> {
        let prior = &self.entries[..self.entries.len().saturating_sub(1)];
        prior
            .iter()
            .rev()
            .take(window.saturating_sub(1))
            .try_fold(Decimal::ZERO, |sum, e| sum.checked_add(e.income))
    }
}

/// Tax for the last year in `history`.
///
/// Net losses of the preceding years inside the carryforward window lower the
/// taxed base; a positive prior sum is ignored.
pub fn total_tax(history: &TaxableIncomeHistory, rules: &TaxRules) -> Result<Decimal, TaxError> {
    let current = history.last().ok_or(TaxError::EmptyHistory)?;
    let overflow = TaxError::Overflow { year: current.year };
    let prior = history
        .prior_sum(rules.carryforward_window_years)
        .ok_or(overflow.clone())?;
    let base = if prior < Decimal::ZERO {
        current.income.checked_add(prior).ok_or(overflow)?
    } else {
        current.income
    };

    let tax = BracketSchedule::for_year(rules, current.year).tax(base);
    log::debug!(
        "{}: taxed income {} prior {} base {} tax {}",
        current.year,
        current.income,
        prior,
        base,
        tax
    );
    Ok(tax)
}

/// Tax outcome of one year
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TaxResult {
    pub year: i32,
    /// Stock income plus the taxable share of dividends
    pub taxed_income: Decimal,
    pub total_tax: Decimal,
    /// Tax still owed after crediting dividend withholding
    pub residual_tax: Decimal,
    pub net_income: Decimal,
}

/// Processes years in ascending order, carrying the income history
pub struct TaxEngine<'a> {
    rules: &'a TaxRules,
    history: TaxableIncomeHistory,
}

impl<'a> TaxEngine<'a> {
    pub fn new(rules: &'a TaxRules) -> Self {
        TaxEngine {
            rules,
            history: TaxableIncomeHistory::new(),
        }
    }

    pub fn history(&self) -> &TaxableIncomeHistory {
        &self.history
    }

    /// Append the year's taxed income and compute its tax
    pub fn assess(&mut self, aggregate: &YearlyAggregate) -> Result<TaxResult, TaxError> {
        let taxed_income = aggregate.taxed_income(self.rules.dividend_taxable_share);
        self.history.push(aggregate.year, taxed_income)?;

        let total_tax = self.total_tax_for(aggregate.year)?;
        let residual_tax = (total_tax - aggregate.dividend_withholding).max(Decimal::ZERO);
        Ok(TaxResult {
            year: aggregate.year,
            taxed_income,
            total_tax,
            residual_tax,
            net_income: aggregate.income() - total_tax,
        })
    }

    /// Tax for `year`, which must be the last year appended
    pub fn total_tax_for(&self, year: i32) -> Result<Decimal, TaxError> {
        let last = self.history.last().ok_or(TaxError::EmptyHistory)?;
        if last.year != year {
            return Err(TaxError::NotAppended {
                year,
                last: last.year,
            });
        }
        total_tax(&self.history, self.rules)
    }
}

/// Assess every aggregate in order
pub fn assess_years(
    aggregates: &[YearlyAggregate],
    rules: &TaxRules,
) -> Result<Vec<TaxResult>, TaxError> {
    let mut engine = TaxEngine::new(rules);
    aggregates.iter().map(|a| engine.assess(a)).collect()
}
