use super::aggregate::YearlyAggregate;
use super::tax::{TaxError, TaxResult};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};

/// Output columns, in order
pub const COLUMNS: [&str; 13] = [
    "Year",
    "Deposit",
    "BuyCost",
    "SellCost",
    "LoanInterest",
    "Loss",
    "Profit",
    "Dividend",
    "Income",
    "PaidDividendTax",
    "TotalTax",
    "ResidualTax",
    "NetIncome",
];

/// One line of the annual table; `year` is `None` for the totals row
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReportRow {
    #[serde(serialize_with = "serialize_year")]
    pub year: Option<i32>,
    pub deposit: Decimal,
    pub buy_cost: Decimal,
    pub sell_cost: Decimal,
    pub loan_interest: Decimal,
    pub loss: Decimal,
    pub profit: Decimal,
    pub dividend: Decimal,
    pub income: Decimal,
    pub paid_dividend_tax: Decimal,
    pub total_tax: Decimal,
    pub residual_tax: Decimal,
    pub net_income: Decimal,
}

fn serialize_year<S: Serializer>(year: &Option<i32>, serializer: S) -> Result<S::Ok, S::Error> {
    match year {
        Some(y) => serializer.serialize_i32(*y),
        None => serializer.serialize_str("Total"),
    }
}

impl ReportRow {
    fn new(aggregate: &YearlyAggregate, result: &TaxResult) -> Self {
        ReportRow {
            year: Some(aggregate.year),
            deposit: aggregate.deposit,
            buy_cost: aggregate.buy_cost,
            sell_cost: aggregate.sell_cost,
            loan_interest: aggregate.loan_interest,
            loss: aggregate.loss,
            profit: aggregate.profit,
            dividend: aggregate.dividend,
            income: aggregate.income(),
            paid_dividend_tax: aggregate.dividend_withholding,
            total_tax: result.total_tax,
            residual_tax: result.residual_tax,
            net_income: result.net_income,
        }
    }

    pub fn label(&self) -> String {
        self.year.map_or("Total".to_string(), |y| y.to_string())
    }

    /// Every amount rounded to cents.
    ///
    /// Net income and residual tax are derived from the rounded income, tax and
    /// withholding so the printed columns still add up.
    pub fn rounded(&self) -> Self {
        let r = |d: Decimal| d.round_dp(2);
        let income = r(self.income);
        let paid_dividend_tax = r(self.paid_dividend_tax);
        let total_tax = r(self.total_tax);
        ReportRow {
            year: self.year,
            deposit: r(self.deposit),
            buy_cost: r(self.buy_cost),
            sell_cost: r(self.sell_cost),
            loan_interest: r(self.loan_interest),
            loss: r(self.loss),
            profit: r(self.profit),
            dividend: r(self.dividend),
            income,
            paid_dividend_tax,
            total_tax,
            residual_tax: (total_tax - paid_dividend_tax).max(Decimal::ZERO),
            net_income: income - total_tax,
        }
    }

    fn accumulate(&mut self, row: &ReportRow) -> Result<(), TaxError> {
        let add = |sum: &mut Decimal, value: Decimal| -> Result<(), TaxError> {
            *sum = sum.checked_add(value).ok_or(TaxError::TotalOverflow)?;
            Ok(())
        };
        add(&mut self.deposit, row.deposit)?;
        add(&mut self.buy_cost, row.buy_cost)?;
        add(&mut self.sell_cost, row.sell_cost)?;
        add(&mut self.loan_interest, row.loan_interest)?;
        add(&mut self.loss, row.loss)?;
        add(&mut self.profit, row.profit)?;
        add(&mut self.dividend, row.dividend)?;
        add(&mut self.income, row.income)?;
        add(&mut self.paid_dividend_tax, row.paid_dividend_tax)?;
        add(&mut self.total_tax, row.total_tax)?;
        add(&mut self.residual_tax, row.residual_tax)?;
        add(&mut self.net_income, row.net_income)
    }
}

/// Per-year rows plus a trailing totals row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnualReport {
    pub rows: Vec<ReportRow>,
    pub total: ReportRow,
}

impl AnnualReport {
    pub fn assemble(
        aggregates: &[YearlyAggregate],
        results: &[TaxResult],
    ) -> Result<Self, TaxError> {
        let misaligned = TaxError::Misaligned {
            aggregates: aggregates.len(),
            results: results.len(),
        };
        if aggregates.len() != results.len() {
            return Err(misaligned);
        }

        let mut rows = Vec::with_capacity(aggregates.len());
        for (aggregate, result) in aggregates.iter().zip(results) {
            if aggregate.year != result.year {
                return Err(misaligned);
            }
            rows.push(ReportRow::new(aggregate, result));
        }
        AnnualReport::from_rows(rows)
    }

    fn from_rows(rows: Vec<ReportRow>) -> Result<Self, TaxError> {
        let mut total = ReportRow::default();
        for row in &rows {
            total.accumulate(row)?;
        }
        Ok(AnnualReport { rows, total })
    }

    /// Rows rounded to cents, totals summed from the rounded rows
    pub fn rounded(&self) -> Result<Self, TaxError> {
        AnnualReport::from_rows(self.rows.iter().map(ReportRow::rounded).collect())
    }

    /// Only the row for `year`, with the totals row recomputed
    pub fn for_year(&self, year: i32) -> Result<Self, TaxError> {
        let rows = self
            .rows
            .iter()
            .filter(|r| r.year == Some(year))
            .copied()
            .collect();
        AnnualReport::from_rows(rows)
    }

    /// Year rows followed by the totals row
    pub fn lines(&self) -> impl Iterator<Item = &ReportRow> {
        self.rows.iter().chain(std::iter::once(&self.total))
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn series(&self) -> ChartSeries {
        let column = |f: fn(&ReportRow) -> Decimal| -> Vec<f64> {
            self.rows
                .iter()
                .map(|r| f(r).round_dp(2).to_f64().unwrap_or_default())
                .collect()
        };
        ChartSeries {
            years: self.rows.iter().filter_map(|r| r.year).collect(),
            deposit: column(|r| r.deposit),
            income: column(|r| r.income),
            total_tax: column(|r| r.total_tax),
            residual_tax: column(|r| r.residual_tax),
            net_income: column(|r| r.net_income),
        }
    }
}

/// Parallel per-year vectors for plotting
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub years: Vec<i32>,
    pub deposit: Vec<f64>,
    pub income: Vec<f64>,
    pub total_tax: Vec<f64>,
    pub residual_tax: Vec<f64>,
    pub net_income: Vec<f64>,
}
