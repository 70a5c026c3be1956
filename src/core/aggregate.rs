use super::records::{TransactionKind, TransactionRecord};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::ops::RangeInclusive;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AggregateError {
    #[error("{year}: sum of {kind:?} amounts overflows")]
    Overflow { year: i32, kind: TransactionKind },
    #[error("{year}: income overflows")]
    IncomeOverflow { year: i32 },
}

/// Raw totals of one calendar year
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct YearlyAggregate {
    pub year: i32,
    pub deposit: Decimal,
    pub buy_cost: Decimal,
    pub sell_cost: Decimal,
    /// Magnitude of the summed losing sales
    pub loss: Decimal,
    pub profit: Decimal,
    pub dividend: Decimal,
    pub dividend_withholding: Decimal,
    pub loan_interest: Decimal,
}

impl YearlyAggregate {
    pub fn empty(year: i32) -> Self {
        YearlyAggregate {
            year,
            ..YearlyAggregate::default()
        }
    }

    /// Realized sale result net of costs, loan interest and losses
    pub fn stock_income(&self) -> Decimal {
        self.profit - self.buy_cost - self.sell_cost - self.loan_interest - self.loss
    }

    /// Stock income plus the full dividend
    pub fn income(&self) -> Decimal {
        self.stock_income() + self.dividend
    }

    /// Income subject to tax, counting only the taxable share of dividends
    pub fn taxed_income(&self, dividend_taxable_share: Decimal) -> Decimal {
        self.stock_income() + dividend_taxable_share * self.dividend
    }

    /// Add one record, failing instead of overflowing
    fn add(&mut self, record: &TransactionRecord) -> Result<(), AggregateError> {
        let amount = record.amount;
        let field = match record.kind {
            TransactionKind::SaleProfit | TransactionKind::SaleLoss if amount < Decimal::ZERO => {
                &mut self.loss
            }
            TransactionKind::SaleProfit | TransactionKind::SaleLoss => &mut self.profit,
            TransactionKind::BuyCost => &mut self.buy_cost,
            TransactionKind::SellCost => &mut self.sell_cost,
            TransactionKind::LoanInterest => &mut self.loan_interest,
            TransactionKind::DividendWithholding => &mut self.dividend_withholding,
            TransactionKind::Dividend => &mut self.dividend,
            TransactionKind::Deposit => &mut self.deposit,
        };
        let amount = match record.kind {
            TransactionKind::Dividend | TransactionKind::Deposit => amount,
            _ => amount.abs(),
        };
        *field = field
            .checked_add(amount)
            .ok_or(AggregateError::Overflow {
                year: record.year(),
                kind: record.kind,
            })?;
        Ok(())
    }

    /// Income with every step checked, so the unchecked accessors cannot overflow later
    fn checked_income(&self) -> Option<Decimal> {
        self.profit
            .checked_sub(self.buy_cost)?
            .checked_sub(self.sell_cost)?
            .checked_sub(self.loan_interest)?
            .checked_sub(self.loss)?
            .checked_add(self.dividend)
    }
}

/// Inclusive year range covering every record of every stream
pub fn year_range<'a, I>(streams: I) -> Option<RangeInclusive<i32>>
where
    I: IntoIterator<Item = &'a [TransactionRecord]>,
{
    let (min, max) = streams
        .into_iter()
        .flat_map(|records| records.iter().map(TransactionRecord::year))
        .fold((None, None), |(min, max): (Option<i32>, Option<i32>), year| {
            (
                Some(min.map_or(year, |m| m.min(year))),
                Some(max.map_or(year, |m| m.max(year))),
            )
        });
    Some(min?..=max?)
}

/// Sum records into one aggregate per year of `years`, ascending.
///
/// Years without records are present with all fields zero.
pub fn aggregate_years(
    records: &[TransactionRecord],
    years: RangeInclusive<i32>,
) -> Result<Vec<YearlyAggregate>, AggregateError> {
    let mut by_year: BTreeMap<i32, YearlyAggregate> = years
        .clone()
        .map(|year| (year, YearlyAggregate::empty(year)))
        .collect();

    for record in records {
        match by_year.get_mut(&record.year()) {
            Some(aggregate) => aggregate.add(record)?,
            None => log::warn!(
                "Skipping {:?} dated {} outside {}..={}",
                record.kind,
                record.date,
                years.start(),
                years.end()
            ),
        }
    }

    let aggregates: Vec<_> = by_year.into_values().collect();
    for a in &aggregates {
        if a.checked_income().is_none() {
            return Err(AggregateError::IncomeOverflow { year: a.year });
        }
        log::debug!(
            "{}: profit={} loss={} buy_cost={} sell_cost={} dividend={} withholding={} interest={} deposit={}",
            a.year,
            a.profit,
            a.loss,
            a.buy_cost,
            a.sell_cost,
            a.dividend,
            a.dividend_withholding,
            a.loan_interest,
            a.deposit
        );
    }
    Ok(aggregates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn record(date: &str, kind: TransactionKind, amount: Decimal) -> TransactionRecord {
        TransactionRecord::new(
            NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            kind,
            amount,
        )
    }

    #[test]
    fn year_boundaries_inclusive() {
        let records = vec![
            record("2021-01-01", TransactionKind::SaleProfit, dec!(100)),
            record("2021-12-31", TransactionKind::SaleProfit, dec!(50)),
            record("2022-01-01", TransactionKind::SaleProfit, dec!(7)),
        ];
        let years = aggregate_years(&records, 2021..=2022).unwrap();
        assert_eq!(years[0].profit, dec!(150));
        assert_eq!(years[1].profit, dec!(7));
    }

    #[test]
    fn losses_and_costs_summed_as_magnitudes() {
        let records = vec![
            record("2021-03-01", TransactionKind::SaleLoss, dec!(-300.50)),
            record("2021-04-01", TransactionKind::SaleLoss, dec!(-99.50)),
            record("2021-04-01", TransactionKind::BuyCost, dec!(5)),
            record("2021-04-01", TransactionKind::SellCost, dec!(-5)),
            record("2021-05-01", TransactionKind::LoanInterest, dec!(-12)),
            record("2021-05-01", TransactionKind::DividendWithholding, dec!(-30)),
        ];
        let year = aggregate_years(&records, 2021..=2021).unwrap()[0];
        assert_eq!(year.loss, dec!(400));
        assert_eq!(year.buy_cost, dec!(5));
        assert_eq!(year.sell_cost, dec!(5));
        assert_eq!(year.loan_interest, dec!(12));
        assert_eq!(year.dividend_withholding, dec!(30));
        assert_eq!(year.stock_income(), dec!(-422));
    }

    #[test]
    fn deposit_labels_sum_together() {
        // DEPOSIT and INSTANT_TRANSFER rows both normalize to Deposit
        let records = vec![
            record("2023-02-01", TransactionKind::Deposit, dec!(100)),
            record("2023-02-02", TransactionKind::Deposit, dec!(50)),
        ];
        let year = aggregate_years(&records, 2023..=2023).unwrap()[0];
        assert_eq!(year.deposit, dec!(150));
    }

    #[test]
    fn gap_years_are_zero_filled() {
        let records = vec![
            record("2019-06-01", TransactionKind::Dividend, dec!(10)),
            record("2022-06-01", TransactionKind::Dividend, dec!(20)),
        ];
        let years = aggregate_years(&records, 2019..=2022).unwrap();
        assert_eq!(
            years.iter().map(|y| y.year).collect::<Vec<_>>(),
            vec![2019, 2020, 2021, 2022]
        );
        assert_eq!(years[1], YearlyAggregate::empty(2020));
        assert_eq!(years[2], YearlyAggregate::empty(2021));
    }

    #[test]
    fn year_range_is_union_of_streams() {
        let sales = vec![
            record("2019-06-01", TransactionKind::SaleProfit, dec!(1)),
            record("2020-06-01", TransactionKind::SaleProfit, dec!(1)),
        ];
        let cash = vec![record("2023-06-01", TransactionKind::Deposit, dec!(1))];
        assert_eq!(
            year_range([sales.as_slice(), cash.as_slice()]),
            Some(2019..=2023)
        );
        assert_eq!(year_range([&[][..], cash.as_slice()]), Some(2023..=2023));
        assert_eq!(year_range([&[][..]]), None);
    }

    #[test]
    fn taxed_income_excludes_part_of_dividends() {
        let year = YearlyAggregate {
            profit: dec!(1000),
            dividend: dec!(200),
            ..YearlyAggregate::empty(2021)
        };
        assert_eq!(year.income(), dec!(1200));
        assert_eq!(year.taxed_income(dec!(0.85)), dec!(1170));
    }

    #[test]
    fn overflowing_sum_is_an_error() {
        let huge = Decimal::from_str_exact("70000000000000000000000000000").unwrap();
        let records = vec![
            record("2021-03-01", TransactionKind::SaleProfit, huge),
            record("2021-04-01", TransactionKind::SaleProfit, huge),
        ];
        assert_eq!(
            aggregate_years(&records, 2021..=2021),
            Err(AggregateError::Overflow {
                year: 2021,
                kind: TransactionKind::SaleProfit
            })
        );
    }

    #[test]
    fn overflowing_income_is_an_error() {
        let huge = Decimal::from_str_exact("70000000000000000000000000000").unwrap();
        let records = vec![
            record("2021-03-01", TransactionKind::SaleLoss, -huge),
            record("2021-04-01", TransactionKind::BuyCost, huge),
        ];
        assert_eq!(
            aggregate_years(&records, 2021..=2021),
            Err(AggregateError::IncomeOverflow { year: 2021 })
        );
    }
}
