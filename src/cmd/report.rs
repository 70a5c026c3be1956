//! Report command - annual income, tax and net result table

use super::InputArgs;
use crate::core::{AnnualReport, ReportRow};
use clap::Args;
use rust_decimal::Decimal;
use std::io;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

#[derive(Args, Debug)]
pub struct ReportCommand {
    #[command(flatten)]
    input: InputArgs,

    /// Only show this calendar year (earlier years still count for loss carryforward)
    #[arg(short, long)]
    year: Option<i32>,

    /// Output as CSV instead of formatted table
    #[arg(long, conflicts_with = "json")]
    csv: bool,

    /// Output as JSON instead of formatted table
    #[arg(long)]
    json: bool,
}

impl ReportCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        let (_, report) = self.input.reconcile()?;
        let report = match self.year {
            Some(year) => {
                let view = report.for_year(year)?;
                if view.is_empty() {
                    anyhow::bail!("No data for year {}", year);
                }
                view
            }
            None => report,
        };
        let report = report.rounded()?;

        if self.csv {
            write_csv(&report)
        } else if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        } else {
            print_table(&report);
            Ok(())
        }
    }
}

/// Row for the annual table output
#[derive(Debug, Clone, Tabled)]
pub struct TableRow {
    #[tabled(rename = "Year")]
    pub year: String,
    #[tabled(rename = "Deposit")]
    pub deposit: String,
    #[tabled(rename = "Buy cost")]
    pub buy_cost: String,
    #[tabled(rename = "Sell cost")]
    pub sell_cost: String,
    #[tabled(rename = "Loan interest")]
    pub loan_interest: String,
    #[tabled(rename = "Loss")]
    pub loss: String,
    #[tabled(rename = "Profit")]
    pub profit: String,
    #[tabled(rename = "Dividend")]
    pub dividend: String,
    #[tabled(rename = "Income")]
    pub income: String,
    #[tabled(rename = "Paid div. tax")]
    pub paid_dividend_tax: String,
    #[tabled(rename = "Total tax")]
    pub total_tax: String,
    #[tabled(rename = "Residual tax")]
    pub residual_tax: String,
    #[tabled(rename = "Net income")]
    pub net_income: String,
}

impl From<&ReportRow> for TableRow {
    fn from(row: &ReportRow) -> Self {
        TableRow {
            year: row.label(),
            deposit: format_amount(row.deposit),
            buy_cost: format_amount(row.buy_cost),
            sell_cost: format_amount(row.sell_cost),
            loan_interest: format_amount(row.loan_interest),
            loss: format_amount(row.loss),
            profit: format_amount(row.profit),
            dividend: format_amount(row.dividend),
            income: format_amount(row.income),
            paid_dividend_tax: format_amount(row.paid_dividend_tax),
            total_tax: format_amount(row.total_tax),
            residual_tax: format_amount(row.residual_tax),
            net_income: format_amount(row.net_income),
        }
    }
}

fn print_table(report: &AnnualReport) {
    let rows: Vec<TableRow> = report.lines().map(TableRow::from).collect();
    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Rows::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{}", table);
}

fn write_csv(report: &AnnualReport) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_writer(io::stdout());
    for row in report.lines() {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

fn format_amount(amount: Decimal) -> String {
    format!("{:.2}", amount)
}
