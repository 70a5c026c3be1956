//! Schema command - print the config format and report columns

use crate::core::config::{CashFields, SaleFields};
use crate::core::{Config, COLUMNS};
use clap::Args;
use schemars::schema_for;

#[derive(Args, Debug)]
pub struct SchemaCommand {
    /// What to print
    #[arg(value_enum, default_value = "config-schema")]
    format: SchemaFormat,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum SchemaFormat {
    /// JSON Schema for the config file
    ConfigSchema,
    /// Built-in defaults as a config file
    DefaultConfig,
    /// Input columns read from each export and the report columns
    Columns,
}

impl SchemaCommand {
    pub fn exec(&self) -> anyhow::Result<()> {
        match self.format {
            SchemaFormat::ConfigSchema => {
                let schema = schema_for!(Config);
                println!("{}", serde_json::to_string_pretty(&schema)?);
            }
            SchemaFormat::DefaultConfig => {
                println!("{}", serde_json::to_string_pretty(&Config::default())?);
            }
            SchemaFormat::Columns => print_columns(&Config::default()),
        }
        Ok(())
    }
}

fn print_columns(config: &Config) {
    let SaleFields {
        date,
        profit_loss,
        buy_cost,
        sell_cost,
    } = &config.sales.fields;
    println!("Sales export");
    println!("============");
    println!("{:24} {}", date, "Sale date");
    println!("{:24} {}", profit_loss, "Realized profit (positive) or loss (negative)");
    println!("{:24} {}", buy_cost, "Purchase costs");
    println!("{:24} {}", sell_cost, "Selling costs");
    println!();

    let CashFields {
        date,
        amount,
        transaction_type,
    } = &config.cash.fields;
    println!("Cash export");
    println!("===========");
    println!("{:24} {}", date, "Booking date");
    println!("{:24} {}", amount, "Signed amount");
    println!("{:24} {}", transaction_type, "Transaction type label");
    println!();

    println!("Report columns");
    println!("==============");
    println!("{}", COLUMNS.join(","));
}
