pub mod chart;
pub mod report;
pub mod schema;

use crate::core::{read_cash, read_sales, AnnualReport, Config, TransactionRecord};
use anyhow::Context;
use clap::Args;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Input exports and configuration shared by the reporting commands
#[derive(Args, Debug)]
pub struct InputArgs {
    /// Realized sales export, one row per sold lot
    #[arg(short, long)]
    sales: Option<PathBuf>,

    /// Cash account export with dividends, withholding, loan interest and deposits
    #[arg(short, long)]
    cash: Option<PathBuf>,

    /// JSON config file (built-in defaults when omitted)
    #[arg(long)]
    config: Option<PathBuf>,
}

impl InputArgs {
    pub fn load_config(&self) -> anyhow::Result<Config> {
        match &self.config {
            Some(path) => Ok(Config::load(path)?),
            None => {
                let config = Config::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    /// Read every given export and reconcile all years
    pub fn reconcile(&self) -> anyhow::Result<(Config, AnnualReport)> {
        let config = self.load_config()?;
        if self.sales.is_none() && self.cash.is_none() {
            anyhow::bail!("No input given. Provide --sales and/or --cash.");
        }

        let sales = match &self.sales {
            Some(path) => read_sales(open(path)?, &config.sales)
                .with_context(|| format!("reading {}", path.display()))?,
            None => Vec::new(),
        };
        let cash = match &self.cash {
            Some(path) => read_cash(open(path)?, &config.cash)
                .with_context(|| format!("reading {}", path.display()))?,
            None => Vec::new(),
        };

        let streams: [&[TransactionRecord]; 2] = [&sales, &cash];
        let report = crate::core::reconcile(&streams, &config.tax)?;
        if report.is_empty() {
            anyhow::bail!("No transactions found in the given exports");
        }
        Ok((config, report))
    }
}

fn open(path: &Path) -> anyhow::Result<BufReader<File>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    Ok(BufReader::new(file))
}
