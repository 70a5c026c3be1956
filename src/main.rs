mod cmd;
mod core;

use clap::{Parser, Subcommand};

/// Annual capital income and tax reconciliation from broker exports
#[derive(Parser, Debug)]
#[command(name = "captax", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Per-year income, tax and net result with a totals row
    Report(cmd::report::ReportCommand),
    /// Bar chart of income, tax and net income per year
    Chart(cmd::chart::ChartCommand),
    /// Print the config schema, default config or column names
    Schema(cmd::schema::SchemaCommand),
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Command::Report(report) => report.exec(),
        Command::Chart(chart) => chart.exec(),
        Command::Schema(schema) => schema.exec(),
    }
}
