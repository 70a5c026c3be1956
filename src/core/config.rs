//! Immutable run configuration: tax constants, input column mappings and chart colors.
//!
//! Everything here is loaded once at startup (JSON, every key optional) and passed by
//! reference into the normalizer, the aggregator and the tax engine.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("missing field mapping: {0}")]
    MissingFieldMapping(&'static str),
    #[error("no deposit labels configured")]
    NoDepositLabels,
    #[error("label '{label}' is mapped to both {first} and {second}")]
    AmbiguousLabel {
        label: String,
        first: &'static str,
        second: &'static str,
    },
    #[error("invalid value for {name}: {reason}")]
    InvalidValue { name: &'static str, reason: String },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Config {
    pub tax: TaxRules,
    pub sales: SaleSource,
    pub cash: CashSource,
    pub chart: ChartStyle,
}

impl Config {
    /// Load and validate a JSON config file
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let file = File::open(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Config::from_reader(BufReader::new(file))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Config, ConfigError> {
        let config: Config = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.tax.validate()?;
        self.sales.validate()?;
        self.cash.validate()?;
        Ok(())
    }
}

/// Constants of the two-bracket capital income tax with loss carryforward.
///
/// Rates are percentages (30 means 30%).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct TaxRules {
    /// Flat rate applied up to the margin threshold
    #[schemars(with = "f64")]
    pub base_rate: Decimal,
    /// Rate applied to the part of income above the margin threshold
    #[schemars(with = "f64")]
    pub margin_rate: Decimal,
    /// Threshold used for years not covered by a regime
    #[schemars(with = "f64")]
    pub margin_threshold: Decimal,
    /// Incomes at or below this amount are not taxed
    #[schemars(with = "f64")]
    pub zero_tax_threshold: Decimal,
    /// Current year plus the preceding years whose losses may offset it
    pub carryforward_window_years: usize,
    /// Share of dividends counted as taxable income
    #[schemars(with = "f64")]
    pub dividend_taxable_share: Decimal,
    /// Margin threshold changes, ordered by starting year
    pub regimes: Vec<Regime>,
}

impl Default for TaxRules {
    fn default() -> Self {
        TaxRules {
            base_rate: dec!(30),
            margin_rate: dec!(34),
            margin_threshold: dec!(50000),
            zero_tax_threshold: dec!(1000),
            carryforward_window_years: 5,
            dividend_taxable_share: dec!(0.85),
            regimes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Regime {
    /// First calendar year the threshold applies to
    pub from_year: i32,
    #[schemars(with = "f64")]
    pub margin_threshold: Decimal,
}

impl TaxRules {
    /// Margin threshold of the latest regime starting on or before `year`
    pub fn margin_threshold_for(&self, year: i32) -> Decimal {
        self.regimes
            .iter()
            .rev()
            .find(|r| r.from_year <= year)
            .map_or(self.margin_threshold, |r| r.margin_threshold)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        non_negative("tax.base_rate", self.base_rate)?;
        non_negative("tax.margin_rate", self.margin_rate)?;
        for (name, rate) in [("tax.base_rate", self.base_rate), ("tax.margin_rate", self.margin_rate)] {
            if rate > dec!(100) {
                return Err(ConfigError::InvalidValue {
                    name,
                    reason: format!("{}% is above 100%", rate),
                });
            }
        }
        non_negative("tax.zero_tax_threshold", self.zero_tax_threshold)?;
        if self.carryforward_window_years == 0 {
            return Err(ConfigError::InvalidValue {
                name: "tax.carryforward_window_years",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.dividend_taxable_share < Decimal::ZERO || self.dividend_taxable_share > Decimal::ONE {
            return Err(ConfigError::InvalidValue {
                name: "tax.dividend_taxable_share",
                reason: format!("{} is outside 0..=1", self.dividend_taxable_share),
            });
        }

        let thresholds = std::iter::once(self.margin_threshold)
            .chain(self.regimes.iter().map(|r| r.margin_threshold));
        for threshold in thresholds {
            if threshold < self.zero_tax_threshold {
                return Err(ConfigError::InvalidValue {
                    name: "tax.margin_threshold",
                    reason: format!(
                        "{} is below the zero tax threshold {}",
                        threshold, self.zero_tax_threshold
                    ),
                });
            }
        }

        for pair in self.regimes.windows(2) {
            if pair[1].from_year <= pair[0].from_year {
                return Err(ConfigError::InvalidValue {
                    name: "tax.regimes",
                    reason: format!(
                        "regime {} listed after {}; order by from_year",
                        pair[1].from_year, pair[0].from_year
                    ),
                });
            }
        }
        Ok(())
    }
}

/// Text encoding of an input export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum TextEncoding {
    Utf8,
    /// Little-endian unless a byte order mark says otherwise
    #[default]
    Utf16,
}

/// Realized sales export, one row per sold lot
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SaleSource {
    pub fields: SaleFields,
    /// chrono format of the date column
    pub date_format: String,
    pub delimiter: char,
    pub encoding: TextEncoding,
}

impl Default for SaleSource {
    fn default() -> Self {
        SaleSource {
            fields: SaleFields::default(),
            date_format: "%d.%m.%Y".to_string(),
            delimiter: '\t',
            encoding: TextEncoding::Utf16,
        }
    }
}

impl SaleSource {
    fn validate(&self) -> Result<(), ConfigError> {
        required("sales.fields.date", &self.fields.date)?;
        required("sales.fields.profit_loss", &self.fields.profit_loss)?;
        required("sales.fields.buy_cost", &self.fields.buy_cost)?;
        required("sales.fields.sell_cost", &self.fields.sell_cost)?;
        required("sales.date_format", &self.date_format)?;
        ascii_delimiter("sales.delimiter", self.delimiter)
    }
}

/// Column names of the sales export
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SaleFields {
    pub date: String,
    /// Signed realized result of the lot
    pub profit_loss: String,
    pub buy_cost: String,
    pub sell_cost: String,
}

impl Default for SaleFields {
    fn default() -> Self {
        SaleFields {
            date: "Luovutusaika".to_string(),
            profit_loss: "Voitto tai tappio EUR".to_string(),
            buy_cost: "Hankintakulut EUR".to_string(),
            sell_cost: "Myyntikulut EUR".to_string(),
        }
    }
}

/// Cash account export: dividends, withholding, loan interest and deposits
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct CashSource {
    pub fields: CashFields,
    pub labels: CashLabels,
    /// chrono format of the date column
    pub date_format: String,
    pub delimiter: char,
    pub encoding: TextEncoding,
}

impl Default for CashSource {
    fn default() -> Self {
        CashSource {
            fields: CashFields::default(),
            labels: CashLabels::default(),
            date_format: "%Y-%m-%d".to_string(),
            delimiter: '\t',
            encoding: TextEncoding::Utf16,
        }
    }
}

impl CashSource {
    fn validate(&self) -> Result<(), ConfigError> {
        required("cash.fields.date", &self.fields.date)?;
        required("cash.fields.amount", &self.fields.amount)?;
        required("cash.fields.transaction_type", &self.fields.transaction_type)?;
        required("cash.date_format", &self.date_format)?;
        ascii_delimiter("cash.delimiter", self.delimiter)?;
        self.labels.validate()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct CashFields {
    pub date: String,
    pub amount: String,
    pub transaction_type: String,
}

impl Default for CashFields {
    fn default() -> Self {
        CashFields {
            date: "Kirjauspäivä".to_string(),
            amount: "Summa".to_string(),
            transaction_type: "Tapahtumatyyppi".to_string(),
        }
    }
}

/// Transaction type labels recognized in the cash export.
///
/// Rows carrying any other label are ignored.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct CashLabels {
    pub dividend: String,
    pub withholding: String,
    pub loan_interest: String,
    /// Every label that means money deposited into the account
    pub deposits: Vec<String>,
    /// Labels whose signed amount is a realized sale profit or loss
    pub sales: Vec<String>,
}

impl Default for CashLabels {
    fn default() -> Self {
        CashLabels {
            dividend: "OSINKO".to_string(),
            withholding: "ENNAKKOPIDÄTYS".to_string(),
            loan_interest: "LAINAKORKO".to_string(),
            deposits: vec!["TALLETUS".to_string(), "PIKATALLETUS".to_string()],
            sales: Vec::new(),
        }
    }
}

impl CashLabels {
    /// Every configured label with the name of the kind it maps to
    pub fn entries(&self) -> impl Iterator<Item = (&str, &'static str)> {
        [
            (self.dividend.as_str(), "dividend"),
            (self.withholding.as_str(), "withholding"),
            (self.loan_interest.as_str(), "loan_interest"),
        ]
        .into_iter()
        .chain(self.deposits.iter().map(|l| (l.as_str(), "deposits")))
        .chain(self.sales.iter().map(|l| (l.as_str(), "sales")))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        required("cash.labels.dividend", &self.dividend)?;
        required("cash.labels.withholding", &self.withholding)?;
        required("cash.labels.loan_interest", &self.loan_interest)?;
        if self.deposits.iter().all(|l| l.trim().is_empty()) {
            return Err(ConfigError::NoDepositLabels);
        }

        let mut seen: HashMap<&str, &'static str> = HashMap::new();
        for (label, kind) in self.entries() {
            let label = label.trim();
            if label.is_empty() {
                continue;
            }
            if let Some(first) = seen.insert(label, kind) {
                if first != kind {
                    return Err(ConfigError::AmbiguousLabel {
                        label: label.to_string(),
                        first,
                        second: kind,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Colors accepted by the chart renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ChartColor {
    Red,
    Green,
    Blue,
    Orange,
    Gray,
    Black,
}

impl ChartColor {
    pub fn hex(self) -> &'static str {
        match self {
            ChartColor::Red => "#d62728",
            ChartColor::Green => "#2ca02c",
            ChartColor::Blue => "#1f77b4",
            ChartColor::Orange => "#ff7f0e",
            ChartColor::Gray => "#7f7f7f",
            ChartColor::Black => "#000000",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ChartStyle {
    pub positive_color: ChartColor,
    pub negative_color: ChartColor,
    pub tax_color: ChartColor,
}

impl Default for ChartStyle {
    fn default() -> Self {
        ChartStyle {
            positive_color: ChartColor::Green,
            negative_color: ChartColor::Red,
            tax_color: ChartColor::Orange,
        }
    }
}

impl ChartStyle {
    pub fn color_for(&self, value: f64) -> ChartColor {
        if value < 0.0 {
            self.negative_color
        } else {
            self.positive_color
        }
    }
}

fn required(name: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::MissingFieldMapping(name));
    }
    Ok(())
}

fn non_negative(name: &'static str, value: Decimal) -> Result<(), ConfigError> {
    if value < Decimal::ZERO {
        return Err(ConfigError::InvalidValue {
            name,
            reason: format!("{} is negative", value),
        });
    }
    Ok(())
}

fn ascii_delimiter(name: &'static str, delimiter: char) -> Result<(), ConfigError> {
    if !delimiter.is_ascii() {
        return Err(ConfigError::InvalidValue {
            name,
            reason: format!("'{}' is not a single-byte delimiter", delimiter),
        });
    }
    Ok(())
}
