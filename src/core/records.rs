use super::config::{CashLabels, CashSource, SaleSource, TextEncoding};
use super::parse::{parse_amount, parse_date, ParseError};
use chrono::{Datelike, NaiveDate};
use csv::StringRecord;
use rust_decimal::Decimal;
use std::io::Read;

const SALES: &str = "sales";
const CASH: &str = "cash";

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("{source_name}: input is not valid {encoding:?} text")]
    Encoding {
        source_name: &'static str,
        encoding: TextEncoding,
    },
    #[error("{source_name}: column '{column}' not found in header")]
    MissingColumn {
        source_name: &'static str,
        column: String,
    },
    #[error("{source_name} row {row} (line {line}), field '{field}': {reason}")]
    Malformed {
        source_name: &'static str,
        /// 1-based data row, header excluded
        row: usize,
        /// Line in the file, counting the header and skipped blank lines
        line: u64,
        field: String,
        #[source]
        reason: ParseError,
    },
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Kind of a normalized financial event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionKind {
    SaleProfit,
    SaleLoss,
    BuyCost,
    SellCost,
    Dividend,
    DividendWithholding,
    LoanInterest,
    Deposit,
}

/// One financial event as read from an export.
///
/// `amount` keeps the sign found in the source; the aggregator decides which
/// kinds are summed as magnitudes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecord {
    pub date: NaiveDate,
    pub kind: TransactionKind,
    pub amount: Decimal,
}

impl TransactionRecord {
    pub fn new(date: NaiveDate, kind: TransactionKind, amount: Decimal) -> Self {
        TransactionRecord { date, kind, amount }
    }

    pub fn year(&self) -> i32 {
        self.date.year()
    }
}

/// Read the realized sales export.
///
/// Each lot yields a sale result (profit or loss by sign) plus its buy and sell costs.
pub fn read_sales<R: Read>(reader: R, source: &SaleSource) -> Result<Vec<TransactionRecord>, RecordError> {
    let text = decode(reader, source.encoding, SALES)?;
    let mut rdr = csv_reader(&text, source.delimiter);
    let headers = rdr.headers()?.clone();

    let fields = &source.fields;
    let date = Column::find(&headers, &fields.date, SALES)?;
    let result = Column::find(&headers, &fields.profit_loss, SALES)?;
    let buy_cost = Column::find(&headers, &fields.buy_cost, SALES)?;
    let sell_cost = Column::find(&headers, &fields.sell_cost, SALES)?;

    let mut records = Vec::new();
    for (i, row) in rdr.records().enumerate() {
        let row = row?;
        let data_row = i + 1;
        if is_blank(&row) {
            continue;
        }

        let day = date.parse(&row, data_row, SALES, |v| parse_date(v, &source.date_format))?;
        let amount = result.parse(&row, data_row, SALES, parse_amount)?;
        let kind = if amount < Decimal::ZERO {
            TransactionKind::SaleLoss
        } else {
            TransactionKind::SaleProfit
        };
        records.push(TransactionRecord::new(day, kind, amount));
        records.push(TransactionRecord::new(
            day,
            TransactionKind::BuyCost,
            buy_cost.parse(&row, data_row, SALES, parse_amount)?,
        ));
        records.push(TransactionRecord::new(
            day,
            TransactionKind::SellCost,
            sell_cost.parse(&row, data_row, SALES, parse_amount)?,
        ));
    }

    log::debug!("Read {} sale records", records.len());
    Ok(records)
}

/// Read the cash account export, keeping only rows with a recognized label
pub fn read_cash<R: Read>(reader: R, source: &CashSource) -> Result<Vec<TransactionRecord>, RecordError> {
    let text = decode(reader, source.encoding, CASH)?;
    let mut rdr = csv_reader(&text, source.delimiter);
    let headers = rdr.headers()?.clone();

    let fields = &source.fields;
    let date = Column::find(&headers, &fields.date, CASH)?;
    let amount = Column::find(&headers, &fields.amount, CASH)?;
    let label = Column::find(&headers, &fields.transaction_type, CASH)?;

    let mut records = Vec::new();
    let mut ignored = 0usize;
    for (i, row) in rdr.records().enumerate() {
        let row = row?;
        let data_row = i + 1;
        if is_blank(&row) {
            continue;
        }

        let label_value = row.get(label.index).unwrap_or_default().trim();
        let Some(class) = classify(&source.labels, label_value) else {
            log::debug!("Ignoring cash row {} with label '{}'", data_row, label_value);
            ignored += 1;
            continue;
        };

        let day = date.parse(&row, data_row, CASH, |v| parse_date(v, &source.date_format))?;
        let value = amount.parse(&row, data_row, CASH, parse_amount)?;
        let kind = match class {
            CashClass::Sale if value < Decimal::ZERO => TransactionKind::SaleLoss,
            CashClass::Sale => TransactionKind::SaleProfit,
            CashClass::Dividend => TransactionKind::Dividend,
            CashClass::Withholding => TransactionKind::DividendWithholding,
            CashClass::LoanInterest => TransactionKind::LoanInterest,
            CashClass::Deposit => TransactionKind::Deposit,
        };
        records.push(TransactionRecord::new(day, kind, value));
    }

    log::debug!(
        "Read {} cash records, ignored {} rows with other labels",
        records.len(),
        ignored
    );
    Ok(records)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CashClass {
    Sale,
    Dividend,
    Withholding,
    LoanInterest,
    Deposit,
}

fn classify(labels: &CashLabels, label: &str) -> Option<CashClass> {
    let matches = |candidate: &str| !candidate.trim().is_empty() && candidate.trim() == label;

    if labels.deposits.iter().any(|l| matches(l.as_str())) {
        Some(CashClass::Deposit)
    } else if matches(labels.dividend.as_str()) {
        Some(CashClass::Dividend)
    } else if matches(labels.withholding.as_str()) {
        Some(CashClass::Withholding)
    } else if matches(labels.loan_interest.as_str()) {
        Some(CashClass::LoanInterest)
    } else if labels.sales.iter().any(|l| matches(l.as_str())) {
        Some(CashClass::Sale)
    } else {
        None
    }
}

/// A mapped column resolved against the header row
struct Column<'a> {
    name: &'a str,
    index: usize,
}

impl<'a> Column<'a> {
    fn find(
        headers: &StringRecord,
        name: &'a str,
        source_name: &'static str,
    ) -> Result<Self, RecordError> {
        let wanted = name.trim();
        headers
            .iter()
            .position(|h| h.trim() == wanted)
            .map(|index| Column { name: wanted, index })
            .ok_or_else(|| RecordError::MissingColumn {
                source_name,
                column: wanted.to_string(),
            })
    }

    fn parse<T>(
        &self,
        row: &StringRecord,
        data_row: usize,
        source_name: &'static str,
        parser: impl Fn(&str) -> Result<T, ParseError>,
    ) -> Result<T, RecordError> {
        parser(row.get(self.index).unwrap_or_default()).map_err(|reason| RecordError::Malformed {
            source_name,
            row: data_row,
            line: row.position().map_or(data_row as u64 + 1, |p| p.line()),
            field: self.name.to_string(),
            reason,
        })
    }
}

fn decode<R: Read>(
    mut reader: R,
    encoding: TextEncoding,
    source_name: &'static str,
) -> Result<String, RecordError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;

    // decode() sniffs a byte order mark and strips it
    let codec = match encoding {
        TextEncoding::Utf8 => encoding_rs::UTF_8,
        TextEncoding::Utf16 => encoding_rs::UTF_16LE,
    };
    let (text, used, had_errors) = codec.decode(&bytes);
    if had_errors {
        return Err(RecordError::Encoding {
            source_name,
            encoding,
        });
    }
    if used != codec {
        log::debug!("{}: byte order mark selects {}", source_name, used.name());
    }
    Ok(text.into_owned())
}

fn csv_reader(text: &str, delimiter: char) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes())
}

fn is_blank(row: &StringRecord) -> bool {
    row.iter().all(|f| f.trim().is_empty())
}
