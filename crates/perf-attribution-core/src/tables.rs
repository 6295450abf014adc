//! CSV readers for the portfolio, benchmark and classification tables.
//!
//! Columns are located by header name; unknown columns are ignored so the
//! files produced by the performance service can be read as they are.

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord};
use rust_decimal::Decimal;
use std::io::Read;
use std::str::FromStr;
use tracing::debug;

use crate::classification::{Classification, ClassificationTable, Criterion};
use crate::error::AttributionError;
use crate::types::{FixedIncomeEffect, HoldingRecord, Origin, INSTRUMENT_KEY};
use crate::AttributionResult;

const DATE: &str = "Date";
const WEIGHT: &str = "Weight";
const RETURN: &str = "Return";
const CONTRIBUTION: &str = "Contribution";

#[derive(Debug)]
struct HoldingColumns {
    source: usize,
    date: usize,
    instrument: usize,
    weight: usize,
    period_return: usize,
    contribution: Option<usize>,
    effects: Vec<(FixedIncomeEffect, usize)>,
}

fn find(headers: &StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.trim() == name)
}

fn require(headers: &StringRecord, name: &str, table: &str) -> AttributionResult<usize> {
    find(headers, name).ok_or_else(|| {
        AttributionError::data(format!("{} column '{}'", table, name), "column not found")
    })
}

fn holding_columns(headers: &StringRecord, origin: Origin) -> AttributionResult<HoldingColumns> {
    let table = origin.to_string();
    let effects = FixedIncomeEffect::ALL
        .iter()
        .filter_map(|e| find(headers, e.name()).map(|idx| (*e, idx)))
        .collect();
    Ok(HoldingColumns {
        source: require(headers, &table, &table)?,
        date: require(headers, DATE, &table)?,
        instrument: require(headers, INSTRUMENT_KEY, &table)?,
        weight: require(headers, WEIGHT, &table)?,
        period_return: require(headers, RETURN, &table)?,
        contribution: find(headers, CONTRIBUTION),
        effects,
    })
}

fn cell<'r>(record: &'r StringRecord, idx: usize) -> &'r str {
    record.get(idx).map(str::trim).unwrap_or("")
}

fn cell_error(row: usize, column: &str, reason: impl Into<String>) -> AttributionError {
    AttributionError::data(format!("row {}, column '{}'", row, column), reason)
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

fn required_decimal(record: &StringRecord, idx: usize, row: usize, column: &str) -> AttributionResult<Decimal> {
    let text = cell(record, idx);
    parse_decimal(text).ok_or_else(|| cell_error(row, column, format!("'{}' is not a number", text)))
}

/// Blank cells are absent values.
fn optional_decimal(
    record: &StringRecord,
    idx: usize,
    row: usize,
    column: &str,
) -> AttributionResult<Option<Decimal>> {
    match cell(record, idx) {
        "" => Ok(None),
        _ => required_decimal(record, idx, row, column).map(Some),
    }
}

fn csv_error(table: &str, e: csv::Error) -> AttributionError {
    AttributionError::data(format!("{} table", table), e.to_string())
}

/// Read a portfolio (`origin = Portfolio`) or benchmark holdings table.
///
/// Required columns: the source id column (`Portfolio` or `Benchmark`),
/// `Date`, `Product description`, `Weight`, `Return`. Optional:
/// `Contribution` and any fixed-income effect name.
pub fn read_holdings<R: Read>(reader: R, origin: Origin) -> AttributionResult<Vec<HoldingRecord>> {
    let table = origin.to_string();
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rdr.headers().map_err(|e| csv_error(&table, e))?.clone();
    let columns = holding_columns(&headers, origin)?;
    debug!(table = %table, ?columns, "holding columns");

    let mut records = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        let record = result.map_err(|e| csv_error(&table, e))?;
        // Header is line 1.
        let row = idx + 2;
        if record.iter().all(|c| c.trim().is_empty()) {
            continue;
        }

        let source = cell(&record, columns.source);
        let instrument = cell(&record, columns.instrument);
        if source.is_empty() {
            return Err(cell_error(row, &table, "empty identifier"));
        }
        if instrument.is_empty() {
            return Err(cell_error(row, INSTRUMENT_KEY, "empty identifier"));
        }
        let date_text = cell(&record, columns.date);
        let date = NaiveDate::parse_from_str(date_text, "%Y-%m-%d").map_err(|_| {
            cell_error(row, DATE, format!("'{}' is not an ISO date (YYYY-MM-DD)", date_text))
        })?;

        let mut holding = HoldingRecord::new(
            source,
            date,
            instrument,
            required_decimal(&record, columns.weight, row, WEIGHT)?,
            required_decimal(&record, columns.period_return, row, RETURN)?,
        );
        if let Some(idx) = columns.contribution {
            holding.contribution = optional_decimal(&record, idx, row, CONTRIBUTION)?;
        }
        for (effect, idx) in &columns.effects {
            if let Some(value) = optional_decimal(&record, *idx, row, effect.name())? {
                holding = holding.with_effect(*effect, value);
            }
        }
        records.push(holding);
    }

    debug!(table = %table, records = records.len(), "read holdings");
    Ok(records)
}

/// Read the classification table: `Product description` plus any criterion
/// columns. Blank cells leave the instrument `Unclassified` for that
/// criterion.
pub fn read_classifications<R: Read>(reader: R) -> AttributionResult<ClassificationTable> {
    const TABLE: &str = "Classification";
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rdr.headers().map_err(|e| csv_error(TABLE, e))?.clone();
    let instrument_idx = require(&headers, INSTRUMENT_KEY, TABLE)?;
    let criteria: Vec<(Criterion, usize)> = Criterion::ALL
        .iter()
        .filter_map(|c| find(&headers, c.name()).map(|idx| (*c, idx)))
        .collect();

    let mut table = criteria
        .iter()
        .fold(ClassificationTable::new(), |t, (criterion, _)| t.with_criterion(*criterion));
    for (idx, result) in rdr.records().enumerate() {
        let record = result.map_err(|e| csv_error(TABLE, e))?;
        let row = idx + 2;
        let instrument = cell(&record, instrument_idx);
        if instrument.is_empty() {
            continue;
        }
        if table.get(instrument).is_some() {
            return Err(cell_error(
                row,
                INSTRUMENT_KEY,
                format!("'{}' is classified more than once", instrument),
            ));
        }
        let classification = criteria
            .iter()
            .fold(Classification::new(), |c, (criterion, idx)| {
                c.with(*criterion, cell(&record, *idx))
            });
        table.insert(instrument, classification);
    }

    debug!(instruments = table.len(), criteria = criteria.len(), "read classifications");
    Ok(table)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
