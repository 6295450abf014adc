use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::{debug, warn};

use crate::classification::ClassificationTable;
use crate::error::AttributionError;
use crate::types::{FixedIncomeEffect, HoldingRecord, Origin, Rate, UnifiedRecord, Weight};
use crate::AttributionResult;

/// Allowed distance of a per-date weight sum from 1.
pub const WEIGHT_TOLERANCE: Decimal = dec!(0.0001);

// ---------------------------------------------------------------------------
// Per-side accumulation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
struct Position {
    weight: Weight,
    contribution: Decimal,
    effect_contributions: BTreeMap<FixedIncomeEffect, Decimal>,
}

impl Position {
    fn add(&mut self, record: &HoldingRecord) {
        self.weight += record.weight;
        self.contribution += record.contribution();
        for (effect, value) in &record.effects {
            *self.effect_contributions.entry(*effect).or_default() += record.weight * *value;
        }
    }

    fn scale(&mut self, factor: Decimal) {
        self.weight *= factor;
        self.contribution *= factor;
        for v in self.effect_contributions.values_mut() {
            *v *= factor;
        }
    }

    fn period_return(&self) -> Rate {
        if self.weight.is_zero() {
            Decimal::ZERO
        } else {
            self.contribution / self.weight
        }
    }

    fn effect_returns(&self) -> BTreeMap<FixedIncomeEffect, Rate> {
        if self.weight.is_zero() {
            return BTreeMap::new();
        }
        self.effect_contributions
            .iter()
            .map(|(e, c)| (*e, *c / self.weight))
            .collect()
    }
}

type Book = BTreeMap<(NaiveDate, String), Position>;

/// Combine the records of `sources` into one book keyed by (date, instrument).
fn build_book(
    origin: Origin,
    sources: &BTreeSet<&str>,
    records: &[HoldingRecord],
) -> AttributionResult<Book> {
    let mut seen: HashSet<(&str, NaiveDate, &str)> = HashSet::new();
    let mut book = Book::new();

    for record in records {
        if !sources.contains(record.source.as_str()) {
            continue;
        }
        let key = (record.source.as_str(), record.date, record.instrument.as_str());
        if !seen.insert(key) {
            return Err(AttributionError::data(
                format!(
                    "{} '{}' / {} / '{}'",
                    origin, record.source, record.date, record.instrument
                ),
                "instrument appears more than once for the same date (ambiguous weight)",
            ));
        }
        book.entry((record.date, record.instrument.clone()))
            .or_default()
            .add(record);
    }

    Ok(book)
}

fn weight_sums(book: &Book) -> BTreeMap<NaiveDate, Weight> {
    let mut sums: BTreeMap<NaiveDate, Weight> = BTreeMap::new();
    for ((date, _), pos) in book {
        *sums.entry(*date).or_default() += pos.weight;
    }
    sums
}

/// Rescale each date of the book so its weights sum to 1.
fn renormalize(origin: Origin, book: &mut Book) {
    let sums = weight_sums(book);
    for ((date, instrument), pos) in book.iter_mut() {
        match sums.get(date) {
            Some(sum) if !sum.is_zero() => pos.scale(Decimal::ONE / *sum),
            _ => warn!(%origin, %date, %instrument, "weights sum to zero; left unnormalized"),
        }
    }
}

fn check_weight_sums(origin: Origin, book: &Book) {
    for (date, sum) in weight_sums(book) {
        if (sum - Decimal::ONE).abs() > WEIGHT_TOLERANCE {
            warn!(%origin, %date, %sum, "weights do not sum to 1");
        }
    }
}

fn ensure_present(
    origin: Origin,
    id: &str,
    records: &[HoldingRecord],
) -> AttributionResult<()> {
    if records.iter().any(|r| r.source == id) {
        Ok(())
    } else {
        Err(AttributionError::data(
            format!("{} '{}'", origin, id),
            format!("not present in the {} table", origin.to_string().to_lowercase()),
        ))
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Join portfolio and benchmark holdings with their classifications.
///
/// Selected portfolios are combined into a single book whose weights are
/// renormalised to sum to 1 on every date. The join is an outer join on
/// (instrument, date): a side that does not hold an instrument contributes
/// weight 0 and return 0. Output is ordered by date, then instrument.
pub fn prepare(
    selected_portfolios: &[String],
    selected_benchmark: &str,
    portfolio_records: &[HoldingRecord],
    benchmark_records: &[HoldingRecord],
    classifications: &ClassificationTable,
) -> AttributionResult<Vec<UnifiedRecord>> {
    if selected_portfolios.is_empty() {
        return Err(AttributionError::config(
            "selected_portfolios",
            "at least one portfolio must be selected",
        ));
    }

    let portfolios: BTreeSet<&str> = selected_portfolios.iter().map(String::as_str).collect();
    for id in &portfolios {
        ensure_present(Origin::Portfolio, id, portfolio_records)?;
    }
    ensure_present(Origin::Benchmark, selected_benchmark, benchmark_records)?;

    let mut portfolio_book = build_book(Origin::Portfolio, &portfolios, portfolio_records)?;
    renormalize(Origin::Portfolio, &mut portfolio_book);

    let benchmark_ids: BTreeSet<&str> = [selected_benchmark].into_iter().collect();
    let benchmark_book = build_book(Origin::Benchmark, &benchmark_ids, benchmark_records)?;
    check_weight_sums(Origin::Benchmark, &benchmark_book);

    let keys: BTreeSet<&(NaiveDate, String)> =
        portfolio_book.keys().chain(benchmark_book.keys()).collect();

    let empty = Position::default();
    let unified: Vec<UnifiedRecord> = keys
        .into_iter()
        .map(|key| {
            let p = portfolio_book.get(key).unwrap_or(&empty);
            let b = benchmark_book.get(key).unwrap_or(&empty);
            UnifiedRecord {
                date: key.0,
                instrument: key.1.clone(),
                classification: classifications.classify(&key.1),
                portfolio_weight: p.weight,
                portfolio_return: p.period_return(),
                benchmark_weight: b.weight,
                benchmark_return: b.period_return(),
                portfolio_effects: p.effect_returns(),
                benchmark_effects: b.effect_returns(),
            }
        })
        .collect();

    debug!(
        portfolios = ?portfolios,
        benchmark = selected_benchmark,
        records = unified.len(),
        "prepared unified dataset"
    );

    Ok(unified)
}

/// Sorted unique source ids of a holdings table.
pub fn available_sources(records: &[HoldingRecord]) -> Vec<String> {
    records
        .iter()
        .map(|r| r.source.as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

pub fn available_portfolios(portfolio_records: &[HoldingRecord]) -> Vec<String> {
    available_sources(portfolio_records)
}

pub fn available_benchmarks(benchmark_records: &[HoldingRecord]) -> Vec<String> {
    available_sources(benchmark_records)
}

/// Distinct dates of a unified dataset, ascending.
pub fn dates(records: &[UnifiedRecord]) -> Vec<NaiveDate> {
    records
        .iter()
        .map(|r| r.date)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
