use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::classification::Classification;
use crate::error::AttributionError;

/// Rates and returns expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = Decimal;

/// Portfolio or benchmark weights, as fractions of the book (0.25 = 25%).
pub type Weight = Decimal;

/// Key of the synthetic row holding column sums.
pub const TOTAL_KEY: &str = "Total";

/// Key label used by instrument drill-down tables.
pub const INSTRUMENT_KEY: &str = "Product description";

/// Which input table a holding record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Origin {
    Portfolio,
    Benchmark,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Portfolio => write!(f, "Portfolio"),
            Origin::Benchmark => write!(f, "Benchmark"),
        }
    }
}

/// Fixed-income return effects, in their canonical display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FixedIncomeEffect {
    #[serde(rename = "Income")]
    Income,
    #[serde(rename = "Yield curve")]
    YieldCurve,
    #[serde(rename = "Credit")]
    Credit,
    #[serde(rename = "Rolldown")]
    Rolldown,
    #[serde(rename = "Trading")]
    Trading,
    #[serde(rename = "Global other")]
    GlobalOther,
}

impl FixedIncomeEffect {
    pub const ALL: [FixedIncomeEffect; 6] = [
        FixedIncomeEffect::Income,
        FixedIncomeEffect::YieldCurve,
        FixedIncomeEffect::Credit,
        FixedIncomeEffect::Rolldown,
        FixedIncomeEffect::Trading,
        FixedIncomeEffect::GlobalOther,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            FixedIncomeEffect::Income => "Income",
            FixedIncomeEffect::YieldCurve => "Yield curve",
            FixedIncomeEffect::Credit => "Credit",
            FixedIncomeEffect::Rolldown => "Rolldown",
            FixedIncomeEffect::Trading => "Trading",
            FixedIncomeEffect::GlobalOther => "Global other",
        }
    }
}

impl fmt::Display for FixedIncomeEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FixedIncomeEffect {
    type Err = AttributionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        FixedIncomeEffect::ALL
            .iter()
            .copied()
            .find(|e| e.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                AttributionError::config(
                    "effects",
                    format!(
                        "unknown effect '{}' (expected one of: {})",
                        wanted,
                        FixedIncomeEffect::ALL
                            .iter()
                            .map(|e| e.name())
                            .collect::<Vec<_>>()
                            .join(", ")
                    ),
                )
            })
    }
}

/// One row of a portfolio or benchmark holdings table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoldingRecord {
    /// Portfolio or benchmark identifier.
    pub source: String,
    pub date: NaiveDate,
    pub instrument: String,
    pub weight: Weight,
    #[serde(rename = "return")]
    pub period_return: Rate,
    /// Contribution to return; `weight * return` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contribution: Option<Decimal>,
    /// Per-effect return components, used by the fixed-income model.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub effects: BTreeMap<FixedIncomeEffect, Rate>,
}

impl HoldingRecord {
    pub fn new(
        source: impl Into<String>,
        date: NaiveDate,
        instrument: impl Into<String>,
        weight: Weight,
        period_return: Rate,
    ) -> Self {
        HoldingRecord {
            source: source.into(),
            date,
            instrument: instrument.into(),
            weight,
            period_return,
            contribution: None,
            effects: BTreeMap::new(),
        }
    }

    pub fn with_effect(mut self, effect: FixedIncomeEffect, value: Rate) -> Self {
        self.effects.insert(effect, value);
        self
    }

    pub fn contribution(&self) -> Decimal {
        self.contribution
            .unwrap_or(self.weight * self.period_return)
    }
}

/// Instrument-level record aligned across portfolio and benchmark.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedRecord {
    pub date: NaiveDate,
    pub instrument: String,
    pub classification: Classification,
    pub portfolio_weight: Weight,
    pub portfolio_return: Rate,
    pub benchmark_weight: Weight,
    pub benchmark_return: Rate,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub portfolio_effects: BTreeMap<FixedIncomeEffect, Rate>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub benchmark_effects: BTreeMap<FixedIncomeEffect, Rate>,
}

impl UnifiedRecord {
    pub fn portfolio_contribution(&self) -> Decimal {
        self.portfolio_weight * self.portfolio_return
    }

    pub fn benchmark_contribution(&self) -> Decimal {
        self.benchmark_weight * self.benchmark_return
    }

    /// Weighted active contribution of one effect: `wp * ep - wb * eb`.
    pub fn effect_contribution(&self, effect: FixedIncomeEffect) -> Decimal {
        let ep = self
            .portfolio_effects
            .get(&effect)
            .copied()
            .unwrap_or(Decimal::ZERO);
        let eb = self
            .benchmark_effects
            .get(&effect)
            .copied()
            .unwrap_or(Decimal::ZERO);
        self.portfolio_weight * ep - self.benchmark_weight * eb
    }
}

/// Weights and weighted returns of all instruments sharing a key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupAggregate {
    pub key: String,
    pub portfolio_weight: Weight,
    pub benchmark_weight: Weight,
    /// Sum of `wp * rp` over the group.
    pub portfolio_contribution: Decimal,
    /// Sum of `wb * rb` over the group.
    pub benchmark_contribution: Decimal,
}

impl GroupAggregate {
    pub fn from_records<'a>(
        key: impl Into<String>,
        records: impl IntoIterator<Item = &'a UnifiedRecord>,
    ) -> Self {
        let mut agg = GroupAggregate {
            key: key.into(),
            ..Default::default()
        };
        for r in records {
            agg.portfolio_weight += r.portfolio_weight;
            agg.benchmark_weight += r.benchmark_weight;
            agg.portfolio_contribution += r.portfolio_contribution();
            agg.benchmark_contribution += r.benchmark_contribution();
        }
        agg
    }

    /// Weighted portfolio return; zero for a group the portfolio does not hold.
    pub fn portfolio_return(&self) -> Rate {
        if self.portfolio_weight.is_zero() {
            Decimal::ZERO
        } else {
            self.portfolio_contribution / self.portfolio_weight
        }
    }

    /// Weighted benchmark return; zero for a group absent from the benchmark.
    pub fn benchmark_return(&self) -> Rate {
        if self.benchmark_weight.is_zero() {
            Decimal::ZERO
        } else {
            self.benchmark_contribution / self.benchmark_weight
        }
    }

    pub fn active_weight(&self) -> Weight {
        self.portfolio_weight - self.benchmark_weight
    }
}

/// One keyed row of effects. `total_effect` is the sum of `effects`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributionRow {
    pub key: String,
    pub effects: Vec<Decimal>,
    pub total_effect: Decimal,
}

impl AttributionRow {
    pub fn new(key: impl Into<String>, effects: Vec<Decimal>) -> Self {
        let total_effect = effects.iter().copied().sum();
        AttributionRow {
            key: key.into(),
            effects,
            total_effect,
        }
    }

    pub fn zero(key: impl Into<String>, columns: usize) -> Self {
        AttributionRow::new(key, vec![Decimal::ZERO; columns])
    }

    /// Column-wise sum of `rows`, keyed as `key`.
    pub fn sum<'a>(
        key: impl Into<String>,
        columns: usize,
        rows: impl IntoIterator<Item = &'a AttributionRow>,
    ) -> Self {
        let mut effects = vec![Decimal::ZERO; columns];
        for row in rows {
            for (acc, v) in effects.iter_mut().zip(row.effects.iter()) {
                *acc += *v;
            }
        }
        AttributionRow::new(key, effects)
    }

    pub fn is_total(&self) -> bool {
        self.key == TOTAL_KEY
    }
}

/// Single-period effects, keyed by group or instrument, with a trailing
/// `Total` row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributionTable {
    pub date: NaiveDate,
    pub key_label: String,
    pub effect_names: Vec<String>,
    pub rows: Vec<AttributionRow>,
    /// Whole-book portfolio return for the period.
    pub portfolio_return: Rate,
    /// Whole-book benchmark return for the period.
    pub benchmark_return: Rate,
}

impl AttributionTable {
    /// Build a table from group rows; the `Total` row is appended here.
    pub fn from_groups(
        date: NaiveDate,
        key_label: impl Into<String>,
        effect_names: Vec<String>,
        mut groups: Vec<AttributionRow>,
        portfolio_return: Rate,
        benchmark_return: Rate,
    ) -> Self {
        let total = AttributionRow::sum(TOTAL_KEY, effect_names.len(), groups.iter());
        groups.push(total);
        AttributionTable {
            date,
            key_label: key_label.into(),
            effect_names,
            rows: groups,
            portfolio_return,
            benchmark_return,
        }
    }

    pub fn group_rows(&self) -> &[AttributionRow] {
        group_rows(&self.rows)
    }

    pub fn total_row(&self) -> Option<&AttributionRow> {
        self.rows.last().filter(|r| r.is_total())
    }

    pub fn row(&self, key: &str) -> Option<&AttributionRow> {
        self.group_rows().iter().find(|r| r.key == key)
    }

    pub fn active_return(&self) -> Rate {
        self.portfolio_return - self.benchmark_return
    }
}

/// Rows without the trailing `Total` row.
pub(crate) fn group_rows(rows: &[AttributionRow]) -> &[AttributionRow] {
    match rows.last() {
        Some(last) if last.is_total() => &rows[..rows.len() - 1],
        _ => rows,
    }
}

// ---------------------------------------------------------------------------
// Output envelope
// ---------------------------------------------------------------------------

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}
