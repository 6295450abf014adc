//! Single-period attribution models.
//!
//! Every model implements [`AttributionModel`]: it defines its effect
//! columns and how one group (or one instrument within a group) is
//! decomposed. The provided methods split the unified dataset by date, group
//! it by a [`Criterion`] and emit one [`AttributionTable`] per date. Every
//! table carries the union of group keys seen across all dates, so tables
//! from the same call link without padding.

pub mod brinson_fachler;
pub mod brinson_hood_beebower;
pub mod effects_analysis;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::classification::Criterion;
use crate::error::AttributionError;
use crate::types::{
    AttributionRow, AttributionTable, FixedIncomeEffect, GroupAggregate, Rate, UnifiedRecord,
    INSTRUMENT_KEY, TOTAL_KEY,
};
use crate::AttributionResult;

pub use brinson_fachler::BrinsonFachler;
pub use brinson_hood_beebower::BrinsonHoodBeebower;
pub use effects_analysis::EffectsAnalysis;

pub const ALLOCATION: &str = "Allocation";
pub const SELECTION: &str = "Selection";
pub const INTERACTION: &str = "Interaction";

// ---------------------------------------------------------------------------
// Model selection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelKind {
    #[serde(rename = "Brinson-Fachler")]
    BrinsonFachler,
    #[serde(rename = "Brinson-Hood-Beebower")]
    BrinsonHoodBeebower,
    #[serde(rename = "Fixed Income attribution")]
    FixedIncome,
}

impl ModelKind {
    pub fn name(&self) -> &'static str {
        match self {
            ModelKind::BrinsonFachler => "Brinson-Fachler",
            ModelKind::BrinsonHoodBeebower => "Brinson-Hood-Beebower",
            ModelKind::FixedIncome => "Fixed Income attribution",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ModelKind {
    type Err = AttributionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        match normalized.as_str() {
            "brinsonfachler" | "bf" => Ok(ModelKind::BrinsonFachler),
            "brinsonhoodbeebower" | "bhb" => Ok(ModelKind::BrinsonHoodBeebower),
            "fixedincome" | "fixedincomeattribution" | "effectsanalysis" | "fi" => {
                Ok(ModelKind::FixedIncome)
            }
            _ => Err(AttributionError::config(
                "model",
                format!(
                    "unknown model '{}' (expected Brinson-Fachler, Brinson-Hood-Beebower or Fixed Income attribution)",
                    s.trim()
                ),
            )),
        }
    }
}

/// Instantiate the model selected by `kind`.
///
/// `effects` is required for the fixed-income model and must be empty for
/// the equity models.
pub fn build_model(
    kind: ModelKind,
    effects: &[FixedIncomeEffect],
) -> AttributionResult<Box<dyn AttributionModel>> {
    match kind {
        ModelKind::FixedIncome => Ok(Box::new(EffectsAnalysis::new(effects.to_vec())?)),
        _ if !effects.is_empty() => Err(AttributionError::config(
            "effects",
            format!("effect selection only applies to the fixed-income model, not {}", kind),
        )),
        ModelKind::BrinsonFachler => Ok(Box::new(BrinsonFachler)),
        ModelKind::BrinsonHoodBeebower => Ok(Box::new(BrinsonHoodBeebower)),
    }
}

// ---------------------------------------------------------------------------
// Period and group views
// ---------------------------------------------------------------------------

/// Whole-book figures of one date.
#[derive(Debug, Clone, Copy)]
pub struct PeriodContext {
    pub date: NaiveDate,
    /// RP = Σ wp·rp over all instruments.
    pub portfolio_return: Rate,
    /// RB = Σ wb·rb over all instruments.
    pub benchmark_return: Rate,
}

impl PeriodContext {
    pub fn from_records(date: NaiveDate, records: &[&UnifiedRecord]) -> Self {
        PeriodContext {
            date,
            portfolio_return: records.iter().map(|r| r.portfolio_contribution()).sum(),
            benchmark_return: records.iter().map(|r| r.benchmark_contribution()).sum(),
        }
    }
}

/// The instruments of one group on one date, with their aggregate.
#[derive(Debug, Clone)]
pub struct GroupSlice<'a> {
    pub aggregate: GroupAggregate,
    pub records: Vec<&'a UnifiedRecord>,
}

impl<'a> GroupSlice<'a> {
    pub fn new(key: &str, records: Vec<&'a UnifiedRecord>) -> Self {
        GroupSlice {
            aggregate: GroupAggregate::from_records(key, records.iter().copied()),
            records,
        }
    }

    pub fn key(&self) -> &str {
        &self.aggregate.key
    }
}

fn by_date(data: &[UnifiedRecord]) -> BTreeMap<NaiveDate, Vec<&UnifiedRecord>> {
    let mut periods: BTreeMap<NaiveDate, Vec<&UnifiedRecord>> = BTreeMap::new();
    for r in data {
        periods.entry(r.date).or_default().push(r);
    }
    periods
}

fn ensure_not_total(key: &str, label: &str) -> AttributionResult<()> {
    if key == TOTAL_KEY {
        Err(AttributionError::data(
            format!("{} '{}'", label, key),
            "value collides with the synthetic Total row",
        ))
    } else {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Model interface
// ---------------------------------------------------------------------------

pub trait AttributionModel: Send + Sync {
    fn kind(&self) -> ModelKind;

    /// Effect column names, in output order.
    fn effect_names(&self) -> Vec<String>;

    /// Decompose one group of one period.
    fn group_row(&self, group: &GroupSlice<'_>, period: &PeriodContext) -> AttributionRow;

    /// Decompose one instrument of `group`. Rows of all instruments in the
    /// group sum to `group_row` of the same group.
    fn instrument_row(
        &self,
        record: &UnifiedRecord,
        group: &GroupSlice<'_>,
        period: &PeriodContext,
    ) -> AttributionRow;

    fn supports(&self, criterion: Criterion) -> bool {
        !criterion.is_rating()
    }

    fn check_criterion(&self, criterion: Criterion) -> AttributionResult<()> {
        if self.supports(criterion) {
            Ok(())
        } else {
            Err(AttributionError::config(
                "criterion",
                format!("'{}' is not available for the {} model", criterion, self.kind()),
            ))
        }
    }

    /// One table per date, one row per classification value of `criterion`.
    fn group_effects(
        &self,
        data: &[UnifiedRecord],
        criterion: Criterion,
    ) -> AttributionResult<Vec<AttributionTable>> {
        self.check_criterion(criterion)?;
        if data.is_empty() {
            return Err(AttributionError::data("dataset", "no records to attribute"));
        }

        let keys: BTreeSet<&str> = data
            .iter()
            .map(|r| r.classification.value(criterion))
            .collect();
        for key in &keys {
            ensure_not_total(key, criterion.name())?;
        }

        let tables: Vec<AttributionTable> = by_date(data)
            .into_iter()
            .map(|(date, records)| {
                let period = PeriodContext::from_records(date, &records);
                let rows = keys
                    .iter()
                    .map(|key| {
                        let members: Vec<&UnifiedRecord> = records
                            .iter()
                            .copied()
                            .filter(|r| r.classification.value(criterion) == *key)
                            .collect();
                        self.group_row(&GroupSlice::new(key, members), &period)
                    })
                    .collect();
                AttributionTable::from_groups(
                    date,
                    criterion.name(),
                    self.effect_names(),
                    rows,
                    period.portfolio_return,
                    period.benchmark_return,
                )
            })
            .collect();

        debug!(
            model = %self.kind(),
            criterion = %criterion,
            groups = keys.len(),
            periods = tables.len(),
            "computed group effects"
        );
        Ok(tables)
    }

    /// One table per date, one row per instrument classified as `value`.
    fn instrument_effects(
        &self,
        data: &[UnifiedRecord],
        criterion: Criterion,
        value: &str,
    ) -> AttributionResult<Vec<AttributionTable>> {
        self.check_criterion(criterion)?;

        let instruments: BTreeSet<&str> = data
            .iter()
            .filter(|r| r.classification.value(criterion) == value)
            .map(|r| r.instrument.as_str())
            .collect();
        if instruments.is_empty() {
            return Err(AttributionError::config(
                "drill_down",
                format!("no instrument is classified as '{}' under {}", value, criterion),
            ));
        }
        for instrument in &instruments {
            ensure_not_total(instrument, INSTRUMENT_KEY)?;
        }

        let columns = self.effect_names().len();
        let tables: Vec<AttributionTable> = by_date(data)
            .into_iter()
            .map(|(date, records)| {
                let period = PeriodContext::from_records(date, &records);
                let members: Vec<&UnifiedRecord> = records
                    .iter()
                    .copied()
                    .filter(|r| r.classification.value(criterion) == value)
                    .collect();
                let group = GroupSlice::new(value, members);
                let rows = instruments
                    .iter()
                    .map(|instrument| {
                        match group.records.iter().find(|r| r.instrument == *instrument) {
                            Some(record) => self.instrument_row(record, &group, &period),
                            None => AttributionRow::zero(*instrument, columns),
                        }
                    })
                    .collect();
                AttributionTable::from_groups(
                    date,
                    INSTRUMENT_KEY,
                    self.effect_names(),
                    rows,
                    period.portfolio_return,
                    period.benchmark_return,
                )
            })
            .collect();

        debug!(
            model = %self.kind(),
            criterion = %criterion,
            value,
            instruments = instruments.len(),
            "computed instrument effects"
        );
        Ok(tables)
    }
}

// ---------------------------------------------------------------------------
// Shared three-effect helpers
// ---------------------------------------------------------------------------

pub(crate) fn three_effect_names() -> Vec<String> {
    vec![ALLOCATION.into(), SELECTION.into(), INTERACTION.into()]
}

/// Selection and interaction of one instrument against its group.
///
/// With s = Wb/Wp (0 when the portfolio holds nothing in the group):
///   selection_j   = s·wp_j·rp_j − wb_j·rb_j
///   interaction_j = (1 − s)·wp_j·rp_j − (wp_j − wb_j)·Rb
/// which sum over the group to Wb·(Rp − Rb) and (Wp − Wb)·(Rp − Rb).
pub(crate) fn instrument_selection_interaction(
    record: &UnifiedRecord,
    group: &GroupAggregate,
) -> (Decimal, Decimal) {
    let share = if group.portfolio_weight.is_zero() {
        Decimal::ZERO
    } else {
        group.benchmark_weight / group.portfolio_weight
    };
    let pc = record.portfolio_contribution();
    let active_weight = record.portfolio_weight - record.benchmark_weight;
    let selection = share * pc - record.benchmark_contribution();
    let interaction = (Decimal::ONE - share) * pc - active_weight * group.benchmark_return();
    (selection, interaction)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::classification::Classification;
    use rust_decimal_macros::dec;

    pub const TOLERANCE: Decimal = dec!(0.000000000001);

    pub fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, day).unwrap()
    }

    pub fn record(
        date: NaiveDate,
        instrument: &str,
        sector: &str,
        wp: Decimal,
        wb: Decimal,
        rp: Decimal,
        rb: Decimal,
    ) -> UnifiedRecord {
        UnifiedRecord {
            date,
            instrument: instrument.into(),
            classification: Classification::new().with(Criterion::GicsSector, sector),
            portfolio_weight: wp,
            portfolio_return: rp,
            benchmark_weight: wb,
            benchmark_return: rb,
            portfolio_effects: BTreeMap::new(),
            benchmark_effects: BTreeMap::new(),
        }
    }

    /// Tech / Other worked example, one instrument per group.
    pub fn two_group_scenario() -> Vec<UnifiedRecord> {
        vec![
            record(date(31), "T1", "Tech", dec!(0.6), dec!(0.4), dec!(0.10), dec!(0.08)),
            record(date(31), "O1", "Other", dec!(0.4), dec!(0.6), dec!(0.04), dec!(0.05)),
        ]
    }

    /// Two sectors with several instruments each, including one held only
    /// by the benchmark and one only by the portfolio.
    pub fn multi_instrument_scenario() -> Vec<UnifiedRecord> {
        vec![
            record(date(31), "T1", "Tech", dec!(0.30), dec!(0.15), dec!(0.12), dec!(0.11)),
            record(date(31), "T2", "Tech", dec!(0.15), dec!(0.20), dec!(0.03), dec!(0.05)),
            record(date(31), "T3", "Tech", dec!(0.05), dec!(0.00), dec!(0.20), dec!(0.00)),
            record(date(31), "E1", "Energy", dec!(0.35), dec!(0.25), dec!(-0.02), dec!(0.01)),
            record(date(31), "E2", "Energy", dec!(0.00), dec!(0.25), dec!(0.00), dec!(0.04)),
            record(date(31), "U1", "Utilities", dec!(0.15), dec!(0.15), dec!(0.02), dec!(0.02)),
        ]
    }

    pub fn assert_close(actual: Decimal, expected: Decimal) {
        assert!(
            (actual - expected).abs() < TOLERANCE,
            "expected {} got {}",
            expected,
            actual
        );
    }

    /// Drill-down rows of every group sum to the group row.
    pub fn assert_drill_down_reconciles(model: &dyn AttributionModel, data: &[UnifiedRecord]) {
        let groups = model.group_effects(data, Criterion::GicsSector).unwrap();
        for table in &groups {
            for group_row in table.group_rows() {
                let drill = model
                    .instrument_effects(data, Criterion::GicsSector, &group_row.key)
                    .unwrap();
                let same_date = drill.iter().find(|t| t.date == table.date).unwrap();
                let total = same_date.total_row().unwrap();
                for (a, b) in total.effects.iter().zip(group_row.effects.iter()) {
                    assert_close(*a, *b);
                }
                assert_close(total.total_effect, group_row.total_effect);
            }
        }
    }
}
