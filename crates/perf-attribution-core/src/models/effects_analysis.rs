use rust_decimal::Decimal;
use std::collections::BTreeSet;

use crate::error::AttributionError;
use crate::types::{AttributionRow, FixedIncomeEffect, UnifiedRecord};
use crate::AttributionResult;

use super::{AttributionModel, GroupSlice, ModelKind, PeriodContext};

/// Column holding the part of the excess contribution not explained by the
/// selected effects.
pub const RESIDUAL: &str = "Residual";

/// Fixed-income effects analysis.
///
/// For each selected effect k and each group:
///
///   effect_k = Σ wp_j·ep_jk − Σ wb_j·eb_jk
///
/// where ep/eb are the instruments' return components for that effect. The
/// `Residual` column closes the row to the group's excess contribution
/// Σ wp_j·rp_j − Σ wb_j·rb_j, so unselected effects fold into it.
#[derive(Debug, Clone)]
pub struct EffectsAnalysis {
    effects: Vec<FixedIncomeEffect>,
}

impl EffectsAnalysis {
    /// At least one effect, each at most once, in display order.
    pub fn new(effects: Vec<FixedIncomeEffect>) -> AttributionResult<Self> {
        if effects.is_empty() {
            return Err(AttributionError::config(
                "effects",
                "the fixed-income model needs at least one effect",
            ));
        }
        let mut seen = BTreeSet::new();
        for e in &effects {
            if !seen.insert(*e) {
                return Err(AttributionError::config(
                    "effects",
                    format!("effect '{}' selected more than once", e),
                ));
            }
        }
        Ok(EffectsAnalysis { effects })
    }

    /// Parse effect names against the closed set of fixed-income effects.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> AttributionResult<Self> {
        let effects = names
            .iter()
            .map(|n| n.as_ref().parse::<FixedIncomeEffect>())
            .collect::<AttributionResult<Vec<_>>>()?;
        Self::new(effects)
    }

    /// All six effects in canonical order.
    pub fn full() -> Self {
        EffectsAnalysis {
            effects: FixedIncomeEffect::ALL.to_vec(),
        }
    }

    pub fn effects(&self) -> &[FixedIncomeEffect] {
        &self.effects
    }

    fn decompose<'a>(
        &self,
        key: &str,
        records: impl IntoIterator<Item = &'a UnifiedRecord> + Clone,
    ) -> AttributionRow {
        let mut values: Vec<Decimal> = self
            .effects
            .iter()
            .map(|e| {
                records
                    .clone()
                    .into_iter()
                    .map(|r| r.effect_contribution(*e))
                    .sum()
            })
            .collect();
        let excess: Decimal = records
            .into_iter()
            .map(|r| r.portfolio_contribution() - r.benchmark_contribution())
            .sum();
        let explained: Decimal = values.iter().copied().sum();
        values.push(excess - explained);
        AttributionRow::new(key, values)
    }
}

impl AttributionModel for EffectsAnalysis {
    fn kind(&self) -> ModelKind {
        ModelKind::FixedIncome
    }

    fn effect_names(&self) -> Vec<String> {
        self.effects
            .iter()
            .map(|e| e.name().to_string())
            .chain(std::iter::once(RESIDUAL.to_string()))
            .collect()
    }

    fn group_row(&self, group: &GroupSlice<'_>, _period: &PeriodContext) -> AttributionRow {
        self.decompose(group.key(), group.records.iter().copied())
    }

    fn instrument_row(
        &self,
        record: &UnifiedRecord,
        _group: &GroupSlice<'_>,
        _period: &PeriodContext,
    ) -> AttributionRow {
        self.decompose(&record.instrument, std::iter::once(record))
    }

    fn supports(&self, _criterion: crate::classification::Criterion) -> bool {
        true
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
