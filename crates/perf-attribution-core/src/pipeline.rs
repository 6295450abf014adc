use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Instant;
use tracing::{info, warn};

use crate::classification::{ClassificationTable, Criterion};
use crate::data_preparation::prepare;
use crate::error::AttributionError;
use crate::linking::{GrapLinker, LinkedAttributionTable, LinkingMethod};
use crate::models::{build_model, ModelKind};
use crate::types::{
    with_metadata, AttributionTable, ComputationOutput, FixedIncomeEffect, HoldingRecord,
    INSTRUMENT_KEY,
};
use crate::AttributionResult;

/// Allowed gap between the linked Total and the compounded excess return.
pub const DEFAULT_TOLERANCE: Decimal = dec!(0.000001);

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// One attribution run, as read from a JSON or YAML request file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributionRequest {
    /// "Brinson-Fachler", "Brinson-Hood-Beebower" or "Fixed Income attribution"
    pub model: String,
    /// Classification criterion display name, e.g. "GICS sector"
    pub criterion: String,
    /// Ordered fixed-income effects; fixed-income model only
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub effects: Vec<String>,
    pub selected_portfolios: Vec<String>,
    pub selected_benchmark: String,
    /// Periods dated after this are linked. Defaults to the day before the
    /// first date in the data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_date: Option<NaiveDate>,
    /// Classification value to break down by instrument
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drill_down: Option<String>,
    /// "grap" (default) or "carino"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linking: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tolerance: Option<Decimal>,
}

/// Typed form of an [`AttributionRequest`].
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRequest {
    pub model: ModelKind,
    pub criterion: Criterion,
    pub effects: Vec<FixedIncomeEffect>,
    pub linking: LinkingMethod,
    pub tolerance: Decimal,
}

impl AttributionRequest {
    /// Parse every named choice, rejecting combinations no model supports.
    pub fn resolve(&self) -> AttributionResult<ResolvedRequest> {
        let model: ModelKind = self.model.parse()?;
        let criterion: Criterion = self.criterion.parse()?;
        let effects = self
            .effects
            .iter()
            .map(|e| e.parse::<FixedIncomeEffect>())
            .collect::<AttributionResult<Vec<_>>>()?;
        let linking = match &self.linking {
            Some(name) => name.parse()?,
            None => LinkingMethod::default(),
        };
        let tolerance = self.tolerance.unwrap_or(DEFAULT_TOLERANCE);
        if tolerance < Decimal::ZERO {
            return Err(AttributionError::config(
                "tolerance",
                "reconciliation tolerance cannot be negative",
            ));
        }
        if self.selected_benchmark.trim().is_empty() {
            return Err(AttributionError::config(
                "selected_benchmark",
                "a benchmark must be selected",
            ));
        }

        // Surface effect and criterion mismatches before touching the data.
        build_model(model, &effects)?.check_criterion(criterion)?;

        Ok(ResolvedRequest {
            model,
            criterion,
            effects,
            linking,
            tolerance,
        })
    }
}

// ---------------------------------------------------------------------------
// Inputs and report
// ---------------------------------------------------------------------------

/// The three input tables of a run.
#[derive(Debug, Clone, Default)]
pub struct AttributionTables {
    pub portfolios: Vec<HoldingRecord>,
    pub benchmarks: Vec<HoldingRecord>,
    pub classifications: ClassificationTable,
}

/// Per-date and linked instrument tables for one classification value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrillDownReport {
    pub value: String,
    pub periods: Vec<AttributionTable>,
    pub linked: LinkedAttributionTable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributionReport {
    pub model: ModelKind,
    pub criterion: Criterion,
    pub linking: LinkingMethod,
    pub reference_date: NaiveDate,
    pub selected_portfolios: Vec<String>,
    pub selected_benchmark: String,
    pub effect_names: Vec<String>,
    pub periods: Vec<AttributionTable>,
    pub linked: LinkedAttributionTable,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drill_down: Option<DrillDownReport>,
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

/// Prepare the data, run the selected model per date and link the results
/// from the reference date onwards.
pub fn run_attribution(
    request: &AttributionRequest,
    tables: &AttributionTables,
) -> AttributionResult<ComputationOutput<AttributionReport>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let resolved = request.resolve()?;
    let model = build_model(resolved.model, &resolved.effects)?;
    if !tables.classifications.has_criterion(resolved.criterion) {
        return Err(AttributionError::config(
            "criterion",
            format!(
                "'{}' is not a column of the classification table",
                resolved.criterion
            ),
        ));
    }

    let data = prepare(
        &request.selected_portfolios,
        &request.selected_benchmark,
        &tables.portfolios,
        &tables.benchmarks,
        &tables.classifications,
    )?;

    let unclassified: BTreeSet<&str> = data
        .iter()
        .map(|r| r.instrument.as_str())
        .filter(|i| tables.classifications.get(i).is_none())
        .collect();
    if !unclassified.is_empty() {
        warn!(count = unclassified.len(), "instruments without classification");
        warnings.push(format!(
            "{} instrument(s) have no classification and are grouped as Unclassified",
            unclassified.len()
        ));
    }

    let periods = model.group_effects(&data, resolved.criterion)?;
    let reference_date = match request.reference_date {
        Some(d) => d,
        None => default_reference_date(&periods)?,
    };
    let skipped = periods.iter().filter(|t| t.date <= reference_date).count();
    if skipped > 0 {
        warn!(skipped, %reference_date, "periods before the reference date are not linked");
        warnings.push(format!(
            "{} period(s) on or before {} are excluded from linking",
            skipped, reference_date
        ));
    }

    let linker = GrapLinker::new(resolved.linking);
    let linked = linker.link(&periods, reference_date, resolved.criterion.name())?;
    let gap = linked.reconciliation_gap();
    if gap.abs() > resolved.tolerance {
        warn!(%gap, "linked total does not reconcile to the compounded excess return");
        warnings.push(format!(
            "Linked total differs from compounded excess return by {}",
            gap
        ));
    }

    let drill_down = match &request.drill_down {
        Some(value) => {
            let instrument_periods = model.instrument_effects(&data, resolved.criterion, value)?;
            let linked = linker.link(&instrument_periods, reference_date, INSTRUMENT_KEY)?;
            Some(DrillDownReport {
                value: value.clone(),
                periods: instrument_periods,
                linked,
            })
        }
        None => None,
    };

    info!(
        model = %resolved.model,
        criterion = %resolved.criterion,
        periods = linked.periods.len(),
        "attribution complete"
    );

    let methodology = format!(
        "{} attribution by {}, {}-linked",
        resolved.model, resolved.criterion, resolved.linking
    );
    let report = AttributionReport {
        model: resolved.model,
        criterion: resolved.criterion,
        linking: resolved.linking,
        reference_date,
        selected_portfolios: request.selected_portfolios.clone(),
        selected_benchmark: request.selected_benchmark.clone(),
        effect_names: model.effect_names(),
        periods,
        linked,
        drill_down,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(&methodology, request, warnings, elapsed, report))
}

fn default_reference_date(periods: &[AttributionTable]) -> AttributionResult<NaiveDate> {
    periods
        .iter()
        .map(|t| t.date)
        .min()
        .and_then(|d| d.pred_opt())
        .ok_or_else(|| {
            AttributionError::config("reference_date", "cannot be derived from an empty dataset")
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::Classification;
    use rust_decimal_macros::dec;

    fn d(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, month, day).unwrap()
    }

    fn tables() -> AttributionTables {
        let mut portfolios = Vec::new();
        let mut benchmarks = Vec::new();
        for (date, shift) in [(d(1, 31), dec!(0.0)), (d(2, 29), dec!(0.01))] {
            portfolios.push(HoldingRecord::new("EQ", date, "AAA", dec!(0.6), dec!(0.10) - shift));
            portfolios.push(HoldingRecord::new("EQ", date, "BBB", dec!(0.4), dec!(0.04) + shift));
            benchmarks.push(HoldingRecord::new("IDX", date, "AAA", dec!(0.4), dec!(0.08)));
            benchmarks.push(HoldingRecord::new("IDX", date, "BBB", dec!(0.6), dec!(0.05)));
        }
        let classifications = [
            (
                "AAA".to_string(),
                Classification::new()
                    .with(Criterion::GicsSector, "Tech")
                    .with(Criterion::SpRating, "AA"),
            ),
            (
                "BBB".to_string(),
                Classification::new()
                    .with(Criterion::GicsSector, "Energy")
                    .with(Criterion::SpRating, "BBB"),
            ),
        ]
        .into_iter()
        .collect();
        AttributionTables {
            portfolios,
            benchmarks,
            classifications,
        }
    }

    fn request(model: &str) -> AttributionRequest {
        AttributionRequest {
            model: model.into(),
            criterion: "GICS sector".into(),
            effects: Vec::new(),
            selected_portfolios: vec!["EQ".into()],
            selected_benchmark: "IDX".into(),
            reference_date: None,
            drill_down: None,
            linking: None,
            tolerance: None,
        }
    }

    #[test]
    fn test_resolve_defaults() {
        let r = request("bf").resolve().unwrap();
        assert_eq!(r.model, ModelKind::BrinsonFachler);
        assert_eq!(r.criterion, Criterion::GicsSector);
        assert_eq!(r.linking, LinkingMethod::Grap);
        assert_eq!(r.tolerance, DEFAULT_TOLERANCE);
    }

    #[test]
    fn test_resolve_rejects_rating_for_equity_model() {
        let mut req = request("Brinson-Fachler");
        req.criterion = "Moody's rating".into();
        assert!(matches!(req.resolve(), Err(AttributionError::Config { .. })));
    }

    #[test]
    fn test_resolve_requires_effects_for_fixed_income() {
        let mut req = request("Fixed Income attribution");
        assert!(req.resolve().is_err());
        req.effects = vec!["Income".into(), "Credit".into()];
        assert_eq!(
            req.resolve().unwrap().effects,
            vec![FixedIncomeEffect::Income, FixedIncomeEffect::Credit]
        );
    }

    #[test]
    fn test_run_links_all_periods_by_default() {
        let out = run_attribution(&request("bf"), &tables()).unwrap();
        let report = &out.result;
        assert_eq!(report.reference_date, d(1, 30));
        assert_eq!(report.periods.len(), 2);
        assert_eq!(report.linked.periods.len(), 2);
        assert_eq!(report.linked.reconciliation_gap(), Decimal::ZERO);
        assert!(out.warnings.is_empty());
        assert!(out.methodology.contains("Brinson-Fachler"));
    }

    #[test]
    fn test_run_respects_reference_date() {
        let mut req = request("bhb");
        req.reference_date = Some(d(1, 31));
        let out = run_attribution(&req, &tables()).unwrap();
        assert_eq!(out.result.linked.periods.len(), 1);
        assert!(out.warnings.iter().any(|w| w.contains("excluded")));
        // A single linked period equals the period table itself.
        assert_eq!(out.result.linked.rows, out.result.periods[1].rows);
    }

    #[test]
    fn test_run_with_drill_down() {
        let mut req = request("bf");
        req.drill_down = Some("Tech".into());
        let out = run_attribution(&req, &tables()).unwrap();
        let drill = out.result.drill_down.as_ref().unwrap();
        assert_eq!(drill.linked.key_label, INSTRUMENT_KEY);
        let tech = out.result.linked.row("Tech").unwrap();
        let drill_total = drill.linked.total_row().unwrap();
        for (a, b) in drill_total.effects.iter().zip(tech.effects.iter()) {
            assert!((*a - *b).abs() < dec!(0.000000001), "{a} vs {b}");
        }
    }

    #[test]
    fn test_run_unknown_portfolio() {
        let mut req = request("bf");
        req.selected_portfolios = vec!["NOPE".into()];
        assert!(matches!(
            run_attribution(&req, &tables()),
            Err(AttributionError::Data { .. })
        ));
    }

    #[test]
    fn test_unclassified_instruments_warn() {
        let mut t = tables();
        t.classifications = ClassificationTable::new().with_criterion(Criterion::GicsSector);
        let out = run_attribution(&request("bf"), &t).unwrap();
        assert!(out.warnings.iter().any(|w| w.contains("Unclassified")));
        let keys: Vec<&str> = out
            .result
            .linked
            .group_rows()
            .iter()
            .map(|r| r.key.as_str())
            .collect();
        assert_eq!(keys, vec!["Unclassified"]);
    }

    #[test]
    fn test_criterion_missing_from_classifications() {
        let mut req = request("bf");
        req.criterion = "Region".into();
        match run_attribution(&req, &tables()) {
            Err(AttributionError::Config { field, reason }) => {
                assert_eq!(field, "criterion");
                assert!(reason.contains("Region"));
            }
            other => panic!("expected config error, got {other:?}"),
        }
    }
}
