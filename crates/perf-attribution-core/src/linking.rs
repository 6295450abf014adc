//! Multi-period linking of single-period attribution tables.
//!
//! Single-period effects add up to RP_t − RB_t but do not compound: summing
//! them across periods misses the cross terms of Π(1+RP_t) − Π(1+RB_t).
//! Linking rescales each period's effects so that the linked effects add up
//! to the compounded excess return exactly.
//!
//! Two methods are provided:
//!
//! - [`LinkingMethod::Grap`]: period t is scaled by
//!   Π_{s<t}(1+RP_s) · Π_{s>t}(1+RB_s). Exact in decimal arithmetic.
//! - [`LinkingMethod::Carino`]: logarithmic smoothing with
//!   k_t = (ln(1+RP_t) − ln(1+RB_t)) / (RP_t − RB_t) and a global
//!   K = (ln(1+RP) − ln(1+RB)) / (RP − RB); period t is scaled by k_t / K.
//!
//! Both reproduce a single-period window unchanged. The linking state is a
//! value folded over the ordered periods of one call.

use chrono::NaiveDate;
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::error::AttributionError;
use crate::types::{group_rows, AttributionRow, AttributionTable, Rate, TOTAL_KEY};
use crate::AttributionResult;

/// Below this distance an excess return is treated as zero and the
/// analytic limit of the smoothing coefficient is used.
const NEAR_ZERO: Decimal = dec!(0.000000000001);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkingMethod {
    #[default]
    Grap,
    Carino,
}

impl fmt::Display for LinkingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkingMethod::Grap => write!(f, "GRAP"),
            LinkingMethod::Carino => write!(f, "Carino"),
        }
    }
}

impl FromStr for LinkingMethod {
    type Err = AttributionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "grap" => Ok(LinkingMethod::Grap),
            "carino" | "cariño" => Ok(LinkingMethod::Carino),
            other => Err(AttributionError::config(
                "linking",
                format!("unknown linking method '{}' (expected grap or carino)", other),
            )),
        }
    }
}

/// Whole-book returns of one linked period and the factor applied to its
/// effects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkedPeriod {
    pub date: NaiveDate,
    pub portfolio_return: Rate,
    pub benchmark_return: Rate,
    pub coefficient: Decimal,
}

/// Effects cumulated over `(start_date, end_date]`, with a trailing `Total`
/// row recomputed from the linked rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkedAttributionTable {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub key_label: String,
    pub effect_names: Vec<String>,
    pub rows: Vec<AttributionRow>,
    pub method: LinkingMethod,
    /// Π(1+RP_t) − 1 over the window.
    pub portfolio_return: Rate,
    /// Π(1+RB_t) − 1 over the window.
    pub benchmark_return: Rate,
    pub periods: Vec<LinkedPeriod>,
}

impl LinkedAttributionTable {
    pub fn group_rows(&self) -> &[AttributionRow] {
        group_rows(&self.rows)
    }

    pub fn total_row(&self) -> Option<&AttributionRow> {
        self.rows.last().filter(|r| r.is_total())
    }

    pub fn row(&self, key: &str) -> Option<&AttributionRow> {
        self.group_rows().iter().find(|r| r.key == key)
    }

    /// Compounded excess return RP_cum − RB_cum.
    pub fn active_return(&self) -> Rate {
        self.portfolio_return - self.benchmark_return
    }

    /// Linked total minus compounded excess; zero up to rounding for tables
    /// that cover the whole book.
    pub fn reconciliation_gap(&self) -> Decimal {
        self.total_row()
            .map(|t| t.total_effect)
            .unwrap_or(Decimal::ZERO)
            - self.active_return()
    }
}

// ---------------------------------------------------------------------------
// Window validation
// ---------------------------------------------------------------------------

/// Periods of the window with their group effects laid out in a shared key
/// order.
struct Window<'a> {
    key_label: &'a str,
    effect_names: &'a [String],
    keys: Vec<&'a str>,
    periods: Vec<AlignedPeriod>,
}

struct AlignedPeriod {
    date: NaiveDate,
    portfolio_return: Rate,
    benchmark_return: Rate,
    /// `effects[g][c]` in `Window::keys` order.
    effects: Vec<Vec<Decimal>>,
}

fn build_window<'a>(
    tables: &'a [AttributionTable],
    reference_date: NaiveDate,
    join_key: &str,
) -> AttributionResult<Window<'a>> {
    let mut in_window: Vec<&AttributionTable> =
        tables.iter().filter(|t| t.date > reference_date).collect();
    in_window.sort_by_key(|t| t.date);

    let first = *in_window.first().ok_or_else(|| {
        AttributionError::linking(
            reference_date.to_string(),
            join_key,
            "no period tables after the reference date",
        )
    })?;

    let keys: Vec<&str> = first.group_rows().iter().map(|r| r.key.as_str()).collect();
    let key_set: BTreeSet<&str> = keys.iter().copied().collect();
    if key_set.len() != keys.len() {
        return Err(AttributionError::linking(
            first.date.to_string(),
            join_key,
            "duplicate group keys within a period",
        ));
    }

    let mut periods = Vec::with_capacity(in_window.len());
    let mut previous: Option<NaiveDate> = None;
    for table in in_window {
        if previous == Some(table.date) {
            return Err(AttributionError::linking(
                table.date.to_string(),
                join_key,
                "more than one table for the same date",
            ));
        }
        previous = Some(table.date);

        if table.key_label != join_key {
            return Err(AttributionError::linking(
                table.date.to_string(),
                join_key,
                format!("table is keyed by '{}'", table.key_label),
            ));
        }
        if table.effect_names != first.effect_names {
            return Err(AttributionError::linking(
                table.date.to_string(),
                join_key,
                format!(
                    "effect columns {:?} differ from {:?}",
                    table.effect_names, first.effect_names
                ),
            ));
        }

        let by_key: BTreeMap<&str, &AttributionRow> = table
            .group_rows()
            .iter()
            .map(|r| (r.key.as_str(), r))
            .collect();
        if let Some(extra) = by_key.keys().find(|k| !key_set.contains(*k)) {
            return Err(AttributionError::linking(
                table.date.to_string(),
                *extra,
                format!("group is absent from period {}", first.date),
            ));
        }
        let effects = keys
            .iter()
            .map(|key| {
                by_key
                    .get(key)
                    .map(|row| row.effects.clone())
                    .ok_or_else(|| {
                        AttributionError::linking(
                            table.date.to_string(),
                            *key,
                            "group missing from period; pad it with a zero row",
                        )
                    })
            })
            .collect::<AttributionResult<Vec<_>>>()?;

        periods.push(AlignedPeriod {
            date: table.date,
            portfolio_return: table.portfolio_return,
            benchmark_return: table.benchmark_return,
            effects,
        });
    }

    Ok(Window {
        key_label: &first.key_label,
        effect_names: &first.effect_names,
        keys,
        periods,
    })
}

// ---------------------------------------------------------------------------
// Linking state
// ---------------------------------------------------------------------------

fn ln_growth(r: Rate, date: NaiveDate) -> AttributionResult<Decimal> {
    (Decimal::ONE + r).checked_ln().ok_or_else(|| {
        AttributionError::linking(
            date.to_string(),
            TOTAL_KEY,
            format!("return {} leaves no positive growth factor to take a logarithm of", r),
        )
    })
}

/// k = (ln(1+rp) − ln(1+rb)) / (rp − rb), or its limit 1/(1+rp).
fn carino_coefficient(rp: Rate, rb: Rate, date: NaiveDate) -> AttributionResult<Decimal> {
    let growth = Decimal::ONE + rp;
    if growth <= Decimal::ZERO || Decimal::ONE + rb <= Decimal::ZERO {
        return Err(AttributionError::linking(
            date.to_string(),
            TOTAL_KEY,
            format!("returns {} / {} must exceed -100%", rp, rb),
        ));
    }
    if (rp - rb).abs() < NEAR_ZERO {
        Ok(Decimal::ONE / growth)
    } else {
        Ok((ln_growth(rp, date)? - ln_growth(rb, date)?) / (rp - rb))
    }
}

/// Running state of one `link` call.
#[derive(Debug, Clone)]
struct LinkState {
    /// Linked (GRAP) or k-weighted (Carino) effects, `[group][column]`.
    values: Vec<Vec<Decimal>>,
    portfolio_growth: Decimal,
    benchmark_growth: Decimal,
    periods: Vec<LinkedPeriod>,
}

impl LinkState {
    fn new(groups: usize, columns: usize) -> Self {
        LinkState {
            values: vec![vec![Decimal::ZERO; columns]; groups],
            portfolio_growth: Decimal::ONE,
            benchmark_growth: Decimal::ONE,
            periods: Vec::new(),
        }
    }

    fn step(mut self, method: LinkingMethod, period: &AlignedPeriod) -> AttributionResult<Self> {
        let coefficient = match method {
            LinkingMethod::Grap => {
                // Earlier periods pick up this period's benchmark growth.
                let carry = Decimal::ONE + period.benchmark_return;
                for row in self.values.iter_mut() {
                    for v in row.iter_mut() {
                        *v *= carry;
                    }
                }
                for p in self.periods.iter_mut() {
                    p.coefficient *= carry;
                }
                self.portfolio_growth
            }
            LinkingMethod::Carino => carino_coefficient(
                period.portfolio_return,
                period.benchmark_return,
                period.date,
            )?,
        };

        for (row, effects) in self.values.iter_mut().zip(period.effects.iter()) {
            for (v, e) in row.iter_mut().zip(effects.iter()) {
                *v += coefficient * *e;
            }
        }

        self.portfolio_growth *= Decimal::ONE + period.portfolio_return;
        self.benchmark_growth *= Decimal::ONE + period.benchmark_return;
        self.periods.push(LinkedPeriod {
            date: period.date,
            portfolio_return: period.portfolio_return,
            benchmark_return: period.benchmark_return,
            coefficient,
        });
        Ok(self)
    }

    fn finish(
        mut self,
        method: LinkingMethod,
        window: &Window<'_>,
        start_date: NaiveDate,
    ) -> AttributionResult<LinkedAttributionTable> {
        let portfolio_return = self.portfolio_growth - Decimal::ONE;
        let benchmark_return = self.benchmark_growth - Decimal::ONE;
        let end_date = self
            .periods
            .last()
            .map(|p| p.date)
            .unwrap_or(start_date);

        if method == LinkingMethod::Carino {
            let scale = Decimal::ONE
                / carino_coefficient(portfolio_return, benchmark_return, end_date)?;
            for row in self.values.iter_mut() {
                for v in row.iter_mut() {
                    *v *= scale;
                }
            }
            for p in self.periods.iter_mut() {
                p.coefficient *= scale;
            }
        }

        let columns = window.effect_names.len();
        let mut rows: Vec<AttributionRow> = window
            .keys
            .iter()
            .zip(self.values)
            .map(|(key, values)| AttributionRow::new(*key, values))
            .collect();
        rows.push(AttributionRow::sum(TOTAL_KEY, columns, rows.iter()));

        Ok(LinkedAttributionTable {
            start_date,
            end_date,
            key_label: window.key_label.to_string(),
            effect_names: window.effect_names.to_vec(),
            rows,
            method,
            portfolio_return,
            benchmark_return,
            periods: self.periods,
        })
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
pub struct GrapLinker {
    method: LinkingMethod,
}

impl GrapLinker {
    pub fn new(method: LinkingMethod) -> Self {
        GrapLinker { method }
    }

    pub fn method(&self) -> LinkingMethod {
        self.method
    }

    /// Link every table dated after `reference_date` into one cumulative
    /// table. All tables must be keyed by `join_key`, share effect columns
    /// and carry the same set of group keys.
    pub fn link(
        &self,
        period_tables: &[AttributionTable],
        reference_date: NaiveDate,
        join_key: &str,
    ) -> AttributionResult<LinkedAttributionTable> {
        let window = build_window(period_tables, reference_date, join_key)?;
        let state = window.periods.iter().try_fold(
            LinkState::new(window.keys.len(), window.effect_names.len()),
            |state, period| state.step(self.method, period),
        )?;
        let linked = state.finish(self.method, &window, reference_date)?;

        debug!(
            method = %self.method,
            key = join_key,
            periods = linked.periods.len(),
            portfolio_return = %linked.portfolio_return,
            benchmark_return = %linked.benchmark_return,
            "linked attribution"
        );
        Ok(linked)
    }

    /// Cumulative linked table from `reference_date` to each later date.
    pub fn link_series(
        &self,
        period_tables: &[AttributionTable],
        reference_date: NaiveDate,
        join_key: &str,
    ) -> AttributionResult<Vec<LinkedAttributionTable>> {
        let window = build_window(period_tables, reference_date, join_key)?;
        let mut state = LinkState::new(window.keys.len(), window.effect_names.len());
        let mut series = Vec::with_capacity(window.periods.len());
        for period in &window.periods {
            state = state.step(self.method, period)?;
            series.push(state.clone().finish(self.method, &window, reference_date)?);
        }
        Ok(series)
    }
}

/// Link with the default (GRAP) method.
pub fn link(
    period_tables: &[AttributionTable],
    reference_date: NaiveDate,
    join_key: &str,
) -> AttributionResult<LinkedAttributionTable> {
    GrapLinker::default().link(period_tables, reference_date, join_key)
}

/// Give every table a zero row for each group key it lacks, so that
/// externally assembled periods can be linked.
pub fn pad_missing_groups(tables: Vec<AttributionTable>) -> Vec<AttributionTable> {
    let keys: BTreeSet<String> = tables
        .iter()
        .flat_map(|t| t.group_rows().iter().map(|r| r.key.clone()))
        .collect();

    tables
        .into_iter()
        .map(|t| {
            let present: BTreeSet<&str> = t.group_rows().iter().map(|r| r.key.as_str()).collect();
            let missing: Vec<String> = keys
                .iter()
                .filter(|k| !present.contains(k.as_str()))
                .cloned()
                .collect();
            if missing.is_empty() {
                return t;
            }
            let columns = t.effect_names.len();
            let mut groups: Vec<AttributionRow> = t.group_rows().to_vec();
            groups.extend(missing.into_iter().map(|k| AttributionRow::zero(k, columns)));
            groups.sort_by(|a, b| a.key.cmp(&b.key));
            AttributionTable::from_groups(
                t.date,
                t.key_label,
                t.effect_names,
                groups,
                t.portfolio_return,
                t.benchmark_return,
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: Decimal = dec!(0.000000001);

    fn d(month: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, month, 28).unwrap()
    }

    fn reference() -> NaiveDate {
        NaiveDate::from_ymd_opt(2019, 12, 31).unwrap()
    }

    fn names() -> Vec<String> {
        vec!["Allocation".into(), "Selection".into()]
    }

    /// Period whose group effects sum to rp - rb.
    fn period(date: NaiveDate, rp: Decimal, rb: Decimal, a: [Decimal; 2]) -> AttributionTable {
        let excess = rp - rb;
        AttributionTable::from_groups(
            date,
            "Region",
            names(),
            vec![
                AttributionRow::new("Europe", vec![a[0], a[1]]),
                AttributionRow::new("US", vec![excess - a[0] - a[1], Decimal::ZERO]),
            ],
            rp,
            rb,
        )
    }

    fn close(a: Decimal, b: Decimal) -> bool {
        (a - b).abs() < TOL
    }

    fn three_periods() -> Vec<AttributionTable> {
        vec![
            period(d(1), dec!(0.03), dec!(0.01), [dec!(0.005), dec!(0.01)]),
            period(d(2), dec!(-0.02), dec!(0.015), [dec!(-0.01), dec!(-0.02)]),
            period(d(3), dec!(0.045), dec!(0.02), [dec!(0.002), dec!(0.003)]),
        ]
    }

    #[test]
    fn test_single_period_is_reproduced() {
        let tables = vec![period(d(1), dec!(0.05), dec!(0.03), [dec!(0.004), dec!(0.011)])];
        for method in [LinkingMethod::Grap, LinkingMethod::Carino] {
            let linked = GrapLinker::new(method).link(&tables, reference(), "Region").unwrap();
            for (l, o) in linked.rows.iter().zip(tables[0].rows.iter()) {
                assert_eq!(l.key, o.key);
                for (a, b) in l.effects.iter().zip(o.effects.iter()) {
                    assert!(close(*a, *b), "{method}: {a} vs {b}");
                }
            }
            assert_eq!(linked.portfolio_return, dec!(0.05));
            assert_eq!(linked.benchmark_return, dec!(0.03));
        }
    }

    #[test]
    fn test_grap_single_period_exact() {
        let tables = vec![period(d(1), dec!(0.05), dec!(0.03), [dec!(0.004), dec!(0.011)])];
        let linked = link(&tables, reference(), "Region").unwrap();
        assert_eq!(linked.rows, tables[0].rows);
        assert_eq!(linked.periods[0].coefficient, Decimal::ONE);
    }

    #[test]
    fn test_compounding_not_arithmetic_sum() {
        // Portfolio +10% twice, benchmark flat: compounded excess 21%, not 20%.
        let tables = vec![
            period(d(1), dec!(0.10), Decimal::ZERO, [dec!(0.04), dec!(0.03)]),
            period(d(2), dec!(0.10), Decimal::ZERO, [dec!(0.02), dec!(0.05)]),
        ];
        for method in [LinkingMethod::Grap, LinkingMethod::Carino] {
            let linked = GrapLinker::new(method).link(&tables, reference(), "Region").unwrap();
            let total = linked.total_row().unwrap().total_effect;
            assert!(close(total, dec!(0.21)), "{method}: {total}");
            assert!(!close(total, dec!(0.20)));
            assert_eq!(linked.portfolio_return, dec!(0.21));
        }
    }

    #[test]
    fn test_total_reconciles_to_compounded_excess() {
        let tables = three_periods();
        for method in [LinkingMethod::Grap, LinkingMethod::Carino] {
            let linked = GrapLinker::new(method).link(&tables, reference(), "Region").unwrap();
            assert!(close(linked.reconciliation_gap(), Decimal::ZERO), "{method}");
            let summed: Decimal = linked.group_rows().iter().map(|r| r.total_effect).sum();
            assert_eq!(summed, linked.total_row().unwrap().total_effect);
        }
    }

    #[test]
    fn test_grap_is_exact() {
        let linked = link(&three_periods(), reference(), "Region").unwrap();
        assert_eq!(linked.reconciliation_gap(), Decimal::ZERO);
    }

    #[test]
    fn test_grap_coefficients() {
        let linked = link(&three_periods(), reference(), "Region").unwrap();
        let c: Vec<Decimal> = linked.periods.iter().map(|p| p.coefficient).collect();
        // (1+RB2)(1+RB3), (1+RP1)(1+RB3), (1+RP1)(1+RP2)
        assert_eq!(c[0], dec!(1.015) * dec!(1.02));
        assert_eq!(c[1], dec!(1.03) * dec!(1.02));
        assert_eq!(c[2], dec!(1.03) * dec!(0.98));
    }

    #[test]
    fn test_reference_date_excludes_earlier_periods() {
        let tables = three_periods();
        let linked = link(&tables, d(1), "Region").unwrap();
        assert_eq!(linked.periods.len(), 2);
        assert_eq!(linked.start_date, d(1));
        assert_eq!(linked.end_date, d(3));
    }

    #[test]
    fn test_unordered_input_is_sorted() {
        let mut tables = three_periods();
        tables.reverse();
        let a = link(&tables, reference(), "Region").unwrap();
        let b = link(&three_periods(), reference(), "Region").unwrap();
        assert_eq!(a.rows, b.rows);
    }

    #[test]
    fn test_series_ends_at_full_link() {
        let tables = three_periods();
        for method in [LinkingMethod::Grap, LinkingMethod::Carino] {
            let linker = GrapLinker::new(method);
            let series = linker.link_series(&tables, reference(), "Region").unwrap();
            assert_eq!(series.len(), 3);
            for s in &series {
                assert!(close(s.reconciliation_gap(), Decimal::ZERO));
            }
            let full = linker.link(&tables, reference(), "Region").unwrap();
            assert_eq!(series[2].rows, full.rows);
            assert_eq!(series[0].end_date, d(1));
        }
    }

    #[test]
    fn test_zero_excess_uses_limits() {
        let tables = vec![
            period(d(1), dec!(0.02), dec!(0.02), [dec!(0.01), dec!(-0.005)]),
            period(d(2), Decimal::ZERO, Decimal::ZERO, [Decimal::ZERO, Decimal::ZERO]),
        ];
        let linked = GrapLinker::new(LinkingMethod::Carino)
            .link(&tables, reference(), "Region")
            .unwrap();
        assert!(close(linked.total_row().unwrap().total_effect, Decimal::ZERO));
        assert!(close(linked.row("Europe").unwrap().effects[0], dec!(0.01)));
    }

    #[test]
    fn test_inconsistent_groups_rejected() {
        let mut tables = three_periods();
        tables[1] = AttributionTable::from_groups(
            d(2),
            "Region",
            names(),
            vec![AttributionRow::new("Europe", vec![dec!(0.01), dec!(0.02)])],
            dec!(0.03),
            Decimal::ZERO,
        );
        let err = link(&tables, reference(), "Region").unwrap_err();
        match err {
            AttributionError::Linking { period, group, .. } => {
                assert_eq!(period, d(2).to_string());
                assert_eq!(group, "US");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_extra_group_rejected() {
        let mut tables = three_periods();
        tables[2] = AttributionTable::from_groups(
            d(3),
            "Region",
            names(),
            vec![
                AttributionRow::new("Europe", vec![dec!(0.01), dec!(0.0)]),
                AttributionRow::new("US", vec![dec!(0.01), dec!(0.0)]),
                AttributionRow::new("Japan", vec![dec!(0.005), dec!(0.0)]),
            ],
            dec!(0.045),
            dec!(0.02),
        );
        let err = link(&tables, reference(), "Region").unwrap_err();
        assert!(matches!(err, AttributionError::Linking { ref group, .. } if group == "Japan"));
    }

    #[test]
    fn test_padding_allows_linking() {
        let mut tables = three_periods();
        tables[1] = AttributionTable::from_groups(
            d(2),
            "Region",
            names(),
            vec![AttributionRow::new("Europe", vec![dec!(-0.02), dec!(-0.015)])],
            dec!(-0.02),
            dec!(0.015),
        );
        let padded = pad_missing_groups(tables);
        assert_eq!(padded[1].group_rows().len(), 2);
        assert!(padded[1].row("US").unwrap().effects.iter().all(|v| v.is_zero()));
        let linked = link(&padded, reference(), "Region").unwrap();
        assert_eq!(linked.reconciliation_gap(), Decimal::ZERO);
    }

    #[test]
    fn test_mismatched_key_label_rejected() {
        let err = link(&three_periods(), reference(), "Country").unwrap_err();
        assert!(matches!(err, AttributionError::Linking { .. }));
    }

    #[test]
    fn test_mismatched_columns_rejected() {
        let mut tables = three_periods();
        tables[0].effect_names = vec!["Income".into(), "Residual".into()];
        let err = link(&tables, reference(), "Region").unwrap_err();
        assert!(err.to_string().contains("effect columns"));
    }

    #[test]
    fn test_empty_window_rejected() {
        let err = link(&three_periods(), d(3), "Region").unwrap_err();
        assert!(matches!(err, AttributionError::Linking { .. }));
    }

    #[test]
    fn test_carino_rejects_total_loss() {
        let tables = vec![period(d(1), dec!(-1), dec!(0.01), [dec!(0.0), dec!(0.0)])];
        let err = GrapLinker::new(LinkingMethod::Carino)
            .link(&tables, reference(), "Region")
            .unwrap_err();
        assert!(matches!(err, AttributionError::Linking { .. }));
    }

    #[test]
    fn test_method_parsing() {
        assert_eq!("GRAP".parse::<LinkingMethod>().unwrap(), LinkingMethod::Grap);
        assert_eq!("carino".parse::<LinkingMethod>().unwrap(), LinkingMethod::Carino);
        assert!("frongello".parse::<LinkingMethod>().is_err());
    }
}
