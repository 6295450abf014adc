use crate::types::{AttributionRow, UnifiedRecord};

use super::{
    instrument_selection_interaction, three_effect_names, AttributionModel, GroupSlice,
    ModelKind, PeriodContext,
};

/// Brinson-Fachler attribution.
///
/// Allocation is measured against the total benchmark return, so
/// overweighting a group only earns a positive allocation effect when the
/// group beats the benchmark as a whole:
///
/// - Allocation  = (wp − wb) · (rb − RB)
/// - Selection   = wb · (rp − rb)
/// - Interaction = (wp − wb) · (rp − rb)
#[derive(Debug, Clone, Copy, Default)]
pub struct BrinsonFachler;

impl AttributionModel for BrinsonFachler {
    fn kind(&self) -> ModelKind {
        ModelKind::BrinsonFachler
    }

    fn effect_names(&self) -> Vec<String> {
        three_effect_names()
    }

    fn group_row(&self, group: &GroupSlice<'_>, period: &PeriodContext) -> AttributionRow {
        let g = &group.aggregate;
        let rp = g.portfolio_return();
        let rb = g.benchmark_return();
        let allocation = g.active_weight() * (rb - period.benchmark_return);
        let selection = g.benchmark_weight * (rp - rb);
        let interaction = g.active_weight() * (rp - rb);
        AttributionRow::new(group.key(), vec![allocation, selection, interaction])
    }

    fn instrument_row(
        &self,
        record: &UnifiedRecord,
        group: &GroupSlice<'_>,
        period: &PeriodContext,
    ) -> AttributionRow {
        let g = &group.aggregate;
        let active_weight = record.portfolio_weight - record.benchmark_weight;
        let allocation = active_weight * (g.benchmark_return() - period.benchmark_return);
        let (selection, interaction) = instrument_selection_interaction(record, g);
        AttributionRow::new(
            record.instrument.as_str(),
            vec![allocation, selection, interaction],
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::Criterion;
    use crate::models::test_support::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    #[test]
    fn test_two_group_scenario_effects() {
        let tables = BrinsonFachler
            .group_effects(&two_group_scenario(), Criterion::GicsSector)
            .unwrap();
        assert_eq!(tables.len(), 1);
        let t = &tables[0];
        // RB = 0.4*0.08 + 0.6*0.05 = 0.062
        assert_eq!(t.benchmark_return, dec!(0.062));
        // RP = 0.6*0.10 + 0.4*0.04 = 0.076
        assert_eq!(t.portfolio_return, dec!(0.076));

        let tech = t.row("Tech").unwrap();
        assert_eq!(tech.effects[0], dec!(0.0036));
        assert_eq!(tech.effects[1], dec!(0.008));
        assert_eq!(tech.effects[2], dec!(0.004));
        assert_eq!(tech.total_effect, dec!(0.0156));

        // Other: allocation (-0.2)*(0.05-0.062)=0.0024, selection 0.6*(-0.01)=-0.006,
        // interaction (-0.2)*(-0.01)=0.002
        let other = t.row("Other").unwrap();
        assert_eq!(other.effects[0], dec!(0.0024));
        assert_eq!(other.effects[1], dec!(-0.006));
        assert_eq!(other.effects[2], dec!(0.002));

        let total = t.total_row().unwrap();
        assert_eq!(total.total_effect, dec!(0.014));
        assert_eq!(total.total_effect, t.active_return());
    }

    #[test]
    fn test_column_order() {
        assert_eq!(
            BrinsonFachler.effect_names(),
            vec!["Allocation", "Selection", "Interaction"]
        );
    }

    #[test]
    fn test_total_effect_equals_active_return() {
        let tables = BrinsonFachler
            .group_effects(&multi_instrument_scenario(), Criterion::GicsSector)
            .unwrap();
        for t in &tables {
            assert_close(t.total_row().unwrap().total_effect, t.active_return());
        }
    }

    #[test]
    fn test_allocation_sums_to_zero_when_weights_balance() {
        // Σ (wp - wb) = 0, so a uniform group return earns no allocation.
        let data = vec![
            record(date(31), "A", "X", dec!(0.7), dec!(0.5), dec!(0.05), dec!(0.05)),
            record(date(31), "B", "Y", dec!(0.3), dec!(0.5), dec!(0.05), dec!(0.05)),
        ];
        let t = &BrinsonFachler
            .group_effects(&data, Criterion::GicsSector)
            .unwrap()[0];
        for row in t.group_rows() {
            assert_eq!(row.effects[0], Decimal::ZERO);
        }
    }

    #[test]
    fn test_overweight_outperformer_positive_allocation() {
        let data = vec![
            record(date(31), "W", "Winner", dec!(0.80), dec!(0.50), dec!(0.12), dec!(0.12)),
            record(date(31), "L", "Loser", dec!(0.20), dec!(0.50), dec!(0.02), dec!(0.02)),
        ];
        let t = &BrinsonFachler
            .group_effects(&data, Criterion::GicsSector)
            .unwrap()[0];
        assert!(t.row("Winner").unwrap().effects[0] > Decimal::ZERO);
        assert!(t.row("Loser").unwrap().effects[0] > Decimal::ZERO);
    }

    #[test]
    fn test_same_weights_only_selection() {
        let data = vec![
            record(date(31), "A", "X", dec!(0.5), dec!(0.5), dec!(0.12), dec!(0.08)),
            record(date(31), "B", "Y", dec!(0.5), dec!(0.5), dec!(0.06), dec!(0.04)),
        ];
        let t = &BrinsonFachler
            .group_effects(&data, Criterion::GicsSector)
            .unwrap()[0];
        let total = t.total_row().unwrap();
        assert_eq!(total.effects[0], Decimal::ZERO);
        assert_eq!(total.effects[2], Decimal::ZERO);
        assert_eq!(total.effects[1], t.active_return());
    }

    #[test]
    fn test_drill_down_sums_to_group() {
        assert_drill_down_reconciles(&BrinsonFachler, &multi_instrument_scenario());
        assert_drill_down_reconciles(&BrinsonFachler, &two_group_scenario());
    }

    #[test]
    fn test_single_instrument_group_drill_down_matches_group() {
        let data = two_group_scenario();
        let drill = BrinsonFachler
            .instrument_effects(&data, Criterion::GicsSector, "Tech")
            .unwrap();
        let t1 = drill[0].row("T1").unwrap();
        assert_eq!(t1.effects[0], dec!(0.0036));
        assert_close(t1.effects[1], dec!(0.008));
        assert_close(t1.effects[2], dec!(0.004));
    }

    #[test]
    fn test_benchmark_only_instrument_drill_down() {
        let data = multi_instrument_scenario();
        let drill = BrinsonFachler
            .instrument_effects(&data, Criterion::GicsSector, "Energy")
            .unwrap();
        let e2 = drill[0].row("E2").unwrap();
        // RB = 0.042, Energy Rb = 0.025
        // allocation = (0 - 0.25) * (0.025 - 0.042) = 0.00425
        assert_eq!(e2.effects[0], dec!(0.00425));
        // selection = -0.25*0.04, interaction = 0.25*0.025
        assert_close(e2.effects[1], dec!(-0.01));
        assert_close(e2.effects[2], dec!(0.00625));
    }
}
