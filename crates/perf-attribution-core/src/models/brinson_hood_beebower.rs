use crate::types::{AttributionRow, UnifiedRecord};

use super::{
    instrument_selection_interaction, three_effect_names, AttributionModel, GroupSlice,
    ModelKind, PeriodContext,
};

/// Brinson-Hood-Beebower attribution.
///
/// Same as Brinson-Fachler except that allocation uses the group's absolute
/// benchmark return: Allocation = (wp − wb) · rb.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrinsonHoodBeebower;

impl AttributionModel for BrinsonHoodBeebower {
    fn kind(&self) -> ModelKind {
        ModelKind::BrinsonHoodBeebower
    }

    fn effect_names(&self) -> Vec<String> {
        three_effect_names()
    }

    fn group_row(&self, group: &GroupSlice<'_>, _period: &PeriodContext) -> AttributionRow {
        let g = &group.aggregate;
        let rp = g.portfolio_return();
        let rb = g.benchmark_return();
        let allocation = g.active_weight() * rb;
        let selection = g.benchmark_weight * (rp - rb);
        let interaction = g.active_weight() * (rp - rb);
        AttributionRow::new(group.key(), vec![allocation, selection, interaction])
    }

    fn instrument_row(
        &self,
        record: &UnifiedRecord,
        group: &GroupSlice<'_>,
        _period: &PeriodContext,
    ) -> AttributionRow {
        let g = &group.aggregate;
        let allocation = (record.portfolio_weight - record.benchmark_weight) * g.benchmark_return();
        let (selection, interaction) = instrument_selection_interaction(record, g);
        AttributionRow::new(
            record.instrument.as_str(),
            vec![allocation, selection, interaction],
        )
    }
}
