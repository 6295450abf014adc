use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use crate::error::AttributionError;

/// Bucket for instruments without a classification value.
pub const UNCLASSIFIED: &str = "Unclassified";

// ---------------------------------------------------------------------------
// Criteria
// ---------------------------------------------------------------------------

/// A dimension instruments can be grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Criterion {
    #[serde(rename = "GICS sector")]
    GicsSector,
    #[serde(rename = "GICS industry group")]
    GicsIndustryGroup,
    #[serde(rename = "GICS industry")]
    GicsIndustry,
    #[serde(rename = "GICS sub-industry")]
    GicsSubIndustry,
    #[serde(rename = "Region")]
    Region,
    #[serde(rename = "Country")]
    Country,
    #[serde(rename = "S&P rating")]
    SpRating,
    #[serde(rename = "Fitch rating")]
    FitchRating,
    #[serde(rename = "Moody's rating")]
    MoodysRating,
}

impl Criterion {
    pub const ALL: [Criterion; 9] = [
        Criterion::GicsSector,
        Criterion::GicsIndustryGroup,
        Criterion::GicsIndustry,
        Criterion::GicsSubIndustry,
        Criterion::Region,
        Criterion::Country,
        Criterion::SpRating,
        Criterion::FitchRating,
        Criterion::MoodysRating,
    ];

    /// Column header used in the classification table.
    pub fn name(&self) -> &'static str {
        match self {
            Criterion::GicsSector => "GICS sector",
            Criterion::GicsIndustryGroup => "GICS industry group",
            Criterion::GicsIndustry => "GICS industry",
            Criterion::GicsSubIndustry => "GICS sub-industry",
            Criterion::Region => "Region",
            Criterion::Country => "Country",
            Criterion::SpRating => "S&P rating",
            Criterion::FitchRating => "Fitch rating",
            Criterion::MoodysRating => "Moody's rating",
        }
    }

    /// Rating-agency criteria are only offered to the fixed-income model.
    pub fn is_rating(&self) -> bool {
        matches!(
            self,
            Criterion::SpRating | Criterion::FitchRating | Criterion::MoodysRating
        )
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Criterion {
    type Err = AttributionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Criterion::ALL
            .iter()
            .copied()
            .find(|c| c.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                AttributionError::config("criterion", format!("unknown criterion '{}'", wanted))
            })
    }
}

// ---------------------------------------------------------------------------
// Classification values
// ---------------------------------------------------------------------------

/// Category values of one instrument, one per criterion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    values: BTreeMap<Criterion, String>,
}

impl Classification {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, criterion: Criterion, value: impl Into<String>) -> Self {
        self.set(criterion, value);
        self
    }

    /// Empty values are treated as missing.
    pub fn set(&mut self, criterion: Criterion, value: impl Into<String>) {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            self.values.remove(&criterion);
        } else {
            self.values.insert(criterion, trimmed.to_string());
        }
    }

    pub fn value(&self, criterion: Criterion) -> &str {
        self.values
            .get(&criterion)
            .map(String::as_str)
            .unwrap_or(UNCLASSIFIED)
    }

    /// Criteria with a value.
    pub fn criteria(&self) -> impl Iterator<Item = Criterion> + '_ {
        self.values.keys().copied()
    }
}

/// Instrument id to classification, plus the criterion columns the table
/// carries. A column may be present with every value blank.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassificationTable {
    entries: HashMap<String, Classification>,
    #[serde(default)]
    criteria: BTreeSet<Criterion>,
}

impl ClassificationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Later inserts for the same instrument replace earlier ones.
    pub fn insert(&mut self, instrument: impl Into<String>, classification: Classification) {
        self.criteria.extend(classification.criteria());
        self.entries.insert(instrument.into(), classification);
    }

    /// Record a criterion column, whether or not any instrument has a value.
    pub fn add_criterion(&mut self, criterion: Criterion) {
        self.criteria.insert(criterion);
    }

    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.add_criterion(criterion);
        self
    }

    pub fn has_criterion(&self, criterion: Criterion) -> bool {
        self.criteria.contains(&criterion)
    }

    pub fn criteria(&self) -> &BTreeSet<Criterion> {
        &self.criteria
    }

    pub fn get(&self, instrument: &str) -> Option<&Classification> {
        self.entries.get(instrument)
    }

    /// Classification of `instrument`, all `Unclassified` when unmapped.
    pub fn classify(&self, instrument: &str) -> Classification {
        self.entries.get(instrument).cloned().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, Classification)> for ClassificationTable {
    fn from_iter<I: IntoIterator<Item = (String, Classification)>>(iter: I) -> Self {
        let mut table = ClassificationTable::new();
        for (instrument, classification) in iter {
            table.insert(instrument, classification);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_criterion_round_trips_through_name() {
        for c in Criterion::ALL {
            assert_eq!(c.name().parse::<Criterion>().unwrap(), c);
        }
    }

    #[test]
    fn test_unknown_criterion_is_config_error() {
        let err = "Currency".parse::<Criterion>().unwrap_err();
        assert!(matches!(err, AttributionError::Config { .. }));
    }

    #[test]
    fn test_rating_criteria() {
        assert!(Criterion::MoodysRating.is_rating());
        assert!(!Criterion::Country.is_rating());
    }

    #[test]
    fn test_unmapped_instrument_is_unclassified() {
        let mut table = ClassificationTable::new();
        table.insert(
            "ACME",
            Classification::new().with(Criterion::GicsSector, "Industrials"),
        );
        let acme = table.classify("ACME");
        assert_eq!(acme.value(Criterion::GicsSector), "Industrials");
        assert_eq!(acme.value(Criterion::Region), UNCLASSIFIED);
        let other = table.classify("UNKNOWN");
        for c in Criterion::ALL {
            assert_eq!(other.value(c), UNCLASSIFIED);
        }
    }

    #[test]
    fn test_table_tracks_criterion_columns() {
        let table: ClassificationTable = [(
            "ACME".to_string(),
            Classification::new()
                .with(Criterion::GicsSector, "Industrials")
                .with(Criterion::Country, ""),
        )]
        .into_iter()
        .collect();
        assert!(table.has_criterion(Criterion::GicsSector));
        assert!(!table.has_criterion(Criterion::Country));

        let table = table.with_criterion(Criterion::Country);
        assert!(table.has_criterion(Criterion::Country));
        assert!(!ClassificationTable::new().has_criterion(Criterion::Region));
    }

    #[test]
    fn test_blank_value_is_unclassified() {
        let c = Classification::new().with(Criterion::Country, "  ");
        assert_eq!(c.value(Criterion::Country), UNCLASSIFIED);
    }
}
