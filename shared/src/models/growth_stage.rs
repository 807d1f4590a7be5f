//! Plant growth stages keyed by cumulative GDD

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Phenological phase reached by a planting
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum GrowthStage {
    BudDevelopment,
    Flowering,
    FruitSet,
    PitHardening,
    OilAccumulation,
    MaturityAndHarvest,
}

impl GrowthStage {
    pub fn label(&self) -> &'static str {
        match self {
            GrowthStage::BudDevelopment => "Bud Development",
            GrowthStage::Flowering => "Flowering",
            GrowthStage::FruitSet => "Fruit Set",
            GrowthStage::PitHardening => "Pit Hardening",
            GrowthStage::OilAccumulation => "Oil Accumulation",
            GrowthStage::MaturityAndHarvest => "Maturity & Harvest",
        }
    }
}

impl std::fmt::Display for GrowthStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One row of the stage table.
///
/// Covers `(lower, upper]`, except the first row which also includes `lower`.
/// `upper == None` means unbounded.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct StageRange {
    pub lower: u32,
    pub upper: Option<u32>,
    pub stage: GrowthStage,
}

impl StageRange {
    const fn new(lower: u32, upper: Option<u32>, stage: GrowthStage) -> Self {
        Self {
            lower,
            upper,
            stage,
        }
    }

    /// Whether `total` lies within `lower..=upper`
    pub fn contains(&self, total: Decimal) -> bool {
        total >= Decimal::from(self.lower)
            && self.upper.map_or(true, |upper| total <= Decimal::from(upper))
    }
}

const STANDARD_STAGES: [StageRange; 6] = [
    StageRange::new(0, Some(100), GrowthStage::BudDevelopment),
    StageRange::new(100, Some(350), GrowthStage::Flowering),
    StageRange::new(350, Some(700), GrowthStage::FruitSet),
    StageRange::new(700, Some(1200), GrowthStage::PitHardening),
    StageRange::new(1200, Some(1800), GrowthStage::OilAccumulation),
    StageRange::new(1800, None, GrowthStage::MaturityAndHarvest),
];

static STANDARD_TABLE: GrowthStageTable = GrowthStageTable {
    ranges: &STANDARD_STAGES,
};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GrowthStageError {
    #[error("no growth stage covers cumulative GDD {0}")]
    UnknownStage(Decimal),

    #[error("growth stage table is malformed: {0}")]
    MalformedTable(&'static str),
}

/// Ordered, contiguous stage ranges covering `[0, inf)`
#[derive(Debug, Clone, Copy, Serialize)]
pub struct GrowthStageTable {
    ranges: &'static [StageRange],
}

impl GrowthStageTable {
    /// Build a table, rejecting gaps, overlaps and a bounded last row
    pub fn new(ranges: &'static [StageRange]) -> Result<Self, GrowthStageError> {
        let table = Self { ranges };
        table.validate()?;
        Ok(table)
    }

    /// The process-wide table used for classification
    pub fn standard() -> &'static GrowthStageTable {
        &STANDARD_TABLE
    }

    pub fn ranges(&self) -> &'static [StageRange] {
        self.ranges
    }

    /// Stage of the first row, reported for an empty accumulation
    pub fn first_stage(&self) -> Option<GrowthStage> {
        self.ranges.first().map(|r| r.stage)
    }

    pub fn validate(&self) -> Result<(), GrowthStageError> {
        let first = self
            .ranges
            .first()
            .ok_or(GrowthStageError::MalformedTable("table is empty"))?;
        if first.lower != 0 {
            return Err(GrowthStageError::MalformedTable("first range must start at 0"));
        }

        for pair in self.ranges.windows(2) {
            match pair[0].upper {
                Some(upper) if upper == pair[1].lower && upper > pair[0].lower => {}
                Some(_) => {
                    return Err(GrowthStageError::MalformedTable(
                        "ranges must be contiguous and increasing",
                    ))
                }
                None => {
                    return Err(GrowthStageError::MalformedTable(
                        "only the last range may be unbounded",
                    ))
                }
            }
        }

        match self.ranges.last() {
            Some(last) if last.upper.is_none() => Ok(()),
            _ => Err(GrowthStageError::MalformedTable("last range must be unbounded")),
        }
    }

    /// Stage of the first range (ascending) containing `total_gdd`
    pub fn classify(&self, total_gdd: Decimal) -> Result<GrowthStage, GrowthStageError> {
        if total_gdd.is_sign_negative() && !total_gdd.is_zero() {
            return Err(GrowthStageError::UnknownStage(total_gdd));
        }

        self.ranges
            .iter()
            .find(|range| range.contains(total_gdd))
            .map(|range| range.stage)
            .ok_or(GrowthStageError::UnknownStage(total_gdd))
    }
}

/// Classify cumulative GDD against the standard table
pub fn classify_growth_stage(total_gdd: Decimal) -> Result<GrowthStage, GrowthStageError> {
    GrowthStageTable::standard().classify(total_gdd)
}
